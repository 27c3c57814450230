//! Canonical document keys
//!
//! Every change set is stored under the canonical URL of the page it was
//! made on: origin plus path, with the fragment always stripped and the
//! query string stripped unless the policy keeps it.

use crate::error::{EdityError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// How page URLs are reduced to keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyPolicy {
    /// Keep the query string as part of the key
    #[serde(default)]
    pub keep_query: bool,
}

/// Canonical identifier of one annotated document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentKey(String);

impl DocumentKey {
    /// Canonicalize a page URL with the default policy
    pub fn from_url(input: &str) -> Result<Self> {
        Self::with_policy(input, KeyPolicy::default())
    }

    /// Canonicalize a page URL
    ///
    /// Inputs that do not parse as absolute URLs are kept verbatim apart
    /// from the fragment (and query, per policy).
    pub fn with_policy(input: &str, policy: KeyPolicy) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(EdityError::InvalidKey("empty URL".to_string()));
        }

        let key = match Url::parse(input) {
            Ok(mut url) => {
                url.set_fragment(None);
                if !policy.keep_query {
                    url.set_query(None);
                }
                url.to_string()
            }
            Err(_) => {
                let mut end = input.find('#').unwrap_or(input.len());
                if !policy.keep_query {
                    if let Some(q) = input[..end].find('?') {
                        end = q;
                    }
                }
                input[..end].to_string()
            }
        };

        if key.is_empty() {
            return Err(EdityError::InvalidKey(input.to_string()));
        }
        Ok(Self(key))
    }

    /// Wrap an already canonical key (as stored remotely)
    pub fn from_canonical(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host of the page, if the key is an absolute URL with one
    pub fn domain(&self) -> Option<String> {
        Url::parse(&self.0)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
