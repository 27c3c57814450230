//! Wiki API request and response shapes
//!
//! Change sets live on a MediaWiki instance, one page per document key,
//! the page text being the JSON patch list. This module builds the API
//! requests and reads their responses; moving bytes is left to a
//! [`WikiTransport`] supplied by the host.
//!
//! Response reading is tolerant: a missing page, a page without
//! revisions, or content that is not a patch list all mean "no edits".

use super::codec::{decode_payload, encode_payload};
use super::{SaveMeta, SaveReceipt, SyncGateway, TokenSource};
use crate::changeset::ChangeSet;
use crate::config::EdityConfig;
use crate::error::{EdityError, Result};
use crate::key::DocumentKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// HTTP method of a wiki request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

/// One call to the wiki API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiRequest {
    pub method: Method,
    pub params: Vec<(String, String)>,
}

impl WikiRequest {
    fn new(method: Method, params: &[(&str, &str)]) -> Self {
        Self {
            method,
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Read the stored patch list of a page
    pub fn query_page(key: &DocumentKey) -> Self {
        Self::new(
            Method::Get,
            &[
                ("action", "query"),
                ("prop", "revisions"),
                ("rvprop", "content"),
                ("format", "json"),
                ("titles", key.as_str()),
            ],
        )
    }

    /// Request an edit (CSRF) token
    pub fn query_token() -> Self {
        Self::new(
            Method::Get,
            &[("action", "query"), ("meta", "tokens"), ("format", "json")],
        )
    }

    /// Replace the page text with `payload`
    pub fn edit_page(key: &DocumentKey, payload: &str, summary: &str, minor: bool, token: &str) -> Self {
        let mut request = Self::new(
            Method::Post,
            &[
                ("action", "edit"),
                ("format", "json"),
                ("title", key.as_str()),
                ("text", payload),
                ("summary", summary),
                ("token", token),
            ],
        );
        if minor {
            request.params.push(("minor".to_string(), "1".to_string()));
        }
        request
    }

    /// Parameter value by name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Full URL for a GET request against `endpoint`
    pub fn url(&self, endpoint: &Url) -> Url {
        let mut url = endpoint.clone();
        url.query_pairs_mut().extend_pairs(&self.params);
        url
    }

    /// `application/x-www-form-urlencoded` body for a POST request
    pub fn form_body(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.params)
            .finish()
    }
}

/// Read the page content out of a revisions query response
pub fn parse_page_response(key: &DocumentKey, response: &Value) -> ChangeSet {
    let Some(pages) = response.pointer("/query/pages").and_then(Value::as_object) else {
        warn!(key = %key, "page query response without pages");
        return ChangeSet::new(key.clone());
    };

    let Some((id, page)) = pages.iter().next() else {
        return ChangeSet::new(key.clone());
    };

    if id == "-1" || page.get("missing").is_some() {
        debug!(key = %key, "no page stored for key");
        return ChangeSet::new(key.clone());
    }

    let content = page
        .pointer("/revisions/0/*")
        .or_else(|| page.pointer("/revisions/0/slots/main/*"))
        .and_then(Value::as_str);

    match content {
        Some(content) => decode_payload(key, content),
        None => {
            warn!(key = %key, page = %id, "page has no readable revision content");
            ChangeSet::new(key.clone())
        }
    }
}

/// Extract the CSRF token from a token query response
pub fn parse_token_response(response: &Value) -> Result<String> {
    response
        .pointer("/query/tokens/csrftoken")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| EdityError::RemoteUnavailable("token response without csrftoken".to_string()))
}

/// Interpret an edit response
pub fn parse_edit_response(response: &Value) -> Result<SaveReceipt> {
    if let Some(info) = response.pointer("/error/info").and_then(Value::as_str) {
        return Err(EdityError::RemoteUnavailable(info.to_string()));
    }

    match response.pointer("/edit/result").and_then(Value::as_str) {
        Some("Success") => Ok(SaveReceipt {
            revision: response.pointer("/edit/newrevid").and_then(Value::as_u64),
        }),
        Some(other) => Err(EdityError::RemoteUnavailable(format!("edit result: {}", other))),
        None => Err(EdityError::RemoteUnavailable("edit response without result".to_string())),
    }
}

/// Moves wiki requests over the host's network stack
pub trait WikiTransport {
    /// Send a request to the API at `endpoint` and return the decoded JSON
    /// response
    fn send(&mut self, endpoint: &Url, request: &WikiRequest) -> Result<Value>;
}

/// [`SyncGateway`] over a wiki transport
#[derive(Debug)]
pub struct WikiGateway<T> {
    endpoint: Url,
    transport: T,
}

impl<T: WikiTransport> WikiGateway<T> {
    pub fn new(endpoint: &str, transport: T) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| EdityError::Config(format!("invalid API endpoint {}: {}", endpoint, e)))?;
        Ok(Self { endpoint, transport })
    }

    /// Gateway talking to the endpoint named in `config`
    pub fn from_config(config: &EdityConfig, transport: T) -> Result<Self> {
        Self::new(&config.api_endpoint, transport)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<T: WikiTransport> TokenSource for WikiGateway<T> {
    fn fetch_token(&mut self) -> Result<String> {
        let response = self.transport.send(&self.endpoint, &WikiRequest::query_token())?;
        parse_token_response(&response)
    }
}

impl<T: WikiTransport> SyncGateway for WikiGateway<T> {
    fn load(&mut self, key: &DocumentKey) -> Result<ChangeSet> {
        let response = self.transport.send(&self.endpoint, &WikiRequest::query_page(key))?;
        Ok(parse_page_response(key, &response))
    }

    fn save(&mut self, changes: &ChangeSet, meta: &SaveMeta) -> Result<SaveReceipt> {
        let token = meta.token.as_deref().ok_or(EdityError::MissingToken)?;
        let payload = encode_payload(changes)?;
        let request = WikiRequest::edit_page(changes.key(), &payload, &meta.summary, meta.minor, token);
        let response = self.transport.send(&self.endpoint, &request)?;
        parse_edit_response(&response)
    }
}
