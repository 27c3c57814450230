//! Background context: one per browser profile
//!
//! Serves every tab. Loaded change sets are cached per key so a page is
//! fetched from the backend once per session, and the edit token is
//! fetched once and reused for every save.

use super::{BackgroundRequest, Icon, Response, SaveEdits};
use crate::changeset::ChangeSet;
use crate::config::EdityConfig;
use crate::error::{EdityError, Result};
use crate::key::DocumentKey;
use crate::registry::PageRegistry;
use crate::storage::codec::sanitize;
use crate::storage::{SaveMeta, SyncGateway, TokenSource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub type TabId = u32;

/// Tab a request came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub tab: TabId,
    pub url: String,
}

impl Sender {
    pub fn new(tab: TabId, url: impl Into<String>) -> Self {
        Self {
            tab,
            url: url.into(),
        }
    }
}

pub struct Background<G> {
    gateway: G,
    config: EdityConfig,
    registry: PageRegistry,
    cache: HashMap<DocumentKey, ChangeSet>,
    token: Option<String>,
    badges: HashMap<TabId, String>,
}

impl<G: SyncGateway + TokenSource> Background<G> {
    pub fn new(gateway: G, config: EdityConfig) -> Self {
        Self {
            gateway,
            registry: PageRegistry::new(config.protected.clone()),
            config,
            cache: HashMap::new(),
            token: None,
            badges: HashMap::new(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    pub fn registry(&self) -> &PageRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PageRegistry {
        &mut self.registry
    }

    /// Cached change set of a page, if it was loaded this session
    pub fn cached(&self, key: &DocumentKey) -> Option<&ChangeSet> {
        self.cache.get(key)
    }

    /// Forget cached change sets so the next request refetches them
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Handle one request from a content context
    pub fn handle(&mut self, sender: &Sender, request: BackgroundRequest) -> Result<Response> {
        match request {
            BackgroundRequest::IsEdited => {
                let key = self.key_for(&sender.url)?;
                // Pages not yet known to be edited are asked of the backend
                // once; the answer stays cached for the session.
                let edited = self.registry.is_edited(&key) || !self.load_cached(&key)?.is_empty();
                if edited {
                    self.registry.mark_edited(key);
                }
                Ok(Response::Edited { edited })
            }
            BackgroundRequest::UpdateIcon { domain } => {
                let key = self.key_for(&sender.url)?;
                let icon = if self.registry.is_protected(&key)
                    || self.registry.is_protected_domain(&domain)
                {
                    Icon::Protected
                } else {
                    Icon::Editable
                };
                Ok(Response::Icon { icon })
            }
            BackgroundRequest::UpdateBadge { text } => {
                self.badges.insert(sender.tab, text);
                Ok(Response::Ack)
            }
            BackgroundRequest::GetBadge => Ok(Response::Badge {
                text: self.badges.get(&sender.tab).cloned().unwrap_or_default(),
            }),
            BackgroundRequest::UpdateEditedUrls => {
                let key = self.key_for(&sender.url)?;
                self.registry.mark_edited(key);
                Ok(Response::Ack)
            }
            BackgroundRequest::GetEdits => {
                let key = self.key_for(&sender.url)?;
                let changes = self.load_cached(&key)?;
                Ok(Response::Edits {
                    edits: changes.patches().to_vec(),
                })
            }
            BackgroundRequest::SaveEdits { data } => self.save(data),
            BackgroundRequest::Edit => {
                let key = self.key_for(&sender.url)?;
                if self.registry.is_protected(&key) {
                    return Err(EdityError::Protected(key.to_string()));
                }
                let token = self.ensure_token()?;
                Ok(Response::StartEdit { token })
            }
        }
    }

    fn key_for(&self, url: &str) -> Result<DocumentKey> {
        DocumentKey::with_policy(url, self.config.key)
    }

    fn load_cached(&mut self, key: &DocumentKey) -> Result<&ChangeSet> {
        if !self.cache.contains_key(key) {
            let changes = self.gateway.load(key)?;
            debug!(key = %key, patches = changes.len(), "cached change set");
            self.cache.insert(key.clone(), changes);
        }
        self.cache
            .get(key)
            .ok_or_else(|| EdityError::RemoteUnavailable(format!("no cached changes for {}", key)))
    }

    fn ensure_token(&mut self) -> Result<String> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        let token = self.gateway.fetch_token()?;
        debug!("obtained edit token");
        self.token = Some(token.clone());
        Ok(token)
    }

    fn save(&mut self, data: SaveEdits) -> Result<Response> {
        let key = self.key_for(&data.url)?;
        if self.registry.is_protected(&key) {
            warn!(key = %key, "refusing to save protected page");
            return Err(EdityError::Protected(key.to_string()));
        }

        let submitted = data.edits.len();
        let patches = sanitize(data.edits.into_iter().map(|patch| patch.into_parts()));
        if patches.len() != submitted {
            warn!(key = %key, submitted, kept = patches.len(), "dropped invalid patches from save");
        }
        let changes = ChangeSet::with_patches(key.clone(), patches);

        let summary = if data.summary.trim().is_empty() {
            self.config.default_summary.clone()
        } else {
            data.summary
        };
        let meta = SaveMeta::new(summary, data.minor).with_token(self.ensure_token()?);

        let receipt = self.gateway.save(&changes, &meta)?;
        info!(key = %key, patches = changes.len(), revision = ?receipt.revision, "saved edits");

        let live = changes.len();
        if changes.is_empty() {
            self.registry.unmark_edited(&key);
        } else {
            self.registry.mark_edited(key.clone());
        }
        self.cache.insert(key, changes);

        Ok(Response::Saved {
            revision: receipt.revision,
            live,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Patch;
    use crate::storage::MemoryGateway;

    const PAGE: &str = "https://example.com/article";

    fn background() -> Background<MemoryGateway> {
        let config = EdityConfig {
            protected: vec!["bank.example".to_string()],
            ..EdityConfig::default()
        };
        Background::new(MemoryGateway::new(), config)
    }

    fn sender() -> Sender {
        Sender::new(7, format!("{}#comments", PAGE))
    }

    fn save_request(edits: Vec<Patch>) -> BackgroundRequest {
        BackgroundRequest::SaveEdits {
            data: SaveEdits {
                url: PAGE.to_string(),
                edits,
                summary: String::new(),
                minor: false,
            },
        }
    }

    #[test]
    fn test_badge_per_tab() {
        let mut bg = background();
        bg.handle(&sender(), BackgroundRequest::UpdateBadge { text: "2".to_string() })
            .unwrap();
        assert_eq!(
            bg.handle(&sender(), BackgroundRequest::GetBadge).unwrap(),
            Response::Badge { text: "2".to_string() }
        );
        assert_eq!(
            bg.handle(&Sender::new(8, PAGE), BackgroundRequest::GetBadge).unwrap(),
            Response::Badge { text: String::new() }
        );
    }

    #[test]
    fn test_get_edits_cached() {
        let mut bg = background();
        let key = DocumentKey::from_url(PAGE).unwrap();
        bg.gateway_mut()
            .put_raw(&key, r#"[{"oldHTML":"<p>a</p>","newHTML":"<p>b</p>"}]"#);

        let response = bg.handle(&sender(), BackgroundRequest::GetEdits).unwrap();
        assert_eq!(
            response,
            Response::Edits {
                edits: vec![Patch::new("<p>a</p>", "<p>b</p>").unwrap()]
            }
        );

        // Served from cache even though the backend moved on
        bg.gateway_mut().put_raw(&key, "[]");
        let again = bg.handle(&sender(), BackgroundRequest::GetEdits).unwrap();
        assert_eq!(again, response);

        bg.clear_cache();
        let fresh = bg.handle(&sender(), BackgroundRequest::GetEdits).unwrap();
        assert_eq!(fresh, Response::Edits { edits: vec![] });
    }

    #[test]
    fn test_is_edited_asks_backend_for_unknown_page() {
        let mut bg = background();
        let key = DocumentKey::from_url(PAGE).unwrap();
        bg.gateway_mut()
            .put_raw(&key, r#"[{"oldHTML":"<p>a</p>","newHTML":"<p>b</p>"}]"#);

        assert_eq!(
            bg.handle(&sender(), BackgroundRequest::IsEdited).unwrap(),
            Response::Edited { edited: true }
        );
        assert!(bg.registry().is_edited(&key));
        assert_eq!(bg.cached(&key).map(ChangeSet::len), Some(1));

        let other = Sender::new(9, "https://example.com/untouched");
        assert_eq!(
            bg.handle(&other, BackgroundRequest::IsEdited).unwrap(),
            Response::Edited { edited: false }
        );
    }

    #[test]
    fn test_is_edited_offline_is_an_error() {
        let mut bg = background();
        bg.gateway_mut().set_offline(true);
        let err = bg.handle(&sender(), BackgroundRequest::IsEdited).unwrap_err();
        assert!(err.is_remote());
    }

    #[test]
    fn test_save_marks_edited_and_reuses_token() {
        let mut bg = background();
        let patch = Patch::new("<p>a</p>", "<p>b</p>").unwrap();

        let response = bg.handle(&sender(), save_request(vec![patch.clone()])).unwrap();
        assert_eq!(response, Response::Saved { revision: Some(1), live: 1 });
        assert_eq!(
            bg.handle(&sender(), BackgroundRequest::IsEdited).unwrap(),
            Response::Edited { edited: true }
        );

        let first = bg.handle(&sender(), BackgroundRequest::Edit).unwrap();
        let second = bg.handle(&sender(), BackgroundRequest::Edit).unwrap();
        assert_eq!(first, second);

        bg.handle(&sender(), save_request(vec![])).unwrap();
        assert!(!bg.registry().is_edited(&DocumentKey::from_url(PAGE).unwrap()));
    }

    #[test]
    fn test_save_drops_noop_patches() {
        let mut bg = background();
        let noop = Patch {
            before: "<p>x</p>".to_string(),
            after: "<p>x</p>".to_string(),
        };
        let response = bg
            .handle(&sender(), save_request(vec![noop, Patch::new("a", "b").unwrap()]))
            .unwrap();
        assert_eq!(response, Response::Saved { revision: Some(1), live: 1 });
    }

    #[test]
    fn test_protected_page() {
        let mut bg = background();
        let bank = Sender::new(1, "https://www.bank.example/account");
        assert!(matches!(
            bg.handle(&bank, BackgroundRequest::Edit),
            Err(EdityError::Protected(_))
        ));
        assert_eq!(
            bg.handle(&bank, BackgroundRequest::UpdateIcon { domain: "www.bank.example".to_string() })
                .unwrap(),
            Response::Icon { icon: Icon::Protected }
        );
        assert_eq!(
            bg.handle(&sender(), BackgroundRequest::UpdateIcon { domain: "example.com".to_string() })
                .unwrap(),
            Response::Icon { icon: Icon::Editable }
        );
    }

    #[test]
    fn test_failed_save_keeps_cache() {
        let mut bg = background();
        bg.handle(&sender(), save_request(vec![Patch::new("a", "b").unwrap()]))
            .unwrap();

        bg.gateway_mut().set_offline(true);
        let result = bg.handle(&sender(), save_request(vec![]));
        assert!(result.unwrap_err().is_remote());

        let key = DocumentKey::from_url(PAGE).unwrap();
        assert_eq!(bg.cached(&key).map(ChangeSet::len), Some(1));
        assert!(bg.registry().is_edited(&key));
    }
}
