//! In-memory versioned gateway
//!
//! Keeps every saved revision per key, newest last, the way the wiki
//! backend does. Used by tests and as an offline store.

use super::codec::{decode_payload, encode_payload};
use super::{SaveMeta, SaveReceipt, SyncGateway, TokenSource};
use crate::changeset::ChangeSet;
use crate::error::{EdityError, Result};
use crate::key::DocumentKey;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

/// One stored revision of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub id: u64,
    pub payload: String,
    pub summary: String,
    pub minor: bool,
}

#[derive(Debug, Default)]
pub struct MemoryGateway {
    pages: HashMap<DocumentKey, Vec<Revision>>,
    next_revision: u64,
    offline: bool,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the backend being unreachable
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Store a raw payload as a new revision, bypassing the codec
    pub fn put_raw(&mut self, key: &DocumentKey, payload: impl Into<String>) -> u64 {
        self.push_revision(key, payload.into(), String::new(), false)
    }

    /// Every revision stored for `key`, oldest first
    pub fn history(&self, key: &DocumentKey) -> &[Revision] {
        self.pages.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Keys with at least one revision
    pub fn keys(&self) -> impl Iterator<Item = &DocumentKey> {
        self.pages.keys()
    }

    fn push_revision(&mut self, key: &DocumentKey, payload: String, summary: String, minor: bool) -> u64 {
        self.next_revision += 1;
        let id = self.next_revision;
        self.pages.entry(key.clone()).or_default().push(Revision {
            id,
            payload,
            summary,
            minor,
        });
        id
    }

    fn check_online(&self) -> Result<()> {
        if self.offline {
            return Err(EdityError::RemoteUnavailable("memory gateway offline".to_string()));
        }
        Ok(())
    }
}

impl SyncGateway for MemoryGateway {
    fn load(&mut self, key: &DocumentKey) -> Result<ChangeSet> {
        self.check_online()?;
        let changes = match self.pages.get(key).and_then(|revisions| revisions.last()) {
            Some(revision) => decode_payload(key, &revision.payload),
            None => ChangeSet::new(key.clone()),
        };
        debug!(key = %key, patches = changes.len(), "loaded from memory");
        Ok(changes)
    }

    fn save(&mut self, changes: &ChangeSet, meta: &SaveMeta) -> Result<SaveReceipt> {
        self.check_online()?;
        let payload = encode_payload(changes)?;
        let id = self.push_revision(changes.key(), payload, meta.summary.clone(), meta.minor);
        debug!(key = %changes.key(), revision = id, "saved to memory");
        Ok(SaveReceipt { revision: Some(id) })
    }
}

impl TokenSource for MemoryGateway {
    fn fetch_token(&mut self) -> Result<String> {
        self.check_online()?;
        Ok(Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::Edit;

    fn key() -> DocumentKey {
        DocumentKey::from_canonical("https://example.com/a")
    }

    #[test]
    fn test_missing_page_is_empty() {
        let mut gateway = MemoryGateway::new();
        let changes = gateway.load(&key()).unwrap();
        assert!(changes.is_empty());
        assert_eq!(changes.key(), &key());
    }

    #[test]
    fn test_save_then_load() {
        let mut gateway = MemoryGateway::new();
        let mut changes = ChangeSet::new(key());
        changes.coalesce(Edit::new("<p>a</p>", "<p>b</p>").unwrap());
        changes.coalesce(Edit::new("<p>x</p>", "<p>y</p>").unwrap());

        let receipt = gateway.save(&changes, &SaveMeta::new("typo", true)).unwrap();
        assert_eq!(receipt.revision, Some(1));

        assert_eq!(gateway.load(&key()).unwrap(), changes);

        let history = gateway.history(&key());
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].summary, "typo");
        assert!(history[0].minor);
    }

    #[test]
    fn test_vandalized_revision_loads_empty() {
        let mut gateway = MemoryGateway::new();
        gateway.put_raw(&key(), "lol");
        assert!(gateway.load(&key()).unwrap().is_empty());

        gateway.put_raw(&key(), "null");
        assert!(gateway.load(&key()).unwrap().is_empty());
        assert_eq!(gateway.history(&key()).len(), 2);
    }

    #[test]
    fn test_offline() {
        let mut gateway = MemoryGateway::new();
        gateway.set_offline(true);
        assert!(gateway.load(&key()).unwrap_err().is_remote());
        let changes = ChangeSet::new(key());
        assert!(gateway.save(&changes, &SaveMeta::default()).is_err());
        assert!(gateway.history(&key()).is_empty());
    }
}
