//! Storage boundary
//!
//! The remote store is a versioned, wiki-style backend reached through an
//! external transport. The core owns the contract and the validation of
//! what crosses it:
//!
//! - [`SyncGateway`] - `load` a change set for a key, `save` one in full
//! - [`codec`] - the JSON patch-list payload, decoded leniently
//! - [`wiki`] - request/response shapes of the wiki API
//! - [`memory`] - a versioned in-memory gateway
//!
//! A gateway's `load` never fails because of what is stored: a missing
//! page, `null`, unparsable text or any other malformed shape all load as
//! an empty change set. Only a transport failure is an error.

pub mod codec;
pub mod memory;
pub mod wiki;

pub use memory::MemoryGateway;
pub use wiki::{WikiGateway, WikiRequest, WikiTransport};

use crate::changeset::ChangeSet;
use crate::error::Result;
use crate::key::DocumentKey;
use serde::{Deserialize, Serialize};

/// Metadata sent along with a save
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveMeta {
    /// Edit summary shown in the page history
    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub minor: bool,

    /// Authorization token obtained once per session
    #[serde(default)]
    pub token: Option<String>,
}

impl SaveMeta {
    pub fn new(summary: impl Into<String>, minor: bool) -> Self {
        Self {
            summary: summary.into(),
            minor,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Acknowledgement of a successful save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReceipt {
    /// Revision created by the save, when the backend reports one
    pub revision: Option<u64>,
}

/// Load/save boundary to the remote store
pub trait SyncGateway {
    /// Load the change set stored for `key`
    ///
    /// Returns an empty change set for anything stored that is not a valid
    /// patch list.
    fn load(&mut self, key: &DocumentKey) -> Result<ChangeSet>;

    /// Persist the full patch list of `changes` under its key
    ///
    /// On failure the caller keeps its in-memory change set unchanged.
    fn save(&mut self, changes: &ChangeSet, meta: &SaveMeta) -> Result<SaveReceipt>;
}

/// Supplies the authorization token sent with saves
pub trait TokenSource {
    fn fetch_token(&mut self) -> Result<String>;
}

impl<G: SyncGateway + ?Sized> SyncGateway for &mut G {
    fn load(&mut self, key: &DocumentKey) -> Result<ChangeSet> {
        (**self).load(key)
    }

    fn save(&mut self, changes: &ChangeSet, meta: &SaveMeta) -> Result<SaveReceipt> {
        (**self).save(changes, meta)
    }
}
