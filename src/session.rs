//! Page session: all state tied to one loaded page
//!
//! A session owns the change set of the current document, the live count
//! shown to the user, the edit token and the snapshots of an editing pass.
//! It is created when the content side starts on a page and reset on
//! navigation.
//!
//! Loads are asynchronous in the host. [`PageSession::begin_load`] hands
//! out a [`LoadTicket`] naming the session, navigation generation and key
//! the load was issued for; [`PageSession::finish_load`] drops any result
//! whose ticket no longer matches, so a change set fetched for a previous
//! page is never replayed onto the next one.

use crate::capture::{Capture, EditBuffer};
use crate::changeset::{ChangeSet, Coalesced};
use crate::config::EdityConfig;
use crate::error::Result;
use crate::key::{DocumentKey, KeyPolicy};
use crate::patch::Edit;
use crate::replay::{replay, Replay};
use crate::storage::{SaveMeta, SaveReceipt, SyncGateway};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Identity of an in-flight load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadTicket {
    pub session: Uuid,
    pub generation: u64,
    pub key: DocumentKey,
}

#[derive(Debug)]
pub struct PageSession {
    id: Uuid,
    generation: u64,
    policy: KeyPolicy,
    key: DocumentKey,
    changes: ChangeSet,
    live_count: usize,
    loaded: bool,
    pending: Option<LoadTicket>,
    token: Option<String>,
    buffer: EditBuffer,
}

impl PageSession {
    /// Start a session on the page at `url`
    pub fn new(url: &str, config: &EdityConfig) -> Result<Self> {
        let key = DocumentKey::with_policy(url, config.key)?;
        let id = Uuid::new_v4();
        debug!(session = %id, key = %key, "session started");
        Ok(Self {
            id,
            generation: 0,
            policy: config.key,
            changes: ChangeSet::new(key.clone()),
            key,
            live_count: 0,
            loaded: false,
            pending: None,
            token: None,
            buffer: EditBuffer::new(Capture::new(config.markers.clone())),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Number of stored patches currently in effect on the page
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Whether a change set has been replayed for the current page
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn pending(&self) -> Option<&LoadTicket> {
        self.pending.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Remember the edit token for the rest of the session
    pub fn set_token(&mut self, token: impl Into<String>) {
        self.token = Some(token.into());
    }

    /// Badge text: the live count, or nothing when no patch is live
    pub fn badge_text(&self) -> String {
        if self.live_count > 0 {
            self.live_count.to_string()
        } else {
            String::new()
        }
    }

    /// Move to another page, dropping all page state and any pending load
    pub fn navigate(&mut self, url: &str) -> Result<()> {
        let key = DocumentKey::with_policy(url, self.policy)?;
        self.generation += 1;
        self.changes = ChangeSet::new(key.clone());
        self.key = key;
        self.live_count = 0;
        self.loaded = false;
        self.pending = None;
        self.buffer.cancel();
        debug!(session = %self.id, generation = self.generation, key = %self.key, "navigated");
        Ok(())
    }

    /// Issue a load for the current page
    pub fn begin_load(&mut self) -> LoadTicket {
        let ticket = LoadTicket {
            session: self.id,
            generation: self.generation,
            key: self.key.clone(),
        };
        self.pending = Some(ticket.clone());
        ticket
    }

    /// Complete a load: replay `changes` onto `content` if the ticket is
    /// still current, otherwise discard the result and return `None`
    pub fn finish_load(&mut self, ticket: &LoadTicket, changes: ChangeSet, content: &str) -> Option<Replay> {
        if self.pending.as_ref() != Some(ticket) || changes.key() != &ticket.key {
            debug!(
                session = %self.id,
                ticket_generation = ticket.generation,
                generation = self.generation,
                "discarding stale load result"
            );
            return None;
        }
        self.pending = None;
        Some(self.apply_loaded(changes, content))
    }

    /// Give up on a load that failed; page state stays as it was
    pub fn abandon_load(&mut self, ticket: &LoadTicket) {
        if self.pending.as_ref() == Some(ticket) {
            self.pending = None;
        }
    }

    /// Load and replay synchronously through `gateway`
    pub fn load_with<G: SyncGateway>(&mut self, gateway: &mut G, content: &str) -> Result<Replay> {
        let ticket = self.begin_load();
        let loaded = gateway.load(&ticket.key);
        self.abandon_load(&ticket);
        Ok(self.apply_loaded(loaded?, content))
    }

    fn apply_loaded(&mut self, changes: ChangeSet, content: &str) -> Replay {
        let result = replay(content, &changes);
        info!(
            key = %self.key,
            live = result.report.live_count(),
            stored = changes.len(),
            "replayed stored changes"
        );
        self.live_count = result.report.live_count();
        self.changes = changes;
        self.loaded = true;
        result
    }

    /// Record the markup of an element the user is about to edit
    pub fn observe(&mut self, element_id: &str, outer_html: &str) -> bool {
        self.buffer.observe(element_id, outer_html)
    }

    /// Elements changed during the current editing pass
    pub fn edited_elements<F>(&self, current: F) -> Vec<String>
    where
        F: FnMut(&str) -> Option<String>,
    {
        self.buffer.edited(current)
    }

    /// Abandon the editing pass; returns the markup to restore per element
    pub fn cancel_edits(&mut self) -> Vec<(String, String)> {
        self.buffer.cancel()
    }

    /// Fold one edit into the change set
    pub fn commit(&mut self, edit: Edit) -> Coalesced {
        let outcome = self.changes.coalesce(edit);
        self.live_count = self.live_count.saturating_add_signed(outcome.live_delta());
        outcome
    }

    /// Capture and commit a single before/after pair
    ///
    /// A pair that is identical once editor markers are stripped leaves
    /// the change set untouched and returns `None`.
    pub fn capture(&mut self, before: &str, after: &str) -> Option<Coalesced> {
        let edit = self.buffer.capture().capture(before, after)?;
        Some(self.commit(edit))
    }

    /// End the editing pass, committing every changed element
    pub fn finish_edits<F>(&mut self, current: F) -> Vec<Coalesced>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let edits = self.buffer.finish(current);
        edits.into_iter().map(|edit| self.commit(edit)).collect()
    }

    /// Persist the full change set; on failure nothing local changes
    pub fn save_with<G: SyncGateway>(&self, gateway: &mut G, summary: &str, minor: bool) -> Result<SaveReceipt> {
        let mut meta = SaveMeta::new(summary, minor);
        meta.token = self.token.clone();
        let receipt = gateway.save(&self.changes, &meta)?;
        info!(key = %self.key, patches = self.changes.len(), revision = ?receipt.revision, "saved changes");
        Ok(receipt)
    }
}
