//! ChangeSet: the ordered patches for one document, and the coalescer
//!
//! A change set always holds the minimal list of substitutions that takes
//! the original page to its current state. New observations are folded in
//! by [`ChangeSet::coalesce`]:
//!
//! 1. **Continuation** - an existing patch whose `after` equals the new
//!    edit's `before` is extended in place.
//! 2. **Full revert** - an existing patch whose `before` equals the new
//!    edit's `after` is removed.
//! 3. **New change** - otherwise the edit is appended.
//!
//! # Example
//!
//! ```
//! use edity_core::{ChangeSet, DocumentKey, Edit};
//!
//! let key = DocumentKey::from_url("https://example.com/page").unwrap();
//! let mut changes = ChangeSet::new(key);
//!
//! changes.coalesce(Edit::new("<p>A</p>", "<p>B</p>").unwrap());
//! changes.coalesce(Edit::new("<p>B</p>", "<p>C</p>").unwrap());
//!
//! assert_eq!(changes.len(), 1);
//! assert_eq!(changes.patches()[0].after(), "<p>C</p>");
//! ```

use crate::key::DocumentKey;
use crate::patch::{Edit, Patch};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// What folding an edit did to the change set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coalesced {
    /// The patch at `index` now ends at the edit's `after`
    Continued { index: usize },

    /// The edit returned a fragment to its original markup; the patch that
    /// used to sit at `index` was removed
    Reverted { index: usize, removed: Patch },

    /// A new patch was appended at `index`
    Appended { index: usize },
}

impl Coalesced {
    /// Change to the number of live patches on the page
    pub fn live_delta(&self) -> isize {
        match self {
            Coalesced::Continued { .. } => 0,
            Coalesced::Reverted { .. } => -1,
            Coalesced::Appended { .. } => 1,
        }
    }
}

/// Ordered patches associated with one document key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    key: DocumentKey,
    patches: Vec<Patch>,
}

impl ChangeSet {
    /// Create an empty change set
    pub fn new(key: DocumentKey) -> Self {
        Self {
            key,
            patches: Vec::new(),
        }
    }

    /// Create a change set from already validated patches
    pub fn with_patches(key: DocumentKey, patches: Vec<Patch>) -> Self {
        Self { key, patches }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn patches(&self) -> &[Patch] {
        &self.patches
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Patch> {
        self.patches.iter()
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Drop every patch
    pub fn clear(&mut self) {
        self.patches.clear();
    }

    /// Fold a new observation into the change set
    pub fn coalesce(&mut self, edit: Edit) -> Coalesced {
        let continued: Vec<usize> = self
            .positions(|patch| patch.after == edit.before)
            .collect();

        if let Some(&index) = continued.first() {
            self.flag_ambiguous("continuation", &continued);

            // A chain of edits that lands back on the original markup is
            // no longer a change.
            if self.patches[index].before == edit.after {
                let removed = self.patches.remove(index);
                debug!(key = %self.key, index, "continuation reverted patch");
                return Coalesced::Reverted { index, removed };
            }

            self.patches[index].after = edit.after;
            debug!(key = %self.key, index, "continued patch");
            return Coalesced::Continued { index };
        }

        let reverted: Vec<usize> = self
            .positions(|patch| patch.before == edit.after)
            .collect();

        if let Some(&index) = reverted.first() {
            self.flag_ambiguous("revert", &reverted);

            let removed = self.patches.remove(index);
            debug!(key = %self.key, index, "reverted patch");
            return Coalesced::Reverted { index, removed };
        }

        self.patches.push(edit.into());
        let index = self.patches.len() - 1;
        debug!(key = %self.key, index, "appended patch");
        Coalesced::Appended { index }
    }

    /// Fold several observations, in order
    pub fn coalesce_all<I>(&mut self, edits: I) -> Vec<Coalesced>
    where
        I: IntoIterator<Item = Edit>,
    {
        edits.into_iter().map(|edit| self.coalesce(edit)).collect()
    }

    /// `before` fragments shared by more than one patch
    ///
    /// Sequential use never produces these; a non-empty result means the
    /// stored record was written by something else.
    pub fn duplicate_befores(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for patch in &self.patches {
            if !seen.insert(patch.before.as_str()) && !duplicates.contains(&patch.before.as_str()) {
                duplicates.push(patch.before.as_str());
            }
        }
        duplicates
    }

    fn positions<'a, P>(&'a self, mut pred: P) -> impl Iterator<Item = usize> + 'a
    where
        P: FnMut(&Patch) -> bool + 'a,
    {
        self.patches
            .iter()
            .enumerate()
            .filter(move |(_, patch)| pred(patch))
            .map(|(index, _)| index)
    }

    fn flag_ambiguous(&self, rule: &str, matches: &[usize]) {
        if matches.len() > 1 {
            warn!(
                key = %self.key,
                rule,
                matches = ?matches,
                "several patches match one edit; applying to the first"
            );
        }
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Patch;
    type IntoIter = std::slice::Iter<'a, Patch>;

    fn into_iter(self) -> Self::IntoIter {
        self.patches.iter()
    }
}
