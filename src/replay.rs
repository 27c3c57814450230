//! Replay of stored patches against freshly loaded content
//!
//! Replay is a pure function over strings. Each patch is looked up by a
//! literal, case-sensitive search for its `before` fragment in the content
//! as rewritten by the patches before it; the first occurrence is replaced
//! by `after`. A fragment that is no longer present is skipped: the page
//! changed underneath the patch, which shows up as a live count below the
//! number of stored patches.

use crate::patch::Patch;
use serde::{Deserialize, Serialize};

/// Which patches took effect during one replay
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Indices of applied patches, in application order
    pub applied: Vec<usize>,

    /// Indices of patches whose `before` fragment was not found
    pub stale: Vec<usize>,
}

impl ReplayReport {
    /// Number of patches actually applied
    pub fn live_count(&self) -> usize {
        self.applied.len()
    }

    /// Number of patches considered
    pub fn total(&self) -> usize {
        self.applied.len() + self.stale.len()
    }

    /// Whether some stored patches no longer match the page
    pub fn is_stale(&self) -> bool {
        !self.stale.is_empty()
    }
}

/// Rewritten content together with its report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    pub content: String,
    pub report: ReplayReport,
}

/// Apply `patches` to `content` in order
pub fn replay<'a, I>(content: &str, patches: I) -> Replay
where
    I: IntoIterator<Item = &'a Patch>,
{
    let mut content = content.to_string();
    let mut report = ReplayReport::default();

    for (index, patch) in patches.into_iter().enumerate() {
        match apply_patch(&content, patch) {
            Some(rewritten) => {
                content = rewritten;
                report.applied.push(index);
            }
            None => report.stale.push(index),
        }
    }

    Replay { content, report }
}

/// Replace the first occurrence of `patch.before`, if any
pub fn apply_patch(content: &str, patch: &Patch) -> Option<String> {
    if patch.before.is_empty() {
        return None;
    }
    let start = content.find(patch.before.as_str())?;
    let end = start + patch.before.len();

    let mut out = String::with_capacity(content.len() - patch.before.len() + patch.after.len());
    out.push_str(&content[..start]);
    out.push_str(&patch.after);
    out.push_str(&content[end..]);
    Some(out)
}
