//! Patch-list payload codec
//!
//! The stored shape is a JSON array of `{"oldHTML": ..., "newHTML": ...}`
//! records. An empty array is the canonical "no edits"; `null` means the
//! same. Anything else that does not decode as such a list is treated as
//! a corrupt or vandalized record.

use crate::changeset::ChangeSet;
use crate::error::{EdityError, Result};
use crate::key::DocumentKey;
use crate::patch::{Patch, PatchRecord};
use std::collections::HashSet;
use tracing::warn;

/// Decode a payload, failing on anything that is not a patch list
///
/// Well-formed records that could never have been produced by sequential
/// editing are dropped rather than rejected: no-op records, and records
/// repeating an earlier `before` (the first one wins).
pub fn decode_strict(payload: &str) -> Result<Vec<Patch>> {
    let records: Option<Vec<PatchRecord>> = serde_json::from_str(payload)
        .map_err(|e| EdityError::MalformedRecord(e.to_string()))?;

    Ok(sanitize(
        records
            .unwrap_or_default()
            .into_iter()
            .map(|record| (record.before, record.after)),
    ))
}

/// Build patches from untrusted pairs, dropping no-op pairs and pairs
/// whose `before` repeats an earlier one
pub fn sanitize<I>(pairs: I) -> Vec<Patch>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut seen = HashSet::new();
    pairs
        .into_iter()
        .filter_map(|(before, after)| {
            if before == after {
                return None;
            }
            if !seen.insert(before.clone()) {
                warn!(before = %before, "dropping record with duplicate before fragment");
                return None;
            }
            Patch::new(before, after).ok()
        })
        .collect()
}

/// Decode a payload into a change set for `key`, degrading every failure
/// to an empty change set
pub fn decode_payload(key: &DocumentKey, payload: &str) -> ChangeSet {
    match decode_strict(payload) {
        Ok(patches) => ChangeSet::with_patches(key.clone(), patches),
        Err(e) => {
            warn!(key = %key, error = %e, "stored changes unreadable, treating as empty");
            ChangeSet::new(key.clone())
        }
    }
}

/// Encode patches into the stored payload
pub fn encode_payload<'a, I>(patches: I) -> Result<String>
where
    I: IntoIterator<Item = &'a Patch>,
{
    let patches: Vec<&Patch> = patches.into_iter().collect();
    Ok(serde_json::to_string(&patches)?)
}
