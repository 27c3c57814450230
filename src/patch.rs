//! Patch: one coalesced edit to a region of a document
//!
//! A patch is a whole-fragment substitution. `before` is the serialized
//! outer markup of an element prior to editing and `after` is the markup
//! once editing ended. A patch whose fragments are equal would be a no-op
//! and is never constructed.

use crate::error::{EdityError, Result};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A before/after fragment pair
///
/// Serialized with the wire names `oldHTML` and `newHTML`. Deserializing
/// goes through [`Patch::new`], so a no-op pair is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PatchRecord")]
pub struct Patch {
    #[serde(rename = "oldHTML")]
    pub(crate) before: String,

    #[serde(rename = "newHTML")]
    pub(crate) after: String,
}

impl Patch {
    /// Create a patch, refusing identical fragments
    pub fn new(before: impl Into<String>, after: impl Into<String>) -> Result<Self> {
        let before = before.into();
        let after = after.into();
        if before == after {
            return Err(EdityError::NoOpEdit);
        }
        Ok(Self { before, after })
    }

    /// Markup the patch looks for
    pub fn before(&self) -> &str {
        &self.before
    }

    /// Markup the patch substitutes
    pub fn after(&self) -> &str {
        &self.after
    }

    /// Consume the patch into its `(before, after)` pair
    pub fn into_parts(self) -> (String, String) {
        (self.before, self.after)
    }
}

/// An observed edit of one element, not yet folded into a change set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub before: String,
    pub after: String,
}

impl Edit {
    /// Returns `None` for a no-op edit
    pub fn new(before: impl Into<String>, after: impl Into<String>) -> Option<Self> {
        let before = before.into();
        let after = after.into();
        (before != after).then_some(Self { before, after })
    }
}

/// One stored `{"oldHTML": ..., "newHTML": ...}` record, not yet checked
///
/// Only the object form is accepted, with exactly those two string fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PatchRecord {
    pub before: String,
    pub after: String,
}

const RECORD_FIELDS: &[&str] = &["oldHTML", "newHTML"];

impl<'de> Deserialize<'de> for PatchRecord {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(RecordVisitor)
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = PatchRecord;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object with string fields oldHTML and newHTML")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<PatchRecord, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut before: Option<String> = None;
        let mut after: Option<String> = None;

        while let Some(field) = map.next_key::<String>()? {
            let slot = match field.as_str() {
                "oldHTML" => &mut before,
                "newHTML" => &mut after,
                other => return Err(de::Error::unknown_field(other, RECORD_FIELDS)),
            };
            if slot.is_some() {
                return Err(de::Error::custom(format!("duplicate field `{}`", field)));
            }
            *slot = Some(map.next_value()?);
        }

        Ok(PatchRecord {
            before: before.ok_or_else(|| de::Error::missing_field("oldHTML"))?,
            after: after.ok_or_else(|| de::Error::missing_field("newHTML"))?,
        })
    }
}

impl TryFrom<PatchRecord> for Patch {
    type Error = EdityError;

    fn try_from(record: PatchRecord) -> Result<Self> {
        Patch::new(record.before, record.after)
    }
}

impl From<Edit> for Patch {
    fn from(edit: Edit) -> Self {
        Patch {
            before: edit.before,
            after: edit.after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_patch_refused() {
        assert!(matches!(Patch::new("<p>a</p>", "<p>a</p>"), Err(EdityError::NoOpEdit)));
        assert!(Edit::new("<p>a</p>", "<p>a</p>").is_none());
    }

    #[test]
    fn test_wire_names() {
        let patch = Patch::new("<p>old</p>", "<p>new</p>").unwrap();
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"oldHTML":"<p>old</p>","newHTML":"<p>new</p>"}"#);
    }

    #[test]
    fn test_deserialize_checks_noop() {
        let patch: Patch =
            serde_json::from_str(r#"{"oldHTML":"<p>a</p>","newHTML":"<p>b</p>"}"#).unwrap();
        assert_eq!(patch, Patch::new("<p>a</p>", "<p>b</p>").unwrap());

        let noop = serde_json::from_str::<Patch>(r#"{"oldHTML":"<p>a</p>","newHTML":"<p>a</p>"}"#);
        assert!(noop.is_err());
    }

    #[test]
    fn test_record_accepts_object_form_only() {
        assert!(serde_json::from_str::<PatchRecord>(r#"["<p>a</p>","<p>b</p>"]"#).is_err());
        assert!(serde_json::from_str::<Patch>(r#"["<p>a</p>","<p>b</p>"]"#).is_err());
        assert!(serde_json::from_str::<PatchRecord>(r#"{"oldHTML":"a","newHTML":"b","x":1}"#).is_err());
        assert!(serde_json::from_str::<PatchRecord>(r#"{"oldHTML":"a","oldHTML":"c","newHTML":"b"}"#).is_err());
        assert!(serde_json::from_str::<PatchRecord>(r#"{"oldHTML":"a"}"#).is_err());
        assert!(serde_json::from_str::<PatchRecord>(r#"{"oldHTML":1,"newHTML":"b"}"#).is_err());
    }

    #[test]
    fn test_edit_into_patch() {
        let patch: Patch = Edit::new("A", "B").unwrap().into();
        assert_eq!(patch.before(), "A");
        assert_eq!(patch.after(), "B");
    }
}
