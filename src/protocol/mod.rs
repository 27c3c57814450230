//! Messages between the content and background contexts
//!
//! The extension host moves JSON between a page's content context and the
//! background context. Each direction has its own tagged enum, keyed by
//! the `method` field, and a handler that matches on it exhaustively:
//!
//! - [`BackgroundRequest`] handled by [`Background`]
//! - [`ContentRequest`] handled by [`ContentPage`]

mod background;
mod content;

pub use background::{Background, Sender, TabId};
pub use content::ContentPage;

use crate::patch::Patch;
use serde::{Deserialize, Serialize};

/// Requests the content context sends to the background
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum BackgroundRequest {
    /// Does the sender's page have stored edits?
    IsEdited,

    /// Refresh the toolbar icon for the sender's page
    UpdateIcon { domain: String },

    /// Show `text` on the sender tab's badge
    UpdateBadge { text: String },

    /// Current badge text of the sender tab
    GetBadge,

    /// Record the sender's page as edited
    #[serde(rename = "updateEditedURLs")]
    UpdateEditedUrls,

    /// Stored patches for the sender's page
    GetEdits,

    /// Persist the full patch list of a page
    SaveEdits { data: SaveEdits },

    /// The user asked to edit the sender's page
    Edit,
}

/// Requests the background sends to a content context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum ContentRequest {
    /// Enter editing mode with the session's edit token
    StartEdit {
        #[serde(default, rename = "editToken")]
        token: Option<String>,
    },

    #[serde(rename = "sendURL")]
    SendUrl,

    SendDomain,
}

/// Payload of a save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveEdits {
    pub url: String,

    pub edits: Vec<Patch>,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub minor: bool,
}

/// Toolbar icon state of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Icon {
    Editable,
    Protected,
}

/// Replies to either kind of request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    Ack,
    Edited { edited: bool },
    Icon { icon: Icon },
    Badge { text: String },
    Edits { edits: Vec<Patch> },
    Saved { revision: Option<u64>, live: usize },
    StartEdit { token: String },
    Url { url: String },
    Domain { domain: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_names() {
        let request: BackgroundRequest =
            serde_json::from_value(json!({"method": "updateBadge", "text": "3"})).unwrap();
        assert_eq!(request, BackgroundRequest::UpdateBadge { text: "3".to_string() });

        let request: BackgroundRequest =
            serde_json::from_value(json!({"method": "updateEditedURLs"})).unwrap();
        assert_eq!(request, BackgroundRequest::UpdateEditedUrls);

        let request: ContentRequest = serde_json::from_value(json!({"method": "sendURL"})).unwrap();
        assert_eq!(request, ContentRequest::SendUrl);
    }

    #[test]
    fn test_save_edits_payload() {
        let request: BackgroundRequest = serde_json::from_value(json!({
            "method": "saveEdits",
            "data": {
                "url": "https://example.com/#x",
                "edits": [{"oldHTML": "<p>a</p>", "newHTML": "<p>b</p>"}],
                "summary": "typo",
                "minor": true
            }
        }))
        .unwrap();
        match request {
            BackgroundRequest::SaveEdits { data } => {
                assert_eq!(data.edits.len(), 1);
                assert!(data.minor);
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_unknown_method_rejected() {
        let result: Result<BackgroundRequest, _> =
            serde_json::from_value(json!({"method": "deleteEverything"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_start_edit_token() {
        let request: ContentRequest =
            serde_json::from_value(json!({"method": "startEdit", "editToken": "t"})).unwrap();
        assert_eq!(request, ContentRequest::StartEdit { token: Some("t".to_string()) });
    }
}
