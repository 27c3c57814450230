//! JavaScript bindings for Edity core types
//!
//! The extension host owns the network and the DOM; these wrappers take
//! and return plain strings and JSON so the host can drive a page session
//! without seeing Rust types.

use crate::config::EdityConfig;
use crate::key::DocumentKey;
use crate::protocol::{ContentPage, ContentRequest};
use crate::registry::PageRegistry;
use crate::replay::replay;
use crate::session::{LoadTicket, PageSession};
use crate::storage::codec::{decode_payload, encode_payload};
use wasm_bindgen::prelude::*;

fn parse_config(config_json: Option<String>) -> Result<EdityConfig, JsValue> {
    match config_json {
        Some(json) => EdityConfig::from_json(&json)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e))),
        None => Ok(EdityConfig::default()),
    }
}

/// JavaScript-friendly wrapper for PageSession
#[wasm_bindgen]
pub struct WasmSession {
    inner: PageSession,
}

#[wasm_bindgen]
impl WasmSession {
    /// Start a session on `url`, with an optional JSON config
    #[wasm_bindgen(constructor)]
    pub fn new(url: String, config_json: Option<String>) -> Result<WasmSession, JsValue> {
        let config = parse_config(config_json)?;
        let inner = PageSession::new(&url, &config)
            .map_err(|e| JsValue::from_str(&format!("Invalid page: {}", e)))?;
        Ok(Self { inner })
    }

    /// Session id
    #[wasm_bindgen(js_name = getId)]
    pub fn get_id(&self) -> String {
        self.inner.id().to_string()
    }

    /// Document key of the current page
    #[wasm_bindgen(js_name = getKey)]
    pub fn get_key(&self) -> String {
        self.inner.key().to_string()
    }

    /// Start loading; returns the ticket as a JSON string
    ///
    /// The host fetches the payload for the ticket's key and hands both
    /// back to `finishLoad`.
    #[wasm_bindgen(js_name = beginLoad)]
    pub fn begin_load(&mut self) -> Result<String, JsValue> {
        let ticket = self.inner.begin_load();
        serde_json::to_string(&ticket)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Complete a load with the stored payload and the page markup
    ///
    /// Returns the rewritten markup, or `undefined` when the ticket is
    /// stale because the session moved on.
    #[wasm_bindgen(js_name = finishLoad)]
    pub fn finish_load(
        &mut self,
        ticket_json: String,
        payload: String,
        content: String,
    ) -> Result<Option<String>, JsValue> {
        let ticket: LoadTicket = serde_json::from_str(&ticket_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid ticket: {}", e)))?;
        let changes = decode_payload(&ticket.key, &payload);
        let replayed = self.inner.finish_load(&ticket, changes, &content);
        if replayed.is_none() {
            crate::console_warn!("discarded load of {} for a previous page", ticket.key);
        }
        Ok(replayed.map(|replayed| replayed.content))
    }

    /// Give up on a load, e.g. after a network failure
    #[wasm_bindgen(js_name = abandonLoad)]
    pub fn abandon_load(&mut self, ticket_json: String) -> Result<(), JsValue> {
        let ticket: LoadTicket = serde_json::from_str(&ticket_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid ticket: {}", e)))?;
        self.inner.abandon_load(&ticket);
        Ok(())
    }

    /// Snapshot an element when editing starts on it
    #[wasm_bindgen(js_name = observe)]
    pub fn observe(&mut self, element_id: String, outer_html: String) -> bool {
        self.inner.observe(&element_id, &outer_html)
    }

    /// Discard the editing pass; returns `[[id, html], ...]` to restore
    #[wasm_bindgen(js_name = cancelEdits)]
    pub fn cancel_edits(&mut self) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.cancel_edits())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Record one committed edit; returns whether it changed anything
    #[wasm_bindgen(js_name = capture)]
    pub fn capture(&mut self, before: String, after: String) -> bool {
        self.inner.capture(&before, &after).is_some()
    }

    #[wasm_bindgen(js_name = liveCount)]
    pub fn live_count(&self) -> usize {
        self.inner.live_count()
    }

    #[wasm_bindgen(js_name = badgeText)]
    pub fn badge_text(&self) -> String {
        self.inner.badge_text()
    }

    #[wasm_bindgen(js_name = setToken)]
    pub fn set_token(&mut self, token: String) {
        self.inner.set_token(token);
    }

    #[wasm_bindgen(js_name = navigate)]
    pub fn navigate(&mut self, url: String) -> Result<(), JsValue> {
        self.inner
            .navigate(&url)
            .map_err(|e| JsValue::from_str(&format!("Invalid page: {}", e)))
    }

    /// Stored payload for the current change set
    #[wasm_bindgen(js_name = toPayload)]
    pub fn to_payload(&self) -> Result<String, JsValue> {
        encode_payload(self.inner.changes())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Export the change set as JSON string
    #[wasm_bindgen(js_name = toJSON)]
    pub fn to_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.inner.changes())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}

/// JavaScript-friendly wrapper for ContentPage
#[wasm_bindgen]
pub struct WasmContentPage {
    inner: ContentPage,
}

#[wasm_bindgen]
impl WasmContentPage {
    #[wasm_bindgen(constructor)]
    pub fn new(url: String, config_json: Option<String>) -> Result<WasmContentPage, JsValue> {
        let config = parse_config(config_json)?;
        let inner = ContentPage::new(&url, &config)
            .map_err(|e| JsValue::from_str(&format!("Invalid page: {}", e)))?;
        Ok(Self { inner })
    }

    /// Handle a request message from the background (JSON in, JSON out)
    #[wasm_bindgen(js_name = handle)]
    pub fn handle(&mut self, request_json: String) -> Result<String, JsValue> {
        let request: ContentRequest = serde_json::from_str(&request_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid message: {}", e)))?;
        let response = self.inner.handle(request);
        serde_json::to_string(&response)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(js_name = isEditing)]
    pub fn is_editing(&self) -> bool {
        self.inner.is_editing()
    }

    /// Badge update message for the background
    #[wasm_bindgen(js_name = badgeRequest)]
    pub fn badge_request(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.badge_request())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Save message for the background carrying the full patch list
    #[wasm_bindgen(js_name = saveRequest)]
    pub fn save_request(&self, summary: String, minor: bool) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.save_request(&summary, minor))
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(js_name = capture)]
    pub fn capture(&mut self, before: String, after: String) -> bool {
        self.inner.session_mut().capture(&before, &after).is_some()
    }
}

/// Canonical document key for a URL
#[wasm_bindgen(js_name = documentKey)]
pub fn document_key(url: String) -> Result<String, JsValue> {
    DocumentKey::from_url(&url)
        .map(|key| key.to_string())
        .map_err(|e| JsValue::from_str(&format!("Invalid URL: {}", e)))
}

/// Replay a stored payload against `content`; returns the rewritten markup
///
/// A malformed payload replays as no patches.
#[wasm_bindgen(js_name = replayPayload)]
pub fn replay_payload(url: String, payload: String, content: String) -> Result<String, JsValue> {
    let key = DocumentKey::from_url(&url)
        .map_err(|e| JsValue::from_str(&format!("Invalid URL: {}", e)))?;
    let changes = decode_payload(&key, &payload);
    Ok(replay(&content, &changes).content)
}

/// Pick a random page from a JSON array of edited URLs
#[wasm_bindgen(js_name = randomEditedPage)]
pub fn random_edited_page(urls_json: String) -> Result<Option<String>, JsValue> {
    let urls: Vec<String> = serde_json::from_str(&urls_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid JSON: {}", e)))?;
    let mut registry = PageRegistry::default();
    registry.replace_edited(urls.iter().filter_map(|url| DocumentKey::from_url(url).ok()));
    Ok(registry
        .pick_edited(js_sys::Math::random())
        .map(|key| key.to_string()))
}
