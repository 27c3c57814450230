//! Content context: one per loaded page

use super::{BackgroundRequest, ContentRequest, Response, SaveEdits};
use crate::config::EdityConfig;
use crate::error::Result;
use crate::session::PageSession;

#[derive(Debug)]
pub struct ContentPage {
    url: String,
    session: PageSession,
    editing: bool,
}

impl ContentPage {
    pub fn new(url: &str, config: &EdityConfig) -> Result<Self> {
        Ok(Self {
            url: url.to_string(),
            session: PageSession::new(url, config)?,
            editing: false,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn session(&self) -> &PageSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut PageSession {
        &mut self.session
    }

    /// Whether the page is in editing mode
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Leave editing mode, discarding the editing pass
    ///
    /// Returns the markup to restore for each element touched.
    pub fn cancel_editing(&mut self) -> Vec<(String, String)> {
        self.editing = false;
        self.session.cancel_edits()
    }

    pub fn navigate(&mut self, url: &str) -> Result<()> {
        self.session.navigate(url)?;
        self.url = url.to_string();
        self.editing = false;
        Ok(())
    }

    /// Handle one request from the background
    pub fn handle(&mut self, request: ContentRequest) -> Response {
        match request {
            ContentRequest::StartEdit { token } => {
                if let Some(token) = token {
                    self.session.set_token(token);
                }
                self.editing = true;
                Response::Ack
            }
            ContentRequest::SendUrl => Response::Url {
                url: self.url.clone(),
            },
            ContentRequest::SendDomain => Response::Domain {
                domain: self.session.key().domain(),
            },
        }
    }

    /// Badge update reflecting the current live count
    pub fn badge_request(&self) -> BackgroundRequest {
        BackgroundRequest::UpdateBadge {
            text: self.session.badge_text(),
        }
    }

    /// Save request carrying the full change set of the page
    pub fn save_request(&self, summary: &str, minor: bool) -> BackgroundRequest {
        BackgroundRequest::SaveEdits {
            data: SaveEdits {
                url: self.url.clone(),
                edits: self.session.changes().patches().to_vec(),
                summary: summary.to_string(),
                minor,
            },
        }
    }
}
