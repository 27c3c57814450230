//! Edity Core - patch model for collaborative page annotation
//!
//! This is the Rust core of the Edity browser extension, compiled to both
//! native and WASM. It implements:
//! - Patches: whole-fragment before/after substitutions
//! - Change sets with coalescing of continued and reverted edits
//! - Replay of stored change sets against freshly loaded pages
//! - The load/save boundary to the wiki backend and its payload codec
//! - Page sessions and the message protocol between extension contexts
//!
//! # Examples
//!
//! ```rust
//! use edity_core::{ChangeSet, DocumentKey, Edit, replay};
//!
//! let key = DocumentKey::from_url("https://example.com/page#intro").unwrap();
//! let mut changes = ChangeSet::new(key);
//! changes.coalesce(Edit::new("<h1>Helo</h1>", "<h1>Hello</h1>").unwrap());
//!
//! let result = replay("<body><h1>Helo</h1></body>", &changes);
//! assert_eq!(result.content, "<body><h1>Hello</h1></body>");
//! assert_eq!(result.report.live_count(), 1);
//! ```

pub mod capture;
pub mod changeset;
pub mod config;
pub mod error;
pub mod key;
pub mod patch;
pub mod protocol;
pub mod registry;
pub mod replay;
pub mod session;
pub mod storage;

#[cfg(feature = "wasm")]
pub mod wasm;

#[cfg(feature = "small-alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

// Re-exports for convenience
pub use capture::{Capture, EditBuffer, MarkerSet};
pub use changeset::{ChangeSet, Coalesced};
pub use config::EdityConfig;
pub use error::{EdityError, Result};
pub use key::{DocumentKey, KeyPolicy};
pub use patch::{Edit, Patch};
pub use replay::{replay, Replay, ReplayReport};
pub use session::{LoadTicket, PageSession};
pub use storage::{SaveMeta, SaveReceipt, SyncGateway, TokenSource};
