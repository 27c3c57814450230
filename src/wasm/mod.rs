//! WASM bindings for Edity
//!
//! This module provides JavaScript-friendly bindings for page sessions and
//! the content-context message handler.

pub mod bindings;
pub mod utils;

pub use bindings::{WasmContentPage, WasmSession};
