//! WASM utility functions

use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in browser
#[wasm_bindgen(js_name = initPanicHook)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Crate version, for the extension's about page
#[wasm_bindgen(js_name = coreVersion)]
pub fn core_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Log a warning to the browser console
pub fn warn(s: &str) {
    web_sys::console::warn_1(&JsValue::from_str(s));
}

/// Macro for console.warn from Rust
#[macro_export]
macro_rules! console_warn {
    ($($t:tt)*) => {
        $crate::wasm::utils::warn(&format_args!($($t)*).to_string())
    }
}
