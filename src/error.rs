//! Error type for the browser-facing surface of the engine.
//!
//! The interaction core never fails: unknown ids and degenerate geometry are
//! handled as no-ops. Errors only come from the host environment (a detached
//! canvas, a missing window) or from malformed JSON handed to the engine.

use wasm_bindgen::JsValue;

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("canvas call failed: {0}")]
    Js(String),
    #[error("surface has no 2d rendering context")]
    ContextUnavailable,
    #[error("no browser window available")]
    NoWindow,
    #[error("invalid engine config: {0}")]
    InvalidConfig(serde_json::Error),
    #[error("invalid canvas snapshot: {0}")]
    InvalidSnapshot(serde_json::Error),
    #[error("logger setup failed: {0}")]
    Logger(String),
}

impl From<JsValue> for CanvasError {
    fn from(value: JsValue) -> Self {
        Self::Js(value.as_string().unwrap_or_else(|| format!("{value:?}")))
    }
}
