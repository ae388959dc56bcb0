//! Structured error types for sheetgrid.

use crate::address::SheetId;
use crate::engine::EngineError;

/// All errors that can occur in the grid core.
#[derive(Debug, thiserror::Error)]
pub enum SheetGridError {
    /// A cell or row/col id that the codec cannot decode.
    #[error("Invalid id: {0}")]
    CellId(String),

    /// Operation addressed a sheet the data store does not know.
    #[error("No such sheet: {0}")]
    NoSuchSheet(SheetId),

    /// The formula engine refused an operation.
    #[error("Formula engine: {0}")]
    Engine(#[from] EngineError),

    /// Snapshot (de)serialization failure.
    #[error("Snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Invalid grid options.
    #[error("Invalid options: {0}")]
    Config(String),

    /// Catch-all.
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SheetGridError>;

impl From<String> for SheetGridError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for SheetGridError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

#[cfg(target_arch = "wasm32")]
impl From<SheetGridError> for wasm_bindgen::JsValue {
    fn from(e: SheetGridError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}
