//! sheetgrid - canvas spreadsheet grid core for the web
//!
//! The UI-side core of an in-browser spreadsheet, compiled to WebAssembly and
//! drawn with Canvas 2D:
//! - Sparse per-sheet store of cells, merges, frozen panes and size overrides
//! - Per-axis layout with prefix sums, visible windows and frozen panes
//! - Pooled cell visuals bounded by the visible area
//! - Merge-aware selection split across the four panes
//! - Merges, freezes and sizes kept in step with a formula engine's undo/redo
//!
//! Formula evaluation is delegated to an external engine through
//! [`engine::FormulaEngine`].
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { GridView, initLogging } from 'sheetgrid';
//! await init();
//! initLogging('warn');
//! const grid = new GridView(canvas, engine, { rowCount: 5000 }, devicePixelRatio);
//! grid.set_render_callback(() => requestAnimationFrame(() => grid.frame()));
//! grid.set_cell_value('B2', '=SUM(A1:A3)');
//! ```
//!
//! # Usage (Rust)
//!
//! ```
//! use sheetgrid::{ApproxTextMeasurer, GridOptions, MemoryEngine, SimpleCellAddress, Spreadsheet};
//!
//! let mut sheet = Spreadsheet::new(MemoryEngine::new(), GridOptions::default()).unwrap();
//! sheet.set_cell_value(SimpleCellAddress::new(0, 1, 1), Some("hello"));
//! sheet.update_viewport(&mut ApproxTextMeasurer::default());
//! assert_eq!(sheet.cells().stats().drawn, 1);
//! ```

pub mod address;
pub mod cell_ref;
pub mod engine;
pub mod error;
pub mod history;
pub mod logging;
pub mod merger;
pub mod options;
pub mod schedule;
pub mod selector;
pub mod spreadsheet;
pub mod store;
pub mod types;

// Layout and rendering
pub mod layout;
pub mod render;
#[cfg(target_arch = "wasm32")]
pub mod viewer;

use wasm_bindgen::prelude::*;

pub use address::{Axis, RangeSimpleCellAddress, RowColAddress, SheetId, SimpleCellAddress};
pub use engine::{EngineError, FormulaEngine, HistoryDirection, HistoryEvent, MemoryEngine, UndoEntry};
pub use error::{Result, SheetGridError};
pub use merger::{MergeState, Merger};
pub use options::GridOptions;
pub use render::{ApproxTextMeasurer, TextMeasurer};
pub use spreadsheet::{PointerTarget, Spreadsheet};
pub use store::DataStore;
pub use types::*;
#[cfg(target_arch = "wasm32")]
pub use viewer::GridView;

/// Get the library version
#[must_use]
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
