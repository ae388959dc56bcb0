//! Rendering: pooled cell visuals, selection overlays and the backend seam.
//!
//! This module provides:
//! - Backend-agnostic frame data ([`RenderFrame`]) and pane geometry
//! - The cell viewport manager with its object pool
//! - Text measurement for wrapped content
//! - Canvas 2D backend (wasm32 only)

#[cfg(target_arch = "wasm32")]
pub mod canvas;
pub mod cells;
pub mod measure;
pub mod pool;
pub mod region;
pub mod selection;

#[cfg(target_arch = "wasm32")]
pub use canvas::{CanvasRenderer, CanvasTextMeasurer};
pub use cells::{AutoGrow, CellViewport, CellVisual, PassStats, ViewportSource};
pub use measure::{ApproxTextMeasurer, FontSpec, TextMeasurer};
pub use pool::{ObjectPool, Poolable, SlotKey};
pub use region::{Decoration, PositionedRegion, Stroke};
pub use selection::{selection_groups, SelectionOverlay};

use crate::address::Axis;
use crate::error::Result;
use crate::layout::{AxisManager, ScrollbarGeometry};
use crate::options::GridOptions;
use crate::types::{Pane, Rect};

/// Translation applied to a pane's group: scrolling axes move by the
/// axis translation, frozen axes stay put.
pub fn pane_offset(pane: Pane, rows: &AxisManager, cols: &AxisManager) -> (f64, f64) {
    let dx = if pane.cols_frozen() { 0.0 } else { cols.translation() };
    let dy = if pane.rows_frozen() { 0.0 } else { rows.translation() };
    (dx, dy)
}

/// Viewport rectangle a pane is clipped to. `None` when the pane is absent
/// (its axis is not frozen).
pub fn pane_clip(pane: Pane, rows: &AxisManager, cols: &AxisManager) -> Option<Rect> {
    fn span(frozen: bool, manager: &AxisManager) -> Option<(f64, f64)> {
        let start = manager.inset();
        if frozen {
            manager.frozen()?;
            Some((start, manager.frozen_size()))
        } else {
            manager.scrolling_range()?;
            let start = start + manager.frozen_size();
            Some((start, (manager.viewport_size() - start).max(0.0)))
        }
    }
    let (x, width) = span(pane.cols_frozen(), cols)?;
    let (y, height) = span(pane.rows_frozen(), rows)?;
    Some(Rect::new(x, y, width, height))
}

/// Everything a backend needs to draw one frame.
pub struct RenderFrame<'a> {
    pub options: &'a GridOptions,
    pub rows: &'a AxisManager,
    pub cols: &'a AxisManager,
    pub cells: &'a CellViewport,
    pub selection: Option<SelectionOverlay>,
    /// Resize guide line: axis being resized and viewport pixel of the line
    pub resize_guide: Option<(Axis, f64)>,
    pub row_scrollbar: ScrollbarGeometry,
    pub col_scrollbar: ScrollbarGeometry,
}

/// Trait for render backends.
pub trait RenderBackend {
    /// Resize the render surface (physical pixels).
    fn resize(&mut self, width: u32, height: u32, dpr: f64);

    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<()>;

    fn width(&self) -> u32;

    fn height(&self) -> u32;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::store::DataStore;

    fn axes(frozen_row: Option<i64>) -> (AxisManager, AxisManager) {
        let options = GridOptions::default();
        let mut store = DataStore::new();
        store.set_frozen_cell(0, frozen_row, None);
        let mut rows = AxisManager::new(Axis::Row, &options);
        let mut cols = AxisManager::new(Axis::Col, &options);
        rows.sync(store.data(), 0);
        cols.sync(store.data(), 0);
        (rows, cols)
    }

    #[test]
    fn frozen_axes_do_not_translate() {
        let (mut rows, cols) = axes(Some(1));
        rows.scroll_to_index(10);
        let (_, main_dy) = pane_offset(Pane::Main, &rows, &cols);
        let (_, frozen_dy) = pane_offset(Pane::FrozenRow, &rows, &cols);
        assert_eq!(main_dy, -(25.0 * 8.0));
        assert_eq!(frozen_dy, 0.0);
    }

    #[test]
    fn absent_panes_have_no_clip() {
        let (rows, cols) = axes(None);
        assert!(pane_clip(Pane::FrozenRow, &rows, &cols).is_none());
        let main = pane_clip(Pane::Main, &rows, &cols).unwrap();
        assert_eq!(main, Rect::new(40.0, 25.0, 760.0, 575.0));
    }

    #[test]
    fn frozen_row_clip_covers_frozen_rows() {
        let (rows, cols) = axes(Some(1));
        let clip = pane_clip(Pane::FrozenRow, &rows, &cols).unwrap();
        assert_eq!(clip.y, 25.0);
        assert_eq!(clip.height, 50.0);
        let main = pane_clip(Pane::Main, &rows, &cols).unwrap();
        assert_eq!(main.y, 75.0);
    }
}
