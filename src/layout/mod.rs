//! Axis layout, scrolling and resizing.
//!
//! This module handles:
//! - Pixel ↔ index mapping per axis with prefix sums over size overrides
//! - The visible window and frozen pane of each axis
//! - Scrollbar geometry, wheel and track input
//! - The row/column resize drag

mod axis;
mod resizer;
mod scrollbar;

pub use axis::AxisManager;
pub use resizer::{ResizeCommit, ResizeState, Resizer};
pub use scrollbar::{Scrollbar, ScrollbarGeometry, SCROLLBAR_THICKNESS};
