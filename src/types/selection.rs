use serde::Serialize;

use crate::address::RangeSimpleCellAddress;

/// One of the four independently scrolling regions of the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Pane {
    /// Scrolls on both axes.
    #[default]
    Main,
    /// Frozen rows; scrolls horizontally only.
    FrozenRow,
    /// Frozen cols; scrolls vertically only.
    FrozenCol,
    /// Frozen on both axes; never scrolls.
    FrozenCorner,
}

impl Pane {
    pub const ALL: [Pane; 4] = [Pane::FrozenCorner, Pane::FrozenRow, Pane::FrozenCol, Pane::Main];

    pub fn from_frozen(row_frozen: bool, col_frozen: bool) -> Self {
        match (row_frozen, col_frozen) {
            (true, true) => Pane::FrozenCorner,
            (true, false) => Pane::FrozenRow,
            (false, true) => Pane::FrozenCol,
            (false, false) => Pane::Main,
        }
    }

    /// Rows of this pane are pinned.
    pub fn rows_frozen(self) -> bool {
        matches!(self, Pane::FrozenRow | Pane::FrozenCorner)
    }

    /// Cols of this pane are pinned.
    pub fn cols_frozen(self) -> bool {
        matches!(self, Pane::FrozenCol | Pane::FrozenCorner)
    }
}

/// Pixel rectangle in sheet coordinates (header inset included, scroll not applied).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Shift by a pane's group translation.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// The part of a selection that falls in one pane, with its bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionGroup {
    pub pane: Pane,
    pub range: RangeSimpleCellAddress,
    pub rect: Rect,
    /// Which outer edges of the whole selection this piece carries.
    pub draw_top: bool,
    pub draw_bottom: bool,
    pub draw_left: bool,
    pub draw_right: bool,
}
