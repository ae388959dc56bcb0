use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::address::{RangeSimpleCellAddress, RowColAddress, SheetId, SimpleCellAddress};

/// Per-sheet metadata plus the index of every record the sheet owns, so that
/// deleting a sheet can cascade without scanning the whole store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetMetadata {
    pub id: SheetId,
    pub sheet_name: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub cells: BTreeSet<SimpleCellAddress>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub merged_cells: BTreeSet<SimpleCellAddress>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub rows: BTreeSet<RowColAddress>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub cols: BTreeSet<RowColAddress>,
}

impl SheetMetadata {
    pub fn new(id: SheetId, sheet_name: impl Into<String>) -> Self {
        Self {
            id,
            sheet_name: sheet_name.into(),
            cells: BTreeSet::new(),
            merged_cells: BTreeSet::new(),
            rows: BTreeSet::new(),
            cols: BTreeSet::new(),
        }
    }
}

/// Span of a merge, stored under its top-left address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergedCell {
    /// Number of columns covered (at least 1).
    pub width: u32,
    /// Number of rows covered (at least 1).
    pub height: u32,
}

impl MergedCell {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The full rectangle of this merge when anchored at `top_left`.
    pub fn range(&self, top_left: SimpleCellAddress) -> RangeSimpleCellAddress {
        RangeSimpleCellAddress::from_span(top_left, self.width, self.height)
    }

    /// A 1x1 "merge" is no merge at all.
    pub fn is_single_cell(&self) -> bool {
        self.width <= 1 && self.height <= 1
    }
}

/// Inclusive frozen boundary of a sheet. `None` means that axis is not frozen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrozenCell {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col: Option<u32>,
}

impl FrozenCell {
    pub fn is_row_frozen(&self, row: u32) -> bool {
        self.row.is_some_and(|boundary| row <= boundary)
    }

    pub fn is_col_frozen(&self, col: u32) -> bool {
        self.col.is_some_and(|boundary| col <= boundary)
    }
}

/// A row height or column width override.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowColSize {
    pub size: f64,
}
