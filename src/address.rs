//! Cell, range and row/col addresses with their string id codecs.
//!
//! Ids are what the sparse maps of [`SpreadsheetData`](crate::types::SpreadsheetData)
//! are keyed by in a snapshot:
//! - cell ids are `"{sheet}_{row}_{col}"`
//! - row/col ids are `"{sheet}_{index}"`; rows and cols live in separate maps
//!
//! Every address type serializes as its id string, so a `HashMap` keyed by an
//! address serializes to a JSON object keyed by ids.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SheetGridError};

/// Sheet identifier, allocated by the formula engine.
pub type SheetId = u32;

const ID_SEPARATOR: char = '_';

/// One of the two grid axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Axis {
    Row,
    Col,
}

impl Axis {
    /// The perpendicular axis.
    pub fn other(self) -> Self {
        match self {
            Axis::Row => Axis::Col,
            Axis::Col => Axis::Row,
        }
    }
}

/// A single cell `(sheet, row, col)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimpleCellAddress {
    pub sheet: SheetId,
    pub row: u32,
    pub col: u32,
}

impl SimpleCellAddress {
    pub const fn new(sheet: SheetId, row: u32, col: u32) -> Self {
        Self { sheet, row, col }
    }

    /// Encode as a cell id.
    pub fn to_id(&self) -> String {
        self.to_string()
    }

    /// Decode a cell id produced by [`to_id`](Self::to_id).
    pub fn from_id(id: &str) -> Result<Self> {
        id.parse()
    }

    /// Row or column index depending on `axis`.
    pub fn index(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Row => self.row,
            Axis::Col => self.col,
        }
    }

    /// Copy of this address with the index on `axis` replaced.
    #[must_use]
    pub fn with_index(self, axis: Axis, index: u32) -> Self {
        match axis {
            Axis::Row => Self { row: index, ..self },
            Axis::Col => Self { col: index, ..self },
        }
    }

    /// The row or column this cell sits on.
    pub fn row_col(&self, axis: Axis) -> RowColAddress {
        RowColAddress::new(self.sheet, self.index(axis))
    }
}

impl fmt::Display for SimpleCellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{ID_SEPARATOR}{}{ID_SEPARATOR}{}",
            self.sheet, self.row, self.col
        )
    }
}

impl FromStr for SimpleCellAddress {
    type Err = SheetGridError;

    fn from_str(id: &str) -> Result<Self> {
        let [sheet, row, col] = parse_id_parts::<3>(id)?;
        Ok(Self { sheet, row, col })
    }
}

/// A row or a column `(sheet, index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowColAddress {
    pub sheet: SheetId,
    pub index: u32,
}

impl RowColAddress {
    pub const fn new(sheet: SheetId, index: u32) -> Self {
        Self { sheet, index }
    }

    /// Encode as a sheet row/col id.
    pub fn to_id(&self) -> String {
        self.to_string()
    }

    /// Decode an id produced by [`to_id`](Self::to_id).
    pub fn from_id(id: &str) -> Result<Self> {
        id.parse()
    }
}

impl fmt::Display for RowColAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{ID_SEPARATOR}{}", self.sheet, self.index)
    }
}

impl FromStr for RowColAddress {
    type Err = SheetGridError;

    fn from_str(id: &str) -> Result<Self> {
        let [sheet, index] = parse_id_parts::<2>(id)?;
        Ok(Self { sheet, index })
    }
}

fn parse_id_parts<const N: usize>(id: &str) -> Result<[u32; N]> {
    let invalid = || SheetGridError::CellId(id.to_string());
    let mut parts = [0u32; N];
    let mut pieces = id.split(ID_SEPARATOR);
    for part in &mut parts {
        let piece = pieces.next().ok_or_else(invalid)?;
        *part = piece.parse().map_err(|_| invalid())?;
    }
    if pieces.next().is_some() {
        return Err(invalid());
    }
    Ok(parts)
}

macro_rules! serde_as_id {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let id = String::deserialize(deserializer)?;
                id.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

serde_as_id!(SimpleCellAddress);
serde_as_id!(RowColAddress);

/// Rectangular range of cells on one sheet, normalized so that
/// `top_left <= bottom_right` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RangeRecord")]
pub struct RangeSimpleCellAddress {
    pub top_left: SimpleCellAddress,
    pub bottom_right: SimpleCellAddress,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeRecord {
    top_left: SimpleCellAddress,
    bottom_right: SimpleCellAddress,
}

impl From<RangeRecord> for RangeSimpleCellAddress {
    fn from(record: RangeRecord) -> Self {
        Self::new(record.top_left, record.bottom_right)
    }
}

impl RangeSimpleCellAddress {
    /// Build a range from two corners in any order. The sheet of `a` wins.
    pub fn new(a: SimpleCellAddress, b: SimpleCellAddress) -> Self {
        Self {
            top_left: SimpleCellAddress::new(a.sheet, a.row.min(b.row), a.col.min(b.col)),
            bottom_right: SimpleCellAddress::new(a.sheet, a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Range covering a single cell.
    pub fn from_cell(cell: SimpleCellAddress) -> Self {
        Self {
            top_left: cell,
            bottom_right: cell,
        }
    }

    /// Range starting at `top_left` spanning `width` cols and `height` rows.
    /// Zero spans are treated as one.
    pub fn from_span(top_left: SimpleCellAddress, width: u32, height: u32) -> Self {
        let bottom_right = SimpleCellAddress::new(
            top_left.sheet,
            top_left.row.saturating_add(height.max(1) - 1),
            top_left.col.saturating_add(width.max(1) - 1),
        );
        Self {
            top_left,
            bottom_right,
        }
    }

    pub fn sheet(&self) -> SheetId {
        self.top_left.sheet
    }

    /// Inclusive number of columns.
    pub fn width(&self) -> u32 {
        self.bottom_right.col - self.top_left.col + 1
    }

    /// Inclusive number of rows.
    pub fn height(&self) -> u32 {
        self.bottom_right.row - self.top_left.row + 1
    }

    /// Inclusive span along `axis` (height for rows, width for cols).
    pub fn span(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Row => self.height(),
            Axis::Col => self.width(),
        }
    }

    pub fn start(&self, axis: Axis) -> u32 {
        self.top_left.index(axis)
    }

    pub fn end(&self, axis: Axis) -> u32 {
        self.bottom_right.index(axis)
    }

    pub fn is_single_cell(&self) -> bool {
        self.top_left == self.bottom_right
    }

    pub fn contains(&self, cell: &SimpleCellAddress) -> bool {
        cell.sheet == self.sheet()
            && (self.top_left.row..=self.bottom_right.row).contains(&cell.row)
            && (self.top_left.col..=self.bottom_right.col).contains(&cell.col)
    }

    /// True if `other` lies entirely inside this range.
    pub fn contains_range(&self, other: &Self) -> bool {
        self.contains(&other.top_left) && self.contains(&other.bottom_right)
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        self.sheet() == other.sheet()
            && self.top_left.row <= other.bottom_right.row
            && other.top_left.row <= self.bottom_right.row
            && self.top_left.col <= other.bottom_right.col
            && other.top_left.col <= self.bottom_right.col
    }

    /// Overlapping part of two ranges, if any.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Self {
            top_left: SimpleCellAddress::new(
                self.sheet(),
                self.top_left.row.max(other.top_left.row),
                self.top_left.col.max(other.top_left.col),
            ),
            bottom_right: SimpleCellAddress::new(
                self.sheet(),
                self.bottom_right.row.min(other.bottom_right.row),
                self.bottom_right.col.min(other.bottom_right.col),
            ),
        })
    }

    /// Smallest range containing both.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(
            SimpleCellAddress::new(
                self.sheet(),
                self.top_left.row.min(other.top_left.row),
                self.top_left.col.min(other.top_left.col),
            ),
            SimpleCellAddress::new(
                self.sheet(),
                self.bottom_right.row.max(other.bottom_right.row),
                self.bottom_right.col.max(other.bottom_right.col),
            ),
        )
    }

    /// Ascending indices of this range along `axis`, both ends inclusive.
    ///
    /// Each call returns a fresh iterator.
    pub fn iterate_from_top_to_bottom(&self, axis: Axis) -> RangeInclusive<u32> {
        self.start(axis)..=self.end(axis)
    }

    /// Every address in the range, row-major.
    pub fn addresses(&self) -> impl Iterator<Item = SimpleCellAddress> + '_ {
        let sheet = self.sheet();
        self.iterate_from_top_to_bottom(Axis::Row).flat_map(move |row| {
            self.iterate_from_top_to_bottom(Axis::Col)
                .map(move |col| SimpleCellAddress::new(sheet, row, col))
        })
    }

    /// Pull the top-left edge on `axis` out to `other`'s when `other` starts
    /// earlier. Returns true if the range grew.
    pub fn limit_top_left_to_range(&mut self, other: &Self, axis: Axis) -> bool {
        let reference = other.start(axis);
        if reference < self.start(axis) {
            self.top_left = self.top_left.with_index(axis, reference);
            true
        } else {
            false
        }
    }

    /// Push the bottom-right edge on `axis` out to `other`'s when `other` ends
    /// later. Returns true if the range grew.
    pub fn limit_bottom_right_to_range(&mut self, other: &Self, axis: Axis) -> bool {
        let reference = other.end(axis);
        if reference > self.end(axis) {
            self.bottom_right = self.bottom_right.with_index(axis, reference);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;

    #[test]
    fn cell_id_roundtrip() {
        for (sheet, row, col) in [(0, 0, 0), (3, 17, 2), (u32::MAX, u32::MAX, u32::MAX)] {
            let addr = SimpleCellAddress::new(sheet, row, col);
            assert_eq!(SimpleCellAddress::from_id(&addr.to_id()).unwrap(), addr);
        }
        assert_eq!(SimpleCellAddress::new(1, 2, 3).to_id(), "1_2_3");
    }

    #[test]
    fn row_col_id_roundtrip() {
        let addr = RowColAddress::new(2, 40);
        assert_eq!(addr.to_id(), "2_40");
        assert_eq!(RowColAddress::from_id("2_40").unwrap(), addr);
    }

    #[test]
    fn malformed_ids_are_rejected() {
        for id in ["", "1_2", "1_2_3_4", "a_b_c", "1__3", "-1_0_0"] {
            assert!(SimpleCellAddress::from_id(id).is_err(), "{id}");
        }
        assert!(RowColAddress::from_id("1_2_3").is_err());
    }

    #[test]
    fn range_normalizes_corners() {
        let a = SimpleCellAddress::new(0, 5, 1);
        let b = SimpleCellAddress::new(0, 2, 4);
        let ab = RangeSimpleCellAddress::new(a, b);
        let ba = RangeSimpleCellAddress::new(b, a);
        assert_eq!(ab, ba);
        assert_eq!(ab.top_left, SimpleCellAddress::new(0, 2, 1));
        assert_eq!(ab.bottom_right, SimpleCellAddress::new(0, 5, 4));
        assert_eq!(ab.width(), 4);
        assert_eq!(ab.height(), 4);
    }

    #[test]
    fn iterate_is_inclusive_and_restartable() {
        let range = RangeSimpleCellAddress::from_span(SimpleCellAddress::new(0, 3, 7), 2, 3);
        let rows: Vec<u32> = range.iterate_from_top_to_bottom(Axis::Row).collect();
        assert_eq!(rows, vec![3, 4, 5]);
        let again: Vec<u32> = range.iterate_from_top_to_bottom(Axis::Row).collect();
        assert_eq!(rows, again);
        let cols: Vec<u32> = range.iterate_from_top_to_bottom(Axis::Col).collect();
        assert_eq!(cols, vec![7, 8]);
        assert_eq!(range.addresses().count(), 6);
    }

    #[test]
    fn limit_edges_grow_only() {
        let mut range = RangeSimpleCellAddress::new(
            SimpleCellAddress::new(0, 2, 2),
            SimpleCellAddress::new(0, 3, 3),
        );
        let merge = RangeSimpleCellAddress::new(
            SimpleCellAddress::new(0, 1, 3),
            SimpleCellAddress::new(0, 4, 5),
        );
        assert!(range.limit_top_left_to_range(&merge, Axis::Row));
        assert!(!range.limit_top_left_to_range(&merge, Axis::Col));
        assert!(range.limit_bottom_right_to_range(&merge, Axis::Row));
        assert!(range.limit_bottom_right_to_range(&merge, Axis::Col));
        assert_eq!(range.top_left, SimpleCellAddress::new(0, 1, 2));
        assert_eq!(range.bottom_right, SimpleCellAddress::new(0, 4, 5));
    }

    #[test]
    fn overlap_and_intersection() {
        let a = RangeSimpleCellAddress::from_span(SimpleCellAddress::new(0, 0, 0), 3, 3);
        let b = RangeSimpleCellAddress::from_span(SimpleCellAddress::new(0, 2, 2), 3, 3);
        let c = RangeSimpleCellAddress::from_span(SimpleCellAddress::new(1, 2, 2), 3, 3);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert_eq!(
            a.intersection(&b),
            Some(RangeSimpleCellAddress::from_cell(SimpleCellAddress::new(0, 2, 2)))
        );
        assert_eq!(a.union(&b).width(), 5);
    }

    #[test]
    fn serializes_as_id_strings() {
        let addr = SimpleCellAddress::new(0, 4, 9);
        assert_eq!(serde_json::to_string(&addr).unwrap(), "\"0_4_9\"");
        let back: SimpleCellAddress = serde_json::from_str("\"0_4_9\"").unwrap();
        assert_eq!(back, addr);

        let range: RangeSimpleCellAddress =
            serde_json::from_str(r#"{"topLeft":"0_5_5","bottomRight":"0_1_1"}"#).unwrap();
        assert_eq!(range.top_left, SimpleCellAddress::new(0, 1, 1));
    }
}
