//! Tests for the coordinate model: id codecs, range normalization and
//! A1-style labels.
//!
//! Cell ids are `sheet_row_col`, row/col ids are `sheet_index`. The codecs
//! must be strict inverses for every id the encoder produces.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use sheetgrid::cell_ref::{cell_label, col_to_letters, parse_address, parse_cell_ref};
use sheetgrid::{Axis, RangeSimpleCellAddress, RowColAddress, SimpleCellAddress};
use test_case::test_case;

// ============================================================================
// ID CODECS
// ============================================================================

#[test_case(0, 0, 0 ; "origin")]
#[test_case(0, 999, 25 ; "last default cell")]
#[test_case(7, 1_048_575, 16_383 ; "large sheet")]
#[test_case(u32::MAX, u32::MAX, u32::MAX ; "maximum")]
fn test_cell_id_roundtrip(sheet: u32, row: u32, col: u32) {
    let address = SimpleCellAddress::new(sheet, row, col);
    let id = address.to_id();
    assert_eq!(SimpleCellAddress::from_id(&id).unwrap(), address);
}

#[test_case(0, 0 ; "first")]
#[test_case(3, 512 ; "middle")]
#[test_case(u32::MAX, u32::MAX ; "maximum")]
fn test_row_col_id_roundtrip(sheet: u32, index: u32) {
    let address = RowColAddress::new(sheet, index);
    assert_eq!(RowColAddress::from_id(&address.to_id()).unwrap(), address);
}

#[test_case("" ; "empty")]
#[test_case("0_1" ; "too few parts")]
#[test_case("0_1_2_3" ; "too many parts")]
#[test_case("x_1_2" ; "not a number")]
#[test_case("0_-1_2" ; "negative")]
fn test_malformed_cell_ids_are_rejected(id: &str) {
    assert!(SimpleCellAddress::from_id(id).is_err());
}

#[test]
fn test_row_and_cell_ids_do_not_collide() {
    let row = RowColAddress::new(1, 2).to_id();
    assert!(SimpleCellAddress::from_id(&row).is_err());
}

#[test]
fn test_addresses_serialize_as_ids() {
    let address = SimpleCellAddress::new(1, 2, 3);
    let json = serde_json::to_string(&address).unwrap();
    assert_eq!(json, format!("\"{}\"", address.to_id()));
    let back: SimpleCellAddress = serde_json::from_str(&json).unwrap();
    assert_eq!(back, address);
}

// ============================================================================
// RANGES
// ============================================================================

#[test]
fn test_range_corners_normalize_in_both_orders() {
    let a = SimpleCellAddress::new(0, 9, 1);
    let b = SimpleCellAddress::new(0, 2, 6);
    let forward = RangeSimpleCellAddress::new(a, b);
    let backward = RangeSimpleCellAddress::new(b, a);
    assert_eq!(forward, backward);
    assert_eq!(forward.top_left, SimpleCellAddress::new(0, 2, 1));
    assert_eq!(forward.bottom_right, SimpleCellAddress::new(0, 9, 6));
    assert_eq!(forward.width(), 6);
    assert_eq!(forward.height(), 8);
}

#[test]
fn test_iteration_is_inclusive_and_restartable() {
    let range = RangeSimpleCellAddress::from_span(SimpleCellAddress::new(0, 4, 2), 3, 2);
    let first: Vec<u32> = range.iterate_from_top_to_bottom(Axis::Col).collect();
    let second: Vec<u32> = range.iterate_from_top_to_bottom(Axis::Col).collect();
    assert_eq!(first, vec![2, 3, 4]);
    assert_eq!(first, second);
    assert_eq!(range.addresses().count(), 6);
}

#[test]
fn test_limit_keeps_a_merge_whole() {
    let merge = RangeSimpleCellAddress::new(SimpleCellAddress::new(0, 1, 1), SimpleCellAddress::new(0, 3, 3));
    let mut selection =
        RangeSimpleCellAddress::new(SimpleCellAddress::new(0, 2, 0), SimpleCellAddress::new(0, 2, 2));
    assert!(selection.limit_top_left_to_range(&merge, Axis::Row));
    assert!(selection.limit_bottom_right_to_range(&merge, Axis::Row));
    assert!(selection.limit_bottom_right_to_range(&merge, Axis::Col));
    assert!(!selection.limit_top_left_to_range(&merge, Axis::Col));
    assert!(selection.contains_range(&merge));
}

// ============================================================================
// A1 LABELS
// ============================================================================

#[test_case(0, "A")]
#[test_case(25, "Z")]
#[test_case(26, "AA")]
#[test_case(701, "ZZ")]
#[test_case(702, "AAA")]
fn test_column_letters(col: u32, letters: &str) {
    assert_eq!(col_to_letters(col), letters);
}

#[test]
fn test_labels_parse_back() {
    let address = SimpleCellAddress::new(2, 41, 27);
    let label = cell_label(&address);
    assert_eq!(label, "AB42");
    assert_eq!(parse_cell_ref(&label), Some((41, 27)));
    assert_eq!(parse_address(2, &label), Some(address));
    assert_eq!(parse_cell_ref("$C$7"), Some((6, 2)));
    assert_eq!(parse_cell_ref("7C"), None);
}
