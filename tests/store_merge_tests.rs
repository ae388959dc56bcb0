//! Tests for the sparse data store and the merge index.
//!
//! After a merge only the top-left keeps data and every covered address
//! resolves to it. Engine refusals never drop local records, and deleting a
//! sheet removes everything the sheet owns.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

use sheetgrid::engine::FormulaEngine;
use sheetgrid::{
    Axis, CellData, DataStore, MemoryEngine, MergeState, MergedCell, Merger, RangeSimpleCellAddress,
    RowColAddress, SimpleCellAddress,
};

fn addr(row: u32, col: u32) -> SimpleCellAddress {
    SimpleCellAddress::new(0, row, col)
}

fn range(r1: u32, c1: u32, r2: u32, c2: u32) -> RangeSimpleCellAddress {
    RangeSimpleCellAddress::new(addr(r1, c1), addr(r2, c2))
}

fn setup() -> (DataStore, MemoryEngine) {
    let mut engine = MemoryEngine::new();
    let sheet = engine.add_sheet("Sheet1").unwrap();
    assert_eq!(sheet, 0);
    let mut store = DataStore::new();
    store.set_sheet(0, "Sheet1");
    (store, engine)
}

// ============================================================================
// MERGES
// ============================================================================

#[test]
fn test_merge_keeps_only_top_left_data() {
    let (mut store, mut engine) = setup();
    for row in 0..3 {
        for col in 0..3 {
            store.set_cell(&mut engine, addr(row, col), CellData::with_value(format!("{row}{col}")));
        }
    }

    store.set_merged_cell(&mut engine, addr(0, 0), MergedCell::new(2, 2));
    let merger = Merger::from_data(store.data());

    for member in range(0, 0, 1, 1).addresses() {
        assert_eq!(merger.resolve(&member), Some(addr(0, 0)));
        if member == addr(0, 0) {
            assert_eq!(store.data().cell(&member).unwrap().value.as_deref(), Some("00"));
            assert_eq!(engine.cell_contents(member), Some("00"));
        } else {
            assert!(store.data().cell(&member).is_none(), "{member} kept data");
            assert_eq!(engine.cell_contents(member), None);
        }
    }
    // Outside the span nothing changed.
    assert_eq!(store.data().cell(&addr(2, 2)).unwrap().value.as_deref(), Some("22"));
    assert_eq!(merger.resolve(&addr(2, 2)), None);
}

#[test]
fn test_member_clear_is_one_engine_entry() {
    let (mut store, mut engine) = setup();
    store.set_cell(&mut engine, addr(0, 1), CellData::with_value("a"));
    store.set_cell(&mut engine, addr(1, 0), CellData::with_value("b"));
    engine.drain_history_events();
    let depth = engine.undo_depth();

    store.set_merged_cell(&mut engine, addr(0, 0), MergedCell::new(2, 2));
    assert_eq!(engine.undo_depth(), depth + 1);
    assert_eq!(engine.drain_history_events().len(), 1);
}

#[test]
fn test_overlapping_merges_are_replaced() {
    let (mut store, mut engine) = setup();
    store.set_merged_cell(&mut engine, addr(0, 0), MergedCell::new(2, 2));
    store.set_merged_cell(&mut engine, addr(5, 5), MergedCell::new(2, 1));

    let removed = store.set_merged_cell(&mut engine, addr(1, 1), MergedCell::new(3, 3));
    assert_eq!(removed, vec![(addr(0, 0), MergedCell::new(2, 2))]);
    assert!(store.data().merged_cell(&addr(0, 0)).is_none());
    assert!(store.data().merged_cell(&addr(5, 5)).is_some());

    let merger = Merger::from_data(store.data());
    assert_eq!(merger.len(), 2);
    assert_eq!(merger.resolve(&addr(0, 0)), None);
    assert_eq!(merger.resolve(&addr(3, 3)), Some(addr(1, 1)));
}

#[test]
fn test_merge_state_lifecycle_inputs() {
    let (mut store, mut engine) = setup();
    store.set_merged_cell(&mut engine, addr(2, 2), MergedCell::new(2, 2));
    let merger = Merger::from_data(store.data());

    assert_eq!(merger.merge_state(&range(0, 0, 0, 0)), MergeState::None);
    assert_eq!(merger.merge_state(&range(2, 2, 3, 3)), MergeState::Merged(addr(2, 2)));
    // A range touching the merge grows to contain it.
    assert_eq!(
        merger.merge_state(&range(0, 0, 2, 2)),
        MergeState::Pending(range(0, 0, 3, 3))
    );
    assert_eq!(merger.merge_state(&range(5, 0, 5, 1)), MergeState::Pending(range(5, 0, 5, 1)));
}

#[test]
fn test_merge_box_excludes_top_left() {
    let (mut store, mut engine) = setup();
    store.set_merged_cell(&mut engine, addr(4, 1), MergedCell::new(3, 1));
    let merger = Merger::from_data(store.data());

    let members: Vec<SimpleCellAddress> = merger.iterate_merge_box(addr(4, 1)).collect();
    assert_eq!(members, vec![addr(4, 2), addr(4, 3)]);
    assert!(merger.is_top_left_of_merge(&addr(4, 1)));
    assert!(!merger.is_associated(&addr(4, 1)));
    assert!(merger.is_associated(&addr(4, 3)));
    assert_eq!(merger.iterate_merge_box(addr(0, 0)).count(), 0);
}

// ============================================================================
// ENGINE REFUSALS
// ============================================================================

#[test]
fn test_protected_write_keeps_local_record() {
    let (mut store, mut engine) = setup();
    engine.protect(addr(3, 3));
    store.set_cell(&mut engine, addr(3, 3), CellData::with_value("local"));

    assert_eq!(store.data().cell(&addr(3, 3)).unwrap().value.as_deref(), Some("local"));
    assert_eq!(engine.cell_contents(addr(3, 3)), None);
}

#[test]
fn test_protected_member_still_cleared_locally() {
    let (mut store, mut engine) = setup();
    store.set_cell(&mut engine, addr(0, 1), CellData::with_value("spill"));
    engine.protect(addr(0, 1));

    store.set_merged_cell(&mut engine, addr(0, 0), MergedCell::new(2, 1));
    assert!(store.data().cell(&addr(0, 1)).is_none());
    assert!(store.data().merged_cell(&addr(0, 0)).is_some());
}

// ============================================================================
// FROZEN PANES AND SIZES
// ============================================================================

#[test]
fn test_frozen_record_deletes_itself() {
    let (mut store, _) = setup();
    store.set_frozen_cell(0, Some(2), Some(1));
    let frozen = store.data().frozen_cell(0).copied().unwrap();
    assert_eq!((frozen.row, frozen.col), (Some(2), Some(1)));

    store.set_frozen_cell(0, None, Some(1));
    assert_eq!(store.data().frozen_cell(0).unwrap().row, None);

    store.set_frozen_cell(0, None, None);
    assert!(store.data().frozen_cell(0).is_none());

    store.set_frozen_cell(0, Some(3), None);
    store.set_frozen_cell(0, Some(-1), None);
    assert!(store.data().frozen_cell(0).is_none());
}

#[test]
fn test_size_overrides_are_indexed_per_sheet() {
    let (mut store, _) = setup();
    store.set_row_col(Axis::Row, RowColAddress::new(0, 4), 40.0);
    store.set_row_col(Axis::Col, RowColAddress::new(1, 2), 150.0);

    assert_eq!(store.data().size_override(Axis::Row, &RowColAddress::new(0, 4)), Some(40.0));
    assert!(store.data().sheet(0).unwrap().rows.contains(&RowColAddress::new(0, 4)));
    // Writing to an unknown sheet creates it.
    assert!(store.has_sheet(1));
    assert_eq!(store.delete_row_col(Axis::Row, RowColAddress::new(0, 4)), Some(40.0));
    assert!(store.data().sheet(0).unwrap().rows.is_empty());
}

// ============================================================================
// SHEETS
// ============================================================================

#[test]
fn test_delete_sheet_cascades() {
    let (mut store, mut engine) = setup();
    let second = engine.add_sheet("Sheet2").unwrap();
    store.set_sheet(second, "Sheet2");

    let other = SimpleCellAddress::new(second, 1, 1);
    store.set_cell(&mut engine, other, CellData::with_value("x"));
    store.set_merged_cell(&mut engine, SimpleCellAddress::new(second, 3, 3), MergedCell::new(2, 2));
    store.set_frozen_cell(second, Some(0), None);
    store.set_row_col(Axis::Col, RowColAddress::new(second, 0), 60.0);
    store.set_cell(&mut engine, addr(0, 0), CellData::with_value("kept"));

    let removed = store.delete_sheet(&mut engine, second).unwrap();
    assert_eq!(removed.sheet_name, "Sheet2");

    let data = store.data();
    assert!(data.sheet(second).is_none());
    assert!(data.cell(&other).is_none());
    assert!(data.merged_cells.is_empty());
    assert!(data.frozen_cell(second).is_none());
    assert!(data.cols.is_empty());
    assert_eq!(data.cell(&addr(0, 0)).unwrap().value.as_deref(), Some("kept"));
    assert_eq!(engine.sheet_count(), 1);
}

#[test]
fn test_snapshot_json_roundtrip() {
    let (mut store, mut engine) = setup();
    store.set_cell(&mut engine, addr(0, 0), CellData::with_value("=A2+1"));
    store.set_merged_cell(&mut engine, addr(1, 1), MergedCell::new(2, 3));
    store.set_frozen_cell(0, Some(1), None);
    store.set_row_col(Axis::Row, RowColAddress::new(0, 2), 33.0);

    let json = store.data().to_json().unwrap();
    assert!(json.contains("\"0_1_1\""));
    let back = sheetgrid::SpreadsheetData::from_json(&json).unwrap();
    assert_eq!(&back, store.data());
}
