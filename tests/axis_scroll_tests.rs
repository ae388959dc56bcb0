//! Tests for per-axis layout and scrolling.
//!
//! Covers prefix-sum positions with size overrides, the visible window as the
//! scroll fraction moves (with and without frozen rows), and scrollbar thumb
//! geometry.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::cast_precision_loss,
    clippy::indexing_slicing
)]

use sheetgrid::layout::{AxisManager, Scrollbar};
use sheetgrid::{Axis, DataStore, GridOptions, RowColAddress};
use test_case::test_case;

fn synced(axis: Axis, overrides: &[(u32, f64)], frozen: Option<i64>) -> AxisManager {
    let options = GridOptions::default();
    let mut store = DataStore::new();
    store.set_sheet(0, "Sheet1");
    for (index, size) in overrides {
        store.set_row_col(axis, RowColAddress::new(0, *index), *size);
    }
    match axis {
        Axis::Row => store.set_frozen_cell(0, frozen, None),
        Axis::Col => store.set_frozen_cell(0, None, frozen),
    }
    let mut manager = AxisManager::new(axis, &options);
    manager.sync(store.data(), 0);
    manager
}

// ============================================================================
// POSITIONS
// ============================================================================

#[test]
fn test_row_override_shifts_later_rows() {
    let rows = synced(Axis::Row, &[(0, 50.0)], None);
    // 50 (row 0) + 25 (row 1) + 25 (column header strip)
    assert_eq!(rows.get_axis(2), 100.0);
    assert_eq!(rows.get_axis(0), 25.0);
}

#[test]
fn test_column_positions_start_after_row_header() {
    let cols = synced(Axis::Col, &[(1, 40.0)], None);
    assert_eq!(cols.get_axis(0), 40.0);
    assert_eq!(cols.get_axis(1), 140.0);
    assert_eq!(cols.get_axis(2), 180.0);
    assert_eq!(cols.get_axis(3), 280.0);
}

#[test]
fn test_total_size_sums_every_index() {
    let rows = synced(Axis::Row, &[(3, 10.0), (500, 80.0), (999, 40.0)], None);
    let expected = 1000.0 * 25.0 - 15.0 + 55.0 + 15.0;
    assert_eq!(rows.get_total_size(), expected);
}

#[test]
fn test_overrides_beyond_amount_are_ignored() {
    let cols = synced(Axis::Col, &[(26, 500.0), (100, 500.0)], None);
    assert_eq!(cols.get_total_size(), 26.0 * 100.0);
}

#[test]
fn test_offset_lookup_inverts_positions() {
    let rows = synced(Axis::Row, &[(4, 70.0), (9, 12.0)], None);
    for index in [0u32, 3, 4, 5, 9, 10, 998, 999] {
        let top = rows.get_axis(index);
        assert_eq!(rows.index_at_offset(top), Some(index));
        assert_eq!(rows.index_at_offset(top + rows.get_size(index) - 0.25), Some(index));
    }
    assert_eq!(rows.index_at_offset(0.0), None);
    assert_eq!(rows.index_at_offset(rows.get_axis(999) + 1000.0), None);
}

// ============================================================================
// VISIBLE WINDOW
// ============================================================================

#[test_case(None ; "no frozen rows")]
#[test_case(Some(0) ; "one frozen row")]
#[test_case(Some(4) ; "five frozen rows")]
fn test_start_is_monotonic_in_fraction(frozen: Option<i64>) {
    let mut rows = synced(Axis::Row, &[(7, 90.0), (300, 5.0)], frozen);
    let mut previous = 0;
    for step in 0..=200u32 {
        let fraction = f64::from(step) / 200.0;
        rows.scroll_to_fraction(fraction);
        let (start, end) = rows.window();
        assert!(start >= previous, "start went back at fraction {fraction}");
        assert!(end >= start);
        assert!(end < rows.amount());
        assert!(start >= rows.first_scrollable());
        previous = start;
    }
    assert_eq!(rows.start(), rows.amount() - 1);
}

#[test]
fn test_fraction_maps_to_rounded_index() {
    let mut rows = synced(Axis::Row, &[], None);
    rows.scroll_to_fraction(0.5);
    // round(1001 * 0.5)
    assert_eq!(rows.start(), 501);
    rows.scroll_to_fraction(f64::NAN);
    assert_eq!(rows.start(), 0);
}

#[test]
fn test_window_fills_the_scrolling_pane() {
    let rows = synced(Axis::Row, &[], None);
    // 575px of rows after the header: 23 full rows.
    assert_eq!(rows.window(), (0, 22));
    let frozen = synced(Axis::Row, &[], Some(1));
    assert_eq!(frozen.window(), (2, 22));
    assert_eq!(frozen.frozen_size(), 50.0);
}

#[test]
fn test_end_index_from_start_counts_partial_lines() {
    let rows = synced(Axis::Row, &[], None);
    assert_eq!(rows.end_index_from_start(50.0, 10), 11);
    assert_eq!(rows.end_index_from_start(50.5, 10), 12);
    assert_eq!(rows.end_index_from_start(1e9, 10), 999);
    assert_eq!(rows.end_index_from_start(0.0, 2000), 999);
}

#[test]
fn test_pixel_scroll_moves_by_whole_lines() {
    let mut rows = synced(Axis::Row, &[], None);
    rows.scroll_by_pixels(30.0);
    assert_eq!(rows.start(), 1);
    rows.scroll_by_pixels(-500.0);
    assert_eq!(rows.start(), 0);
    rows.scroll_by_pixels(1e9);
    assert_eq!(rows.start(), 999);
}

#[test]
fn test_viewport_resize_recomputes_end() {
    let mut cols = synced(Axis::Col, &[], None);
    assert_eq!(cols.window(), (0, 7));
    cols.resize_viewport(1240.0);
    assert_eq!(cols.window(), (0, 11));
}

// ============================================================================
// SCROLLBAR
// ============================================================================

#[test]
fn test_thumb_has_minimum_size_and_tracks_fraction() {
    let mut rows = synced(Axis::Row, &[], None);
    let scrollbar = Scrollbar::default();
    let top = scrollbar.geometry(&rows);
    assert_eq!(top.track_start, 25.0);
    assert_eq!(top.track_size, 575.0);
    assert_eq!(top.thumb_size, 20.0);
    assert_eq!(top.thumb_offset, 0.0);

    rows.scroll_to_fraction(1.0);
    let bottom = scrollbar.geometry(&rows);
    assert_eq!(bottom.thumb_offset + bottom.thumb_size, bottom.track_size);
}

#[test]
fn test_track_starts_after_frozen_pane() {
    let rows = synced(Axis::Row, &[], Some(2));
    let geometry = Scrollbar::default().geometry(&rows);
    assert_eq!(geometry.track_start, 25.0 + 75.0);
    assert_eq!(geometry.track_size, 600.0 - 25.0 - 75.0);
}

#[test]
fn test_thumb_drag_scrolls_proportionally() {
    let mut rows = synced(Axis::Row, &[], None);
    let mut scrollbar = Scrollbar::default();
    // Grab the thumb at its middle.
    assert_eq!(scrollbar.pointer_down(&mut rows, 35.0), 0.0);
    assert!(scrollbar.is_dragging());
    scrollbar.pointer_move(&mut rows, 600.0);
    assert_eq!(rows.start(), 999);
    scrollbar.pointer_up();
    assert!(!scrollbar.is_dragging());
    assert_eq!(scrollbar.pointer_move(&mut rows, 25.0), 0.0);
    assert_eq!(rows.start(), 999);
}

#[test]
fn test_track_click_jumps() {
    let mut rows = synced(Axis::Row, &[], None);
    let mut scrollbar = Scrollbar::default();
    let delta = scrollbar.pointer_down(&mut rows, 25.0 + 575.0 / 2.0);
    assert!(delta < 0.0);
    assert!(rows.start() > 400 && rows.start() < 600);
    assert!(!scrollbar.is_dragging());
}
