//! Tests for selection across frozen panes and the pointer entry points.
//!
//! A selection that straddles a frozen boundary is split into one group per
//! pane, each carrying only the outer edges of the whole selection.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp
)]

use sheetgrid::{
    Axis, GridOptions, MemoryEngine, Pane, PointerTarget, RangeSimpleCellAddress, Rect, SimpleCellAddress,
    Spreadsheet,
};
use test_case::test_case;

fn spreadsheet() -> Spreadsheet<MemoryEngine> {
    Spreadsheet::new(MemoryEngine::new(), GridOptions::default()).unwrap()
}

fn addr(row: u32, col: u32) -> SimpleCellAddress {
    SimpleCellAddress::new(0, row, col)
}

fn range(r1: u32, c1: u32, r2: u32, c2: u32) -> RangeSimpleCellAddress {
    RangeSimpleCellAddress::new(addr(r1, c1), addr(r2, c2))
}

/// Viewport pixel inside `(row, col)` with default sizes and no scroll.
fn px(row: u32, col: u32) -> (f64, f64) {
    (40.0 + f64::from(col) * 100.0 + 50.0, 25.0 + f64::from(row) * 25.0 + 12.0)
}

// ============================================================================
// FROZEN PANE GROUPS
// ============================================================================

#[test]
fn test_selection_split_across_four_panes() {
    let mut sheet = spreadsheet();
    sheet.freeze(Some(1), Some(0));
    sheet.select(range(0, 0, 5, 3));

    let groups = sheet.selection_groups();
    let panes: Vec<Pane> = groups.iter().map(|g| g.pane).collect();
    assert_eq!(
        panes,
        vec![Pane::FrozenCorner, Pane::FrozenRow, Pane::FrozenCol, Pane::Main]
    );

    let corner = &groups[0];
    assert_eq!(corner.range, range(0, 0, 1, 0));
    assert!(corner.draw_top && corner.draw_left);
    assert!(!corner.draw_bottom && !corner.draw_right);

    let main = &groups[3];
    assert_eq!(main.range, range(2, 1, 5, 3));
    assert_eq!(main.rect, Rect::new(140.0, 75.0, 300.0, 100.0));
    assert!(main.draw_bottom && main.draw_right);
    assert!(!main.draw_top && !main.draw_left);
}

#[test_case(range(0, 2, 1, 4), Pane::FrozenRow ; "inside frozen rows")]
#[test_case(range(4, 0, 9, 0), Pane::FrozenCol ; "inside frozen cols")]
#[test_case(range(0, 0, 1, 0), Pane::FrozenCorner ; "inside corner")]
#[test_case(range(6, 6, 8, 8), Pane::Main ; "scrolling pane only")]
fn test_selection_inside_one_pane(selection: RangeSimpleCellAddress, pane: Pane) {
    let mut sheet = spreadsheet();
    sheet.freeze(Some(1), Some(0));
    sheet.select(selection);

    let groups = sheet.selection_groups();
    assert_eq!(groups.len(), 1);
    let group = &groups[0];
    assert_eq!(group.pane, pane);
    assert_eq!(group.range, selection);
    assert!(group.draw_top && group.draw_bottom && group.draw_left && group.draw_right);
}

#[test]
fn test_groups_stay_in_sheet_space_while_scrolled() {
    let mut sheet = spreadsheet();
    sheet.freeze(Some(1), None);
    sheet.select(range(0, 1, 30, 1));
    let before = sheet.selection_groups();

    sheet.wheel(0.0, 200.0, 0.0);
    assert!(sheet.rows().start() > 2);
    assert_eq!(sheet.selection_groups(), before);

    // Only the scrolling pane moves.
    let offsets = sheet.pane_offsets();
    let main = offsets.iter().find(|(pane, _)| *pane == Pane::Main).unwrap().1;
    let frozen = offsets.iter().find(|(pane, _)| *pane == Pane::FrozenRow).unwrap().1;
    assert!(main.1 < 0.0);
    assert_eq!(frozen.1, 0.0);
}

#[test]
fn test_unfreezing_merges_groups_back() {
    let mut sheet = spreadsheet();
    sheet.freeze(Some(1), Some(0));
    sheet.select(range(0, 0, 5, 3));
    assert_eq!(sheet.selection_groups().len(), 4);

    sheet.unfreeze();
    let groups = sheet.selection_groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].pane, Pane::Main);
}

// ============================================================================
// POINTER INPUT
// ============================================================================

#[test]
fn test_hit_test_regions() {
    let sheet = spreadsheet();
    assert_eq!(sheet.hit_test(20.0, 10.0), PointerTarget::Nothing);
    assert_eq!(
        sheet.hit_test(138.0, 10.0),
        PointerTarget::ResizeHandle {
            axis: Axis::Col,
            index: 0
        }
    );
    assert_eq!(sheet.hit_test(90.0, 10.0), PointerTarget::Nothing);
    assert_eq!(
        sheet.hit_test(20.0, 49.0),
        PointerTarget::ResizeHandle {
            axis: Axis::Row,
            index: 0
        }
    );
    assert_eq!(sheet.hit_test(795.0, 300.0), PointerTarget::Scrollbar(Axis::Row));
    assert_eq!(sheet.hit_test(300.0, 596.0), PointerTarget::Scrollbar(Axis::Col));
    let (x, y) = px(3, 2);
    assert_eq!(sheet.hit_test(x, y), PointerTarget::Cell { row: 3, col: 2 });
}

#[test]
fn test_drag_shows_pending_range_at_drag_opacity() {
    let mut sheet = spreadsheet();
    let (x, y) = px(1, 1);
    assert!(sheet.pointer_down(x, y));
    let (x, y) = px(4, 2);
    assert!(sheet.pointer_move(x, y));

    assert_eq!(sheet.selection(), None);
    assert_eq!(sheet.selection_groups()[0].range, range(1, 1, 4, 2));
    let overlay = sheet.render_frame().selection.unwrap();
    assert_eq!(overlay.opacity, 0.5);

    assert!(sheet.pointer_up(x, y));
    assert_eq!(sheet.selection(), Some(range(1, 1, 4, 2)));
    assert_eq!(sheet.render_frame().selection.unwrap().opacity, 1.0);
}

#[test]
fn test_drag_released_over_header_is_dropped() {
    let mut sheet = spreadsheet();
    sheet.select(range(0, 0, 0, 0));
    let (x, y) = px(5, 5);
    sheet.pointer_down(x, y);
    sheet.pointer_move(px(6, 6).0, px(6, 6).1);
    sheet.pointer_up(x, 10.0);
    assert_eq!(sheet.selection(), Some(range(0, 0, 0, 0)));
    assert_eq!(sheet.selection_groups()[0].range, range(0, 0, 0, 0));
}

#[test]
fn test_drag_over_merge_pulls_it_in() {
    let mut sheet = spreadsheet();
    sheet.merge_cells(range(2, 2, 3, 3)).unwrap();
    let (x, y) = px(1, 1);
    sheet.pointer_down(x, y);
    let (x, y) = px(2, 2);
    sheet.pointer_move(x, y);
    sheet.pointer_up(x, y);
    assert_eq!(sheet.selection(), Some(range(1, 1, 3, 3)));
}

#[test]
fn test_scrollbar_track_press_scrolls() {
    let mut sheet = spreadsheet();
    assert!(sheet.pointer_down(795.0, 300.0));
    assert!(sheet.rows().start() > 400);
    // A track press jumps without grabbing the thumb, so release is a no-op.
    assert!(!sheet.pointer_up(795.0, 300.0));
    assert_eq!(sheet.selection(), None);
}

#[test]
fn test_cancel_abandons_drag() {
    let mut sheet = spreadsheet();
    let (x, y) = px(1, 1);
    sheet.pointer_down(x, y);
    sheet.pointer_cancel();
    assert!(!sheet.pointer_up(x, y));
    assert_eq!(sheet.selection(), None);
    assert!(sheet.selection_groups().is_empty());
}
