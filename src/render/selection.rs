//! Selection overlay helpers.
//!
//! These helpers keep selection math testable without depending on Canvas APIs.

use crate::address::{Axis, RangeSimpleCellAddress, SimpleCellAddress};
use crate::layout::AxisManager;
use crate::types::{Pane, Rect, SelectionGroup};

use super::region::PositionedRegion;

/// What the backend draws for the current selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionOverlay {
    pub groups: Vec<SelectionGroup>,
    /// The anchor cell, spanning its merge.
    pub active: Option<PositionedRegion>,
    /// Below 1.0 while a drag is in progress
    pub opacity: f64,
}

/// Part of `[min, max]` inside the frozen indices, then the part after them.
fn split_axis(min: u32, max: u32, manager: &AxisManager) -> (Option<(u32, u32)>, Option<(u32, u32)>) {
    let last = manager.amount() - 1;
    if min > last {
        return (None, None);
    }
    let max = max.min(last);

    let frozen = manager.frozen().and_then(|boundary| {
        let end = max.min(boundary);
        (min <= end).then_some((min, end))
    });
    let first_scrollable = manager.frozen().map_or(0, |b| b.saturating_add(1));
    let scrolling = if max >= first_scrollable {
        let start = min.max(first_scrollable);
        (start <= max).then_some((start, max))
    } else {
        None
    };
    (frozen, scrolling)
}

/// Partition a selection into one group per pane it touches, each with its
/// sheet-space bounding rectangle and the outer edges it carries.
pub fn selection_groups(
    selection: &RangeSimpleCellAddress,
    rows: &AxisManager,
    cols: &AxisManager,
) -> Vec<SelectionGroup> {
    let (min_row, max_row) = (selection.start(Axis::Row), selection.end(Axis::Row));
    let (min_col, max_col) = (selection.start(Axis::Col), selection.end(Axis::Col));
    let (frozen_row_range, scroll_row_range) = split_axis(min_row, max_row, rows);
    let (frozen_col_range, scroll_col_range) = split_axis(min_col, max_col, cols);
    let sheet = selection.sheet();

    let mut groups = Vec::new();

    let mut push_group = |row_range: (u32, u32), col_range: (u32, u32), pane: Pane| {
        let (row_start, row_end) = row_range;
        let (col_start, col_end) = col_range;
        let x1 = cols.get_axis(col_start);
        let y1 = rows.get_axis(row_start);
        let x2 = cols.get_axis(col_end.saturating_add(1));
        let y2 = rows.get_axis(row_end.saturating_add(1));
        let w = (x2 - x1).max(0.0);
        let h = (y2 - y1).max(0.0);
        if w <= 0.0 || h <= 0.0 {
            return;
        }

        groups.push(SelectionGroup {
            pane,
            range: RangeSimpleCellAddress::new(
                SimpleCellAddress::new(sheet, row_start, col_start),
                SimpleCellAddress::new(sheet, row_end, col_end),
            ),
            rect: Rect::new(x1, y1, w, h),
            draw_top: row_start == min_row,
            draw_bottom: row_end == max_row,
            draw_left: col_start == min_col,
            draw_right: col_end == max_col,
        });
    };

    if let (Some(row_range), Some(col_range)) = (frozen_row_range, frozen_col_range) {
        push_group(row_range, col_range, Pane::FrozenCorner);
    }
    if let (Some(row_range), Some(col_range)) = (frozen_row_range, scroll_col_range) {
        push_group(row_range, col_range, Pane::FrozenRow);
    }
    if let (Some(row_range), Some(col_range)) = (scroll_row_range, frozen_col_range) {
        push_group(row_range, col_range, Pane::FrozenCol);
    }
    if let (Some(row_range), Some(col_range)) = (scroll_row_range, scroll_col_range) {
        push_group(row_range, col_range, Pane::Main);
    }

    groups
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::options::GridOptions;
    use crate::store::DataStore;

    fn axes(frozen_row: Option<i64>, frozen_col: Option<i64>) -> (AxisManager, AxisManager) {
        let options = GridOptions::default();
        let mut store = DataStore::new();
        store.set_sheet(0, "Sheet1");
        store.set_frozen_cell(0, frozen_row, frozen_col);
        let mut rows = AxisManager::new(Axis::Row, &options);
        let mut cols = AxisManager::new(Axis::Col, &options);
        rows.sync(store.data(), 0);
        cols.sync(store.data(), 0);
        (rows, cols)
    }

    fn range(r1: u32, c1: u32, r2: u32, c2: u32) -> RangeSimpleCellAddress {
        RangeSimpleCellAddress::new(SimpleCellAddress::new(0, r1, c1), SimpleCellAddress::new(0, r2, c2))
    }

    #[test]
    fn unfrozen_selection_is_one_group() {
        let (rows, cols) = axes(None, None);
        let groups = selection_groups(&range(1, 1, 2, 2), &rows, &cols);
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.pane, Pane::Main);
        assert_eq!(group.rect, Rect::new(140.0, 50.0, 200.0, 50.0));
        assert!(group.draw_top && group.draw_bottom && group.draw_left && group.draw_right);
    }

    #[test]
    fn selection_groups_split_frozen_rows() {
        let (rows, cols) = axes(Some(0), None);
        let groups = selection_groups(&range(0, 0, 2, 1), &rows, &cols);
        assert_eq!(groups.len(), 2);

        let frozen = groups.iter().find(|g| g.draw_top).unwrap();
        let scroll = groups.iter().find(|g| g.draw_bottom).unwrap();
        assert_eq!(frozen.pane, Pane::FrozenRow);
        assert_eq!(scroll.pane, Pane::Main);
        assert!(!frozen.draw_bottom);
        assert!(!scroll.draw_top);
        assert_eq!(scroll.range.start(Axis::Row), 1);
    }

    #[test]
    fn selection_over_both_boundaries_yields_four_panes() {
        let (rows, cols) = axes(Some(1), Some(1));
        let groups = selection_groups(&range(0, 0, 4, 4), &rows, &cols);
        let panes: Vec<Pane> = groups.iter().map(|g| g.pane).collect();
        assert_eq!(
            panes,
            vec![Pane::FrozenCorner, Pane::FrozenRow, Pane::FrozenCol, Pane::Main]
        );
    }

    #[test]
    fn selection_beyond_the_sheet_is_dropped() {
        let (rows, cols) = axes(None, None);
        assert!(selection_groups(&range(5000, 0, 5001, 0), &rows, &cols).is_empty());
    }
}
