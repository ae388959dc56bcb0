//! Selection state machine.
//!
//! Pointer down fixes the anchor cell, moves grow the range, pointer up
//! commits it. Ranges never split a merge: any merge the range touches is
//! pulled in whole, repeatedly, until nothing partial is left.

use crate::address::{Axis, RangeSimpleCellAddress, SheetId, SimpleCellAddress};
use crate::layout::AxisManager;
use crate::merger::Merger;
use crate::render::{selection_groups, PositionedRegion, SelectionOverlay};
use crate::types::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    Idle,
    /// Drag in progress from `anchor`.
    Selecting { anchor: SimpleCellAddress },
}

#[derive(Debug, Clone)]
pub struct Selector {
    state: SelectorState,
    /// Last committed range
    selection: Option<RangeSimpleCellAddress>,
    /// Range under the pointer while dragging
    pending: Option<RangeSimpleCellAddress>,
    /// Anchor of the committed range
    active: Option<SimpleCellAddress>,
    drag_opacity: f64,
}

/// Cell under viewport pixel `(x, y)`, if not over a header.
pub fn cell_at(rows: &AxisManager, cols: &AxisManager, x: f64, y: f64) -> Option<(u32, u32)> {
    Some((rows.index_at_viewport_pixel(y)?, cols.index_at_viewport_pixel(x)?))
}

/// Grow `range` until every merge it touches lies entirely inside it.
pub fn expand_to_merges(range: RangeSimpleCellAddress, merger: &Merger) -> RangeSimpleCellAddress {
    let mut range = range;
    loop {
        let mut grew = false;
        for merge in merger.merges_overlapping(&range) {
            if range.contains_range(&merge) {
                continue;
            }
            for axis in [Axis::Row, Axis::Col] {
                grew |= range.limit_top_left_to_range(&merge, axis);
                grew |= range.limit_bottom_right_to_range(&merge, axis);
            }
        }
        if !grew {
            return range;
        }
    }
}

impl Selector {
    pub fn new(drag_opacity: f64) -> Self {
        Self {
            state: SelectorState::Idle,
            selection: None,
            pending: None,
            active: None,
            drag_opacity: drag_opacity.clamp(0.0, 1.0),
        }
    }

    pub fn state(&self) -> SelectorState {
        self.state
    }

    pub fn is_selecting(&self) -> bool {
        matches!(self.state, SelectorState::Selecting { .. })
    }

    /// The committed selection.
    pub fn selection(&self) -> Option<RangeSimpleCellAddress> {
        self.selection
    }

    /// The range to display: the drag range while selecting, else the
    /// committed one.
    pub fn current(&self) -> Option<RangeSimpleCellAddress> {
        self.pending.or(self.selection)
    }

    pub fn active_cell(&self) -> Option<SimpleCellAddress> {
        match self.state {
            SelectorState::Selecting { anchor } => Some(anchor),
            SelectorState::Idle => self.active,
        }
    }

    /// Replace the committed selection directly (expanded over merges).
    pub fn select(&mut self, range: RangeSimpleCellAddress, merger: &Merger) {
        self.state = SelectorState::Idle;
        self.pending = None;
        self.active = Some(range.top_left);
        self.selection = Some(expand_to_merges(range, merger));
    }

    pub fn clear(&mut self) {
        self.state = SelectorState::Idle;
        self.pending = None;
        self.selection = None;
        self.active = None;
    }

    /// Pointer pressed at a viewport pixel. Returns true if a drag started.
    pub fn pointer_down(
        &mut self,
        sheet: SheetId,
        x: f64,
        y: f64,
        rows: &AxisManager,
        cols: &AxisManager,
        merger: &Merger,
    ) -> bool {
        let Some((row, col)) = cell_at(rows, cols, x, y) else {
            return false;
        };
        let anchor = SimpleCellAddress::new(sheet, row, col);
        self.state = SelectorState::Selecting { anchor };
        self.pending = Some(expand_to_merges(RangeSimpleCellAddress::from_cell(anchor), merger));
        true
    }

    /// Pointer moved. Returns true if the drag range changed.
    pub fn pointer_move(
        &mut self,
        x: f64,
        y: f64,
        rows: &AxisManager,
        cols: &AxisManager,
        merger: &Merger,
    ) -> bool {
        let SelectorState::Selecting { anchor } = self.state else {
            return false;
        };
        let Some((row, col)) = cell_at(rows, cols, x, y) else {
            return false;
        };
        let corner = SimpleCellAddress::new(anchor.sheet, row, col);
        let range = expand_to_merges(RangeSimpleCellAddress::new(anchor, corner), merger);
        if self.pending == Some(range) {
            return false;
        }
        self.pending = Some(range);
        true
    }

    /// Pointer released. Over the grid the drag range is committed;
    /// released off the grid the drag is dropped and the previous selection
    /// stays. Returns the committed range.
    pub fn pointer_up(
        &mut self,
        x: f64,
        y: f64,
        rows: &AxisManager,
        cols: &AxisManager,
        merger: &Merger,
    ) -> Option<RangeSimpleCellAddress> {
        let SelectorState::Selecting { anchor } = self.state else {
            return None;
        };
        if cell_at(rows, cols, x, y).is_none() {
            self.pointer_cancel();
            return None;
        }
        self.pointer_move(x, y, rows, cols, merger);
        self.state = SelectorState::Idle;
        let committed = self.pending.take();
        if committed.is_some() {
            self.selection = committed;
            self.active = Some(anchor);
        }
        committed
    }

    /// Abandon the drag without committing.
    pub fn pointer_cancel(&mut self) {
        self.state = SelectorState::Idle;
        self.pending = None;
    }

    /// Drop a selection that no longer fits the sheet (after a delete or a
    /// sheet switch).
    pub fn retain_within(&mut self, sheet: SheetId, rows: &AxisManager, cols: &AxisManager) {
        let fits = |range: &RangeSimpleCellAddress| {
            range.sheet() == sheet
                && range.end(Axis::Row) < rows.amount()
                && range.end(Axis::Col) < cols.amount()
        };
        if !self.selection.as_ref().is_some_and(fits) {
            self.selection = None;
            self.active = None;
        }
        if !self.pending.as_ref().is_some_and(fits) {
            self.pointer_cancel();
        }
    }

    /// Groups, active cell and opacity for the backend.
    pub fn overlay(&self, rows: &AxisManager, cols: &AxisManager, merger: &Merger) -> Option<SelectionOverlay> {
        let range = self.current()?;
        let active = self.active_cell().map(|address| {
            let span = merger
                .merge_range(&address)
                .unwrap_or_else(|| RangeSimpleCellAddress::from_cell(address));
            let x = cols.get_axis(span.start(Axis::Col));
            let y = rows.get_axis(span.start(Axis::Row));
            let right = cols.get_axis(span.end(Axis::Col).saturating_add(1));
            let bottom = rows.get_axis(span.end(Axis::Row).saturating_add(1));
            PositionedRegion::new(span.top_left, Rect::new(x, y, right - x, bottom - y)).highlighted()
        });
        let opacity = if self.is_selecting() {
            self.drag_opacity
        } else {
            1.0
        };
        Some(SelectionOverlay {
            groups: selection_groups(&range, rows, cols),
            active,
            opacity,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::options::GridOptions;
    use crate::types::MergedCell;

    fn axes() -> (AxisManager, AxisManager) {
        let options = GridOptions::default();
        (
            AxisManager::new(Axis::Row, &options),
            AxisManager::new(Axis::Col, &options),
        )
    }

    fn addr(row: u32, col: u32) -> SimpleCellAddress {
        SimpleCellAddress::new(0, row, col)
    }

    /// Viewport pixel at the center of `(row, col)` with default sizes.
    fn px(row: u32, col: u32) -> (f64, f64) {
        (40.0 + f64::from(col) * 100.0 + 50.0, 25.0 + f64::from(row) * 25.0 + 12.0)
    }

    #[test]
    fn drag_commits_on_release() {
        let (rows, cols) = axes();
        let merger = Merger::new();
        let mut selector = Selector::new(0.5);

        let (x, y) = px(1, 1);
        assert!(selector.pointer_down(0, x, y, &rows, &cols, &merger));
        assert!(selector.is_selecting());
        let (x, y) = px(3, 2);
        assert!(selector.pointer_move(x, y, &rows, &cols, &merger));
        assert_eq!(selector.overlay(&rows, &cols, &merger).unwrap().opacity, 0.5);

        let committed = selector.pointer_up(x, y, &rows, &cols, &merger).unwrap();
        assert_eq!(committed, RangeSimpleCellAddress::new(addr(1, 1), addr(3, 2)));
        assert_eq!(selector.state(), SelectorState::Idle);
        assert_eq!(selector.active_cell(), Some(addr(1, 1)));
        assert_eq!(selector.overlay(&rows, &cols, &merger).unwrap().opacity, 1.0);
    }

    #[test]
    fn release_off_grid_keeps_previous_selection() {
        let (rows, cols) = axes();
        let merger = Merger::new();
        let mut selector = Selector::new(0.5);
        selector.select(RangeSimpleCellAddress::from_cell(addr(0, 0)), &merger);

        let (x, y) = px(4, 4);
        selector.pointer_down(0, x, y, &rows, &cols, &merger);
        assert!(selector.pointer_up(5.0, 5.0, &rows, &cols, &merger).is_none());
        assert_eq!(selector.selection(), Some(RangeSimpleCellAddress::from_cell(addr(0, 0))));
        assert_eq!(selector.active_cell(), Some(addr(0, 0)));
    }

    #[test]
    fn range_grows_over_touched_merges() {
        let mut merger = Merger::new();
        merger.add_merge(addr(2, 2), MergedCell::new(2, 2));
        merger.add_merge(addr(3, 4), MergedCell::new(1, 3));

        let grown = expand_to_merges(RangeSimpleCellAddress::new(addr(0, 0), addr(2, 2)), &merger);
        assert_eq!(grown, RangeSimpleCellAddress::new(addr(0, 0), addr(3, 3)));

        // Touches both merges.
        let chained = expand_to_merges(RangeSimpleCellAddress::new(addr(3, 3), addr(3, 4)), &merger);
        assert_eq!(chained, RangeSimpleCellAddress::new(addr(2, 2), addr(5, 4)));
    }

    #[test]
    fn active_cell_spans_its_merge() {
        let (rows, cols) = axes();
        let mut merger = Merger::new();
        merger.add_merge(addr(1, 1), MergedCell::new(2, 2));
        let mut selector = Selector::new(0.5);
        selector.select(RangeSimpleCellAddress::from_cell(addr(1, 1)), &merger);

        let overlay = selector.overlay(&rows, &cols, &merger).unwrap();
        let active = overlay.active.unwrap();
        assert_eq!(active.rect, Rect::new(140.0, 50.0, 200.0, 50.0));
        assert!(active.decoration.highlighted);
        assert_eq!(overlay.groups.len(), 1);
    }
}
