//! Structural shifts of grid-only state.
//!
//! The engine moves cell contents on row/col insert and delete; these
//! functions move everything the engine does not know about: cell records,
//! merges, the frozen boundary and size overrides.

use std::collections::BTreeMap;

use crate::address::{Axis, RangeSimpleCellAddress, RowColAddress, SheetId, SimpleCellAddress};
use crate::store::DataStore;
use crate::types::{CellData, FrozenCell, MergedCell};

/// Everything the grid stores for one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetState {
    pub id: SheetId,
    pub name: String,
    pub cells: BTreeMap<SimpleCellAddress, CellData>,
    /// Keyed by top-left
    pub merges: BTreeMap<SimpleCellAddress, MergedCell>,
    pub frozen: Option<FrozenCell>,
    pub rows: BTreeMap<u32, f64>,
    pub cols: BTreeMap<u32, f64>,
}

impl SheetState {
    /// Copy of `sheet` out of the store, `None` if the sheet does not exist.
    pub fn capture(store: &DataStore, sheet: SheetId) -> Option<Self> {
        let data = store.data();
        let meta = data.sheet(sheet)?;
        Some(Self {
            id: sheet,
            name: meta.sheet_name.clone(),
            cells: meta
                .cells
                .iter()
                .filter_map(|a| data.cell(a).map(|c| (*a, c.clone())))
                .collect(),
            merges: data.merges_in_sheet(sheet).collect(),
            frozen: data.frozen_cell(sheet).copied(),
            rows: data.size_overrides_in_sheet(Axis::Row, sheet).collect(),
            cols: data.size_overrides_in_sheet(Axis::Col, sheet).collect(),
        })
    }

    /// Replace whatever the store holds for `sheet` with `state`; `None`
    /// removes the sheet's records.
    pub fn restore(store: &mut DataStore, sheet: SheetId, state: Option<&SheetState>) {
        store.remove_sheet_records(sheet);
        let Some(state) = state else {
            return;
        };
        store.set_sheet(sheet, &state.name);
        for (address, cell) in &state.cells {
            store.put_cell(*address, cell.clone());
        }
        for (top_left, merged) in &state.merges {
            store.put_merged_cell(*top_left, *merged);
        }
        if let Some(frozen) = state.frozen {
            store.put_frozen_cell(sheet, frozen);
        }
        for (index, size) in &state.rows {
            store.set_row_col(Axis::Row, RowColAddress::new(sheet, *index), *size);
        }
        for (index, size) in &state.cols {
            store.set_row_col(Axis::Col, RowColAddress::new(sheet, *index), *size);
        }
    }

    fn sizes_mut(&mut self, axis: Axis) -> &mut BTreeMap<u32, f64> {
        match axis {
            Axis::Row => &mut self.rows,
            Axis::Col => &mut self.cols,
        }
    }

    fn frozen_mut(&mut self, axis: Axis) -> Option<&mut Option<u32>> {
        self.frozen.as_mut().map(|f| match axis {
            Axis::Row => &mut f.row,
            Axis::Col => &mut f.col,
        })
    }

    /// Insert `amount` lines before `index` on `axis`.
    pub fn insert_lines(&mut self, axis: Axis, index: u32, amount: u32) {
        if amount == 0 {
            return;
        }
        let shift = |at: u32| if at >= index { at.saturating_add(amount) } else { at };

        // Merges: a merge spanning `index` grows, one after it moves.
        let mut moved_top_lefts: BTreeMap<SimpleCellAddress, SimpleCellAddress> = BTreeMap::new();
        let merges = std::mem::take(&mut self.merges);
        for (top_left, merged) in merges {
            let range = merged.range(top_left);
            let (start, end) = (range.start(axis), range.end(axis));
            let (new_top_left, new_merged) = if end < index {
                (top_left, merged)
            } else if start <= index {
                (top_left, grow(merged, axis, amount))
            } else {
                (top_left.with_index(axis, shift(start)), merged)
            };
            moved_top_lefts.insert(top_left, new_top_left);
            self.merges.insert(new_top_left, new_merged);
        }

        // Records follow their merge's top-left; everything else shifts.
        let cells = std::mem::take(&mut self.cells);
        self.cells = cells
            .into_iter()
            .map(|(address, cell)| {
                let moved = moved_top_lefts
                    .get(&address)
                    .copied()
                    .unwrap_or_else(|| address.with_index(axis, shift(address.index(axis))));
                (moved, cell)
            })
            .collect();

        let sizes = std::mem::take(self.sizes_mut(axis));
        *self.sizes_mut(axis) = sizes.into_iter().map(|(at, size)| (shift(at), size)).collect();

        if let Some(boundary) = self.frozen_mut(axis) {
            if let Some(b) = boundary.as_mut() {
                if index <= *b {
                    *b = b.saturating_add(amount);
                }
            }
        }
    }

    /// Delete lines `index..index + amount` on `axis`.
    pub fn remove_lines(&mut self, axis: Axis, index: u32, amount: u32) {
        if amount == 0 {
            return;
        }
        let end_excl = index.saturating_add(amount);
        let shift = |at: u32| -> Option<u32> {
            if at < index {
                Some(at)
            } else if at < end_excl {
                None
            } else {
                Some(at - amount)
            }
        };

        let merges = std::mem::take(&mut self.merges);
        for (top_left, merged) in merges {
            let range = merged.range(top_left);
            let (start, end) = (range.start(axis), range.end(axis));
            if end < index {
                self.merges.insert(top_left, merged);
                continue;
            }
            if start >= end_excl {
                self.merges.insert(top_left.with_index(axis, start - amount), merged);
                continue;
            }
            let overlap = end.min(end_excl - 1) - start.max(index) + 1;
            let span = merged_span(merged, axis) - overlap;
            if span == 0 {
                continue;
            }
            let shrunk = with_span(merged, axis, span);
            if shrunk.is_single_cell() {
                continue;
            }
            self.merges.insert(top_left.with_index(axis, start.min(index)), shrunk);
        }

        let cells = std::mem::take(&mut self.cells);
        self.cells = cells
            .into_iter()
            .filter_map(|(address, cell)| {
                shift(address.index(axis)).map(|at| (address.with_index(axis, at), cell))
            })
            .collect();

        let sizes = std::mem::take(self.sizes_mut(axis));
        *self.sizes_mut(axis) = sizes
            .into_iter()
            .filter_map(|(at, size)| shift(at).map(|at| (at, size)))
            .collect();

        if let Some(boundary) = self.frozen_mut(axis) {
            if let Some(b) = *boundary {
                if index <= b {
                    let removed = amount.min(b - index + 1);
                    *boundary = b.checked_sub(removed);
                }
            }
        }
        if self.frozen.is_some_and(|f| f.row.is_none() && f.col.is_none()) {
            self.frozen = None;
        }
    }

    /// Drop merges overlapping `range`.
    pub fn drop_merges_overlapping(&mut self, range: &RangeSimpleCellAddress) {
        self.merges.retain(|top_left, merged| !merged.range(*top_left).overlaps(range));
    }
}

fn merged_span(merged: MergedCell, axis: Axis) -> u32 {
    match axis {
        Axis::Row => merged.height,
        Axis::Col => merged.width,
    }
}

fn with_span(merged: MergedCell, axis: Axis, span: u32) -> MergedCell {
    match axis {
        Axis::Row => MergedCell::new(merged.width, span),
        Axis::Col => MergedCell::new(span, merged.height),
    }
}

fn grow(merged: MergedCell, axis: Axis, amount: u32) -> MergedCell {
    with_span(merged, axis, merged_span(merged, axis).saturating_add(amount))
}

/// Apply a row/col insert or delete to `sheet` in the store.
pub fn shift_lines(store: &mut DataStore, sheet: SheetId, axis: Axis, index: u32, amount: u32, insert: bool) {
    let Some(mut state) = SheetState::capture(store, sheet) else {
        return;
    };
    if insert {
        state.insert_lines(axis, index, amount);
    } else {
        state.remove_lines(axis, index, amount);
    }
    SheetState::restore(store, sheet, Some(&state));
}

/// Move cell records and the merges lying wholly inside `source` so that
/// `source.top_left` lands on `destination`. Whatever the target held is
/// replaced; merges overlapping the target are dropped.
pub fn move_cells(store: &mut DataStore, source: RangeSimpleCellAddress, destination: SimpleCellAddress) {
    let target = RangeSimpleCellAddress::from_span(destination, source.width(), source.height());
    let relocate = |address: SimpleCellAddress| {
        Some(SimpleCellAddress::new(
            destination.sheet,
            destination.row.checked_add(address.row - source.top_left.row)?,
            destination.col.checked_add(address.col - source.top_left.col)?,
        ))
    };

    let moved_cells: Vec<(SimpleCellAddress, CellData)> = source
        .addresses()
        .filter_map(|address| store.take_cell(address).map(|cell| (address, cell)))
        .collect();
    let moved_merges: Vec<(SimpleCellAddress, MergedCell)> = store
        .merges_overlapping(&source)
        .into_iter()
        .filter(|(top_left, merged)| source.contains_range(&merged.range(*top_left)))
        .collect();
    for (top_left, _) in &moved_merges {
        store.delete_merged_cell(*top_left);
    }

    for address in target.addresses() {
        store.take_cell(address);
    }
    for (top_left, _) in store.merges_overlapping(&target) {
        store.delete_merged_cell(top_left);
    }

    for (address, cell) in moved_cells {
        if let Some(address) = relocate(address) {
            store.put_cell(address, cell);
        }
    }
    for (top_left, merged) in moved_merges {
        if let Some(top_left) = relocate(top_left) {
            store.put_merged_cell(top_left, merged);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn addr(row: u32, col: u32) -> SimpleCellAddress {
        SimpleCellAddress::new(0, row, col)
    }

    fn state() -> SheetState {
        let mut store = DataStore::new();
        store.set_sheet(0, "Sheet1");
        SheetState::capture(&store, 0).unwrap()
    }

    #[test]
    fn insert_inside_merge_grows_it() {
        let mut s = state();
        s.merges.insert(addr(1, 1), MergedCell::new(2, 2));
        s.insert_lines(Axis::Row, 1, 1);
        assert_eq!(s.merges.get(&addr(1, 1)), Some(&MergedCell::new(2, 3)));
    }

    #[test]
    fn insert_before_merge_moves_it_with_its_record() {
        let mut s = state();
        s.merges.insert(addr(3, 0), MergedCell::new(2, 2));
        s.cells.insert(addr(3, 0), CellData::with_value("x"));
        s.insert_lines(Axis::Row, 1, 2);
        assert_eq!(s.merges.get(&addr(5, 0)), Some(&MergedCell::new(2, 2)));
        assert!(s.cells.contains_key(&addr(5, 0)));
    }

    #[test]
    fn merge_anchored_at_insert_index_keeps_its_record() {
        let mut s = state();
        s.merges.insert(addr(2, 0), MergedCell::new(1, 2));
        s.cells.insert(addr(2, 0), CellData::with_value("top"));
        s.cells.insert(addr(4, 0), CellData::with_value("below"));
        s.insert_lines(Axis::Row, 2, 1);
        assert_eq!(s.merges.get(&addr(2, 0)), Some(&MergedCell::new(1, 3)));
        assert!(s.cells.contains_key(&addr(2, 0)));
        assert!(s.cells.contains_key(&addr(5, 0)));
    }

    #[test]
    fn delete_collapsing_merge_removes_it() {
        let mut s = state();
        s.merges.insert(addr(1, 1), MergedCell::new(1, 2));
        s.remove_lines(Axis::Row, 1, 1);
        assert!(s.merges.is_empty());
    }

    #[test]
    fn delete_through_merge_top_moves_top_left_up() {
        let mut s = state();
        s.merges.insert(addr(2, 0), MergedCell::new(2, 4));
        s.remove_lines(Axis::Row, 1, 2);
        assert_eq!(s.merges.get(&addr(1, 0)), Some(&MergedCell::new(2, 3)));
    }

    #[test]
    fn frozen_boundary_follows_deletes() {
        let mut s = state();
        s.frozen = Some(FrozenCell {
            row: Some(2),
            col: Some(1),
        });
        s.remove_lines(Axis::Row, 1, 1);
        assert_eq!(s.frozen.unwrap().row, Some(1));

        s.remove_lines(Axis::Col, 0, 5);
        assert_eq!(s.frozen.unwrap().col, None);

        s.remove_lines(Axis::Row, 0, 2);
        assert!(s.frozen.is_none());
    }

    #[test]
    fn sizes_shift_and_drop() {
        let mut s = state();
        s.rows.insert(1, 40.0);
        s.rows.insert(5, 60.0);
        s.remove_lines(Axis::Row, 1, 2);
        assert_eq!(s.rows.into_iter().collect::<Vec<_>>(), vec![(3, 60.0)]);
    }

    #[test]
    fn restore_round_trips_through_store() {
        let mut store = DataStore::new();
        store.set_sheet(0, "Data");
        store.put_cell(addr(0, 0), CellData::with_value("a"));
        store.put_merged_cell(addr(1, 1), MergedCell::new(2, 2));
        store.set_frozen_cell(0, Some(0), None);
        store.set_row_col(Axis::Col, RowColAddress::new(0, 3), 150.0);

        let captured = SheetState::capture(&store, 0).unwrap();
        SheetState::restore(&mut store, 0, None);
        assert!(!store.has_sheet(0));
        SheetState::restore(&mut store, 0, Some(&captured));
        assert_eq!(SheetState::capture(&store, 0), Some(captured));
    }

    #[test]
    fn move_cells_carries_contained_merges() {
        let mut store = DataStore::new();
        store.set_sheet(0, "Sheet1");
        store.put_cell(addr(0, 0), CellData::with_value("a"));
        store.put_merged_cell(addr(0, 0), MergedCell::new(2, 1));
        store.put_merged_cell(addr(10, 10), MergedCell::new(2, 2));

        let source = RangeSimpleCellAddress::new(addr(0, 0), addr(0, 1));
        move_cells(&mut store, source, addr(10, 9));

        assert!(store.data().cell(&addr(0, 0)).is_none());
        assert_eq!(
            store.data().cell(&addr(10, 9)).and_then(|c| c.value.clone()),
            Some("a".to_string())
        );
        assert_eq!(store.data().merged_cell(&addr(10, 9)), Some(&MergedCell::new(2, 1)));
        assert!(store.data().merged_cell(&addr(10, 10)).is_none());
    }

    #[test]
    fn move_past_the_last_index_drops_overflowing_records() {
        let mut store = DataStore::new();
        store.set_sheet(0, "Sheet1");
        store.put_cell(addr(0, 0), CellData::with_value("kept"));
        store.put_cell(addr(0, 1), CellData::with_value("lost"));

        let source = RangeSimpleCellAddress::new(addr(0, 0), addr(0, 1));
        move_cells(&mut store, source, addr(0, u32::MAX));

        assert!(store.data().cell(&addr(0, u32::MAX)).is_some());
        assert_eq!(store.data().cells.len(), 1);
    }
}
