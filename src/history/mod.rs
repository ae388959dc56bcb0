//! Keeps grid-only state in step with the engine's undo/redo stream.
//!
//! The engine owns structural mutation (row/col insert and delete, sheets,
//! moves) but knows nothing about merges, frozen panes, size overrides or
//! cell styles. For every history entry the grid stores what changed on the
//! touched sheets; undo puts back the old side, redo the new one. Entries the
//! grid never saw performed fall back to applying the structural shift (or
//! its inverse) directly.
//!
//! Records of undone entries are dropped once a new entry is performed,
//! since the engine has discarded its redo stack by then.

mod diff;
mod shift;

use std::collections::{BTreeMap, BTreeSet, HashMap};

pub use shift::{move_cells, shift_lines, SheetState};

use self::diff::{SheetDiff, Side};
use crate::address::{RangeSimpleCellAddress, SheetId};
use crate::engine::{HistoryDirection, HistoryEvent, UndoEntry};
use crate::store::DataStore;

/// State of a set of sheets; `None` means the sheet did not exist.
pub type Snapshot = Vec<(SheetId, Option<SheetState>)>;

#[derive(Debug, Clone)]
struct Record {
    changes: Vec<SheetDiff>,
}

impl Record {
    fn apply(&self, store: &mut DataStore, side: Side) {
        match side {
            Side::Before => self.changes.iter().rev().for_each(|d| d.apply(store, side)),
            Side::After => self.changes.iter().for_each(|d| d.apply(store, side)),
        }
    }
}

#[derive(Debug, Default)]
pub struct HistorySync {
    records: HashMap<u64, Record>,
    /// Ids undone and not redone since the last new entry
    undone: Vec<u64>,
}

impl HistorySync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current state of `sheets`.
    pub fn capture(store: &DataStore, sheets: impl IntoIterator<Item = SheetId>) -> Snapshot {
        let sheets: BTreeSet<SheetId> = sheets.into_iter().collect();
        sheets
            .into_iter()
            .map(|sheet| (sheet, SheetState::capture(store, sheet)))
            .collect()
    }

    /// Store what changed between `before` and `after` for history entry
    /// `id`. Both snapshots are expected to cover the same sheets.
    pub fn register(&mut self, id: u64, before: &Snapshot, after: &Snapshot) {
        let after: BTreeMap<SheetId, Option<&SheetState>> =
            after.iter().map(|(sheet, state)| (*sheet, state.as_ref())).collect();
        let changes = before
            .iter()
            .filter_map(|(sheet, old)| {
                let new = after.get(sheet).copied().flatten();
                SheetDiff::between(*sheet, old.as_ref(), new)
            })
            .collect();
        self.records.insert(id, Record { changes });
    }

    pub fn is_registered(&self, id: u64) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Changed values held across every record.
    pub fn change_count(&self) -> usize {
        self.records
            .values()
            .flat_map(|record| &record.changes)
            .map(SheetDiff::len)
            .sum()
    }

    /// Forget every record, e.g. after loading a snapshot.
    pub fn clear(&mut self) {
        self.records.clear();
        self.undone.clear();
    }

    /// Replay engine history events onto the store. Returns true if any
    /// grid state changed.
    pub fn handle(&mut self, store: &mut DataStore, events: &[HistoryEvent]) -> bool {
        let mut changed = false;
        for event in events {
            changed |= self.handle_event(store, event);
        }
        changed
    }

    fn handle_event(&mut self, store: &mut DataStore, event: &HistoryEvent) -> bool {
        match event.direction {
            HistoryDirection::Do => {
                for id in self.undone.drain(..) {
                    if id != event.id {
                        self.records.remove(&id);
                    }
                }
                if self.is_registered(event.id) {
                    return false;
                }
                if !is_structural(&event.entry) {
                    return false;
                }
                let sheets = event.entry.sheets();
                let before = Self::capture(store, sheets.iter().copied());
                apply_forward(store, &event.entry);
                let after = Self::capture(store, sheets);
                self.register(event.id, &before, &after);
                true
            }
            HistoryDirection::Undo => {
                if !self.undone.contains(&event.id) {
                    self.undone.push(event.id);
                }
                match self.records.get(&event.id) {
                    Some(record) => {
                        record.apply(store, Side::Before);
                        true
                    }
                    None => apply_inverse(store, &event.entry),
                }
            }
            HistoryDirection::Redo => {
                self.undone.retain(|id| *id != event.id);
                match self.records.get(&event.id) {
                    Some(record) => {
                        record.apply(store, Side::After);
                        true
                    }
                    None => apply_forward(store, &event.entry),
                }
            }
        }
    }
}

/// Entries whose effect on grid state can be derived from the entry alone.
fn is_structural(entry: &UndoEntry) -> bool {
    match entry {
        UndoEntry::AddRows { .. }
        | UndoEntry::RemoveRows { .. }
        | UndoEntry::AddColumns { .. }
        | UndoEntry::RemoveColumns { .. }
        | UndoEntry::AddSheet { .. }
        | UndoEntry::RemoveSheet { .. }
        | UndoEntry::RenameSheet { .. }
        | UndoEntry::MoveCells { .. }
        | UndoEntry::Paste { .. } => true,
        UndoEntry::Batch { entries } => entries.iter().any(is_structural),
        _ => false,
    }
}

/// Apply `entry` as the engine just did. Returns true if grid state changed.
fn apply_forward(store: &mut DataStore, entry: &UndoEntry) -> bool {
    if let Some((sheet, axis, index, amount, insert)) = entry.as_row_col_change() {
        shift_lines(store, sheet, axis, index, amount, insert);
        return true;
    }
    match entry {
        UndoEntry::AddSheet { sheet, name } => {
            store.set_sheet(*sheet, name);
            true
        }
        UndoEntry::RemoveSheet { sheet, .. } => store.remove_sheet_records(*sheet).is_some(),
        UndoEntry::RenameSheet { sheet, new_name, .. } => rename(store, *sheet, new_name),
        UndoEntry::MoveCells {
            source,
            destination,
        } => {
            move_cells(store, *source, *destination);
            true
        }
        UndoEntry::Paste { target } => {
            let overlapping = store.merges_overlapping(target);
            for (top_left, _) in &overlapping {
                store.delete_merged_cell(*top_left);
            }
            !overlapping.is_empty()
        }
        UndoEntry::Batch { entries } => entries
            .iter()
            .fold(false, |changed, entry| apply_forward(store, entry) | changed),
        UndoEntry::Unrecognized => {
            log::debug!("ignoring unrecognized history entry");
            false
        }
        _ => false,
    }
}

/// Best-effort inverse of `entry` for entries without a stored record.
fn apply_inverse(store: &mut DataStore, entry: &UndoEntry) -> bool {
    if let Some((sheet, axis, index, amount, insert)) = entry.as_row_col_change() {
        shift_lines(store, sheet, axis, index, amount, !insert);
        return true;
    }
    match entry {
        UndoEntry::AddSheet { sheet, .. } => store.remove_sheet_records(*sheet).is_some(),
        UndoEntry::RemoveSheet { sheet, name } => {
            store.set_sheet(*sheet, name);
            true
        }
        UndoEntry::RenameSheet { sheet, old_name, .. } => rename(store, *sheet, old_name),
        UndoEntry::MoveCells {
            source,
            destination,
        } => {
            let moved = RangeSimpleCellAddress::from_span(
                *destination,
                source.width(),
                source.height(),
            );
            move_cells(store, moved, source.top_left);
            true
        }
        UndoEntry::Batch { entries } => entries
            .iter()
            .rev()
            .fold(false, |changed, entry| apply_inverse(store, entry) | changed),
        UndoEntry::Unrecognized => {
            log::debug!("ignoring unrecognized history entry");
            false
        }
        _ => false,
    }
}

fn rename(store: &mut DataStore, sheet: SheetId, name: &str) -> bool {
    if !store.has_sheet(sheet) {
        return false;
    }
    store.set_sheet(sheet, name);
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::address::SimpleCellAddress;
    use crate::types::MergedCell;

    fn addr(row: u32, col: u32) -> SimpleCellAddress {
        SimpleCellAddress::new(0, row, col)
    }

    fn event(id: u64, direction: HistoryDirection, entry: UndoEntry) -> HistoryEvent {
        HistoryEvent { id, direction, entry }
    }

    fn store() -> DataStore {
        let mut store = DataStore::new();
        store.set_sheet(0, "Sheet1");
        store.put_merged_cell(addr(1, 1), MergedCell::new(1, 2));
        store
    }

    #[test]
    fn undo_restores_collapsed_merge_exactly() {
        let mut store = store();
        let mut sync = HistorySync::new();
        let remove = UndoEntry::RemoveRows {
            sheet: 0,
            index: 1,
            amount: 1,
        };

        assert!(sync.handle(&mut store, &[event(1, HistoryDirection::Do, remove.clone())]));
        assert!(store.data().merged_cells.is_empty());

        sync.handle(&mut store, &[event(1, HistoryDirection::Undo, remove.clone())]);
        assert_eq!(store.data().merged_cell(&addr(1, 1)), Some(&MergedCell::new(1, 2)));

        sync.handle(&mut store, &[event(1, HistoryDirection::Redo, remove)]);
        assert!(store.data().merged_cells.is_empty());
    }

    #[test]
    fn registered_do_events_are_not_reapplied() {
        let mut store = store();
        let mut sync = HistorySync::new();
        let before = HistorySync::capture(&store, [0]);
        sync.register(4, &before, &before);

        let insert = UndoEntry::AddRows {
            sheet: 0,
            index: 0,
            amount: 3,
        };
        assert!(!sync.handle(&mut store, &[event(4, HistoryDirection::Do, insert)]));
        assert!(store.data().merged_cell(&addr(1, 1)).is_some());
    }

    #[test]
    fn new_entry_drops_undone_records() {
        let mut store = store();
        let mut sync = HistorySync::new();
        let insert = |index| UndoEntry::AddRows {
            sheet: 0,
            index,
            amount: 1,
        };
        sync.handle(&mut store, &[event(1, HistoryDirection::Do, insert(0))]);
        sync.handle(&mut store, &[event(2, HistoryDirection::Do, insert(5))]);
        sync.handle(&mut store, &[event(2, HistoryDirection::Undo, insert(5))]);
        assert_eq!(sync.len(), 2);

        sync.handle(&mut store, &[event(3, HistoryDirection::Do, insert(7))]);
        assert!(sync.is_registered(1));
        assert!(!sync.is_registered(2));
        assert!(sync.is_registered(3));
    }

    #[test]
    fn redone_records_survive_new_entries() {
        let mut store = store();
        let mut sync = HistorySync::new();
        let insert = UndoEntry::AddRows {
            sheet: 0,
            index: 0,
            amount: 1,
        };
        sync.handle(&mut store, &[event(1, HistoryDirection::Do, insert.clone())]);
        sync.handle(&mut store, &[event(1, HistoryDirection::Undo, insert.clone())]);
        sync.handle(&mut store, &[event(1, HistoryDirection::Redo, insert.clone())]);
        sync.handle(&mut store, &[event(2, HistoryDirection::Do, insert)]);
        assert!(sync.is_registered(1));
        assert_eq!(store.data().merged_cell(&addr(3, 1)), Some(&MergedCell::new(1, 2)));
    }

    #[test]
    fn unknown_undo_falls_back_to_inverse_shift() {
        let mut store = store();
        let mut sync = HistorySync::new();
        let insert = UndoEntry::AddColumns {
            sheet: 0,
            index: 0,
            amount: 2,
        };
        sync.handle(&mut store, &[event(9, HistoryDirection::Undo, insert)]);
        // Undoing an insert of two columns at 0 deletes them.
        assert_eq!(store.data().merged_cell(&addr(1, 1)), None);
        assert!(store.data().merged_cells.is_empty());
    }

    #[test]
    fn unrecognized_entries_are_ignored() {
        let mut store = store();
        let mut sync = HistorySync::new();
        let before = store.data().clone();
        for direction in [HistoryDirection::Do, HistoryDirection::Undo, HistoryDirection::Redo] {
            assert!(!sync.handle(&mut store, &[event(2, direction, UndoEntry::Unrecognized)]));
        }
        assert_eq!(store.data(), &before);
    }

    #[test]
    fn sheet_entries_create_and_remove_records() {
        let mut store = DataStore::new();
        let mut sync = HistorySync::new();
        let add = UndoEntry::AddSheet {
            sheet: 3,
            name: "Extra".into(),
        };
        sync.handle(&mut store, &[event(1, HistoryDirection::Do, add.clone())]);
        assert_eq!(store.data().sheet(3).map(|s| s.sheet_name.as_str()), Some("Extra"));

        sync.handle(&mut store, &[event(1, HistoryDirection::Undo, add)]);
        assert!(!store.has_sheet(3));
    }
}
