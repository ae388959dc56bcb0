//! In-memory formula engine.
//!
//! Stores raw contents without evaluating them and keeps whole-state
//! snapshots per undo entry. Good enough for tests, benches and headless
//! hosts; a browser host plugs in a real engine instead.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::{EngineError, FormulaEngine, HistoryDirection, HistoryEvent, UndoEntry};
use crate::address::{Axis, RangeSimpleCellAddress, SheetId, SimpleCellAddress};

#[derive(Debug, Clone, Default, PartialEq)]
struct EngineState {
    sheets: BTreeMap<SheetId, String>,
    contents: HashMap<SimpleCellAddress, String>,
    next_sheet: SheetId,
}

impl EngineState {
    fn require_sheet(&self, sheet: SheetId) -> Result<(), EngineError> {
        if self.sheets.contains_key(&sheet) {
            Ok(())
        } else {
            Err(EngineError::NoSuchSheet(sheet))
        }
    }

    /// Re-key every cell of `sheet` through `shift`; `None` drops the cell.
    fn remap_sheet(&mut self, sheet: SheetId, shift: impl Fn(SimpleCellAddress) -> Option<SimpleCellAddress>) {
        let contents = std::mem::take(&mut self.contents);
        self.contents = contents
            .into_iter()
            .filter_map(|(addr, value)| {
                if addr.sheet == sheet {
                    shift(addr).map(|moved| (moved, value))
                } else {
                    Some((addr, value))
                }
            })
            .collect();
    }

    fn insert_lines(&mut self, sheet: SheetId, axis: Axis, index: u32, amount: u32) {
        self.remap_sheet(sheet, |addr| {
            let at = addr.index(axis);
            if at >= index {
                Some(addr.with_index(axis, at.saturating_add(amount)))
            } else {
                Some(addr)
            }
        });
    }

    fn remove_lines(&mut self, sheet: SheetId, axis: Axis, index: u32, amount: u32) {
        let end = index.saturating_add(amount);
        self.remap_sheet(sheet, |addr| {
            let at = addr.index(axis);
            if at < index {
                Some(addr)
            } else if at < end {
                None
            } else {
                Some(addr.with_index(axis, at - amount))
            }
        });
    }
}

#[derive(Debug, Clone)]
struct Recorded {
    id: u64,
    entry: UndoEntry,
    before: EngineState,
    after: EngineState,
}

#[derive(Debug)]
struct PendingBatch {
    id: u64,
    before: EngineState,
    entries: Vec<UndoEntry>,
}

/// Snapshot-based engine holding raw contents.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    state: EngineState,
    computed: HashMap<SimpleCellAddress, String>,
    protected: HashSet<SimpleCellAddress>,
    undo_stack: Vec<Recorded>,
    redo_stack: Vec<Recorded>,
    batch: Option<PendingBatch>,
    batch_depth: u32,
    suspended: u32,
    next_entry_id: u64,
    events: Vec<HistoryEvent>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse writes to `address`, as an engine does for protected cells
    /// and array spill targets.
    pub fn protect(&mut self, address: SimpleCellAddress) {
        self.protected.insert(address);
    }

    /// Report `value` at `address` regardless of stored contents, the way an
    /// array formula spills into empty neighbours. Not moved by structural
    /// edits.
    pub fn set_computed_value(&mut self, address: SimpleCellAddress, value: Option<String>) {
        match value {
            Some(v) => {
                self.computed.insert(address, v);
            }
            None => {
                self.computed.remove(&address);
            }
        }
    }

    /// Raw stored contents (no computed overlay).
    pub fn cell_contents(&self, address: SimpleCellAddress) -> Option<&str> {
        self.state.contents.get(&address).map(String::as_str)
    }

    pub fn sheet_name(&self, sheet: SheetId) -> Option<&str> {
        self.state.sheets.get(&sheet).map(String::as_str)
    }

    pub fn sheet_count(&self) -> usize {
        self.state.sheets.len()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn is_recording(&self) -> bool {
        self.suspended == 0
    }

    fn allocate_entry_id(&mut self) -> u64 {
        let id = self.next_entry_id;
        self.next_entry_id += 1;
        id
    }

    /// State to diff against if the next mutation becomes its own entry.
    fn snapshot_for_entry(&self) -> Option<EngineState> {
        (self.suspended == 0 && self.batch.is_none()).then(|| self.state.clone())
    }

    fn record(&mut self, entry: UndoEntry, before: Option<EngineState>) -> Option<u64> {
        if self.suspended > 0 {
            return None;
        }
        if let Some(batch) = self.batch.as_mut() {
            batch.entries.push(entry);
            return Some(batch.id);
        }
        let before = before.unwrap_or_else(|| self.state.clone());
        let id = self.allocate_entry_id();
        self.commit(id, entry, before);
        Some(id)
    }

    fn commit(&mut self, id: u64, entry: UndoEntry, before: EngineState) {
        self.events.push(HistoryEvent {
            id,
            direction: HistoryDirection::Do,
            entry: entry.clone(),
        });
        self.undo_stack.push(Recorded {
            id,
            entry,
            before,
            after: self.state.clone(),
        });
        self.redo_stack.clear();
    }

    fn mutate(
        &mut self,
        entry: UndoEntry,
        f: impl FnOnce(&mut EngineState) -> Result<(), EngineError>,
    ) -> Result<(), EngineError> {
        let before = self.snapshot_for_entry();
        f(&mut self.state)?;
        self.record(entry, before);
        Ok(())
    }
}

impl FormulaEngine for MemoryEngine {
    fn set_cell_contents(
        &mut self,
        address: SimpleCellAddress,
        contents: Option<&str>,
    ) -> Result<(), EngineError> {
        if self.protected.contains(&address) {
            return Err(EngineError::Protected(address));
        }
        self.mutate(UndoEntry::SetCellContents { address }, |state| {
            state.require_sheet(address.sheet)?;
            match contents {
                Some(text) if !text.is_empty() => {
                    state.contents.insert(address, text.to_string());
                }
                _ => {
                    state.contents.remove(&address);
                }
            }
            Ok(())
        })
    }

    fn get_cell_value(&self, address: SimpleCellAddress) -> Option<String> {
        self.computed
            .get(&address)
            .or_else(|| self.state.contents.get(&address))
            .cloned()
    }

    fn begin_batch(&mut self) {
        self.batch_depth += 1;
        if self.batch_depth == 1 && self.batch.is_none() {
            let id = self.allocate_entry_id();
            self.batch = Some(PendingBatch {
                id,
                before: self.state.clone(),
                entries: Vec::new(),
            });
        }
    }

    fn end_batch(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth > 0 {
            return;
        }
        let Some(mut batch) = self.batch.take() else {
            return;
        };
        let entry = match batch.entries.len() {
            0 => return,
            1 => batch.entries.remove(0),
            _ => UndoEntry::Batch {
                entries: batch.entries,
            },
        };
        self.commit(batch.id, entry, batch.before);
    }

    fn add_sheet(&mut self, name: &str) -> Result<SheetId, EngineError> {
        if self.state.sheets.values().any(|n| n == name) {
            return Err(EngineError::SheetNameTaken(name.to_string()));
        }
        let sheet = self.state.next_sheet;
        self.mutate(
            UndoEntry::AddSheet {
                sheet,
                name: name.to_string(),
            },
            |state| {
                state.sheets.insert(sheet, name.to_string());
                state.next_sheet += 1;
                Ok(())
            },
        )?;
        Ok(sheet)
    }

    fn remove_sheet(&mut self, sheet: SheetId) -> Result<(), EngineError> {
        let name = self
            .state
            .sheets
            .get(&sheet)
            .cloned()
            .ok_or(EngineError::NoSuchSheet(sheet))?;
        self.mutate(UndoEntry::RemoveSheet { sheet, name }, |state| {
            state.sheets.remove(&sheet);
            state.contents.retain(|addr, _| addr.sheet != sheet);
            Ok(())
        })
    }

    fn rename_sheet(&mut self, sheet: SheetId, name: &str) -> Result<(), EngineError> {
        let old_name = self
            .state
            .sheets
            .get(&sheet)
            .cloned()
            .ok_or(EngineError::NoSuchSheet(sheet))?;
        if self
            .state
            .sheets
            .iter()
            .any(|(id, n)| *id != sheet && n == name)
        {
            return Err(EngineError::SheetNameTaken(name.to_string()));
        }
        self.mutate(
            UndoEntry::RenameSheet {
                sheet,
                old_name,
                new_name: name.to_string(),
            },
            |state| {
                state.sheets.insert(sheet, name.to_string());
                Ok(())
            },
        )
    }

    fn add_rows(&mut self, sheet: SheetId, index: u32, amount: u32) -> Result<(), EngineError> {
        self.mutate(
            UndoEntry::AddRows {
                sheet,
                index,
                amount,
            },
            |state| {
                state.require_sheet(sheet)?;
                state.insert_lines(sheet, Axis::Row, index, amount);
                Ok(())
            },
        )
    }

    fn remove_rows(&mut self, sheet: SheetId, index: u32, amount: u32) -> Result<(), EngineError> {
        self.mutate(
            UndoEntry::RemoveRows {
                sheet,
                index,
                amount,
            },
            |state| {
                state.require_sheet(sheet)?;
                state.remove_lines(sheet, Axis::Row, index, amount);
                Ok(())
            },
        )
    }

    fn add_columns(&mut self, sheet: SheetId, index: u32, amount: u32) -> Result<(), EngineError> {
        self.mutate(
            UndoEntry::AddColumns {
                sheet,
                index,
                amount,
            },
            |state| {
                state.require_sheet(sheet)?;
                state.insert_lines(sheet, Axis::Col, index, amount);
                Ok(())
            },
        )
    }

    fn remove_columns(
        &mut self,
        sheet: SheetId,
        index: u32,
        amount: u32,
    ) -> Result<(), EngineError> {
        self.mutate(
            UndoEntry::RemoveColumns {
                sheet,
                index,
                amount,
            },
            |state| {
                state.require_sheet(sheet)?;
                state.remove_lines(sheet, Axis::Col, index, amount);
                Ok(())
            },
        )
    }

    fn move_cells(
        &mut self,
        source: RangeSimpleCellAddress,
        destination: SimpleCellAddress,
    ) -> Result<(), EngineError> {
        self.mutate(
            UndoEntry::MoveCells {
                source,
                destination,
            },
            |state| {
                state.require_sheet(source.sheet())?;
                state.require_sheet(destination.sheet)?;
                let moved: Vec<(SimpleCellAddress, String)> = source
                    .addresses()
                    .filter_map(|addr| state.contents.remove(&addr).map(|v| (addr, v)))
                    .collect();
                let target = RangeSimpleCellAddress::from_span(
                    destination,
                    source.width(),
                    source.height(),
                );
                state.contents.retain(|addr, _| !target.contains(addr));
                for (addr, value) in moved {
                    // Contents shifted past the last addressable index are dropped.
                    let row = destination.row.checked_add(addr.row - source.top_left.row);
                    let col = destination.col.checked_add(addr.col - source.top_left.col);
                    if let (Some(row), Some(col)) = (row, col) {
                        state
                            .contents
                            .insert(SimpleCellAddress::new(destination.sheet, row, col), value);
                    }
                }
                Ok(())
            },
        )
    }

    fn push_undo_entry(&mut self, entry: UndoEntry) -> u64 {
        match self.record(entry, None) {
            Some(id) => id,
            None => self.allocate_entry_id(),
        }
    }

    fn suspend_undo_recording(&mut self) {
        self.suspended += 1;
    }

    fn resume_undo_recording(&mut self) {
        self.suspended = self.suspended.saturating_sub(1);
    }

    fn undo(&mut self) -> Result<(), EngineError> {
        let recorded = self.undo_stack.pop().ok_or(EngineError::NothingToUndo)?;
        self.state = recorded.before.clone();
        self.events.push(HistoryEvent {
            id: recorded.id,
            direction: HistoryDirection::Undo,
            entry: recorded.entry.clone(),
        });
        self.redo_stack.push(recorded);
        Ok(())
    }

    fn redo(&mut self) -> Result<(), EngineError> {
        let recorded = self.redo_stack.pop().ok_or(EngineError::NothingToRedo)?;
        self.state = recorded.after.clone();
        self.events.push(HistoryEvent {
            id: recorded.id,
            direction: HistoryDirection::Redo,
            entry: recorded.entry.clone(),
        });
        self.undo_stack.push(recorded);
        Ok(())
    }

    fn drain_history_events(&mut self) -> Vec<HistoryEvent> {
        std::mem::take(&mut self.events)
    }
}
