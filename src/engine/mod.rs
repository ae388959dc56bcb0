//! Formula engine seam.
//!
//! The grid never evaluates formulas. It mirrors cell contents into an
//! external engine, asks it for computed values, and follows the engine's
//! undo/redo stream to keep its own UI-only state (merges, frozen panes,
//! row/col sizes) in step. [`FormulaEngine`] is that contract;
//! [`MemoryEngine`] is a self-contained implementation for tests and
//! headless hosts, and on wasm32 `JsFormulaEngine` adapts a JS object.

#[cfg(target_arch = "wasm32")]
mod js;
mod memory;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::address::{Axis, RangeSimpleCellAddress, SheetId, SimpleCellAddress};

#[cfg(target_arch = "wasm32")]
pub use js::JsFormulaEngine;
pub use memory::MemoryEngine;

/// Errors reported by a formula engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// The target cell refuses writes (protected, or part of an array spill).
    #[error("cell {0} is protected")]
    Protected(SimpleCellAddress),

    #[error("no such sheet: {0}")]
    NoSuchSheet(SheetId),

    #[error("sheet name already in use: {0}")]
    SheetNameTaken(String),

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    /// Any other refusal, with the engine's own message.
    #[error("{0}")]
    Rejected(String),
}

/// Direction of a history event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryDirection {
    /// The entry was just performed for the first time.
    Do,
    Undo,
    Redo,
}

/// One entry of the engine's undo stack.
///
/// Structural kinds come from the engine itself; the UI kinds are registered
/// by the grid through [`FormulaEngine::push_undo_entry`] so that grid-only
/// changes share the engine's undo stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UndoEntry {
    AddRows {
        sheet: SheetId,
        index: u32,
        amount: u32,
    },
    RemoveRows {
        sheet: SheetId,
        index: u32,
        amount: u32,
    },
    AddColumns {
        sheet: SheetId,
        index: u32,
        amount: u32,
    },
    RemoveColumns {
        sheet: SheetId,
        index: u32,
        amount: u32,
    },
    AddSheet {
        sheet: SheetId,
        name: String,
    },
    RemoveSheet {
        sheet: SheetId,
        name: String,
    },
    RenameSheet {
        sheet: SheetId,
        old_name: String,
        new_name: String,
    },
    MoveCells {
        source: RangeSimpleCellAddress,
        destination: SimpleCellAddress,
    },
    Paste {
        target: RangeSimpleCellAddress,
    },
    SetCellContents {
        address: SimpleCellAddress,
    },
    MergeCells {
        range: RangeSimpleCellAddress,
    },
    UnmergeCells {
        range: RangeSimpleCellAddress,
    },
    SetFrozenCell {
        sheet: SheetId,
    },
    SetRowColSize {
        sheet: SheetId,
        axis: Axis,
        index: u32,
    },
    /// Grid-only change to cell records or sheets that the engine refused
    /// or never saw.
    LocalChange {
        sheets: Vec<SheetId>,
    },
    Batch {
        entries: Vec<UndoEntry>,
    },
    /// Any kind this version does not know about.
    #[serde(other)]
    Unrecognized,
}

impl UndoEntry {
    /// Row/col insert or delete as `(sheet, axis, index, amount, is_insert)`.
    pub fn as_row_col_change(&self) -> Option<(SheetId, Axis, u32, u32, bool)> {
        match *self {
            UndoEntry::AddRows {
                sheet,
                index,
                amount,
            } => Some((sheet, Axis::Row, index, amount, true)),
            UndoEntry::RemoveRows {
                sheet,
                index,
                amount,
            } => Some((sheet, Axis::Row, index, amount, false)),
            UndoEntry::AddColumns {
                sheet,
                index,
                amount,
            } => Some((sheet, Axis::Col, index, amount, true)),
            UndoEntry::RemoveColumns {
                sheet,
                index,
                amount,
            } => Some((sheet, Axis::Col, index, amount, false)),
            _ => None,
        }
    }

    /// Sheets whose grid state this entry can touch.
    pub fn sheets(&self) -> BTreeSet<SheetId> {
        let mut sheets = BTreeSet::new();
        self.collect_sheets(&mut sheets);
        sheets
    }

    fn collect_sheets(&self, sheets: &mut BTreeSet<SheetId>) {
        match self {
            UndoEntry::AddRows { sheet, .. }
            | UndoEntry::RemoveRows { sheet, .. }
            | UndoEntry::AddColumns { sheet, .. }
            | UndoEntry::RemoveColumns { sheet, .. }
            | UndoEntry::AddSheet { sheet, .. }
            | UndoEntry::RemoveSheet { sheet, .. }
            | UndoEntry::RenameSheet { sheet, .. }
            | UndoEntry::SetFrozenCell { sheet }
            | UndoEntry::SetRowColSize { sheet, .. } => {
                sheets.insert(*sheet);
            }
            UndoEntry::MoveCells {
                source,
                destination,
            } => {
                sheets.insert(source.sheet());
                sheets.insert(destination.sheet);
            }
            UndoEntry::Paste { target: range }
            | UndoEntry::MergeCells { range }
            | UndoEntry::UnmergeCells { range } => {
                sheets.insert(range.sheet());
            }
            UndoEntry::SetCellContents { address } => {
                sheets.insert(address.sheet);
            }
            UndoEntry::LocalChange { sheets: touched } => {
                sheets.extend(touched.iter().copied());
            }
            UndoEntry::Batch { entries } => {
                for entry in entries {
                    entry.collect_sheets(sheets);
                }
            }
            UndoEntry::Unrecognized => {}
        }
    }
}

/// An undo-stack transition reported by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    /// Stable id of the undo entry; the same id is reported for its do, undo
    /// and every redo.
    pub id: u64,
    pub direction: HistoryDirection,
    pub entry: UndoEntry,
}

/// What the grid needs from a formula engine.
pub trait FormulaEngine {
    /// Write raw contents (`None` clears). May be refused per address.
    fn set_cell_contents(
        &mut self,
        address: SimpleCellAddress,
        contents: Option<&str>,
    ) -> Result<(), EngineError>;

    /// Computed display value at `address`, including array spill targets.
    fn get_cell_value(&self, address: SimpleCellAddress) -> Option<String>;

    /// Open a batch: writes until the matching [`end_batch`](Self::end_batch)
    /// recompute once and form a single undo entry. Batches nest.
    fn begin_batch(&mut self);

    fn end_batch(&mut self);

    /// Create a sheet and return its id.
    fn add_sheet(&mut self, name: &str) -> Result<SheetId, EngineError>;

    fn remove_sheet(&mut self, sheet: SheetId) -> Result<(), EngineError>;

    fn rename_sheet(&mut self, sheet: SheetId, name: &str) -> Result<(), EngineError>;

    fn add_rows(&mut self, sheet: SheetId, index: u32, amount: u32) -> Result<(), EngineError>;

    fn remove_rows(&mut self, sheet: SheetId, index: u32, amount: u32) -> Result<(), EngineError>;

    fn add_columns(&mut self, sheet: SheetId, index: u32, amount: u32) -> Result<(), EngineError>;

    fn remove_columns(&mut self, sheet: SheetId, index: u32, amount: u32)
        -> Result<(), EngineError>;

    fn move_cells(
        &mut self,
        source: RangeSimpleCellAddress,
        destination: SimpleCellAddress,
    ) -> Result<(), EngineError>;

    /// Register a grid-only entry on the engine's undo stack and return its
    /// id. Inside a batch the entry joins the batch and the batch id is
    /// returned.
    fn push_undo_entry(&mut self, entry: UndoEntry) -> u64;

    /// Stop recording undo entries until the matching resume. Nests.
    fn suspend_undo_recording(&mut self);

    fn resume_undo_recording(&mut self);

    fn undo(&mut self) -> Result<(), EngineError>;

    fn redo(&mut self) -> Result<(), EngineError>;

    /// History events raised since the last call, oldest first.
    fn drain_history_events(&mut self) -> Vec<HistoryEvent>;
}

/// Run `f` inside one engine batch.
pub fn batch<E: FormulaEngine + ?Sized, T>(engine: &mut E, f: impl FnOnce(&mut E) -> T) -> T {
    engine.begin_batch();
    let out = f(engine);
    engine.end_batch();
    out
}

/// Run `f` with the engine's undo recording suspended.
pub fn without_undo_recording<E: FormulaEngine + ?Sized, T>(
    engine: &mut E,
    f: impl FnOnce(&mut E) -> T,
) -> T {
    engine.suspend_undo_recording();
    let out = f(engine);
    engine.resume_undo_recording();
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn unknown_entry_kinds_deserialize_as_unrecognized() {
        let json = r#"{"id":7,"direction":"undo","entry":{"type":"setSheetContent","sheet":0}}"#;
        let event: HistoryEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.entry, UndoEntry::Unrecognized);
        assert_eq!(event.direction, HistoryDirection::Undo);
    }

    #[test]
    fn entries_use_camel_case_fields() {
        let entry = UndoEntry::RenameSheet {
            sheet: 1,
            old_name: "A".into(),
            new_name: "B".into(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains(r#""type":"renameSheet""#));
        assert!(json.contains(r#""oldName":"A""#));
        let back: UndoEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn batch_collects_sheets() {
        let entry = UndoEntry::Batch {
            entries: vec![
                UndoEntry::AddRows {
                    sheet: 0,
                    index: 1,
                    amount: 1,
                },
                UndoEntry::SetFrozenCell { sheet: 2 },
                UndoEntry::Unrecognized,
            ],
        };
        assert_eq!(entry.sheets().into_iter().collect::<Vec<_>>(), vec![0, 2]);
    }
}
