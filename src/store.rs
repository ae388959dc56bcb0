//! Sparse per-sheet data store.
//!
//! Owns the [`SpreadsheetData`] of one spreadsheet instance and keeps each
//! sheet's record index in step with the sparse maps. Cell writes are
//! mirrored into the formula engine on a best-effort basis: a rejected write
//! is logged and the local record stays, since the store is what the grid
//! displays.

use crate::address::{Axis, RangeSimpleCellAddress, RowColAddress, SheetId, SimpleCellAddress};
use crate::engine::{self, FormulaEngine};
use crate::types::{CellData, FrozenCell, MergedCell, RowColSize, SheetMetadata, SpreadsheetData};

/// Name given to sheets created implicitly by a write.
fn default_sheet_name(sheet: SheetId) -> String {
    format!("Sheet{}", u64::from(sheet) + 1)
}

#[derive(Debug, Clone, Default)]
pub struct DataStore {
    data: SpreadsheetData,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: SpreadsheetData) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &SpreadsheetData {
        &self.data
    }

    pub fn into_data(self) -> SpreadsheetData {
        self.data
    }

    pub fn sheet_ids(&self) -> impl Iterator<Item = SheetId> + '_ {
        self.data.sheets.keys().copied()
    }

    pub fn has_sheet(&self, sheet: SheetId) -> bool {
        self.data.sheets.contains_key(&sheet)
    }

    /// Create the sheet's metadata if missing, otherwise rename it.
    pub fn set_sheet(&mut self, sheet: SheetId, name: &str) -> &mut SheetMetadata {
        let meta = self
            .data
            .sheets
            .entry(sheet)
            .or_insert_with(|| SheetMetadata::new(sheet, name));
        if meta.sheet_name != name {
            meta.sheet_name = name.to_string();
        }
        meta
    }

    fn ensure_sheet(&mut self, sheet: SheetId) -> &mut SheetMetadata {
        self.data
            .sheets
            .entry(sheet)
            .or_insert_with(|| SheetMetadata::new(sheet, default_sheet_name(sheet)))
    }

    /// Remove a sheet with every record it owns, and remove it from the
    /// engine. Returns the removed metadata.
    pub fn delete_sheet<E: FormulaEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        sheet: SheetId,
    ) -> Option<SheetMetadata> {
        let removed = self.remove_sheet_records(sheet);
        if let Err(e) = engine.remove_sheet(sheet) {
            log::warn!("engine kept sheet {sheet}: {e}");
        }
        removed
    }

    /// Cascade-delete the sheet's records without touching the engine.
    pub(crate) fn remove_sheet_records(&mut self, sheet: SheetId) -> Option<SheetMetadata> {
        let meta = self.data.sheets.remove(&sheet)?;
        for address in &meta.cells {
            self.data.cells.remove(address);
        }
        for top_left in &meta.merged_cells {
            self.data.merged_cells.remove(top_left);
        }
        for row in &meta.rows {
            self.data.rows.remove(row);
        }
        for col in &meta.cols {
            self.data.cols.remove(col);
        }
        self.data.frozen_cells.remove(&sheet);
        Some(meta)
    }

    // ---- cells ----

    /// Upsert a cell record and mirror its value into the engine.
    pub fn set_cell<E: FormulaEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        address: SimpleCellAddress,
        cell: CellData,
    ) {
        if let Err(e) = engine.set_cell_contents(address, cell.value.as_deref()) {
            log::warn!("engine rejected write at {address}: {e}");
        }
        self.put_cell(address, cell);
    }

    /// Remove a cell record and clear it in the engine.
    pub fn delete_cell<E: FormulaEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        address: SimpleCellAddress,
    ) -> Option<CellData> {
        if let Err(e) = engine.set_cell_contents(address, None) {
            log::warn!("engine rejected clear at {address}: {e}");
        }
        self.take_cell(address)
    }

    /// Local upsert, no engine mirror. Empty records are dropped.
    pub(crate) fn put_cell(&mut self, address: SimpleCellAddress, cell: CellData) {
        if cell.is_empty() {
            self.take_cell(address);
            return;
        }
        self.ensure_sheet(address.sheet).cells.insert(address);
        self.data.cells.insert(address, cell);
    }

    pub(crate) fn take_cell(&mut self, address: SimpleCellAddress) -> Option<CellData> {
        if let Some(meta) = self.data.sheets.get_mut(&address.sheet) {
            meta.cells.remove(&address);
        }
        self.data.cells.remove(&address)
    }

    // ---- merges ----

    /// Create or replace the merge anchored at `top_left`.
    ///
    /// Other merges overlapping the new span are removed and returned. Every
    /// address in the span except `top_left` loses its content, locally and
    /// in the engine (one engine batch); the top-left keeps its own.
    pub fn set_merged_cell<E: FormulaEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        top_left: SimpleCellAddress,
        merged: MergedCell,
    ) -> Vec<(SimpleCellAddress, MergedCell)> {
        let span = merged.range(top_left);
        let overlapping: Vec<(SimpleCellAddress, MergedCell)> = self
            .data
            .merges_in_sheet(top_left.sheet)
            .filter(|(other, m)| *other != top_left && m.range(*other).overlaps(&span))
            .collect();
        for (other, _) in &overlapping {
            self.delete_merged_cell(*other);
        }

        let members: Vec<SimpleCellAddress> =
            span.addresses().filter(|a| *a != top_left).collect();
        engine::batch(engine, |engine| {
            for address in &members {
                let has_record = self.data.cells.contains_key(address);
                if !has_record && engine.get_cell_value(*address).is_none() {
                    continue;
                }
                if let Err(e) = engine.set_cell_contents(*address, None) {
                    log::warn!("engine rejected clear at {address}: {e}");
                }
            }
        });
        for address in members {
            self.take_cell(address);
        }

        self.put_merged_cell(top_left, merged);
        overlapping
    }

    /// Local insert of a merge record, no clearing.
    pub(crate) fn put_merged_cell(&mut self, top_left: SimpleCellAddress, merged: MergedCell) {
        self.ensure_sheet(top_left.sheet).merged_cells.insert(top_left);
        self.data.merged_cells.insert(top_left, merged);
    }

    pub fn delete_merged_cell(&mut self, top_left: SimpleCellAddress) -> Option<MergedCell> {
        if let Some(meta) = self.data.sheets.get_mut(&top_left.sheet) {
            meta.merged_cells.remove(&top_left);
        }
        self.data.merged_cells.remove(&top_left)
    }

    /// Merges on `sheet` overlapping `range`.
    pub fn merges_overlapping(
        &self,
        range: &RangeSimpleCellAddress,
    ) -> Vec<(SimpleCellAddress, MergedCell)> {
        self.data
            .merges_in_sheet(range.sheet())
            .filter(|(top_left, m)| m.range(*top_left).overlaps(range))
            .collect()
    }

    // ---- frozen panes ----

    /// Set the inclusive frozen boundary of `sheet`.
    ///
    /// Negative values or both axes absent delete the record.
    pub fn set_frozen_cell(&mut self, sheet: SheetId, row: Option<i64>, col: Option<i64>) {
        let negative = row.is_some_and(|r| r < 0) || col.is_some_and(|c| c < 0);
        if negative || (row.is_none() && col.is_none()) {
            self.delete_frozen_cell(sheet);
            return;
        }
        let frozen = FrozenCell {
            row: row.and_then(|r| u32::try_from(r).ok()),
            col: col.and_then(|c| u32::try_from(c).ok()),
        };
        self.put_frozen_cell(sheet, frozen);
    }

    pub(crate) fn put_frozen_cell(&mut self, sheet: SheetId, frozen: FrozenCell) {
        if frozen.row.is_none() && frozen.col.is_none() {
            self.delete_frozen_cell(sheet);
            return;
        }
        self.ensure_sheet(sheet);
        self.data.frozen_cells.insert(sheet, frozen);
    }

    pub fn delete_frozen_cell(&mut self, sheet: SheetId) -> Option<FrozenCell> {
        self.data.frozen_cells.remove(&sheet)
    }

    // ---- row / col sizes ----

    pub fn set_row_col(&mut self, axis: Axis, address: RowColAddress, size: f64) {
        let meta = self.ensure_sheet(address.sheet);
        match axis {
            Axis::Row => meta.rows.insert(address),
            Axis::Col => meta.cols.insert(address),
        };
        self.data
            .row_cols_mut(axis)
            .insert(address, RowColSize { size });
    }

    pub fn delete_row_col(&mut self, axis: Axis, address: RowColAddress) -> Option<f64> {
        if let Some(meta) = self.data.sheets.get_mut(&address.sheet) {
            match axis {
                Axis::Row => meta.rows.remove(&address),
                Axis::Col => meta.cols.remove(&address),
            };
        }
        self.data.row_cols_mut(axis).remove(&address).map(|r| r.size)
    }
}
