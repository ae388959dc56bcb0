use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::{CellData, FrozenCell, MergedCell, RowColSize, SheetMetadata};
use crate::address::{Axis, RowColAddress, SheetId, SimpleCellAddress};
use crate::error::Result;

/// Everything the grid owns for one spreadsheet instance.
///
/// All maps are sparse. Serializes to plain nested JSON objects keyed by the
/// string ids of [`crate::address`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpreadsheetData {
    pub sheets: BTreeMap<SheetId, SheetMetadata>,
    pub cells: HashMap<SimpleCellAddress, CellData>,
    /// Keyed by the top-left address of each merge.
    pub merged_cells: HashMap<SimpleCellAddress, MergedCell>,
    pub frozen_cells: BTreeMap<SheetId, FrozenCell>,
    pub rows: HashMap<RowColAddress, RowColSize>,
    pub cols: HashMap<RowColAddress, RowColSize>,
}

impl SpreadsheetData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(&self, sheet: SheetId) -> Option<&SheetMetadata> {
        self.sheets.get(&sheet)
    }

    pub fn sheet_id_by_name(&self, name: &str) -> Option<SheetId> {
        self.sheets
            .values()
            .find(|s| s.sheet_name == name)
            .map(|s| s.id)
    }

    pub fn cell(&self, address: &SimpleCellAddress) -> Option<&CellData> {
        self.cells.get(address)
    }

    pub fn merged_cell(&self, top_left: &SimpleCellAddress) -> Option<&MergedCell> {
        self.merged_cells.get(top_left)
    }

    pub fn frozen_cell(&self, sheet: SheetId) -> Option<&FrozenCell> {
        self.frozen_cells.get(&sheet)
    }

    /// Row or column size overrides, depending on `axis`.
    pub fn row_cols(&self, axis: Axis) -> &HashMap<RowColAddress, RowColSize> {
        match axis {
            Axis::Row => &self.rows,
            Axis::Col => &self.cols,
        }
    }

    pub(crate) fn row_cols_mut(&mut self, axis: Axis) -> &mut HashMap<RowColAddress, RowColSize> {
        match axis {
            Axis::Row => &mut self.rows,
            Axis::Col => &mut self.cols,
        }
    }

    pub fn size_override(&self, axis: Axis, address: &RowColAddress) -> Option<f64> {
        self.row_cols(axis).get(address).map(|r| r.size)
    }

    /// All merges on `sheet` as `(top_left, span)`.
    pub fn merges_in_sheet(
        &self,
        sheet: SheetId,
    ) -> impl Iterator<Item = (SimpleCellAddress, MergedCell)> + '_ {
        self.sheets
            .get(&sheet)
            .into_iter()
            .flat_map(|meta| meta.merged_cells.iter())
            .filter_map(|top_left| {
                self.merged_cells
                    .get(top_left)
                    .map(|merged| (*top_left, *merged))
            })
    }

    /// Size overrides on `sheet` for `axis`, ascending by index.
    pub fn size_overrides_in_sheet(
        &self,
        axis: Axis,
        sheet: SheetId,
    ) -> impl Iterator<Item = (u32, f64)> + '_ {
        let ids = self.sheets.get(&sheet).into_iter().flat_map(move |meta| match axis {
            Axis::Row => meta.rows.iter(),
            Axis::Col => meta.cols.iter(),
        });
        ids.filter_map(move |id| self.row_cols(axis).get(id).map(|r| (id.index, r.size)))
    }

    /// JSON snapshot for the persistence collaborator.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore from a snapshot produced by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
