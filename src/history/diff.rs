//! Per-sheet differences between two captures.
//!
//! A history record keeps only what an entry changed, so a one-cell edit on
//! a large sheet costs one cell, not two copies of the sheet.

use std::collections::{BTreeMap, BTreeSet};

use crate::address::{Axis, RowColAddress, SheetId, SimpleCellAddress};
use crate::store::DataStore;
use crate::types::{CellData, FrozenCell, MergedCell};

use super::SheetState;

/// Which end of a change to put back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Before,
    After,
}

/// One keyed value as it was and as it became; `None` means absent.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Delta<K, V> {
    pub key: K,
    pub before: Option<V>,
    pub after: Option<V>,
}

impl<K: Copy, V: Clone> Delta<K, V> {
    fn side(&self, side: Side) -> Option<&V> {
        match side {
            Side::Before => self.before.as_ref(),
            Side::After => self.after.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SheetDiff {
    /// The sheet was created or removed; the side that exists is kept whole.
    Existence {
        sheet: SheetId,
        before: Option<SheetState>,
        after: Option<SheetState>,
    },
    Patch {
        sheet: SheetId,
        name: Option<(String, String)>,
        cells: Vec<Delta<SimpleCellAddress, CellData>>,
        merges: Vec<Delta<SimpleCellAddress, MergedCell>>,
        frozen: Option<(Option<FrozenCell>, Option<FrozenCell>)>,
        rows: Vec<Delta<u32, f64>>,
        cols: Vec<Delta<u32, f64>>,
    },
}

impl SheetDiff {
    /// `None` when nothing changed.
    pub fn between(sheet: SheetId, before: Option<&SheetState>, after: Option<&SheetState>) -> Option<Self> {
        let (before, after) = match (before, after) {
            (None, None) => return None,
            (Some(before), Some(after)) => (before, after),
            (before, after) => {
                return Some(SheetDiff::Existence {
                    sheet,
                    before: before.cloned(),
                    after: after.cloned(),
                })
            }
        };
        let diff = SheetDiff::Patch {
            sheet,
            name: (before.name != after.name).then(|| (before.name.clone(), after.name.clone())),
            cells: deltas(&before.cells, &after.cells),
            merges: deltas(&before.merges, &after.merges),
            frozen: (before.frozen != after.frozen).then_some((before.frozen, after.frozen)),
            rows: deltas(&before.rows, &after.rows),
            cols: deltas(&before.cols, &after.cols),
        };
        (!diff.is_empty()).then_some(diff)
    }

    /// Number of changed values held.
    pub fn len(&self) -> usize {
        match self {
            SheetDiff::Existence { .. } => 1,
            SheetDiff::Patch {
                name,
                cells,
                merges,
                frozen,
                rows,
                cols,
                ..
            } => {
                usize::from(name.is_some())
                    + cells.len()
                    + merges.len()
                    + usize::from(frozen.is_some())
                    + rows.len()
                    + cols.len()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Put `side` of the change into the store.
    pub fn apply(&self, store: &mut DataStore, side: Side) {
        match self {
            SheetDiff::Existence {
                sheet,
                before,
                after,
            } => {
                let state = match side {
                    Side::Before => before.as_ref(),
                    Side::After => after.as_ref(),
                };
                SheetState::restore(store, *sheet, state);
            }
            SheetDiff::Patch {
                sheet,
                name,
                cells,
                merges,
                frozen,
                rows,
                cols,
            } => {
                if let Some((before, after)) = name {
                    let name = if side == Side::Before { before } else { after };
                    store.set_sheet(*sheet, name.as_str());
                }
                for delta in cells {
                    match delta.side(side) {
                        Some(cell) => store.put_cell(delta.key, cell.clone()),
                        None => {
                            store.take_cell(delta.key);
                        }
                    }
                }
                // Drop first so a re-anchored merge never sits beside its old span.
                for delta in merges.iter().filter(|d| d.side(side).is_none()) {
                    store.delete_merged_cell(delta.key);
                }
                for delta in merges {
                    if let Some(merged) = delta.side(side) {
                        store.put_merged_cell(delta.key, *merged);
                    }
                }
                if let Some((before, after)) = frozen {
                    let frozen = if side == Side::Before { before } else { after };
                    match frozen {
                        Some(frozen) => store.put_frozen_cell(*sheet, *frozen),
                        None => {
                            store.delete_frozen_cell(*sheet);
                        }
                    }
                }
                apply_sizes(store, *sheet, Axis::Row, rows, side);
                apply_sizes(store, *sheet, Axis::Col, cols, side);
            }
        }
    }
}

fn apply_sizes(store: &mut DataStore, sheet: SheetId, axis: Axis, sizes: &[Delta<u32, f64>], side: Side) {
    for delta in sizes {
        let address = RowColAddress::new(sheet, delta.key);
        match delta.side(side) {
            Some(size) => store.set_row_col(axis, address, *size),
            None => {
                store.delete_row_col(axis, address);
            }
        }
    }
}

fn deltas<K, V>(before: &BTreeMap<K, V>, after: &BTreeMap<K, V>) -> Vec<Delta<K, V>>
where
    K: Ord + Copy,
    V: Clone + PartialEq,
{
    let keys: BTreeSet<K> = before.keys().chain(after.keys()).copied().collect();
    keys.into_iter()
        .filter_map(|key| {
            let (old, new) = (before.get(&key), after.get(&key));
            (old != new).then(|| Delta {
                key,
                before: old.cloned(),
                after: new.cloned(),
            })
        })
        .collect()
}
