//! Merge topology with an address → top-left reverse index.
//!
//! The store holds one record per merge, keyed by its top-left. The merger
//! indexes every covered address so that any member resolves to its
//! representative in O(1).

use std::collections::HashMap;

use crate::address::{Axis, RangeSimpleCellAddress, SimpleCellAddress};
use crate::types::{MergedCell, SpreadsheetData};

/// Where a range stands in the merge lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeState {
    /// Nothing to merge: a single cell outside any merge.
    None,
    /// A candidate span that would be merged, already grown to contain any
    /// merge it overlaps.
    Pending(RangeSimpleCellAddress),
    /// Exactly covers the merge anchored at this address.
    Merged(SimpleCellAddress),
    /// Was merged and has just been split apart.
    Unmerged,
}

#[derive(Debug, Clone, Default)]
pub struct Merger {
    /// Every covered address (top-left included) → top-left.
    associated: HashMap<SimpleCellAddress, SimpleCellAddress>,
    spans: HashMap<SimpleCellAddress, MergedCell>,
}

impl Merger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from scratch.
    pub fn from_data(data: &SpreadsheetData) -> Self {
        let mut merger = Self::new();
        merger.rebuild(data);
        merger
    }

    /// Drop the index and re-create it from the store's merge records.
    pub fn rebuild(&mut self, data: &SpreadsheetData) {
        self.associated.clear();
        self.spans.clear();
        for (top_left, merged) in &data.merged_cells {
            self.add_merge(*top_left, *merged);
        }
    }

    /// Index a merge. A previous merge at the same top-left is replaced.
    pub fn add_merge(&mut self, top_left: SimpleCellAddress, merged: MergedCell) {
        self.remove_merge(top_left);
        for address in merged.range(top_left).addresses() {
            self.associated.insert(address, top_left);
        }
        self.spans.insert(top_left, merged);
    }

    pub fn remove_merge(&mut self, top_left: SimpleCellAddress) -> Option<MergedCell> {
        let merged = self.spans.remove(&top_left)?;
        for address in merged.range(top_left).addresses() {
            if self.associated.get(&address) == Some(&top_left) {
                self.associated.remove(&address);
            }
        }
        Some(merged)
    }

    /// Every address of the merge anchored at `top_left` except the
    /// top-left itself. Empty when `top_left` anchors no merge.
    pub fn iterate_merge_box(
        &self,
        top_left: SimpleCellAddress,
    ) -> impl Iterator<Item = SimpleCellAddress> {
        let range = self.spans.get(&top_left).map(|m| m.range(top_left));
        range
            .into_iter()
            .flat_map(|r| {
                let sheet = r.sheet();
                r.iterate_from_top_to_bottom(Axis::Row)
                    .flat_map(move |row| {
                        r.iterate_from_top_to_bottom(Axis::Col)
                            .map(move |col| SimpleCellAddress::new(sheet, row, col))
                    })
            })
            .filter(move |a| *a != top_left)
    }

    pub fn is_top_left_of_merge(&self, address: &SimpleCellAddress) -> bool {
        self.spans.contains_key(address)
    }

    /// True for every covered address, top-left included.
    pub fn is_part_of_merge(&self, address: &SimpleCellAddress) -> bool {
        self.associated.contains_key(address)
    }

    /// True for covered addresses other than the top-left.
    pub fn is_associated(&self, address: &SimpleCellAddress) -> bool {
        self.associated
            .get(address)
            .is_some_and(|top_left| top_left != address)
    }

    /// Top-left of the merge covering `address`.
    pub fn resolve(&self, address: &SimpleCellAddress) -> Option<SimpleCellAddress> {
        self.associated.get(address).copied()
    }

    /// Span record of the merge anchored at `top_left`.
    pub fn merged_cell(&self, top_left: &SimpleCellAddress) -> Option<MergedCell> {
        self.spans.get(top_left).copied()
    }

    /// Full rectangle of the merge covering `address`.
    pub fn merge_range(&self, address: &SimpleCellAddress) -> Option<RangeSimpleCellAddress> {
        let top_left = self.resolve(address)?;
        self.spans.get(&top_left).map(|m| m.range(top_left))
    }

    /// Rectangles of all merges overlapping `range`.
    pub fn merges_overlapping(&self, range: &RangeSimpleCellAddress) -> Vec<RangeSimpleCellAddress> {
        self.spans
            .iter()
            .map(|(top_left, m)| m.range(*top_left))
            .filter(|r| r.overlaps(range))
            .collect()
    }

    /// Classify `range` for the merge/unmerge controls.
    pub fn merge_state(&self, range: &RangeSimpleCellAddress) -> MergeState {
        if let Some(existing) = self.merge_range(&range.top_left) {
            if existing == *range {
                return MergeState::Merged(range.top_left);
            }
        }
        if range.is_single_cell() {
            return MergeState::None;
        }
        let mut candidate = *range;
        loop {
            let mut grew = false;
            for merge in self.merges_overlapping(&candidate) {
                let merged = candidate.union(&merge);
                if merged != candidate {
                    candidate = merged;
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }
        MergeState::Pending(candidate)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}
