//! Pixel ↔ index mapping for one axis (rows or columns).
//!
//! Positions are computed from the default size plus sorted size overrides
//! with prefix sums, so `get_axis` is a binary search instead of a walk over
//! every override. The scrolling window `[start, end]` covers the scrollable
//! pane only; frozen indices `0..=boundary` are always laid out at their
//! natural position.

use std::ops::RangeInclusive;

use crate::address::{Axis, SheetId};
use crate::options::GridOptions;
use crate::types::SpreadsheetData;

#[derive(Debug, Clone)]
pub struct AxisManager {
    axis: Axis,
    default_size: f64,
    min_size: f64,
    amount: u32,
    /// Header strip before index 0
    inset: f64,
    /// `(index, size)` ascending by index, only indices below `amount`
    overrides: Vec<(u32, f64)>,
    /// `prefix_delta[k]` = Σ(size − default) over `overrides[..k]`
    prefix_delta: Vec<f64>,
    /// Inclusive frozen boundary
    frozen: Option<u32>,
    /// Canvas extent along this axis
    viewport_size: f64,
    start: u32,
    end: u32,
}

impl AxisManager {
    pub fn new(axis: Axis, options: &GridOptions) -> Self {
        let mut manager = Self {
            axis,
            default_size: options.default_size(axis),
            min_size: options.min_size,
            amount: options.count(axis).max(1),
            inset: options.inset(axis),
            overrides: Vec::new(),
            prefix_delta: vec![0.0],
            frozen: None,
            viewport_size: options.viewport_size(axis),
            start: 0,
            end: 0,
        };
        manager.update_end();
        manager
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn default_size(&self) -> f64 {
        self.default_size
    }

    pub fn min_size(&self) -> f64 {
        self.min_size
    }

    pub fn inset(&self) -> f64 {
        self.inset
    }

    pub fn viewport_size(&self) -> f64 {
        self.viewport_size
    }

    /// Reload overrides and the frozen boundary of `sheet` from the store and
    /// recompute the window.
    pub fn sync(&mut self, data: &SpreadsheetData, sheet: SheetId) {
        let amount = self.amount;
        let mut overrides: Vec<(u32, f64)> = data
            .size_overrides_in_sheet(self.axis, sheet)
            .filter(|(index, _)| *index < amount)
            .collect();
        overrides.sort_by_key(|(index, _)| *index);
        self.set_overrides(overrides);

        self.frozen = data.frozen_cell(sheet).and_then(|f| match self.axis {
            Axis::Row => f.row,
            Axis::Col => f.col,
        });
        self.clamp_window();
    }

    fn set_overrides(&mut self, overrides: Vec<(u32, f64)>) {
        let mut prefix_delta = Vec::with_capacity(overrides.len() + 1);
        let mut running = 0.0;
        prefix_delta.push(running);
        for (_, size) in &overrides {
            running += size - self.default_size;
            prefix_delta.push(running);
        }
        self.overrides = overrides;
        self.prefix_delta = prefix_delta;
    }

    /// Change the number of addressable indices.
    pub fn set_amount(&mut self, amount: u32) {
        self.amount = amount.max(1);
        let amount = self.amount;
        let kept: Vec<(u32, f64)> = self
            .overrides
            .iter()
            .copied()
            .filter(|(index, _)| *index < amount)
            .collect();
        self.set_overrides(kept);
        self.clamp_window();
    }

    /// Canvas resized along this axis.
    pub fn resize_viewport(&mut self, viewport_size: f64) {
        self.viewport_size = viewport_size.max(0.0);
        self.clamp_window();
    }

    // ---- geometry ----

    /// Pixel offset of the leading edge of `index`, inset included.
    pub fn get_axis(&self, index: u32) -> f64 {
        let k = self.overrides.partition_point(|(i, _)| *i < index);
        let delta = self.prefix_delta.get(k).copied().unwrap_or(0.0);
        self.inset + self.default_size * f64::from(index) + delta
    }

    /// Size of `index`: its override if present, else the default.
    pub fn get_size(&self, index: u32) -> f64 {
        self.override_at(index).unwrap_or(self.default_size)
    }

    pub fn override_at(&self, index: u32) -> Option<f64> {
        self.overrides
            .binary_search_by_key(&index, |(i, _)| *i)
            .ok()
            .and_then(|k| self.overrides.get(k))
            .map(|(_, size)| *size)
    }

    /// Σ `get_size(i)` over `0..amount`, inset excluded.
    pub fn get_total_size(&self) -> f64 {
        let delta = self.prefix_delta.last().copied().unwrap_or(0.0);
        self.default_size * f64::from(self.amount) + delta
    }

    /// Index whose span contains the sheet-space pixel `offset`.
    pub fn index_at_offset(&self, offset: f64) -> Option<u32> {
        if offset < self.inset || offset >= self.inset + self.get_total_size() {
            return None;
        }
        let (mut lo, mut hi) = (0u32, self.amount);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.get_axis(mid + 1) <= offset {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Some(lo.min(self.amount - 1))
    }

    /// Greedily accumulate sizes from `start` until the running sum would
    /// exceed `viewport_px`; the result is the last index at least partly
    /// visible, never before `start`.
    pub fn end_index_from_start(&self, viewport_px: f64, start: u32) -> u32 {
        let last = self.amount - 1;
        let mut index = start.min(last);
        let mut sum = 0.0;
        while index < last && sum + self.get_size(index) < viewport_px {
            sum += self.get_size(index);
            index += 1;
        }
        index
    }

    // ---- frozen pane ----

    pub fn frozen(&self) -> Option<u32> {
        self.frozen
    }

    pub fn is_frozen(&self, index: u32) -> bool {
        self.frozen.is_some_and(|boundary| index <= boundary)
    }

    /// Frozen indices clipped to the addressable range.
    pub fn frozen_range(&self) -> Option<RangeInclusive<u32>> {
        self.frozen.map(|boundary| 0..=boundary.min(self.amount - 1))
    }

    /// Pixel extent of the frozen indices.
    pub fn frozen_size(&self) -> f64 {
        match self.frozen {
            Some(boundary) => {
                let next = boundary.saturating_add(1).min(self.amount);
                self.get_axis(next) - self.inset
            }
            None => 0.0,
        }
    }

    /// False when the frozen boundary covers every index, leaving nothing
    /// to scroll.
    pub fn has_scrolling_pane(&self) -> bool {
        self.frozen.map_or(true, |boundary| boundary < self.amount - 1)
    }

    /// First index of the scrolling pane.
    pub fn first_scrollable(&self) -> u32 {
        self.frozen
            .map_or(0, |boundary| boundary.saturating_add(1))
            .min(self.amount - 1)
    }

    /// Pixels available to the scrolling pane.
    pub fn scrollable_viewport(&self) -> f64 {
        (self.viewport_size - self.inset - self.frozen_size()).max(0.0)
    }

    // ---- scrolling window ----

    /// `[start, end]` of the scrolling pane.
    pub fn window(&self) -> (u32, u32) {
        (self.start, self.end)
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    /// Indices of the scrolling pane, `None` when everything is frozen.
    pub fn scrolling_range(&self) -> Option<RangeInclusive<u32>> {
        self.has_scrolling_pane().then_some(self.start..=self.end)
    }

    /// Number of indices in the scrolling window.
    pub fn visible_count(&self) -> u32 {
        if self.has_scrolling_pane() {
            self.end - self.start + 1
        } else {
            0
        }
    }

    /// Pixels the scrolling pane is shifted by: sheet-space offset of
    /// `start` relative to the first scrollable index.
    pub fn scroll_offset(&self) -> f64 {
        self.get_axis(self.start) - self.get_axis(self.first_scrollable())
    }

    /// Translation to apply to the scrolling pane's group.
    pub fn translation(&self) -> f64 {
        -self.scroll_offset()
    }

    /// Viewport pixel of the leading edge of `index`.
    pub fn screen_position(&self, index: u32) -> f64 {
        if self.is_frozen(index) {
            self.get_axis(index)
        } else {
            self.get_axis(index) - self.scroll_offset()
        }
    }

    /// Index under viewport pixel `px` (headers give `None`).
    pub fn index_at_viewport_pixel(&self, px: f64) -> Option<u32> {
        if px < self.inset {
            return None;
        }
        if self.frozen.is_some() && px < self.inset + self.frozen_size() {
            return self.index_at_offset(px);
        }
        self.index_at_offset(px + self.scroll_offset())
    }

    /// Scroll so that `f ∈ [0, 1]` of the axis is passed:
    /// `start = round((amount + 1) × f)`, kept within the scrollable range.
    /// Returns the pixel delta for the group translation.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn scroll_to_fraction(&mut self, fraction: f64) -> f64 {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let raw = ((f64::from(self.amount) + 1.0) * fraction).round();
        let index = if raw >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            raw as u32
        };
        self.scroll_to_index(index)
    }

    /// Scroll by a pixel amount (wheel input). Returns the group delta.
    pub fn scroll_by_pixels(&mut self, delta: f64) -> f64 {
        let target = self.get_axis(self.start) + delta;
        let index = self
            .index_at_offset(target.max(self.inset))
            .unwrap_or(self.amount - 1);
        self.scroll_to_index(index)
    }

    /// Make `index` the first index of the scrolling pane (clamped).
    /// Returns `old offset − new offset`, the delta to translate by.
    pub fn scroll_to_index(&mut self, index: u32) -> f64 {
        let old = self.get_axis(self.start);
        self.start = self.clamp_start(index);
        self.update_end();
        old - self.get_axis(self.start)
    }

    /// Bring `index` into view if it lies outside the scrolling window.
    pub fn scroll_into_view(&mut self, index: u32) -> f64 {
        if self.is_frozen(index) || (self.start..=self.end).contains(&index) {
            return 0.0;
        }
        if index < self.start {
            return self.scroll_to_index(index);
        }
        // Walk back from `index` until the pane is full.
        let available = self.scrollable_viewport();
        let mut first = index;
        let mut used = self.get_size(index);
        while first > self.first_scrollable() && used + self.get_size(first - 1) <= available {
            first -= 1;
            used += self.get_size(first);
        }
        self.scroll_to_index(first)
    }

    /// Fraction that [`scroll_to_fraction`](Self::scroll_to_fraction) maps
    /// back to the current start: `start / (amount + 1)`, pinned to 0 and 1
    /// at the ends of the scrollable range.
    pub fn scroll_fraction(&self) -> f64 {
        if self.start <= self.first_scrollable() {
            return 0.0;
        }
        if self.start >= self.amount - 1 {
            return 1.0;
        }
        (f64::from(self.start) / (f64::from(self.amount) + 1.0)).clamp(0.0, 1.0)
    }

    fn clamp_start(&self, index: u32) -> u32 {
        index.max(self.first_scrollable()).min(self.amount - 1)
    }

    fn update_end(&mut self) {
        self.end = self.end_index_from_start(self.scrollable_viewport(), self.start);
    }

    fn clamp_window(&mut self) {
        self.start = self.clamp_start(self.start);
        self.update_end();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::address::RowColAddress;
    use crate::store::DataStore;

    fn rows(inset: f64) -> AxisManager {
        let options = GridOptions {
            row_size: 25.0,
            row_count: 100,
            col_header_height: inset,
            height: 200.0 + inset,
            ..GridOptions::default()
        };
        AxisManager::new(Axis::Row, &options)
    }

    fn with_overrides(manager: &mut AxisManager, overrides: &[(u32, f64)], frozen: Option<i64>) {
        let mut store = DataStore::new();
        store.set_sheet(0, "Sheet1");
        for (index, size) in overrides {
            store.set_row_col(Axis::Row, RowColAddress::new(0, *index), *size);
        }
        store.set_frozen_cell(0, frozen, None);
        manager.sync(store.data(), 0);
    }

    #[test]
    fn get_axis_applies_override_deltas() {
        let mut manager = rows(20.0);
        with_overrides(&mut manager, &[(0, 50.0)], None);
        assert_eq!(manager.get_axis(0), 20.0);
        assert_eq!(manager.get_axis(1), 70.0);
        assert_eq!(manager.get_axis(2), 50.0 + 25.0 + 20.0);
        assert_eq!(manager.get_size(0), 50.0);
        assert_eq!(manager.get_size(1), 25.0);
    }

    #[test]
    fn total_size_matches_sum_of_sizes() {
        let mut manager = rows(0.0);
        with_overrides(&mut manager, &[(3, 10.0), (7, 60.0), (99, 30.0)], None);
        let sum: f64 = (0..manager.amount()).map(|i| manager.get_size(i)).sum();
        assert_eq!(manager.get_total_size(), sum);
    }

    #[test]
    fn end_index_counts_partial_rows() {
        let manager = rows(0.0);
        assert_eq!(manager.end_index_from_start(50.0, 0), 1);
        assert_eq!(manager.end_index_from_start(51.0, 0), 2);
        assert_eq!(manager.end_index_from_start(0.0, 5), 5);
        assert_eq!(manager.end_index_from_start(1e9, 5), 99);
    }

    #[test]
    fn index_lookup_inverts_get_axis() {
        let mut manager = rows(20.0);
        with_overrides(&mut manager, &[(2, 100.0)], None);
        for index in [0, 1, 2, 3, 50, 99] {
            let top = manager.get_axis(index);
            assert_eq!(manager.index_at_offset(top), Some(index));
            assert_eq!(manager.index_at_offset(top + manager.get_size(index) - 0.5), Some(index));
        }
        assert_eq!(manager.index_at_offset(10.0), None);
    }

    #[test]
    fn scroll_fraction_maps_to_start() {
        let mut manager = rows(0.0);
        manager.scroll_to_fraction(0.5);
        assert_eq!(manager.start(), 51);
        manager.scroll_to_fraction(1.0);
        assert_eq!(manager.start(), 99);
        assert_eq!(manager.end(), 99);
        let delta = manager.scroll_to_fraction(0.0);
        assert_eq!(manager.start(), 0);
        assert_eq!(delta, 99.0 * 25.0);
    }

    #[test]
    fn frozen_rows_stay_out_of_the_window() {
        let mut manager = rows(20.0);
        with_overrides(&mut manager, &[], Some(1));
        assert!(manager.is_frozen(1));
        assert!(!manager.is_frozen(2));
        assert_eq!(manager.start(), 2);
        assert_eq!(manager.frozen_size(), 50.0);
        manager.scroll_to_fraction(0.0);
        assert_eq!(manager.start(), 2);
        assert_eq!(manager.scroll_offset(), 0.0);

        manager.scroll_to_index(10);
        assert_eq!(manager.screen_position(0), 20.0);
        assert_eq!(manager.screen_position(10), 70.0);
        assert_eq!(manager.index_at_viewport_pixel(30.0), Some(0));
        assert_eq!(manager.index_at_viewport_pixel(71.0), Some(10));
        assert_eq!(manager.index_at_viewport_pixel(5.0), None);
    }

    #[test]
    fn freezing_every_row_leaves_no_scrolling_window() {
        let mut manager = rows(0.0);
        with_overrides(&mut manager, &[], Some(99));
        assert!(!manager.has_scrolling_pane());
        assert!(manager.scrolling_range().is_none());
        assert_eq!(manager.visible_count(), 0);

        with_overrides(&mut manager, &[], Some(98));
        assert_eq!(manager.scrolling_range(), Some(99..=99));
    }

    #[test]
    fn scroll_fraction_inverts_scroll_to_fraction() {
        let mut manager = rows(0.0);
        for start in [1, 17, 50, 98] {
            manager.scroll_to_index(start);
            let fraction = manager.scroll_fraction();
            manager.scroll_to_index(0);
            manager.scroll_to_fraction(fraction);
            assert_eq!(manager.start(), start);
        }
        manager.scroll_to_index(99);
        assert_eq!(manager.scroll_fraction(), 1.0);
    }

    #[test]
    fn scroll_into_view_keeps_target_visible() {
        let mut manager = rows(0.0);
        manager.scroll_into_view(40);
        let (start, end) = manager.window();
        assert!(start <= 40 && 40 <= end);
        manager.scroll_into_view(3);
        assert_eq!(manager.start(), 3);
    }
}
