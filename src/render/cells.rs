//! Cell viewport manager.
//!
//! Decides which addresses in the visible windows get a visual, binds the
//! visuals to pooled slots, draws merges through their top-left, and reports
//! rows whose wrapped content no longer fits.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::ops::RangeInclusive;

use super::measure::{wrapped_height, TextMeasurer};
use super::pool::{ObjectPool, Poolable, SlotKey};
use super::region::PositionedRegion;
use crate::address::{SheetId, SimpleCellAddress};
use crate::engine::FormulaEngine;
use crate::layout::AxisManager;
use crate::merger::Merger;
use crate::types::{CellStyle, Pane, Rect, SpreadsheetData};

/// One pooled renderable cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellVisual {
    pub region: PositionedRegion,
    pub pane: Pane,
    /// Display text: the engine's computed value, else the raw record value
    pub text: Option<String>,
    pub style: Option<CellStyle>,
    pub visible: bool,
}

impl Poolable for CellVisual {
    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Row height needed by a wrapped cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoGrow {
    pub row: u32,
    pub size: f64,
}

/// What a render pass reads.
pub struct ViewportSource<'a, E: FormulaEngine + ?Sized> {
    pub sheet: SheetId,
    pub data: &'a SpreadsheetData,
    pub merger: &'a Merger,
    pub engine: &'a E,
    pub rows: &'a AxisManager,
    pub cols: &'a AxisManager,
}

impl<E: FormulaEngine + ?Sized> ViewportSource<'_, E> {
    /// Has a record, belongs to a merge, or has an engine value (array
    /// spills land on otherwise empty addresses).
    pub fn is_visible(&self, address: &SimpleCellAddress) -> bool {
        self.data.cells.contains_key(address)
            || self.merger.is_part_of_merge(address)
            || self.engine.get_cell_value(*address).is_some()
    }

    fn pane_ranges(&self, pane: Pane) -> Option<(RangeInclusive<u32>, RangeInclusive<u32>)> {
        let rows = if pane.rows_frozen() {
            self.rows.frozen_range()?
        } else {
            self.rows.scrolling_range()?
        };
        let cols = if pane.cols_frozen() {
            self.cols.frozen_range()?
        } else {
            self.cols.scrolling_range()?
        };
        Some((rows, cols))
    }

    /// Sheet-space rectangle of `top_left`, spanning its merge if any.
    pub fn cell_rect(&self, top_left: &SimpleCellAddress) -> Rect {
        let (width, height) = self
            .merger
            .merged_cell(top_left)
            .map_or((1, 1), |m| (m.width.max(1), m.height.max(1)));
        let x = self.cols.get_axis(top_left.col);
        let y = self.rows.get_axis(top_left.row);
        let right = self.cols.get_axis(top_left.col.saturating_add(width));
        let bottom = self.rows.get_axis(top_left.row.saturating_add(height));
        Rect::new(x, y, right - x, bottom - y)
    }
}

/// Counters from the last pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassStats {
    pub drawn: usize,
    pub released: usize,
    pub live: usize,
    pub capacity: usize,
}

#[derive(Debug, Default)]
pub struct CellViewport {
    pool: ObjectPool<CellVisual>,
    /// Content fingerprint per address whose row was already grown for it
    grown: HashMap<SimpleCellAddress, u64>,
    stats: PassStats,
}

fn fingerprint(text: &str, width: f64, style: Option<&CellStyle>) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    width.to_bits().hash(&mut hasher);
    if let Some(style) = style {
        style.font_size.map(f64::to_bits).hash(&mut hasher);
        style.bold.hash(&mut hasher);
        style.italic.hash(&mut hasher);
    }
    hasher.finish()
}

impl CellViewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile pooled visuals against the visible windows of both axes.
    ///
    /// Returns rows that need to grow for wrapped text. Each address grows at
    /// most once per distinct content.
    pub fn update<E, M>(&mut self, source: &ViewportSource<'_, E>, measurer: &mut M) -> Vec<AutoGrow>
    where
        E: FormulaEngine + ?Sized,
        M: TextMeasurer + ?Sized,
    {
        let row_amount = source.rows.amount();
        let col_amount = source.cols.amount();
        let mut grows: Vec<AutoGrow> = Vec::new();
        let mut drawn = 0;

        self.pool.begin_pass();
        for pane in Pane::ALL {
            let Some((rows, cols)) = source.pane_ranges(pane) else {
                continue;
            };
            let (row_base, col_base) = (i64::from(*rows.start()), i64::from(*cols.start()));
            let mut placed: HashSet<SimpleCellAddress> = HashSet::new();

            for row in rows {
                if row >= row_amount {
                    continue;
                }
                for col in cols.clone() {
                    if col >= col_amount {
                        continue;
                    }
                    let address = SimpleCellAddress::new(source.sheet, row, col);
                    if !source.is_visible(&address) {
                        continue;
                    }
                    let top_left = source.merger.resolve(&address).unwrap_or(address);
                    if !placed.insert(top_left) {
                        continue;
                    }

                    let record = source.data.cell(&top_left);
                    let text = source
                        .engine
                        .get_cell_value(top_left)
                        .or_else(|| record.and_then(|c| c.value.clone()));
                    let style = record.and_then(|c| c.style.clone());
                    let rect = source.cell_rect(&top_left);

                    if let (Some(text), Some(record)) = (&text, record) {
                        let single_row = source
                            .merger
                            .merged_cell(&top_left)
                            .map_or(true, |m| m.height <= 1);
                        if record.wraps_text() && single_row {
                            if let Some(grow) =
                                self.check_grow(source, measurer, top_left, text, rect.width, style.as_ref())
                            {
                                grows.push(grow);
                            }
                        }
                    }

                    let slot = SlotKey {
                        pane,
                        row: i64::from(top_left.row) - row_base,
                        col: i64::from(top_left.col) - col_base,
                    };
                    let visual = self.pool.acquire(slot);
                    visual.region = PositionedRegion::new(top_left, rect).styled(style.as_ref());
                    visual.pane = pane;
                    visual.text = text;
                    visual.style = style;
                    visual.visible = true;
                    drawn += 1;
                }
            }
        }
        let released = self.pool.end_pass();

        self.stats = PassStats {
            drawn,
            released,
            live: self.pool.live_count(),
            capacity: self.pool.capacity(),
        };
        grows
    }

    fn check_grow<E, M>(
        &mut self,
        source: &ViewportSource<'_, E>,
        measurer: &mut M,
        address: SimpleCellAddress,
        text: &str,
        width: f64,
        style: Option<&CellStyle>,
    ) -> Option<AutoGrow>
    where
        E: FormulaEngine + ?Sized,
        M: TextMeasurer + ?Sized,
    {
        let needed = wrapped_height(measurer, text, width, style).ceil();
        if needed <= source.rows.get_size(address.row) {
            return None;
        }
        let print = fingerprint(text, width, style);
        if self.grown.get(&address) == Some(&print) {
            return None;
        }
        self.grown.insert(address, print);
        log::debug!("row {} grows to {needed}px for wrapped text", address.row);
        Some(AutoGrow {
            row: address.row,
            size: needed,
        })
    }

    /// Forget auto-grow history, e.g. after switching sheets.
    pub fn clear_grow_history(&mut self) {
        self.grown.clear();
    }

    /// Visuals bound in the last pass.
    pub fn visuals(&self) -> impl Iterator<Item = &CellVisual> {
        self.pool.live().map(|(_, visual)| visual)
    }

    pub fn visual_at(&self, slot: &SlotKey) -> Option<&CellVisual> {
        self.pool.get(slot)
    }

    pub fn stats(&self) -> PassStats {
        self.stats
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::address::Axis;
    use crate::engine::MemoryEngine;
    use crate::options::GridOptions;
    use crate::render::measure::ApproxTextMeasurer;
    use crate::store::DataStore;
    use crate::types::{CellData, MergedCell, TextWrap};

    struct Fixture {
        store: DataStore,
        engine: MemoryEngine,
        merger: Merger,
        rows: AxisManager,
        cols: AxisManager,
        sheet: SheetId,
    }

    impl Fixture {
        fn new() -> Self {
            let options = GridOptions {
                width: 440.0,
                height: 150.0,
                row_header_width: 40.0,
                col_header_height: 25.0,
                ..GridOptions::default()
            };
            let mut engine = MemoryEngine::new();
            let sheet = engine.add_sheet("Sheet1").unwrap();
            let mut store = DataStore::new();
            store.set_sheet(sheet, "Sheet1");
            Self {
                store,
                engine,
                merger: Merger::new(),
                rows: AxisManager::new(Axis::Row, &options),
                cols: AxisManager::new(Axis::Col, &options),
                sheet,
            }
        }

        fn sync(&mut self) {
            self.merger.rebuild(self.store.data());
            self.rows.sync(self.store.data(), self.sheet);
            self.cols.sync(self.store.data(), self.sheet);
        }

        fn render(&self, viewport: &mut CellViewport) -> Vec<AutoGrow> {
            let source = ViewportSource {
                sheet: self.sheet,
                data: self.store.data(),
                merger: &self.merger,
                engine: &self.engine,
                rows: &self.rows,
                cols: &self.cols,
            };
            viewport.update(&source, &mut ApproxTextMeasurer::default())
        }
    }

    #[test]
    fn visibility_covers_records_merges_and_spills() {
        let mut f = Fixture::new();
        let a1 = SimpleCellAddress::new(f.sheet, 0, 0);
        f.store.set_cell(&mut f.engine, a1, CellData::with_value("x"));
        f.engine
            .set_computed_value(SimpleCellAddress::new(f.sheet, 1, 1), Some("spill".into()));
        f.sync();

        let mut viewport = CellViewport::new();
        f.render(&mut viewport);
        let texts: Vec<_> = viewport.visuals().filter_map(|v| v.text.clone()).collect();
        assert_eq!(viewport.stats().drawn, 2);
        assert!(texts.contains(&"x".to_string()));
        assert!(texts.contains(&"spill".to_string()));
    }

    #[test]
    fn merge_members_draw_their_top_left_once() {
        let mut f = Fixture::new();
        let tl = SimpleCellAddress::new(f.sheet, 1, 1);
        f.store.set_merged_cell(&mut f.engine, tl, MergedCell::new(2, 2));
        f.sync();

        let mut viewport = CellViewport::new();
        f.render(&mut viewport);
        let visuals: Vec<_> = viewport.visuals().collect();
        assert_eq!(visuals.len(), 1);
        assert_eq!(visuals[0].region.address, tl);
        assert_eq!(visuals[0].region.rect.width, 200.0);
        assert_eq!(visuals[0].region.rect.height, 50.0);
    }

    #[test]
    fn merge_above_window_still_draws() {
        let mut f = Fixture::new();
        let tl = SimpleCellAddress::new(f.sheet, 0, 0);
        f.store.set_merged_cell(&mut f.engine, tl, MergedCell::new(1, 4));
        f.sync();
        f.rows.scroll_to_index(2);

        let mut viewport = CellViewport::new();
        f.render(&mut viewport);
        let slot = SlotKey {
            pane: Pane::Main,
            row: -2,
            col: 0,
        };
        assert_eq!(viewport.visual_at(&slot).map(|v| v.region.address), Some(tl));
    }

    #[test]
    fn wrapped_text_grows_row_once() {
        let mut f = Fixture::new();
        let a1 = SimpleCellAddress::new(f.sheet, 0, 0);
        let cell = CellData {
            value: Some("a long sentence that needs several lines to fit".into()),
            style: Some(CellStyle {
                text_wrap: Some(TextWrap::Wrap),
                ..CellStyle::default()
            }),
            comment: None,
        };
        f.store.set_cell(&mut f.engine, a1, cell);
        f.sync();

        let mut viewport = CellViewport::new();
        let grows = f.render(&mut viewport);
        assert_eq!(grows.len(), 1);
        assert!(grows[0].size > 25.0);
        // Same content again without applying the grow: guarded.
        assert!(f.render(&mut viewport).is_empty());
    }

    #[test]
    fn live_visuals_are_bounded_by_the_window() {
        let mut f = Fixture::new();
        for row in 0..200 {
            for col in 0..10 {
                let address = SimpleCellAddress::new(f.sheet, row, col);
                f.store
                    .set_cell(&mut f.engine, address, CellData::with_value(format!("{row}")));
            }
        }
        f.sync();
        let mut viewport = CellViewport::new();
        for start in [0, 5, 40, 120, 3, 199] {
            f.rows.scroll_to_index(start);
            f.render(&mut viewport);
            let bound = (f.rows.visible_count() * f.cols.visible_count()) as usize;
            assert!(viewport.stats().live <= bound);
        }
    }
}
