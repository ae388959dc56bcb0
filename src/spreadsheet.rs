//! Per-instance spreadsheet context.
//!
//! [`Spreadsheet`] owns everything one grid needs: the data store, merge
//! index, formula engine, axis managers, interaction state machines and
//! history sync. Several instances can live side by side; nothing is global.
//!
//! Every UI mutation goes through one transaction: the store is updated,
//! writes are mirrored into the engine inside one engine batch together with
//! the UI undo entry, and the change to the touched sheets is registered
//! under the batch id so undo and redo restore it exactly. A change the
//! engine refused to record still gets its own grid-only entry.

use std::collections::{BTreeMap, BTreeSet};

use crate::address::{Axis, RangeSimpleCellAddress, RowColAddress, SheetId, SimpleCellAddress};
use crate::engine::{self, FormulaEngine, HistoryDirection, HistoryEvent, UndoEntry};
use crate::error::{Result, SheetGridError};
use crate::history::HistorySync;
use crate::layout::{AxisManager, ResizeState, Resizer, Scrollbar, SCROLLBAR_THICKNESS};
use crate::merger::{MergeState, Merger};
use crate::options::GridOptions;
use crate::render::{
    pane_clip, pane_offset, selection_groups, AutoGrow, CellViewport, PassStats, RenderBackend,
    RenderFrame, TextMeasurer, ViewportSource,
};
use crate::schedule::{Debounce, Throttle};
use crate::selector::Selector;
use crate::store::DataStore;
use crate::types::{CellData, CellStyle, FrozenCell, MergedCell, Pane, SelectionGroup, SpreadsheetData};

const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// Scroll input waiting for the throttle. Later input folds into earlier.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ScrollInput {
    row_fraction: Option<f64>,
    col_fraction: Option<f64>,
    wheel_x: f64,
    wheel_y: f64,
}

impl ScrollInput {
    fn fraction(axis: Axis, fraction: f64) -> Self {
        match axis {
            Axis::Row => Self {
                row_fraction: Some(fraction),
                ..Self::default()
            },
            Axis::Col => Self {
                col_fraction: Some(fraction),
                ..Self::default()
            },
        }
    }

    /// `later` applied after `self`. A fraction jump discards wheel deltas
    /// queued before it on the same axis.
    fn then(self, later: Self) -> Self {
        Self {
            row_fraction: later.row_fraction.or(self.row_fraction),
            col_fraction: later.col_fraction.or(self.col_fraction),
            wheel_x: if later.col_fraction.is_some() {
                later.wheel_x
            } else {
                self.wheel_x + later.wheel_x
            },
            wheel_y: if later.row_fraction.is_some() {
                later.wheel_y
            } else {
                self.wheel_y + later.wheel_y
            },
        }
    }
}

/// What sits under a viewport pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Near the trailing edge of a header cell
    ResizeHandle { axis: Axis, index: u32 },
    /// On the scrollbar of an axis
    Scrollbar(Axis),
    Cell { row: u32, col: u32 },
    /// Headers away from an edge, the corner, or past the last index
    Nothing,
}

/// How a transaction lands on the engine's undo stack.
#[derive(Debug)]
enum Recording {
    /// Pushed inside the transaction's engine batch.
    Entry(UndoEntry),
    /// Pushed only when the engine recorded none of the transaction's
    /// writes but grid state still changed, e.g. a refused cell write.
    Fallback(UndoEntry),
}

pub struct Spreadsheet<E: FormulaEngine> {
    options: GridOptions,
    store: DataStore,
    merger: Merger,
    engine: E,
    rows: AxisManager,
    cols: AxisManager,
    row_scrollbar: Scrollbar,
    col_scrollbar: Scrollbar,
    resizer: Resizer,
    cells: CellViewport,
    selector: Selector,
    history: HistorySync,
    active_sheet: SheetId,
    scroll: Throttle<ScrollInput>,
    viewport_resize: Debounce<(f64, f64)>,
    /// Range most recently split by an unmerge, until the selection moves
    unmerged: Option<RangeSimpleCellAddress>,
    dirty: bool,
}

impl<E: FormulaEngine> Spreadsheet<E> {
    /// New instance with one empty sheet, created in the engine without an
    /// undo entry.
    pub fn new(engine: E, options: GridOptions) -> Result<Self> {
        options.validate()?;
        let mut engine = engine;
        let sheet = engine::without_undo_recording(&mut engine, |e| e.add_sheet(DEFAULT_SHEET_NAME))?;
        let mut store = DataStore::new();
        store.set_sheet(sheet, DEFAULT_SHEET_NAME);
        Ok(Self::assemble(engine, options, store, sheet))
    }

    /// Instance over existing data. The engine is expected to know the same
    /// sheets; cell values are mirrored into it without undo entries.
    pub fn with_data(engine: E, options: GridOptions, data: SpreadsheetData) -> Result<Self> {
        options.validate()?;
        let sheet = first_sheet(&data)?;
        let mut spreadsheet = Self::assemble(engine, options, DataStore::from_data(data), sheet);
        spreadsheet.mirror_values();
        Ok(spreadsheet)
    }

    fn assemble(engine: E, options: GridOptions, store: DataStore, sheet: SheetId) -> Self {
        let mut rows = AxisManager::new(Axis::Row, &options);
        let mut cols = AxisManager::new(Axis::Col, &options);
        rows.sync(store.data(), sheet);
        cols.sync(store.data(), sheet);
        Self {
            merger: Merger::from_data(store.data()),
            selector: Selector::new(options.selection_drag_opacity),
            scroll: Throttle::new(options.scroll_throttle_ms),
            viewport_resize: Debounce::new(options.resize_debounce_ms),
            row_scrollbar: Scrollbar::default(),
            col_scrollbar: Scrollbar::default(),
            resizer: Resizer::new(),
            cells: CellViewport::new(),
            history: HistorySync::new(),
            unmerged: None,
            dirty: true,
            active_sheet: sheet,
            options,
            store,
            engine,
            rows,
            cols,
        }
    }

    // ---- accessors ----

    pub fn options(&self) -> &GridOptions {
        &self.options
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn data(&self) -> &SpreadsheetData {
        self.store.data()
    }

    pub fn merger(&self) -> &Merger {
        &self.merger
    }

    pub fn rows(&self) -> &AxisManager {
        &self.rows
    }

    pub fn cols(&self) -> &AxisManager {
        &self.cols
    }

    pub fn axis(&self, axis: Axis) -> &AxisManager {
        match axis {
            Axis::Row => &self.rows,
            Axis::Col => &self.cols,
        }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn cells(&self) -> &CellViewport {
        &self.cells
    }

    pub fn history(&self) -> &HistorySync {
        &self.history
    }

    pub fn active_sheet(&self) -> SheetId {
        self.active_sheet
    }

    /// True when something changed since the last viewport update.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    // ---- transactions ----

    /// Run a UI mutation as one undo step.
    ///
    /// The state of `sheets` before and after is registered under every
    /// history id the mutation produced. See [`Recording`] for when the
    /// entry is pushed.
    fn transact<T>(
        &mut self,
        sheets: impl IntoIterator<Item = SheetId>,
        recording: Recording,
        f: impl FnOnce(&mut DataStore, &mut E) -> T,
    ) -> T {
        let mut sheets: BTreeSet<SheetId> = sheets.into_iter().collect();
        sheets.insert(self.active_sheet);
        let before = HistorySync::capture(&self.store, sheets.iter().copied());

        self.engine.begin_batch();
        let out = f(&mut self.store, &mut self.engine);
        let fallback = match recording {
            Recording::Entry(entry) => {
                self.engine.push_undo_entry(entry);
                None
            }
            Recording::Fallback(entry) => Some(entry),
        };
        self.engine.end_batch();

        let after = HistorySync::capture(&self.store, sheets);
        let mut events = self.engine.drain_history_events();
        let mut ids: BTreeSet<u64> = events
            .iter()
            .filter(|e| e.direction == HistoryDirection::Do)
            .map(|e| e.id)
            .collect();
        if let Some(entry) = fallback {
            if ids.is_empty() && before != after {
                log::debug!("engine recorded nothing; pushing {entry:?}");
                let id = self.engine.push_undo_entry(entry);
                events.extend(self.engine.drain_history_events());
                ids.extend(
                    events
                        .iter()
                        .filter(|e| e.direction == HistoryDirection::Do)
                        .map(|e| e.id),
                );
                if id != 0 {
                    ids.insert(id);
                }
            }
        }
        for id in ids {
            self.history.register(id, &before, &after);
        }
        self.replay(&events);
        self.refresh();
        out
    }

    /// Follow whatever the engine reported since the last drain. Returns
    /// true if grid state changed.
    pub fn process_engine_events(&mut self) -> bool {
        let events = self.engine.drain_history_events();
        if events.is_empty() {
            return false;
        }
        let changed = self.replay(&events);
        self.realign_merge_anchors(&events);
        self.refresh();
        changed
    }

    /// A merge anchored on an inserted line keeps its top-left while the
    /// engine shifts that line's contents past the insert. Put the anchor's
    /// value back where the store keeps it, and clear the shifted copy.
    fn realign_merge_anchors(&mut self, events: &[HistoryEvent]) {
        let mut writes: Vec<(SimpleCellAddress, Option<String>)> = Vec::new();
        for event in events {
            let mut inserts = Vec::new();
            collect_inserts(&event.entry, &mut inserts);
            for (sheet, axis, index, amount) in inserts {
                let anchors = self
                    .store
                    .data()
                    .merges_in_sheet(sheet)
                    .filter(|(top_left, _)| top_left.index(axis) == index);
                for (top_left, _) in anchors {
                    let value = self.store.data().cell(&top_left).and_then(|c| c.value.clone());
                    if event.direction != HistoryDirection::Undo {
                        writes.push((top_left.with_index(axis, index.saturating_add(amount)), None));
                    }
                    writes.push((top_left, value));
                }
            }
        }
        if !writes.is_empty() {
            log::debug!("realigning {} engine cells under merge anchors", writes.len());
            self.write_unrecorded(&writes);
        }
    }

    /// Write contents into the engine in one batch without undo entries.
    fn write_unrecorded(&mut self, writes: &[(SimpleCellAddress, Option<String>)]) {
        engine::without_undo_recording(&mut self.engine, |engine| {
            engine::batch(engine, |engine| {
                for (address, value) in writes {
                    if let Err(e) = engine.set_cell_contents(*address, value.as_deref()) {
                        log::warn!("engine rejected write at {address}: {e}");
                    }
                }
            });
        });
        self.engine.drain_history_events();
    }

    fn replay(&mut self, events: &[HistoryEvent]) -> bool {
        let store = &mut self.store;
        let history = &mut self.history;
        engine::without_undo_recording(&mut self.engine, |_| history.handle(store, events))
    }

    /// Rebuild derived state after the store changed.
    fn refresh(&mut self) {
        if !self.store.has_sheet(self.active_sheet) {
            let next = self.store.sheet_ids().next();
            if let Some(sheet) = next {
                self.enter_sheet(sheet);
            }
        }
        self.merger.rebuild(self.store.data());
        self.rows.sync(self.store.data(), self.active_sheet);
        self.cols.sync(self.store.data(), self.active_sheet);
        self.selector
            .retain_within(self.active_sheet, &self.rows, &self.cols);
        self.dirty = true;
    }

    fn enter_sheet(&mut self, sheet: SheetId) {
        self.active_sheet = sheet;
        self.selector.clear();
        self.unmerged = None;
        self.resizer.cancel();
        self.cells.clear_grow_history();
        self.rows.scroll_to_index(0);
        self.cols.scroll_to_index(0);
    }

    /// Write every stored value into the engine, unrecorded.
    fn mirror_values(&mut self) {
        let values: Vec<(SimpleCellAddress, Option<String>)> = self
            .store
            .data()
            .cells
            .iter()
            .filter_map(|(address, cell)| Some((*address, Some(cell.value.clone()?))))
            .collect();
        self.write_unrecorded(&values);
    }

    // ---- sheets ----

    /// Sheets as `(id, name)`, in id order.
    pub fn sheets(&self) -> Vec<(SheetId, String)> {
        self.store
            .data()
            .sheets
            .iter()
            .map(|(id, meta)| (*id, meta.sheet_name.clone()))
            .collect()
    }

    pub fn add_sheet(&mut self, name: &str) -> Result<SheetId> {
        let sheet = self.engine.add_sheet(name)?;
        self.process_engine_events();
        if !self.store.has_sheet(sheet) {
            self.store.set_sheet(sheet, name);
        }
        Ok(sheet)
    }

    /// Delete a sheet with everything on it. The last sheet cannot go.
    pub fn delete_sheet(&mut self, sheet: SheetId) -> Result<()> {
        if !self.store.has_sheet(sheet) {
            return Err(SheetGridError::NoSuchSheet(sheet));
        }
        if self.store.sheet_ids().count() < 2 {
            return Err(SheetGridError::Other("cannot delete the last sheet".to_string()));
        }
        let recording = Recording::Fallback(UndoEntry::LocalChange { sheets: vec![sheet] });
        self.transact([sheet], recording, |store, engine| store.delete_sheet(engine, sheet));
        Ok(())
    }

    pub fn rename_sheet(&mut self, sheet: SheetId, name: &str) -> Result<()> {
        if !self.store.has_sheet(sheet) {
            return Err(SheetGridError::NoSuchSheet(sheet));
        }
        self.engine.rename_sheet(sheet, name)?;
        self.process_engine_events();
        self.store.set_sheet(sheet, name);
        Ok(())
    }

    /// Make `sheet` the displayed sheet, scrolled to the top-left with no
    /// selection.
    pub fn switch_sheet(&mut self, sheet: SheetId) -> Result<()> {
        if !self.store.has_sheet(sheet) {
            return Err(SheetGridError::NoSuchSheet(sheet));
        }
        if sheet != self.active_sheet {
            self.enter_sheet(sheet);
            self.refresh();
        }
        Ok(())
    }

    // ---- cells ----

    /// The address holding data for `address`: its merge's top-left, or
    /// itself.
    fn owner(&self, address: SimpleCellAddress) -> SimpleCellAddress {
        self.merger.resolve(&address).unwrap_or(address)
    }

    pub fn cell(&self, address: SimpleCellAddress) -> Option<&CellData> {
        self.store.data().cell(&self.owner(address))
    }

    /// Display value: the engine's computed value, else the raw record value.
    pub fn cell_value(&self, address: SimpleCellAddress) -> Option<String> {
        let owner = self.owner(address);
        self.engine
            .get_cell_value(owner)
            .or_else(|| self.store.data().cell(&owner).and_then(|c| c.value.clone()))
    }

    /// Set the raw value of a cell, keeping its style. `None` clears it.
    pub fn set_cell_value(&mut self, address: SimpleCellAddress, value: Option<&str>) {
        let owner = self.owner(address);
        let mut cell = self.store.data().cell(&owner).cloned().unwrap_or_default();
        cell.value = value.filter(|v| !v.is_empty()).map(str::to_string);
        self.set_cell(owner, cell);
    }

    /// Replace the whole record of a cell.
    pub fn set_cell(&mut self, address: SimpleCellAddress, cell: CellData) {
        let owner = self.owner(address);
        let recording = Recording::Fallback(UndoEntry::LocalChange {
            sheets: vec![owner.sheet],
        });
        self.transact([owner.sheet], recording, |store, engine| {
            store.set_cell(engine, owner, cell);
        });
    }

    pub fn delete_cell(&mut self, address: SimpleCellAddress) -> Option<CellData> {
        let owner = self.owner(address);
        let recording = Recording::Fallback(UndoEntry::LocalChange {
            sheets: vec![owner.sheet],
        });
        self.transact([owner.sheet], recording, |store, engine| store.delete_cell(engine, owner))
    }

    /// Overlay `style` onto every cell in `range`; merged spans are styled
    /// through their top-left.
    pub fn set_cell_style(&mut self, range: RangeSimpleCellAddress, style: &CellStyle) {
        let owners: BTreeSet<SimpleCellAddress> =
            range.addresses().map(|address| self.owner(address)).collect();
        let updates: Vec<(SimpleCellAddress, CellData)> = owners
            .into_iter()
            .map(|owner| {
                let mut cell = self.store.data().cell(&owner).cloned().unwrap_or_default();
                cell.style.get_or_insert_with(CellStyle::default).merge_from(style);
                (owner, cell)
            })
            .collect();
        let recording = Recording::Fallback(UndoEntry::LocalChange {
            sheets: vec![range.sheet()],
        });
        self.transact([range.sheet()], recording, |store, engine| {
            for (owner, cell) in updates {
                store.set_cell(engine, owner, cell);
            }
        });
    }

    // ---- merges ----

    /// Classify `range` for the merge controls.
    pub fn merge_state(&self, range: &RangeSimpleCellAddress) -> MergeState {
        if self.unmerged == Some(*range) {
            return MergeState::Unmerged;
        }
        self.merger.merge_state(range)
    }

    pub fn selection_merge_state(&self) -> MergeState {
        self.selector
            .selection()
            .map_or(MergeState::None, |range| self.merge_state(&range))
    }

    /// Merge `range`, grown over any merge it overlaps. Returns the new
    /// merge's top-left; a range that is exactly an existing merge is left
    /// alone.
    pub fn merge_cells(&mut self, range: RangeSimpleCellAddress) -> Result<SimpleCellAddress> {
        let span = match self.merger.merge_state(&range) {
            MergeState::Merged(top_left) => return Ok(top_left),
            MergeState::Pending(span) => span,
            MergeState::None | MergeState::Unmerged => {
                return Err(SheetGridError::Other("a merge needs at least two cells".to_string()))
            }
        };
        let top_left = span.top_left;
        let merged = MergedCell::new(span.width(), span.height());
        self.transact(
            [span.sheet()],
            Recording::Entry(UndoEntry::MergeCells { range: span }),
            |store, engine| store.set_merged_cell(engine, top_left, merged),
        );
        self.unmerged = None;
        self.selector.select(span, &self.merger);
        log::debug!("merged {}x{} at {top_left}", span.width(), span.height());
        Ok(top_left)
    }

    pub fn merge_selection(&mut self) -> Result<SimpleCellAddress> {
        let range = self
            .selector
            .selection()
            .ok_or_else(|| SheetGridError::Other("nothing selected".to_string()))?;
        self.merge_cells(range)
    }

    /// Split every merge overlapping `range`. Returns false if there was none.
    pub fn unmerge_cells(&mut self, range: RangeSimpleCellAddress) -> bool {
        let overlapping = self.store.merges_overlapping(&range);
        if overlapping.is_empty() {
            return false;
        }
        self.transact(
            [range.sheet()],
            Recording::Entry(UndoEntry::UnmergeCells { range }),
            |store, _| {
                for (top_left, _) in &overlapping {
                    store.delete_merged_cell(*top_left);
                }
            },
        );
        self.unmerged = Some(range);
        true
    }

    pub fn unmerge_selection(&mut self) -> bool {
        match self.selector.selection() {
            Some(range) => self.unmerge_cells(range),
            None => false,
        }
    }

    // ---- frozen panes ----

    /// Freeze rows `0..=row` and cols `0..=col` of the active sheet. A
    /// negative value, or both absent, removes the freeze.
    pub fn freeze(&mut self, row: Option<i64>, col: Option<i64>) {
        let sheet = self.active_sheet;
        self.transact(
            [sheet],
            Recording::Entry(UndoEntry::SetFrozenCell { sheet }),
            |store, _| store.set_frozen_cell(sheet, row, col),
        );
    }

    pub fn unfreeze(&mut self) {
        if self.frozen_cell().is_some() {
            self.freeze(None, None);
        }
    }

    pub fn frozen_cell(&self) -> Option<FrozenCell> {
        self.store.data().frozen_cell(self.active_sheet).copied()
    }

    pub fn is_frozen_row(&self, row: u32) -> bool {
        self.frozen_cell().is_some_and(|f| f.is_row_frozen(row))
    }

    pub fn is_frozen_col(&self, col: u32) -> bool {
        self.frozen_cell().is_some_and(|f| f.is_col_frozen(col))
    }

    // ---- row / col sizes ----

    pub fn row_col_size(&self, axis: Axis, index: u32) -> f64 {
        self.axis(axis).get_size(index)
    }

    /// Override the size of one row or column, clamped to the minimum.
    pub fn set_row_col_size(&mut self, axis: Axis, index: u32, size: f64) {
        let sheet = self.active_sheet;
        let size = size.max(self.options.min_size);
        self.transact(
            [sheet],
            Recording::Entry(UndoEntry::SetRowColSize { sheet, axis, index }),
            |store, _| store.set_row_col(axis, RowColAddress::new(sheet, index), size),
        );
    }

    /// Drop an override so the index goes back to the default size.
    pub fn reset_row_col_size(&mut self, axis: Axis, index: u32) {
        let sheet = self.active_sheet;
        if self.axis(axis).override_at(index).is_none() {
            return;
        }
        self.transact(
            [sheet],
            Recording::Entry(UndoEntry::SetRowColSize { sheet, axis, index }),
            |store, _| store.delete_row_col(axis, RowColAddress::new(sheet, index)),
        );
    }

    // ---- structure ----

    pub fn insert_rows(&mut self, index: u32, amount: u32) -> Result<()> {
        self.change_lines(Axis::Row, index, amount, true)
    }

    pub fn delete_rows(&mut self, index: u32, amount: u32) -> Result<()> {
        self.change_lines(Axis::Row, index, amount, false)
    }

    pub fn insert_cols(&mut self, index: u32, amount: u32) -> Result<()> {
        self.change_lines(Axis::Col, index, amount, true)
    }

    pub fn delete_cols(&mut self, index: u32, amount: u32) -> Result<()> {
        self.change_lines(Axis::Col, index, amount, false)
    }

    /// The engine performs the change; grid state follows from its history
    /// event.
    fn change_lines(&mut self, axis: Axis, index: u32, amount: u32, insert: bool) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let sheet = self.active_sheet;
        match (axis, insert) {
            (Axis::Row, true) => self.engine.add_rows(sheet, index, amount),
            (Axis::Row, false) => self.engine.remove_rows(sheet, index, amount),
            (Axis::Col, true) => self.engine.add_columns(sheet, index, amount),
            (Axis::Col, false) => self.engine.remove_columns(sheet, index, amount),
        }?;
        self.process_engine_events();
        Ok(())
    }

    pub fn move_cells(
        &mut self,
        source: RangeSimpleCellAddress,
        destination: SimpleCellAddress,
    ) -> Result<()> {
        self.engine.move_cells(source, destination)?;
        self.process_engine_events();
        Ok(())
    }

    // ---- history ----

    pub fn undo(&mut self) -> Result<()> {
        self.engine.undo()?;
        self.process_engine_events();
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        self.engine.redo()?;
        self.process_engine_events();
        Ok(())
    }

    // ---- scrolling ----

    /// Jump the scrolling pane of `axis` to fraction `f ∈ [0, 1]`.
    /// Returns true if applied now, false if queued for [`tick`](Self::tick).
    pub fn scroll_to_fraction(&mut self, axis: Axis, fraction: f64, now_ms: f64) -> bool {
        self.queue_scroll(ScrollInput::fraction(axis, fraction), now_ms)
    }

    /// Wheel input in pixels. Deltas arriving while throttled accumulate.
    pub fn wheel(&mut self, delta_x: f64, delta_y: f64, now_ms: f64) -> bool {
        let input = ScrollInput {
            wheel_x: delta_x,
            wheel_y: delta_y,
            ..ScrollInput::default()
        };
        self.queue_scroll(input, now_ms)
    }

    fn queue_scroll(&mut self, input: ScrollInput, now_ms: f64) -> bool {
        let input = match self.scroll.flush() {
            Some(pending) => pending.then(input),
            None => input,
        };
        match self.scroll.offer(input, now_ms) {
            Some(input) => {
                self.apply_scroll(input);
                true
            }
            None => false,
        }
    }

    fn apply_scroll(&mut self, input: ScrollInput) {
        if let Some(fraction) = input.row_fraction {
            self.rows.scroll_to_fraction(fraction);
        }
        if let Some(fraction) = input.col_fraction {
            self.cols.scroll_to_fraction(fraction);
        }
        if input.wheel_y.abs() > f64::EPSILON {
            Scrollbar::wheel(&mut self.rows, input.wheel_y);
        }
        if input.wheel_x.abs() > f64::EPSILON {
            Scrollbar::wheel(&mut self.cols, input.wheel_x);
        }
        self.dirty = true;
    }

    /// Bring a cell into view on both axes.
    pub fn scroll_into_view(&mut self, address: SimpleCellAddress) {
        self.rows.scroll_into_view(address.row);
        self.cols.scroll_into_view(address.col);
        self.dirty = true;
    }

    /// Canvas resized. Applied once input settles, from [`tick`](Self::tick).
    pub fn resize_viewport(&mut self, width: f64, height: f64, now_ms: f64) {
        self.viewport_resize.push((width, height), now_ms);
    }

    fn apply_viewport_size(&mut self, width: f64, height: f64) {
        self.options.width = width.max(0.0);
        self.options.height = height.max(0.0);
        self.rows.resize_viewport(self.options.height);
        self.cols.resize_viewport(self.options.width);
        self.dirty = true;
    }

    /// Fire throttled scroll and debounced resize input that has come due.
    /// Returns true if anything was applied.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let mut applied = false;
        if let Some(input) = self.scroll.poll(now_ms) {
            self.apply_scroll(input);
            applied = true;
        }
        if let Some((width, height)) = self.viewport_resize.poll(now_ms) {
            self.apply_viewport_size(width, height);
            applied = true;
        }
        applied
    }

    // ---- pointer input ----

    /// Trailing header edge of `manager` within the handle distance of `px`.
    fn edge_at(&self, manager: &AxisManager, px: f64) -> Option<u32> {
        let handle = self.options.resize_handle_px;
        let index = manager.index_at_viewport_pixel(px)?;
        let leading = manager.screen_position(index);
        if leading + manager.get_size(index) - px <= handle {
            return Some(index);
        }
        let previous = index.checked_sub(1)?;
        let previous_shown = manager.is_frozen(previous) || previous >= manager.start();
        (px - leading <= handle && previous_shown).then_some(previous)
    }

    pub fn hit_test(&self, x: f64, y: f64) -> PointerTarget {
        let (width, height) = (self.options.width, self.options.height);
        let row_track = self.row_scrollbar.geometry(&self.rows);
        let col_track = self.col_scrollbar.geometry(&self.cols);
        if x >= width - SCROLLBAR_THICKNESS && y >= row_track.track_start && y < height {
            return PointerTarget::Scrollbar(Axis::Row);
        }
        if y >= height - SCROLLBAR_THICKNESS && x >= col_track.track_start && x < width {
            return PointerTarget::Scrollbar(Axis::Col);
        }

        let in_col_header = y < self.rows.inset() && x >= self.cols.inset();
        let in_row_header = x < self.cols.inset() && y >= self.rows.inset();
        if in_col_header {
            return self.edge_at(&self.cols, x).map_or(PointerTarget::Nothing, |index| {
                PointerTarget::ResizeHandle {
                    axis: Axis::Col,
                    index,
                }
            });
        }
        if in_row_header {
            return self.edge_at(&self.rows, y).map_or(PointerTarget::Nothing, |index| {
                PointerTarget::ResizeHandle {
                    axis: Axis::Row,
                    index,
                }
            });
        }
        match crate::selector::cell_at(&self.rows, &self.cols, x, y) {
            Some((row, col)) => PointerTarget::Cell { row, col },
            None => PointerTarget::Nothing,
        }
    }

    /// Pointer pressed. Returns true if a redraw is needed.
    pub fn pointer_down(&mut self, x: f64, y: f64) -> bool {
        match self.hit_test(x, y) {
            PointerTarget::ResizeHandle { axis, index } => {
                let (anchor, current) = match axis {
                    Axis::Row => (y, self.rows.get_size(index)),
                    Axis::Col => (x, self.cols.get_size(index)),
                };
                self.resizer
                    .begin(axis, index, anchor, current, self.options.min_size);
                true
            }
            PointerTarget::Scrollbar(Axis::Row) => {
                self.row_scrollbar.pointer_down(&mut self.rows, y);
                self.dirty = true;
                true
            }
            PointerTarget::Scrollbar(Axis::Col) => {
                self.col_scrollbar.pointer_down(&mut self.cols, x);
                self.dirty = true;
                true
            }
            PointerTarget::Cell { .. } => {
                self.unmerged = None;
                self.selector
                    .pointer_down(self.active_sheet, x, y, &self.rows, &self.cols, &self.merger)
            }
            PointerTarget::Nothing => false,
        }
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        if let ResizeState::Dragging { axis, .. } = self.resizer.state() {
            let position = match axis {
                Axis::Row => y,
                Axis::Col => x,
            };
            return self.resizer.drag(position).is_some();
        }
        if self.row_scrollbar.is_dragging() {
            self.row_scrollbar.pointer_move(&mut self.rows, y);
            self.dirty = true;
            return true;
        }
        if self.col_scrollbar.is_dragging() {
            self.col_scrollbar.pointer_move(&mut self.cols, x);
            self.dirty = true;
            return true;
        }
        self.selector
            .pointer_move(x, y, &self.rows, &self.cols, &self.merger)
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> bool {
        if self.resizer.is_dragging() {
            self.pointer_move(x, y);
            if let Some(commit) = self.resizer.commit() {
                self.set_row_col_size(commit.axis, commit.index, commit.size);
            }
            return true;
        }
        if self.row_scrollbar.is_dragging() || self.col_scrollbar.is_dragging() {
            self.row_scrollbar.pointer_up();
            self.col_scrollbar.pointer_up();
            return true;
        }
        if !self.selector.is_selecting() {
            return false;
        }
        self.selector
            .pointer_up(x, y, &self.rows, &self.cols, &self.merger);
        true
    }

    /// Abandon whatever drag is in progress.
    pub fn pointer_cancel(&mut self) {
        self.resizer.cancel();
        self.row_scrollbar.pointer_up();
        self.col_scrollbar.pointer_up();
        self.selector.pointer_cancel();
    }

    /// Replace the selection programmatically.
    pub fn select(&mut self, range: RangeSimpleCellAddress) {
        self.unmerged = None;
        self.selector.select(range, &self.merger);
    }

    pub fn selection(&self) -> Option<RangeSimpleCellAddress> {
        self.selector.selection()
    }

    // ---- rendering ----

    fn render_pass<M: TextMeasurer + ?Sized>(&mut self, measurer: &mut M) -> Vec<AutoGrow> {
        let source = ViewportSource {
            sheet: self.active_sheet,
            data: self.store.data(),
            merger: &self.merger,
            engine: &self.engine,
            rows: &self.rows,
            cols: &self.cols,
        };
        self.cells.update(&source, measurer)
    }

    /// Reconcile cell visuals with the visible windows.
    ///
    /// Rows that need to grow for wrapped text are grown together in one
    /// undo step, followed by a single extra pass.
    pub fn update_viewport<M: TextMeasurer + ?Sized>(&mut self, measurer: &mut M) -> PassStats {
        let grows = self.render_pass(measurer);
        if self.apply_auto_grow(&grows) {
            let again = self.render_pass(measurer);
            if !again.is_empty() {
                log::debug!("{} rows still short after auto-grow", again.len());
            }
        }
        self.dirty = false;
        self.cells.stats()
    }

    fn apply_auto_grow(&mut self, grows: &[AutoGrow]) -> bool {
        let mut sizes: BTreeMap<u32, f64> = BTreeMap::new();
        for grow in grows {
            if grow.size > self.rows.get_size(grow.row) {
                let size = sizes.entry(grow.row).or_insert(grow.size);
                *size = size.max(grow.size);
            }
        }
        if sizes.is_empty() {
            return false;
        }
        let sheet = self.active_sheet;
        let mut entries: Vec<UndoEntry> = sizes
            .keys()
            .map(|row| UndoEntry::SetRowColSize {
                sheet,
                axis: Axis::Row,
                index: *row,
            })
            .collect();
        let entry = if entries.len() == 1 {
            entries.remove(0)
        } else {
            UndoEntry::Batch { entries }
        };
        log::debug!("auto-grow {} rows", sizes.len());
        self.transact([sheet], Recording::Entry(entry), |store, _| {
            for (row, size) in &sizes {
                store.set_row_col(Axis::Row, RowColAddress::new(sheet, *row), *size);
            }
        });
        true
    }

    /// Group translation of every pane present on the active sheet.
    pub fn pane_offsets(&self) -> Vec<(Pane, (f64, f64))> {
        Pane::ALL
            .into_iter()
            .filter(|pane| pane_clip(*pane, &self.rows, &self.cols).is_some())
            .map(|pane| (pane, pane_offset(pane, &self.rows, &self.cols)))
            .collect()
    }

    /// Bounding rectangles of the displayed selection, one per pane.
    pub fn selection_groups(&self) -> Vec<SelectionGroup> {
        self.selector
            .current()
            .map(|range| selection_groups(&range, &self.rows, &self.cols))
            .unwrap_or_default()
    }

    fn resize_guide(&self) -> Option<(Axis, f64)> {
        match self.resizer.state() {
            ResizeState::Dragging { axis, index, .. } => {
                let leading = self.axis(axis).screen_position(index);
                self.resizer.guide(leading)
            }
            ResizeState::Idle => None,
        }
    }

    pub fn render_frame(&self) -> RenderFrame<'_> {
        RenderFrame {
            options: &self.options,
            rows: &self.rows,
            cols: &self.cols,
            cells: &self.cells,
            selection: self.selector.overlay(&self.rows, &self.cols, &self.merger),
            resize_guide: self.resize_guide(),
            row_scrollbar: self.row_scrollbar.geometry(&self.rows),
            col_scrollbar: self.col_scrollbar.geometry(&self.cols),
        }
    }

    pub fn render<B: RenderBackend + ?Sized>(&self, backend: &mut B) -> Result<()> {
        backend.render(&self.render_frame())
    }

    // ---- snapshots ----

    pub fn to_json(&self) -> Result<String> {
        self.store.data().to_json()
    }

    /// Replace all grid data with a snapshot. History records are dropped
    /// and values are re-mirrored into the engine without undo entries.
    pub fn load_snapshot(&mut self, json: &str) -> Result<()> {
        let data = SpreadsheetData::from_json(json)?;
        self.load_data(data)
    }

    pub fn load_data(&mut self, data: SpreadsheetData) -> Result<()> {
        let sheet = first_sheet(&data)?;
        let stale: Vec<(SimpleCellAddress, Option<String>)> = self
            .store
            .data()
            .cells
            .iter()
            .filter(|(address, cell)| {
                cell.value.is_some() && data.cell(*address).and_then(|c| c.value.as_ref()).is_none()
            })
            .map(|(address, _)| (*address, None))
            .collect();
        if !stale.is_empty() {
            log::debug!("clearing {} values the snapshot does not hold", stale.len());
            self.write_unrecorded(&stale);
        }
        self.store = DataStore::from_data(data);
        self.history.clear();
        self.mirror_values();
        self.enter_sheet(sheet);
        self.refresh();
        Ok(())
    }
}

/// Row/col inserts in `entry` as `(sheet, axis, index, amount)`.
fn collect_inserts(entry: &UndoEntry, out: &mut Vec<(SheetId, Axis, u32, u32)>) {
    if let UndoEntry::Batch { entries } = entry {
        for entry in entries {
            collect_inserts(entry, out);
        }
    } else if let Some((sheet, axis, index, amount, true)) = entry.as_row_col_change() {
        out.push((sheet, axis, index, amount));
    }
}

fn first_sheet(data: &SpreadsheetData) -> Result<SheetId> {
    data.sheets
        .keys()
        .next()
        .copied()
        .ok_or_else(|| SheetGridError::Other("spreadsheet has no sheets".to_string()))
}
