//! `GridView`, the WASM-exported entry point.
//!
//! Wraps one [`Spreadsheet`] driven by a JS formula engine and paints it on a
//! canvas. The host forwards DOM input (pointer, wheel, resize) and calls
//! [`GridView::frame`] from `requestAnimationFrame`; throttled and debounced
//! input is flushed there.

use js_sys::Function;
use serde::Serialize;
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

use crate::address::{Axis, RangeSimpleCellAddress, SimpleCellAddress};
use crate::cell_ref::{cell_label, parse_address};
use crate::engine::JsFormulaEngine;
use crate::merger::MergeState;
use crate::options::GridOptions;
use crate::render::{CanvasRenderer, PassStats, RenderBackend};
use crate::spreadsheet::Spreadsheet;
use crate::types::CellStyle;

/// Current time in milliseconds from the page clock.
pub(crate) fn now_ms() -> f64 {
    if let Some(window) = web_sys::window() {
        if let Some(perf) = window.performance() {
            return perf.now();
        }
    }
    js_sys::Date::now()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FrameMetrics {
    update_ms: f64,
    draw_ms: f64,
    drawn: usize,
    live: usize,
    pool_capacity: usize,
    skipped: bool,
}

fn axis_from_str(axis: &str) -> Result<Axis, JsValue> {
    match axis {
        "row" | "rows" => Ok(Axis::Row),
        "col" | "cols" | "column" | "columns" => Ok(Axis::Col),
        other => Err(JsValue::from_str(&format!("unknown axis: {other}"))),
    }
}

#[wasm_bindgen]
pub struct GridView {
    sheet: Spreadsheet<JsFormulaEngine>,
    renderer: CanvasRenderer,
    render_callback: Option<Function>,
    needs_render: bool,
}

impl GridView {
    fn request_render(&mut self) {
        self.needs_render = true;
        if let Some(callback) = &self.render_callback {
            if let Err(e) = callback.call0(&JsValue::NULL) {
                log::warn!("render callback failed: {e:?}");
            }
        }
    }

    /// Ask for a frame if `changed`.
    fn after(&mut self, changed: bool) {
        if changed {
            self.request_render();
        }
    }

    fn parse(&self, reference: &str) -> Result<SimpleCellAddress, JsValue> {
        let address = parse_address(self.sheet.active_sheet(), reference)
            .ok_or_else(|| JsValue::from_str(&format!("bad cell reference: {reference}")))?;
        Ok(address)
    }

    fn parse_range(&self, from: &str, to: &str) -> Result<RangeSimpleCellAddress, JsValue> {
        Ok(RangeSimpleCellAddress::new(self.parse(from)?, self.parse(to)?))
    }
}

#[wasm_bindgen]
impl GridView {
    /// Create a grid on `canvas` backed by the JS `engine` object.
    /// `options` is a (possibly partial) `GridOptions` object or undefined.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas: HtmlCanvasElement, engine: JsValue, options: JsValue, dpr: f64) -> Result<GridView, JsValue> {
        console_error_panic_hook::set_once();
        let options: GridOptions = if options.is_undefined() || options.is_null() {
            GridOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)?
        };
        let mut renderer = CanvasRenderer::new(canvas)?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        renderer.resize(
            (options.width * dpr).round() as u32,
            (options.height * dpr).round() as u32,
            dpr,
        );
        renderer.set_canvas_css_size(options.width, options.height);
        let sheet = Spreadsheet::new(JsFormulaEngine::new(engine), options)?;
        Ok(GridView {
            sheet,
            renderer,
            render_callback: None,
            needs_render: true,
        })
    }

    /// Register a JS callback to request a render on the next animation frame.
    #[wasm_bindgen]
    pub fn set_render_callback(&mut self, callback: Option<Function>) {
        self.render_callback = callback;
    }

    /// Flush due input, update the viewport and draw. Skips the draw when
    /// nothing changed. Returns timing metrics.
    #[wasm_bindgen]
    pub fn frame(&mut self) -> Result<JsValue, JsValue> {
        let start = now_ms();
        let due = self.sheet.tick(start);
        if !(due || self.needs_render || self.sheet.is_dirty()) {
            let metrics = FrameMetrics {
                update_ms: 0.0,
                draw_ms: 0.0,
                drawn: 0,
                live: 0,
                pool_capacity: 0,
                skipped: true,
            };
            return Ok(serde_wasm_bindgen::to_value(&metrics)?);
        }
        let stats: PassStats = self.sheet.update_viewport(self.renderer.measurer());
        let updated = now_ms();
        self.sheet.render(&mut self.renderer)?;
        self.needs_render = false;
        let metrics = FrameMetrics {
            update_ms: updated - start,
            draw_ms: now_ms() - updated,
            drawn: stats.drawn,
            live: stats.live,
            pool_capacity: stats.capacity,
            skipped: false,
        };
        Ok(serde_wasm_bindgen::to_value(&metrics)?)
    }

    /// Resize the canvas (physical pixels). Layout follows once resizing
    /// settles.
    #[wasm_bindgen]
    pub fn resize(&mut self, physical_width: u32, physical_height: u32, dpr: f64) {
        let width = f64::from(physical_width) / dpr;
        let height = f64::from(physical_height) / dpr;
        self.renderer.resize(physical_width, physical_height, dpr);
        self.renderer.set_canvas_css_size(width, height);
        self.sheet.resize_viewport(width, height, now_ms());
        self.request_render();
    }

    // ---- input ----

    #[wasm_bindgen]
    pub fn wheel(&mut self, delta_x: f64, delta_y: f64) {
        self.sheet.wheel(delta_x, delta_y, now_ms());
        self.request_render();
    }

    /// Scroll `axis` ("row" or "col") to `fraction` of its extent.
    #[wasm_bindgen]
    pub fn scroll_to_fraction(&mut self, axis: &str, fraction: f64) -> Result<(), JsValue> {
        self.sheet
            .scroll_to_fraction(axis_from_str(axis)?, fraction, now_ms());
        self.request_render();
        Ok(())
    }

    #[wasm_bindgen]
    pub fn pointer_down(&mut self, x: f64, y: f64) {
        let changed = self.sheet.pointer_down(x, y);
        self.after(changed);
    }

    #[wasm_bindgen]
    pub fn pointer_move(&mut self, x: f64, y: f64) {
        let changed = self.sheet.pointer_move(x, y);
        self.after(changed);
    }

    #[wasm_bindgen]
    pub fn pointer_up(&mut self, x: f64, y: f64) {
        let changed = self.sheet.pointer_up(x, y);
        self.after(changed);
    }

    #[wasm_bindgen]
    pub fn pointer_cancel(&mut self) {
        self.sheet.pointer_cancel();
        self.request_render();
    }

    /// CSS cursor for the pointer position.
    #[wasm_bindgen]
    pub fn cursor_at(&self, x: f64, y: f64) -> String {
        use crate::spreadsheet::PointerTarget;
        match self.sheet.hit_test(x, y) {
            PointerTarget::ResizeHandle { axis: Axis::Col, .. } => "col-resize",
            PointerTarget::ResizeHandle { axis: Axis::Row, .. } => "row-resize",
            PointerTarget::Cell { .. } => "cell",
            PointerTarget::Scrollbar(_) | PointerTarget::Nothing => "default",
        }
        .to_string()
    }

    // ---- selection ----

    /// `[startRow, startCol, endRow, endCol]` of the selection.
    #[wasm_bindgen]
    pub fn get_selection(&self) -> Option<Vec<u32>> {
        self.sheet.selection().map(|range| {
            vec![
                range.top_left.row,
                range.top_left.col,
                range.bottom_right.row,
                range.bottom_right.col,
            ]
        })
    }

    /// Selection as an A1 range such as `B2:C4`.
    #[wasm_bindgen]
    pub fn selection_label(&self) -> Option<String> {
        self.sheet.selection().map(|range| {
            if range.is_single_cell() {
                cell_label(&range.top_left)
            } else {
                format!(
                    "{}:{}",
                    cell_label(&range.top_left),
                    cell_label(&range.bottom_right)
                )
            }
        })
    }

    #[wasm_bindgen]
    pub fn select(&mut self, from: &str, to: &str) -> Result<(), JsValue> {
        let range = self.parse_range(from, to)?;
        self.sheet.select(range);
        self.sheet.scroll_into_view(range.top_left);
        self.request_render();
        Ok(())
    }

    /// "none", "pending", "merged" or "unmerged" for the selection.
    #[wasm_bindgen]
    pub fn merge_state(&self) -> String {
        match self.sheet.selection_merge_state() {
            MergeState::None => "none",
            MergeState::Pending(_) => "pending",
            MergeState::Merged(_) => "merged",
            MergeState::Unmerged => "unmerged",
        }
        .to_string()
    }

    // ---- editing ----

    #[wasm_bindgen]
    pub fn set_cell_value(&mut self, reference: &str, value: Option<String>) -> Result<(), JsValue> {
        let address = self.parse(reference)?;
        self.sheet.set_cell_value(address, value.as_deref());
        self.request_render();
        Ok(())
    }

    #[wasm_bindgen]
    pub fn get_cell_value(&self, reference: &str) -> Result<Option<String>, JsValue> {
        Ok(self.sheet.cell_value(self.parse(reference)?))
    }

    /// Apply a partial `CellStyle` object to the selection.
    #[wasm_bindgen]
    pub fn set_selection_style(&mut self, style: JsValue) -> Result<(), JsValue> {
        let style: CellStyle = serde_wasm_bindgen::from_value(style)?;
        if let Some(range) = self.sheet.selection() {
            self.sheet.set_cell_style(range, &style);
            self.request_render();
        }
        Ok(())
    }

    #[wasm_bindgen]
    pub fn merge_selection(&mut self) -> Result<(), JsValue> {
        self.sheet.merge_selection()?;
        self.request_render();
        Ok(())
    }

    #[wasm_bindgen]
    pub fn unmerge_selection(&mut self) -> bool {
        let changed = self.sheet.unmerge_selection();
        self.after(changed);
        changed
    }

    /// Freeze up to and including `row` / `col`; negative or missing values
    /// leave that axis unfrozen.
    #[wasm_bindgen]
    pub fn freeze(&mut self, row: Option<i32>, col: Option<i32>) {
        self.sheet.freeze(row.map(i64::from), col.map(i64::from));
        self.request_render();
    }

    #[wasm_bindgen]
    pub fn insert_rows(&mut self, index: u32, amount: u32) -> Result<(), JsValue> {
        self.sheet.insert_rows(index, amount)?;
        self.request_render();
        Ok(())
    }

    #[wasm_bindgen]
    pub fn delete_rows(&mut self, index: u32, amount: u32) -> Result<(), JsValue> {
        self.sheet.delete_rows(index, amount)?;
        self.request_render();
        Ok(())
    }

    #[wasm_bindgen]
    pub fn insert_cols(&mut self, index: u32, amount: u32) -> Result<(), JsValue> {
        self.sheet.insert_cols(index, amount)?;
        self.request_render();
        Ok(())
    }

    #[wasm_bindgen]
    pub fn delete_cols(&mut self, index: u32, amount: u32) -> Result<(), JsValue> {
        self.sheet.delete_cols(index, amount)?;
        self.request_render();
        Ok(())
    }

    #[wasm_bindgen]
    pub fn undo(&mut self) -> Result<(), JsValue> {
        self.sheet.undo()?;
        self.request_render();
        Ok(())
    }

    #[wasm_bindgen]
    pub fn redo(&mut self) -> Result<(), JsValue> {
        self.sheet.redo()?;
        self.request_render();
        Ok(())
    }

    /// Pick up history events the engine raised on its own (e.g. an edit
    /// made through another UI bound to the same engine).
    #[wasm_bindgen]
    pub fn sync_engine(&mut self) -> bool {
        let changed = self.sheet.process_engine_events();
        self.after(changed);
        changed
    }

    // ---- sheets ----

    #[wasm_bindgen]
    pub fn add_sheet(&mut self, name: &str) -> Result<u32, JsValue> {
        let sheet = self.sheet.add_sheet(name)?;
        self.request_render();
        Ok(sheet)
    }

    #[wasm_bindgen]
    pub fn delete_sheet(&mut self, sheet: u32) -> Result<(), JsValue> {
        self.sheet.delete_sheet(sheet)?;
        self.request_render();
        Ok(())
    }

    #[wasm_bindgen]
    pub fn rename_sheet(&mut self, sheet: u32, name: &str) -> Result<(), JsValue> {
        self.sheet.rename_sheet(sheet, name)?;
        self.request_render();
        Ok(())
    }

    #[wasm_bindgen]
    pub fn set_active_sheet(&mut self, sheet: u32) -> Result<(), JsValue> {
        self.sheet.switch_sheet(sheet)?;
        self.request_render();
        Ok(())
    }

    #[wasm_bindgen]
    pub fn active_sheet(&self) -> u32 {
        self.sheet.active_sheet()
    }

    /// `[{ id, name }]` in id order.
    #[wasm_bindgen]
    pub fn sheets(&self) -> Result<JsValue, JsValue> {
        #[derive(Serialize)]
        struct SheetEntry {
            id: u32,
            name: String,
        }
        let sheets: Vec<SheetEntry> = self
            .sheet
            .sheets()
            .into_iter()
            .map(|(id, name)| SheetEntry { id, name })
            .collect();
        Ok(serde_wasm_bindgen::to_value(&sheets)?)
    }

    // ---- persistence ----

    #[wasm_bindgen]
    pub fn snapshot(&self) -> Result<String, JsValue> {
        Ok(self.sheet.to_json()?)
    }

    #[wasm_bindgen]
    pub fn load_snapshot(&mut self, json: &str) -> Result<(), JsValue> {
        self.sheet.load_snapshot(json)?;
        self.request_render();
        Ok(())
    }
}
