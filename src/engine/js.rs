//! Adapter over a JavaScript formula engine object.
//!
//! The object is expected to expose camelCase methods mirroring
//! [`FormulaEngine`]: `setCellContents(sheet, row, col, contents)`,
//! `getCellValue(sheet, row, col)`, `beginBatch()`, `endBatch()`,
//! `addSheet(name)`, `removeSheet(sheet)`, `renameSheet(sheet, name)`,
//! `addRows` / `removeRows` / `addColumns` / `removeColumns(sheet, index, amount)`,
//! `moveCells(source, destination)`, `pushUndoEntry(entry)`,
//! `suspendUndoRecording()`, `resumeUndoRecording()`, `undo()`, `redo()` and
//! `drainHistoryEvents()` returning an array of `{ id, direction, entry }`.

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};

use super::{EngineError, FormulaEngine, HistoryEvent, UndoEntry};
use crate::address::{RangeSimpleCellAddress, SheetId, SimpleCellAddress};

pub struct JsFormulaEngine {
    inner: JsValue,
}

fn js_message(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| {
            Reflect::get(err, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{err:?}"))
}

impl JsFormulaEngine {
    pub fn new(inner: JsValue) -> Self {
        Self { inner }
    }

    fn call(&self, method: &str, args: &[JsValue]) -> Result<JsValue, EngineError> {
        let function = Reflect::get(&self.inner, &JsValue::from_str(method))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or_else(|| EngineError::Rejected(format!("engine has no method {method}")))?;
        let array: Array = args.iter().collect();
        function
            .apply(&self.inner, &array)
            .map_err(|e| EngineError::Rejected(js_message(&e)))
    }

    /// Fire-and-forget call for methods with no meaningful failure.
    fn notify(&self, method: &str) {
        if let Err(e) = self.call(method, &[]) {
            log::warn!("{method} failed: {e}");
        }
    }

    fn call_lines(
        &self,
        method: &str,
        sheet: SheetId,
        index: u32,
        amount: u32,
    ) -> Result<(), EngineError> {
        self.call(method, &[sheet.into(), index.into(), amount.into()])
            .map(|_| ())
    }

    fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, EngineError> {
        serde_wasm_bindgen::to_value(value).map_err(|e| EngineError::Rejected(e.to_string()))
    }
}

fn display_value(value: &JsValue) -> Option<String> {
    if value.is_null() || value.is_undefined() {
        return None;
    }
    if let Some(s) = value.as_string() {
        return Some(s);
    }
    if let Some(n) = value.as_f64() {
        return Some(n.to_string());
    }
    if let Some(b) = value.as_bool() {
        return Some(if b { "TRUE" } else { "FALSE" }.to_string());
    }
    Some(js_message(value))
}

impl FormulaEngine for JsFormulaEngine {
    fn set_cell_contents(
        &mut self,
        address: SimpleCellAddress,
        contents: Option<&str>,
    ) -> Result<(), EngineError> {
        let contents = contents.map_or(JsValue::NULL, JsValue::from_str);
        self.call(
            "setCellContents",
            &[
                address.sheet.into(),
                address.row.into(),
                address.col.into(),
                contents,
            ],
        )
        .map(|_| ())
    }

    fn get_cell_value(&self, address: SimpleCellAddress) -> Option<String> {
        self.call(
            "getCellValue",
            &[address.sheet.into(), address.row.into(), address.col.into()],
        )
        .ok()
        .as_ref()
        .and_then(display_value)
    }

    fn begin_batch(&mut self) {
        self.notify("beginBatch");
    }

    fn end_batch(&mut self) {
        self.notify("endBatch");
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn add_sheet(&mut self, name: &str) -> Result<SheetId, EngineError> {
        let id = self.call("addSheet", &[JsValue::from_str(name)])?;
        id.as_f64()
            .map(|n| n as SheetId)
            .ok_or_else(|| EngineError::Rejected("addSheet returned no sheet id".to_string()))
    }

    fn remove_sheet(&mut self, sheet: SheetId) -> Result<(), EngineError> {
        self.call("removeSheet", &[sheet.into()]).map(|_| ())
    }

    fn rename_sheet(&mut self, sheet: SheetId, name: &str) -> Result<(), EngineError> {
        self.call("renameSheet", &[sheet.into(), JsValue::from_str(name)])
            .map(|_| ())
    }

    fn add_rows(&mut self, sheet: SheetId, index: u32, amount: u32) -> Result<(), EngineError> {
        self.call_lines("addRows", sheet, index, amount)
    }

    fn remove_rows(&mut self, sheet: SheetId, index: u32, amount: u32) -> Result<(), EngineError> {
        self.call_lines("removeRows", sheet, index, amount)
    }

    fn add_columns(&mut self, sheet: SheetId, index: u32, amount: u32) -> Result<(), EngineError> {
        self.call_lines("addColumns", sheet, index, amount)
    }

    fn remove_columns(
        &mut self,
        sheet: SheetId,
        index: u32,
        amount: u32,
    ) -> Result<(), EngineError> {
        self.call_lines("removeColumns", sheet, index, amount)
    }

    fn move_cells(
        &mut self,
        source: RangeSimpleCellAddress,
        destination: SimpleCellAddress,
    ) -> Result<(), EngineError> {
        let source = Self::to_js(&source)?;
        let destination = Self::to_js(&destination)?;
        self.call("moveCells", &[source, destination]).map(|_| ())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn push_undo_entry(&mut self, entry: UndoEntry) -> u64 {
        let id = Self::to_js(&entry).and_then(|js| self.call("pushUndoEntry", &[js]));
        match id {
            Ok(id) => id.as_f64().map_or(0, |n| n as u64),
            Err(e) => {
                log::warn!("pushUndoEntry failed: {e}");
                0
            }
        }
    }

    fn suspend_undo_recording(&mut self) {
        self.notify("suspendUndoRecording");
    }

    fn resume_undo_recording(&mut self) {
        self.notify("resumeUndoRecording");
    }

    fn undo(&mut self) -> Result<(), EngineError> {
        self.call("undo", &[]).map(|_| ())
    }

    fn redo(&mut self) -> Result<(), EngineError> {
        self.call("redo", &[]).map(|_| ())
    }

    fn drain_history_events(&mut self) -> Vec<HistoryEvent> {
        let events = match self.call("drainHistoryEvents", &[]) {
            Ok(events) => events,
            Err(e) => {
                log::warn!("drainHistoryEvents failed: {e}");
                return Vec::new();
            }
        };
        serde_wasm_bindgen::from_value(events).unwrap_or_else(|e| {
            log::warn!("malformed history events: {e}");
            Vec::new()
        })
    }
}
