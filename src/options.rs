//! Grid configuration.
//!
//! Hosts pass a partial JSON object; every absent field takes its default.

use serde::{Deserialize, Serialize};

use crate::address::Axis;
use crate::error::{Result, SheetGridError};

/// Options for one spreadsheet instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridOptions {
    /// Row height used when a row has no override
    pub row_size: f64,
    /// Column width used when a column has no override
    pub col_size: f64,
    /// Smallest size a resize drag may produce
    pub min_size: f64,
    /// Number of addressable rows
    pub row_count: u32,
    /// Number of addressable columns
    pub col_count: u32,
    /// Width of the row header strip; the column axis starts after it
    pub row_header_width: f64,
    /// Height of the column header strip; the row axis starts after it
    pub col_header_height: f64,
    /// Canvas width in CSS pixels
    pub width: f64,
    /// Canvas height in CSS pixels
    pub height: f64,
    /// Minimum interval between processed scroll events
    pub scroll_throttle_ms: f64,
    /// Quiet period before a viewport resize is applied
    pub resize_debounce_ms: f64,
    /// Selection opacity while a drag is in progress
    pub selection_drag_opacity: f64,
    /// Pointer distance from a header edge that starts a resize
    pub resize_handle_px: f64,
    /// Header background color
    pub header_background: String,
    /// Header label color
    pub header_text_color: String,
    /// Grid line color
    pub grid_line_color: String,
    /// Selection border and fill color
    pub selection_color: String,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            row_size: 25.0,
            col_size: 100.0,
            min_size: 10.0,
            row_count: 1000,
            col_count: 26,
            row_header_width: 40.0,
            col_header_height: 25.0,
            width: 800.0,
            height: 600.0,
            scroll_throttle_ms: 16.0,
            resize_debounce_ms: 150.0,
            selection_drag_opacity: 0.5,
            resize_handle_px: 4.0,
            header_background: "#F3F3F3".to_string(),
            header_text_color: "#595959".to_string(),
            grid_line_color: "#E2E2E2".to_string(),
            selection_color: "#1A73E8".to_string(),
        }
    }
}

impl GridOptions {
    /// Parse and validate a (possibly partial) JSON options object.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("rowSize", self.row_size),
            ("colSize", self.col_size),
            ("minSize", self.min_size),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SheetGridError::Config(format!("{name} must be positive")));
            }
        }
        if self.min_size > self.row_size || self.min_size > self.col_size {
            return Err(SheetGridError::Config(
                "minSize must not exceed the default sizes".to_string(),
            ));
        }
        if self.row_count == 0 || self.col_count == 0 {
            return Err(SheetGridError::Config(
                "rowCount and colCount must be at least 1".to_string(),
            ));
        }
        if self.row_header_width < 0.0 || self.col_header_height < 0.0 {
            return Err(SheetGridError::Config(
                "header sizes must not be negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.selection_drag_opacity) {
            return Err(SheetGridError::Config(
                "selectionDragOpacity must be within 0..=1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn default_size(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Row => self.row_size,
            Axis::Col => self.col_size,
        }
    }

    pub fn count(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Row => self.row_count,
            Axis::Col => self.col_count,
        }
    }

    /// Fixed offset before index 0 on `axis`: the header strip across it.
    pub fn inset(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Row => self.col_header_height,
            Axis::Col => self.row_header_width,
        }
    }

    /// Canvas extent along `axis`.
    pub fn viewport_size(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Row => self.height,
            Axis::Col => self.width,
        }
    }
}
