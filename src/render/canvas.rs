//! Canvas 2D rendering backend.
//!
//! Draws a [`RenderFrame`] with the HTML Canvas 2D API via web-sys. Each
//! pane is clipped to its viewport rectangle and translated by its group
//! offset, so cell rectangles stay in sheet coordinates.

use std::collections::{HashMap, VecDeque};
use std::ops::RangeInclusive;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::measure::{wrap_lines, FontSpec, TextMeasurer, CELL_PADDING};
use super::{pane_clip, pane_offset, CellVisual, RenderBackend, RenderFrame, SelectionOverlay};
use crate::address::Axis;
use crate::cell_ref::col_to_letters;
use crate::error::Result;
use crate::layout::{AxisManager, ScrollbarGeometry, SCROLLBAR_THICKNESS};
use crate::options::GridOptions;
use crate::types::{HorizontalAlign, Pane, Rect, TextWrap, VerticalAlign};

const TEXT_MEASURE_CACHE_CAP: usize = 4096;
const HEADER_FONT: &str = "500 11px -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif";
const HEADER_SELECTED_BG: &str = "#D3E3FD";
const FROZEN_DIVIDER_COLOR: &str = "#BABABA";
const DEFAULT_TEXT_COLOR: &str = "#000000";
const CELL_BACKGROUND: &str = "#FFFFFF";
const SELECTION_TINT: &str = "rgba(26, 115, 232, 0.12)";
const SCROLLBAR_COLOR: &str = "rgba(0, 0, 0, 0.3)";

/// Panes in paint order; frozen panes land on top of the scrolling one.
const PAINT_ORDER: [Pane; 4] = [Pane::Main, Pane::FrozenCol, Pane::FrozenRow, Pane::FrozenCorner];

/// Crisp pixel position for 1px lines
fn crisp(x: f64) -> f64 {
    x.floor() + 0.5
}

struct TextMeasureCache {
    entries: HashMap<Rc<str>, f64>,
    order: VecDeque<Rc<str>>,
    max_entries: usize,
    scratch: String,
}

impl TextMeasureCache {
    fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
            scratch: String::new(),
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn get(&mut self, font: &str, text: &str) -> Option<f64> {
        let key = Self::build_key(&mut self.scratch, font, text);
        self.entries.get(key).copied()
    }

    fn insert(&mut self, font: &str, text: &str, width: f64) {
        let key = Self::build_key(&mut self.scratch, font, text);
        if self.entries.contains_key(key) {
            return;
        }
        let key_rc: Rc<str> = key.into();
        self.entries.insert(Rc::clone(&key_rc), width);
        self.order.push_back(key_rc);
        while self.entries.len() > self.max_entries {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    fn build_key<'a>(scratch: &'a mut String, font: &str, text: &str) -> &'a str {
        scratch.clear();
        scratch.reserve(font.len() + 1 + text.len());
        scratch.push_str(font);
        scratch.push('\n');
        scratch.push_str(text);
        scratch.as_str()
    }
}

/// [`TextMeasurer`] backed by `measureText` on the renderer's context.
pub struct CanvasTextMeasurer {
    ctx: CanvasRenderingContext2d,
    cache: TextMeasureCache,
}

impl TextMeasurer for CanvasTextMeasurer {
    fn text_width(&mut self, text: &str, font: &FontSpec) -> f64 {
        let css = font.css();
        if let Some(width) = self.cache.get(&css, text) {
            return width;
        }
        self.ctx.set_font(&css);
        let width = self
            .ctx
            .measure_text(text)
            .map(|m| m.width())
            .unwrap_or(0.0);
        self.cache.insert(&css, text, width);
        width
    }
}

pub struct CanvasRenderer {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    width: u32,
    height: u32,
    dpr: f64,
    measurer: CanvasTextMeasurer,
}

impl CanvasRenderer {
    /// Create a new Canvas renderer from an HtmlCanvasElement
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self> {
        let ctx = canvas
            .get_context("2d")
            .map_err(|_| "Failed to get 2d context")?
            .ok_or("No 2d context available")?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| "Failed to cast to CanvasRenderingContext2d")?;

        let width = canvas.width();
        let height = canvas.height();
        let measurer = CanvasTextMeasurer {
            ctx: ctx.clone(),
            cache: TextMeasureCache::new(TEXT_MEASURE_CACHE_CAP),
        };

        Ok(Self {
            canvas,
            ctx,
            width,
            height,
            dpr: 1.0,
            measurer,
        })
    }

    /// Measurer sharing this renderer's context, for auto-grow.
    pub fn measurer(&mut self) -> &mut CanvasTextMeasurer {
        &mut self.measurer
    }

    /// Set the CSS dimensions of the canvas element (logical pixels).
    pub fn set_canvas_css_size(&self, css_w: f64, css_h: f64) {
        let style = self.canvas.style();
        let _ = style.set_property("width", &format!("{css_w}px"));
        let _ = style.set_property("height", &format!("{css_h}px"));
    }
}

/// Indices a pane covers along one axis.
fn pane_indices(manager: &AxisManager, frozen: bool) -> Option<RangeInclusive<u32>> {
    if frozen {
        manager.frozen_range()
    } else {
        manager.scrolling_range()
    }
}

fn draw_grid_lines(ctx: &CanvasRenderingContext2d, frame: &RenderFrame<'_>, pane: Pane) {
    let (Some(rows), Some(cols)) = (
        pane_indices(frame.rows, pane.rows_frozen()),
        pane_indices(frame.cols, pane.cols_frozen()),
    ) else {
        return;
    };
    let x1 = frame.cols.get_axis(*cols.start());
    let x2 = frame.cols.get_axis(cols.end().saturating_add(1));
    let y1 = frame.rows.get_axis(*rows.start());
    let y2 = frame.rows.get_axis(rows.end().saturating_add(1));

    ctx.set_stroke_style_str(&frame.options.grid_line_color);
    ctx.set_line_width(1.0);
    ctx.begin_path();
    for row in rows {
        let y = crisp(frame.rows.get_axis(row.saturating_add(1)));
        ctx.move_to(x1, y);
        ctx.line_to(x2, y);
    }
    for col in cols {
        let x = crisp(frame.cols.get_axis(col.saturating_add(1)));
        ctx.move_to(x, y1);
        ctx.line_to(x, y2);
    }
    ctx.stroke();
}

fn draw_cell(ctx: &CanvasRenderingContext2d, measurer: &mut CanvasTextMeasurer, visual: &CellVisual) {
    let Rect {
        x,
        y,
        width,
        height,
    } = visual.region.rect;
    let decoration = &visual.region.decoration;

    // Inset by one pixel so the outer grid lines survive while the inner
    // lines of a merge are covered.
    let fill = decoration.fill.as_deref().unwrap_or(CELL_BACKGROUND);
    ctx.set_fill_style_str(fill);
    ctx.fill_rect(x + 1.0, y + 1.0, (width - 1.0).max(0.0), (height - 1.0).max(0.0));

    if let Some(text) = visual.text.as_deref().filter(|t| !t.is_empty()) {
        draw_cell_text(ctx, measurer, visual, text);
    }

    if let Some(border) = &decoration.border {
        ctx.set_stroke_style_str(&border.color);
        ctx.set_line_width(border.width);
        ctx.stroke_rect(crisp(x), crisp(y), width, height);
    }
}

fn draw_cell_text(
    ctx: &CanvasRenderingContext2d,
    measurer: &mut CanvasTextMeasurer,
    visual: &CellVisual,
    text: &str,
) {
    let rect = visual.region.rect;
    let style = visual.style.as_ref();
    let font = FontSpec::from_style(style);
    let inner_width = (rect.width - 2.0 * CELL_PADDING).max(1.0);

    let wraps = style.and_then(|s| s.text_wrap) == Some(TextWrap::Wrap);
    let lines = if wraps {
        wrap_lines(measurer, text, inner_width, &font)
    } else {
        vec![text.to_string()]
    };

    let numeric = text.trim().parse::<f64>().is_ok();
    let align = style
        .and_then(|s| s.horizontal_align)
        .unwrap_or(if numeric {
            HorizontalAlign::Right
        } else {
            HorizontalAlign::Left
        });
    let (text_x, text_align) = match align {
        HorizontalAlign::Left => (rect.x + CELL_PADDING, "left"),
        HorizontalAlign::Center => (rect.x + rect.width / 2.0, "center"),
        HorizontalAlign::Right => (rect.x + rect.width - CELL_PADDING, "right"),
    };

    let line_height = font.line_height();
    #[allow(clippy::cast_precision_loss)]
    let total = line_height * lines.len() as f64;
    let top = match style.and_then(|s| s.vertical_align).unwrap_or(VerticalAlign::Bottom) {
        VerticalAlign::Top => rect.y + CELL_PADDING,
        VerticalAlign::Middle => rect.y + (rect.height - total) / 2.0,
        VerticalAlign::Bottom => rect.y + rect.height - CELL_PADDING - total,
    };

    ctx.save();
    ctx.begin_path();
    ctx.rect(rect.x, rect.y, rect.width, rect.height);
    ctx.clip();

    ctx.set_font(&font.css());
    ctx.set_text_align(text_align);
    ctx.set_text_baseline("middle");
    let color = style
        .and_then(|s| s.font_color.as_deref())
        .unwrap_or(DEFAULT_TEXT_COLOR);
    ctx.set_fill_style_str(color);
    ctx.set_stroke_style_str(color);

    let underline = style.and_then(|s| s.underline).unwrap_or(false);
    let strike = style.and_then(|s| s.strikethrough).unwrap_or(false);

    let mut line_y = top + line_height / 2.0;
    for line in &lines {
        let _ = ctx.fill_text(line, text_x, line_y);
        if underline || strike {
            let line_width = measurer.text_width(line, &font);
            let start = match align {
                HorizontalAlign::Left => text_x,
                HorizontalAlign::Center => text_x - line_width / 2.0,
                HorizontalAlign::Right => text_x - line_width,
            };
            ctx.set_line_width(1.0);
            ctx.begin_path();
            if underline {
                let y = crisp(line_y + font.size / 2.0);
                ctx.move_to(start, y);
                ctx.line_to(start + line_width, y);
            }
            if strike {
                let y = crisp(line_y);
                ctx.move_to(start, y);
                ctx.line_to(start + line_width, y);
            }
            ctx.stroke();
        }
        line_y += line_height;
    }
    ctx.restore();
}

fn draw_selection(
    ctx: &CanvasRenderingContext2d,
    options: &GridOptions,
    overlay: &SelectionOverlay,
    rows: &AxisManager,
    cols: &AxisManager,
    pane: Pane,
) {
    ctx.save();
    ctx.set_global_alpha(overlay.opacity);

    for group in overlay.groups.iter().filter(|g| g.pane == pane) {
        let Rect {
            x,
            y,
            width,
            height,
        } = group.rect;
        ctx.set_fill_style_str(SELECTION_TINT);
        ctx.fill_rect(x, y, width, height);

        ctx.set_stroke_style_str(&options.selection_color);
        ctx.set_line_width(2.0);
        ctx.begin_path();
        if group.draw_top {
            ctx.move_to(x, y);
            ctx.line_to(x + width, y);
        }
        if group.draw_bottom {
            ctx.move_to(x, y + height);
            ctx.line_to(x + width, y + height);
        }
        if group.draw_left {
            ctx.move_to(x, y);
            ctx.line_to(x, y + height);
        }
        if group.draw_right {
            ctx.move_to(x + width, y);
            ctx.line_to(x + width, y + height);
        }
        ctx.stroke();
    }

    if let Some(active) = &overlay.active {
        let address = active.address;
        let active_pane = Pane::from_frozen(rows.is_frozen(address.row), cols.is_frozen(address.col));
        if active_pane == pane {
            let Rect {
                x,
                y,
                width,
                height,
            } = active.rect;
            ctx.set_stroke_style_str(&options.selection_color);
            ctx.set_line_width(2.0);
            ctx.stroke_rect(x + 1.0, y + 1.0, (width - 2.0).max(0.0), (height - 2.0).max(0.0));
        }
    }
    ctx.restore();
}

/// Index ranges of the selection along `axis`, for header highlighting.
fn selected_spans(frame: &RenderFrame<'_>, axis: Axis) -> Vec<(u32, u32)> {
    frame
        .selection
        .iter()
        .flat_map(|s| s.groups.iter())
        .map(|g| (g.range.start(axis), g.range.end(axis)))
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn draw_header_cell(
    ctx: &CanvasRenderingContext2d,
    options: &GridOptions,
    axis: Axis,
    thickness: f64,
    along: f64,
    length: f64,
    index: u32,
    selected: bool,
) {
    let (x, y, width, height) = match axis {
        Axis::Col => (along, 0.0, length, thickness),
        Axis::Row => (0.0, along, thickness, length),
    };
    if selected {
        ctx.set_fill_style_str(HEADER_SELECTED_BG);
        ctx.fill_rect(x, y, width, height);
    }

    ctx.set_stroke_style_str(&options.grid_line_color);
    ctx.set_line_width(1.0);
    ctx.begin_path();
    match axis {
        Axis::Col => {
            ctx.move_to(crisp(x + width), y);
            ctx.line_to(crisp(x + width), y + height);
        }
        Axis::Row => {
            ctx.move_to(x, crisp(y + height));
            ctx.line_to(x + width, crisp(y + height));
        }
    }
    ctx.stroke();

    let label = match axis {
        Axis::Col => col_to_letters(index),
        Axis::Row => (u64::from(index) + 1).to_string(),
    };
    ctx.set_fill_style_str(&options.header_text_color);
    let _ = ctx.fill_text(&label, x + width / 2.0, y + height / 2.0);
}

/// Row or column header band; scrolling headers first, frozen ones on top.
fn draw_header(ctx: &CanvasRenderingContext2d, frame: &RenderFrame<'_>, axis: Axis) {
    let (manager, thickness) = match axis {
        Axis::Col => (frame.cols, frame.options.col_header_height),
        Axis::Row => (frame.rows, frame.options.row_header_width),
    };
    if thickness <= 0.0 {
        return;
    }
    let place = |along: f64, length: f64| match axis {
        Axis::Col => (along, 0.0, length, thickness),
        Axis::Row => (0.0, along, thickness, length),
    };
    let selected = selected_spans(frame, axis);
    let is_selected = |index: u32| selected.iter().any(|(s, e)| (*s..=*e).contains(&index));

    let inset = manager.inset();
    let extent = manager.viewport_size();
    let frozen_end = inset + manager.frozen_size();

    let (x, y, w, h) = place(inset, (extent - inset).max(0.0));
    ctx.set_fill_style_str(&frame.options.header_background);
    ctx.fill_rect(x, y, w, h);

    ctx.set_font(HEADER_FONT);
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");

    ctx.save();
    ctx.begin_path();
    let (x, y, w, h) = place(frozen_end, (extent - frozen_end).max(0.0));
    ctx.rect(x, y, w, h);
    ctx.clip();
    for index in manager.scrolling_range().into_iter().flatten() {
        draw_header_cell(
            ctx,
            frame.options,
            axis,
            thickness,
            manager.screen_position(index),
            manager.get_size(index),
            index,
            is_selected(index),
        );
    }
    ctx.restore();

    if let Some(range) = manager.frozen_range() {
        for index in range {
            draw_header_cell(
                ctx,
                frame.options,
                axis,
                thickness,
                manager.get_axis(index),
                manager.get_size(index),
                index,
                is_selected(index),
            );
        }
    }

    ctx.set_stroke_style_str(&frame.options.grid_line_color);
    ctx.set_line_width(1.0);
    ctx.begin_path();
    match axis {
        Axis::Col => {
            ctx.move_to(inset, thickness - 0.5);
            ctx.line_to(extent, thickness - 0.5);
        }
        Axis::Row => {
            ctx.move_to(thickness - 0.5, inset);
            ctx.line_to(thickness - 0.5, extent);
        }
    }
    ctx.stroke();
}

fn draw_frozen_dividers(ctx: &CanvasRenderingContext2d, rows: &AxisManager, cols: &AxisManager) {
    let width = cols.viewport_size();
    let height = rows.viewport_size();

    ctx.save();
    ctx.set_stroke_style_str(FROZEN_DIVIDER_COLOR);
    ctx.set_line_width(1.0);
    ctx.begin_path();
    if rows.frozen().is_some() {
        let y = crisp(rows.inset() + rows.frozen_size());
        ctx.move_to(0.0, y);
        ctx.line_to(width, y);
    }
    if cols.frozen().is_some() {
        let x = crisp(cols.inset() + cols.frozen_size());
        ctx.move_to(x, 0.0);
        ctx.line_to(x, height);
    }
    ctx.stroke();
    ctx.restore();
}

fn draw_resize_guide(ctx: &CanvasRenderingContext2d, frame: &RenderFrame<'_>) {
    let Some((axis, position)) = frame.resize_guide else {
        return;
    };
    let p = crisp(position);
    ctx.set_stroke_style_str(&frame.options.selection_color);
    ctx.set_line_width(1.0);
    ctx.begin_path();
    match axis {
        Axis::Col => {
            ctx.move_to(p, 0.0);
            ctx.line_to(p, frame.rows.viewport_size());
        }
        Axis::Row => {
            ctx.move_to(0.0, p);
            ctx.line_to(frame.cols.viewport_size(), p);
        }
    }
    ctx.stroke();
}

fn draw_scrollbar(ctx: &CanvasRenderingContext2d, geometry: &ScrollbarGeometry, axis: Axis, across: f64) {
    if geometry.thumb_size <= 0.0 || geometry.thumb_size >= geometry.track_size {
        return;
    }
    let start = geometry.track_start + geometry.thumb_offset;
    ctx.set_fill_style_str(SCROLLBAR_COLOR);
    match axis {
        Axis::Row => ctx.fill_rect(across - SCROLLBAR_THICKNESS, start, SCROLLBAR_THICKNESS, geometry.thumb_size),
        Axis::Col => ctx.fill_rect(start, across - SCROLLBAR_THICKNESS, geometry.thumb_size, SCROLLBAR_THICKNESS),
    }
}

impl RenderBackend for CanvasRenderer {
    fn resize(&mut self, width: u32, height: u32, dpr: f64) {
        self.width = width;
        self.height = height;
        self.dpr = dpr;
        self.measurer.cache.clear();

        // Canvas buffer in physical pixels
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<()> {
        let ctx = &self.ctx;
        let measurer = &mut self.measurer;
        ctx.set_transform(self.dpr, 0.0, 0.0, self.dpr, 0.0, 0.0)
            .map_err(|_| "Failed to set canvas transform")?;

        let width = frame.cols.viewport_size();
        let height = frame.rows.viewport_size();
        ctx.set_fill_style_str(CELL_BACKGROUND);
        ctx.fill_rect(0.0, 0.0, width, height);

        for pane in PAINT_ORDER {
            let Some(clip) = pane_clip(pane, frame.rows, frame.cols) else {
                continue;
            };
            let (dx, dy) = pane_offset(pane, frame.rows, frame.cols);

            ctx.save();
            ctx.begin_path();
            ctx.rect(clip.x, clip.y, clip.width, clip.height);
            ctx.clip();
            let _ = ctx.translate(dx, dy);

            draw_grid_lines(ctx, frame, pane);
            for visual in frame.cells.visuals().filter(|v| v.visible && v.pane == pane) {
                draw_cell(ctx, measurer, visual);
            }
            if let Some(overlay) = &frame.selection {
                draw_selection(ctx, frame.options, overlay, frame.rows, frame.cols, pane);
            }
            ctx.restore();
        }

        draw_header(ctx, frame, Axis::Col);
        draw_header(ctx, frame, Axis::Row);
        ctx.set_fill_style_str(&frame.options.header_background);
        ctx.fill_rect(0.0, 0.0, frame.options.row_header_width, frame.options.col_header_height);

        draw_frozen_dividers(ctx, frame.rows, frame.cols);
        draw_resize_guide(ctx, frame);
        draw_scrollbar(ctx, &frame.row_scrollbar, Axis::Row, width);
        draw_scrollbar(ctx, &frame.col_scrollbar, Axis::Col, height);
        Ok(())
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::TextMeasureCache;

    #[test]
    fn text_measure_cache_evicts_oldest() {
        let mut cache = TextMeasureCache::new(2);
        cache.insert("11px Arial", "a", 1.0);
        cache.insert("11px Arial", "b", 2.0);
        cache.insert("11px Arial", "c", 3.0);
        assert!(cache.get("11px Arial", "a").is_none());
        assert_eq!(cache.get("11px Arial", "c"), Some(3.0));
    }
}
