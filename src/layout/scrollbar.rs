//! Scrollbar geometry and input for one axis.

use serde::Serialize;

use super::AxisManager;

/// Cross-axis thickness of a scrollbar, in CSS pixels.
pub const SCROLLBAR_THICKNESS: f64 = 8.0;

/// Pixel geometry of a scrollbar, along its own axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollbarGeometry {
    /// Track start, in viewport pixels (after headers and frozen pane)
    pub track_start: f64,
    pub track_size: f64,
    /// Thumb start relative to the track
    pub thumb_offset: f64,
    pub thumb_size: f64,
}

#[derive(Debug, Clone)]
pub struct Scrollbar {
    min_thumb: f64,
    /// Pointer offset inside the thumb while it is being dragged
    grab: Option<f64>,
}

impl Default for Scrollbar {
    fn default() -> Self {
        Self::new(20.0)
    }
}

impl Scrollbar {
    pub fn new(min_thumb: f64) -> Self {
        Self {
            min_thumb,
            grab: None,
        }
    }

    /// Thumb proportional to viewport / content, positioned by the current
    /// scroll fraction.
    pub fn geometry(&self, manager: &AxisManager) -> ScrollbarGeometry {
        let track_size = manager.scrollable_viewport();
        let content = (manager.get_total_size() - manager.frozen_size()).max(1.0);
        let thumb_size = if track_size <= 0.0 {
            0.0
        } else {
            (track_size * track_size / content).clamp(self.min_thumb.min(track_size), track_size)
        };
        ScrollbarGeometry {
            track_start: manager.inset() + manager.frozen_size(),
            track_size,
            thumb_offset: (track_size - thumb_size) * manager.scroll_fraction(),
            thumb_size,
        }
    }

    /// Scroll fraction for a pointer at `pointer` (viewport pixels) with the
    /// thumb held at `grab` pixels from its leading edge.
    fn fraction_for(geometry: &ScrollbarGeometry, pointer: f64, grab: f64) -> f64 {
        let free = geometry.track_size - geometry.thumb_size;
        if free <= 0.0 {
            return 0.0;
        }
        ((pointer - geometry.track_start - grab) / free).clamp(0.0, 1.0)
    }

    /// Pointer pressed on the track. Pressing the thumb starts a drag;
    /// pressing elsewhere jumps so the thumb centers on the pointer.
    /// Returns the pixel delta applied to the scrolling pane.
    pub fn pointer_down(&mut self, manager: &mut AxisManager, pointer: f64) -> f64 {
        let geometry = self.geometry(manager);
        let thumb_start = geometry.track_start + geometry.thumb_offset;
        if (thumb_start..=thumb_start + geometry.thumb_size).contains(&pointer) {
            self.grab = Some(pointer - thumb_start);
            return 0.0;
        }
        let fraction = Self::fraction_for(&geometry, pointer, geometry.thumb_size / 2.0);
        manager.scroll_to_fraction(fraction)
    }

    /// Thumb drag in progress. Returns the pixel delta, zero when idle.
    pub fn pointer_move(&mut self, manager: &mut AxisManager, pointer: f64) -> f64 {
        let Some(grab) = self.grab else {
            return 0.0;
        };
        let geometry = self.geometry(manager);
        manager.scroll_to_fraction(Self::fraction_for(&geometry, pointer, grab))
    }

    pub fn pointer_up(&mut self) {
        self.grab = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.grab.is_some()
    }

    /// Wheel input in pixels.
    pub fn wheel(manager: &mut AxisManager, delta: f64) -> f64 {
        manager.scroll_by_pixels(delta)
    }
}
