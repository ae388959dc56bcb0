//! Row/column resize drag.
//!
//! `Idle → Dragging` when a header edge is pressed, back to `Idle` on commit
//! or cancel. The dragged size never goes below the axis minimum.

use crate::address::Axis;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeState {
    Idle,
    Dragging {
        axis: Axis,
        /// Index being resized; fixed for the whole drag
        index: u32,
        /// Pointer position (along `axis`) where the drag began
        anchor: f64,
        /// Size of `index` when the drag began
        original: f64,
        /// Current clamped size
        size: f64,
        min_size: f64,
    },
}

/// A committed resize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeCommit {
    pub axis: Axis,
    pub index: u32,
    pub size: f64,
}

#[derive(Debug, Clone)]
pub struct Resizer {
    state: ResizeState,
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Resizer {
    pub fn new() -> Self {
        Self {
            state: ResizeState::Idle,
        }
    }

    pub fn state(&self) -> ResizeState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, ResizeState::Dragging { .. })
    }

    pub fn begin(&mut self, axis: Axis, index: u32, anchor: f64, current_size: f64, min_size: f64) {
        self.state = ResizeState::Dragging {
            axis,
            index,
            anchor,
            original: current_size,
            size: current_size.max(min_size),
            min_size,
        };
    }

    /// Pointer moved to `position`; returns the new clamped size.
    pub fn drag(&mut self, position: f64) -> Option<f64> {
        match &mut self.state {
            ResizeState::Dragging {
                anchor,
                original,
                size,
                min_size,
                ..
            } => {
                *size = (*original + position - *anchor).max(*min_size);
                Some(*size)
            }
            ResizeState::Idle => None,
        }
    }

    /// Guide line position for a drag in progress: the leading edge of the
    /// resized index plus the current size.
    pub fn guide(&self, leading_edge: f64) -> Option<(Axis, f64)> {
        match self.state {
            ResizeState::Dragging { axis, size, .. } => Some((axis, leading_edge + size)),
            ResizeState::Idle => None,
        }
    }

    /// Finish the drag. `None` if idle or the size did not change.
    pub fn commit(&mut self) -> Option<ResizeCommit> {
        let state = std::mem::replace(&mut self.state, ResizeState::Idle);
        match state {
            ResizeState::Dragging {
                axis,
                index,
                original,
                size,
                ..
            } if (size - original).abs() > f64::EPSILON => Some(ResizeCommit { axis, index, size }),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.state = ResizeState::Idle;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn drag_then_commit() {
        let mut resizer = Resizer::new();
        resizer.begin(Axis::Col, 3, 400.0, 100.0, 10.0);
        assert_eq!(resizer.drag(450.0), Some(150.0));
        assert_eq!(resizer.guide(300.0), Some((Axis::Col, 450.0)));
        assert_eq!(
            resizer.commit(),
            Some(ResizeCommit {
                axis: Axis::Col,
                index: 3,
                size: 150.0
            })
        );
        assert!(!resizer.is_dragging());
    }

    #[test]
    fn drag_clamps_to_minimum() {
        let mut resizer = Resizer::new();
        resizer.begin(Axis::Row, 0, 100.0, 25.0, 10.0);
        assert_eq!(resizer.drag(0.0), Some(10.0));
        assert_eq!(resizer.commit().map(|c| c.size), Some(10.0));
    }

    #[test]
    fn cancel_and_no_op_drags_commit_nothing() {
        let mut resizer = Resizer::new();
        resizer.begin(Axis::Row, 0, 100.0, 25.0, 10.0);
        resizer.drag(140.0);
        resizer.cancel();
        assert_eq!(resizer.commit(), None);

        resizer.begin(Axis::Row, 0, 100.0, 25.0, 10.0);
        resizer.drag(100.0);
        assert_eq!(resizer.commit(), None);
        assert_eq!(resizer.drag(120.0), None);
    }
}
