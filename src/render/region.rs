//! Positioned regions and their style decorators.
//!
//! A region is an address plus its pixel rectangle. Selected, highlighted
//! and styled cells are the same region with decorators applied, not
//! separate cell types.

use serde::Serialize;

use crate::address::SimpleCellAddress;
use crate::types::{CellStyle, Rect};

/// Stroke drawn around a region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stroke {
    pub color: String,
    pub width: f64,
}

/// Visual attributes layered onto a region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decoration {
    pub fill: Option<String>,
    pub border: Option<Stroke>,
    pub opacity: f64,
    pub highlighted: bool,
}

impl Default for Decoration {
    fn default() -> Self {
        Self {
            fill: None,
            border: None,
            opacity: 1.0,
            highlighted: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PositionedRegion {
    pub address: SimpleCellAddress,
    pub rect: Rect,
    pub decoration: Decoration,
}

impl PositionedRegion {
    pub fn new(address: SimpleCellAddress, rect: Rect) -> Self {
        Self {
            address,
            rect,
            decoration: Decoration::default(),
        }
    }

    #[must_use]
    pub fn with_fill(mut self, color: impl Into<String>) -> Self {
        self.decoration.fill = Some(color.into());
        self
    }

    #[must_use]
    pub fn with_border(mut self, color: impl Into<String>, width: f64) -> Self {
        self.decoration.border = Some(Stroke {
            color: color.into(),
            width,
        });
        self
    }

    #[must_use]
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.decoration.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Mark as the active (anchor) cell.
    #[must_use]
    pub fn highlighted(mut self) -> Self {
        self.decoration.highlighted = true;
        self
    }

    /// Apply a cell's own fill and border colors.
    #[must_use]
    pub fn styled(self, style: Option<&CellStyle>) -> Self {
        let Some(style) = style else {
            return self;
        };
        let mut region = self;
        if let Some(fill) = &style.background_color {
            region = region.with_fill(fill.clone());
        }
        if let Some(border) = &style.border_color {
            region = region.with_border(border.clone(), 1.0);
        }
        region
    }

    /// Clear decorations, keeping the geometry.
    pub fn reset_decoration(&mut self) {
        self.decoration = Decoration::default();
    }
}
