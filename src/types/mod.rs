//! Data types for the grid model.

mod cell;
mod data;
mod selection;
mod sheet;

pub use cell::*;
pub use data::*;
pub use selection::*;
pub use sheet::*;
