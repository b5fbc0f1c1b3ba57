//! Cell-related types and utilities
//!
//! This module contains:
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A range of cells (e.g., "A1:B10")
//! - [`CellContent`] - Classification of a raw cell string
//! - [`CellError`] - Display error codes

mod address;
mod value;

pub use address::{CellAddress, CellRange, CellRangeIterator};
pub use value::{parse_number, CellContent, CellError};
