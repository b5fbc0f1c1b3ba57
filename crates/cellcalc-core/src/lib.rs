//! # cellcalc-core
//!
//! Core data structures for the cellcalc formula engine.
//!
//! This crate provides the fundamental types used throughout cellcalc:
//! - [`Grid`] - A rectangular snapshot of raw cell strings
//! - [`CellAddress`] and [`CellRange`] - Cell addressing and ranges
//! - [`CellContent`] - How a raw cell string is interpreted (formula, number, text)
//! - [`CellError`] - The fixed set of error codes a cell can display
//!
//! ## Example
//!
//! ```rust
//! use cellcalc_core::{CellAddress, CellContent, Grid};
//!
//! let grid = Grid::from_rows(vec![vec!["10", "=A1*2"], vec!["hello"]]);
//!
//! let addr = CellAddress::parse("B1").unwrap();
//! assert_eq!(grid.raw(addr), "=A1*2");
//! assert_eq!(CellContent::classify(grid.raw(addr)), CellContent::Formula("A1*2"));
//!
//! // Missing cells read as empty
//! assert_eq!(grid.raw_at(1, 1), "");
//! ```

pub mod cell;
pub mod error;
pub mod grid;

// Re-exports for convenience
pub use cell::{parse_number, CellAddress, CellContent, CellError, CellRange, CellRangeIterator};
pub use error::{Error, Result};
pub use grid::Grid;

/// Maximum number of rows addressable by a reference
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns addressable by a reference
pub const MAX_COLS: u16 = 16_384;
