//! # cellcalc
//!
//! A spreadsheet formula engine.
//!
//! cellcalc turns a grid of raw cell strings into the strings a grid view displays:
//! literals pass through untouched, formulas (cells starting with `=`) are evaluated
//! and formatted, and failures show as error codes such as `#DIV/0!` or `#CIRC!`.
//!
//! ## Features
//!
//! - Arithmetic, comparison and `&` concatenation with spreadsheet precedence
//! - Cell references (`A1`, `$B$2`) and ranges (`A1:C3`)
//! - Built-in functions with English names and French aliases (`SOMME.SI`, `MOYENNE`, ...)
//! - Criteria matching with comparisons and `*`/`?` wildcards
//! - Circular-reference detection and a bounded reference-chain depth
//! - Incremental recalculation driven by a dependency graph
//!
//! ## Example
//!
//! ```rust
//! use cellcalc::prelude::*;
//!
//! let grid = Grid::from_rows(vec![
//!     vec!["10", "=A1*2"],
//!     vec!["=SUM(A1:B1)", "=A2/0"],
//! ]);
//!
//! assert_eq!(compute_cell(CellAddress::parse("A2").unwrap(), &grid), "30");
//! assert_eq!(compute_cell(CellAddress::parse("B2").unwrap(), &grid), "#DIV/0!");
//!
//! // Keep display values up to date while editing
//! let mut sheet = Sheet::new(grid, CalculationOptions::default());
//! sheet.set_cell("A1", "1").unwrap();
//! assert_eq!(sheet.display(CellAddress::parse("A2").unwrap()), "3");
//! ```

pub mod calculation;
pub mod prelude;

// Re-export calculation types
pub use calculation::{CalculationOptions, CalculationStats, Sheet};

// Re-export core types
pub use cellcalc_core::{
    parse_number, CellAddress, CellContent, CellError, CellRange, Error, Grid, Result, MAX_COLS,
    MAX_ROWS,
};

// Re-export formula types
pub use cellcalc_formula::{
    compute_cell, compute_cell_with_options, compute_formula, compute_grid,
    compute_grid_with_options, evaluate, evaluate_cell, format_number, function_registry,
    parse_formula, references, CriteriaMatcher, DependencyGraph, EvaluationContext,
    EvaluationOptions, FormulaError, FormulaExpr, FormulaResult, FormulaValue,
};
