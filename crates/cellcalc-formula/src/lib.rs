//! # cellcalc-formula
//!
//! Formula tokenizer, parser and evaluator for cellcalc.
//!
//! This crate provides:
//! - Tokenizing (formula text → tokens) and parsing (tokens → AST)
//! - Evaluation against a grid snapshot, with circular-reference detection
//! - Built-in functions with English names and French aliases
//! - Criteria matching for `COUNTIF`/`SUMIF`/`AVERAGEIF`
//! - Display formatting of computed values
//! - Dependency tracking for incremental recalculation
//!
//! ## Example
//!
//! ```rust
//! use cellcalc_core::{CellAddress, Grid};
//! use cellcalc_formula::compute_cell;
//!
//! let grid = Grid::from_rows(vec![
//!     vec!["cat", "3"],
//!     vec!["car", "4"],
//!     vec!["dog", "5"],
//!     vec!["=NB.SI(A1:A3;\"ca*\")", "=SOMME.SI(A1:A3,\"ca*\",B1:B3)"],
//! ]);
//!
//! assert_eq!(compute_cell(CellAddress::parse("A4").unwrap(), &grid), "2");
//! assert_eq!(compute_cell(CellAddress::parse("B4").unwrap(), &grid), "7");
//! ```

pub mod ast;
pub mod compute;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;

pub use ast::{BinaryOperator, FormulaExpr, UnaryOperator};
pub use compute::{
    compute_cell, compute_cell_with_options, compute_formula, compute_grid,
    compute_grid_with_options, evaluate_cell, format_number,
};
pub use dependency::{references, DependencyGraph};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{evaluate, function_registry, EvaluationContext, EvaluationOptions, FormulaValue};
pub use functions::criteria::CriteriaMatcher;
pub use parser::parse_formula;
