//! Prelude module - common imports for cellcalc users
//!
//! ```rust
//! use cellcalc::prelude::*;
//! ```

pub use crate::{
    // Calculation types
    CalculationOptions,
    CalculationStats,
    // Cell addressing
    CellAddress,
    CellError,
    CellRange,
    // Compute API
    compute_cell,
    compute_grid,
    // Error types
    Error,
    EvaluationOptions,
    FormulaValue,
    Grid,
    Result,
    Sheet,
};
