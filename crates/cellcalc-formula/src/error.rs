//! Formula error types

use cellcalc_core::{CellAddress, CellError};
use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur during formula parsing or evaluation
///
/// Every variant maps onto one of the fixed display codes through [`FormulaError::code`];
/// the `Display` text carries the diagnostic detail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// A spreadsheet error code raised by an operator or function
    #[error("{0}")]
    Code(CellError),

    /// Circular reference through the given cell
    #[error("Circular reference detected at {0}")]
    CircularReference(CellAddress),

    /// Unknown function
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Formula parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Reference to an invalid cell or range
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Reference chain nested deeper than the configured limit
    #[error("Reference chain exceeds maximum depth of {0}")]
    DepthExceeded(usize),
}

impl FormulaError {
    /// The error code displayed for this error
    pub fn code(&self) -> CellError {
        match self {
            FormulaError::Code(e) => *e,
            FormulaError::CircularReference(_) => CellError::Circ,
            FormulaError::UnknownFunction(_) => CellError::Name,
            FormulaError::ArgumentCount { .. } => CellError::Value,
            FormulaError::Parse(_)
            | FormulaError::InvalidReference(_)
            | FormulaError::DepthExceeded(_) => CellError::Error,
        }
    }

    /// Check if this error is a circular reference
    pub fn is_circular(&self) -> bool {
        matches!(self, FormulaError::CircularReference(_))
    }
}

impl From<CellError> for FormulaError {
    fn from(e: CellError) -> Self {
        FormulaError::Code(e)
    }
}

impl From<cellcalc_core::Error> for FormulaError {
    fn from(e: cellcalc_core::Error) -> Self {
        FormulaError::InvalidReference(e.to_string())
    }
}
