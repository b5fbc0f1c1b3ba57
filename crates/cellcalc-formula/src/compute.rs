//! Public compute API
//!
//! Turns a cell of a [`Grid`] into the string a grid view displays: literals pass
//! through verbatim, formulas are evaluated and formatted, and failures become their
//! error code.

use crate::error::FormulaResult;
use crate::evaluator::{number_to_text, EvaluationContext, EvaluationOptions, FormulaValue};
use cellcalc_core::{CellAddress, Grid};

/// Significant decimal digits kept when displaying a number
pub const DISPLAY_SIGNIFICANT_DIGITS: usize = 10;

/// Compute the display string of one cell with default options
///
/// # Example
/// ```rust
/// use cellcalc_core::{CellAddress, Grid};
/// use cellcalc_formula::compute_cell;
///
/// let grid = Grid::from_rows(vec![vec!["0.1", "0.2", "=A1+B1", "=1/0"]]);
/// assert_eq!(compute_cell(CellAddress::new(0, 0), &grid), "0.1");
/// assert_eq!(compute_cell(CellAddress::new(0, 2), &grid), "0.3");
/// assert_eq!(compute_cell(CellAddress::new(0, 3), &grid), "#DIV/0!");
/// ```
pub fn compute_cell(addr: CellAddress, grid: &Grid) -> String {
    compute_cell_with_options(addr, grid, &EvaluationOptions::default())
}

/// Compute the display string of one cell
///
/// Each call starts from an empty guard set; nothing is shared between calls.
pub fn compute_cell_with_options(
    addr: CellAddress,
    grid: &Grid,
    options: &EvaluationOptions,
) -> String {
    let raw = grid.raw(addr);
    if !raw.starts_with('=') {
        return raw.to_string();
    }

    match evaluate_cell(addr, grid, options) {
        Ok(value) => value.display(),
        Err(e) => {
            tracing::debug!(cell = %addr, error = %e, "formula evaluation failed");
            e.code().as_str().to_string()
        }
    }
}

/// Evaluate one cell to a typed value
pub fn evaluate_cell(
    addr: CellAddress,
    grid: &Grid,
    options: &EvaluationOptions,
) -> FormulaResult<FormulaValue> {
    let ctx = EvaluationContext::new(grid, *options);
    ctx.eval_cell(addr)
}

/// Compute a formula that lives outside the grid, e.g. typed at a prompt
///
/// A leading `=` is optional. Errors are rendered as their code.
pub fn compute_formula(formula: &str, grid: &Grid, options: &EvaluationOptions) -> String {
    let body = formula.strip_prefix('=').unwrap_or(formula);
    let ctx = EvaluationContext::new(grid, *options);
    match ctx.evaluate_formula(body) {
        Ok(value) => value.display(),
        Err(e) => {
            tracing::debug!(formula, error = %e, "formula evaluation failed");
            e.code().as_str().to_string()
        }
    }
}

/// Compute the display string of every cell in the grid's used rectangle
pub fn compute_grid(grid: &Grid) -> Vec<Vec<String>> {
    compute_grid_with_options(grid, &EvaluationOptions::default())
}

/// Compute the display string of every cell with explicit options
pub fn compute_grid_with_options(grid: &Grid, options: &EvaluationOptions) -> Vec<Vec<String>> {
    let rows = grid.row_count();
    let cols = grid.col_count();
    tracing::debug!(rows, cols, "computing grid");

    (0..rows)
        .map(|row| {
            (0..cols)
                .map(|col| compute_cell_with_options(CellAddress::new(row, col), grid, options))
                .collect()
        })
        .collect()
}

/// Format a number for display
///
/// Rounds to [`DISPLAY_SIGNIFICANT_DIGITS`] significant digits, then prints the
/// shortest form: `0.1+0.2` shows as `0.3` and integers have no decimal point.
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return number_to_text(n);
    }

    let rounded = format!("{:.*e}", DISPLAY_SIGNIFICANT_DIGITS - 1, n)
        .parse::<f64>()
        .unwrap_or(n);
    number_to_text(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(label: &str) -> CellAddress {
        CellAddress::parse(label).unwrap()
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(7.0), "7");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.0 / 3.0), "0.3333333333");
        assert_eq!(format_number(2.0 / 3.0), "0.6666666667");
        assert_eq!(format_number(123456789012.0), "123456789000");
        assert_eq!(format_number(-1.5), "-1.5");
        assert_eq!(format_number(1e-12), "1e-12");
        assert_eq!(format_number(1e21), "1e+21");
    }

    #[test]
    fn test_literals_pass_through() {
        let grid = Grid::from_rows(vec![vec!["007", " 1.50 ", "hello", ""]]);
        assert_eq!(compute_cell(at("A1"), &grid), "007");
        assert_eq!(compute_cell(at("B1"), &grid), " 1.50 ");
        assert_eq!(compute_cell(at("C1"), &grid), "hello");
        assert_eq!(compute_cell(at("D1"), &grid), "");
        assert_eq!(compute_cell(at("Z100"), &grid), "");
    }

    #[test]
    fn test_formulas_and_errors() {
        let grid = Grid::from_rows(vec![
            vec!["=B1", "=A1", "=5/0", "=SQRT(-1)"],
            vec!["=1+2*3", "=FOO(1)", "=A0", "=(1+"],
        ]);
        assert_eq!(compute_cell(at("A1"), &grid), "#CIRC!");
        assert_eq!(compute_cell(at("B1"), &grid), "#CIRC!");
        assert_eq!(compute_cell(at("C1"), &grid), "#DIV/0!");
        assert_eq!(compute_cell(at("D1"), &grid), "#NUM!");
        assert_eq!(compute_cell(at("A2"), &grid), "7");
        assert_eq!(compute_cell(at("B2"), &grid), "#NAME?");
        assert_eq!(compute_cell(at("C2"), &grid), "#ERROR!");
        assert_eq!(compute_cell(at("D2"), &grid), "#ERROR!");
    }

    #[test]
    fn test_compute_is_idempotent() {
        let grid = Grid::from_rows(vec![vec!["2", "=A1^10/3"]]);
        let first = compute_cell(at("B1"), &grid);
        let second = compute_cell(at("B1"), &grid);
        assert_eq!(first, second);
        assert_eq!(first, "341.3333333");
    }

    #[test]
    fn test_compute_formula() {
        let grid = Grid::from_rows(vec![vec!["4", "5"]]);
        let options = EvaluationOptions::default();
        assert_eq!(compute_formula("=A1*B1", &grid, &options), "20");
        assert_eq!(compute_formula("SUM(A1:B1)", &grid, &options), "9");
        assert_eq!(compute_formula("=1/0", &grid, &options), "#DIV/0!");
    }

    #[test]
    fn test_compute_grid() {
        let grid = Grid::from_rows(vec![vec!["1", "=A1+1"], vec!["=SUM(A1:B1)"]]);
        assert_eq!(
            compute_grid(&grid),
            vec![
                vec!["1".to_string(), "2".to_string()],
                vec!["3".to_string(), "".to_string()],
            ]
        );
    }
}
