//! Statistical functions

use super::{numbers, FunctionArg};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use cellcalc_core::CellError;

/// MEDIAN function
pub fn fn_median(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut values = numbers(args);
    if values.is_empty() {
        return Err(CellError::Num.into());
    }

    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    let median = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };

    Ok(FormulaValue::Number(median))
}

/// STDEV function - sample standard deviation
pub fn fn_stdev(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let values = numbers(args);
    if values.len() < 2 {
        return Err(CellError::Div0.into());
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sum_sq: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();

    Ok(FormulaValue::Number((sum_sq / (n - 1.0)).sqrt()))
}
