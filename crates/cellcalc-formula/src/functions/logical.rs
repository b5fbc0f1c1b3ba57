//! Logical functions
//!
//! `IF` and `IFERROR` receive their argument expressions unevaluated so that only
//! the branch that is taken gets computed.

use super::FunctionArg;
use crate::ast::FormulaExpr;
use crate::error::FormulaResult;
use crate::evaluator::{evaluate, EvaluationContext, FormulaValue};
use cellcalc_core::CellError;

/// IF(condition, if_true, [if_false])
///
/// A missing `if_false` yields FALSE (0).
pub fn fn_if(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let condition = args.first().ok_or(CellError::Value)?;

    if evaluate(condition, ctx)?.is_truthy()? {
        match args.get(1) {
            Some(branch) => evaluate(branch, ctx),
            None => Ok(FormulaValue::from(true)),
        }
    } else {
        match args.get(2) {
            Some(branch) => evaluate(branch, ctx),
            None => Ok(FormulaValue::from(false)),
        }
    }
}

/// IFERROR(value, value_if_error)
///
/// Circular references are not caught: they describe the grid, not the value.
pub fn fn_iferror(args: &[FormulaExpr], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (value, fallback) = match args {
        [value, fallback] => (value, fallback),
        _ => return Err(CellError::Value.into()),
    };

    match evaluate(value, ctx) {
        Ok(v) => Ok(v),
        Err(e) if e.is_circular() => Err(e),
        Err(e) => {
            tracing::trace!(error = %e, "IFERROR replaced an error");
            evaluate(fallback, ctx)
        }
    }
}

/// Logical readings of the arguments; blanks and non-logical text are skipped
fn logical_values(args: &[FunctionArg]) -> FormulaResult<Vec<bool>> {
    let values: Vec<bool> = args
        .iter()
        .flat_map(FunctionArg::values)
        .filter(|v| !v.is_empty())
        .filter_map(|v| v.is_truthy().ok())
        .collect();

    if values.is_empty() {
        return Err(CellError::Value.into());
    }
    Ok(values)
}

/// AND function
pub fn fn_and(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let all = logical_values(args)?.into_iter().all(|b| b);
    Ok(FormulaValue::from(all))
}

/// OR function
pub fn fn_or(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let any = logical_values(args)?.into_iter().any(|b| b);
    Ok(FormulaValue::from(any))
}

/// NOT function
pub fn fn_not(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = args.first().ok_or(CellError::Value)?.scalar()?;
    Ok(FormulaValue::from(!value.is_truthy()?))
}
