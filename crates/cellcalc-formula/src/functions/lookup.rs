//! Lookup functions
//!
//! These receive their range arguments with shape intact.

use super::{number_arg, optional_number_arg, FunctionArg};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use cellcalc_core::CellError;
use std::cmp::Ordering;

/// Lookup equality: numeric when both sides are numbers, otherwise case-insensitive text
fn values_equal(a: &FormulaValue, b: &FormulaValue) -> bool {
    match (a.as_numeric(), b.as_numeric()) {
        (Some(x), Some(y)) => x == y,
        (None, None) => a.as_text().to_lowercase() == b.as_text().to_lowercase(),
        _ => false,
    }
}

/// Lookup ordering; numbers and text never compare with each other
fn compare(a: &FormulaValue, b: &FormulaValue) -> Option<Ordering> {
    match (a.as_numeric(), b.as_numeric()) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        (None, None) if !a.is_empty() && !b.is_empty() => {
            Some(a.as_text().to_lowercase().cmp(&b.as_text().to_lowercase()))
        }
        _ => None,
    }
}

/// A 1-based position argument converted to a 0-based index
fn position_arg(args: &[FunctionArg], idx: usize, default: f64) -> FormulaResult<usize> {
    let n = optional_number_arg(args, idx, default)?.trunc();
    if n < 1.0 {
        return Err(CellError::Value.into());
    }
    Ok(n as usize - 1)
}

fn lookup_value(args: &[FunctionArg]) -> FormulaResult<&FormulaValue> {
    args.first().ok_or(CellError::Value)?.scalar()
}

/// Position of `target` in `candidates` according to a MATCH type
///
/// - `0`: first exact match
/// - `1`: last entry <= target, candidates sorted ascending
/// - `-1`: last entry >= target, candidates sorted descending
fn find_position<'a>(
    target: &FormulaValue,
    candidates: impl Iterator<Item = &'a FormulaValue>,
    match_type: i32,
) -> Option<usize> {
    if match_type == 0 {
        return candidates
            .enumerate()
            .find(|(_, v)| values_equal(target, v))
            .map(|(i, _)| i);
    }

    // Sorted order is assumed, so the scan stops at the first entry past the target
    let past = if match_type > 0 {
        Ordering::Greater
    } else {
        Ordering::Less
    };

    let mut found = None;
    for (i, v) in candidates.enumerate() {
        match compare(v, target) {
            Some(ord) if ord == past => break,
            Some(_) => found = Some(i),
            None => {}
        }
    }
    found
}

/// VLOOKUP(lookup_value, table_array, col_index_num, [range_lookup])
///
/// `range_lookup` defaults to TRUE (approximate match on a sorted first column).
pub fn fn_vlookup(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let target = lookup_value(args)?;
    let table = args.get(1).ok_or(CellError::Value)?;
    let (rows, cols) = table.shape();

    let col = position_arg(args, 2, 1.0)?;
    if col >= cols {
        return Err(CellError::Error.into());
    }

    let approximate = match args.get(3) {
        Some(arg) => arg.scalar()?.is_truthy()?,
        None => true,
    };

    let keys = (0..rows).filter_map(|row| table.get(row, 0));
    let row = find_position(target, keys, if approximate { 1 } else { 0 })
        .ok_or(CellError::Na)?;

    Ok(table.get(row, col).cloned().unwrap_or_else(FormulaValue::empty))
}

/// INDEX(array, row_num, [column_num])
///
/// On a single-row array a lone position counts columns.
pub fn fn_index(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let array = args.first().ok_or(CellError::Value)?;
    let (rows, _) = array.shape();

    let (row, col) = if args.len() < 3 && rows == 1 {
        (0, position_arg(args, 1, 1.0)?)
    } else {
        (position_arg(args, 1, 1.0)?, position_arg(args, 2, 1.0)?)
    };

    array
        .get(row, col)
        .cloned()
        .ok_or_else(|| CellError::Error.into())
}

/// MATCH(lookup_value, lookup_array, [match_type])
///
/// The lookup array must be a single row or column. `match_type` defaults to 1.
pub fn fn_match(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let target = lookup_value(args)?;
    let array = args.get(1).ok_or(CellError::Value)?;
    let (rows, cols) = array.shape();
    if rows != 1 && cols != 1 {
        return Err(CellError::Na.into());
    }

    let match_type = match args.get(2) {
        Some(_) => {
            let n = number_arg(args, 2)?;
            if n > 0.0 {
                1
            } else if n < 0.0 {
                -1
            } else {
                0
            }
        }
        None => 1,
    };

    find_position(target, array.values().iter(), match_type)
        .map(|i| FormulaValue::Number((i + 1) as f64))
        .ok_or_else(|| CellError::Na.into())
}
