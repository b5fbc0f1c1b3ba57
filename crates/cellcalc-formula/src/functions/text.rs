//! Text functions
//!
//! Positions and lengths count characters, not bytes, and are 1-based like the
//! rest of the formula language.

use super::{all_values, number_arg, optional_number_arg, text_arg, FunctionArg};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use cellcalc_core::{parse_number, CellError};

/// Longest text REPT will build
const MAX_TEXT_LEN: usize = 32_767;

/// A count argument: truncated, never negative
fn count_arg(args: &[FunctionArg], idx: usize, default: f64) -> FormulaResult<usize> {
    let n = optional_number_arg(args, idx, default)?.trunc();
    if n < 0.0 {
        return Err(CellError::Value.into());
    }
    Ok(n as usize)
}

/// LEN function
pub fn fn_len(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let text = text_arg(args, 0)?;
    Ok(FormulaValue::Number(text.chars().count() as f64))
}

/// LEFT(text, [num_chars])
pub fn fn_left(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let text = text_arg(args, 0)?;
    let n = count_arg(args, 1, 1.0)?;
    Ok(FormulaValue::Text(text.chars().take(n).collect()))
}

/// RIGHT(text, [num_chars])
pub fn fn_right(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let text = text_arg(args, 0)?;
    let n = count_arg(args, 1, 1.0)?;
    let len = text.chars().count();
    Ok(FormulaValue::Text(
        text.chars().skip(len.saturating_sub(n)).collect(),
    ))
}

/// MID(text, start, num_chars)
pub fn fn_mid(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let text = text_arg(args, 0)?;
    let start = number_arg(args, 1)?.trunc();
    if start < 1.0 {
        return Err(CellError::Value.into());
    }
    let n = count_arg(args, 2, 0.0)?;

    Ok(FormulaValue::Text(
        text.chars().skip(start as usize - 1).take(n).collect(),
    ))
}

/// UPPER function
pub fn fn_upper(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Text(text_arg(args, 0)?.to_uppercase()))
}

/// LOWER function
pub fn fn_lower(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Text(text_arg(args, 0)?.to_lowercase()))
}

/// TRIM function - strips the ends and collapses inner runs of spaces
pub fn fn_trim(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let text = text_arg(args, 0)?;
    let trimmed = text.split(' ').filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");
    Ok(FormulaValue::Text(trimmed))
}

/// CONCATENATE function
pub fn fn_concatenate(
    args: &[FunctionArg],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let text: String = all_values(args).map(FormulaValue::as_text).collect();
    Ok(FormulaValue::Text(text))
}

/// SUBSTITUTE(text, old_text, new_text, [instance_num])
pub fn fn_substitute(
    args: &[FunctionArg],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let text = text_arg(args, 0)?;
    let old = text_arg(args, 1)?;
    let new = text_arg(args, 2)?;

    if old.is_empty() {
        return Ok(FormulaValue::Text(text));
    }

    if args.len() < 4 {
        return Ok(FormulaValue::Text(text.replace(&old, &new)));
    }

    let instance = number_arg(args, 3)?.trunc();
    if instance < 1.0 {
        return Err(CellError::Value.into());
    }

    // Replace only the nth occurrence
    let result = match text.match_indices(&old).nth(instance as usize - 1) {
        Some((pos, _)) => {
            let mut result = String::with_capacity(text.len());
            result.push_str(&text[..pos]);
            result.push_str(&new);
            result.push_str(&text[pos + old.len()..]);
            result
        }
        None => text,
    };
    Ok(FormulaValue::Text(result))
}

/// TEXT(value, [format])
///
/// The format argument is accepted and ignored; the value is returned as text.
pub fn fn_text(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Text(text_arg(args, 0)?))
}

/// VALUE function
pub fn fn_value(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match args.first().ok_or(CellError::Value)?.scalar()? {
        FormulaValue::Number(n) => Ok(FormulaValue::Number(*n)),
        FormulaValue::Text(s) => parse_number(s)
            .map(FormulaValue::Number)
            .ok_or_else(|| CellError::Value.into()),
    }
}

/// 1-based character position of `needle` in `haystack`, searching from `start`
fn position(haystack: &str, needle: &str, start: f64) -> FormulaResult<FormulaValue> {
    let haystack: Vec<char> = haystack.chars().collect();
    let needle: Vec<char> = needle.chars().collect();

    let start = start.trunc();
    if start < 1.0 || start as usize > haystack.len() + 1 {
        return Err(CellError::Value.into());
    }
    let from = start as usize - 1;

    if needle.is_empty() {
        return Ok(FormulaValue::Number(start));
    }

    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle.as_slice())
        .map(|i| FormulaValue::Number((from + i + 1) as f64))
        .ok_or_else(|| CellError::Value.into())
}

/// FIND(find_text, within_text, [start_num]) - case-sensitive
pub fn fn_find(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let needle = text_arg(args, 0)?;
    let haystack = text_arg(args, 1)?;
    let start = optional_number_arg(args, 2, 1.0)?;
    position(&haystack, &needle, start)
}

/// SEARCH(find_text, within_text, [start_num]) - case-insensitive
pub fn fn_search(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let needle = text_arg(args, 0)?.to_lowercase();
    let haystack = text_arg(args, 1)?.to_lowercase();
    let start = optional_number_arg(args, 2, 1.0)?;
    position(&haystack, &needle, start)
}

/// REPT(text, number_times)
pub fn fn_rept(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let text = text_arg(args, 0)?;
    let times = count_arg(args, 1, 0.0)?;

    if text.chars().count().saturating_mul(times) > MAX_TEXT_LEN {
        return Err(CellError::Value.into());
    }
    Ok(FormulaValue::Text(text.repeat(times)))
}
