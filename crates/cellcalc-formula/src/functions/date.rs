//! Date/time functions
//!
//! Dates travel as text. `TODAY` and `NOW` produce ISO strings; `YEAR`, `MONTH` and
//! `DAY` read ISO dates, ISO date-times, `DD/MM/YYYY`, or a serial day number.
//!
//! Serial numbers use the 1900 date system, including its historical "1900 leap year"
//! bug: serial 60 is the non-existent 1900-02-29.

use super::FunctionArg;
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use cellcalc_core::{parse_number, CellError};
use chrono::{Datelike, Duration, NaiveDate};
use lazy_regex::regex_captures;

/// Format of `TODAY`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format of `NOW`
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Calendar parts of a 1900-system serial
fn date_from_serial(serial: i64) -> Option<(i32, u32, u32)> {
    if serial < 1 {
        return None;
    }
    // Serial 60 is the fictional 1900-02-29.
    if serial == 60 {
        return Some((1900, 2, 29));
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 31)?;
    let adjusted = if serial > 60 { serial - 1 } else { serial };
    let date = base.checked_add_signed(Duration::try_days(adjusted)?)?;
    Some((date.year(), date.month(), date.day()))
}

fn ymd(year: &str, month: &str, day: &str) -> Option<(i32, u32, u32)> {
    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)?;
    Some((date.year(), date.month(), date.day()))
}

/// Read a date out of text in one of the accepted shapes
fn parse_date_text(s: &str) -> Option<(i32, u32, u32)> {
    let s = s.trim();

    if let Some((_, y, m, d)) = regex_captures!(
        r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[T ]\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?)?$",
        s
    ) {
        return ymd(y, m, d);
    }

    if let Some((_, d, m, y)) = regex_captures!(r"^(\d{1,2})/(\d{1,2})/(\d{4})$", s) {
        return ymd(y, m, d);
    }

    parse_number(s).and_then(|n| date_from_serial(n.floor() as i64))
}

/// Calendar parts of the single date argument
fn date_arg(args: &[FunctionArg]) -> FormulaResult<(i32, u32, u32)> {
    let value = args.first().ok_or(CellError::Value)?.scalar()?;
    let parts = match value {
        FormulaValue::Number(n) => date_from_serial(n.floor() as i64),
        FormulaValue::Text(s) => parse_date_text(s),
    };
    parts.ok_or_else(|| CellError::Value.into())
}

/// TODAY() - current date as `YYYY-MM-DD`
pub fn fn_today(_args: &[FunctionArg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Text(ctx.now().format(DATE_FORMAT).to_string()))
}

/// NOW() - current date and time as `YYYY-MM-DD HH:MM:SS`
pub fn fn_now(_args: &[FunctionArg], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Text(ctx.now().format(DATETIME_FORMAT).to_string()))
}

/// YEAR(date)
pub fn fn_year(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (year, _, _) = date_arg(args)?;
    Ok(FormulaValue::Number(year as f64))
}

/// MONTH(date)
pub fn fn_month(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (_, month, _) = date_arg(args)?;
    Ok(FormulaValue::Number(month as f64))
}

/// DAY(date)
pub fn fn_day(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let (_, _, day) = date_arg(args)?;
    Ok(FormulaValue::Number(day as f64))
}
