//! Math functions

use super::{all_values, number_arg, numbers, optional_number_arg, FunctionArg};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use cellcalc_core::CellError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// SUM function
pub fn fn_sum(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(numbers(args).iter().sum()))
}

/// AVERAGE function
pub fn fn_average(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let values = numbers(args);
    if values.is_empty() {
        return Err(CellError::Div0.into());
    }
    Ok(FormulaValue::Number(
        values.iter().sum::<f64>() / values.len() as f64,
    ))
}

/// MIN function (0 when there is nothing numeric)
pub fn fn_min(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let min = numbers(args).into_iter().reduce(f64::min).unwrap_or(0.0);
    Ok(FormulaValue::Number(min))
}

/// MAX function (0 when there is nothing numeric)
pub fn fn_max(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let max = numbers(args).into_iter().reduce(f64::max).unwrap_or(0.0);
    Ok(FormulaValue::Number(max))
}

/// COUNT function - counts numeric values
pub fn fn_count(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(numbers(args).len() as f64))
}

/// COUNTA function - counts non-empty values
pub fn fn_counta(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = all_values(args).filter(|v| !v.is_empty()).count();
    Ok(FormulaValue::Number(count as f64))
}

/// PRODUCT function (0 when there is nothing numeric)
pub fn fn_product(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let values = numbers(args);
    if values.is_empty() {
        return Ok(FormulaValue::Number(0.0));
    }
    Ok(FormulaValue::Number(values.iter().product()))
}

/// ABS function
pub fn fn_abs(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(number_arg(args, 0)?.abs()))
}

/// SQRT function
pub fn fn_sqrt(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = number_arg(args, 0)?;
    if n < 0.0 {
        return Err(CellError::Num.into());
    }
    Ok(FormulaValue::Number(n.sqrt()))
}

/// POWER function
pub fn fn_power(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let base = number_arg(args, 0)?;
    let exponent = number_arg(args, 1)?;
    Ok(FormulaValue::Number(base.powf(exponent)))
}

/// MOD function - the result takes the sign of the divisor
pub fn fn_mod(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let number = number_arg(args, 0)?;
    let divisor = number_arg(args, 1)?;
    if divisor == 0.0 {
        return Err(CellError::Div0.into());
    }
    Ok(FormulaValue::Number(number - divisor * (number / divisor).floor()))
}

/// INT function - rounds down to the nearest integer
pub fn fn_int(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(number_arg(args, 0)?.floor()))
}

/// SIGN function
pub fn fn_sign(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = number_arg(args, 0)?;
    let sign = if n > 0.0 {
        1.0
    } else if n < 0.0 {
        -1.0
    } else {
        0.0
    };
    Ok(FormulaValue::Number(sign))
}

/// Round `n` to `digits` decimal places (negative digits round left of the point)
///
/// Goes through the decimal representation when possible so that `ROUND(2.675, 2)`
/// sees the digits the user typed rather than the nearest binary fraction.
fn round_with(n: f64, digits: i32, strategy: RoundingStrategy) -> f64 {
    if digits >= 0 {
        if let Ok(decimal) = Decimal::from_str(&n.to_string()) {
            if let Some(rounded) = decimal
                .round_dp_with_strategy(digits as u32, strategy)
                .to_f64()
            {
                return rounded;
            }
        }
    }

    let apply = |x: f64| match strategy {
        RoundingStrategy::AwayFromZero => {
            if x >= 0.0 {
                x.ceil()
            } else {
                x.floor()
            }
        }
        RoundingStrategy::ToZero => x.trunc(),
        // f64::round is half away from zero
        _ => x.round(),
    };

    if digits >= 0 {
        // Out of decimal range
        let factor = 10_f64.powi(digits.min(308));
        apply(n * factor) / factor
    } else {
        let factor = 10_f64.powi((-digits).min(308));
        apply(n / factor) * factor
    }
}

fn round_function(args: &[FunctionArg], strategy: RoundingStrategy) -> FormulaResult<FormulaValue> {
    let number = number_arg(args, 0)?;
    let digits = optional_number_arg(args, 1, 0.0)?.trunc();
    let digits = digits.clamp(i32::MIN as f64, i32::MAX as f64) as i32;
    Ok(FormulaValue::Number(round_with(number, digits, strategy)))
}

/// ROUND function - half away from zero
pub fn fn_round(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    round_function(args, RoundingStrategy::MidpointAwayFromZero)
}

/// ROUNDUP function - away from zero
pub fn fn_roundup(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    round_function(args, RoundingStrategy::AwayFromZero)
}

/// ROUNDDOWN function - toward zero
pub fn fn_rounddown(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    round_function(args, RoundingStrategy::ToZero)
}

/// CEILING(number, [significance]) - rounds up to a multiple of significance
pub fn fn_ceiling(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let number = number_arg(args, 0)?;
    let significance = optional_number_arg(args, 1, 1.0)?;

    if significance == 0.0 {
        return Ok(FormulaValue::Number(0.0));
    }
    if number > 0.0 && significance < 0.0 {
        return Err(CellError::Num.into());
    }

    Ok(FormulaValue::Number(
        (number / significance).ceil() * significance,
    ))
}

/// FLOOR(number, [significance]) - rounds down to a multiple of significance
pub fn fn_floor(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let number = number_arg(args, 0)?;
    let significance = optional_number_arg(args, 1, 1.0)?;

    if significance == 0.0 {
        return Err(CellError::Div0.into());
    }
    if number > 0.0 && significance < 0.0 {
        return Err(CellError::Num.into());
    }

    Ok(FormulaValue::Number(
        (number / significance).floor() * significance,
    ))
}

/// LOG(number, [base]) - base 10 by default
pub fn fn_log(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let number = number_arg(args, 0)?;
    let base = optional_number_arg(args, 1, 10.0)?;

    if number <= 0.0 || base <= 0.0 {
        return Err(CellError::Num.into());
    }
    if base == 1.0 {
        return Err(CellError::Div0.into());
    }

    let log = if base == 10.0 {
        number.log10()
    } else if base == 2.0 {
        number.log2()
    } else {
        number.log(base)
    };
    Ok(FormulaValue::Number(log))
}

/// LN function
pub fn fn_ln(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let number = number_arg(args, 0)?;
    if number <= 0.0 {
        return Err(CellError::Num.into());
    }
    Ok(FormulaValue::Number(number.ln()))
}

/// EXP function
pub fn fn_exp(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(number_arg(args, 0)?.exp()))
}

/// PI function
pub fn fn_pi(_args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(std::f64::consts::PI))
}

/// RAND function - uniform in [0, 1)
pub fn fn_rand(_args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    Ok(FormulaValue::Number(rng.gen::<f64>()))
}

/// RANDBETWEEN(bottom, top) - random integer in the inclusive range
pub fn fn_randbetween(
    args: &[FunctionArg],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    use rand::Rng;

    let bottom = number_arg(args, 0)?.ceil();
    let top = number_arg(args, 1)?.floor();
    if bottom > top {
        return Err(CellError::Num.into());
    }

    let mut rng = rand::thread_rng();
    let n = rng.gen_range(bottom as i64..=top as i64);
    Ok(FormulaValue::Number(n as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvaluationOptions;
    use cellcalc_core::Grid;

    fn eval(formula: &str) -> FormulaResult<FormulaValue> {
        eval_in(&Grid::new(), formula)
    }

    fn eval_in(grid: &Grid, formula: &str) -> FormulaResult<FormulaValue> {
        EvaluationContext::new(grid, EvaluationOptions::default()).evaluate_formula(formula)
    }

    fn number(formula: &str) -> f64 {
        match eval(formula) {
            Ok(FormulaValue::Number(n)) => n,
            other => panic!("{} evaluated to {:?}", formula, other),
        }
    }

    fn code(formula: &str) -> CellError {
        eval(formula).unwrap_err().code()
    }

    #[test]
    fn test_aggregates_over_ranges() {
        let grid = Grid::from_rows(vec![
            vec!["1", "2", "text"],
            vec!["3", "", "=A1+A2"],
        ]);
        assert_eq!(eval_in(&grid, "SUM(A1:C2)").unwrap(), FormulaValue::Number(10.0));
        assert_eq!(eval_in(&grid, "SUM(A1:A2,10)").unwrap(), FormulaValue::Number(14.0));
        assert_eq!(eval_in(&grid, "AVERAGE(A1:C2)").unwrap(), FormulaValue::Number(2.5));
        assert_eq!(eval_in(&grid, "MOYENNE(A1:B1)").unwrap(), FormulaValue::Number(1.5));
        assert_eq!(eval_in(&grid, "MIN(A1:C2)").unwrap(), FormulaValue::Number(1.0));
        assert_eq!(eval_in(&grid, "MAX(A1:C2)").unwrap(), FormulaValue::Number(4.0));
        assert_eq!(eval_in(&grid, "COUNT(A1:C2)").unwrap(), FormulaValue::Number(4.0));
        assert_eq!(eval_in(&grid, "COUNTA(A1:C2)").unwrap(), FormulaValue::Number(5.0));
        assert_eq!(eval_in(&grid, "PRODUCT(A1:C2)").unwrap(), FormulaValue::Number(24.0));
    }

    #[test]
    fn test_aggregates_of_nothing() {
        let grid = Grid::from_rows(vec![vec!["", "x"]]);
        assert_eq!(eval_in(&grid, "SUM(A1:B1)").unwrap(), FormulaValue::Number(0.0));
        assert_eq!(eval_in(&grid, "MIN(A1:B1)").unwrap(), FormulaValue::Number(0.0));
        assert_eq!(eval_in(&grid, "MAX(A1:B1)").unwrap(), FormulaValue::Number(0.0));
        assert_eq!(eval_in(&grid, "PRODUCT(A1:B1)").unwrap(), FormulaValue::Number(0.0));
        assert_eq!(
            eval_in(&grid, "AVERAGE(A1:B1)").unwrap_err().code(),
            CellError::Div0
        );
    }

    #[test]
    fn test_sum_counts_numeric_text_arguments() {
        assert_eq!(number("SUM(1,\"2\",\"x\")"), 3.0);
    }

    #[test]
    fn test_abs_sqrt_power() {
        assert_eq!(number("ABS(-5)"), 5.0);
        assert_eq!(number("SQRT(16)"), 4.0);
        assert_eq!(number("RACINE(2.25)"), 1.5);
        assert_eq!(code("SQRT(-1)"), CellError::Num);
        assert_eq!(number("POWER(2,10)"), 1024.0);
        assert_eq!(number("PUISSANCE(9,0.5)"), 3.0);
        assert_eq!(code("POWER(0,-1)"), CellError::Num);
        assert_eq!(code("ABS(\"abc\")"), CellError::Value);
    }

    #[test]
    fn test_mod() {
        assert_eq!(number("MOD(10,3)"), 1.0);
        assert_eq!(number("MOD(-10,3)"), 2.0);
        assert_eq!(number("MOD(10,-3)"), -2.0);
        assert_eq!(code("MOD(1,0)"), CellError::Div0);
    }

    #[test]
    fn test_int_sign() {
        assert_eq!(number("INT(3.7)"), 3.0);
        assert_eq!(number("ENT(-3.2)"), -4.0);
        assert_eq!(number("SIGN(-0.5)"), -1.0);
        assert_eq!(number("SIGN(0)"), 0.0);
        assert_eq!(number("SIGNE(12)"), 1.0);
    }

    #[test]
    fn test_round() {
        assert_eq!(number("ROUND(2.5)"), 3.0);
        assert_eq!(number("ROUND(-2.5)"), -3.0);
        assert_eq!(number("ROUND(3.14159,2)"), 3.14);
        assert_eq!(number("ROUND(2.675,2)"), 2.68);
        assert_eq!(number("ARRONDI(1234.5,-2)"), 1200.0);
        assert_eq!(number("ROUND(1250,-2)"), 1300.0);
    }

    #[test]
    fn test_roundup_rounddown() {
        assert_eq!(number("ROUNDUP(3.141,2)"), 3.15);
        assert_eq!(number("ROUNDUP(-3.141,2)"), -3.15);
        assert_eq!(number("ARRONDI.SUP(1201,-2)"), 1300.0);
        assert_eq!(number("ROUNDDOWN(3.149,2)"), 3.14);
        assert_eq!(number("ROUNDDOWN(-3.149,2)"), -3.14);
        assert_eq!(number("ARRONDI.INF(1299,-2)"), 1200.0);
    }

    #[test]
    fn test_ceiling_floor() {
        assert_eq!(number("CEILING(2.1)"), 3.0);
        assert_eq!(number("PLAFOND(7,5)"), 10.0);
        assert_eq!(number("CEILING(-2.5,1)"), -2.0);
        assert_eq!(number("CEILING(5,0)"), 0.0);
        assert_eq!(code("CEILING(5,-1)"), CellError::Num);

        assert_eq!(number("FLOOR(2.9)"), 2.0);
        assert_eq!(number("PLANCHER(7,5)"), 5.0);
        assert_eq!(code("FLOOR(5,0)"), CellError::Div0);
    }

    #[test]
    fn test_logarithms() {
        assert_eq!(number("LOG(1000)"), 3.0);
        assert_eq!(number("LOG(8,2)"), 3.0);
        assert_eq!(number("LN(1)"), 0.0);
        assert_eq!(number("EXP(0)"), 1.0);
        assert_eq!(code("LOG(0)"), CellError::Num);
        assert_eq!(code("LOG(10,1)"), CellError::Div0);
        assert_eq!(code("LN(-1)"), CellError::Num);
        assert!((number("PI()") - std::f64::consts::PI).abs() < 1e-15);
    }

    #[test]
    fn test_random() {
        for _ in 0..50 {
            let r = number("RAND()");
            assert!((0.0..1.0).contains(&r));

            let n = number("ALEA.ENTRE.BORNES(1,6)");
            assert!((1.0..=6.0).contains(&n));
            assert_eq!(n.fract(), 0.0);
        }
        assert_eq!(number("RANDBETWEEN(4,4)"), 4.0);
        assert_eq!(code("RANDBETWEEN(5,1)"), CellError::Num);
    }
}
