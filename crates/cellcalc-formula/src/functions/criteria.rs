//! Criteria matching for COUNTIF, SUMIF and AVERAGEIF
//!
//! A criteria value is read as text and can be:
//! - A comparison: `">5"`, `">=10"`, `"<100"`, `"<=50"`, `"<>0"`, `"=apple"`
//! - A wildcard pattern: `*` matches any run of characters, `?` a single one
//! - Anything else: numeric equality when both sides are numbers, otherwise
//!   case-insensitive text equality (so `""` matches blank cells)

use super::{FunctionArg, text_arg};
use crate::error::FormulaResult;
use crate::evaluator::{EvaluationContext, FormulaValue};
use cellcalc_core::{parse_number, CellError};
use regex::Regex;

/// Criteria matcher for COUNTIF/SUMIF/AVERAGEIF
///
/// The criteria is parsed once and then matched against many values.
#[derive(Debug)]
pub struct CriteriaMatcher {
    criteria_type: CriteriaType,
}

#[derive(Debug)]
enum CriteriaType {
    /// Leading comparison operator and its operand
    Comparison(ComparisonOp, Operand),
    /// Compiled wildcard pattern; `None` if the pattern could not be compiled
    Wildcard(Option<Regex>),
    /// Plain value
    Exact(Operand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

#[derive(Debug)]
struct Operand {
    /// Lower-cased text
    text: String,
    /// Numeric reading, if any (blank text has none)
    number: Option<f64>,
}

impl Operand {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_lowercase(),
            number: parse_number(text),
        }
    }

    fn text_matches(&self, value: &FormulaValue) -> bool {
        self.text == value.as_text().to_lowercase()
    }
}

impl CriteriaMatcher {
    /// Create a new criteria matcher from a FormulaValue
    pub fn new(criteria: &FormulaValue) -> Self {
        Self::parse(&criteria.as_text())
    }

    /// Create a new criteria matcher from criteria text
    pub fn parse(criteria: &str) -> Self {
        let criteria_type = if let Some((op, rest)) = Self::split_operator(criteria) {
            CriteriaType::Comparison(op, Operand::new(rest))
        } else if criteria.contains(['*', '?']) {
            CriteriaType::Wildcard(Self::compile_wildcard(criteria))
        } else {
            CriteriaType::Exact(Operand::new(criteria))
        };

        Self { criteria_type }
    }

    fn split_operator(s: &str) -> Option<(ComparisonOp, &str)> {
        // Two-character operators first
        const OPERATORS: [(&str, ComparisonOp); 6] = [
            ("<>", ComparisonOp::NotEqual),
            (">=", ComparisonOp::GreaterEqual),
            ("<=", ComparisonOp::LessEqual),
            (">", ComparisonOp::GreaterThan),
            ("<", ComparisonOp::LessThan),
            ("=", ComparisonOp::Equal),
        ];

        OPERATORS
            .iter()
            .find_map(|(prefix, op)| s.strip_prefix(prefix).map(|rest| (*op, rest)))
    }

    fn compile_wildcard(pattern: &str) -> Option<Regex> {
        let mut re = String::with_capacity(pattern.len() + 8);
        re.push_str("(?is)^");
        for c in pattern.chars() {
            match c {
                '*' => re.push_str(".*"),
                '?' => re.push('.'),
                c => re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
            }
        }
        re.push('$');

        match Regex::new(&re) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::debug!(pattern, error = %e, "wildcard criteria did not compile");
                None
            }
        }
    }

    /// Check if a value matches the criteria
    pub fn matches(&self, value: &FormulaValue) -> bool {
        match &self.criteria_type {
            CriteriaType::Comparison(op, operand) => {
                if let (Some(n), Some(target)) = (value.as_numeric(), operand.number) {
                    return match op {
                        ComparisonOp::Equal => n == target,
                        ComparisonOp::NotEqual => n != target,
                        ComparisonOp::LessThan => n < target,
                        ComparisonOp::LessEqual => n <= target,
                        ComparisonOp::GreaterThan => n > target,
                        ComparisonOp::GreaterEqual => n >= target,
                    };
                }
                // Ordering needs numbers on both sides
                match op {
                    ComparisonOp::Equal => operand.text_matches(value),
                    ComparisonOp::NotEqual => !operand.text_matches(value),
                    _ => false,
                }
            }

            CriteriaType::Wildcard(re) => re
                .as_ref()
                .map_or(false, |re| re.is_match(&value.as_text())),

            CriteriaType::Exact(operand) => match (value.as_numeric(), operand.number) {
                (Some(n), Some(target)) => n == target,
                _ => operand.text_matches(value),
            },
        }
    }
}

/// Indices of the criteria range values that satisfy the criteria argument
fn matching_indices(args: &[FunctionArg]) -> FormulaResult<Vec<usize>> {
    let range = args.first().ok_or(CellError::Value)?;
    let matcher = CriteriaMatcher::parse(&text_arg(args, 1)?);

    Ok(range
        .values()
        .iter()
        .enumerate()
        .filter(|(_, v)| matcher.matches(v))
        .map(|(i, _)| i)
        .collect())
}

/// Numbers summed/averaged for the matched indices: the aligned target range when
/// given, the criteria range otherwise
fn matched_numbers(args: &[FunctionArg]) -> FormulaResult<Vec<f64>> {
    let indices = matching_indices(args)?;
    let target = args.get(2).unwrap_or(&args[0]).values();

    Ok(indices
        .into_iter()
        .filter_map(|i| target.get(i))
        .filter_map(FormulaValue::as_numeric)
        .collect())
}

/// COUNTIF(range, criteria, [ignored])
///
/// A third argument is accepted for symmetry with SUMIF and has no effect.
pub fn fn_countif(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(matching_indices(args)?.len() as f64))
}

/// SUMIF(range, criteria, [sum_range])
pub fn fn_sumif(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(matched_numbers(args)?.iter().sum()))
}

/// AVERAGEIF(range, criteria, [average_range])
pub fn fn_averageif(args: &[FunctionArg], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let numbers = matched_numbers(args)?;
    if numbers.is_empty() {
        return Err(CellError::Div0.into());
    }
    Ok(FormulaValue::Number(
        numbers.iter().sum::<f64>() / numbers.len() as f64,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvaluationOptions;
    use cellcalc_core::{CellAddress, Grid};

    fn num(n: f64) -> FormulaValue {
        FormulaValue::Number(n)
    }

    fn text(s: &str) -> FormulaValue {
        FormulaValue::Text(s.into())
    }

    #[test]
    fn test_number_criteria() {
        let matcher = CriteriaMatcher::new(&num(5.0));
        assert!(matcher.matches(&num(5.0)));
        assert!(!matcher.matches(&num(4.0)));
        // Numeric text coerces
        assert!(matcher.matches(&text("5")));
        assert!(!matcher.matches(&text("")));
    }

    #[test]
    fn test_comparison_criteria() {
        // Greater than
        let matcher = CriteriaMatcher::parse(">5");
        assert!(matcher.matches(&num(6.0)));
        assert!(!matcher.matches(&num(5.0)));
        assert!(!matcher.matches(&num(4.0)));

        // Greater than or equal
        let matcher = CriteriaMatcher::parse(">=5");
        assert!(matcher.matches(&num(5.0)));
        assert!(!matcher.matches(&num(4.0)));

        // Less than
        let matcher = CriteriaMatcher::parse("<5");
        assert!(!matcher.matches(&num(5.0)));
        assert!(matcher.matches(&num(4.0)));

        // Less than or equal
        let matcher = CriteriaMatcher::parse("<=5");
        assert!(matcher.matches(&num(5.0)));
        assert!(!matcher.matches(&num(6.0)));

        // Not equal
        let matcher = CriteriaMatcher::parse("<>5");
        assert!(matcher.matches(&num(6.0)));
        assert!(!matcher.matches(&num(5.0)));

        // Equal
        let matcher = CriteriaMatcher::parse("=5");
        assert!(matcher.matches(&num(5.0)));
        assert!(!matcher.matches(&num(4.0)));
    }

    #[test]
    fn test_ordering_on_text_is_false() {
        let matcher = CriteriaMatcher::parse(">-1");
        assert!(!matcher.matches(&text("abc")));
        assert!(!matcher.matches(&text("")));

        let matcher = CriteriaMatcher::parse(">b");
        assert!(!matcher.matches(&text("c")));
    }

    #[test]
    fn test_text_comparison_criteria() {
        let matcher = CriteriaMatcher::parse("=Apple");
        assert!(matcher.matches(&text("apple")));
        assert!(!matcher.matches(&text("pear")));

        let matcher = CriteriaMatcher::parse("<>apple");
        assert!(matcher.matches(&text("pear")));
        assert!(!matcher.matches(&text("APPLE")));

        // Bare operators compare against the empty string
        let matcher = CriteriaMatcher::parse("<>");
        assert!(matcher.matches(&text("x")));
        assert!(!matcher.matches(&text("")));
    }

    #[test]
    fn test_text_criteria() {
        // Case insensitive
        let matcher = CriteriaMatcher::parse("apple");
        assert!(matcher.matches(&text("apple")));
        assert!(matcher.matches(&text("APPLE")));
        assert!(!matcher.matches(&text("banana")));
    }

    #[test]
    fn test_wildcard_criteria() {
        // Asterisk wildcard
        let matcher = CriteriaMatcher::parse("a*");
        assert!(matcher.matches(&text("apple")));
        assert!(matcher.matches(&text("A")));
        assert!(!matcher.matches(&text("banana")));

        // Asterisk in middle
        let matcher = CriteriaMatcher::parse("a*e");
        assert!(matcher.matches(&text("apple")));
        assert!(!matcher.matches(&text("apples")));

        // Question mark wildcard
        let matcher = CriteriaMatcher::parse("a?ple");
        assert!(matcher.matches(&text("apple")));
        assert!(!matcher.matches(&text("aple")));

        // Regex metacharacters are literal
        let matcher = CriteriaMatcher::parse("1.5*");
        assert!(matcher.matches(&text("1.5kg")));
        assert!(!matcher.matches(&text("105kg")));

        // Numbers are matched through their text
        let matcher = CriteriaMatcher::parse("1?");
        assert!(matcher.matches(&num(12.0)));
    }

    #[test]
    fn test_empty_criteria_matches_blanks() {
        let matcher = CriteriaMatcher::parse("");
        assert!(matcher.matches(&text("")));
        assert!(!matcher.matches(&text("text")));
        assert!(!matcher.matches(&num(0.0)));
    }

    fn eval(grid: &Grid, formula: &str) -> FormulaResult<FormulaValue> {
        EvaluationContext::new(grid, EvaluationOptions::default()).evaluate_formula(formula)
    }

    #[test]
    fn test_criteria_functions() {
        let grid = Grid::from_rows(vec![
            vec!["1", "cat", "10"],
            vec!["2", "car", "20"],
            vec!["3", "dog", "30"],
            vec!["4", "", "x"],
        ]);

        assert_eq!(eval(&grid, "COUNTIF(A1:A4,\">2\")").unwrap(), num(2.0));
        assert_eq!(eval(&grid, "COUNTIF(B1:B4,\"ca*\")").unwrap(), num(2.0));
        assert_eq!(eval(&grid, "NB.SI(B1:B4;\"\")").unwrap(), num(1.0));
        assert_eq!(eval(&grid, "SUMIF(A1:A4,\">=2\")").unwrap(), num(9.0));
        assert_eq!(eval(&grid, "SUMIF(B1:B4,\"ca?\",C1:C4)").unwrap(), num(30.0));
        // Non-numeric targets are skipped
        assert_eq!(eval(&grid, "SOMME.SI(A1:A4,\">0\",C1:C4)").unwrap(), num(60.0));
        assert_eq!(eval(&grid, "AVERAGEIF(B1:B4,\"c*\",C1:C4)").unwrap(), num(15.0));
        assert_eq!(
            eval(&grid, "MOYENNE.SI(A1:A4,\">100\")").unwrap_err().code(),
            CellError::Div0
        );
        // Criteria built from a cell
        assert_eq!(eval(&grid, "COUNTIF(A1:A4,\">\"&A2)").unwrap(), num(2.0));
    }

    #[test]
    fn test_countif_ignores_third_argument() {
        let grid = Grid::from_rows(vec![vec!["1", "10"], vec!["5", "20"], vec!["7", "x"]]);
        assert_eq!(eval(&grid, "COUNTIF(A1:A3,\">2\",B1:B3)").unwrap(), num(2.0));
        assert_eq!(eval(&grid, "NB.SI(A1:A3;\">2\";99)").unwrap(), num(2.0));
        // Still evaluated, so its errors surface
        assert_eq!(
            eval(&grid, "COUNTIF(A1:A3,\">2\",1/0)").unwrap_err().code(),
            CellError::Div0
        );
        assert_eq!(
            eval(&grid, "COUNTIF(A1:A3,\">2\",B1:B3,1)").unwrap_err().code(),
            CellError::Value
        );
    }

    #[test]
    fn test_criteria_cells_are_resolved() {
        let grid = Grid::from_rows(vec![vec!["=1+1", "=2*2", "=COUNTIF(A1:B1,\">3\")"]]);
        let ctx = EvaluationContext::new(&grid, EvaluationOptions::default());
        assert_eq!(ctx.eval_cell(CellAddress::new(0, 2)).unwrap(), num(1.0));
    }
}
