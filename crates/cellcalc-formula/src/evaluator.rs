//! Formula evaluator
//!
//! Evaluates formula ASTs against a [`Grid`] snapshot. Referenced cells are resolved
//! recursively through [`EvaluationContext::eval_cell`], which keeps the set of cells
//! currently being resolved so that circular chains surface as `#CIRC!`.

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::compute::format_number;
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{FunctionArg, FunctionRegistry, Implementation, RangeValues};
use crate::parser::parse_formula;
use ahash::AHashSet;
use cellcalc_core::{parse_number, CellAddress, CellContent, CellError, CellRange, Grid};
use chrono::NaiveDateTime;
use std::cell::RefCell;
use std::sync::OnceLock;

/// Global function registry (lazily initialized)
static FUNCTION_REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();

/// The shared registry of built-in functions
pub fn function_registry() -> &'static FunctionRegistry {
    FUNCTION_REGISTRY.get_or_init(FunctionRegistry::new)
}

/// Default maximum reference-chain depth
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Default maximum number of cells a single range may expand to
pub const DEFAULT_MAX_RANGE_CELLS: u64 = 1_000_000;

/// Value types during formula evaluation
///
/// Booleans are numbers (`1`/`0`); errors travel as [`FormulaError`], never as values.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    Text(String),
}

impl FormulaValue {
    /// The value of an empty cell
    pub fn empty() -> Self {
        FormulaValue::Text(String::new())
    }

    /// Check if this is the empty string
    pub fn is_empty(&self) -> bool {
        matches!(self, FormulaValue::Text(s) if s.is_empty())
    }

    /// Numeric coercion: blank text is 0, other text must parse as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Text(s) if s.trim().is_empty() => Some(0.0),
            FormulaValue::Text(s) => parse_number(s),
        }
    }

    /// Force conversion to number for arithmetic (`#VALUE!` on failure)
    pub fn to_number(&self) -> FormulaResult<f64> {
        self.as_number().ok_or(FormulaError::Code(CellError::Value))
    }

    /// Numeric content for aggregates: numbers and numeric text, never blanks
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            FormulaValue::Text(s) => parse_number(s),
        }
    }

    /// Convert to text; numbers use their shortest round-trip form
    pub fn as_text(&self) -> String {
        match self {
            FormulaValue::Number(n) => number_to_text(*n),
            FormulaValue::Text(s) => s.clone(),
        }
    }

    /// Truthiness for conditions: non-zero numbers, or the text `TRUE`/`FALSE`
    pub fn is_truthy(&self) -> FormulaResult<bool> {
        if let FormulaValue::Text(s) = self {
            if s.eq_ignore_ascii_case("TRUE") {
                return Ok(true);
            }
            if s.eq_ignore_ascii_case("FALSE") {
                return Ok(false);
            }
        }
        Ok(self.to_number()? != 0.0)
    }

    /// Display string (numbers rounded to 10 significant digits)
    pub fn display(&self) -> String {
        match self {
            FormulaValue::Number(n) => format_number(*n),
            FormulaValue::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for FormulaValue {
    fn from(n: f64) -> Self {
        FormulaValue::Number(n)
    }
}

impl From<bool> for FormulaValue {
    fn from(b: bool) -> Self {
        FormulaValue::Number(if b { 1.0 } else { 0.0 })
    }
}

impl From<String> for FormulaValue {
    fn from(s: String) -> Self {
        FormulaValue::Text(s)
    }
}

impl From<&str> for FormulaValue {
    fn from(s: &str) -> Self {
        FormulaValue::Text(s.to_string())
    }
}

/// Magnitude at and above which numbers print in exponent form
const EXPONENT_FORM_ABOVE: f64 = 1e21;

/// Magnitude below which non-zero numbers print in exponent form
const EXPONENT_FORM_BELOW: f64 = 1e-6;

/// Shortest text form of a number
///
/// `3`, `0.5`, `-0` prints as `0`. Magnitudes from `1e21` up and below `1e-6` use
/// exponent form with an explicit sign (`1e+21`, `1.5e-7`); non-finite values print
/// as `Infinity`, `-Infinity` and `NaN`.
pub fn number_to_text(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    let magnitude = n.abs();
    if magnitude >= EXPONENT_FORM_ABOVE || magnitude < EXPONENT_FORM_BELOW {
        let text = format!("{:e}", n);
        return match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => text,
        };
    }

    n.to_string()
}

/// Options controlling formula evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationOptions {
    /// Maximum number of cells resolving at once along one reference chain
    pub max_depth: usize,
    /// Maximum number of cells a single range may expand to
    pub max_range_cells: u64,
    /// Clock override for TODAY/NOW; `None` reads the host local clock
    pub now: Option<NaiveDateTime>,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
            now: None,
        }
    }
}

impl EvaluationOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum reference-chain depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the maximum range size
    pub fn with_max_range_cells(mut self, max_range_cells: u64) -> Self {
        self.max_range_cells = max_range_cells;
        self
    }

    /// Pin the clock used by TODAY/NOW
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }
}

/// Context for formula evaluation
///
/// Owned by one top-level computation. The guard set holds the cells on the current
/// resolution stack only; nothing is cached between sibling references.
pub struct EvaluationContext<'a> {
    grid: &'a Grid,
    options: EvaluationOptions,
    guard: RefCell<AHashSet<CellAddress>>,
}

impl<'a> EvaluationContext<'a> {
    /// Create a new evaluation context with an empty guard set
    pub fn new(grid: &'a Grid, options: EvaluationOptions) -> Self {
        Self {
            grid,
            options,
            guard: RefCell::new(AHashSet::new()),
        }
    }

    /// The grid being evaluated
    pub fn grid(&self) -> &'a Grid {
        self.grid
    }

    /// Evaluation options
    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    /// Current date and time, honoring the clock override
    pub fn now(&self) -> NaiveDateTime {
        self.options
            .now
            .unwrap_or_else(|| chrono::Local::now().naive_local())
    }

    /// Number of cells currently being resolved
    pub fn depth(&self) -> usize {
        self.guard.borrow().len()
    }

    /// Resolve one cell's value
    ///
    /// Literal cells yield their number or raw text; formula cells are parsed and
    /// evaluated. The cell is on the guard set for exactly the duration of the call.
    pub fn eval_cell(&self, addr: CellAddress) -> FormulaResult<FormulaValue> {
        {
            let mut guard = self.guard.borrow_mut();
            if guard.contains(&addr) {
                tracing::warn!(cell = %addr, "circular reference detected");
                return Err(FormulaError::CircularReference(addr));
            }
            if guard.len() >= self.options.max_depth {
                tracing::debug!(cell = %addr, max_depth = self.options.max_depth, "reference chain too deep");
                return Err(FormulaError::DepthExceeded(self.options.max_depth));
            }
            guard.insert(addr);
        }

        tracing::trace!(cell = %addr, "resolving cell");
        let result = self.resolve(addr);

        self.guard.borrow_mut().remove(&addr);
        result
    }

    fn resolve(&self, addr: CellAddress) -> FormulaResult<FormulaValue> {
        match CellContent::classify(self.grid.raw(addr)) {
            CellContent::Empty => Ok(FormulaValue::empty()),
            CellContent::Number(n) => Ok(FormulaValue::Number(n)),
            CellContent::Text(s) => Ok(FormulaValue::Text(s.to_string())),
            CellContent::Formula(body) => self.evaluate_formula(body),
        }
    }

    /// Expand a range into its values, resolving every cell (rows outer, columns inner)
    pub fn range_values(&self, range: CellRange) -> FormulaResult<RangeValues> {
        if range.cell_count() > self.options.max_range_cells {
            return Err(FormulaError::InvalidReference(format!(
                "range {} exceeds {} cells",
                range, self.options.max_range_cells
            )));
        }

        let values = range
            .cells()
            .map(|addr| self.eval_cell(addr))
            .collect::<FormulaResult<Vec<_>>>()?;

        Ok(RangeValues::new(
            values,
            range.row_count() as usize,
            range.col_count() as usize,
        ))
    }

    /// Parse and evaluate a formula body (without the leading `=`)
    pub fn evaluate_formula(&self, body: &str) -> FormulaResult<FormulaValue> {
        let expr = parse_formula(body)?;
        evaluate(&expr, self)
    }
}

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match expr {
        // === Literals ===
        FormulaExpr::Number(n) => Ok(FormulaValue::Number(*n)),
        FormulaExpr::Text(s) => Ok(FormulaValue::Text(s.clone())),
        FormulaExpr::Boolean(b) => Ok(FormulaValue::from(*b)),

        // === References ===
        FormulaExpr::CellRef(addr) => ctx.eval_cell(*addr),

        // A bare range used as a scalar reduces to the sum of its numbers
        FormulaExpr::RangeRef(range) => {
            let values = ctx.range_values(*range)?;
            finite(values.iter().filter_map(FormulaValue::as_numeric).sum())
        }

        // === Operators ===
        FormulaExpr::BinaryOp { op, left, right } => evaluate_binary_op(*op, left, right, ctx),

        FormulaExpr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, ctx),

        // === Functions ===
        FormulaExpr::Function { name, args } => evaluate_function(name, args, ctx),
    }
}

/// Turn an arithmetic result into a value, mapping NaN/infinity to `#NUM!`
fn finite(n: f64) -> FormulaResult<FormulaValue> {
    if n.is_finite() {
        Ok(FormulaValue::Number(n))
    } else {
        Err(CellError::Num.into())
    }
}

/// Equality used by `=` and `<>`
///
/// Numeric when both sides coerce to numbers, otherwise exact text comparison.
fn values_equal(left: &FormulaValue, right: &FormulaValue) -> bool {
    match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => l == r,
        _ => left.as_text() == right.as_text(),
    }
}

/// Evaluate a binary operation
fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaExpr,
    right: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    // Evaluate operands first, left to right
    let left_val = evaluate(left, ctx)?;
    let right_val = evaluate(right, ctx)?;

    match op {
        // Comparison operators
        BinaryOperator::Equal => Ok(values_equal(&left_val, &right_val).into()),
        BinaryOperator::NotEqual => Ok((!values_equal(&left_val, &right_val)).into()),
        BinaryOperator::LessThan => Ok((left_val.to_number()? < right_val.to_number()?).into()),
        BinaryOperator::LessEqual => Ok((left_val.to_number()? <= right_val.to_number()?).into()),
        BinaryOperator::GreaterThan => Ok((left_val.to_number()? > right_val.to_number()?).into()),
        BinaryOperator::GreaterEqual => {
            Ok((left_val.to_number()? >= right_val.to_number()?).into())
        }

        // Concatenation
        BinaryOperator::Concat => {
            let mut text = left_val.as_text();
            text.push_str(&right_val.as_text());
            Ok(FormulaValue::Text(text))
        }

        // Arithmetic operators
        BinaryOperator::Add => finite(left_val.to_number()? + right_val.to_number()?),
        BinaryOperator::Subtract => finite(left_val.to_number()? - right_val.to_number()?),
        BinaryOperator::Multiply => finite(left_val.to_number()? * right_val.to_number()?),
        BinaryOperator::Divide => {
            let l = left_val.to_number()?;
            let r = right_val.to_number()?;
            if r == 0.0 {
                return Err(CellError::Div0.into());
            }
            finite(l / r)
        }
        BinaryOperator::Modulo => {
            let l = left_val.to_number()?;
            let r = right_val.to_number()?;
            if r == 0.0 {
                return Err(CellError::Div0.into());
            }
            // Truncated remainder: the result takes the sign of the dividend
            finite(l % r)
        }
        BinaryOperator::Power => finite(left_val.to_number()?.powf(right_val.to_number()?)),
    }
}

/// Evaluate a unary operation
fn evaluate_unary_op(
    op: UnaryOperator,
    operand: &FormulaExpr,
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let n = evaluate(operand, ctx)?.to_number()?;

    match op {
        UnaryOperator::Negate => Ok(FormulaValue::Number(-n)),
        UnaryOperator::Plus => Ok(FormulaValue::Number(n)),
    }
}

/// Evaluate a function call
fn evaluate_function(
    name: &str,
    args: &[FormulaExpr],
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let registry = function_registry();

    let Some(func) = registry.get(name) else {
        // The argument list is still evaluated, so its errors take precedence
        collect_args(args, true, ctx)?;
        tracing::warn!(function = name, "unknown function");
        return Err(FormulaError::UnknownFunction(name.to_string()));
    };

    func.check_arity(args.len())?;

    let result = match func.implementation {
        Implementation::Lazy(implementation) => implementation(args, ctx)?,
        Implementation::Eager(implementation) => {
            let evaluated = collect_args(args, func.flatten, ctx)?;
            implementation(&evaluated, ctx)?
        }
    };

    match result {
        FormulaValue::Number(n) => finite(n),
        text => Ok(text),
    }
}

/// Evaluate argument expressions left to right
///
/// Range arguments keep their shape, or are spread into one value per cell when
/// `flatten` is set.
fn collect_args(
    args: &[FormulaExpr],
    flatten: bool,
    ctx: &EvaluationContext,
) -> FormulaResult<Vec<FunctionArg>> {
    let mut collected = Vec::with_capacity(args.len());

    for arg in args {
        match arg {
            FormulaExpr::RangeRef(range) => {
                let values = ctx.range_values(*range)?;
                if flatten {
                    collected.extend(values.into_values().into_iter().map(FunctionArg::Value));
                } else {
                    collected.push(FunctionArg::Range(values));
                }
            }
            other => collected.push(FunctionArg::Value(evaluate(other, ctx)?)),
        }
    }

    Ok(collected)
}
