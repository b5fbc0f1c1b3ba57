//! Built-in spreadsheet functions
//!
//! Every function is registered under its English name and, where one exists, its
//! French alias (`MOYENNE`, `SI`, `NB.SI`, ...). Lookups are case-insensitive.

pub mod criteria;
pub mod date;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod statistical;
pub mod text;

use crate::ast::FormulaExpr;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{EvaluationContext, FormulaValue};
use ahash::AHashMap;
use cellcalc_core::CellError;

/// Values of a range argument, row-major, with the range's shape
#[derive(Debug, Clone, PartialEq)]
pub struct RangeValues {
    values: Vec<FormulaValue>,
    rows: usize,
    cols: usize,
}

impl RangeValues {
    /// Create range values from a row-major list
    pub fn new(values: Vec<FormulaValue>, rows: usize, cols: usize) -> Self {
        debug_assert_eq!(values.len(), rows * cols);
        Self { values, rows, cols }
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Value at 0-based row/column within the range
    pub fn get(&self, row: usize, col: usize) -> Option<&FormulaValue> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.values.get(row * self.cols + col)
    }

    /// Flattened values, row-major
    pub fn values(&self) -> &[FormulaValue] {
        &self.values
    }

    /// Take the flattened values
    pub fn into_values(self) -> Vec<FormulaValue> {
        self.values
    }

    /// Iterate over the flattened values
    pub fn iter(&self) -> std::slice::Iter<'_, FormulaValue> {
        self.values.iter()
    }
}

/// An evaluated function argument
///
/// Ranges keep their shape unless the function asked for flattened arguments, in
/// which case every range cell arrives as its own [`FunctionArg::Value`].
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArg {
    Value(FormulaValue),
    Range(RangeValues),
}

impl FunctionArg {
    /// All values carried by this argument (one for a scalar)
    pub fn values(&self) -> &[FormulaValue] {
        match self {
            FunctionArg::Value(v) => std::slice::from_ref(v),
            FunctionArg::Range(r) => r.values(),
        }
    }

    /// The argument as a single value
    ///
    /// A one-cell range acts as its value; larger ranges are `#VALUE!`.
    pub fn scalar(&self) -> FormulaResult<&FormulaValue> {
        match self {
            FunctionArg::Value(v) => Ok(v),
            FunctionArg::Range(r) if r.values().len() == 1 => Ok(&r.values()[0]),
            FunctionArg::Range(_) => Err(CellError::Value.into()),
        }
    }

    /// Shape as (rows, cols); a scalar is 1x1
    pub fn shape(&self) -> (usize, usize) {
        match self {
            FunctionArg::Value(_) => (1, 1),
            FunctionArg::Range(r) => (r.rows(), r.cols()),
        }
    }

    /// Value at 0-based row/column; a scalar only has (0, 0)
    pub fn get(&self, row: usize, col: usize) -> Option<&FormulaValue> {
        match self {
            FunctionArg::Value(v) if row == 0 && col == 0 => Some(v),
            FunctionArg::Value(_) => None,
            FunctionArg::Range(r) => r.get(row, col),
        }
    }
}

impl From<FormulaValue> for FunctionArg {
    fn from(value: FormulaValue) -> Self {
        FunctionArg::Value(value)
    }
}

/// Function implementation over evaluated arguments
pub type FunctionImpl = fn(&[FunctionArg], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// Function implementation that decides which of its argument expressions to evaluate
pub type LazyFunctionImpl = fn(&[FormulaExpr], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// How a function receives its arguments
#[derive(Clone, Copy)]
pub enum Implementation {
    /// Arguments are evaluated left to right before the call
    Eager(FunctionImpl),
    /// Arguments are handed over unevaluated
    Lazy(LazyFunctionImpl),
}

/// Function definition
#[derive(Clone)]
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Alternate names (uppercase), e.g. French spellings
    pub aliases: &'static [&'static str],
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Range arguments are flattened into individual values
    pub flatten: bool,
    /// Implementation
    pub implementation: Implementation,
    /// Is volatile (recalculates every time)
    pub volatile: bool,
}

impl FunctionDef {
    /// A function taking evaluated arguments
    pub fn eager(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: FunctionImpl,
    ) -> Self {
        Self {
            name,
            aliases: &[],
            min_args,
            max_args,
            flatten: false,
            implementation: Implementation::Eager(implementation),
            volatile: false,
        }
    }

    /// A function taking unevaluated argument expressions
    pub fn lazy(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: LazyFunctionImpl,
    ) -> Self {
        Self {
            name,
            aliases: &[],
            min_args,
            max_args,
            flatten: false,
            implementation: Implementation::Lazy(implementation),
            volatile: false,
        }
    }

    /// Check an argument count against this function's arity
    pub fn check_arity(&self, actual: usize) -> FormulaResult<()> {
        if actual < self.min_args {
            return Err(FormulaError::ArgumentCount {
                function: self.name.to_string(),
                expected: format!("at least {}", self.min_args),
                actual,
            });
        }

        if let Some(max) = self.max_args {
            if actual > max {
                return Err(FormulaError::ArgumentCount {
                    function: self.name.to_string(),
                    expected: format!("at most {}", max),
                    actual,
                });
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("flatten", &self.flatten)
            .field("volatile", &self.volatile)
            .finish()
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: Vec<FunctionDef>,
    names: AHashMap<&'static str, usize>,
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: Vec::new(),
            names: AHashMap::new(),
        };

        registry.register_math_functions();
        registry.register_statistical_functions();
        registry.register_logical_functions();
        registry.register_criteria_functions();
        registry.register_text_functions();
        registry.register_date_functions();
        registry.register_lookup_functions();

        registry
    }

    /// Look up a function by name or alias
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        let upper = name.to_ascii_uppercase();
        self.names
            .get(upper.as_str())
            .map(|&idx| &self.functions[idx])
    }

    /// Check whether a name or alias refers to a volatile function
    pub fn is_volatile(&self, name: &str) -> bool {
        self.get(name).map_or(false, |def| def.volatile)
    }

    /// Register a function under its name and aliases
    pub fn register(&mut self, def: FunctionDef) {
        let idx = self.functions.len();
        self.names.insert(def.name, idx);
        for &alias in def.aliases {
            self.names.insert(alias, idx);
        }
        self.functions.push(def);
    }

    /// Iterate over registered functions
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.functions.iter()
    }

    fn register_math_functions(&mut self) {
        self.register(FunctionDef {
            flatten: true,
            ..FunctionDef::eager("SUM", 1, None, math::fn_sum)
        });
        self.register(FunctionDef {
            aliases: &["MOYENNE"],
            flatten: true,
            ..FunctionDef::eager("AVERAGE", 1, None, math::fn_average)
        });
        self.register(FunctionDef {
            flatten: true,
            ..FunctionDef::eager("MIN", 1, None, math::fn_min)
        });
        self.register(FunctionDef {
            flatten: true,
            ..FunctionDef::eager("MAX", 1, None, math::fn_max)
        });
        self.register(FunctionDef {
            aliases: &["NB"],
            flatten: true,
            ..FunctionDef::eager("COUNT", 1, None, math::fn_count)
        });
        self.register(FunctionDef {
            aliases: &["NBVAL"],
            flatten: true,
            ..FunctionDef::eager("COUNTA", 1, None, math::fn_counta)
        });
        self.register(FunctionDef {
            aliases: &["PRODUIT"],
            flatten: true,
            ..FunctionDef::eager("PRODUCT", 1, None, math::fn_product)
        });

        self.register(FunctionDef::eager("ABS", 1, Some(1), math::fn_abs));
        self.register(FunctionDef {
            aliases: &["RACINE"],
            ..FunctionDef::eager("SQRT", 1, Some(1), math::fn_sqrt)
        });
        self.register(FunctionDef {
            aliases: &["PUISSANCE"],
            ..FunctionDef::eager("POWER", 2, Some(2), math::fn_power)
        });
        self.register(FunctionDef::eager("MOD", 2, Some(2), math::fn_mod));
        self.register(FunctionDef {
            aliases: &["ENT"],
            ..FunctionDef::eager("INT", 1, Some(1), math::fn_int)
        });
        self.register(FunctionDef {
            aliases: &["SIGNE"],
            ..FunctionDef::eager("SIGN", 1, Some(1), math::fn_sign)
        });

        // Rounding
        self.register(FunctionDef {
            aliases: &["ARRONDI"],
            ..FunctionDef::eager("ROUND", 1, Some(2), math::fn_round)
        });
        self.register(FunctionDef {
            aliases: &["ARRONDI.SUP"],
            ..FunctionDef::eager("ROUNDUP", 1, Some(2), math::fn_roundup)
        });
        self.register(FunctionDef {
            aliases: &["ARRONDI.INF"],
            ..FunctionDef::eager("ROUNDDOWN", 1, Some(2), math::fn_rounddown)
        });
        self.register(FunctionDef {
            aliases: &["PLAFOND"],
            ..FunctionDef::eager("CEILING", 1, Some(2), math::fn_ceiling)
        });
        self.register(FunctionDef {
            aliases: &["PLANCHER"],
            ..FunctionDef::eager("FLOOR", 1, Some(2), math::fn_floor)
        });

        // Logarithms
        self.register(FunctionDef::eager("LOG", 1, Some(2), math::fn_log));
        self.register(FunctionDef::eager("LN", 1, Some(1), math::fn_ln));
        self.register(FunctionDef::eager("EXP", 1, Some(1), math::fn_exp));
        self.register(FunctionDef::eager("PI", 0, Some(0), math::fn_pi));

        // RAND / RANDBETWEEN (volatile)
        self.register(FunctionDef {
            aliases: &["ALEA"],
            volatile: true,
            ..FunctionDef::eager("RAND", 0, Some(0), math::fn_rand)
        });
        self.register(FunctionDef {
            aliases: &["ALEA.ENTRE.BORNES"],
            volatile: true,
            ..FunctionDef::eager("RANDBETWEEN", 2, Some(2), math::fn_randbetween)
        });
    }

    fn register_statistical_functions(&mut self) {
        self.register(FunctionDef {
            aliases: &["MEDIANE"],
            flatten: true,
            ..FunctionDef::eager("MEDIAN", 1, None, statistical::fn_median)
        });
        self.register(FunctionDef {
            aliases: &["ECARTYPE"],
            flatten: true,
            ..FunctionDef::eager("STDEV", 1, None, statistical::fn_stdev)
        });
    }

    fn register_logical_functions(&mut self) {
        self.register(FunctionDef {
            aliases: &["SI"],
            ..FunctionDef::lazy("IF", 2, Some(3), logical::fn_if)
        });
        self.register(FunctionDef {
            aliases: &["SIERREUR"],
            ..FunctionDef::lazy("IFERROR", 2, Some(2), logical::fn_iferror)
        });
        self.register(FunctionDef {
            aliases: &["ET"],
            flatten: true,
            ..FunctionDef::eager("AND", 1, None, logical::fn_and)
        });
        self.register(FunctionDef {
            aliases: &["OU"],
            flatten: true,
            ..FunctionDef::eager("OR", 1, None, logical::fn_or)
        });
        self.register(FunctionDef {
            aliases: &["NON"],
            ..FunctionDef::eager("NOT", 1, Some(1), logical::fn_not)
        });
    }

    fn register_criteria_functions(&mut self) {
        self.register(FunctionDef {
            aliases: &["NB.SI"],
            ..FunctionDef::eager("COUNTIF", 2, Some(3), criteria::fn_countif)
        });
        self.register(FunctionDef {
            aliases: &["SOMME.SI"],
            ..FunctionDef::eager("SUMIF", 2, Some(3), criteria::fn_sumif)
        });
        self.register(FunctionDef {
            aliases: &["MOYENNE.SI"],
            ..FunctionDef::eager("AVERAGEIF", 2, Some(3), criteria::fn_averageif)
        });
    }

    fn register_text_functions(&mut self) {
        self.register(FunctionDef {
            aliases: &["NBCAR"],
            ..FunctionDef::eager("LEN", 1, Some(1), text::fn_len)
        });
        self.register(FunctionDef {
            aliases: &["GAUCHE"],
            ..FunctionDef::eager("LEFT", 1, Some(2), text::fn_left)
        });
        self.register(FunctionDef {
            aliases: &["DROITE"],
            ..FunctionDef::eager("RIGHT", 1, Some(2), text::fn_right)
        });
        self.register(FunctionDef {
            aliases: &["STXT"],
            ..FunctionDef::eager("MID", 3, Some(3), text::fn_mid)
        });
        self.register(FunctionDef {
            aliases: &["MAJUSCULE"],
            ..FunctionDef::eager("UPPER", 1, Some(1), text::fn_upper)
        });
        self.register(FunctionDef {
            aliases: &["MINUSCULE"],
            ..FunctionDef::eager("LOWER", 1, Some(1), text::fn_lower)
        });
        self.register(FunctionDef {
            aliases: &["SUPPRESPACE"],
            ..FunctionDef::eager("TRIM", 1, Some(1), text::fn_trim)
        });
        self.register(FunctionDef {
            aliases: &["CONCATENER", "CONCAT"],
            flatten: true,
            ..FunctionDef::eager("CONCATENATE", 1, None, text::fn_concatenate)
        });
        self.register(FunctionDef {
            aliases: &["SUBSTITUE"],
            ..FunctionDef::eager("SUBSTITUTE", 3, Some(4), text::fn_substitute)
        });
        self.register(FunctionDef {
            aliases: &["TEXTE"],
            ..FunctionDef::eager("TEXT", 1, Some(2), text::fn_text)
        });
        self.register(FunctionDef {
            aliases: &["CNUM"],
            ..FunctionDef::eager("VALUE", 1, Some(1), text::fn_value)
        });
        self.register(FunctionDef {
            aliases: &["TROUVE"],
            ..FunctionDef::eager("FIND", 2, Some(3), text::fn_find)
        });
        self.register(FunctionDef {
            aliases: &["CHERCHE"],
            ..FunctionDef::eager("SEARCH", 2, Some(3), text::fn_search)
        });
        self.register(FunctionDef::eager("REPT", 2, Some(2), text::fn_rept));
    }

    fn register_date_functions(&mut self) {
        self.register(FunctionDef {
            aliases: &["AUJOURDHUI"],
            volatile: true,
            ..FunctionDef::eager("TODAY", 0, Some(0), date::fn_today)
        });
        self.register(FunctionDef {
            aliases: &["MAINTENANT"],
            volatile: true,
            ..FunctionDef::eager("NOW", 0, Some(0), date::fn_now)
        });
        self.register(FunctionDef {
            aliases: &["ANNEE"],
            ..FunctionDef::eager("YEAR", 1, Some(1), date::fn_year)
        });
        self.register(FunctionDef {
            aliases: &["MOIS"],
            ..FunctionDef::eager("MONTH", 1, Some(1), date::fn_month)
        });
        self.register(FunctionDef {
            aliases: &["JOUR"],
            ..FunctionDef::eager("DAY", 1, Some(1), date::fn_day)
        });
    }

    fn register_lookup_functions(&mut self) {
        self.register(FunctionDef {
            aliases: &["RECHERCHEV"],
            ..FunctionDef::eager("VLOOKUP", 3, Some(4), lookup::fn_vlookup)
        });
        self.register(FunctionDef::eager("INDEX", 2, Some(3), lookup::fn_index));
        self.register(FunctionDef {
            aliases: &["EQUIV"],
            ..FunctionDef::eager("MATCH", 2, Some(3), lookup::fn_match)
        });
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// === Argument helpers shared by the function families ===

/// Numeric value of a required argument
pub(crate) fn number_arg(args: &[FunctionArg], idx: usize) -> FormulaResult<f64> {
    match args.get(idx) {
        Some(arg) => arg.scalar()?.to_number(),
        None => Err(CellError::Value.into()),
    }
}

/// Numeric value of an optional argument
pub(crate) fn optional_number_arg(
    args: &[FunctionArg],
    idx: usize,
    default: f64,
) -> FormulaResult<f64> {
    match args.get(idx) {
        Some(arg) => arg.scalar()?.to_number(),
        None => Ok(default),
    }
}

/// Text value of a required argument
pub(crate) fn text_arg(args: &[FunctionArg], idx: usize) -> FormulaResult<String> {
    match args.get(idx) {
        Some(arg) => Ok(arg.scalar()?.as_text()),
        None => Err(CellError::Value.into()),
    }
}

/// Every value carried by the arguments, ranges flattened
pub(crate) fn all_values(args: &[FunctionArg]) -> impl Iterator<Item = &FormulaValue> {
    args.iter().flat_map(FunctionArg::values)
}

/// Numeric values among the arguments; blanks and non-numeric text are skipped
pub(crate) fn numbers(args: &[FunctionArg]) -> Vec<f64> {
    all_values(args).filter_map(FormulaValue::as_numeric).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::new();
        assert_eq!(registry.get("sum").map(|d| d.name), Some("SUM"));
        assert_eq!(registry.get("Sum").map(|d| d.name), Some("SUM"));
        assert!(registry.get("NOPE").is_none());
    }

    #[test]
    fn test_french_aliases() {
        let registry = FunctionRegistry::new();
        let pairs = [
            ("MOYENNE", "AVERAGE"),
            ("SI", "IF"),
            ("NB.SI", "COUNTIF"),
            ("SOMME.SI", "SUMIF"),
            ("MOYENNE.SI", "AVERAGEIF"),
            ("RACINE", "SQRT"),
            ("ARRONDI", "ROUND"),
            ("STXT", "MID"),
            ("AUJOURDHUI", "TODAY"),
            ("RECHERCHEV", "VLOOKUP"),
            ("SIERREUR", "IFERROR"),
        ];
        for (alias, name) in pairs {
            assert_eq!(registry.get(alias).map(|d| d.name), Some(name), "{}", alias);
        }
        // SUM deliberately has no French spelling
        assert!(registry.get("SOMME").is_none());
    }

    #[test]
    fn test_volatile_functions() {
        let registry = FunctionRegistry::new();
        for name in ["RAND", "ALEA", "RANDBETWEEN", "TODAY", "NOW", "MAINTENANT"] {
            assert!(registry.is_volatile(name), "{}", name);
        }
        assert!(!registry.is_volatile("SUM"));
        assert!(!registry.is_volatile("UNKNOWN"));
    }

    #[test]
    fn test_arity() {
        let registry = FunctionRegistry::new();
        let abs = registry.get("ABS").unwrap();
        assert!(abs.check_arity(1).is_ok());
        assert!(matches!(
            abs.check_arity(0),
            Err(FormulaError::ArgumentCount { actual: 0, .. })
        ));
        assert!(abs.check_arity(2).is_err());
        assert!(registry.get("SUM").unwrap().check_arity(30).is_ok());
    }

    #[test]
    fn test_range_values_shape() {
        let range = RangeValues::new(
            vec![
                FormulaValue::Number(1.0),
                FormulaValue::Number(2.0),
                FormulaValue::Number(3.0),
                FormulaValue::Number(4.0),
            ],
            2,
            2,
        );
        assert_eq!(range.get(1, 0), Some(&FormulaValue::Number(3.0)));
        assert_eq!(range.get(0, 2), None);

        let arg = FunctionArg::Range(range);
        assert_eq!(arg.shape(), (2, 2));
        assert!(arg.scalar().is_err());
    }
}
