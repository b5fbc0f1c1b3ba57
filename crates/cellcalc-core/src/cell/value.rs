//! Cell content classification and error codes

use std::fmt;

/// How a raw cell string is interpreted
///
/// A cell is a formula iff its first character is `=`. Anything else is a literal:
/// numeric when it parses as a finite number, text otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellContent<'a> {
    /// Empty string
    Empty,
    /// Numeric literal
    Number(f64),
    /// Text literal (raw, untrimmed)
    Text(&'a str),
    /// Formula body, without the leading `=`
    Formula(&'a str),
}

impl<'a> CellContent<'a> {
    /// Classify a raw cell string
    pub fn classify(raw: &'a str) -> Self {
        if raw.is_empty() {
            return CellContent::Empty;
        }
        if let Some(body) = raw.strip_prefix('=') {
            return CellContent::Formula(body);
        }
        match parse_number(raw) {
            Some(n) => CellContent::Number(n),
            None => CellContent::Text(raw),
        }
    }

    /// Check if the cell contains a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, CellContent::Formula(_))
    }
}

/// Parse a string as a finite number, ignoring surrounding whitespace
///
/// Blank strings, `inf` and `NaN` spellings are not numbers.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    // f64::from_str accepts "inf"/"nan" spellings
    if s.bytes().any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E') {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Error codes a cell can display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellError {
    /// #DIV/0! - Division by zero
    Div0,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #CIRC! - Circular reference
    Circ,
    /// #NUM! - Invalid numeric value
    Num,
    /// #NAME? - Unrecognized function name
    Name,
    /// #N/A - Lookup found no match
    Na,
    /// #ERROR! - Anything else (parse failures, malformed references)
    Error,
}

impl CellError {
    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Circ => "#CIRC!",
            CellError::Num => "#NUM!",
            CellError::Name => "#NAME?",
            CellError::Na => "#N/A",
            CellError::Error => "#ERROR!",
        }
    }

    /// Parse an error string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "#DIV/0!" => Some(CellError::Div0),
            "#VALUE!" => Some(CellError::Value),
            "#CIRC!" => Some(CellError::Circ),
            "#NUM!" => Some(CellError::Num),
            "#NAME?" => Some(CellError::Name),
            "#N/A" => Some(CellError::Na),
            "#ERROR!" => Some(CellError::Error),
            _ => None,
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
