//! Formula parser
//!
//! A recursive descent parser over the token stream produced by [`crate::lexer`],
//! climbing precedence from comparison (lowest) to primary expressions (highest).

use crate::ast::{BinaryOperator, FormulaExpr, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::lexer::{tokenize, Operator, Token};
use cellcalc_core::{CellAddress, CellRange};

/// Maximum nesting of parentheses, function calls and unary operators
pub const MAX_NESTING: usize = 128;

/// Parse a formula body (the text after the leading `=`) into an AST
///
/// # Example
/// ```rust
/// use cellcalc_formula::parse_formula;
///
/// let ast = parse_formula("1+2").unwrap();
/// let ast = parse_formula("SUM(A1:A10)").unwrap();
/// let ast = parse_formula("SI(A1>0;\"oui\";\"non\")").unwrap();
/// assert!(parse_formula("1+").is_err());
///
/// // Anything after the first complete expression is ignored
/// assert_eq!(parse_formula("10 USD").unwrap(), parse_formula("10").unwrap());
/// ```
pub fn parse_formula(body: &str) -> FormulaResult<FormulaExpr> {
    let tokens = tokenize(body);
    let mut parser = FormulaParser::new(&tokens);
    let expr = parser.parse_expression()?;

    // Tokens after the first complete expression are ignored
    if let Some(token) = parser.current_token() {
        tracing::trace!(?token, "ignoring tokens after expression");
    }

    Ok(expr)
}

/// Parse the number text of a NUMBER token
///
/// Only the leading `digits[.digits]` part counts, so `1.2.3` reads as `1.2`.
fn parse_number_token(text: &str) -> FormulaResult<f64> {
    let int_len = text.bytes().take_while(u8::is_ascii_digit).count();
    let mut end = int_len;
    let mut frac_len = 0;
    if text.as_bytes().get(end) == Some(&b'.') {
        frac_len = text[end + 1..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        end += 1 + frac_len;
    }

    if int_len + frac_len == 0 {
        return Err(FormulaError::Parse(format!("Malformed number '{}'", text)));
    }

    text[..end]
        .parse()
        .map_err(|_| FormulaError::Parse(format!("Malformed number '{}'", text)))
}

/// Formula parser
struct FormulaParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    // === Helper methods ===

    fn current_token(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn current_op(&self) -> Option<Operator> {
        match self.current_token() {
            Some(Token::Op(op)) => Some(*op),
            _ => None,
        }
    }

    fn consume(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> FormulaResult<()> {
        match self.current_token() {
            Some(token) if token == expected => {
                self.consume();
                Ok(())
            }
            other => Err(FormulaError::Parse(format!(
                "Expected {:?}, got {:?}",
                expected, other
            ))),
        }
    }

    fn enter(&mut self) -> FormulaResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(FormulaError::Parse(format!(
                "Formula nested deeper than {} levels",
                MAX_NESTING
            )));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Concatenation: &
    // 3. Addition/Subtraction: +, -
    // 4. Multiplication/Division/Remainder: *, /, %
    // 5. Exponentiation: ^
    // 6. Unary: -, +
    // 7. Primary: literals, references, function calls, parentheses

    fn parse_expression(&mut self) -> FormulaResult<FormulaExpr> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_concatenation()?;

        loop {
            let op = match self.current_op() {
                Some(Operator::Equal) => BinaryOperator::Equal,
                Some(Operator::NotEqual) => BinaryOperator::NotEqual,
                Some(Operator::Less) => BinaryOperator::LessThan,
                Some(Operator::LessEqual) => BinaryOperator::LessEqual,
                Some(Operator::Greater) => BinaryOperator::GreaterThan,
                Some(Operator::GreaterEqual) => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.consume();
            let right = self.parse_concatenation()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_concatenation(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_additive()?;

        while self.current_op() == Some(Operator::Ampersand) {
            self.consume();
            let right = self.parse_additive()?;
            left = binary(BinaryOperator::Concat, left, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_op() {
                Some(Operator::Plus) => BinaryOperator::Add,
                Some(Operator::Minus) => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_power()?;

        loop {
            let op = match self.current_op() {
                Some(Operator::Star) => BinaryOperator::Multiply,
                Some(Operator::Slash) => BinaryOperator::Divide,
                Some(Operator::Percent) => BinaryOperator::Modulo,
                _ => break,
            };

            self.consume();
            let right = self.parse_power()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_power(&mut self) -> FormulaResult<FormulaExpr> {
        let mut left = self.parse_unary()?;

        // Left associative: 2^3^2 = (2^3)^2
        while self.current_op() == Some(Operator::Caret) {
            self.consume();
            let right = self.parse_unary()?;
            left = binary(BinaryOperator::Power, left, right);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<FormulaExpr> {
        let op = match self.current_op() {
            Some(Operator::Minus) => UnaryOperator::Negate,
            Some(Operator::Plus) => UnaryOperator::Plus,
            _ => return self.parse_primary(),
        };

        self.consume();
        self.enter()?;
        let operand = self.parse_unary()?;
        self.leave();

        Ok(FormulaExpr::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> FormulaResult<FormulaExpr> {
        let token = self
            .consume()
            .ok_or_else(|| FormulaError::Parse("Unexpected end of formula".into()))?;

        match token {
            Token::Number(text) => Ok(FormulaExpr::Number(parse_number_token(text)?)),

            Token::String(s) => Ok(FormulaExpr::Text(s.clone())),

            Token::Bool(b) => Ok(FormulaExpr::Boolean(*b)),

            Token::Cell(label) => {
                let address = CellAddress::parse(label).map_err(|e| {
                    FormulaError::InvalidReference(format!("'{}': {}", label, e))
                })?;
                Ok(FormulaExpr::CellRef(address))
            }

            Token::Range(label) => {
                let range = CellRange::parse(label).map_err(|e| {
                    FormulaError::InvalidReference(format!("'{}': {}", label, e))
                })?;
                Ok(FormulaExpr::RangeRef(range))
            }

            Token::Func(name) => self.parse_function_call(name),

            Token::LeftParen => {
                self.enter()?;
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                self.leave();
                Ok(expr)
            }

            other => Err(FormulaError::Parse(format!("Unexpected token: {:?}", other))),
        }
    }

    fn parse_function_call(&mut self, name: &str) -> FormulaResult<FormulaExpr> {
        self.expect(&Token::LeftParen)?;
        self.enter()?;

        let mut args = Vec::new();

        // Parse arguments
        if self.current_token() != Some(&Token::RightParen) {
            args.push(self.parse_expression()?);

            while self.current_token() == Some(&Token::Comma) {
                self.consume();
                args.push(self.parse_expression()?);
            }
        }

        self.expect(&Token::RightParen)?;
        self.leave();

        Ok(FormulaExpr::Function {
            name: name.to_string(),
            args,
        })
    }
}

fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> FormulaExpr {
    FormulaExpr::BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_formula("42").unwrap(), FormulaExpr::Number(42.0));
        assert_eq!(parse_formula("3.14").unwrap(), FormulaExpr::Number(3.14));
        assert_eq!(parse_formula(".5").unwrap(), FormulaExpr::Number(0.5));
        assert_eq!(parse_formula("1.2.3").unwrap(), FormulaExpr::Number(1.2));
        assert!(parse_formula(".").is_err());
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(
            parse_formula("\"Hello\"").unwrap(),
            FormulaExpr::Text("Hello".into())
        );
        assert_eq!(parse_formula("TRUE").unwrap(), FormulaExpr::Boolean(true));
        assert_eq!(parse_formula("false").unwrap(), FormulaExpr::Boolean(false));
        // Bare words fall back to text
        assert_eq!(
            parse_formula("pending").unwrap(),
            FormulaExpr::Text("pending".into())
        );
    }

    #[test]
    fn test_parse_arithmetic() {
        let ast = parse_formula("1+2*3").unwrap();
        // Should parse as 1+(2*3) due to precedence
        if let FormulaExpr::BinaryOp { op, left, right } = ast {
            assert_eq!(op, BinaryOperator::Add);
            assert_eq!(*left, FormulaExpr::Number(1.0));
            assert!(matches!(
                *right,
                FormulaExpr::BinaryOp {
                    op: BinaryOperator::Multiply,
                    ..
                }
            ));
        } else {
            panic!("Expected BinaryOp");
        }
    }

    #[test]
    fn test_parse_percent_is_remainder() {
        let ast = parse_formula("7%3").unwrap();
        assert!(matches!(
            ast,
            FormulaExpr::BinaryOp {
                op: BinaryOperator::Modulo,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_power_left_associative() {
        let ast = parse_formula("2^3^2").unwrap();
        if let FormulaExpr::BinaryOp { op, left, right } = ast {
            assert_eq!(op, BinaryOperator::Power);
            assert!(matches!(
                *left,
                FormulaExpr::BinaryOp {
                    op: BinaryOperator::Power,
                    ..
                }
            ));
            assert_eq!(*right, FormulaExpr::Number(2.0));
        } else {
            panic!("Expected BinaryOp");
        }
    }

    #[test]
    fn test_parse_comparison() {
        let ast = parse_formula("A1<>B1").unwrap();
        assert!(matches!(
            ast,
            FormulaExpr::BinaryOp {
                op: BinaryOperator::NotEqual,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_unary() {
        let ast = parse_formula("-5").unwrap();
        assert!(matches!(
            ast,
            FormulaExpr::UnaryOp {
                op: UnaryOperator::Negate,
                ..
            }
        ));

        // Unary binds tighter than ^
        let ast = parse_formula("-2^2").unwrap();
        assert!(matches!(
            ast,
            FormulaExpr::BinaryOp {
                op: BinaryOperator::Power,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_references() {
        assert_eq!(
            parse_formula("$B$2").unwrap(),
            FormulaExpr::CellRef(CellAddress::new(1, 1))
        );
        assert_eq!(
            parse_formula("A3:A1").unwrap(),
            FormulaExpr::RangeRef(CellRange::from_indices(0, 0, 2, 0))
        );
    }

    #[test]
    fn test_parse_invalid_references() {
        assert!(matches!(
            parse_formula("A0"),
            Err(FormulaError::InvalidReference(_))
        ));
        assert!(matches!(
            parse_formula("A1:B"),
            Err(FormulaError::InvalidReference(_))
        ));
    }

    #[test]
    fn test_parse_function() {
        let ast = parse_formula("SUM(1;2,A1:A10)").unwrap();
        if let FormulaExpr::Function { name, args } = ast {
            assert_eq!(name, "SUM");
            assert_eq!(args.len(), 3);
            assert!(matches!(&args[2], FormulaExpr::RangeRef(_)));
        } else {
            panic!("Expected Function");
        }

        let ast = parse_formula("pi()").unwrap();
        assert_eq!(
            ast,
            FormulaExpr::Function {
                name: "PI".into(),
                args: vec![]
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_formula("").is_err());
        assert!(parse_formula("1+").is_err());
        assert!(parse_formula("(1+2").is_err());
        assert!(parse_formula("SUM(1,)").is_err());
        assert!(parse_formula("*3").is_err());
    }

    #[test]
    fn test_trailing_tokens_are_ignored() {
        assert_eq!(parse_formula("1 2").unwrap(), FormulaExpr::Number(1.0));
        assert_eq!(parse_formula("10 USD").unwrap(), FormulaExpr::Number(10.0));
        assert_eq!(
            parse_formula("SUM(1))").unwrap(),
            FormulaExpr::Function {
                name: "SUM".into(),
                args: vec![FormulaExpr::Number(1.0)]
            }
        );
        // The leading expression must still be complete
        assert!(parse_formula("(1+2").is_err());
        assert!(parse_formula(")1").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        assert!(matches!(parse_formula(&deep), Err(FormulaError::Parse(_))));

        let ok = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(parse_formula(&ok).unwrap(), FormulaExpr::Number(1.0));
    }
}
