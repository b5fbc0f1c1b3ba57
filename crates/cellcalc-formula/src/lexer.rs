//! Formula tokenizer
//!
//! Turns a formula body (the text after the leading `=`) into a flat token stream.
//! Tokenizing never fails: characters that start no token are skipped.

use lazy_regex::regex_is_match;

/// Tokens produced by [`tokenize`]
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Run of digits and dots, kept as written
    Number(String),
    /// Quoted string, or a bare word that is neither a reference nor a function
    String(String),
    /// Cell reference, upper-cased with `$` markers removed (e.g. `B12`)
    Cell(String),
    /// Range reference, upper-cased with `$` markers removed (e.g. `A1:C3`)
    Range(String),
    /// Function name, upper-cased; the `(` that follows stays in the stream
    Func(String),
    /// Operator
    Op(Operator),
    LeftParen,
    RightParen,
    /// `,` or `;`
    Comma,
    /// `TRUE` / `FALSE`
    Bool(bool),
}

/// Operator tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

/// Tokenize a formula body
///
/// # Example
/// ```rust
/// use cellcalc_formula::lexer::{tokenize, Operator, Token};
///
/// let tokens = tokenize("SUM(A1:B2)*2");
/// assert_eq!(
///     tokens,
///     vec![
///         Token::Func("SUM".into()),
///         Token::LeftParen,
///         Token::Range("A1:B2".into()),
///         Token::RightParen,
///         Token::Op(Operator::Star),
///         Token::Number("2".into()),
///     ]
/// );
/// ```
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token() {
        tokens.push(token);
    }
    tokens
}

/// Check whether text has the shape of a cell label (`A1`, `xfd1048576`)
///
/// `$` markers are ignored.
pub fn is_cell_label(text: &str) -> bool {
    let clean = strip_markers(text);
    regex_is_match!(r"^[A-Za-z]+[0-9]+$", &clean)
}

fn strip_markers(text: &str) -> String {
    text.replace('$', "")
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn next_token(&mut self) -> Option<Token> {
        loop {
            let c = self.peek_char()?;

            match c {
                ' ' | '\t' => {
                    self.advance();
                }
                '"' => return Some(self.scan_string()),
                '<' => {
                    self.advance();
                    let op = match self.peek_char() {
                        Some('>') => Operator::NotEqual,
                        Some('=') => Operator::LessEqual,
                        _ => return Some(Token::Op(Operator::Less)),
                    };
                    self.advance();
                    return Some(Token::Op(op));
                }
                '>' => {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        return Some(Token::Op(Operator::GreaterEqual));
                    }
                    return Some(Token::Op(Operator::Greater));
                }
                '+' | '-' | '*' | '/' | '^' | '%' | '&' | '=' => {
                    self.advance();
                    let op = match c {
                        '+' => Operator::Plus,
                        '-' => Operator::Minus,
                        '*' => Operator::Star,
                        '/' => Operator::Slash,
                        '^' => Operator::Caret,
                        '%' => Operator::Percent,
                        '&' => Operator::Ampersand,
                        _ => Operator::Equal,
                    };
                    return Some(Token::Op(op));
                }
                '(' => {
                    self.advance();
                    return Some(Token::LeftParen);
                }
                ')' => {
                    self.advance();
                    return Some(Token::RightParen);
                }
                ',' | ';' => {
                    self.advance();
                    return Some(Token::Comma);
                }
                c if c.is_ascii_digit() || c == '.' => return Some(self.scan_number()),
                c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                    return Some(self.scan_identifier())
                }
                _ => {
                    // Unrecognized characters are dropped
                    self.advance();
                }
            }
        }
    }

    fn scan_string(&mut self) -> Token {
        self.advance(); // Skip opening quote

        let start = self.pos;
        while self.peek_char().map_or(false, |c| c != '"') {
            self.advance();
        }
        let text = self.input[start..self.pos].to_string();

        // Skip closing quote (absent when unterminated)
        self.advance();

        Token::String(text)
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_digit() || c == '.')
        {
            self.advance();
        }
        Token::Number(self.input[start..self.pos].to_string())
    }

    fn scan_identifier(&mut self) -> Token {
        let text = self.take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'));
        let upper = text.to_ascii_uppercase();

        if upper == "TRUE" {
            return Token::Bool(true);
        }
        if upper == "FALSE" {
            return Token::Bool(false);
        }

        match self.peek_char() {
            Some(':') if is_cell_label(text) => {
                self.advance();
                let end = self.take_while(|c| c.is_ascii_alphanumeric() || c == '$');
                Token::Range(format!(
                    "{}:{}",
                    strip_markers(&upper),
                    strip_markers(&end.to_ascii_uppercase())
                ))
            }
            Some('(') => Token::Func(upper),
            _ if is_cell_label(text) => Token::Cell(strip_markers(&upper)),
            _ => Token::String(text.to_string()),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let input = self.input;
        let start = self.pos;
        while self.peek_char().map_or(false, &pred) {
            self.advance();
        }
        &input[start..self.pos]
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_operators() {
        assert_eq!(
            tokenize("1<>2<=3>=4<5>6=7"),
            vec![
                Token::Number("1".into()),
                Token::Op(Operator::NotEqual),
                Token::Number("2".into()),
                Token::Op(Operator::LessEqual),
                Token::Number("3".into()),
                Token::Op(Operator::GreaterEqual),
                Token::Number("4".into()),
                Token::Op(Operator::Less),
                Token::Number("5".into()),
                Token::Op(Operator::Greater),
                Token::Number("6".into()),
                Token::Op(Operator::Equal),
                Token::Number("7".into()),
            ]
        );
    }

    #[test]
    fn test_strings_have_no_escapes() {
        assert_eq!(
            tokenize("\"a b\"&\"c\""),
            vec![
                Token::String("a b".into()),
                Token::Op(Operator::Ampersand),
                Token::String("c".into()),
            ]
        );
        assert_eq!(tokenize("\"open"), vec![Token::String("open".into())]);
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(
            tokenize("sum(b2;true)"),
            vec![
                Token::Func("SUM".into()),
                Token::LeftParen,
                Token::Cell("B2".into()),
                Token::Comma,
                Token::Bool(true),
                Token::RightParen,
            ]
        );
        assert_eq!(tokenize("nb.si("), vec![Token::Func("NB.SI".into()), Token::LeftParen]);
        assert_eq!(tokenize("hello"), vec![Token::String("hello".into())]);
    }

    #[test]
    fn test_ranges_and_markers() {
        assert_eq!(tokenize("a3:c1"), vec![Token::Range("A3:C1".into())]);
        assert_eq!(tokenize("$A$1:$B$2"), vec![Token::Range("A1:B2".into())]);
        assert_eq!(tokenize("$C$3"), vec![Token::Cell("C3".into())]);
        // Malformed second half is kept for the resolver to reject
        assert_eq!(tokenize("A1:B"), vec![Token::Range("A1:B".into())]);
    }

    #[test]
    fn test_numbers_are_not_validated() {
        assert_eq!(tokenize("1.2.3"), vec![Token::Number("1.2.3".into())]);
        assert_eq!(tokenize(".5"), vec![Token::Number(".5".into())]);
    }

    #[test]
    fn test_unknown_characters_skipped() {
        assert_eq!(
            tokenize("1 # + @ 2"),
            vec![
                Token::Number("1".into()),
                Token::Op(Operator::Plus),
                Token::Number("2".into()),
            ]
        );
    }

    #[test]
    fn test_is_cell_label() {
        assert!(is_cell_label("A1"));
        assert!(is_cell_label("$xfd$10"));
        assert!(!is_cell_label("A"));
        assert!(!is_cell_label("1A"));
        assert!(!is_cell_label("LOG10X"));
    }
}
