use std::str::Chars;

use peekmore::{PeekMore, PeekMoreIterator};

use crate::error::ScanError;
use crate::literal::Literal;
use crate::token::{Location, Token, Type};

/// Converts a UTF-8 source string into a sequence of [`Token`]s, terminated by `EOF`.
///
/// Scanning never stops at the first bad character: every [`ScanError`] encountered is collected
/// so a single run can report every lexical mistake in the source, matching the parser and
/// resolver's "accumulate, don't bail" behaviour (see `SPEC_FULL.md` §4.1).
pub struct Scanner<'a> {
    source: PeekMoreIterator<Chars<'a>>,
    tokens: Vec<Token>,
    errors: Vec<ScanError>,
    start_column: usize,
    current_column: usize,
    line: usize,
}

const KEYWORDS: &[(&str, Type)] = &[
    ("and", Type::And),
    ("class", Type::Class),
    ("else", Type::Else),
    ("false", Type::False),
    ("for", Type::For),
    ("fun", Type::Fun),
    ("if", Type::If),
    ("nil", Type::Nil),
    ("or", Type::Or),
    ("print", Type::Print),
    ("return", Type::Return),
    ("super", Type::Super),
    ("this", Type::This),
    ("true", Type::True),
    ("var", Type::Var),
    ("while", Type::While),
];

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Scanner<'a> {
        Scanner {
            source: source.chars().peekmore(),
            tokens: Vec::new(),
            errors: Vec::new(),
            start_column: 0,
            current_column: 0,
            line: 1,
        }
    }

    /// Scans the whole source and returns the tokens produced, or every scan error encountered.
    pub fn scan_tokens(mut self) -> Result<Vec<Token>, Vec<ScanError>> {
        log::debug!("scanner: starting");
        while !self.is_at_end() {
            self.start_column = self.current_column;
            self.scan_token();
        }

        self.tokens.push(Token::new(
            Type::Eof,
            String::new(),
            None,
            Location::new(self.line, self.current_column),
        ));

        if self.errors.is_empty() {
            log::debug!("scanner: produced {} tokens", self.tokens.len());
            Ok(self.tokens)
        } else {
            log::debug!("scanner: {} error(s)", self.errors.len());
            Err(self.errors)
        }
    }

    fn is_at_end(&mut self) -> bool {
        self.source.peek().is_none()
    }

    fn advance(&mut self) -> char {
        let c = self.source.next().expect("advance past end of source");
        self.current_column += 1;
        c
    }

    fn peek(&mut self) -> char {
        self.source.peek().copied().unwrap_or('\0')
    }

    fn peek_next(&mut self) -> char {
        self.source.peek_next().copied().unwrap_or('\0')
    }

    fn match_next(&mut self, expected: char) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn here(&self) -> Location {
        Location::new(self.line, self.start_column)
    }

    fn add_token(&mut self, kind: Type, lexeme: String, literal: Option<Literal>) {
        self.tokens.push(Token::new(kind, lexeme, literal, self.here()));
    }

    fn error(&mut self, location: Location, message: impl Into<String>) {
        self.errors.push(ScanError { location, message: message.into() });
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            '(' => self.add_token(Type::LeftParen, c.to_string(), None),
            ')' => self.add_token(Type::RightParen, c.to_string(), None),
            '{' => self.add_token(Type::LeftBrace, c.to_string(), None),
            '}' => self.add_token(Type::RightBrace, c.to_string(), None),
            ',' => self.add_token(Type::Comma, c.to_string(), None),
            '.' => self.add_token(Type::Dot, c.to_string(), None),
            '-' => self.add_token(Type::Minus, c.to_string(), None),
            '+' => self.add_token(Type::Plus, c.to_string(), None),
            ';' => self.add_token(Type::Semicolon, c.to_string(), None),
            '*' => self.add_token(Type::Star, c.to_string(), None),

            '!' => {
                if self.match_next('=') {
                    self.add_token(Type::BangEqual, "!=".to_string(), None);
                } else {
                    self.add_token(Type::Bang, "!".to_string(), None);
                }
            }
            '=' => {
                if self.match_next('=') {
                    self.add_token(Type::EqualEqual, "==".to_string(), None);
                } else {
                    self.add_token(Type::Equal, "=".to_string(), None);
                }
            }
            '<' => {
                if self.match_next('=') {
                    self.add_token(Type::LessEqual, "<=".to_string(), None);
                } else {
                    self.add_token(Type::Less, "<".to_string(), None);
                }
            }
            '>' => {
                if self.match_next('=') {
                    self.add_token(Type::GreaterEqual, ">=".to_string(), None);
                } else {
                    self.add_token(Type::Greater, ">".to_string(), None);
                }
            }
            '/' => {
                if self.match_next('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else {
                    self.add_token(Type::Slash, "/".to_string(), None);
                }
            }

            ' ' | '\r' | '\t' => {}
            '\n' => {
                self.line += 1;
                self.current_column = 0;
            }

            '"' => self.string(),

            c if c.is_ascii_digit() => self.number(c),
            c if c.is_alphabetic() || c == '_' => self.identifier(c),

            c => self.error(self.here(), format!("Unexpected character '{c}'")),
        }
    }

    fn string(&mut self) {
        let start = self.here();
        let mut value = String::new();

        while self.peek() != '"' && !self.is_at_end() {
            let c = self.advance();
            if c == '\n' {
                self.line += 1;
                self.current_column = 0;
            }
            value.push(c);
        }

        if self.is_at_end() {
            self.error(start, "Unterminated string");
            return;
        }

        self.advance(); // closing quote

        // The lexeme includes the quotes; the literal does not.
        self.add_token(Type::String, format!("\"{value}\""), Some(Literal::String(value)));
    }

    fn number(&mut self, first: char) {
        let mut value = String::from(first);

        while self.peek().is_ascii_digit() {
            value.push(self.advance());
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            value.push(self.advance()); // the dot
            while self.peek().is_ascii_digit() {
                value.push(self.advance());
            }
        }

        let n: f64 = value.parse().expect("scanned digits to parse as f64");
        self.add_token(Type::Number, value, Some(Literal::Number(n)));
    }

    fn identifier(&mut self, first: char) {
        let mut value = String::from(first);

        while self.peek().is_alphanumeric() || self.peek() == '_' {
            value.push(self.advance());
        }

        let kind = KEYWORDS
            .iter()
            .find(|(kw, _)| *kw == value)
            .map(|(_, kind)| *kind)
            .unwrap_or(Type::Identifier);

        self.add_token(kind, value, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Type> {
        Scanner::new(source)
            .scan_tokens()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn scans_punctuation_and_operators() {
        assert_eq!(
            kinds("(){}==!=<=>=<>"),
            vec![
                Type::LeftParen, Type::RightParen, Type::LeftBrace, Type::RightBrace,
                Type::EqualEqual, Type::BangEqual, Type::LessEqual, Type::GreaterEqual,
                Type::Less, Type::Greater, Type::Eof,
            ]
        );
    }

    #[test]
    fn skips_line_comments() {
        assert_eq!(kinds("1 // ignore me\n+ 2"), vec![Type::Number, Type::Plus, Type::Number, Type::Eof]);
    }

    #[test]
    fn scans_string_literal_without_quotes() {
        let tokens = Scanner::new("\"hi there\"").scan_tokens().unwrap();
        assert_eq!(tokens[0].literal, Some(Literal::String("hi there".to_string())));
        assert_eq!(tokens[0].lexeme, "\"hi there\"");
    }

    #[test]
    fn unterminated_string_is_a_scan_error() {
        let errors = Scanner::new("\"oops").scan_tokens().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unterminated string");
    }

    #[test]
    fn number_does_not_consume_trailing_dot() {
        let tokens = Scanner::new("1.").scan_tokens().unwrap();
        assert_eq!(tokens[0].kind, Type::Number);
        assert_eq!(tokens[0].literal, Some(Literal::Number(1.0)));
        assert_eq!(tokens[1].kind, Type::Dot);
    }

    #[test]
    fn recognizes_keywords_and_identifiers() {
        assert_eq!(kinds("nil orchard or"), vec![Type::Nil, Type::Identifier, Type::Or, Type::Eof]);
    }

    #[test]
    fn collects_every_scan_error_in_one_pass() {
        let errors = Scanner::new("@ # $").scan_tokens().unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
