use std::error::Error as StdError;
use std::fmt;

use crate::token::{Location, Token, Type};

/// A lexical error raised by the scanner (an unterminated string, an unexpected character, …).
#[derive(Debug, Clone, PartialEq)]
pub struct ScanError {
    pub location: Location,
    pub message: String,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[line {}:{}] Error: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

impl StdError for ScanError {}

/// A syntax error raised by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = self.token.location;
        if self.token.kind == Type::Eof {
            write!(f, "[line {}:{}] Error at end: {}", location.line, location.column, self.message)
        } else {
            write!(
                f,
                "[line {}:{}] Error at '{}': {}",
                location.line, location.column, self.token.lexeme, self.message
            )
        }
    }
}

impl StdError for ParseError {}

/// A static scoping error raised by the resolver (duplicate declaration, `this` outside a class,
/// reading a variable inside its own initializer, …).
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveError {
    pub token: Token,
    pub message: String,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[line {}:{}] Error at '{}': {}",
            self.token.location.line, self.token.location.column, self.token.lexeme, self.message
        )
    }
}

impl StdError for ResolveError {}

/// A dynamic error raised while evaluating the AST: type mismatches, undefined names, arity
/// mismatches, missing properties, and so on. The evaluator stops at the first one.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        RuntimeError { token, message: message.into() }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[line {}:{}] Error at '{}': {}",
            self.token.location.line, self.token.location.column, self.token.lexeme, self.message
        )
    }
}

impl StdError for RuntimeError {}

/// Any error the pipeline can surface to its caller, uniting the four phase-specific kinds so the
/// CLI collaborator (or any other host) can handle them uniformly without matching on phase.
#[derive(Debug, Clone, PartialEq)]
pub enum LoxError {
    Scan(ScanError),
    Parse(ParseError),
    Resolve(ResolveError),
    Runtime(RuntimeError),
}

impl fmt::Display for LoxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoxError::Scan(e) => write!(f, "{e}"),
            LoxError::Parse(e) => write!(f, "{e}"),
            LoxError::Resolve(e) => write!(f, "{e}"),
            LoxError::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl StdError for LoxError {}

impl From<ScanError> for LoxError {
    fn from(e: ScanError) -> Self {
        LoxError::Scan(e)
    }
}

impl From<ParseError> for LoxError {
    fn from(e: ParseError) -> Self {
        LoxError::Parse(e)
    }
}

impl From<ResolveError> for LoxError {
    fn from(e: ResolveError) -> Self {
        LoxError::Resolve(e)
    }
}

impl From<RuntimeError> for LoxError {
    fn from(e: RuntimeError) -> Self {
        LoxError::Runtime(e)
    }
}

/// Whether a batch of [`LoxError`]s came from a static phase (scan/parse/resolve) or from the
/// evaluator, which the CLI collaborator uses to pick an exit code (§6, §7 of `SPEC_FULL.md`).
impl LoxError {
    pub fn is_runtime(&self) -> bool {
        matches!(self, LoxError::Runtime(_))
    }
}
