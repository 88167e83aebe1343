//! A tree-walk interpreter for Lox, the language from Nystrom's *Crafting Interpreters*.
//!
//! The pipeline is a straight line: [`scanner::Scanner`] turns source text into tokens,
//! [`parser::Parser`] turns tokens into an AST ([`expr`], [`stmt`]), [`resolver::Resolver`]
//! statically resolves every variable reference to a scope depth, and [`interpreter::Interpreter`]
//! walks the resolved AST to execute it. [`Lox`] wires the four phases together behind a single
//! `run` call; each phase accumulates every error it finds before handing control to the next one,
//! so a single run reports every mistake at its own phase rather than stopping at the first.

pub mod class;
pub mod environment;
pub mod error;
pub mod expr;
pub mod function;
pub mod interpreter;
pub mod literal;
pub mod parser;
pub mod resolver;
pub mod scanner;
pub mod stmt;
pub mod token;
pub mod value;

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use error::LoxError;
use interpreter::Interpreter;
use parser::Parser;
use resolver::Resolver;
use scanner::Scanner;

/// A single Lox interpreter session.
///
/// Holds the evaluator's persistent state (global environment, closures already constructed by
/// earlier calls to `run`), so a REPL can call `run` once per line and have later lines see
/// variables and functions defined by earlier ones.
pub struct Lox {
    interpreter: Interpreter,
}

impl Lox {
    pub fn new(output: Rc<RefCell<dyn Write>>) -> Lox {
        Lox { interpreter: Interpreter::new(output) }
    }

    /// Runs one chunk of source through the full pipeline.
    ///
    /// Returns every error produced by the first phase that fails: all scan errors, or all parse
    /// errors, or all resolve errors, or (since the evaluator halts at its first mistake) exactly
    /// one runtime error. A caller that only cares about success/failure can ignore the
    /// distinction; a caller that needs it (the CLI, choosing an exit code) can use
    /// [`LoxError::is_runtime`].
    pub fn run(&mut self, source: &str) -> Result<(), Vec<LoxError>> {
        let tokens = Scanner::new(source)
            .scan_tokens()
            .map_err(|errors| errors.into_iter().map(LoxError::from).collect::<Vec<_>>())?;

        let statements = Parser::new(tokens)
            .parse()
            .map_err(|errors| errors.into_iter().map(LoxError::from).collect::<Vec<_>>())?;

        let locals = Resolver::new()
            .resolve(&statements)
            .map_err(|errors| errors.into_iter().map(LoxError::from).collect::<Vec<_>>())?;

        self.interpreter.set_locals(locals);
        self.interpreter.interpret(&statements).map_err(|e| vec![LoxError::from(e)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> Result<String, Vec<LoxError>> {
        let output = Rc::new(RefCell::new(Vec::<u8>::new()));
        let mut lox = Lox::new(output.clone());
        lox.run(source)?;
        Ok(String::from_utf8(output.borrow().clone()).unwrap())
    }

    #[test]
    fn runs_a_simple_program() {
        assert_eq!(run("print 1 + 1;").unwrap(), "2\n");
    }

    #[test]
    fn later_statements_see_earlier_declarations_across_separate_run_calls() {
        let output = Rc::new(RefCell::new(Vec::<u8>::new()));
        let mut lox = Lox::new(output.clone());
        lox.run("var greeting = \"hi\";").unwrap();
        lox.run("print greeting;").unwrap();
        assert_eq!(output.borrow().clone(), b"hi\n");
    }

    #[test]
    fn scan_errors_are_reported_without_reaching_the_parser() {
        let errors = run("@;").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], LoxError::Scan(_)));
    }

    #[test]
    fn parse_errors_are_reported_without_reaching_the_resolver() {
        let errors = run("1 +;").unwrap_err();
        assert!(matches!(errors[0], LoxError::Parse(_)));
    }

    #[test]
    fn resolve_errors_are_reported_without_reaching_the_evaluator() {
        let errors = run("{ var a = a; }").unwrap_err();
        assert!(matches!(errors[0], LoxError::Resolve(_)));
    }

    #[test]
    fn runtime_errors_surface_as_a_single_error() {
        let errors = run("print 1 + nil;").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], LoxError::Runtime(_)));
        assert!(errors[0].is_runtime());
    }
}
