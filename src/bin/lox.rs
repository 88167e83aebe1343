//! The CLI front end: a thin collaborator over the `lox_rs` library that turns argv, files, and
//! terminal lines into calls to [`lox_rs::Lox::run`], and turns its errors into the exit codes a
//! shell expects.
//!
//! Reads two environment variables, both optional: `RUST_LOG` (via `env_logger`, standard
//! `log` crate convention) to control log verbosity, and `LOX_HISTORY_FILE` to override where the
//! REPL keeps its line-editing history (defaults to `~/.lox_history`, found via the `home` crate).
//! The core library itself reads no environment variables; this is strictly a CLI concern.

use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use lox_rs::error::LoxError;
use lox_rs::Lox;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const EXIT_USAGE: u8 = 64;
const EXIT_STATIC_ERROR: u8 = 65;
const EXIT_RUNTIME_ERROR: u8 = 70;

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.as_slice() {
        [] => run_prompt(),
        [path] => run_file(path),
        _ => {
            eprintln!("Usage: lox [script]");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn run_file(path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Could not read '{path}': {e}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let stdout: Rc<RefCell<dyn Write>> = Rc::new(RefCell::new(io::stdout()));
    let mut lox = Lox::new(stdout);

    match lox.run(&source) {
        Ok(()) => ExitCode::SUCCESS,
        Err(errors) => {
            let is_runtime = errors.iter().any(LoxError::is_runtime);
            report(&errors);
            ExitCode::from(if is_runtime { EXIT_RUNTIME_ERROR } else { EXIT_STATIC_ERROR })
        }
    }
}

fn run_prompt() -> ExitCode {
    let history_path = history_file_path();

    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Could not start the line editor: {e}");
            return ExitCode::from(EXIT_USAGE);
        }
    };
    let _ = editor.load_history(&history_path);

    let stdout: Rc<RefCell<dyn Write>> = Rc::new(RefCell::new(io::stdout()));
    let mut lox = Lox::new(stdout);

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                if line.trim() == "quit" {
                    break;
                }
                let _ = editor.add_history_entry(line.as_str());
                if let Err(errors) = lox.run(&line) {
                    report_repl(&errors);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Readline error: {e}");
                break;
            }
        }
    }

    let _ = editor.save_history(&history_path);
    ExitCode::SUCCESS
}

/// Static diagnostics (scan/parse/resolve) go to stderr with their `[line:col] message` form;
/// runtime errors go to stdout with a `RuntimeException:` prefix so the REPL's own stdout output
/// carries the same error a batch run would surface as exit code 70 (§6 of `SPEC_FULL.md`).
fn report_repl(errors: &[LoxError]) {
    for error in errors {
        match error {
            LoxError::Runtime(_) => println!("RuntimeException: {error}"),
            _ => eprintln!("{error}"),
        }
    }
}

fn report(errors: &[LoxError]) {
    for error in errors {
        eprintln!("{error}");
    }
}

fn history_file_path() -> PathBuf {
    if let Ok(path) = std::env::var("LOX_HISTORY_FILE") {
        return PathBuf::from(path);
    }
    home::home_dir()
        .map(|home| home.join(".lox_history"))
        .unwrap_or_else(|| PathBuf::from(".lox_history"))
}
