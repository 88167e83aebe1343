use std::cell::RefCell;
use std::rc::Rc;

use lox_rs::Lox;

fn run_err(source: &str) -> Vec<String> {
    let output = Rc::new(RefCell::new(Vec::<u8>::new()));
    let mut lox = Lox::new(output);
    let errors = lox.run(source).expect_err("program should fail to run");
    errors.iter().map(|e| e.to_string()).collect()
}

#[test]
fn scanner_reports_every_unexpected_character_in_one_pass() {
    let errors = run_err("var a = 1 @ 2 # 3;");
    assert_eq!(errors.len(), 2);
}

#[test]
fn parser_recovers_after_a_syntax_error_and_keeps_looking() {
    let errors = run_err("var ; var b = 2 var c = 3;");
    assert!(errors.len() >= 2, "expected recovery to surface more than one error, got: {errors:?}");
}

#[test]
fn resolver_rejects_this_outside_a_class() {
    let errors = run_err("print this;");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("'this' outside of a class"));
}

#[test]
fn resolver_rejects_returning_a_value_from_an_initializer() {
    let errors = run_err(
        r#"
        class Thing {
            init() { return 1; }
        }
    "#,
    );
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("return a value from an initializer"));
}

#[test]
fn unterminated_string_is_reported_with_its_starting_location() {
    let errors = run_err("var s = \"never closed;");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Unterminated string"));
}
