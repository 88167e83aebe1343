use std::cell::RefCell;
use std::rc::Rc;

use lox_rs::Lox;

fn run(source: &str) -> String {
    let output = Rc::new(RefCell::new(Vec::<u8>::new()));
    let mut lox = Lox::new(output.clone());
    lox.run(source).expect("program should run without error");
    String::from_utf8(output.borrow().clone()).unwrap()
}

#[test]
fn while_loop_counts_up() {
    assert_eq!(run("var i = 0; while (i < 3) { print i; i = i + 1; }"), "0\n1\n2\n");
}

#[test]
fn for_loop_with_all_three_clauses() {
    let mut expected = String::new();
    for i in 0..5 {
        expected.push_str(&format!("{i}\n"));
    }
    assert_eq!(run("for (var i = 0; i < 5; i = i + 1) print i;"), expected);
}

#[test]
fn for_loop_without_an_initializer_uses_the_enclosing_scope() {
    assert_eq!(run("var i = 0; for (; i < 2; i = i + 1) print i;"), "0\n1\n");
}

#[test]
fn logical_or_short_circuits_and_returns_the_operand_value() {
    assert_eq!(run(r#"print nil or "fallback";"#), "fallback\n");
    assert_eq!(run(r#"print "first" or "second";"#), "first\n");
}

#[test]
fn logical_and_short_circuits_and_returns_the_operand_value() {
    assert_eq!(run("print false and 1;"), "false\n");
    assert_eq!(run("print 1 and 2;"), "2\n");
}

#[test]
fn recursive_function_computes_fibonacci() {
    let source = r#"
        fun fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        print fib(10);
    "#;
    assert_eq!(run(source), "55\n");
}

#[test]
fn early_return_from_inside_nested_blocks_skips_the_rest_of_the_function() {
    let source = r#"
        fun f() {
            if (true) {
                return "early";
            }
            return "late";
        }
        print f();
    "#;
    assert_eq!(run(source), "early\n");
}
