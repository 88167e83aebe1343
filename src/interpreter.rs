use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use crate::class::{Class, Instance};
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::expr::{Expr, NodeId};
use crate::function::{install_globals, LoxFunction};
use crate::stmt::{ClassData, Stmt};
use crate::token::{Token, Type};
use crate::value::Value;

/// What finished executing a sequence of statements: either it ran to completion, or a `return`
/// fired partway through and carried a value out.
///
/// `return` is not an error (§4.4 of `SPEC_FULL.md`): it is ordinary control flow that unwinds
/// exactly to the nearest enclosing function call, which is why it is threaded through the
/// `Result<Signal, RuntimeError>` statement-execution type rather than through `RuntimeError`.
pub enum ExecuteOutcome {
    Completed,
    Returned(Value),
}

enum Signal {
    Normal,
    Return(Value),
}

type ExecResult = Result<Signal, RuntimeError>;

/// The statement kind's name, for the per-statement `trace` log (§10 of `SPEC_FULL.md`) — never
/// used for control flow, just a cheap label so `RUST_LOG=lox=trace` can show the step-by-step
/// shape of a run without matching on every field.
fn stmt_kind(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::Expression(_) => "expression",
        Stmt::Print(_) => "print",
        Stmt::Var(_) => "var",
        Stmt::Block(_) => "block",
        Stmt::If(_) => "if",
        Stmt::While(_) => "while",
        Stmt::Function(_) => "function",
        Stmt::Return(_) => "return",
        Stmt::Class(_) => "class",
    }
}

/// Walks the resolved AST, evaluating expressions and executing statements against a chain of
/// environments rooted at `globals`.
pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<NodeId, usize>,
    output: Rc<RefCell<dyn Write>>,
}

impl Interpreter {
    /// `output` is reference-counted rather than owned outright so a caller (a test, or the REPL)
    /// can keep its own handle to the sink and inspect or flush it after `interpret` returns.
    pub fn new(output: Rc<RefCell<dyn Write>>) -> Interpreter {
        let globals = Environment::new_global();
        install_globals(&globals);
        Interpreter { environment: globals.clone(), globals, locals: HashMap::new(), output }
    }

    pub fn set_locals(&mut self, locals: HashMap<NodeId, usize>) {
        self.locals = locals;
    }

    /// Executes a whole program. Stops at the first `RuntimeError`, matching the evaluator's
    /// "one error halts the run" policy (§4.4, §7).
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        log::debug!("interpreter: starting");
        for stmt in statements {
            self.execute(stmt)?;
        }
        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> ExecResult {
        log::trace!("interpreter: executing {}", stmt_kind(stmt));
        match stmt {
            Stmt::Expression(data) => {
                self.evaluate(&data.expr)?;
                Ok(Signal::Normal)
            }
            Stmt::Print(data) => {
                let value = self.evaluate(&data.expr)?;
                writeln!(self.output.borrow_mut(), "{}", value.stringify())
                    .expect("writing to the interpreter's output sink should not fail");
                Ok(Signal::Normal)
            }
            Stmt::Var(data) => {
                let value = match &data.initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.environment.borrow_mut().define(data.name.lexeme.clone(), value);
                Ok(Signal::Normal)
            }
            Stmt::Block(data) => {
                let env = Environment::new_enclosed(self.environment.clone());
                self.execute_statements_in(&data.statements, env)
            }
            Stmt::If(data) => {
                if self.evaluate(&data.condition)?.is_truthy() {
                    self.execute(&data.then_branch)
                } else if let Some(else_branch) = &data.else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Signal::Normal)
                }
            }
            Stmt::While(data) => {
                while self.evaluate(&data.condition)?.is_truthy() {
                    match self.execute(&data.body)? {
                        Signal::Normal => {}
                        returned @ Signal::Return(_) => return Ok(returned),
                    }
                }
                Ok(Signal::Normal)
            }
            Stmt::Function(decl) => {
                let function = LoxFunction::new(decl.clone(), self.environment.clone(), false);
                self.environment
                    .borrow_mut()
                    .define(decl.name.lexeme.clone(), Value::Function(Rc::new(function)));
                Ok(Signal::Normal)
            }
            Stmt::Return(data) => {
                let value = match &data.value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(Signal::Return(value))
            }
            Stmt::Class(data) => self.execute_class(data),
        }
    }

    fn execute_class(&mut self, data: &ClassData) -> ExecResult {
        let superclass = match &data.superclass {
            Some(var) => {
                let value = self.look_up_variable(var.id, &var.name)?;
                match value {
                    Value::Class(class) => Some(class),
                    _ => {
                        return Err(RuntimeError::new(var.name.clone(), "Superclass must be a class"));
                    }
                }
            }
            None => None,
        };

        self.environment.borrow_mut().define(data.name.lexeme.clone(), Value::Nil);

        let previous_environment = self.environment.clone();
        if let Some(superclass) = &superclass {
            self.environment = Environment::new_enclosed(self.environment.clone());
            self.environment.borrow_mut().define("super", Value::Class(superclass.clone()));
        }

        let mut methods = HashMap::new();
        for method in &data.methods {
            let is_initializer = method.name.lexeme == "init";
            let function = LoxFunction::new(method.clone(), self.environment.clone(), is_initializer);
            methods.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = Rc::new(Class::new(data.name.lexeme.clone(), methods, superclass.clone()));

        self.environment = previous_environment;

        self.environment
            .borrow_mut()
            .assign(&data.name, Value::Class(class))
            .expect("class name was just defined in this scope");

        Ok(Signal::Normal)
    }

    /// Runs `statements` in `env`, restoring the previous environment afterwards even if a
    /// `return` or runtime error unwinds out early.
    fn execute_statements_in(&mut self, statements: &[Stmt], env: Rc<RefCell<Environment>>) -> ExecResult {
        let previous = std::mem::replace(&mut self.environment, env);

        let mut result = Signal::Normal;
        let mut error = None;
        for stmt in statements {
            match self.execute(stmt) {
                Ok(Signal::Normal) => continue,
                Ok(returned @ Signal::Return(_)) => {
                    result = returned;
                    break;
                }
                Err(e) => {
                    error = Some(e);
                    break;
                }
            }
        }

        self.environment = previous;

        match error {
            Some(e) => Err(e),
            None => Ok(result),
        }
    }

    /// Entry point used by function and method calls: runs `body` in a fresh environment enclosed
    /// by `closure` and reports whether it returned a value.
    pub fn execute_block(
        &mut self,
        body: &[Stmt],
        closure_env: Rc<RefCell<Environment>>,
    ) -> Result<ExecuteOutcome, RuntimeError> {
        match self.execute_statements_in(body, closure_env)? {
            Signal::Normal => Ok(ExecuteOutcome::Completed),
            Signal::Return(value) => Ok(ExecuteOutcome::Returned(value)),
        }
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from_literal(literal)),
            Expr::Grouping(data) => self.evaluate(&data.expression),
            Expr::Unary(data) => {
                let right = self.evaluate(&data.right)?;
                match data.operator.kind {
                    Type::Minus => right.negate(&data.operator),
                    Type::Bang => Ok(Value::Bool(!right.is_truthy())),
                    _ => unreachable!("parser only produces '-' or '!' as a unary operator"),
                }
            }
            Expr::Binary(data) => {
                let left = self.evaluate(&data.left)?;
                let right = self.evaluate(&data.right)?;
                match data.operator.kind {
                    Type::Minus => left.subtract(&right, &data.operator),
                    Type::Slash => left.divide(&right, &data.operator),
                    Type::Star => left.multiply(&right, &data.operator),
                    Type::Plus => left.add(&right, &data.operator),
                    Type::Greater => left.greater(&right, &data.operator),
                    Type::GreaterEqual => left.greater_equal(&right, &data.operator),
                    Type::Less => left.less(&right, &data.operator),
                    Type::LessEqual => left.less_equal(&right, &data.operator),
                    Type::BangEqual => Ok(Value::Bool(!left.is_equal(&right))),
                    Type::EqualEqual => Ok(Value::Bool(left.is_equal(&right))),
                    _ => unreachable!("parser only produces arithmetic/comparison/equality tokens here"),
                }
            }
            Expr::Logical(data) => {
                let left = self.evaluate(&data.left)?;
                match data.operator.kind {
                    Type::Or if left.is_truthy() => Ok(left),
                    Type::Or => self.evaluate(&data.right),
                    Type::And if !left.is_truthy() => Ok(left),
                    Type::And => self.evaluate(&data.right),
                    _ => unreachable!("parser only produces 'and'/'or' as a logical operator"),
                }
            }
            Expr::Variable(data) => self.look_up_variable(data.id, &data.name),
            Expr::Assign(data) => {
                let value = self.evaluate(&data.value)?;
                match self.locals.get(&data.id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, &data.name, value.clone());
                    }
                    None => {
                        self.globals.borrow_mut().assign(&data.name, value.clone())?;
                    }
                }
                Ok(value)
            }
            Expr::Call(data) => self.evaluate_call(data),
            Expr::Get(data) => {
                let object = self.evaluate(&data.object)?;
                match object {
                    Value::Instance(instance) => Instance::get(&instance, &data.name),
                    _ => Err(RuntimeError::new(data.name.clone(), "Only instances have properties")),
                }
            }
            Expr::Set(data) => {
                let object = self.evaluate(&data.object)?;
                match object {
                    Value::Instance(instance) => {
                        let value = self.evaluate(&data.value)?;
                        instance.borrow_mut().set(&data.name, value.clone());
                        Ok(value)
                    }
                    _ => Err(RuntimeError::new(data.name.clone(), "Only instances have fields")),
                }
            }
            Expr::This(data) => self.look_up_variable(data.id, &data.keyword),
            Expr::Super(data) => self.evaluate_super(data),
        }
    }

    fn evaluate_call(&mut self, data: &crate::expr::CallData) -> Result<Value, RuntimeError> {
        let callee = self.evaluate(&data.callee)?;

        let mut arguments = Vec::with_capacity(data.arguments.len());
        for arg in &data.arguments {
            arguments.push(self.evaluate(arg)?);
        }

        let callable = callee
            .as_callable()
            .ok_or_else(|| RuntimeError::new(data.paren.clone(), "Can only call functions and classes"))?;

        if arguments.len() != callable.arity() {
            return Err(RuntimeError::new(
                data.paren.clone(),
                format!("Expected {} arguments but got {}", callable.arity(), arguments.len()),
            ));
        }

        callable.call(self, arguments)
    }

    fn evaluate_super(&mut self, data: &crate::expr::SuperData) -> Result<Value, RuntimeError> {
        let distance = *self
            .locals
            .get(&data.id)
            .expect("resolver always resolves a 'super' expression to a local distance");

        let super_token = Token::new(Type::Super, "super".to_string(), None, data.keyword.location);
        let superclass = match Environment::get_at(&self.environment, distance, &super_token) {
            Value::Class(class) => class,
            _ => unreachable!("'super' always resolves to a class value"),
        };

        let this_token = Token::new(Type::This, "this".to_string(), None, data.keyword.location);
        let instance = match Environment::get_at(&self.environment, distance - 1, &this_token) {
            Value::Instance(instance) => instance,
            _ => unreachable!("'this' always resolves to an instance value one scope inside 'super'"),
        };

        let method = superclass.find_method(&data.method.lexeme).ok_or_else(|| {
            RuntimeError::new(data.method.clone(), format!("Undefined property '{}'", data.method.lexeme))
        })?;

        Ok(Value::Function(Rc::new(method.bind(instance))))
    }

    fn look_up_variable(&self, id: NodeId, name: &Token) -> Result<Value, RuntimeError> {
        match self.locals.get(&id) {
            Some(&distance) => Ok(Environment::get_at(&self.environment, distance, name)),
            None => self.globals.borrow().get(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;

    fn run(source: &str) -> String {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        let statements = Parser::new(tokens).parse().unwrap();
        let locals = Resolver::new().resolve(&statements).unwrap();

        let output = Rc::new(RefCell::new(Vec::<u8>::new()));
        let mut interpreter = Interpreter::new(output.clone());
        interpreter.set_locals(locals);
        interpreter.interpret(&statements).unwrap();

        String::from_utf8(output.borrow().clone()).unwrap()
    }

    #[test]
    fn prints_arithmetic() {
        assert_eq!(run("print 1 + 2 * 3;"), "7\n");
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(run(r#"print "a" + "b";"#), "ab\n");
    }

    #[test]
    fn closures_capture_their_defining_environment() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() {
                    i = i + 1;
                    print i;
                }
                return count;
            }
            var counter = makeCounter();
            counter();
            counter();
        "#;
        assert_eq!(run(source), "1\n2\n");
    }

    #[test]
    fn classes_construct_instances_and_bind_methods() {
        let source = r#"
            class Greeter {
                init(name) {
                    this.name = name;
                }
                greet() {
                    print "hi " + this.name;
                }
            }
            var g = Greeter("Ana");
            g.greet();
        "#;
        assert_eq!(run(source), "hi Ana\n");
    }

    #[test]
    fn inheritance_dispatches_to_the_overriding_method_and_super_reaches_the_parent() {
        let source = r#"
            class A {
                speak() { print "A"; }
            }
            class B < A {
                speak() {
                    super.speak();
                    print "B";
                }
            }
            B().speak();
        "#;
        assert_eq!(run(source), "A\nB\n");
    }

    #[test]
    fn for_loop_runs_to_completion() {
        assert_eq!(run("for (var i = 0; i < 3; i = i + 1) print i;"), "0\n1\n2\n");
    }

    #[test]
    fn undefined_variable_is_a_runtime_error() {
        let tokens = Scanner::new("print x;").scan_tokens().unwrap();
        let statements = Parser::new(tokens).parse().unwrap();
        let locals = Resolver::new().resolve(&statements).unwrap();
        let output = Rc::new(RefCell::new(Vec::<u8>::new()));
        let mut interpreter = Interpreter::new(output);
        interpreter.set_locals(locals);
        let err = interpreter.interpret(&statements).unwrap_err();
        assert!(err.message.contains("Undefined variable"));
    }
}
