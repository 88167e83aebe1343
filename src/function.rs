use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::class::Instance;
use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::interpreter::{ExecuteOutcome, Interpreter};
use crate::stmt::FunctionDecl;
use crate::value::{Callable, Value};

/// A user-defined function or method, closing over the environment where it was declared.
///
/// `is_initializer` marks a class's `init` method: its implicit return value is always the bound
/// instance, even when the body returns early with a bare `return;` (§4.6 of `SPEC_FULL.md`).
#[derive(Debug)]
pub struct LoxFunction {
    pub declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> LoxFunction {
        LoxFunction { declaration, closure, is_initializer }
    }

    /// Produces a fresh closure over an environment with `this` bound to `instance`, used when a
    /// method is looked up on an instance rather than called as a bare name.
    pub fn bind(&self, instance: Rc<RefCell<Instance>>) -> LoxFunction {
        let env = Environment::new_enclosed(self.closure.clone());
        env.borrow_mut().define("this", Value::Instance(instance));
        LoxFunction {
            declaration: self.declaration.clone(),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }
}

impl Callable for LoxFunction {
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        let env = Environment::new_enclosed(self.closure.clone());
        for (param, arg) in self.declaration.params.iter().zip(arguments) {
            env.borrow_mut().define(param.lexeme.clone(), arg);
        }

        let outcome = interpreter.execute_block(&self.declaration.body, env)?;

        if self.is_initializer {
            return Ok(Environment::get_at(&self.closure, 0, &this_token()));
        }

        match outcome {
            ExecuteOutcome::Returned(value) => Ok(value),
            ExecuteOutcome::Completed => Ok(Value::Nil),
        }
    }

    fn arity(&self) -> usize {
        self.declaration.params.len()
    }
}

fn this_token() -> crate::token::Token {
    crate::token::Token::new(
        crate::token::Type::This,
        "this".to_string(),
        None,
        crate::token::Location::new(0, 0),
    )
}

type NativeFn = fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError>;

/// A Rust function exposed to Lox code under a fixed name and arity.
pub struct NativeFunction {
    pub name: String,
    arity: usize,
    function: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl Callable for NativeFunction {
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        (self.function)(interpreter, &arguments)
    }

    fn arity(&self) -> usize {
        self.arity
    }
}

/// Installs the small set of natives the evaluator always has in scope: currently just `clock`,
/// a zero-argument function returning seconds since the Unix epoch (§4.6).
pub fn install_globals(env: &Rc<RefCell<Environment>>) {
    env.borrow_mut().define(
        "clock",
        Value::Native(Rc::new(NativeFunction {
            name: "clock".to_string(),
            arity: 0,
            function: |_interpreter, _args| {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .expect("system clock predates the Unix epoch");
                Ok(Value::Number(now.as_secs_f64()))
            },
        })),
    );
}
