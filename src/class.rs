use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::function::LoxFunction;
use crate::interpreter::Interpreter;
use crate::token::Token;
use crate::value::{Callable, Value};

/// A class declaration: its name, its own methods, and (optionally) the class it extends.
///
/// Method lookup walks the superclass chain (`find_method`), and calling the class constructs an
/// `Instance` and, if an `init` method exists, runs it and returns the instance regardless of
/// what `init` itself returns (§4.6).
#[derive(Debug, Clone)]
pub struct Class {
    pub name: String,
    methods: HashMap<String, Rc<LoxFunction>>,
    superclass: Option<Rc<Class>>,
}

impl Class {
    pub fn new(
        name: String,
        methods: HashMap<String, Rc<LoxFunction>>,
        superclass: Option<Rc<Class>>,
    ) -> Class {
        Class { name, methods, superclass }
    }

    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }
        self.superclass.as_ref().and_then(|s| s.find_method(name))
    }
}

impl Callable for Class {
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, RuntimeError> {
        let instance = Rc::new(RefCell::new(Instance {
            class: Rc::new(self.clone()),
            fields: HashMap::new(),
        }));

        if let Some(initializer) = self.find_method("init") {
            initializer.bind(instance.clone()).call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }

    fn arity(&self) -> usize {
        self.find_method("init").map(|init| init.arity()).unwrap_or(0)
    }
}

/// A live object: a reference to its class plus its own mutable field map.
#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    /// A field shadows a method of the same name. Methods are bound to this instance the moment
    /// they're looked up, producing a fresh closure each time (§4.6 "Get" operation).
    pub fn get(this: &Rc<RefCell<Instance>>, name: &Token) -> Result<Value, RuntimeError> {
        let borrowed = this.borrow();
        if let Some(value) = borrowed.fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(method) = borrowed.class.find_method(&name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(this.clone()))));
        }

        Err(RuntimeError::new(name.clone(), format!("Undefined property '{}'", name.lexeme)))
    }

    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}
