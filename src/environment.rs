use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::token::Token;
use crate::value::Value;

/// A lexical scope: a map of names to values, plus an optional link to the enclosing scope.
///
/// Scopes form a chain from the innermost block out to the global environment. Shared via
/// `Rc<RefCell<_>>` because closures capture a live reference to their defining environment
/// rather than a snapshot of it.
#[derive(Debug)]
pub struct Environment {
    enclosing: Option<Rc<RefCell<Environment>>>,
    values: HashMap<String, Value>,
}

impl Environment {
    pub fn new_global() -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment { enclosing: None, values: HashMap::new() }))
    }

    pub fn new_enclosed(enclosing: Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment { enclosing: Some(enclosing), values: HashMap::new() }))
    }

    /// Binds `name` in this environment, shadowing any binding of the same name in an enclosing
    /// scope. Re-declaring a name in the same scope silently overwrites it (the resolver is what
    /// rejects duplicate declarations within a single block).
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(&name.lexeme) {
            return Ok(value.clone());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow().get(name);
        }

        Err(RuntimeError::new(name.clone(), format!("Undefined variable '{}'", name.lexeme)))
    }

    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if self.values.contains_key(&name.lexeme) {
            self.values.insert(name.lexeme.clone(), value);
            return Ok(());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow_mut().assign(name, value);
        }

        Err(RuntimeError::new(name.clone(), format!("Undefined variable '{}'", name.lexeme)))
    }

    fn ancestor(env: Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut current = env;
        for _ in 0..distance {
            let next = current
                .borrow()
                .enclosing
                .clone()
                .expect("resolved distance exceeds the environment chain's depth");
            current = next;
        }
        current
    }

    /// Reads `name` directly from the environment `distance` links up the chain, skipping the
    /// local-then-enclosing search `get` performs. `distance` comes from the resolver's bind-depth
    /// table, so it is assumed to be accurate for this expression.
    pub fn get_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &Token) -> Value {
        Environment::ancestor(env.clone(), distance)
            .borrow()
            .values
            .get(&name.lexeme)
            .cloned()
            .expect("resolver-computed distance points at a scope holding this name")
    }

    pub fn assign_at(env: &Rc<RefCell<Environment>>, distance: usize, name: &Token, value: Value) {
        Environment::ancestor(env.clone(), distance)
            .borrow_mut()
            .values
            .insert(name.lexeme.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Location, Type};

    fn ident(name: &str) -> Token {
        Token::new(Type::Identifier, name.to_string(), None, Location::new(1, 1))
    }

    #[test]
    fn reads_back_a_defined_variable() {
        let env = Environment::new_global();
        env.borrow_mut().define("x", Value::Number(1.0));
        assert_eq!(env.borrow().get(&ident("x")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn undefined_variable_is_a_runtime_error() {
        let env = Environment::new_global();
        assert!(env.borrow().get(&ident("missing")).is_err());
    }

    #[test]
    fn child_scope_sees_parent_bindings() {
        let global = Environment::new_global();
        global.borrow_mut().define("x", Value::Number(1.0));
        let child = Environment::new_enclosed(global);
        assert_eq!(child.borrow().get(&ident("x")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn assign_updates_enclosing_scope_not_a_local_shadow() {
        let global = Environment::new_global();
        global.borrow_mut().define("x", Value::Number(1.0));
        let child = Environment::new_enclosed(global.clone());
        child.borrow_mut().assign(&ident("x"), Value::Number(2.0)).unwrap();
        assert_eq!(global.borrow().get(&ident("x")).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn get_at_reads_directly_from_the_resolved_ancestor() {
        let global = Environment::new_global();
        global.borrow_mut().define("x", Value::Number(1.0));
        let child = Environment::new_enclosed(global);
        child.borrow_mut().define("x", Value::Number(2.0));
        assert_eq!(Environment::get_at(&child, 0, &ident("x")), Value::Number(2.0));
        assert_eq!(Environment::get_at(&child, 1, &ident("x")), Value::Number(1.0));
    }
}
