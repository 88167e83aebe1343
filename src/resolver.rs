use std::collections::HashMap;
use std::mem;

use crate::error::ResolveError;
use crate::expr::{Expr, NodeId};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::Token;

#[derive(Clone, Copy, PartialEq)]
enum FunctionKind {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Clone, Copy, PartialEq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

/// A static pass between parsing and evaluation that computes, for every `Variable`, `Assign`,
/// `This` and `Super` node, how many environment links separate its use from the scope that
/// declares it.
///
/// Runs once over the whole program and returns a plain `NodeId -> depth` map rather than
/// mutating an evaluator in place, so the pipeline's phases stay decoupled: the resolver knows
/// nothing about `Interpreter`, and the interpreter only ever consults the finished map (§4.3 of
/// `SPEC_FULL.md`). A name with no entry in the map is assumed global.
pub struct Resolver {
    scopes: Vec<HashMap<String, bool>>,
    locals: HashMap<NodeId, usize>,
    errors: Vec<ResolveError>,
    current_function: FunctionKind,
    current_class: ClassKind,
}

impl Resolver {
    pub fn new() -> Resolver {
        Resolver {
            scopes: Vec::new(),
            locals: HashMap::new(),
            errors: Vec::new(),
            current_function: FunctionKind::None,
            current_class: ClassKind::None,
        }
    }

    pub fn resolve(mut self, statements: &[Stmt]) -> Result<HashMap<NodeId, usize>, Vec<ResolveError>> {
        log::debug!("resolver: starting");
        self.resolve_statements(statements);

        if self.errors.is_empty() {
            log::debug!("resolver: resolved {} local reference(s)", self.locals.len());
            Ok(self.locals)
        } else {
            log::debug!("resolver: {} error(s)", self.errors.len());
            Err(self.errors)
        }
    }

    fn resolve_statements(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.errors.push(ResolveError {
                    token: name.clone(),
                    message: "Already a variable with this name in this scope".to_string(),
                });
            }
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn resolve_local(&mut self, id: NodeId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                self.locals.insert(id, depth);
                return;
            }
        }
        // Not found in any local scope: treated as global, no entry needed.
    }

    fn resolve_function(&mut self, function: &FunctionDecl, kind: FunctionKind) {
        let enclosing_function = mem::replace(&mut self.current_function, kind);

        self.begin_scope();
        for param in &function.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_statements(&function.body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expression(data) => self.resolve_expr(&data.expr),
            Stmt::Print(data) => self.resolve_expr(&data.expr),
            Stmt::Var(data) => {
                self.declare(&data.name);
                if let Some(initializer) = &data.initializer {
                    self.resolve_expr(initializer);
                }
                self.define(&data.name);
            }
            Stmt::Block(data) => {
                self.begin_scope();
                self.resolve_statements(&data.statements);
                self.end_scope();
            }
            Stmt::If(data) => {
                self.resolve_expr(&data.condition);
                self.resolve_stmt(&data.then_branch);
                if let Some(else_branch) = &data.else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While(data) => {
                self.resolve_expr(&data.condition);
                self.resolve_stmt(&data.body);
            }
            Stmt::Function(decl) => {
                self.declare(&decl.name);
                self.define(&decl.name);
                self.resolve_function(decl, FunctionKind::Function);
            }
            Stmt::Return(data) => {
                if self.current_function == FunctionKind::None {
                    self.errors.push(ResolveError {
                        token: data.keyword.clone(),
                        message: "Can't return from top-level code".to_string(),
                    });
                }
                if let Some(value) = &data.value {
                    if self.current_function == FunctionKind::Initializer {
                        self.errors.push(ResolveError {
                            token: data.keyword.clone(),
                            message: "Can't return a value from an initializer".to_string(),
                        });
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::Class(data) => self.resolve_class(data),
        }
    }

    fn resolve_class(&mut self, data: &crate::stmt::ClassData) {
        let enclosing_class = mem::replace(&mut self.current_class, ClassKind::Class);

        self.declare(&data.name);
        self.define(&data.name);

        if let Some(superclass) = &data.superclass {
            if superclass.name.lexeme == data.name.lexeme {
                self.errors.push(ResolveError {
                    token: superclass.name.clone(),
                    message: "A class can't inherit from itself".to_string(),
                });
            }
            self.current_class = ClassKind::Subclass;
            self.resolve_local(superclass.id, &superclass.name);

            self.begin_scope();
            self.scopes.last_mut().expect("scope just pushed").insert("super".to_string(), true);
        }

        self.begin_scope();
        self.scopes.last_mut().expect("scope just pushed").insert("this".to_string(), true);

        for method in &data.methods {
            let kind = if method.name.lexeme == "init" { FunctionKind::Initializer } else { FunctionKind::Method };
            self.resolve_function(method, kind);
        }

        self.end_scope();

        if data.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Variable(data) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&data.name.lexeme) == Some(&false) {
                        self.errors.push(ResolveError {
                            token: data.name.clone(),
                            message: "Can't read local variable in its own initializer".to_string(),
                        });
                    }
                }
                self.resolve_local(data.id, &data.name);
            }
            Expr::Assign(data) => {
                self.resolve_expr(&data.value);
                self.resolve_local(data.id, &data.name);
            }
            Expr::Binary(data) => {
                self.resolve_expr(&data.left);
                self.resolve_expr(&data.right);
            }
            Expr::Logical(data) => {
                self.resolve_expr(&data.left);
                self.resolve_expr(&data.right);
            }
            Expr::Unary(data) => self.resolve_expr(&data.right),
            Expr::Grouping(data) => self.resolve_expr(&data.expression),
            Expr::Literal(_) => {}
            Expr::Call(data) => {
                self.resolve_expr(&data.callee);
                for arg in &data.arguments {
                    self.resolve_expr(arg);
                }
            }
            Expr::Get(data) => self.resolve_expr(&data.object),
            Expr::Set(data) => {
                self.resolve_expr(&data.value);
                self.resolve_expr(&data.object);
            }
            Expr::This(data) => {
                if self.current_class == ClassKind::None {
                    self.errors.push(ResolveError {
                        token: data.keyword.clone(),
                        message: "Can't use 'this' outside of a class".to_string(),
                    });
                    return;
                }
                self.resolve_local(data.id, &data.keyword);
            }
            Expr::Super(data) => {
                match self.current_class {
                    ClassKind::None => {
                        self.errors.push(ResolveError {
                            token: data.keyword.clone(),
                            message: "Can't use 'super' outside of a class".to_string(),
                        });
                        return;
                    }
                    ClassKind::Class => {
                        self.errors.push(ResolveError {
                            token: data.keyword.clone(),
                            message: "Can't use 'super' in a class with no superclass".to_string(),
                        });
                        return;
                    }
                    ClassKind::Subclass => {}
                }
                self.resolve_local(data.id, &data.keyword);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn resolve(source: &str) -> Result<HashMap<NodeId, usize>, Vec<ResolveError>> {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        let statements = Parser::new(tokens).parse().unwrap();
        Resolver::new().resolve(&statements)
    }

    #[test]
    fn resolves_a_variable_captured_by_a_closure() {
        let locals = resolve("var a = 1; fun f() { print a; }").unwrap();
        assert!(locals.is_empty(), "top-level 'a' is global, not local");
    }

    #[test]
    fn resolves_a_block_local_one_level_up() {
        let locals = resolve("{ var a = 1; print a; }").unwrap();
        assert_eq!(locals.values().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn rejects_reading_a_variable_in_its_own_initializer() {
        let errors = resolve("{ var a = a; }").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("own initializer"));
    }

    #[test]
    fn rejects_duplicate_declaration_in_the_same_scope() {
        let errors = resolve("{ var a = 1; var a = 2; }").unwrap_err();
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn rejects_return_outside_a_function() {
        let errors = resolve("return 1;").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("top-level"));
    }

    #[test]
    fn rejects_super_without_a_superclass() {
        let errors = resolve("class A { f() { super.f(); } }").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("no superclass"));
    }

    #[test]
    fn rejects_self_inheritance() {
        let errors = resolve("class A < A {}").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("inherit from itself"));
    }
}
