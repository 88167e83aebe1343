use std::rc::Rc;

use crate::expr::{Expr, VariableData};
use crate::token::Token;

/// A function or method declaration's shared, immutable shape.
///
/// Held behind an `Rc` so that building a closure (runtime `Function`) or resolving a class's
/// methods never has to clone a statement body — every closure over the same declaration shares
/// one `FunctionDecl`.
#[derive(Debug)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

/// A statement: a piece of syntax executed for its side effect rather than its value.
#[derive(Debug, Clone)]
pub enum Stmt {
    Expression(ExpressionData),
    Print(PrintData),
    Var(VarData),
    Block(BlockData),
    If(IfData),
    While(WhileData),
    Function(Rc<FunctionDecl>),
    Return(ReturnData),
    Class(ClassData),
}

#[derive(Debug, Clone)]
pub struct ExpressionData {
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub struct PrintData {
    pub expr: Expr,
}

#[derive(Debug, Clone)]
pub struct VarData {
    pub name: Token,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct BlockData {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct IfData {
    pub condition: Expr,
    pub then_branch: Box<Stmt>,
    pub else_branch: Option<Box<Stmt>>,
}

#[derive(Debug, Clone)]
pub struct WhileData {
    pub condition: Expr,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ReturnData {
    pub keyword: Token,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct ClassData {
    pub name: Token,
    pub superclass: Option<VariableData>,
    pub methods: Vec<Rc<FunctionDecl>>,
}
