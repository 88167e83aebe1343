use std::rc::Rc;

use crate::error::ParseError;
use crate::expr::{
    AssignData, BinaryData, CallData, Expr, GetData, GroupingData, LogicalData, NodeId, SetData,
    SuperData, ThisData, UnaryData, VariableData,
};
use crate::literal::Literal;
use crate::stmt::{
    BlockData, ClassData, ExpressionData, FunctionDecl, IfData, PrintData, ReturnData, Stmt,
    VarData, WhileData,
};
use crate::token::{Token, Type};

type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser building the AST from the scanner's token stream.
///
/// Mirrors the grammar's precedence chain directly in the call chain: each method calls the next
/// tighter-binding one, bottoming out at `primary`. Mints a fresh [`NodeId`] for every
/// `Variable`/`Assign`/`This`/`Super` node so the resolver can key its bind-depth table without
/// relying on AST-node identity.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    next_id: NodeId,
    errors: Vec<ParseError>,
}

macro_rules! matches_type {
    ($self:ident, $($kind:pat),+ $(,)?) => {
        if matches!($self.peek().kind, $($kind)|+) {
            $self.advance();
            true
        } else {
            false
        }
    };
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Parser {
        Parser { tokens, current: 0, next_id: 0, errors: Vec::new() }
    }

    fn next_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Parses the whole token stream. Parse errors are collected via `synchronize` rather than
    /// aborting at the first one, so a single run can report every syntax mistake in the source.
    pub fn parse(mut self) -> Result<Vec<Stmt>, Vec<ParseError>> {
        log::debug!("parser: starting");
        let mut statements = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }

        if self.errors.is_empty() {
            log::debug!("parser: produced {} statements", statements.len());
            Ok(statements)
        } else {
            log::debug!("parser: {} error(s)", self.errors.len());
            Err(self.errors)
        }
    }

    // ---- statement grammar ----

    fn declaration(&mut self) -> ParseResult<Stmt> {
        if matches_type!(self, Type::Class) {
            return self.class_declaration();
        }
        if matches_type!(self, Type::Fun) {
            return Ok(Stmt::Function(Rc::new(self.function("function")?)));
        }
        if matches_type!(self, Type::Var) {
            return self.var_declaration();
        }
        self.statement()
    }

    fn class_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(Type::Identifier, "Expect class name")?;

        let superclass = if matches_type!(self, Type::Less) {
            let name = self.consume(Type::Identifier, "Expect superclass name")?;
            Some(VariableData { id: self.next_id(), name })
        } else {
            None
        };

        self.consume(Type::LeftBrace, "Expect '{' before class body")?;

        let mut methods = Vec::new();
        while !self.check(Type::RightBrace) && !self.is_at_end() {
            methods.push(Rc::new(self.function("method")?));
        }

        self.consume(Type::RightBrace, "Expect '}' after class body")?;

        Ok(Stmt::Class(ClassData { name, superclass, methods }))
    }

    fn function(&mut self, kind: &str) -> ParseResult<FunctionDecl> {
        let name = self.consume(Type::Identifier, &format!("Expect {kind} name"))?;
        self.consume(Type::LeftParen, &format!("Expect '(' after {kind} name"))?;

        let mut params = Vec::new();
        if !self.check(Type::RightParen) {
            loop {
                if params.len() >= 255 {
                    return Err(self.error(self.peek().clone(), "Can't have more than 255 parameters"));
                }
                params.push(self.consume(Type::Identifier, "Expect parameter name")?);
                if !matches_type!(self, Type::Comma) {
                    break;
                }
            }
        }
        self.consume(Type::RightParen, "Expect ')' after parameters")?;

        self.consume(Type::LeftBrace, &format!("Expect '{{' before {kind} body"))?;
        let body = self.block()?;

        Ok(FunctionDecl { name, params, body })
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(Type::Identifier, "Expect variable name")?;
        let initializer = if matches_type!(self, Type::Equal) { Some(self.expression()?) } else { None };
        self.consume(Type::Semicolon, "Expect ';' after variable declaration")?;
        Ok(Stmt::Var(VarData { name, initializer }))
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if matches_type!(self, Type::Print) {
            return self.print_statement();
        }
        if matches_type!(self, Type::Return) {
            return self.return_statement();
        }
        if matches_type!(self, Type::If) {
            return self.if_statement();
        }
        if matches_type!(self, Type::While) {
            return self.while_statement();
        }
        if matches_type!(self, Type::For) {
            return self.for_statement();
        }
        if matches_type!(self, Type::LeftBrace) {
            return Ok(Stmt::Block(BlockData { statements: self.block()? }));
        }
        self.expression_statement()
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(Type::Semicolon, "Expect ';' after value")?;
        Ok(Stmt::Print(PrintData { expr }))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        let value = if !self.check(Type::Semicolon) { Some(self.expression()?) } else { None };
        self.consume(Type::Semicolon, "Expect ';' after return value")?;
        Ok(Stmt::Return(ReturnData { keyword, value }))
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(Type::LeftParen, "Expect '(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(Type::RightParen, "Expect ')' after if condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch =
            if matches_type!(self, Type::Else) { Some(Box::new(self.statement()?)) } else { None };

        Ok(Stmt::If(IfData { condition, then_branch, else_branch }))
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(Type::LeftParen, "Expect '(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(Type::RightParen, "Expect ')' after condition")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While(WhileData { condition, body }))
    }

    /// Desugars `for (init; cond; incr) body` into a `while` loop wrapped in blocks, rather than
    /// giving the AST and evaluator a dedicated `For` node (§4.2).
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(Type::LeftParen, "Expect '(' after 'for'")?;

        let initializer = if matches_type!(self, Type::Semicolon) {
            None
        } else if matches_type!(self, Type::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(Type::Semicolon) { Some(self.expression()?) } else { None };
        self.consume(Type::Semicolon, "Expect ';' after loop condition")?;

        let increment = if !self.check(Type::RightParen) { Some(self.expression()?) } else { None };
        self.consume(Type::RightParen, "Expect ')' after for clauses")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(BlockData {
                statements: vec![body, Stmt::Expression(ExpressionData { expr: increment })],
            });
        }

        let condition = condition.unwrap_or(Expr::Literal(Literal::Bool(true)));
        body = Stmt::While(WhileData { condition, body: Box::new(body) });

        if let Some(initializer) = initializer {
            body = Stmt::Block(BlockData { statements: vec![initializer, body] });
        }

        Ok(body)
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(Type::RightBrace) && !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }
        self.consume(Type::RightBrace, "Expect '}' after block")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(Type::Semicolon, "Expect ';' after expression")?;
        Ok(Stmt::Expression(ExpressionData { expr }))
    }

    // ---- expression grammar ----

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.or()?;

        if matches_type!(self, Type::Equal) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return match expr {
                Expr::Variable(v) => {
                    Ok(Expr::Assign(AssignData { id: self.next_id(), name: v.name, value: Box::new(value) }))
                }
                Expr::Get(g) => Ok(Expr::Set(SetData { object: g.object, name: g.name, value: Box::new(value) })),
                _ => Err(self.error(equals, "Invalid assignment target")),
            };
        }

        Ok(expr)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;
        while matches_type!(self, Type::Or) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical(LogicalData { left: Box::new(expr), operator, right: Box::new(right) });
        }
        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while matches_type!(self, Type::And) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical(LogicalData { left: Box::new(expr), operator, right: Box::new(right) });
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        while matches_type!(self, Type::BangEqual, Type::EqualEqual) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary(BinaryData { left: Box::new(expr), operator, right: Box::new(right) });
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;
        while matches_type!(self, Type::Greater, Type::GreaterEqual, Type::Less, Type::LessEqual) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary(BinaryData { left: Box::new(expr), operator, right: Box::new(right) });
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;
        while matches_type!(self, Type::Minus, Type::Plus) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary(BinaryData { left: Box::new(expr), operator, right: Box::new(right) });
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        while matches_type!(self, Type::Slash, Type::Star) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary(BinaryData { left: Box::new(expr), operator, right: Box::new(right) });
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if matches_type!(self, Type::Bang, Type::Minus) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary(UnaryData { operator, right: Box::new(right) }));
        }
        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if matches_type!(self, Type::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if matches_type!(self, Type::Dot) {
                let name = self.consume(Type::Identifier, "Expect property name after '.'")?;
                expr = Expr::Get(GetData { object: Box::new(expr), name });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = Vec::new();
        if !self.check(Type::RightParen) {
            loop {
                if arguments.len() >= 255 {
                    return Err(self.error(self.peek().clone(), "Can't have more than 255 arguments"));
                }
                arguments.push(self.expression()?);
                if !matches_type!(self, Type::Comma) {
                    break;
                }
            }
        }
        let paren = self.consume(Type::RightParen, "Expect ')' after arguments")?;
        Ok(Expr::Call(CallData { callee: Box::new(callee), paren, arguments }))
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        if matches_type!(self, Type::False) {
            return Ok(Expr::Literal(Literal::Bool(false)));
        }
        if matches_type!(self, Type::True) {
            return Ok(Expr::Literal(Literal::Bool(true)));
        }
        if matches_type!(self, Type::Nil) {
            return Ok(Expr::Literal(Literal::Nil));
        }
        if matches_type!(self, Type::Number, Type::String) {
            let literal = self.previous().literal.clone().expect("scanner attaches a literal to this token");
            return Ok(Expr::Literal(literal));
        }
        if matches_type!(self, Type::Super) {
            let keyword = self.previous().clone();
            self.consume(Type::Dot, "Expect '.' after 'super'")?;
            let method = self.consume(Type::Identifier, "Expect superclass method name")?;
            return Ok(Expr::Super(SuperData { id: self.next_id(), keyword, method }));
        }
        if matches_type!(self, Type::This) {
            return Ok(Expr::This(ThisData { id: self.next_id(), keyword: self.previous().clone() }));
        }
        if matches_type!(self, Type::Identifier) {
            return Ok(Expr::Variable(VariableData { id: self.next_id(), name: self.previous().clone() }));
        }
        if matches_type!(self, Type::LeftParen) {
            let expression = self.expression()?;
            self.consume(Type::RightParen, "Expect ')' after expression")?;
            return Ok(Expr::Grouping(GroupingData { expression: Box::new(expression) }));
        }

        Err(self.error(self.peek().clone(), "Expect expression"))
    }

    // ---- token-stream helpers ----

    fn check(&self, kind: Type) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == Type::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn consume(&mut self, kind: Type, message: &str) -> ParseResult<Token> {
        if self.check(kind) {
            return Ok(self.advance().clone());
        }
        Err(self.error(self.peek().clone(), message))
    }

    fn error(&self, token: Token, message: impl Into<String>) -> ParseError {
        ParseError { token, message: message.into() }
    }

    /// Discards tokens until the start of the next statement, so one syntax error doesn't cascade
    /// into a wall of spurious follow-on errors.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == Type::Semicolon {
                return;
            }
            if matches!(
                self.peek().kind,
                Type::Class | Type::Fun | Type::Var | Type::For | Type::If | Type::While | Type::Print | Type::Return
            ) {
                return;
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::Scanner;

    fn parse(source: &str) -> Vec<Stmt> {
        let tokens = Scanner::new(source).scan_tokens().unwrap();
        Parser::new(tokens).parse().unwrap()
    }

    #[test]
    fn parses_a_binary_expression_statement() {
        let stmts = parse("1 + 2;");
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0], Stmt::Expression(_)));
    }

    #[test]
    fn each_variable_reference_gets_a_distinct_node_id() {
        let stmts = parse("var a = 1; a = a + 1;");
        let Stmt::Expression(ExpressionData { expr: Expr::Assign(assign) }) = &stmts[1] else {
            panic!("expected an assignment statement");
        };
        let Expr::Binary(bin) = assign.value.as_ref() else { panic!("expected a binary rhs") };
        let Expr::Variable(var) = bin.left.as_ref() else { panic!("expected a variable reference") };
        assert_ne!(assign.id, var.id);
    }

    #[test]
    fn for_loop_desugars_into_a_while_wrapped_in_blocks() {
        let stmts = parse("for (var i = 0; i < 3; i = i + 1) print i;");
        assert_eq!(stmts.len(), 1);
        let Stmt::Block(outer) = &stmts[0] else { panic!("expected outer block") };
        assert_eq!(outer.statements.len(), 2);
        assert!(matches!(outer.statements[0], Stmt::Var(_)));
        assert!(matches!(outer.statements[1], Stmt::While(_)));
    }

    #[test]
    fn invalid_assignment_target_is_a_parse_error() {
        let tokens = Scanner::new("1 = 2;").scan_tokens().unwrap();
        let errors = Parser::new(tokens).parse().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Invalid assignment target");
    }

    #[test]
    fn missing_semicolon_reports_at_the_offending_token() {
        let tokens = Scanner::new("print 1").scan_tokens().unwrap();
        let errors = Parser::new(tokens).parse().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Expect ';' after value");
    }
}
