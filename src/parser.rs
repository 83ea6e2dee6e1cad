// Pratt parser. Two-token lookahead (`previous`, `current`) over a
// pre-lexed token slice; on any unexpected token it reports a diagnostic
// and produces an `Error` node rather than aborting, so later statements
// still get parsed (the compiler is what refuses to proceed on an error).

use crate::ast::{Expr, InfixOp, PrefixOp, Stmt};
use crate::lexer::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
enum Precedence {
    None,
    Assign,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
}

fn precedence_of(kind: &TokenKind) -> Precedence {
    use TokenKind::*;
    match kind {
        Or => Precedence::Or,
        And => Precedence::And,
        EqualEqual | BangEqual => Precedence::Equality,
        Less | LessEqual | Greater | GreaterEqual => Precedence::Comparison,
        Plus | Minus => Precedence::Term,
        Star | Slash => Precedence::Factor,
        LeftParen => Precedence::Call,
        _ => Precedence::None,
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    previous: Token,
    current: Token,
    pub errors: Vec<String>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        let eof = Token { kind: TokenKind::Eof, line: tokens.last().map(|t| t.line).unwrap_or(1) };
        let mut parser = Self {
            tokens,
            pos: 0,
            previous: eof.clone(),
            current: eof,
            errors: Vec::new(),
        };
        parser.advance();
        parser.advance();
        parser
    }

    fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.next_raw());
    }

    fn next_raw(&mut self) -> Token {
        let token = self.tokens.get(self.pos).cloned().unwrap_or(Token {
            kind: TokenKind::Eof,
            line: self.previous.line,
        });
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, message: &str) -> Result<(), String> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(format!("[line {}] Error: {}", self.current.line, message))
        }
    }

    fn error_here(&mut self, message: impl Into<String>) -> String {
        let message = message.into();
        let full = format!("[line {}] Error: {}", self.current.line, message);
        self.errors.push(full.clone());
        full
    }

    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !matches!(self.current.kind, TokenKind::Eof) {
            statements.push(self.statement());
        }
        statements
    }

    fn statement(&mut self) -> Stmt {
        match &self.current.kind {
            TokenKind::Return => self.return_statement(),
            TokenKind::Var => self.var_statement(),
            TokenKind::LeftBrace => self.block_statement(),
            TokenKind::If => self.if_statement(),
            TokenKind::While => self.while_statement(),
            TokenKind::Function => self.function_statement(),
            TokenKind::Semicolon => {
                let token = self.current.clone();
                self.advance();
                Stmt::Null(token)
            }
            TokenKind::Identifier(_) => self.identifier_led_statement(),
            _ => self.expr_statement(),
        }
    }

    fn identifier_led_statement(&mut self) -> Stmt {
        // Disambiguate `name = expr;` (assignment) from any other expression
        // statement starting with an identifier (e.g. a bare call).
        let save_pos = self.pos;
        let save_prev = self.previous.clone();
        let save_cur = self.current.clone();

        let token = self.current.clone();
        let name = match &token.kind {
            TokenKind::Identifier(n) => n.clone(),
            _ => unreachable!(),
        };
        self.advance();
        if self.check(&TokenKind::Equal) {
            self.advance();
            let value = self.expression(Precedence::Assign);
            if let Err(e) = self.expect(&TokenKind::Semicolon, "expected ';' after assignment") {
                self.errors.push(e);
            }
            return Stmt::Assign(token, name, value);
        }

        self.pos = save_pos;
        self.previous = save_prev;
        self.current = save_cur;
        self.expr_statement()
    }

    fn expr_statement(&mut self) -> Stmt {
        let token = self.current.clone();
        let expr = self.expression(Precedence::Assign);
        if let Err(e) = self.expect(&TokenKind::Semicolon, "expected ';' after expression") {
            self.errors.push(e);
        }
        Stmt::ExprStmt(token, expr)
    }

    fn return_statement(&mut self) -> Stmt {
        let token = self.current.clone();
        self.advance(); // consume 'return'
        if self.check(&TokenKind::Semicolon) {
            self.advance();
            return Stmt::Return(token, None);
        }
        let value = self.expression(Precedence::Assign);
        if let Err(e) = self.expect(&TokenKind::Semicolon, "expected ';' after return value") {
            self.errors.push(e);
        }
        Stmt::Return(token, Some(value))
    }

    fn var_statement(&mut self) -> Stmt {
        let token = self.current.clone();
        self.advance(); // consume 'var'
        let name = match &self.current.kind {
            TokenKind::Identifier(n) => n.clone(),
            _ => {
                let msg = self.error_here("expected variable name");
                return Stmt::Error(token, msg);
            }
        };
        self.advance();

        let value = if self.matches(&TokenKind::Equal) {
            Some(self.expression(Precedence::Assign))
        } else {
            None
        };

        if let Err(e) = self.expect(&TokenKind::Semicolon, "expected ';' after variable declaration") {
            self.errors.push(e);
        }
        Stmt::Var(token, name, value)
    }

    fn block_statement(&mut self) -> Stmt {
        let token = self.current.clone();
        self.advance(); // consume '{'
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !matches!(self.current.kind, TokenKind::Eof) {
            statements.push(self.statement());
        }
        if let Err(e) = self.expect(&TokenKind::RightBrace, "expected '}' after block") {
            self.errors.push(e);
        }
        Stmt::Block(token, statements)
    }

    fn if_statement(&mut self) -> Stmt {
        let token = self.current.clone();
        self.advance(); // consume 'if'
        if let Err(e) = self.expect(&TokenKind::LeftParen, "expected '(' after 'if'") {
            self.errors.push(e);
        }
        let condition = self.expression(Precedence::Assign);
        if let Err(e) = self.expect(&TokenKind::RightParen, "expected ')' after condition") {
            self.errors.push(e);
        }
        let then_branch = Box::new(self.block_statement());
        let else_branch = if self.matches(&TokenKind::Else) {
            Some(Box::new(self.block_statement()))
        } else {
            None
        };
        Stmt::If(token, condition, then_branch, else_branch)
    }

    fn while_statement(&mut self) -> Stmt {
        let token = self.current.clone();
        self.advance(); // consume 'while'
        if let Err(e) = self.expect(&TokenKind::LeftParen, "expected '(' after 'while'") {
            self.errors.push(e);
        }
        let condition = self.expression(Precedence::Assign);
        if let Err(e) = self.expect(&TokenKind::RightParen, "expected ')' after condition") {
            self.errors.push(e);
        }
        let body = Box::new(self.block_statement());
        Stmt::While(token, condition, body)
    }

    fn function_statement(&mut self) -> Stmt {
        let token = self.current.clone();
        self.advance(); // consume 'function'
        let name = match &self.current.kind {
            TokenKind::Identifier(n) => n.clone(),
            _ => {
                let msg = self.error_here("expected function name");
                return Stmt::Error(token, msg);
            }
        };
        self.advance();

        if let Err(e) = self.expect(&TokenKind::LeftParen, "expected '(' after function name") {
            self.errors.push(e);
        }
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                match &self.current.kind {
                    TokenKind::Identifier(n) => {
                        params.push(n.clone());
                        self.advance();
                    }
                    _ => {
                        self.error_here("expected parameter name");
                        break;
                    }
                }
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        if let Err(e) = self.expect(&TokenKind::RightParen, "expected ')' after parameters") {
            self.errors.push(e);
        }
        let body = Box::new(self.block_statement());
        Stmt::Function(token, name, params, body)
    }

    fn expression(&mut self, min_precedence: Precedence) -> Expr {
        let mut left = match self.prefix() {
            Ok(expr) => expr,
            Err(message) => return Expr::Error(self.current.clone(), message),
        };

        while min_precedence < precedence_of(&self.current.kind) {
            left = self.infix(left);
        }
        left
    }

    fn prefix(&mut self) -> Result<Expr, String> {
        let token = self.current.clone();
        match token.kind.clone() {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(token, n))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expr::String(token, s))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(token, true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(token, false))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null(token))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::Identifier(token, name))
            }
            // `print` is a reserved keyword at the lexical level but behaves
            // like any other callee identifier in expression position.
            TokenKind::Print => {
                self.advance();
                Ok(Expr::Identifier(token, "print".to_string()))
            }
            TokenKind::Minus => {
                self.advance();
                let operand = self.expression(Precedence::Unary);
                Ok(Expr::Prefix(token, PrefixOp::Negate, Box::new(operand)))
            }
            TokenKind::Bang => {
                self.advance();
                let operand = self.expression(Precedence::Unary);
                Ok(Expr::Prefix(token, PrefixOp::Not, Box::new(operand)))
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression(Precedence::Assign);
                self.expect(&TokenKind::RightParen, "expected ')' after expression")?;
                Ok(Expr::Group(token, Box::new(inner)))
            }
            other => Err(format!("[line {}] Error: unexpected token {:?} where an expression was expected", token.line, other)),
        }
    }

    fn infix(&mut self, left: Expr) -> Expr {
        let token = self.current.clone();
        match token.kind.clone() {
            TokenKind::Plus => self.binary(token, InfixOp::Add, left, Precedence::Term),
            TokenKind::Minus => self.binary(token, InfixOp::Sub, left, Precedence::Term),
            TokenKind::Star => self.binary(token, InfixOp::Mul, left, Precedence::Factor),
            TokenKind::Slash => self.binary(token, InfixOp::Div, left, Precedence::Factor),
            TokenKind::Less => self.binary(token, InfixOp::Less, left, Precedence::Comparison),
            TokenKind::LessEqual => self.binary(token, InfixOp::LessEqual, left, Precedence::Comparison),
            TokenKind::Greater => self.binary(token, InfixOp::Greater, left, Precedence::Comparison),
            TokenKind::GreaterEqual => self.binary(token, InfixOp::GreaterEqual, left, Precedence::Comparison),
            TokenKind::EqualEqual => self.binary(token, InfixOp::Equal, left, Precedence::Equality),
            TokenKind::BangEqual => self.binary(token, InfixOp::NotEqual, left, Precedence::Equality),
            TokenKind::And => self.binary(token, InfixOp::And, left, Precedence::And),
            TokenKind::Or => self.binary(token, InfixOp::Or, left, Precedence::Or),
            TokenKind::LeftParen => self.call(token, left),
            _ => left,
        }
    }

    fn binary(&mut self, token: Token, op: InfixOp, left: Expr, precedence: Precedence) -> Expr {
        self.advance();
        let right = self.expression(precedence);
        Expr::Infix(token, op, Box::new(left), Box::new(right))
    }

    fn call(&mut self, token: Token, callee: Expr) -> Expr {
        let name = match &callee {
            Expr::Identifier(_, name) => name.clone(),
            _ => {
                self.error_here("only identifiers may be called");
                return Expr::Error(token, "only identifiers may be called".to_string());
            }
        };
        self.advance(); // consume '('
        let mut args = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                args.push(self.expression(Precedence::Assign));
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        if let Err(e) = self.expect(&TokenKind::RightParen, "expected ')' after arguments") {
            self.errors.push(e);
        }
        Expr::Call(token, name, args)
    }
}

pub fn parse(tokens: Vec<Token>) -> (Vec<Stmt>, Vec<String>) {
    let mut parser = Parser::new(tokens);
    let statements = parser.parse();
    (statements, parser.errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_one(source: &str) -> Stmt {
        let (mut stmts, errors) = parse(tokenize(source));
        assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);
        assert_eq!(stmts.len(), 1);
        stmts.remove(0)
    }

    #[test]
    fn bare_return_has_no_value() {
        match parse_one("return;") {
            Stmt::Return(_, None) => {}
            other => panic!("expected bare return, got {:?}", other),
        }
    }

    #[test]
    fn return_with_value() {
        match parse_one("return 10;") {
            Stmt::Return(_, Some(Expr::Number(_, n))) => assert_eq!(n, 10.0),
            other => panic!("expected return 10, got {:?}", other),
        }
    }

    #[test]
    fn var_declaration_binds_name_and_value() {
        match parse_one("var x = 10;") {
            Stmt::Var(_, name, Some(Expr::Number(_, n))) => {
                assert_eq!(name, "x");
                assert_eq!(n, 10.0);
            }
            other => panic!("expected var x = 10, got {:?}", other),
        }
    }

    #[test]
    fn prefix_bang_and_minus() {
        match parse_one("!5;") {
            Stmt::ExprStmt(_, Expr::Prefix(_, PrefixOp::Not, inner)) => {
                assert!(matches!(*inner, Expr::Number(_, n) if n == 5.0));
            }
            other => panic!("expected !5, got {:?}", other),
        }
        match parse_one("-1000;") {
            Stmt::ExprStmt(_, Expr::Prefix(_, PrefixOp::Negate, inner)) => {
                assert!(matches!(*inner, Expr::Number(_, n) if n == 1000.0));
            }
            other => panic!("expected -1000, got {:?}", other),
        }
    }

    #[test]
    fn infix_operators_parse_correctly() {
        match parse_one("1 + 1;") {
            Stmt::ExprStmt(_, Expr::Infix(_, InfixOp::Add, _, _)) => {}
            other => panic!("expected 1 + 1, got {:?}", other),
        }
        match parse_one("2 * 2;") {
            Stmt::ExprStmt(_, Expr::Infix(_, InfixOp::Mul, _, _)) => {}
            other => panic!("expected 2 * 2, got {:?}", other),
        }
    }

    #[test]
    fn grouping_nests_inside_outer_infix() {
        match parse_one("(1 + 2) * 3;") {
            Stmt::ExprStmt(_, Expr::Infix(_, InfixOp::Mul, left, _)) => {
                assert!(matches!(*left, Expr::Group(_, _)));
            }
            other => panic!("expected (1+2)*3, got {:?}", other),
        }
    }

    #[test]
    fn if_else_has_both_branches() {
        match parse_one("if (1) { 10; } else { 1; }") {
            Stmt::If(_, _, _, Some(_)) => {}
            other => panic!("expected if/else, got {:?}", other),
        }
    }

    #[test]
    fn function_declaration_has_ordered_params() {
        match parse_one("function doStuff(a, b) { 10; }") {
            Stmt::Function(_, name, params, _) => {
                assert_eq!(name, "doStuff");
                assert_eq!(params, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected function doStuff(a, b), got {:?}", other),
        }
    }

    #[test]
    fn call_expression_preserves_argument_order() {
        match parse_one("add(1, 2);") {
            Stmt::ExprStmt(_, Expr::Call(_, name, args)) => {
                assert_eq!(name, "add");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected add(1, 2), got {:?}", other),
        }
    }
}
