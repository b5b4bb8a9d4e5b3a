//! Recursive-descent parser over the token stream.

use crate::ast::{Arg, BinaryOp, Expr, Stmt, UnaryOp};
use crate::error::{EngineError, Result};
use crate::lexer::{Lexer, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

/// Convenience entry: tokenize and parse in one step.
pub fn parse(source: &str) -> Result<Vec<Stmt>> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, position: 0 }
    }

    pub fn parse(&mut self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();
        self.skip_separators();
        while !self.check(&TokenKind::Eof) {
            statements.push(self.statement()?);
            if !self.check(&TokenKind::Eof) {
                self.expect_separator()?;
            }
            self.skip_separators();
        }
        Ok(statements)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.position + offset).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn matches(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_separators(&mut self) {
        while self.check(&TokenKind::Newline) || self.check(&TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn expect_separator(&mut self) -> Result<()> {
        if self.check(&TokenKind::Newline) || self.check(&TokenKind::Semicolon) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> EngineError {
        let token = self.peek();
        EngineError::Syntax(format!(
            "unexpected {} at line {}",
            describe(&token.kind),
            token.line
        ))
    }

    fn statement(&mut self) -> Result<Stmt> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            if matches!(
                self.peek_kind_at(1),
                Some(TokenKind::Arrow) | Some(TokenKind::Equal)
            ) {
                let name = name.clone();
                self.advance();
                self.advance();
                let value = self.expression()?;
                return Ok(Stmt::Assign { name, value });
            }
        }
        Ok(Stmt::Expr(self.expression()?))
    }

    fn expression(&mut self) -> Result<Expr> {
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr = self.additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::Ne,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => return Ok(expr),
            };
            self.advance();
            let rhs = self.additive()?;
            expr = Expr::Binary {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut expr = self.multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(expr),
            };
            self.advance();
            let rhs = self.multiplicative()?;
            expr = Expr::Binary {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut expr = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => return Ok(expr),
            };
            self.advance();
            let rhs = self.unary()?;
            expr = Expr::Binary {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = match self.peek().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.postfix(),
        };
        self.advance();
        let operand = self.unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        while self.matches(&TokenKind::Dollar) {
            match self.advance().kind {
                TokenKind::Ident(name) => {
                    expr = Expr::Field {
                        target: Box::new(expr),
                        name,
                    };
                }
                _ => return Err(self.unexpected()),
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.advance();
        match token.kind {
            TokenKind::Int(i) => Ok(Expr::Int(i)),
            TokenKind::Real(r) => Ok(Expr::Real(r)),
            TokenKind::Str(s) => Ok(Expr::Str(s)),
            TokenKind::True => Ok(Expr::Bool(true)),
            TokenKind::False => Ok(Expr::Bool(false)),
            TokenKind::Null => Ok(Expr::Null),
            TokenKind::Ident(name) => {
                if self.matches(&TokenKind::LParen) {
                    let args = self.call_args()?;
                    Ok(Expr::Call { callee: name, args })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            TokenKind::LParen => {
                let expr = self.expression()?;
                if !self.matches(&TokenKind::RParen) {
                    return Err(self.unexpected());
                }
                Ok(expr)
            }
            TokenKind::Eof => Err(EngineError::Syntax(
                "unexpected end of input".to_string(),
            )),
            other => Err(EngineError::Syntax(format!(
                "unexpected {} at line {}",
                describe(&other),
                token.line
            ))),
        }
    }

    fn call_args(&mut self) -> Result<Vec<Arg>> {
        let mut args = Vec::new();
        if self.matches(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.call_arg()?);
            if self.matches(&TokenKind::Comma) {
                continue;
            }
            if self.matches(&TokenKind::RParen) {
                return Ok(args);
            }
            return Err(self.unexpected());
        }
    }

    fn call_arg(&mut self) -> Result<Arg> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            if self.peek_kind_at(1) == Some(&TokenKind::Equal) {
                let name = name.clone();
                self.advance();
                self.advance();
                let value = self.expression()?;
                return Ok(Arg {
                    name: Some(name),
                    value,
                });
            }
        }
        Ok(Arg {
            name: None,
            value: self.expression()?,
        })
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Int(i) => format!("numeric constant '{}'", i),
        TokenKind::Real(r) => format!("numeric constant '{}'", r),
        TokenKind::Str(_) => "string constant".to_string(),
        TokenKind::Ident(name) => format!("symbol '{}'", name),
        TokenKind::Newline => "end of line".to_string(),
        TokenKind::Eof => "end of input".to_string(),
        other => format!("token {:?}", other),
    }
}
