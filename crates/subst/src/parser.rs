// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Formula parser
//!
//! Recursive descent over the token stream with conventional precedence:
//!
//! ```text
//! ||  <  &&  <  == != < <= > >= in, not in  <  |  <  ^  <  &
//!     <  << >>  <  + -  <  * / // %  <  unary ! -  <  **  <  postfix [i]
//! ```
//!
//! Identifiers chain with `.` into namespace lookups (`previous.eater`);
//! an identifier followed by `(` is a function call.

use crate::lexer::{tokenize, Token};
use crate::SubstError;

/// Binary operators, in increasing precedence groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    BitOr,
    BitXor,
    BitAnd,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
}

/// A parsed formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    List(Vec<Expr>),
    /// Dotted namespace lookup, e.g. `previous.eater`.
    Lookup(String),
    /// Postfix indexing: `lookup[0]`, `lookup['key']`.
    Index { base: Box<Expr>, index: Box<Expr> },
    Call { func: String, args: Vec<Expr> },
    Unary { op: UnOp, expr: Box<Expr> },
    Binary {
        lhs: Box<Expr>,
        op: BinOp,
        rhs: Box<Expr>,
    },
}

/// Parse a formula body (text after the leading `=`).
pub fn parse_formula(expr: &str) -> Result<Expr, SubstError> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser {
        source: expr,
        tokens,
        pos: 0,
    };
    let parsed = parser.or_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(parser.syntax("trailing tokens after expression"));
    }
    Ok(parsed)
}

struct Parser<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn syntax(&self, message: impl Into<String>) -> SubstError {
        SubstError::Syntax {
            expr: self.source.to_string(),
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), SubstError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.syntax(format!("expected {:?}", token)))
        }
    }

    fn or_expr(&mut self) -> Result<Expr, SubstError> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::OrOr) {
            let rhs = self.and_expr()?;
            lhs = binary(lhs, BinOp::Or, rhs);
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, SubstError> {
        let mut lhs = self.comparison()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.comparison()?;
            lhs = binary(lhs, BinOp::And, rhs);
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Expr, SubstError> {
        let mut lhs = self.bit_or()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinOp::Eq,
                Some(Token::Ne) => BinOp::Ne,
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Le) => BinOp::Le,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::Ge) => BinOp::Ge,
                Some(Token::In) => BinOp::In,
                Some(Token::NotIn) => BinOp::NotIn,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.bit_or()?;
            lhs = binary(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn bit_or(&mut self) -> Result<Expr, SubstError> {
        let mut lhs = self.bit_xor()?;
        while self.eat(&Token::Pipe) {
            let rhs = self.bit_xor()?;
            lhs = binary(lhs, BinOp::BitOr, rhs);
        }
        Ok(lhs)
    }

    fn bit_xor(&mut self) -> Result<Expr, SubstError> {
        let mut lhs = self.bit_and()?;
        while self.eat(&Token::Caret) {
            let rhs = self.bit_and()?;
            lhs = binary(lhs, BinOp::BitXor, rhs);
        }
        Ok(lhs)
    }

    fn bit_and(&mut self) -> Result<Expr, SubstError> {
        let mut lhs = self.shift()?;
        while self.eat(&Token::Amp) {
            let rhs = self.shift()?;
            lhs = binary(lhs, BinOp::BitAnd, rhs);
        }
        Ok(lhs)
    }

    fn shift(&mut self) -> Result<Expr, SubstError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Shl) => BinOp::Shl,
                Some(Token::Shr) => BinOp::Shr,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.additive()?;
            lhs = binary(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, SubstError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = binary(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, SubstError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::SlashSlash) => BinOp::FloorDiv,
                Some(Token::Percent) => BinOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = binary(lhs, op, rhs);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, SubstError> {
        if self.eat(&Token::Bang) {
            let expr = self.unary()?;
            return Ok(Expr::Unary {
                op: UnOp::Not,
                expr: Box::new(expr),
            });
        }
        if self.eat(&Token::Minus) {
            let expr = self.unary()?;
            return Ok(Expr::Unary {
                op: UnOp::Neg,
                expr: Box::new(expr),
            });
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, SubstError> {
        let base = self.postfix()?;
        if self.eat(&Token::StarStar) {
            // Right-associative: 2**3**2 == 2**(3**2)
            let exponent = self.unary()?;
            return Ok(binary(base, BinOp::Pow, exponent));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, SubstError> {
        let mut expr = self.primary()?;
        while self.eat(&Token::LBracket) {
            let index = self.or_expr()?;
            self.expect(Token::RBracket)?;
            expr = Expr::Index {
                base: Box::new(expr),
                index: Box::new(index),
            };
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, SubstError> {
        match self.next() {
            Some(Token::Int(i)) => Ok(Expr::Int(i)),
            Some(Token::Float(f)) => Ok(Expr::Float(f)),
            Some(Token::Str(s)) => Ok(Expr::Str(s)),
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.or_expr()?);
                        if self.eat(&Token::RBracket) {
                            break;
                        }
                        self.expect(Token::Comma)?;
                    }
                }
                Ok(Expr::List(items))
            }
            Some(Token::Ident(name)) => self.ident_tail(name),
            Some(other) => Err(self.syntax(format!("unexpected token {:?}", other))),
            None => Err(self.syntax("unexpected end of expression")),
        }
    }

    /// Continue after a leading identifier: boolean literals, function
    /// calls, or dotted lookups.
    fn ident_tail(&mut self, name: String) -> Result<Expr, SubstError> {
        match name.as_str() {
            "true" | "True" => return Ok(Expr::Bool(true)),
            "false" | "False" => return Ok(Expr::Bool(false)),
            _ => {}
        }

        if self.eat(&Token::LParen) {
            let mut args = Vec::new();
            if !self.eat(&Token::RParen) {
                loop {
                    args.push(self.or_expr()?);
                    if self.eat(&Token::RParen) {
                        break;
                    }
                    self.expect(Token::Comma)?;
                }
            }
            return Ok(Expr::Call { func: name, args });
        }

        let mut path = name;
        while self.eat(&Token::Dot) {
            match self.next() {
                Some(Token::Ident(seg)) => {
                    path.push('.');
                    path.push_str(&seg);
                }
                Some(Token::Int(i)) => {
                    // list index segment, e.g. previous.files.0
                    path.push('.');
                    path.push_str(&i.to_string());
                }
                _ => return Err(self.syntax("expected identifier after '.'")),
            }
        }
        Ok(Expr::Lookup(path))
    }
}

fn binary(lhs: Expr, op: BinOp, rhs: Expr) -> Expr {
    Expr::Binary {
        lhs: Box::new(lhs),
        op,
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
