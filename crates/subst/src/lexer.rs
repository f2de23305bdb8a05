// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Formula tokenizer
//!
//! Produces the token stream consumed by [`crate::parse_formula`].
//! Identifiers are `[A-Za-z_][A-Za-z0-9_]*`; dotted lookups are assembled
//! by the parser from `Ident Dot Ident` sequences.

use crate::SubstError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    // Grouping and punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    StarStar,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    In,
    NotIn,
}

/// Tokenize a formula body (the text after the leading `=`).
pub fn tokenize(expr: &str) -> Result<Vec<Token>, SubstError> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();

    let syntax = |message: String| SubstError::Syntax {
        expr: expr.to_string(),
        message,
    };

    while let Some(&(pos, c)) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '.' => {
                chars.next();
                tokens.push(Token::Dot);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '%' => {
                chars.next();
                tokens.push(Token::Percent);
            }
            '^' => {
                chars.next();
                tokens.push(Token::Caret);
            }
            '*' => {
                chars.next();
                if chars.peek().map(|&(_, c)| c) == Some('*') {
                    chars.next();
                    tokens.push(Token::StarStar);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '/' => {
                chars.next();
                if chars.peek().map(|&(_, c)| c) == Some('/') {
                    chars.next();
                    tokens.push(Token::SlashSlash);
                } else {
                    tokens.push(Token::Slash);
                }
            }
            '=' => {
                chars.next();
                if chars.peek().map(|&(_, c)| c) == Some('=') {
                    chars.next();
                    tokens.push(Token::Eq);
                } else {
                    return Err(syntax("single '=' is not an operator".to_string()));
                }
            }
            '!' => {
                chars.next();
                if chars.peek().map(|&(_, c)| c) == Some('=') {
                    chars.next();
                    tokens.push(Token::Ne);
                } else {
                    tokens.push(Token::Bang);
                }
            }
            '<' => {
                chars.next();
                match chars.peek().map(|&(_, c)| c) {
                    Some('=') => {
                        chars.next();
                        tokens.push(Token::Le);
                    }
                    Some('<') => {
                        chars.next();
                        tokens.push(Token::Shl);
                    }
                    _ => tokens.push(Token::Lt),
                }
            }
            '>' => {
                chars.next();
                match chars.peek().map(|&(_, c)| c) {
                    Some('=') => {
                        chars.next();
                        tokens.push(Token::Ge);
                    }
                    Some('>') => {
                        chars.next();
                        tokens.push(Token::Shr);
                    }
                    _ => tokens.push(Token::Gt),
                }
            }
            '&' => {
                chars.next();
                if chars.peek().map(|&(_, c)| c) == Some('&') {
                    chars.next();
                    tokens.push(Token::AndAnd);
                } else {
                    tokens.push(Token::Amp);
                }
            }
            '|' => {
                chars.next();
                if chars.peek().map(|&(_, c)| c) == Some('|') {
                    chars.next();
                    tokens.push(Token::OrOr);
                } else {
                    tokens.push(Token::Pipe);
                }
            }
            '\'' | '"' => {
                let quote = c;
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                for (_, ch) in chars.by_ref() {
                    if ch == quote {
                        closed = true;
                        break;
                    }
                    text.push(ch);
                }
                if !closed {
                    return Err(syntax("unterminated string literal".to_string()));
                }
                tokens.push(Token::Str(text));
            }
            '0'..='9' => {
                let start = pos;
                let mut end = pos;
                let mut is_float = false;
                while let Some(&(p, ch)) = chars.peek() {
                    match ch {
                        '0'..='9' => {
                            end = p + ch.len_utf8();
                            chars.next();
                        }
                        // A '.' is part of the number only when followed
                        // by a digit (so `2.x` stays an error, and list
                        // indexing via lookup paths is unaffected).
                        '.' if !is_float => {
                            let mut ahead = expr[p + 1..].chars();
                            if ahead.next().is_some_and(|c| c.is_ascii_digit()) {
                                is_float = true;
                                end = p + 1;
                                chars.next();
                            } else {
                                break;
                            }
                        }
                        'e' | 'E' if is_float => {
                            end = p + 1;
                            chars.next();
                            if let Some(&(p2, sign @ ('+' | '-'))) = chars.peek() {
                                end = p2 + sign.len_utf8();
                                chars.next();
                            }
                        }
                        _ => break,
                    }
                }
                let text = &expr[start..end];
                if is_float {
                    let value: f64 = text
                        .parse()
                        .map_err(|_| syntax(format!("bad number '{text}'")))?;
                    tokens.push(Token::Float(value));
                } else {
                    let value: i64 = text
                        .parse()
                        .map_err(|_| syntax(format!("bad number '{text}'")))?;
                    tokens.push(Token::Int(value));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = pos;
                let mut end = pos;
                while let Some(&(p, ch)) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        end = p + ch.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let word = &expr[start..end];
                match word {
                    "in" => tokens.push(Token::In),
                    "not" => {
                        // `not in` is one operator; bare `not` is logical negation
                        let rest = &expr[end..];
                        let trimmed = rest.trim_start();
                        let is_not_in = trimmed.starts_with("in")
                            && !trimmed[2..]
                                .chars()
                                .next()
                                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
                        if is_not_in {
                            let stop = end + (rest.len() - trimmed.len()) + 2;
                            while chars.peek().is_some_and(|&(p, _)| p < stop) {
                                chars.next();
                            }
                            tokens.push(Token::NotIn);
                        } else {
                            tokens.push(Token::Bang);
                        }
                    }
                    _ => tokens.push(Token::Ident(word.to_string())),
                }
            }
            other => {
                return Err(syntax(format!("unexpected character '{other}'")));
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
