//! Lexer implementation using logos

use std::collections::VecDeque;
use std::mem;

use logos::Logos;

use super::token::{Token, TokenKind};
use crate::common::{SemaError, SemaResult, Span};

/// Lexer with arbitrary lookahead
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
    peeked: VecDeque<Token>,
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            peeked: VecDeque::new(),
            at_eof: false,
        }
    }

    fn scan(&mut self) -> SemaResult<Token> {
        if self.at_eof {
            let len = self.inner.source().len();
            return Ok(Token::new(TokenKind::Eof, Span::new(len, len)));
        }
        match self.inner.next() {
            Some(Ok(kind)) => {
                let span = self.inner.span();
                Ok(Token::new(kind, Span::new(span.start, span.end)))
            }
            Some(Err(())) => {
                let span = self.inner.span();
                Err(SemaError::lexer(
                    format!("unexpected character '{}'", self.inner.slice()),
                    Span::new(span.start, span.end),
                ))
            }
            None => {
                self.at_eof = true;
                let len = self.inner.source().len();
                Ok(Token::new(TokenKind::Eof, Span::new(len, len)))
            }
        }
    }

    pub fn next_token(&mut self) -> SemaResult<Token> {
        match self.peeked.pop_front() {
            Some(token) => Ok(token),
            None => self.scan(),
        }
    }

    /// Token `n` positions ahead without consuming anything
    pub fn peek_at(&mut self, n: usize) -> SemaResult<&Token> {
        while self.peeked.len() <= n {
            let token = self.scan()?;
            self.peeked.push_back(token);
        }
        Ok(&self.peeked[n])
    }

    pub fn peek(&mut self) -> SemaResult<&Token> {
        self.peek_at(0)
    }

    pub fn check(&mut self, expected: &TokenKind) -> SemaResult<bool> {
        Ok(mem::discriminant(&self.peek()?.kind) == mem::discriminant(expected))
    }

    pub fn match_token(&mut self, expected: &TokenKind) -> SemaResult<bool> {
        if self.check(expected)? {
            self.next_token()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn expect(&mut self, expected: TokenKind) -> SemaResult<Token> {
        let token = self.next_token()?;
        if mem::discriminant(&token.kind) == mem::discriminant(&expected) {
            Ok(token)
        } else {
            Err(SemaError::parser(format!("expected {}, found {}", expected, token.kind), token.span))
        }
    }

    pub fn tokenize_all(mut self) -> SemaResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}
