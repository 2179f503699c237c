//! Core lexer: converts expression text to a token stream.
//!
//! - Numbers with optional fraction and exponent (`1`, `2.5`, `.5`, `6e-3`)
//! - Identifiers of ASCII letters, digits and `_` (leading `_` allowed)
//! - Whitespace, including newlines, is insignificant
//! - Error recovery: collects up to [`MAX_ERRORS`] errors instead of
//!   stopping at the first

use mathscope_types::{ScopeError, Span, MAX_ERRORS};

use crate::token::{Token, TokenKind};

/// The expression lexer.
pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    /// Current byte offset into `source`.
    pos: usize,
    errors: Vec<ScopeError>,
}

/// Result of lexing: tokens + any errors collected.
#[derive(Debug)]
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub errors: Vec<ScopeError>,
}

impl LexResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Lex the entire input into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.errors.len() >= MAX_ERRORS {
                break;
            }
            let token = self.scan();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, Span::point(self.pos)));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start, self.pos)
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token::new(kind, self.span_from(start))
    }

    /// Consume `second` if it is next, choosing between a two- and one-byte token.
    fn either(&mut self, second: u8, double: TokenKind, single: TokenKind, start: usize) -> Token {
        if self.peek() == Some(second) {
            self.advance();
            self.token(double, start)
        } else {
            self.token(single, start)
        }
    }

    fn emit_error(&mut self, message: impl Into<String>, span: Span) {
        self.errors.push(ScopeError::parse(message, Some(span)));
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Scanning
    // ─────────────────────────────────────────────────────────────

    fn scan(&mut self) -> Token {
        self.skip_whitespace();

        let start = self.pos;
        let Some(ch) = self.advance() else {
            return Token::new(TokenKind::Eof, Span::point(start));
        };

        match ch {
            b'0'..=b'9' => self.scan_number(start),
            b'.' if matches!(self.peek(), Some(b'0'..=b'9')) => self.scan_number(start),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(start),

            b'+' => self.token(TokenKind::Plus, start),
            b'-' => self.token(TokenKind::Minus, start),
            b'*' => self.token(TokenKind::Star, start),
            b'/' => self.token(TokenKind::Slash, start),
            b'^' => self.token(TokenKind::Caret, start),
            b'%' => self.token(TokenKind::Percent, start),
            b'?' => self.token(TokenKind::Question, start),
            b':' => self.token(TokenKind::Colon, start),
            b'(' => self.token(TokenKind::LParen, start),
            b')' => self.token(TokenKind::RParen, start),
            b'[' => self.token(TokenKind::LBracket, start),
            b']' => self.token(TokenKind::RBracket, start),
            b',' => self.token(TokenKind::Comma, start),

            b'=' => self.either(b'=', TokenKind::EqEq, TokenKind::Eq, start),
            b'!' => self.either(b'=', TokenKind::BangEq, TokenKind::Bang, start),
            b'<' => self.either(b'=', TokenKind::LessEq, TokenKind::Less, start),
            b'>' => self.either(b'=', TokenKind::GreaterEq, TokenKind::Greater, start),

            _ => {
                // Skip the rest of a multi-byte character.
                while matches!(self.peek(), Some(b) if b & 0b1100_0000 == 0b1000_0000) {
                    self.advance();
                }
                let span = self.span_from(start);
                let text = span.slice(self.source).unwrap_or("?");
                self.emit_error(format!("Unexpected character '{text}'"), span);
                if self.errors.len() >= MAX_ERRORS {
                    return Token::new(TokenKind::Eof, Span::point(self.pos));
                }
                self.scan()
            }
        }
    }

    fn scan_digits(&mut self) {
        while let Some(b'0'..=b'9') = self.peek() {
            self.advance();
        }
    }

    fn scan_number(&mut self, start: usize) -> Token {
        // The first digit (or a leading '.') was already consumed.
        self.scan_digits();

        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            self.advance();
            self.scan_digits();
        }

        // Exponent only when digits follow; otherwise `2e` is `2` then `e`.
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let digits_at = match self.peek_at(1) {
                Some(b'+' | b'-') => 2,
                _ => 1,
            };
            if matches!(self.peek_at(digits_at), Some(b'0'..=b'9')) {
                for _ in 0..digits_at {
                    self.advance();
                }
                self.scan_digits();
            }
        }

        let span = self.span_from(start);
        let text = span.slice(self.source).unwrap_or("");
        match text.parse::<f64>() {
            Ok(value) => Token::new(TokenKind::Number(value), span),
            Err(_) => {
                self.emit_error(format!("Invalid number '{text}'"), span);
                Token::new(TokenKind::Number(f64::NAN), span)
            }
        }
    }

    fn scan_identifier(&mut self, start: usize) -> Token {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == b'_' {
                self.advance();
            } else {
                break;
            }
        }
        let span = self.span_from(start);
        let text = span.slice(self.source).unwrap_or("");
        let kind = TokenKind::keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()));
        Token::new(kind, span)
    }
}
