//! Token types for the mathscope lexer.
//!
//! Defines [`TokenKind`] covering every lexeme of the expression grammar and
//! [`Token`], which pairs a kind with a source [`Span`].

use mathscope_types::Span;
use std::fmt;

/// Reserved words. These lex as keyword tokens and cannot be assigned.
pub const ALL_KEYWORDS: &[&str] = &["true", "false", "and", "or", "not"];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──
    /// `42`, `3.14`, `.5`, `1e-3`
    Number(f64),
    True,
    False,

    // ── Identifiers & keywords ──
    Identifier(String),
    And,
    Or,
    Not,

    // ── Operators ──
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Bang,
    Eq,
    EqEq,
    BangEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Question,
    Colon,

    // ── Punctuation ──
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,

    Eof,
}

impl TokenKind {
    /// Map an identifier to its keyword token, if it is one.
    pub fn keyword(name: &str) -> Option<TokenKind> {
        match name {
            "true" => Some(TokenKind::True),
            "false" => Some(TokenKind::False),
            "and" => Some(TokenKind::And),
            "or" => Some(TokenKind::Or),
            "not" => Some(TokenKind::Not),
            _ => None,
        }
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::True | TokenKind::False | TokenKind::And | TokenKind::Or | TokenKind::Not
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::True => f.write_str("true"),
            TokenKind::False => f.write_str("false"),
            TokenKind::Identifier(s) => f.write_str(s),
            TokenKind::And => f.write_str("and"),
            TokenKind::Or => f.write_str("or"),
            TokenKind::Not => f.write_str("not"),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Caret => f.write_str("^"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::Bang => f.write_str("!"),
            TokenKind::Eq => f.write_str("="),
            TokenKind::EqEq => f.write_str("=="),
            TokenKind::BangEq => f.write_str("!="),
            TokenKind::Less => f.write_str("<"),
            TokenKind::Greater => f.write_str(">"),
            TokenKind::LessEq => f.write_str("<="),
            TokenKind::GreaterEq => f.write_str(">="),
            TokenKind::Question => f.write_str("?"),
            TokenKind::Colon => f.write_str(":"),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::LBracket => f.write_str("["),
            TokenKind::RBracket => f.write_str("]"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}
