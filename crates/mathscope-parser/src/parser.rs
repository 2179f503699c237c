//! Core parser infrastructure: token cursor, error reporting, entry points.

use mathscope_lexer::token::{Token, TokenKind};
use mathscope_lexer::Lexer;
use mathscope_types::ast::{Expr, ExprKind, Ident, Statement};
use mathscope_types::{ScopeError, Span, MAX_ERRORS};

/// Maximum nesting depth of a single expression: brackets, prefix
/// operators and exponents each open a level.
pub const MAX_EXPR_DEPTH: u32 = 64;

/// Maximum height of a parsed expression tree. Long operator chains are
/// flat in the source but build one level per operand.
pub const MAX_TREE_DEPTH: u32 = 256;

/// The expression parser.
///
/// Consumes a token stream produced by the lexer and builds a
/// [`Statement`] or [`Expr`]. Parsing stops at the first structural error;
/// lexer errors are carried through.
pub struct Parser<'src> {
    pub(crate) source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ScopeError>,
    pub(crate) expr_depth: u32,
}

/// Result of parsing.
#[derive(Debug)]
pub struct ParseResult<T> {
    pub node: Option<T>,
    pub errors: Vec<ScopeError>,
}

impl<T> ParseResult<T> {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The parsed node, or the first error.
    pub fn into_result(mut self) -> Result<T, ScopeError> {
        if !self.errors.is_empty() {
            return Err(self.errors.swap_remove(0));
        }
        self.node
            .ok_or_else(|| ScopeError::parse("Failed to parse expression.", None))
    }
}

impl<'src> Parser<'src> {
    /// Lex `source` and create a parser over its tokens.
    pub fn new(source: &'src str) -> Self {
        let lexed = Lexer::new(source).lex();
        Self {
            source,
            tokens: lexed.tokens,
            pos: 0,
            errors: lexed.errors,
            expr_depth: 0,
        }
    }

    /// Parse a full input: a bare expression or an assignment.
    pub fn parse_statement(mut self) -> ParseResult<Statement> {
        let node = self.parse_input(Self::parse_statement_inner);
        self.finish(node)
    }

    /// Parse a bare expression; a top-level `=` is an error.
    pub fn parse_expression_only(mut self) -> ParseResult<Expr> {
        let node = self.parse_input(Self::parse_expression);
        self.finish(node)
    }

    /// Parse the left-hand side of an assignment given on its own:
    /// `name` or `name(param, ...)`.
    pub fn parse_lhs(mut self) -> ParseResult<(Ident, Option<Vec<Ident>>)> {
        let node = self.parse_input(|p| {
            let expr = p.parse_expression()?;
            match p.lhs_from_expr(&expr) {
                Ok(lhs) => Some(lhs),
                Err(err) => {
                    p.push_error(err);
                    None
                }
            }
        });
        self.finish(node)
    }

    fn parse_input<T>(&mut self, parse: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        if self.has_errors() {
            return None;
        }
        if self.at_end() {
            self.error_at_current("Empty expression.");
            return None;
        }
        let node = parse(self)?;
        if !self.at_end() {
            self.error_at_current(format!("Unexpected '{}'", self.peek_kind()));
            return None;
        }
        Some(node)
    }

    fn finish<T>(self, node: Option<T>) -> ParseResult<T> {
        let node = if self.errors.is_empty() { node } else { None };
        ParseResult {
            node,
            errors: self.errors,
        }
    }

    // ── Depth Limits ──────────────────────────────────────────────────────────

    /// Run `parse` one nesting level deeper, failing past [`MAX_EXPR_DEPTH`].
    pub(crate) fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        if self.expr_depth >= MAX_EXPR_DEPTH {
            self.error_at_current(format!(
                "maximum expression nesting depth is {MAX_EXPR_DEPTH}"
            ));
            return None;
        }
        self.expr_depth += 1;
        let result = parse(self);
        self.expr_depth -= 1;
        result
    }

    /// Build an expression node, rejecting trees taller than [`MAX_TREE_DEPTH`].
    pub(crate) fn node(&mut self, kind: ExprKind, span: Span) -> Option<Expr> {
        let expr = Expr::new(kind, span);
        if expr.depth() > MAX_TREE_DEPTH {
            self.error_at(
                format!("Expression is too large (more than {MAX_TREE_DEPTH} levels deep)"),
                span,
            );
            return None;
        }
        Some(expr)
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    pub(crate) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).or_else(|| self.tokens.last())
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        self.peek().map(|t| &t.kind).unwrap_or(&TokenKind::Eof)
    }

    /// Advance the cursor by one and return the consumed token's span.
    pub(crate) fn advance(&mut self) -> Span {
        let span = self.current_span();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        span
    }

    pub(crate) fn previous_kind(&self) -> Option<&TokenKind> {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| &t.kind)
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek()
            .map(|t| t.span)
            .unwrap_or_else(|| Span::point(self.source.len()))
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn check_exact(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check_exact(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect a specific token kind. Returns its span if matched, or emits an error.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Span> {
        if self.check_exact(expected) {
            Some(self.advance())
        } else {
            self.error_at_current(format!(
                "expected '{}', got '{}'",
                expected,
                self.peek_kind()
            ));
            None
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    pub(crate) fn error_at_current(&mut self, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(message, span);
    }

    pub(crate) fn error_at(&mut self, message: impl Into<String>, span: Span) {
        self.push_error(ScopeError::parse(message, Some(span)));
    }

    pub(crate) fn push_error(&mut self, error: ScopeError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
    }

    pub(crate) fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Source text covered by `span`.
    pub(crate) fn text(&self, span: Span) -> &'src str {
        span.slice(self.source).unwrap_or("")
    }
}
