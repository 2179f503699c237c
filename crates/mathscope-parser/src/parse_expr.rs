//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 8. `? :` (conditional, right-associative)
//! 7. `or`
//! 6. `and`
//! 5. `==`, `!=`, `<`, `>`, `<=`, `>=` (no chaining)
//! 4. `+`, `-`
//! 3. `*`, `/`, `%`, implicit multiplication after a number (`2x`, `3(x+1)`)
//! 2. unary `-`, `+`, `not`, `!`
//! 1. `^` (right-associative; binds tighter than a unary prefix on its left)
//! 0. `f(...)` (call), `v[i]` (index)
//!
//! Recursion through brackets, prefix operators and exponents is bounded
//! by [`MAX_EXPR_DEPTH`](crate::MAX_EXPR_DEPTH); every node is built
//! through [`Parser::node`], which bounds the height of the finished tree.

use mathscope_lexer::token::TokenKind;
use mathscope_types::ast::*;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.nested(Self::parse_conditional)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `CondExpr = OrExpr [ "?" Expr ":" Expr ]`
    fn parse_conditional(&mut self) -> Option<Expr> {
        let condition = self.parse_or()?;
        if !self.eat(&TokenKind::Question) {
            return Some(condition);
        }
        let then_branch = self.parse_expression()?;
        self.expect(&TokenKind::Colon)?;
        let else_branch = self.parse_expression()?;
        let span = condition.span.merge(else_branch.span);
        self.node(
            ExprKind::Conditional {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            span,
        )
    }

    /// `OrExpr = AndExpr { "or" AndExpr }`
    fn parse_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = self.binary(left, BinOp::Or, right)?;
        }
        Some(left)
    }

    /// `AndExpr = CompExpr { "and" CompExpr }`
    fn parse_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_comparison()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_comparison()?;
            left = self.binary(left, BinOp::And, right)?;
        }
        Some(left)
    }

    /// `CompExpr = AddExpr [ CompOp AddExpr ]`
    ///
    /// Comparison operators do NOT chain: `a < b < c` is a parse error.
    fn parse_comparison(&mut self) -> Option<Expr> {
        let mut left = self.parse_add()?;
        if let Some(op) = self.match_comparison_op() {
            self.advance();
            let right = self.parse_add()?;
            left = self.binary(left, op, right)?;
            if self.match_comparison_op().is_some() {
                self.error_at_current(
                    "comparison operators cannot be chained; use 'and' to combine: a < b and b < c",
                );
                return None;
            }
        }
        Some(left)
    }

    fn match_comparison_op(&self) -> Option<BinOp> {
        match self.peek_kind() {
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::BangEq => Some(BinOp::NotEq),
            TokenKind::Less => Some(BinOp::Less),
            TokenKind::Greater => Some(BinOp::Greater),
            TokenKind::LessEq => Some(BinOp::LessEq),
            TokenKind::GreaterEq => Some(BinOp::GreaterEq),
            _ => None,
        }
    }

    /// `AddExpr = MulExpr { ("+" | "-") MulExpr }`
    fn parse_add(&mut self) -> Option<Expr> {
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mul()?;
            left = self.binary(left, op, right)?;
        }
        Some(left)
    }

    /// `MulExpr = UnaryExpr { ("*" | "/" | "%") UnaryExpr | <implicit> UnaryExpr }`
    fn parse_mul(&mut self) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            if self.at_implicit_multiplication() {
                let right = self.parse_unary()?;
                left = self.binary(left, BinOp::Mul, right)?;
                continue;
            }
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = self.binary(left, op, right)?;
        }
        Some(left)
    }

    /// A symbol, call or parenthesis directly after a number literal.
    fn at_implicit_multiplication(&self) -> bool {
        matches!(self.previous_kind(), Some(TokenKind::Number(_)))
            && matches!(
                self.peek_kind(),
                TokenKind::Identifier(_) | TokenKind::LParen
            )
    }

    /// `UnaryExpr = ("-" | "+" | "not" | "!") UnaryExpr | PowExpr`
    fn parse_unary(&mut self) -> Option<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Not | TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Plus => None,
            _ => return self.parse_power(),
        };
        let start = self.advance();
        let operand = self.nested(Self::parse_unary)?;
        let Some(op) = op else {
            return Some(operand);
        };
        let span = start.merge(operand.span);
        self.node(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        )
    }

    /// `PowExpr = PostfixExpr [ "^" UnaryExpr ]`
    fn parse_power(&mut self) -> Option<Expr> {
        let base = self.parse_postfix()?;
        if self.eat(&TokenKind::Caret) {
            let exponent = self.nested(Self::parse_unary)?;
            return self.binary(base, BinOp::Pow, exponent);
        }
        Some(base)
    }

    /// `PostfixExpr = Primary { "[" Expr "]" }`, with calls folded into `Primary`.
    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        while self.check_exact(&TokenKind::LBracket) {
            self.advance();
            let index = self.parse_expression()?;
            let end = self.expect(&TokenKind::RBracket)?;
            let span = expr.span.merge(end);
            expr = self.node(
                ExprKind::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                },
                span,
            )?;
        }
        Some(expr)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        match self.peek_kind().clone() {
            TokenKind::Number(n) => {
                let span = self.advance();
                self.node(ExprKind::Number(n), span)
            }
            TokenKind::True => {
                let span = self.advance();
                self.node(ExprKind::Bool(true), span)
            }
            TokenKind::False => {
                let span = self.advance();
                self.node(ExprKind::Bool(false), span)
            }
            TokenKind::Identifier(name) => {
                let span = self.advance();
                if self.check_exact(&TokenKind::LParen) {
                    self.parse_call(Ident::new(name, span))
                } else {
                    self.node(ExprKind::Symbol(name), span)
                }
            }
            TokenKind::LParen => {
                let start = self.advance();
                let inner = self.parse_expression()?;
                let end = self.expect(&TokenKind::RParen)?;
                self.node(ExprKind::Paren(Box::new(inner)), start.merge(end))
            }
            TokenKind::LBracket => {
                let start = self.advance();
                let items = self.parse_comma_list(&TokenKind::RBracket)?;
                let end = self.expect(&TokenKind::RBracket)?;
                self.node(ExprKind::List(items), start.merge(end))
            }
            TokenKind::Eof => {
                self.error_at_current("Unexpected end of expression");
                None
            }
            other => {
                self.error_at_current(format!("Unexpected '{other}'"));
                None
            }
        }
    }

    /// `Call = Ident "(" [ Expr { "," Expr } ] ")"`
    fn parse_call(&mut self, callee: Ident) -> Option<Expr> {
        self.expect(&TokenKind::LParen)?;
        let args = self.parse_comma_list(&TokenKind::RParen)?;
        let end = self.expect(&TokenKind::RParen)?;
        let span = callee.span.merge(end);
        self.node(ExprKind::Call { callee, args }, span)
    }

    /// Comma-separated expressions up to (not including) `close`.
    fn parse_comma_list(&mut self, close: &TokenKind) -> Option<Vec<Expr>> {
        let mut items = Vec::new();
        if self.check_exact(close) {
            return Some(items);
        }
        loop {
            items.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some(items)
    }

    fn binary(&mut self, left: Expr, op: BinOp, right: Expr) -> Option<Expr> {
        let span = left.span.merge(right.span);
        self.node(
            ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            span,
        )
    }
}
