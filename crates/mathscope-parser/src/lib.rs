//! mathscope parser: converts expression text into an AST.
//!
//! The free functions here are the entry points used by the scope's parser
//! adapter; [`Parser`] exposes the same operations with all collected errors.

mod parse_assign;
mod parse_expr;
mod parser;

pub use parse_assign::{is_identifier, validate_params, AssignmentTarget};
pub use parser::{ParseResult, Parser, MAX_EXPR_DEPTH, MAX_TREE_DEPTH};

use mathscope_types::ast::{Expr, Statement};
use mathscope_types::ScopeError;

/// Parse a bare expression or an assignment.
pub fn parse_statement(source: &str) -> Result<Statement, ScopeError> {
    Parser::new(source).parse_statement().into_result()
}

/// Parse a bare expression; assignments are rejected.
pub fn parse_expression(source: &str) -> Result<Expr, ScopeError> {
    Parser::new(source).parse_expression_only().into_result()
}

/// Parse an assignment target given on its own: `a` or `f(x, y)`.
pub fn parse_assignment_target(source: &str) -> Result<AssignmentTarget, ScopeError> {
    Parser::new(source).parse_lhs().into_result()
}
