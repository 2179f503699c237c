//! Assignment parsing and left-hand-side validation.
//!
//! `name = rhs` becomes [`Statement::Assignment`]; `name(p, q) = rhs`
//! becomes [`Statement::FunctionAssignment`]. Any other left-hand side is a
//! [`ScopeError::AssignmentLhs`], kept distinct from right-hand-side
//! failures so hosts can point at the offending half.

use std::collections::{BTreeMap, BTreeSet};

use mathscope_lexer::token::TokenKind;
use mathscope_lexer::Lexer;
use mathscope_types::ast::*;
use mathscope_types::ScopeError;

use crate::parser::Parser;

/// A parsed assignment target: the name and, for functions, its parameters.
pub type AssignmentTarget = (Ident, Option<Vec<Ident>>);

impl<'src> Parser<'src> {
    /// `Statement = Expr [ "=" Expr ]`
    pub(crate) fn parse_statement_inner(&mut self) -> Option<Statement> {
        let lhs = self.parse_expression()?;
        if !self.eat(&TokenKind::Eq) {
            return Some(Statement::Expr(lhs));
        }
        let (name, params) = match self.lhs_from_expr(&lhs) {
            Ok(target) => target,
            Err(err) => {
                self.push_error(err);
                return None;
            }
        };
        let value = self.parse_expression()?;
        let span = lhs.span.merge(value.span);
        Some(match params {
            None => Statement::Assignment { name, value, span },
            Some(params) => Statement::FunctionAssignment {
                name,
                params,
                body: value,
                span,
            },
        })
    }

    /// Interpret an already-parsed expression as an assignment target.
    pub(crate) fn lhs_from_expr(&self, expr: &Expr) -> Result<AssignmentTarget, ScopeError> {
        match &expr.kind {
            ExprKind::Symbol(name) => Ok((Ident::new(name.clone(), expr.span), None)),
            ExprKind::Call { callee, args } => {
                let texts: Vec<&str> = args.iter().map(|arg| self.text(arg.span)).collect();
                validate_params(&texts)?;
                let params = args
                    .iter()
                    .filter_map(|arg| match &arg.kind {
                        ExprKind::Symbol(name) => Some(Ident::new(name.clone(), arg.span)),
                        _ => None,
                    })
                    .collect();
                Ok((callee.clone(), Some(params)))
            }
            _ => Err(ScopeError::AssignmentLhs {
                message: "Invalid assignment left-hand side.".to_string(),
                is_function: false,
                param_errors: BTreeMap::new(),
            }),
        }
    }
}

/// True when `text` is exactly one identifier (not a keyword).
pub fn is_identifier(text: &str) -> bool {
    let lexed = Lexer::new(text).lex();
    !lexed.has_errors()
        && matches!(
            lexed.tokens.as_slice(),
            [first, last]
                if matches!(first.kind, TokenKind::Identifier(_)) && last.kind == TokenKind::Eof
        )
}

/// Validate function parameter names.
///
/// Empty and non-identifier names are reported first; only when every name
/// is well-formed is uniqueness checked. Messages are keyed by position.
pub fn validate_params<S: AsRef<str>>(params: &[S]) -> Result<(), ScopeError> {
    let mut errors = BTreeMap::new();
    for (i, param) in params.iter().enumerate() {
        let param = param.as_ref().trim();
        if param.is_empty() {
            errors.insert(i, "Parameter name cannot be empty.".to_string());
        } else if !is_identifier(param) {
            errors.insert(i, format!("\"{param}\" is not a valid parameter name."));
        }
    }
    if !errors.is_empty() {
        return Err(function_lhs_error("Some parameter names are invalid.", errors));
    }

    let mut seen = BTreeSet::new();
    for (i, param) in params.iter().enumerate() {
        if !seen.insert(param.as_ref().trim()) {
            errors.insert(i, "Parameter names must be unique.".to_string());
        }
    }
    if !errors.is_empty() {
        return Err(function_lhs_error("Parameter names must be unique.", errors));
    }
    Ok(())
}

fn function_lhs_error(message: &str, param_errors: BTreeMap<usize, String>) -> ScopeError {
    ScopeError::AssignmentLhs {
        message: message.to_string(),
        is_function: true,
        param_errors,
    }
}
