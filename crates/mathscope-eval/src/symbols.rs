//! Free-symbol extraction.
//!
//! A symbol is free in a statement when its body reads it and it is not
//! one of the statement's own function parameters. Callee names count:
//! `f(x) = a + g(x)` reads `{a, g}`.

use mathscope_types::ast::{Expr, ExprKind, Statement};
use std::collections::BTreeSet;

/// Free symbols of a statement's right-hand side, in sorted order.
pub fn free_symbols(statement: &Statement) -> BTreeSet<String> {
    let bound: BTreeSet<&str> = match statement {
        Statement::FunctionAssignment { params, .. } => {
            params.iter().map(|p| p.name.as_str()).collect()
        }
        _ => BTreeSet::new(),
    };
    free_symbols_of_expr(statement.body(), &bound)
}

/// Free symbols of `expr`, excluding `bound` names.
pub fn free_symbols_of_expr(expr: &Expr, bound: &BTreeSet<&str>) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect(expr, bound, &mut out);
    out
}

fn collect(expr: &Expr, bound: &BTreeSet<&str>, out: &mut BTreeSet<String>) {
    let read = |name: &str, out: &mut BTreeSet<String>| {
        if !bound.contains(name) {
            out.insert(name.to_string());
        }
    };
    match &expr.kind {
        ExprKind::Number(_) | ExprKind::Bool(_) => {}
        ExprKind::Symbol(name) => read(name, out),
        ExprKind::List(items) => {
            for item in items {
                collect(item, bound, out);
            }
        }
        ExprKind::Call { callee, args } => {
            read(&callee.name, out);
            for arg in args {
                collect(arg, bound, out);
            }
        }
        ExprKind::Index { target, index } => {
            collect(target, bound, out);
            collect(index, bound, out);
        }
        ExprKind::Binary { left, right, .. } => {
            collect(left, bound, out);
            collect(right, bound, out);
        }
        ExprKind::Unary { operand, .. } => collect(operand, bound, out),
        ExprKind::Conditional {
            condition,
            then_branch,
            else_branch,
        } => {
            collect(condition, bound, out);
            collect(then_branch, bound, out);
            collect(else_branch, bound, out);
        }
        ExprKind::Paren(inner) => collect(inner, bound, out),
    }
}
