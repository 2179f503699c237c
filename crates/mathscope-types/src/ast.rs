//! AST node types for mathscope expressions.
//!
//! Every node carries a [`Span`] into the text it was parsed from.
//! A parsed input is a [`Statement`]: a bare expression, a value
//! assignment `name = rhs`, or a function assignment `f(x, y) = rhs`.

use serde::Serialize;

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

/// One parsed input.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `1 + 2`, `[x, y, 0]`
    Expr(Expr),
    /// `a = 1 + 2`
    Assignment { name: Ident, value: Expr, span: Span },
    /// `f(x, y) = x^2 + y^2`
    FunctionAssignment {
        name: Ident,
        params: Vec<Ident>,
        body: Expr,
        span: Span,
    },
}

impl Statement {
    /// The name this statement defines, if any.
    pub fn defined_name(&self) -> Option<&str> {
        match self {
            Statement::Expr(_) => None,
            Statement::Assignment { name, .. } | Statement::FunctionAssignment { name, .. } => {
                Some(&name.name)
            }
        }
    }

    /// The right-hand side (or the whole expression for bare expressions).
    pub fn body(&self) -> &Expr {
        match self {
            Statement::Expr(expr) => expr,
            Statement::Assignment { value, .. } => value,
            Statement::FunctionAssignment { body, .. } => body,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Statement::Expr(expr) => expr.span,
            Statement::Assignment { span, .. } | Statement::FunctionAssignment { span, .. } => {
                *span
            }
        }
    }

    pub fn node_kind(&self) -> NodeKind {
        match self {
            Statement::Expr(_) => NodeKind::Value,
            Statement::Assignment { name, .. } => NodeKind::ValueAssignment {
                name: name.name.clone(),
            },
            Statement::FunctionAssignment { name, params, .. } => NodeKind::FunctionAssignment {
                name: name.name.clone(),
                params: params.iter().map(|p| p.name.clone()).collect(),
            },
        }
    }
}

/// What a parsed node does to the scope when evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// Produces a value, defines nothing.
    Value,
    /// Defines `name` as a value.
    ValueAssignment { name: String },
    /// Defines `name` as a function of `params`.
    FunctionAssignment { name: String, params: Vec<String> },
}

impl NodeKind {
    /// The defined name, for assignments.
    pub fn name(&self) -> Option<&str> {
        match self {
            NodeKind::Value => None,
            NodeKind::ValueAssignment { name } | NodeKind::FunctionAssignment { name, .. } => {
                Some(name)
            }
        }
    }

    /// Names bound locally by the node (function parameters).
    pub fn params(&self) -> &[String] {
        match self {
            NodeKind::FunctionAssignment { params, .. } => params,
            _ => &[],
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers
// ══════════════════════════════════════════════════════════════════════════════

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// An expression node with its source span.
///
/// Each node records the height of the tree below it, so consumers can
/// refuse trees too deep to walk recursively without walking them first.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    depth: u32,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        let depth = max_child_depth(&kind).saturating_add(1);
        Self { kind, span, depth }
    }

    /// Height of this subtree; a leaf has depth 1.
    pub fn depth(&self) -> u32 {
        self.depth
    }
}

fn max_child_depth(kind: &ExprKind) -> u32 {
    let deepest = |exprs: &[Expr]| exprs.iter().map(Expr::depth).max().unwrap_or(0);
    match kind {
        ExprKind::Number(_) | ExprKind::Bool(_) | ExprKind::Symbol(_) => 0,
        ExprKind::List(items) => deepest(items),
        ExprKind::Call { args, .. } => deepest(args),
        ExprKind::Index { target, index } => target.depth.max(index.depth),
        ExprKind::Binary { left, right, .. } => left.depth.max(right.depth),
        ExprKind::Unary { operand, .. } => operand.depth,
        ExprKind::Conditional {
            condition,
            then_branch,
            else_branch,
        } => condition
            .depth
            .max(then_branch.depth)
            .max(else_branch.depth),
        ExprKind::Paren(inner) => inner.depth,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // ── Literals ──
    /// `42`, `3.14`, `1e-3`
    Number(f64),
    /// `true` / `false`
    Bool(bool),
    /// `[expr, ...]`
    List(Vec<Expr>),

    // ── Symbols & Calls ──
    /// `x`, `pi`, `_t`
    Symbol(String),
    /// `f(args...)`
    Call { callee: Ident, args: Vec<Expr> },
    /// `v[i]` (1-based, like the host's math library)
    Index { target: Box<Expr>, index: Box<Expr> },

    // ── Operators ──
    /// `a + b`, `a == b`, `a and b`, etc.
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// `-x`, `not x`
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// `cond ? a : b`
    Conditional {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    // ── Grouping ──
    /// `(expr)`
    Paren(Box<Expr>),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Logical
    Or,
    And,
    // Comparison
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinOp {
    /// Returns the operator symbol for error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Or => "or",
            BinOp::And => "and",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Less => "<",
            BinOp::Greater => ">",
            BinOp::LessEq => "<=",
            BinOp::GreaterEq => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Pow => "^",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq
                | BinOp::NotEq
                | BinOp::Less
                | BinOp::Greater
                | BinOp::LessEq
                | BinOp::GreaterEq
        )
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `not x`, `!x`
    Not,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(n: f64, span: Span) -> Expr {
        Expr::new(ExprKind::Number(n), span)
    }

    #[test]
    fn test_node_kind_of_statements() {
        let one = number(1.0, Span::new(4, 5));
        let value = Statement::Expr(one.clone());
        assert_eq!(value.node_kind(), NodeKind::Value);
        assert_eq!(value.node_kind().name(), None);

        let assignment = Statement::Assignment {
            name: Ident::new("a", Span::new(0, 1)),
            value: one.clone(),
            span: Span::new(0, 5),
        };
        assert_eq!(assignment.node_kind().name(), Some("a"));
        assert!(assignment.node_kind().params().is_empty());

        let function = Statement::FunctionAssignment {
            name: Ident::new("f", Span::new(0, 1)),
            params: vec![Ident::new("x", Span::new(2, 3))],
            body: one,
            span: Span::new(0, 9),
        };
        assert_eq!(
            function.node_kind(),
            NodeKind::FunctionAssignment {
                name: "f".into(),
                params: vec!["x".into()],
            }
        );
        assert_eq!(function.node_kind().params(), ["x".to_string()]);
    }

    #[test]
    fn test_expr_depth_tracks_tallest_child() {
        let leaf = number(1.0, Span::new(0, 1));
        assert_eq!(leaf.depth(), 1);

        let neg = Expr::new(
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(leaf.clone()),
            },
            Span::new(0, 2),
        );
        assert_eq!(neg.depth(), 2);

        let sum = Expr::new(
            ExprKind::Binary {
                left: Box::new(neg),
                op: BinOp::Add,
                right: Box::new(leaf.clone()),
            },
            Span::new(0, 4),
        );
        assert_eq!(sum.depth(), 3);

        let list = Expr::new(ExprKind::List(vec![leaf, sum]), Span::new(0, 6));
        assert_eq!(list.depth(), 4);
    }
}
