//! The in-house grammar, wired to the scope.
//!
//! [`ExprParser`] implements [`Parse`] for [`Parseable`] inputs using
//! `mathscope-parser`, and produces nodes that evaluate with
//! `mathscope-eval`. [`ValidatorSpec`] names the stock validators so hosts
//! can attach them from serialized data.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use mathscope_eval::{
    builtin_names, evaluate_statement, free_symbols, free_symbols_of_expr, is_builtin, validators,
    Evaluator, DEFAULT_GAS_LIMIT,
};
use mathscope_parser::{
    is_identifier, parse_assignment_target, parse_expression, parse_statement, validate_params,
};
use mathscope_types::ast::{Expr, Ident, NodeKind, Statement};
use mathscope_types::{ScopeError, Span, Value};

use crate::node::{EvaluationScope, MathNode, Parse, Validate};
use crate::options::ScopeOptions;
use crate::scope::MathScope;

// ══════════════════════════════════════════════════════════════════════════════
// Inputs
// ══════════════════════════════════════════════════════════════════════════════

/// One host input.
///
/// In JSON: a string, `{lhs, rhs}`, `{name, params, rhs}`, or an array of
/// expression strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parseable {
    /// `"a = 1 + 2"`, `"f(x) = x^2"`, `"[1, 2, 3]"`
    Expr(String),
    /// An assignment given as separate halves.
    Assignment { lhs: String, rhs: String },
    /// A function assignment given as name, parameter list and body.
    FunctionAssignment {
        name: String,
        params: Vec<String>,
        rhs: String,
    },
    /// Independent expressions evaluated into one list.
    Array(Vec<String>),
}

impl From<&str> for Parseable {
    fn from(text: &str) -> Self {
        Parseable::Expr(text.to_string())
    }
}

impl From<String> for Parseable {
    fn from(text: String) -> Self {
        Parseable::Expr(text)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Nodes
// ══════════════════════════════════════════════════════════════════════════════

/// A parsed statement.
#[derive(Debug, Clone)]
pub struct ExprNode {
    kind: NodeKind,
    statement: Statement,
    symbols: BTreeSet<String>,
    gas_limit: u64,
}

impl ExprNode {
    pub fn new(statement: Statement, gas_limit: u64) -> Self {
        Self {
            kind: statement.node_kind(),
            symbols: free_symbols(&statement),
            statement,
            gas_limit,
        }
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }
}

impl MathNode for ExprNode {
    fn kind(&self) -> &NodeKind {
        &self.kind
    }

    fn symbols(&self) -> &BTreeSet<String> {
        &self.symbols
    }

    fn evaluate(&self, scope: &EvaluationScope) -> Result<Value, ScopeError> {
        Ok(evaluate_statement(&self.statement, scope, self.gas_limit)?)
    }
}

/// Independent expressions evaluated into one list. Item failures are
/// reported together, keyed by position.
#[derive(Debug, Clone)]
pub struct ArrayNode {
    kind: NodeKind,
    items: Vec<Expr>,
    symbols: BTreeSet<String>,
    gas_limit: u64,
}

impl ArrayNode {
    pub fn new(items: Vec<Expr>, gas_limit: u64) -> Self {
        let bound = BTreeSet::new();
        let symbols = items
            .iter()
            .flat_map(|item| free_symbols_of_expr(item, &bound))
            .collect();
        Self {
            kind: NodeKind::Value,
            items,
            symbols,
            gas_limit,
        }
    }
}

impl MathNode for ArrayNode {
    fn kind(&self) -> &NodeKind {
        &self.kind
    }

    fn symbols(&self) -> &BTreeSet<String> {
        &self.symbols
    }

    fn evaluate(&self, scope: &EvaluationScope) -> Result<Value, ScopeError> {
        let mut values = Vec::with_capacity(self.items.len());
        let mut errors: BTreeMap<usize, ScopeError> = BTreeMap::new();
        for (i, item) in self.items.iter().enumerate() {
            match Evaluator::new(scope, self.gas_limit).eval_expr(item) {
                Ok(value) => values.push(value),
                Err(error) => {
                    errors.insert(i, error.into());
                }
            }
        }
        if errors.is_empty() {
            Ok(Value::List(values))
        } else {
            Err(ScopeError::Batch { errors })
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Parser
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprParser {
    gas_limit: u64,
}

impl Default for ExprParser {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }
}

impl ExprParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Step budget for each evaluation of a node this parser produces.
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }

    /// Scope options whose builtins are this grammar's builtin names.
    pub fn scope_options(&self) -> ScopeOptions {
        ScopeOptions::default().with_builtins(builtin_names())
    }

    /// `spec`, probing function values within this parser's step budget.
    pub fn validator(&self, spec: ValidatorSpec) -> BoundedValidator {
        spec.with_gas_limit(self.gas_limit)
    }

    /// A scope using this parser with [`scope_options`](Self::scope_options).
    pub fn into_scope(self) -> MathScope<Parseable> {
        let options = self.scope_options();
        MathScope::new(self, options)
    }

    fn parse_text(&self, text: &str) -> Result<ExprNode, ScopeError> {
        let statement = parse_statement(text)?;
        if let Some(name) = statement.defined_name() {
            let is_function = matches!(statement, Statement::FunctionAssignment { .. });
            reject_builtin(name, is_function)?;
        }
        Ok(ExprNode::new(statement, self.gas_limit))
    }

    fn parse_split(&self, lhs: &str, rhs: &str) -> Result<ExprNode, ScopeError> {
        let target = parse_assignment_target(lhs).and_then(|(name, params)| {
            reject_builtin(&name.name, params.is_some())?;
            Ok((name, params))
        });
        match (target, parse_expression(rhs)) {
            (Ok((name, params)), Ok(body)) => {
                let span = body.span;
                let statement = match params {
                    None => Statement::Assignment {
                        name,
                        value: body,
                        span,
                    },
                    Some(params) => Statement::FunctionAssignment {
                        name,
                        params,
                        body,
                        span,
                    },
                };
                Ok(ExprNode::new(statement, self.gas_limit))
            }
            (target, body) => Err(ScopeError::SplitAssignment {
                lhs: target.err().map(Box::new),
                rhs: body.err().map(Box::new),
            }),
        }
    }

    fn parse_function(&self, name: &str, params: &[String], rhs: &str) -> Result<ExprNode, ScopeError> {
        let name = name.trim();
        let lhs = if is_identifier(name) {
            validate_params(params).and_then(|()| reject_builtin(name, true))
        } else {
            Err(ScopeError::AssignmentLhs {
                message: format!("\"{name}\" is not a valid function name."),
                is_function: true,
                param_errors: BTreeMap::new(),
            })
        };
        match (lhs, parse_expression(rhs)) {
            (Ok(()), Ok(body)) => {
                let span = body.span;
                let statement = Statement::FunctionAssignment {
                    name: Ident::new(name, Span::new(0, name.len())),
                    params: params
                        .iter()
                        .map(|p| {
                            let p = p.trim();
                            Ident::new(p, Span::new(0, p.len()))
                        })
                        .collect(),
                    body,
                    span,
                };
                Ok(ExprNode::new(statement, self.gas_limit))
            }
            (lhs, body) => Err(ScopeError::SplitAssignment {
                lhs: lhs.err().map(Box::new),
                rhs: body.err().map(Box::new),
            }),
        }
    }

    fn parse_array(&self, items: &[String]) -> Result<ArrayNode, ScopeError> {
        let mut exprs = Vec::with_capacity(items.len());
        let mut errors = BTreeMap::new();
        for (i, item) in items.iter().enumerate() {
            match parse_expression(item) {
                Ok(expr) => exprs.push(expr),
                Err(error) => {
                    errors.insert(i, error);
                }
            }
        }
        if errors.is_empty() {
            Ok(ArrayNode::new(exprs, self.gas_limit))
        } else {
            Err(ScopeError::Batch { errors })
        }
    }
}

impl Parse<Parseable> for ExprParser {
    fn parse(&self, parseable: &Parseable) -> Result<Box<dyn MathNode>, ScopeError> {
        Ok(match parseable {
            Parseable::Expr(text) => Box::new(self.parse_text(text)?),
            Parseable::Assignment { lhs, rhs } => Box::new(self.parse_split(lhs, rhs)?),
            Parseable::FunctionAssignment { name, params, rhs } => {
                Box::new(self.parse_function(name, params, rhs)?)
            }
            Parseable::Array(items) => Box::new(self.parse_array(items)?),
        })
    }
}

fn reject_builtin(name: &str, is_function: bool) -> Result<(), ScopeError> {
    if is_builtin(name) {
        return Err(ScopeError::AssignmentLhs {
            message: format!("\"{name}\" is a builtin and cannot be reassigned."),
            is_function,
            param_errors: BTreeMap::new(),
        });
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Validators
// ══════════════════════════════════════════════════════════════════════════════

/// A stock validator, by name.
///
/// JSON forms: `"real"`, `"positive"`, `"nonnegative"`, `"boolean"`,
/// `{"vector": 3}`, `{"function": [2, 3]}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorSpec {
    Real,
    Positive,
    Nonnegative,
    Boolean,
    #[serde(rename = "vector")]
    RealVector(usize),
    /// A function from R^m to R^n.
    #[serde(rename = "function")]
    RealFunction(usize, usize),
}

impl ValidatorSpec {
    /// Bound the sample call made by [`RealFunction`](Self::RealFunction).
    pub fn with_gas_limit(self, gas_limit: u64) -> BoundedValidator {
        BoundedValidator {
            spec: self,
            gas_limit,
        }
    }
}

/// Checks with the default step budget.
impl Validate for ValidatorSpec {
    fn validate(&self, value: &Value) -> Result<Value, String> {
        self.with_gas_limit(DEFAULT_GAS_LIMIT).validate(value)
    }
}

/// A [`ValidatorSpec`] with the step budget its function probe may spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedValidator {
    spec: ValidatorSpec,
    gas_limit: u64,
}

impl BoundedValidator {
    pub fn spec(&self) -> ValidatorSpec {
        self.spec
    }

    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }
}

impl Validate for BoundedValidator {
    fn validate(&self, value: &Value) -> Result<Value, String> {
        match self.spec {
            ValidatorSpec::Real => validators::real(value),
            ValidatorSpec::Positive => validators::positive(value),
            ValidatorSpec::Nonnegative => validators::nonnegative(value),
            ValidatorSpec::Boolean => validators::boolean(value),
            ValidatorSpec::RealVector(dim) => validators::real_vector(value, dim),
            ValidatorSpec::RealFunction(from, to) => {
                validators::real_function(value, from, to, self.gas_limit)
            }
        }
    }
}
