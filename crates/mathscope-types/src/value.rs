//! Runtime values produced by evaluating expressions.

use crate::ast::Expr;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A value held in results and in the evaluation scope.
///
/// Equality is chosen so that re-evaluating an unchanged expression yields
/// an equal value: numbers compare bitwise-identically (NaN equals NaN,
/// `0` differs from `-0`), lists element-wise, functions structurally.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Bool(bool),
    /// Vectors and matrices (nested lists).
    List(Vec<Value>),
    Function(Rc<FunctionValue>),
}

/// A callable value.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionValue {
    /// Defined by a function assignment `f(x) = body`.
    ///
    /// `captured` holds the values of the body's free symbols at the time
    /// the assignment was evaluated.
    User {
        name: String,
        params: Vec<String>,
        body: Rc<Expr>,
        captured: BTreeMap<String, Value>,
    },
    /// A builtin function referenced by name (e.g. `sin` passed as a value).
    Builtin { name: String },
}

impl FunctionValue {
    pub fn name(&self) -> &str {
        match self {
            FunctionValue::User { name, .. } | FunctionValue::Builtin { name } => name,
        }
    }

    /// Declared parameter count; `None` for builtins (variadic or checked at call time).
    pub fn arity(&self) -> Option<usize> {
        match self {
            FunctionValue::User { params, .. } => Some(params.len()),
            FunctionValue::Builtin { .. } => None,
        }
    }
}

impl Value {
    /// The value's type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::List(_) => "list",
            Value::Function(_) => "function",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionValue> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// A list of numbers as a flat `Vec<f64>`, or `None`.
    pub fn as_real_vector(&self) -> Option<Vec<f64>> {
        self.as_list()?.iter().map(Value::as_number).collect()
    }

    pub fn vector(items: impl IntoIterator<Item = f64>) -> Value {
        Value::List(items.into_iter().map(Value::Number).collect())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

// ── Formatting ────────────────────────────────────────────────────────────────

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Function(func) => write!(f, "{func}"),
        }
    }
}

impl fmt::Display for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionValue::User { name, params, .. } => {
                write!(f, "{name}({})", params.join(", "))
            }
            FunctionValue::Builtin { name } => write!(f, "{name}"),
        }
    }
}

// ── Serialization ─────────────────────────────────────────────────────────────

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Function(func) => serializer.collect_str(func),
        }
    }
}
