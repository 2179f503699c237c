//! Builtin constants and functions.
//!
//! Builtins are always resolvable: they never create dependency edges and
//! never count as unmet. User assignments may not redefine them.

use crate::error::{EvalError, EvalResult};
use mathscope_types::Value;
use std::collections::BTreeSet;

/// Named numeric constants.
pub const CONSTANTS: &[(&str, f64)] = &[
    ("pi", std::f64::consts::PI),
    ("e", std::f64::consts::E),
    ("tau", std::f64::consts::TAU),
    ("phi", 1.618_033_988_749_895),
    ("Infinity", f64::INFINITY),
    ("NaN", f64::NAN),
];

/// Builtin function names.
pub const FUNCTIONS: &[&str] = &[
    // Trigonometric
    "sin", "cos", "tan", "asin", "acos", "atan", "atan2", "sinh", "cosh", "tanh",
    // Exponential
    "exp", "log", "log10", "log2", "sqrt", "cbrt", "pow",
    // Rounding & sign
    "abs", "sign", "floor", "ceil", "round", "mod",
    // Aggregates
    "min", "max", "hypot",
    // Vectors
    "dot", "cross", "norm", "normalize",
];

/// Every reserved builtin name.
pub fn builtin_names() -> BTreeSet<String> {
    CONSTANTS
        .iter()
        .map(|(name, _)| *name)
        .chain(FUNCTIONS.iter().copied())
        .map(str::to_string)
        .collect()
}

pub fn is_builtin(name: &str) -> bool {
    is_builtin_function(name) || CONSTANTS.iter().any(|(n, _)| *n == name)
}

pub fn is_builtin_function(name: &str) -> bool {
    FUNCTIONS.contains(&name)
}

/// The value of a builtin symbol: a constant, or a builtin function as a value.
pub fn builtin_constant(name: &str) -> Option<Value> {
    if let Some((_, n)) = CONSTANTS.iter().find(|(n, _)| *n == name) {
        return Some(Value::Number(*n));
    }
    if is_builtin_function(name) {
        return Some(Value::Function(std::rc::Rc::new(
            mathscope_types::FunctionValue::Builtin {
                name: name.to_string(),
            },
        )));
    }
    None
}

/// Floored modulo: the result takes the sign of the divisor.
pub fn floored_mod(x: f64, y: f64) -> f64 {
    if y == 0.0 {
        return x;
    }
    x - y * (x / y).floor()
}

fn sign(x: f64) -> f64 {
    if x == 0.0 || x.is_nan() {
        x
    } else {
        x.signum()
    }
}

// ── Argument helpers ──────────────────────────────────────────────────────────

fn expect_arity(name: &str, args: &[Value], n: usize) -> EvalResult<()> {
    if args.len() == n {
        Ok(())
    } else {
        Err(EvalError::wrong_arity(name, args.len(), n.to_string()))
    }
}

fn number_arg(name: &str, arg: &Value) -> EvalResult<f64> {
    arg.as_number().ok_or_else(|| {
        EvalError::type_mismatch(format!(
            "Function {name} expects a number, got {}",
            arg.type_name()
        ))
    })
}

fn vector_arg(name: &str, arg: &Value) -> EvalResult<Vec<f64>> {
    arg.as_real_vector().ok_or_else(|| {
        EvalError::type_mismatch(format!(
            "Function {name} expects a vector of numbers, got {}",
            arg.type_name()
        ))
    })
}

fn unary(name: &str, args: &[Value], f: fn(f64) -> f64) -> EvalResult<Value> {
    expect_arity(name, args, 1)?;
    Ok(Value::Number(f(number_arg(name, &args[0])?)))
}

fn binary(name: &str, args: &[Value], f: fn(f64, f64) -> f64) -> EvalResult<Value> {
    expect_arity(name, args, 2)?;
    let a = number_arg(name, &args[0])?;
    let b = number_arg(name, &args[1])?;
    Ok(Value::Number(f(a, b)))
}

fn variadic(name: &str, args: &[Value]) -> EvalResult<Vec<f64>> {
    if args.is_empty() {
        return Err(EvalError::wrong_arity(name, 0, "at least 1"));
    }
    args.iter().map(|a| number_arg(name, a)).collect()
}

fn abs(value: &Value) -> EvalResult<Value> {
    match value {
        Value::Number(n) => Ok(Value::Number(n.abs())),
        Value::List(items) => items.iter().map(abs).collect::<EvalResult<Vec<_>>>().map(Value::List),
        other => Err(EvalError::type_mismatch(format!(
            "Function abs expects a number, got {}",
            other.type_name()
        ))),
    }
}

fn same_length(name: &str, a: &[f64], b: &[f64]) -> EvalResult<()> {
    if a.len() == b.len() {
        Ok(())
    } else {
        Err(EvalError::Domain(format!(
            "Function {name}: dimension mismatch ({} != {})",
            a.len(),
            b.len()
        )))
    }
}

fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

/// Call the builtin function `name`.
pub fn call_builtin(name: &str, args: &[Value]) -> EvalResult<Value> {
    match name {
        "sin" => unary(name, args, f64::sin),
        "cos" => unary(name, args, f64::cos),
        "tan" => unary(name, args, f64::tan),
        "asin" => unary(name, args, f64::asin),
        "acos" => unary(name, args, f64::acos),
        "atan" => unary(name, args, f64::atan),
        "atan2" => binary(name, args, f64::atan2),
        "sinh" => unary(name, args, f64::sinh),
        "cosh" => unary(name, args, f64::cosh),
        "tanh" => unary(name, args, f64::tanh),

        "exp" => unary(name, args, f64::exp),
        "log" => match args.len() {
            1 => unary(name, args, f64::ln),
            2 => binary(name, args, f64::log),
            n => Err(EvalError::wrong_arity(name, n, "1 or 2")),
        },
        "log10" => unary(name, args, f64::log10),
        "log2" => unary(name, args, f64::log2),
        "sqrt" => unary(name, args, f64::sqrt),
        "cbrt" => unary(name, args, f64::cbrt),
        "pow" => binary(name, args, f64::powf),

        "abs" => {
            expect_arity(name, args, 1)?;
            abs(&args[0])
        }
        "sign" => unary(name, args, sign),
        "floor" => unary(name, args, f64::floor),
        "ceil" => unary(name, args, f64::ceil),
        "round" => unary(name, args, f64::round),
        "mod" => binary(name, args, floored_mod),

        "min" => Ok(Value::Number(
            variadic(name, args)?.into_iter().fold(f64::INFINITY, f64::min),
        )),
        "max" => Ok(Value::Number(
            variadic(name, args)?
                .into_iter()
                .fold(f64::NEG_INFINITY, f64::max),
        )),
        "hypot" => Ok(Value::Number(norm(&variadic(name, args)?))),

        "dot" => {
            expect_arity(name, args, 2)?;
            let a = vector_arg(name, &args[0])?;
            let b = vector_arg(name, &args[1])?;
            same_length(name, &a, &b)?;
            Ok(Value::Number(a.iter().zip(&b).map(|(x, y)| x * y).sum()))
        }
        "cross" => {
            expect_arity(name, args, 2)?;
            let a = vector_arg(name, &args[0])?;
            let b = vector_arg(name, &args[1])?;
            if a.len() != 3 || b.len() != 3 {
                return Err(EvalError::Domain(
                    "Function cross expects two 3-dimensional vectors".to_string(),
                ));
            }
            Ok(Value::vector([
                a[1] * b[2] - a[2] * b[1],
                a[2] * b[0] - a[0] * b[2],
                a[0] * b[1] - a[1] * b[0],
            ]))
        }
        "norm" => {
            expect_arity(name, args, 1)?;
            match &args[0] {
                Value::Number(n) => Ok(Value::Number(n.abs())),
                other => Ok(Value::Number(norm(&vector_arg(name, other)?))),
            }
        }
        "normalize" => {
            expect_arity(name, args, 1)?;
            let v = vector_arg(name, &args[0])?;
            let length = norm(&v);
            if length == 0.0 {
                return Err(EvalError::Domain(
                    "Function normalize: cannot normalize the zero vector".to_string(),
                ));
            }
            Ok(Value::vector(v.into_iter().map(|x| x / length)))
        }

        _ => Err(EvalError::UndefinedFunction(name.to_string())),
    }
}
