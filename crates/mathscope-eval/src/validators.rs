//! Stock value validators.
//!
//! Each validator either accepts a value (possibly coercing it, as
//! [`boolean`] does) or returns a human-readable rejection message.

use crate::error::EvalError;
use crate::evaluator::call_function;
use mathscope_types::Value;

/// Reject anything that is not a (non-NaN) number.
pub fn real(value: &Value) -> Result<Value, String> {
    match value {
        Value::Number(n) if !n.is_nan() => Ok(value.clone()),
        Value::Number(_) => Err("Expected a real number, got NaN.".to_string()),
        other => Err(format!("Expected a real number, got {}.", other.type_name())),
    }
}

pub fn positive(value: &Value) -> Result<Value, String> {
    match real(value)? {
        Value::Number(n) if n > 0.0 => Ok(value.clone()),
        _ => Err("Expected a positive number.".to_string()),
    }
}

pub fn nonnegative(value: &Value) -> Result<Value, String> {
    match real(value)? {
        Value::Number(n) if n >= 0.0 => Ok(value.clone()),
        _ => Err("Expected a nonnegative number.".to_string()),
    }
}

/// Coerce any value to a boolean. Never rejects.
pub fn boolean(value: &Value) -> Result<Value, String> {
    Ok(Value::Bool(match value {
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::List(_) | Value::Function(_) => true,
    }))
}

/// Accept exactly `dim` real components.
pub fn real_vector(value: &Value, dim: usize) -> Result<Value, String> {
    match value.as_real_vector() {
        Some(v) if v.len() == dim && v.iter().all(|x| !x.is_nan()) => Ok(value.clone()),
        _ => Err(format!("Expected a real vector of dimension {dim}.")),
    }
}

/// Sample input used to probe a function's output shape.
fn sample_point(dim: usize) -> Vec<Value> {
    (0..dim).map(|i| Value::Number(0.5 + 0.1 * i as f64)).collect()
}

/// Accept a function R^`from` → R^`to`.
///
/// User functions must declare exactly `from` parameters. The function is
/// then called once at a fixed sample point and its output must be a real
/// number (`to == 1`) or a real vector of dimension `to`.
pub fn real_function(value: &Value, from: usize, to: usize, gas_limit: u64) -> Result<Value, String> {
    let prefix = format!("Expected a function from R^{from} -> R^{to}.");
    let not_from = || format!("{prefix} This is not a function from R^{from}.");

    let Some(func) = value.as_function() else {
        return Err(format!("{prefix} Got a {}.", value.type_name()));
    };
    if func.arity().is_some_and(|arity| arity != from) {
        return Err(not_from());
    }

    let output = match call_function(value, &sample_point(from), gas_limit) {
        Ok(output) => output,
        Err(EvalError::WrongArity { .. }) => return Err(not_from()),
        Err(err) => return Err(format!("{prefix} Evaluating it failed: {err}")),
    };

    let shaped = if to == 1 {
        real(&output).is_ok()
    } else {
        real_vector(&output, to).is_ok()
    };
    if shaped {
        Ok(value.clone())
    } else {
        Err(format!(
            "{prefix} The outputs of this function are not in R^{to}."
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{evaluate_statement, DEFAULT_GAS_LIMIT};
    use std::collections::BTreeMap;

    fn function(source: &str) -> Value {
        let stmt = mathscope_parser::parse_statement(source).unwrap();
        evaluate_statement(&stmt, &BTreeMap::new(), DEFAULT_GAS_LIMIT).unwrap()
    }

    #[test]
    fn test_real_and_positive() {
        assert!(real(&Value::Number(-2.0)).is_ok());
        assert!(real(&Value::Number(f64::NAN)).is_err());
        assert!(real(&Value::Bool(true)).is_err());
        assert!(positive(&Value::Number(0.0)).is_err());
        assert!(positive(&Value::Number(0.1)).is_ok());
        assert!(nonnegative(&Value::Number(0.0)).is_ok());
    }

    #[test]
    fn test_boolean_coerces() {
        assert_eq!(boolean(&Value::Number(0.0)), Ok(Value::Bool(false)));
        assert_eq!(boolean(&Value::Number(3.0)), Ok(Value::Bool(true)));
        assert_eq!(boolean(&Value::vector([])), Ok(Value::Bool(true)));
    }

    #[test]
    fn test_real_vector() {
        assert!(real_vector(&Value::vector([1.0, 2.0, 3.0]), 3).is_ok());
        assert_eq!(
            real_vector(&Value::vector([1.0, 2.0]), 3),
            Err("Expected a real vector of dimension 3.".to_string())
        );
    }

    #[test]
    fn test_real_function() {
        let f = function("f(x, y) = [x, y, x*y]");
        assert!(real_function(&f, 2, 3, DEFAULT_GAS_LIMIT).is_ok());
        assert_eq!(
            real_function(&f, 1, 3, DEFAULT_GAS_LIMIT),
            Err("Expected a function from R^1 -> R^3. This is not a function from R^1.".into())
        );
        assert_eq!(
            real_function(&f, 2, 2, DEFAULT_GAS_LIMIT),
            Err("Expected a function from R^2 -> R^2. The outputs of this function are not in R^2.".into())
        );
    }

    #[test]
    fn test_builtin_function_probe() {
        let sin = crate::builtins::builtin_constant("sin").unwrap();
        assert!(real_function(&sin, 1, 1, DEFAULT_GAS_LIMIT).is_ok());
        assert!(real_function(&sin, 2, 1, DEFAULT_GAS_LIMIT).is_err());
        assert!(real_function(&Value::Number(1.0), 1, 1, DEFAULT_GAS_LIMIT).is_err());
    }
}
