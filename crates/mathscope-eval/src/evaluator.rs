//! Core expression evaluator.

use crate::builtins;
use crate::env::Environment;
use crate::error::{EvalError, EvalResult};
use crate::symbols::free_symbols;
use mathscope_types::ast::*;
use mathscope_types::{FunctionValue, Value};
use std::collections::BTreeMap;
use std::rc::Rc;

/// Default step budget for evaluating one statement.
pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;

/// Maximum nesting of user-function calls.
pub const MAX_CALL_DEPTH: usize = 64;

/// Maximum nesting of sub-expression evaluation, counted across calls.
pub const MAX_EVAL_DEPTH: usize = 512;

/// The core evaluator: walks AST nodes and produces Values.
pub struct Evaluator<'a> {
    env: Environment<'a>,
    gas: u64,
    gas_limit: u64,
    call_depth: usize,
    eval_depth: usize,
}

impl<'a> Evaluator<'a> {
    /// Create an evaluator reading from `globals`.
    pub fn new(globals: &'a BTreeMap<String, Value>, gas_limit: u64) -> Self {
        Self {
            env: Environment::new(globals),
            gas: 0,
            gas_limit,
            call_depth: 0,
            eval_depth: 0,
        }
    }

    /// Steps consumed so far.
    pub fn gas_used(&self) -> u64 {
        self.gas
    }

    /// Consume one unit of gas. Returns error if exhausted.
    fn tick(&mut self) -> EvalResult<()> {
        self.gas += 1;
        if self.gas > self.gas_limit {
            Err(EvalError::GasExhausted)
        } else {
            Ok(())
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expression evaluation
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate an expression to a Value.
    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        self.tick()?;
        if self.eval_depth >= MAX_EVAL_DEPTH {
            return Err(EvalError::DepthExceeded);
        }
        self.eval_depth += 1;
        let result = self.eval_kind(expr);
        self.eval_depth -= 1;
        result
    }

    fn eval_kind(&mut self, expr: &Expr) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::List(items) => self.eval_list(items),
            ExprKind::Symbol(name) => self.eval_symbol(name),
            ExprKind::Call { callee, args } => self.eval_call(&callee.name, args),
            ExprKind::Index { target, index } => self.eval_index(target, index),
            ExprKind::Binary { left, op, right } => self.eval_binary(left, *op, right),
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand),
            ExprKind::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                let condition = self.eval_expr(condition)?;
                if truthy(&condition)? {
                    self.eval_expr(then_branch)
                } else {
                    self.eval_expr(else_branch)
                }
            }
            ExprKind::Paren(inner) => self.eval_expr(inner),
        }
    }

    fn eval_list(&mut self, items: &[Expr]) -> EvalResult<Value> {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            values.push(self.eval_expr(item)?);
        }
        Ok(Value::List(values))
    }

    fn eval_symbol(&self, name: &str) -> EvalResult<Value> {
        if let Some(value) = self.env.get(name) {
            return Ok(value.clone());
        }
        builtins::builtin_constant(name).ok_or_else(|| EvalError::UndefinedSymbol(name.to_string()))
    }

    fn eval_args(&mut self, args: &[Expr]) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg)?);
        }
        Ok(values)
    }

    fn eval_call(&mut self, name: &str, args: &[Expr]) -> EvalResult<Value> {
        if let Some(value) = self.env.get(name) {
            let Value::Function(func) = value else {
                return Err(EvalError::NotCallable(name.to_string()));
            };
            let func = Rc::clone(func);
            let args = self.eval_args(args)?;
            return self.call(&func, args);
        }
        if builtins::is_builtin_function(name) {
            let args = self.eval_args(args)?;
            return builtins::call_builtin(name, &args);
        }
        if builtins::is_builtin(name) {
            return Err(EvalError::NotCallable(name.to_string()));
        }
        Err(EvalError::UndefinedFunction(name.to_string()))
    }

    /// Call a function value with already-evaluated arguments.
    pub fn call(&mut self, func: &FunctionValue, args: Vec<Value>) -> EvalResult<Value> {
        match func {
            FunctionValue::Builtin { name } => builtins::call_builtin(name, &args),
            FunctionValue::User {
                name,
                params,
                body,
                captured,
            } => {
                if args.len() != params.len() {
                    return Err(EvalError::wrong_arity(
                        name,
                        args.len(),
                        params.len().to_string(),
                    ));
                }
                if self.call_depth >= MAX_CALL_DEPTH {
                    return Err(EvalError::CallDepthExceeded);
                }
                let mut inner = Evaluator {
                    env: Environment::new(captured),
                    gas: self.gas,
                    gas_limit: self.gas_limit,
                    call_depth: self.call_depth + 1,
                    eval_depth: self.eval_depth,
                };
                inner.env.push_frame(params, args);
                let result = inner.eval_expr(body);
                self.gas = inner.gas;
                result.map_err(|source| EvalError::InFunction {
                    name: name.clone(),
                    source: Box::new(source),
                })
            }
        }
    }

    fn eval_index(&mut self, target: &Expr, index: &Expr) -> EvalResult<Value> {
        let target = self.eval_expr(target)?;
        let index = self.eval_expr(index)?;
        let Value::List(items) = &target else {
            return Err(EvalError::type_mismatch(format!(
                "Cannot index a {}",
                target.type_name()
            )));
        };
        let Some(i) = index.as_number() else {
            return Err(EvalError::type_mismatch(format!(
                "Index must be a number, got {}",
                index.type_name()
            )));
        };
        if i.fract() != 0.0 || i < 1.0 || i > items.len() as f64 {
            return Err(EvalError::IndexOutOfRange {
                index: index.to_string(),
                len: items.len(),
            });
        }
        Ok(items[i as usize - 1].clone())
    }

    // ── Operators ─────────────────────────────────────────────────────────

    fn eval_binary(&mut self, left: &Expr, op: BinOp, right: &Expr) -> EvalResult<Value> {
        match op {
            BinOp::And => {
                let l = self.eval_expr(left)?;
                if !truthy(&l)? {
                    return Ok(Value::Bool(false));
                }
                let r = self.eval_expr(right)?;
                Ok(Value::Bool(truthy(&r)?))
            }
            BinOp::Or => {
                let l = self.eval_expr(left)?;
                if truthy(&l)? {
                    return Ok(Value::Bool(true));
                }
                let r = self.eval_expr(right)?;
                Ok(Value::Bool(truthy(&r)?))
            }
            _ => {
                let l = self.eval_expr(left)?;
                let r = self.eval_expr(right)?;
                if op.is_comparison() {
                    compare(op, &l, &r)
                } else {
                    arithmetic(op, &l, &r)
                }
            }
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> EvalResult<Value> {
        let value = self.eval_expr(operand)?;
        match op {
            UnaryOp::Neg => negate(&value),
            UnaryOp::Not => Ok(Value::Bool(!truthy(&value)?)),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Value operations
// ══════════════════════════════════════════════════════════════════════════

/// Booleans as-is; numbers are true when non-zero and not NaN.
fn truthy(value: &Value) -> EvalResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(*n != 0.0 && !n.is_nan()),
        other => Err(EvalError::type_mismatch(format!(
            "Expected a boolean, got {}",
            other.type_name()
        ))),
    }
}

fn negate(value: &Value) -> EvalResult<Value> {
    match value {
        Value::Number(n) => Ok(Value::Number(-n)),
        Value::List(items) => items.iter().map(negate).collect::<EvalResult<Vec<_>>>().map(Value::List),
        other => Err(EvalError::type_mismatch(format!(
            "Cannot negate a {}",
            other.type_name()
        ))),
    }
}

fn mismatch(op: BinOp, l: &Value, r: &Value) -> EvalError {
    EvalError::type_mismatch(format!(
        "Cannot apply {} to {} and {}",
        op.as_str(),
        l.type_name(),
        r.type_name()
    ))
}

fn numeric(op: BinOp, a: f64, b: f64) -> f64 {
    match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::Mod => builtins::floored_mod(a, b),
        BinOp::Pow => a.powf(b),
        _ => f64::NAN,
    }
}

/// Arithmetic with element-wise list support.
///
/// Lists combine element-wise with equal-length lists under `+` and `-`,
/// and broadcast against numbers under `+ - * /`. `list * list` of real
/// vectors is the dot product.
fn arithmetic(op: BinOp, l: &Value, r: &Value) -> EvalResult<Value> {
    match (l, r) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(numeric(op, *a, *b))),
        (Value::List(a), Value::List(b)) => match op {
            BinOp::Add | BinOp::Sub => {
                if a.len() != b.len() {
                    return Err(EvalError::Domain(format!(
                        "Dimension mismatch ({} != {})",
                        a.len(),
                        b.len()
                    )));
                }
                a.iter()
                    .zip(b)
                    .map(|(x, y)| arithmetic(op, x, y))
                    .collect::<EvalResult<Vec<_>>>()
                    .map(Value::List)
            }
            BinOp::Mul => match (l.as_real_vector(), r.as_real_vector()) {
                (Some(x), Some(y)) if x.len() == y.len() => {
                    Ok(Value::Number(x.iter().zip(&y).map(|(p, q)| p * q).sum()))
                }
                (Some(x), Some(y)) => Err(EvalError::Domain(format!(
                    "Dimension mismatch ({} != {})",
                    x.len(),
                    y.len()
                ))),
                _ => Err(mismatch(op, l, r)),
            },
            _ => Err(mismatch(op, l, r)),
        },
        (Value::List(items), Value::Number(_))
            if matches!(op, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div) =>
        {
            items
                .iter()
                .map(|x| arithmetic(op, x, r))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::List)
        }
        (Value::Number(_), Value::List(items))
            if matches!(op, BinOp::Add | BinOp::Sub | BinOp::Mul) =>
        {
            items
                .iter()
                .map(|y| arithmetic(op, l, y))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::List)
        }
        _ => Err(mismatch(op, l, r)),
    }
}

fn compare(op: BinOp, l: &Value, r: &Value) -> EvalResult<Value> {
    if let (Value::Number(a), Value::Number(b)) = (l, r) {
        let result = match op {
            BinOp::Eq => a == b,
            BinOp::NotEq => a != b,
            BinOp::Less => a < b,
            BinOp::Greater => a > b,
            BinOp::LessEq => a <= b,
            BinOp::GreaterEq => a >= b,
            _ => false,
        };
        return Ok(Value::Bool(result));
    }
    match op {
        BinOp::Eq => Ok(Value::Bool(l == r)),
        BinOp::NotEq => Ok(Value::Bool(l != r)),
        _ => Err(mismatch(op, l, r)),
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Entry points
// ══════════════════════════════════════════════════════════════════════════

/// Evaluate a parsed statement against `scope`.
///
/// Value statements produce their right-hand side's value. Function
/// assignments produce a function value that captures the current values
/// of the body's free symbols.
pub fn evaluate_statement(
    statement: &Statement,
    scope: &BTreeMap<String, Value>,
    gas_limit: u64,
) -> EvalResult<Value> {
    match statement {
        Statement::Expr(expr) | Statement::Assignment { value: expr, .. } => {
            Evaluator::new(scope, gas_limit).eval_expr(expr)
        }
        Statement::FunctionAssignment {
            name, params, body, ..
        } => {
            let captured = free_symbols(statement)
                .into_iter()
                .filter_map(|symbol| {
                    let value = scope.get(&symbol)?.clone();
                    Some((symbol, value))
                })
                .collect();
            Ok(Value::Function(Rc::new(FunctionValue::User {
                name: name.name.clone(),
                params: params.iter().map(|p| p.name.clone()).collect(),
                body: Rc::new(body.clone()),
                captured,
            })))
        }
    }
}

/// Call a function value outside any scope (used by validators and hosts).
pub fn call_function(value: &Value, args: &[Value], gas_limit: u64) -> EvalResult<Value> {
    let Value::Function(func) = value else {
        return Err(EvalError::NotCallable(value.to_string()));
    };
    let empty = BTreeMap::new();
    Evaluator::new(&empty, gas_limit).call(func, args.to_vec())
}
