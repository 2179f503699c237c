//! Runtime error types for the evaluator.

use mathscope_types::ScopeError;

/// Evaluation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// Unknown symbol
    #[error("Undefined symbol {0}")]
    UndefinedSymbol(String),
    /// Unknown function in call position
    #[error("Undefined function {0}")]
    UndefinedFunction(String),
    /// Operand or argument of the wrong type
    #[error("{0}")]
    TypeMismatch(String),
    #[error("Wrong number of arguments in function {name} ({given} provided, {expected} expected)")]
    WrongArity {
        name: String,
        given: usize,
        expected: String,
    },
    #[error("{0} is not a function")]
    NotCallable(String),
    /// 1-based index outside `1..=len`, or not an integer
    #[error("Index out of range ({index} not in 1..{len})")]
    IndexOutOfRange { index: String, len: usize },
    /// Dimension mismatch and other math-domain failures
    #[error("{0}")]
    Domain(String),
    #[error("Evaluation exceeded its step limit")]
    GasExhausted,
    #[error("Maximum function call depth exceeded")]
    CallDepthExceeded,
    #[error("Expression is nested too deeply to evaluate")]
    DepthExceeded,
    /// A failure inside a user function's body.
    #[error("{}", in_function_message(.name, .source))]
    InFunction {
        name: String,
        source: Box<EvalError>,
    },
}

/// Names starting with `_` are internal; their frames are not shown.
fn in_function_message(name: &str, source: &EvalError) -> String {
    if name.starts_with('_') {
        source.to_string()
    } else {
        format!("Error evaluating {name}: {source}")
    }
}

impl EvalError {
    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::TypeMismatch(message.into())
    }

    pub fn wrong_arity(name: &str, given: usize, expected: impl Into<String>) -> Self {
        Self::WrongArity {
            name: name.to_string(),
            given,
            expected: expected.into(),
        }
    }

    /// The innermost error, unwrapping function frames.
    pub fn root_cause(&self) -> &EvalError {
        match self {
            Self::InFunction { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<EvalError> for ScopeError {
    fn from(err: EvalError) -> Self {
        ScopeError::runtime(err.to_string())
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
