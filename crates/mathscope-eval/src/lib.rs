//! mathscope tree-walking evaluator.
//!
//! Evaluates parsed statements against a read-only symbol table, with gas
//! metering so no single expression can run unbounded. Also provides the
//! builtin registry, the free-symbol walker used for dependency
//! extraction, and stock value validators.

pub mod builtins;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod symbols;
pub mod validators;

pub use builtins::{builtin_constant, builtin_names, call_builtin, is_builtin, is_builtin_function};
pub use env::Environment;
pub use error::{EvalError, EvalResult};
pub use evaluator::{
    call_function, evaluate_statement, Evaluator, DEFAULT_GAS_LIMIT, MAX_CALL_DEPTH, MAX_EVAL_DEPTH,
};
pub use symbols::{free_symbols, free_symbols_of_expr};
