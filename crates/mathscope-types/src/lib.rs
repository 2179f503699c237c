//! Shared types for mathscope.
//!
//! This crate defines the expression AST, source spans, the runtime value
//! domain, and the closed error taxonomy used by every stage: lexer, parser,
//! evaluator, and the reactive scope itself.

mod error;
mod span;
mod value;
pub mod ast;

pub use error::{ErrorCategory, ErrorCode, ScopeError, MAX_ERRORS};
pub use span::Span;
pub use value::{FunctionValue, Value};

/// Result type used throughout mathscope.
pub type ScopeResult<T> = std::result::Result<T, ScopeError>;
