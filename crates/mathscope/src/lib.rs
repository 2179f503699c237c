//! mathscope: a reactive scope of math expressions.
//!
//! Expressions are registered by id. Assignments (`a = 1 + 2`,
//! `f(x) = x^2`) define names other expressions can read; the scope tracks
//! those dependencies, re-evaluates exactly what a change affects, and
//! reports what changed through [`ScopeChange`] values and listeners.
//!
//! The scope itself works against the [`Parse`], [`MathNode`] and
//! [`Validate`] traits. The [`adapter`] module supplies the in-house
//! grammar.
//!
//! ```
//! use mathscope::adapter::ExprParser;
//! use mathscope::{IdentifiedParseable, Value};
//!
//! let mut scope = ExprParser::new().into_scope();
//! scope.set_expressions([
//!     IdentifiedParseable::new("1", "a = 1 + 2"),
//!     IdentifiedParseable::new("2", "b = a^2"),
//! ]);
//! assert_eq!(scope.result("2"), Some(&Value::Number(9.0)));
//! ```

pub mod adapter;
mod deps;
mod diff;
mod evaluator;
mod events;
mod graph;
mod node;
mod options;
mod scheduler;
mod scope;
mod store;

pub use deps::Dependencies;
pub use diff::Diff;
pub use events::{EventType, Listener, ListenerId, ScopeChange, ScopeChangeEvent};
pub use graph::DirectedGraph;
pub use node::{EvaluationScope, IdentifiedParseable, MathNode, Parse, Validate};
pub use options::ScopeOptions;
pub use scope::MathScope;

pub use mathscope_types::ast::NodeKind;
pub use mathscope_types::{ErrorCategory, ErrorCode, ScopeError, Value};
