//! The contracts the scope evaluates against.
//!
//! The scope never sees expression text. A host-supplied [`Parse`]
//! implementation turns each input into a [`MathNode`], which reports what
//! it defines, which names it reads, and how to evaluate itself against the
//! current scope. An optional [`Validate`] hook checks (and may coerce) the
//! value before it is published.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use mathscope_types::ast::NodeKind;
use mathscope_types::{ScopeError, Value};

/// Symbol name → last good value.
pub type EvaluationScope = BTreeMap<String, Value>;

/// A parsed, evaluable expression.
pub trait MathNode {
    fn kind(&self) -> &NodeKind;

    /// Every free name the node references, callee names included.
    ///
    /// Function parameters may be listed; the scope drops them along with
    /// builtins when it extracts dependencies.
    fn symbols(&self) -> &BTreeSet<String>;

    /// Evaluate against `scope`. Only called once every dependency resolves.
    fn evaluate(&self, scope: &EvaluationScope) -> Result<Value, ScopeError>;
}

/// Turns host input into a node. Failures become parse errors.
pub trait Parse<P> {
    fn parse(&self, parseable: &P) -> Result<Box<dyn MathNode>, ScopeError>;
}

impl<P, F> Parse<P> for F
where
    F: Fn(&P) -> Result<Box<dyn MathNode>, ScopeError>,
{
    fn parse(&self, parseable: &P) -> Result<Box<dyn MathNode>, ScopeError> {
        self(parseable)
    }
}

/// Checks a freshly evaluated value. `Ok` carries the value to publish.
pub trait Validate {
    fn validate(&self, value: &Value) -> Result<Value, String>;
}

impl<F> Validate for F
where
    F: Fn(&Value) -> Result<Value, String>,
{
    fn validate(&self, value: &Value) -> Result<Value, String> {
        self(value)
    }
}

/// One input to [`MathScope::set_expressions`](crate::MathScope::set_expressions).
pub struct IdentifiedParseable<P> {
    pub id: String,
    pub parseable: P,
    pub validate: Option<Rc<dyn Validate>>,
}

impl<P> IdentifiedParseable<P> {
    pub fn new(id: impl Into<String>, parseable: impl Into<P>) -> Self {
        Self {
            id: id.into(),
            parseable: parseable.into(),
            validate: None,
        }
    }

    pub fn with_validator(mut self, validate: impl Validate + 'static) -> Self {
        self.validate = Some(Rc::new(validate));
        self
    }

    pub fn with_shared_validator(mut self, validate: Rc<dyn Validate>) -> Self {
        self.validate = Some(validate);
        self
    }
}

impl<P: fmt::Debug> fmt::Debug for IdentifiedParseable<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentifiedParseable")
            .field("id", &self.id)
            .field("parseable", &self.parseable)
            .field("validate", &self.validate.is_some())
            .finish()
    }
}
