use crate::Span;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum number of lexer/parser errors collected for one input.
pub const MAX_ERRORS: usize = 20;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Assignment,
    Dependency,
    Validation,
    Runtime,
}

/// Numeric error code (E100–E599).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199) ──
    pub const PARSE: Self = Self(100);
    pub const BATCH: Self = Self(101);

    // ── Assignment errors (E200–E299) ──
    pub const INVALID_LHS: Self = Self(200);
    pub const SPLIT_ASSIGNMENT: Self = Self(201);

    // ── Dependency errors (E300–E399) ──
    pub const UNMET_DEPENDENCY: Self = Self(300);
    pub const CYCLIC_ASSIGNMENT: Self = Self(301);
    pub const DUPLICATE_ASSIGNMENT: Self = Self(302);

    // ── Validation errors (E400–E499) ──
    pub const VALIDATION: Self = Self(400);

    // ── Runtime errors (E500–E599) ──
    pub const RUNTIME: Self = Self(500);

    /// Get the category for this error code.
    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Syntax,
            200..=299 => ErrorCategory::Assignment,
            300..=399 => ErrorCategory::Dependency,
            400..=499 => ErrorCategory::Validation,
            _ => ErrorCategory::Runtime,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax => write!(f, "syntax"),
            Self::Assignment => write!(f, "assignment"),
            Self::Dependency => write!(f, "dependency"),
            Self::Validation => write!(f, "validation"),
            Self::Runtime => write!(f, "runtime"),
        }
    }
}

/// Every failure the scope can record against an expression id.
///
/// Parse-stage variants (`Parse`, `AssignmentLhs`, `SplitAssignment`,
/// `Batch`) land in the scope's parse errors; the rest in its evaluation
/// errors. The two maps never hold the same id.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScopeError {
    /// The text is not a well-formed expression.
    #[error("{message}")]
    Parse {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        span: Option<Span>,
    },

    /// The left-hand side of an assignment is not a name or a `name(params)` header.
    #[error("{message}")]
    AssignmentLhs {
        message: String,
        is_function: bool,
        /// Per-parameter messages, keyed by parameter position.
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        param_errors: BTreeMap<usize, String>,
    },

    /// An assignment given as separate left and right parts failed on one or both sides.
    #[error("{}", split_message(.lhs.as_deref(), .rhs.as_deref()))]
    SplitAssignment {
        lhs: Option<Box<ScopeError>>,
        rhs: Option<Box<ScopeError>>,
    },

    /// Errors of individual items in a batch (array) input, keyed by position.
    #[error("{}", batch_message(.errors))]
    Batch { errors: BTreeMap<usize, ScopeError> },

    /// The expression reads names nothing currently defines.
    #[error("{}", unmet_message(.symbols))]
    UnmetDependency { symbols: Vec<String> },

    /// The expression's definition participates in a dependency cycle.
    #[error("Cyclic dependencies: {}", quoted(.symbols))]
    CyclicAssignment { symbols: Vec<String> },

    /// More than one expression defines this name.
    #[error("Name {symbol} has been assigned multiple times.")]
    DuplicateAssignment { symbol: String },

    /// The value was computed but rejected by the expression's validator.
    #[error("{message}")]
    Validation { message: String },

    /// Evaluation itself failed.
    #[error("{message}")]
    Runtime { message: String },
}

fn split_message(lhs: Option<&ScopeError>, rhs: Option<&ScopeError>) -> String {
    match (lhs, rhs) {
        (Some(l), Some(r)) => format!("{l} {r}"),
        (Some(e), None) | (None, Some(e)) => e.to_string(),
        (None, None) => "Invalid assignment.".to_string(),
    }
}

fn batch_message(errors: &BTreeMap<usize, ScopeError>) -> String {
    errors
        .iter()
        .map(|(i, e)| format!("[{i}] {e}"))
        .collect::<Vec<_>>()
        .join("; ")
}

fn unmet_message(symbols: &[String]) -> String {
    let plural = if symbols.len() > 1 { "s" } else { "" };
    format!("Undefined symbol{plural} {}", symbols.join(","))
}

fn quoted(symbols: &[String]) -> String {
    symbols
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn sorted_unique(symbols: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    let mut out: Vec<String> = symbols.into_iter().map(Into::into).collect();
    out.sort();
    out.dedup();
    out
}

impl ScopeError {
    pub fn parse(message: impl Into<String>, span: Option<Span>) -> Self {
        ScopeError::Parse {
            message: message.into(),
            span,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        ScopeError::Runtime {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ScopeError::Validation {
            message: message.into(),
        }
    }

    /// Unmet dependency on `symbols` (sorted, deduplicated).
    pub fn unmet(symbols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ScopeError::UnmetDependency {
            symbols: sorted_unique(symbols),
        }
    }

    /// Cycle through `symbols` (sorted, deduplicated).
    pub fn cyclic(symbols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ScopeError::CyclicAssignment {
            symbols: sorted_unique(symbols),
        }
    }

    pub fn duplicate(symbol: impl Into<String>) -> Self {
        ScopeError::DuplicateAssignment {
            symbol: symbol.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ScopeError::Parse { .. } => ErrorCode::PARSE,
            ScopeError::Batch { .. } => ErrorCode::BATCH,
            ScopeError::AssignmentLhs { .. } => ErrorCode::INVALID_LHS,
            ScopeError::SplitAssignment { .. } => ErrorCode::SPLIT_ASSIGNMENT,
            ScopeError::UnmetDependency { .. } => ErrorCode::UNMET_DEPENDENCY,
            ScopeError::CyclicAssignment { .. } => ErrorCode::CYCLIC_ASSIGNMENT,
            ScopeError::DuplicateAssignment { .. } => ErrorCode::DUPLICATE_ASSIGNMENT,
            ScopeError::Validation { .. } => ErrorCode::VALIDATION,
            ScopeError::Runtime { .. } => ErrorCode::RUNTIME,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.code().category()
    }

    /// True for errors produced while turning input into a node.
    pub fn is_parse_stage(&self) -> bool {
        match self {
            ScopeError::Batch { errors } => errors.values().all(ScopeError::is_parse_stage),
            _ => matches!(
                self.category(),
                ErrorCategory::Syntax | ErrorCategory::Assignment
            ),
        }
    }
}
