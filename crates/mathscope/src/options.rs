//! Construction-time configuration for a [`MathScope`](crate::MathScope).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScopeOptions {
    /// Names that always resolve. They never create dependencies and are
    /// never reported as unmet.
    pub builtins: BTreeSet<String>,
    /// Names starting with this prefix may be assigned by several
    /// expressions at once, as long as nothing reads them. `None` disables
    /// the exception.
    pub duplicate_leaf_prefix: Option<String>,
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self {
            builtins: BTreeSet::new(),
            duplicate_leaf_prefix: Some("_".to_string()),
        }
    }
}

impl ScopeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins<I, S>(mut self, builtins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.builtins.extend(builtins.into_iter().map(Into::into));
        self
    }

    pub fn with_duplicate_leaf_prefix(mut self, prefix: Option<impl Into<String>>) -> Self {
        self.duplicate_leaf_prefix = prefix.map(Into::into);
        self
    }
}
