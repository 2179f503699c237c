//! Scoped symbol environment for the evaluator.

use mathscope_types::Value;
use std::collections::BTreeMap;

/// Read-only global symbols plus a stack of parameter frames.
///
/// Lookups search frames innermost-first, then the globals. The globals
/// are borrowed: evaluation never writes to the scope it reads from.
#[derive(Debug, Clone)]
pub struct Environment<'a> {
    globals: &'a BTreeMap<String, Value>,
    frames: Vec<BTreeMap<String, Value>>,
}

impl<'a> Environment<'a> {
    pub fn new(globals: &'a BTreeMap<String, Value>) -> Self {
        Self {
            globals,
            frames: Vec::new(),
        }
    }

    /// Push a frame binding `names` to `values` pairwise.
    pub fn push_frame<'n>(
        &mut self,
        names: impl IntoIterator<Item = &'n String>,
        values: impl IntoIterator<Item = Value>,
    ) {
        self.frames
            .push(names.into_iter().cloned().zip(values).collect());
    }

    /// Look up a symbol, searching from innermost frame to the globals.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .or_else(|| self.globals.get(name))
    }
}
