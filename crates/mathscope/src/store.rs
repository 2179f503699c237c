//! The expression store: every id the scope currently tracks.
//!
//! Ids whose input failed to parse stay tracked (so `contains` and `ids`
//! see them) but carry no node and never enter the dependency graph.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::node::{MathNode, Validate};

pub(crate) struct StoredExpression {
    pub node: Box<dyn MathNode>,
    pub validate: Option<Rc<dyn Validate>>,
}

#[derive(Default)]
pub(crate) struct ExpressionStore {
    parsed: BTreeMap<String, StoredExpression>,
    unparsed: BTreeSet<String>,
}

impl ExpressionStore {
    pub fn insert(&mut self, id: String, expression: StoredExpression) {
        self.unparsed.remove(&id);
        self.parsed.insert(id, expression);
    }

    pub fn insert_unparsed(&mut self, id: String) {
        self.parsed.remove(&id);
        self.unparsed.insert(id);
    }

    pub fn remove(&mut self, id: &str) -> Option<StoredExpression> {
        self.unparsed.remove(id);
        self.parsed.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&StoredExpression> {
        self.parsed.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.parsed.contains_key(id) || self.unparsed.contains(id)
    }

    /// All tracked ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        let mut ids: Vec<&str> = self
            .parsed
            .keys()
            .chain(self.unparsed.iter())
            .map(String::as_str)
            .collect();
        ids.sort_unstable();
        ids.into_iter()
    }

    pub fn len(&self) -> usize {
        self.parsed.len() + self.unparsed.len()
    }
}
