//! The dependency graph over expression ids, and the scheduler that
//! decides what to re-evaluate.
//!
//! Edges run from the id defining a name to every id reading it. Names are
//! tracked separately from edges so a definer and its readers can arrive
//! in any order.

use std::collections::{BTreeMap, BTreeSet};

use mathscope_types::ScopeError;

use crate::deps::Dependencies;
use crate::graph::DirectedGraph;

/// What to do in one evaluation pass.
#[derive(Debug, Default, PartialEq)]
pub struct Schedule {
    /// Ids to evaluate, definers before readers.
    pub order: Vec<String>,
    /// Ids that must not publish, with the error to record.
    pub conflicts: BTreeMap<String, ScopeError>,
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DirectedGraph<String>,
    deps: BTreeMap<String, Dependencies>,
    definers: BTreeMap<String, BTreeSet<String>>,
    readers: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn contains(&self, id: &str) -> bool {
        self.deps.contains_key(id)
    }

    pub fn dependencies(&self, id: &str) -> Option<&Dependencies> {
        self.deps.get(id)
    }

    /// The name `id` defines, if it is an assignment.
    pub fn defined_name(&self, id: &str) -> Option<&str> {
        self.deps.get(id)?.defines.as_deref()
    }

    pub fn definers_of(&self, name: &str) -> impl Iterator<Item = &String> {
        self.definers.get(name).into_iter().flatten()
    }

    /// Add `id`. An existing entry for `id` is replaced.
    pub fn insert(&mut self, id: &str, deps: Dependencies) {
        self.remove(id);
        let id = id.to_string();
        self.graph.add_node(id.clone());

        for symbol in &deps.reads {
            self.readers
                .entry(symbol.clone())
                .or_default()
                .insert(id.clone());
            for definer in self.definers.get(symbol).into_iter().flatten() {
                self.graph.add_edge(definer.clone(), id.clone());
            }
        }
        if let Some(name) = &deps.defines {
            self.definers
                .entry(name.clone())
                .or_default()
                .insert(id.clone());
            for reader in self.readers.get(name).into_iter().flatten() {
                self.graph.add_edge(id.clone(), reader.clone());
            }
        }
        self.deps.insert(id, deps);
    }

    /// Remove `id` and its edges. Returns its dependencies if it was present.
    pub fn remove(&mut self, id: &str) -> Option<Dependencies> {
        let deps = self.deps.remove(id)?;
        for symbol in &deps.reads {
            unindex(&mut self.readers, symbol, id);
        }
        if let Some(name) = &deps.defines {
            unindex(&mut self.definers, name, id);
        }
        self.graph.remove_node(&id.to_string());
        Some(deps)
    }

    /// Every id reachable from `ids`, the ids themselves included.
    pub fn reachable_from<'a>(&self, ids: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
        self.graph.reachable_from(ids)
    }

    /// Plan a pass over everything reachable from `sources`.
    ///
    /// Members of a cycle are conflicts. So is every definer of a name that
    /// more than one id defines, unless the name starts with `leaf_prefix`
    /// and no id reads it; a duplicate error replaces a cycle error.
    /// Everything else in reach is ordered topologically, ties broken by id.
    pub fn schedule(&self, sources: &BTreeSet<String>, leaf_prefix: Option<&str>) -> Schedule {
        let reach = self.graph.reachable_from(sources);
        let mut conflicts = BTreeMap::new();

        for cycle in self.graph.cycles(&reach) {
            let names: Vec<&str> = cycle.iter().filter_map(|id| self.defined_name(id)).collect();
            let error = ScopeError::cyclic(names);
            for id in cycle {
                conflicts.insert(id, error.clone());
            }
        }

        // A new reader can turn tolerated duplicates into conflicts, so names
        // read in reach are checked as well as names defined there.
        let mut names: BTreeSet<&str> = BTreeSet::new();
        for deps in reach.iter().filter_map(|id| self.deps.get(id)) {
            names.extend(deps.defines.as_deref());
            names.extend(deps.reads.iter().map(String::as_str));
        }
        for name in names {
            let Some(definers) = self.definers.get(name) else {
                continue;
            };
            if definers.len() < 2 {
                continue;
            }
            let allowed = leaf_prefix.is_some_and(|prefix| name.starts_with(prefix))
                && definers.iter().all(|d| self.graph.is_leaf(d));
            if !allowed {
                for definer in definers {
                    conflicts.insert(definer.clone(), ScopeError::duplicate(name));
                }
            }
        }

        let runnable: BTreeSet<String> = reach
            .into_iter()
            .filter(|id| !conflicts.contains_key(id))
            .collect();
        let order = self.graph.topological_order(&runnable);

        log::debug!(
            "scheduled {} ids, {} conflicted",
            order.len(),
            conflicts.len()
        );
        Schedule { order, conflicts }
    }
}

fn unindex(index: &mut BTreeMap<String, BTreeSet<String>>, symbol: &str, id: &str) {
    if let Some(ids) = index.get_mut(symbol) {
        ids.remove(id);
        if ids.is_empty() {
            index.remove(symbol);
        }
    }
}
