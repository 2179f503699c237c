//! The evaluation pass.
//!
//! One pass runs per mutating call. It clears everything downstream of the
//! removed or replaced expressions, registers the new ones, asks the
//! scheduler for an order, and evaluates in that order, publishing each
//! value (or error) before any reader of it runs.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use mathscope_types::{ScopeError, Value};

use crate::deps::{self, Dependencies};
use crate::diff::{Diff, DiffingMap};
use crate::node::{EvaluationScope, MathNode, Validate};
use crate::options::ScopeOptions;
use crate::scheduler::DependencyGraph;
use crate::store::{ExpressionStore, StoredExpression};

/// A successfully parsed input, ready to enter the graph.
pub(crate) struct ParsedExpression {
    pub id: String,
    pub node: Box<dyn MathNode>,
    pub validate: Option<Rc<dyn Validate>>,
}

#[derive(Default)]
pub(crate) struct Evaluator {
    store: ExpressionStore,
    graph: DependencyGraph,
    results: BTreeMap<String, Value>,
    errors: BTreeMap<String, ScopeError>,
    scope: EvaluationScope,
    /// Ids that ended the last pass in a cycle or a duplicate.
    conflicted: BTreeSet<String>,
    options: ScopeOptions,
}

impl Evaluator {
    pub fn new(options: ScopeOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &ScopeOptions {
        &self.options
    }

    pub fn results(&self) -> &BTreeMap<String, Value> {
        &self.results
    }

    pub fn errors(&self) -> &BTreeMap<String, ScopeError> {
        &self.errors
    }

    pub fn scope(&self) -> &EvaluationScope {
        &self.scope
    }

    pub fn store(&self) -> &ExpressionStore {
        &self.store
    }

    pub fn dependencies(&self, id: &str) -> Option<&Dependencies> {
        self.graph.dependencies(id)
    }

    /// Drop every id in `removed`, then add `parsed` and `unparsed`, and
    /// re-evaluate whatever that affects. Returns the result and error diffs.
    pub fn update(
        &mut self,
        removed: &BTreeSet<String>,
        parsed: Vec<ParsedExpression>,
        unparsed: Vec<String>,
    ) -> (Diff, Diff) {
        let Self {
            store,
            graph,
            results,
            errors,
            scope,
            conflicted,
            options,
        } = self;
        let mut results = DiffingMap::new(results);
        let mut errors = DiffingMap::new(errors);

        // Anything downstream of a removed node loses its outputs until re-evaluated.
        let replaced: Vec<&String> = removed.iter().filter(|id| graph.contains(id)).collect();
        let stale = graph.reachable_from(replaced);
        for id in &stale {
            results.delete(id);
            errors.delete(id);
            if let Some(name) = graph.defined_name(id) {
                scope.remove(name);
            }
        }

        let mut touched_names = BTreeSet::new();
        for id in removed {
            if let Some(name) = graph.remove(id).and_then(|deps| deps.defines) {
                touched_names.insert(name);
            }
            store.remove(id);
        }

        let mut sources: BTreeSet<String> =
            stale.into_iter().filter(|id| graph.contains(id)).collect();
        for expression in parsed {
            let deps = deps::extract(expression.node.as_ref(), &options.builtins);
            if let Some(name) = &deps.defines {
                touched_names.insert(name.clone());
            }
            graph.insert(&expression.id, deps);
            store.insert(
                expression.id.clone(),
                StoredExpression {
                    node: expression.node,
                    validate: expression.validate,
                },
            );
            sources.insert(expression.id);
        }
        for id in unparsed {
            store.insert_unparsed(id);
        }

        for name in &touched_names {
            sources.extend(graph.definers_of(name).cloned());
        }
        sources.extend(conflicted.iter().filter(|id| graph.contains(id)).cloned());

        let schedule = graph.schedule(&sources, options.duplicate_leaf_prefix.as_deref());

        conflicted.clear();
        for (id, error) in schedule.conflicts {
            log::debug!("{id}: {error}");
            results.delete(&id);
            if let Some(name) = graph.defined_name(&id) {
                scope.remove(name);
            }
            errors.set(id.clone(), error);
            conflicted.insert(id);
        }

        for id in &schedule.order {
            let (Some(stored), Some(deps)) = (store.get(id), graph.dependencies(id)) else {
                continue;
            };
            let defines = deps.defines.as_deref();
            match evaluate_one(stored, deps, scope) {
                Ok(value) => {
                    log::trace!("{id} = {value}");
                    if let Some(name) = defines {
                        scope.insert(name.to_string(), value.clone());
                    }
                    results.set(id.clone(), value);
                    errors.delete(id);
                }
                Err(error) => {
                    match error {
                        ScopeError::Runtime { .. } | ScopeError::Validation { .. } => {
                            log::warn!("error evaluating {id}: {error}")
                        }
                        _ => log::trace!("{id}: {error}"),
                    }
                    if let Some(name) = defines {
                        scope.remove(name);
                    }
                    results.delete(id);
                    errors.set(id.clone(), error);
                }
            }
        }

        (results.into_diff(), errors.into_diff())
    }
}

fn evaluate_one(
    stored: &StoredExpression,
    deps: &Dependencies,
    scope: &EvaluationScope,
) -> Result<Value, ScopeError> {
    let unmet: Vec<&String> = deps
        .reads
        .iter()
        .filter(|symbol| !scope.contains_key(*symbol))
        .collect();
    if !unmet.is_empty() {
        return Err(ScopeError::unmet(unmet));
    }

    let value = stored.node.evaluate(scope)?;
    match &stored.validate {
        Some(validate) => validate.validate(&value).map_err(ScopeError::validation),
        None => Ok(value),
    }
}
