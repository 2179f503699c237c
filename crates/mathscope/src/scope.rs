//! The reactive scope.
//!
//! [`MathScope`] owns every expression, its parse or evaluation error, its
//! last good value, and the symbol table built from assignments. Each call
//! to [`set_expressions`](MathScope::set_expressions) or
//! [`delete_expressions`](MathScope::delete_expressions) re-evaluates only
//! what the change can affect, then notifies listeners once.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use mathscope_types::{ScopeError, Value};

use crate::deps::Dependencies;
use crate::diff::DiffingMap;
use crate::evaluator::{Evaluator, ParsedExpression};
use crate::events::{self, EventType, ListenerId, Listeners, ScopeChange, ScopeChangeEvent};
use crate::node::{EvaluationScope, IdentifiedParseable, Parse};
use crate::options::ScopeOptions;

pub struct MathScope<P> {
    parser: Box<dyn Parse<P>>,
    evaluator: Evaluator,
    parse_errors: BTreeMap<String, ScopeError>,
    listeners: Listeners<P>,
}

impl<P> MathScope<P> {
    pub fn new(parser: impl Parse<P> + 'static, options: ScopeOptions) -> Self {
        Self {
            parser: Box::new(parser),
            evaluator: Evaluator::new(options),
            parse_errors: BTreeMap::new(),
            listeners: Listeners::default(),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Mutation
    // ══════════════════════════════════════════════════════════════════════

    /// Add or replace expressions by id.
    ///
    /// All inputs are parsed first, then the whole batch is evaluated in
    /// one pass. When an id occurs more than once, its last occurrence wins.
    pub fn set_expressions(
        &mut self,
        expressions: impl IntoIterator<Item = IdentifiedParseable<P>>,
    ) -> ScopeChange {
        let expressions = last_occurrence_wins(expressions);

        let mut ids = BTreeSet::new();
        let mut parsed = Vec::new();
        let mut unparsed = Vec::new();
        let mut parse_errors = DiffingMap::new(&mut self.parse_errors);
        for IdentifiedParseable {
            id,
            parseable,
            validate,
        } in expressions
        {
            ids.insert(id.clone());
            match self.parser.parse(&parseable) {
                Ok(node) => {
                    parse_errors.delete(&id);
                    parsed.push(ParsedExpression { id, node, validate });
                }
                Err(error) => {
                    log::debug!("{id}: parse failed: {error}");
                    parse_errors.set(id.clone(), error);
                    unparsed.push(id);
                }
            }
        }
        let parse_errors = parse_errors.into_diff();

        let (results, eval_errors) = self.evaluator.update(&ids, parsed, unparsed);
        self.finish(ScopeChange {
            results,
            eval_errors,
            parse_errors,
        })
    }

    /// Remove expressions by id. Unknown ids are ignored.
    pub fn delete_expressions<I, S>(&mut self, ids: I) -> ScopeChange
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: BTreeSet<String> = ids.into_iter().map(|id| id.as_ref().to_string()).collect();

        let mut parse_errors = DiffingMap::new(&mut self.parse_errors);
        for id in &ids {
            parse_errors.delete(id);
        }
        let parse_errors = parse_errors.into_diff();

        let (results, eval_errors) = self.evaluator.update(&ids, Vec::new(), Vec::new());
        self.finish(ScopeChange {
            results,
            eval_errors,
            parse_errors,
        })
    }

    fn finish(&mut self, changes: ScopeChange) -> ScopeChange {
        log::debug!(
            "scope change: {} results, {} eval errors, {} parse errors",
            changes.results.changed().len(),
            changes.eval_errors.changed().len(),
            changes.parse_errors.changed().len()
        );
        self.emit(&changes);
        changes
    }

    fn emit(&mut self, changes: &ScopeChange) {
        let events = events::events_for(changes);
        if events.is_empty() {
            return;
        }
        let mut listeners = self.listeners.take();
        for event in &events {
            for (_, event_type, listener) in listeners.iter_mut() {
                if *event_type == event.event_type {
                    listener(event, &*self);
                }
            }
        }
        self.listeners.restore(listeners);
    }

    // ══════════════════════════════════════════════════════════════════════
    // Listeners
    // ══════════════════════════════════════════════════════════════════════

    /// Register a listener. It runs synchronously, after each mutating call
    /// that produced an event of `event_type`.
    pub fn add_event_listener(
        &mut self,
        event_type: EventType,
        listener: impl FnMut(&ScopeChangeEvent, &MathScope<P>) + 'static,
    ) -> ListenerId {
        self.listeners.add(event_type, Box::new(listener))
    }

    /// Returns false if the listener was not registered.
    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Read access
    // ══════════════════════════════════════════════════════════════════════

    /// Last good value per id.
    pub fn results(&self) -> &BTreeMap<String, Value> {
        self.evaluator.results()
    }

    pub fn result(&self, id: &str) -> Option<&Value> {
        self.evaluator.results().get(id)
    }

    pub fn parse_errors(&self) -> &BTreeMap<String, ScopeError> {
        &self.parse_errors
    }

    pub fn eval_errors(&self) -> &BTreeMap<String, ScopeError> {
        self.evaluator.errors()
    }

    /// The id's error, whichever stage produced it.
    pub fn error(&self, id: &str) -> Option<&ScopeError> {
        self.parse_errors
            .get(id)
            .or_else(|| self.evaluator.errors().get(id))
    }

    /// Symbol name → current value, for every assignment that evaluated.
    pub fn eval_scope(&self) -> &EvaluationScope {
        self.evaluator.scope()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.evaluator.store().contains(id)
    }

    /// Every tracked id, including those that failed to parse.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.evaluator.store().ids()
    }

    pub fn len(&self) -> usize {
        self.evaluator.store().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// What the id reads and defines. `None` for unknown or unparsed ids.
    pub fn dependencies(&self, id: &str) -> Option<&Dependencies> {
        self.evaluator.dependencies(id)
    }

    pub fn options(&self) -> &ScopeOptions {
        self.evaluator.options()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<P> fmt::Debug for MathScope<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MathScope")
            .field("results", self.results())
            .field("parse_errors", &self.parse_errors)
            .field("eval_errors", self.eval_errors())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

fn last_occurrence_wins<P>(
    expressions: impl IntoIterator<Item = IdentifiedParseable<P>>,
) -> Vec<IdentifiedParseable<P>> {
    let all: Vec<_> = expressions.into_iter().collect();
    let mut seen = BTreeSet::new();
    let mut kept: Vec<_> = all
        .into_iter()
        .rev()
        .filter(|e| seen.insert(e.id.clone()))
        .collect();
    kept.reverse();
    kept
}
