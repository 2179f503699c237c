//! Change events and listener bookkeeping.

use serde::{Deserialize, Serialize};

use crate::diff::Diff;
use crate::scope::MathScope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventType {
    /// Anything observable changed.
    Change,
    /// Parse or evaluation errors changed.
    ChangeErrors,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Change => "change",
            EventType::ChangeErrors => "change-errors",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "change" => Some(EventType::Change),
            "change-errors" => Some(EventType::ChangeErrors),
            _ => None,
        }
    }
}

/// Everything one mutating call changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeChange {
    pub results: Diff,
    pub eval_errors: Diff,
    pub parse_errors: Diff,
}

impl ScopeChange {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.eval_errors.is_empty() && self.parse_errors.is_empty()
    }

    pub fn errors_changed(&self) -> bool {
        !self.eval_errors.is_empty() || !self.parse_errors.is_empty()
    }
}

/// Delivered to listeners. `ChangeErrors` events carry an empty results diff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeChangeEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub changes: ScopeChange,
}

/// Handle returned by [`MathScope::add_event_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListenerId(u64);

impl ListenerId {
    pub fn from_raw(raw: u64) -> Self {
        ListenerId(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

pub type Listener<P> = Box<dyn FnMut(&ScopeChangeEvent, &MathScope<P>)>;

pub(crate) struct Listeners<P> {
    next_id: u64,
    entries: Vec<(ListenerId, EventType, Listener<P>)>,
}

impl<P> Default for Listeners<P> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<P> Listeners<P> {
    pub fn add(&mut self, event_type: EventType, listener: Listener<P>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, event_type, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Move the listeners out so they can be called with the scope borrowed.
    pub fn take(&mut self) -> Vec<(ListenerId, EventType, Listener<P>)> {
        std::mem::take(&mut self.entries)
    }

    pub fn restore(&mut self, entries: Vec<(ListenerId, EventType, Listener<P>)>) {
        self.entries = entries;
    }
}

/// The events one change produces, in delivery order. Empty when nothing changed.
pub(crate) fn events_for(changes: &ScopeChange) -> Vec<ScopeChangeEvent> {
    if changes.is_empty() {
        return Vec::new();
    }
    let mut events = vec![ScopeChangeEvent {
        event_type: EventType::Change,
        changes: changes.clone(),
    }];
    if changes.errors_changed() {
        events.push(ScopeChangeEvent {
            event_type: EventType::ChangeErrors,
            changes: ScopeChange {
                results: Diff::default(),
                eval_errors: changes.eval_errors.clone(),
                parse_errors: changes.parse_errors.clone(),
            },
        });
    }
    events
}
