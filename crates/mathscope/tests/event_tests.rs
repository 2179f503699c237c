//! Change-event tests.
//!
//! Tests verify:
//! - One `change` event per mutating call, none when nothing changed
//! - Touched/updated granularity
//! - `change-errors` events
//! - Listener removal and read access from inside a listener

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use mathscope::adapter::{ExprParser, Parseable};
use mathscope::{EventType, IdentifiedParseable, MathScope, ScopeChangeEvent, Value};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn scope() -> MathScope<Parseable> {
    let _ = env_logger::builder().is_test(true).try_init();
    ExprParser::new().into_scope()
}

fn expr(id: &str, text: &str) -> IdentifiedParseable<Parseable> {
    IdentifiedParseable::new(id, text)
}

fn ids(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

type EventLog = Rc<RefCell<Vec<ScopeChangeEvent>>>;

fn record(scope: &mut MathScope<Parseable>, event_type: EventType) -> EventLog {
    let log: EventLog = Rc::default();
    let sink = Rc::clone(&log);
    scope.add_event_listener(event_type, move |event, _| sink.borrow_mut().push(event.clone()));
    log
}

// ══════════════════════════════════════════════════════════════════════════════
// Change events
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_one_event_per_call() {
    let mut scope = scope();
    let log = record(&mut scope, EventType::Change);
    scope.set_expressions([expr("1", "a = 1"), expr("2", "b = a + 1"), expr("3", "c = 5")]);
    assert_eq!(log.borrow().len(), 1);
    assert_eq!(log.borrow()[0].changes.results.added, ids(&["1", "2", "3"]));

    scope.set_expressions([expr("1", "a = 2")]);
    let events = log.borrow();
    assert_eq!(events.len(), 2);
    let results = &events[1].changes.results;
    assert_eq!(results.updated, ids(&["1", "2"]));
    assert!(results.touched().is_empty());
}

#[test]
fn test_idempotent_set_fires_nothing() {
    let mut scope = scope();
    let inputs = || {
        [
            expr("1", "a = 1"),
            expr("2", "f(x) = x^2 + a"),
            expr("3", "f(3)"),
            expr("4", "b = missing"),
            expr("5", "1 +"),
        ]
    };
    scope.set_expressions(inputs());
    let log = record(&mut scope, EventType::Change);
    let change = scope.set_expressions(inputs());
    assert!(change.is_empty());
    assert!(log.borrow().is_empty());
}

#[test]
fn test_equal_value_from_new_text_fires_nothing() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "a = 1"), expr("2", "b = a")]);
    let log = record(&mut scope, EventType::Change);
    scope.set_expressions([expr("1", "a = 2 - 1")]);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_delete_unknown_fires_nothing() {
    let mut scope = scope();
    let log = record(&mut scope, EventType::Change);
    scope.delete_expressions(["ghost"]);
    assert!(log.borrow().is_empty());
}

#[test]
fn test_touched_on_delete() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "a = 1"), expr("2", "a + 1")]);
    let log = record(&mut scope, EventType::Change);
    scope.delete_expressions(["1"]);
    let events = log.borrow();
    assert_eq!(events.len(), 1);
    let changes = &events[0].changes;
    assert_eq!(changes.results.touched(), ids(&["1", "2"]));
    assert_eq!(changes.eval_errors.touched(), ids(&["2"]));
    assert!(changes.parse_errors.is_empty());
}

// ══════════════════════════════════════════════════════════════════════════════
// Error events
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_change_errors_only_when_errors_change() {
    let mut scope = scope();
    let errors = record(&mut scope, EventType::ChangeErrors);
    let changes = record(&mut scope, EventType::Change);

    scope.set_expressions([expr("1", "a = 1")]);
    assert!(errors.borrow().is_empty());

    scope.set_expressions([expr("2", "b = c")]);
    assert_eq!(errors.borrow().len(), 1);
    assert_eq!(errors.borrow()[0].event_type, EventType::ChangeErrors);
    assert_eq!(errors.borrow()[0].changes.eval_errors.added, ids(&["2"]));
    assert!(errors.borrow()[0].changes.results.is_empty());

    scope.set_expressions([expr("3", "1 +")]);
    assert_eq!(errors.borrow().len(), 2);
    assert_eq!(errors.borrow()[1].changes.parse_errors.added, ids(&["3"]));

    scope.set_expressions([expr("1", "a = 5")]);
    assert_eq!(errors.borrow().len(), 2);
    assert_eq!(changes.borrow().len(), 4);
}

#[test]
fn test_error_message_change_is_an_update() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "b = c")]);
    let errors = record(&mut scope, EventType::ChangeErrors);
    scope.set_expressions([expr("1", "b = d")]);
    let events = errors.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].changes.eval_errors.updated, ids(&["1"]));
}

// ══════════════════════════════════════════════════════════════════════════════
// Listeners
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_remove_listener() {
    let mut scope = scope();
    let log: EventLog = Rc::default();
    let sink = Rc::clone(&log);
    let id = scope.add_event_listener(EventType::Change, move |event, _| {
        sink.borrow_mut().push(event.clone())
    });
    assert_eq!(scope.listener_count(), 1);

    scope.set_expressions([expr("1", "1")]);
    assert!(scope.remove_event_listener(id));
    assert!(!scope.remove_event_listener(id));
    scope.set_expressions([expr("2", "2")]);
    assert_eq!(log.borrow().len(), 1);
    assert_eq!(scope.listener_count(), 0);
}

#[test]
fn test_listener_sees_updated_scope() {
    let mut scope = scope();
    let seen: Rc<RefCell<Vec<Value>>> = Rc::default();
    let sink = Rc::clone(&seen);
    scope.add_event_listener(EventType::Change, move |event, scope| {
        for id in &event.changes.results.changed() {
            if let Some(value) = scope.result(id) {
                sink.borrow_mut().push(value.clone());
            }
        }
    });
    scope.set_expressions([expr("1", "a = 1"), expr("2", "b = a * 3")]);
    scope.set_expressions([expr("1", "a = 2")]);
    assert_eq!(
        *seen.borrow(),
        vec![
            Value::Number(1.0),
            Value::Number(3.0),
            Value::Number(2.0),
            Value::Number(6.0)
        ]
    );
}

#[test]
fn test_listeners_called_in_registration_order() {
    let mut scope = scope();
    let order: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    for name in ["first", "second"] {
        let sink = Rc::clone(&order);
        scope.add_event_listener(EventType::Change, move |_, _| sink.borrow_mut().push(name));
    }
    scope.set_expressions([expr("1", "1")]);
    assert_eq!(*order.borrow(), vec!["first", "second"]);
}

#[test]
fn test_change_serializes() {
    let mut scope = scope();
    let change = scope.set_expressions([expr("1", "a = 1"), expr("2", "b")]);
    let json = serde_json::to_value(&change).unwrap();
    assert_eq!(json["results"]["added"], serde_json::json!(["1"]));
    assert_eq!(json["evalErrors"]["added"], serde_json::json!(["2"]));
    assert_eq!(json["parseErrors"]["added"], serde_json::json!([]));
}
