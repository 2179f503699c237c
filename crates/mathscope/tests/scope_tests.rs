//! Scope behavior tests, driven through the in-house grammar.
//!
//! Tests verify:
//! - Propagation of edits through dependency chains
//! - Oversized or overly deep input failing as an error, not a crash
//! - Unmet dependencies resolving when their definer arrives
//! - Cycle and duplicate detection, and recovery once the conflict is gone
//! - Deletion unwinding dependents
//! - Parse errors preempting evaluation
//! - Validators
//! - Determinism (100-iteration)

use std::collections::BTreeSet;

use mathscope::adapter::{ExprParser, Parseable, ValidatorSpec};
use mathscope::{IdentifiedParseable, MathScope, ScopeError, Value};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scope() -> MathScope<Parseable> {
    init_logging();
    ExprParser::new().into_scope()
}

fn expr(id: &str, text: &str) -> IdentifiedParseable<Parseable> {
    IdentifiedParseable::new(id, text)
}

fn num(scope: &MathScope<Parseable>, id: &str) -> Option<f64> {
    scope.result(id).and_then(Value::as_number)
}

fn ids(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn error_message(scope: &MathScope<Parseable>, id: &str) -> String {
    scope
        .error(id)
        .map(ToString::to_string)
        .unwrap_or_else(|| panic!("no error for {id}"))
}

// ══════════════════════════════════════════════════════════════════════════════
// Propagation
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_dependency_propagation() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "a = 1 + 2"), expr("2", "b = a^2")]);
    assert_eq!(num(&scope, "1"), Some(3.0));
    assert_eq!(num(&scope, "2"), Some(9.0));

    let change = scope.set_expressions([expr("1", "a = 4")]);
    assert_eq!(num(&scope, "2"), Some(16.0));
    assert_eq!(change.results.updated, ids(&["1", "2"]));
    assert!(change.results.touched().is_empty());
    assert_eq!(scope.eval_scope().get("b"), Some(&Value::Number(16.0)));
}

#[test]
fn test_bare_expressions_define_nothing() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "a = 2"), expr("2", "a * 10")]);
    assert_eq!(num(&scope, "2"), Some(20.0));
    assert_eq!(scope.eval_scope().len(), 1);
}

#[test]
fn test_batch_is_order_independent() {
    let mut scope = scope();
    scope.set_expressions([
        expr("c", "z = y + 1"),
        expr("b", "y = x + 1"),
        expr("a", "x = 1"),
    ]);
    assert_eq!(num(&scope, "c"), Some(3.0));
    assert!(scope.eval_errors().is_empty());
}

#[test]
fn test_unaffected_expressions_untouched() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "a = 1"), expr("2", "b = a + 1"), expr("3", "c = 5")]);
    let change = scope.set_expressions([expr("1", "a = 2")]);
    assert_eq!(change.results.changed(), ids(&["1", "2"]));
}

#[test]
fn test_builtins_are_not_dependencies() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "y = sin(pi / 2) + max(1, 2)")]);
    assert_eq!(num(&scope, "1"), Some(3.0));
    assert!(scope.dependencies("1").unwrap().reads.is_empty());
}

#[test]
fn test_repeated_id_last_occurrence_wins() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "a = 1"), expr("1", "a = 2")]);
    assert_eq!(num(&scope, "1"), Some(2.0));
    assert_eq!(scope.len(), 1);
}

// ══════════════════════════════════════════════════════════════════════════════
// Functions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_function_assignment() {
    let mut scope = scope();
    scope.set_expressions([
        expr("f", "f(x) = x^2 + a"),
        expr("a", "a = 1"),
        expr("y", "y = f(2)"),
    ]);
    assert_eq!(num(&scope, "y"), Some(5.0));
    assert!(matches!(scope.result("f"), Some(Value::Function(_))));

    let change = scope.set_expressions([expr("a", "a = 10")]);
    assert_eq!(num(&scope, "y"), Some(14.0));
    assert!(change.results.updated.contains("f"));
}

#[test]
fn test_function_errors_name_the_function() {
    let mut scope = scope();
    scope.set_expressions([
        expr("f", "f(v) = v[10]"),
        expr("y", "f([1, 2])"),
        expr("g", "_g(v) = v[10]"),
        expr("z", "_g([1, 2])"),
    ]);
    assert!(error_message(&scope, "y").starts_with("Error evaluating f: "));
    assert!(!error_message(&scope, "z").contains("_g"));
    assert!(matches!(scope.error("y"), Some(ScopeError::Runtime { .. })));
}

#[test]
fn test_gas_exhaustion_is_a_runtime_error() {
    init_logging();
    let mut scope = ExprParser::new().with_gas_limit(5).into_scope();
    scope.set_expressions([expr("1", "1 + 2 + 3 + 4 + 5 + 6")]);
    assert_eq!(
        error_message(&scope, "1"),
        "Evaluation exceeded its step limit"
    );
}

#[test]
fn test_oversized_expressions_are_parse_errors() {
    let mut scope = scope();
    let inputs = [
        format!("{}1", "-".repeat(10_000)),
        format!("{}1", "-".repeat(200_000)),
        format!("{}2", "2^".repeat(100_000)),
        format!("{}1", "1+".repeat(10_000)),
        format!("y = {}x", "x*".repeat(10_000)),
    ];
    scope.set_expressions(
        inputs
            .iter()
            .enumerate()
            .map(|(i, text)| expr(&i.to_string(), text)),
    );
    for i in 0..inputs.len() {
        let id = i.to_string();
        assert!(
            matches!(scope.error(&id), Some(ScopeError::Parse { .. })),
            "input {id}: {:?}",
            scope.error(&id)
        );
    }
    assert!(scope.results().is_empty());

    scope.set_expressions([expr("0", &format!("{}1", "1+".repeat(200)))]);
    assert_eq!(num(&scope, "0"), Some(201.0));
}

#[test]
fn test_deep_call_chain_is_a_runtime_error() {
    let mut scope = scope();
    let tail = " + 1".repeat(200);
    scope.set_expressions([
        expr("f0", "f0(x) = x"),
        expr("f1", &format!("f1(x) = f0(x){tail}")),
        expr("f2", &format!("f2(x) = f1(x){tail}")),
        expr("f3", &format!("f3(x) = f2(x){tail}")),
        expr("shallow", "f2(0)"),
        expr("deep", "f3(0)"),
    ]);
    assert_eq!(num(&scope, "shallow"), Some(400.0));
    assert!(matches!(scope.error("deep"), Some(ScopeError::Runtime { .. })));
    assert!(error_message(&scope, "deep").ends_with("Expression is nested too deeply to evaluate"));
}

// ══════════════════════════════════════════════════════════════════════════════
// Unmet dependencies
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_unmet_dependency_resolves() {
    let mut scope = scope();
    scope.set_expressions([expr("2", "b = a + 1")]);
    assert_eq!(
        scope.eval_errors().get("2"),
        Some(&ScopeError::unmet(["a"]))
    );
    assert_eq!(error_message(&scope, "2"), "Undefined symbol a");
    assert_eq!(scope.result("2"), None);

    let change = scope.set_expressions([expr("1", "a = 1")]);
    assert_eq!(num(&scope, "2"), Some(2.0));
    assert!(scope.eval_errors().is_empty());
    assert_eq!(change.eval_errors.deleted, ids(&["2"]));
    assert_eq!(change.results.added, ids(&["1", "2"]));
}

#[test]
fn test_unmet_symbols_sorted() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "c = b + a + b")]);
    assert_eq!(
        scope.error("1"),
        Some(&ScopeError::UnmetDependency {
            symbols: vec!["a".into(), "b".into()]
        })
    );
    assert_eq!(error_message(&scope, "1"), "Undefined symbols a,b");
}

#[test]
fn test_unmet_callee() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "g(2)")]);
    assert_eq!(scope.error("1"), Some(&ScopeError::unmet(["g"])));
}

// ══════════════════════════════════════════════════════════════════════════════
// Cycles
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_cycle_detection_and_recovery() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "x = y + 1"), expr("2", "y = x + 1")]);
    let cyclic = ScopeError::cyclic(["x", "y"]);
    assert_eq!(scope.error("1"), Some(&cyclic));
    assert_eq!(scope.error("2"), Some(&cyclic));
    assert_eq!(error_message(&scope, "1"), "Cyclic dependencies: 'x', 'y'");
    assert!(scope.results().is_empty());
    assert!(scope.eval_scope().is_empty());

    scope.set_expressions([expr("2", "y = 2")]);
    assert_eq!(num(&scope, "1"), Some(3.0));
    assert!(scope.eval_errors().is_empty());
}

#[test]
fn test_self_reference_is_cyclic() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "a = a + 1")]);
    assert_eq!(scope.error("1"), Some(&ScopeError::cyclic(["a"])));
}

#[test]
fn test_readers_of_a_cycle_are_unmet() {
    let mut scope = scope();
    scope.set_expressions([
        expr("1", "x = y"),
        expr("2", "y = z"),
        expr("3", "z = x"),
        expr("4", "w = x * 2"),
    ]);
    for id in ["1", "2", "3"] {
        assert_eq!(scope.error(id), Some(&ScopeError::cyclic(["x", "y", "z"])));
    }
    assert_eq!(scope.error("4"), Some(&ScopeError::unmet(["x"])));

    scope.delete_expressions(["3"]);
    assert_eq!(scope.error("1"), Some(&ScopeError::unmet(["y"])));
    assert_eq!(scope.error("2"), Some(&ScopeError::unmet(["z"])));
    assert_eq!(scope.error("4"), Some(&ScopeError::unmet(["x"])));
}

// ══════════════════════════════════════════════════════════════════════════════
// Duplicates
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_duplicate_assignment() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "a = 1"), expr("2", "a = 2"), expr("3", "b = a")]);
    assert_eq!(scope.error("1"), Some(&ScopeError::duplicate("a")));
    assert_eq!(scope.error("2"), Some(&ScopeError::duplicate("a")));
    assert_eq!(error_message(&scope, "1"), "Name a has been assigned multiple times.");
    assert_eq!(scope.error("3"), Some(&ScopeError::unmet(["a"])));
    assert!(!scope.eval_scope().contains_key("a"));

    scope.delete_expressions(["2"]);
    assert_eq!(num(&scope, "1"), Some(1.0));
    assert_eq!(num(&scope, "3"), Some(1.0));
    assert!(scope.eval_errors().is_empty());
}

#[test]
fn test_duplicate_added_later_withdraws_value() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "a = 1"), expr("3", "b = a")]);
    assert_eq!(num(&scope, "3"), Some(1.0));

    let change = scope.set_expressions([expr("2", "a = 2")]);
    assert_eq!(scope.error("1"), Some(&ScopeError::duplicate("a")));
    assert_eq!(scope.error("3"), Some(&ScopeError::unmet(["a"])));
    assert_eq!(change.results.deleted, ids(&["1", "3"]));
}

#[test]
fn test_duplicate_policy_order_independent() {
    let mut together = scope();
    together.set_expressions([expr("1", "a = 1"), expr("2", "a = 2")]);

    let mut apart = scope();
    apart.set_expressions([expr("2", "a = 2")]);
    apart.set_expressions([expr("1", "a = 1")]);

    assert_eq!(together.eval_errors(), apart.eval_errors());
    assert_eq!(together.results(), apart.results());
}

#[test]
fn test_prefixed_leaf_duplicates_allowed() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "_t = 1"), expr("2", "_t = 2")]);
    assert!(scope.eval_errors().is_empty());
    assert_eq!(num(&scope, "1"), Some(1.0));
    assert_eq!(num(&scope, "2"), Some(2.0));

    scope.set_expressions([expr("3", "c = _t")]);
    assert_eq!(scope.error("1"), Some(&ScopeError::duplicate("_t")));
    assert_eq!(scope.error("2"), Some(&ScopeError::duplicate("_t")));
    assert_eq!(scope.error("3"), Some(&ScopeError::unmet(["_t"])));

    scope.delete_expressions(["3"]);
    assert!(scope.eval_errors().is_empty());
    assert_eq!(num(&scope, "2"), Some(2.0));
}

#[test]
fn test_prefix_exception_can_be_disabled() {
    init_logging();
    let parser = ExprParser::new();
    let options = parser
        .scope_options()
        .with_duplicate_leaf_prefix(None::<String>);
    let mut scope = MathScope::new(parser, options);
    scope.set_expressions([expr("1", "_t = 1"), expr("2", "_t = 2")]);
    assert_eq!(scope.error("1"), Some(&ScopeError::duplicate("_t")));
}

// ══════════════════════════════════════════════════════════════════════════════
// Deletion
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_delete_unwinds_dependents() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "a = 1"), expr("2", "b = a + 1"), expr("3", "b * 2")]);
    assert_eq!(num(&scope, "3"), Some(4.0));

    let change = scope.delete_expressions(["1"]);
    assert!(!scope.contains("1"));
    assert_eq!(scope.result("2"), None);
    assert_eq!(scope.error("2"), Some(&ScopeError::unmet(["a"])));
    assert_eq!(scope.error("3"), Some(&ScopeError::unmet(["b"])));
    assert!(!scope.eval_scope().contains_key("a"));
    assert!(!scope.eval_scope().contains_key("b"));
    assert_eq!(change.results.deleted, ids(&["1", "2", "3"]));
    assert_eq!(change.eval_errors.added, ids(&["2", "3"]));
}

#[test]
fn test_delete_unknown_is_noop() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "a = 1")]);
    let change = scope.delete_expressions(["nope"]);
    assert!(change.is_empty());
    assert_eq!(num(&scope, "1"), Some(1.0));
}

#[test]
fn test_delete_clears_parse_error() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "1 +")]);
    let change = scope.delete_expressions(["1"]);
    assert!(scope.parse_errors().is_empty());
    assert!(scope.is_empty());
    assert_eq!(change.parse_errors.deleted, ids(&["1"]));
}

// ══════════════════════════════════════════════════════════════════════════════
// Parse errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_parse_error_preempts_evaluation() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "a = 1 +")]);
    assert!(matches!(scope.parse_errors().get("1"), Some(ScopeError::Parse { .. })));
    assert!(scope.eval_errors().is_empty());
    assert!(scope.contains("1"));
    assert_eq!(scope.ids().collect::<Vec<_>>(), vec!["1"]);
    assert!(scope.dependencies("1").is_none());

    let change = scope.set_expressions([expr("1", "a = 1 + 1")]);
    assert!(scope.parse_errors().is_empty());
    assert_eq!(num(&scope, "1"), Some(2.0));
    assert_eq!(change.parse_errors.deleted, ids(&["1"]));
}

#[test]
fn test_parse_error_withdraws_previous_definition() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "a = 1"), expr("2", "b = a")]);
    scope.set_expressions([expr("1", "a = (")]);
    assert_eq!(scope.result("1"), None);
    assert_eq!(scope.error("2"), Some(&ScopeError::unmet(["a"])));
    assert!(scope.eval_errors().get("1").is_none());
}

#[test]
fn test_lhs_errors_distinct_from_rhs_errors() {
    let mut scope = scope();
    scope.set_expressions([
        expr("1", "1 + 1 = 2"),
        IdentifiedParseable::new(
            "2",
            Parseable::Assignment {
                lhs: "a".into(),
                rhs: "2 *".into(),
            },
        ),
        IdentifiedParseable::new(
            "3",
            Parseable::FunctionAssignment {
                name: "f".into(),
                params: vec!["x".into(), "1".into()],
                rhs: "x".into(),
            },
        ),
    ]);
    assert!(matches!(
        scope.error("1"),
        Some(ScopeError::AssignmentLhs { is_function: false, .. })
    ));
    assert!(matches!(
        scope.error("2"),
        Some(ScopeError::SplitAssignment { lhs: None, rhs: Some(_) })
    ));
    match scope.error("3") {
        Some(ScopeError::SplitAssignment { lhs: Some(lhs), rhs: None }) => {
            assert!(matches!(**lhs, ScopeError::AssignmentLhs { is_function: true, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_split_assignments_evaluate() {
    let mut scope = scope();
    scope.set_expressions([
        IdentifiedParseable::new(
            "1",
            Parseable::Assignment {
                lhs: "a".into(),
                rhs: "3".into(),
            },
        ),
        IdentifiedParseable::new(
            "2",
            Parseable::FunctionAssignment {
                name: "f".into(),
                params: vec!["x".into(), "y".into()],
                rhs: "x * y + a".into(),
            },
        ),
        expr("3", "f(2, 5)"),
        IdentifiedParseable::new("4", Parseable::Array(vec!["a".into(), "f(1, 1)".into()])),
    ]);
    assert_eq!(num(&scope, "3"), Some(13.0));
    assert_eq!(scope.result("4"), Some(&Value::vector([3.0, 4.0])));
}

// ══════════════════════════════════════════════════════════════════════════════
// Validators
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_validator_rejects_and_withdraws() {
    let mut scope = scope();
    scope.set_expressions([
        expr("1", "r = -1").with_validator(ValidatorSpec::Positive),
        expr("2", "s = r * 2"),
    ]);
    assert!(matches!(scope.error("1"), Some(ScopeError::Validation { .. })));
    assert_eq!(scope.error("2"), Some(&ScopeError::unmet(["r"])));

    scope.set_expressions([expr("1", "r = 2").with_validator(ValidatorSpec::Positive)]);
    assert_eq!(num(&scope, "2"), Some(4.0));
}

#[test]
fn test_validator_coerces() {
    let mut scope = scope();
    scope.set_expressions([expr("1", "visible = 0").with_validator(ValidatorSpec::Boolean)]);
    assert_eq!(scope.result("1"), Some(&Value::Bool(false)));
    assert_eq!(scope.eval_scope().get("visible"), Some(&Value::Bool(false)));
}

#[test]
fn test_function_validator() {
    let mut scope = scope();
    scope.set_expressions([
        expr("1", "f(x, y) = [x, y, x * y]").with_validator(ValidatorSpec::RealFunction(2, 3)),
        expr("2", "g(x) = x").with_validator(ValidatorSpec::RealFunction(2, 1)),
    ]);
    assert!(scope.error("1").is_none());
    assert_eq!(
        error_message(&scope, "2"),
        "Expected a function from R^2 -> R^1. This is not a function from R^2."
    );
}

#[test]
fn test_closure_validator() {
    let mut scope = scope();
    let even = |value: &Value| -> Result<Value, String> {
        match value.as_number() {
            Some(n) if n % 2.0 == 0.0 => Ok(value.clone()),
            _ => Err("Expected an even number.".to_string()),
        }
    };
    scope.set_expressions([expr("1", "3").with_validator(even)]);
    assert_eq!(
        scope.error("1"),
        Some(&ScopeError::validation("Expected an even number."))
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Determinism
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_determinism_100_iterations() {
    let inputs = [
        ("a", "a = 2"),
        ("b", "b = a * c"),
        ("c", "c = 3"),
        ("d", "d = e"),
        ("e", "e = d"),
        ("f", "f(x) = x + b"),
        ("g", "f(1) + missing"),
        ("h", "h = f(b)"),
        ("i", "k = 1"),
        ("j", "k = 2"),
    ];
    let mut reference = None;
    for i in 0..100 {
        let mut scope = scope();
        let mut rotated = inputs.to_vec();
        rotated.rotate_left(i % inputs.len());
        scope.set_expressions(rotated.iter().map(|(id, text)| expr(id, text)));
        let snapshot = (
            scope.results().clone(),
            scope.eval_errors().clone(),
            scope.eval_scope().clone(),
        );
        match &reference {
            None => reference = Some(snapshot),
            Some(expected) => assert_eq!(&snapshot, expected, "iteration {i}"),
        }
    }
}
