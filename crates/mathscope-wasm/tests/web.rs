//! Browser-side tests for the bindings. Run with `wasm-pack test --headless --firefox`.

#![cfg(target_arch = "wasm32")]

use std::cell::Cell;
use std::rc::Rc;

use mathscope_wasm::{version, WasmMathScope};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn expressions(json: &str) -> JsValue {
    js_sys::JSON::parse(json).unwrap()
}

#[wasm_bindgen_test]
fn test_set_and_read_results() {
    let mut scope = WasmMathScope::new(JsValue::UNDEFINED).unwrap();
    scope
        .set_expressions(expressions(
            r#"[{"id": "1", "parseable": "a = 1 + 2"}, {"id": "2", "parseable": "b = a^2"}]"#,
        ))
        .unwrap();
    let results = scope.results().unwrap();
    let b = js_sys::Reflect::get(&results, &JsValue::from_str("2")).unwrap();
    assert_eq!(b.as_f64(), Some(9.0));
}

#[wasm_bindgen_test]
fn test_listener_roundtrip() {
    let mut scope = WasmMathScope::new(JsValue::NULL).unwrap();
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let callback = Closure::<dyn FnMut(JsValue)>::new(move |_event: JsValue| {
        counter.set(counter.get() + 1);
    });
    let id = scope
        .add_listener("change", callback.as_ref().unchecked_ref::<js_sys::Function>().clone())
        .unwrap();
    scope
        .set_expressions(expressions(r#"[{"id": "1", "parseable": "1"}]"#))
        .unwrap();
    assert_eq!(calls.get(), 1);

    assert!(scope.remove_listener(id));
    scope
        .set_expressions(expressions(r#"[{"id": "2", "parseable": "2"}]"#))
        .unwrap();
    assert_eq!(calls.get(), 1);
    assert!(scope.add_listener("changed", js_sys::Function::new_no_args("")).is_err());
}

#[wasm_bindgen_test]
fn test_version() {
    assert!(!version().is_empty());
}
