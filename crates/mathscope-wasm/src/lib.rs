//! mathscope as a WASM module for browser environments.
//!
//! Exposes a reactive scope via `wasm-bindgen`. Inputs and outputs are
//! plain JS values; maps become plain objects.
//!
//! # Usage (JavaScript)
//!
//! ```js
//! import init, { MathScope } from 'mathscope-wasm';
//!
//! await init();
//!
//! const scope = new MathScope({ gasLimit: 100000 });
//! scope.addListener("change", (event) => console.log(event.changes.results));
//! scope.setExpressions([
//!   { id: "1", parseable: "a = 1 + 2" },
//!   { id: "2", parseable: { lhs: "b", rhs: "a^2" }, validate: "positive" },
//! ]);
//! scope.results(); // { "1": 3, "2": 9 }
//! ```

use std::collections::BTreeMap;

use mathscope::adapter::{ExprParser, Parseable, ValidatorSpec};
use mathscope::{EventType, IdentifiedParseable, ListenerId, MathScope, ScopeError, Value};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

// ══════════════════════════════════════════════════════════════════════════════
// Payloads
// ══════════════════════════════════════════════════════════════════════════════

/// Constructor options.
#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct JsOptions {
    gas_limit: Option<u64>,
    duplicate_leaf_prefix: Option<String>,
}

impl Default for JsOptions {
    fn default() -> Self {
        Self {
            gas_limit: None,
            duplicate_leaf_prefix: Some("_".to_string()),
        }
    }
}

/// One element of the `setExpressions` array.
#[derive(Debug, Deserialize)]
struct JsExpression {
    id: String,
    parseable: Parseable,
    #[serde(default)]
    validate: Option<ValidatorSpec>,
}

impl JsExpression {
    /// Validators share the parser's step budget.
    fn into_input(self, parser: &ExprParser) -> IdentifiedParseable<Parseable> {
        let input = IdentifiedParseable::new(self.id, self.parseable);
        match self.validate {
            Some(spec) => input.with_validator(parser.validator(spec)),
            None => input,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot<'a> {
    results: &'a BTreeMap<String, Value>,
    parse_errors: &'a BTreeMap<String, ScopeError>,
    eval_errors: &'a BTreeMap<String, ScopeError>,
}

fn build_parser(options: &JsOptions) -> ExprParser {
    match options.gas_limit {
        Some(gas_limit) => ExprParser::new().with_gas_limit(gas_limit),
        None => ExprParser::new(),
    }
}

fn build_scope(parser: &ExprParser, options: JsOptions) -> MathScope<Parseable> {
    let scope_options = parser
        .scope_options()
        .with_duplicate_leaf_prefix(options.duplicate_leaf_prefix);
    MathScope::new(parser.clone(), scope_options)
}

fn snapshot_json(scope: &MathScope<Parseable>) -> String {
    let snapshot = Snapshot {
        results: scope.results(),
        parse_errors: scope.parse_errors(),
        eval_errors: scope.eval_errors(),
    };
    serde_json::to_string(&snapshot).unwrap_or_else(|e| {
        format!(
            r#"{{"results":{{}},"parseErrors":{{}},"evalErrors":{{}},"error":"Serialization error: {}"}}"#,
            e
        )
    })
}

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn from_js<T: for<'de> Deserialize<'de>>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Invalid {what}: {e}")))
}

// ══════════════════════════════════════════════════════════════════════════════
// Bindings
// ══════════════════════════════════════════════════════════════════════════════

/// A reactive scope of math expressions.
#[wasm_bindgen(js_name = MathScope)]
pub struct WasmMathScope {
    parser: ExprParser,
    scope: MathScope<Parseable>,
}

#[wasm_bindgen(js_class = MathScope)]
impl WasmMathScope {
    /// `options` may be omitted: `{ gasLimit?: number, duplicateLeafPrefix?: string | null }`.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<WasmMathScope, JsValue> {
        let options = if options.is_undefined() || options.is_null() {
            JsOptions::default()
        } else {
            from_js(options, "options")?
        };
        let parser = build_parser(&options);
        let scope = build_scope(&parser, options);
        Ok(WasmMathScope { parser, scope })
    }

    /// Add or replace expressions. Takes an array of
    /// `{ id, parseable, validate? }` and returns the change.
    #[wasm_bindgen(js_name = setExpressions)]
    pub fn set_expressions(&mut self, expressions: JsValue) -> Result<JsValue, JsValue> {
        let expressions: Vec<JsExpression> = from_js(expressions, "expressions")?;
        let parser = &self.parser;
        let change = self.scope.set_expressions(
            expressions
                .into_iter()
                .map(|expression| expression.into_input(parser)),
        );
        to_js(&change)
    }

    /// Remove expressions by id and return the change.
    #[wasm_bindgen(js_name = deleteExpressions)]
    pub fn delete_expressions(&mut self, ids: Vec<String>) -> Result<JsValue, JsValue> {
        to_js(&self.scope.delete_expressions(ids))
    }

    /// `{ [id]: value }` for every expression that evaluated.
    pub fn results(&self) -> Result<JsValue, JsValue> {
        to_js(self.scope.results())
    }

    #[wasm_bindgen(js_name = parseErrors)]
    pub fn parse_errors(&self) -> Result<JsValue, JsValue> {
        to_js(self.scope.parse_errors())
    }

    #[wasm_bindgen(js_name = evalErrors)]
    pub fn eval_errors(&self) -> Result<JsValue, JsValue> {
        to_js(self.scope.eval_errors())
    }

    /// Results and both error maps as one JSON string.
    pub fn snapshot(&self) -> String {
        snapshot_json(&self.scope)
    }

    /// Register `callback` for `"change"` or `"change-errors"`. Returns a
    /// handle for `removeListener`.
    #[wasm_bindgen(js_name = addListener)]
    pub fn add_listener(
        &mut self,
        event_type: &str,
        callback: js_sys::Function,
    ) -> Result<f64, JsValue> {
        let event_type = EventType::from_name(event_type)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown event type: {event_type}")))?;
        let id = self.scope.add_event_listener(event_type, move |event, _| {
            let delivered = to_js(event).and_then(|payload| callback.call1(&JsValue::NULL, &payload));
            if let Err(err) = delivered {
                log::warn!("{} listener failed: {err:?}", event.event_type.as_str());
            }
        });
        Ok(id.as_raw() as f64)
    }

    /// Returns false if no listener has this handle.
    #[wasm_bindgen(js_name = removeListener)]
    pub fn remove_listener(&mut self, id: f64) -> bool {
        if id < 0.0 || id.fract() != 0.0 {
            return false;
        }
        self.scope.remove_event_listener(ListenerId::from_raw(id as u64))
    }
}

/// Return the package version string.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
