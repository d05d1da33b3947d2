//! Bridging between document values (`serde_yaml::Value`) and expression values.

use std::collections::BTreeMap;

use description_expr::Value as ExprValue;
use serde_yaml::{Mapping, Number, Value};

/// Name/value overrides visible during resolution.
///
/// Holds the per-frame `seed`/`num_frames` and, under harmonized attributes,
/// their `index`/`count`. A binding answers references of the same name and
/// replaces same-named keys of literal mappings in the produced value.
pub type Bindings = BTreeMap<String, Value>;

/// Merge `overlay` on top of `base`.
pub fn merged(base: &Bindings, overlay: &Bindings) -> Bindings {
    let mut out = base.clone();
    out.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    out
}

/// Text of a mapping key as it appears in attribute paths.
pub fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => key_text(&tagged.value),
        other => to_expr(other).to_string(),
    }
}

pub fn to_expr(value: &Value) -> ExprValue {
    match value {
        Value::Null => ExprValue::None,
        Value::Bool(b) => ExprValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => ExprValue::Int(i),
            None => ExprValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => ExprValue::Str(s.clone()),
        Value::Sequence(items) => ExprValue::List(items.iter().map(to_expr).collect()),
        Value::Mapping(map) => ExprValue::Map(
            map.iter()
                .map(|(k, v)| (key_text(k), to_expr(v)))
                .collect(),
        ),
        Value::Tagged(tagged) => to_expr(&tagged.value),
    }
}

pub fn from_expr(value: ExprValue) -> Value {
    match value {
        ExprValue::None => Value::Null,
        ExprValue::Bool(b) => Value::Bool(b),
        ExprValue::Int(i) => Value::Number(i.into()),
        ExprValue::Float(f) => Value::Number(Number::from(f)),
        ExprValue::Str(s) => Value::String(s),
        ExprValue::List(items) => Value::Sequence(items.into_iter().map(from_expr).collect()),
        ExprValue::Map(entries) => Value::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (Value::String(k), from_expr(v)))
                .collect::<Mapping>(),
        ),
        // never produced by a successful evaluation
        ExprValue::Builtin(b) => Value::String(b.name().to_string()),
    }
}

/// Text substituted for a `$[...]` placeholder.
///
/// Uses the expression language's own literal syntax so the surrounding text
/// can be evaluated afterwards.
pub fn literal_text(value: &Value) -> String {
    to_expr(value).to_string()
}

pub fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Tagged(tagged) => as_f64(&tagged.value),
        _ => None,
    }
}

/// Integer view, truncating floats and parsing numeric strings.
pub fn as_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse().ok(),
        Value::Tagged(tagged) => as_index(&tagged.value),
        _ => None,
    }
}

/// Short name of a document value's type, for error messages.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}

pub fn float(f: f64) -> Value {
    Value::Number(Number::from(f))
}
