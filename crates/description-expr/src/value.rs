//! Runtime values produced and consumed by the evaluator.
//!
//! The textual forms follow the conventions description authors already write
//! in their documents: `True`/`False`/`None`, floats always carry a fraction or
//! exponent, and nested strings are single-quoted. Re-parsing the display of a
//! value yields an equal value, which is what macro substitution relies on.

use std::cmp::Ordering;
use std::fmt;

use crate::builtins::Builtin;
use crate::error::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    /// Insertion-ordered mapping with string keys
    Map(Vec<(String, Value)>),
    /// An allow-listed function, only ever reached through a name or `math.<fn>`
    Builtin(Builtin),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Builtin(_) => "builtin_function_or_method",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::Builtin(_) => true,
        }
    }

    /// True when the value (or anything nested in it) can be invoked.
    pub fn is_callable(&self) -> bool {
        match self {
            Value::Builtin(_) => true,
            Value::List(items) => items.iter().any(Value::is_callable),
            Value::Map(entries) => entries.iter().any(|(_, v)| v.is_callable()),
            _ => false,
        }
    }

    /// Numeric view; bools count as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Bool(_) | Value::Int(_) | Value::Float(_))
    }

    /// Quoted form used inside containers (`'a'` rather than `a`).
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => quote(s),
            other => other.to_string(),
        }
    }

    /// Items of an iterable value: list items, string characters or map keys.
    pub fn iterate(&self) -> Result<Vec<Value>, EvalError> {
        match self {
            Value::List(items) => Ok(items.clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Map(entries) => Ok(entries.iter().map(|(k, _)| Value::Str(k.clone())).collect()),
            other => Err(EvalError::NotIterable(other.type_name())),
        }
    }

    /// Equality with numeric promotion (`1 == 1.0 == True`).
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_number() && b.is_number() => match (a.as_i64(), b.as_i64()) {
                (Some(x), Some(y)) => x == y,
                _ => a.as_f64() == b.as_f64(),
            },
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter().any(|(k2, v2)| k == k2 && v.loose_eq(v2))
                    })
            }
            (a, b) => a == b,
        }
    }

    /// Ordering for `<`-family comparisons, `sorted`, `min` and `max`.
    pub fn compare(&self, other: &Value, op: &'static str) -> Result<Ordering, EvalError> {
        match (self, other) {
            (a, b) if a.is_number() && b.is_number() => {
                if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
                    return Ok(x.cmp(&y));
                }
                let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                // NaN compares false both ways; report it as equal
                Ok(x.partial_cmp(&y).unwrap_or(Ordering::Equal))
            }
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    match x.compare(y, op)? {
                        Ordering::Equal => continue,
                        non_eq => return Ok(non_eq),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            (a, b) => Err(EvalError::TypeMismatch {
                op,
                left: a.type_name(),
                right: b.type_name(),
            }),
        }
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Float text that re-parses to the same float.
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        "math.nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "math.inf" } else { "-math.inf" }.to_string()
    } else {
        // Debug keeps a trailing `.0` on integral floats
        format!("{f:?}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item.repr())?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", quote(key), value.repr())?;
                }
                write!(f, "}}")
            }
            Value::Builtin(b) => write!(f, "<built-in function {}>", b.name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}
