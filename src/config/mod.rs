//! Description documents
//!
//! On disk a description is wrapped in a header carrying the version it was
//! written for:
//!
//! ```yaml
//! scene_description:
//!   version: 0.1.0
//!   seed: 12
//!   num_frames: 3
//!   box:
//!     count: 4
//!     size: { distribution_type: range, start: 0.5, end: 2 }
//! ```

mod loader;

pub use loader::ConfigLoader;

use serde_yaml::{Mapping, Value};

use crate::error::{DescriptionError, Result};

/// Version documents must declare.
pub const DESCRIPTION_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Top-level key wrapping a description.
pub const DOCUMENT_KEY: &str = "scene_description";

/// Key naming a document to inherit from.
pub const PARENT_KEY: &str = "parent_config";

/// Body of a document, after checking its version.
pub fn unwrap_document(document: &Value) -> Result<&Value> {
    let body = document
        .get(DOCUMENT_KEY)
        .filter(|body| body.is_mapping())
        .ok_or_else(|| {
            DescriptionError::config("/", format!("\"{DOCUMENT_KEY}\" mapping expected but not found"))
        })?;
    match body.get("version").and_then(Value::as_str) {
        Some(DESCRIPTION_VERSION) => Ok(body),
        Some(other) => Err(DescriptionError::config(
            "/version",
            format!("incompatible version number: {other}, expecting {DESCRIPTION_VERSION}"),
        )),
        None => Err(DescriptionError::config(
            "/version",
            "\"version\" expected but not found",
        )),
    }
}

/// Wrap a produced description in the document header.
pub fn wrap_document(body: &Value) -> Value {
    let mut inner = Mapping::new();
    inner.insert(Value::from("version"), Value::from(DESCRIPTION_VERSION));
    if let Some(map) = body.as_mapping() {
        for (key, value) in map {
            inner.insert(key.clone(), value.clone());
        }
    }
    let mut outer = Mapping::new();
    outer.insert(Value::from(DOCUMENT_KEY), Value::Mapping(inner));
    Value::Mapping(outer)
}

/// Expand top-level blocks carrying `count` into `key_0 .. key_{count-1}`,
/// each tagged with its `index`.
pub fn flatten(config: &Value) -> Result<Value> {
    let map = config
        .as_mapping()
        .ok_or_else(|| DescriptionError::config("/", "description must be a mapping"))?;
    let mut flattened = Mapping::new();
    for (key, value) in map {
        let count = match value.as_mapping().and_then(|block| block.get("count")) {
            Some(count) => count,
            None => {
                flattened.insert(key.clone(), value.clone());
                continue;
            }
        };
        let name = crate::value::key_text(key);
        let count = count.as_u64().ok_or_else(|| {
            DescriptionError::config(
                format!("/{name}/count"),
                "count should be non-negative int",
            )
        })?;
        for index in 0..count {
            let mut copy = value.clone();
            if let Some(block) = copy.as_mapping_mut() {
                block.insert(Value::from("index"), Value::from(index));
            }
            flattened.insert(Value::from(format!("{name}_{index}")), copy);
        }
    }
    Ok(Value::Mapping(flattened))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_flatten_count_blocks() {
        let out = flatten(&yaml("{seed: 1, box: {count: 2, size: 3}}")).unwrap();
        assert_eq!(
            out,
            yaml("{seed: 1, box_0: {count: 2, size: 3, index: 0}, box_1: {count: 2, size: 3, index: 1}}")
        );
    }

    #[test]
    fn test_flatten_rejects_negative_count() {
        assert!(flatten(&yaml("{box: {count: -1}}")).is_err());
    }

    #[test]
    fn test_version_check() {
        let good = wrap_document(&yaml("{seed: 1}"));
        assert_eq!(unwrap_document(&good).unwrap()["seed"], Value::from(1));

        let bad = yaml("{scene_description: {version: 0.0.0-old, seed: 1}}");
        let err = unwrap_document(&bad).unwrap_err();
        assert!(err.to_string().contains("incompatible version number"));

        assert!(unwrap_document(&yaml("{other: {}}")).is_err());
    }
}
