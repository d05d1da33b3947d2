//! Reference path grammar
//!
//! ```text
//! /objects/cube/size~1     absolute, second item of the `size` list
//! ../light/intensity       relative to the calling attribute's parent
//! grid~0~2                 chained indices into nested lists
//! ```

use crate::error::{DescriptionError, Result};

/// One `/`-separated step of a path: a key plus optional `~N` list indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub key: String,
    pub indices: Vec<usize>,
}

impl Segment {
    pub fn parse(text: &str, requested: &str) -> Result<Segment> {
        let mut parts = text.split('~');
        let key = parts.next().unwrap_or_default().to_string();
        let indices = parts
            .map(|part| {
                part.trim().parse::<usize>().map_err(|_| {
                    DescriptionError::config(
                        requested,
                        format!("invalid list index \"{part}\" in segment \"{text}\""),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Segment { key, indices })
    }
}

/// Collapse `..` segments. A `..` at the root stays at the root.
pub fn normalize(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            ".." => {
                // keep the leading empty component that marks an absolute path
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            "." => {}
            other => stack.push(other),
        }
    }
    stack.join("/")
}

/// Absolute form of `reference` as seen from the attribute at `calling`.
pub fn absolute_path(calling: &str, reference: &str) -> String {
    let reference = reference.trim();
    if reference.starts_with('/') {
        return normalize(reference);
    }
    let parent = match calling.rfind('/') {
        Some(i) => &calling[..=i],
        None => "/",
    };
    normalize(&format!("{parent}{reference}"))
}

/// Split an absolute path into segments (the leading `/` is dropped).
pub fn segments(absolute: &str, requested: &str) -> Result<Vec<Segment>> {
    absolute
        .strip_prefix('/')
        .unwrap_or(absolute)
        .split('/')
        .map(|part| Segment::parse(part, requested))
        .collect()
}

/// Append a mapping key to an attribute path.
pub fn child_path(parent: &str, key: &str) -> String {
    format!("{parent}/{key}")
}

/// Append a list position to an attribute path.
pub fn item_path(parent: &str, index: usize) -> String {
    format!("{parent}~{index}")
}
