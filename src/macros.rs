//! `$[...]` placeholder scanning.
//!
//! Placeholders nest (`$[/objects/$[name]/size]`) and may contain ordinary
//! brackets (`$[list~0]`, `$[[1, 2][0]]`), so extraction tracks bracket depth
//! instead of relying on a regular expression.

use std::sync::LazyLock;

use regex::Regex;

static MACRO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\[.*?\]").unwrap());

/// True when `text` contains at least one placeholder.
pub fn has_macro(text: &str) -> bool {
    MACRO_RE.is_match(text)
}

/// A top-level placeholder found in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroSpan {
    /// Byte offset of the `$`
    pub start: usize,
    /// Byte offset one past the closing `]`
    pub end: usize,
    /// Text between `$[` and the matching `]`
    pub inner: String,
}

/// Top-level placeholders, left to right. An unterminated placeholder ends the scan.
pub fn extract_macros(text: &str) -> Vec<MacroSpan> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find("$[") {
        let start = pos + offset;
        let mut depth = 1usize;
        let mut i = start + 2;
        let mut end = None;
        while i < bytes.len() {
            match bytes[i] {
                b'$' if bytes.get(i + 1) == Some(&b'[') => {
                    depth += 1;
                    i += 2;
                    continue;
                }
                b'[' => depth += 1,
                b']' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(i + 1);
                        break;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        let Some(end) = end else { break };
        spans.push(MacroSpan {
            start,
            end,
            inner: text[start + 2..end - 1].to_string(),
        });
        pos = end;
    }
    spans
}

/// The reference path when the whole (trimmed) string is exactly one placeholder.
pub fn single_reference(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    if !trimmed.starts_with("$[") || !trimmed.ends_with(']') || trimmed.matches("$[").count() != 1 {
        return None;
    }
    let spans = extract_macros(trimmed);
    match spans.as_slice() {
        [only] if only.start == 0 && only.end == trimmed.len() => Some(&trimmed[2..trimmed.len() - 1]),
        _ => None,
    }
}
