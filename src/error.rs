//! Error types for description resolution
//!
//! Every variant is fatal for the frame being resolved. Bin-pack overflow is
//! deliberately absent: unfitted items are placed off-scene instead.

use description_expr::{DisallowedConstruct, EvalError};
use thiserror::Error;

/// Main error type for building and resolving a description
#[derive(Error, Debug)]
pub enum DescriptionError {
    /// Unknown type tag, missing key, wrong value type, empty folder, ...
    #[error("configuration error in \"{path}\": {reason}")]
    Configuration { path: String, reason: String },

    #[error("cyclic reference is detected: \"{path}\" is depending on itself ({})", chain.join(" -> "))]
    CyclicReference { path: String, chain: Vec<String> },

    #[error("not found reference: {path}")]
    MissingReference { path: String },

    #[error("disallowed construct in \"{path}\": {source}")]
    Disallowed {
        path: String,
        #[source]
        source: DisallowedConstruct,
    },

    #[error("expression in \"{path}\" failed: {source}")]
    Expression {
        path: String,
        #[source]
        source: EvalError,
    },

    #[error("harmonization stalled; still pending: {}", pending.join(", "))]
    HarmonizationStalled { pending: Vec<String> },
}

impl DescriptionError {
    pub(crate) fn config(path: impl Into<String>, reason: impl Into<String>) -> Self {
        DescriptionError::Configuration {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(path: impl Into<String>) -> Self {
        DescriptionError::MissingReference { path: path.into() }
    }

    /// The attribute path the error is attached to, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            DescriptionError::Configuration { path, .. }
            | DescriptionError::CyclicReference { path, .. }
            | DescriptionError::MissingReference { path }
            | DescriptionError::Disallowed { path, .. }
            | DescriptionError::Expression { path, .. } => Some(path),
            DescriptionError::HarmonizationStalled { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DescriptionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_chain() {
        let err = DescriptionError::CyclicReference {
            path: "/a".to_string(),
            chain: vec!["/a".to_string(), "/b".to_string(), "/a".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "cyclic reference is detected: \"/a\" is depending on itself (/a -> /b -> /a)"
        );
        assert_eq!(err.path(), Some("/a"));
    }

    #[test]
    fn test_disallowed_keeps_source() {
        let err = DescriptionError::Disallowed {
            path: "/x".to_string(),
            source: DisallowedConstruct::Keyword("lambda".to_string()),
        };
        assert!(std::error::Error::source(&err).is_some());
    }
}
