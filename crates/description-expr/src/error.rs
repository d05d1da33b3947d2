//! Error types for the expression evaluator.

use thiserror::Error;

/// A construct rejected by the allow-list.
///
/// Raised before anything is evaluated: the parsed tree is walked once and the
/// first offending node is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisallowedConstruct {
    /// Neither a caller-supplied variable nor an allow-listed builtin.
    #[error("Disallowed name : {0}")]
    Name(String),

    /// Attribute access other than `math.<known member>`.
    #[error("Disallowed attribute : {object}.{attribute}")]
    Attribute { object: String, attribute: String },

    /// Statement-level keywords (`lambda`, `import`, `for`, ...).
    #[error("Disallowed expression : {0}")]
    Keyword(String),

    /// Node kinds outside the grammar's allow-list (dict/set displays, ...).
    #[error("Disallowed expression : {0}")]
    NodeKind(&'static str),

    /// A variable whose value can be invoked.
    #[error("Disallowed variable: {name} of type {type_name}")]
    CallableVariable {
        name: String,
        type_name: &'static str,
    },
}

impl DisallowedConstruct {
    /// The bare identifier, when the rejection is an unknown name
    pub fn unknown_name(&self) -> Option<&str> {
        match self {
            DisallowedConstruct::Name(name) => Some(name),
            _ => None,
        }
    }
}

/// Runtime failures of an expression that passed validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("key '{0}' not found")]
    KeyNotFound(String),

    #[error("unsupported operand type(s) for {op}: '{left}' and '{right}'")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("bad operand type for {op}: '{operand}'")]
    BadOperand {
        op: &'static str,
        operand: &'static str,
    },

    #[error("'{0}' object is not callable")]
    NotCallable(&'static str),

    #[error("'{0}' object is not subscriptable")]
    NotSubscriptable(&'static str),

    #[error("'{0}' object is not iterable")]
    NotIterable(&'static str),

    #[error("{function}() expected {expected} argument(s), got {found}")]
    Arity {
        function: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("{function}(): {message}")]
    InvalidArgument {
        function: &'static str,
        message: String,
    },

    #[error("repeating a sequence of length {len} {times} times exceeds the limit of {max}")]
    SequenceTooLong { len: usize, times: usize, max: usize },

    #[error("expression evaluated to a function ({0}), not a value")]
    NotAValue(String),

    #[error("unknown name '{0}'")]
    UnknownName(String),
}

/// Top-level error for [`crate::evaluate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("invalid syntax at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error(transparent)]
    Disallowed(#[from] DisallowedConstruct),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl ExprError {
    pub fn is_syntax(&self) -> bool {
        matches!(self, ExprError::Syntax { .. })
    }

    pub fn disallowed(&self) -> Option<&DisallowedConstruct> {
        match self {
            ExprError::Disallowed(construct) => Some(construct),
            _ => None,
        }
    }
}
