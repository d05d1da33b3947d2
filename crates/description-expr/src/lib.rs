//! description-expr: restricted expression language for scene descriptions
//!
//! Text produced by macro substitution is evaluated here. The crate never
//! reaches for host facilities:
//! - Nom-based recursive-descent parser over an explicit grammar
//! - Allow-list validation of names and `math.<member>` attribute access
//! - Tree-walking evaluator (floor division, integer/float promotion)
//!
//! ```
//! use description_expr::{evaluate, Value, Variables};
//!
//! let mut vars = Variables::new();
//! vars.insert("a".to_string(), Value::Int(-5));
//! assert_eq!(evaluate("a if a > 0 else -a", &vars).unwrap(), Value::Int(5));
//! ```

pub mod ast;
pub mod builtins;
pub mod error;
pub mod eval;
pub mod parser;
pub mod validate;
pub mod value;

use std::collections::BTreeMap;

pub use builtins::{Builtin, MathFn};
pub use error::{DisallowedConstruct, EvalError, ExprError};
pub use parser::parse_expression;
pub use value::Value;

/// Caller-supplied names visible to an expression.
pub type Variables = BTreeMap<String, Value>;

/// Parse, validate and evaluate `expression` against `variables`.
///
/// Validation runs to completion before evaluation starts, so a rejected
/// expression has no effects at all.
pub fn evaluate(expression: &str, variables: &Variables) -> Result<Value, ExprError> {
    validate::check_variables(variables)?;
    let expr = parse_expression(expression)?;
    validate::validate(&expr, variables)?;
    Ok(eval::Evaluator::new(variables).evaluate(&expr)?)
}
