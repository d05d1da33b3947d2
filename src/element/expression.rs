//! Expression elements: substitute `$[...]` placeholders, then evaluate.

use description_expr::{evaluate, DisallowedConstruct, ExprError, Variables};
use serde_yaml::Value;

use super::{Element, Macro};
use crate::description::{ready, Outcome, Resolution, Resolver};
use crate::error::{DescriptionError, Result};
use crate::value::{from_expr, literal_text, Bindings};

impl<'d> Resolver<'d> {
    pub(super) fn resolve_expression(
        &mut self,
        element: &'d Element,
        template: &str,
        macros: &'d [Macro],
        scope: &Bindings,
    ) -> Resolution {
        let mut text = template.to_string();
        for placeholder in macros {
            let path = match placeholder {
                Macro::Path(path) => path.clone(),
                Macro::Nested { path, .. } => literal_text(&ready!(self.element_value(*path)?)),
            };
            let value = ready!(self.lookup(&element.name, &path, scope)?);
            // an unset reference leaves the whole expression unset
            if value.is_null() {
                return Ok(Outcome::Ready(Value::Null));
            }
            text = text.replace(&placeholder.placeholder(), &literal_text(&value));
        }
        evaluate_text(&element.name, &text).map(Outcome::Ready)
    }
}

/// Evaluate substituted text.
///
/// Text that does not parse, or only mentions unknown bare names, is plain
/// string interpolation and is returned as is.
pub(crate) fn evaluate_text(name: &str, text: &str) -> Result<Value> {
    match evaluate(text, &Variables::new()) {
        Ok(value) => Ok(from_expr(value)),
        Err(ExprError::Syntax { .. }) | Err(ExprError::Disallowed(DisallowedConstruct::Name(_))) => {
            Ok(Value::String(text.to_string()))
        }
        Err(ExprError::Disallowed(source)) => Err(DescriptionError::Disallowed {
            path: name.to_string(),
            source,
        }),
        Err(ExprError::Eval(source)) => Err(DescriptionError::Expression {
            path: name.to_string(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arithmetic_evaluates() {
        assert_eq!(evaluate_text("/x", "2 + 3 * 4").unwrap(), Value::from(14));
    }

    #[test]
    fn test_interpolation_falls_back_to_text() {
        assert_eq!(
            evaluate_text("/x", "/data/assets/images").unwrap(),
            Value::from("/data/assets/images")
        );
        assert_eq!(evaluate_text("/x", "cube_3").unwrap(), Value::from("cube_3"));
    }

    #[test]
    fn test_dangerous_text_is_an_error() {
        let err = evaluate_text("/x", "os.system('rm')").unwrap_err();
        assert!(matches!(err, DescriptionError::Disallowed { .. }));
        let err = evaluate_text("/x", "lambda: 1").unwrap_err();
        assert!(matches!(err, DescriptionError::Disallowed { .. }));
    }

    #[test]
    fn test_runtime_failure_is_an_error() {
        let err = evaluate_text("/x", "[1, 2][5]").unwrap_err();
        assert!(matches!(err, DescriptionError::Expression { ref path, .. } if path == "/x"));
    }
}
