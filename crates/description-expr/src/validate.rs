//! Allow-list check over a parsed expression.
//!
//! The grammar already refuses statements, so this pass only has to look at
//! the two places arbitrary host functionality could leak in: names and
//! attribute access.

use crate::ast::Expr;
use crate::builtins::{self, Builtin};
use crate::error::DisallowedConstruct;
use crate::Variables;

/// Reject variables that could be invoked from inside an expression.
pub fn check_variables(variables: &Variables) -> Result<(), DisallowedConstruct> {
    match variables.iter().find(|(_, value)| value.is_callable()) {
        Some((name, value)) => Err(DisallowedConstruct::CallableVariable {
            name: name.clone(),
            type_name: value.type_name(),
        }),
        None => Ok(()),
    }
}

/// Walk the tree and report the first construct outside the allow-list.
pub fn validate(expr: &Expr, variables: &Variables) -> Result<(), DisallowedConstruct> {
    match expr {
        Expr::Literal(_) => Ok(()),
        Expr::Name(name) => {
            if variables.contains_key(name) || Builtin::from_name(name).is_some() {
                Ok(())
            } else {
                Err(DisallowedConstruct::Name(name.clone()))
            }
        }
        Expr::Attribute { object, attribute } => match object.as_ref() {
            Expr::Name(module)
                if module == "math"
                    && !variables.contains_key(module)
                    && builtins::math_member(attribute).is_some() =>
            {
                Ok(())
            }
            other => Err(DisallowedConstruct::Attribute {
                object: match other {
                    Expr::Name(name) => name.clone(),
                    _ => "<expression>".to_string(),
                },
                attribute: attribute.clone(),
            }),
        },
        Expr::Unary { operand, .. } => validate(operand, variables),
        Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
            validate(left, variables)?;
            validate(right, variables)
        }
        Expr::Compare { first, rest } => {
            validate(first, variables)?;
            rest.iter().try_for_each(|(_, e)| validate(e, variables))
        }
        Expr::Conditional {
            condition,
            then_branch,
            else_branch,
        } => {
            validate(condition, variables)?;
            validate(then_branch, variables)?;
            validate(else_branch, variables)
        }
        Expr::Call { function, args } => {
            validate(function, variables)?;
            args.iter().try_for_each(|arg| validate(arg, variables))
        }
        Expr::Subscript { object, index } => {
            validate(object, variables)?;
            validate(index, variables)
        }
        Expr::Slice {
            object,
            start,
            stop,
            step,
        } => {
            validate(object, variables)?;
            [start, stop, step]
                .into_iter()
                .flatten()
                .try_for_each(|bound| validate(bound, variables))
        }
        Expr::List(items) => items.iter().try_for_each(|item| validate(item, variables)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;
    use crate::value::Value;

    fn check(source: &str) -> Result<(), DisallowedConstruct> {
        validate(&parse_expression(source).unwrap(), &Variables::new())
    }

    #[test]
    fn test_math_members_allowed() {
        assert!(check("math.sqrt(math.pi)").is_ok());
        assert!(check("math.cos(1) + abs(-1)").is_ok());
    }

    #[test]
    fn test_unknown_math_member() {
        assert_eq!(
            check("math.system"),
            Err(DisallowedConstruct::Attribute {
                object: "math".to_string(),
                attribute: "system".to_string(),
            })
        );
    }

    #[test]
    fn test_dunder_attribute_on_literal() {
        let err = check("(1).__class__").unwrap_err();
        assert!(matches!(err, DisallowedConstruct::Attribute { .. }));
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(check("open('x')"), Err(DisallowedConstruct::Name("open".to_string())));
        assert_eq!(
            check("__import__('os')"),
            Err(DisallowedConstruct::Name("__import__".to_string()))
        );
    }

    #[test]
    fn test_shadowed_math_is_not_a_module() {
        let mut variables = Variables::new();
        variables.insert("math".to_string(), Value::Int(1));
        let expr = parse_expression("math.pi").unwrap();
        assert!(validate(&expr, &variables).is_err());
    }

    #[test]
    fn test_callable_variable() {
        let mut variables = Variables::new();
        variables.insert("f".to_string(), Value::Builtin(Builtin::Len));
        assert_eq!(
            check_variables(&variables),
            Err(DisallowedConstruct::CallableVariable {
                name: "f".to_string(),
                type_name: "builtin_function_or_method",
            })
        );
    }
}
