//! The allow-listed pure functions and the `math` namespace.

use std::cmp::Ordering;

use crate::error::EvalError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Abs,
    All,
    Any,
    Bool,
    Float,
    Int,
    Len,
    List,
    Max,
    Min,
    Pow,
    Round,
    Sorted,
    Str,
    Sum,
    Math(MathFn),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFn {
    Acos,
    Asin,
    Atan,
    Atan2,
    Ceil,
    Copysign,
    Cos,
    Cosh,
    Degrees,
    Exp,
    Fabs,
    Floor,
    Fmod,
    Hypot,
    Isfinite,
    Isinf,
    Isnan,
    Log,
    Log10,
    Log2,
    Pow,
    Radians,
    Sin,
    Sinh,
    Sqrt,
    Tan,
    Tanh,
    Trunc,
}

const BUILTINS: &[(&str, Builtin)] = &[
    ("abs", Builtin::Abs),
    ("all", Builtin::All),
    ("any", Builtin::Any),
    ("bool", Builtin::Bool),
    ("float", Builtin::Float),
    ("int", Builtin::Int),
    ("len", Builtin::Len),
    ("list", Builtin::List),
    ("max", Builtin::Max),
    ("min", Builtin::Min),
    ("pow", Builtin::Pow),
    ("round", Builtin::Round),
    ("sorted", Builtin::Sorted),
    ("str", Builtin::Str),
    ("sum", Builtin::Sum),
];

const MATH_FUNCTIONS: &[(&str, MathFn)] = &[
    ("acos", MathFn::Acos),
    ("asin", MathFn::Asin),
    ("atan", MathFn::Atan),
    ("atan2", MathFn::Atan2),
    ("ceil", MathFn::Ceil),
    ("copysign", MathFn::Copysign),
    ("cos", MathFn::Cos),
    ("cosh", MathFn::Cosh),
    ("degrees", MathFn::Degrees),
    ("exp", MathFn::Exp),
    ("fabs", MathFn::Fabs),
    ("floor", MathFn::Floor),
    ("fmod", MathFn::Fmod),
    ("hypot", MathFn::Hypot),
    ("isfinite", MathFn::Isfinite),
    ("isinf", MathFn::Isinf),
    ("isnan", MathFn::Isnan),
    ("log", MathFn::Log),
    ("log10", MathFn::Log10),
    ("log2", MathFn::Log2),
    ("pow", MathFn::Pow),
    ("radians", MathFn::Radians),
    ("sin", MathFn::Sin),
    ("sinh", MathFn::Sinh),
    ("sqrt", MathFn::Sqrt),
    ("tan", MathFn::Tan),
    ("tanh", MathFn::Tanh),
    ("trunc", MathFn::Trunc),
];

const MATH_CONSTANTS: &[(&str, f64)] = &[
    ("e", std::f64::consts::E),
    ("inf", f64::INFINITY),
    ("nan", f64::NAN),
    ("pi", std::f64::consts::PI),
    ("tau", std::f64::consts::TAU),
];

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        BUILTINS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, b)| *b)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Math(f) => f.name(),
            other => BUILTINS
                .iter()
                .find(|(_, b)| *b == other)
                .map(|(n, _)| *n)
                .unwrap_or("<builtin>"),
        }
    }
}

impl MathFn {
    pub fn name(self) -> &'static str {
        MATH_FUNCTIONS
            .iter()
            .find(|(_, f)| *f == self)
            .map(|(n, _)| *n)
            .unwrap_or("<math>")
    }
}

/// Resolve `math.<member>` to a constant or a callable.
pub fn math_member(member: &str) -> Option<Value> {
    if let Some((_, c)) = MATH_CONSTANTS.iter().find(|(n, _)| *n == member) {
        return Some(Value::Float(*c));
    }
    MATH_FUNCTIONS
        .iter()
        .find(|(n, _)| *n == member)
        .map(|(_, f)| Value::Builtin(Builtin::Math(*f)))
}

// ============================================================================
// Argument helpers
// ============================================================================

fn arity(
    function: &'static str,
    args: &[Value],
    min: usize,
    max: usize,
    expected: &'static str,
) -> Result<(), EvalError> {
    if args.len() < min || args.len() > max {
        return Err(EvalError::Arity {
            function,
            expected,
            found: args.len(),
        });
    }
    Ok(())
}

fn number(function: &'static str, value: &Value) -> Result<f64, EvalError> {
    value.as_f64().ok_or_else(|| EvalError::InvalidArgument {
        function,
        message: format!("must be a real number, not {}", value.type_name()),
    })
}

fn domain_error(function: &'static str) -> EvalError {
    EvalError::InvalidArgument {
        function,
        message: "math domain error".to_string(),
    }
}

/// Float to int, truncating toward zero.
fn float_to_int(function: &'static str, f: f64) -> Result<i64, EvalError> {
    if !f.is_finite() {
        return Err(EvalError::InvalidArgument {
            function,
            message: format!("cannot convert float {} to integer", crate::value::format_float(f)),
        });
    }
    if f < i64::MIN as f64 || f > i64::MAX as f64 {
        return Err(EvalError::InvalidArgument {
            function,
            message: "integer out of range".to_string(),
        });
    }
    Ok(f as i64)
}

fn sort_values(function: &'static str, items: &mut [Value]) -> Result<(), EvalError> {
    // sort_by cannot propagate errors; check comparability up front
    for pair in items.windows(2) {
        pair[0].compare(&pair[1], function)?;
    }
    items.sort_by(total_order);
    Ok(())
}

/// Total order over comparable values; NaN sorts after every other number.
fn total_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (a, b) if a.is_number() && b.is_number() => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                match (x.is_nan(), y.is_nan()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => x.total_cmp(&y),
                }
            }
        },
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        (Value::List(x), Value::List(y)) => x
            .iter()
            .zip(y)
            .map(|(p, q)| total_order(p, q))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => Ordering::Equal,
    }
}

fn extreme(function: &'static str, args: Vec<Value>, want: Ordering) -> Result<Value, EvalError> {
    let candidates = match args.len() {
        0 => {
            return Err(EvalError::Arity {
                function,
                expected: "at least 1",
                found: 0,
            })
        }
        1 => args[0].iterate()?,
        _ => args,
    };
    let mut iter = candidates.into_iter();
    let mut best = iter.next().ok_or_else(|| EvalError::InvalidArgument {
        function,
        message: "arg is an empty sequence".to_string(),
    })?;
    for candidate in iter {
        if candidate.compare(&best, function)? == want {
            best = candidate;
        }
    }
    Ok(best)
}

// ============================================================================
// Dispatch
// ============================================================================

pub fn call(builtin: Builtin, args: Vec<Value>) -> Result<Value, EvalError> {
    let name = builtin.name();
    match builtin {
        Builtin::Abs => {
            arity(name, &args, 1, 1, "1")?;
            match &args[0] {
                Value::Int(i) => Ok(i
                    .checked_abs()
                    .map(Value::Int)
                    .unwrap_or(Value::Float((*i as f64).abs()))),
                Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(EvalError::BadOperand {
                    op: "abs()",
                    operand: other.type_name(),
                }),
            }
        }
        Builtin::All => {
            arity(name, &args, 1, 1, "1")?;
            Ok(Value::Bool(args[0].iterate()?.iter().all(Value::is_truthy)))
        }
        Builtin::Any => {
            arity(name, &args, 1, 1, "1")?;
            Ok(Value::Bool(args[0].iterate()?.iter().any(Value::is_truthy)))
        }
        Builtin::Bool => {
            arity(name, &args, 0, 1, "0 or 1")?;
            Ok(Value::Bool(args.first().map(Value::is_truthy).unwrap_or(false)))
        }
        Builtin::Float => {
            arity(name, &args, 0, 1, "0 or 1")?;
            match args.first() {
                None => Ok(Value::Float(0.0)),
                Some(Value::Str(s)) => parse_float(s).map(Value::Float).ok_or_else(|| {
                    EvalError::InvalidArgument {
                        function: name,
                        message: format!("could not convert string to float: '{s}'"),
                    }
                }),
                Some(other) => number(name, other).map(Value::Float),
            }
        }
        Builtin::Int => {
            arity(name, &args, 0, 1, "0 or 1")?;
            match args.first() {
                None => Ok(Value::Int(0)),
                Some(Value::Float(f)) => float_to_int(name, *f).map(Value::Int),
                Some(Value::Str(s)) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                    EvalError::InvalidArgument {
                        function: name,
                        message: format!("invalid literal for int() with base 10: '{s}'"),
                    }
                }),
                Some(other) => other.as_i64().map(Value::Int).ok_or(EvalError::InvalidArgument {
                    function: name,
                    message: format!("argument must be a string or a number, not '{}'", other.type_name()),
                }),
            }
        }
        Builtin::Len => {
            arity(name, &args, 1, 1, "1")?;
            let len = match &args[0] {
                Value::Str(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Map(entries) => entries.len(),
                other => {
                    return Err(EvalError::InvalidArgument {
                        function: name,
                        message: format!("object of type '{}' has no len()", other.type_name()),
                    })
                }
            };
            Ok(Value::Int(len as i64))
        }
        Builtin::List => {
            arity(name, &args, 0, 1, "0 or 1")?;
            match args.first() {
                None => Ok(Value::List(Vec::new())),
                Some(iterable) => Ok(Value::List(iterable.iterate()?)),
            }
        }
        Builtin::Max => extreme(name, args, Ordering::Greater),
        Builtin::Min => extreme(name, args, Ordering::Less),
        Builtin::Pow => {
            arity(name, &args, 2, 2, "2")?;
            crate::eval::power(&args[0], &args[1])
        }
        Builtin::Round => {
            arity(name, &args, 1, 2, "1 or 2")?;
            round(&args[0], args.get(1))
        }
        Builtin::Sorted => {
            arity(name, &args, 1, 1, "1")?;
            let mut items = args[0].iterate()?;
            sort_values(name, &mut items)?;
            Ok(Value::List(items))
        }
        Builtin::Str => {
            arity(name, &args, 0, 1, "0 or 1")?;
            Ok(Value::Str(args.first().map(Value::to_string).unwrap_or_default()))
        }
        Builtin::Sum => {
            arity(name, &args, 1, 2, "1 or 2")?;
            let start = args.get(1).cloned().unwrap_or(Value::Int(0));
            args[0]
                .iterate()?
                .iter()
                .try_fold(start, |acc, item| crate::eval::add(&acc, item))
        }
        Builtin::Math(f) => call_math(f, args),
    }
}

fn parse_float(text: &str) -> Option<f64> {
    match text.trim().to_ascii_lowercase().as_str() {
        "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        other => other.parse().ok(),
    }
}

fn round(value: &Value, digits: Option<&Value>) -> Result<Value, EvalError> {
    let digits = match digits {
        None | Some(Value::None) => None,
        Some(d) => Some(d.as_i64().ok_or_else(|| EvalError::InvalidArgument {
            function: "round",
            message: format!("'{}' object cannot be interpreted as an integer", d.type_name()),
        })?),
    };
    match (value, digits) {
        (Value::Int(_) | Value::Bool(_), _) => Ok(Value::Int(value.as_i64().unwrap_or(0))),
        (Value::Float(f), None) => float_to_int("round", f.round_ties_even()).map(Value::Int),
        (Value::Float(f), Some(n)) => {
            let scale = 10f64.powi(n.clamp(-308, 308) as i32);
            Ok(Value::Float((f * scale).round_ties_even() / scale))
        }
        (other, _) => Err(EvalError::BadOperand {
            op: "round()",
            operand: other.type_name(),
        }),
    }
}

fn call_math(f: MathFn, args: Vec<Value>) -> Result<Value, EvalError> {
    let name = f.name();
    let unary = |op: fn(f64) -> f64| -> Result<Value, EvalError> {
        arity(name, &args, 1, 1, "1")?;
        Ok(Value::Float(op(number(name, &args[0])?)))
    };
    let binary = |op: fn(f64, f64) -> f64| -> Result<Value, EvalError> {
        arity(name, &args, 2, 2, "2")?;
        Ok(Value::Float(op(number(name, &args[0])?, number(name, &args[1])?)))
    };
    let predicate = |op: fn(f64) -> bool| -> Result<Value, EvalError> {
        arity(name, &args, 1, 1, "1")?;
        Ok(Value::Bool(op(number(name, &args[0])?)))
    };
    let rounding = |op: fn(f64) -> f64| -> Result<Value, EvalError> {
        arity(name, &args, 1, 1, "1")?;
        match &args[0] {
            Value::Int(i) => Ok(Value::Int(*i)),
            other => float_to_int(name, op(number(name, other)?)).map(Value::Int),
        }
    };

    match f {
        MathFn::Acos | MathFn::Asin => {
            arity(name, &args, 1, 1, "1")?;
            let x = number(name, &args[0])?;
            if !(-1.0..=1.0).contains(&x) {
                return Err(domain_error(name));
            }
            Ok(Value::Float(if f == MathFn::Acos { x.acos() } else { x.asin() }))
        }
        MathFn::Atan => unary(f64::atan),
        MathFn::Atan2 => binary(f64::atan2),
        MathFn::Ceil => rounding(f64::ceil),
        MathFn::Copysign => binary(f64::copysign),
        MathFn::Cos => unary(f64::cos),
        MathFn::Cosh => unary(f64::cosh),
        MathFn::Degrees => unary(f64::to_degrees),
        MathFn::Exp => unary(f64::exp),
        MathFn::Fabs => unary(f64::abs),
        MathFn::Floor => rounding(f64::floor),
        MathFn::Fmod => {
            arity(name, &args, 2, 2, "2")?;
            let (x, y) = (number(name, &args[0])?, number(name, &args[1])?);
            if y == 0.0 {
                return Err(domain_error(name));
            }
            Ok(Value::Float(x % y))
        }
        MathFn::Hypot => binary(f64::hypot),
        MathFn::Isfinite => predicate(f64::is_finite),
        MathFn::Isinf => predicate(f64::is_infinite),
        MathFn::Isnan => predicate(f64::is_nan),
        MathFn::Log => {
            arity(name, &args, 1, 2, "1 or 2")?;
            let x = number(name, &args[0])?;
            if x <= 0.0 {
                return Err(domain_error(name));
            }
            match args.get(1) {
                None => Ok(Value::Float(x.ln())),
                Some(base) => {
                    let base = number(name, base)?;
                    if base <= 0.0 || base == 1.0 {
                        return Err(domain_error(name));
                    }
                    Ok(Value::Float(x.ln() / base.ln()))
                }
            }
        }
        MathFn::Log10 | MathFn::Log2 => {
            arity(name, &args, 1, 1, "1")?;
            let x = number(name, &args[0])?;
            if x <= 0.0 {
                return Err(domain_error(name));
            }
            Ok(Value::Float(if f == MathFn::Log10 { x.log10() } else { x.log2() }))
        }
        MathFn::Pow => binary(f64::powf),
        MathFn::Radians => unary(f64::to_radians),
        MathFn::Sin => unary(f64::sin),
        MathFn::Sinh => unary(f64::sinh),
        MathFn::Sqrt => {
            arity(name, &args, 1, 1, "1")?;
            let x = number(name, &args[0])?;
            if x < 0.0 {
                return Err(domain_error(name));
            }
            Ok(Value::Float(x.sqrt()))
        }
        MathFn::Tan => unary(f64::tan),
        MathFn::Tanh => unary(f64::tanh),
        MathFn::Trunc => rounding(f64::trunc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(Builtin::from_name("len"), Some(Builtin::Len));
        assert_eq!(Builtin::from_name("open"), None);
        assert_eq!(Builtin::Math(MathFn::Sqrt).name(), "sqrt");
        assert_eq!(math_member("pi"), Some(Value::Float(std::f64::consts::PI)));
        assert!(math_member("system").is_none());
    }

    #[test]
    fn test_round_is_half_even() {
        assert_eq!(call(Builtin::Round, vec![Value::Float(2.5)]).unwrap(), Value::Int(2));
        assert_eq!(call(Builtin::Round, vec![Value::Float(3.5)]).unwrap(), Value::Int(4));
        assert_eq!(
            call(Builtin::Round, vec![Value::Float(1.2345), Value::Int(2)]).unwrap(),
            Value::Float(1.23)
        );
    }

    #[test]
    fn test_min_max() {
        let args = vec![Value::List(vec![Value::Int(3), Value::Float(1.5), Value::Int(2)])];
        assert_eq!(call(Builtin::Min, args.clone()).unwrap(), Value::Float(1.5));
        assert_eq!(call(Builtin::Max, args).unwrap(), Value::Int(3));
        assert!(call(Builtin::Max, vec![Value::List(vec![])]).is_err());
    }

    #[test]
    fn test_math_domain() {
        assert!(call_math(MathFn::Sqrt, vec![Value::Int(-1)]).is_err());
        assert_eq!(call_math(MathFn::Floor, vec![Value::Float(-1.5)]).unwrap(), Value::Int(-2));
        assert_eq!(
            call_math(MathFn::Log, vec![Value::Int(8), Value::Int(2)]).unwrap(),
            Value::Float(3.0)
        );
    }

    #[test]
    fn test_sorted_places_nan_last() {
        let nan_first = vec![Value::List(vec![
            Value::Float(f64::NAN),
            Value::Int(3),
            Value::Float(1.5),
            Value::Int(2),
        ])];
        let nan_middle = vec![Value::List(vec![
            Value::Int(3),
            Value::Float(1.5),
            Value::Float(f64::NAN),
            Value::Int(2),
        ])];
        for args in [nan_first, nan_middle] {
            let Value::List(sorted) = call(Builtin::Sorted, args).unwrap() else {
                panic!("sorted returns a list");
            };
            assert_eq!(sorted[..3], [Value::Float(1.5), Value::Int(2), Value::Int(3)]);
            assert!(matches!(sorted[3], Value::Float(f) if f.is_nan()));
        }
    }

    #[test]
    fn test_sorted_nested_lists_with_nan() {
        let nested = vec![Value::List(vec![
            Value::List(vec![Value::Float(f64::NAN)]),
            Value::List(vec![Value::Int(0)]),
        ])];
        let Value::List(sorted) = call(Builtin::Sorted, nested).unwrap() else {
            panic!("sorted returns a list");
        };
        assert_eq!(sorted[0], Value::List(vec![Value::Int(0)]));
    }

    #[test]
    fn test_sorted_rejects_mixed() {
        let mixed = vec![Value::List(vec![Value::Int(1), Value::Str("a".into())])];
        assert!(call(Builtin::Sorted, mixed).is_err());
    }
}
