//! Tree-walking interpreter for validated expressions.

use std::cmp::Ordering;

use crate::ast::*;
use crate::builtins::{self, Builtin};
use crate::error::EvalError;
use crate::value::Value;
use crate::Variables;

pub struct Evaluator<'v> {
    variables: &'v Variables,
}

impl<'v> Evaluator<'v> {
    pub fn new(variables: &'v Variables) -> Self {
        Self { variables }
    }

    /// Evaluate to a plain value. A bare function is not a result.
    pub fn evaluate(&self, expr: &Expr) -> Result<Value, EvalError> {
        match self.eval(expr)? {
            Value::Builtin(b) => Err(EvalError::NotAValue(b.name().to_string())),
            value => Ok(value),
        }
    }

    fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::None => Value::None,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(i) => Value::Int(*i),
                Literal::Float(f) => Value::Float(*f),
                Literal::Str(s) => Value::Str(s.clone()),
            }),
            Expr::Name(name) => self
                .variables
                .get(name)
                .cloned()
                .or_else(|| Builtin::from_name(name).map(Value::Builtin))
                .ok_or_else(|| EvalError::UnknownName(name.clone())),
            Expr::Attribute { attribute, .. } => builtins::math_member(attribute)
                .ok_or_else(|| EvalError::UnknownName(format!("math.{attribute}"))),
            Expr::Unary { op, operand } => unary(*op, self.eval(operand)?),
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                arithmetic(*op, &left, &right)
            }
            Expr::Logical { op, left, right } => {
                let left = self.eval(left)?;
                match (op, left.is_truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.eval(right),
                }
            }
            Expr::Compare { first, rest } => {
                let mut left = self.eval(first)?;
                for (op, right) in rest {
                    let right = self.eval(right)?;
                    if !compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(then_branch)
                } else {
                    self.eval(else_branch)
                }
            }
            Expr::Call { function, args } => {
                let function = self.eval(function)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                match function {
                    Value::Builtin(b) => builtins::call(b, args),
                    other => Err(EvalError::NotCallable(other.type_name())),
                }
            }
            Expr::Subscript { object, index } => {
                let object = self.eval(object)?;
                let index = self.eval(index)?;
                subscript(&object, &index)
            }
            Expr::Slice {
                object,
                start,
                stop,
                step,
            } => {
                let object = self.eval(object)?;
                let start = self.slice_bound(start.as_deref())?;
                let stop = self.slice_bound(stop.as_deref())?;
                let step = self.slice_bound(step.as_deref())?;
                slice(&object, start, stop, step)
            }
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
        }
    }

    fn slice_bound(&self, bound: Option<&Expr>) -> Result<Option<i64>, EvalError> {
        let Some(bound) = bound else { return Ok(None) };
        match self.eval(bound)? {
            Value::None => Ok(None),
            v => v.as_i64().map(Some).ok_or(EvalError::InvalidArgument {
                function: "slice",
                message: "slice indices must be integers or None".to_string(),
            }),
        }
    }
}

// ============================================================================
// Operators
// ============================================================================

fn unary(op: UnaryOp, operand: Value) -> Result<Value, EvalError> {
    match (op, &operand) {
        (UnaryOp::Not, _) => Ok(Value::Bool(!operand.is_truthy())),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Pos, Value::Float(f)) => Ok(Value::Float(*f)),
        (UnaryOp::Neg, v) if v.as_i64().is_some() => {
            let i = v.as_i64().unwrap_or(0);
            Ok(i.checked_neg()
                .map(Value::Int)
                .unwrap_or(Value::Float(-(i as f64))))
        }
        (UnaryOp::Pos, v) if v.as_i64().is_some() => Ok(Value::Int(v.as_i64().unwrap_or(0))),
        (op, v) => Err(EvalError::BadOperand {
            op: match op {
                UnaryOp::Neg => "unary -",
                _ => "unary +",
            },
            operand: v.type_name(),
        }),
    }
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::TypeMismatch {
        op: op.symbol(),
        left: left.type_name(),
        right: right.type_name(),
    }
}

pub(crate) fn add(left: &Value, right: &Value) -> Result<Value, EvalError> {
    arithmetic(BinaryOp::Add, left, right)
}

pub(crate) fn power(left: &Value, right: &Value) -> Result<Value, EvalError> {
    arithmetic(BinaryOp::Pow, left, right)
}

/// Longest list or string (in bytes) a repetition may produce.
pub const MAX_SEQUENCE_LEN: usize = 1 << 24;

/// Repeat count for a sequence of `len`, refusing results over [`MAX_SEQUENCE_LEN`].
fn repeat_count(len: usize, times: i64) -> Result<usize, EvalError> {
    // negative counts give an empty sequence
    let times = usize::try_from(times).unwrap_or(0);
    match len.checked_mul(times) {
        Some(total) if total <= MAX_SEQUENCE_LEN => Ok(times),
        _ => Err(EvalError::SequenceTooLong {
            len,
            times,
            max: MAX_SEQUENCE_LEN,
        }),
    }
}

fn repeat<T: Clone>(items: &[T], times: i64) -> Result<Vec<T>, EvalError> {
    let times = repeat_count(items.len(), times)?;
    let mut out = Vec::with_capacity(items.len() * times);
    for _ in 0..times {
        out.extend_from_slice(items);
    }
    Ok(out)
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        return integer_arithmetic(op, a, b);
    }
    if left.is_number() && right.is_number() {
        let a = left.as_f64().unwrap_or(f64::NAN);
        let b = right.as_f64().unwrap_or(f64::NAN);
        return float_arithmetic(op, a, b);
    }

    match (op, left, right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (BinaryOp::Mul, Value::Str(s), n) | (BinaryOp::Mul, n, Value::Str(s))
            if n.as_i64().is_some() =>
        {
            let times = repeat_count(s.len(), n.as_i64().unwrap_or(0))?;
            Ok(Value::Str(s.repeat(times)))
        }
        (BinaryOp::Mul, Value::List(items), n) | (BinaryOp::Mul, n, Value::List(items))
            if n.as_i64().is_some() =>
        {
            Ok(Value::List(repeat(items, n.as_i64().unwrap_or(0))?))
        }
        _ => Err(mismatch(op, left, right)),
    }
}

fn integer_arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<Value, EvalError> {
    // overflow falls back to float arithmetic
    let checked = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => return float_arithmetic(op, a as f64, b as f64),
        BinaryOp::FloorDiv | BinaryOp::Mod if b == 0 => return Err(EvalError::DivisionByZero),
        BinaryOp::FloorDiv => a.checked_div(b).map(|q| {
            if a % b != 0 && ((a < 0) != (b < 0)) {
                q - 1
            } else {
                q
            }
        }),
        BinaryOp::Mod => a.checked_rem(b).map(|r| {
            if r != 0 && ((r < 0) != (b < 0)) {
                r + b
            } else {
                r
            }
        }),
        BinaryOp::Pow if b < 0 => return float_arithmetic(op, a as f64, b as f64),
        BinaryOp::Pow => u32::try_from(b).ok().and_then(|e| a.checked_pow(e)),
    };
    match checked {
        Some(i) => Ok(Value::Int(i)),
        None => float_arithmetic(op, a as f64, b as f64),
    }
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Result<Value, EvalError> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::FloorDiv | BinaryOp::Mod if b == 0.0 => {
            return Err(EvalError::DivisionByZero)
        }
        BinaryOp::Div => a / b,
        BinaryOp::FloorDiv => (a / b).floor(),
        BinaryOp::Mod => {
            let r = a % b;
            if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
                r + b
            } else {
                r
            }
        }
        BinaryOp::Pow if a == 0.0 && b < 0.0 => return Err(EvalError::DivisionByZero),
        BinaryOp::Pow => a.powf(b),
    };
    Ok(Value::Float(result))
}

fn contains(container: &Value, item: &Value) -> Result<bool, EvalError> {
    match container {
        Value::List(items) => Ok(items.iter().any(|candidate| candidate.loose_eq(item))),
        Value::Map(entries) => Ok(entries
            .iter()
            .any(|(key, _)| item.as_str() == Some(key.as_str()))),
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_str())),
            other => Err(EvalError::TypeMismatch {
                op: "in",
                left: other.type_name(),
                right: "str",
            }),
        },
        other => Err(EvalError::NotIterable(other.type_name())),
    }
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    Ok(match op {
        CompareOp::Eq => left.loose_eq(right),
        CompareOp::Ne => !left.loose_eq(right),
        CompareOp::Lt => left.compare(right, op.symbol())? == Ordering::Less,
        CompareOp::Le => left.compare(right, op.symbol())? != Ordering::Greater,
        CompareOp::Gt => left.compare(right, op.symbol())? == Ordering::Greater,
        CompareOp::Ge => left.compare(right, op.symbol())? != Ordering::Less,
        CompareOp::In => contains(right, left)?,
        CompareOp::NotIn => !contains(right, left)?,
        CompareOp::Is => left.type_name() == right.type_name() && left.loose_eq(right),
        CompareOp::IsNot => !(left.type_name() == right.type_name() && left.loose_eq(right)),
    })
}

// ============================================================================
// Indexing
// ============================================================================

fn resolve_index(index: i64, len: usize) -> Result<usize, EvalError> {
    let signed_len = len as i64;
    let resolved = if index < 0 { index + signed_len } else { index };
    if resolved < 0 || resolved >= signed_len {
        return Err(EvalError::IndexOutOfRange { index, len });
    }
    Ok(resolved as usize)
}

fn subscript(object: &Value, index: &Value) -> Result<Value, EvalError> {
    match object {
        Value::List(items) => {
            let i = index_integer(index)?;
            Ok(items[resolve_index(i, items.len())?].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = index_integer(index)?;
            Ok(Value::Str(chars[resolve_index(i, chars.len())?].to_string()))
        }
        Value::Map(entries) => {
            let key = index.as_str().ok_or_else(|| EvalError::KeyNotFound(index.to_string()))?;
            entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| EvalError::KeyNotFound(key.to_string()))
        }
        other => Err(EvalError::NotSubscriptable(other.type_name())),
    }
}

fn index_integer(index: &Value) -> Result<i64, EvalError> {
    index.as_i64().ok_or(EvalError::InvalidArgument {
        function: "subscript",
        message: format!("indices must be integers, not {}", index.type_name()),
    })
}

/// Positions selected by `[start:stop:step]` over a sequence of `len`.
fn slice_positions(
    len: usize,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Result<Vec<usize>, EvalError> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(EvalError::InvalidArgument {
            function: "slice",
            message: "slice step cannot be zero".to_string(),
        });
    }
    let len = len as i64;
    let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };
    let clamp = |bound: i64| {
        if bound < 0 {
            (bound + len).max(lower)
        } else {
            bound.min(upper)
        }
    };
    let start = start.map(clamp).unwrap_or(if step > 0 { lower } else { upper });
    let stop = stop.map(clamp).unwrap_or(if step > 0 { upper } else { lower });

    let mut positions = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        positions.push(i as usize);
        // a step past the i64 range has left the sequence anyway
        i = match i.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(positions)
}

fn slice(
    object: &Value,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> Result<Value, EvalError> {
    match object {
        Value::List(items) => Ok(Value::List(
            slice_positions(items.len(), start, stop, step)?
                .into_iter()
                .map(|i| items[i].clone())
                .collect(),
        )),
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::Str(
                slice_positions(chars.len(), start, stop, step)?
                    .into_iter()
                    .map(|i| chars[i])
                    .collect(),
            ))
        }
        other => Err(EvalError::NotSubscriptable(other.type_name())),
    }
}
