//! End-to-end behaviour of `evaluate`: accepted expressions and rejections.

use description_expr::{evaluate, Builtin, DisallowedConstruct, EvalError, ExprError, Value, Variables};
use pretty_assertions::assert_eq;

fn vars(pairs: &[(&str, Value)]) -> Variables {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn eval(source: &str) -> Result<Value, ExprError> {
    evaluate(source, &Variables::new())
}

fn as_f64(value: Value) -> f64 {
    value.as_f64().unwrap_or_else(|| panic!("expected a number, got {value:?}"))
}

fn ints(values: &[i64]) -> Value {
    Value::List(values.iter().copied().map(Value::Int).collect())
}

// ============================================================================
// Accepted expressions
// ============================================================================

#[test]
fn literals() {
    assert_eq!(eval("7").unwrap(), Value::Int(7));
    assert_eq!(eval("+6").unwrap(), Value::Int(6));
    assert_eq!(eval("--+-7").unwrap(), Value::Int(-7));
    assert_eq!(
        evaluate("None", &vars(&[("extra", Value::None)])).unwrap(),
        Value::None
    );
    assert_eq!(eval("'a' + \"b\"").unwrap(), Value::Str("ab".to_string()));
}

#[test]
fn arithmetic() {
    assert_eq!(eval("2 + 3 * 4").unwrap(), Value::Int(14));
    assert_eq!(as_f64(eval("123 + 123 // 32 ** 21").unwrap()), 123.0);
    assert_eq!(
        evaluate("camera + seed", &vars(&[("camera", Value::Int(123)), ("seed", Value::Int(12))]))
            .unwrap(),
        Value::Int(135)
    );
    assert_eq!(as_f64(eval("(56 + 59.2//58 )/23").unwrap()), 57.0 / 23.0);
    assert_eq!(eval("7 / 2").unwrap(), Value::Float(3.5));
    assert_eq!(eval("-7 // 2").unwrap(), Value::Int(-4));
    assert_eq!(eval("2 ** -1").unwrap(), Value::Float(0.5));
}

#[test]
fn math_namespace() {
    let v = vars(&[("a", Value::Int(123)), ("b", Value::Int(321))]);
    let expected = 123f64.sin() + 321f64.cos() - 1f64.powf(2.0);
    assert_eq!(
        as_f64(evaluate("math.sin(a) + math.cos(b) - math.pow(1,2)", &v).unwrap()),
        expected
    );

    let v = vars(&[("a", Value::Int(56))]);
    assert_eq!(
        as_f64(evaluate("123 ** math.sin(math.cos(a))", &v).unwrap()),
        123f64.powf(56f64.cos().sin())
    );
    assert_eq!(eval("math.floor(2.7)").unwrap(), Value::Int(2));
    assert_eq!(eval("math.tau / 2 == math.pi").unwrap(), Value::Bool(true));
}

#[test]
fn builtins_and_conditionals() {
    assert_eq!(evaluate("seed", &vars(&[("seed", Value::Int(123))])).unwrap(), Value::Int(123));
    assert_eq!(eval("30 % int(20.3412)").unwrap(), Value::Int(10));
    assert_eq!(eval("str(5)").unwrap(), Value::Str("5".to_string()));
    assert_eq!(eval("len([12,3])").unwrap(), Value::Int(2));
    assert_eq!(eval("(5//len([2]) + int(any([True, False])))").unwrap(), Value::Int(6));
    assert_eq!(
        evaluate("i if i <= 5 else i % 5", &vars(&[("i", Value::Int(100))])).unwrap(),
        Value::Int(0)
    );
    assert_eq!(
        evaluate(
            "bool(j if j+i <= 5 else i if j < 5 else 1)",
            &vars(&[("i", Value::Int(1)), ("j", Value::Int(5))])
        )
        .unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        evaluate("a if a > 0 else -a", &vars(&[("a", Value::Int(-5))])).unwrap(),
        Value::Int(5)
    );
    assert_eq!(eval("sorted([3, 1, 2])").unwrap(), ints(&[1, 2, 3]));
    assert_eq!(eval("sum([1, 2, 3.5])").unwrap(), Value::Float(6.5));
    assert_eq!(eval("max(1, 4, 2)").unwrap(), Value::Int(4));
}

#[test]
fn indexing_and_slicing() {
    let v = vars(&[("arr", ints(&[213, 41]))]);
    assert_eq!(evaluate("arr[:]", &v).unwrap(), ints(&[213, 41]));
    assert_eq!(evaluate("arr[::-1]", &v).unwrap(), ints(&[41, 213]));
    assert_eq!(evaluate("arr[-1]", &v).unwrap(), Value::Int(41));

    let v = vars(&[("arr", ints(&[1, 1, 1]))]);
    assert_eq!(evaluate("arr[0]+1", &v).unwrap(), Value::Int(2));
    assert_eq!(eval("'hello'[1:3]").unwrap(), Value::Str("el".to_string()));
}

#[test]
fn boolean_operators_return_operands() {
    assert_eq!(eval("0 or 'x'").unwrap(), Value::Str("x".to_string()));
    assert_eq!(eval("[] and 1").unwrap(), ints(&[]));
    assert_eq!(eval("not 0").unwrap(), Value::Bool(true));
    assert_eq!(eval("1 < 2 < 3").unwrap(), Value::Bool(true));
    assert_eq!(eval("3 > 2 > 2").unwrap(), Value::Bool(false));
    assert_eq!(eval("2 in [1, 2]").unwrap(), Value::Bool(true));
    assert_eq!(eval("'b' not in 'abc'").unwrap(), Value::Bool(false));
}

// ============================================================================
// Runtime errors (not security rejections)
// ============================================================================

#[test]
fn index_out_of_range_is_an_eval_error() {
    let v = vars(&[("arr", ints(&[1, 2, 3]))]);
    assert_eq!(
        evaluate("arr[5]", &v).unwrap_err(),
        ExprError::Eval(EvalError::IndexOutOfRange { index: 5, len: 3 })
    );
    assert!(matches!(
        evaluate("arr[20000]+1", &v).unwrap_err(),
        ExprError::Eval(EvalError::IndexOutOfRange { .. })
    ));
}

#[test]
fn runtime_failures() {
    assert_eq!(eval("1/0").unwrap_err(), ExprError::Eval(EvalError::DivisionByZero));
    assert!(matches!(
        eval("math.pi(12)").unwrap_err(),
        ExprError::Eval(EvalError::NotCallable("float"))
    ));
    assert!(matches!(eval("'a' + 1").unwrap_err(), ExprError::Eval(EvalError::TypeMismatch { .. })));
    assert!(matches!(eval("len").unwrap_err(), ExprError::Eval(EvalError::NotAValue(_))));
}

#[test]
fn huge_slice_steps_stop_at_the_end() {
    assert_eq!(eval("[1,2,3][1::9223372036854775807]").unwrap(), ints(&[2]));
    assert_eq!(eval("'abc'[::9223372036854775807]").unwrap(), Value::Str("a".to_string()));
    assert_eq!(eval("[1,2,3][::-9223372036854775807]").unwrap(), ints(&[3]));
}

#[test]
fn oversized_repetition_is_an_eval_error() {
    for source in [
        "[1] * 9223372036854775807",
        "9223372036854775807 * [1, 2]",
        "'ab' * 9223372036854775807",
        "'x' * 100000000",
    ] {
        assert!(
            matches!(eval(source).unwrap_err(), ExprError::Eval(EvalError::SequenceTooLong { .. })),
            "{source}"
        );
    }
    assert_eq!(eval("[0] * 3").unwrap(), ints(&[0, 0, 0]));
    assert_eq!(eval("'ab' * 2").unwrap(), Value::Str("abab".to_string()));
}

#[test]
fn syntax_errors() {
    assert!(eval("x=7").unwrap_err().is_syntax());
    assert!(eval("1 +").unwrap_err().is_syntax());
    assert!(eval("(1, 2").unwrap_err().is_syntax());
}

// ============================================================================
// Security rejections
// ============================================================================

fn assert_disallowed(source: &str) {
    match eval(source) {
        Err(ExprError::Disallowed(_)) => {}
        other => panic!("expected {source:?} to be disallowed, got {other:?}"),
    }
}

#[test]
fn named_rejections() {
    assert_eq!(
        eval("os.system('x')").unwrap_err(),
        ExprError::Disallowed(DisallowedConstruct::Attribute {
            object: "os".to_string(),
            attribute: "system".to_string(),
        })
    );
    assert_eq!(
        eval("__import__('os')").unwrap_err(),
        ExprError::Disallowed(DisallowedConstruct::Name("__import__".to_string()))
    );
    assert_eq!(
        eval("lambda x: x").unwrap_err(),
        ExprError::Disallowed(DisallowedConstruct::Keyword("lambda".to_string()))
    );
    assert_eq!(
        eval("x").unwrap_err(),
        ExprError::Disallowed(DisallowedConstruct::Name("x".to_string()))
    );
}

#[test]
fn statements_and_host_access_are_rejected() {
    for source in [
        "print(\"123\")",
        "yield None",
        "try: 2/0\nexcept: exit(1)",
        "for x in range(0, 1000): x-=1",
        "class X: pass",
        "raise Exception(\"123\")",
        "assert(False)",
        "return 42 if a == 1 else None",
        "with open('t.txt', 'w+') as f: f.write(\" 123\")",
        "def f(): raise(\"error\"); f()",
        "(lambda x : x)(1)",
        "import os",
        "open('test.txt', 'w').write('Hello')",
        "exit(0)",
        "while True: math.cos(1)",
        "__import__('os').system('dir')",
        "print((1).__class__.__bases__[0].__subclasses__())",
        "(__import__('types').FunctionType).__code__",
        "import os; math.cos = lambda x:os.system('sudo rm -rf /')",
        "{'a': 1}",
        "range(10)",
    ] {
        assert_disallowed(source);
    }
}

#[test]
fn statement_sequences_never_evaluate() {
    for source in [
        "list.append = lambda self, item: None",
        "123 + 123; import os; os.system('sudo rm -rf /')",
        "any(i % 5 == i % 3 for i in range(10))",
    ] {
        assert!(eval(source).is_err(), "{source:?} should fail");
    }
}

#[test]
fn callable_variables_are_rejected() {
    let v = vars(&[("f", Value::Builtin(Builtin::Len))]);
    assert_eq!(
        evaluate("f(5)", &v).unwrap_err(),
        ExprError::Disallowed(DisallowedConstruct::CallableVariable {
            name: "f".to_string(),
            type_name: "builtin_function_or_method",
        })
    );

    // smuggled inside a list
    let v = vars(&[("fs", Value::List(vec![Value::Builtin(Builtin::Len)]))]);
    assert!(matches!(
        evaluate("1", &v).unwrap_err(),
        ExprError::Disallowed(DisallowedConstruct::CallableVariable { .. })
    ));
}
