//! Recursive-descent parser for the expression language
//!
//! Precedence, loosest first:
//!
//! ```text
//! conditional   a if cond else b
//! or / and / not
//! comparison    < <= > >= == != in, not in, is, is not  (chained)
//! sum           + -
//! term          * / // %
//! factor        unary + -
//! power         **  (right associative, binds tighter than a unary on its left)
//! primary       atom followed by calls, subscripts, slices, .attribute
//! atom          numbers, strings, True/False/None, names, (...), [...]
//! ```
//!
//! Statement keywords found where an operand is expected (`lambda`, `import`,
//! `for`, ...) abort the parse with a [`DisallowedConstruct`] instead of a
//! syntax error, so they are reported as security rejections.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, tag, take_while},
    character::complete::{char, digit0, digit1, multispace0, none_of, one_of, satisfy},
    combinator::{all_consuming, cut, map, not, opt, recognize, value},
    error::{ContextError, ErrorKind, ParseError},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::ast::*;
use crate::error::{DisallowedConstruct, ExprError};

/// Statement keywords that never form part of an expression.
const FORBIDDEN_KEYWORDS: &[&str] = &[
    "lambda", "import", "from", "def", "class", "for", "while", "try", "except", "finally",
    "raise", "assert", "return", "yield", "with", "del", "global", "nonlocal", "pass", "break",
    "continue", "async", "await", "as", "elif",
];

/// Keywords owned by the expression grammar itself.
const GRAMMAR_KEYWORDS: &[&str] = &["and", "or", "not", "if", "else", "in", "is"];

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug)]
pub(crate) enum ParseFailure<'a> {
    Syntax { input: &'a str, kind: ErrorKind },
    Disallowed(DisallowedConstruct),
}

impl<'a> ParseError<&'a str> for ParseFailure<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        ParseFailure::Syntax { input, kind }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    fn or(self, other: Self) -> Self {
        match self {
            ParseFailure::Disallowed(_) => self,
            ParseFailure::Syntax { .. } => other,
        }
    }
}

impl<'a> ContextError<&'a str> for ParseFailure<'a> {}

impl<'a> ParseFailure<'a> {
    fn into_error(self, source: &str) -> ExprError {
        match self {
            ParseFailure::Disallowed(construct) => ExprError::Disallowed(construct),
            ParseFailure::Syntax { input, kind } => {
                let offset = source.len().saturating_sub(input.len());
                let near: String = input.trim_start().chars().take(16).collect();
                let message = if near.is_empty() {
                    "unexpected end of expression".to_string()
                } else {
                    format!("unexpected input near '{near}' ({})", kind.description())
                };
                ExprError::Syntax { offset, message }
            }
        }
    }
}

type PResult<'a, T> = IResult<&'a str, T, ParseFailure<'a>>;

fn syntax_error(input: &str, kind: ErrorKind) -> nom::Err<ParseFailure<'_>> {
    nom::Err::Error(ParseFailure::Syntax { input, kind })
}

fn disallowed<'a>(construct: DisallowedConstruct) -> nom::Err<ParseFailure<'a>> {
    nom::Err::Failure(ParseFailure::Disallowed(construct))
}

// ============================================================================
// Public API
// ============================================================================

/// Parse a complete expression. Leading and trailing whitespace is ignored.
pub fn parse_expression(source: &str) -> Result<Expr, ExprError> {
    match all_consuming(delimited(multispace0, expression, multispace0))(source) {
        Ok((_, expr)) => Ok(expr),
        Err(nom::Err::Error(failure)) | Err(nom::Err::Failure(failure)) => {
            Err(failure.into_error(source))
        }
        Err(nom::Err::Incomplete(_)) => Err(ExprError::Syntax {
            offset: source.len(),
            message: "unexpected end of expression".to_string(),
        }),
    }
}

// ============================================================================
// Lexical helpers
// ============================================================================

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn sp<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    preceded(multispace0, inner)
}

fn symbol<'a>(text: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    sp(tag(text))
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    sp(terminated(tag(word), not(satisfy(is_ident_char))))
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))(input)
}

// ============================================================================
// Operator precedence levels
// ============================================================================

fn expression(input: &str) -> PResult<'_, Expr> {
    let (input, body) = disjunction(input)?;
    let (input, branch) = opt(pair(
        preceded(keyword("if"), disjunction),
        preceded(cut(keyword("else")), expression),
    ))(input)?;

    Ok(match branch {
        Some((condition, else_branch)) => (
            input,
            Expr::Conditional {
                condition: Box::new(condition),
                then_branch: Box::new(body),
                else_branch: Box::new(else_branch),
            },
        ),
        None => (input, body),
    })
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn disjunction(input: &str) -> PResult<'_, Expr> {
    let (input, first) = conjunction(input)?;
    let (input, rest) = many0(preceded(keyword("or"), conjunction))(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |left, right| logical(LogicalOp::Or, left, right)),
    ))
}

fn conjunction(input: &str) -> PResult<'_, Expr> {
    let (input, first) = inversion(input)?;
    let (input, rest) = many0(preceded(keyword("and"), inversion))(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |left, right| logical(LogicalOp::And, left, right)),
    ))
}

fn inversion(input: &str) -> PResult<'_, Expr> {
    alt((
        map(preceded(keyword("not"), inversion), |operand| Expr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        }),
        comparison,
    ))(input)
}

fn compare_op(input: &str) -> PResult<'_, CompareOp> {
    alt((
        value(CompareOp::Le, symbol("<=")),
        value(CompareOp::Ge, symbol(">=")),
        value(CompareOp::Eq, symbol("==")),
        value(CompareOp::Ne, symbol("!=")),
        value(CompareOp::Lt, symbol("<")),
        value(CompareOp::Gt, symbol(">")),
        value(CompareOp::NotIn, pair(keyword("not"), keyword("in"))),
        value(CompareOp::In, keyword("in")),
        value(CompareOp::IsNot, pair(keyword("is"), keyword("not"))),
        value(CompareOp::Is, keyword("is")),
    ))(input)
}

fn comparison(input: &str) -> PResult<'_, Expr> {
    let (input, first) = sum(input)?;
    let (input, rest) = many0(pair(compare_op, sum))(input)?;
    if rest.is_empty() {
        return Ok((input, first));
    }
    Ok((
        input,
        Expr::Compare {
            first: Box::new(first),
            rest,
        },
    ))
}

fn sum(input: &str) -> PResult<'_, Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(
        sp(alt((
            value(BinaryOp::Add, char('+')),
            value(BinaryOp::Sub, char('-')),
        ))),
        term,
    ))(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |left, (op, right)| binary(op, left, right)),
    ))
}

fn term_op(input: &str) -> PResult<'_, BinaryOp> {
    sp(alt((
        value(BinaryOp::FloorDiv, tag("//")),
        value(BinaryOp::Div, tag("/")),
        value(BinaryOp::Mod, tag("%")),
        value(BinaryOp::Mul, terminated(tag("*"), not(char('*')))),
    )))(input)
}

fn term(input: &str) -> PResult<'_, Expr> {
    let (input, first) = factor(input)?;
    let (input, rest) = many0(pair(term_op, factor))(input)?;
    Ok((
        input,
        rest.into_iter()
            .fold(first, |left, (op, right)| binary(op, left, right)),
    ))
}

fn factor(input: &str) -> PResult<'_, Expr> {
    alt((
        map(
            pair(
                sp(alt((
                    value(UnaryOp::Neg, char('-')),
                    value(UnaryOp::Pos, char('+')),
                ))),
                factor,
            ),
            |(op, operand)| Expr::Unary {
                op,
                operand: Box::new(operand),
            },
        ),
        power,
    ))(input)
}

fn power(input: &str) -> PResult<'_, Expr> {
    let (input, base) = primary(input)?;
    let (input, exponent) = opt(preceded(symbol("**"), factor))(input)?;
    Ok(match exponent {
        Some(exponent) => (input, binary(BinaryOp::Pow, base, exponent)),
        None => (input, base),
    })
}

// ============================================================================
// Postfix: calls, subscripts, attributes
// ============================================================================

enum Postfix {
    Call(Vec<Expr>),
    Index(Expr),
    Slice(Option<Expr>, Option<Expr>, Option<Expr>),
    Attribute(String),
}

fn comma_list(input: &str) -> PResult<'_, Vec<Expr>> {
    terminated(separated_list0(symbol(","), expression), opt(symbol(",")))(input)
}

fn subscript(input: &str) -> PResult<'_, Postfix> {
    let (input, start) = opt(expression)(input)?;
    let (input, colon) = opt(symbol(":"))(input)?;
    match (start, colon) {
        (Some(index), None) => Ok((input, Postfix::Index(index))),
        (None, None) => Err(syntax_error(input, ErrorKind::Tag)),
        (start, Some(_)) => {
            let (input, stop) = opt(expression)(input)?;
            let (input, step) = opt(preceded(symbol(":"), opt(expression)))(input)?;
            Ok((input, Postfix::Slice(start, stop, step.flatten())))
        }
    }
}

fn postfix(input: &str) -> PResult<'_, Postfix> {
    alt((
        map(delimited(symbol("("), comma_list, symbol(")")), Postfix::Call),
        delimited(symbol("["), subscript, symbol("]")),
        map(preceded(symbol("."), sp(identifier)), |name| {
            Postfix::Attribute(name.to_string())
        }),
    ))(input)
}

fn primary(input: &str) -> PResult<'_, Expr> {
    let (mut input, mut expr) = atom(input)?;
    loop {
        let (rest, suffix) = opt(postfix)(input)?;
        let Some(suffix) = suffix else { break };
        input = rest;
        let object = Box::new(expr);
        expr = match suffix {
            Postfix::Call(args) => Expr::Call {
                function: object,
                args,
            },
            Postfix::Index(index) => Expr::Subscript {
                object,
                index: Box::new(index),
            },
            Postfix::Slice(start, stop, step) => Expr::Slice {
                object,
                start: start.map(Box::new),
                stop: stop.map(Box::new),
                step: step.map(Box::new),
            },
            Postfix::Attribute(attribute) => Expr::Attribute { object, attribute },
        };
    }
    Ok((input, expr))
}

// ============================================================================
// Atoms
// ============================================================================

fn atom(input: &str) -> PResult<'_, Expr> {
    let (input, _) = multispace0(input)?;
    alt((
        number,
        map(string_literal, |s| Expr::Literal(Literal::Str(s))),
        parenthesized,
        map(delimited(char('['), comma_list, symbol("]")), Expr::List),
        brace_display,
        name_or_keyword,
    ))(input)
}

fn exponent(input: &str) -> PResult<'_, &str> {
    recognize(tuple((one_of("eE"), opt(one_of("+-")), digit1)))(input)
}

fn number(input: &str) -> PResult<'_, Expr> {
    let (rest, text) = alt((
        recognize(tuple((digit1, opt(pair(char('.'), digit0)), opt(exponent)))),
        recognize(tuple((char('.'), digit1, opt(exponent)))),
    ))(input)?;

    let is_float = text.contains(|c: char| matches!(c, '.' | 'e' | 'E'));
    let literal = match text.parse::<i64>() {
        Ok(i) if !is_float => Literal::Int(i),
        // integers past i64 degrade to floats
        _ => Literal::Float(
            text.parse::<f64>()
                .map_err(|_| syntax_error(input, ErrorKind::Float))?,
        ),
    };
    Ok((rest, Expr::Literal(literal)))
}

fn string_literal(input: &str) -> PResult<'_, String> {
    alt((quoted('"'), quoted('\'')))(input)
}

fn quoted<'a>(quote: char) -> impl FnMut(&'a str) -> PResult<'a, String> {
    let normal = if quote == '"' { "\"\\" } else { "'\\" };
    move |input: &'a str| {
        let (input, _) = char(quote)(input)?;
        let (input, body) = opt(escaped_transform(
            none_of(normal),
            '\\',
            alt((
                value("\\", tag("\\")),
                value("\"", tag("\"")),
                value("'", tag("'")),
                value("\n", tag("n")),
                value("\t", tag("t")),
                value("\r", tag("r")),
                value("\0", tag("0")),
            )),
        ))(input)?;
        let (input, _) = cut(char(quote))(input)?;
        Ok((input, body.unwrap_or_default()))
    }
}

fn parenthesized(input: &str) -> PResult<'_, Expr> {
    let (input, _) = char('(')(input)?;
    let (input, mut items) = separated_list0(symbol(","), expression)(input)?;
    let (input, trailing) = opt(symbol(","))(input)?;
    let (input, _) = symbol(")")(input)?;

    // `(x)` groups, `(x,)` and `(a, b)` are tuples
    if trailing.is_none() && items.len() == 1 {
        if let Some(inner) = items.pop() {
            return Ok((input, inner));
        }
    }
    Ok((input, Expr::List(items)))
}

fn brace_display(input: &str) -> PResult<'_, Expr> {
    let _ = char::<_, ParseFailure<'_>>('{')(input)?;
    Err(disallowed(DisallowedConstruct::NodeKind("Dict")))
}

fn name_or_keyword(input: &str) -> PResult<'_, Expr> {
    let (rest, ident) = identifier(input)?;
    match ident {
        "True" => Ok((rest, Expr::Literal(Literal::Bool(true)))),
        "False" => Ok((rest, Expr::Literal(Literal::Bool(false)))),
        "None" => Ok((rest, Expr::Literal(Literal::None))),
        word if FORBIDDEN_KEYWORDS.contains(&word) => {
            Err(disallowed(DisallowedConstruct::Keyword(word.to_string())))
        }
        word if GRAMMAR_KEYWORDS.contains(&word) => Err(syntax_error(input, ErrorKind::Tag)),
        name => Ok((rest, Expr::Name(name.to_string()))),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn int(i: i64) -> Expr {
        Expr::Literal(Literal::Int(i))
    }

    fn name(n: &str) -> Expr {
        Expr::Name(n.to_string())
    }

    #[test]
    fn test_syntax_message_names_failed_parser() {
        let ExprError::Syntax { offset, message } = parse_expression("1 2").unwrap_err() else {
            panic!("expected a syntax error");
        };
        assert_eq!(offset, 2);
        assert!(message.contains("near '2'"), "{message}");
        assert!(message.contains(ErrorKind::Eof.description()), "{message}");
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expression("2 + 3 * 4").unwrap();
        assert_eq!(
            expr,
            binary(BinaryOp::Add, int(2), binary(BinaryOp::Mul, int(3), int(4)))
        );
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let expr = parse_expression("-2 ** 2").unwrap();
        assert_eq!(
            expr,
            Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(binary(BinaryOp::Pow, int(2), int(2))),
            }
        );
    }

    #[test]
    fn test_conditional() {
        let expr = parse_expression("a if a > 0 else -a").unwrap();
        assert!(matches!(expr, Expr::Conditional { .. }));
    }

    #[test]
    fn test_chained_comparison() {
        let expr = parse_expression("1 < x <= 3").unwrap();
        match expr {
            Expr::Compare { first, rest } => {
                assert_eq!(*first, int(1));
                assert_eq!(rest.len(), 2);
                assert_eq!(rest[0].0, CompareOp::Lt);
                assert_eq!(rest[1].0, CompareOp::Le);
            }
            other => panic!("expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_not_in() {
        let expr = parse_expression("x not in [1, 2]").unwrap();
        match expr {
            Expr::Compare { rest, .. } => assert_eq!(rest[0].0, CompareOp::NotIn),
            other => panic!("expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_postfix_chain() {
        let expr = parse_expression("math.sqrt(arr[1:3][0])").unwrap();
        match expr {
            Expr::Call { function, args } => {
                assert_eq!(
                    *function,
                    Expr::Attribute {
                        object: Box::new(name("math")),
                        attribute: "sqrt".to_string(),
                    }
                );
                assert!(matches!(args[0], Expr::Subscript { .. }));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn test_tuple_and_grouping() {
        assert_eq!(parse_expression("(1)").unwrap(), int(1));
        assert_eq!(parse_expression("(1,)").unwrap(), Expr::List(vec![int(1)]));
        assert_eq!(parse_expression("()").unwrap(), Expr::List(vec![]));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse_expression("1e3").unwrap(), Expr::Literal(Literal::Float(1000.0)));
        assert_eq!(parse_expression(".5").unwrap(), Expr::Literal(Literal::Float(0.5)));
        assert_eq!(parse_expression("12").unwrap(), int(12));
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            parse_expression(r#"'it\'s' "#).unwrap(),
            Expr::Literal(Literal::Str("it's".to_string()))
        );
        assert_eq!(
            parse_expression(r#""""#).unwrap(),
            Expr::Literal(Literal::Str(String::new()))
        );
    }

    #[test]
    fn test_forbidden_keyword_is_disallowed() {
        let err = parse_expression("lambda x: x").unwrap_err();
        assert_eq!(
            err,
            ExprError::Disallowed(DisallowedConstruct::Keyword("lambda".to_string()))
        );
        let err = parse_expression("(import os)").unwrap_err();
        assert!(err.disallowed().is_some());
    }

    #[test]
    fn test_trailing_words_are_syntax_errors() {
        let err = parse_expression("Hello from somewhere").unwrap_err();
        assert!(err.is_syntax());
    }

    #[test]
    fn test_dict_display_is_disallowed() {
        let err = parse_expression("{'a': 1}").unwrap_err();
        assert_eq!(err, ExprError::Disallowed(DisallowedConstruct::NodeKind("Dict")));
    }

    #[test]
    fn test_assignment_is_syntax_error() {
        assert!(parse_expression("x = 7").unwrap_err().is_syntax());
        assert!(parse_expression("1; 2").unwrap_err().is_syntax());
    }
}
