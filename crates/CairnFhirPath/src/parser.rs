//! # FHIRPath Expression Grammar
//!
//! A chumsky parser for the FHIRPath expression language, producing the
//! [`Expression`] tree the compiler walks. The grammar covers literals
//! (including date/time and quantity forms), member navigation, function
//! invocation, indexers, and the full operator precedence ladder:
//!
//! 1. Postfix: member access (`.`), indexing (`[]`)
//! 2. Prefix: unary `+` / `-`
//! 3. Multiplicative: `*`, `/`, `div`, `mod`
//! 4. Additive: `+`, `-`, `&`
//! 5. Union: `|`
//! 6. Inequality: `<`, `<=`, `>`, `>=`
//! 7. Type: `is`, `as`
//! 8. Equality: `=`, `~`, `!=`, `!~`
//! 9. Membership: `in`, `contains`
//! 10. `and`
//! 11. `or`, `xor`
//! 12. `implies`
//!
//! Single-line (`//`) and multi-line (`/* */`) comments are skipped.
//! Temporal literals are validated with chrono where they carry full
//! precision and are stored as their canonical source strings; partial
//! precisions (`@2015`, `@2015-01`) pass through shape-checked.

use chumsky::Parser;
use chumsky::error::Rich;
use chumsky::prelude::*;
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// A literal value appearing in an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// The empty collection, `{}`.
    Null,
    Boolean(bool),
    /// A single-quoted string.
    String(String),
    /// A decimal number (with a decimal point).
    Number(Decimal),
    /// An integer number.
    Integer(i64),
    /// A date literal such as `@2015-01-01`, kept as its canonical string.
    Date(String),
    /// A datetime literal such as `@2015-01-01T10:30:00Z`.
    DateTime(String),
    /// A time literal such as `@T14:30:00`.
    Time(String),
    /// A quantity: value plus unit, e.g. `5 'mg'` or `3 days`.
    Quantity(Decimal, String),
}

/// A node in the parsed expression tree. The structure preserves operator
/// precedence and nesting; the compiler consumes it step by step without
/// further transformation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Term(Term),
    /// Member access or function call applied to a base expression,
    /// e.g. `Patient.name` or `name.first()`.
    Invocation(Box<Expression>, Invocation),
    /// An indexer, e.g. `name[0]`.
    Indexer(Box<Expression>, Box<Expression>),
    /// Unary `+` or `-`.
    Polarity(char, Box<Expression>),
    Multiplicative(Box<Expression>, String, Box<Expression>),
    Additive(Box<Expression>, String, Box<Expression>),
    /// `is` / `as` type operations.
    Type(Box<Expression>, String, TypeSpecifier),
    Union(Box<Expression>, Box<Expression>),
    Inequality(Box<Expression>, String, Box<Expression>),
    Equality(Box<Expression>, String, Box<Expression>),
    /// `in` / `contains` membership tests.
    Membership(Box<Expression>, String, Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    /// `or` / `xor`.
    Or(Box<Expression>, String, Box<Expression>),
    Implies(Box<Expression>, Box<Expression>),
}

/// A type name in `is`/`as` operations, possibly namespace-qualified
/// (`FHIR.Patient`, `System.Boolean`).
#[derive(Debug, Clone, PartialEq)]
pub enum TypeSpecifier {
    QualifiedIdentifier(String, Option<String>),
}

/// The most basic unit of an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    /// A member reference, function call or `$this`.
    Invocation(Invocation),
    Literal(Literal),
    /// An external constant reference, e.g. `%ucum`. Parsed but rejected
    /// by the compiler.
    ExternalConstant(String),
    Parenthesized(Box<Expression>),
}

/// A single invocation step.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// Property access by name.
    Member(String),
    /// A function call with arguments.
    Function(String, Vec<Expression>),
    /// The current item in an item-context, `$this`.
    This,
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Term(t) => write!(f, "{}", t),
            Expression::Invocation(base, invocation) => write!(f, "{}.{}", base, invocation),
            Expression::Indexer(base, index) => write!(f, "{}[{}]", base, index),
            Expression::Polarity(op, e) => write!(f, "{}{}", op, e),
            Expression::Multiplicative(l, op, r)
            | Expression::Additive(l, op, r)
            | Expression::Inequality(l, op, r)
            | Expression::Equality(l, op, r)
            | Expression::Membership(l, op, r)
            | Expression::Or(l, op, r) => write!(f, "{} {} {}", l, op, r),
            Expression::Type(l, op, spec) => write!(f, "{} {} {}", l, op, spec),
            Expression::Union(l, r) => write!(f, "{} | {}", l, r),
            Expression::And(l, r) => write!(f, "{} and {}", l, r),
            Expression::Implies(l, r) => write!(f, "{} implies {}", l, r),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Invocation(i) => write!(f, "{}", i),
            Term::Literal(l) => write!(f, "{}", l),
            Term::ExternalConstant(name) => write!(f, "%{}", name),
            Term::Parenthesized(e) => write!(f, "({})", e),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Member(name) => write!(f, "{}", name),
            Invocation::Function(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Invocation::This => write!(f, "$this"),
        }
    }
}

impl fmt::Display for TypeSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpecifier::QualifiedIdentifier(namespace, Some(name)) => {
                write!(f, "{}.{}", namespace, name)
            }
            TypeSpecifier::QualifiedIdentifier(name, None) => write!(f, "{}", name),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "{{}}"),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::String(s) => write!(f, "'{}'", s),
            Literal::Number(d) => write!(f, "{}", d),
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Date(d) => write!(f, "@{}", d),
            Literal::DateTime(dt) => write!(f, "@{}", dt),
            Literal::Time(t) => write!(f, "@T{}", t),
            Literal::Quantity(d, u) => write!(f, "{} '{}'", d, u),
        }
    }
}

/// Validates the date portion of a temporal literal. Full dates go through
/// chrono; year and year-month precisions only get their shape checked by
/// the grammar.
fn valid_date_string(date: &str) -> bool {
    match date.len() {
        10 => chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok(),
        4 | 7 => true,
        _ => false,
    }
}

/// Validates the time-of-day portion of a temporal literal at whatever
/// precision it carries. Bare hours are checked by range, since chrono
/// cannot build a time from an hour alone.
fn valid_time_string(time: &str) -> bool {
    if time.len() == 2 {
        return time.parse::<u32>().map(|hour| hour < 24).unwrap_or(false);
    }
    let formats: &[&str] = &["%H:%M", "%H:%M:%S", "%H:%M:%S%.f"];
    formats
        .iter()
        .any(|f| chrono::NaiveTime::parse_from_str(time, f).is_ok())
}

/// Wraps a parser so that whitespace and comments on either side are
/// consumed.
fn padded_ws<'src, T, P>(
    parser: P,
) -> impl Parser<'src, &'src str, T, extra::Err<Rich<'src, char>>> + Clone
where
    P: Parser<'src, &'src str, T, extra::Err<Rich<'src, char>>> + Clone,
    T: Clone,
{
    let ws_or_comment = choice((
        text::whitespace().at_least(1).ignored(),
        just("//")
            .then(any().and_is(text::newline().or(end()).not()).repeated())
            .ignored(),
        just("/*")
            .then(any().and_is(just("*/").not()).repeated())
            .then(just("*/"))
            .ignored(),
    ))
    .repeated()
    .ignored();

    ws_or_comment
        .then(parser)
        .map(|(_, result)| result)
        .then_ignore(ws_or_comment)
}

/// Builds the expression parser. The returned parser consumes the entire
/// input and produces an [`Expression`], or a detailed error naming the
/// failing position.
pub fn parser<'src>()
-> impl Parser<'src, &'src str, Expression, extra::Err<Rich<'src, char>>> + Clone + 'src {
    // Escape sequences inside string literals, including \uXXXX.
    let esc = just('\\').ignore_then(choice((
        just('`').to('`'),
        just('\'').to('\''),
        just('\\').to('\\'),
        just('/').to('/'),
        just('f').to('\u{000C}'),
        just('n').to('\n'),
        just('r').to('\r'),
        just('t').to('\t'),
        just('"').to('"'),
        just('u').ignore_then(
            any()
                .filter(|c: &char| c.is_ascii_hexdigit())
                .repeated()
                .exactly(4)
                .collect::<String>()
                .try_map(|digits: String, span| match u32::from_str_radix(&digits, 16) {
                    Ok(code) => char::from_u32(code)
                        .ok_or_else(|| Rich::custom(span, "Invalid Unicode code point")),
                    Err(_) => Err(Rich::custom(span, "Invalid hex digits")),
                }),
        ),
    )));

    // LITERALS

    let null = just('{').then(just('}')).to(Literal::Null);

    let boolean = choice((
        text::keyword("true").to(Literal::Boolean(true)),
        text::keyword("false").to(Literal::Boolean(false)),
    ))
    .boxed();

    let string = just('\'')
        .ignore_then(none_of("\\'").or(esc).repeated().collect::<String>())
        .then_ignore(just('\''))
        .map(Literal::String)
        .boxed();

    let digits1 = any()
        .filter(|c: &char| c.is_ascii_digit())
        .repeated()
        .at_least(1)
        .collect::<String>();

    let integer = digits1
        .clone()
        .try_map(|digits: String, span| match i64::from_str(&digits) {
            Ok(n) => Ok(Literal::Integer(n)),
            Err(_) => Err(Rich::custom(span, format!("Invalid integer: {}", digits))),
        });
    let integer = padded_ws(integer);

    let number = digits1
        .clone()
        .then(just('.'))
        .then(digits1.clone())
        .try_map(|((i, _), d), span| {
            let text = format!("{}.{}", i, d);
            match Decimal::from_str(&text) {
                Ok(decimal) => Ok(Literal::Number(decimal)),
                Err(_) => Err(Rich::custom(span, format!("Invalid number: {}", text))),
            }
        })
        .padded();

    // Time of day: HH(:mm(:ss(.sss)?)?)?
    let two_digits = any()
        .filter(|c: &char| c.is_ascii_digit())
        .repeated()
        .exactly(2)
        .collect::<String>();

    let time_format = two_digits
        .clone()
        .then(
            just(':')
                .ignore_then(two_digits.clone())
                .then(
                    just(':')
                        .ignore_then(two_digits.clone())
                        .then(
                            just('.')
                                .ignore_then(
                                    any()
                                        .filter(|c: &char| c.is_ascii_digit())
                                        .repeated()
                                        .at_least(1)
                                        .at_most(3)
                                        .collect::<String>(),
                                )
                                .or_not(),
                        )
                        .or_not(),
                )
                .or_not(),
        )
        .map(|(hours, rest)| {
            let mut out = hours;
            if let Some((minutes, seconds_part)) = rest {
                out.push(':');
                out.push_str(&minutes);
                if let Some((seconds, millis)) = seconds_part {
                    out.push(':');
                    out.push_str(&seconds);
                    if let Some(ms) = millis {
                        out.push('.');
                        out.push_str(&ms);
                    }
                }
            }
            out
        });

    // Timezone: 'Z' or (+|-)HH:mm.
    let timezone_format = just('Z').to("Z".to_string()).or(one_of("+-")
        .map(|c: char| c.to_string())
        .then(two_digits.clone())
        .then(just(':'))
        .then(two_digits.clone())
        .map(|(((sign, hour), _), min)| format!("{}{}:{}", sign, hour, min)));

    // Date: YYYY(-MM(-DD)?)?
    let date_format_str = any()
        .filter(|c: &char| c.is_ascii_digit())
        .repeated()
        .exactly(4)
        .collect::<String>()
        .then(
            just('-')
                .ignore_then(two_digits.clone().then(just('-').ignore_then(two_digits.clone()).or_not()))
                .or_not(),
        )
        .map(|(year, month_part)| {
            let mut out = year;
            if let Some((month, day)) = month_part {
                out.push('-');
                out.push_str(&month);
                if let Some(day) = day {
                    out.push('-');
                    out.push_str(&day);
                }
            }
            out
        })
        .boxed();

    // Quantity units: either calendar duration keywords or quoted strings.
    let unit_keyword = choice((
        text::keyword("years").to("years".to_string()),
        text::keyword("months").to("months".to_string()),
        text::keyword("weeks").to("weeks".to_string()),
        text::keyword("days").to("days".to_string()),
        text::keyword("hours").to("hours".to_string()),
        text::keyword("minutes").to("minutes".to_string()),
        text::keyword("seconds").to("seconds".to_string()),
        text::keyword("milliseconds").to("milliseconds".to_string()),
        text::keyword("year").to("year".to_string()),
        text::keyword("month").to("month".to_string()),
        text::keyword("week").to("week".to_string()),
        text::keyword("day").to("day".to_string()),
        text::keyword("hour").to("hour".to_string()),
        text::keyword("minute").to("minute".to_string()),
        text::keyword("second").to("second".to_string()),
        text::keyword("millisecond").to("millisecond".to_string()),
    ));

    let unit_string_literal = just('\'')
        .ignore_then(none_of("\\'").or(esc).repeated().collect::<String>())
        .then_ignore(just('\''));

    let unit = choice((unit_keyword, unit_string_literal)).boxed().padded();

    // Quantity value parsers must not consume trailing whitespace, so the
    // required separator before the unit survives.
    let integer_for_quantity = digits1
        .clone()
        .try_map(|digits: String, span| match i64::from_str(&digits) {
            Ok(n) => Ok(n),
            Err(_) => Err(Rich::custom(span, format!("Invalid integer: {}", digits))),
        });

    let number_for_quantity = digits1
        .clone()
        .then(just('.'))
        .then(digits1.clone())
        .try_map(|((i, _), d), span| {
            let text = format!("{}.{}", i, d);
            Decimal::from_str(&text)
                .map_err(|_| Rich::custom(span, format!("Invalid number: {}", text)))
        });

    let quantity = choice((
        integer_for_quantity
            .then_ignore(text::whitespace().at_least(1))
            .then(unit.clone())
            .map(|(i, u)| Literal::Quantity(Decimal::from(i), u)),
        number_for_quantity
            .then_ignore(text::whitespace().at_least(1))
            .then(unit.clone())
            .map(|(d, u)| Literal::Quantity(d, u)),
    ));

    // @Date T Time [TZ]
    let datetime_literal = just('@')
        .ignore_then(date_format_str.clone())
        .then_ignore(just('T'))
        .then(time_format.clone())
        .then(timezone_format.clone().or_not())
        .try_map(|((date, time), tz), span| {
            if !valid_date_string(&date) || !valid_time_string(&time) {
                return Err(Rich::custom(span, format!("Invalid datetime: {}T{}", date, time)));
            }
            let mut text = format!("{}T{}", date, time);
            if let Some(tz) = tz {
                text.push_str(&tz);
            }
            Ok(Literal::DateTime(text))
        });

    // @Date T (a datetime at date precision)
    let partial_datetime_literal = just('@')
        .ignore_then(date_format_str.clone())
        .then_ignore(just('T'))
        .try_map(|date, span| {
            if valid_date_string(&date) {
                Ok(Literal::DateTime(format!("{}T", date)))
            } else {
                Err(Rich::custom(span, format!("Invalid datetime: {}T", date)))
            }
        });

    // @T Time, never with a timezone.
    let time_literal = just('@')
        .ignore_then(just('T').ignore_then(time_format.clone()).then(timezone_format.or_not()))
        .try_map(|(time, tz), span| {
            if tz.is_some() {
                Err(Rich::custom(span, "Time literal cannot have a timezone offset"))
            } else if valid_time_string(&time) {
                Ok(Literal::Time(time))
            } else {
                Err(Rich::custom(span, format!("Invalid time: {}", time)))
            }
        });

    let date_literal = just('@').ignore_then(date_format_str.clone()).try_map(|date, span| {
        if valid_date_string(&date) {
            Ok(Literal::Date(date))
        } else {
            Err(Rich::custom(span, format!("Invalid date: {}", date)))
        }
    });

    // Quantity before plain numbers, datetime forms before plain dates.
    let literal = choice((
        null,
        boolean,
        string,
        quantity,
        number,
        integer,
        padded_ws(datetime_literal),
        padded_ws(partial_datetime_literal),
        padded_ws(time_literal),
        padded_ws(date_literal),
    ))
    .map(Term::Literal);

    // IDENTIFIERS

    let standard_identifier = any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
                .repeated()
                .collect::<Vec<_>>(),
        )
        .map(|(first, rest): (char, Vec<char>)| {
            let mut s = first.to_string();
            s.extend(rest);
            s
        })
        .padded();

    let delimited_identifier = just('`')
        .ignore_then(none_of("`").or(esc).repeated().collect::<String>())
        .then_ignore(just('`'))
        .padded();

    // Keywords may appear in identifier positions (member names, function
    // names); the grammar context disambiguates.
    let identifier = choice((
        standard_identifier,
        delimited_identifier,
        text::keyword("as").to(String::from("as")),
        text::keyword("contains").to(String::from("contains")),
        text::keyword("in").to(String::from("in")),
        text::keyword("is").to(String::from("is")),
        text::keyword("true").to(String::from("true")),
        text::keyword("false").to(String::from("false")),
    ));

    fn strip_backticks(id: &str) -> String {
        if id.starts_with('`') && id.ends_with('`') && id.len() >= 3 {
            id[1..id.len() - 1].to_string()
        } else {
            id.to_string()
        }
    }

    let qualified_identifier = {
        let namespaced = identifier
            .clone()
            .then(just('.').ignore_then(identifier.clone()))
            .map(|(namespace, type_name)| {
                TypeSpecifier::QualifiedIdentifier(
                    strip_backticks(&namespace),
                    Some(strip_backticks(&type_name)),
                )
            });
        let standalone = identifier
            .clone()
            .map(|id| TypeSpecifier::QualifiedIdentifier(strip_backticks(&id), None));
        choice((namespaced.boxed(), standalone.boxed())).boxed()
    };
    let qualified_identifier = padded_ws(qualified_identifier);

    let string_for_external = just('\'')
        .ignore_then(none_of("'\\").or(esc).repeated().collect::<String>())
        .then_ignore(just('\''))
        .padded();

    let external_constant = just('%')
        .ignore_then(choice((identifier.clone(), string_for_external)))
        .map(Term::ExternalConstant)
        .padded();

    recursive(|expr| {
        let atom = choice((
            literal.clone().map(Expression::Term).boxed(),
            external_constant.clone().map(Expression::Term).boxed(),
            // Function call at the head of a chain; tried before the plain
            // identifier so `exists(...)` is not read as a member.
            identifier
                .clone()
                .then(
                    expr.clone()
                        .separated_by(just(',').padded())
                        .allow_trailing()
                        .collect::<Vec<_>>()
                        .delimited_by(just('(').padded(), just(')').padded()),
                )
                .map(|(name, params)| {
                    Expression::Term(Term::Invocation(Invocation::Function(name, params)))
                })
                .boxed(),
            choice((
                identifier.clone().map(Invocation::Member),
                just("$this").to(Invocation::This),
            ))
            .map(Term::Invocation)
            .map(Expression::Term)
            .boxed(),
            expr.clone()
                .boxed()
                .delimited_by(just('(').padded(), just(')').padded())
                .boxed(),
        ))
        .padded();

        // Postfix: .member, .function(...), [index]
        let postfix_op = choice((
            just('.')
                .ignore_then(
                    identifier.clone().then(
                        expr.clone()
                            .boxed()
                            .separated_by(just(',').padded())
                            .allow_trailing()
                            .collect::<Vec<_>>()
                            .delimited_by(just('(').padded(), just(')').padded())
                            .or_not(),
                    ),
                )
                .map(|(name, params)| {
                    let invocation = match params {
                        Some(params) => Invocation::Function(name, params),
                        None => Invocation::Member(name),
                    };
                    Box::new(move |left: Expression| {
                        Expression::Invocation(Box::new(left), invocation.clone())
                    }) as Box<dyn Fn(Expression) -> Expression>
                }),
            expr.clone()
                .delimited_by(just('[').padded(), just(']').padded())
                .map(|idx| {
                    Box::new(move |left: Expression| {
                        Expression::Indexer(Box::new(left), Box::new(idx.clone()))
                    }) as Box<dyn Fn(Expression) -> Expression>
                }),
        ))
        .boxed();

        let atom_with_postfix = atom
            .clone()
            .then(postfix_op.repeated().collect::<Vec<_>>())
            .map(|(left, ops)| ops.into_iter().fold(left, |acc, op| op(acc)));

        let prefix_op = choice((just('+').to('+'), just('-').to('-'))).padded();

        let term_with_polarity = prefix_op
            .repeated()
            .collect::<Vec<_>>()
            .then(atom_with_postfix)
            .map(|(ops, right)| {
                ops.into_iter()
                    .rev()
                    .fold(right, |acc, op| Expression::Polarity(op, Box::new(acc)))
            });

        let op_mul = choice((
            just('*').to("*"),
            just('/').to("/"),
            text::keyword("div").to("div"),
            text::keyword("mod").to("mod"),
        ))
        .padded();
        let multiplicative = term_with_polarity
            .clone()
            .then(op_mul.then(term_with_polarity).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter().fold(left, |acc, (op, right)| {
                    Expression::Multiplicative(Box::new(acc), op.to_string(), Box::new(right))
                })
            });

        let op_add = choice((just('+').to("+"), just('-').to("-"), just('&').to("&"))).padded();
        let additive = multiplicative
            .clone()
            .then(op_add.then(multiplicative).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter().fold(left, |acc, (op, right)| {
                    Expression::Additive(Box::new(acc), op.to_string(), Box::new(right))
                })
            });

        let op_union = just('|').padded();
        let union = additive
            .clone()
            .then(op_union.then(additive).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter()
                    .fold(left, |acc, (_, right)| Expression::Union(Box::new(acc), Box::new(right)))
            });

        let op_ineq = choice((
            just("<=").to("<="),
            just("<").to("<"),
            just(">=").to(">="),
            just(">").to(">"),
        ))
        .padded();
        let inequality = union
            .clone()
            .then(op_ineq.then(union).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter().fold(left, |acc, (op, right)| {
                    Expression::Inequality(Box::new(acc), op.to_string(), Box::new(right))
                })
            });

        let op_type = choice((text::keyword("is").to("is"), text::keyword("as").to("as"))).padded();
        let type_expr = inequality
            .clone()
            .then(op_type.then(qualified_identifier.clone()).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter().fold(left, |acc, (op, spec)| {
                    Expression::Type(Box::new(acc), op.to_string(), spec)
                })
            });

        let op_eq = choice((
            just("!=").to("!="),
            just("!~").to("!~"),
            just("=").to("="),
            just("~").to("~"),
        ))
        .padded();
        let equality = type_expr
            .clone()
            .boxed()
            .then(op_eq.then(type_expr.clone().boxed()).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter().fold(left, |acc, (op, right)| {
                    Expression::Equality(Box::new(acc), op.to_string(), Box::new(right))
                })
            });

        let op_mem = choice((
            text::keyword("in").to("in"),
            text::keyword("contains").to("contains"),
        ))
        .padded();
        let membership = equality
            .clone()
            .boxed()
            .then(op_mem.then(equality.clone().boxed()).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter().fold(left, |acc, (op, right)| {
                    Expression::Membership(Box::new(acc), op.to_string(), Box::new(right))
                })
            });

        let op_and = text::keyword("and").padded();
        let logical_and = membership
            .clone()
            .boxed()
            .then(op_and.then(membership.clone().boxed()).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter()
                    .fold(left, |acc, (_, right)| Expression::And(Box::new(acc), Box::new(right)))
            });

        let op_or = choice((text::keyword("or").to("or"), text::keyword("xor").to("xor"))).padded();
        let logical_or = logical_and
            .clone()
            .boxed()
            .then(op_or.then(logical_and.clone().boxed()).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter().fold(left, |acc, (op, right)| {
                    Expression::Or(Box::new(acc), op.to_string(), Box::new(right))
                })
            });

        let op_implies = text::keyword("implies").padded();
        logical_or
            .clone()
            .boxed()
            .then(op_implies.then(logical_or.clone().boxed()).repeated().collect::<Vec<_>>())
            .map(|(left, ops)| {
                ops.into_iter().fold(left, |acc, (_, right)| {
                    Expression::Implies(Box::new(acc), Box::new(right))
                })
            })
    })
    .then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Expression {
        parser()
            .parse(text)
            .into_result()
            .unwrap_or_else(|e| panic!("failed to parse '{}': {:?}", text, e))
    }

    #[test]
    fn parses_member_chains() {
        let expr = parse("Patient.name.family");
        // Left-nested invocation spine.
        match expr {
            Expression::Invocation(_, Invocation::Member(name)) => assert_eq!(name, "family"),
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn parses_function_calls_with_arguments() {
        let expr = parse("name.where(use = 'official')");
        match expr {
            Expression::Invocation(_, Invocation::Function(name, args)) => {
                assert_eq!(name, "where");
                assert_eq!(args.len(), 1);
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn parses_temporal_literals() {
        for text in ["@2015", "@2015-01", "@2015-01-01", "@T14:30:00", "@2015-01-01T10:30:00Z"] {
            parse(text);
        }
        assert!(parser().parse("@2015-13-40").into_result().is_err());
    }

    #[test]
    fn parses_quantity_and_membership() {
        parse("5 'mg'");
        parse("3 days");
        parse("code in severity.coding.code");
        parse("gender = 'female' and active = true");
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parser().parse("Patient.name.").into_result().is_err());
    }
}
