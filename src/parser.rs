//! Predicate syntax: a `pest` grammar (`predicate.pest`) for the tokens and a Pratt
//! parser for operator precedence.
//!
//! Operators, loosest first:
//!
//! | operator | meaning | associativity |
//! |---|---|---|
//! | `<->` | equivalence | left |
//! | `->` | implication | right |
//! | `\|\|`, `\|` | disjunction | n-ary |
//! | `&&`, `&` | conjunction | n-ary |
//! | `!` | negation | prefix |
//! | `=`, `==`, `!=`, `<`, `<=`, `>`, `>=` | comparison | left |
//! | `+`, `-` | arithmetic | left |
//! | `X` | next step | prefix |
//! | `'` | next step | postfix |
//!
//! `X` is the next-step operator when it is followed by an operand, and a plain
//! variable name otherwise.

use pest::error::InputLocation;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;

use crate::error::{Error, Result};
use crate::expr::{CmpOp, Expr};

#[derive(Parser)]
#[grammar = "predicate.pest"]
struct PredicateParser;

lazy_static::lazy_static! {
    static ref PRATT_PARSER: PrattParser<Rule> = {
        // Precedence is defined lowest to highest
        PrattParser::new()
            .op(Op::infix(Rule::iff, Assoc::Left))
            .op(Op::infix(Rule::implies, Assoc::Right))
            .op(Op::infix(Rule::or, Assoc::Left))
            .op(Op::infix(Rule::and, Assoc::Left))
            .op(Op::prefix(Rule::not))
            .op(Op::infix(Rule::eq, Assoc::Left)
                | Op::infix(Rule::ne, Assoc::Left)
                | Op::infix(Rule::lt, Assoc::Left)
                | Op::infix(Rule::le, Assoc::Left)
                | Op::infix(Rule::gt, Assoc::Left)
                | Op::infix(Rule::ge, Assoc::Left))
            .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
            .op(Op::prefix(Rule::next))
            .op(Op::postfix(Rule::prime))
    };
}

/// A parsed subterm. `chain` is set for an unparenthesized `&&`/`||` chain, which
/// keeps growing into a single n-ary node.
struct Term {
    expr: Expr,
    chain: Option<Rule>,
}

impl From<Expr> for Term {
    fn from(expr: Expr) -> Self {
        Term { expr, chain: None }
    }
}

fn comparison(rule: Rule) -> Option<CmpOp> {
    match rule {
        Rule::eq => Some(CmpOp::Eq),
        Rule::ne => Some(CmpOp::Ne),
        Rule::lt => Some(CmpOp::Lt),
        Rule::le => Some(CmpOp::Le),
        Rule::gt => Some(CmpOp::Gt),
        Rule::ge => Some(CmpOp::Ge),
        _ => None,
    }
}

fn connect(rule: Rule, lhs: Term, rhs: Expr) -> Term {
    let chained = lhs.chain == Some(rule);
    let items = match lhs.expr {
        Expr::And(mut items) | Expr::Or(mut items) if chained => {
            items.push(rhs);
            items
        }
        expr => vec![expr, rhs],
    };
    let expr = if rule == Rule::and { Expr::And(items) } else { Expr::Or(items) };
    Term {
        expr,
        chain: Some(rule),
    }
}

fn unexpected(input: &str, pair: &Pair<'_, Rule>) -> Error {
    Error::malformed(input, format!("unexpected {:?} `{}`", pair.as_rule(), pair.as_str()))
}

fn syntax_error(input: &str, e: pest::error::Error<Rule>) -> Error {
    let offset = match e.location {
        InputLocation::Pos(p) => p,
        InputLocation::Span((start, _)) => start,
    };
    Error::malformed(input, format!("{} at offset {}", e.variant.message(), offset))
}

fn parse_primary(input: &str, pair: Pair<'_, Rule>) -> Result<Term> {
    match pair.as_rule() {
        // Parentheses end a chain.
        Rule::expr => Ok(parse_expr(input, pair.into_inner())?.expr.into()),
        Rule::boolean => Ok(Expr::Bool(pair.as_str().eq_ignore_ascii_case("true")).into()),
        Rule::int => pair
            .as_str()
            .parse::<i64>()
            .map(|value| Expr::Int(value).into())
            .map_err(|e| Error::malformed(input, format!("bad integer literal `{}`: {}", pair.as_str(), e))),
        Rule::ident => Ok(Expr::var(pair.as_str()).into()),
        _ => Err(unexpected(input, &pair)),
    }
}

fn parse_expr(input: &str, pairs: Pairs<'_, Rule>) -> Result<Term> {
    PRATT_PARSER
        .map_primary(|primary| parse_primary(input, primary))
        .map_infix(|lhs, op, rhs| {
            let (lhs, rhs) = (lhs?, rhs?.expr);
            let expr = match op.as_rule() {
                rule @ (Rule::and | Rule::or) => return Ok(connect(rule, lhs, rhs)),
                Rule::iff => lhs.expr.iff(rhs),
                Rule::implies => lhs.expr.implies(rhs),
                Rule::add => lhs.expr.plus(rhs),
                Rule::sub => lhs.expr.minus(rhs),
                rule => match comparison(rule) {
                    Some(cmp) => lhs.expr.compare(cmp, rhs),
                    None => return Err(unexpected(input, &op)),
                },
            };
            Ok(expr.into())
        })
        .map_prefix(|op, rhs| {
            let rhs = rhs?.expr;
            match op.as_rule() {
                Rule::not => Ok(Expr::Not(Box::new(rhs)).into()),
                Rule::next => Ok(Expr::next(rhs).into()),
                _ => Err(unexpected(input, &op)),
            }
        })
        .map_postfix(|lhs, op| match op.as_rule() {
            Rule::prime => Ok(Expr::next(lhs?.expr).into()),
            _ => Err(unexpected(input, &op)),
        })
        .parse(pairs)
}

/// Parse a predicate.
pub fn parse(input: &str) -> Result<Expr> {
    if input.trim().is_empty() {
        return Err(Error::malformed(input, "empty predicate"));
    }
    let mut pairs = PredicateParser::parse(Rule::predicate, input).map_err(|e| syntax_error(input, e))?;
    let expr = pairs
        .next()
        .and_then(|predicate| predicate.into_inner().next())
        .ok_or_else(|| Error::malformed(input, "empty predicate"))?;
    Ok(parse_expr(input, expr.into_inner())?.expr)
}
