//! Typed predicate expressions.
//!
//! Predicates of a GR(1) specification are trees over variable references, boolean
//! connectives, integer comparisons and a [`Expr::Next`] wrapper marking post-state
//! references. They are built with the combinators below or parsed from text with
//! [`Expr::parse`], and compiled into BDDs by [`StateSpace`][crate::space::StateSpace].
//!
//! ```
//! use gr1_rs::expr::Expr;
//!
//! let e = Expr::var("loc").equals(Expr::int(3)).implies(Expr::next(!Expr::var("home")));
//! assert_eq!(e, Expr::parse("(loc = 3) -> X (!home)").unwrap());
//! assert_eq!(e.to_string(), "(loc = 3) -> (X (!home))");
//! ```

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::ops::{BitAnd, BitOr, Not};

use crate::error::Result;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn holds(self, a: i64, b: i64) -> bool {
        match self {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Expr {
    Bool(bool),
    Int(i64),
    Var(String),
    /// Value of the inner expression in the next step.
    Next(Box<Expr>),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Implies(Box<Expr>, Box<Expr>),
    Iff(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn int(value: i64) -> Self {
        Expr::Int(value)
    }

    pub fn next(inner: Expr) -> Self {
        Expr::Next(Box::new(inner))
    }

    /// Conjunction of all given expressions (`true` when empty).
    pub fn all(items: impl IntoIterator<Item = Expr>) -> Self {
        let items = items.into_iter().collect::<Vec<_>>();
        match items.len() {
            0 => Expr::Bool(true),
            1 => items.into_iter().next().unwrap_or(Expr::Bool(true)),
            _ => Expr::And(items),
        }
    }

    /// Disjunction of all given expressions (`false` when empty).
    pub fn any(items: impl IntoIterator<Item = Expr>) -> Self {
        let items = items.into_iter().collect::<Vec<_>>();
        match items.len() {
            0 => Expr::Bool(false),
            1 => items.into_iter().next().unwrap_or(Expr::Bool(false)),
            _ => Expr::Or(items),
        }
    }

    pub fn implies(self, rhs: Expr) -> Self {
        Expr::Implies(Box::new(self), Box::new(rhs))
    }

    pub fn iff(self, rhs: Expr) -> Self {
        Expr::Iff(Box::new(self), Box::new(rhs))
    }

    pub fn compare(self, op: CmpOp, rhs: Expr) -> Self {
        Expr::Cmp(op, Box::new(self), Box::new(rhs))
    }

    pub fn equals(self, rhs: Expr) -> Self {
        self.compare(CmpOp::Eq, rhs)
    }

    pub fn not_equals(self, rhs: Expr) -> Self {
        self.compare(CmpOp::Ne, rhs)
    }

    pub fn plus(self, rhs: Expr) -> Self {
        Expr::Add(Box::new(self), Box::new(rhs))
    }

    pub fn minus(self, rhs: Expr) -> Self {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }

    /// Parse an expression in the textual predicate syntax.
    pub fn parse(input: &str) -> Result<Self> {
        crate::parser::parse(input)
    }

    /// All variables referenced, each paired with whether it appears under `Next`.
    pub fn references(&self) -> BTreeSet<(String, bool)> {
        let mut out = BTreeSet::new();
        self.collect_references(false, &mut out);
        out
    }

    fn collect_references(&self, next: bool, out: &mut BTreeSet<(String, bool)>) {
        match self {
            Expr::Bool(_) | Expr::Int(_) => {}
            Expr::Var(name) => {
                out.insert((name.clone(), next));
            }
            Expr::Next(inner) => inner.collect_references(true, out),
            Expr::Not(inner) => inner.collect_references(next, out),
            Expr::And(items) | Expr::Or(items) => {
                for item in items {
                    item.collect_references(next, out);
                }
            }
            Expr::Implies(a, b) | Expr::Iff(a, b) | Expr::Cmp(_, a, b) | Expr::Add(a, b) | Expr::Sub(a, b) => {
                a.collect_references(next, out);
                b.collect_references(next, out);
            }
        }
    }

    /// Whether the expression mentions next-step values anywhere.
    pub fn has_next(&self) -> bool {
        self.references().iter().any(|(_, next)| *next)
    }

    fn is_atomic(&self) -> bool {
        matches!(self, Expr::Bool(_) | Expr::Int(_) | Expr::Var(_) | Expr::Not(_))
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::Bool(value)
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Self::Output {
        match self {
            Expr::Bool(b) => Expr::Bool(!b),
            Expr::Not(inner) => *inner,
            other => Expr::Not(Box::new(other)),
        }
    }
}

impl BitAnd for Expr {
    type Output = Expr;

    fn bitand(self, rhs: Self) -> Self::Output {
        match self {
            Expr::And(mut items) => {
                items.push(rhs);
                Expr::And(items)
            }
            lhs => Expr::And(vec![lhs, rhs]),
        }
    }
}

impl BitOr for Expr {
    type Output = Expr;

    fn bitor(self, rhs: Self) -> Self::Output {
        match self {
            Expr::Or(mut items) => {
                items.push(rhs);
                Expr::Or(items)
            }
            lhs => Expr::Or(vec![lhs, rhs]),
        }
    }
}

struct Child<'a>(&'a Expr);

impl Display for Child<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0.is_atomic() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "({})", self.0)
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Expr::Int(v) => write!(f, "{}", v),
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Next(inner) => write!(f, "X ({})", inner),
            Expr::Not(inner) => write!(f, "!{}", Child(inner)),
            Expr::And(items) | Expr::Or(items) => {
                let sep = if matches!(self, Expr::And(_)) { " && " } else { " || " };
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", sep)?;
                    }
                    write!(f, "{}", Child(item))?;
                }
                Ok(())
            }
            Expr::Implies(a, b) => write!(f, "{} -> {}", Child(a), Child(b)),
            Expr::Iff(a, b) => write!(f, "{} <-> {}", Child(a), Child(b)),
            Expr::Cmp(op, a, b) => write!(f, "{} {} {}", Child(a), op.symbol(), Child(b)),
            Expr::Add(a, b) => write!(f, "{} + {}", Child(a), Child(b)),
            Expr::Sub(a, b) => write!(f, "{} - {}", Child(a), Child(b)),
        }
    }
}
