//! Symbolic state space.
//!
//! A [`StateSpace`] owns the BDD manager and maps every declared variable onto a block
//! of boolean BDD variables. Integer variables are encoded in binary, most significant
//! bit first, as `value - lo`. Every current-state bit `2k+1` is immediately followed by
//! its next-state copy `2k+2`, so priming and unpriming are monotone renamings.
//!
//! Environment variables are laid out before system variables, and inside a partition
//! variables keep their declaration order. "Lexicographically least" throughout the
//! crate refers to this order, with `false < true` at every bit.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};

use log::trace;
use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::error::{Error, Result};
use crate::expr::{CmpOp, Expr};
use crate::reference::Ref;
use crate::utils::code_width;

/// Largest number of values of an integer domain.
///
/// Compiling a predicate enumerates the values of every integer variable it mentions,
/// and value pairs for `+`, `-` and comparisons of two variables. The work therefore grows
/// with the domain size, and quadratically for `x = y`.
pub const MAX_INT_DOMAIN: u64 = 1 << 16;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Domain {
    Bool,
    /// Integers in the inclusive range `lo..=hi`.
    Int { lo: i64, hi: i64 },
}

impl Domain {
    /// Integers in `lo..=hi`.
    ///
    /// # Panics
    ///
    /// Panics if the range is empty or holds more than [`MAX_INT_DOMAIN`] values.
    /// [`Domain::try_int`] reports the same conditions as an error.
    pub fn int(lo: i64, hi: i64) -> Self {
        match Domain::try_int(lo, hi) {
            Ok(domain) => domain,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_int(lo: i64, hi: i64) -> Result<Self> {
        let domain = Domain::Int { lo, hi };
        domain.check()?;
        Ok(domain)
    }

    /// Reject empty and oversized integer ranges.
    pub fn check(&self) -> Result<()> {
        match *self {
            Domain::Int { lo, hi } if lo > hi => {
                Err(Error::InvalidDomain(format!("empty integer range {}..={}", lo, hi)))
            }
            Domain::Int { lo, hi } if hi.abs_diff(lo) >= MAX_INT_DOMAIN => Err(Error::InvalidDomain(format!(
                "integer range {}..={} has more than {} values",
                lo, hi, MAX_INT_DOMAIN
            ))),
            _ => Ok(()),
        }
    }

    /// Largest code of the binary encoding.
    fn max_code(&self) -> u64 {
        match *self {
            Domain::Bool => 1,
            Domain::Int { lo, hi } => hi.abs_diff(lo),
        }
    }

    /// Number of values in the domain.
    pub fn size(&self) -> u128 {
        u128::from(self.max_code()) + 1
    }

    pub fn num_bits(&self) -> u32 {
        code_width(self.max_code())
    }

    pub fn contains(&self, value: Value) -> bool {
        match (*self, value) {
            (Domain::Bool, Value::Bool(_)) => true,
            (Domain::Int { lo, hi }, Value::Int(v)) => lo <= v && v <= hi,
            _ => false,
        }
    }

    /// All values, in encoding order.
    pub fn values(&self) -> Vec<Value> {
        match *self {
            Domain::Bool => vec![Value::Bool(false), Value::Bool(true)],
            Domain::Int { lo, hi } => (lo..=hi).map(Value::Int).collect(),
        }
    }

    fn encode(&self, value: Value) -> Option<u64> {
        match (*self, value) {
            (Domain::Bool, Value::Bool(b)) => Some(b as u64),
            (Domain::Int { lo, hi }, Value::Int(v)) if lo <= v && v <= hi => Some(v.abs_diff(lo)),
            _ => None,
        }
    }

    fn decode(&self, code: u64) -> Value {
        match *self {
            Domain::Bool => Value::Bool(code != 0),
            Domain::Int { lo, .. } => Value::Int(lo.wrapping_add(code as i64)),
        }
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Domain::Bool => write!(f, "boolean"),
            Domain::Int { lo, hi } => write!(f, "[{}, {}]", lo, hi),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Partition {
    /// Controlled by the environment (inputs).
    Env,
    /// Controlled by the system (outputs).
    Sys,
}

impl Display for Partition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Partition::Env => write!(f, "env"),
            Partition::Sys => write!(f, "sys"),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Value {
    Bool(bool),
    Int(i64),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(b) => Some(b),
            Value::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int(v) => Some(v),
            Value::Bool(_) => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(v) => write!(f, "{}", v),
        }
    }
}

/// Assignment of values to variables, keyed by name.
pub type Valuation = BTreeMap<String, Value>;

/// Render a valuation as `a=1, b=true`.
pub fn format_valuation(valuation: &Valuation) -> String {
    valuation
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub domain: Domain,
    pub partition: Partition,
    bits: Vec<u32>,
}

impl Variable {
    /// Current-state BDD variables, most significant first.
    pub fn bits(&self) -> &[u32] {
        &self.bits
    }

    fn bits_at(&self, next: bool) -> impl Iterator<Item = u32> + '_ {
        self.bits.iter().map(move |&b| if next { b + 1 } else { b })
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Ty {
    Bool,
    Int,
}

#[derive(Debug)]
pub struct StateSpace {
    bdd: Bdd,
    variables: Vec<Variable>,
    index: HashMap<String, usize>,
    num_bits: u32,
}

impl StateSpace {
    /// Lay out the environment and system variables.
    ///
    /// Fails with [`Error::VariableCollision`] when a name is declared in both partitions.
    pub fn new(env: &BTreeMap<String, Domain>, sys: &BTreeMap<String, Domain>) -> Result<Self> {
        if let Some(name) = env.keys().find(|name| sys.contains_key(*name)) {
            return Err(Error::collision(
                name.as_str(),
                format!("declared as env {} and sys {}", env[name], sys[name]),
            ));
        }

        let mut variables = Vec::with_capacity(env.len() + sys.len());
        let mut index = HashMap::new();
        let mut num_bits = 0;
        let declared = env
            .iter()
            .map(|(n, d)| (n, d, Partition::Env))
            .chain(sys.iter().map(|(n, d)| (n, d, Partition::Sys)));
        for (name, &domain, partition) in declared {
            domain.check().map_err(|e| match e {
                Error::InvalidDomain(reason) => Error::InvalidDomain(format!("variable `{}`: {}", name, reason)),
                other => other,
            })?;
            let bits = (0..domain.num_bits())
                .map(|k| 2 * (num_bits + k) + 1)
                .collect::<Vec<_>>();
            num_bits += domain.num_bits();
            index.insert(name.clone(), variables.len());
            variables.push(Variable {
                name: name.clone(),
                domain,
                partition,
                bits,
            });
        }
        trace!("Laid out {} variables over {} state bits", variables.len(), num_bits);

        Ok(Self {
            bdd: Bdd::default(),
            variables,
            index,
            num_bits,
        })
    }

    pub fn bdd(&self) -> &Bdd {
        &self.bdd
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.index.get(name).map(|&i| &self.variables[i])
    }

    /// Number of current-state bits (the same number of next-state bits follows).
    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    fn in_partition(var: &Variable, partition: Option<Partition>) -> bool {
        partition.map_or(true, |p| var.partition == p)
    }

    /// Sorted BDD variables of a partition (or of all variables when `None`).
    pub fn bits(&self, partition: Option<Partition>, next: bool) -> Vec<u32> {
        self.variables
            .iter()
            .filter(|var| Self::in_partition(var, partition))
            .flat_map(|var| var.bits_at(next))
            .collect()
    }

    /// Quantification cube over the bits of a partition.
    pub fn var_set(&self, partition: Option<Partition>, next: bool) -> Ref {
        self.bdd.mk_var_set(self.bits(partition, next))
    }

    fn code_cube(&self, var: &Variable, code: u64, next: bool) -> Ref {
        let n = var.bits.len();
        let literals = var.bits_at(next).enumerate().map(|(i, b)| {
            if (code >> (n - 1 - i)) & 1 == 1 {
                b as i32
            } else {
                -(b as i32)
            }
        });
        self.bdd.mk_cube(literals)
    }

    /// Set of states where `var` holds `value`; empty if the value is outside the domain.
    pub fn value_eq(&self, var: &Variable, value: Value, next: bool) -> Ref {
        match var.domain.encode(value) {
            Some(code) => self.code_cube(var, code, next),
            None => self.bdd.zero(),
        }
    }

    /// Constraint excluding the unused codes of integer variables.
    pub fn valid(&self, partition: Option<Partition>, next: bool) -> Ref {
        let mut res = self.bdd.one();
        for var in self.variables.iter().filter(|var| Self::in_partition(var, partition)) {
            if var.domain.size() == 1u128 << var.bits.len() {
                continue;
            }
            let codes = (0..=var.domain.max_code()).map(|code| self.code_cube(var, code, next));
            let constraint = self.bdd.apply_or_many(codes);
            res = self.bdd.apply_and(res, constraint);
        }
        res
    }

    /// Shift a current-state predicate onto the next-state bits.
    pub fn prime(&self, f: Ref) -> Ref {
        self.bdd.rename(f, |v| {
            debug_assert!(v % 2 == 1, "Priming a next-state bit");
            v + 1
        })
    }

    /// Shift a next-state predicate back onto the current-state bits.
    pub fn unprime(&self, f: Ref) -> Ref {
        self.bdd.rename(f, |v| {
            debug_assert!(v % 2 == 0, "Unpriming a current-state bit");
            v - 1
        })
    }

    /// Conjunction of `var = value` for every entry of `valuation`.
    ///
    /// Entries naming unknown variables, or values outside a domain, yield the empty set.
    pub fn state_cube(&self, valuation: &Valuation, next: bool) -> Ref {
        let mut res = self.bdd.one();
        for (name, &value) in valuation {
            let eq = match self.variable(name) {
                Some(var) => self.value_eq(var, value, next),
                None => return self.bdd.zero(),
            };
            res = self.bdd.apply_and(res, eq);
        }
        res
    }

    fn assignment(&self, valuation: &Valuation, next: bool) -> HashMap<u32, bool> {
        let mut bits = HashMap::new();
        for (name, &value) in valuation {
            let Some(var) = self.variable(name) else { continue };
            let Some(code) = var.domain.encode(value) else { continue };
            let n = var.bits.len();
            for (i, b) in var.bits_at(next).enumerate() {
                bits.insert(b, (code >> (n - 1 - i)) & 1 == 1);
            }
        }
        bits
    }

    /// Whether `f` holds in the given current state (and, optionally, next state).
    pub fn holds(&self, f: Ref, current: &Valuation, next: Option<&Valuation>) -> bool {
        let mut bits = self.assignment(current, false);
        if let Some(next) = next {
            bits.extend(self.assignment(next, true));
        }
        self.bdd.eval(f, |v| bits.get(&v).copied().unwrap_or(false))
    }

    fn decode(&self, partition: Option<Partition>, cube: &[bool]) -> Valuation {
        let mut valuation = Valuation::new();
        let mut rest = cube;
        for var in self.variables.iter().filter(|var| Self::in_partition(var, partition)) {
            let (head, tail) = rest.split_at(var.bits.len());
            let code = head.iter().fold(0u64, |acc, &bit| (acc << 1) | bit as u64);
            valuation.insert(var.name.clone(), var.domain.decode(code));
            rest = tail;
        }
        debug_assert!(rest.is_empty());
        valuation
    }

    /// Lexicographically least valuation of `partition` satisfying `f`.
    ///
    /// `f` must only depend on the chosen bits of that partition.
    pub fn pick(&self, f: Ref, partition: Option<Partition>, next: bool) -> Option<Valuation> {
        let bits = self.bits(partition, next);
        self.bdd
            .pick_cube(f, &bits)
            .map(|cube| self.decode(partition, &cube))
    }

    /// All valuations of `partition` satisfying `f`, in lexicographic order.
    pub fn enumerate(&self, f: Ref, partition: Option<Partition>, next: bool) -> Vec<Valuation> {
        let bits = self.bits(partition, next);
        self.bdd
            .all_cubes(f, &bits)
            .iter()
            .map(|cube| self.decode(partition, cube))
            .collect()
    }

    /// Number of full states in the current-state predicate `f`.
    pub fn count_states(&self, f: Ref) -> BigUint {
        let total = 2 * self.num_bits as usize;
        self.bdd.sat_count(f, total) >> self.num_bits as usize
    }

    fn lookup(&self, name: &str, root: &Expr) -> Result<&Variable> {
        self.variable(name)
            .ok_or_else(|| Error::malformed(root, format!("unknown variable `{}`", name)))
    }

    fn type_of(&self, e: &Expr, root: &Expr) -> Result<Ty> {
        Ok(match e {
            Expr::Bool(_)
            | Expr::Not(_)
            | Expr::And(_)
            | Expr::Or(_)
            | Expr::Implies(_, _)
            | Expr::Iff(_, _)
            | Expr::Cmp(_, _, _) => Ty::Bool,
            Expr::Int(_) | Expr::Add(_, _) | Expr::Sub(_, _) => Ty::Int,
            Expr::Var(name) => match self.lookup(name, root)?.domain {
                Domain::Bool => Ty::Bool,
                Domain::Int { .. } => Ty::Int,
            },
            Expr::Next(inner) => self.type_of(inner, root)?,
        })
    }

    /// Compile a boolean predicate into a BDD over current and next-state bits.
    pub fn compile(&self, expr: &Expr) -> Result<Ref> {
        self.compile_bool(expr, false, expr)
    }

    fn compile_bool(&self, e: &Expr, next: bool, root: &Expr) -> Result<Ref> {
        let bdd = &self.bdd;
        match e {
            Expr::Bool(b) => Ok(if *b { bdd.one() } else { bdd.zero() }),
            Expr::Int(v) => Err(Error::malformed(root, format!("integer `{}` used as a boolean", v))),
            Expr::Var(name) => {
                let var = self.lookup(name, root)?;
                match var.domain {
                    Domain::Bool => Ok(self.value_eq(var, Value::Bool(true), next)),
                    Domain::Int { .. } => Err(Error::malformed(
                        root,
                        format!("integer variable `{}` used as a boolean", name),
                    )),
                }
            }
            Expr::Next(inner) => {
                if next {
                    return Err(Error::malformed(root, "nested next-state reference"));
                }
                self.compile_bool(inner, true, root)
            }
            Expr::Not(inner) => Ok(bdd.apply_not(self.compile_bool(inner, next, root)?)),
            Expr::And(items) => {
                let mut res = bdd.one();
                for item in items {
                    res = bdd.apply_and(res, self.compile_bool(item, next, root)?);
                }
                Ok(res)
            }
            Expr::Or(items) => {
                let mut res = bdd.zero();
                for item in items {
                    res = bdd.apply_or(res, self.compile_bool(item, next, root)?);
                }
                Ok(res)
            }
            Expr::Implies(a, b) => {
                let a = self.compile_bool(a, next, root)?;
                let b = self.compile_bool(b, next, root)?;
                Ok(bdd.apply_imply(a, b))
            }
            Expr::Iff(a, b) => {
                let a = self.compile_bool(a, next, root)?;
                let b = self.compile_bool(b, next, root)?;
                Ok(bdd.apply_eq(a, b))
            }
            Expr::Cmp(op, a, b) => self.compile_cmp(*op, a, b, next, root),
            Expr::Add(_, _) | Expr::Sub(_, _) => {
                Err(Error::malformed(root, format!("arithmetic term `{}` used as a boolean", e)))
            }
        }
    }

    fn compile_cmp(&self, op: CmpOp, a: &Expr, b: &Expr, next: bool, root: &Expr) -> Result<Ref> {
        let bdd = &self.bdd;
        match (self.type_of(a, root)?, self.type_of(b, root)?) {
            (Ty::Bool, Ty::Bool) => {
                let fa = self.compile_bool(a, next, root)?;
                let fb = self.compile_bool(b, next, root)?;
                match op {
                    CmpOp::Eq => Ok(bdd.apply_eq(fa, fb)),
                    CmpOp::Ne => Ok(bdd.apply_xor(fa, fb)),
                    _ => Err(Error::malformed(root, "ordering comparison between booleans")),
                }
            }
            (Ty::Int, Ty::Int) => {
                self.check_literal(a, b, root)?;
                self.check_literal(b, a, root)?;
                let ta = self.compile_int(a, next, root)?;
                let tb = self.compile_int(b, next, root)?;
                let mut res = bdd.zero();
                for &(va, ga) in &ta {
                    for &(vb, gb) in &tb {
                        if op.holds(va, vb) {
                            res = bdd.apply_or(res, bdd.apply_and(ga, gb));
                        }
                    }
                }
                Ok(res)
            }
            _ => Err(Error::malformed(root, "type mismatch: boolean compared with integer")),
        }
    }

    /// A literal compared directly with an integer variable must lie in its domain.
    fn check_literal(&self, literal: &Expr, other: &Expr, root: &Expr) -> Result<()> {
        let Expr::Int(value) = literal else { return Ok(()) };
        let mut other = other;
        while let Expr::Next(inner) = other {
            other = inner;
        }
        if let Expr::Var(name) = other {
            let var = self.lookup(name, root)?;
            if !var.domain.contains(Value::Int(*value)) {
                return Err(Error::malformed(
                    root,
                    format!("value {} is outside the domain {} of `{}`", value, var.domain, name),
                ));
            }
        }
        Ok(())
    }

    /// Compile an integer term into `(value, guard)` pairs with disjoint guards.
    ///
    /// A variable yields one pair per domain value (at most [`MAX_INT_DOMAIN`]), and
    /// `+`/`-` combine every pair of operand values.
    fn compile_int(&self, e: &Expr, next: bool, root: &Expr) -> Result<Vec<(i64, Ref)>> {
        let bdd = &self.bdd;
        match e {
            Expr::Int(v) => Ok(vec![(*v, bdd.one())]),
            Expr::Var(name) => {
                let var = self.lookup(name, root)?;
                match var.domain {
                    Domain::Int { lo, hi } => Ok((lo..=hi)
                        .map(|v| (v, self.value_eq(var, Value::Int(v), next)))
                        .collect()),
                    Domain::Bool => Err(Error::malformed(
                        root,
                        format!("boolean variable `{}` used as an integer", name),
                    )),
                }
            }
            Expr::Next(inner) => {
                if next {
                    return Err(Error::malformed(root, "nested next-state reference"));
                }
                self.compile_int(inner, true, root)
            }
            Expr::Add(a, b) | Expr::Sub(a, b) => {
                let ta = self.compile_int(a, next, root)?;
                let tb = self.compile_int(b, next, root)?;
                let mut values = BTreeMap::new();
                for &(va, ga) in &ta {
                    for &(vb, gb) in &tb {
                        let v = if matches!(e, Expr::Add(_, _)) {
                            va.checked_add(vb)
                        } else {
                            va.checked_sub(vb)
                        }
                        .ok_or_else(|| Error::malformed(root, "integer overflow"))?;
                        let guard = bdd.apply_and(ga, gb);
                        if !bdd.is_zero(guard) {
                            let entry = values.entry(v).or_insert(bdd.zero());
                            *entry = bdd.apply_or(*entry, guard);
                        }
                    }
                }
                Ok(values.into_iter().collect())
            }
            _ => Err(Error::malformed(root, format!("boolean term `{}` used as an integer", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn space() -> StateSpace {
        let env = BTreeMap::from([("p".to_string(), Domain::Bool)]);
        let sys = BTreeMap::from([
            ("loc".to_string(), Domain::int(0, 2)),
            ("q".to_string(), Domain::Bool),
        ]);
        StateSpace::new(&env, &sys).unwrap()
    }

    fn state(items: &[(&str, Value)]) -> Valuation {
        items.iter().map(|&(n, v)| (n.to_string(), v)).collect()
    }

    #[test]
    fn test_layout() {
        let s = space();
        assert_eq!(s.num_bits(), 4);
        assert_eq!(s.variable("p").unwrap().bits(), &[1]);
        assert_eq!(s.variable("loc").unwrap().bits(), &[3, 5]);
        assert_eq!(s.variable("q").unwrap().bits(), &[7]);
        assert_eq!(s.bits(Some(Partition::Sys), true), vec![4, 6, 8]);
        assert_eq!(s.bits(None, false), vec![1, 3, 5, 7]);
    }

    #[test]
    fn test_collision() {
        let env = BTreeMap::from([("a".to_string(), Domain::Bool)]);
        let sys = BTreeMap::from([("a".to_string(), Domain::Bool)]);
        let err = StateSpace::new(&env, &sys).unwrap_err();
        assert!(matches!(err, Error::VariableCollision { .. }));
    }

    #[test]
    fn test_valid_excludes_unused_codes() {
        let s = space();
        let valid = s.valid(None, false);
        assert_eq!(s.count_states(valid), BigUint::from(2u32 * 3 * 2));
        let loc = s.variable("loc").unwrap();
        assert!(s.bdd().is_zero(s.bdd().apply_and(valid, s.code_cube(loc, 3, false))));
    }

    #[test]
    fn test_compile_and_holds() {
        let s = space();
        let f = s.compile(&Expr::parse("p -> (loc != 0 && !q)").unwrap()).unwrap();
        let on = state(&[("p", true.into()), ("loc", Value::Int(1)), ("q", false.into())]);
        let off = state(&[("p", true.into()), ("loc", Value::Int(0)), ("q", false.into())]);
        assert!(s.holds(f, &on, None));
        assert!(!s.holds(f, &off, None));
    }

    #[test]
    fn test_compile_arithmetic() {
        let s = space();
        let f = s.compile(&Expr::parse("X (loc) = loc + 1").unwrap()).unwrap();
        let cur = state(&[("loc", Value::Int(1))]);
        let next = state(&[("loc", Value::Int(2))]);
        assert!(s.holds(f, &cur, Some(&next)));
        assert!(!s.holds(f, &next, Some(&cur)));

        let g = s.compile(&Expr::parse("loc' = loc + 1").unwrap()).unwrap();
        assert_eq!(f, g);
    }

    #[test]
    fn test_prime_unprime() {
        let s = space();
        let f = s.compile(&Expr::parse("loc = 2 || q").unwrap()).unwrap();
        let g = s.compile(&Expr::parse("X (loc = 2 || q)").unwrap()).unwrap();
        assert_eq!(s.prime(f), g);
        assert_eq!(s.unprime(g), f);
    }

    #[test]
    fn test_malformed() {
        let s = space();
        for text in [
            "unknown",
            "loc = 5",
            "loc = p",
            "loc",
            "p + 1 = 2",
            "X (X (p))",
            "p < q",
            "3",
        ] {
            let e = Expr::parse(text).unwrap();
            let err = s.compile(&e).unwrap_err();
            assert!(matches!(err, Error::MalformedPredicate { .. }), "{}", text);
        }
    }

    #[test]
    fn test_pick_and_enumerate() {
        let s = space();
        let f = s.compile(&Expr::parse("loc >= 1").unwrap()).unwrap();
        let f = s.bdd().apply_and(f, s.valid(Some(Partition::Sys), false));

        let first = s.pick(f, Some(Partition::Sys), false).unwrap();
        assert_eq!(first, state(&[("loc", Value::Int(1)), ("q", false.into())]));

        let all = s.enumerate(f, Some(Partition::Sys), false);
        assert_eq!(all.len(), 4);
        assert_eq!(all[3], state(&[("loc", Value::Int(2)), ("q", true.into())]));

        assert!(s.pick(s.bdd().zero(), Some(Partition::Sys), false).is_none());
    }

    #[test]
    fn test_state_cube() {
        let s = space();
        let v = state(&[("p", true.into()), ("loc", Value::Int(2)), ("q", false.into())]);
        let cube = s.state_cube(&v, false);
        assert_eq!(s.count_states(cube), BigUint::from(1u32));
        assert_eq!(s.pick(cube, None, false), Some(v));

        let bad = state(&[("loc", Value::Int(7))]);
        assert!(s.bdd().is_zero(s.state_cube(&bad, false)));
    }

    #[test]
    fn test_singleton_int() {
        let env = BTreeMap::new();
        let sys = BTreeMap::from([("c".to_string(), Domain::int(4, 4))]);
        let s = StateSpace::new(&env, &sys).unwrap();
        assert_eq!(s.num_bits(), 0);
        let f = s.compile(&Expr::parse("c = 4").unwrap()).unwrap();
        assert!(s.bdd().is_one(f));
        assert_eq!(s.pick(f, None, false), Some(state(&[("c", Value::Int(4))])));
    }

    #[test]
    fn test_domain_bounds() {
        assert!(matches!(Domain::try_int(3, 1), Err(Error::InvalidDomain(_))));
        assert!(matches!(Domain::try_int(i64::MIN, i64::MAX), Err(Error::InvalidDomain(_))));
        assert!(matches!(Domain::try_int(0, MAX_INT_DOMAIN as i64), Err(Error::InvalidDomain(_))));
        assert_eq!(Domain::try_int(0, MAX_INT_DOMAIN as i64 - 1).unwrap().num_bits(), 16);
        assert_eq!(Domain::try_int(-2, 2).unwrap(), Domain::int(-2, 2));

        // Sizes of hand-built domains do not overflow.
        let full = Domain::Int {
            lo: i64::MIN,
            hi: i64::MAX,
        };
        assert_eq!(full.size(), 1u128 << 64);
        assert_eq!(full.num_bits(), 64);
        assert_eq!(Domain::Bool.size(), 2);
        assert_eq!(Domain::Bool.num_bits(), 1);

        let sys = BTreeMap::from([("x".to_string(), full)]);
        match StateSpace::new(&BTreeMap::new(), &sys) {
            Err(Error::InvalidDomain(reason)) => assert!(reason.starts_with("variable `x`"), "{}", reason),
            other => panic!("expected an invalid domain, got {:?}", other.map(|s| s.num_bits())),
        }
        let sys = BTreeMap::from([("y".to_string(), Domain::Int { lo: 5, hi: 0 })]);
        assert!(matches!(StateSpace::new(&BTreeMap::new(), &sys), Err(Error::InvalidDomain(_))));
    }

    #[test]
    #[should_panic(expected = "empty integer range")]
    fn test_domain_int_empty() {
        Domain::int(3, 1);
    }
}
