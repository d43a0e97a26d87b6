//! The BDD manager.
//!
//! All boolean functions live inside a single [`Bdd`] manager and are addressed by
//! lightweight [`Ref`] handles. Nodes are hash-consed in a unique [`Table`], so two
//! equivalent functions always get the same `Ref`: equality of sets of states is a
//! single integer comparison, which is what the fixed-point loops of the solver rely on.
//!
//! Complement edges are used: `-f` is a constant-time negation. The canonical form keeps
//! the `high` child of every stored node regular (non-negated).
//!
//! Variables are 1-indexed; a smaller index sits closer to the root.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;

use log::debug;

use crate::cache::Cache;
use crate::reference::Ref;
use crate::table::Table;
use crate::utils::{pairing2, pairing3, MyHash};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Node {
    variable: u32,
    low: Ref,
    high: Ref,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            variable: 0,
            low: Ref::ZERO,
            high: Ref::ZERO,
        }
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        pairing3(self.variable as u64, self.low.raw() as u64, self.high.raw() as u64)
    }
}

#[derive(Debug, Eq, PartialEq, Clone)]
enum OpKey {
    Ite(Ref, Ref, Ref),
    Exists(Ref, Ref),
    AndExists(Ref, Ref, Ref),
}

impl MyHash for OpKey {
    fn hash(&self) -> u64 {
        match self {
            OpKey::Ite(f, g, h) => pairing3(f.raw() as u64, g.raw() as u64, h.raw() as u64),
            OpKey::Exists(f, c) => pairing2(pairing2(f.raw() as u64, c.raw() as u64), 1),
            OpKey::AndExists(f, g, c) => pairing2(pairing3(f.raw() as u64, g.raw() as u64, c.raw() as u64), 2),
        }
    }
}

pub struct Bdd {
    storage: RefCell<Table<Node>>,
    cache: RefCell<Cache<OpKey, Ref>>,
}

impl Bdd {
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Storage bits should be in the range 0..=31");

        let mut storage = Table::new(bits);

        // Allocate the terminal node:
        let one = storage.add(Node::default());
        assert_eq!(one, 1); // Make sure the terminal node is (1).

        Self {
            storage: RefCell::new(storage),
            cache: RefCell::new(Cache::new(bits.min(20))),
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(16)
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        let cache = self.cache.borrow();
        f.debug_struct("Bdd")
            .field("size", &storage.size())
            .field("capacity", &storage.capacity())
            .field("cache_hits", &cache.hits())
            .field("cache_misses", &cache.misses())
            .finish()
    }
}

impl Bdd {
    pub fn one(&self) -> Ref {
        Ref::ONE
    }
    pub fn zero(&self) -> Ref {
        Ref::ZERO
    }

    /// Number of nodes allocated so far.
    pub fn num_nodes(&self) -> usize {
        self.storage.borrow().size()
    }

    /// Variable labelling the node (`0` for the terminal).
    pub fn variable(&self, index: usize) -> u32 {
        self.storage.borrow().value(index).variable
    }
    pub fn low(&self, index: usize) -> Ref {
        self.storage.borrow().value(index).low
    }
    pub fn high(&self, index: usize) -> Ref {
        self.storage.borrow().value(index).high
    }

    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.low(node.index());
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.high(node.index());
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == Ref::ZERO
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == Ref::ONE
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.index() == 1
    }

    /// Position of the top variable of `node` in the order; terminals sit below everything.
    pub fn level(&self, node: Ref) -> u32 {
        if self.is_terminal(node) {
            u32::MAX
        } else {
            self.variable(node.index())
        }
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");

        // Handle duplicates
        if low == high {
            return low;
        }

        // Handle canonicity
        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }

        debug_assert!(v < self.level(low) && v < self.level(high), "Variable order violated");

        let i = self.storage.borrow_mut().put(Node { variable: v, low, high });
        Ref::positive(i as u32)
    }

    pub fn mk_var(&self, v: u32) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");
        self.mk_node(v, Ref::ZERO, Ref::ONE)
    }

    /// Conjunction of literals, given in DIMACS-like form (`-v` for negation).
    pub fn mk_cube(&self, literals: impl IntoIterator<Item = i32>) -> Ref {
        let mut literals = literals.into_iter().collect::<Vec<_>>();
        literals.sort_by_key(|&v| std::cmp::Reverse(v.unsigned_abs()));
        let mut current = Ref::ONE;
        for lit in literals {
            assert_ne!(lit, 0, "Variable index should not be zero");
            current = if lit < 0 {
                self.mk_node(lit.unsigned_abs(), current, Ref::ZERO)
            } else {
                self.mk_node(lit as u32, Ref::ZERO, current)
            };
        }
        current
    }

    /// Disjunction of literals, given in DIMACS-like form.
    pub fn mk_clause(&self, literals: impl IntoIterator<Item = i32>) -> Ref {
        -self.mk_cube(literals.into_iter().map(|lit| -lit))
    }

    /// Positive cube over the given variables, used as a quantification set.
    pub fn mk_var_set(&self, variables: impl IntoIterator<Item = u32>) -> Ref {
        self.mk_cube(variables.into_iter().map(|v| v as i32))
    }

    /// Cofactors of `node` with respect to `v`, which must not lie below the top variable.
    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        assert_ne!(v, 0, "Variable index should not be zero");

        let top = self.level(node);
        if v < top {
            return (node, node);
        }
        assert_eq!(v, top, "Variable {} is below the top variable {}", v, top);
        (self.low_node(node), self.high_node(node))
    }

    /// Apply the ITE operation to the arguments.
    ///
    /// ```text
    /// ITE(x, y, z) = (x ∧ y) ∨ (¬x ∧ z)
    /// ```
    ///
    /// # Examples
    ///
    /// ```
    /// use gr1_rs::bdd::Bdd;
    ///
    /// let bdd = Bdd::default();
    /// let x = bdd.mk_var(1);
    /// let y = bdd.mk_var(2);
    /// let z = bdd.mk_var(3);
    /// let f = bdd.apply_ite(x, y, z);
    /// let x_and_y = bdd.apply_and(x, y);
    /// let not_x_and_z = bdd.apply_and(-x, z);
    /// assert_eq!(f, bdd.apply_or(x_and_y, not_x_and_z));
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        // Base cases:
        //   ite(1,G,H) => G
        //   ite(0,G,H) => H
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,G,~F) => ite(F,G,1)
        let g = if g == f {
            Ref::ONE
        } else if g == -f {
            Ref::ZERO
        } else {
            g
        };
        let h = if h == f {
            Ref::ZERO
        } else if h == -f {
            Ref::ONE
        } else {
            h
        };

        // More base cases:
        //   ite(F,G,G) => G
        //   ite(F,1,0) => F
        //   ite(F,0,1) => ~F
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        // ite(~F,G,H) => ite(F,H,G)
        let (f, mut g, mut h) = if f.is_negated() { (-f, h, g) } else { (f, g, h) };

        // ite(F,~G,H) => ~ite(F,G,~H)
        let mut n = false;
        if g.is_negated() {
            n = true;
            g = -g;
            h = -h;
        }

        let key = OpKey::Ite(f, g, h);
        if let Some(&res) = self.cache.borrow().get(&key) {
            return if n { -res } else { res };
        }

        let m = self.level(f).min(self.level(g)).min(self.level(h));
        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);
        let res = self.mk_node(m, e, t);
        self.cache.borrow_mut().insert(key, res);

        if n {
            -res
        } else {
            res
        }
    }

    /// Negation flips the complement bit and allocates nothing.
    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, Ref::ZERO)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, Ref::ONE, v)
    }

    pub fn apply_xor(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, -v, v)
    }

    pub fn apply_eq(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, -v)
    }

    pub fn apply_imply(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, Ref::ONE)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = Ref::ONE;
        for node in nodes {
            res = self.apply_and(res, node);
            if self.is_zero(res) {
                break;
            }
        }
        res
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = Ref::ZERO;
        for node in nodes {
            res = self.apply_or(res, node);
            if self.is_one(res) {
                break;
            }
        }
        res
    }

    /// Existential quantification of `f` over the variables of the positive cube `vars`.
    pub fn exists(&self, f: Ref, vars: Ref) -> Ref {
        if self.is_terminal(f) || self.is_one(vars) {
            return f;
        }

        // Skip the quantified variables above the top of `f`.
        let top = self.level(f);
        let mut vars = vars;
        while self.level(vars) < top {
            vars = self.high_node(vars);
        }
        if self.is_one(vars) {
            return f;
        }

        let key = OpKey::Exists(f, vars);
        if let Some(&res) = self.cache.borrow().get(&key) {
            return res;
        }

        let (f0, f1) = self.top_cofactors(f, top);
        let res = if self.level(vars) == top {
            let rest = self.high_node(vars);
            let r0 = self.exists(f0, rest);
            if self.is_one(r0) {
                r0
            } else {
                let r1 = self.exists(f1, rest);
                self.apply_or(r0, r1)
            }
        } else {
            let r0 = self.exists(f0, vars);
            let r1 = self.exists(f1, vars);
            self.mk_node(top, r0, r1)
        };

        self.cache.borrow_mut().insert(key, res);
        res
    }

    /// Universal quantification of `f` over the variables of the positive cube `vars`.
    pub fn forall(&self, f: Ref, vars: Ref) -> Ref {
        -self.exists(-f, vars)
    }

    /// Relational product: `∃ vars. (f ∧ g)` without building the conjunction first.
    pub fn and_exists(&self, f: Ref, g: Ref, vars: Ref) -> Ref {
        if self.is_zero(f) || self.is_zero(g) || f == -g {
            return Ref::ZERO;
        }
        if self.is_one(f) {
            return self.exists(g, vars);
        }
        if self.is_one(g) || f == g {
            return self.exists(f, vars);
        }
        if self.is_one(vars) {
            return self.apply_and(f, g);
        }

        let (f, g) = if f.raw() <= g.raw() { (f, g) } else { (g, f) };

        let top = self.level(f).min(self.level(g));
        let mut vars = vars;
        while self.level(vars) < top {
            vars = self.high_node(vars);
        }
        if self.is_one(vars) {
            return self.apply_and(f, g);
        }

        let key = OpKey::AndExists(f, g, vars);
        if let Some(&res) = self.cache.borrow().get(&key) {
            return res;
        }

        let (f0, f1) = self.top_cofactors(f, top);
        let (g0, g1) = self.top_cofactors(g, top);
        let res = if self.level(vars) == top {
            let rest = self.high_node(vars);
            let r0 = self.and_exists(f0, g0, rest);
            if self.is_one(r0) {
                r0
            } else {
                let r1 = self.and_exists(f1, g1, rest);
                self.apply_or(r0, r1)
            }
        } else {
            let r0 = self.and_exists(f0, g0, vars);
            let r1 = self.and_exists(f1, g1, vars);
            self.mk_node(top, r0, r1)
        };

        self.cache.borrow_mut().insert(key, res);
        res
    }

    /// Rename the variables of `f` through `map`.
    ///
    /// The map must be strictly monotone on the support of `f`, so that the result
    /// is ordered without any restructuring (e.g. shifting current-state bits onto
    /// the interleaved next-state bits).
    pub fn rename(&self, f: Ref, map: impl Fn(u32) -> u32) -> Ref {
        let mut cache = HashMap::new();
        self.rename_(f, &map, &mut cache)
    }

    fn rename_(&self, f: Ref, map: &impl Fn(u32) -> u32, cache: &mut HashMap<Ref, Ref>) -> Ref {
        if self.is_terminal(f) {
            return f;
        }
        let node = f.regular();
        let res = if let Some(&res) = cache.get(&node) {
            res
        } else {
            let v = map(self.variable(node.index()));
            let low = self.rename_(self.low(node.index()), map, cache);
            let high = self.rename_(self.high(node.index()), map, cache);
            let res = self.mk_node(v, low, high);
            cache.insert(node, res);
            res
        };
        if f.is_negated() {
            -res
        } else {
            res
        }
    }

    /// Evaluate `f` under the assignment `value(v)` of every variable `v`.
    pub fn eval(&self, f: Ref, value: impl Fn(u32) -> bool) -> bool {
        let mut current = f;
        while !self.is_terminal(current) {
            let v = self.variable(current.index());
            current = if value(v) {
                self.high_node(current)
            } else {
                self.low_node(current)
            };
        }
        self.is_one(current)
    }

    /// Variables `f` depends on, in increasing order.
    pub fn support(&self, f: Ref) -> Vec<u32> {
        let mut vars = self
            .descendants([f])
            .into_iter()
            .filter(|&i| i != 1)
            .map(|i| self.variable(i))
            .collect::<Vec<_>>();
        vars.sort_unstable();
        vars.dedup();
        vars
    }

    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<usize> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from_iter(nodes);

        while let Some(node) = queue.pop_front() {
            let i = node.index();
            if visited.insert(i) && !self.is_terminal(node) {
                queue.push_back(self.low(i));
                queue.push_back(self.high(i));
            }
        }

        visited
    }

    pub fn size(&self, f: Ref) -> u64 {
        let size = self.descendants([f]).len() as u64;
        debug!("size({}) = {}", f, size);
        size
    }

    pub fn to_bracket_string(&self, node: Ref) -> String {
        if self.is_zero(node) {
            return "(0)".to_string();
        } else if self.is_one(node) {
            return "(1)".to_string();
        }

        let v = self.variable(node.index());
        let low = self.low_node(node);
        let high = self.high_node(node);

        format!(
            "{}:(x{}, {}, {})",
            node,
            v,
            self.to_bracket_string(high),
            self.to_bracket_string(low)
        )
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_var() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);

        assert_eq!(bdd.variable(x.index()), 1);
        assert_eq!(bdd.high_node(x), bdd.one());
        assert_eq!(bdd.low_node(x), bdd.zero());
    }

    #[test]
    fn test_not_var() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let not_x = -x;

        assert_eq!(bdd.variable(not_x.index()), 1);
        assert_eq!(bdd.high_node(not_x), bdd.zero());
        assert_eq!(bdd.low_node(not_x), bdd.one());
    }

    #[test]
    fn test_apply_not() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let f = bdd.apply_or(x, y);
        let before = bdd.num_nodes();
        let g = bdd.apply_not(f);
        assert_eq!(bdd.num_nodes(), before);

        assert_eq!(bdd.apply_not(g), f);
        assert_eq!(bdd.apply_and(f, g), bdd.zero());
        assert_eq!(g, bdd.apply_and(bdd.apply_not(x), bdd.apply_not(y)));
        assert_eq!(bdd.apply_not(bdd.one()), bdd.zero());
        assert!(bdd.eval(g, |_| false));
        assert!(!bdd.eval(g, |v| v == 2));
    }

    #[test]
    fn test_hash_consing() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let f = bdd.apply_and(x, y);
        let g = bdd.apply_and(y, x);
        assert_eq!(f, g);
        assert_eq!(bdd.apply_or(-x, -y), -f);
    }

    #[test]
    fn test_de_morgan() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let z = bdd.mk_var(3);
        let f = bdd.apply_or(bdd.apply_and(x, y), z);
        let g = -bdd.apply_and(bdd.apply_or(-x, -y), -z);
        assert_eq!(f, g);
    }

    #[test]
    fn test_xor_eq() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        assert_eq!(bdd.apply_xor(x, y), -bdd.apply_eq(x, y));
        assert_eq!(bdd.apply_xor(x, x), bdd.zero());
        assert_eq!(bdd.apply_eq(x, x), bdd.one());
        assert_eq!(bdd.apply_imply(x, y), bdd.apply_or(-x, y));
    }

    #[test]
    fn test_cube_and_clause() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let z = bdd.mk_var(3);
        let cube = bdd.mk_cube([1, -2, 3]);
        assert_eq!(cube, bdd.apply_and_many([x, -y, z]));
        let clause = bdd.mk_clause([-1, 2]);
        assert_eq!(clause, bdd.apply_or_many([-x, y]));
    }

    #[test]
    fn test_exists() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let z = bdd.mk_var(3);
        let f = bdd.apply_and(x, bdd.apply_or(y, z));

        assert_eq!(bdd.exists(f, bdd.mk_var_set([1])), bdd.apply_or(y, z));
        assert_eq!(bdd.exists(f, bdd.mk_var_set([2])), x);
        assert_eq!(bdd.exists(f, bdd.mk_var_set([2, 3])), x);
        assert_eq!(bdd.exists(f, bdd.mk_var_set([1, 2, 3])), bdd.one());
        assert_eq!(bdd.exists(bdd.zero(), bdd.mk_var_set([1])), bdd.zero());
    }

    #[test]
    fn test_forall() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let f = bdd.apply_or(x, y);

        assert_eq!(bdd.forall(f, bdd.mk_var_set([1])), y);
        assert_eq!(bdd.forall(f, bdd.mk_var_set([1, 2])), bdd.zero());
        assert_eq!(bdd.forall(bdd.apply_or(x, -x), bdd.mk_var_set([1])), bdd.one());
    }

    #[test]
    fn test_and_exists() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let z = bdd.mk_var(3);
        let f = bdd.apply_or(x, y);
        let g = bdd.apply_xor(y, z);
        let vars = bdd.mk_var_set([2]);

        let expected = bdd.exists(bdd.apply_and(f, g), vars);
        assert_eq!(bdd.and_exists(f, g, vars), expected);
        assert_eq!(bdd.and_exists(g, f, vars), expected);
    }

    #[test]
    fn test_rename() {
        let bdd = Bdd::default();

        let x1 = bdd.mk_var(1);
        let x3 = bdd.mk_var(3);
        let f = bdd.apply_and(x1, -x3);
        let g = bdd.rename(f, |v| v + 1);

        let x2 = bdd.mk_var(2);
        let x4 = bdd.mk_var(4);
        assert_eq!(g, bdd.apply_and(x2, -x4));
        assert_eq!(bdd.rename(-f, |v| v + 1), -g);
    }

    #[test]
    fn test_eval() {
        let bdd = Bdd::default();

        let f = bdd.mk_cube([1, -2]);
        assert!(bdd.eval(f, |v| v == 1));
        assert!(!bdd.eval(f, |_| true));
        assert!(!bdd.eval(-f, |v| v == 1));
    }

    #[test]
    fn test_support_and_size() {
        let bdd = Bdd::default();

        let f = bdd.mk_cube([2, -5]);
        assert_eq!(bdd.support(f), vec![2, 5]);
        assert_eq!(bdd.size(f), 3);
        assert!(bdd.support(bdd.one()).is_empty());
    }

    #[test]
    fn test_bracket_string() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        assert_eq!(bdd.to_bracket_string(x), format!("{}:(x1, (1), (0))", x));
    }
}
