use std::collections::HashMap;

use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::reference::Ref;

impl Bdd {
    /// Number of satisfying assignments of `node` over the variables `1..=num_vars`.
    pub fn sat_count(&self, node: Ref, num_vars: usize) -> BigUint {
        let mut cache = HashMap::new();
        let max = BigUint::from(1u32) << num_vars;
        self.sat_count_(node, &max, &mut cache)
    }

    fn sat_count_(&self, node: Ref, max: &BigUint, cache: &mut HashMap<Ref, BigUint>) -> BigUint {
        if self.is_zero(node) {
            return BigUint::ZERO;
        } else if self.is_one(node) {
            return max.clone();
        }

        let regular = node.regular();
        let count = if let Some(count) = cache.get(&regular) {
            count.clone()
        } else {
            let count_low = self.sat_count_(self.low(regular.index()), max, cache);
            let count_high = self.sat_count_(self.high(regular.index()), max, cache);
            let count: BigUint = (count_low + count_high) >> 1;
            cache.insert(regular, count.clone());
            count
        };

        if node.is_negated() {
            max - count
        } else {
            count
        }
    }

    /// Lexicographically least satisfying assignment over `vars`.
    ///
    /// `vars` must be sorted in increasing order and cover the support of `node`;
    /// `false` is preferred over `true` at every position.
    pub fn pick_cube(&self, node: Ref, vars: &[u32]) -> Option<Vec<bool>> {
        if self.is_zero(node) {
            return None;
        }

        let mut cube = Vec::with_capacity(vars.len());
        let mut current = node;
        for &v in vars {
            let (low, high) = self.top_cofactors(current, v);
            if !self.is_zero(low) {
                cube.push(false);
                current = low;
            } else {
                cube.push(true);
                current = high;
            }
        }
        assert!(self.is_one(current), "Variables do not cover the support");

        Some(cube)
    }

    /// All satisfying assignments over `vars`, in lexicographic order.
    ///
    /// The same requirements on `vars` as for [`Bdd::pick_cube`] apply.
    pub fn all_cubes(&self, node: Ref, vars: &[u32]) -> Vec<Vec<bool>> {
        let mut result = Vec::new();
        let mut prefix = Vec::with_capacity(vars.len());
        self.all_cubes_(node, vars, &mut prefix, &mut result);
        result
    }

    fn all_cubes_(&self, node: Ref, vars: &[u32], prefix: &mut Vec<bool>, result: &mut Vec<Vec<bool>>) {
        if self.is_zero(node) {
            return;
        }
        let Some((&v, rest)) = vars.split_first() else {
            assert!(self.is_one(node), "Variables do not cover the support");
            result.push(prefix.clone());
            return;
        };

        let (low, high) = self.top_cofactors(node, v);
        for (value, child) in [(false, low), (true, high)] {
            prefix.push(value);
            self.all_cubes_(child, rest, prefix, result);
            prefix.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_sat_count_terminal() {
        let bdd = Bdd::default();

        assert_eq!(bdd.sat_count(bdd.zero(), 3), BigUint::from(0u32));
        assert_eq!(bdd.sat_count(bdd.one(), 1), BigUint::from(2u32));
        assert_eq!(bdd.sat_count(bdd.one(), 3), BigUint::from(8u32));
    }

    #[test]
    fn test_sat_count_cube() {
        let bdd = Bdd::default();

        let f = bdd.mk_cube([1, 2]);
        assert_eq!(bdd.sat_count(f, 2), BigUint::from(1u32));
        assert_eq!(bdd.sat_count(f, 4), BigUint::from(4u32));
        assert_eq!(bdd.sat_count(-f, 2), BigUint::from(3u32));
    }

    #[test]
    fn test_sat_count_clause() {
        let bdd = Bdd::default();

        let f = bdd.mk_clause([1, 2]);
        assert_eq!(bdd.sat_count(f, 2), BigUint::from(3u32));
        assert_eq!(bdd.sat_count(f, 3), BigUint::from(6u32));
    }

    #[test]
    fn test_pick_cube_prefers_false() {
        let bdd = Bdd::default();

        let f = bdd.mk_clause([1, 2]);
        assert_eq!(bdd.pick_cube(f, &[1, 2]), Some(vec![false, true]));
        assert_eq!(bdd.pick_cube(bdd.zero(), &[1, 2]), None);
        assert_eq!(bdd.pick_cube(bdd.one(), &[1, 2]), Some(vec![false, false]));
    }

    #[test]
    fn test_all_cubes_order() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let f = bdd.apply_xor(x, y);
        assert_eq!(
            bdd.all_cubes(f, &[1, 2]),
            vec![vec![false, true], vec![true, false]]
        );

        // Variables outside the support are enumerated too.
        assert_eq!(bdd.all_cubes(x, &[1, 3]).len(), 2);
        assert!(bdd.all_cubes(bdd.zero(), &[1]).is_empty());
        assert_eq!(bdd.all_cubes(bdd.one(), &[]), vec![Vec::<bool>::new()]);
    }
}
