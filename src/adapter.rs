//! Translation of transition systems into GR(1) specifications.
//!
//! Each transition system gets a state variable owned by the player named by
//! [`TransitionSystem::owner`]. The graph becomes one safety constraint per state,
//!
//! ```text
//! (loc = s) -> X ((loc = t1) || ... || (loc = tk))
//! ```
//!
//! and every atomic proposition `p` becomes a boolean variable tied to the states
//! carrying it, both initially and in every next state:
//!
//! ```text
//! p <-> ((loc = s1) || ...)        X (p) <-> X ((loc = s1) || ...)
//! ```
//!
//! With [`CompileOptions::bool_states`] the state variable is replaced by one boolean per
//! state (named `{statevar}_{state}`) constrained to be exactly-one.
//!
//! [`compile_many`] scopes propositions by their system, so `p` of the system behind `a`
//! becomes the variable `a.p` (see [`label_name`]). Two agents labelling different
//! states with the same proposition stay independent.

use std::collections::BTreeSet;

use log::debug;

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::space::{Domain, Partition};
use crate::spec::Gr1Spec;
use crate::ts::TransitionSystem;

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Do not constrain the initial state of the system.
    pub ignore_initial: bool,
    /// Encode the current state with one boolean per state instead of an integer.
    pub bool_states: bool,
}

struct Encoder<'a> {
    ts: &'a TransitionSystem,
    statevar: &'a str,
    bool_states: bool,
    scoped_labels: bool,
}

impl Encoder<'_> {
    fn state_var(&self, state: &str) -> String {
        format!("{}_{}", self.statevar, state)
    }

    fn label_var(&self, proposition: &str) -> String {
        if self.scoped_labels {
            label_name(self.statevar, proposition)
        } else {
            proposition.to_string()
        }
    }

    fn at(&self, i: usize) -> Expr {
        if self.bool_states {
            Expr::var(self.state_var(&self.ts.states()[i]))
        } else {
            Expr::var(self.statevar).equals(Expr::int(i as i64))
        }
    }

    fn at_any<'s>(&self, states: impl IntoIterator<Item = &'s str>) -> Expr {
        Expr::any(states.into_iter().filter_map(|s| self.ts.position(s)).map(|i| self.at(i)))
    }

    fn exactly_one(&self) -> Expr {
        let n = self.ts.num_states();
        Expr::any((0..n).map(|i| {
            Expr::all((0..n).map(|k| if k == i { self.at(k) } else { !self.at(k) }))
        }))
    }

    fn declare(&self, spec: Gr1Spec, partition: Partition) -> Result<Gr1Spec> {
        let mut spec = spec;
        if self.bool_states {
            for state in self.ts.states() {
                spec = spec.declare(partition, self.state_var(state), Domain::Bool)?;
            }
        } else {
            let hi = self.ts.num_states() as i64 - 1;
            spec = spec.declare(partition, self.statevar, Domain::try_int(0, hi)?)?;
        }
        for p in self.ts.propositions() {
            spec = spec.declare(partition, self.label_var(p), Domain::Bool)?;
        }
        Ok(spec)
    }
}

/// Translate a transition system into a partial specification.
///
/// The predicates land in the env or sys fields according to the owner of `ts`.
pub fn compile(ts: &TransitionSystem, statevar: &str, options: &CompileOptions) -> Result<Gr1Spec> {
    compile_scoped(ts, statevar, options, false)
}

fn compile_scoped(
    ts: &TransitionSystem,
    statevar: &str,
    options: &CompileOptions,
    scoped_labels: bool,
) -> Result<Gr1Spec> {
    ts.validate(!options.ignore_initial)?;

    let enc = Encoder {
        ts,
        statevar,
        bool_states: options.bool_states,
        scoped_labels,
    };
    let partition = ts.owner().partition();
    let mut spec = enc.declare(Gr1Spec::new(), partition)?;

    let mut init = Vec::new();
    let mut safety = Vec::new();

    if options.bool_states {
        init.push(enc.exactly_one());
        safety.push(Expr::next(enc.exactly_one()));
    }

    for (i, state) in ts.states().iter().enumerate() {
        let succ = ts.successors(state)?;
        safety.push(enc.at(i).implies(Expr::next(enc.at_any(succ))));
    }

    for p in ts.propositions() {
        let holders = enc.at_any(ts.states_with(p));
        init.push(Expr::var(enc.label_var(p)).iff(holders.clone()));
        safety.push(Expr::next(Expr::var(enc.label_var(p))).iff(Expr::next(holders)));
    }

    if !options.ignore_initial {
        init.push(enc.at_any(ts.initial_states()));
    }

    for e in init {
        spec = match partition {
            Partition::Env => spec.env_init(e),
            Partition::Sys => spec.sys_init(e),
        };
    }
    for e in safety {
        spec = match partition {
            Partition::Env => spec.env_safety(e),
            Partition::Sys => spec.sys_safety(e),
        };
    }

    debug!(
        "Compiled {:?}-owned transition system `{}` ({} states, {} transitions)",
        ts.owner(),
        statevar,
        ts.num_states(),
        ts.num_transitions()
    );
    Ok(spec)
}

/// Translate several transition systems, one state variable each, and compose the results.
///
/// Propositions are renamed with [`label_name`], so only the state variables and the
/// caller's own predicates relate the systems.
pub fn compile_many(systems: &[(&TransitionSystem, &str)], options: &CompileOptions) -> Result<Gr1Spec> {
    let mut seen = BTreeSet::new();
    let mut spec = Gr1Spec::new();
    for &(ts, statevar) in systems {
        if !seen.insert(statevar) {
            return Err(Error::collision(statevar, "state variable used by two transition systems"));
        }
        spec = spec.compose(&compile_scoped(ts, statevar, options, true)?)?;
    }
    Ok(spec)
}

/// The predicate "`ts` is in `state`", in the encoding chosen by `options`.
pub fn state_predicate(ts: &TransitionSystem, statevar: &str, state: &str, options: &CompileOptions) -> Result<Expr> {
    let i = ts
        .position(state)
        .ok_or_else(|| Error::InvalidTransitionSystem(format!("unknown state `{}`", state)))?;
    let enc = Encoder {
        ts,
        statevar,
        bool_states: options.bool_states,
        scoped_labels: false,
    };
    Ok(enc.at(i))
}

/// Variable carrying `proposition` of the system behind `statevar` in [`compile_many`].
pub fn label_name(statevar: &str, proposition: &str) -> String {
    format!("{}.{}", statevar, proposition)
}

/// The predicate "`proposition` holds in `ts`", for a system compiled by [`compile_many`].
pub fn label_predicate(ts: &TransitionSystem, statevar: &str, proposition: &str) -> Result<Expr> {
    if !ts.propositions().contains(proposition) {
        return Err(Error::InvalidTransitionSystem(format!("unknown proposition `{}`", proposition)));
    }
    Ok(Expr::var(label_name(statevar, proposition)))
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::solver::{synthesize, Outcome};
    use crate::space::Value;
    use crate::ts::Owner;

    fn line(owner: Owner) -> TransitionSystem {
        let mut ts = TransitionSystem::new(owner);
        ts.add_states_from(["a", "b", "c"]);
        ts.add_transitions_from([("a", "b"), ("b", "a"), ("b", "c")]).unwrap();
        ts.mark_terminal("c").unwrap();
        ts.set_initial(["a"]).unwrap();
        ts.label("c", ["done"]).unwrap();
        ts
    }

    #[test]
    fn test_compile_int_states() {
        let spec = compile(&line(Owner::Sys), "loc", &CompileOptions::default()).unwrap();

        assert_eq!(spec.sys_vars().get("loc"), Some(&Domain::int(0, 2)));
        assert_eq!(spec.sys_vars().get("done"), Some(&Domain::Bool));
        assert!(spec.env_vars().is_empty());

        let expected = Expr::parse("(loc = 1) -> X ((loc = 0) || (loc = 2))").unwrap();
        assert!(spec.sys_safety_predicates().contains(&expected));
        let expected = Expr::parse("X (loc = 2) -> X (loc = 2)").unwrap();
        assert!(!spec.sys_safety_predicates().contains(&expected));
        let expected = Expr::parse("(loc = 2) -> X (loc = 2)").unwrap();
        assert!(spec.sys_safety_predicates().contains(&expected));

        let expected = Expr::parse("X (done) <-> X (loc = 2)").unwrap();
        assert!(spec.sys_safety_predicates().contains(&expected));
        assert!(spec.sys_init_predicates().contains(&Expr::parse("loc = 0").unwrap()));
        assert!(spec.sys_init_predicates().contains(&Expr::parse("done <-> (loc = 2)").unwrap()));
    }

    #[test]
    fn test_compile_env_owner() {
        let spec = compile(&line(Owner::Env), "obs", &CompileOptions::default()).unwrap();
        assert!(spec.sys_vars().is_empty());
        assert!(spec.env_vars().contains_key("obs"));
        assert!(!spec.env_safety_predicates().is_empty());
        assert!(spec.sys_safety_predicates().is_empty());
    }

    #[test]
    fn test_ignore_initial() {
        let mut ts = line(Owner::Sys);
        let options = CompileOptions {
            ignore_initial: true,
            ..Default::default()
        };
        let spec = compile(&ts, "loc", &options).unwrap();
        // Only the label binding remains.
        assert_eq!(spec.sys_init_predicates().len(), 1);

        // Without initial states the system is still accepted.
        ts = TransitionSystem::new(Owner::Sys);
        ts.add_state("only");
        ts.add_transition("only", "only").unwrap();
        compile(&ts, "loc", &options).unwrap();
        assert!(compile(&ts, "loc", &CompileOptions::default()).is_err());
    }

    #[test]
    fn test_bool_states() {
        let options = CompileOptions {
            bool_states: true,
            ..Default::default()
        };
        let spec = compile(&line(Owner::Sys), "loc", &options).unwrap();
        assert!(spec.sys_vars().contains_key("loc_a"));
        assert!(spec.sys_vars().contains_key("loc_c"));
        assert!(!spec.sys_vars().contains_key("loc"));

        let expected = Expr::parse("loc_b -> X (loc_a || loc_c)").unwrap();
        assert!(spec.sys_safety_predicates().contains(&expected));
        assert!(spec.sys_init_predicates().contains(&Expr::var("loc_a")));
    }

    #[test]
    fn test_compile_many() {
        let a = line(Owner::Sys);
        let b = line(Owner::Sys);
        let options = CompileOptions::default();
        let spec = compile_many(&[(&a, "p1"), (&b, "p2")], &options).unwrap();
        assert!(spec.sys_vars().contains_key("p1"));
        assert!(spec.sys_vars().contains_key("p2"));
        assert!(spec.sys_vars().contains_key("p1.done"));
        assert!(spec.sys_vars().contains_key("p2.done"));
        assert!(!spec.sys_vars().contains_key("done"));

        let expected = Expr::parse("X (p2.done) <-> X (p2 = 2)").unwrap();
        assert!(spec.sys_safety_predicates().contains(&expected));
        assert_eq!(label_predicate(&a, "p1", "done").unwrap(), Expr::var("p1.done"));
        assert!(label_predicate(&a, "p1", "missing").is_err());

        assert!(matches!(
            compile_many(&[(&a, "p1"), (&b, "p1")], &options),
            Err(Error::VariableCollision { .. })
        ));
    }

    #[test]
    fn test_state_predicate() {
        let ts = line(Owner::Sys);
        let options = CompileOptions::default();
        assert_eq!(
            state_predicate(&ts, "loc", "b", &options).unwrap(),
            Expr::parse("loc = 1").unwrap()
        );
        assert!(state_predicate(&ts, "loc", "zzz", &options).is_err());
    }

    fn ring(start: &str, goal: &str) -> TransitionSystem {
        let mut ts = TransitionSystem::new(Owner::Sys);
        ts.add_states_from(["s0", "s1", "s2", "s3"]);
        for (i, j) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
            let (from, to) = (format!("s{}", i), format!("s{}", j));
            ts.add_comb(&[from.as_str()], &[from.as_str(), to.as_str()]).unwrap();
        }
        ts.set_initial([start]).unwrap();
        ts.label(goal, ["goal"]).unwrap();
        ts
    }

    #[test]
    fn test_compile_many_shared_proposition() {
        // Both agents call their target `goal`, in different cells.
        let a = ring("s2", "s2");
        let b = ring("s0", "s1");
        let options = CompileOptions::default();

        for (ts, statevar) in [(&a, "a"), (&b, "b")] {
            let alone = compile(ts, statevar, &options).unwrap().sys_prog(Expr::var("goal"));
            assert!(synthesize(&alone).unwrap().is_realizable());
        }

        let spec = compile_many(&[(&a, "a"), (&b, "b")], &options)
            .unwrap()
            .sys_prog(label_predicate(&a, "a", "goal").unwrap())
            .sys_prog(label_predicate(&b, "b", "goal").unwrap());
        assert!(spec.sys_init_predicates().contains(&Expr::parse("a.goal <-> (a = 2)").unwrap()));
        assert!(spec.sys_init_predicates().contains(&Expr::parse("b.goal <-> (b = 1)").unwrap()));

        match synthesize(&spec).unwrap() {
            Outcome::Realizable(strategy) => {
                let start = strategy.initial_states()[0];
                let v = &strategy.state(start).valuation;
                assert_eq!(v["a.goal"], Value::Bool(true));
                assert_eq!(v["b.goal"], Value::Bool(false));
            }
            other => panic!("expected realizable, got {}", other),
        }
    }
}
