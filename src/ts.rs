//! Finite labelled transition systems.
//!
//! A [`TransitionSystem`] is a graph of named states with a set of initial states, atomic
//! propositions attached to states, and an immutable [`Owner`] that decides which player
//! moves along its edges once it is turned into a specification by the
//! [`adapter`][crate::adapter].
//!
//! ```
//! use gr1_rs::ts::{Owner, TransitionSystem};
//!
//! let mut ts = TransitionSystem::new(Owner::Sys);
//! ts.add_states_from(["X0", "X1", "X2"]);
//! ts.add_comb(&["X0", "X2"], &["X1"]).unwrap();
//! ts.add_transitions_from([("X1", "X0"), ("X1", "X2")]).unwrap();
//! ts.set_initial(["X0"]).unwrap();
//! ts.label("X2", ["goal"]).unwrap();
//! ts.validate(true).unwrap();
//!
//! assert_eq!(ts.successors("X1").unwrap(), vec!["X0", "X2"]);
//! assert_eq!(ts.states_with("goal"), vec!["X2"]);
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};

use crate::error::{Error, Result};
use crate::space::Partition;

/// The player moving along the edges of a transition system.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Owner {
    Sys,
    Env,
}

impl Owner {
    pub fn partition(self) -> Partition {
        match self {
            Owner::Sys => Partition::Sys,
            Owner::Env => Partition::Env,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransitionSystem {
    owner: Owner,
    states: Vec<String>,
    index: HashMap<String, usize>,
    initial: BTreeSet<usize>,
    successors: Vec<BTreeSet<usize>>,
    terminal: BTreeSet<usize>,
    labels: Vec<BTreeSet<String>>,
    propositions: BTreeSet<String>,
}

impl TransitionSystem {
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            states: Vec::new(),
            index: HashMap::new(),
            initial: BTreeSet::new(),
            successors: Vec::new(),
            terminal: BTreeSet::new(),
            labels: Vec::new(),
            propositions: BTreeSet::new(),
        }
    }

    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// Declare a state, returning its index. Declaring an existing state is a no-op.
    pub fn add_state(&mut self, name: impl Into<String>) -> usize {
        let name = name.into();
        if let Some(&i) = self.index.get(&name) {
            return i;
        }
        let i = self.states.len();
        self.index.insert(name.clone(), i);
        self.states.push(name);
        self.successors.push(BTreeSet::new());
        self.labels.push(BTreeSet::new());
        i
    }

    pub fn add_states_from<S: Into<String>>(&mut self, names: impl IntoIterator<Item = S>) {
        for name in names {
            self.add_state(name);
        }
    }

    fn lookup(&self, name: &str) -> Result<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| Error::InvalidTransitionSystem(format!("unknown state `{}`", name)))
    }

    /// Mark states as initial (in addition to the ones already marked).
    pub fn set_initial<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for name in names {
            let i = self.lookup(name)?;
            self.initial.insert(i);
        }
        Ok(())
    }

    pub fn add_transition(&mut self, from: &str, to: &str) -> Result<()> {
        let from = self.lookup(from)?;
        let to = self.lookup(to)?;
        self.successors[from].insert(to);
        Ok(())
    }

    pub fn add_transitions_from<'a>(&mut self, edges: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<()> {
        for (from, to) in edges {
            self.add_transition(from, to)?;
        }
        Ok(())
    }

    /// Connect every source to every target.
    pub fn add_comb(&mut self, sources: &[&str], targets: &[&str]) -> Result<()> {
        for from in sources {
            for to in targets {
                self.add_transition(from, to)?;
            }
        }
        Ok(())
    }

    /// Mark a state as terminal: the play stutters there forever.
    pub fn mark_terminal(&mut self, name: &str) -> Result<()> {
        let i = self.lookup(name)?;
        self.terminal.insert(i);
        self.successors[i].insert(i);
        Ok(())
    }

    /// Declare an atomic proposition without attaching it to any state.
    pub fn add_proposition(&mut self, name: impl Into<String>) {
        self.propositions.insert(name.into());
    }

    /// Attach atomic propositions to an already declared state.
    pub fn label<S: Into<String>>(&mut self, state: &str, propositions: impl IntoIterator<Item = S>) -> Result<()> {
        let i = self.lookup(state)?;
        for p in propositions {
            let p = p.into();
            self.propositions.insert(p.clone());
            self.labels[i].insert(p);
        }
        Ok(())
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Position of a state in declaration order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn initial_states(&self) -> Vec<&str> {
        self.initial.iter().map(|&i| self.states[i].as_str()).collect()
    }

    pub fn is_initial(&self, name: &str) -> bool {
        self.position(name).is_some_and(|i| self.initial.contains(&i))
    }

    pub fn is_terminal(&self, name: &str) -> bool {
        self.position(name).is_some_and(|i| self.terminal.contains(&i))
    }

    /// Successors of a state, in declaration order.
    pub fn successors(&self, name: &str) -> Result<Vec<&str>> {
        let i = self.lookup(name)?;
        Ok(self.successors[i].iter().map(|&t| self.states[t].as_str()).collect())
    }

    pub fn labels(&self, name: &str) -> Result<&BTreeSet<String>> {
        let i = self.lookup(name)?;
        Ok(&self.labels[i])
    }

    pub fn propositions(&self) -> &BTreeSet<String> {
        &self.propositions
    }

    /// States carrying the atomic proposition, in declaration order.
    pub fn states_with(&self, proposition: &str) -> Vec<&str> {
        self.states
            .iter()
            .zip(&self.labels)
            .filter(|(_, labels)| labels.contains(proposition))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn num_transitions(&self) -> usize {
        self.successors.iter().map(|s| s.len()).sum()
    }

    /// Reject empty systems, dead ends, and (unless `require_initial` is unset) systems
    /// without initial states.
    pub fn validate(&self, require_initial: bool) -> Result<()> {
        if self.states.is_empty() {
            return Err(Error::InvalidTransitionSystem("no states".to_string()));
        }
        if require_initial && self.initial.is_empty() {
            return Err(Error::InvalidTransitionSystem("no initial states".to_string()));
        }
        for (i, succ) in self.successors.iter().enumerate() {
            if succ.is_empty() {
                return Err(Error::InvalidTransitionSystem(format!(
                    "state `{}` has no outgoing transitions and is not terminal",
                    self.states[i]
                )));
            }
        }
        Ok(())
    }
}

impl Display for TransitionSystem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "TransitionSystem({:?}, {} states, {} transitions)",
            self.owner,
            self.num_states(),
            self.num_transitions()
        )?;
        for (i, name) in self.states.iter().enumerate() {
            let marker = if self.initial.contains(&i) { "->" } else { "  " };
            let succ = self.successors[i]
                .iter()
                .map(|&t| self.states[t].as_str())
                .collect::<Vec<_>>();
            let labels = self.labels[i].iter().map(|s| s.as_str()).collect::<Vec<_>>();
            writeln!(f, "{} {} {{{}}} -> [{}]", marker, name, labels.join(", "), succ.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn square() -> TransitionSystem {
        let mut ts = TransitionSystem::new(Owner::Sys);
        ts.add_states_from(["X0", "X1", "X2", "X3"]);
        ts.add_transitions_from([
            ("X0", "X1"),
            ("X1", "X0"),
            ("X1", "X3"),
            ("X3", "X1"),
            ("X3", "X2"),
            ("X2", "X3"),
            ("X2", "X0"),
            ("X0", "X2"),
        ])
        .unwrap();
        ts.set_initial(["X0"]).unwrap();
        ts
    }

    #[test]
    fn test_build() {
        let mut ts = square();
        ts.label("X0", ["home"]).unwrap();
        ts.label("X3", ["goal"]).unwrap();

        assert_eq!(ts.num_states(), 4);
        assert_eq!(ts.num_transitions(), 8);
        assert_eq!(ts.successors("X0").unwrap(), vec!["X1", "X2"]);
        assert_eq!(ts.initial_states(), vec!["X0"]);
        assert!(ts.is_initial("X0"));
        assert_eq!(ts.states_with("home"), vec!["X0"]);
        assert!(ts.propositions().contains("goal"));
        assert_eq!(ts.owner().partition(), Partition::Sys);
        ts.validate(true).unwrap();
    }

    #[test]
    fn test_add_state_is_idempotent() {
        let mut ts = TransitionSystem::new(Owner::Env);
        assert_eq!(ts.add_state("a"), 0);
        assert_eq!(ts.add_state("b"), 1);
        assert_eq!(ts.add_state("a"), 0);
        assert_eq!(ts.num_states(), 2);
    }

    #[test]
    fn test_unknown_state() {
        let mut ts = square();
        assert!(matches!(
            ts.add_transition("X0", "X9"),
            Err(Error::InvalidTransitionSystem(_))
        ));
        assert!(matches!(ts.label("nowhere", ["p"]), Err(Error::InvalidTransitionSystem(_))));
        assert!(matches!(ts.set_initial(["Y"]), Err(Error::InvalidTransitionSystem(_))));
    }

    #[test]
    fn test_dead_end_and_terminal() {
        let mut ts = TransitionSystem::new(Owner::Sys);
        ts.add_states_from(["a", "b"]);
        ts.add_transition("a", "b").unwrap();
        ts.set_initial(["a"]).unwrap();
        assert!(ts.validate(true).is_err());

        ts.mark_terminal("b").unwrap();
        assert!(ts.is_terminal("b"));
        assert_eq!(ts.successors("b").unwrap(), vec!["b"]);
        ts.validate(true).unwrap();
    }

    #[test]
    fn test_missing_initial() {
        let mut ts = TransitionSystem::new(Owner::Sys);
        ts.add_state("a");
        ts.add_transition("a", "a").unwrap();
        assert!(ts.validate(true).is_err());
        ts.validate(false).unwrap();
        assert!(TransitionSystem::new(Owner::Sys).validate(false).is_err());
    }
}
