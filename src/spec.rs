//! GR(1) specifications.
//!
//! A [`Gr1Spec`] is a plain value: variable declarations for both players, six predicate
//! sets, and two flags. Specifications are assembled with consuming builder methods and
//! combined with [`Gr1Spec::compose`], which returns a new value and leaves its operands
//! untouched.
//!
//! The winning condition is
//!
//! ```text
//! (env_init -> sys_init) && (G env_safety && GF env_prog -> G sys_safety && GF sys_prog)
//! ```
//!
//! with the initial condition quantified as described by [`Quantification`].

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::space::{Domain, Partition};

/// When the system commits to its output.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum ControllerKind {
    /// The output is chosen before the current input is seen.
    Moore,
    /// The output may react to the current input.
    #[default]
    Mealy,
}

/// Quantification of the initial condition.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Quantification {
    /// `\A \E`: for every initial input satisfying `env_init` the system picks an initial
    /// output satisfying `sys_init` from which it wins.
    #[default]
    ForallEnvExistsSys,
    /// `\E \A`: a single initial output wins against every initial input satisfying `env_init`.
    ExistsSysForallEnv,
    /// `\A \A`: every pair satisfying both initial conditions is winning.
    ForallEnvForallSys,
    /// `\E \E`: some pair satisfying both initial conditions is winning.
    ExistsEnvExistsSys,
}

impl Display for Quantification {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Quantification::ForallEnvExistsSys => r"\A \E",
            Quantification::ExistsSysForallEnv => r"\E \A",
            Quantification::ForallEnvForallSys => r"\A \A",
            Quantification::ExistsEnvExistsSys => r"\E \E",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Gr1Spec {
    env_vars: BTreeMap<String, Domain>,
    sys_vars: BTreeMap<String, Domain>,
    env_init: Vec<Expr>,
    sys_init: Vec<Expr>,
    env_safety: Vec<Expr>,
    sys_safety: Vec<Expr>,
    env_prog: Vec<Expr>,
    sys_prog: Vec<Expr>,
    controller: ControllerKind,
    quantification: Quantification,
}

fn push_unique(items: &mut Vec<Expr>, e: Expr) {
    if !items.contains(&e) {
        items.push(e);
    }
}

impl Gr1Spec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a variable in the given partition.
    ///
    /// Re-declaring a variable with the same domain in the same partition is allowed;
    /// anything else is a [`Error::VariableCollision`].
    pub fn declare(mut self, partition: Partition, name: impl Into<String>, domain: Domain) -> Result<Self> {
        let name = name.into();
        let (own, other) = match partition {
            Partition::Env => (&mut self.env_vars, &self.sys_vars),
            Partition::Sys => (&mut self.sys_vars, &self.env_vars),
        };
        if other.contains_key(&name) {
            return Err(Error::collision(name, "declared as both env and sys variable"));
        }
        match own.get(&name) {
            Some(&existing) if existing != domain => {
                return Err(Error::collision(
                    name,
                    format!("declared with domains {} and {}", existing, domain),
                ));
            }
            _ => {
                own.insert(name, domain);
            }
        }
        Ok(self)
    }

    pub fn env_var(self, name: impl Into<String>, domain: Domain) -> Result<Self> {
        self.declare(Partition::Env, name, domain)
    }

    pub fn sys_var(self, name: impl Into<String>, domain: Domain) -> Result<Self> {
        self.declare(Partition::Sys, name, domain)
    }

    pub fn env_init(mut self, e: Expr) -> Self {
        push_unique(&mut self.env_init, e);
        self
    }

    pub fn sys_init(mut self, e: Expr) -> Self {
        push_unique(&mut self.sys_init, e);
        self
    }

    pub fn env_safety(mut self, e: Expr) -> Self {
        push_unique(&mut self.env_safety, e);
        self
    }

    pub fn sys_safety(mut self, e: Expr) -> Self {
        push_unique(&mut self.sys_safety, e);
        self
    }

    pub fn env_prog(mut self, e: Expr) -> Self {
        push_unique(&mut self.env_prog, e);
        self
    }

    pub fn sys_prog(mut self, e: Expr) -> Self {
        push_unique(&mut self.sys_prog, e);
        self
    }

    pub fn set_controller(mut self, controller: ControllerKind) -> Self {
        self.controller = controller;
        self
    }

    pub fn set_quantification(mut self, quantification: Quantification) -> Self {
        self.quantification = quantification;
        self
    }

    /// Field-wise union of two specifications.
    ///
    /// Predicates keep their order, `self` first, with duplicates dropped. The controller
    /// kind and quantification mode are taken from `self`.
    pub fn compose(&self, other: &Gr1Spec) -> Result<Gr1Spec> {
        let mut res = self.clone();
        for (name, &domain) in &other.env_vars {
            res = res.env_var(name.as_str(), domain)?;
        }
        for (name, &domain) in &other.sys_vars {
            res = res.sys_var(name.as_str(), domain)?;
        }
        let fields = [
            (&mut res.env_init, &other.env_init),
            (&mut res.sys_init, &other.sys_init),
            (&mut res.env_safety, &other.env_safety),
            (&mut res.sys_safety, &other.sys_safety),
            (&mut res.env_prog, &other.env_prog),
            (&mut res.sys_prog, &other.sys_prog),
        ];
        for (own, theirs) in fields {
            for e in theirs {
                push_unique(own, e.clone());
            }
        }
        Ok(res)
    }

    pub fn env_vars(&self) -> &BTreeMap<String, Domain> {
        &self.env_vars
    }
    pub fn sys_vars(&self) -> &BTreeMap<String, Domain> {
        &self.sys_vars
    }
    pub fn env_init_predicates(&self) -> &[Expr] {
        &self.env_init
    }
    pub fn sys_init_predicates(&self) -> &[Expr] {
        &self.sys_init
    }
    pub fn env_safety_predicates(&self) -> &[Expr] {
        &self.env_safety
    }
    pub fn sys_safety_predicates(&self) -> &[Expr] {
        &self.sys_safety
    }
    pub fn env_prog_goals(&self) -> &[Expr] {
        &self.env_prog
    }
    pub fn sys_prog_goals(&self) -> &[Expr] {
        &self.sys_prog
    }
    pub fn controller(&self) -> ControllerKind {
        self.controller
    }
    pub fn quantification(&self) -> Quantification {
        self.quantification
    }

    /// Environment goals, `{true}` when none were given.
    pub fn effective_env_prog(&self) -> Vec<Expr> {
        if self.env_prog.is_empty() {
            vec![Expr::Bool(true)]
        } else {
            self.env_prog.clone()
        }
    }

    /// System goals, `{true}` when none were given.
    pub fn effective_sys_prog(&self) -> Vec<Expr> {
        if self.sys_prog.is_empty() {
            vec![Expr::Bool(true)]
        } else {
            self.sys_prog.clone()
        }
    }
}

fn write_section(f: &mut Formatter<'_>, title: &str, items: &[Expr]) -> std::fmt::Result {
    writeln!(f, "{}:", title)?;
    for e in items {
        writeln!(f, "  {}", e)?;
    }
    Ok(())
}

impl Display for Gr1Spec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "ENVIRONMENT VARIABLES:")?;
        for (name, domain) in &self.env_vars {
            writeln!(f, "  {}: {}", name, domain)?;
        }
        writeln!(f, "SYSTEM VARIABLES:")?;
        for (name, domain) in &self.sys_vars {
            writeln!(f, "  {}: {}", name, domain)?;
        }
        write_section(f, "ENV INIT", &self.env_init)?;
        write_section(f, "SYS INIT", &self.sys_init)?;
        write_section(f, "ENV SAFETY", &self.env_safety)?;
        write_section(f, "SYS SAFETY", &self.sys_safety)?;
        write_section(f, "ENV PROGRESS", &self.env_prog)?;
        write_section(f, "SYS PROGRESS", &self.sys_prog)?;
        writeln!(f, "CONTROLLER: {:?}", self.controller)?;
        write!(f, "QUANTIFICATION: {}", self.quantification)
    }
}
