//! Compiled game arena.
//!
//! [`Arena::compile`] turns a [`Gr1Spec`] into BDDs over a fresh [`StateSpace`]. All
//! compile-time errors are raised here, before any fixed-point work.
//!
//! The safety predicates of each player are conjoined into a transition relation over
//! current and next-state bits. A predicate without next-state references constrains the
//! state a move starts from.

use log::info;

use crate::bdd::Bdd;
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::reference::Ref;
use crate::space::{Partition, StateSpace};
use crate::spec::{ControllerKind, Gr1Spec, Quantification};

#[derive(Debug)]
pub struct Arena {
    space: StateSpace,
    controller: ControllerKind,
    quantification: Quantification,
    valid: Ref,
    env_init: Ref,
    sys_init: Ref,
    env_trans: Ref,
    sys_trans: Ref,
    env_prog: Vec<Ref>,
    sys_prog: Vec<Ref>,
    env_next: Ref,
    sys_next: Ref,
}

fn check_no_next(e: &Expr, what: &str) -> Result<()> {
    if e.has_next() {
        return Err(Error::malformed(e, format!("next-state reference in {}", what)));
    }
    Ok(())
}

impl Arena {
    pub fn compile(spec: &Gr1Spec) -> Result<Self> {
        let space = StateSpace::new(spec.env_vars(), spec.sys_vars())?;

        for e in spec.env_init_predicates().iter().chain(spec.sys_init_predicates()) {
            check_no_next(e, "an initial condition")?;
        }
        for e in spec.env_prog_goals().iter().chain(spec.sys_prog_goals()) {
            check_no_next(e, "a progress goal")?;
        }
        for e in spec.env_init_predicates() {
            if let Some((name, _)) = e.references().into_iter().find(|(name, _)| spec.sys_vars().contains_key(name)) {
                return Err(Error::malformed(
                    e,
                    format!("environment initial condition references system variable `{}`", name),
                ));
            }
        }
        if spec.controller() == ControllerKind::Mealy {
            for e in spec.env_safety_predicates() {
                let found = e
                    .references()
                    .into_iter()
                    .find(|(name, next)| *next && spec.sys_vars().contains_key(name));
                if let Some((name, _)) = found {
                    return Err(Error::malformed(
                        e,
                        format!(
                            "environment safety references next-step system variable `{}` in a Mealy specification",
                            name
                        ),
                    ));
                }
            }
        }

        let bdd = space.bdd();
        let conj = |items: &[Expr]| -> Result<Ref> {
            let mut res = bdd.one();
            for e in items {
                res = bdd.apply_and(res, space.compile(e)?);
            }
            Ok(res)
        };
        let each = |items: Vec<Expr>| -> Result<Vec<Ref>> { items.iter().map(|e| space.compile(e)).collect() };

        let valid = space.valid(None, false);
        let env_init = bdd.apply_and(conj(spec.env_init_predicates())?, space.valid(Some(Partition::Env), false));
        let sys_init = bdd.apply_and(conj(spec.sys_init_predicates())?, space.valid(Some(Partition::Sys), false));
        let env_trans = bdd.apply_and(conj(spec.env_safety_predicates())?, space.valid(Some(Partition::Env), true));
        let sys_trans = bdd.apply_and(conj(spec.sys_safety_predicates())?, space.valid(Some(Partition::Sys), true));
        let env_prog = each(spec.effective_env_prog())?;
        let sys_prog = each(spec.effective_sys_prog())?;
        let env_next = space.var_set(Some(Partition::Env), true);
        let sys_next = space.var_set(Some(Partition::Sys), true);

        info!(
            "Compiled arena: {} env vars, {} sys vars, {} state bits, {} env goals, {} sys goals, {} BDD nodes",
            spec.env_vars().len(),
            spec.sys_vars().len(),
            space.num_bits(),
            env_prog.len(),
            sys_prog.len(),
            bdd.num_nodes()
        );

        Ok(Self {
            controller: spec.controller(),
            quantification: spec.quantification(),
            valid,
            env_init,
            sys_init,
            env_trans,
            sys_trans,
            env_prog,
            sys_prog,
            env_next,
            sys_next,
            space,
        })
    }

    pub fn space(&self) -> &StateSpace {
        &self.space
    }
    pub fn bdd(&self) -> &Bdd {
        self.space.bdd()
    }
    pub fn controller(&self) -> ControllerKind {
        self.controller
    }
    pub fn quantification(&self) -> Quantification {
        self.quantification
    }
    /// All states with in-range values.
    pub fn valid(&self) -> Ref {
        self.valid
    }
    pub fn env_init(&self) -> Ref {
        self.env_init
    }
    pub fn sys_init(&self) -> Ref {
        self.sys_init
    }
    /// Environment transition relation (safety constraints of the environment).
    pub fn env_trans(&self) -> Ref {
        self.env_trans
    }
    /// System transition relation (safety constraints of the system).
    pub fn sys_trans(&self) -> Ref {
        self.sys_trans
    }
    pub fn env_prog(&self) -> &[Ref] {
        &self.env_prog
    }
    pub fn sys_prog(&self) -> &[Ref] {
        &self.sys_prog
    }
    pub fn env_next(&self) -> Ref {
        self.env_next
    }
    pub fn sys_next(&self) -> Ref {
        self.sys_next
    }

    /// Controllable predecessor: states from which the system forces the play into `target`
    /// in one step, whatever legal move the environment makes.
    ///
    /// ```text
    /// Mealy: forall x'. (rho_e -> exists y'. (rho_s && target'))
    /// Moore: exists y'. forall x'. (rho_e -> (rho_s && target'))
    /// ```
    pub fn cpre(&self, target: Ref) -> Ref {
        let bdd = self.bdd();
        let next = self.space.prime(target);
        let res = match self.controller {
            ControllerKind::Mealy => {
                let sys_move = bdd.and_exists(self.sys_trans, next, self.sys_next);
                let f = bdd.apply_imply(self.env_trans, sys_move);
                bdd.forall(f, self.env_next)
            }
            ControllerKind::Moore => {
                let sys_move = bdd.apply_and(self.sys_trans, next);
                let f = bdd.apply_imply(self.env_trans, sys_move);
                let g = bdd.forall(f, self.env_next);
                bdd.exists(g, self.sys_next)
            }
        };
        bdd.apply_and(res, self.valid)
    }

    /// Whether the initial condition holds for the winning region `win`, under the
    /// quantification mode of the specification.
    pub fn initial_condition_holds(&self, win: Ref) -> bool {
        let bdd = self.bdd();
        match self.quantification {
            Quantification::ForallEnvExistsSys | Quantification::ForallEnvForallSys => {
                bdd.is_zero(self.bad_initial(win))
            }
            Quantification::ExistsSysForallEnv | Quantification::ExistsEnvExistsSys => {
                !bdd.is_zero(self.initial_choice(win))
            }
        }
    }

    /// Initial choices that satisfy the existential quantification modes.
    ///
    /// Over sys bits for [`Quantification::ExistsSysForallEnv`] (outputs that work for every
    /// initial input), over all bits for [`Quantification::ExistsEnvExistsSys`], and empty
    /// otherwise.
    pub fn initial_choice(&self, win: Ref) -> Ref {
        let bdd = self.bdd();
        match self.quantification {
            Quantification::ExistsSysForallEnv => {
                let env_cur = self.space.var_set(Some(Partition::Env), false);
                let f = bdd.apply_imply(self.env_init, bdd.apply_and(self.sys_init, win));
                bdd.apply_and(bdd.forall(f, env_cur), self.sys_valid())
            }
            Quantification::ExistsEnvExistsSys => {
                let init = bdd.apply_and(self.env_init, self.sys_init);
                bdd.apply_and(init, win)
            }
            _ => bdd.zero(),
        }
    }

    fn sys_valid(&self) -> Ref {
        self.space.valid(Some(Partition::Sys), false)
    }

    /// Initial states the system fails to handle, for the universal quantification modes.
    ///
    /// Over env bits for [`Quantification::ForallEnvExistsSys`], over all bits for
    /// [`Quantification::ForallEnvForallSys`], and empty otherwise.
    pub fn bad_initial(&self, win: Ref) -> Ref {
        let bdd = self.bdd();
        match self.quantification {
            Quantification::ForallEnvExistsSys => {
                let sys_cur = self.space.var_set(Some(Partition::Sys), false);
                let ok = bdd.and_exists(self.sys_init, win, sys_cur);
                bdd.apply_and(self.env_init, bdd.apply_not(ok))
            }
            Quantification::ForallEnvForallSys => {
                let init = bdd.apply_and(self.env_init, self.sys_init);
                bdd.apply_and(init, bdd.apply_not(win))
            }
            _ => bdd.zero(),
        }
    }
}
