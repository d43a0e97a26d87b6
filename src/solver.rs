//! GR(1) game solving.
//!
//! [`FixpointSolver`] computes the winning region with the nested fixed point
//!
//! ```text
//! Z = nu Z. /\_j mu Y. \/_i nu X. (J_s[j] && cpre(Z)) || cpre(Y) || (!J_e[i] && cpre(X))
//! ```
//!
//! keeping, for every system goal `j`, the rings `Y_1 <= Y_2 <= ...` of the least fixed
//! point and the sets `X_{r,i}` they are made of. The rings drive strategy extraction.
//!
//! Negative answers are values, not errors: see [`Outcome`].

use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

use log::{debug, info};
use num_bigint::BigUint;

use crate::arena::Arena;
use crate::error::Result;
use crate::reference::Ref;
use crate::space::{format_valuation, Partition, Valuation};
use crate::spec::{Gr1Spec, Quantification};
use crate::strategy::{self, Strategy};

/// Limits on a synthesis run. `None` means unlimited.
#[derive(Debug, Clone, Default)]
pub struct Budget {
    /// Maximum number of innermost fixed-point iterations.
    pub max_iterations: Option<usize>,
    /// Maximum wall-clock time spent in the fixed point.
    pub time_limit: Option<Duration>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations: Some(max_iterations),
            ..Default::default()
        }
    }

    fn exceeded(&self, iterations: usize, elapsed: Duration) -> bool {
        self.max_iterations.is_some_and(|max| iterations > max) || self.time_limit.is_some_and(|limit| elapsed > limit)
    }
}

/// The specification is not realizable.
#[derive(Debug, Clone)]
pub struct Unrealizable {
    /// Total number of innermost fixed-point iterations.
    pub iterations: usize,
    /// The system goal whose fixed point first excluded the required initial states.
    pub goal: Option<usize>,
    /// An initial valuation the system cannot handle, when the quantification mode has one.
    pub counterexample: Option<Valuation>,
    /// Size of the final winning region.
    pub winning_states: BigUint,
}

impl Display for Unrealizable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unrealizable after {} iterations ({} winning states",
            self.iterations, self.winning_states
        )?;
        if let Some(goal) = self.goal {
            write!(f, ", lost at system goal {}", goal)?;
        }
        if let Some(cex) = &self.counterexample {
            write!(f, ", losing initial state {{{}}}", format_valuation(cex))?;
        }
        write!(f, ")")
    }
}

/// The budget ran out before the fixed point converged.
#[derive(Debug, Clone)]
pub struct SynthesisTimeout {
    pub iterations: usize,
    pub elapsed: Duration,
}

impl Display for SynthesisTimeout {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "synthesis budget exceeded after {} iterations ({:?})",
            self.iterations, self.elapsed
        )
    }
}

#[derive(Debug)]
pub enum Outcome {
    Realizable(Strategy),
    Unrealizable(Unrealizable),
    Timeout(SynthesisTimeout),
}

impl Outcome {
    pub fn is_realizable(&self) -> bool {
        matches!(self, Outcome::Realizable(_))
    }

    pub fn strategy(&self) -> Option<&Strategy> {
        match self {
            Outcome::Realizable(strategy) => Some(strategy),
            _ => None,
        }
    }

    pub fn into_strategy(self) -> Option<Strategy> {
        match self {
            Outcome::Realizable(strategy) => Some(strategy),
            _ => None,
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Realizable(strategy) => write!(f, "realizable ({} strategy states)", strategy.num_states()),
            Outcome::Unrealizable(u) => write!(f, "{}", u),
            Outcome::Timeout(t) => write!(f, "{}", t),
        }
    }
}

/// Fixed-point rings of one system goal.
#[derive(Debug, Clone, Default)]
pub struct GoalRings {
    /// `Y_1 <= Y_2 <= ... <= Y_R`.
    pub y: Vec<Ref>,
    /// `x[r][i]` is `X_{r+1,i}`.
    pub x: Vec<Vec<Ref>>,
}

impl GoalRings {
    /// Smallest ring index containing some state of `cube`.
    pub fn rank(&self, arena: &Arena, cube: Ref) -> Option<usize> {
        let bdd = arena.bdd();
        self.y.iter().position(|&y| !bdd.is_zero(bdd.apply_and(y, cube)))
    }
}

/// Output of the fixed-point computation.
#[derive(Debug, Clone)]
pub struct WinningRegion {
    /// The winning region `Z`.
    pub z: Ref,
    /// Rings of each system goal, from the last (converged) outer iteration.
    pub rings: Vec<GoalRings>,
    /// `(outer iteration, goal, Z after that goal)`, in computation order.
    pub history: Vec<(usize, usize, Ref)>,
    /// Total number of innermost iterations.
    pub iterations: usize,
}

impl WinningRegion {
    /// The system goal whose update of `Z` first broke the initial condition.
    pub fn losing_goal(&self, arena: &Arena) -> Option<usize> {
        self.history
            .iter()
            .find(|&&(_, _, z)| !arena.initial_condition_holds(z))
            .map(|&(_, j, _)| j)
    }
}

/// A GR(1) game solving backend.
pub trait Solver {
    fn solve(&self, arena: &Arena) -> Outcome;
}

/// Symbolic nested fixed-point solver.
#[derive(Debug, Clone, Default)]
pub struct FixpointSolver {
    pub budget: Budget,
}

impl FixpointSolver {
    pub fn new(budget: Budget) -> Self {
        Self { budget }
    }

    /// Compute the winning region and the rings of every system goal.
    pub fn winning_region(&self, arena: &Arena) -> std::result::Result<WinningRegion, SynthesisTimeout> {
        let bdd = arena.bdd();
        let start = Instant::now();
        let valid = arena.valid();
        let not_env_goals = arena
            .env_prog()
            .iter()
            .map(|&g| bdd.apply_and(bdd.apply_not(g), valid))
            .collect::<Vec<_>>();

        let mut iterations = 0;
        let mut history = Vec::new();
        let mut rings = vec![GoalRings::default(); arena.sys_prog().len()];
        let mut z = valid;
        let mut outer = 0;

        loop {
            outer += 1;
            let z_old = z;

            for (j, &goal) in arena.sys_prog().iter().enumerate() {
                let reach_goal = bdd.apply_and(goal, arena.cpre(z));
                let mut goal_rings = GoalRings::default();
                let mut y = bdd.zero();

                loop {
                    let base = bdd.apply_or(reach_goal, arena.cpre(y));
                    let mut y_new = bdd.zero();
                    let mut xs = Vec::with_capacity(not_env_goals.len());

                    for &not_env_goal in &not_env_goals {
                        let mut x = valid;
                        loop {
                            iterations += 1;
                            if self.budget.exceeded(iterations, start.elapsed()) {
                                return Err(SynthesisTimeout {
                                    iterations,
                                    elapsed: start.elapsed(),
                                });
                            }
                            let x_new = bdd.apply_or(base, bdd.apply_and(not_env_goal, arena.cpre(x)));
                            if x_new == x {
                                break;
                            }
                            x = x_new;
                        }
                        xs.push(x);
                        y_new = bdd.apply_or(y_new, x);
                    }

                    if y_new == y {
                        break;
                    }
                    y = y_new;
                    goal_rings.y.push(y);
                    goal_rings.x.push(xs);
                }

                debug!(
                    "Iteration {}, goal {}: {} rings, {} states",
                    outer,
                    j,
                    goal_rings.y.len(),
                    arena.space().count_states(y)
                );
                z = y;
                history.push((outer, j, z));
                rings[j] = goal_rings;
            }

            if z == z_old {
                break;
            }
        }

        info!(
            "Winning region: {} states after {} outer and {} total iterations ({:?})",
            arena.space().count_states(z),
            outer,
            iterations,
            start.elapsed()
        );

        Ok(WinningRegion {
            z,
            rings,
            history,
            iterations,
        })
    }

    fn counterexample(&self, arena: &Arena, region: &WinningRegion) -> Option<Valuation> {
        let bad = arena.bad_initial(region.z);
        match arena.quantification() {
            Quantification::ForallEnvExistsSys => arena.space().pick(bad, Some(Partition::Env), false),
            Quantification::ForallEnvForallSys => arena.space().pick(bad, None, false),
            _ => None,
        }
    }
}

impl Solver for FixpointSolver {
    fn solve(&self, arena: &Arena) -> Outcome {
        let region = match self.winning_region(arena) {
            Ok(region) => region,
            Err(timeout) => {
                info!("{}", timeout);
                return Outcome::Timeout(timeout);
            }
        };

        if !arena.initial_condition_holds(region.z) {
            let unrealizable = Unrealizable {
                iterations: region.iterations,
                goal: region.losing_goal(arena),
                counterexample: self.counterexample(arena, &region),
                winning_states: arena.space().count_states(region.z),
            };
            info!("{}", unrealizable);
            return Outcome::Unrealizable(unrealizable);
        }

        let strategy = strategy::extract(arena, &region);
        info!(
            "Realizable: strategy with {} states and {} transitions",
            strategy.num_states(),
            strategy.num_transitions()
        );
        Outcome::Realizable(strategy)
    }
}

/// Compile `spec` and solve it with the default [`FixpointSolver`].
pub fn synthesize(spec: &Gr1Spec) -> Result<Outcome> {
    synthesize_with(spec, &FixpointSolver::default())
}

/// Compile `spec` and solve it with the given backend.
pub fn synthesize_with(spec: &Gr1Spec, solver: &dyn Solver) -> Result<Outcome> {
    let arena = Arena::compile(spec)?;
    Ok(solver.solve(&arena))
}
