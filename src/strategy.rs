//! Strategy automata.
//!
//! A [`Strategy`] is an explicit finite transducer. Each strategy state is a full valuation
//! of the game variables together with the index of the system goal currently pursued.
//! Transitions are keyed by the next input valuation and carry the output chosen in
//! response.
//!
//! Extraction explores the reachable part of the winning region breadth-first. At each
//! strategy state the output is the lexicographically least one that moves the play into
//! the first reachable target of:
//!
//! 1. the current goal (within the winning region);
//! 2. a lower ring of the current goal, smallest ring first;
//! 3. the set `X_{r,i}` of the current ring, for the smallest `i` containing the state;
//! 4. the winning region.
//!
//! The goal counter advances when the successor satisfies the current goal.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt::{Display, Formatter};

use log::debug;

use crate::arena::Arena;
use crate::reference::Ref;
use crate::solver::WinningRegion;
use crate::space::{format_valuation, Partition, Valuation};
use crate::spec::{ControllerKind, Quantification};

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct StrategyState {
    /// Values of all environment and system variables.
    pub valuation: Valuation,
    /// Index of the system goal currently pursued.
    pub goal: usize,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Transition {
    pub input: Valuation,
    pub output: Valuation,
    pub target: usize,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Strategy {
    controller: ControllerKind,
    env_vars: Vec<String>,
    sys_vars: Vec<String>,
    states: Vec<StrategyState>,
    initial: Vec<usize>,
    transitions: Vec<Vec<Transition>>,
}

impl Strategy {
    pub fn controller(&self) -> ControllerKind {
        self.controller
    }

    pub fn env_vars(&self) -> &[String] {
        &self.env_vars
    }

    pub fn sys_vars(&self) -> &[String] {
        &self.sys_vars
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_transitions(&self) -> usize {
        self.transitions.iter().map(|t| t.len()).sum()
    }

    pub fn states(&self) -> &[StrategyState] {
        &self.states
    }

    pub fn state(&self, id: usize) -> &StrategyState {
        &self.states[id]
    }

    pub fn initial_states(&self) -> &[usize] {
        &self.initial
    }

    /// Outgoing transitions of a state, ordered by input.
    pub fn transitions(&self, id: usize) -> &[Transition] {
        &self.transitions[id]
    }

    /// React to `input` in state `id`: the chosen output and the next state.
    pub fn step(&self, id: usize, input: &Valuation) -> Option<(&Valuation, usize)> {
        self.transitions[id]
            .iter()
            .find(|t| &t.input == input)
            .map(|t| (&t.output, t.target))
    }

    /// The initial state matching the given initial input.
    pub fn initial_for(&self, input: &Valuation) -> Option<usize> {
        self.initial.iter().copied().find(|&id| {
            let valuation = &self.states[id].valuation;
            input.iter().all(|(name, value)| valuation.get(name) == Some(value))
        })
    }

    /// States reachable from the initial states, in increasing order.
    pub fn reachable_states(&self) -> Vec<usize> {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::from_iter(self.initial.iter().copied());
        while let Some(id) = queue.pop_front() {
            if visited.insert(id) {
                queue.extend(self.transitions[id].iter().map(|t| t.target));
            }
        }
        visited.into_iter().collect()
    }

    /// Run the strategy for at most `steps` steps from `start`, letting `choose` pick the
    /// environment move (an index into the offered transitions). Returns the visited states,
    /// `start` included; the run stops early in a state without legal inputs.
    pub fn simulate(&self, start: usize, steps: usize, mut choose: impl FnMut(&[Transition]) -> usize) -> Vec<usize> {
        let mut trace = vec![start];
        let mut current = start;
        for _ in 0..steps {
            let moves = &self.transitions[current];
            if moves.is_empty() {
                break;
            }
            let k = choose(moves).min(moves.len() - 1);
            current = moves[k].target;
            trace.push(current);
        }
        trace
    }
}

impl Display for Strategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Strategy ({:?}, {} states, {} transitions)",
            self.controller,
            self.num_states(),
            self.num_transitions()
        )?;
        for (id, state) in self.states.iter().enumerate() {
            let initial = if self.initial.contains(&id) { " (initial)" } else { "" };
            writeln!(
                f,
                "State {} [goal {}]{}: {}",
                id,
                state.goal,
                initial,
                format_valuation(&state.valuation)
            )?;
            for t in &self.transitions[id] {
                writeln!(
                    f,
                    "  {{{}}} / {{{}}} -> {}",
                    format_valuation(&t.input),
                    format_valuation(&t.output),
                    t.target
                )?;
            }
        }
        Ok(())
    }
}

/// Initial valuations admitted by the quantification mode, given the winning region `win`.
pub fn initial_valuations(arena: &Arena, win: Ref) -> Vec<Valuation> {
    let space = arena.space();
    let bdd = arena.bdd();
    let env_cur = space.var_set(Some(Partition::Env), false);

    match arena.quantification() {
        Quantification::ForallEnvExistsSys => {
            let options = bdd.apply_and(arena.sys_init(), win);
            space
                .enumerate(arena.env_init(), Some(Partition::Env), false)
                .into_iter()
                .filter_map(|input| {
                    let f = bdd.and_exists(options, space.state_cube(&input, false), env_cur);
                    let output = space.pick(f, Some(Partition::Sys), false)?;
                    let mut valuation = input;
                    valuation.extend(output);
                    Some(valuation)
                })
                .collect()
        }
        Quantification::ExistsSysForallEnv => {
            let Some(output) = space.pick(arena.initial_choice(win), Some(Partition::Sys), false) else {
                return Vec::new();
            };
            space
                .enumerate(arena.env_init(), Some(Partition::Env), false)
                .into_iter()
                .map(|mut valuation| {
                    valuation.extend(output.clone());
                    valuation
                })
                .collect()
        }
        Quantification::ForallEnvForallSys => {
            let init = bdd.apply_and(arena.env_init(), arena.sys_init());
            space.enumerate(bdd.apply_and(init, win), None, false)
        }
        Quantification::ExistsEnvExistsSys => space.pick(arena.initial_choice(win), None, false).into_iter().collect(),
    }
}

/// Primed targets of one goal, precomputed once per extraction.
struct GoalTargets {
    goal: Ref,
    y: Vec<Ref>,
    x: Vec<Vec<Ref>>,
}

struct Extractor<'a> {
    arena: &'a Arena,
    region: &'a WinningRegion,
    targets: Vec<GoalTargets>,
    win: Ref,
    cur_cube: Ref,
    sys_next_valid: Ref,
    states: Vec<StrategyState>,
    index: HashMap<StrategyState, usize>,
    transitions: Vec<Vec<Transition>>,
    queue: VecDeque<usize>,
}

impl<'a> Extractor<'a> {
    fn new(arena: &'a Arena, region: &'a WinningRegion) -> Self {
        let space = arena.space();
        let bdd = arena.bdd();
        let targets = arena
            .sys_prog()
            .iter()
            .zip(&region.rings)
            .map(|(&goal, rings)| GoalTargets {
                goal: space.prime(bdd.apply_and(goal, region.z)),
                y: rings.y.iter().map(|&y| space.prime(y)).collect(),
                x: rings
                    .x
                    .iter()
                    .map(|xs| xs.iter().map(|&x| space.prime(x)).collect())
                    .collect(),
            })
            .collect();

        Self {
            arena,
            region,
            targets,
            win: space.prime(region.z),
            cur_cube: space.var_set(None, false),
            sys_next_valid: space.valid(Some(Partition::Sys), true),
            states: Vec::new(),
            index: HashMap::new(),
            transitions: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    fn intern(&mut self, valuation: Valuation, goal: usize) -> usize {
        let state = StrategyState { valuation, goal };
        if let Some(&id) = self.index.get(&state) {
            return id;
        }
        let id = self.states.len();
        self.index.insert(state.clone(), id);
        self.states.push(state);
        self.transitions.push(Vec::new());
        self.queue.push_back(id);
        id
    }

    /// Primed targets for a state `cur` pursuing goal `j`, in order of preference.
    fn targets(&self, cur: Ref, j: usize) -> Vec<Ref> {
        let bdd = self.arena.bdd();
        let rings = &self.region.rings[j];
        let primed = &self.targets[j];

        let mut res = vec![primed.goal];
        if let Some(r) = rings.rank(self.arena, cur) {
            res.extend_from_slice(&primed.y[..r]);
            if let Some(i) = rings.x[r].iter().position(|&x| !bdd.is_zero(bdd.apply_and(x, cur))) {
                res.push(primed.x[r][i]);
            }
        }
        res.push(self.win);
        res
    }

    fn mealy_moves(&self, cur: Ref, targets: &[Ref]) -> Vec<(Valuation, Valuation)> {
        let arena = self.arena;
        let space = arena.space();
        let bdd = arena.bdd();
        let not_env_next = bdd.apply_and(self.cur_cube, arena.sys_next());
        let not_sys_next = bdd.apply_and(self.cur_cube, arena.env_next());

        let legal = bdd.and_exists(arena.env_trans(), cur, not_env_next);
        let context = bdd.apply_and(arena.sys_trans(), cur);
        space
            .enumerate(legal, Some(Partition::Env), true)
            .into_iter()
            .map(|input| {
                let ctx = bdd.apply_and(context, space.state_cube(&input, true));
                let output = targets
                    .iter()
                    .find_map(|&t| space.pick(bdd.and_exists(ctx, t, not_sys_next), Some(Partition::Sys), true))
                    .unwrap_or_else(|| unreachable!("winning state without a winning move"));
                (input, output)
            })
            .collect()
    }

    fn moore_moves(&self, cur: Ref, targets: &[Ref]) -> Vec<(Valuation, Valuation)> {
        let arena = self.arena;
        let space = arena.space();
        let bdd = arena.bdd();
        let not_env_next = bdd.apply_and(self.cur_cube, arena.sys_next());

        // The output is fixed before the input is known, so different inputs may need
        // different targets: grow the target set one entry at a time.
        let output = targets
            .iter()
            .scan(bdd.zero(), |acc, &t| {
                *acc = bdd.apply_or(*acc, t);
                Some(*acc)
            })
            .find_map(|t| {
                let f = bdd.apply_imply(arena.env_trans(), bdd.apply_and(arena.sys_trans(), t));
                let f = bdd.and_exists(cur, f, self.cur_cube);
                let good = bdd.apply_and(bdd.forall(f, arena.env_next()), self.sys_next_valid);
                space.pick(good, Some(Partition::Sys), true)
            })
            .unwrap_or_else(|| unreachable!("winning state without a winning move"));

        let committed = bdd.apply_and(cur, space.state_cube(&output, true));
        let legal = bdd.and_exists(arena.env_trans(), committed, not_env_next);
        space
            .enumerate(legal, Some(Partition::Env), true)
            .into_iter()
            .map(|input| (input, output.clone()))
            .collect()
    }

    fn run(mut self) -> Strategy {
        let space = self.arena.space();
        let num_goals = self.arena.sys_prog().len();

        let mut initial = Vec::new();
        for valuation in initial_valuations(self.arena, self.region.z) {
            let id = self.intern(valuation, 0);
            if !initial.contains(&id) {
                initial.push(id);
            }
        }

        while let Some(id) = self.queue.pop_front() {
            let StrategyState { valuation, goal } = self.states[id].clone();
            let cur = space.state_cube(&valuation, false);
            let targets = self.targets(cur, goal);
            let moves = match self.arena.controller() {
                ControllerKind::Mealy => self.mealy_moves(cur, &targets),
                ControllerKind::Moore => self.moore_moves(cur, &targets),
            };

            for (input, output) in moves {
                let mut next = input.clone();
                next.extend(output.clone());
                let reached = space.holds(self.arena.sys_prog()[goal], &next, None);
                let next_goal = if reached { (goal + 1) % num_goals } else { goal };
                let target = self.intern(next, next_goal);
                self.transitions[id].push(Transition { input, output, target });
            }
        }

        let spec_vars = |partition| {
            space
                .variables()
                .iter()
                .filter(|v| v.partition == partition)
                .map(|v| v.name.clone())
                .collect::<Vec<_>>()
        };

        Strategy {
            controller: self.arena.controller(),
            env_vars: spec_vars(Partition::Env),
            sys_vars: spec_vars(Partition::Sys),
            states: self.states,
            initial,
            transitions: self.transitions,
        }
    }
}

/// Build an explicit strategy from the rings of a realizable game.
pub fn extract(arena: &Arena, region: &WinningRegion) -> Strategy {
    let strategy = Extractor::new(arena, region).run();
    debug!(
        "Extracted strategy: {} states, {} initial, {} transitions",
        strategy.num_states(),
        strategy.initial_states().len(),
        strategy.num_transitions()
    );
    strategy
}
