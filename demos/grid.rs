use clap::Parser;
use log::info;

use gr1_rs::adapter::{self, CompileOptions};
use gr1_rs::expr::Expr;
use gr1_rs::solver::{Budget, FixpointSolver, Outcome};
use gr1_rs::space::{format_valuation, Domain};
use gr1_rs::spec::{ControllerKind, Gr1Spec};
use gr1_rs::ts::{Owner, TransitionSystem};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Grid width.
    #[arg(value_name = "INT", default_value = "3")]
    width: usize,

    /// Grid height.
    #[arg(value_name = "INT", default_value = "3")]
    height: usize,

    /// Let the environment block the goal cell.
    #[clap(long)]
    obstacle: bool,

    /// Synthesize a Moore controller.
    #[clap(long)]
    moore: bool,

    /// Encode the robot position with one boolean per cell.
    #[clap(long)]
    bool_states: bool,

    /// Forbid the robot from ever leaving home.
    #[clap(long)]
    lock_home: bool,

    /// Number of simulation steps.
    #[clap(long, value_name = "INT", default_value = "20")]
    steps: usize,

    /// Iteration budget of the fixed-point solver.
    #[clap(long, value_name = "INT")]
    max_iterations: Option<usize>,

    /// Write the strategy in DOT format to this file.
    #[clap(long, value_name = "FILE")]
    dot: Option<std::path::PathBuf>,
}

fn cell(row: usize, col: usize) -> String {
    format!("r{}c{}", row, col)
}

fn grid(width: usize, height: usize) -> color_eyre::Result<TransitionSystem> {
    let mut ts = TransitionSystem::new(Owner::Sys);
    for row in 0..height {
        for col in 0..width {
            ts.add_state(cell(row, col));
        }
    }
    for row in 0..height {
        for col in 0..width {
            let here = cell(row, col);
            ts.add_transition(&here, &here)?;
            if col + 1 < width {
                ts.add_transition(&here, &cell(row, col + 1))?;
                ts.add_transition(&cell(row, col + 1), &here)?;
            }
            if row + 1 < height {
                ts.add_transition(&here, &cell(row + 1, col))?;
                ts.add_transition(&cell(row + 1, col), &here)?;
            }
        }
    }
    ts.set_initial([cell(0, 0).as_str()])?;
    ts.label(&cell(0, 0), ["home"])?;
    ts.label(&cell(height - 1, width - 1), ["goal"])?;
    Ok(ts)
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let ts = grid(args.width, args.height)?;
    println!("Grid with {} cells and {} moves", ts.num_states(), ts.num_transitions());

    let options = CompileOptions {
        bool_states: args.bool_states,
        ..Default::default()
    };
    let mut spec = adapter::compile(&ts, "loc", &options)?
        .sys_prog(Expr::var("home"))
        .sys_prog(Expr::var("goal"));

    if args.obstacle {
        spec = spec.compose(
            &Gr1Spec::new()
                .env_var("blocked", Domain::Bool)?
                .env_prog(Expr::parse("!blocked")?)
                .sys_safety(Expr::parse("X (blocked) -> !X (goal)")?),
        )?;
    }
    if args.lock_home {
        spec = spec.sys_safety(Expr::parse("X (home)")?);
    }
    if args.moore {
        spec = spec.set_controller(ControllerKind::Moore);
    }
    println!("{}", spec);

    let budget = match args.max_iterations {
        Some(n) => Budget::iterations(n),
        None => Budget::unlimited(),
    };
    let solver = FixpointSolver::new(budget);
    let outcome = gr1_rs::solver::synthesize_with(&spec, &solver)?;
    println!("Outcome: {}", outcome);

    match outcome {
        Outcome::Realizable(strategy) => {
            let start = strategy.initial_states()[0];
            let trace = strategy.simulate(start, args.steps, |moves| moves.len() - 1);
            for (step, &id) in trace.iter().enumerate() {
                let state = strategy.state(id);
                println!("{:>3}: [goal {}] {}", step, state.goal, format_valuation(&state.valuation));
            }
            if let Some(path) = args.dot {
                std::fs::write(&path, strategy.to_dot()?)?;
                info!("Strategy written to {}", path.display());
            }
        }
        Outcome::Unrealizable(u) => {
            if let Some(counterexample) = &u.counterexample {
                println!("Counterexample: {}", format_valuation(counterexample));
            }
        }
        Outcome::Timeout(_) => {}
    }

    let time_total = time_total.elapsed();
    println!("\nAll done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
