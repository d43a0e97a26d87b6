use clap::Parser;
use log::info;

use gr1_rs::adapter::{self, CompileOptions};
use gr1_rs::expr::Expr;
use gr1_rs::solver::{synthesize, Outcome};
use gr1_rs::space::format_valuation;
use gr1_rs::ts::{Owner, TransitionSystem};

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of cells on the ring.
    #[arg(value_name = "INT", default_value = "4")]
    n: usize,

    /// Number of simulation steps.
    #[clap(long, value_name = "INT", default_value = "16")]
    steps: usize,

    /// Print the full strategy.
    #[clap(long)]
    print: bool,
}

/// A ring of `n` cells where the agent may stay or move to a neighbour.
fn ring(n: usize, start: usize) -> color_eyre::Result<TransitionSystem> {
    let name = |i: usize| format!("s{}", i % n);
    let mut ts = TransitionSystem::new(Owner::Sys);
    ts.add_states_from((0..n).map(name));
    for i in 0..n {
        ts.add_comb(&[name(i).as_str()], &[name(i).as_str(), name(i + 1).as_str(), name(i + n - 1).as_str()])?;
    }
    ts.set_initial([name(start).as_str()])?;
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

    let args = Cli::parse();
    println!("args = {:?}", args);
    color_eyre::eyre::ensure!(args.n >= 3, "the ring needs at least 3 cells");

    let n = args.n;
    let a = ring(n, 0)?;
    let b = ring(n, n / 2)?;
    let options = CompileOptions::default();

    let mut spec = adapter::compile_many(&[(&a, "a"), (&b, "b")], &options)?;

    // The agents never share a cell.
    for i in 0..n {
        let cell = format!("s{}", i);
        let a_here = adapter::state_predicate(&a, "a", &cell, &options)?;
        let b_here = adapter::state_predicate(&b, "b", &cell, &options)?;
        spec = spec.sys_safety(!Expr::next(a_here & b_here));
    }

    // Each agent keeps visiting the starting cell of the other.
    let a_goal = adapter::state_predicate(&a, "a", &format!("s{}", n / 2), &options)?;
    let b_goal = adapter::state_predicate(&b, "b", "s0", &options)?;
    spec = spec.sys_prog(a_goal).sys_prog(b_goal);
    info!("Specification:\n{}", spec);

    match synthesize(&spec)? {
        Outcome::Realizable(strategy) => {
            println!(
                "Realizable: {} states, {} transitions",
                strategy.num_states(),
                strategy.num_transitions()
            );
            if args.print {
                println!("{}", strategy);
            }
            let trace = strategy.simulate(strategy.initial_states()[0], args.steps, |_| 0);
            for (step, &id) in trace.iter().enumerate() {
                println!("{:>3}: {}", step, format_valuation(&strategy.state(id).valuation));
            }
        }
        other => println!("{}", other),
    }

    Ok(())
}
