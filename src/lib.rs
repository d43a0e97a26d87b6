//! # gr1-rs: GR(1) reactive synthesis on Binary Decision Diagrams
//!
//! **`gr1-rs`** decides whether a reactive system can satisfy a GR(1) specification against
//! every admissible environment, and if so builds a finite-state controller that does.
//!
//! ## What is GR(1)?
//!
//! A GR(1) specification splits the variables between the **environment** (inputs) and the
//! **system** (outputs) and describes each player with initial conditions, safety
//! constraints over the current and next state, and liveness goals that must hold
//! infinitely often. The system wins a play if, whenever the environment respects its
//! assumptions, the system respects its guarantees.
//!
//! ## Key Features
//!
//! - **Symbolic solving**: sets of states live in a single [`Bdd`][crate::bdd::Bdd] manager with complement edges, and the winning region is the classic three-level nested fixed point.
//! - **Typed variables**: booleans and bounded integers, with a small predicate language parsed from text ([`Expr::parse`][crate::expr::Expr::parse]).
//! - **Transition systems**: explicit graphs with labels are compiled into specification fragments ([`adapter`]) and composed.
//! - **Strategies**: realizable specifications yield an explicit Mealy or Moore transducer that can be stepped, simulated, printed, and exported to Graphviz.
//! - **Budgets**: iteration and time limits turn long runs into a reported timeout.
//!
//! ## Basic Usage
//!
//! ```rust
//! use gr1_rs::expr::Expr;
//! use gr1_rs::solver::{synthesize, Outcome};
//! use gr1_rs::space::Domain;
//! use gr1_rs::spec::Gr1Spec;
//!
//! // The system must answer every request, one step later at the latest.
//! let spec = Gr1Spec::new()
//!     .env_var("req", Domain::Bool)
//!     .unwrap()
//!     .sys_var("grant", Domain::Bool)
//!     .unwrap()
//!     .sys_safety(Expr::parse("req -> X (grant)").unwrap())
//!     .sys_prog(Expr::parse("grant || !req").unwrap());
//!
//! match synthesize(&spec).unwrap() {
//!     Outcome::Realizable(strategy) => assert!(strategy.num_states() > 0),
//!     other => panic!("unexpected: {}", other),
//! }
//! ```
//!
//! ## Core Components
//!
//! - **[`spec`]**: the [`Gr1Spec`][crate::spec::Gr1Spec] value and its composition.
//! - **[`space`]**: binary encoding of typed variables and predicate compilation.
//! - **[`arena`]**: the compiled game and its controllable predecessor.
//! - **[`solver`]**: fixed-point solving, budgets, and synthesis outcomes.
//! - **[`strategy`]**, **[`dot`]**: strategy automata and their export.

pub mod adapter;
pub mod arena;
pub mod bdd;
pub mod cache;
pub mod dot;
pub mod error;
pub mod expr;
pub mod parser;
pub mod reference;
pub mod sat;
pub mod solver;
pub mod space;
pub mod spec;
pub mod strategy;
pub mod table;
pub mod ts;
pub mod utils;
