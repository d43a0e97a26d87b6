//! Strategy to DOT (Graphviz) conversion.
//!
//! The generated DOT output follows these conventions:
//! - **Strategy states** are labelled with their id, the goal index, and the valuation
//! - **Initial states** get a distinct shape and an incoming edge from an invisible source
//! - **Edges** are labelled `input / output`
//!
//! # Examples
//!
//! ```
//! use gr1_rs::expr::Expr;
//! use gr1_rs::solver::synthesize;
//! use gr1_rs::space::Domain;
//! use gr1_rs::spec::Gr1Spec;
//!
//! let spec = Gr1Spec::new()
//!     .sys_var("x", Domain::Bool)
//!     .unwrap()
//!     .sys_prog(Expr::var("x"));
//! let strategy = synthesize(&spec).unwrap().into_strategy().unwrap();
//!
//! let dot = strategy.to_dot().unwrap();
//! // Write to file and render with: dot -Tpng output.dot -o output.png
//! assert!(dot.starts_with("digraph strategy {"));
//! ```

use crate::space::format_valuation;
use crate::strategy::Strategy;

/// Configuration options for DOT output generation.
///
/// Use `DotConfig::default()` for standard settings.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for strategy states (default: "ellipse")
    pub node_shape: &'static str,
    /// Shape for initial states (default: "doubleoctagon")
    pub initial_shape: &'static str,
    /// Graph direction (default: "LR")
    pub rankdir: &'static str,
    /// Whether to print the valuation inside each state (default: true)
    pub show_valuations: bool,
    /// Whether to label edges with `input / output` (default: true)
    pub edge_labels: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "ellipse",
            initial_shape: "doubleoctagon",
            rankdir: "LR",
            show_valuations: true,
            edge_labels: true,
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl Strategy {
    /// Converts the strategy automaton to DOT (Graphviz) format.
    ///
    /// Only states reachable from the initial states are rendered.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    /// Converts the strategy automaton to DOT format with custom configuration.
    ///
    /// ```
    /// # use gr1_rs::expr::Expr;
    /// # use gr1_rs::solver::synthesize;
    /// # use gr1_rs::space::Domain;
    /// # use gr1_rs::spec::Gr1Spec;
    /// use gr1_rs::dot::DotConfig;
    ///
    /// # let spec = Gr1Spec::new().sys_var("x", Domain::Bool).unwrap().sys_prog(Expr::var("x"));
    /// # let strategy = synthesize(&spec).unwrap().into_strategy().unwrap();
    /// let config = DotConfig {
    ///     show_valuations: false,
    ///     ..DotConfig::default()
    /// };
    /// let dot = strategy.to_dot_with_config(&config).unwrap();
    /// ```
    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        use std::fmt::Write as _;

        let mut dot = String::new();
        writeln!(dot, "digraph strategy {{")?;
        writeln!(dot, "rankdir={};", config.rankdir)?;
        writeln!(dot, "node [shape={}];", config.node_shape)?;

        let reachable = self.reachable_states();

        for &id in &reachable {
            let state = self.state(id);
            let label = if config.show_valuations {
                format!("{} [goal {}]\\n{}", id, state.goal, escape(&format_valuation(&state.valuation)))
            } else {
                format!("{} [goal {}]", id, state.goal)
            };
            if self.initial_states().contains(&id) {
                writeln!(dot, "{} [shape={}, label=\"{}\"];", id, config.initial_shape, label)?;
            } else {
                writeln!(dot, "{} [label=\"{}\"];", id, label)?;
            }
        }

        // Invisible sources pointing at the initial states
        for (i, &id) in self.initial_states().iter().enumerate() {
            writeln!(dot, "init{} [shape=point, style=invis];", i)?;
            writeln!(dot, "init{} -> {};", i, id)?;
        }

        for &id in &reachable {
            for t in self.transitions(id) {
                if config.edge_labels {
                    let label = format!("{} / {}", format_valuation(&t.input), format_valuation(&t.output));
                    writeln!(dot, "{} -> {} [label=\"{}\"];", id, t.target, escape(&label))?;
                } else {
                    writeln!(dot, "{} -> {};", id, t.target)?;
                }
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::expr::Expr;
    use crate::solver::synthesize;
    use crate::space::Domain;
    use crate::spec::Gr1Spec;

    fn toggle() -> Strategy {
        let spec = Gr1Spec::new()
            .env_var("req", Domain::Bool)
            .unwrap()
            .sys_var("ack", Domain::Bool)
            .unwrap()
            .sys_prog(Expr::var("ack"))
            .sys_prog(!Expr::var("ack"));
        synthesize(&spec).unwrap().into_strategy().unwrap()
    }

    #[test]
    fn test_to_dot_basic() {
        let strategy = toggle();
        let dot = strategy.to_dot().unwrap();

        assert!(dot.starts_with("digraph strategy {"));
        assert!(dot.ends_with("}\n"));
        assert!(dot.contains("shape=doubleoctagon"));
        assert!(dot.contains("init0 -> "));
        assert!(dot.contains("ack=true"));
        assert_eq!(dot.matches(" -> ").count(), strategy.num_transitions() + strategy.initial_states().len());
    }

    #[test]
    fn test_to_dot_with_config() {
        let config = DotConfig {
            show_valuations: false,
            edge_labels: false,
            ..DotConfig::default()
        };
        let dot = toggle().to_dot_with_config(&config).unwrap();
        assert!(!dot.contains("ack="));
        assert!(!dot.contains("label=\"req"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"a"b\c"#), r#"a\"b\\c"#);
    }

    /// Helper test to write DOT file for manual inspection (disabled by default)
    #[test]
    #[ignore]
    fn test_write_dot_file() {
        let dot = toggle().to_dot().unwrap();
        std::fs::write("strategy.dot", &dot).unwrap();
        println!("DOT output:\n{}", dot);
    }
}
