//! Compile-time errors.
//!
//! Everything reported here aborts synthesis before any fixed-point work starts.
//! Negative synthesis results (unrealizable specification, exhausted budget) are
//! not errors; see [`Outcome`][crate::solver::Outcome].

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A predicate references an undeclared variable, a literal outside the variable's
    /// domain, mixes boolean and integer terms, or misuses next-state references.
    #[error("malformed predicate `{predicate}`: {reason}")]
    MalformedPredicate { predicate: String, reason: String },

    /// The same variable name was introduced with conflicting domains or partitions.
    #[error("variable collision on `{name}`: {reason}")]
    VariableCollision { name: String, reason: String },

    /// An integer domain is empty or too large to encode.
    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    /// The transition system is structurally unusable (no initial state, dead end, unknown state).
    #[error("invalid transition system: {0}")]
    InvalidTransitionSystem(String),
}

impl Error {
    pub(crate) fn malformed(predicate: impl ToString, reason: impl Into<String>) -> Self {
        Error::MalformedPredicate {
            predicate: predicate.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn collision(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::VariableCollision {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = Error::malformed("x = 5", "value 5 is outside [0, 3]");
        assert_eq!(e.to_string(), "malformed predicate `x = 5`: value 5 is outside [0, 3]");

        let e = Error::collision("loc", "declared as env and sys");
        assert_eq!(e.to_string(), "variable collision on `loc`: declared as env and sys");

        let e = Error::InvalidDomain("empty integer range 3..=1".to_string());
        assert_eq!(e.to_string(), "invalid domain: empty integer range 3..=1");

        let e = Error::InvalidTransitionSystem("no initial states".to_string());
        assert_eq!(e.to_string(), "invalid transition system: no initial states");
    }
}
