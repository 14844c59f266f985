//! Core identifier and status vocabulary for the loomstep engine.
//!
//! This module defines the types that name things in a workflow graph:
//! [`VertexKey`] identifies graph positions (including the reserved
//! `START`/`END` sentinels), while [`VertexStatus`] and [`ActiveStatus`]
//! describe a vertex's lifecycle as observed by the engine's run state.
//!
//! # Examples
//!
//! ```rust
//! use loomstep::types::VertexKey;
//!
//! let entry = VertexKey::from("START");
//! assert!(entry.is_start());
//!
//! let worker = VertexKey::from("fetch_data");
//! assert_eq!(worker.as_name(), Some("fetch_data"));
//! assert_eq!(worker.to_string(), "fetch_data");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved literal naming the virtual entry sentinel.
pub const START: &str = "START";
/// Reserved literal naming the virtual terminal sentinel.
pub const END: &str = "END";

/// Identifies a position in a workflow graph.
///
/// `Start` and `End` are virtual sentinels: they may appear as edge
/// endpoints but are never registered, never executed, and never named by
/// a user vertex. Every executable vertex is `Named`.
///
/// The reserved string forms `"START"` and `"END"` convert to the sentinel
/// variants, which keeps the external API string-friendly while the engine
/// dispatches on tags rather than in-band strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexKey {
    /// Virtual entry point; source of the single initial edge.
    Start,
    /// Virtual terminal sink; absorbs activations without executing.
    End,
    /// A registered vertex, identified by its unique non-empty id.
    Named(String),
}

impl VertexKey {
    /// Returns `true` for the virtual `Start` sentinel.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Returns `true` for the virtual `End` sentinel.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns `true` for a registered (non-sentinel) vertex.
    #[must_use]
    pub fn is_named(&self) -> bool {
        matches!(self, Self::Named(_))
    }

    /// The vertex id for `Named` keys, `None` for sentinels.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for VertexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "{START}"),
            Self::End => write!(f, "{END}"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

impl From<&str> for VertexKey {
    fn from(s: &str) -> Self {
        match s {
            START => VertexKey::Start,
            END => VertexKey::End,
            other => VertexKey::Named(other.to_string()),
        }
    }
}

impl From<String> for VertexKey {
    fn from(s: String) -> Self {
        match s.as_str() {
            START => VertexKey::Start,
            END => VertexKey::End,
            _ => VertexKey::Named(s),
        }
    }
}

/// Lifecycle status of a vertex within one invocation.
///
/// Maintained by the engine's run state, not on the vertex itself; reset
/// to `Initialized` at the start of every invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexStatus {
    /// Registered but not yet executed in this invocation.
    Initialized,
    /// Currently executing in the running superstep.
    Running,
    /// Last execution completed normally.
    Success,
    /// Last execution returned an error; the failure was contained.
    Failed,
    /// Marked as terminating graph execution.
    Terminated,
    /// Scheduled to be re-attempted.
    Retry,
}

/// Whether a vertex is a member of the current superstep's active set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActiveStatus {
    Active,
    Inactive,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_literals_map_to_sentinels() {
        assert_eq!(VertexKey::from("START"), VertexKey::Start);
        assert_eq!(VertexKey::from("END"), VertexKey::End);
        assert_eq!(
            VertexKey::from("worker"),
            VertexKey::Named("worker".to_string())
        );
    }

    #[test]
    fn display_round_trips_reserved_names() {
        assert_eq!(VertexKey::Start.to_string(), "START");
        assert_eq!(VertexKey::End.to_string(), "END");
        assert_eq!(VertexKey::Named("n1".into()).to_string(), "n1");
    }

    #[test]
    fn predicates_match_variants() {
        assert!(VertexKey::Start.is_start());
        assert!(VertexKey::End.is_end());
        let named = VertexKey::Named("x".into());
        assert!(named.is_named());
        assert_eq!(named.as_name(), Some("x"));
        assert_eq!(VertexKey::Start.as_name(), None);
    }
}
