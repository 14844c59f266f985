//! Immutable state snapshots for workflow execution.
//!
//! The engine's global state is a keyed map of JSON values, held as a
//! [`StateSnapshot`]: an observationally immutable value with a version
//! number. Any update goes through [`StateSnapshot::replace`], which
//! produces a *new* snapshot and leaves the receiver untouched; the engine
//! keeps an ordered history of every snapshot it commits (the initial one
//! plus one per completed superstep).
//!
//! Vertices receive cloned snapshots and read them through accessors or a
//! defensive-copy [`view`](StateSnapshot::view); there is no path to the
//! underlying storage.
//!
//! # Examples
//!
//! ```rust
//! use loomstep::state::StateSnapshot;
//! use serde_json::json;
//!
//! let initial = StateSnapshot::builder()
//!     .with_value("step", json!(0))
//!     .with_value("message", json!(""))
//!     .build();
//!
//! assert_eq!(initial.version(), 1);
//! assert_eq!(initial.get("step"), Some(&json!(0)));
//!
//! // Replacing yields a fresh snapshot; the original is unchanged.
//! let mut next_values = initial.view();
//! next_values.insert("step".to_string(), json!(1));
//! let next = initial.replace(next_values);
//!
//! assert_eq!(initial.get("step"), Some(&json!(0)));
//! assert_eq!(next.get("step"), Some(&json!(1)));
//! assert_eq!(next.version(), 2);
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An immutable snapshot of the global workflow state.
///
/// Holds a map of `String -> serde_json::Value` and a version number that
/// increments on each [`replace`](Self::replace). Two consecutive
/// [`view`](Self::view) calls on the same snapshot return equal maps even
/// if the first returned copy was mutated in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    values: FxHashMap<String, Value>,
    version: u32,
}

impl StateSnapshot {
    /// Wraps an initial mapping as a version-1 snapshot.
    #[must_use]
    pub fn new(initial: FxHashMap<String, Value>) -> Self {
        Self {
            values: initial,
            version: 1,
        }
    }

    /// Creates a builder for fluent construction.
    ///
    /// ```rust
    /// use loomstep::state::StateSnapshot;
    /// use serde_json::json;
    ///
    /// let state = StateSnapshot::builder()
    ///     .with_value("result", json!("Init"))
    ///     .build();
    /// assert_eq!(state.len(), 1);
    /// ```
    #[must_use]
    pub fn builder() -> StateSnapshotBuilder {
        StateSnapshotBuilder::default()
    }

    /// Returns a defensive copy of the underlying map.
    ///
    /// Callers may mutate the returned map freely; the snapshot is not
    /// affected.
    #[must_use]
    pub fn view(&self) -> FxHashMap<String, Value> {
        self.values.clone()
    }

    /// Produces a fresh snapshot holding `values`, with the version bumped.
    ///
    /// The receiver is not mutated; it remains a legal reference to the
    /// prior state.
    #[must_use]
    pub fn replace(&self, values: FxHashMap<String, Value>) -> Self {
        Self {
            values,
            version: self.version.saturating_add(1),
        }
    }

    /// Looks up a single key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Whether `key` is present in the snapshot.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Iterates over the snapshot's keys.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// Number of keys in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the snapshot holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The snapshot's version. The initial snapshot is version 1; each
    /// `replace` bumps by one (saturating).
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }
}

/// Fluent builder for [`StateSnapshot`].
#[derive(Debug, Default)]
pub struct StateSnapshotBuilder {
    values: FxHashMap<String, Value>,
}

impl StateSnapshotBuilder {
    /// Adds one key/value pair to the initial state.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Builds the version-1 snapshot.
    #[must_use]
    pub fn build(self) -> StateSnapshot {
        StateSnapshot::new(self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn view_is_a_defensive_copy() {
        let state = StateSnapshot::builder().with_value("k", json!(1)).build();
        let mut first = state.view();
        first.insert("k".to_string(), json!(999));
        first.insert("extra".to_string(), json!(true));

        let second = state.view();
        assert_eq!(second.get("k"), Some(&json!(1)));
        assert!(!second.contains_key("extra"));
    }

    #[test]
    fn replace_does_not_mutate_receiver() {
        let state = StateSnapshot::builder().with_value("k", json!("a")).build();
        let mut values = state.view();
        values.insert("k".to_string(), json!("b"));
        let next = state.replace(values);

        assert_eq!(state.get("k"), Some(&json!("a")));
        assert_eq!(next.get("k"), Some(&json!("b")));
        assert_eq!(state.version(), 1);
        assert_eq!(next.version(), 2);
    }

    #[test]
    fn replace_view_round_trips_structurally() {
        let state = StateSnapshot::new(FxHashMap::default());
        let mut values = FxHashMap::default();
        values.insert("x".to_string(), json!([1, 2, 3]));
        let next = state.replace(values.clone());
        assert_eq!(next.view(), values);
    }
}
