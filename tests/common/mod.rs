#![allow(dead_code)]

//! Shared fixtures for integration tests.

use loomstep::state::StateSnapshot;
use loomstep::vertex::{Delta, FnRouter, FnVertex, Router, Vertex, VertexError};
use serde_json::Value;

/// Builds a snapshot from literal key/value pairs.
pub fn state_with(pairs: &[(&str, Value)]) -> StateSnapshot {
    let mut builder = StateSnapshot::builder();
    for (key, value) in pairs {
        builder = builder.with_value(*key, value.clone());
    }
    builder.build()
}

/// A vertex that writes a fixed set of updates.
pub fn set_values(updates: Vec<(&'static str, Value)>) -> impl Vertex {
    FnVertex::new(move |_snapshot| {
        let mut delta = Delta::new();
        for (key, value) in &updates {
            delta = delta.with_value(*key, value.clone());
        }
        Ok(delta)
    })
}

/// A vertex that writes a single fixed value.
pub fn set_value(key: &'static str, value: Value) -> impl Vertex {
    set_values(vec![(key, value)])
}

/// A vertex that reads an integer key and writes it back incremented.
pub fn increment(key: &'static str) -> impl Vertex {
    FnVertex::new(move |snapshot| {
        let current = snapshot
            .get(key)
            .and_then(Value::as_i64)
            .ok_or(VertexError::MissingInput { what: "counter" })?;
        Ok(Delta::new().with_value(key, Value::from(current + 1)))
    })
}

/// A vertex that observes the state and changes nothing.
pub fn observer() -> impl Vertex {
    FnVertex::new(|_snapshot| Ok(Delta::new()))
}

/// A vertex that always fails with the given message.
pub fn failing(message: &'static str) -> impl Vertex {
    FnVertex::new(move |_snapshot| Err(VertexError::Other(message.to_string())))
}

/// A router that compares an integer key against a threshold.
///
/// Returns `below` while `state[key] < threshold`, `at_or_above` after.
pub fn threshold_router(
    key: &'static str,
    threshold: i64,
    below: &'static str,
    at_or_above: &'static str,
) -> impl Router {
    FnRouter::new(move |snapshot| {
        let current = snapshot
            .get(key)
            .and_then(Value::as_i64)
            .ok_or(VertexError::MissingInput { what: "counter" })?;
        let branch = if current < threshold { below } else { at_or_above };
        Ok(branch.to_string())
    })
}

/// A router that routes on string equality of a state key.
pub fn equals_router(
    key: &'static str,
    expected: &'static str,
    on_match: &'static str,
    otherwise: &'static str,
) -> impl Router {
    FnRouter::new(move |snapshot| {
        let matched = snapshot.get(key).and_then(Value::as_str) == Some(expected);
        let branch = if matched { on_match } else { otherwise };
        Ok(branch.to_string())
    })
}

/// A router that always fails.
pub fn failing_router(message: &'static str) -> impl Router {
    FnRouter::new(move |_snapshot| Err(VertexError::Other(message.to_string())))
}
