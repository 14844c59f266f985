//! Per-superstep vertex output messages.
//!
//! Running a vertex produces a [`Message`]: the vertex id plus a payload
//! whose shape mirrors the vertex kind. Standard vertices produce
//! [`MessagePayload::Delta`] (a map of state updates, collected into the
//! superstep's merge bag); conditional vertices produce
//! [`MessagePayload::Route`] (a routing key, consumed immediately for
//! routing and never merged).
//!
//! A vertex whose execution fails is still represented by a message: a
//! delta payload carrying the stringified error under
//! [`INTERNAL_NODE_ERROR`], so downstream vertices can observe and route
//! around the failure.
//!
//! # Examples
//!
//! ```rust
//! use loomstep::message::{Message, MessagePayload};
//! use serde_json::json;
//! use rustc_hash::FxHashMap;
//!
//! let mut updates = FxHashMap::default();
//! updates.insert("result".to_string(), json!("done"));
//! let msg = Message::delta("n1", updates);
//! assert!(msg.is_delta());
//!
//! let routed = Message::route("router", "has_result");
//! assert_eq!(routed.as_route(), Some("has_result"));
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// State key under which a contained vertex failure is recorded.
pub const INTERNAL_NODE_ERROR: &str = "INTERNAL_NODE_ERROR";

/// Payload of a superstep message; the variant mirrors the vertex kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MessagePayload {
    /// State updates produced by a standard vertex.
    Delta(FxHashMap<String, Value>),
    /// Routing key produced by a conditional vertex.
    Route(String),
}

/// The value produced by running one vertex in one superstep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Id of the vertex that produced this message.
    pub vertex: String,
    /// The kind-constrained payload.
    pub payload: MessagePayload,
}

impl Message {
    /// Builds a delta message from a standard vertex's updates.
    #[must_use]
    pub fn delta(vertex: impl Into<String>, updates: FxHashMap<String, Value>) -> Self {
        Self {
            vertex: vertex.into(),
            payload: MessagePayload::Delta(updates),
        }
    }

    /// Builds a routing message from a conditional vertex's key.
    #[must_use]
    pub fn route(vertex: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            vertex: vertex.into(),
            payload: MessagePayload::Route(key.into()),
        }
    }

    /// Builds the failure message for a vertex whose execution errored.
    ///
    /// The payload is a delta carrying the stringified error under
    /// [`INTERNAL_NODE_ERROR`], so it participates in the barrier merge
    /// like any other delta.
    #[must_use]
    pub fn internal_error(vertex: impl Into<String>, error: impl std::fmt::Display) -> Self {
        let mut updates = FxHashMap::default();
        updates.insert(
            INTERNAL_NODE_ERROR.to_string(),
            Value::String(error.to_string()),
        );
        Self {
            vertex: vertex.into(),
            payload: MessagePayload::Delta(updates),
        }
    }

    /// Returns `true` if this message carries state updates.
    #[must_use]
    pub fn is_delta(&self) -> bool {
        matches!(self.payload, MessagePayload::Delta(_))
    }

    /// Returns `true` if this message carries a routing key.
    #[must_use]
    pub fn is_route(&self) -> bool {
        matches!(self.payload, MessagePayload::Route(_))
    }

    /// The delta updates, if this is a delta message.
    #[must_use]
    pub fn as_delta(&self) -> Option<&FxHashMap<String, Value>> {
        match &self.payload {
            MessagePayload::Delta(updates) => Some(updates),
            MessagePayload::Route(_) => None,
        }
    }

    /// The routing key, if this is a routing message.
    #[must_use]
    pub fn as_route(&self) -> Option<&str> {
        match &self.payload {
            MessagePayload::Route(key) => Some(key),
            MessagePayload::Delta(_) => None,
        }
    }
}
