//! Vertex execution primitives: the [`Vertex`] and [`Router`] traits,
//! execution context, state deltas, and vertex-level errors.
//!
//! A workflow is a graph of user code. Standard vertices implement
//! [`Vertex`]: they consume an immutable state snapshot and return a
//! [`Delta`] of updates. Conditional vertices implement [`Router`]: they
//! consume a snapshot and return a routing key that selects the next
//! vertex from their routing table. Both traits are async; synchronous
//! logic is just an async fn that never awaits, or a plain closure wrapped
//! in [`FnVertex`] / [`FnRouter`].
//!
//! # Error Handling
//!
//! A vertex returning `Err(VertexError)` is an expected runtime condition
//! (a tool call failing, an upstream service erroring). The engine
//! contains it: the vertex's status becomes `Failed`, the error is
//! recorded in the superstep's messages, and the run continues. Shape
//! violations (writing a key that does not exist in the state) are
//! programmer errors and abort the invocation instead.
//!
//! # Examples
//!
//! ```rust
//! use loomstep::vertex::{Delta, FnVertex, Vertex, VertexError};
//! use serde_json::json;
//!
//! // A closure-backed vertex that bumps a counter.
//! let bump = FnVertex::new(|snapshot| {
//!     let step = snapshot
//!         .get("step")
//!         .and_then(|v| v.as_i64())
//!         .ok_or(VertexError::MissingInput { what: "step" })?;
//!     Ok(Delta::new().with_value("step", json!(step + 1)))
//! });
//! # let _: &dyn Vertex = &bump;
//! ```

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde_json::Value;
use thiserror::Error;

use crate::state::StateSnapshot;

// ============================================================================
// Core traits
// ============================================================================

/// A standard vertex: consumes a state snapshot, produces a state delta.
///
/// Implementations should be stateless with respect to the workflow: all
/// inputs come from the snapshot, all outputs go into the returned
/// [`Delta`]. Vertices in the same superstep run concurrently and must not
/// observe each other's writes; each receives its own snapshot clone.
#[async_trait]
pub trait Vertex: Send + Sync {
    /// Execute this vertex against the given snapshot.
    async fn run(&self, snapshot: StateSnapshot, ctx: VertexContext)
    -> Result<Delta, VertexError>;
}

/// A conditional vertex: consumes a state snapshot, produces a routing key.
///
/// Routers are never members of the active set. The engine evaluates them
/// inline between supersteps and resolves the returned key against the
/// router's routing table.
#[async_trait]
pub trait Router: Send + Sync {
    /// Decide the routing key for the current state.
    async fn route(
        &self,
        snapshot: StateSnapshot,
        ctx: VertexContext,
    ) -> Result<String, VertexError>;
}

// ============================================================================
// Closure adapters
// ============================================================================

/// Wraps a synchronous closure as a [`Vertex`].
///
/// Convenient for vertices that are pure functions of the snapshot and
/// need no struct of their own.
pub struct FnVertex<F>(F);

impl<F> FnVertex<F>
where
    F: Fn(StateSnapshot) -> Result<Delta, VertexError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Vertex for FnVertex<F>
where
    F: Fn(StateSnapshot) -> Result<Delta, VertexError> + Send + Sync,
{
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: VertexContext,
    ) -> Result<Delta, VertexError> {
        (self.0)(snapshot)
    }
}

/// Wraps a synchronous closure as a [`Router`].
pub struct FnRouter<F>(F);

impl<F> FnRouter<F>
where
    F: Fn(StateSnapshot) -> Result<String, VertexError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Router for FnRouter<F>
where
    F: Fn(StateSnapshot) -> Result<String, VertexError> + Send + Sync,
{
    async fn route(
        &self,
        snapshot: StateSnapshot,
        _ctx: VertexContext,
    ) -> Result<String, VertexError> {
        (self.0)(snapshot)
    }
}

// ============================================================================
// Execution context
// ============================================================================

/// Execution context handed to each vertex invocation.
///
/// Identifies the vertex, the superstep, and the run it belongs to, and
/// offers a structured-logging hook scoped to those fields.
#[derive(Clone, Debug)]
pub struct VertexContext {
    /// Id of the vertex being executed.
    pub vertex_id: String,
    /// Superstep number (1-based) of this execution.
    pub step: u32,
    /// Id of the invocation this execution belongs to.
    pub run_id: String,
}

impl VertexContext {
    /// Emit a vertex-scoped log line enriched with this context's metadata.
    pub fn emit(&self, scope: impl AsRef<str>, message: impl AsRef<str>) {
        tracing::info!(
            vertex = %self.vertex_id,
            step = self.step,
            run = %self.run_id,
            scope = scope.as_ref(),
            "{}",
            message.as_ref()
        );
    }
}

// ============================================================================
// State updates
// ============================================================================

/// The state updates returned by a standard vertex.
///
/// Keys must already exist in the current state; the engine rejects deltas
/// that introduce new keys. Under fan-in, deltas from parallel vertices
/// writing the same key are combined by the append merge.
///
/// # Examples
///
/// ```rust
/// use loomstep::vertex::Delta;
/// use serde_json::json;
///
/// let delta = Delta::new()
///     .with_value("step", json!(3))
///     .with_value("message", json!("Node 3"));
/// assert_eq!(delta.updates.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Delta {
    /// Key/value updates to merge into the state at the barrier.
    pub updates: FxHashMap<String, Value>,
}

impl Delta {
    /// An empty delta (the vertex observed but changed nothing).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one update, consuming and returning the delta for chaining.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.updates.insert(key.into(), value);
        self
    }

    /// Whether this delta carries no updates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

impl FromIterator<(String, Value)> for Delta {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            updates: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Error types
// ============================================================================

/// Errors a vertex implementation can return.
///
/// These are the *contained* runtime failures: the engine records them and
/// keeps going. Use the variant that best describes the failure so the
/// stringified form in the state is actionable.
#[derive(Debug, Error, Diagnostic)]
pub enum VertexError {
    /// Expected input data is missing from the state snapshot.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(loomstep::vertex::missing_input),
        help("Check that an upstream vertex produced the required key: {what}.")
    )]
    MissingInput { what: &'static str },

    /// External provider or service error.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(loomstep::vertex::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic(code(loomstep::vertex::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Any other vertex-level failure.
    #[error("{0}")]
    #[diagnostic(code(loomstep::vertex::other))]
    Other(String),
}
