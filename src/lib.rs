//! # Loomstep: a bulk-synchronous dataflow engine for agent workflows
//!
//! Loomstep executes directed graphs of user code as a sequence of
//! bulk-synchronous supersteps: the engine fans the active vertices out
//! onto concurrent tasks, waits for all of them at a barrier, merges
//! their state deltas into one new immutable snapshot, resolves
//! conditional routing, and activates the next set. The loop ends when
//! the graph runs to its sinks or the superstep budget runs out.
//!
//! ## Core Concepts
//!
//! - **Vertices**: async units of work. Standard vertices
//!   ([`vertex::Vertex`]) return a state delta; conditional vertices
//!   ([`vertex::Router`]) return a routing key.
//! - **State**: an immutable keyed snapshot ([`state::StateSnapshot`]);
//!   every barrier commits a new one and keeps the old in history.
//! - **Graph**: declared through a validating builder
//!   ([`graphs::GraphBuilder`]) and frozen by compilation into a
//!   [`workflow::Workflow`].
//! - **Merge**: the append-policy fold ([`merge`]) combining parallel
//!   deltas; fan-in contributions to one key are preserved as a list.
//! - **Engine**: the superstep scheduler ([`engine::Engine`]) owning all
//!   run state.
//!
//! ## Quick Start
//!
//! ```rust
//! use loomstep::graphs::GraphBuilder;
//! use loomstep::state::StateSnapshot;
//! use loomstep::vertex::{Delta, FnVertex};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let workflow = GraphBuilder::new()
//!     .add_node("greet", FnVertex::new(|_s| {
//!         Ok(Delta::new().with_value("result", json!("Hello, world!")))
//!     }))?
//!     .add_edge("START", "greet")?
//!     .add_edge("greet", "END")?
//!     .compile()?;
//!
//! let initial = StateSnapshot::builder()
//!     .with_value("result", json!("Init"))
//!     .build();
//! let terminal = workflow.invoke(initial).await?;
//! assert_eq!(terminal.get("result"), Some(&json!("Hello, world!")));
//! # Ok(())
//! # }
//! ```
//!
//! ## Execution Semantics
//!
//! - Vertices in the same superstep never observe each other's writes;
//!   each receives its own snapshot clone and contributes an independent
//!   delta.
//! - Merge-bag order is task completion order, so fan-in lists are
//!   compared as multisets.
//! - A vertex returning an error is *contained*: its status becomes
//!   `Failed`, the error is recorded under `INTERNAL_NODE_ERROR`, and the
//!   run continues. Shape violations and merge conflicts abort instead.
//! - Self-loops keep a vertex active across barriers; the superstep
//!   budget (default 100) is the safety net that bounds them.
//!
//! ## Module Guide
//!
//! - [`types`] - Vertex keys (including the `START`/`END` sentinels) and
//!   status vocabulary
//! - [`state`] - Immutable snapshots and history
//! - [`vertex`] - Vertex/router traits, deltas, contexts, vertex errors
//! - [`message`] - Per-superstep vertex output
//! - [`graphs`] - Graph declaration and compilation
//! - [`workflow`] - The frozen, executable graph
//! - [`merge`] - The append-policy barrier merge
//! - [`engine`] - The superstep scheduler and run configuration
//! - [`telemetry`] - Tracing bootstrap

pub mod engine;
pub mod graphs;
pub mod merge;
pub mod message;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod utils;
pub mod vertex;
pub mod workflow;
