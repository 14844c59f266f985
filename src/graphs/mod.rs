//! Graph definition and compilation for workflow execution.
//!
//! The entry point is [`GraphBuilder`]: register standard vertices with
//! [`add_node`](GraphBuilder::add_node) and conditional vertices with
//! [`add_conditional_node`](GraphBuilder::add_conditional_node), wire them
//! with [`add_edge`](GraphBuilder::add_edge) /
//! [`add_conditional_edges`](GraphBuilder::add_conditional_edges), then
//! [`compile`](GraphBuilder::compile) into an immutable
//! [`Workflow`](crate::workflow::Workflow).
//!
//! Every structural invariant is enforced at add time and returns a
//! [`GraphConfigError`] without changing the builder: the reserved
//! `START`/`END` sentinels may appear only as edge source/destination,
//! endpoints must be registered, edges may not repeat, and a standard
//! vertex may have at most one conditional child. Compilation verifies
//! global properties (a single entry, full reachability, complete routing
//! tables) and freezes the graph by consuming the builder.
//!
//! # Quick Start
//!
//! ```rust
//! use loomstep::graphs::GraphBuilder;
//! use loomstep::vertex::{Delta, FnVertex};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let workflow = GraphBuilder::new()
//!     .add_node("greet", FnVertex::new(|_s| {
//!         Ok(Delta::new().with_value("result", json!("hello")))
//!     }))?
//!     .add_edge("START", "greet")?
//!     .add_edge("greet", "END")?
//!     .compile()?;
//! assert_eq!(workflow.entry(), "greet");
//! # Ok(())
//! # }
//! ```

mod builder;
mod compilation;

pub use builder::{GraphBuilder, GraphConfigError};
pub use compilation::GraphCompileError;
