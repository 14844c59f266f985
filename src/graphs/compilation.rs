//! Graph compilation: global validation and freezing.
//!
//! `compile` consumes the builder, so the resulting
//! [`Workflow`](crate::workflow::Workflow) is frozen by construction; no
//! mutation path survives the call.

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use thiserror::Error;

use crate::types::VertexKey;
use crate::workflow::Workflow;

/// Errors raised while compiling a declared graph.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphCompileError {
    /// No `START` edge was declared.
    #[error("graph has no START edge")]
    #[diagnostic(
        code(loomstep::compile::missing_start),
        help("Declare the entry with add_edge(\"START\", <vertex>).")
    )]
    MissingStart,

    /// A registered vertex cannot be reached from `START`.
    #[error("vertex '{id}' is not reachable from START")]
    #[diagnostic(
        code(loomstep::compile::unreachable),
        help("Every registered vertex must be reachable through edges or routing tables.")
    )]
    Unreachable { id: String },

    /// A conditional vertex has no routing table.
    #[error("conditional vertex '{id}' has no routing table")]
    #[diagnostic(
        code(loomstep::compile::router_without_routes),
        help("Declare its table with add_conditional_edges before compiling.")
    )]
    RouterWithoutRoutes { id: String },
}

impl super::builder::GraphBuilder {
    /// Compiles the declared graph into an executable [`Workflow`].
    ///
    /// Verifies that `START` has its target, that every conditional vertex
    /// carries a routing table, and that every registered vertex is
    /// reachable from the entry (breadth-first over child lists and
    /// routing tables). Standard vertices without children gain a single
    /// `END` child so they terminate cleanly.
    ///
    /// Consuming `self` is the freeze: the returned workflow exposes no
    /// mutating API.
    pub fn compile(self) -> Result<Workflow, GraphCompileError> {
        let (vertices, routers, mut edges, routes, entry, run_config) = self.into_parts();

        let entry = entry.ok_or(GraphCompileError::MissingStart)?;

        for id in routers.keys() {
            if !routes.contains_key(id) {
                return Err(GraphCompileError::RouterWithoutRoutes { id: id.clone() });
            }
        }

        // Childless standard vertices flow to the terminal sink.
        for id in vertices.keys() {
            let children = edges.entry(id.clone()).or_default();
            if children.is_empty() {
                children.push(VertexKey::End);
            }
        }

        let mut reached: FxHashSet<String> = FxHashSet::default();
        let mut queue: VecDeque<String> = VecDeque::new();
        reached.insert(entry.clone());
        queue.push_back(entry.clone());
        while let Some(id) = queue.pop_front() {
            let children = edges.get(&id).into_iter().flatten();
            let routed = routes.get(&id).into_iter().flat_map(|table| table.values());
            for target in children.chain(routed) {
                if let VertexKey::Named(name) = target
                    && reached.insert(name.clone())
                {
                    queue.push_back(name.clone());
                }
            }
        }
        for id in vertices.keys().chain(routers.keys()) {
            if !reached.contains(id) {
                return Err(GraphCompileError::Unreachable { id: id.clone() });
            }
        }

        tracing::debug!(
            vertices = vertices.len(),
            routers = routers.len(),
            entry = %entry,
            "graph compiled"
        );

        Ok(Workflow::from_parts(
            vertices, routers, edges, routes, entry, run_config,
        ))
    }
}
