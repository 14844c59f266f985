//! The frozen, executable workflow graph.
//!
//! A [`Workflow`] is what [`GraphBuilder::compile`] produces: immutable
//! vertex registries, adjacency, the entry vertex, and the engine defaults
//! it was declared with. It is cheap to clone (vertices are shared behind
//! `Arc`) and carries no run state; each invocation gets its own
//! [`Engine`](crate::engine::Engine).
//!
//! [`GraphBuilder::compile`]: crate::graphs::GraphBuilder::compile

use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::instrument;

use crate::engine::{Engine, EngineError, RunConfig};
use crate::state::StateSnapshot;
use crate::types::VertexKey;
use crate::vertex::{Router, Vertex};

/// An immutable, compiled workflow graph.
#[derive(Clone)]
pub struct Workflow {
    vertices: FxHashMap<String, Arc<dyn Vertex>>,
    routers: FxHashMap<String, Arc<dyn Router>>,
    edges: FxHashMap<String, Vec<VertexKey>>,
    routes: FxHashMap<String, FxHashMap<String, VertexKey>>,
    entry: String,
    run_config: RunConfig,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("vertices", &self.vertices.keys().collect::<Vec<_>>())
            .field("routers", &self.routers.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("routes", &self.routes)
            .field("entry", &self.entry)
            .field("run_config", &self.run_config)
            .finish()
    }
}

impl Workflow {
    /// Internal (crate) factory keeping the registries private.
    pub(crate) fn from_parts(
        vertices: FxHashMap<String, Arc<dyn Vertex>>,
        routers: FxHashMap<String, Arc<dyn Router>>,
        edges: FxHashMap<String, Vec<VertexKey>>,
        routes: FxHashMap<String, FxHashMap<String, VertexKey>>,
        entry: String,
        run_config: RunConfig,
    ) -> Self {
        Self {
            vertices,
            routers,
            edges,
            routes,
            entry,
            run_config,
        }
    }

    /// Id of the vertex `START` targets.
    #[must_use]
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Looks up a standard vertex by id.
    #[must_use]
    pub fn vertex(&self, id: &str) -> Option<&Arc<dyn Vertex>> {
        self.vertices.get(id)
    }

    /// Looks up a conditional vertex by id.
    #[must_use]
    pub fn router(&self, id: &str) -> Option<&Arc<dyn Router>> {
        self.routers.get(id)
    }

    /// Whether `id` names a conditional vertex.
    #[must_use]
    pub fn is_router(&self, id: &str) -> bool {
        self.routers.contains_key(id)
    }

    /// Child list of a standard vertex (may include the `END` sink).
    #[must_use]
    pub fn children_of(&self, id: &str) -> Option<&[VertexKey]> {
        self.edges.get(id).map(Vec::as_slice)
    }

    /// Routing table of a conditional vertex.
    #[must_use]
    pub fn routes_of(&self, id: &str) -> Option<&FxHashMap<String, VertexKey>> {
        self.routes.get(id)
    }

    /// Iterates over every registered vertex id, standard then conditional.
    pub fn vertex_ids(&self) -> impl Iterator<Item = &String> {
        self.vertices.keys().chain(self.routers.keys())
    }

    /// Ids of vertices with an edge or routing entry targeting `id`.
    ///
    /// Diagnostic scan over both adjacency shapes; includes `START` via
    /// the entry when applicable.
    #[must_use]
    pub fn parents_of(&self, id: &str) -> Vec<VertexKey> {
        let mut parents: Vec<VertexKey> = Vec::new();
        if self.entry == id {
            parents.push(VertexKey::Start);
        }
        for (source, children) in &self.edges {
            if children.iter().any(|child| child.as_name() == Some(id)) {
                parents.push(VertexKey::Named(source.clone()));
            }
        }
        for (source, table) in &self.routes {
            if table.values().any(|target| target.as_name() == Some(id)) {
                parents.push(VertexKey::Named(source.clone()));
            }
        }
        parents
    }

    /// The engine defaults this workflow was declared with.
    #[must_use]
    pub fn run_config(&self) -> &RunConfig {
        &self.run_config
    }

    /// Runs the workflow to completion against `initial` and returns the
    /// terminal snapshot.
    ///
    /// One-shot convenience: builds an [`Engine`], invokes it, and drops
    /// the run state. Use an [`Engine`] directly to inspect history, step
    /// counts, statuses, or the termination flag.
    #[instrument(skip(self, initial), fields(entry = %self.entry), err)]
    pub async fn invoke(&self, initial: StateSnapshot) -> Result<StateSnapshot, EngineError> {
        let mut engine = Engine::new(self.clone(), initial);
        engine.invoke().await
    }
}
