//! The validating graph builder.
//!
//! Holds the mutable registries and adjacency structures while a workflow
//! is being declared. Every mutator validates its inputs and returns the
//! builder back on success, so construction reads as a fluent chain with
//! `?` at each step.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::engine::RunConfig;
use crate::types::VertexKey;
use crate::vertex::{Router, Vertex};

/// Internal parts handed to compilation.
pub(super) type GraphParts = (
    FxHashMap<String, Arc<dyn Vertex>>,
    FxHashMap<String, Arc<dyn Router>>,
    FxHashMap<String, Vec<VertexKey>>,
    FxHashMap<String, FxHashMap<String, VertexKey>>,
    Option<String>,
    RunConfig,
);

/// Configuration errors raised while declaring a graph.
///
/// Each error is returned by the offending builder call; the builder
/// itself is left unchanged (the failed call consumed and dropped it, so
/// the erroneous graph cannot be compiled).
#[derive(Debug, Error, Diagnostic)]
pub enum GraphConfigError {
    /// A vertex id must be a non-empty string.
    #[error("vertex id must be non-empty")]
    #[diagnostic(code(loomstep::graph::empty_id))]
    EmptyId,

    /// `START` and `END` are reserved sentinels, not vertex ids.
    #[error("'{id}' is a reserved sentinel and cannot name a vertex")]
    #[diagnostic(
        code(loomstep::graph::reserved_id),
        help("Use START/END only as edge endpoints.")
    )]
    ReservedId { id: String },

    /// A vertex with this id is already registered.
    #[error("vertex '{id}' is already registered")]
    #[diagnostic(code(loomstep::graph::duplicate_vertex))]
    DuplicateVertex { id: String },

    /// An edge endpoint or routing target names no registered vertex.
    #[error("vertex '{id}' is not registered")]
    #[diagnostic(
        code(loomstep::graph::unknown_vertex),
        help("Register '{id}' with add_node or add_conditional_node first.")
    )]
    UnknownVertex { id: String },

    /// `END` is a sink and cannot be an edge source.
    #[error("END cannot be an edge source")]
    #[diagnostic(code(loomstep::graph::end_as_source))]
    EndAsSource,

    /// `START` is an entry and cannot be an edge destination.
    #[error("START cannot be an edge destination")]
    #[diagnostic(code(loomstep::graph::start_as_target))]
    StartAsTarget,

    /// `START` already has its single target.
    #[error("START already targets '{existing}'")]
    #[diagnostic(
        code(loomstep::graph::start_already_set),
        help("A graph has exactly one entry vertex.")
    )]
    StartAlreadySet { existing: String },

    /// `START` must target a registered standard vertex, not `END`.
    #[error("START must target a registered standard vertex")]
    #[diagnostic(code(loomstep::graph::invalid_start_target))]
    InvalidStartTarget,

    /// This edge was already declared.
    #[error("edge from '{from}' to '{to}' already exists")]
    #[diagnostic(code(loomstep::graph::duplicate_edge))]
    DuplicateEdge { from: String, to: String },

    /// A standard vertex may route to at most one conditional child.
    #[error("vertex '{from}' already has conditional child '{existing}'")]
    #[diagnostic(
        code(loomstep::graph::multiple_routers),
        help("A conditional child's routing collapses into a single next vertex; one per parent.")
    )]
    MultipleRouters { from: String, existing: String },

    /// The entry vertex cannot be a conditional vertex.
    #[error("conditional vertex '{id}' cannot be the START target")]
    #[diagnostic(
        code(loomstep::graph::router_as_entry),
        help("Conditional vertices are routing decisions, never active-set members.")
    )]
    RouterAsEntry { id: String },

    /// Conditional vertices have a routing table, not a child list.
    #[error("conditional vertex '{id}' cannot be an edge source")]
    #[diagnostic(
        code(loomstep::graph::router_as_source),
        help("Wire '{id}' with add_conditional_edges instead.")
    )]
    RouterAsSource { id: String },

    /// A routing target must be activatable, so it cannot be conditional.
    #[error("routing table of '{router}' targets conditional vertex '{target}'")]
    #[diagnostic(code(loomstep::graph::router_as_route_target))]
    RouterAsRouteTarget { router: String, target: String },

    /// `add_conditional_edges` only applies to conditional vertices.
    #[error("vertex '{id}' is not conditional")]
    #[diagnostic(
        code(loomstep::graph::not_conditional),
        help("Use add_edge for standard vertices.")
    )]
    NotConditional { id: String },

    /// The routing table for this vertex was already declared.
    #[error("routing table for '{id}' is already set")]
    #[diagnostic(code(loomstep::graph::routes_already_set))]
    RoutesAlreadySet { id: String },

    /// A routing table must map at least one key.
    #[error("routing table for '{id}' is empty")]
    #[diagnostic(code(loomstep::graph::empty_routing_table))]
    EmptyRoutingTable { id: String },
}

/// Builder for declaring workflow graphs with a fluent, validating API.
///
/// # Examples
///
/// ```rust
/// use loomstep::graphs::GraphBuilder;
/// use loomstep::vertex::{Delta, FnVertex, FnRouter};
/// use serde_json::json;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let workflow = GraphBuilder::new()
///     .add_node("work", FnVertex::new(|_s| {
///         Ok(Delta::new().with_value("done", json!(true)))
///     }))?
///     .add_node("cleanup", FnVertex::new(|_s| Ok(Delta::new())))?
///     .add_conditional_node("check", FnRouter::new(|s| {
///         let branch = if s.get("done") == Some(&json!(true)) { "finish" } else { "retry" };
///         Ok(branch.to_string())
///     }))?
///     .add_edge("START", "work")?
///     .add_edge("work", "check")?
///     .add_conditional_edges("check", [("finish", "END"), ("retry", "cleanup")])?
///     .add_edge("cleanup", "END")?
///     .compile()?;
/// assert!(workflow.is_router("check"));
/// # Ok(())
/// # }
/// ```
pub struct GraphBuilder {
    /// Standard vertices, keyed by id.
    vertices: FxHashMap<String, Arc<dyn Vertex>>,
    /// Conditional vertices, keyed by id.
    routers: FxHashMap<String, Arc<dyn Router>>,
    /// Child lists of standard vertices.
    edges: FxHashMap<String, Vec<VertexKey>>,
    /// Routing tables of conditional vertices.
    routes: FxHashMap<String, FxHashMap<String, VertexKey>>,
    /// The single START target.
    entry: Option<String>,
    /// Engine defaults carried into the compiled workflow.
    run_config: RunConfig,
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("vertices", &self.vertices.keys().collect::<Vec<_>>())
            .field("routers", &self.routers.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("routes", &self.routes)
            .field("entry", &self.entry)
            .field("run_config", &self.run_config)
            .finish()
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// Creates a new, empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            vertices: FxHashMap::default(),
            routers: FxHashMap::default(),
            edges: FxHashMap::default(),
            routes: FxHashMap::default(),
            entry: None,
            run_config: RunConfig::default(),
        }
    }

    /// Registers a standard vertex.
    ///
    /// Rejects empty ids, the reserved `START`/`END` sentinels, and ids
    /// already registered (standard or conditional).
    pub fn add_node(
        mut self,
        id: impl Into<String>,
        vertex: impl Vertex + 'static,
    ) -> Result<Self, GraphConfigError> {
        let id = id.into();
        self.check_new_id(&id)?;
        self.vertices.insert(id, Arc::new(vertex));
        Ok(self)
    }

    /// Registers a conditional vertex.
    ///
    /// Same id checks as [`add_node`](Self::add_node). Conditional
    /// vertices get their outgoing structure from
    /// [`add_conditional_edges`](Self::add_conditional_edges).
    pub fn add_conditional_node(
        mut self,
        id: impl Into<String>,
        router: impl Router + 'static,
    ) -> Result<Self, GraphConfigError> {
        let id = id.into();
        self.check_new_id(&id)?;
        self.routers.insert(id, Arc::new(router));
        Ok(self)
    }

    /// Adds a static edge.
    ///
    /// `from` may be the literal `"START"` (setting the single entry),
    /// `to` may be the literal `"END"`. Otherwise both endpoints must be
    /// registered; the source must be a standard vertex; duplicates are
    /// rejected, and a parent gains at most one conditional child.
    pub fn add_edge(mut self, from: &str, to: &str) -> Result<Self, GraphConfigError> {
        let from_key = VertexKey::from(from);
        let to_key = VertexKey::from(to);

        if from_key.is_end() {
            return Err(GraphConfigError::EndAsSource);
        }
        if to_key.is_start() {
            return Err(GraphConfigError::StartAsTarget);
        }

        match from_key {
            VertexKey::Start => {
                let VertexKey::Named(target) = to_key else {
                    return Err(GraphConfigError::InvalidStartTarget);
                };
                if self.routers.contains_key(&target) {
                    return Err(GraphConfigError::RouterAsEntry { id: target });
                }
                if !self.vertices.contains_key(&target) {
                    return Err(GraphConfigError::UnknownVertex { id: target });
                }
                if let Some(existing) = &self.entry {
                    return Err(GraphConfigError::StartAlreadySet {
                        existing: existing.clone(),
                    });
                }
                self.entry = Some(target);
            }
            VertexKey::Named(source) => {
                if self.routers.contains_key(&source) {
                    return Err(GraphConfigError::RouterAsSource { id: source });
                }
                if !self.vertices.contains_key(&source) {
                    return Err(GraphConfigError::UnknownVertex { id: source });
                }
                if let VertexKey::Named(target) = &to_key {
                    let target_is_router = self.routers.contains_key(target);
                    if !target_is_router && !self.vertices.contains_key(target) {
                        return Err(GraphConfigError::UnknownVertex { id: target.clone() });
                    }
                    if target_is_router
                        && let Some(children) = self.edges.get(&source)
                        && let Some(existing) = children
                            .iter()
                            .filter_map(VertexKey::as_name)
                            .find(|child| self.routers.contains_key(*child))
                    {
                        return Err(GraphConfigError::MultipleRouters {
                            from: source,
                            existing: existing.to_string(),
                        });
                    }
                }
                let children = self.edges.entry(source.clone()).or_default();
                if children.contains(&to_key) {
                    return Err(GraphConfigError::DuplicateEdge {
                        from: source,
                        to: to_key.to_string(),
                    });
                }
                children.push(to_key);
            }
            VertexKey::End => unreachable!("END source rejected above"),
        }
        Ok(self)
    }

    /// Sets the routing table of a conditional vertex.
    ///
    /// Every target must be a registered standard vertex or the literal
    /// `"END"`. The table is set exactly once and must be non-empty.
    pub fn add_conditional_edges<I, K, V>(
        mut self,
        from: &str,
        table: I,
    ) -> Result<Self, GraphConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if !self.routers.contains_key(from) {
            if self.vertices.contains_key(from) {
                return Err(GraphConfigError::NotConditional { id: from.to_string() });
            }
            return Err(GraphConfigError::UnknownVertex { id: from.to_string() });
        }
        if self.routes.contains_key(from) {
            return Err(GraphConfigError::RoutesAlreadySet { id: from.to_string() });
        }

        let mut resolved: FxHashMap<String, VertexKey> = FxHashMap::default();
        for (key, target) in table {
            let target = VertexKey::from(target.into());
            match &target {
                VertexKey::Start => return Err(GraphConfigError::StartAsTarget),
                VertexKey::End => {}
                VertexKey::Named(name) => {
                    if self.routers.contains_key(name) {
                        return Err(GraphConfigError::RouterAsRouteTarget {
                            router: from.to_string(),
                            target: name.clone(),
                        });
                    }
                    if !self.vertices.contains_key(name) {
                        return Err(GraphConfigError::UnknownVertex { id: name.clone() });
                    }
                }
            }
            resolved.insert(key.into(), target);
        }
        if resolved.is_empty() {
            return Err(GraphConfigError::EmptyRoutingTable { id: from.to_string() });
        }
        self.routes.insert(from.to_string(), resolved);
        Ok(self)
    }

    /// Overrides the engine defaults carried by the compiled workflow.
    #[must_use]
    pub fn with_run_config(mut self, run_config: RunConfig) -> Self {
        self.run_config = run_config;
        self
    }

    /// Number of registered vertices (standard and conditional).
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() + self.routers.len()
    }

    /// Number of declared static edges (routing tables not included).
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum::<usize>() + usize::from(self.entry.is_some())
    }

    fn check_new_id(&self, id: &str) -> Result<(), GraphConfigError> {
        if id.is_empty() {
            return Err(GraphConfigError::EmptyId);
        }
        if matches!(VertexKey::from(id), VertexKey::Start | VertexKey::End) {
            return Err(GraphConfigError::ReservedId { id: id.to_string() });
        }
        if self.vertices.contains_key(id) || self.routers.contains_key(id) {
            return Err(GraphConfigError::DuplicateVertex { id: id.to_string() });
        }
        Ok(())
    }

    /// Extracts the components for compilation.
    pub(super) fn into_parts(self) -> GraphParts {
        (
            self.vertices,
            self.routers,
            self.edges,
            self.routes,
            self.entry,
            self.run_config,
        )
    }
}
