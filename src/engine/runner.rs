//! The superstep runner.
//!
//! One [`Engine`] drives one workflow invocation through bulk-synchronous
//! supersteps. Within a superstep the active vertices run concurrently on
//! Tokio tasks, each against its own snapshot clone; between supersteps
//! the engine is strictly sequential: it drains the barrier, merges the
//! message bag, evaluates conditional routing, and recomputes the active
//! set before anything runs again.

use chrono::{DateTime, Utc};
use futures_util::stream::{FuturesUnordered, StreamExt};
use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tracing::instrument;

use crate::engine::RunConfig;
use crate::merge::{self, MergeError};
use crate::message::Message;
use crate::state::StateSnapshot;
use crate::types::{ActiveStatus, VertexKey, VertexStatus};
use crate::vertex::{Delta, VertexContext, VertexError};
use crate::workflow::Workflow;

/// How an invocation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// The active set emptied; the graph ran to its sinks.
    Completed,
    /// The superstep budget ran out with work still active.
    BudgetExceeded,
}

/// Diagnostic record of a contained vertex failure.
#[derive(Clone, Debug, Serialize)]
pub struct FailureRecord {
    /// When the failure was observed at the barrier.
    pub when: DateTime<Utc>,
    /// Id of the failing vertex.
    pub vertex: String,
    /// Superstep in which it failed.
    pub step: u32,
    /// Stringified vertex error.
    pub message: String,
}

/// Shape violations in vertex results.
///
/// These are programmer errors: they abort the invocation instead of
/// being contained like ordinary vertex failures.
#[derive(Debug, Error, Diagnostic)]
pub enum ValidationError {
    /// A delta wrote a key that does not exist in the current state.
    #[error("vertex '{vertex}' wrote unknown state key '{key}'")]
    #[diagnostic(
        code(loomstep::engine::unknown_state_key),
        help("Deltas may only update keys present in the initial state.")
    )]
    UnknownStateKey { vertex: String, key: String },

    /// A conditional vertex returned a key absent from its routing table.
    #[error("conditional vertex '{vertex}' returned unknown routing key '{key}'")]
    #[diagnostic(
        code(loomstep::engine::unknown_route_key),
        help("Every key a router can return must be mapped in add_conditional_edges.")
    )]
    UnknownRouteKey { vertex: String, key: String },
}

/// Errors that abort an invocation.
#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    /// A vertex result failed shape validation.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    /// The barrier merge rejected the superstep's deltas.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Merge(#[from] MergeError),

    /// A conditional vertex failed while routing between supersteps.
    #[error("conditional vertex '{vertex}' failed during routing: {source}")]
    #[diagnostic(code(loomstep::engine::router))]
    Router {
        vertex: String,
        #[source]
        source: VertexError,
    },

    /// A vertex task panicked or was cancelled.
    #[error("vertex task join error: {0}")]
    #[diagnostic(code(loomstep::engine::join))]
    Join(#[from] JoinError),
}

/// Drives one workflow invocation through supersteps.
///
/// Owns all run state exclusively; vertices only ever see snapshot
/// clones. Re-invoking the same engine resets the run state and starts
/// over from the initial snapshot.
pub struct Engine {
    workflow: Arc<Workflow>,
    config: RunConfig,
    initial: StateSnapshot,
    current: StateSnapshot,
    history: Vec<StateSnapshot>,
    step_count: u32,
    statuses: FxHashMap<String, VertexStatus>,
    active: FxHashMap<String, ActiveStatus>,
    visited: FxHashSet<String>,
    last_results: FxHashMap<String, Message>,
    inbox: Vec<Message>,
    failures: Vec<FailureRecord>,
    termination: Option<RunStatus>,
}

impl Engine {
    /// Creates an engine for `workflow` seeded with `initial`, using the
    /// workflow's run configuration.
    #[must_use]
    pub fn new(workflow: Workflow, initial: StateSnapshot) -> Self {
        let config = workflow.run_config().clone();
        Self::with_config(workflow, initial, config)
    }

    /// Creates an engine with an explicit run configuration.
    #[must_use]
    pub fn with_config(workflow: Workflow, initial: StateSnapshot, config: RunConfig) -> Self {
        Self {
            workflow: Arc::new(workflow),
            config,
            current: initial.clone(),
            initial,
            history: Vec::new(),
            step_count: 0,
            statuses: FxHashMap::default(),
            active: FxHashMap::default(),
            visited: FxHashSet::default(),
            last_results: FxHashMap::default(),
            inbox: Vec::new(),
            failures: Vec::new(),
            termination: None,
        }
    }

    /// Overrides the superstep budget for subsequent invocations.
    pub fn set_max_supersteps(&mut self, max_supersteps: u32) {
        self.config.max_supersteps = max_supersteps;
    }

    /// Runs the workflow to termination and returns the terminal snapshot.
    ///
    /// Run state is reset first, so an engine can be invoked repeatedly;
    /// each invocation starts from the initial snapshot.
    #[instrument(skip(self), fields(run = %self.config.run_id), err)]
    pub async fn invoke(&mut self) -> Result<StateSnapshot, EngineError> {
        self.reset();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut frontier: Vec<String> = vec![self.workflow.entry().to_string()];
        self.mark_active(&frontier);

        loop {
            if self.step_count >= self.config.max_supersteps {
                tracing::warn!(
                    step = self.step_count,
                    budget = self.config.max_supersteps,
                    "superstep budget exceeded with active vertices remaining"
                );
                self.termination = Some(RunStatus::BudgetExceeded);
                break;
            }

            let step = self.step_count + 1;
            let bag = self.run_superstep(&frontier, step, &semaphore).await?;

            let next_state = merge::merge_superstep(&self.current, &bag)?;
            tracing::debug!(
                step,
                version = next_state.version(),
                messages = bag.len(),
                "barrier merge committed"
            );
            self.history.push(next_state.clone());
            self.current = next_state;
            self.inbox = bag;
            self.step_count = step;

            let next = self.next_frontier(&frontier, step).await?;
            self.mark_active(&next);
            if next.is_empty() {
                tracing::info!(step = self.step_count, "workflow completed");
                self.termination = Some(RunStatus::Completed);
                break;
            }
            frontier = next;
        }

        Ok(self.current.clone())
    }

    /// Fans out one superstep and drains the barrier in completion order.
    async fn run_superstep(
        &mut self,
        frontier: &[String],
        step: u32,
        semaphore: &Arc<Semaphore>,
    ) -> Result<Vec<Message>, EngineError> {
        tracing::debug!(step, active = ?frontier, "superstep fan-out");

        let mut tasks: FuturesUnordered<JoinHandle<(String, Result<Delta, VertexError>)>> =
            FuturesUnordered::new();
        for id in frontier {
            let Some(vertex) = self.workflow.vertex(id) else {
                // Unreachable post-compile: activations are validated.
                tracing::error!(vertex = %id, "active id missing from registry; skipping");
                continue;
            };
            let vertex = Arc::clone(vertex);
            self.statuses.insert(id.clone(), VertexStatus::Running);
            self.visited.insert(id.clone());
            let ctx = VertexContext {
                vertex_id: id.clone(),
                step,
                run_id: self.config.run_id.clone(),
            };
            let view = self.current.clone();
            let semaphore = Arc::clone(semaphore);
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = vertex.run(view, ctx).await;
                (id, result)
            }));
        }

        let mut bag: Vec<Message> = Vec::new();
        while let Some(joined) = tasks.next().await {
            let (id, result) = joined?;
            match result {
                Ok(delta) => {
                    for key in delta.updates.keys() {
                        if !self.current.contains_key(key) {
                            return Err(ValidationError::UnknownStateKey {
                                vertex: id,
                                key: key.clone(),
                            }
                            .into());
                        }
                    }
                    self.statuses.insert(id.clone(), VertexStatus::Success);
                    let message = Message::delta(id.clone(), delta.updates);
                    self.last_results.insert(id, message.clone());
                    bag.push(message);
                }
                Err(error) => {
                    tracing::warn!(vertex = %id, step, error = %error, "vertex failed");
                    self.statuses.insert(id.clone(), VertexStatus::Failed);
                    self.failures.push(FailureRecord {
                        when: Utc::now(),
                        vertex: id.clone(),
                        step,
                        message: error.to_string(),
                    });
                    let message = Message::internal_error(id.clone(), &error);
                    self.last_results.insert(id, message.clone());
                    bag.push(message);
                }
            }
        }
        Ok(bag)
    }

    /// Computes the next active set from the set that just ran.
    ///
    /// `End` children are sinks; a conditional child is resolved inline
    /// against the freshly merged snapshot; everything else activates
    /// directly. Activations are deduplicated, so fan-in parents activate
    /// a shared child once, and a self-loop re-activates its own vertex.
    async fn next_frontier(
        &mut self,
        ran: &[String],
        step: u32,
    ) -> Result<Vec<String>, EngineError> {
        let mut next: Vec<String> = Vec::new();
        for id in ran {
            let children: Vec<VertexKey> = match self.workflow.children_of(id) {
                Some(children) => children.to_vec(),
                None => continue,
            };
            for child in children {
                match child {
                    VertexKey::End => {}
                    VertexKey::Start => {}
                    VertexKey::Named(name) => {
                        if self.workflow.is_router(&name) {
                            if let Some(target) = self.resolve_route(&name, step).await? {
                                push_unique(&mut next, target);
                            }
                        } else {
                            push_unique(&mut next, name);
                        }
                    }
                }
            }
        }
        tracing::debug!(step, next = ?next, "next active set");
        Ok(next)
    }

    /// Evaluates one conditional vertex inline and resolves its target.
    ///
    /// Returns `None` when the route lands on the `End` sink. A failing
    /// router aborts the run: routing is control flow, not a containable
    /// node failure.
    async fn resolve_route(
        &mut self,
        router_id: &str,
        step: u32,
    ) -> Result<Option<String>, EngineError> {
        let Some(router) = self.workflow.router(router_id) else {
            return Ok(None);
        };
        let router = Arc::clone(router);
        self.statuses
            .insert(router_id.to_string(), VertexStatus::Running);
        self.visited.insert(router_id.to_string());
        let ctx = VertexContext {
            vertex_id: router_id.to_string(),
            step,
            run_id: self.config.run_id.clone(),
        };
        let key = match router.route(self.current.clone(), ctx).await {
            Ok(key) => key,
            Err(error) => {
                self.statuses
                    .insert(router_id.to_string(), VertexStatus::Failed);
                return Err(EngineError::Router {
                    vertex: router_id.to_string(),
                    source: error,
                });
            }
        };
        self.statuses
            .insert(router_id.to_string(), VertexStatus::Success);
        self.last_results
            .insert(router_id.to_string(), Message::route(router_id, key.clone()));
        tracing::debug!(router = %router_id, key = %key, "conditional routing");

        let Some(table) = self.workflow.routes_of(router_id) else {
            return Ok(None);
        };
        let target = table
            .get(&key)
            .ok_or_else(|| ValidationError::UnknownRouteKey {
                vertex: router_id.to_string(),
                key: key.clone(),
            })?;
        match target {
            VertexKey::Named(name) => Ok(Some(name.clone())),
            VertexKey::End | VertexKey::Start => Ok(None),
        }
    }

    fn reset(&mut self) {
        self.current = self.initial.clone();
        self.history = vec![self.initial.clone()];
        self.step_count = 0;
        self.statuses = self
            .workflow
            .vertex_ids()
            .map(|id| (id.clone(), VertexStatus::Initialized))
            .collect();
        self.active = self
            .workflow
            .vertex_ids()
            .map(|id| (id.clone(), ActiveStatus::Inactive))
            .collect();
        self.visited.clear();
        self.last_results.clear();
        self.inbox.clear();
        self.failures.clear();
        self.termination = None;
    }

    fn mark_active(&mut self, frontier: &[String]) {
        for status in self.active.values_mut() {
            *status = ActiveStatus::Inactive;
        }
        for id in frontier {
            self.active.insert(id.clone(), ActiveStatus::Active);
        }
    }

    // ========================================================================
    // Run-state accessors
    // ========================================================================

    /// The current (most recently committed) snapshot.
    #[must_use]
    pub fn state(&self) -> &StateSnapshot {
        &self.current
    }

    /// Ordered snapshot history: the initial snapshot plus one per
    /// completed superstep.
    #[must_use]
    pub fn history(&self) -> &[StateSnapshot] {
        &self.history
    }

    /// Number of supersteps completed by the last invocation.
    #[must_use]
    pub fn step_count(&self) -> u32 {
        self.step_count
    }

    /// How the last invocation ended, if it ran to termination.
    #[must_use]
    pub fn termination(&self) -> Option<RunStatus> {
        self.termination
    }

    /// Lifecycle status of a vertex in the current run state.
    #[must_use]
    pub fn vertex_status(&self, id: &str) -> Option<VertexStatus> {
        self.statuses.get(id).copied()
    }

    /// Active-set membership of a vertex in the current run state.
    #[must_use]
    pub fn active_status(&self, id: &str) -> Option<ActiveStatus> {
        self.active.get(id).copied()
    }

    /// Whether a vertex executed at least once in the last invocation.
    #[must_use]
    pub fn was_visited(&self, id: &str) -> bool {
        self.visited.contains(id)
    }

    /// The most recent message a vertex produced.
    #[must_use]
    pub fn last_result(&self, id: &str) -> Option<&Message> {
        self.last_results.get(id)
    }

    /// The last superstep's message bag (diagnostic).
    #[must_use]
    pub fn inbox(&self) -> &[Message] {
        &self.inbox
    }

    /// Contained vertex failures observed during the last invocation.
    #[must_use]
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// The run configuration in effect.
    #[must_use]
    pub fn run_config(&self) -> &RunConfig {
        &self.config
    }
}

fn push_unique(frontier: &mut Vec<String>, id: String) {
    if !frontier.contains(&id) {
        frontier.push(id);
    }
}
