//! The bulk-synchronous execution engine.
//!
//! An [`Engine`] owns everything that changes during one invocation: the
//! current snapshot, the snapshot history, vertex statuses, the active
//! set, the diagnostic inbox, and the termination flag. The compiled
//! [`Workflow`](crate::workflow::Workflow) it drives stays immutable.
//!
//! Execution proceeds in supersteps: fan out the active set onto
//! concurrent tasks, wait for all of them at the barrier, merge their
//! deltas into one new snapshot, resolve conditional routing, and activate
//! the next set. The loop ends when the active set empties
//! ([`RunStatus::Completed`]) or the superstep budget runs out
//! ([`RunStatus::BudgetExceeded`], a normal return with a flag, not an
//! error).
//!
//! # Usage
//!
//! ```rust,no_run
//! use loomstep::engine::Engine;
//! use loomstep::state::StateSnapshot;
//! # use loomstep::workflow::Workflow;
//! # async fn example(workflow: Workflow) -> Result<(), Box<dyn std::error::Error>> {
//! let initial = StateSnapshot::builder().build();
//! let mut engine = Engine::new(workflow, initial);
//! engine.set_max_supersteps(50);
//! let terminal = engine.invoke().await?;
//! println!("finished after {} supersteps", engine.step_count());
//! # Ok(())
//! # }
//! ```

pub mod run_config;
pub mod runner;

pub use run_config::{DEFAULT_MAX_SUPERSTEPS, RunConfig};
pub use runner::{Engine, EngineError, FailureRecord, RunStatus, ValidationError};
