//! Per-invocation engine configuration.

use uuid::Uuid;

/// Default superstep budget, the engine's safety net for cycles.
pub const DEFAULT_MAX_SUPERSTEPS: u32 = 100;

/// Environment variable overriding the default superstep budget.
pub const MAX_SUPERSTEPS_ENV: &str = "LOOMSTEP_MAX_SUPERSTEPS";

/// Engine settings for one invocation.
///
/// Attached to a graph via
/// [`GraphBuilder::with_run_config`](crate::graphs::GraphBuilder::with_run_config)
/// or overridden per engine.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Superstep budget; the engine exits with `BudgetExceeded` when the
    /// active set is still non-empty at this count.
    pub max_supersteps: u32,
    /// Maximum vertex tasks running simultaneously within a superstep.
    pub concurrency: usize,
    /// Id tagging this invocation in logs and vertex contexts.
    pub run_id: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_supersteps: Self::resolve_max_supersteps(),
            concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            run_id: Self::generate_run_id(),
        }
    }
}

impl RunConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve_max_supersteps() -> u32 {
        dotenvy::dotenv().ok();
        std::env::var(MAX_SUPERSTEPS_ENV)
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_MAX_SUPERSTEPS)
    }

    fn generate_run_id() -> String {
        format!("run-{}", Uuid::new_v4().simple())
    }

    #[must_use]
    pub fn with_max_supersteps(mut self, max_supersteps: u32) -> Self {
        self.max_supersteps = max_supersteps;
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }
}
