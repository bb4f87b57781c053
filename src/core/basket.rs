//! # Baskets: the unit the supervisor schedules.
//!
//! A [`Basket`] pairs a suite with its ordered task ids and acts as the worker
//! factory for that suite. [`baskets`] builds them from discovered suites.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::{Config, Worker};
use crate::error::StartError;
use crate::events::Bus;
use crate::suite::{Suite, WorkerContext};

/// One suite ready to be scheduled.
pub struct Basket<S: Suite> {
    key: String,
    suite: Arc<S>,
    tasks: Vec<String>,
}

impl<S: Suite> Basket<S> {
    /// Builds a basket for `suite`; `None` when the suite has no tasks.
    pub fn new(suite: Arc<S>) -> Option<Self> {
        let tasks: Vec<String> = suite.tasks().iter().map(|t| t.name().to_string()).collect();
        if tasks.is_empty() {
            return None;
        }
        Some(Self {
            key: suite_key(suite.path()).to_string(),
            suite,
            tasks,
        })
    }

    /// Last path component of the suite path.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The suite.
    pub fn suite(&self) -> &Arc<S> {
        &self.suite
    }

    /// Task ids in discovery order.
    pub fn tasks(&self) -> &[String] {
        &self.tasks
    }

    /// Context of worker `id` of this basket.
    pub fn context(&self, id: usize, cfg: Arc<Config>) -> WorkerContext {
        WorkerContext::new(id, self.suite.path(), cfg)
    }

    /// Creates and starts a worker for this basket; `token` aborts a pending start.
    pub async fn gen_worker(
        &self,
        ctx: WorkerContext,
        bus: Bus,
        token: CancellationToken,
    ) -> Result<Worker<S>, StartError> {
        Worker::start(Arc::clone(&self.suite), ctx, bus, token).await
    }
}

/// Builds one basket per suite that has at least one task, keeping the given order.
pub fn baskets<S: Suite>(suites: impl IntoIterator<Item = Arc<S>>) -> Vec<Basket<S>> {
    suites.into_iter().filter_map(Basket::new).collect()
}

fn suite_key(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_last_path_component() {
        assert_eq!(suite_key("box"), "box");
        assert_eq!(suite_key("replication/sync"), "sync");
        assert_eq!(suite_key("suites/engine/"), "engine");
    }
}
