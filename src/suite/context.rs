//! # Worker identity handed to suites.
//!
//! Each worker gets its own [`WorkerContext`]; suites derive server paths from
//! it instead of mutating shared suite settings, so concurrent workers of one
//! suite never collide on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::Config;
use crate::log::LogWatcher;

/// Identity and private working directory of one worker.
#[derive(Clone, Debug)]
pub struct WorkerContext {
    id: usize,
    name: String,
    vardir: PathBuf,
    config: Arc<Config>,
}

impl WorkerContext {
    /// Derives the context of worker `id` serving `suite_path`.
    ///
    /// - name: `"{id:02}_{suite_path}"`
    /// - working directory: `<config.vardir>/<name>`
    pub fn new(id: usize, suite_path: &str, config: Arc<Config>) -> Self {
        let name = format!("{id:02}_{suite_path}");
        let vardir = config.vardir.join(&name);
        Self {
            id,
            name,
            vardir,
            config,
        }
    }

    /// Worker number within its suite, starting at 1.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Stable worker name, used as the prefix of every status line.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Private working directory of this worker.
    pub fn vardir(&self) -> &Path {
        &self.vardir
    }

    /// Run configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Watcher for `path` polling with the run's configured policy.
    pub fn log_watcher(&self, path: impl Into<PathBuf>) -> LogWatcher {
        LogWatcher::with_config(path, &self.config)
    }
}
