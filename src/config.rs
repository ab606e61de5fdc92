//! Engine configuration
//!
//! Tunables for the runtime and for duplicate detection. Values normally come
//! from the command line (see [`crate::cli`]); zero values fall back to the
//! defaults with a warning.

/// Configuration for the engine runtime and duplicate detection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Worker threads for the async runtime and parallel grouping
    pub worker_threads: usize,
    /// Visible transaction count at which duplicate grouping goes parallel
    pub parallel_dedup_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
            parallel_dedup_threshold: 10_000,
        }
    }
}

impl EngineConfig {
    /// Create an EngineConfig with custom values
    pub fn new(worker_threads: usize, parallel_dedup_threshold: usize) -> Self {
        let default = Self::default();

        let worker_threads = if worker_threads == 0 {
            tracing::warn!(
                "Invalid worker_threads ({}), using default ({})",
                worker_threads,
                default.worker_threads
            );
            default.worker_threads
        } else {
            worker_threads
        };

        let parallel_dedup_threshold = if parallel_dedup_threshold == 0 {
            tracing::warn!(
                "Invalid parallel_dedup_threshold ({}), using default ({})",
                parallel_dedup_threshold,
                default.parallel_dedup_threshold
            );
            default.parallel_dedup_threshold
        } else {
            parallel_dedup_threshold
        };

        Self {
            worker_threads,
            parallel_dedup_threshold,
        }
    }
}
