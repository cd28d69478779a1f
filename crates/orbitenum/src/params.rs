//! Run parameters.

use std::path::PathBuf;

use serde::Deserialize;

/// Tunables for a dual-description run, deserialized from the configuration
/// file by the CLI and defaulted everywhere else.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunParams {
    /// Wall-clock budget in seconds. `None` means unbounded, which only the
    /// single-process driver accepts; the distributed driver requires a
    /// strictly positive budget.
    pub max_runtime: Option<u64>,
    /// Persist orbits to disk shards (`true`) or keep them in memory.
    pub saving: bool,
    /// Path prefix for shard directories when `saving` is set.
    pub db_prefix: PathBuf,
    /// Heuristic selector string for the initial facet set; see
    /// [`crate::sampling`].
    pub initial_facet_heuristic: String,
    /// Sub-cones with at most this many rays go to the direct dual-description
    /// primitive instead of a nested orbit-database run.
    pub direct_threshold: usize,
    /// Maximum number of previously-solved sub-cones kept in the data bank.
    pub bank_capacity: usize,
    /// Bound on concurrently in-flight outbound messages per worker.
    pub max_flying_messages: usize,
    /// Bound on faces parked in the unsent buffers per worker; reaching it
    /// forces a flush before more work is produced.
    pub max_unsent_faces: usize,
    /// Sleep, in milliseconds, for one idle wait when a worker has nothing to
    /// do but peers are still running.
    pub idle_sleep_ms: u64,
}

impl Default for RunParams {
    fn default() -> Self {
        RunParams {
            max_runtime: None,
            saving: false,
            db_prefix: PathBuf::from("dualdesc_db"),
            initial_facet_heuristic: "direct".to_string(),
            direct_threshold: 16,
            bank_capacity: 1024,
            max_flying_messages: 8,
            max_unsent_faces: 10_000,
            idle_sleep_ms: 1000,
        }
    }
}
