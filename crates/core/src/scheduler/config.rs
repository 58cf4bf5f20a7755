//! Scheduler configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the upload scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Upload workers spawned per iteration.
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Number of iterations to run.
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Pause between iterations (seconds). Not applied after the last one.
    #[serde(default)]
    pub cooldown_secs: u64,

    /// Attach a random caption to every commit.
    #[serde(default = "default_attach_captions")]
    pub attach_captions: bool,

    /// Send one throwaway upload before the first iteration.
    #[serde(default)]
    pub trial_upload: bool,

    /// Treat any failed worker as a failed run (process exit code).
    #[serde(default)]
    pub strict: bool,
}

fn default_threads() -> usize {
    1
}

fn default_iterations() -> usize {
    1
}

fn default_attach_captions() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            iterations: default_iterations(),
            cooldown_secs: 0,
            attach_captions: default_attach_captions(),
            trial_upload: false,
            strict: false,
        }
    }
}
