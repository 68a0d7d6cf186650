//! Engine configuration types.

use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::Display;

/// What to do when a top-level target already exists at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Pick a free name such as "file (1).txt".
    #[default]
    AutoRename,
    /// Write over files and merge into directories.
    Overwrite,
    /// Leave the existing target alone and skip the source.
    Skip,
}

/// Configuration for the operation engine.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Maximum number of workers running at once (0 = unlimited).
    #[builder(default = "0")]
    #[serde(default)]
    pub max_workers: usize,

    /// Emit a progress event after this many items.
    #[builder(default = "64")]
    #[serde(default = "default_progress_batch")]
    pub progress_batch: u64,

    /// Emit a progress event at least this often while items complete.
    #[builder(default = "100")]
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Capacity of the worker-to-UI event channel.
    #[builder(default = "100")]
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// How copy and move resolve existing targets.
    #[builder(default)]
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
}

fn default_progress_batch() -> u64 {
    64
}

fn default_progress_interval_ms() -> u64 {
    100
}

fn default_channel_capacity() -> usize {
    100
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.progress_batch == Some(0) {
            return Err("Progress batch must be at least 1".to_string());
        }
        if self.channel_capacity == Some(0) {
            return Err("Channel capacity must be at least 1".to_string());
        }
        Ok(())
    }
}

impl EngineConfig {
    /// Create a new engine config builder.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Progress interval as a duration.
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Worker cap, `None` when unlimited.
    pub fn worker_limit(&self) -> Option<usize> {
        (self.max_workers > 0).then_some(self.max_workers)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: 0,
            progress_batch: default_progress_batch(),
            progress_interval_ms: default_progress_interval_ms(),
            channel_capacity: default_channel_capacity(),
            conflict_policy: ConflictPolicy::default(),
        }
    }
}
