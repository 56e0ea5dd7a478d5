//! Configuration for batch dispatch.

use serde::{Deserialize, Serialize};

/// How the files of one batch are dispatched to the converter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One task per file, bounded by `max_parallel_conversions`.
    #[default]
    Concurrent,
    /// One file at a time, in enumeration order.
    Sequential,
}

/// Configuration for the batch orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Dispatch mode.
    #[serde(default)]
    pub execution_mode: ExecutionMode,

    /// Maximum conversions running at once in concurrent mode.
    #[serde(default = "default_max_conversions")]
    pub max_parallel_conversions: usize,

    /// Capacity of each per-job progress channel.
    #[serde(default = "default_progress_buffer")]
    pub progress_buffer: usize,
}

fn default_max_conversions() -> usize {
    4
}

fn default_progress_buffer() -> usize {
    64
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::default(),
            max_parallel_conversions: default_max_conversions(),
            progress_buffer: default_progress_buffer(),
        }
    }
}

impl BatchConfig {
    /// Sets the execution mode.
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    /// Sets the concurrency limit.
    pub fn with_max_parallel(mut self, max: usize) -> Self {
        self.max_parallel_conversions = max;
        self
    }

    /// Effective number of permits; a zero limit still lets one job run.
    pub fn permits(&self) -> usize {
        match self.execution_mode {
            ExecutionMode::Sequential => 1,
            ExecutionMode::Concurrent => self.max_parallel_conversions.max(1),
        }
    }
}
