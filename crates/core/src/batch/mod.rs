//! Batch orchestration over a folder of media files.
//!
//! The orchestrator enumerates the regular files directly inside an input
//! folder, classifies each one, validates the target format against the
//! catalog and dispatches the survivors to a [`Converter`](crate::converter::Converter),
//! either concurrently or one at a time.
//!
//! Per-file progress travels over a private channel per job and is mapped
//! onto the batch as `(file_index + file_fraction) / total_files`. Within one
//! file the overall value only grows; under concurrent dispatch samples from
//! different files may interleave, so the overall value seen by a sink is
//! not globally monotonic.

mod aggregator;
mod config;
mod orchestrator;
mod types;

pub use aggregator::{overall_fraction, spawn_forwarder};
pub use config::{BatchConfig, ExecutionMode};
pub use orchestrator::{output_path_for, BatchOrchestrator, DispatchStatus};
pub use types::{BatchError, BatchProgress, BatchResult, CategoryCounts, FileFailure};
