use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::converter::FailureKind;
use crate::media::{MediaCategory, OutputFormat};

/// Something noteworthy that happened during a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    Started {
        batch_id: String,
        input_folder: PathBuf,
        output_folder: PathBuf,
        format: OutputFormat,
        total_files: usize,
    },
    FileSkipped {
        path: PathBuf,
        category: MediaCategory,
        reason: String,
    },
    FileStarted {
        index: usize,
        path: PathBuf,
        category: MediaCategory,
    },
    FileConverted {
        index: usize,
        path: PathBuf,
        output: PathBuf,
        duration_ms: u64,
    },
    FileFailed {
        index: usize,
        path: PathBuf,
        kind: FailureKind,
        detail: String,
    },
    Completed {
        batch_id: String,
        success_count: usize,
        total_count: usize,
        skipped_count: usize,
        duration_ms: u64,
    },
}

impl BatchEvent {
    /// Short name of the event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::FileSkipped { .. } => "file_skipped",
            Self::FileStarted { .. } => "file_started",
            Self::FileConverted { .. } => "file_converted",
            Self::FileFailed { .. } => "file_failed",
            Self::Completed { .. } => "completed",
        }
    }
}
