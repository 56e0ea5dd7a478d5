//! Types for the batch module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::converter::FailureKind;
use crate::media::MediaCategory;

/// Error type for batch-level failures.
///
/// Per-file problems never surface here; they are recorded in
/// [`BatchResult::failures`].
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The output folder could not be created.
    #[error("Failed to create output folder {path}: {source}")]
    OutputFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input folder is missing or could not be listed.
    #[error("Failed to read input folder {path}: {source}")]
    InputFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Number of enumerated files per detected category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub image: usize,
    pub video: usize,
    pub audio: usize,
    pub unknown: usize,
}

impl CategoryCounts {
    /// Records one file of the given category.
    pub fn record(&mut self, category: MediaCategory) {
        match category {
            MediaCategory::Image => self.image += 1,
            MediaCategory::Video => self.video += 1,
            MediaCategory::Audio => self.audio += 1,
            MediaCategory::Unknown => self.unknown += 1,
        }
    }

    /// Count for one category.
    pub fn get(&self, category: MediaCategory) -> usize {
        match category {
            MediaCategory::Image => self.image,
            MediaCategory::Video => self.video,
            MediaCategory::Audio => self.audio,
            MediaCategory::Unknown => self.unknown,
        }
    }

    pub fn total(&self) -> usize {
        self.image + self.video + self.audio + self.unknown
    }
}

/// A file that was attempted and failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFailure {
    /// Input path.
    pub path: PathBuf,
    /// Failure classification.
    pub kind: FailureKind,
    /// Human-readable cause, including tool stderr where available.
    pub detail: String,
}

/// Tally of one batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResult {
    /// Files converted successfully.
    pub success_count: usize,
    /// Regular files enumerated in the input folder.
    pub total_count: usize,
    /// Files not attempted (unknown content or filtered category).
    pub skipped_count: usize,
    /// Files per detected category.
    pub category_counts: CategoryCounts,
    /// Files attempted that did not convert.
    pub failures: Vec<FileFailure>,
    /// Wall-clock duration of the whole batch in milliseconds.
    pub duration_ms: u64,
}

impl BatchResult {
    /// Number of failed files.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// True when nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Overall progress of a batch, derived from one file's progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Index of the file within the batch (enumeration order).
    pub file_index: usize,
    /// Number of files in the batch.
    pub total_files: usize,
    /// Input file the sample belongs to.
    pub input_path: PathBuf,
    /// Completion of this file (0.0 - 1.0).
    pub file_fraction: f64,
    /// Completion of the batch (0.0 - 1.0).
    pub overall: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_counts() {
        let mut counts = CategoryCounts::default();
        counts.record(MediaCategory::Image);
        counts.record(MediaCategory::Image);
        counts.record(MediaCategory::Unknown);

        assert_eq!(counts.get(MediaCategory::Image), 2);
        assert_eq!(counts.get(MediaCategory::Video), 0);
        assert_eq!(counts.unknown, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_batch_error_display() {
        let err = BatchError::InputFolder {
            path: PathBuf::from("/missing"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert!(err.to_string().contains("/missing"));
    }
}
