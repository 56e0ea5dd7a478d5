//! Error types for the converter module.

use std::path::PathBuf;
use thiserror::Error;

use super::types::FailureKind;
use crate::media::{MediaCategory, OutputFormat};

/// Errors that can occur while converting one file.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Requested format is not in the catalog for the file's category.
    #[error("Cannot convert {category} to {format}")]
    UnsupportedFormat {
        category: MediaCategory,
        format: OutputFormat,
    },

    /// Output path resolves to the input file itself.
    #[error("Output {path} would overwrite the input file")]
    OutputIsInput { path: PathBuf },

    /// Output directory does not exist and could not be created.
    #[error("Failed to create output directory: {path}")]
    OutputDirectoryFailed { path: PathBuf },

    /// The transcoding subprocess could not be started.
    #[error("Failed to launch {program}: {reason}")]
    LaunchFailed { program: String, reason: String },

    /// The transcoding subprocess exited unsuccessfully.
    #[error("FFmpeg exited with code {code:?}")]
    NonZeroExit { code: Option<i32>, stderr: String },

    /// Conversion timed out.
    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Failed to probe media file.
    #[error("Failed to probe media file: {reason}")]
    ProbeFailed { reason: String },

    /// Failed to parse FFprobe output.
    #[error("Failed to parse media info: {reason}")]
    ParseError { reason: String },

    /// In-process image re-encode failed.
    #[error("Image re-encode failed: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error during conversion.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else, including a panicked job.
    #[error("Unexpected failure: {reason}")]
    Unexpected { reason: String },
}

impl ConverterError {
    /// Creates a launch failure for `program`.
    pub fn launch_failed(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LaunchFailed {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Creates an unexpected failure.
    pub fn unexpected(reason: impl Into<String>) -> Self {
        Self::Unexpected {
            reason: reason.into(),
        }
    }

    /// Classifies this error for outcome reporting.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::UnsupportedFormat { .. } => FailureKind::UnsupportedFormat,
            Self::FfmpegNotFound { .. } | Self::LaunchFailed { .. } => FailureKind::LaunchFailed,
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::NonZeroExit { .. } => FailureKind::NonZeroExit,
            _ => FailureKind::Unexpected,
        }
    }

    /// Whether the failure happened after output writing may have begun.
    pub fn may_leave_partial_output(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::NonZeroExit { .. }
                | Self::Image(_)
                | Self::Io(_)
                | Self::Unexpected { .. }
        )
    }

    /// Human readable detail, including captured stderr where there is one.
    pub fn detail(&self) -> String {
        match self {
            Self::NonZeroExit { stderr, .. } if !stderr.trim().is_empty() => {
                format!("{}: {}", self, stderr.trim())
            }
            _ => self.to_string(),
        }
    }
}
