//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::error::ConverterError;
use crate::media::{MediaCategory, OutputFormat};

/// Optional pass-through parameters for the external tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOptions {
    /// Target picture size as (width, height). Video resolution, image
    /// resize, or waveform size depending on the strategy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<(u32, u32)>,
}

impl ConversionOptions {
    pub fn with_scale(width: u32, height: u32) -> Self {
        Self {
            scale: Some((width, height)),
        }
    }
}

/// A conversion job request for one file.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// Job ID, unique within a batch.
    pub job_id: String,
    /// Input file path.
    pub input_path: PathBuf,
    /// Output file path.
    pub output_path: PathBuf,
    /// Category detected for the input.
    pub category: MediaCategory,
    /// Requested output format.
    pub format: OutputFormat,
    /// Pass-through options.
    pub options: ConversionOptions,
}

impl ConversionJob {
    /// Creates a job with default options.
    pub fn new(
        job_id: impl Into<String>,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        category: MediaCategory,
        format: OutputFormat,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            input_path: input_path.into(),
            output_path: output_path.into(),
            category,
            format,
            options: ConversionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ConversionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Progress update during conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionProgress {
    /// Job ID.
    pub job_id: String,
    /// Completed fraction of this job, in [0.0, 1.0].
    pub fraction: f64,
    /// Output time reached so far, in seconds.
    pub time_secs: f64,
    /// Probed total duration in seconds (1.0 when unknown).
    pub duration_secs: f64,
}

/// Why a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedFormat,
    LaunchFailed,
    Timeout,
    NonZeroExit,
    Unexpected,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnsupportedFormat => "unsupported format",
            Self::LaunchFailed => "launch failed",
            Self::Timeout => "timeout",
            Self::NonZeroExit => "non-zero exit",
            Self::Unexpected => "unexpected failure",
        };
        f.write_str(s)
    }
}

/// Failure details attached to an unsuccessful outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionFailure {
    pub kind: FailureKind,
    pub detail: String,
}

/// Result of one conversion job. Never an error: failures are data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutcome {
    /// Job ID.
    pub job_id: String,
    /// Input file path.
    pub input_path: PathBuf,
    /// Output file path.
    pub output_path: PathBuf,
    /// Whether the output was produced.
    pub succeeded: bool,
    /// Failure details when `succeeded` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ConversionFailure>,
    /// Wall-clock time spent on the job in milliseconds.
    pub duration_ms: u64,
}

impl ConversionOutcome {
    /// Successful outcome for `job`.
    pub fn success(job: &ConversionJob, duration_ms: u64) -> Self {
        Self {
            job_id: job.job_id.clone(),
            input_path: job.input_path.clone(),
            output_path: job.output_path.clone(),
            succeeded: true,
            failure: None,
            duration_ms,
        }
    }

    /// Failed outcome for `job` caused by `error`.
    pub fn failure(job: &ConversionJob, error: &ConverterError, duration_ms: u64) -> Self {
        Self {
            job_id: job.job_id.clone(),
            input_path: job.input_path.clone(),
            output_path: job.output_path.clone(),
            succeeded: false,
            failure: Some(ConversionFailure {
                kind: error.kind(),
                detail: error.detail(),
            }),
            duration_ms,
        }
    }

    /// Kind of failure, if any.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure.as_ref().map(|f| f.kind)
    }
}
