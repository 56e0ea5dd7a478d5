//! Mock converter for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use crate::converter::{
    offer, ConversionFailure, ConversionJob, ConversionOutcome, ConversionProgress, Converter,
    ConverterError, SENTINEL_DURATION,
};
use crate::media::MediaCategory;

/// A recorded conversion job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    /// The job that was submitted.
    pub job: ConversionJob,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Track conversion jobs for assertions
/// - Fail or panic on chosen input file names
/// - Control probed durations
/// - Simulate progress updates
///
/// Successful conversions write a small placeholder to the job's output
/// path so callers can assert on produced files.
///
/// # Example
///
/// ```rust,ignore
/// use unicon_core::testing::MockConverter;
///
/// let converter = MockConverter::new();
/// converter
///     .fail_on("broken.mp4", ConverterError::Timeout { timeout_secs: 30 })
///     .await;
///
/// let outcome = converter.convert(job).await;
///
/// let conversions = converter.recorded_conversions().await;
/// assert_eq!(conversions.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockConverter {
    /// Recorded conversions.
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// Failures keyed by input file name.
    failures: Arc<RwLock<HashMap<String, ConversionFailure>>>,
    /// Input file names whose conversion panics.
    panics: Arc<RwLock<HashSet<String>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// Pre-configured probe durations by path.
    durations: Arc<RwLock<HashMap<PathBuf, f64>>>,
    /// Simulated conversion duration.
    conversion_delay: Arc<RwLock<Duration>>,
    /// Number of progress samples sent per conversion.
    progress_steps: Arc<RwLock<usize>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a new mock converter.
    pub fn new() -> Self {
        Self {
            conversions: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            panics: Arc::new(RwLock::new(HashSet::new())),
            next_error: Arc::new(RwLock::new(None)),
            durations: Arc::new(RwLock::new(HashMap::new())),
            conversion_delay: Arc::new(RwLock::new(Duration::ZERO)),
            progress_steps: Arc::new(RwLock::new(4)),
        }
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Get the submitted jobs in submission order.
    pub async fn recorded_jobs(&self) -> Vec<ConversionJob> {
        self.conversions
            .read()
            .await
            .iter()
            .map(|c| c.job.clone())
            .collect()
    }

    /// Clear recorded conversions.
    pub async fn clear_recorded(&self) {
        self.conversions.write().await.clear();
    }

    /// Get the number of conversions performed.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Fail every conversion of an input with this file name.
    pub async fn fail_on(&self, file_name: &str, error: ConverterError) {
        self.failures.write().await.insert(
            file_name.to_string(),
            ConversionFailure {
                kind: error.kind(),
                detail: error.detail(),
            },
        );
    }

    /// Panic inside the conversion of an input with this file name.
    pub async fn panic_on(&self, file_name: &str) {
        self.panics.write().await.insert(file_name.to_string());
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the probed duration for a specific path.
    pub async fn set_duration(&self, path: impl AsRef<Path>, secs: f64) {
        self.durations
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), secs);
    }

    /// Set the simulated conversion duration.
    pub async fn set_conversion_delay(&self, delay: Duration) {
        *self.conversion_delay.write().await = delay;
    }

    /// Set how many progress samples each conversion sends; 0 disables them.
    pub async fn set_progress_steps(&self, steps: usize) {
        *self.progress_steps.write().await = steps;
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<ConverterError> {
        self.next_error.write().await.take()
    }

    async fn run(
        &self,
        job: ConversionJob,
        progress_tx: Option<mpsc::Sender<ConversionProgress>>,
    ) -> ConversionOutcome {
        let file_name = job
            .input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if self.panics.read().await.contains(&file_name) {
            panic!("mock conversion panicked on {}", file_name);
        }

        let delay = *self.conversion_delay.read().await;
        let steps = *self.progress_steps.read().await;

        if let Some(tx) = progress_tx.filter(|_| steps > 0) {
            let duration_secs = self.probe_duration(&job.input_path, job.category).await;
            for i in 1..=steps {
                let fraction = i as f64 / steps as f64;
                let sample = ConversionProgress {
                    job_id: job.job_id.clone(),
                    fraction,
                    time_secs: fraction * duration_secs,
                    duration_secs,
                };
                offer(&tx, sample, i == steps);
                tokio::time::sleep(delay / steps as u32).await;
            }
        } else if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failure = match self.take_error().await {
            Some(err) => Some(ConversionFailure {
                kind: err.kind(),
                detail: err.detail(),
            }),
            None => self.failures.read().await.get(&file_name).cloned(),
        };

        let outcome = match failure {
            Some(failure) => ConversionOutcome {
                job_id: job.job_id.clone(),
                input_path: job.input_path.clone(),
                output_path: job.output_path.clone(),
                succeeded: false,
                failure: Some(failure),
                duration_ms: delay.as_millis() as u64,
            },
            None => match write_placeholder(&job.output_path).await {
                Ok(()) => ConversionOutcome::success(&job, delay.as_millis() as u64),
                Err(e) => ConversionOutcome::failure(&job, &ConverterError::Io(e), 0),
            },
        };

        self.conversions.write().await.push(RecordedConversion {
            job,
            success: outcome.succeeded,
        });
        outcome
    }
}

async fn write_placeholder(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, b"mock output").await
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe_duration(&self, path: &Path, category: MediaCategory) -> f64 {
        if category == MediaCategory::Image {
            return SENTINEL_DURATION;
        }
        self.durations
            .read()
            .await
            .get(path)
            .copied()
            .unwrap_or(SENTINEL_DURATION)
    }

    async fn convert(&self, job: ConversionJob) -> ConversionOutcome {
        self.run(job, None).await
    }

    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> ConversionOutcome {
        self.run(job, Some(progress_tx)).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(())
    }
}
