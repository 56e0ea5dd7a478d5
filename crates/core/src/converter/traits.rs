//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

use super::error::ConverterError;
use super::types::{ConversionJob, ConversionOutcome, ConversionProgress};
use crate::media::MediaCategory;

/// A converter that can transcode one media file at a time.
///
/// Conversions never return an error: every failure is reported through
/// the returned [`ConversionOutcome`].
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Total duration of `path` in seconds, used as the progress
    /// denominator. Always positive.
    async fn probe_duration(&self, path: &Path, category: MediaCategory) -> f64;

    /// Converts a media file according to the job specification.
    async fn convert(&self, job: ConversionJob) -> ConversionOutcome;

    /// Converts a media file with progress reporting.
    ///
    /// Fractions sent on `progress_tx` are strictly increasing and never
    /// exceed 1.0. If the receiver is dropped, conversion continues
    /// without progress reporting.
    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> ConversionOutcome;

    /// Validates that the converter is properly configured and ready.
    async fn validate(&self) -> Result<(), ConverterError>;
}
