//! Converter module for transcoding one media file.
//!
//! This module provides the `Converter` trait and an implementation that
//! drives ffmpeg as a subprocess.
//!
//! # Features
//!
//! - Duration probing through ffprobe, degrading to a unit duration
//! - Strategy dispatch per (category, format) pair
//! - In-process Image -> PNG re-encode
//! - Streaming progress parsing with strictly increasing fractions
//! - Hard timeout with forced termination
//!
//! # Example
//!
//! ```ignore
//! use unicon_core::converter::{Converter, ConversionJob, FfmpegConverter};
//! use unicon_core::media::{MediaCategory, OutputFormat};
//!
//! let converter = FfmpegConverter::with_defaults();
//! converter.validate().await?;
//!
//! let job = ConversionJob::new(
//!     "job-1",
//!     "/path/to/clip.mp4",
//!     "/path/to/clip.png",
//!     MediaCategory::Video,
//!     OutputFormat::Png,
//! );
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(16);
//! let handle = tokio::spawn(async move { converter.convert_with_progress(job, tx).await });
//! while let Some(progress) = rx.recv().await {
//!     println!("{:.0}%", progress.fraction * 100.0);
//! }
//! let outcome = handle.await?;
//! ```

mod config;
mod error;
mod ffmpeg;
mod prober;
mod progress;
mod strategy;
mod traits;
mod types;

pub use config::ConverterConfig;
pub use error::ConverterError;
pub use ffmpeg::FfmpegConverter;
pub use prober::{parse_duration, DurationProber, SENTINEL_DURATION};
pub use progress::{fraction_of, is_end_marker, offer, parse_out_time, ProgressTracker};
pub use strategy::ConversionStrategy;
pub use traits::Converter;
pub use types::{
    ConversionFailure, ConversionJob, ConversionOptions, ConversionOutcome, ConversionProgress,
    FailureKind,
};
