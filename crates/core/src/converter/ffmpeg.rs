//! FFmpeg-based converter implementation.

use async_trait::async_trait;
use image::imageops::FilterType;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::prober::DurationProber;
use super::progress::{is_end_marker, offer, ProgressTracker};
use super::strategy::ConversionStrategy;
use super::traits::Converter;
use super::types::{ConversionJob, ConversionOutcome, ConversionProgress};
use crate::media::MediaCategory;

/// FFmpeg-based converter implementation.
pub struct FfmpegConverter {
    config: ConverterConfig,
    prober: DurationProber,
}

impl FfmpegConverter {
    /// Creates a new FFmpeg converter with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        let prober = DurationProber::new(config.ffprobe_path.clone(), config.probe_timeout_secs);
        Self { config, prober }
    }

    /// Creates a converter with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ConverterConfig::default())
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Builds the ffmpeg argument list for a subprocess strategy.
    fn build_args(&self, job: &ConversionJob, strategy: ConversionStrategy) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(), // Overwrite output
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-i".to_string(),
            job.input_path.to_string_lossy().to_string(),
        ];

        args.extend(strategy.ffmpeg_directives(&job.options, self.config.waveform_size));

        // Machine-readable progress on stdout
        args.extend([
            "-progress".to_string(),
            "pipe:1".to_string(),
            "-nostats".to_string(),
        ]);

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        args.push(job.output_path.to_string_lossy().to_string());

        args
    }

    /// Runs one job and turns the result into an outcome.
    async fn execute(
        &self,
        job: ConversionJob,
        progress_tx: Option<mpsc::Sender<ConversionProgress>>,
    ) -> ConversionOutcome {
        let start = Instant::now();
        let result = self.run_conversion(&job, progress_tx.as_ref()).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                tracing::info!(
                    "Converted {:?} -> {:?} in {} ms",
                    job.input_path,
                    job.output_path,
                    elapsed_ms
                );
                ConversionOutcome::success(&job, elapsed_ms)
            }
            Err(e) => {
                tracing::error!("Failed to convert {:?}: {}", job.input_path, e.detail());
                if self.config.cleanup_partial_output && e.may_leave_partial_output() {
                    remove_partial_output(&job.input_path, &job.output_path).await;
                }
                ConversionOutcome::failure(&job, &e, elapsed_ms)
            }
        }
    }

    async fn run_conversion(
        &self,
        job: &ConversionJob,
        progress_tx: Option<&mpsc::Sender<ConversionProgress>>,
    ) -> Result<(), ConverterError> {
        if !job.input_path.exists() {
            return Err(ConverterError::InputNotFound {
                path: job.input_path.clone(),
            });
        }

        let strategy = ConversionStrategy::select(job.category, job.format).ok_or(
            ConverterError::UnsupportedFormat {
                category: job.category,
                format: job.format,
            },
        )?;

        // Ensure output directory exists
        if let Some(parent) = job.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|_| {
                    ConverterError::OutputDirectoryFailed {
                        path: parent.to_path_buf(),
                    }
                })?;
            }
        }

        // Nothing may write over, or later clean up, the job's own input
        if is_same_file(&job.input_path, &job.output_path).await {
            return Err(ConverterError::OutputIsInput {
                path: job.output_path.clone(),
            });
        }

        let duration_secs = self.prober.probe(&job.input_path, job.category).await;
        let mut tracker = ProgressTracker::new(duration_secs);

        tracing::debug!(
            "Job {} uses {:?} (duration {:.3}s)",
            job.job_id,
            strategy,
            duration_secs
        );

        if strategy.uses_subprocess() {
            let args = self.build_args(job, strategy);
            self.run_ffmpeg(job, &args, &mut tracker, progress_tx).await?;
        } else {
            reencode_png(job).await?;
        }

        if let Some(fraction) = tracker.finish() {
            report_progress(progress_tx, job, &tracker, fraction);
        }

        Ok(())
    }

    /// Spawns ffmpeg and supervises it until exit or timeout.
    async fn run_ffmpeg(
        &self,
        job: &ConversionJob,
        args: &[String],
        tracker: &mut ProgressTracker,
        progress_tx: Option<&mpsc::Sender<ConversionProgress>>,
    ) -> Result<(), ConverterError> {
        tracing::debug!("Running {:?} {}", self.config.ffmpeg_path, args.join(" "));

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    ConverterError::launch_failed(
                        self.config.ffmpeg_path.to_string_lossy(),
                        e.to_string(),
                    )
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ConverterError::unexpected("ffmpeg stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ConverterError::unexpected("ffmpeg stderr was not captured"))?;

        // Drained concurrently so a chatty ffmpeg never blocks on a full pipe
        let stderr_task = tokio::spawn(collect_stderr(stderr, self.config.stderr_capture_bytes));

        let mut stdout = BufReader::new(stdout);
        let mut buf = Vec::new();
        let timeout_duration = Duration::from_secs(self.config.timeout_secs);

        let result = timeout(timeout_duration, async {
            while let Some(line) = next_line_lossy(&mut stdout, &mut buf).await {
                if let Some(fraction) = tracker.observe_line(&line) {
                    report_progress(progress_tx, job, tracker, fraction);
                } else if is_end_marker(&line) {
                    tracing::debug!("ffmpeg finished writing {}", job.job_id);
                }
            }
            child.wait().await
        })
        .await;

        match result {
            Ok(Ok(status)) => {
                let stderr_output = stderr_task.await.unwrap_or_default();
                if !status.success() {
                    return Err(ConverterError::NonZeroExit {
                        code: status.code(),
                        stderr: stderr_output,
                    });
                }
            }
            Ok(Err(e)) => {
                stderr_task.abort();
                return Err(ConverterError::Io(e));
            }
            Err(_) => {
                // Kill the process on timeout
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill timed out ffmpeg for {}: {}", job.job_id, e);
                }
                stderr_task.abort();
                return Err(ConverterError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        }

        tokio::fs::metadata(&job.output_path).await.map_err(|_| {
            ConverterError::unexpected("ffmpeg exited successfully but wrote no output")
        })?;

        Ok(())
    }
}

/// In-process Image -> PNG re-encode, optionally resized to an exact size.
async fn reencode_png(job: &ConversionJob) -> Result<(), ConverterError> {
    let input = job.input_path.clone();
    let output = job.output_path.clone();
    let scale = job.options.scale;

    tokio::task::spawn_blocking(move || -> Result<(), ConverterError> {
        let img = image::open(&input)?;
        let img = match scale {
            Some((width, height)) => img.resize_exact(width, height, FilterType::Lanczos3),
            None => img,
        };
        img.save_with_format(&output, ImageFormat::Png)?;
        Ok(())
    })
    .await
    .map_err(|e| ConverterError::unexpected(format!("image task failed: {}", e)))?
}

/// Hands a sample to the caller without waiting on a slow receiver.
fn report_progress(
    progress_tx: Option<&mpsc::Sender<ConversionProgress>>,
    job: &ConversionJob,
    tracker: &ProgressTracker,
    fraction: f64,
) {
    let Some(tx) = progress_tx else {
        return;
    };

    let progress = ConversionProgress {
        job_id: job.job_id.clone(),
        fraction,
        time_secs: tracker.time_secs(),
        duration_secs: tracker.duration_secs(),
    };

    if !offer(tx, progress, fraction >= 1.0) {
        tracing::trace!("Progress sample for {} dropped", job.job_id);
    }
}

/// Reads one line, replacing invalid UTF-8. `None` at end of stream.
async fn next_line_lossy<R>(reader: &mut R, buf: &mut Vec<u8>) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    match reader.read_until(b'\n', buf).await {
        Ok(0) => None,
        Ok(_) => {
            let line = String::from_utf8_lossy(buf.as_slice());
            Some(line.trim_end_matches(&['\n', '\r'][..]).to_string())
        }
        Err(e) => {
            tracing::debug!("Stopped reading ffmpeg output: {}", e);
            None
        }
    }
}

/// Reads stderr to the end, keeping at most the last `cap` bytes.
async fn collect_stderr(stderr: ChildStderr, cap: usize) -> String {
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    let mut captured = String::new();

    while let Some(line) = next_line_lossy(&mut reader, &mut buf).await {
        captured.push_str(&line);
        captured.push('\n');

        if captured.len() > cap {
            let mut cut = captured.len() - cap;
            while !captured.is_char_boundary(cut) {
                cut += 1;
            }
            captured.drain(..cut);
        }
    }

    captured
}

/// Whether both paths name the same file, following symlinks.
///
/// A missing output is compared through its canonical parent.
async fn is_same_file(input: &Path, output: &Path) -> bool {
    let Ok(input) = tokio::fs::canonicalize(input).await else {
        return false;
    };
    match resolve_output(output).await {
        Some(output) => input == output,
        None => false,
    }
}

async fn resolve_output(output: &Path) -> Option<PathBuf> {
    if let Ok(resolved) = tokio::fs::canonicalize(output).await {
        return Some(resolved);
    }
    let name = output.file_name()?;
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let parent = tokio::fs::canonicalize(parent).await.ok()?;
    Some(parent.join(name))
}

async fn remove_partial_output(input: &Path, path: &Path) {
    if is_same_file(input, path).await {
        tracing::warn!("Not removing {:?}: it is the conversion input", path);
        return;
    }
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed partial output {:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove partial output {:?}: {}", path, e),
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe_duration(&self, path: &Path, category: MediaCategory) -> f64 {
        self.prober.probe(path, category).await
    }

    async fn convert(&self, job: ConversionJob) -> ConversionOutcome {
        self.execute(job, None).await
    }

    async fn convert_with_progress(
        &self,
        job: ConversionJob,
        progress_tx: mpsc::Sender<ConversionProgress>,
    ) -> ConversionOutcome {
        self.execute(job, Some(progress_tx)).await
    }

    async fn validate(&self) -> Result<(), ConverterError> {
        // Check ffmpeg exists
        let ffmpeg_result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffmpeg_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(ConverterError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                });
            }
            return Err(ConverterError::Io(e));
        }

        // Check ffprobe exists
        let ffprobe_result = Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffprobe_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(ConverterError::FfprobeNotFound {
                    path: self.config.ffprobe_path.clone(),
                });
            }
            return Err(ConverterError::Io(e));
        }

        Ok(())
    }
}
