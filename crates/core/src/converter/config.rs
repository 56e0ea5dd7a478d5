//! Configuration for the converter module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the FFmpeg-based converter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Hard wall-clock limit for a single conversion, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Limit for the ffprobe duration lookup, in seconds. Not part of `timeout_secs`.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,

    /// Additional ffmpeg arguments, inserted before the output path.
    #[serde(default)]
    pub extra_ffmpeg_args: Vec<String>,

    /// Delete the output file when a conversion fails or times out.
    #[serde(default = "default_true")]
    pub cleanup_partial_output: bool,

    /// Picture size for rendered audio waveforms, as (width, height).
    #[serde(default = "default_waveform_size")]
    pub waveform_size: (u32, u32),

    /// Upper bound on stderr bytes kept for error reports.
    #[serde(default = "default_stderr_capture")]
    pub stderr_capture_bytes: usize,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_timeout() -> u64 {
    30
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "error".to_string()
}

fn default_true() -> bool {
    true
}

fn default_waveform_size() -> (u32, u32) {
    (640, 120)
}

fn default_stderr_capture() -> usize {
    16 * 1024
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            timeout_secs: default_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            ffmpeg_log_level: default_log_level(),
            extra_ffmpeg_args: Vec::new(),
            cleanup_partial_output: true,
            waveform_size: default_waveform_size(),
            stderr_capture_bytes: default_stderr_capture(),
        }
    }
}

impl ConverterConfig {
    /// Creates a new config with custom ffmpeg/ffprobe paths.
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            ..Default::default()
        }
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets whether failed outputs are removed.
    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup_partial_output = cleanup;
        self
    }
}
