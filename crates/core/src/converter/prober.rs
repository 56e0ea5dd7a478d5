//! Duration probing through ffprobe.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use super::error::ConverterError;
use crate::media::MediaCategory;

/// Duration used when the real one is unknown or meaningless (images).
/// Only a denominator for progress math.
pub const SENTINEL_DURATION: f64 = 1.0;

/// Extracts media duration with ffprobe.
#[derive(Debug, Clone)]
pub struct DurationProber {
    ffprobe_path: PathBuf,
    timeout_secs: u64,
}

impl DurationProber {
    pub fn new(ffprobe_path: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            timeout_secs,
        }
    }

    /// Returns the duration of `path` in seconds, always > 0.
    ///
    /// Images get the sentinel without probing. Probe failures degrade to
    /// the sentinel with a warning.
    pub async fn probe(&self, path: &Path, category: MediaCategory) -> f64 {
        if category == MediaCategory::Image {
            return SENTINEL_DURATION;
        }

        match self.try_probe(path).await {
            Ok(duration) => duration,
            Err(e) => {
                tracing::warn!(
                    "Could not determine duration of {:?}, progress will be coarse: {}",
                    path,
                    e
                );
                SENTINEL_DURATION
            }
        }
    }

    /// Runs ffprobe and returns the first duration found.
    pub async fn try_probe(&self, path: &Path) -> Result<f64, ConverterError> {
        if !path.exists() {
            return Err(ConverterError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let run = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = timeout(Duration::from_secs(self.timeout_secs), run)
            .await
            .map_err(|_| ConverterError::probe_failed("ffprobe timed out"))?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConverterError::FfprobeNotFound {
                        path: self.ffprobe_path.clone(),
                    }
                } else {
                    ConverterError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ConverterError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Reads the duration out of ffprobe JSON: container first, then streams.
pub fn parse_duration(output: &str) -> Result<f64, ConverterError> {
    #[derive(Deserialize)]
    struct ProbeOutput {
        #[serde(default)]
        format: Option<ProbeEntry>,
        #[serde(default)]
        streams: Vec<ProbeEntry>,
    }

    #[derive(Deserialize)]
    struct ProbeEntry {
        #[serde(default)]
        duration: Option<serde_json::Value>,
    }

    let probe: ProbeOutput =
        serde_json::from_str(output).map_err(|e| ConverterError::ParseError {
            reason: format!("Failed to parse ffprobe output: {}", e),
        })?;

    probe
        .format
        .iter()
        .chain(probe.streams.iter())
        .filter_map(|entry| entry.duration.as_ref().and_then(duration_value))
        .next()
        .ok_or_else(|| ConverterError::probe_failed("no duration in container or streams"))
}

fn duration_value(value: &serde_json::Value) -> Option<f64> {
    let secs = match value {
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        serde_json::Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    (secs.is_finite() && secs > 0.0).then_some(secs)
}
