//! Parsing of ffmpeg's `-progress` output.
//!
//! ffmpeg writes blocks of `key=value` lines. The elapsed output time is
//! reported as `out_time_us` and, for historical reasons, `out_time_ms`;
//! both carry microseconds.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tokio::sync::mpsc;

static OUT_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^out_time_(?:us|ms)=(\d+)$").expect("out_time pattern is valid")
});

/// Extracts the elapsed output time in seconds from one progress line.
pub fn parse_out_time(line: &str) -> Option<f64> {
    let caps = OUT_TIME_RE.captures(line.trim())?;
    let micros = caps.get(1)?.as_str().parse::<u64>().ok()?;
    Some(micros as f64 / 1_000_000.0)
}

/// Whether the line marks the final progress block.
pub fn is_end_marker(line: &str) -> bool {
    line.trim() == "progress=end"
}

/// Fraction of `duration_secs` covered by `elapsed_secs`, clamped to 1.0.
/// A non-positive duration yields 0.
pub fn fraction_of(elapsed_secs: f64, duration_secs: f64) -> f64 {
    if duration_secs > 0.0 && elapsed_secs.is_finite() {
        (elapsed_secs / duration_secs).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Non-blocking progress send; returns whether the sample was queued.
///
/// Intermediate samples are dropped instead of taking the last free slot,
/// which stays reserved for the `is_final` sample. A slow receiver only
/// loses samples and never stalls the sender.
pub fn offer<T>(tx: &mpsc::Sender<T>, sample: T, is_final: bool) -> bool {
    if !is_final && tx.capacity() <= 1 {
        return false;
    }
    tx.try_send(sample).is_ok()
}

/// Turns a stream of progress lines into strictly increasing fractions.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    duration_secs: f64,
    time_secs: f64,
    last_reported: f64,
}

impl ProgressTracker {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration_secs,
            time_secs: 0.0,
            last_reported: 0.0,
        }
    }

    /// Feeds one line. Returns the new fraction only when it is strictly
    /// greater than the last one returned.
    pub fn observe_line(&mut self, line: &str) -> Option<f64> {
        let elapsed = parse_out_time(line)?;
        self.observe_time(elapsed)
    }

    /// Feeds an elapsed output time in seconds.
    pub fn observe_time(&mut self, elapsed_secs: f64) -> Option<f64> {
        if elapsed_secs > self.time_secs {
            self.time_secs = elapsed_secs;
        }
        self.advance_to(fraction_of(elapsed_secs, self.duration_secs))
    }

    /// Marks the job complete; yields 1.0 unless it was already reported.
    pub fn finish(&mut self) -> Option<f64> {
        self.advance_to(1.0)
    }

    fn advance_to(&mut self, fraction: f64) -> Option<f64> {
        if fraction > self.last_reported {
            self.last_reported = fraction;
            Some(fraction)
        } else {
            None
        }
    }

    pub fn last_fraction(&self) -> f64 {
        self.last_reported
    }

    pub fn time_secs(&self) -> f64 {
        self.time_secs
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }
}
