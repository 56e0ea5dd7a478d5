//! Console output for conversions and batches.

use std::io::{IsTerminal, Write};
use tokio::sync::mpsc;

use unicon_core::{BatchEvent, BatchEventEnvelope, BatchProgress, BatchResult, ConversionProgress};

/// One console line for an event, or `None` for events not worth a line.
pub fn describe_event(event: &BatchEvent) -> Option<String> {
    match event {
        BatchEvent::Started {
            total_files,
            input_folder,
            format,
            ..
        } => Some(format!(
            "Converting {} files from {} to {}",
            total_files,
            input_folder.display(),
            format
        )),
        BatchEvent::FileSkipped { path, reason, .. } => {
            Some(format!("skip  {} ({})", path.display(), reason))
        }
        BatchEvent::FileStarted { .. } => None,
        BatchEvent::FileConverted {
            path,
            output,
            duration_ms,
            ..
        } => Some(format!(
            "ok    {} -> {} ({} ms)",
            path.display(),
            output.display(),
            duration_ms
        )),
        BatchEvent::FileFailed {
            path, kind, detail, ..
        } => Some(format!("FAIL  {} [{}]: {}", path.display(), kind, detail)),
        BatchEvent::Completed { .. } => None,
    }
}

/// Human-readable batch summary.
pub fn format_summary(result: &BatchResult) -> String {
    let counts = &result.category_counts;
    format!(
        "{}/{} converted, {} skipped, {} failed in {:.1}s (image: {}, video: {}, audio: {}, unknown: {})",
        result.success_count,
        result.total_count,
        result.skipped_count,
        result.failure_count(),
        result.duration_ms as f64 / 1000.0,
        counts.image,
        counts.video,
        counts.audio,
        counts.unknown
    )
}

/// Prints batch events until the channel closes.
pub async fn print_events(mut rx: mpsc::Receiver<BatchEventEnvelope>) {
    while let Some(envelope) = rx.recv().await {
        if let Some(line) = describe_event(&envelope.event) {
            clear_progress_line();
            println!("{}", line);
        }
    }
}

/// Shows overall batch progress on stderr until the channel closes.
pub async fn print_batch_progress(mut rx: mpsc::Receiver<BatchProgress>) {
    let interactive = std::io::stderr().is_terminal();
    while let Some(progress) = rx.recv().await {
        if interactive {
            let name = progress
                .input_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            progress_line(progress.overall, &name);
        }
    }
    if interactive {
        clear_progress_line();
    }
}

/// Shows the progress of one conversion on stderr until the channel closes.
pub async fn print_file_progress(mut rx: mpsc::Receiver<ConversionProgress>) {
    let interactive = std::io::stderr().is_terminal();
    while let Some(progress) = rx.recv().await {
        if interactive {
            progress_line(progress.fraction, &progress.job_id);
        }
    }
    if interactive {
        clear_progress_line();
    }
}

fn progress_line(fraction: f64, label: &str) {
    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "\r\x1b[2K{:>5.1}% {}", fraction * 100.0, label);
    let _ = stderr.flush();
}

fn clear_progress_line() {
    if std::io::stderr().is_terminal() {
        let _ = write!(std::io::stderr(), "\r\x1b[2K");
    }
}
