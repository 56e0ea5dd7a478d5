//! Maps per-file progress onto the batch.
//!
//! The converter only reports its own fraction. Each job gets a private
//! channel, and a forwarder translates its samples into [`BatchProgress`]
//! keyed by the file's index.

use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::converter::{offer, ConversionProgress};

use super::types::BatchProgress;

/// Overall fraction for one file sample: `(index + fraction) / total`.
///
/// Returns 0.0 for an empty batch; the file fraction is clamped to [0, 1].
pub fn overall_fraction(file_index: usize, file_fraction: f64, total_files: usize) -> f64 {
    if total_files == 0 {
        return 0.0;
    }
    let fraction = if file_fraction.is_finite() {
        file_fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    ((file_index as f64 + fraction) / total_files as f64).min(1.0)
}

/// Spawns a task forwarding one job's samples to the batch sink.
///
/// The task ends when the job drops its sender. The sink is never waited
/// on: intermediate samples are dropped while it is full, and a closed sink
/// is tolerated. The job's channel is always drained.
pub fn spawn_forwarder(
    mut rx: mpsc::Receiver<ConversionProgress>,
    sink: mpsc::Sender<BatchProgress>,
    file_index: usize,
    total_files: usize,
    input_path: PathBuf,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            if sink.is_closed() {
                continue;
            }
            let sample = BatchProgress {
                file_index,
                total_files,
                input_path: input_path.clone(),
                file_fraction: progress.fraction,
                overall: overall_fraction(file_index, progress.fraction, total_files),
            };
            if !offer(&sink, sample, progress.fraction >= 1.0) {
                tracing::trace!("Batch progress sample for file {} dropped", file_index);
            }
        }
    })
}
