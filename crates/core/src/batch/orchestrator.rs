//! Batch orchestrator implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use crate::converter::{
    ConversionJob, ConversionOptions, ConversionOutcome, Converter, ConverterError, FailureKind,
};
use crate::events::{BatchEvent, EventHandle};
use crate::media::{is_supported, ContentClassifier, MagicClassifier, MediaCategory, OutputFormat};

use super::aggregator::spawn_forwarder;
use super::config::{BatchConfig, ExecutionMode};
use super::types::{BatchError, BatchProgress, BatchResult, CategoryCounts, FileFailure};

/// Live dispatch counters, shared by every job of the orchestrator.
struct DispatchStats {
    active: AtomicU64,
    converted: AtomicU64,
    failed: AtomicU64,
}

impl Default for DispatchStats {
    fn default() -> Self {
        Self {
            active: AtomicU64::new(0),
            converted: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }
}

/// Keeps `active` accurate even when a job panics.
struct ActiveGuard(Arc<DispatchStats>);

impl ActiveGuard {
    fn enter(stats: &Arc<DispatchStats>) -> Self {
        stats.active.fetch_add(1, Ordering::Relaxed);
        Self(Arc::clone(stats))
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Snapshot of the live dispatch counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStatus {
    /// Conversions currently running.
    pub active: u64,
    /// Conversions that succeeded since the orchestrator was created.
    pub converted: u64,
    /// Conversions that failed since the orchestrator was created.
    pub failed: u64,
}

/// What the planner decided for one enumerated file.
enum Plan {
    Skip { reason: String },
    Reject(ConverterError),
    Convert(ConversionJob),
}

/// A file handed to the converter.
struct Dispatch {
    index: usize,
    path: PathBuf,
    job: ConversionJob,
}

/// Converts every file of a folder to one target format.
pub struct BatchOrchestrator<C: Converter> {
    config: BatchConfig,
    converter: Arc<C>,
    classifier: Arc<dyn ContentClassifier>,
    events: Option<EventHandle>,
    category_filter: Option<MediaCategory>,
    options: ConversionOptions,
    category_options: HashMap<MediaCategory, ConversionOptions>,
    stats: Arc<DispatchStats>,
}

impl<C: Converter + 'static> BatchOrchestrator<C> {
    /// Creates an orchestrator using magic-byte classification.
    pub fn new(config: BatchConfig, converter: C) -> Self {
        Self {
            config,
            converter: Arc::new(converter),
            classifier: Arc::new(MagicClassifier::new()),
            events: None,
            category_filter: None,
            options: ConversionOptions::default(),
            category_options: HashMap::new(),
            stats: Arc::new(DispatchStats::default()),
        }
    }

    /// Replaces the content classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn ContentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Sets the event handle for batch lifecycle events.
    pub fn with_events(mut self, events: EventHandle) -> Self {
        self.events = Some(events);
        self
    }

    /// Only convert files of this category; others are skipped.
    pub fn with_category_filter(mut self, category: MediaCategory) -> Self {
        self.category_filter = Some(category);
        self
    }

    /// Options applied to every job.
    pub fn with_options(mut self, options: ConversionOptions) -> Self {
        self.options = options;
        self
    }

    /// Options for jobs of one category, taking precedence over `with_options`.
    pub fn with_category_options(
        mut self,
        category: MediaCategory,
        options: ConversionOptions,
    ) -> Self {
        self.category_options.insert(category, options);
        self
    }

    pub fn converter(&self) -> &C {
        &self.converter
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Returns the live dispatch counters.
    pub fn status(&self) -> DispatchStatus {
        DispatchStatus {
            active: self.stats.active.load(Ordering::Relaxed),
            converted: self.stats.converted.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        }
    }

    /// Converts every regular file directly inside `input_folder`.
    ///
    /// Only folder-level problems are errors. Every enumerated file is
    /// counted in `total_count` and ends up exactly once as a success, a
    /// skip or a failure.
    pub async fn batch_convert(
        &self,
        input_folder: &Path,
        output_folder: &Path,
        format: OutputFormat,
        progress_tx: Option<mpsc::Sender<BatchProgress>>,
    ) -> Result<BatchResult, BatchError> {
        let start = Instant::now();
        let batch_id = uuid::Uuid::new_v4().to_string();

        tokio::fs::create_dir_all(output_folder)
            .await
            .map_err(|source| BatchError::OutputFolder {
                path: output_folder.to_path_buf(),
                source,
            })?;

        let files = list_files(input_folder).await?;
        let total_files = files.len();

        info!(
            "Batch {} started: {} files in {} -> {} ({})",
            batch_id,
            total_files,
            input_folder.display(),
            output_folder.display(),
            format
        );
        self.emit(BatchEvent::Started {
            batch_id: batch_id.clone(),
            input_folder: input_folder.to_path_buf(),
            output_folder: output_folder.to_path_buf(),
            format,
            total_files,
        })
        .await;

        let mut category_counts = CategoryCounts::default();
        let mut skipped_count = 0;
        let mut failures: Vec<(usize, FileFailure)> = Vec::new();
        let mut dispatches = Vec::new();

        let categories = self.classify_all(&files).await;
        for (index, (path, category)) in files.into_iter().zip(categories).enumerate() {
            category_counts.record(category);

            match self.plan(&batch_id, index, &path, category, output_folder, format) {
                Plan::Skip { reason } => {
                    warn!("Skipping {}: {}", path.display(), reason);
                    skipped_count += 1;
                    self.emit(BatchEvent::FileSkipped {
                        path,
                        category,
                        reason,
                    })
                    .await;
                }
                Plan::Reject(err) => {
                    warn!("Rejecting {}: {}", path.display(), err);
                    let failure = FileFailure {
                        path: path.clone(),
                        kind: err.kind(),
                        detail: err.detail(),
                    };
                    self.emit(BatchEvent::FileFailed {
                        index,
                        path,
                        kind: failure.kind,
                        detail: failure.detail.clone(),
                    })
                    .await;
                    failures.push((index, failure));
                }
                Plan::Convert(job) => dispatches.push(Dispatch { index, path, job }),
            }
        }

        let outcomes = self
            .dispatch_all(dispatches, total_files, progress_tx)
            .await;

        let mut success_count = 0;
        for (index, path, outcome) in outcomes {
            match outcome.failure {
                None if outcome.succeeded => success_count += 1,
                Some(failure) => failures.push((
                    index,
                    FileFailure {
                        path,
                        kind: failure.kind,
                        detail: failure.detail,
                    },
                )),
                None => failures.push((
                    index,
                    FileFailure {
                        path,
                        kind: FailureKind::Unexpected,
                        detail: "conversion reported neither success nor failure".to_string(),
                    },
                )),
            }
        }
        failures.sort_by_key(|(index, _)| *index);

        let result = BatchResult {
            success_count,
            total_count: total_files,
            skipped_count,
            category_counts,
            failures: failures.into_iter().map(|(_, failure)| failure).collect(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            "Batch {} finished: {}/{} converted, {} skipped, {} failed in {}ms",
            batch_id,
            result.success_count,
            result.total_count,
            result.skipped_count,
            result.failure_count(),
            result.duration_ms
        );
        self.emit(BatchEvent::Completed {
            batch_id,
            success_count: result.success_count,
            total_count: result.total_count,
            skipped_count: result.skipped_count,
            duration_ms: result.duration_ms,
        })
        .await;

        Ok(result)
    }

    /// Sniffs every file on the blocking pool, in enumeration order.
    async fn classify_all(&self, files: &[PathBuf]) -> Vec<MediaCategory> {
        let classifier = Arc::clone(&self.classifier);
        let paths = files.to_vec();
        let count = paths.len();

        let sniffed = tokio::task::spawn_blocking(move || {
            paths
                .iter()
                .map(|path| classifier.classify(path))
                .collect::<Vec<_>>()
        })
        .await;

        match sniffed {
            Ok(categories) => categories,
            Err(e) => {
                warn!("Content classification aborted: {}", e);
                vec![MediaCategory::Unknown; count]
            }
        }
    }

    fn plan(
        &self,
        batch_id: &str,
        index: usize,
        path: &Path,
        category: MediaCategory,
        output_folder: &Path,
        format: OutputFormat,
    ) -> Plan {
        if category == MediaCategory::Unknown {
            return Plan::Skip {
                reason: "unrecognised content".to_string(),
            };
        }
        if let Some(filter) = self.category_filter {
            if filter != category {
                return Plan::Skip {
                    reason: format!("{} file does not match category filter {}", category, filter),
                };
            }
        }
        if !is_supported(category, format) {
            return Plan::Reject(ConverterError::UnsupportedFormat { category, format });
        }

        let job = ConversionJob::new(
            format!("{}-{}", batch_id, index),
            path,
            output_path_for(path, output_folder, format),
            category,
            format,
        )
        .with_options(
            self.category_options
                .get(&category)
                .copied()
                .unwrap_or(self.options),
        );
        Plan::Convert(job)
    }

    /// Runs every dispatch and returns the outcomes in enumeration order.
    async fn dispatch_all(
        &self,
        dispatches: Vec<Dispatch>,
        total_files: usize,
        progress_tx: Option<mpsc::Sender<BatchProgress>>,
    ) -> Vec<(usize, PathBuf, ConversionOutcome)> {
        let semaphore = Arc::new(Semaphore::new(self.config.permits()));
        let mut handles = Vec::with_capacity(dispatches.len());
        let mut outcomes = Vec::with_capacity(dispatches.len());

        for dispatch in dispatches {
            let index = dispatch.index;
            let path = dispatch.path.clone();
            let fallback_job = dispatch.job.clone();

            let handle = tokio::spawn(Self::run_job(
                dispatch,
                total_files,
                Arc::clone(&self.converter),
                Arc::clone(&semaphore),
                Arc::clone(&self.stats),
                self.events.clone(),
                progress_tx.clone(),
                self.config.progress_buffer.max(1),
            ));

            match self.config.execution_mode {
                ExecutionMode::Sequential => {
                    let outcome = self.join_job(handle, index, &fallback_job).await;
                    outcomes.push((index, path, outcome));
                }
                ExecutionMode::Concurrent => handles.push((index, path, fallback_job, handle)),
            }
        }

        let joined = futures::future::join_all(handles.into_iter().map(
            |(index, path, fallback_job, handle)| async move {
                let outcome = self.join_job(handle, index, &fallback_job).await;
                (index, path, outcome)
            },
        ))
        .await;
        outcomes.extend(joined);
        outcomes
    }

    /// Awaits a job task, turning a panic into an Unexpected failure.
    async fn join_job(
        &self,
        handle: tokio::task::JoinHandle<ConversionOutcome>,
        index: usize,
        job: &ConversionJob,
    ) -> ConversionOutcome {
        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Conversion task for {} aborted: {}", job.input_path.display(), e);
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                let err = ConverterError::unexpected(format!("conversion task aborted: {}", e));
                self.emit(BatchEvent::FileFailed {
                    index,
                    path: job.input_path.clone(),
                    kind: err.kind(),
                    detail: err.detail(),
                })
                .await;
                ConversionOutcome::failure(job, &err, 0)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_job(
        dispatch: Dispatch,
        total_files: usize,
        converter: Arc<C>,
        semaphore: Arc<Semaphore>,
        stats: Arc<DispatchStats>,
        events: Option<EventHandle>,
        progress_tx: Option<mpsc::Sender<BatchProgress>>,
        progress_buffer: usize,
    ) -> ConversionOutcome {
        let Dispatch { index, path, job } = dispatch;

        // The semaphore is never closed.
        let _permit = semaphore.acquire_owned().await.ok();
        let active = ActiveGuard::enter(&stats);

        debug!("Dispatching {} ({}) as {}", path.display(), job.category, job.job_id);
        if let Some(ref events) = events {
            events
                .emit(BatchEvent::FileStarted {
                    index,
                    path: path.clone(),
                    category: job.category,
                })
                .await;
        }

        let outcome = match progress_tx {
            Some(sink) => {
                let (tx, rx) = mpsc::channel(progress_buffer);
                let forwarder = spawn_forwarder(rx, sink, index, total_files, path.clone());
                let outcome = converter.convert_with_progress(job, tx).await;
                if let Err(e) = forwarder.await {
                    debug!("Progress forwarder for {} ended abnormally: {}", path.display(), e);
                }
                outcome
            }
            None => converter.convert(job).await,
        };

        drop(active);
        if outcome.succeeded {
            stats.converted.fetch_add(1, Ordering::Relaxed);
        } else {
            stats.failed.fetch_add(1, Ordering::Relaxed);
        }

        if let Some(ref events) = events {
            let event = match &outcome.failure {
                None => BatchEvent::FileConverted {
                    index,
                    path,
                    output: outcome.output_path.clone(),
                    duration_ms: outcome.duration_ms,
                },
                Some(failure) => BatchEvent::FileFailed {
                    index,
                    path,
                    kind: failure.kind,
                    detail: failure.detail.clone(),
                },
            };
            events.emit(event).await;
        }

        outcome
    }

    async fn emit(&self, event: BatchEvent) {
        if let Some(ref events) = self.events {
            events.emit(event).await;
        }
    }
}

/// `<output_folder>/<input stem>.<format extension>`.
pub fn output_path_for(input: &Path, output_folder: &Path, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .or_else(|| input.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_folder.join(format!("{}.{}", stem, format.extension()))
}

/// Regular files directly inside `folder`, sorted by file name.
async fn list_files(folder: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let input_error = |source| BatchError::InputFolder {
        path: folder.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(folder).await.map_err(input_error)?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(input_error)? {
        let path = entry.path();
        // Follows symlinks; dangling links are not regular files.
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => debug!("Ignoring {}: {}", path.display(), e),
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{write_fixture, Fixture, MockConverter};
    use tempfile::TempDir;

    fn orchestrator(mode: ExecutionMode) -> BatchOrchestrator<MockConverter> {
        BatchOrchestrator::new(BatchConfig::default().with_mode(mode), MockConverter::new())
    }

    /// Remembers which thread each classification ran on.
    #[derive(Default)]
    struct ThreadRecordingClassifier {
        threads: std::sync::Mutex<Vec<std::thread::ThreadId>>,
    }

    impl ContentClassifier for ThreadRecordingClassifier {
        fn classify(&self, path: &Path) -> MediaCategory {
            self.threads.lock().unwrap().push(std::thread::current().id());
            MagicClassifier::new().classify(path)
        }
    }

    #[tokio::test]
    async fn test_classification_runs_on_blocking_pool() {
        let input = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_fixture(input.path(), "a.jpg", Fixture::Jpeg);
        write_fixture(input.path(), "b.mp4", Fixture::Mp4);

        let classifier = Arc::new(ThreadRecordingClassifier::default());
        let result = orchestrator(ExecutionMode::Sequential)
            .with_classifier(classifier.clone())
            .batch_convert(input.path(), out.path(), OutputFormat::Png, None)
            .await
            .unwrap();

        assert_eq!(result.success_count, 2);
        let threads = classifier.threads.lock().unwrap();
        assert_eq!(threads.len(), 2);
        // The test body runs on the current-thread runtime's own thread.
        assert!(threads.iter().all(|id| *id != std::thread::current().id()));
    }

    #[test]
    fn test_output_path_for() {
        let out = output_path_for(Path::new("/in/clip.final.mp4"), Path::new("/out"), OutputFormat::Png);
        assert_eq!(out, PathBuf::from("/out/clip.final.png"));

        let out = output_path_for(Path::new("/in/noext"), Path::new("/out"), OutputFormat::Mp3);
        assert_eq!(out, PathBuf::from("/out/noext.mp3"));
    }

    #[tokio::test]
    async fn test_list_files_sorted_and_regular_only() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let files = list_files(dir.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn test_missing_input_folder() {
        let out = TempDir::new().unwrap();
        let result = orchestrator(ExecutionMode::Concurrent)
            .batch_convert(Path::new("/nonexistent/input"), out.path(), OutputFormat::Png, None)
            .await;
        assert!(matches!(result, Err(BatchError::InputFolder { .. })));
    }

    #[tokio::test]
    async fn test_output_folder_is_a_file() {
        let input = TempDir::new().unwrap();
        let blocker = input.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let result = orchestrator(ExecutionMode::Concurrent)
            .batch_convert(input.path(), &blocker.join("out"), OutputFormat::Png, None)
            .await;
        assert!(matches!(result, Err(BatchError::OutputFolder { .. })));
    }

    #[tokio::test]
    async fn test_empty_folder() {
        let input = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();

        let result = orchestrator(ExecutionMode::Concurrent)
            .batch_convert(input.path(), out.path(), OutputFormat::Png, None)
            .await
            .unwrap();
        assert_eq!(result.total_count, 0);
        assert_eq!(result.success_count, 0);
        assert!(result.is_clean());
    }

    #[tokio::test]
    async fn test_sequential_and_concurrent_agree() {
        let input = TempDir::new().unwrap();
        write_fixture(input.path(), "a.jpg", Fixture::Jpeg);
        write_fixture(input.path(), "b.mp4", Fixture::Mp4);
        write_fixture(input.path(), "c.mp3", Fixture::Mp3);
        write_fixture(input.path(), "d.txt", Fixture::Text);

        let mut tallies = Vec::new();
        for mode in [ExecutionMode::Sequential, ExecutionMode::Concurrent] {
            let out = TempDir::new().unwrap();
            let result = orchestrator(mode)
                .batch_convert(input.path(), out.path(), OutputFormat::Mp3, None)
                .await
                .unwrap();
            tallies.push((
                result.success_count,
                result.total_count,
                result.skipped_count,
                result.failure_count(),
                result.category_counts,
            ));
        }

        assert_eq!(tallies[0], tallies[1]);
        // jpg -> mp3 is not in the image catalog
        let (success, total, skipped, failed, counts) = tallies[0];
        assert_eq!((success, total, skipped, failed), (2, 4, 1, 1));
        assert_eq!(counts.unknown, 1);
    }

    #[tokio::test]
    async fn test_unsupported_format_is_a_failure() {
        let input = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_fixture(input.path(), "a.jpg", Fixture::Jpeg);

        let orch = orchestrator(ExecutionMode::Concurrent);
        let result = orch
            .batch_convert(input.path(), out.path(), OutputFormat::Mp4, None)
            .await
            .unwrap();

        assert_eq!(result.total_count, 1);
        assert_eq!(result.failures[0].kind, FailureKind::UnsupportedFormat);
        assert!(orch.converter().recorded_jobs().await.is_empty());
    }

    #[tokio::test]
    async fn test_category_filter_skips_other_categories() {
        let input = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_fixture(input.path(), "a.jpg", Fixture::Jpeg);
        write_fixture(input.path(), "b.mp4", Fixture::Mp4);

        let result = orchestrator(ExecutionMode::Concurrent)
            .with_category_filter(MediaCategory::Video)
            .batch_convert(input.path(), out.path(), OutputFormat::Png, None)
            .await
            .unwrap();

        assert_eq!(result.success_count, 1);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.total_count, 2);
        assert!(out.path().join("b.png").exists());
        assert!(!out.path().join("a.png").exists());
    }

    #[tokio::test]
    async fn test_category_options_override() {
        let input = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_fixture(input.path(), "a.jpg", Fixture::Jpeg);
        write_fixture(input.path(), "b.mp4", Fixture::Mp4);

        let orch = orchestrator(ExecutionMode::Sequential)
            .with_options(ConversionOptions::with_scale(10, 10))
            .with_category_options(
                MediaCategory::Video,
                ConversionOptions::with_scale(1280, 720),
            );
        orch.batch_convert(input.path(), out.path(), OutputFormat::Png, None)
            .await
            .unwrap();

        let jobs = orch.converter().recorded_jobs().await;
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].options.scale, Some((10, 10)));
        assert_eq!(jobs[1].options.scale, Some((1280, 720)));
    }

    #[tokio::test]
    async fn test_panicking_job_is_unexpected_failure() {
        let input = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_fixture(input.path(), "a.jpg", Fixture::Jpeg);
        write_fixture(input.path(), "b.png", Fixture::Png);

        let orch = orchestrator(ExecutionMode::Concurrent);
        orch.converter().panic_on("a.jpg").await;

        let result = orch
            .batch_convert(input.path(), out.path(), OutputFormat::Png, None)
            .await
            .unwrap();

        assert_eq!(result.success_count, 1);
        assert_eq!(result.failure_count(), 1);
        assert_eq!(result.failures[0].kind, FailureKind::Unexpected);
        assert!(result.failures[0].path.ends_with("a.jpg"));
        assert_eq!(orch.status().failed, 1);
        assert_eq!(orch.status().active, 0);
    }
}
