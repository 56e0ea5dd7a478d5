//! Batch lifecycle integration tests.
//!
//! These tests drive the orchestrator end to end over a real folder:
//! enumerate -> classify -> validate -> convert -> tally

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use unicon_core::{
    converter::ConverterError,
    testing::{write_fixture, Fixture, MockConverter},
    BatchConfig, BatchEvent, BatchOrchestrator, BatchProgress, ConverterConfig, EventHandle,
    ExecutionMode, FailureKind, FfmpegConverter, MediaCategory, OutputFormat,
};

/// Test helper owning the scratch folders.
struct TestHarness {
    input: TempDir,
    output: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            input: TempDir::new().expect("Failed to create input dir"),
            output: TempDir::new().expect("Failed to create output dir"),
        }
    }

    fn add(&self, name: &str, fixture: Fixture) -> PathBuf {
        write_fixture(self.input.path(), name, fixture)
    }

    fn out(&self, name: &str) -> PathBuf {
        self.output.path().join(name)
    }

    fn orchestrator(&self, mode: ExecutionMode) -> BatchOrchestrator<MockConverter> {
        BatchOrchestrator::new(BatchConfig::default().with_mode(mode), MockConverter::new())
    }
}

#[tokio::test]
async fn test_mixed_folder_to_png() {
    let harness = TestHarness::new();
    harness.add("a.jpg", Fixture::Jpeg);
    harness.add("b.mp4", Fixture::Mp4);
    harness.add("c.mp3", Fixture::Mp3);

    let result = harness
        .orchestrator(ExecutionMode::Concurrent)
        .batch_convert(harness.input.path(), harness.output.path(), OutputFormat::Png, None)
        .await
        .unwrap();

    assert_eq!(result.total_count, 3);
    assert_eq!(result.success_count, 3);
    assert_eq!(result.category_counts.get(MediaCategory::Image), 1);
    assert_eq!(result.category_counts.get(MediaCategory::Video), 1);
    assert_eq!(result.category_counts.get(MediaCategory::Audio), 1);
    assert!(harness.out("a.png").exists());
    assert!(harness.out("b.png").exists());
    assert!(harness.out("c.png").exists());
}

#[tokio::test]
async fn test_all_valid_files_succeed() {
    let harness = TestHarness::new();
    harness.add("one.mp4", Fixture::Mp4);
    harness.add("two.mkv", Fixture::Mkv);
    harness.add("three.mp4", Fixture::Mp4);

    let result = harness
        .orchestrator(ExecutionMode::Sequential)
        .batch_convert(harness.input.path(), harness.output.path(), OutputFormat::Webm, None)
        .await
        .unwrap();

    assert_eq!(result.success_count, result.total_count);
    assert_eq!(result.total_count, 3);
    assert!(result.is_clean());
}

#[tokio::test]
async fn test_unknown_files_are_counted_and_skipped() {
    let harness = TestHarness::new();
    harness.add("a.jpg", Fixture::Jpeg);
    harness.add("notes.txt", Fixture::Text);
    // Extension lies; content decides.
    harness.add("fake.mp4", Fixture::Text);

    let orchestrator = harness.orchestrator(ExecutionMode::Concurrent);
    let result = orchestrator
        .batch_convert(harness.input.path(), harness.output.path(), OutputFormat::Png, None)
        .await
        .unwrap();

    assert_eq!(result.total_count, 3);
    assert_eq!(result.success_count, 1);
    assert_eq!(result.skipped_count, 2);
    assert_eq!(result.category_counts.unknown, 2);
    assert_eq!(orchestrator.converter().conversion_count().await, 1);
    assert_eq!(
        result.success_count + result.skipped_count + result.failure_count(),
        result.total_count
    );
}

#[tokio::test]
async fn test_subfolders_are_not_enumerated() {
    let harness = TestHarness::new();
    harness.add("a.jpg", Fixture::Jpeg);
    let nested = harness.input.path().join("nested");
    std::fs::create_dir(&nested).unwrap();
    write_fixture(&nested, "b.jpg", Fixture::Jpeg);

    let result = harness
        .orchestrator(ExecutionMode::Concurrent)
        .batch_convert(harness.input.path(), harness.output.path(), OutputFormat::Png, None)
        .await
        .unwrap();

    assert_eq!(result.total_count, 1);
    assert!(!harness.out("b.png").exists());
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let harness = TestHarness::new();
    harness.add("a.jpg", Fixture::Jpeg);
    harness.add("b.mp4", Fixture::Mp4);
    harness.add("c.txt", Fixture::Text);

    let orchestrator = harness.orchestrator(ExecutionMode::Concurrent);
    let first = orchestrator
        .batch_convert(harness.input.path(), harness.output.path(), OutputFormat::Png, None)
        .await
        .unwrap();
    let second = orchestrator
        .batch_convert(harness.input.path(), harness.output.path(), OutputFormat::Png, None)
        .await
        .unwrap();

    assert_eq!(first.success_count, second.success_count);
    assert_eq!(first.total_count, second.total_count);
    assert_eq!(first.skipped_count, second.skipped_count);
    assert_eq!(first.category_counts, second.category_counts);

    let produced = std::fs::read_dir(harness.output.path()).unwrap().count();
    assert_eq!(produced, 2);
}

#[tokio::test]
async fn test_failure_does_not_abort_batch() {
    let harness = TestHarness::new();
    harness.add("a.mp4", Fixture::Mp4);
    harness.add("b.mp4", Fixture::Mp4);
    harness.add("c.mp4", Fixture::Mp4);

    let orchestrator = harness.orchestrator(ExecutionMode::Concurrent);
    orchestrator
        .converter()
        .fail_on(
            "b.mp4",
            ConverterError::NonZeroExit {
                code: Some(1),
                stderr: "moov atom not found".to_string(),
            },
        )
        .await;

    let result = orchestrator
        .batch_convert(harness.input.path(), harness.output.path(), OutputFormat::Mp3, None)
        .await
        .unwrap();

    assert_eq!(result.total_count, 3);
    assert_eq!(result.success_count, 2);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].kind, FailureKind::NonZeroExit);
    assert!(result.failures[0].detail.contains("moov atom not found"));
    assert!(result.failures[0].path.ends_with("b.mp4"));
}

#[tokio::test]
async fn test_fully_failed_batch_is_not_an_error() {
    let harness = TestHarness::new();
    harness.add("a.mp4", Fixture::Mp4);

    let orchestrator = harness.orchestrator(ExecutionMode::Concurrent);
    orchestrator
        .converter()
        .fail_on("a.mp4", ConverterError::Timeout { timeout_secs: 30 })
        .await;

    let result = orchestrator
        .batch_convert(harness.input.path(), harness.output.path(), OutputFormat::Mp4, None)
        .await
        .unwrap();

    assert_eq!(result.success_count, 0);
    assert_eq!(result.total_count, 1);
    assert_eq!(result.failures[0].kind, FailureKind::Timeout);
}

#[tokio::test]
async fn test_progress_per_file_strictly_increasing() {
    let harness = TestHarness::new();
    harness.add("a.mp4", Fixture::Mp4);
    harness.add("b.mp4", Fixture::Mp4);
    harness.add("c.mp3", Fixture::Mp3);

    let orchestrator = harness.orchestrator(ExecutionMode::Concurrent);
    orchestrator.converter().set_progress_steps(4).await;
    orchestrator
        .converter()
        .set_conversion_delay(Duration::from_millis(20))
        .await;

    let (tx, mut rx) = mpsc::channel::<BatchProgress>(64);
    let result = orchestrator
        .batch_convert(harness.input.path(), harness.output.path(), OutputFormat::Wav, Some(tx))
        .await
        .unwrap();
    assert_eq!(result.success_count, 3);

    let mut per_file: HashMap<usize, Vec<f64>> = HashMap::new();
    while let Some(sample) = rx.recv().await {
        assert_eq!(sample.total_files, 3);
        assert!(sample.overall <= 1.0);
        per_file.entry(sample.file_index).or_default().push(sample.overall);
    }

    assert_eq!(per_file.len(), 3);
    for (index, samples) in per_file {
        assert!(samples.windows(2).all(|w| w[1] > w[0]));
        let last = *samples.last().unwrap();
        assert_eq!(last, (index as f64 + 1.0) / 3.0);
    }
}

#[tokio::test]
async fn test_sequential_progress_is_monotonic() {
    let harness = TestHarness::new();
    harness.add("a.mp4", Fixture::Mp4);
    harness.add("b.mp4", Fixture::Mp4);

    let orchestrator = harness.orchestrator(ExecutionMode::Sequential);
    let (tx, mut rx) = mpsc::channel::<BatchProgress>(64);
    orchestrator
        .batch_convert(harness.input.path(), harness.output.path(), OutputFormat::Mp4, Some(tx))
        .await
        .unwrap();

    let mut overall = Vec::new();
    while let Some(sample) = rx.recv().await {
        overall.push(sample.overall);
    }
    assert!(overall.windows(2).all(|w| w[1] > w[0]));
    assert_eq!(overall.last().copied(), Some(1.0));
}

#[tokio::test]
async fn test_events_bracket_the_batch() {
    let harness = TestHarness::new();
    harness.add("a.jpg", Fixture::Jpeg);
    harness.add("b.txt", Fixture::Text);

    let (events, mut rx) = EventHandle::channel(256);
    let orchestrator = harness
        .orchestrator(ExecutionMode::Concurrent)
        .with_events(events);
    orchestrator
        .batch_convert(harness.input.path(), harness.output.path(), OutputFormat::Png, None)
        .await
        .unwrap();
    drop(orchestrator);

    let mut received = Vec::new();
    while let Some(envelope) = rx.recv().await {
        received.push(envelope.event);
    }

    assert!(matches!(
        received.first(),
        Some(BatchEvent::Started { total_files: 2, .. })
    ));
    assert!(matches!(
        received.last(),
        Some(BatchEvent::Completed {
            success_count: 1,
            total_count: 2,
            skipped_count: 1,
            ..
        })
    ));
    let types: Vec<_> = received.iter().map(|e| e.event_type()).collect();
    assert!(types.contains(&"file_skipped"));
    assert!(types.contains(&"file_started"));
    assert!(types.contains(&"file_converted"));
}

#[tokio::test]
async fn test_concurrency_limit_is_respected() {
    let harness = TestHarness::new();
    for i in 0..6 {
        harness.add(&format!("{}.mp4", i), Fixture::Mp4);
    }

    let orchestrator = BatchOrchestrator::new(
        BatchConfig::default().with_max_parallel(2),
        MockConverter::new(),
    );
    orchestrator
        .converter()
        .set_conversion_delay(Duration::from_millis(50))
        .await;

    let batch = orchestrator.batch_convert(
        harness.input.path(),
        harness.output.path(),
        OutputFormat::Mp4,
        None,
    );
    tokio::pin!(batch);

    let mut peak = 0;
    let result = loop {
        tokio::select! {
            result = &mut batch => break result.unwrap(),
            _ = tokio::time::sleep(Duration::from_millis(5)) => {
                peak = peak.max(orchestrator.status().active);
            }
        }
    };

    assert_eq!(result.success_count, 6);
    assert!(peak <= 2);
    assert_eq!(orchestrator.status().converted, 6);
}

#[tokio::test]
async fn test_ffmpeg_converter_image_shortcut_batch() {
    // Image -> PNG never launches ffmpeg.
    let harness = TestHarness::new();
    harness.add("a.jpg", Fixture::Jpeg);

    let converter = FfmpegConverter::new(ConverterConfig::with_paths(
        PathBuf::from("/nonexistent/ffmpeg"),
        PathBuf::from("/nonexistent/ffprobe"),
    ));
    let orchestrator = BatchOrchestrator::new(BatchConfig::default(), converter);

    let result = orchestrator
        .batch_convert(harness.input.path(), harness.output.path(), OutputFormat::Png, None)
        .await
        .unwrap();

    assert_eq!(result.success_count, 1);
    let png = image::open(harness.out("a.png")).expect("output should be a PNG");
    assert_eq!((png.width(), png.height()), (100, 100));
}
