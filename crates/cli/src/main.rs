mod cli;
mod report;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use unicon_core::{
    batch::output_path_for,
    load_config_or_default,
    media::is_supported,
    validate_config, BatchOrchestrator, Config, ConversionJob, ConversionOptions, Converter,
    EventHandle, ExecutionMode, FfmpegConverter, MediaCategory, OutputFormat,
};

use cli::Cli;

/// Buffer size for the batch event channel
const EVENT_BUFFER_SIZE: usize = 256;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Runs the command and returns the process exit code.
///
/// Validation problems are errors. A batch always exits 0 once it ran; a
/// single conversion exits 1 when it failed.
async fn run(cli: Cli) -> Result<i32> {
    let config = resolve_config(&cli)?;

    let format: OutputFormat = cli.format.parse().map_err(anyhow::Error::msg)?;
    let declared = cli
        .category
        .as_deref()
        .map(parse_category)
        .transpose()?;

    if !cli.input.exists() {
        bail!("Input path {} does not exist", cli.input.display());
    }

    if cli.input.is_dir() {
        run_batch(&cli, config, format, declared).await
    } else {
        run_single(&cli, config, format, declared).await
    }
}

fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = load_config_or_default(cli.config.as_deref()).with_context(|| {
        match &cli.config {
            Some(path) => format!("Failed to load config from {:?}", path),
            None => "Failed to load configuration".to_string(),
        }
    })?;

    if let Some(timeout) = cli.timeout {
        config.converter.timeout_secs = timeout;
    }
    if let Some(max) = cli.max_parallel {
        config.batch.max_parallel_conversions = max;
    }
    if cli.sequential {
        config.batch.execution_mode = ExecutionMode::Sequential;
    }

    validate_config(&config).context("Configuration validation failed")?;
    Ok(config)
}

fn parse_category(value: &str) -> Result<MediaCategory> {
    match value.parse::<MediaCategory>() {
        Ok(MediaCategory::Unknown) | Err(_) => {
            bail!("Unsupported category '{}': expected audio, video or image", value)
        }
        Ok(category) => Ok(category),
    }
}

/// Scale option for a category: resolution for video and waveforms, resize for images.
fn options_for(cli: &Cli, category: MediaCategory) -> ConversionOptions {
    let scale = match category {
        MediaCategory::Image => cli.resize,
        MediaCategory::Video | MediaCategory::Audio => cli.resolution,
        MediaCategory::Unknown => None,
    };
    ConversionOptions { scale }
}

fn supported_list(category: MediaCategory) -> String {
    unicon_core::possible_formats(category)
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

async fn run_single(
    cli: &Cli,
    config: Config,
    format: OutputFormat,
    declared: Option<MediaCategory>,
) -> Result<i32> {
    let detected = unicon_core::classify(&cli.input);
    if detected == MediaCategory::Unknown {
        bail!("Could not determine the media type of {}", cli.input.display());
    }
    if let Some(declared) = declared {
        if declared != detected {
            bail!(
                "{} was declared as {} but its content is {}",
                cli.input.display(),
                declared,
                detected
            );
        }
    }
    if !is_supported(detected, format) {
        bail!(
            "Cannot convert {} to {}; supported formats: {}",
            detected,
            format,
            supported_list(detected)
        );
    }

    tokio::fs::create_dir_all(&cli.output_folder)
        .await
        .with_context(|| format!("Failed to create {}", cli.output_folder.display()))?;

    let output = output_path_for(&cli.input, &cli.output_folder, format);
    let job = ConversionJob::new(
        single_job_id(&cli.input),
        &cli.input,
        &output,
        detected,
        format,
    )
    .with_options(options_for(cli, detected));

    let converter = FfmpegConverter::new(config.converter);
    let (tx, rx) = mpsc::channel(config.batch.progress_buffer);
    let printer = tokio::spawn(report::print_file_progress(rx));
    let outcome = converter.convert_with_progress(job, tx).await;
    let _ = printer.await;

    match outcome.failure {
        None => {
            println!("Converted {} -> {}", cli.input.display(), output.display());
            Ok(0)
        }
        Some(failure) => {
            eprintln!(
                "Failed to convert {} [{}]: {}",
                cli.input.display(),
                failure.kind,
                failure.detail
            );
            Ok(1)
        }
    }
}

/// Job id for a single conversion, derived from the file name.
fn single_job_id(input: &Path) -> String {
    input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "single".to_string())
}

async fn run_batch(
    cli: &Cli,
    config: Config,
    format: OutputFormat,
    declared: Option<MediaCategory>,
) -> Result<i32> {
    if let Some(category) = declared {
        if !is_supported(category, format) {
            bail!(
                "Cannot convert {} to {}; supported formats: {}",
                category,
                format,
                supported_list(category)
            );
        }
    }

    let converter = FfmpegConverter::new(config.converter);
    if let Err(e) = converter.validate().await {
        warn!("{}; only conversions handled in-process can succeed", e);
    }

    let (events, events_rx) = EventHandle::channel(EVENT_BUFFER_SIZE);
    let (progress_tx, progress_rx) = mpsc::channel(config.batch.progress_buffer);
    let event_printer = tokio::spawn(report::print_events(events_rx));
    let progress_printer = tokio::spawn(report::print_batch_progress(progress_rx));

    let mut orchestrator = BatchOrchestrator::new(config.batch, converter)
        .with_events(events)
        .with_category_options(MediaCategory::Image, options_for(cli, MediaCategory::Image))
        .with_category_options(MediaCategory::Video, options_for(cli, MediaCategory::Video))
        .with_category_options(MediaCategory::Audio, options_for(cli, MediaCategory::Audio));
    if let Some(category) = declared {
        orchestrator = orchestrator.with_category_filter(category);
    }

    let result = orchestrator
        .batch_convert(&cli.input, &cli.output_folder, format, Some(progress_tx))
        .await
        .context("Batch conversion failed")?;

    // Closes the event channel so the printer drains and exits.
    drop(orchestrator);
    let _ = event_printer.await;
    let _ = progress_printer.await;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize result")?
        );
    } else {
        println!("{}", report::format_summary(&result));
    }
    info!(
        "Batch finished with {} of {} files converted",
        result.success_count, result.total_count
    );

    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use unicon_core::testing::{write_fixture, Fixture};

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["unicon"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    fn arg(path: &Path) -> String {
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category("video").unwrap(), MediaCategory::Video);
        assert!(parse_category("unknown").is_err());
        assert!(parse_category("document").is_err());
    }

    #[test]
    fn test_options_for_category() {
        let cli = cli(&["in", "out", "-f", "png", "--resize", "40x20", "--resolution", "1280x720"]);
        assert_eq!(options_for(&cli, MediaCategory::Image).scale, Some((40, 20)));
        assert_eq!(options_for(&cli, MediaCategory::Video).scale, Some((1280, 720)));
        assert_eq!(options_for(&cli, MediaCategory::Unknown).scale, None);
    }

    #[tokio::test]
    async fn test_missing_input_is_an_error() {
        let out = TempDir::new().unwrap();
        let cli = cli(&["/nonexistent/input.jpg", &arg(out.path()), "-f", "png"]);
        assert!(run(cli).await.is_err());
    }

    #[tokio::test]
    async fn test_bad_format_is_an_error() {
        let dir = TempDir::new().unwrap();
        let input = write_fixture(dir.path(), "a.jpg", Fixture::Jpeg);
        let cli = cli(&[&arg(&input), &arg(dir.path()), "-f", "docx"]);
        assert!(run(cli).await.is_err());
    }

    #[tokio::test]
    async fn test_unsupported_pair_is_an_error() {
        let dir = TempDir::new().unwrap();
        let input = write_fixture(dir.path(), "a.jpg", Fixture::Jpeg);
        let cli = cli(&[&arg(&input), &arg(dir.path()), "-f", "mp4"]);
        let err = run(cli).await.unwrap_err();
        assert!(err.to_string().contains("supported formats"));
    }

    #[tokio::test]
    async fn test_declared_category_must_match_content() {
        let dir = TempDir::new().unwrap();
        let input = write_fixture(dir.path(), "a.jpg", Fixture::Jpeg);
        let cli = cli(&[&arg(&input), &arg(dir.path()), "-f", "png", "--category", "video"]);
        assert!(run(cli).await.is_err());
    }

    #[tokio::test]
    async fn test_single_image_to_png() {
        let dir = TempDir::new().unwrap();
        let input = write_fixture(dir.path(), "a.jpg", Fixture::Jpeg);
        let out = dir.path().join("out");
        let cli = cli(&[&arg(&input), &arg(&out), "-f", "png", "--resize", "50x50"]);

        assert_eq!(run(cli).await.unwrap(), 0);
        let png = out.join("a.png");
        assert!(png.exists());
    }

    #[tokio::test]
    async fn test_batch_rejects_format_unsupported_for_declared_category() {
        let input = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_fixture(input.path(), "a.jpg", Fixture::Jpeg);

        let cli = cli(&[
            &arg(input.path()),
            &arg(out.path()),
            "-f",
            "mp3",
            "--category",
            "image",
        ]);
        let err = run(cli).await.unwrap_err();
        assert!(err.to_string().contains("supported formats"));
        assert!(!out.path().join("a.mp3").exists());
    }

    #[tokio::test]
    async fn test_batch_exit_code_ignores_failures() {
        let input = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        write_fixture(input.path(), "a.jpg", Fixture::Jpeg);
        write_fixture(input.path(), "notes.txt", Fixture::Text);
        // Header only; ffmpeg is missing or rejects it either way.
        write_fixture(input.path(), "b.mp4", Fixture::Mp4);

        let cli = cli(&[&arg(input.path()), &arg(out.path()), "-f", "png", "--json"]);
        assert_eq!(run(cli).await.unwrap(), 0);
        assert!(out.path().join("a.png").exists());
        assert!(!out.path().join("notes.png").exists());
    }
}
