pub mod batch;
pub mod config;
pub mod converter;
pub mod events;
pub mod media;
pub mod testing;

pub use batch::{
    BatchConfig, BatchError, BatchOrchestrator, BatchProgress, BatchResult, CategoryCounts,
    ExecutionMode, FileFailure,
};
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError,
};
pub use converter::{
    ConversionJob, ConversionOptions, ConversionOutcome, ConversionProgress, Converter,
    ConverterConfig, ConverterError, FailureKind, FfmpegConverter,
};
pub use events::{BatchEvent, BatchEventEnvelope, EventHandle};
pub use media::{classify, possible_formats, MediaCategory, OutputFormat};
