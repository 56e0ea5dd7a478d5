use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Converter and probe timeouts are not 0
/// - ffmpeg and ffprobe paths are not empty
/// - Batch parallelism and progress buffer are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let converter = &config.converter;
    if converter.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "converter.timeout_secs cannot be 0".to_string(),
        ));
    }
    if converter.probe_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "converter.probe_timeout_secs cannot be 0".to_string(),
        ));
    }
    if converter.ffmpeg_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "converter.ffmpeg_path cannot be empty".to_string(),
        ));
    }
    if converter.ffprobe_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "converter.ffprobe_path cannot be empty".to_string(),
        ));
    }

    let batch = &config.batch;
    if batch.max_parallel_conversions == 0 {
        return Err(ConfigError::ValidationError(
            "batch.max_parallel_conversions cannot be 0".to_string(),
        ));
    }
    if batch.progress_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "batch.progress_buffer cannot be 0".to_string(),
        ));
    }

    Ok(())
}
