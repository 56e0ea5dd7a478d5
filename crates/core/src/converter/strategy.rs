//! How a (category, format) pair gets converted.

use serde::{Deserialize, Serialize};

use super::types::ConversionOptions;
use crate::media::{is_supported, MediaCategory, OutputFormat};

/// Conversion path chosen for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStrategy {
    /// Image to PNG, re-encoded in process without ffmpeg.
    ImageReencode,
    /// Image to another image format through ffmpeg.
    ImageTranscode,
    /// Video to another video container.
    VideoTranscode,
    /// Video to a still picture of its first frame.
    FirstFrame,
    /// Video to an audio-only file.
    AudioExtract,
    /// Audio to another audio format.
    AudioTranscode,
    /// Audio to a rendered waveform picture.
    Waveform,
}

impl ConversionStrategy {
    /// Picks the strategy for a pair, or `None` when the catalog does not
    /// list `format` for `category`.
    pub fn select(category: MediaCategory, format: OutputFormat) -> Option<Self> {
        if !is_supported(category, format) {
            return None;
        }

        let strategy = match (category, format) {
            (MediaCategory::Image, OutputFormat::Png) => Self::ImageReencode,
            (MediaCategory::Image, _) => Self::ImageTranscode,
            (MediaCategory::Video, f) if f.is_still_image() => Self::FirstFrame,
            (MediaCategory::Video, OutputFormat::Mp3 | OutputFormat::Wav) => Self::AudioExtract,
            (MediaCategory::Video, _) => Self::VideoTranscode,
            (MediaCategory::Audio, f) if f.is_still_image() => Self::Waveform,
            (MediaCategory::Audio, _) => Self::AudioTranscode,
            (MediaCategory::Unknown, _) => return None,
        };
        Some(strategy)
    }

    /// Whether this strategy runs the external tool.
    pub fn uses_subprocess(&self) -> bool {
        !matches!(self, Self::ImageReencode)
    }

    /// Extra ffmpeg directives, placed after the input and before the
    /// progress flags and output path.
    pub fn ffmpeg_directives(
        &self,
        options: &ConversionOptions,
        waveform_size: (u32, u32),
    ) -> Vec<String> {
        let mut args = Vec::new();

        let scale_filter = |args: &mut Vec<String>| {
            if let Some((w, h)) = options.scale {
                args.extend(["-vf".to_string(), format!("scale={}:{}", w, h)]);
            }
        };

        match self {
            Self::ImageReencode => {}
            Self::ImageTranscode | Self::VideoTranscode => scale_filter(&mut args),
            Self::FirstFrame => {
                scale_filter(&mut args);
                args.extend(["-frames:v".to_string(), "1".to_string()]);
            }
            Self::AudioExtract | Self::AudioTranscode => args.push("-vn".to_string()),
            Self::Waveform => {
                let (w, h) = options.scale.unwrap_or(waveform_size);
                args.extend([
                    "-filter_complex".to_string(),
                    format!("showwavespic=s={}x{}", w, h),
                    "-frames:v".to_string(),
                    "1".to_string(),
                ]);
            }
        }

        args
    }
}
