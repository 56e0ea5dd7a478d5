//! Static catalog of supported output formats per media category.

use super::category::{MediaCategory, OutputFormat};

const IMAGE_FORMATS: &[OutputFormat] = &[
    OutputFormat::Png,
    OutputFormat::Jpg,
    OutputFormat::Bmp,
    OutputFormat::Tiff,
    OutputFormat::Webp,
    OutputFormat::Gif,
];

const VIDEO_FORMATS: &[OutputFormat] = &[
    OutputFormat::Mp4,
    OutputFormat::Avi,
    OutputFormat::Mov,
    OutputFormat::Mkv,
    OutputFormat::Webm,
    OutputFormat::Gif,
    // Audio track extraction
    OutputFormat::Mp3,
    OutputFormat::Wav,
    // First frame
    OutputFormat::Png,
    OutputFormat::Jpg,
];

const AUDIO_FORMATS: &[OutputFormat] = &[
    OutputFormat::Mp3,
    OutputFormat::Wav,
    OutputFormat::Ogg,
    OutputFormat::Flac,
    OutputFormat::Aac,
    OutputFormat::M4a,
    // Waveform picture
    OutputFormat::Png,
];

/// Output formats that files of `category` can be converted to.
pub fn possible_formats(category: MediaCategory) -> &'static [OutputFormat] {
    match category {
        MediaCategory::Image => IMAGE_FORMATS,
        MediaCategory::Video => VIDEO_FORMATS,
        MediaCategory::Audio => AUDIO_FORMATS,
        MediaCategory::Unknown => &[],
    }
}

/// Whether `format` is a valid target for `category`.
pub fn is_supported(category: MediaCategory, format: OutputFormat) -> bool {
    possible_formats(category).contains(&format)
}
