//! Media categories and output formats.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse media kind derived from file content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaCategory {
    Video,
    Audio,
    Image,
    Unknown,
}

impl MediaCategory {
    /// All categories, `Unknown` last.
    pub const ALL: [MediaCategory; 4] = [Self::Video, Self::Audio, Self::Image, Self::Unknown];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MediaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "image" => Ok(Self::Image),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown media category: {}", other)),
        }
    }
}

/// Output formats the system knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    // Still images
    Png,
    Jpg,
    Bmp,
    Tiff,
    Webp,
    Gif,
    // Video containers
    Mp4,
    Avi,
    Mov,
    Mkv,
    Webm,
    // Audio
    Mp3,
    Wav,
    Ogg,
    Flac,
    Aac,
    M4a,
}

impl OutputFormat {
    /// File extension written for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Webp => "webp",
            Self::Gif => "gif",
            Self::Mp4 => "mp4",
            Self::Avi => "avi",
            Self::Mov => "mov",
            Self::Mkv => "mkv",
            Self::Webm => "webm",
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::Flac => "flac",
            Self::Aac => "aac",
            Self::M4a => "m4a",
        }
    }

    /// Whether the output is a single still picture.
    ///
    /// GIF is excluded: converting video to GIF keeps the animation.
    pub fn is_still_image(&self) -> bool {
        matches!(
            self,
            Self::Png | Self::Jpg | Self::Bmp | Self::Tiff | Self::Webp
        )
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches('.').to_ascii_lowercase();
        let format = match normalized.as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpg,
            "bmp" => Self::Bmp,
            "tif" | "tiff" => Self::Tiff,
            "webp" => Self::Webp,
            "gif" => Self::Gif,
            "mp4" => Self::Mp4,
            "avi" => Self::Avi,
            "mov" => Self::Mov,
            "mkv" => Self::Mkv,
            "webm" => Self::Webm,
            "mp3" => Self::Mp3,
            "wav" => Self::Wav,
            "ogg" => Self::Ogg,
            "flac" => Self::Flac,
            "aac" => Self::Aac,
            "m4a" => Self::M4a,
            _ => return Err(format!("unsupported output format: {}", s)),
        };
        Ok(format)
    }
}
