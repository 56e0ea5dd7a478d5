//! Content-based media classification.
//!
//! Files are classified by their leading bytes, never by their name. Any
//! failure to read the file is reported as [`MediaCategory::Unknown`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::category::MediaCategory;

/// Number of leading bytes inspected.
const SNIFF_LEN: u64 = 512;

/// MPEG transport stream packet size.
const TS_PACKET_LEN: usize = 188;

/// Something that can tell which kind of media a file holds.
pub trait ContentClassifier: Send + Sync {
    /// Classifies the file at `path`. Must not fail; unreadable or
    /// unrecognised content is `Unknown`.
    fn classify(&self, path: &Path) -> MediaCategory;
}

/// Magic-number classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicClassifier;

impl MagicClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl ContentClassifier for MagicClassifier {
    fn classify(&self, path: &Path) -> MediaCategory {
        match read_header(path) {
            Ok(header) => classify_bytes(&header),
            Err(e) => {
                tracing::debug!("Could not read {:?} for classification: {}", path, e);
                MediaCategory::Unknown
            }
        }
    }
}

/// Classifies a file with the default [`MagicClassifier`].
pub fn classify(path: &Path) -> MediaCategory {
    MagicClassifier.classify(path)
}

fn read_header(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = File::open(path)?;
    let mut header = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN).read_to_end(&mut header)?;
    Ok(header)
}

/// Classifies a buffer holding the first bytes of a file.
pub fn classify_bytes(b: &[u8]) -> MediaCategory {
    if is_image(b) {
        MediaCategory::Image
    } else if let Some(category) = classify_iso_bmff(b) {
        category
    } else if is_audio(b) {
        MediaCategory::Audio
    } else if is_video(b) {
        MediaCategory::Video
    } else {
        MediaCategory::Unknown
    }
}

fn riff_form(b: &[u8]) -> Option<&[u8]> {
    if b.len() >= 12 && &b[0..4] == b"RIFF" {
        Some(&b[8..12])
    } else {
        None
    }
}

fn is_image(b: &[u8]) -> bool {
    b.starts_with(&[0xFF, 0xD8, 0xFF])
        || b.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])
        || b.starts_with(b"GIF87a")
        || b.starts_with(b"GIF89a")
        || (b.len() >= 14 && b.starts_with(b"BM"))
        || b.starts_with(b"II*\0")
        || b.starts_with(b"MM\0*")
        || b.starts_with(&[0x00, 0x00, 0x01, 0x00])
        || riff_form(b) == Some(b"WEBP")
}

/// MP4 family: `ftyp` brand decides between audio-only and video.
fn classify_iso_bmff(b: &[u8]) -> Option<MediaCategory> {
    if b.len() < 12 {
        return None;
    }
    match &b[4..8] {
        b"ftyp" => match &b[8..12] {
            b"M4A " | b"M4B " | b"M4P " | b"F4A " | b"F4B " => Some(MediaCategory::Audio),
            _ => Some(MediaCategory::Video),
        },
        b"moov" | b"mdat" | b"free" | b"wide" => Some(MediaCategory::Video),
        _ => None,
    }
}

fn is_audio(b: &[u8]) -> bool {
    if b.starts_with(b"ID3")
        || b.starts_with(b"OggS")
        || b.starts_with(b"fLaC")
        || riff_form(b) == Some(b"WAVE")
    {
        return true;
    }

    if b.len() >= 12 && &b[0..4] == b"FORM" && (&b[8..12] == b"AIFF" || &b[8..12] == b"AIFC") {
        return true;
    }

    // Frame sync: MPEG audio (layer bits set) or AAC ADTS (layer bits zero)
    b.len() >= 2 && b[0] == 0xFF && (b[1] & 0xE0) == 0xE0
}

fn is_video(b: &[u8]) -> bool {
    b.starts_with(&[0x1A, 0x45, 0xDF, 0xA3])
        || riff_form(b) == Some(b"AVI ")
        || b.starts_with(&[0x00, 0x00, 0x01, 0xBA])
        || b.starts_with(&[0x00, 0x00, 0x01, 0xB3])
        || b.starts_with(b"FLV")
        || b.starts_with(&[0x30, 0x26, 0xB2, 0x75, 0x8E, 0x66, 0xCF, 0x11])
        || (b.len() > TS_PACKET_LEN && b[0] == 0x47 && b[TS_PACKET_LEN] == 0x47)
}
