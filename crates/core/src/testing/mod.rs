//! Testing utilities and mock implementations.
//!
//! This module provides a mock [`Converter`](crate::converter::Converter)
//! and small media fixtures, allowing orchestrator tests without ffmpeg.
//!
//! # Example
//!
//! ```rust,ignore
//! use unicon_core::testing::{write_fixture, Fixture, MockConverter};
//!
//! write_fixture(dir.path(), "a.jpg", Fixture::Jpeg);
//! write_fixture(dir.path(), "b.mp4", Fixture::Mp4);
//!
//! let orchestrator = BatchOrchestrator::new(BatchConfig::default(), MockConverter::new());
//! ```

mod mock_converter;

pub use mock_converter::{MockConverter, RecordedConversion};

pub use fixtures::{write_fixture, Fixture};

/// Test fixtures and helper functions.
pub mod fixtures {
    use image::{ImageFormat, Rgb, RgbImage};
    use std::path::{Path, PathBuf};

    /// Kind of file to synthesize.
    ///
    /// Only `Jpeg` and `Png` are decodable media; the others carry just
    /// enough header bytes to be classified.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Fixture {
        /// A real 100x100 red JPEG.
        Jpeg,
        /// A real 100x100 red PNG.
        Png,
        /// An ISO-BMFF header with an `isom` brand.
        Mp4,
        /// An ISO-BMFF header with an `M4A ` brand.
        M4a,
        /// An ID3v2 tag header.
        Mp3,
        /// A RIFF/WAVE header.
        Wav,
        /// An EBML (Matroska) header.
        Mkv,
        /// Plain text.
        Text,
    }

    /// Write a fixture named `name` into `dir` and return its path.
    ///
    /// Panics if the file cannot be written.
    pub fn write_fixture(dir: &Path, name: &str, fixture: Fixture) -> PathBuf {
        let path = dir.join(name);
        match fixture {
            Fixture::Jpeg => write_image(&path, ImageFormat::Jpeg),
            Fixture::Png => write_image(&path, ImageFormat::Png),
            other => std::fs::write(&path, header_bytes(other)).expect("write fixture"),
        }
        path
    }

    /// A solid red image of the given size.
    pub fn red_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 0, 0]))
    }

    fn write_image(path: &Path, format: ImageFormat) {
        red_image(100, 100)
            .save_with_format(path, format)
            .expect("encode fixture image");
    }

    fn header_bytes(fixture: Fixture) -> Vec<u8> {
        let mut bytes = match fixture {
            Fixture::Mp4 => ftyp(b"isom"),
            Fixture::M4a => ftyp(b"M4A "),
            Fixture::Mp3 => b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec(),
            Fixture::Wav => {
                let mut b = b"RIFF".to_vec();
                b.extend_from_slice(&36u32.to_le_bytes());
                b.extend_from_slice(b"WAVEfmt ");
                b
            }
            Fixture::Mkv => vec![0x1A, 0x45, 0xDF, 0xA3, 0x93, 0x42, 0x82, 0x88],
            Fixture::Text => b"just some notes, not media\n".to_vec(),
            Fixture::Jpeg | Fixture::Png => Vec::new(),
        };
        bytes.resize(bytes.len().max(64), 0);
        bytes
    }

    fn ftyp(brand: &[u8; 4]) -> Vec<u8> {
        let mut b = 24u32.to_be_bytes().to_vec();
        b.extend_from_slice(b"ftyp");
        b.extend_from_slice(brand);
        b.extend_from_slice(&0u32.to_be_bytes());
        b.extend_from_slice(brand);
        b.extend_from_slice(b"mp41");
        b
    }
}
