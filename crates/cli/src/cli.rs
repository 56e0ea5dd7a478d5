use clap::Parser;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::path::PathBuf;

static DIMENSIONS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)[xX:](\d+)$").expect("dimensions regex is valid"));

#[derive(Parser, Debug)]
#[command(name = "unicon")]
#[command(author, version, about = "Convert media files, or every file of a folder, with ffmpeg")]
pub struct Cli {
    /// Input file or folder
    pub input: PathBuf,

    /// Folder receiving the converted files
    pub output_folder: PathBuf,

    /// Target format (png, jpg, mp4, mkv, mp3, wav, ...)
    #[arg(short, long)]
    pub format: String,

    /// Declared media category (audio, video or image)
    #[arg(long)]
    pub category: Option<String>,

    /// Output resolution for video, or picture size for waveforms, as WxH
    #[arg(long, value_parser = parse_dimensions)]
    pub resolution: Option<(u32, u32)>,

    /// Resize images to WxH
    #[arg(long, value_parser = parse_dimensions)]
    pub resize: Option<(u32, u32)>,

    /// Convert one file at a time
    #[arg(long)]
    pub sequential: bool,

    /// Maximum conversions running at once
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Per-file timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the batch result as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parses `WxH` (or `W:H`) into a non-zero width and height.
pub fn parse_dimensions(value: &str) -> Result<(u32, u32), String> {
    let caps = DIMENSIONS_RE
        .captures(value.trim())
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;

    let parse = |s: &str| {
        s.parse::<u32>()
            .map_err(|e| format!("invalid dimension '{}': {}", s, e))
    };
    let width = parse(&caps[1])?;
    let height = parse(&caps[2])?;
    if width == 0 || height == 0 {
        return Err(format!("dimensions must be non-zero, got '{}'", value));
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("1280x720"), Ok((1280, 720)));
        assert_eq!(parse_dimensions("640X480"), Ok((640, 480)));
        assert_eq!(parse_dimensions("100:50"), Ok((100, 50)));
    }

    #[test]
    fn test_parse_dimensions_rejects_garbage() {
        assert!(parse_dimensions("1280").is_err());
        assert!(parse_dimensions("0x720").is_err());
        assert!(parse_dimensions("axb").is_err());
        assert!(parse_dimensions("99999999999x1").is_err());
    }

    #[test]
    fn test_parse_args() {
        let cli = Cli::try_parse_from([
            "unicon",
            "in",
            "out",
            "--format",
            "mp4",
            "--resolution",
            "1280x720",
            "--sequential",
        ])
        .unwrap();

        assert_eq!(cli.input, PathBuf::from("in"));
        assert_eq!(cli.output_folder, PathBuf::from("out"));
        assert_eq!(cli.format, "mp4");
        assert_eq!(cli.resolution, Some((1280, 720)));
        assert!(cli.sequential);
        assert!(cli.category.is_none());
    }

    #[test]
    fn test_format_is_required() {
        assert!(Cli::try_parse_from(["unicon", "in", "out"]).is_err());
    }
}
