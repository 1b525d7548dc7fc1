use std::path::PathBuf;

use clap::builder::TypedValueParser;
use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::backend::{DEFAULT_BLUR_RADIUS, DEFAULT_PIXEL_SIZE, DEFAULT_THRESHOLD};
use crate::config::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use crate::selection::DEFAULT_COLORS;

/// Extract, shuffle and export color palettes from images and short videos.
#[derive(Parser, Debug)]
#[command(name = "colorchef", version, about)]
pub struct Args {
    /// Base URL of the extraction service
    #[arg(long, global = true, env = "COLORCHEF_API_URL", default_value = DEFAULT_API_URL)]
    pub server: String,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Enable debug logging (RUST_LOG is honoured)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload an image or video and extract its dominant colors
    Extract(ExtractArgs),
    /// Work offline with a palette saved by --save-state
    Palette(PaletteArgs),
    /// Posterize an image
    Posterize(PosterizeArgs),
    /// Turn an image into line art
    LineArt(LineArtArgs),
    /// Blend posterized colors with line art
    Blend(BlendArgs),
}

impl Command {
    pub fn is_interactive(&self) -> bool {
        match self {
            Command::Extract(a) => a.view.tui,
            Command::Palette(a) => a.view.tui,
            _ => false,
        }
    }
}

/// What to do with the resulting selection.
#[derive(ClapArgs, Debug, Clone)]
pub struct ViewArgs {
    /// Number of colors to show (1-20). Defaults to 4, or to the saved
    /// count for `palette`
    #[arg(short = 'k', long = "colors",
          value_parser = clap::value_parser!(u8).range(1..=20).map(usize::from))]
    pub colors: Option<usize>,

    /// Shuffle active and reserve colors before output
    #[arg(long)]
    pub shuffle: bool,

    /// Write the palette image here (use a directory to get color-palette.png)
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Save the selection as JSON for later `palette` runs
    #[arg(long)]
    pub save_state: Option<PathBuf>,

    /// Launch the interactive terminal view
    #[arg(long)]
    pub tui: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ExtractArgs {
    /// Image or video to analyze
    pub media: PathBuf,

    /// Trim start in seconds (videos only)
    #[arg(long)]
    pub start: Option<f64>,

    /// Trim end in seconds (videos only)
    #[arg(long)]
    pub end: Option<f64>,

    /// Video duration in seconds; probed with ffprobe when omitted
    #[arg(long)]
    pub duration: Option<f64>,

    /// Ask the backend again after the color count changes in the terminal view
    #[arg(long)]
    pub refetch_on_resize: bool,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(ClapArgs, Debug)]
pub struct PaletteArgs {
    /// JSON file written by --save-state
    pub state: PathBuf,

    /// Image to pick colors from in the terminal view
    #[arg(long)]
    pub image: Option<PathBuf>,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(ClapArgs, Debug, Clone, Copy)]
pub struct PosterizeOpts {
    /// Pixel block size (2-32)
    #[arg(long, default_value_t = DEFAULT_PIXEL_SIZE,
          value_parser = clap::value_parser!(u32).range(2..=32))]
    pub pixel_size: u32,

    /// Number of colors (1-20)
    #[arg(short = 'k', long = "colors", default_value_t = DEFAULT_COLORS,
          value_parser = clap::value_parser!(u8).range(1..=20).map(usize::from))]
    pub colors: usize,
}

#[derive(ClapArgs, Debug, Clone, Copy)]
pub struct LineArtOpts {
    /// Edge threshold (1-255)
    #[arg(long, default_value_t = DEFAULT_THRESHOLD,
          value_parser = clap::value_parser!(u8).range(1..=255))]
    pub threshold: u8,

    /// Blur radius applied before edge detection (0-5)
    #[arg(long, default_value_t = DEFAULT_BLUR_RADIUS,
          value_parser = clap::value_parser!(u8).range(0..=5))]
    pub blur_radius: u8,
}

#[derive(ClapArgs, Debug)]
pub struct PosterizeArgs {
    pub image: PathBuf,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Request SVG instead of PNG
    #[arg(long)]
    pub svg: bool,

    #[command(flatten)]
    pub opts: PosterizeOpts,
}

#[derive(ClapArgs, Debug)]
pub struct LineArtArgs {
    pub image: PathBuf,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Request SVG instead of PNG
    #[arg(long)]
    pub svg: bool,

    #[command(flatten)]
    pub opts: LineArtOpts,
}

#[derive(ClapArgs, Debug)]
pub struct BlendArgs {
    pub image: PathBuf,

    /// Output file
    #[arg(short, long)]
    pub output: PathBuf,

    #[command(flatten)]
    pub posterize: PosterizeOpts,

    #[command(flatten)]
    pub line_art: LineArtOpts,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn extract_defaults() {
        let args = Args::try_parse_from(["colorchef", "extract", "photo.png"]).unwrap();
        let Command::Extract(extract) = args.command else {
            panic!("expected extract");
        };
        assert_eq!(extract.view.colors, None);
        assert!(!extract.view.tui);
        assert_eq!(extract.start, None);
    }

    #[test]
    fn color_count_is_bounded() {
        assert!(Args::try_parse_from(["colorchef", "extract", "a.png", "-k", "0"]).is_err());
        assert!(Args::try_parse_from(["colorchef", "extract", "a.png", "-k", "21"]).is_err());
        let args = Args::try_parse_from(["colorchef", "extract", "a.png", "-k", "20"]).unwrap();
        let Command::Extract(extract) = args.command else {
            panic!("expected extract");
        };
        assert_eq!(extract.view.colors, Some(20));
    }

    #[test]
    fn blend_takes_both_option_groups() {
        let args = Args::try_parse_from([
            "colorchef", "blend", "a.png", "-o", "out.png", "--pixel-size", "8", "--threshold", "90",
        ])
        .unwrap();
        let Command::Blend(blend) = args.command else {
            panic!("expected blend");
        };
        assert_eq!(blend.posterize.pixel_size, 8);
        assert_eq!(blend.line_art.threshold, 90);
        assert_eq!(blend.line_art.blur_radius, 0);
    }

    #[test]
    fn global_server_flag_after_subcommand() {
        let args = Args::try_parse_from([
            "colorchef", "palette", "state.json", "--server", "http://example.test",
        ])
        .unwrap();
        assert_eq!(args.server, "http://example.test");
    }
}
