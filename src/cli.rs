use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

use crate::image_processing::options::{
    BayerSize, DitherMethod, DitheringOptions, Effect, OptimizationOptions, ToneSettings,
    DEFAULT_CHROMATIC_OFFSET, DEFAULT_GLITCH_BLOCK_SIZE, DEFAULT_GLITCH_INTENSITY,
    DEFAULT_MOSAIC_TILE_SIZE, DEFAULT_POSTERIZE_LEVELS,
};
use crate::image_processing::palette::Palette;

pub const DEFAULT_PALETTE: &str = "#000000,#FFFFFF";
pub const DEFAULT_EXTENSIONS: &str = "jpg,jpeg,png,gif,webp,tiff";
pub const OUTPUT_FORMATS: [&str; 4] = ["png", "jpg", "webp", "tiff"];

#[derive(Parser, Debug)]
#[command(
    name = "ditherfx",
    version,
    about = "Dithering and glitch-effect processor for still images and animated GIFs",
    long_about = "
ditherfx - retro dithering and glitch effects

Runs every input image through a fixed pipeline: scale, tone curves, an
ordered chain of creative effects, then palette dithering. Animated GIFs are
processed frame by frame in parallel and then optimized (duplicate frames
folded, frame rate capped, colors optionally quantized).

Dithering methods:
  floyd-steinberg, atkinson, sierra   error diffusion
  ordered                             Bayer matrix (--bayer-size 2|4|8)
  jitter                              random offset (--jitter AMOUNT)
  threshold                           black/white split (--threshold LUMA)

Effects (applied in the order given):
  glitch, posterize, invert, mosaic, chromatic

Example Usage:
  # Floyd-Steinberg to black & white
  ditherfx -i ~/Pictures/cat.png -o ~/out

  # Game Boy palette with a Bayer 8x8 matrix, scaled down 50%
  ditherfx -i ~/Pictures -o ~/out --dithering ordered --bayer-size 8 \\
    --palette '#0F380F,#306230,#8BAC0F,#9BBC0F' --scale 0.5

  # Glitched animation, reproducible, capped at 15 fps
  ditherfx -i anim.gif -o ~/out --effect glitch,chromatic --glitch-intensity 0.3 \\
    --seed 42 --target-fps 15 --report

  # Load a saved preset; explicit flags still win
  ditherfx -i ~/Pictures -o ~/out --config preset.json --contrast 20"
)]
pub struct Args {
    /// Input directories or single image files (can be specified multiple times)
    #[arg(short = 'i', long = "input", value_name = "DIR|FILE")]
    pub input_paths: Vec<PathBuf>,

    /// Output directory for processed images
    #[arg(short = 'o', long = "output", value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// JSON preset with processing and optimization options
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Dithering method (unknown names fall back to floyd-steinberg)
    #[arg(
        short = 'd',
        long = "dithering",
        default_value = "floyd-steinberg",
        value_name = "METHOD"
    )]
    pub dithering_method: String,

    /// Skip the dithering stage entirely
    #[arg(long = "no-dither")]
    pub no_dither: bool,

    /// Comma-separated #RRGGBB palette
    #[arg(short = 'p', long = "palette", default_value = DEFAULT_PALETTE, value_name = "COLORS")]
    pub palette: String,

    /// Bayer matrix size for ordered dithering (2, 4 or 8)
    #[arg(long = "bayer-size", default_value = "4", value_name = "N")]
    pub bayer_size: u32,

    /// Jitter amount for random dithering
    #[arg(long = "jitter", default_value = "0.5", value_name = "AMOUNT")]
    pub jitter_amount: f32,

    /// Luma threshold (0-255) for threshold dithering
    #[arg(long = "threshold", default_value = "128", value_name = "LUMA")]
    pub threshold: f32,

    /// Effects to apply, in order (comma-separated or repeated)
    #[arg(
        short = 'e',
        long = "effect",
        value_delimiter = ',',
        value_name = "NAME"
    )]
    pub effects: Vec<String>,

    /// Glitch probability per block (0.0-1.0)
    #[arg(long = "glitch-intensity", default_value_t = DEFAULT_GLITCH_INTENSITY, value_name = "P")]
    pub glitch_intensity: f32,

    /// Glitch block size in pixels
    #[arg(long = "glitch-block-size", default_value_t = DEFAULT_GLITCH_BLOCK_SIZE, value_name = "PX")]
    pub glitch_block_size: u32,

    /// Posterize levels per channel (2-256)
    #[arg(long = "posterize-levels", default_value_t = DEFAULT_POSTERIZE_LEVELS, value_name = "N")]
    pub posterize_levels: u32,

    /// Mosaic tile size in pixels
    #[arg(long = "mosaic-size", default_value_t = DEFAULT_MOSAIC_TILE_SIZE, value_name = "PX")]
    pub mosaic_size: u32,

    /// Chromatic aberration offset in pixels (may be negative)
    #[arg(
        long = "chromatic-offset",
        default_value_t = DEFAULT_CHROMATIC_OFFSET,
        allow_negative_numbers = true,
        value_name = "PX"
    )]
    pub chromatic_offset: i32,

    /// Contrast (-100 to 100)
    #[arg(long = "contrast", default_value = "0", allow_negative_numbers = true)]
    pub contrast: f32,

    /// Midtone gamma shift (-100 to 100)
    #[arg(long = "midtones", default_value = "0", allow_negative_numbers = true)]
    pub midtones: f32,

    /// Highlight lift (-100 to 100)
    #[arg(long = "highlights", default_value = "0", allow_negative_numbers = true)]
    pub highlights: f32,

    /// Output scale factor (0.1-10), nearest-neighbor
    #[arg(short = 's', long = "scale", default_value = "1.0", value_name = "FACTOR")]
    pub scale: f32,

    /// Do not optimize animated outputs
    #[arg(long = "no-optimize")]
    pub no_optimize: bool,

    /// Frame-rate ceiling for animations (0 disables)
    #[arg(long = "target-fps", default_value = "30", value_name = "FPS")]
    pub target_fps: f32,

    /// Color budget for animation quantization (256 disables)
    #[arg(long = "max-colors", default_value = "256", value_name = "N")]
    pub max_colors: u32,

    /// Keep consecutive duplicate frames
    #[arg(long = "keep-duplicates")]
    pub keep_duplicates: bool,

    /// Never quantize animation colors
    #[arg(long = "no-reduce-colors")]
    pub no_reduce_colors: bool,

    /// Seed for glitch and jitter randomness (reproducible output)
    #[arg(long = "seed", value_name = "N")]
    pub seed: Option<u64>,

    /// Output format for still images: png, jpg, webp, tiff (animations are always GIF)
    #[arg(short = 'f', long = "output-format", default_value = "png")]
    pub output_format: String,

    /// Comma-separated list of image extensions to process
    #[arg(long = "extensions", default_value = DEFAULT_EXTENSIONS)]
    pub extensions_str: String,

    /// Generate processing report table at the end
    #[arg(long = "report")]
    pub report: bool,

    /// Number of parallel processing jobs (0 = auto-detect CPU cores)
    #[arg(short = 'j', long = "jobs", default_value = "0", value_name = "N")]
    pub jobs: usize,

    /// Enable verbose output with detailed progress information
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Emit progress as JSON lines on stdout instead of progress bars
    #[arg(long = "json-progress")]
    pub json_progress: bool,

    /// List what would be processed without writing files
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Ids of the arguments whose value came from the command line, for
    /// config precedence.
    #[arg(skip)]
    pub explicit_args: Vec<String>,
}

impl Args {
    /// Parse from the process arguments and remember which arguments were
    /// given on the command line.
    pub fn parse_with_sources() -> Self {
        let matches = Self::command().get_matches();
        Self::from_matches_with_sources(&matches).unwrap_or_else(|e| e.exit())
    }

    pub fn try_parse_with_sources_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(itr)?;
        Self::from_matches_with_sources(&matches)
    }

    fn from_matches_with_sources(matches: &ArgMatches) -> Result<Self, clap::Error> {
        let mut args = Self::from_arg_matches(matches)?;
        args.explicit_args = matches
            .ids()
            .filter(|id| matches.value_source(id.as_str()) == Some(ValueSource::CommandLine))
            .map(|id| id.as_str().to_string())
            .collect();
        Ok(args)
    }

    /// True if any of the argument ids in `ids` was passed on the command line.
    pub fn was_given(&self, ids: &[&str]) -> bool {
        self.explicit_args
            .iter()
            .any(|given| ids.contains(&given.as_str()))
    }

    /// Parse the extensions string into a vector
    pub fn parse_extensions(&self) -> Vec<String> {
        self.extensions_str
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn parse_palette(&self) -> Result<Palette, String> {
        let colors: Vec<&str> = self
            .palette
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        Palette::from_hex(&colors).map_err(|e| format!("Invalid palette '{}': {}", self.palette, e))
    }

    /// Normalized still-image output extension.
    pub fn parse_output_format(&self) -> Result<String, String> {
        let format = self.output_format.trim().to_lowercase();
        let format = if format == "jpeg" { "jpg".to_string() } else { format };
        if OUTPUT_FORMATS.contains(&format.as_str()) {
            Ok(format)
        } else {
            Err(format!(
                "Invalid output format '{}'. Valid formats: {}",
                self.output_format,
                OUTPUT_FORMATS.join(", ")
            ))
        }
    }

    pub fn dither_method(&self) -> DitherMethod {
        DitherMethod::from_name_or_default(&self.dithering_method)
    }

    pub fn dithering_options(&self) -> Result<Option<DitheringOptions>, String> {
        if self.no_dither {
            return Ok(None);
        }
        Ok(Some(DitheringOptions {
            method: self.dither_method(),
            palette: self.parse_palette()?,
            bayer_size: BayerSize::from(self.bayer_size),
            jitter_amount: self.jitter_amount,
            threshold: self.threshold,
        }))
    }

    /// Effect chain in command-line order. Unknown names become
    /// [`Effect::Unknown`] and pass the image through.
    pub fn effect_chain(&self) -> Vec<Effect> {
        self.effects
            .iter()
            .map(|name| match Effect::from_name(name) {
                Some(Effect::Glitch { .. }) => Effect::Glitch {
                    intensity: self.glitch_intensity,
                    block_size: self.glitch_block_size,
                },
                Some(Effect::Posterize { .. }) => Effect::Posterize {
                    levels: self.posterize_levels,
                },
                Some(Effect::Mosaic { .. }) => Effect::Mosaic {
                    tile_size: self.mosaic_size,
                },
                Some(Effect::Chromatic { .. }) => Effect::Chromatic {
                    offset: self.chromatic_offset,
                },
                Some(effect) => effect,
                None => Effect::Unknown,
            })
            .collect()
    }

    pub fn tone_settings(&self) -> ToneSettings {
        ToneSettings {
            contrast: self.contrast,
            midtones: self.midtones,
            highlights: self.highlights,
            scale: self.scale,
        }
    }

    pub fn optimization_options(&self) -> Option<OptimizationOptions> {
        if self.no_optimize {
            return None;
        }
        Some(OptimizationOptions {
            target_fps: self.target_fps,
            max_colors: self.max_colors,
            skip_duplicate_frames: !self.keep_duplicates,
            reduce_colors: !self.no_reduce_colors,
        })
    }

    /// Selectors that will be replaced by a fallback, as user-facing warnings.
    pub fn unsupported_selectors(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.no_dither && DitherMethod::from_name(&self.dithering_method).is_none() {
            warnings.push(format!(
                "Unknown dithering method '{}', using {}",
                self.dithering_method,
                DitherMethod::default()
            ));
        }
        for name in &self.effects {
            if Effect::from_name(name).is_none() {
                warnings.push(format!("Unknown effect '{}' will be skipped", name));
            }
        }
        if !matches!(self.bayer_size, 2 | 4 | 8) {
            warnings.push(format!(
                "Bayer size {} is not 2, 4 or 8, using {}",
                self.bayer_size,
                BayerSize::from(self.bayer_size).side()
            ));
        }
        warnings
    }
}


// Default implementation for tests
#[cfg(test)]
impl Default for Args {
    fn default() -> Self {
        Self {
            input_paths: vec![],
            output_dir: PathBuf::from("."),
            config_file: None,
            dithering_method: "floyd-steinberg".to_string(),
            no_dither: false,
            palette: DEFAULT_PALETTE.to_string(),
            bayer_size: 4,
            jitter_amount: 0.5,
            threshold: 128.0,
            effects: vec![],
            glitch_intensity: DEFAULT_GLITCH_INTENSITY,
            glitch_block_size: DEFAULT_GLITCH_BLOCK_SIZE,
            posterize_levels: DEFAULT_POSTERIZE_LEVELS,
            mosaic_size: DEFAULT_MOSAIC_TILE_SIZE,
            chromatic_offset: DEFAULT_CHROMATIC_OFFSET,
            contrast: 0.0,
            midtones: 0.0,
            highlights: 0.0,
            scale: 1.0,
            no_optimize: false,
            target_fps: 30.0,
            max_colors: 256,
            keep_duplicates: false,
            no_reduce_colors: false,
            seed: None,
            output_format: "png".to_string(),
            extensions_str: DEFAULT_EXTENSIONS.to_string(),
            report: false,
            jobs: 0,
            verbose: false,
            json_progress: false,
            dry_run: false,
            explicit_args: vec![],
        }
    }
}
