//! Serializable configuration for the pipeline and the sequence optimizer.

use serde::{Deserialize, Serialize};

use super::palette::Palette;

/// Dithering algorithm selector.
///
/// Unknown names deserialize to [`DitherMethod::FloydSteinberg`]; see
/// [`DitherMethod::from_name_or_default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", from = "String")]
pub enum DitherMethod {
    /// Floyd-Steinberg error diffusion (7/16, 3/16, 5/16, 1/16)
    #[default]
    FloydSteinberg,
    /// Atkinson error diffusion, spreads only 6/8 of the error
    Atkinson,
    /// Sierra (three-row) error diffusion
    Sierra,
    /// Ordered dithering with a Bayer threshold matrix
    Ordered,
    /// Random per-pixel offset before palette matching
    Jitter,
    /// Hard black/white split on luma
    Threshold,
}

impl DitherMethod {
    pub const ALL: [DitherMethod; 6] = [
        DitherMethod::FloydSteinberg,
        DitherMethod::Atkinson,
        DitherMethod::Sierra,
        DitherMethod::Ordered,
        DitherMethod::Jitter,
        DitherMethod::Threshold,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DitherMethod::FloydSteinberg => "floyd-steinberg",
            DitherMethod::Atkinson => "atkinson",
            DitherMethod::Sierra => "sierra",
            DitherMethod::Ordered => "ordered",
            DitherMethod::Jitter => "jitter",
            DitherMethod::Threshold => "threshold",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "floyd-steinberg" | "floyd_steinberg" | "floydsteinberg" | "fs" => {
                Some(DitherMethod::FloydSteinberg)
            }
            "atkinson" => Some(DitherMethod::Atkinson),
            "sierra" => Some(DitherMethod::Sierra),
            "ordered" | "bayer" => Some(DitherMethod::Ordered),
            "jitter" => Some(DitherMethod::Jitter),
            "threshold" => Some(DitherMethod::Threshold),
            _ => None,
        }
    }

    /// Unsupported selectors fall back to Floyd-Steinberg.
    pub fn from_name_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_default()
    }

    /// True for methods that carry quantization error between pixels.
    pub fn is_error_diffusion(&self) -> bool {
        matches!(
            self,
            DitherMethod::FloydSteinberg | DitherMethod::Atkinson | DitherMethod::Sierra
        )
    }
}

impl From<String> for DitherMethod {
    fn from(value: String) -> Self {
        Self::from_name_or_default(&value)
    }
}

impl std::fmt::Display for DitherMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Side length of the Bayer threshold matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum BayerSize {
    Two,
    #[default]
    Four,
    Eight,
}

impl BayerSize {
    pub fn side(&self) -> u32 {
        match self {
            BayerSize::Two => 2,
            BayerSize::Four => 4,
            BayerSize::Eight => 8,
        }
    }
}

/// Sizes other than 2, 4 or 8 round up to the next supported size (capped at 8).
impl From<u32> for BayerSize {
    fn from(value: u32) -> Self {
        match value {
            0..=2 => BayerSize::Two,
            3..=4 => BayerSize::Four,
            _ => BayerSize::Eight,
        }
    }
}

impl From<BayerSize> for u32 {
    fn from(value: BayerSize) -> Self {
        value.side()
    }
}

fn default_jitter_amount() -> f32 {
    0.5
}

fn default_threshold() -> f32 {
    128.0
}

/// Dithering method, target palette and method-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DitheringOptions {
    #[serde(default)]
    pub method: DitherMethod,
    #[serde(default)]
    pub palette: Palette,
    #[serde(default)]
    pub bayer_size: BayerSize,
    #[serde(default = "default_jitter_amount")]
    pub jitter_amount: f32,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

impl DitheringOptions {
    pub fn new(method: DitherMethod, palette: Palette) -> Self {
        Self {
            method,
            palette,
            ..Default::default()
        }
    }
}

impl Default for DitheringOptions {
    fn default() -> Self {
        Self {
            method: DitherMethod::default(),
            palette: Palette::default(),
            bayer_size: BayerSize::default(),
            jitter_amount: default_jitter_amount(),
            threshold: default_threshold(),
        }
    }
}

pub const DEFAULT_GLITCH_INTENSITY: f32 = 0.5;
pub const DEFAULT_GLITCH_BLOCK_SIZE: u32 = 16;
pub const DEFAULT_POSTERIZE_LEVELS: u32 = 4;
pub const DEFAULT_MOSAIC_TILE_SIZE: u32 = 8;
pub const DEFAULT_CHROMATIC_OFFSET: i32 = 5;

fn default_glitch_intensity() -> f32 {
    DEFAULT_GLITCH_INTENSITY
}

fn default_glitch_block_size() -> u32 {
    DEFAULT_GLITCH_BLOCK_SIZE
}

fn default_posterize_levels() -> u32 {
    DEFAULT_POSTERIZE_LEVELS
}

fn default_mosaic_tile_size() -> u32 {
    DEFAULT_MOSAIC_TILE_SIZE
}

fn default_chromatic_offset() -> i32 {
    DEFAULT_CHROMATIC_OFFSET
}

/// One entry of the ordered effect chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Effect {
    Glitch {
        #[serde(default = "default_glitch_intensity")]
        intensity: f32,
        #[serde(default = "default_glitch_block_size")]
        block_size: u32,
    },
    Posterize {
        #[serde(default = "default_posterize_levels")]
        levels: u32,
    },
    Invert,
    Mosaic {
        #[serde(default = "default_mosaic_tile_size")]
        tile_size: u32,
    },
    Chromatic {
        #[serde(default = "default_chromatic_offset")]
        offset: i32,
    },
    /// Any unrecognized effect type; applying it returns the input unchanged.
    #[serde(other)]
    Unknown,
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Glitch { .. } => "glitch",
            Effect::Posterize { .. } => "posterize",
            Effect::Invert => "invert",
            Effect::Mosaic { .. } => "mosaic",
            Effect::Chromatic { .. } => "chromatic",
            Effect::Unknown => "unknown",
        }
    }

    /// Effect with default parameters, or `None` for an unrecognized name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "glitch" => Some(Effect::Glitch {
                intensity: DEFAULT_GLITCH_INTENSITY,
                block_size: DEFAULT_GLITCH_BLOCK_SIZE,
            }),
            "posterize" => Some(Effect::Posterize {
                levels: DEFAULT_POSTERIZE_LEVELS,
            }),
            "invert" => Some(Effect::Invert),
            "mosaic" => Some(Effect::Mosaic {
                tile_size: DEFAULT_MOSAIC_TILE_SIZE,
            }),
            "chromatic" | "chromatic-aberration" => Some(Effect::Chromatic {
                offset: DEFAULT_CHROMATIC_OFFSET,
            }),
            _ => None,
        }
    }

    /// Whether the effect draws random numbers.
    pub fn is_randomized(&self) -> bool {
        matches!(self, Effect::Glitch { .. })
    }
}

pub const TONE_RANGE: (f32, f32) = (-100.0, 100.0);
pub const SCALE_RANGE: (f32, f32) = (0.1, 10.0);

fn default_scale() -> f32 {
    1.0
}

/// Tone curves and output scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneSettings {
    #[serde(default)]
    pub contrast: f32,
    #[serde(default)]
    pub midtones: f32,
    #[serde(default)]
    pub highlights: f32,
    #[serde(default = "default_scale")]
    pub scale: f32,
}

impl ToneSettings {
    /// Copy with every field clamped into its valid range.
    pub fn clamped(&self) -> Self {
        let tone = |v: f32| {
            if v.is_nan() {
                0.0
            } else {
                v.clamp(TONE_RANGE.0, TONE_RANGE.1)
            }
        };
        let scale = if self.scale.is_nan() {
            1.0
        } else {
            self.scale.clamp(SCALE_RANGE.0, SCALE_RANGE.1)
        };
        Self {
            contrast: tone(self.contrast),
            midtones: tone(self.midtones),
            highlights: tone(self.highlights),
            scale,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.contrast == 0.0 && self.midtones == 0.0 && self.highlights == 0.0
    }
}

impl Default for ToneSettings {
    fn default() -> Self {
        Self {
            contrast: 0.0,
            midtones: 0.0,
            highlights: 0.0,
            scale: default_scale(),
        }
    }
}

/// Everything `process_frame` needs: scale/tone, then effects in order, then dithering.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessingOptions {
    #[serde(default)]
    pub tone: ToneSettings,
    #[serde(default)]
    pub effects: Vec<Effect>,
    /// `None` skips the dithering stage.
    #[serde(default)]
    pub dithering: Option<DitheringOptions>,
}

impl ProcessingOptions {
    /// True if any stage consumes random numbers.
    pub fn is_randomized(&self) -> bool {
        self.effects.iter().any(Effect::is_randomized)
            || matches!(
                self.dithering,
                Some(DitheringOptions {
                    method: DitherMethod::Jitter,
                    ..
                })
            )
    }

    /// Human-readable notes for every setting the pipeline will not use as
    /// given: unknown effects it skips and tone values it clamps.
    pub fn fallback_notes(&self) -> Vec<String> {
        let mut notes: Vec<String> = self
            .effects
            .iter()
            .enumerate()
            .filter(|(_, effect)| **effect == Effect::Unknown)
            .map(|(index, _)| format!("Skipping unknown effect at position {}", index + 1))
            .collect();

        let clamped = self.tone.clamped();
        if clamped != self.tone {
            notes.push(format!(
                "Tone clamped to contrast {} / midtones {} / highlights {} / scale {}",
                clamped.contrast, clamped.midtones, clamped.highlights, clamped.scale
            ));
        }
        notes
    }
}

fn default_target_fps() -> f32 {
    30.0
}

fn default_max_colors() -> u32 {
    256
}

fn default_true() -> bool {
    true
}

/// Settings for the post-pipeline sequence optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOptions {
    /// Frame-rate ceiling. Values `<= 0` disable frame-rate reduction.
    #[serde(default = "default_target_fps")]
    pub target_fps: f32,
    /// Color budget for the uniform-grid quantizer; 256 or more disables it.
    #[serde(default = "default_max_colors")]
    pub max_colors: u32,
    #[serde(default = "default_true")]
    pub skip_duplicate_frames: bool,
    #[serde(default = "default_true")]
    pub reduce_colors: bool,
}

impl Default for OptimizationOptions {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            max_colors: default_max_colors(),
            skip_duplicate_frames: true,
            reduce_colors: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_notes() {
        assert!(ProcessingOptions::default().fallback_notes().is_empty());

        let options = ProcessingOptions {
            tone: ToneSettings {
                contrast: 150.0,
                scale: 0.01,
                ..Default::default()
            },
            effects: vec![Effect::Invert, Effect::Unknown, Effect::Unknown],
            dithering: None,
        };
        assert_eq!(
            options.fallback_notes(),
            vec![
                "Skipping unknown effect at position 2".to_string(),
                "Skipping unknown effect at position 3".to_string(),
                "Tone clamped to contrast 100 / midtones 0 / highlights 0 / scale 0.1".to_string(),
            ]
        );
    }

    #[test]
    fn test_dither_method_names() {
        for method in DitherMethod::ALL {
            assert_eq!(DitherMethod::from_name(method.name()), Some(method));
        }
        assert_eq!(DitherMethod::from_name("Bayer"), Some(DitherMethod::Ordered));
        assert_eq!(DitherMethod::from_name("stucki"), None);
    }

    #[test]
    fn test_unknown_method_falls_back_to_floyd_steinberg() {
        assert_eq!(
            DitherMethod::from_name_or_default("riemersma"),
            DitherMethod::FloydSteinberg
        );
        let method: DitherMethod = serde_json::from_str(r#""riemersma""#).unwrap();
        assert_eq!(method, DitherMethod::FloydSteinberg);
        let method: DitherMethod = serde_json::from_str(r#""sierra""#).unwrap();
        assert_eq!(method, DitherMethod::Sierra);
        assert_eq!(
            serde_json::to_string(&DitherMethod::FloydSteinberg).unwrap(),
            r#""floyd-steinberg""#
        );
    }

    #[test]
    fn test_bayer_size_clamping() {
        assert_eq!(BayerSize::from(2), BayerSize::Two);
        assert_eq!(BayerSize::from(0), BayerSize::Two);
        assert_eq!(BayerSize::from(3), BayerSize::Four);
        assert_eq!(BayerSize::from(8), BayerSize::Eight);
        assert_eq!(BayerSize::from(64), BayerSize::Eight);
        assert_eq!(u32::from(BayerSize::Four), 4);
    }

    #[test]
    fn test_effect_deserialization() {
        let effects: Vec<Effect> = serde_json::from_str(
            r#"[
                {"type": "glitch", "intensity": 0.8},
                {"type": "posterize"},
                {"type": "invert"},
                {"type": "mosaic", "tile_size": 4},
                {"type": "chromatic", "offset": -3},
                {"type": "sepia"}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            effects,
            vec![
                Effect::Glitch {
                    intensity: 0.8,
                    block_size: 16
                },
                Effect::Posterize { levels: 4 },
                Effect::Invert,
                Effect::Mosaic { tile_size: 4 },
                Effect::Chromatic { offset: -3 },
                Effect::Unknown,
            ]
        );
    }

    #[test]
    fn test_tone_settings_clamped() {
        let tone = ToneSettings {
            contrast: 250.0,
            midtones: -180.0,
            highlights: f32::NAN,
            scale: 50.0,
        }
        .clamped();
        assert_eq!(tone.contrast, 100.0);
        assert_eq!(tone.midtones, -100.0);
        assert_eq!(tone.highlights, 0.0);
        assert_eq!(tone.scale, 10.0);
    }

    #[test]
    fn test_processing_options_defaults_from_empty_json() {
        let options: ProcessingOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.tone, ToneSettings::default());
        assert!(options.effects.is_empty());
        assert!(options.dithering.is_none());

        let optimization: OptimizationOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(optimization, OptimizationOptions::default());
    }

    #[test]
    fn test_is_randomized() {
        let mut options = ProcessingOptions::default();
        assert!(!options.is_randomized());
        options.dithering = Some(DitheringOptions::new(
            DitherMethod::Jitter,
            Palette::default(),
        ));
        assert!(options.is_randomized());
    }
}
