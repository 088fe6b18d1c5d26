use crate::cli::Args;
use crate::image_processing::options::{
    DitheringOptions, OptimizationOptions, ProcessingOptions, ToneSettings,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A saved preset: pipeline options plus a few run settings.
///
/// Every field is optional; whatever is missing keeps the command-line value.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ConfigFile {
    pub name: Option<String>,
    pub input_path: Option<String>,
    pub output_path: Option<String>,
    pub extensions: Option<String>,
    pub output_format: Option<String>,
    pub jobs: Option<usize>,
    pub seed: Option<u64>,
    pub report: Option<bool>,
    /// `false` disables animation optimization.
    pub optimize: Option<bool>,
    pub processing: Option<ProcessingOptions>,
    pub optimization: Option<OptimizationOptions>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json).with_context(|| format!("Failed to write config file: {:?}", path))
    }
}

const DITHERING_ARGS: [&str; 6] = [
    "dithering_method",
    "palette",
    "bayer_size",
    "jitter_amount",
    "threshold",
    "no_dither",
];

const EFFECT_ARGS: [&str; 6] = [
    "effects",
    "glitch_intensity",
    "glitch_block_size",
    "posterize_levels",
    "mosaic_size",
    "chromatic_offset",
];

impl Args {
    /// Load the configuration file (if any) and merge its run settings into
    /// the arguments. Command-line arguments take precedence over config
    /// file values. The loaded file is returned for option resolution.
    pub fn load_and_merge_config(&mut self) -> Result<Option<ConfigFile>> {
        let Some(config_path) = self.config_file.clone() else {
            return Ok(None);
        };

        let config = ConfigFile::load(&config_path)?;
        self.merge_from_config(&config);

        if self.verbose && !self.json_progress {
            eprintln!("Loaded configuration from: {:?}", config_path);
        }
        Ok(Some(config))
    }

    fn merge_from_config(&mut self, config: &ConfigFile) {
        if !self.was_given(&["input_paths"]) {
            if let Some(input) = &config.input_path {
                self.input_paths = vec![PathBuf::from(input)];
            }
        }

        if !self.was_given(&["output_dir"]) {
            if let Some(output) = &config.output_path {
                self.output_dir = PathBuf::from(output);
            }
        }

        if !self.was_given(&["extensions_str"]) {
            if let Some(ext) = &config.extensions {
                self.extensions_str = ext.clone();
            }
        }

        if !self.was_given(&["output_format"]) {
            if let Some(format) = &config.output_format {
                self.output_format = format.clone();
            }
        }

        if !self.was_given(&["jobs"]) {
            if let Some(jobs) = config.jobs {
                self.jobs = jobs;
            }
        }

        if self.seed.is_none() {
            self.seed = config.seed;
        }

        if !self.report {
            self.report = config.report.unwrap_or(false);
        }

        if !self.no_optimize && config.optimize == Some(false) {
            self.no_optimize = true;
        }
    }

    /// Pipeline options: the config preset as the base, with every explicitly
    /// passed flag overriding its field.
    pub fn resolve_processing_options(
        &self,
        config: Option<&ConfigFile>,
    ) -> Result<ProcessingOptions> {
        let Some(base) = config.and_then(|c| c.processing.clone()) else {
            return Ok(ProcessingOptions {
                tone: self.tone_settings(),
                effects: self.effect_chain(),
                dithering: self.dithering_options().map_err(anyhow::Error::msg)?,
            });
        };

        let tone = ToneSettings {
            contrast: self.pick(&["contrast"], self.contrast, base.tone.contrast),
            midtones: self.pick(&["midtones"], self.midtones, base.tone.midtones),
            highlights: self.pick(&["highlights"], self.highlights, base.tone.highlights),
            scale: self.pick(&["scale"], self.scale, base.tone.scale),
        };

        let effects = if self.was_given(&EFFECT_ARGS) {
            self.effect_chain()
        } else {
            base.effects
        };

        let dithering = if self.no_dither {
            None
        } else if self.was_given(&DITHERING_ARGS) {
            let from_base = base.dithering.unwrap_or_default();
            Some(DitheringOptions {
                method: self.pick(&["dithering_method"], self.dither_method(), from_base.method),
                palette: if self.was_given(&["palette"]) {
                    self.parse_palette().map_err(anyhow::Error::msg)?
                } else {
                    from_base.palette
                },
                bayer_size: self.pick(
                    &["bayer_size"],
                    self.bayer_size.into(),
                    from_base.bayer_size,
                ),
                jitter_amount: self.pick(&["jitter_amount"], self.jitter_amount, from_base.jitter_amount),
                threshold: self.pick(&["threshold"], self.threshold, from_base.threshold),
            })
        } else {
            base.dithering
        };

        Ok(ProcessingOptions {
            tone,
            effects,
            dithering,
        })
    }

    /// Optimizer options, or `None` when optimization is disabled.
    pub fn resolve_optimization_options(
        &self,
        config: Option<&ConfigFile>,
    ) -> Option<OptimizationOptions> {
        if self.no_optimize {
            return None;
        }
        let Some(base) = config.and_then(|c| c.optimization) else {
            return self.optimization_options();
        };

        Some(OptimizationOptions {
            target_fps: self.pick(&["target_fps"], self.target_fps, base.target_fps),
            max_colors: self.pick(&["max_colors"], self.max_colors, base.max_colors),
            skip_duplicate_frames: if self.keep_duplicates {
                false
            } else {
                base.skip_duplicate_frames
            },
            reduce_colors: if self.no_reduce_colors {
                false
            } else {
                base.reduce_colors
            },
        })
    }

    fn pick<T>(&self, ids: &[&str], cli_value: T, config_value: T) -> T {
        if self.was_given(ids) {
            cli_value
        } else {
            config_value
        }
    }
}
