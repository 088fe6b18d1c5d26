// Library exports for reuse by front ends and other applications
pub mod cli;
pub mod config_file;
pub mod image_processing;
pub mod json_output;
pub mod utils;

// Re-export commonly used types
pub use image_processing::{
    process_frame, scale, AnimatedSequence, BayerSize, DitherMethod, DitheringOptions, Effect,
    Frame, GenerationTracker, Generational, OptimizationOptions, OptimizationStats, OutputKind,
    Palette, PixelBuffer, ProcessingConfig, ProcessingEngine, ProcessingError, ProcessingOptions,
    ProcessingResult, ToneSettings,
};
pub use json_output::JsonMessage;
