use thiserror::Error;

/// Errors raised by the pixel pipeline.
///
/// Only structural problems are fatal. Unknown dithering methods or effects and
/// out-of-range parameters are recovered locally (fallback or clamping) and
/// never surface here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    #[error("buffer of {len} bytes does not match {width}x{height} RGBA dimensions")]
    InvalidDimension { width: u32, height: u32, len: usize },

    #[error("palette must contain at least one color")]
    EmptyPalette,

    #[error("invalid palette color '{0}', expected #RRGGBB")]
    InvalidColor(String),

    #[error("animated sequence must contain at least one frame")]
    EmptySequence,

    #[error("frame {index} is {found:?}, expected {expected:?}")]
    FrameSizeMismatch {
        index: usize,
        expected: (u32, u32),
        found: (u32, u32),
    },
}

pub type Result<T> = std::result::Result<T, ProcessingError>;
