//! RGBA pixel storage shared by every stage of the pipeline.

use super::error::{ProcessingError, Result};

/// Bytes per pixel (R, G, B, A).
pub const CHANNELS: usize = 4;

/// Byte offset of pixel `(x, y)` in a row-major RGBA buffer of the given width.
#[inline]
pub fn index_of(x: u32, y: u32, width: u32) -> usize {
    (y as usize * width as usize + x as usize) * CHANNELS
}

/// Clamp a value into `[lo, hi]`.
#[inline]
pub fn clamp(value: f32, lo: f32, hi: f32) -> f32 {
    value.max(lo).min(hi)
}

/// Clamp into the channel range and round to the nearest byte.
///
/// NaN maps to 0.
#[inline]
pub fn clamp_channel(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    clamp(value, 0.0, 255.0).round() as u8
}

/// Luma of an RGB triple using the Rec. 601 weights.
#[inline]
pub fn grayscale(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

/// An owned RGBA8 image.
///
/// The data length always equals `width * height * 4`. Every write goes
/// through [`clamp_channel`] or takes bytes directly, so channel values can
/// never leave `[0, 255]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a transparent black buffer. Both dimensions must be positive.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::filled(width, height, [0, 0, 0, 0])
    }

    /// Create a buffer where every pixel has the same RGBA value.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ProcessingError::InvalidDimension {
                width,
                height,
                len: 0,
            });
        }
        let pixel_count = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixel_count * CHANNELS);
        for _ in 0..pixel_count {
            data.extend_from_slice(&rgba);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap raw interleaved RGBA bytes.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(ProcessingError::InvalidDimension {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap raw interleaved RGB bytes; alpha defaults to 255.
    pub fn from_rgb(width: u32, height: u32, rgb: &[u8]) -> Result<Self> {
        let pixel_count = width as usize * height as usize;
        if width == 0 || height == 0 || rgb.len() != pixel_count * 3 {
            return Err(ProcessingError::InvalidDimension {
                width,
                height,
                len: rgb.len(),
            });
        }
        let mut data = Vec::with_capacity(pixel_count * CHANNELS);
        for px in rgb.chunks_exact(3) {
            data.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Read the RGBA value at `(x, y)`. Coordinates must be in bounds.
    #[inline]
    pub fn read_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = index_of(x, y, self.width);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Write exact byte values at `(x, y)`.
    #[inline]
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = index_of(x, y, self.width);
        self.data[i..i + CHANNELS].copy_from_slice(&rgba);
    }

    /// Write fractional RGB values at `(x, y)`, clamped and rounded, with the
    /// given alpha.
    #[inline]
    pub fn write_pixel(&mut self, x: u32, y: u32, rgb: [f32; 3], alpha: u8) {
        self.put_pixel(
            x,
            y,
            [
                clamp_channel(rgb[0]),
                clamp_channel(rgb[1]),
                clamp_channel(rgb[2]),
                alpha,
            ],
        );
    }

    /// Iterate over pixels as RGBA slices in raster order.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(CHANNELS)
    }

    /// Mutable counterpart of [`pixels`](Self::pixels).
    pub fn pixels_mut(&mut self) -> impl Iterator<Item = &mut [u8]> {
        self.data.chunks_exact_mut(CHANNELS)
    }
}

/// One frame of an animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub buffer: PixelBuffer,
    /// Display time in milliseconds.
    pub delay_ms: u32,
    /// Disposal hint, passed through untouched for the encoder.
    pub disposal: Option<u8>,
}

impl Frame {
    pub fn new(buffer: PixelBuffer, delay_ms: u32) -> Self {
        Self {
            buffer,
            delay_ms,
            disposal: None,
        }
    }

    pub fn with_disposal(mut self, disposal: u8) -> Self {
        self.disposal = Some(disposal);
        self
    }
}

/// A non-empty list of same-sized frames plus a loop count (0 = forever).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimatedSequence {
    frames: Vec<Frame>,
    width: u32,
    height: u32,
    loop_count: u16,
}

impl AnimatedSequence {
    /// Build a sequence, checking that every frame shares the first frame's size.
    pub fn new(frames: Vec<Frame>, loop_count: u16) -> Result<Self> {
        let first = frames.first().ok_or(ProcessingError::EmptySequence)?;
        let expected = first.buffer.dimensions();

        for (index, frame) in frames.iter().enumerate() {
            let found = frame.buffer.dimensions();
            if found != expected {
                return Err(ProcessingError::FrameSizeMismatch {
                    index,
                    expected,
                    found,
                });
            }
        }

        Ok(Self {
            frames,
            width: expected.0,
            height: expected.1,
            loop_count,
        })
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn loop_count(&self) -> u16 {
        self.loop_count
    }

    /// Sum of all frame delays in milliseconds.
    pub fn total_duration_ms(&self) -> u64 {
        self.frames.iter().map(|f| f.delay_ms as u64).sum()
    }
}
