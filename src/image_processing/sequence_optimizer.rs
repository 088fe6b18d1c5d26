//! Post-pipeline animation optimizer.
//!
//! Runs strictly in frame order after every frame has been processed:
//! duplicate elision, then frame-rate reduction, then uniform color
//! quantization. Each pass is optional.

use serde::Serialize;

use super::buffer::{AnimatedSequence, Frame};
use super::error::Result;
use super::options::OptimizationOptions;

/// What the optimizer did to one sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OptimizationStats {
    pub input_frames: usize,
    pub output_frames: usize,
    /// Frames folded into the preceding retained frame.
    pub duplicates_removed: usize,
    /// Frames absorbed into a frame-rate window (not counting the emitted one).
    pub frames_merged: usize,
    /// Frames of a final window that never reached the minimum delay.
    pub trailing_frames_dropped: usize,
    pub duration_before_ms: u64,
    pub duration_after_ms: u64,
    pub colors_quantized: bool,
}

impl OptimizationStats {
    pub fn frames_removed(&self) -> usize {
        self.input_frames.saturating_sub(self.output_frames)
    }
}

/// Cheap approximate frame fingerprint.
///
/// Samples every `max(1, len / 1000)`-th byte into a 32-bit rolling hash
/// (`hash * 31 + byte`, wrapping). Frames that differ only in unsampled bytes
/// collide.
pub fn frame_hash(data: &[u8]) -> i32 {
    let step = (data.len() / 1000).max(1);
    data.iter().step_by(step).fold(0i32, |hash, &byte| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(byte as i32)
    })
}

/// Drop frames whose hash equals the last retained frame's hash, adding
/// their delay to that retained frame.
pub fn remove_duplicate_frames(frames: Vec<Frame>) -> (Vec<Frame>, usize) {
    let mut result: Vec<Frame> = Vec::with_capacity(frames.len());
    let mut last_hash: Option<i32> = None;
    let mut removed = 0;

    for frame in frames {
        let hash = frame_hash(frame.buffer.as_raw());

        if last_hash == Some(hash) {
            if let Some(last) = result.last_mut() {
                last.delay_ms = last.delay_ms.saturating_add(frame.delay_ms);
            }
            removed += 1;
            continue;
        }

        last_hash = Some(hash);
        result.push(frame);
    }

    (result, removed)
}

/// Outcome of [`reduce_frame_rate`].
#[derive(Debug)]
pub struct FrameRateReduction {
    pub frames: Vec<Frame>,
    pub merged: usize,
    pub trailing_dropped: usize,
}

/// Collapse runs of short frames so no emitted frame is shorter than
/// `1000 / target_fps` ms.
///
/// Delays accumulate until they reach the minimum; the last frame of the
/// window is emitted carrying the whole accumulated delay. A final window
/// that never reaches the minimum is dropped, unless that would leave no
/// frames at all, in which case its last frame is kept.
pub fn reduce_frame_rate(frames: Vec<Frame>, target_fps: f32) -> FrameRateReduction {
    let input_len = frames.len();
    if !(target_fps > 0.0) {
        return FrameRateReduction {
            frames,
            merged: 0,
            trailing_dropped: 0,
        };
    }

    let min_delay = 1000.0 / target_fps as f64;
    let mut result = Vec::new();
    let mut accumulated: u32 = 0;
    let mut pending: Option<Frame> = None;
    let mut pending_count = 0usize;

    for frame in frames {
        accumulated = accumulated.saturating_add(frame.delay_ms);
        pending_count += 1;
        pending = Some(frame);

        if accumulated as f64 >= min_delay {
            if let Some(mut last) = pending.take() {
                last.delay_ms = accumulated;
                result.push(last);
            }
            accumulated = 0;
            pending_count = 0;
        }
    }

    let mut trailing_dropped = pending_count;
    if result.is_empty() {
        if let Some(mut last) = pending {
            last.delay_ms = accumulated;
            result.push(last);
            trailing_dropped = 0;
        }
    }

    let merged = input_len - result.len() - trailing_dropped;
    FrameRateReduction {
        frames: result,
        merged,
        trailing_dropped,
    }
}

/// Grid step for `max_colors`: `ceil(256 / cbrt(max_colors))`.
///
/// Perfect cubes (8, 27, 64, ...) snap to their exact integer root first.
pub fn quantization_factor(max_colors: u32) -> u32 {
    let mut cube_root = (max_colors.max(1) as f64).cbrt();
    if (cube_root - cube_root.round()).abs() < 1e-9 {
        cube_root = cube_root.round();
    }
    (256.0 / cube_root).ceil() as u32
}

/// Snap R, G and B of every frame to multiples of the grid step. Alpha is kept.
pub fn quantize_colors(frames: &mut [Frame], max_colors: u32) {
    let factor = quantization_factor(max_colors) as f32;

    let mut lut = [0u8; 256];
    for (value, entry) in lut.iter_mut().enumerate() {
        let snapped = (value as f32 / factor).round() * factor;
        *entry = snapped.min(255.0) as u8;
    }

    for frame in frames {
        for pixel in frame.buffer.pixels_mut() {
            pixel[0] = lut[pixel[0] as usize];
            pixel[1] = lut[pixel[1] as usize];
            pixel[2] = lut[pixel[2] as usize];
        }
    }
}

/// Run the enabled passes over a processed sequence.
///
/// Frame-rate reduction only runs for sequences of more than one frame, and
/// quantization only when `reduce_colors` is set and `max_colors < 256`.
pub fn optimize_sequence(
    sequence: AnimatedSequence,
    options: &OptimizationOptions,
) -> Result<(AnimatedSequence, OptimizationStats)> {
    let loop_count = sequence.loop_count();
    let mut stats = OptimizationStats {
        input_frames: sequence.len(),
        duration_before_ms: sequence.total_duration_ms(),
        ..Default::default()
    };

    let mut frames = sequence.into_frames();

    if options.skip_duplicate_frames {
        let (deduped, removed) = remove_duplicate_frames(frames);
        frames = deduped;
        stats.duplicates_removed = removed;
    }

    if options.target_fps > 0.0 && frames.len() > 1 {
        let reduction = reduce_frame_rate(frames, options.target_fps);
        frames = reduction.frames;
        stats.frames_merged = reduction.merged;
        stats.trailing_frames_dropped = reduction.trailing_dropped;
    }

    if options.reduce_colors && options.max_colors < 256 {
        quantize_colors(&mut frames, options.max_colors);
        stats.colors_quantized = true;
    }

    let optimized = AnimatedSequence::new(frames, loop_count)?;
    stats.output_frames = optimized.len();
    stats.duration_after_ms = optimized.total_duration_ms();

    Ok((optimized, stats))
}
