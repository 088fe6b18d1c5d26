//! JSON output for front-end integration
//!
//! When --json-progress flag is enabled, all progress and status information
//! is emitted as JSON lines to stdout, suppressing all other output.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Last progress emission timestamp (milliseconds since epoch)
/// Used for throttling progress updates to ~25 FPS (40ms between updates)
static LAST_PROGRESS_MS: AtomicU64 = AtomicU64::new(0);

const PROGRESS_INTERVAL_MS: u64 = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage {
    /// Progress update over input files
    Progress {
        current: usize,
        total: usize,
        message: String,
    },
    /// Fractional progress through the frames of one animation
    FrameProgress { input_path: String, fraction: f64 },
    /// A selector or parameter was replaced by its fallback
    Warning { message: String },
    /// File processing completed
    FileCompleted {
        input_path: String,
        output_path: String,
        frames_in: usize,
        frames_out: usize,
        processing_time_ms: u128,
    },
    /// File processing failed
    FileFailed { input_path: String, error: String },
    /// Processing summary
    Summary {
        total_files: usize,
        processed: usize,
        failed: usize,
        duration_secs: f64,
    },
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Claim the next progress slot if at least 40ms passed since the last one.
fn throttle_allows(now: u64) -> bool {
    let last = LAST_PROGRESS_MS.load(Ordering::Relaxed);
    now.saturating_sub(last) >= PROGRESS_INTERVAL_MS
        && LAST_PROGRESS_MS
            .compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
}

impl JsonMessage {
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    /// Emit JSON message to stdout
    pub fn emit(&self) {
        if let Some(json) = self.to_json() {
            println!("{}", json);
        }
    }

    /// Create and emit progress message (throttled to ~25 FPS)
    ///
    /// The final progress (current == total) is always emitted.
    pub fn progress(current: usize, total: usize, message: impl Into<String>) {
        if current == total || throttle_allows(now_ms()) {
            Self::Progress {
                current,
                total,
                message: message.into(),
            }
            .emit();
        }
    }

    /// Throttled like [`progress`](Self::progress); completion always emits.
    pub fn frame_progress(input_path: &Path, fraction: f64) {
        if fraction >= 1.0 || throttle_allows(now_ms()) {
            Self::FrameProgress {
                input_path: input_path.display().to_string(),
                fraction,
            }
            .emit();
        }
    }

    pub fn warning(message: impl Into<String>) {
        Self::Warning {
            message: message.into(),
        }
        .emit();
    }

    /// Create and emit file completed message
    pub fn file_completed(
        input_path: &Path,
        output_path: &Path,
        frames: (usize, usize),
        processing_time_ms: u128,
    ) {
        Self::FileCompleted {
            input_path: input_path.display().to_string(),
            output_path: output_path.display().to_string(),
            frames_in: frames.0,
            frames_out: frames.1,
            processing_time_ms,
        }
        .emit();
    }

    /// Create and emit file failed message
    pub fn file_failed(input_path: &Path, error: impl Into<String>) {
        Self::FileFailed {
            input_path: input_path.display().to_string(),
            error: error.into(),
        }
        .emit();
    }

    /// Create and emit summary message
    pub fn summary(total_files: usize, processed: usize, failed: usize, duration_secs: f64) {
        Self::Summary {
            total_files,
            processed,
            failed,
            duration_secs,
        }
        .emit();
    }
}
