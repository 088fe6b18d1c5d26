use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Progress tracking for a parallel run over a known number of items
/// (input files or animation frames).
pub struct BatchProcessor {
    pub total_items: usize,
    pub processed_count: AtomicUsize,
    pub start_time: Instant,
}

impl BatchProcessor {
    pub fn new(total_items: usize) -> Self {
        Self {
            total_items,
            processed_count: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    /// Increment processed count and return current count
    pub fn increment(&self) -> usize {
        self.processed_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn processed(&self) -> usize {
        self.processed_count.load(Ordering::Relaxed)
    }

    /// Get current progress (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_items == 0 {
            1.0
        } else {
            (self.processed() as f64 / self.total_items as f64).min(1.0)
        }
    }

    /// Fraction for a given completed count, without touching the counter.
    pub fn fraction_of(&self, completed: usize) -> f64 {
        if self.total_items == 0 {
            1.0
        } else {
            (completed as f64 / self.total_items as f64).min(1.0)
        }
    }

    /// Get estimated time remaining
    pub fn eta(&self) -> Option<Duration> {
        let processed = self.processed();
        if processed == 0 {
            return None;
        }

        let remaining = self.total_items.saturating_sub(processed);
        if remaining == 0 {
            return Some(Duration::ZERO);
        }

        let time_per_item = self.start_time.elapsed().as_secs_f64() / processed as f64;
        Some(Duration::from_secs_f64(time_per_item * remaining as f64))
    }

    /// Get processing speed (items per second)
    pub fn items_per_second(&self) -> f64 {
        let processed = self.processed();
        if processed == 0 {
            return 0.0;
        }

        let elapsed_secs = self.start_time.elapsed().as_secs_f64();
        if elapsed_secs == 0.0 {
            return 0.0;
        }

        processed as f64 / elapsed_secs
    }
}
