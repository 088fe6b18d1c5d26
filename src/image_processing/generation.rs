//! Supersede-not-cancel bookkeeping for re-triggered processing runs.
//!
//! Every request gets a generation id from [`GenerationTracker::issue`].
//! Work is never interrupted; when a result comes back it is published only
//! if no newer request has been issued in the meantime.

use std::sync::atomic::{AtomicU64, Ordering};

/// A result tagged with the generation of the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generational<T> {
    pub generation: u64,
    pub value: T,
}

impl<T> Generational<T> {
    pub fn new(generation: u64, value: T) -> Self {
        Self { generation, value }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Generational<U> {
        Generational {
            generation: self.generation,
            value: f(self.value),
        }
    }
}

/// Monotonic generation counter shared between the requester and workers.
#[derive(Debug, Default)]
pub struct GenerationTracker {
    latest: AtomicU64,
}

impl GenerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new request. Ids begin at 1 and only ever grow.
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Most recently issued id (0 before the first request).
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.latest()
    }

    /// Unwrap a result if it still belongs to the newest request, otherwise
    /// drop it silently.
    pub fn accept<T>(&self, result: Generational<T>) -> Option<T> {
        if self.is_current(result.generation) {
            Some(result.value)
        } else {
            None
        }
    }
}
