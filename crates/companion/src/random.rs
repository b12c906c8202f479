//! Injectable randomness for line and spark selection.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

/// Source of uniform indices.
pub trait RandomSource: Send + Sync {
    /// Return an index in `0..len`. `len` is never zero.
    fn pick_index(&self, len: usize) -> usize;
}

/// Thread-local RNG from `rand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick_index(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Replays a fixed sequence of indices, cycling when exhausted.
///
/// Each value is reduced modulo the requested length.
#[derive(Debug, Default)]
pub struct SequenceRandom {
    values: Vec<usize>,
    cursor: AtomicUsize,
}

impl SequenceRandom {
    pub fn new(values: impl Into<Vec<usize>>) -> Self {
        Self {
            values: values.into(),
            cursor: AtomicUsize::new(0),
        }
    }
}

impl RandomSource for SequenceRandom {
    fn pick_index(&self, len: usize) -> usize {
        if self.values.is_empty() {
            return 0;
        }
        let position = self.cursor.fetch_add(1, Ordering::Relaxed) % self.values.len();
        self.values[position] % len
    }
}

/// Pick one element uniformly, `None` for an empty slice.
pub fn choose<'a, T>(random: &dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(random.pick_index(items.len()))
}
