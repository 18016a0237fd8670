//! Priority frontier with decrease-key.

use std::cmp::Reverse;
use std::hash::Hash;

use priority_queue::PriorityQueue;

/// Sorting values are compared as fixed-point integers.
const COST_SCALE: f64 = 100.0;

/// Pops the key with the lowest sorting value; ties go to the key queued first.
pub struct Frontier<K: Hash + Eq> {
    queue: PriorityQueue<K, Reverse<(i64, u64)>>,
    sequence: u64,
}

impl<K: Hash + Eq> Default for Frontier<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq> Frontier<K> {
    pub fn new() -> Self {
        Self {
            queue: PriorityQueue::new(),
            sequence: 0,
        }
    }

    /// Queues `key`, or lowers its sorting value if it is queued already.
    /// Returns false if the queued value was not higher.
    pub fn push(&mut self, key: K, sorting_value: f64) -> bool {
        let scaled = (sorting_value * COST_SCALE).round() as i64;
        if let Some(Reverse((current, _))) = self.queue.get_priority(&key) {
            if *current <= scaled {
                return false;
            }
        }
        self.sequence += 1;
        self.queue.push(key, Reverse((scaled, self.sequence)));
        true
    }

    pub fn pop(&mut self) -> Option<(K, f64)> {
        self.queue
            .pop()
            .map(|(key, Reverse((scaled, _)))| (key, scaled as f64 / COST_SCALE))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
