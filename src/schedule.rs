//! Cosine annealing between two values.
//!
//! ```text
//! value(t) = min + 0.5 * (max - min) * (1 + cos(t * π / total))
//! ```
//!
//! `value(0) = max` and `value(total) = min`. Epochs past `total` keep
//! following the cosine, which swings back towards `max`.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Value of the cosine schedule at epoch `current` of `total`.
///
/// A zero-length schedule returns `min_val`.
pub fn cosine_scheduler(current: usize, total: usize, min_val: f64, max_val: f64) -> f64 {
    if total == 0 {
        return min_val;
    }
    let phase = current as f64 * PI / total as f64;
    min_val + 0.5 * (max_val - min_val) * (1.0 + phase.cos())
}

/// Stateful cosine schedule that steps once per epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CosineSchedule {
    total: usize,
    min_val: f64,
    max_val: f64,
    current: usize,
}

impl CosineSchedule {
    pub fn new(total: usize, min_val: f64, max_val: f64) -> Self {
        Self {
            total,
            min_val,
            max_val,
            current: 0,
        }
    }

    /// Value at the current epoch.
    pub fn value(&self) -> f64 {
        cosine_scheduler(self.current, self.total, self.min_val, self.max_val)
    }

    /// Value at an arbitrary epoch.
    pub fn value_at(&self, epoch: usize) -> f64 {
        cosine_scheduler(epoch, self.total, self.min_val, self.max_val)
    }

    /// Advances one epoch and returns the new value.
    pub fn step(&mut self) -> f64 {
        self.current += 1;
        self.value()
    }

    pub fn current_epoch(&self) -> usize {
        self.current
    }

    pub fn total_epochs(&self) -> usize {
        self.total
    }

    pub fn reset(&mut self) {
        self.current = 0;
    }
}

impl Iterator for CosineSchedule {
    type Item = f64;

    /// Yields the values for epochs `0..=total`, then stops.
    fn next(&mut self) -> Option<f64> {
        if self.current > self.total {
            return None;
        }
        let value = self.value();
        self.current += 1;
        Some(value)
    }
}
