//! Lag and trailing-window calculations
//!
//! All functions work on a column of optional values ordered by time, where
//! `None` marks an unknown observation. Every result at position `t` is built
//! from positions strictly before `t`:
//! - Lag: the value `offset` positions back
//! - Trailing mean: the mean of the known values among the previous `window`
//!   positions, defined as soon as one of them is known

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Bounded window over the most recent values of a column
///
/// Unknown values occupy a slot but do not count towards the mean.
#[derive(Debug, Clone)]
pub struct TrailingWindow {
    capacity: usize,
    values: VecDeque<Option<f64>>,
}

impl TrailingWindow {
    /// Create a new window holding at most `capacity` values
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MathError::InvalidInput(
                "Window size must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        })
    }

    /// Push a value, evicting the oldest one once the window is full
    pub fn push(&mut self, value: Option<f64>) {
        self.values.push_back(value);

        if self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    /// Mean of the known values in the window, `None` if there are none
    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .values
            .iter()
            .flatten()
            .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

        if count == 0 {
            None
        } else {
            Some(sum / count as f64)
        }
    }

    /// Number of slots currently filled, known or not
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no value has been pushed yet
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the window size
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reset the window, clearing all values
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

/// Value `offset` positions before `index`
///
/// `index` may equal `values.len()`, which addresses the row right after the
/// last known one.
pub fn lag_at(values: &[Option<f64>], index: usize, offset: usize) -> Result<Option<f64>> {
    if offset == 0 {
        return Err(MathError::InvalidInput(
            "Lag offset must be greater than zero".to_string(),
        ));
    }

    Ok(index
        .checked_sub(offset)
        .and_then(|source| values.get(source).copied().flatten()))
}

/// Lag column for every position of `values`
pub fn lag_series(values: &[Option<f64>], offset: usize) -> Result<Vec<Option<f64>>> {
    (0..values.len())
        .map(|index| lag_at(values, index, offset))
        .collect()
}

/// Mean of the known values in `[index - window, index - 1]`
pub fn trailing_mean_at(values: &[Option<f64>], index: usize, window: usize) -> Result<Option<f64>> {
    let mut trailing = TrailingWindow::new(window)?;
    let end = index.min(values.len());
    let start = end.saturating_sub(window);

    for value in &values[start..end] {
        trailing.push(*value);
    }

    Ok(trailing.mean())
}

/// Trailing mean column for every position of `values`
pub fn trailing_mean_series(values: &[Option<f64>], window: usize) -> Result<Vec<Option<f64>>> {
    let mut trailing = TrailingWindow::new(window)?;
    let mut means = Vec::with_capacity(values.len());

    for value in values {
        // Read before pushing so the current value never enters its own mean
        means.push(trailing.mean());
        trailing.push(*value);
    }

    Ok(means)
}
