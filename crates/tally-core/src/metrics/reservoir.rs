//! Bounded sample stores feeding percentile snapshots

use rand::Rng;
use std::fmt::Debug;

use super::snapshot::SimpleSnapshot;

/// Default capacity used by registries when no reservoir is supplied
pub const DEFAULT_RESERVOIR_SIZE: usize = 1024;

/// A bounded store of samples
pub trait Reservoir: Send + Sync + Debug {
    /// Number of retained samples
    fn size(&self) -> usize;

    /// Admit a sample
    fn update(&mut self, value: f64);

    /// Immutable view of the retained samples
    fn snapshot(&self) -> SimpleSnapshot;
}

/// Random replacement once full (approximately uniform sampling)
#[derive(Debug, Clone)]
pub struct DefaultReservoir {
    values: Vec<f64>,
    max_size: usize,
}

impl DefaultReservoir {
    pub fn new(max_size: usize) -> Self {
        Self {
            values: Vec::with_capacity(max_size.min(DEFAULT_RESERVOIR_SIZE)),
            max_size: max_size.max(1),
        }
    }
}

impl Reservoir for DefaultReservoir {
    fn size(&self) -> usize {
        self.values.len()
    }

    fn update(&mut self, value: f64) {
        if self.values.len() < self.max_size {
            self.values.push(value);
        } else {
            let index = rand::thread_rng().gen_range(0..self.values.len());
            self.values[index] = value;
        }
    }

    fn snapshot(&self) -> SimpleSnapshot {
        SimpleSnapshot::new(self.values.clone())
    }
}

/// Ring buffer keeping only the most recent `max_size` samples
#[derive(Debug, Clone)]
pub struct SlidingWindowReservoir {
    values: Vec<f64>,
    max_size: usize,
    index: usize,
}

impl SlidingWindowReservoir {
    pub fn new(max_size: usize) -> Self {
        Self {
            values: Vec::with_capacity(max_size.min(DEFAULT_RESERVOIR_SIZE)),
            max_size: max_size.max(1),
            index: 0,
        }
    }
}

impl Default for SlidingWindowReservoir {
    fn default() -> Self {
        Self::new(DEFAULT_RESERVOIR_SIZE)
    }
}

impl Reservoir for SlidingWindowReservoir {
    fn size(&self) -> usize {
        self.values.len()
    }

    fn update(&mut self, value: f64) {
        if self.values.len() < self.max_size {
            self.values.push(value);
        } else {
            let slot = self.index % self.values.len();
            self.values[slot] = value;
            self.index = self.index.wrapping_add(1);
        }
    }

    fn snapshot(&self) -> SimpleSnapshot {
        SimpleSnapshot::new(self.values.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::snapshot::Snapshot;

    #[test]
    fn test_sliding_window_evicts_oldest() {
        let mut reservoir = SlidingWindowReservoir::new(3);
        for value in [1.0, 2.0, 3.0, 4.0] {
            reservoir.update(value);
        }
        let snapshot = reservoir.snapshot();
        assert_eq!(reservoir.size(), 3);
        assert_eq!(snapshot.values(), vec![2.0, 3.0, 4.0]);
        assert_eq!(snapshot.max(), 4.0);
        assert_eq!(snapshot.min(), 2.0);
    }

    #[test]
    fn test_sliding_window_wraps_repeatedly() {
        let mut reservoir = SlidingWindowReservoir::new(2);
        for value in 1..=7 {
            reservoir.update(value as f64);
        }
        assert_eq!(reservoir.snapshot().values(), vec![6.0, 7.0]);
    }

    #[test]
    fn test_default_reservoir_is_bounded() {
        let mut reservoir = DefaultReservoir::new(10);
        for value in 0..1000 {
            reservoir.update(value as f64);
        }
        assert_eq!(reservoir.size(), 10);
        assert!(reservoir.snapshot().values().iter().all(|v| *v < 1000.0));
    }
}
