//! Point-in-time statistical views over sampled values

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Read-only statistics over a sample set; every call recomputes
pub trait Snapshot: Send + Sync + Debug {
    /// Value at `quantile` in `[0, 1]`
    fn value(&self, quantile: f64) -> f64;

    /// The stored samples (empty for samplers that do not keep them)
    fn values(&self) -> Vec<f64>;

    fn size(&self) -> usize;
    fn min(&self) -> f64;
    fn max(&self) -> f64;
    fn mean(&self) -> f64;
    fn std_dev(&self) -> f64;

    fn median(&self) -> f64 {
        self.value(0.5)
    }

    fn p75(&self) -> f64 {
        self.value(0.75)
    }

    fn p95(&self) -> f64 {
        self.value(0.95)
    }

    fn p98(&self) -> f64 {
        self.value(0.98)
    }

    fn p99(&self) -> f64 {
        self.value(0.99)
    }

    fn p999(&self) -> f64 {
        self.value(0.999)
    }
}

/// Serializable form of a snapshot: just its samples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedSnapshot {
    #[serde(with = "crate::json_float::vec")]
    pub values: Vec<f64>,
}

/// Snapshot over an explicit, sorted copy of the samples
#[derive(Debug, Clone, Default)]
pub struct SimpleSnapshot {
    values: Vec<f64>,
}

impl SimpleSnapshot {
    pub fn new(mut values: Vec<f64>) -> Self {
        values.sort_by(|a, b| a.total_cmp(b));
        Self { values }
    }
}

impl From<&SerializedSnapshot> for SimpleSnapshot {
    fn from(serialized: &SerializedSnapshot) -> Self {
        Self::new(serialized.values.clone())
    }
}

impl Snapshot for SimpleSnapshot {
    fn value(&self, quantile: f64) -> f64 {
        let n = self.values.len();
        if n == 0 || quantile.is_nan() {
            return 0.0;
        }
        let quantile = quantile.clamp(0.0, 1.0);
        let pos = quantile * (n as f64 + 1.0);
        let index = pos.floor() as usize;

        if index < 1 {
            return self.values[0];
        }
        if index >= n {
            return self.values[n - 1];
        }

        let lower = self.values[index - 1];
        let upper = self.values[index];
        lower + (pos - pos.floor()) * (upper - lower)
    }

    fn values(&self) -> Vec<f64> {
        self.values.clone()
    }

    fn size(&self) -> usize {
        self.values.len()
    }

    fn min(&self) -> f64 {
        self.values.first().copied().unwrap_or(0.0)
    }

    fn max(&self) -> f64 {
        self.values.last().copied().unwrap_or(0.0)
    }

    fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    fn std_dev(&self) -> f64 {
        let n = self.values.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq: f64 = self.values.iter().map(|v| (v - mean).powi(2)).sum();
        (sum_sq / (n as f64 - 1.0)).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = SimpleSnapshot::new(Vec::new());
        assert_eq!(snapshot.min(), 0.0);
        assert_eq!(snapshot.max(), 0.0);
        assert_eq!(snapshot.mean(), 0.0);
        assert_eq!(snapshot.std_dev(), 0.0);
        assert_eq!(snapshot.median(), 0.0);
    }

    #[test]
    fn test_statistics() {
        let snapshot = SimpleSnapshot::new(vec![5.0, 1.0, 4.0, 2.0, 3.0]);
        assert_eq!(snapshot.values(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(snapshot.min(), 1.0);
        assert_eq!(snapshot.max(), 5.0);
        assert_eq!(snapshot.mean(), 3.0);
        assert_eq!(snapshot.median(), 3.0);
        assert!((snapshot.std_dev() - 2.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_interpolation() {
        let snapshot = SimpleSnapshot::new(vec![1.0, 2.0, 3.0, 4.0]);
        // position 0.75 * 5 = 3.75 → between the 3rd and 4th value
        assert!((snapshot.p75() - 3.75).abs() < 1e-12);
        assert_eq!(snapshot.p99(), 4.0);
        assert_eq!(snapshot.value(0.0), 1.0);
    }

    #[test]
    fn test_from_serialized() {
        let serialized = SerializedSnapshot {
            values: vec![3.0, 1.0],
        };
        let snapshot = SimpleSnapshot::from(&serialized);
        assert_eq!(snapshot.min(), 1.0);
        assert_eq!(snapshot.size(), 2);
    }
}
