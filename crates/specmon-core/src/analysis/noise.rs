//! Noise Floor Estimation
//!
//! Robust floor estimate from a band's average field strengths: the median
//! of the quietest `percentile` fraction of channels. A handful of strong
//! occupied channels cannot move it, and using a median rather than the
//! minimum keeps a single low outlier from dragging it down.

use crate::config::NoiseFloorConfig;
use crate::sweep::Band;

/// Percentile-median noise floor estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseFloorEstimator {
    percentile: f64,
}

impl Default for NoiseFloorEstimator {
    fn default() -> Self {
        Self { percentile: 0.10 }
    }
}

impl NoiseFloorEstimator {
    /// Create an estimator; `percentile` is clamped into `(0, 1]`
    pub fn new(percentile: f64) -> Self {
        let percentile = if percentile.is_finite() && percentile > 0.0 {
            percentile.min(1.0)
        } else {
            Self::default().percentile
        };
        Self { percentile }
    }

    pub fn from_config(config: &NoiseFloorConfig) -> Self {
        Self::new(config.percentile)
    }

    pub fn percentile(&self) -> f64 {
        self.percentile
    }

    /// Estimate the floor of a set of field strengths.
    ///
    /// Empty input yields 0.0 and a single value is its own floor.
    pub fn estimate(&self, values: &[f64]) -> f64 {
        match values.len() {
            0 => 0.0,
            1 => values[0],
            n => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);

                let count = ((n as f64 * self.percentile + 1e-9).floor() as usize).clamp(1, n);
                median(&sorted[..count])
            }
        }
    }

    /// Estimate the floor of a band
    pub fn estimate_band(&self, band: &Band) -> f64 {
        self.estimate(&band.avg_strengths())
    }
}

/// Median of an ascending, non-empty slice
pub(crate) fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}
