//! Threshold Resolution
//!
//! Turns the caller's threshold choice into the working decision level:
//!
//! - **Manual**: caller-supplied level, range-checked
//! - **Auto**: band noise floor plus a range-checked margin

use super::noise::NoiseFloorEstimator;
use crate::config::ThresholdConfig;
use crate::error::{Result, SpecmonError};
use crate::sweep::Band;
use serde::{Deserialize, Serialize};

/// How the decision threshold is chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ThresholdMode {
    /// Fixed level in dBµV/m
    Manual { threshold: f64 },
    /// Noise floor plus `margin_db`
    Auto { margin_db: f64 },
}

impl ThresholdMode {
    pub fn is_auto(&self) -> bool {
        matches!(self, ThresholdMode::Auto { .. })
    }
}

/// Outcome of threshold resolution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedThreshold {
    pub noise_floor: f64,
    pub threshold: f64,
    pub mode: ThresholdMode,
}

/// Auto-threshold preview: the derivation shown to the operator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoThreshold {
    pub noise_floor: f64,
    pub auto_threshold: f64,
    pub margin_db: f64,
}

/// Pure threshold resolver
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdResolver {
    limits: ThresholdConfig,
    estimator: NoiseFloorEstimator,
}

impl Default for ThresholdResolver {
    fn default() -> Self {
        Self::new(ThresholdConfig::default(), NoiseFloorEstimator::default())
    }
}

impl ThresholdResolver {
    pub fn new(limits: ThresholdConfig, estimator: NoiseFloorEstimator) -> Self {
        Self { limits, estimator }
    }

    pub fn estimator(&self) -> &NoiseFloorEstimator {
        &self.estimator
    }

    /// Resolve the working threshold for a band
    pub fn resolve(&self, band: &Band, mode: ThresholdMode) -> Result<ResolvedThreshold> {
        match mode {
            ThresholdMode::Manual { threshold } => {
                self.check_manual(threshold)?;
                Ok(ResolvedThreshold {
                    noise_floor: self.estimator.estimate_band(band),
                    threshold,
                    mode,
                })
            }
            ThresholdMode::Auto { margin_db } => {
                let auto = self.auto_threshold(band, margin_db)?;
                Ok(ResolvedThreshold {
                    noise_floor: auto.noise_floor,
                    threshold: auto.auto_threshold,
                    mode,
                })
            }
        }
    }

    /// Compute `noise_floor + margin_db` for a band
    pub fn auto_threshold(&self, band: &Band, margin_db: f64) -> Result<AutoThreshold> {
        self.check_margin(margin_db)?;
        let noise_floor = self.estimator.estimate_band(band);
        Ok(AutoThreshold {
            noise_floor,
            auto_threshold: noise_floor + margin_db,
            margin_db,
        })
    }

    fn check_manual(&self, threshold: f64) -> Result<()> {
        check_range(
            "manual threshold",
            threshold,
            self.limits.manual_min,
            self.limits.manual_max,
        )
    }

    fn check_margin(&self, margin_db: f64) -> Result<()> {
        check_range(
            "auto-threshold margin",
            margin_db,
            self.limits.margin_min,
            self.limits.margin_max,
        )
    }
}

fn check_range(what: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(SpecmonError::InvalidThreshold {
            what,
            value,
            min,
            max,
        })
    }
}
