//! Occupancy Analysis Module
//!
//! This module turns one band of a sweep into an occupancy verdict: which
//! channels carry a signal, who is licensed to be there, and what looks
//! wrong.
//!
//! ## Pipeline
//!
//! - **Noise Floor**: percentile-median of the quietest channels
//! - **Threshold**: manual level or noise floor plus margin
//! - **Occupancy**: inclusive `avg >= threshold` classification
//! - **License Matching**: closest registry record within tolerance
//! - **Anomalies**: unlicensed high power, out-of-band, strong signals
//! - **Result**: counts, ranked top signals and anomalies
//!
//! Peak detection, band statistics and sweep comparison sit alongside the
//! pipeline for operators who want more than the occupancy figure.
//!
//! ## Example
//!
//! ```rust,no_run
//! use specmon_core::analysis::{OccupancyAnalyzer, ThresholdMode};
//! use specmon_core::license::RegistrySnapshot;
//! use specmon_core::sweep::SweepParser;
//!
//! let text = std::fs::read_to_string("sweep.csv").unwrap();
//! let sweep = SweepParser::new().parse("sweep.csv", &text).unwrap();
//! let band = sweep.measurement.band(1).unwrap();
//!
//! let registry = RegistrySnapshot::default();
//! let analyzer = OccupancyAnalyzer::default();
//! let result = analyzer
//!     .analyze(band, ThresholdMode::Auto { margin_db: 10.0 }, &registry)
//!     .unwrap();
//! println!("{:.1}% occupied", result.occupancy_percentage);
//! ```

pub mod anomaly;
pub mod compare;
pub mod noise;
pub mod occupancy;
pub mod peaks;
pub mod result;
pub mod statistics;
pub mod threshold;

pub use anomaly::{Anomaly, AnomalyDetector, AnomalyKind, BandAllocation, Severity};
pub use compare::BandComparison;
pub use noise::NoiseFloorEstimator;
pub use occupancy::{is_occupied, occupancy_percentage, Occupancy, OccupancyClassifier};
pub use peaks::{EmissionPeak, PeakDetector};
pub use result::{OccupancyResult, ResultAssembler, DEFAULT_TOP_SIGNALS};
pub use statistics::BandStats;
pub use threshold::{AutoThreshold, ResolvedThreshold, ThresholdMode, ThresholdResolver};

use crate::config::{MatcherConfig, SpecmonConfig};
use crate::error::Result;
use crate::license::{resolve_tolerance, LicenseMatcher, LicenseRegistry};
use crate::sweep::Band;
use tracing::{debug, info};

/// The full per-band analysis pipeline.
///
/// Holds configuration only; every call is a pure function of its inputs.
#[derive(Debug, Clone)]
pub struct OccupancyAnalyzer {
    resolver: ThresholdResolver,
    classifier: OccupancyClassifier,
    matcher: MatcherConfig,
    detector: AnomalyDetector,
    assembler: ResultAssembler,
}

impl Default for OccupancyAnalyzer {
    fn default() -> Self {
        Self::from_config(&SpecmonConfig::default())
    }
}

impl OccupancyAnalyzer {
    pub fn from_config(config: &SpecmonConfig) -> Self {
        Self {
            resolver: ThresholdResolver::new(
                config.threshold.clone(),
                NoiseFloorEstimator::from_config(&config.noise_floor),
            ),
            classifier: OccupancyClassifier::new(),
            matcher: config.matcher.clone(),
            detector: AnomalyDetector::new(config.anomaly.clone())
                .with_allocations(config.allocations.clone()),
            assembler: ResultAssembler::new(config.result.top_signals),
        }
    }

    pub fn resolver(&self) -> &ThresholdResolver {
        &self.resolver
    }

    /// Matching tolerance this analyzer applies to `band`
    pub fn tolerance_for(&self, band: &Band) -> f64 {
        resolve_tolerance(&self.matcher, band)
    }

    /// Preview the auto threshold for a band
    pub fn auto_threshold(&self, band: &Band, margin_db: f64) -> Result<AutoThreshold> {
        self.resolver.auto_threshold(band, margin_db)
    }

    /// Run the pipeline on one band
    pub fn analyze<R: LicenseRegistry + ?Sized>(
        &self,
        band: &Band,
        mode: ThresholdMode,
        registry: &R,
    ) -> Result<OccupancyResult> {
        let resolved = self.resolver.resolve(band, mode)?;
        debug!(
            band = band.band_number(),
            noise_floor = resolved.noise_floor,
            threshold = resolved.threshold,
            auto = mode.is_auto(),
            "threshold resolved"
        );

        let occupancy = self.classifier.classify(band, resolved.threshold);
        debug!(occupied = occupancy.occupied_channels, "classification complete");

        let tolerance = self.tolerance_for(band);
        let matched = LicenseMatcher::new(registry, tolerance).match_channels(&occupancy.occupied);
        debug!(
            tolerance_mhz = tolerance,
            licensed = matched.iter().filter(|s| s.is_licensed()).count(),
            "license matching complete"
        );

        let anomalies = self.detector.detect(&matched, resolved.threshold);
        let result = self.assembler.assemble(&occupancy, &resolved, matched, anomalies);

        info!(
            band = band.band_number(),
            total = result.total_channels,
            occupied = result.occupied_channels,
            percentage = result.occupancy_percentage,
            anomalies = result.anomalies.len(),
            "band analyzed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpecmonError;
    use crate::license::{LicenseRecord, RegistrySnapshot};
    use crate::sweep::Channel;

    fn band() -> Band {
        Band::new(
            1,
            100.0,
            100.1,
            None,
            vec![
                Channel::new(1, 100.0, 20.0, 22.0),
                Channel::new(2, 100.025, 55.0, 58.0),
                Channel::new(3, 100.05, 25.0, 26.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_manual_scenario() {
        let registry = RegistrySnapshot::new(vec![
            LicenseRecord::new("PK2ABC", 100.026).with_station("Suara FM", ""),
            LicenseRecord::new("FAR", 100.100),
        ]);
        let result = OccupancyAnalyzer::default()
            .analyze(&band(), ThresholdMode::Manual { threshold: 50.0 }, &registry)
            .unwrap();

        assert_eq!(result.total_channels, 3);
        assert_eq!(result.occupied_channels, 1);
        assert_eq!(result.occupancy_percentage, 33.3);
        assert_eq!(result.threshold_used, 50.0);
        assert_eq!(result.noise_floor, 20.0);
        assert_eq!(result.occupied_list.len(), 1);
        assert_eq!(result.occupied_list[0].channel.frequency, 100.025);
        assert_eq!(result.occupied_list[0].station.as_ref().unwrap().callsign, "PK2ABC");
        assert_eq!(result.top_signals, result.occupied_list);
        assert!(result.anomalies.is_empty());
    }

    #[test]
    fn test_unlicensed_when_outside_tolerance() {
        let registry = RegistrySnapshot::new(vec![LicenseRecord::new("FAR", 100.100)]);
        let result = OccupancyAnalyzer::default()
            .analyze(&band(), ThresholdMode::Manual { threshold: 50.0 }, &registry)
            .unwrap();
        assert!(result.occupied_list[0].station.is_none());
    }

    #[test]
    fn test_wide_bandwidth_tolerance_reaches_past_window() {
        let band = Band::new(
            1,
            100.0,
            100.6,
            Some(300.0),
            vec![
                Channel::new(1, 100.0, 20.0, 22.0),
                Channel::new(2, 100.3, 60.0, 90.0),
                Channel::new(3, 100.6, 21.0, 24.0),
            ],
        )
        .unwrap();
        let raw = vec![LicenseRecord::new("IN_TOL", 100.42)];
        let snapshot = RegistrySnapshot::new(raw.clone());
        let analyzer = OccupancyAnalyzer::default();
        assert_eq!(analyzer.tolerance_for(&band), 0.15);

        let mode = ThresholdMode::Manual { threshold: 50.0 };
        for result in [
            analyzer.analyze(&band, mode, &snapshot).unwrap(),
            analyzer.analyze(&band, mode, &raw[..]).unwrap(),
        ] {
            assert_eq!(result.occupied_list[0].station.as_ref().unwrap().callsign, "IN_TOL");
            assert!(result.anomalies.is_empty());
        }
    }

    #[test]
    fn test_auto_scenario() {
        let analyzer = OccupancyAnalyzer::default();
        let preview = analyzer.auto_threshold(&band(), 10.0).unwrap();
        assert_eq!(preview.noise_floor, 20.0);
        assert_eq!(preview.auto_threshold, 30.0);

        let result = analyzer
            .analyze(&band(), ThresholdMode::Auto { margin_db: 10.0 }, &RegistrySnapshot::default())
            .unwrap();
        assert_eq!(result.threshold_used, 30.0);
        assert_eq!(result.occupied_channels, 1);
    }

    #[test]
    fn test_empty_band() {
        let empty = Band::new(4, 100.0, 101.0, None, vec![]).unwrap();
        let result = OccupancyAnalyzer::default()
            .analyze(&empty, ThresholdMode::Manual { threshold: 40.0 }, &RegistrySnapshot::default())
            .unwrap();
        assert_eq!(result.total_channels, 0);
        assert_eq!(result.occupancy_percentage, 0.0);
        assert!(result.occupied_list.is_empty());
    }

    #[test]
    fn test_invalid_threshold_no_partial_result() {
        let err = OccupancyAnalyzer::default()
            .analyze(&band(), ThresholdMode::Manual { threshold: 90.0 }, &RegistrySnapshot::default())
            .unwrap_err();
        assert!(matches!(err, SpecmonError::InvalidThreshold { .. }));
    }

    #[test]
    fn test_high_power_anomaly_in_pipeline() {
        let hot = Band::new(
            1,
            87.0,
            88.0,
            Some(50.0),
            vec![
                Channel::new(1, 87.0, 30.0, 32.0),
                Channel::new(2, 87.2, 75.0, 85.0),
                Channel::new(3, 87.4, 30.0, 31.0),
            ],
        )
        .unwrap();
        let result = OccupancyAnalyzer::default()
            .analyze(&hot, ThresholdMode::Manual { threshold: 50.0 }, &RegistrySnapshot::default())
            .unwrap();
        assert_eq!(result.anomalies.len(), 1);
        assert_eq!(result.anomalies[0].frequency, 87.2);
        assert_eq!(result.anomalies[0].kind, AnomalyKind::UnlicensedHighPower);
    }
}
