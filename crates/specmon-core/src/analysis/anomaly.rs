//! Anomaly Detection
//!
//! Rule-based flags over the matched occupied list:
//!
//! - **Unlicensed high power**: no license and `max >= threshold + margin`
//! - **Out of band**: licensed station transmitting outside every allocation
//!   listed for its service class
//! - **Strong signal**: average level above a fixed ceiling
//!
//! Rules with missing reference data simply do not fire.

use crate::config::AnomalyConfig;
use crate::license::MatchedSignal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// One row of the band allocation table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandAllocation {
    /// Service class, matched case-insensitively against license records
    pub service: String,
    pub start_freq: f64,
    pub stop_freq: f64,
}

impl BandAllocation {
    pub fn new(service: impl Into<String>, start_freq: f64, stop_freq: f64) -> Self {
        Self {
            service: service.into(),
            start_freq,
            stop_freq,
        }
    }

    /// Inclusive range check
    pub fn contains(&self, frequency: f64) -> bool {
        frequency >= self.start_freq && frequency <= self.stop_freq
    }

    fn serves(&self, service: &str) -> bool {
        self.service.trim().eq_ignore_ascii_case(service.trim())
    }
}

/// Anomaly severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(s)
    }
}

/// Which rule raised an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    UnlicensedHighPower,
    OutOfBand,
    StrongSignal,
}

impl AnomalyKind {
    pub fn description(&self) -> &'static str {
        match self {
            AnomalyKind::UnlicensedHighPower => "Unlicensed high-power signal",
            AnomalyKind::OutOfBand => "Out-of-band emission",
            AnomalyKind::StrongSignal => "Unusually strong signal",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AnomalyKind::UnlicensedHighPower => Severity::High,
            AnomalyKind::OutOfBand => Severity::Medium,
            AnomalyKind::StrongSignal => Severity::Low,
        }
    }
}

/// A flagged channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub frequency: f64,
    pub kind: AnomalyKind,
    pub description: String,
    pub severity: Severity,
}

impl Anomaly {
    pub fn new(frequency: f64, kind: AnomalyKind) -> Self {
        Self {
            frequency,
            kind,
            description: kind.description().to_string(),
            severity: kind.severity(),
        }
    }
}

/// Applies the anomaly rules
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
    allocations: Vec<BandAllocation>,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self {
            config,
            allocations: Vec::new(),
        }
    }

    /// Attach a band allocation table, enabling the out-of-band rule
    pub fn with_allocations(mut self, allocations: Vec<BandAllocation>) -> Self {
        self.allocations = allocations;
        self
    }

    pub fn allocations(&self) -> &[BandAllocation] {
        &self.allocations
    }

    /// Flag anomalies, returned in ascending frequency order
    pub fn detect(&self, signals: &[MatchedSignal], threshold_used: f64) -> Vec<Anomaly> {
        let high_power_level = threshold_used + self.config.high_power_margin_db;
        let mut anomalies = Vec::new();

        for signal in signals {
            let freq = signal.frequency();
            let mut high_power = false;

            match &signal.station {
                None => {
                    if signal.channel.max_field_strength >= high_power_level {
                        anomalies.push(Anomaly::new(freq, AnomalyKind::UnlicensedHighPower));
                        high_power = true;
                    }
                }
                Some(station) => {
                    if self.is_out_of_band(&station.service, freq) {
                        anomalies.push(Anomaly::new(freq, AnomalyKind::OutOfBand));
                    }
                }
            }

            if !high_power && signal.channel.avg_field_strength > self.config.strong_signal_dbuv {
                anomalies.push(Anomaly::new(freq, AnomalyKind::StrongSignal));
            }
        }

        anomalies.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
        debug!(count = anomalies.len(), "anomaly detection complete");
        anomalies
    }

    fn is_out_of_band(&self, service: &str, frequency: f64) -> bool {
        if service.trim().is_empty() {
            return false;
        }
        let mut listed = self.allocations.iter().filter(|a| a.serves(service)).peekable();
        if listed.peek().is_none() {
            return false;
        }
        !listed.any(|a| a.contains(frequency))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::{LicenseRecord, StationInfo};
    use crate::sweep::Channel;

    fn signal(freq: f64, avg: f64, max: f64, service: Option<&str>) -> MatchedSignal {
        MatchedSignal {
            channel: Channel::new(1, freq, avg, max),
            station: service.map(|s| StationInfo::from(&LicenseRecord::new("X", freq).with_service(s))),
        }
    }

    #[test]
    fn test_unlicensed_high_power() {
        let detector = AnomalyDetector::default();
        let found = detector.detect(&[signal(100.0, 70.0, 80.0, None)], 50.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, AnomalyKind::UnlicensedHighPower);
        assert_eq!(found[0].description, "Unlicensed high-power signal");
        assert_eq!(found[0].severity, Severity::High);

        assert!(detector.detect(&[signal(100.0, 70.0, 79.9, None)], 50.0).is_empty());
        assert!(detector.detect(&[signal(100.0, 70.0, 80.0, Some("FM"))], 50.0).is_empty());
    }

    #[test]
    fn test_out_of_band_needs_allocations() {
        let signals = [signal(120.0, 60.0, 62.0, Some("FM BROADCAST"))];

        assert!(AnomalyDetector::default().detect(&signals, 50.0).is_empty());

        let detector = AnomalyDetector::default()
            .with_allocations(vec![BandAllocation::new("fm broadcast", 87.5, 108.0)]);
        let found = detector.detect(&signals, 50.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].description, "Out-of-band emission");
        assert_eq!(found[0].severity, Severity::Medium);

        let inside = [signal(100.0, 60.0, 62.0, Some("FM BROADCAST"))];
        assert!(detector.detect(&inside, 50.0).is_empty());

        let other_service = [signal(120.0, 60.0, 62.0, Some("AERONAUTICAL"))];
        assert!(detector.detect(&other_service, 50.0).is_empty());
    }

    #[test]
    fn test_strong_signal_not_doubled() {
        let detector = AnomalyDetector::default();
        let found = detector.detect(&[signal(100.0, 85.0, 90.0, Some("FM"))], 50.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, AnomalyKind::StrongSignal);

        let found = detector.detect(&[signal(100.0, 85.0, 90.0, None)], 50.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, AnomalyKind::UnlicensedHighPower);
    }

    #[test]
    fn test_frequency_order() {
        let detector = AnomalyDetector::default();
        let found = detector.detect(
            &[signal(101.0, 90.0, 95.0, Some("A")), signal(99.0, 60.0, 85.0, None)],
            50.0,
        );
        let freqs: Vec<f64> = found.iter().map(|a| a.frequency).collect();
        assert_eq!(freqs, vec![99.0, 101.0]);
    }

    #[test]
    fn test_anomaly_json_shape() {
        let value = serde_json::to_value(Anomaly::new(100.0, AnomalyKind::OutOfBand)).unwrap();
        assert_eq!(value["kind"], "out_of_band");
        assert_eq!(value["severity"], "medium");
        assert_eq!(value["frequency"], 100.0);
    }
}
