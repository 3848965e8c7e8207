//! License Matching
//!
//! Correlates occupied channels with registry records by frequency
//! proximity. Among records inside the tolerance the closest wins; an exact
//! tie goes to an ACTIVE license, and any remaining tie to the record that
//! comes first in the registry, whichever [`LicenseRegistry`] serves it.

use super::record::{LicenseRecord, StationInfo};
use super::registry::{Candidate, LicenseRegistry};
use crate::config::MatcherConfig;
use crate::sweep::{Band, Channel};
use serde::{Deserialize, Serialize};

/// Slack for floating point comparisons on MHz values
const FREQ_EPSILON: f64 = 1e-9;

/// An occupied channel with its licensed station, if any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedSignal {
    #[serde(flatten)]
    pub channel: Channel,
    /// `None` means unlicensed
    pub station: Option<StationInfo>,
}

impl MatchedSignal {
    pub fn is_licensed(&self) -> bool {
        self.station.is_some()
    }

    pub fn frequency(&self) -> f64 {
        self.channel.frequency
    }
}

/// Matching tolerance for a band in MHz.
///
/// An explicit configured tolerance wins. Otherwise half the declared channel
/// bandwidth is used, then half the observed channel step, then the fixed
/// default.
pub fn resolve_tolerance(config: &MatcherConfig, band: &Band) -> f64 {
    if let Some(tol) = config.tolerance_mhz {
        return tol;
    }
    if let Some(bw) = band.bandwidth_khz() {
        return bw / 2000.0;
    }
    band.channel_step()
        .filter(|s| *s > 0.0)
        .map(|s| s / 2.0)
        .unwrap_or(config.default_tolerance_mhz)
}

/// Frequency-proximity matcher over any registry
pub struct LicenseMatcher<'a, R: LicenseRegistry + ?Sized> {
    registry: &'a R,
    tolerance_mhz: f64,
}

impl<'a, R: LicenseRegistry + ?Sized> LicenseMatcher<'a, R> {
    pub fn new(registry: &'a R, tolerance_mhz: f64) -> Self {
        Self {
            registry,
            tolerance_mhz,
        }
    }

    pub fn tolerance_mhz(&self) -> f64 {
        self.tolerance_mhz
    }

    /// Best record for a frequency, or `None` when nothing is in tolerance
    pub fn match_frequency(&self, freq_mhz: f64) -> Option<LicenseRecord> {
        let reach = self.tolerance_mhz + FREQ_EPSILON;
        let candidates = self.registry.find_candidates(freq_mhz, reach);

        let mut best: Option<(Candidate<'_>, f64)> = None;
        for candidate in candidates {
            let delta = (candidate.record.freq - freq_mhz).abs();
            if delta > reach {
                continue;
            }
            best = match best {
                Some((current, current_delta)) if !is_better(&candidate, delta, &current, current_delta) => {
                    Some((current, current_delta))
                }
                _ => Some((candidate, delta)),
            };
        }

        best.map(|(candidate, _)| candidate.record.clone())
    }

    /// Attach stations to a list of occupied channels, preserving order
    pub fn match_channels(&self, channels: &[Channel]) -> Vec<MatchedSignal> {
        channels
            .iter()
            .map(|channel| MatchedSignal {
                channel: *channel,
                station: self
                    .match_frequency(channel.frequency)
                    .as_ref()
                    .map(StationInfo::from),
            })
            .collect()
    }
}

fn is_better(candidate: &Candidate<'_>, delta: f64, current: &Candidate<'_>, current_delta: f64) -> bool {
    if delta < current_delta - FREQ_EPSILON {
        return true;
    }
    if (delta - current_delta).abs() > FREQ_EPSILON {
        return false;
    }
    match (candidate.record.is_active(), current.record.is_active()) {
        (true, false) => true,
        (false, true) => false,
        _ => candidate.order < current.order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::RegistrySnapshot;

    const TOL: f64 = 0.0125;

    #[test]
    fn test_match_within_tolerance() {
        let snap = RegistrySnapshot::new(vec![LicenseRecord::new("NEAR", 100.026)]);
        let matcher = LicenseMatcher::new(&snap, TOL);
        assert_eq!(matcher.match_frequency(100.025).unwrap().callsign, "NEAR");
    }

    #[test]
    fn test_no_match_outside_tolerance() {
        let snap = RegistrySnapshot::new(vec![LicenseRecord::new("FAR", 100.100)]);
        let matcher = LicenseMatcher::new(&snap, TOL);
        assert!(matcher.match_frequency(100.025).is_none());
    }

    #[test]
    fn test_tolerance_edge_inclusive() {
        let snap = RegistrySnapshot::new(vec![LicenseRecord::new("EDGE", 100.0375)]);
        let matcher = LicenseMatcher::new(&snap, TOL);
        assert!(matcher.match_frequency(100.025).is_some());
    }

    #[test]
    fn test_closest_wins() {
        let snap = RegistrySnapshot::new(vec![
            LicenseRecord::new("FURTHER", 100.030).with_status("ACTIVE"),
            LicenseRecord::new("CLOSER", 100.024),
        ]);
        let matcher = LicenseMatcher::new(&snap, TOL);
        assert_eq!(matcher.match_frequency(100.025).unwrap().callsign, "CLOSER");
    }

    #[test]
    fn test_active_breaks_exact_tie() {
        let snap = RegistrySnapshot::new(vec![
            LicenseRecord::new("EXPIRED", 100.025).with_status("EXPIRED"),
            LicenseRecord::new("LIVE", 100.025).with_status("ACTIVE"),
        ]);
        let matcher = LicenseMatcher::new(&snap, TOL);
        assert_eq!(matcher.match_frequency(100.025).unwrap().callsign, "LIVE");
    }

    #[test]
    fn test_first_seen_breaks_remaining_tie() {
        let snap = RegistrySnapshot::new(vec![
            LicenseRecord::new("FIRST", 100.025).with_status("ACTIVE"),
            LicenseRecord::new("SECOND", 100.025).with_status("ACTIVE"),
        ]);
        let matcher = LicenseMatcher::new(&snap, TOL);
        for _ in 0..10 {
            assert_eq!(matcher.match_frequency(100.025).unwrap().callsign, "FIRST");
        }
    }

    #[test]
    fn test_symmetric_tie_follows_registry_order() {
        let high_first = vec![
            LicenseRecord::new("FIRST_HIGH", 100.0625),
            LicenseRecord::new("SECOND_LOW", 99.9375),
        ];
        let low_first: Vec<LicenseRecord> = high_first.iter().rev().cloned().collect();

        for (raw, expected) in [(high_first, "FIRST_HIGH"), (low_first, "SECOND_LOW")] {
            let snap = RegistrySnapshot::new(raw.clone());
            let sorted = LicenseMatcher::new(&snap, 0.0625).match_frequency(100.0).map(|r| r.callsign);
            let linear = LicenseMatcher::new(&raw[..], 0.0625).match_frequency(100.0).map(|r| r.callsign);
            assert_eq!(sorted.as_deref(), Some(expected));
            assert_eq!(linear.as_deref(), Some(expected));
        }
    }

    #[test]
    fn test_tolerance_wider_than_candidate_window() {
        let raw = vec![LicenseRecord::new("IN_TOL", 100.42)];
        let snap = RegistrySnapshot::new(raw.clone());
        assert_eq!(LicenseMatcher::new(&snap, 0.15).match_frequency(100.3).unwrap().callsign, "IN_TOL");
        assert_eq!(LicenseMatcher::new(&raw[..], 0.15).match_frequency(100.3).unwrap().callsign, "IN_TOL");
        assert!(LicenseMatcher::new(&snap, 0.1).match_frequency(100.3).is_none());
    }

    #[test]
    fn test_linear_and_sorted_agree() {
        // Pairs sit symmetrically around grid points so ties are common
        let mut raw: Vec<LicenseRecord> = (0..200)
            .map(|i| LicenseRecord::new(format!("S{}", i), 87.0 + (i * 37 % 200) as f64 * 0.0105))
            .collect();
        for i in 0..50 {
            let center = 88.0 + i as f64 * 0.25;
            let (first, second) = if i % 2 == 0 { (0.0078125, -0.0078125) } else { (-0.0078125, 0.0078125) };
            raw.push(LicenseRecord::new(format!("P{}A", i), center + first));
            raw.push(LicenseRecord::new(format!("P{}B", i), center + second));
        }
        let snap = RegistrySnapshot::new(raw.clone());
        let sorted = LicenseMatcher::new(&snap, TOL);
        let linear = LicenseMatcher::new(&raw[..], TOL);

        for i in 0..400 {
            let f = 87.0 + i as f64 * 0.005;
            let a = sorted.match_frequency(f).map(|r| r.callsign);
            let b = linear.match_frequency(f).map(|r| r.callsign);
            assert_eq!(a, b, "at {} MHz", f);
        }
        for i in 0..50 {
            let center = 88.0 + i as f64 * 0.25;
            let a = sorted.match_frequency(center).map(|r| r.callsign);
            let b = linear.match_frequency(center).map(|r| r.callsign);
            assert_eq!(a, b, "at {} MHz", center);
        }
    }

    #[test]
    fn test_match_channels_preserves_order() {
        let snap = RegistrySnapshot::new(vec![LicenseRecord::new("ONE", 100.05).with_station("One FM", "")]);
        let matcher = LicenseMatcher::new(&snap, TOL);
        let channels = [
            Channel::new(1, 100.0, 60.0, 61.0),
            Channel::new(3, 100.05, 55.0, 56.0),
        ];
        let matched = matcher.match_channels(&channels);
        assert_eq!(matched.len(), 2);
        assert!(!matched[0].is_licensed());
        assert_eq!(matched[1].station.as_ref().unwrap().name, "One FM");
    }

    #[test]
    fn test_resolve_tolerance() {
        let config = MatcherConfig::default();
        let ch = |n, f| Channel::new(n, f, 10.0, 10.0);

        let declared = Band::new(1, 87.0, 88.0, Some(50.0), vec![ch(1, 87.0)]).unwrap();
        assert!((resolve_tolerance(&config, &declared) - 0.025).abs() < 1e-12);

        let stepped = Band::new(1, 87.0, 88.0, None, vec![ch(1, 87.0), ch(2, 87.1)]).unwrap();
        assert!((resolve_tolerance(&config, &stepped) - 0.05).abs() < 1e-9);

        let bare = Band::new(1, 87.0, 88.0, None, vec![ch(1, 87.0)]).unwrap();
        assert_eq!(resolve_tolerance(&config, &bare), 0.0125);

        let fixed = MatcherConfig {
            tolerance_mhz: Some(0.2),
            ..MatcherConfig::default()
        };
        assert_eq!(resolve_tolerance(&fixed, &declared), 0.2);
    }

    #[test]
    fn test_signal_serializes_flat() {
        let signal = MatchedSignal {
            channel: Channel::new(2, 100.025, 55.0, 58.0),
            station: None,
        };
        let value = serde_json::to_value(&signal).unwrap();
        assert_eq!(value["frequency"], 100.025);
        assert_eq!(value["avg_field_strength"], 55.0);
        assert!(value["station"].is_null());
    }
}
