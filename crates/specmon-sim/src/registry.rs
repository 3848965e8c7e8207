//! Synthetic License Registries
//!
//! Produces registry records that line up with a band plan: most carriers
//! get a license close to their center frequency, the rest stay unlicensed,
//! and decoy records are scattered through the band.

use crate::generator::{round_hz, BandPlan};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use specmon_core::license::LicenseRecord;
use tracing::debug;

/// Registry generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Probability that a carrier receives a license
    pub licensed_fraction: f64,
    /// Largest offset between a carrier and its license in MHz
    pub max_offset_mhz: f64,
    /// Extra records per band that match no carrier
    pub decoys_per_band: usize,
    pub service: String,
    pub province: String,
    pub city: String,
    pub seed: Option<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            licensed_fraction: 0.8,
            max_offset_mhz: 0.005,
            decoys_per_band: 10,
            service: "FM BROADCAST".to_string(),
            province: "Lampung".to_string(),
            city: "Bandar Lampung".to_string(),
            seed: None,
        }
    }
}

/// Seeded registry generator
#[derive(Debug)]
pub struct RegistryGenerator {
    config: RegistryConfig,
    rng: StdRng,
    serial: usize,
}

impl RegistryGenerator {
    pub fn new(config: RegistryConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            config,
            rng,
            serial: 0,
        }
    }

    /// Records for every band in a plan
    pub fn generate(&mut self, plans: &[BandPlan]) -> Vec<LicenseRecord> {
        let mut records = Vec::new();
        for plan in plans {
            for carrier in &plan.carriers {
                if self.rng.gen_bool(self.config.licensed_fraction.clamp(0.0, 1.0)) {
                    let offset = if self.config.max_offset_mhz > 0.0 {
                        self.rng.gen_range(-self.config.max_offset_mhz..=self.config.max_offset_mhz)
                    } else {
                        0.0
                    };
                    let record = self.record(round_hz(carrier.frequency_mhz + offset), true);
                    records.push(record);
                }
            }
            for _ in 0..self.config.decoys_per_band {
                let freq = round_hz(self.rng.gen_range(plan.start_mhz..=plan.stop_mhz));
                let active = self.rng.gen_bool(0.5);
                let record = self.record(freq, active);
                records.push(record);
            }
        }
        debug!(records = records.len(), "synthetic registry generated");
        records
    }

    /// A registry of `size` records spread uniformly over `[start, stop]`
    pub fn uniform(&mut self, size: usize, start_mhz: f64, stop_mhz: f64) -> Vec<LicenseRecord> {
        (0..size)
            .map(|_| {
                let freq = round_hz(self.rng.gen_range(start_mhz..=stop_mhz));
                let active = self.rng.gen_bool(0.7);
                self.record(freq, active)
            })
            .collect()
    }

    fn record(&mut self, freq: f64, active: bool) -> LicenseRecord {
        self.serial += 1;
        let n = self.serial;
        let mut record = LicenseRecord::new(format!("PK{:05}", n), freq)
            .with_service(self.config.service.clone())
            .with_station(format!("Station {}", n), format!("PT Radio {}", n))
            .with_status(if active { "ACTIVE" } else { "EXPIRED" });
        record.province = self.config.province.clone();
        record.city = self.config.city.clone();
        record.emis_class_1 = "256KF8EHF".to_string();
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::Carrier;

    fn plan() -> BandPlan {
        BandPlan::new(1, 87.5, 108.0, 100.0)
            .with_carrier(Carrier::new(90.0, 60.0))
            .with_carrier(Carrier::new(100.0, 60.0))
    }

    #[test]
    fn test_all_carriers_licensed() {
        let config = RegistryConfig {
            licensed_fraction: 1.0,
            decoys_per_band: 0,
            seed: Some(7),
            ..RegistryConfig::default()
        };
        let records = RegistryGenerator::new(config).generate(&[plan()]);
        assert_eq!(records.len(), 2);
        assert!((records[0].freq - 90.0).abs() <= 0.005 + 1e-9);
        assert!(records.iter().all(|r| r.is_active()));
        assert_eq!(records[0].service, "FM BROADCAST");
    }

    #[test]
    fn test_decoys_inside_band() {
        let config = RegistryConfig {
            licensed_fraction: 0.0,
            decoys_per_band: 50,
            seed: Some(7),
            ..RegistryConfig::default()
        };
        let records = RegistryGenerator::new(config).generate(&[plan()]);
        assert_eq!(records.len(), 50);
        assert!(records.iter().all(|r| r.freq >= 87.5 && r.freq <= 108.0));
    }

    #[test]
    fn test_unique_callsigns() {
        let mut gen = RegistryGenerator::new(RegistryConfig {
            seed: Some(1),
            ..RegistryConfig::default()
        });
        let mut calls: Vec<String> = gen.uniform(500, 87.5, 108.0).into_iter().map(|r| r.callsign).collect();
        calls.sort();
        calls.dedup();
        assert_eq!(calls.len(), 500);
    }
}
