//! Synthetic Sweep Generation
//!
//! Builds sweep measurements from a band plan: a Gaussian noise floor with
//! carriers laid on top. Every carrier occupies a few channels with a
//! roll-off of `rolloff_db` per channel away from its center.
//!
//! With a seed set, generation is fully reproducible.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use specmon_core::config::ConfigError;
use specmon_core::sweep::{Band, Channel, Location, Measurement, SweepWriter};
use specmon_core::{Result, SpecmonError};
use std::collections::BTreeMap;
use tracing::debug;

/// One transmitter in the simulated band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carrier {
    /// Center frequency in MHz
    pub frequency_mhz: f64,
    /// Average field strength at the center channel in dBµV/m
    pub level_dbuv: f64,
    /// Channels on each side that still carry energy
    pub half_width: usize,
}

impl Carrier {
    pub fn new(frequency_mhz: f64, level_dbuv: f64) -> Self {
        Self {
            frequency_mhz,
            level_dbuv,
            half_width: 1,
        }
    }

    pub fn with_half_width(mut self, half_width: usize) -> Self {
        self.half_width = half_width;
        self
    }
}

/// Frequency layout of one simulated band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandPlan {
    pub band_number: u32,
    pub start_mhz: f64,
    pub stop_mhz: f64,
    /// Channel spacing in kHz
    pub step_khz: f64,
    pub carriers: Vec<Carrier>,
}

impl BandPlan {
    pub fn new(band_number: u32, start_mhz: f64, stop_mhz: f64, step_khz: f64) -> Self {
        Self {
            band_number,
            start_mhz,
            stop_mhz,
            step_khz,
            carriers: Vec::new(),
        }
    }

    pub fn with_carrier(mut self, carrier: Carrier) -> Self {
        self.carriers.push(carrier);
        self
    }

    /// FM broadcast band at 100 kHz spacing with a handful of stations
    pub fn fm_broadcast() -> Self {
        Self::new(1, 87.5, 108.0, 100.0)
            .with_carrier(Carrier::new(88.9, 62.0))
            .with_carrier(Carrier::new(91.3, 58.0))
            .with_carrier(Carrier::new(95.7, 71.0).with_half_width(2))
            .with_carrier(Carrier::new(99.1, 55.0))
            .with_carrier(Carrier::new(102.4, 84.0).with_half_width(2))
            .with_carrier(Carrier::new(106.6, 60.0))
    }

    /// Number of channels the band holds
    pub fn channel_count(&self) -> usize {
        let step_mhz = self.step_khz / 1000.0;
        ((self.stop_mhz - self.start_mhz) / step_mhz + 1e-6).floor() as usize + 1
    }

    /// Frequency of the i-th channel, rounded to the hertz
    pub fn channel_frequency(&self, index: usize) -> f64 {
        round_hz(self.start_mhz + index as f64 * self.step_khz / 1000.0)
    }
}

/// Sweep generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Mean noise level in dBµV/m
    pub noise_floor_dbuv: f64,
    /// Standard deviation of the noise in dB
    pub noise_std_db: f64,
    /// Mean gap between maximum and average field strength in dB
    pub max_excess_db: f64,
    /// Attenuation per channel away from a carrier center in dB
    pub rolloff_db: f64,
    /// Seed for reproducible output; `None` draws from entropy
    pub seed: Option<u64>,
    pub task_id: String,
    pub station_name: String,
    pub location: Option<Location>,
    pub bands: Vec<BandPlan>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            noise_floor_dbuv: 25.0,
            noise_std_db: 2.0,
            max_excess_db: 4.0,
            rolloff_db: 12.0,
            seed: None,
            task_id: "1".to_string(),
            station_name: "Simulated Station".to_string(),
            location: Some(Location {
                lat: -5.357882,
                lon: 105.216545,
            }),
            bands: vec![BandPlan::fm_broadcast()],
        }
    }
}

/// Seeded sweep generator
#[derive(Debug)]
pub struct SweepGenerator {
    config: SweepConfig,
    rng: StdRng,
}

impl SweepGenerator {
    pub fn new(config: SweepConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Generate one measurement
    pub fn generate(&mut self, filename: &str) -> Result<Measurement> {
        let noise = normal(self.config.noise_floor_dbuv, self.config.noise_std_db)?;
        let excess = normal(0.0, self.config.max_excess_db)?;

        let mut next_channel_no = 1u32;
        let mut bands = Vec::with_capacity(self.config.bands.len());
        for plan in &self.config.bands {
            let count = plan.channel_count();
            let mut channels = Vec::with_capacity(count);
            for i in 0..count {
                let frequency = plan.channel_frequency(i);
                if frequency > plan.stop_mhz {
                    break;
                }
                let floor = noise.sample(&mut self.rng);
                let carrier = carrier_level(plan, frequency, self.config.rolloff_db);
                let avg = round_tenth(carrier.map_or(floor, |c| c.max(floor)));
                let max = round_tenth(avg + excess.sample(&mut self.rng).abs());
                channels.push(Channel::new(next_channel_no, frequency, avg, max));
                next_channel_no += 1;
            }
            debug!(band = plan.band_number, channels = channels.len(), "band generated");
            bands.push(Band::new(
                plan.band_number,
                plan.start_mhz,
                plan.stop_mhz,
                Some(plan.step_khz),
                channels,
            )?);
        }

        let mut metadata = BTreeMap::new();
        metadata.insert("Task ID".to_string(), self.config.task_id.clone());
        metadata.insert("Station Name".to_string(), self.config.station_name.clone());
        if let Some(loc) = self.config.location {
            metadata.insert("Location (lat)".to_string(), loc.lat.to_string());
            metadata.insert("Location (lon)".to_string(), loc.lon.to_string());
        }

        Measurement::new(filename, metadata, self.config.location, bands)
    }

    /// Generate one measurement rendered as export text
    pub fn generate_export(&mut self, filename: &str) -> Result<String> {
        let measurement = self.generate(filename)?;
        Ok(SweepWriter::new().write(&measurement))
    }
}

/// Strongest carrier contribution at `frequency`, if any carrier reaches it
fn carrier_level(plan: &BandPlan, frequency: f64, rolloff_db: f64) -> Option<f64> {
    let step_mhz = plan.step_khz / 1000.0;
    plan.carriers
        .iter()
        .filter_map(|c| {
            let offset = ((frequency - c.frequency_mhz) / step_mhz).round().abs() as usize;
            (offset <= c.half_width).then(|| c.level_dbuv - rolloff_db * offset as f64)
        })
        .reduce(f64::max)
}

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(mean, std_dev).map_err(|e| {
        SpecmonError::Config(ConfigError::ValidationError(format!(
            "invalid noise distribution ({}, {}): {}",
            mean, std_dev, e
        )))
    })
}

pub(crate) fn round_hz(freq_mhz: f64) -> f64 {
    (freq_mhz * 1e6).round() / 1e6
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
