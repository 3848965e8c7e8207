//! Sweep data model
//!
//! Typed records for one uploaded sweep. Construction goes through
//! [`Band::new`] and [`Measurement::new`], which enforce the structural
//! invariants, so everything downstream can assume well-formed data.

use crate::error::{Result, SpecmonError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Geographic position of the monitoring station
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
}

/// One frequency bin inside a band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel number as reported by the receiver
    pub channel_no: u32,
    /// Center frequency in MHz
    pub frequency: f64,
    /// Average field strength in dBµV/m
    pub avg_field_strength: f64,
    /// Maximum field strength in dBµV/m
    pub max_field_strength: f64,
}

impl Channel {
    pub fn new(channel_no: u32, frequency: f64, avg_field_strength: f64, max_field_strength: f64) -> Self {
        Self {
            channel_no,
            frequency,
            avg_field_strength,
            max_field_strength,
        }
    }
}

/// One frequency sweep segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Band {
    band_number: u32,
    start_freq: f64,
    stop_freq: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    bandwidth_khz: Option<f64>,
    channels: Vec<Channel>,
}

impl Band {
    /// Build a band, validating its channels.
    ///
    /// Channels must lie inside `[start_freq, stop_freq]`, be strictly
    /// ascending in frequency and satisfy `max >= avg`. An empty channel list
    /// is accepted here; the sweep parser is the one that rejects it.
    pub fn new(
        band_number: u32,
        start_freq: f64,
        stop_freq: f64,
        bandwidth_khz: Option<f64>,
        channels: Vec<Channel>,
    ) -> Result<Self> {
        if band_number == 0 {
            return Err(SpecmonError::malformed(None, "band numbers start at 1"));
        }
        if !start_freq.is_finite() || !stop_freq.is_finite() || start_freq >= stop_freq {
            return Err(SpecmonError::malformed(
                None,
                format!(
                    "band {}: start frequency {} must be below stop frequency {}",
                    band_number, start_freq, stop_freq
                ),
            ));
        }
        if let Some(bw) = bandwidth_khz {
            if !bw.is_finite() || bw <= 0.0 {
                return Err(SpecmonError::malformed(
                    None,
                    format!("band {}: bandwidth {} kHz must be positive", band_number, bw),
                ));
            }
        }

        for (i, ch) in channels.iter().enumerate() {
            if ch.frequency < start_freq || ch.frequency > stop_freq {
                return Err(SpecmonError::malformed(
                    None,
                    format!(
                        "channel {} at {} MHz lies outside band {} [{}, {}]",
                        ch.channel_no, ch.frequency, band_number, start_freq, stop_freq
                    ),
                ));
            }
            if ch.max_field_strength < ch.avg_field_strength {
                return Err(SpecmonError::malformed(
                    None,
                    format!(
                        "channel {}: maximum {} below average {}",
                        ch.channel_no, ch.max_field_strength, ch.avg_field_strength
                    ),
                ));
            }
            if i > 0 && channels[i - 1].frequency >= ch.frequency {
                return Err(SpecmonError::malformed(
                    None,
                    format!(
                        "band {}: channel frequencies must be strictly ascending ({} then {})",
                        band_number,
                        channels[i - 1].frequency,
                        ch.frequency
                    ),
                ));
            }
        }

        Ok(Self {
            band_number,
            start_freq,
            stop_freq,
            bandwidth_khz,
            channels,
        })
    }

    pub fn band_number(&self) -> u32 {
        self.band_number
    }

    pub fn start_freq(&self) -> f64 {
        self.start_freq
    }

    pub fn stop_freq(&self) -> f64 {
        self.stop_freq
    }

    /// Declared channel bandwidth in kHz, if the export carried one
    pub fn bandwidth_khz(&self) -> Option<f64> {
        self.bandwidth_khz
    }

    /// Channels in ascending frequency order
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Whether `frequency` lies inside this band (inclusive on both edges)
    pub fn contains(&self, frequency: f64) -> bool {
        frequency >= self.start_freq && frequency <= self.stop_freq
    }

    /// Average field strengths in channel order
    pub fn avg_strengths(&self) -> Vec<f64> {
        self.channels.iter().map(|c| c.avg_field_strength).collect()
    }

    /// Median spacing between adjacent channels in MHz.
    ///
    /// Returns `None` for bands with fewer than two channels.
    pub fn channel_step(&self) -> Option<f64> {
        if self.channels.len() < 2 {
            return None;
        }
        let mut steps: Vec<f64> = self
            .channels
            .windows(2)
            .map(|w| w[1].frequency - w[0].frequency)
            .collect();
        steps.sort_by(f64::total_cmp);
        Some(steps[steps.len() / 2])
    }
}

/// One uploaded sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    filename: String,
    metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_time: Option<NaiveDateTime>,
    bands: Vec<Band>,
}

impl Measurement {
    /// Build a measurement; band numbers must be unique.
    pub fn new(
        filename: impl Into<String>,
        metadata: BTreeMap<String, String>,
        location: Option<Location>,
        bands: Vec<Band>,
    ) -> Result<Self> {
        for (i, band) in bands.iter().enumerate() {
            if bands[..i].iter().any(|b| b.band_number == band.band_number) {
                return Err(SpecmonError::malformed(
                    None,
                    format!("duplicate band number {}", band.band_number),
                ));
            }
        }

        Ok(Self {
            filename: filename.into(),
            metadata,
            location,
            start_time: None,
            stop_time: None,
            bands,
        })
    }

    /// Attach the sweep start/stop timestamps
    pub fn with_times(mut self, start: Option<NaiveDateTime>, stop: Option<NaiveDateTime>) -> Self {
        self.start_time = start;
        self.stop_time = stop;
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Free-form key/value metadata from the export header
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn location(&self) -> Option<Location> {
        self.location
    }

    pub fn start_time(&self) -> Option<NaiveDateTime> {
        self.start_time
    }

    pub fn stop_time(&self) -> Option<NaiveDateTime> {
        self.stop_time
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Look up a band by its 1-based number
    pub fn band(&self, band_number: u32) -> Result<&Band> {
        self.bands
            .iter()
            .find(|b| b.band_number == band_number)
            .ok_or(SpecmonError::BandNotFound(band_number))
    }

    /// Task identifier from the metadata, if any
    pub fn task_id(&self) -> Option<&str> {
        self.metadata.get("Task ID").map(String::as_str)
    }

    /// Station name from the metadata, if any
    pub fn station_name(&self) -> Option<&str> {
        self.metadata.get("Station Name").map(String::as_str)
    }

    /// Every channel of the sweep in frequency order.
    ///
    /// Channels on the shared edge of adjacent bands appear once.
    pub fn all_channels(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self
            .bands
            .iter()
            .flat_map(|b| b.channels.iter().copied())
            .collect();
        channels.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
        channels.dedup_by(|a, b| a.frequency == b.frequency);
        channels
    }
}
