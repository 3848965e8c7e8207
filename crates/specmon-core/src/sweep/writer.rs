//! Sweep export writer
//!
//! Produces text that [`SweepParser`](super::SweepParser) reads back to the
//! same bands and channels. Numbers are written with Rust's shortest
//! round-trip formatting so values survive a parse/write cycle bit for bit.
//!
//! Metadata round-trips only when the measurement has some. The export
//! format needs a metadata section, so an empty map is written as a single
//! `Filename` entry and reads back with that one key.

use super::model::Measurement;
use super::parser::{BANDS_MARKER, CHANNELS_MARKER};

/// Serializes measurements into the sweep export format
#[derive(Debug, Clone)]
pub struct SweepWriter {
    separator: String,
}

impl Default for SweepWriter {
    fn default() -> Self {
        Self {
            separator: "^".to_string(),
        }
    }
}

impl SweepWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different field separator
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Render a full export
    pub fn write(&self, measurement: &Measurement) -> String {
        let sep = self.separator.as_str();
        let mut output = format!("sep={}\n", sep);

        if measurement.metadata().is_empty() {
            output.push_str(&format!("Filename\n{}\n", measurement.filename()));
        } else {
            let keys: Vec<&str> = measurement.metadata().keys().map(String::as_str).collect();
            let values: Vec<&str> = measurement.metadata().values().map(String::as_str).collect();
            output.push_str(&keys.join(sep));
            output.push('\n');
            output.push_str(&values.join(sep));
            output.push('\n');
        }
        output.push('\n');

        output.push_str(&format!(
            "{}{sep}Start Frequency (MHz){sep}Stop Frequency (MHz){sep}Bandwidth (kHz)\n",
            BANDS_MARKER
        ));
        for band in measurement.bands() {
            let bw = band.bandwidth_khz().map(|b| b.to_string()).unwrap_or_default();
            output.push_str(&format!(
                "{}{sep}{}{sep}{}{sep}{}\n",
                band.band_number(),
                band.start_freq(),
                band.stop_freq(),
                bw
            ));
        }
        output.push('\n');

        output.push_str(&format!(
            "{}{sep}Frequency (MHz){sep}Maximum Field Strength (dBuV/m){sep}Average Field Strength (dBuV/m)\n",
            CHANNELS_MARKER
        ));
        output.push_str(&self.write_channels(measurement));
        output
    }

    /// Render only the channel rows, frequency-ascending
    pub fn write_channels(&self, measurement: &Measurement) -> String {
        let sep = self.separator.as_str();
        let mut output = String::new();
        for ch in measurement.all_channels() {
            output.push_str(&format!(
                "{}{sep}{}{sep}{}{sep}{}\n",
                ch.channel_no, ch.frequency, ch.max_field_strength, ch.avg_field_strength
            ));
        }
        output
    }
}
