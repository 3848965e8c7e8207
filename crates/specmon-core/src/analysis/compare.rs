//! Band Comparison
//!
//! Lines up two sweeps over the frequency range of one band. Only channels
//! present in both sweeps at the same frequency (to the hertz) are kept.

use crate::error::Result;
use crate::sweep::Measurement;
use serde::Serialize;
use std::collections::BTreeMap;

/// Average strengths of two sweeps at their common frequencies
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandComparison {
    pub band_number: u32,
    /// Common frequencies in MHz, ascending
    pub frequencies: Vec<f64>,
    pub current_values: Vec<f64>,
    pub other_values: Vec<f64>,
}

impl BandComparison {
    /// Compare `band_number` of `current` against the same range in `other`.
    ///
    /// The band must exist in `current`; `other` is sliced by frequency
    /// range only, so it need not share the band numbering.
    pub fn compute(current: &Measurement, other: &Measurement, band_number: u32) -> Result<Self> {
        let band = current.band(band_number)?;

        let others: BTreeMap<i64, f64> = other
            .all_channels()
            .into_iter()
            .filter(|c| band.contains(c.frequency))
            .map(|c| (hz_key(c.frequency), c.avg_field_strength))
            .collect();

        let mut comparison = Self {
            band_number,
            frequencies: Vec::new(),
            current_values: Vec::new(),
            other_values: Vec::new(),
        };
        for channel in band.channels() {
            if let Some(&value) = others.get(&hz_key(channel.frequency)) {
                comparison.frequencies.push(channel.frequency);
                comparison.current_values.push(channel.avg_field_strength);
                comparison.other_values.push(value);
            }
        }
        Ok(comparison)
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// `current - other` per common frequency
    pub fn deltas(&self) -> Vec<f64> {
        self.current_values
            .iter()
            .zip(&self.other_values)
            .map(|(c, o)| c - o)
            .collect()
    }

    /// Format as text table
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Band {} Comparison\n", self.band_number));
        output.push_str(&"═".repeat(56));
        output.push('\n');
        output.push_str(&format!(
            "{:>12}  {:>12}  {:>12}  {:>10}\n",
            "Freq (MHz)", "Current", "Other", "Delta"
        ));
        output.push_str(&"─".repeat(56));
        output.push('\n');
        for (i, delta) in self.deltas().into_iter().enumerate() {
            output.push_str(&format!(
                "{:>12.4}  {:>12.1}  {:>12.1}  {:>+10.1}\n",
                self.frequencies[i], self.current_values[i], self.other_values[i], delta
            ));
        }
        if self.is_empty() {
            output.push_str("  No common frequencies\n");
        }
        output
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::from("frequency,current,other\n");
        for i in 0..self.len() {
            output.push_str(&format!(
                "{},{},{}\n",
                self.frequencies[i], self.current_values[i], self.other_values[i]
            ));
        }
        output
    }
}

fn hz_key(freq_mhz: f64) -> i64 {
    (freq_mhz * 1e6).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpecmonError;
    use crate::sweep::{Band, Channel};

    fn sweep(channels: Vec<Channel>) -> Measurement {
        let band = Band::new(1, 100.0, 100.2, None, channels).unwrap();
        Measurement::new("test.csv", BTreeMap::new(), None, vec![band]).unwrap()
    }

    #[test]
    fn test_common_frequencies_only() {
        let current = sweep(vec![
            Channel::new(1, 100.0, 20.0, 22.0),
            Channel::new(2, 100.025, 55.0, 58.0),
            Channel::new(3, 100.05, 25.0, 26.0),
        ]);
        let other = sweep(vec![
            Channel::new(1, 100.0, 21.0, 22.0),
            Channel::new(3, 100.05, 30.0, 31.0),
            Channel::new(4, 100.075, 40.0, 41.0),
        ]);
        let cmp = BandComparison::compute(&current, &other, 1).unwrap();
        assert_eq!(cmp.frequencies, vec![100.0, 100.05]);
        assert_eq!(cmp.current_values, vec![20.0, 25.0]);
        assert_eq!(cmp.other_values, vec![21.0, 30.0]);
        assert_eq!(cmp.deltas(), vec![-1.0, -5.0]);
        assert_eq!(cmp.to_csv().lines().count(), 3);
    }

    #[test]
    fn test_rounding_to_hertz() {
        let current = sweep(vec![Channel::new(1, 100.1, 20.0, 22.0)]);
        let other = sweep(vec![Channel::new(1, 100.0 + 0.1, 24.0, 25.0)]);
        let cmp = BandComparison::compute(&current, &other, 1).unwrap();
        assert_eq!(cmp.len(), 1);
    }

    #[test]
    fn test_missing_band() {
        let current = sweep(vec![Channel::new(1, 100.0, 20.0, 22.0)]);
        let err = BandComparison::compute(&current, &current, 9).unwrap_err();
        assert!(matches!(err, SpecmonError::BandNotFound(9)));
    }
}
