//! Emission Peak Detection
//!
//! Find distinct emissions in a band: local maxima of the average field
//! strength that clear the threshold, stand out from their surrounding
//! valleys and are not crowded by a stronger neighbour.

use crate::config::PeakConfig;
use crate::sweep::{Band, Channel};
use serde::Serialize;

/// A detected emission peak
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmissionPeak {
    #[serde(flatten)]
    pub channel: Channel,
    /// Index of the channel within its band
    pub index: usize,
    /// Height above the higher of the two surrounding valleys in dB
    pub prominence_db: f64,
}

#[derive(Serialize)]
struct PeakReport<'a> {
    num_peaks: usize,
    peaks: &'a [EmissionPeak],
}

/// Peak detection configuration
///
/// Band edges count as local maxima. An edge peak has only one valley, so
/// its prominence is its height above that inner valley; a strong emission
/// sitting on the first or last channel is reported rather than filtered
/// out for lacking a second side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakDetector {
    /// Minimum prominence in dB
    prominence_db: f64,
    /// Minimum distance between peaks in channels
    min_distance: usize,
}

impl Default for PeakDetector {
    fn default() -> Self {
        Self {
            prominence_db: 3.0,
            min_distance: 3,
        }
    }
}

impl PeakDetector {
    /// Create a new peak detector with default settings
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &PeakConfig) -> Self {
        Self::new()
            .with_prominence(config.prominence_db)
            .with_min_distance(config.min_distance)
    }

    /// Set the minimum prominence
    pub fn with_prominence(mut self, prominence_db: f64) -> Self {
        self.prominence_db = prominence_db;
        self
    }

    /// Set minimum distance between peaks
    pub fn with_min_distance(mut self, min_distance: usize) -> Self {
        self.min_distance = min_distance.max(1);
        self
    }

    /// Find peaks in a band
    pub fn detect(&self, band: &Band, threshold: f64) -> Vec<EmissionPeak> {
        self.detect_in_channels(band.channels(), threshold)
    }

    /// Find peaks in a frequency-ordered channel slice.
    ///
    /// Bands shorter than three channels have no meaningful shape; every
    /// channel strictly above the threshold is reported instead.
    pub fn detect_in_channels(&self, channels: &[Channel], threshold: f64) -> Vec<EmissionPeak> {
        let n = channels.len();
        if n < 3 {
            return channels
                .iter()
                .enumerate()
                .filter(|(_, c)| c.avg_field_strength > threshold)
                .map(|(index, c)| EmissionPeak {
                    channel: *c,
                    index,
                    prominence_db: 0.0,
                })
                .collect();
        }

        let values: Vec<f64> = channels.iter().map(|c| c.avg_field_strength).collect();

        // Local maxima, edges compared against their single neighbour
        let mut candidates: Vec<(usize, f64)> = Vec::new();
        for i in 0..n {
            let v = values[i];
            let left_ok = i == 0 || v > values[i - 1];
            let right_ok = i == n - 1 || v > values[i + 1];
            if left_ok && right_ok && v > threshold {
                let prominence = prominence_at(&values, i);
                if prominence >= self.prominence_db {
                    candidates.push((i, prominence));
                }
            }
        }

        // Strongest first so weaker neighbours are the ones dropped
        candidates.sort_by(|a, b| {
            values[b.0]
                .total_cmp(&values[a.0])
                .then_with(|| a.0.cmp(&b.0))
        });

        let mut selected: Vec<(usize, f64)> = Vec::new();
        for (idx, prominence) in candidates {
            let too_close = selected
                .iter()
                .any(|(s, _)| idx.abs_diff(*s) < self.min_distance);
            if !too_close {
                selected.push((idx, prominence));
            }
        }

        selected.sort_by_key(|(idx, _)| *idx);
        selected
            .into_iter()
            .map(|(index, prominence_db)| EmissionPeak {
                channel: channels[index],
                index,
                prominence_db,
            })
            .collect()
    }

    /// Format peaks as text table
    pub fn format_text(peaks: &[EmissionPeak]) -> String {
        let mut output = String::new();
        output.push_str("Emission Peaks\n");
        output.push_str(&"═".repeat(60));
        output.push('\n');
        output.push_str(&format!(
            "{:>4}  {:>12}  {:>10}  {:>10}  {:>10}\n",
            "#", "Freq (MHz)", "Avg", "Max", "Prominence"
        ));
        output.push_str(&"─".repeat(60));
        output.push('\n');

        for (i, peak) in peaks.iter().enumerate() {
            output.push_str(&format!(
                "{:>4}  {:>12.4}  {:>10.1}  {:>10.1}  {:>7.1} dB\n",
                i + 1,
                peak.channel.frequency,
                peak.channel.avg_field_strength,
                peak.channel.max_field_strength,
                peak.prominence_db
            ));
        }

        if peaks.is_empty() {
            output.push_str("  No peaks found above threshold\n");
        }

        output
    }

    /// Format peaks as JSON
    pub fn format_json(peaks: &[EmissionPeak]) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&PeakReport {
            num_peaks: peaks.len(),
            peaks,
        })
    }

    /// Format peaks as CSV
    pub fn format_csv(peaks: &[EmissionPeak]) -> String {
        let mut output =
            String::from("channel_no,frequency,avg_field_strength,max_field_strength,prominence_db\n");
        for peak in peaks {
            output.push_str(&format!(
                "{},{},{},{},{}\n",
                peak.channel.channel_no,
                peak.channel.frequency,
                peak.channel.avg_field_strength,
                peak.channel.max_field_strength,
                peak.prominence_db
            ));
        }
        output
    }
}

/// Height of `values[idx]` above the higher of its two valleys.
///
/// Each valley is the minimum walking outward until a strictly higher
/// sample or the band edge. A peak on the band edge only has one valley.
fn prominence_at(values: &[f64], idx: usize) -> f64 {
    let peak = values[idx];
    let left = valley(values[..idx].iter().rev(), peak);
    let right = valley(values[idx + 1..].iter(), peak);

    let base = match (left, right) {
        (Some(l), Some(r)) => l.max(r),
        (Some(v), None) | (None, Some(v)) => v,
        (None, None) => peak,
    };
    peak - base
}

fn valley<'a>(walk: impl Iterator<Item = &'a f64>, peak: f64) -> Option<f64> {
    let mut lowest: Option<f64> = None;
    for &v in walk {
        lowest = Some(lowest.map_or(v, |m| m.min(v)));
        if v > peak {
            break;
        }
    }
    lowest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels(values: &[f64]) -> Vec<Channel> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Channel::new(i as u32 + 1, 100.0 + i as f64 * 0.025, v, v + 1.0))
            .collect()
    }

    #[test]
    fn test_find_single_peak() {
        let ch = channels(&[20.0, 22.0, 60.0, 25.0, 21.0]);
        let peaks = PeakDetector::new().detect_in_channels(&ch, 40.0);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 2);
        assert_eq!(peaks[0].prominence_db, 39.0);
    }

    #[test]
    fn test_min_distance_keeps_strongest() {
        let ch = channels(&[20.0, 60.0, 20.0, 55.0, 20.0, 20.0, 20.0, 58.0, 20.0]);
        let peaks = PeakDetector::new().detect_in_channels(&ch, 40.0);
        let idx: Vec<usize> = peaks.iter().map(|p| p.index).collect();
        assert_eq!(idx, vec![1, 7]);
    }

    #[test]
    fn test_prominence_filter() {
        let ch = channels(&[50.0, 52.0, 51.0, 51.5, 50.0]);
        assert!(PeakDetector::new().detect_in_channels(&ch, 40.0).is_empty());
        let peaks = PeakDetector::new()
            .with_prominence(1.0)
            .detect_in_channels(&ch, 40.0);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 1);
    }

    #[test]
    fn test_edge_peak() {
        let ch = channels(&[70.0, 30.0, 25.0, 24.0]);
        let peaks = PeakDetector::new().detect_in_channels(&ch, 40.0);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].index, 0);
        assert_eq!(peaks[0].prominence_db, 46.0);
    }

    #[test]
    fn test_short_band_uses_threshold() {
        let ch = channels(&[45.0, 55.0]);
        let peaks = PeakDetector::new().detect_in_channels(&ch, 50.0);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].channel.avg_field_strength, 55.0);
    }

    #[test]
    fn test_no_peaks_in_flat_band() {
        let ch = channels(&[60.0; 16]);
        assert!(PeakDetector::new().detect_in_channels(&ch, 40.0).is_empty());
    }

    #[test]
    fn test_formats() {
        let ch = channels(&[20.0, 22.0, 60.0, 25.0, 21.0]);
        let peaks = PeakDetector::new().detect_in_channels(&ch, 40.0);
        assert!(PeakDetector::format_text(&peaks).contains("Emission Peaks"));
        assert_eq!(PeakDetector::format_csv(&peaks).lines().count(), 2);
        let json: serde_json::Value =
            serde_json::from_str(&PeakDetector::format_json(&peaks).unwrap()).unwrap();
        assert_eq!(json["num_peaks"], 1);
        assert_eq!(json["peaks"][0]["index"], 2);
    }
}
