//! Band Statistics
//!
//! Summary figures over the average field strength of one band.

use super::noise::{median, NoiseFloorEstimator};
use crate::sweep::Band;
use serde::Serialize;

/// Descriptive statistics for a band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandStats {
    pub band_number: u32,
    pub start_freq: f64,
    pub stop_freq: f64,
    /// Number of channels analyzed
    pub num_channels: usize,
    /// Median channel spacing in MHz
    pub channel_step_mhz: Option<f64>,
    /// Lowest average field strength in dBµV/m
    pub min_dbuv: f64,
    /// Highest average field strength in dBµV/m
    pub max_dbuv: f64,
    pub mean_dbuv: f64,
    pub median_dbuv: f64,
    /// Population standard deviation in dB
    pub std_dev_db: f64,
    /// Highest maximum field strength seen in the band
    pub peak_max_dbuv: f64,
    pub noise_floor: f64,
}

impl BandStats {
    /// Compute statistics for a band
    pub fn compute(band: &Band, estimator: &NoiseFloorEstimator) -> Self {
        let mut stats = Self {
            band_number: band.band_number(),
            start_freq: band.start_freq(),
            stop_freq: band.stop_freq(),
            num_channels: band.len(),
            channel_step_mhz: band.channel_step(),
            min_dbuv: 0.0,
            max_dbuv: 0.0,
            mean_dbuv: 0.0,
            median_dbuv: 0.0,
            std_dev_db: 0.0,
            peak_max_dbuv: 0.0,
            noise_floor: 0.0,
        };
        if band.is_empty() {
            return stats;
        }

        let mut values = band.avg_strengths();
        values.sort_by(f64::total_cmp);
        let n = values.len() as f64;

        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        stats.min_dbuv = values[0];
        stats.max_dbuv = values[values.len() - 1];
        stats.mean_dbuv = mean;
        stats.median_dbuv = median(&values);
        stats.std_dev_db = variance.sqrt();
        stats.peak_max_dbuv = band
            .channels()
            .iter()
            .map(|c| c.max_field_strength)
            .fold(f64::NEG_INFINITY, f64::max);
        stats.noise_floor = estimator.estimate(&values);
        stats
    }

    /// Format as text report
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("Band {} Statistics\n", self.band_number));
        output.push_str(&"═".repeat(50));
        output.push('\n');

        output.push_str(&format!(
            "Range:             {:.4} - {:.4} MHz\n",
            self.start_freq, self.stop_freq
        ));
        output.push_str(&format!("Channels:          {}\n", self.num_channels));
        if let Some(step) = self.channel_step_mhz {
            output.push_str(&format!("Channel Step:      {:.1} kHz\n", step * 1000.0));
        }

        output.push_str("\nAverage Field Strength\n");
        output.push_str(&"─".repeat(50));
        output.push('\n');
        output.push_str(&format!("Minimum:           {:.2} dBµV/m\n", self.min_dbuv));
        output.push_str(&format!("Maximum:           {:.2} dBµV/m\n", self.max_dbuv));
        output.push_str(&format!("Mean:              {:.2} dBµV/m\n", self.mean_dbuv));
        output.push_str(&format!("Median:            {:.2} dBµV/m\n", self.median_dbuv));
        output.push_str(&format!("Std Dev:           {:.2} dB\n", self.std_dev_db));
        output.push_str(&format!("Noise Floor:       {:.2} dBµV/m\n", self.noise_floor));
        output.push_str(&format!("Peak (max):        {:.2} dBµV/m\n", self.peak_max_dbuv));

        output
    }

    /// Format as JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::Channel;

    #[test]
    fn test_stats_empty() {
        let band = Band::new(2, 100.0, 101.0, None, vec![]).unwrap();
        let stats = BandStats::compute(&band, &NoiseFloorEstimator::default());
        assert_eq!(stats.num_channels, 0);
        assert_eq!(stats.noise_floor, 0.0);
        assert!(stats.channel_step_mhz.is_none());
    }

    #[test]
    fn test_stats_values() {
        let band = Band::new(
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
        .unwrap();
        let stats = BandStats::compute(&band, &NoiseFloorEstimator::default());
        assert_eq!(stats.min_dbuv, 20.0);
        assert_eq!(stats.max_dbuv, 55.0);
        assert!((stats.mean_dbuv - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.median_dbuv, 25.0);
        assert_eq!(stats.peak_max_dbuv, 58.0);
        assert_eq!(stats.noise_floor, 20.0);
        assert!(stats.std_dev_db > 15.0 && stats.std_dev_db < 16.0);
    }

    #[test]
    fn test_stats_renderings() {
        let band = Band::new(1, 87.0, 88.0, None, vec![Channel::new(1, 87.5, 40.0, 41.0)]).unwrap();
        let stats = BandStats::compute(&band, &NoiseFloorEstimator::default());
        assert!(stats.to_text().contains("Band 1 Statistics"));
        let value: serde_json::Value = serde_json::from_str(&stats.to_json().unwrap()).unwrap();
        assert_eq!(value["num_channels"], 1);
        assert!(value["channel_step_mhz"].is_null());
    }
}
