//! Result Assembly
//!
//! Folds classifier, matcher and anomaly output into one immutable
//! [`OccupancyResult`], and renders it for operators.

use super::anomaly::Anomaly;
use super::occupancy::Occupancy;
use super::threshold::ResolvedThreshold;
use crate::license::MatchedSignal;
use serde::{Deserialize, Serialize};

/// Default cap on the ranked top-signal list
pub const DEFAULT_TOP_SIGNALS: usize = 20;

/// Outcome of one band analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyResult {
    pub total_channels: usize,
    pub occupied_channels: usize,
    pub occupancy_percentage: f64,
    pub noise_floor: f64,
    pub threshold_used: f64,
    /// Occupied channels in ascending frequency order
    pub occupied_list: Vec<MatchedSignal>,
    /// Strongest occupied channels first
    pub top_signals: Vec<MatchedSignal>,
    pub anomalies: Vec<Anomaly>,
}

impl OccupancyResult {
    /// Number of occupied channels without a license match
    pub fn unlicensed_count(&self) -> usize {
        self.occupied_list.iter().filter(|s| !s.is_licensed()).count()
    }

    /// Format as text report
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        output.push_str("Band Occupancy\n");
        output.push_str(&"═".repeat(72));
        output.push('\n');
        output.push_str(&format!("Channels:          {}\n", self.total_channels));
        output.push_str(&format!(
            "Occupied:          {} ({:.1}%)\n",
            self.occupied_channels, self.occupancy_percentage
        ));
        output.push_str(&format!("Unlicensed:        {}\n", self.unlicensed_count()));
        output.push_str(&format!("Noise Floor:       {:.2} dBµV/m\n", self.noise_floor));
        output.push_str(&format!("Threshold:         {:.2} dBµV/m\n", self.threshold_used));

        output.push_str("\nTop Signals\n");
        output.push_str(&"─".repeat(72));
        output.push('\n');
        output.push_str(&format!(
            "{:>4}  {:>12}  {:>10}  {:>10}  {}\n",
            "#", "Freq (MHz)", "Avg", "Max", "Station"
        ));
        for (i, signal) in self.top_signals.iter().enumerate() {
            let station = signal
                .station
                .as_ref()
                .map(|s| format!("{} ({})", s.name, s.callsign))
                .unwrap_or_else(|| "unlicensed".to_string());
            output.push_str(&format!(
                "{:>4}  {:>12.4}  {:>10.1}  {:>10.1}  {}\n",
                i + 1,
                signal.channel.frequency,
                signal.channel.avg_field_strength,
                signal.channel.max_field_strength,
                station
            ));
        }
        if self.top_signals.is_empty() {
            output.push_str("  No channels above threshold\n");
        }

        if !self.anomalies.is_empty() {
            output.push_str("\nAnomalies\n");
            output.push_str(&"─".repeat(72));
            output.push('\n');
            for anomaly in &self.anomalies {
                output.push_str(&format!(
                    "  {:>12.4} MHz  [{}] {}\n",
                    anomaly.frequency, anomaly.severity, anomaly.description
                ));
            }
        }

        output
    }

    /// Format as pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Occupied list as CSV
    pub fn to_csv(&self) -> String {
        let mut output = String::from(
            "channel_no,frequency,avg_field_strength,max_field_strength,callsign,station\n",
        );
        for signal in &self.occupied_list {
            let (callsign, name) = signal
                .station
                .as_ref()
                .map(|s| (s.callsign.as_str(), s.name.as_str()))
                .unwrap_or(("", ""));
            output.push_str(&format!(
                "{},{},{},{},{},{}\n",
                signal.channel.channel_no,
                signal.channel.frequency,
                signal.channel.avg_field_strength,
                signal.channel.max_field_strength,
                csv_field(callsign),
                csv_field(name)
            ));
        }
        output
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Builds [`OccupancyResult`] values
#[derive(Debug, Clone, Copy)]
pub struct ResultAssembler {
    top_n: usize,
}

impl Default for ResultAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_SIGNALS)
    }
}

impl ResultAssembler {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn assemble(
        &self,
        occupancy: &Occupancy,
        threshold: &ResolvedThreshold,
        occupied_list: Vec<MatchedSignal>,
        anomalies: Vec<Anomaly>,
    ) -> OccupancyResult {
        let top_signals = self.rank(&occupied_list);
        OccupancyResult {
            total_channels: occupancy.total_channels,
            occupied_channels: occupancy.occupied_channels,
            occupancy_percentage: occupancy.occupancy_percentage,
            noise_floor: threshold.noise_floor,
            threshold_used: threshold.threshold,
            occupied_list,
            top_signals,
            anomalies,
        }
    }

    /// Descending average strength, ties by ascending frequency, capped
    pub fn rank(&self, signals: &[MatchedSignal]) -> Vec<MatchedSignal> {
        let mut ranked = signals.to_vec();
        ranked.sort_by(|a, b| {
            b.channel
                .avg_field_strength
                .total_cmp(&a.channel.avg_field_strength)
                .then_with(|| a.channel.frequency.total_cmp(&b.channel.frequency))
        });
        ranked.truncate(self.top_n);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::threshold::ThresholdMode;
    use crate::sweep::Channel;

    fn unlicensed(no: u32, freq: f64, avg: f64) -> MatchedSignal {
        MatchedSignal {
            channel: Channel::new(no, freq, avg, avg + 2.0),
            station: None,
        }
    }

    fn resolved() -> ResolvedThreshold {
        ResolvedThreshold {
            noise_floor: 20.0,
            threshold: 50.0,
            mode: ThresholdMode::Manual { threshold: 50.0 },
        }
    }

    #[test]
    fn test_top_signals_capped_and_sorted() {
        let signals: Vec<MatchedSignal> = (0..25)
            .map(|i| unlicensed(i + 1, 87.0 + i as f64 * 0.05, 30.0 + i as f64))
            .collect();
        let top = ResultAssembler::default().rank(&signals);
        assert_eq!(top.len(), 20);
        assert_eq!(top[0].channel.avg_field_strength, 54.0);
        assert!(top.windows(2).all(|w| w[0].channel.avg_field_strength >= w[1].channel.avg_field_strength));
    }

    #[test]
    fn test_ties_by_frequency() {
        let signals = vec![
            unlicensed(3, 100.05, 60.0),
            unlicensed(1, 100.0, 60.0),
            unlicensed(2, 100.025, 70.0),
        ];
        let top = ResultAssembler::default().rank(&signals);
        let freqs: Vec<f64> = top.iter().map(|s| s.channel.frequency).collect();
        assert_eq!(freqs, vec![100.025, 100.0, 100.05]);
    }

    #[test]
    fn test_result_keys() {
        let occupancy = Occupancy {
            total_channels: 3,
            occupied_channels: 1,
            occupancy_percentage: 33.3,
            occupied: vec![Channel::new(2, 100.025, 55.0, 58.0)],
        };
        let result = ResultAssembler::default().assemble(
            &occupancy,
            &resolved(),
            vec![unlicensed(2, 100.025, 55.0)],
            Vec::new(),
        );
        let value = serde_json::to_value(&result).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "anomalies",
                "noise_floor",
                "occupancy_percentage",
                "occupied_channels",
                "occupied_list",
                "threshold_used",
                "top_signals",
                "total_channels"
            ]
        );
        assert_eq!(result.unlicensed_count(), 1);
        assert!(result.to_text().contains("33.3%"));
        assert!(result.to_csv().lines().nth(1).unwrap().starts_with("2,100.025,55,57"));
    }

    #[test]
    fn test_csv_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("PT Radio, Ltd"), "\"PT Radio, Ltd\"");
    }
}
