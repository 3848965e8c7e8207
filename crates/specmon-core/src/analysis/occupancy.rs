//! Occupancy Classification
//!
//! A channel is occupied when its average field strength reaches the
//! threshold. The comparison is inclusive: a channel sitting exactly on the
//! threshold counts as occupied.

use crate::sweep::{Band, Channel};
use tracing::warn;

/// Raw classification of one band
#[derive(Debug, Clone, PartialEq)]
pub struct Occupancy {
    pub total_channels: usize,
    pub occupied_channels: usize,
    /// Percentage rounded to one decimal
    pub occupancy_percentage: f64,
    /// Occupied channels in ascending frequency order
    pub occupied: Vec<Channel>,
}

/// Whether a channel clears the threshold
#[inline]
pub fn is_occupied(channel: &Channel, threshold: f64) -> bool {
    channel.avg_field_strength >= threshold
}

/// `100 * occupied / total` rounded to one decimal; zero for empty bands
pub fn occupancy_percentage(occupied: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(100.0 * occupied as f64 / total as f64, 1)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Labels channels against a threshold
#[derive(Debug, Clone, Copy, Default)]
pub struct OccupancyClassifier;

impl OccupancyClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify every channel of a band
    pub fn classify(&self, band: &Band, threshold: f64) -> Occupancy {
        if band.is_empty() {
            warn!(band = band.band_number(), "empty band, occupancy reported as 0");
        }

        let occupied: Vec<Channel> = band
            .channels()
            .iter()
            .filter(|c| is_occupied(c, threshold))
            .copied()
            .collect();

        let total_channels = band.len();
        let occupied_channels = occupied.len();

        Occupancy {
            total_channels,
            occupied_channels,
            occupancy_percentage: occupancy_percentage(occupied_channels, total_channels),
            occupied,
        }
    }
}
