//! License registry records

use serde::{Deserialize, Serialize};

/// Status value that marks a license as in force
pub const ACTIVE_STATUS: &str = "ACTIVE";

/// One licensed station assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LicenseRecord {
    pub callsign: String,
    pub stn_name: String,
    pub clnt_name: String,
    pub service: String,
    /// Center frequency in MHz
    pub freq: f64,
    pub province: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub eq_mfr: String,
    pub eq_mdl: String,
    pub emis_class_1: String,
    pub status_simf: String,
}

impl LicenseRecord {
    /// Minimal record at a frequency, mostly for tests and synthetic data
    pub fn new(callsign: impl Into<String>, freq: f64) -> Self {
        Self {
            callsign: callsign.into(),
            freq,
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status_simf = status.into();
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    pub fn with_station(mut self, stn_name: impl Into<String>, clnt_name: impl Into<String>) -> Self {
        self.stn_name = stn_name.into();
        self.clnt_name = clnt_name.into();
        self
    }

    /// Whether the license status is ACTIVE (case-insensitive)
    pub fn is_active(&self) -> bool {
        self.status_simf.trim().eq_ignore_ascii_case(ACTIVE_STATUS)
    }

    /// Display name: station name, falling back to the client name
    pub fn display_name(&self) -> &str {
        if self.stn_name.trim().is_empty() {
            &self.clnt_name
        } else {
            &self.stn_name
        }
    }
}

/// Station details attached to a matched signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationInfo {
    pub name: String,
    pub callsign: String,
    pub clnt_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub eq_mfr: String,
    pub eq_mdl: String,
    pub emis_class_1: String,
    /// Service class, kept for allocation checks but not part of the payload
    #[serde(skip_serializing, default)]
    pub service: String,
    /// Licensed center frequency in MHz, kept out of the payload
    #[serde(skip_serializing, default)]
    pub freq: f64,
}

impl From<&LicenseRecord> for StationInfo {
    fn from(record: &LicenseRecord) -> Self {
        Self {
            name: record.display_name().to_string(),
            callsign: record.callsign.clone(),
            clnt_name: record.clnt_name.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
            eq_mfr: record.eq_mfr.clone(),
            eq_mdl: record.eq_mdl.clone(),
            emis_class_1: record.emis_class_1.clone(),
            service: record.service.clone(),
            freq: record.freq,
        }
    }
}

/// Convert degrees/minutes/seconds into signed decimal degrees.
///
/// South and west hemispheres are negative; the result is rounded to six
/// decimals. Returns `None` for non-finite input.
pub fn dms_to_decimal(deg: f64, min: f64, sec: f64, direction: char) -> Option<f64> {
    if !(deg.is_finite() && min.is_finite() && sec.is_finite()) {
        return None;
    }
    let mut decimal = deg + min / 60.0 + sec / 3600.0;
    if matches!(direction.to_ascii_uppercase(), 'S' | 'W') {
        decimal = -decimal;
    }
    Some((decimal * 1e6).round() / 1e6)
}
