//! Sweep export parser
//!
//! Reads the receiver's text export: a `sep=<c>` declaration followed by
//! three sections split on that separator.
//!
//! ```text
//! sep=^
//! Task ID^Station Name^Location (lat)^Location (lon)
//! 1924^Bandar Lampung^-5.357882^105.216545
//!
//! Band #^Start Frequency (MHz)^Stop Frequency (MHz)^Bandwidth (kHz)
//! 1^87.000000^108.000000^50.00000
//!
//! Channel No.^Frequency (MHz)^Maximum Field Strength (dBuV/m)^Average Field Strength (dBuV/m)
//! 1^87.000000^44^36
//! ```
//!
//! Channels form one flat list and are assigned to every band whose
//! frequency range contains them.

use super::model::{Band, Channel, Location, Measurement};
use crate::error::{Result, SpecmonError};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Marker that opens the bands section
pub const BANDS_MARKER: &str = "Band #";
/// Marker that opens the channels section
pub const CHANNELS_MARKER: &str = "Channel No.";
/// Timestamp layout used by the `Start Time` / `Stop Time` metadata fields
pub const TIME_FORMAT: &str = "%m/%d/%Y %I:%M:%S %p";

const LAT_KEY: &str = "Location (lat)";
const LON_KEY: &str = "Location (lon)";
const START_KEY: &str = "Start Time";
const STOP_KEY: &str = "Stop Time";

/// Non-fatal findings while parsing
#[derive(Debug, Clone, PartialEq)]
pub enum ParseWarning {
    /// Channels of this band were not in ascending order and were re-sorted
    Reordered { band_number: u32 },
    /// A well-known metadata field could not be interpreted
    InvalidMetadata { key: String, value: String },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::Reordered { band_number } => {
                write!(f, "band {}: channels were out of order and have been re-sorted", band_number)
            }
            ParseWarning::InvalidMetadata { key, value } => {
                write!(f, "metadata field '{}' has unusable value '{}'", key, value)
            }
        }
    }
}

/// Parsed measurement plus the warnings collected on the way
#[derive(Debug, Clone)]
pub struct ParsedSweep {
    pub measurement: Measurement,
    pub warnings: Vec<ParseWarning>,
}

/// Stateless sweep export parser
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepParser;

struct BandRow {
    line: usize,
    band_number: u32,
    start_freq: f64,
    stop_freq: f64,
    bandwidth_khz: Option<f64>,
}

impl SweepParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse raw export text into a measurement
    pub fn parse(&self, filename: &str, text: &str) -> Result<ParsedSweep> {
        let lines: Vec<&str> = text.lines().collect();

        let first = lines
            .first()
            .map(|l| l.trim_start_matches('\u{feff}').trim())
            .unwrap_or("");
        let sep = first
            .strip_prefix("sep=")
            .ok_or_else(|| SpecmonError::malformed(Some(1), "missing separator declaration"))?;
        if sep.is_empty() {
            return Err(SpecmonError::malformed(Some(1), "empty separator declaration"));
        }

        let bands_start = lines
            .iter()
            .position(|l| l.contains(BANDS_MARKER))
            .ok_or_else(|| SpecmonError::malformed(None, "missing required section: bands"))?;
        let channels_start = lines[bands_start..]
            .iter()
            .position(|l| l.contains(CHANNELS_MARKER))
            .map(|p| p + bands_start)
            .ok_or_else(|| SpecmonError::malformed(None, "missing required section: channels"))?;

        let mut warnings = Vec::new();

        let metadata = Self::parse_metadata(&lines[1..bands_start], sep)?;
        let location = Self::parse_location(&metadata, &mut warnings);
        let start_time = Self::parse_time(&metadata, START_KEY, &mut warnings);
        let stop_time = Self::parse_time(&metadata, STOP_KEY, &mut warnings);

        let band_rows = Self::parse_bands(&lines[bands_start + 1..channels_start], bands_start + 2, sep)?;
        let channel_rows = Self::parse_channels(&lines[channels_start + 1..], channels_start + 2, sep)?;

        debug!(
            bands = band_rows.len(),
            channels = channel_rows.len(),
            "parsed sweep sections"
        );

        // Every channel must fall into at least one band
        for (line, channel) in &channel_rows {
            if !band_rows
                .iter()
                .any(|b| channel.frequency >= b.start_freq && channel.frequency <= b.stop_freq)
            {
                return Err(SpecmonError::malformed(
                    Some(*line),
                    format!("channel frequency {} MHz lies outside every band", channel.frequency),
                ));
            }
        }

        let mut bands = Vec::with_capacity(band_rows.len());
        for row in &band_rows {
            let mut channels: Vec<Channel> = channel_rows
                .iter()
                .filter(|(_, c)| c.frequency >= row.start_freq && c.frequency <= row.stop_freq)
                .map(|(_, c)| *c)
                .collect();

            if channels.is_empty() {
                return Err(SpecmonError::malformed(
                    Some(row.line),
                    format!("band {} references no channels", row.band_number),
                ));
            }

            let ordered = channels.windows(2).all(|w| w[0].frequency < w[1].frequency);
            if !ordered {
                channels.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));
                if let Some(w) = channels.windows(2).find(|w| w[0].frequency == w[1].frequency) {
                    return Err(SpecmonError::malformed(
                        None,
                        format!(
                            "band {}: duplicate channel frequency {} MHz",
                            row.band_number, w[0].frequency
                        ),
                    ));
                }
                let warning = ParseWarning::Reordered {
                    band_number: row.band_number,
                };
                warn!("{}", warning);
                warnings.push(warning);
            }

            let band = Band::new(
                row.band_number,
                row.start_freq,
                row.stop_freq,
                row.bandwidth_khz,
                channels,
            )
            .map_err(|e| with_line(e, row.line))?;
            bands.push(band);
        }

        let measurement = Measurement::new(filename, metadata, location, bands)?
            .with_times(start_time, stop_time);

        Ok(ParsedSweep {
            measurement,
            warnings,
        })
    }

    fn parse_metadata(lines: &[&str], sep: &str) -> Result<BTreeMap<String, String>> {
        let mut rows = lines
            .iter()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty());

        let (_, header) = rows
            .next()
            .ok_or_else(|| SpecmonError::malformed(None, "missing required section: metadata"))?;
        let (idx, values) = rows.next().ok_or_else(|| {
            SpecmonError::malformed(Some(2), "metadata header has no value line")
        })?;
        if let Some((extra, _)) = rows.next() {
            return Err(SpecmonError::malformed(
                Some(extra + 2),
                "unexpected line in metadata section",
            ));
        }
        debug!(line = idx + 2, "metadata values");

        let values: Vec<&str> = values.split(sep).map(str::trim).collect();
        Ok(header
            .split(sep)
            .map(str::trim)
            .zip(values)
            .filter(|(k, _)| !k.is_empty())
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect())
    }

    fn parse_location(metadata: &BTreeMap<String, String>, warnings: &mut Vec<ParseWarning>) -> Option<Location> {
        let mut coord = |key: &str| -> Option<f64> {
            let raw = metadata.get(key)?;
            match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => Some(v),
                _ => {
                    warnings.push(ParseWarning::InvalidMetadata {
                        key: key.to_string(),
                        value: raw.clone(),
                    });
                    None
                }
            }
        };
        let lat = coord(LAT_KEY);
        let lon = coord(LON_KEY);
        Some(Location { lat: lat?, lon: lon? })
    }

    fn parse_time(
        metadata: &BTreeMap<String, String>,
        key: &str,
        warnings: &mut Vec<ParseWarning>,
    ) -> Option<NaiveDateTime> {
        let raw = metadata.get(key)?;
        match NaiveDateTime::parse_from_str(raw, TIME_FORMAT) {
            Ok(t) => Some(t),
            Err(_) => {
                warnings.push(ParseWarning::InvalidMetadata {
                    key: key.to_string(),
                    value: raw.clone(),
                });
                None
            }
        }
    }

    fn parse_bands(lines: &[&str], first_line: usize, sep: &str) -> Result<Vec<BandRow>> {
        let mut rows = Vec::new();
        for (i, raw) in lines.iter().enumerate() {
            let line = first_line + i;
            if raw.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = raw.split(sep).map(str::trim).collect();
            if fields.len() < 3 {
                return Err(SpecmonError::malformed(
                    Some(line),
                    format!("band row needs at least 3 fields, found {}", fields.len()),
                ));
            }
            let bandwidth_khz = match fields.get(3) {
                Some(f) if !f.is_empty() => Some(parse_number(f, line, "bandwidth")?),
                _ => None,
            };
            rows.push(BandRow {
                line,
                band_number: parse_index(fields[0], line, "band number")?,
                start_freq: parse_number(fields[1], line, "start frequency")?,
                stop_freq: parse_number(fields[2], line, "stop frequency")?,
                bandwidth_khz,
            });
        }

        if rows.is_empty() {
            return Err(SpecmonError::malformed(None, "bands section has no rows"));
        }
        Ok(rows)
    }

    fn parse_channels(lines: &[&str], first_line: usize, sep: &str) -> Result<Vec<(usize, Channel)>> {
        let mut rows = Vec::new();
        for (i, raw) in lines.iter().enumerate() {
            let line = first_line + i;
            if raw.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = raw.split(sep).map(str::trim).collect();
            if fields.len() < 4 {
                return Err(SpecmonError::malformed(
                    Some(line),
                    format!("channel row needs 4 fields, found {}", fields.len()),
                ));
            }
            let channel = Channel {
                channel_no: parse_index(fields[0], line, "channel number")?,
                frequency: parse_number(fields[1], line, "frequency")?,
                max_field_strength: parse_number(fields[2], line, "maximum field strength")?,
                avg_field_strength: parse_number(fields[3], line, "average field strength")?,
            };
            if channel.max_field_strength < channel.avg_field_strength {
                return Err(SpecmonError::malformed(
                    Some(line),
                    format!(
                        "maximum field strength {} below average {}",
                        channel.max_field_strength, channel.avg_field_strength
                    ),
                ));
            }
            rows.push((line, channel));
        }

        if rows.is_empty() {
            return Err(SpecmonError::malformed(None, "channels section has no rows"));
        }
        Ok(rows)
    }
}

fn parse_number(field: &str, line: usize, what: &str) -> Result<f64> {
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(SpecmonError::malformed(
            Some(line),
            format!("{} '{}' is not a number", what, field),
        )),
    }
}

fn parse_index(field: &str, line: usize, what: &str) -> Result<u32> {
    field.parse::<u32>().map_err(|_| {
        SpecmonError::malformed(Some(line), format!("{} '{}' is not an integer", what, field))
    })
}

fn with_line(err: SpecmonError, line: usize) -> SpecmonError {
    match err {
        SpecmonError::MalformedInput { line: None, reason } => SpecmonError::MalformedInput {
            line: Some(line),
            reason,
        },
        other => other,
    }
}
