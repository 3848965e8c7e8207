//! License registry access
//!
//! The engine only ever reads an immutable [`RegistrySnapshot`]. Updates go
//! through [`RegistryStore`], which swaps in a new snapshot while analyses
//! already holding the old one keep using it.

use super::record::LicenseRecord;
use crate::error::Result;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Default half-width of the candidate pre-filter window in MHz
pub const DEFAULT_CANDIDATE_WINDOW_MHZ: f64 = 0.1;

/// A registry record and its position in registry order
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub record: &'a LicenseRecord,
    /// Index of the record in the registry as it was supplied
    pub order: usize,
}

/// Read access to a license registry
pub trait LicenseRegistry {
    /// All records within a window around `freq_mhz`.
    ///
    /// The window is the registry's own pre-filter width, widened to
    /// `min_window_mhz` when that is larger, so callers never lose records
    /// inside their tolerance.
    fn find_candidates(&self, freq_mhz: f64, min_window_mhz: f64) -> Vec<Candidate<'_>>;
}

/// Frequency-sorted, shareable registry snapshot
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    records: Arc<[LicenseRecord]>,
    order: Arc<[usize]>,
    window_mhz: f64,
}

impl Default for RegistrySnapshot {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl RegistrySnapshot {
    /// Build a snapshot, sorting once by frequency.
    ///
    /// The sort is stable so records sharing a frequency keep their
    /// registry order, and every record remembers its registry position.
    /// Records with a non-finite frequency are dropped.
    pub fn new(records: Vec<LicenseRecord>) -> Self {
        let before = records.len();
        let mut indexed: Vec<(usize, LicenseRecord)> = records
            .into_iter()
            .enumerate()
            .filter(|(_, r)| r.freq.is_finite())
            .collect();
        if indexed.len() != before {
            debug!(dropped = before - indexed.len(), "ignored records without a usable frequency");
        }
        indexed.sort_by(|a, b| a.1.freq.total_cmp(&b.1.freq));
        let (order, records): (Vec<usize>, Vec<LicenseRecord>) = indexed.into_iter().unzip();
        Self {
            records: records.into(),
            order: order.into(),
            window_mhz: DEFAULT_CANDIDATE_WINDOW_MHZ,
        }
    }

    /// Decode a JSON array of records
    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<LicenseRecord> = serde_json::from_str(json)?;
        Ok(Self::new(records))
    }

    /// Load a JSON registry file
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(&content)?;
        info!(path = %path.display(), records = snapshot.len(), "loaded license registry");
        Ok(snapshot)
    }

    /// Set the candidate window half-width
    pub fn with_window(mut self, window_mhz: f64) -> Self {
        if window_mhz.is_finite() && window_mhz > 0.0 {
            self.window_mhz = window_mhz;
        }
        self
    }

    pub fn window_mhz(&self) -> f64 {
        self.window_mhz
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in frequency order
    pub fn records(&self) -> &[LicenseRecord] {
        &self.records
    }

    /// Records back in the order they were supplied
    pub fn in_registry_order(&self) -> Vec<LicenseRecord> {
        let mut pairs: Vec<(usize, &LicenseRecord)> = self.order.iter().copied().zip(self.records.iter()).collect();
        pairs.sort_by_key(|(order, _)| *order);
        pairs.into_iter().map(|(_, r)| r.clone()).collect()
    }

    /// Records with `freq` in `[low, high]`, via binary search
    pub fn range(&self, low: f64, high: f64) -> &[LicenseRecord] {
        let (start, end) = self.bounds(low, high);
        &self.records[start..end]
    }

    fn bounds(&self, low: f64, high: f64) -> (usize, usize) {
        let start = self.records.partition_point(|r| r.freq < low);
        let end = self.records.partition_point(|r| r.freq <= high);
        (start, end.max(start))
    }
}

impl LicenseRegistry for RegistrySnapshot {
    fn find_candidates(&self, freq_mhz: f64, min_window_mhz: f64) -> Vec<Candidate<'_>> {
        let window = self.window_mhz.max(min_window_mhz);
        let (start, end) = self.bounds(freq_mhz - window, freq_mhz + window);
        self.records[start..end]
            .iter()
            .zip(&self.order[start..end])
            .map(|(record, &order)| Candidate { record, order })
            .collect()
    }
}

/// Unsorted registry answered by a full scan.
///
/// Useful as a reference implementation and for tiny registries.
impl LicenseRegistry for [LicenseRecord] {
    fn find_candidates(&self, freq_mhz: f64, min_window_mhz: f64) -> Vec<Candidate<'_>> {
        let window = DEFAULT_CANDIDATE_WINDOW_MHZ.max(min_window_mhz);
        self.iter()
            .enumerate()
            .filter(|(_, r)| (r.freq - freq_mhz).abs() <= window)
            .map(|(order, record)| Candidate { record, order })
            .collect()
    }
}

/// Holder of the current registry snapshot with copy-on-write updates
#[derive(Debug, Default)]
pub struct RegistryStore {
    current: RwLock<RegistrySnapshot>,
}

impl RegistryStore {
    pub fn new(snapshot: RegistrySnapshot) -> Self {
        Self {
            current: RwLock::new(snapshot),
        }
    }

    /// Cheap clone of the current snapshot
    pub fn snapshot(&self) -> RegistrySnapshot {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the registry contents
    pub fn replace(&self, records: Vec<LicenseRecord>) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let window = guard.window_mhz;
        *guard = RegistrySnapshot::new(records).with_window(window);
        info!(records = guard.len(), "license registry replaced");
    }

    /// Add records to the existing contents
    pub fn extend(&self, records: Vec<LicenseRecord>) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut all = guard.in_registry_order();
        all.extend(records);
        let window = guard.window_mhz;
        *guard = RegistrySnapshot::new(all).with_window(window);
        info!(records = guard.len(), "license registry extended");
    }

    /// Remove every record
    pub fn clear(&self) {
        self.replace(Vec::new());
    }

    pub fn len(&self) -> usize {
        self.current.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
