//! Measurement storage
//!
//! The engine itself is stateless; the service keeps ingested sweeps and
//! the latest result per band in a [`MeasurementStore`].

use crate::analysis::OccupancyResult;
use crate::sweep::Measurement;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Identifier assigned to an ingested measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeasurementId(pub u64);

impl fmt::Display for MeasurementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Storage for measurements and their latest analysis results
pub trait MeasurementStore: Send + Sync {
    /// Store a measurement, returning its new id
    fn insert(&self, measurement: Measurement) -> MeasurementId;

    fn get(&self, id: MeasurementId) -> Option<Arc<Measurement>>;

    /// Ids of every stored measurement, ascending
    fn ids(&self) -> Vec<MeasurementId>;

    /// Remember the latest result for a (measurement, band) pair
    fn save_result(&self, id: MeasurementId, band_number: u32, result: Arc<OccupancyResult>);

    fn latest_result(&self, id: MeasurementId, band_number: u32) -> Option<Arc<OccupancyResult>>;

    /// Drop a measurement and its results; returns whether it existed
    fn remove(&self, id: MeasurementId) -> bool;
}

#[derive(Debug)]
struct Entry {
    measurement: Arc<Measurement>,
    results: HashMap<u32, Arc<OccupancyResult>>,
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<MeasurementId, Entry>>,
    next_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MeasurementStore for InMemoryStore {
    fn insert(&self, measurement: Measurement) -> MeasurementId {
        let id = MeasurementId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let entry = Entry {
            measurement: Arc::new(measurement),
            results: HashMap::new(),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, entry);
        id
    }

    fn get(&self, id: MeasurementId) -> Option<Arc<Measurement>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .map(|e| Arc::clone(&e.measurement))
    }

    fn ids(&self) -> Vec<MeasurementId> {
        let mut ids: Vec<MeasurementId> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }

    fn save_result(&self, id: MeasurementId, band_number: u32, result: Arc<OccupancyResult>) {
        if let Some(entry) = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&id)
        {
            entry.results.insert(band_number, result);
        }
    }

    fn latest_result(&self, id: MeasurementId, band_number: u32) -> Option<Arc<OccupancyResult>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .and_then(|e| e.results.get(&band_number).cloned())
    }

    fn remove(&self, id: MeasurementId) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn measurement(name: &str) -> Measurement {
        Measurement::new(name, BTreeMap::new(), None, Vec::new()).unwrap()
    }

    fn result() -> OccupancyResult {
        OccupancyResult {
            total_channels: 0,
            occupied_channels: 0,
            occupancy_percentage: 0.0,
            noise_floor: 0.0,
            threshold_used: 50.0,
            occupied_list: Vec::new(),
            top_signals: Vec::new(),
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = InMemoryStore::new();
        let a = store.insert(measurement("a.csv"));
        let b = store.insert(measurement("b.csv"));
        assert_ne!(a, b);
        assert_eq!(store.get(a).unwrap().filename(), "a.csv");
        assert_eq!(store.ids(), vec![a, b]);
        assert!(store.get(MeasurementId(99)).is_none());
    }

    #[test]
    fn test_latest_result_per_band() {
        let store = InMemoryStore::new();
        let id = store.insert(measurement("a.csv"));
        assert!(store.latest_result(id, 1).is_none());

        store.save_result(id, 1, Arc::new(result()));
        let mut second = result();
        second.threshold_used = 60.0;
        store.save_result(id, 1, Arc::new(second));

        assert_eq!(store.latest_result(id, 1).unwrap().threshold_used, 60.0);
        assert!(store.latest_result(id, 2).is_none());
    }

    #[test]
    fn test_results_for_unknown_id_ignored() {
        let store = InMemoryStore::new();
        store.save_result(MeasurementId(7), 1, Arc::new(result()));
        assert!(store.latest_result(MeasurementId(7), 1).is_none());
    }

    #[test]
    fn test_remove() {
        let store = InMemoryStore::new();
        let id = store.insert(measurement("a.csv"));
        assert!(store.remove(id));
        assert!(!store.remove(id));
        assert!(store.is_empty());
    }
}
