//! Occupancy service
//!
//! Facade over the engine for callers that work with measurement ids:
//! ingest a sweep once, then analyze, preview thresholds, list channels and
//! compare sweeps by id. Each analysis reads one registry snapshot taken at
//! the start of the call, so registry updates never affect a running
//! analysis.

use crate::analysis::{
    AutoThreshold, BandComparison, BandStats, EmissionPeak, OccupancyAnalyzer, OccupancyResult,
    PeakDetector, ThresholdMode,
};
use crate::config::SpecmonConfig;
use crate::error::{Result, SpecmonError};
use crate::license::{LicenseRecord, RegistrySnapshot, RegistryStore};
use crate::store::{InMemoryStore, MeasurementId, MeasurementStore};
use crate::sweep::{Channel, Measurement, ParseWarning, SweepParser};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// One analysis request.
///
/// Everything that shapes the result is spelled out here; the service keeps
/// no per-session selection state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub band_number: u32,
    pub threshold: ThresholdMode,
}

impl AnalysisRequest {
    pub fn manual(band_number: u32, threshold: f64) -> Self {
        Self {
            band_number,
            threshold: ThresholdMode::Manual { threshold },
        }
    }

    pub fn auto(band_number: u32, margin_db: f64) -> Self {
        Self {
            band_number,
            threshold: ThresholdMode::Auto { margin_db },
        }
    }
}

/// Outcome of ingesting a sweep export
#[derive(Debug, Clone)]
pub struct Ingested {
    pub id: MeasurementId,
    pub warnings: Vec<ParseWarning>,
}

/// Measurement-id based facade over the analysis engine
pub struct OccupancyService<S: MeasurementStore = InMemoryStore> {
    config: SpecmonConfig,
    analyzer: OccupancyAnalyzer,
    peaks: PeakDetector,
    parser: SweepParser,
    registry: RegistryStore,
    store: S,
}

impl OccupancyService<InMemoryStore> {
    /// Service backed by an in-memory store
    pub fn new(config: SpecmonConfig) -> Self {
        Self::with_store(config, InMemoryStore::new())
    }
}

impl Default for OccupancyService<InMemoryStore> {
    fn default() -> Self {
        Self::new(SpecmonConfig::default())
    }
}

impl<S: MeasurementStore> OccupancyService<S> {
    pub fn with_store(config: SpecmonConfig, store: S) -> Self {
        let registry = RegistryStore::new(
            RegistrySnapshot::default().with_window(config.matcher.candidate_window_mhz),
        );
        Self {
            analyzer: OccupancyAnalyzer::from_config(&config),
            peaks: PeakDetector::from_config(&config.peaks),
            parser: SweepParser::new(),
            registry,
            store,
            config,
        }
    }

    pub fn config(&self) -> &SpecmonConfig {
        &self.config
    }

    pub fn registry(&self) -> &RegistryStore {
        &self.registry
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replace the registry with the records of a JSON file
    pub fn load_registry(&self, path: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let records: Vec<LicenseRecord> = serde_json::from_str(&content)?;
        let count = records.len();
        self.registry.replace(records);
        info!(path = %path.display(), records = count, "registry loaded");
        Ok(count)
    }

    /// Parse and store a sweep export
    pub fn ingest(&self, filename: &str, text: &str) -> Result<Ingested> {
        let parsed = self.parser.parse(filename, text)?;
        for warning in &parsed.warnings {
            warn!(file = filename, "{}", warning);
        }
        let bands = parsed.measurement.bands().len();
        let id = self.store.insert(parsed.measurement);
        info!(id = %id, file = filename, bands, "measurement ingested");
        Ok(Ingested {
            id,
            warnings: parsed.warnings,
        })
    }

    /// Read and ingest a sweep export file
    pub fn ingest_file(&self, path: &Path) -> Result<Ingested> {
        let text = std::fs::read_to_string(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.ingest(&filename, &text)
    }

    pub fn measurement(&self, id: MeasurementId) -> Result<Arc<Measurement>> {
        self.store.get(id).ok_or(SpecmonError::MeasurementNotFound(id))
    }

    /// Analyze one band and remember the result as the latest for it
    pub fn analyze(&self, id: MeasurementId, request: &AnalysisRequest) -> Result<Arc<OccupancyResult>> {
        let measurement = self.measurement(id)?;
        let band = measurement.band(request.band_number)?;

        let snapshot = self.registry.snapshot();
        let result = Arc::new(self.analyzer.analyze(band, request.threshold, &snapshot)?);
        self.store.save_result(id, request.band_number, Arc::clone(&result));
        Ok(result)
    }

    /// Latest stored result for a band, if it was analyzed before
    pub fn latest_result(&self, id: MeasurementId, band_number: u32) -> Option<Arc<OccupancyResult>> {
        self.store.latest_result(id, band_number)
    }

    /// Noise floor and auto threshold for a band, without classifying
    pub fn auto_threshold(&self, id: MeasurementId, band_number: u32, margin_db: f64) -> Result<AutoThreshold> {
        let measurement = self.measurement(id)?;
        self.analyzer.auto_threshold(measurement.band(band_number)?, margin_db)
    }

    /// Raw channels of one band, or of the whole sweep
    pub fn list_channels(&self, id: MeasurementId, band_number: Option<u32>) -> Result<Vec<Channel>> {
        let measurement = self.measurement(id)?;
        match band_number {
            Some(n) => Ok(measurement.band(n)?.channels().to_vec()),
            None => Ok(measurement.all_channels()),
        }
    }

    /// Distinct emission peaks above the resolved threshold
    pub fn detect_peaks(
        &self,
        id: MeasurementId,
        band_number: u32,
        threshold: ThresholdMode,
    ) -> Result<Vec<EmissionPeak>> {
        let measurement = self.measurement(id)?;
        let band = measurement.band(band_number)?;
        let resolved = self.analyzer.resolver().resolve(band, threshold)?;
        Ok(self.peaks.detect(band, resolved.threshold))
    }

    pub fn band_stats(&self, id: MeasurementId, band_number: u32) -> Result<BandStats> {
        let measurement = self.measurement(id)?;
        let band = measurement.band(band_number)?;
        Ok(BandStats::compute(band, self.analyzer.resolver().estimator()))
    }

    /// Compare a band of one sweep against the same range of another
    pub fn compare(&self, id: MeasurementId, other: MeasurementId, band_number: u32) -> Result<BandComparison> {
        let current = self.measurement(id)?;
        let other = self.measurement(other)?;
        BandComparison::compute(&current, &other, band_number)
    }
}
