//! # Spectrum Occupancy Engine
//!
//! This crate analyzes radio-spectrum sweep exports: how much of a band is
//! occupied, which occupants hold a license, and which signals look wrong.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   OccupancyService                      │
//! │        ingest · analyze · auto_threshold · ...          │
//! └─────────────────────────────────────────────────────────┘
//!          │                      │                  │
//!          ▼                      ▼                  ▼
//!   ┌─────────────┐     ┌──────────────────┐  ┌─────────────┐
//!   │ SweepParser │     │ OccupancyAnalyzer│  │RegistryStore│
//!   │             │     │ noise → threshold│  │  snapshot   │
//!   │             │     │ → classify → match──▶ (sorted,Arc)│
//!   │             │     │ → anomalies      │  │             │
//!   └─────────────┘     └──────────────────┘  └─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use specmon_core::prelude::*;
//!
//! let service = OccupancyService::default();
//! service.load_registry(Path::new("licenses.json"))?;
//!
//! let id = service.ingest_file(Path::new("sweep.csv"))?.id;
//! let result = service.analyze(id, &AnalysisRequest::auto(1, 10.0))?;
//! println!("{}", result.to_text());
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod license;
pub mod service;
pub mod store;
pub mod sweep;

// Re-exports
pub use analysis::{
    Anomaly, AnomalyKind, AutoThreshold, BandComparison, BandStats, EmissionPeak, OccupancyAnalyzer,
    OccupancyResult, Severity, ThresholdMode,
};
pub use config::{ConfigError, SpecmonConfig};
pub use error::{Result, SpecmonError};
pub use license::{LicenseRecord, LicenseRegistry, MatchedSignal, RegistrySnapshot, RegistryStore, StationInfo};
pub use service::{AnalysisRequest, Ingested, OccupancyService};
pub use store::{InMemoryStore, MeasurementId, MeasurementStore};
pub use sweep::{Band, Channel, Location, Measurement, SweepParser, SweepWriter};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::analysis::{
        AnomalyDetector, BandAllocation, NoiseFloorEstimator, OccupancyClassifier, PeakDetector,
        ResultAssembler, ThresholdResolver,
    };
    pub use crate::license::LicenseMatcher;
    pub use crate::{
        AnalysisRequest, Band, Channel, Measurement, MeasurementId, OccupancyResult, OccupancyService,
        RegistrySnapshot, Result, SpecmonConfig, SpecmonError, SweepParser, ThresholdMode,
    };
    pub use std::path::Path;
}
