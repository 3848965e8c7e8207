//! # Spectrum Sweep Simulation
//!
//! Synthetic inputs for the occupancy engine: sweep measurements with a
//! noisy floor and configurable carriers, and license registries that line
//! up with them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use specmon_sim::prelude::*;
//!
//! let config = SweepConfig { seed: Some(42), ..SweepConfig::default() };
//! let plans = config.bands.clone();
//! let sweep = SweepGenerator::new(config).generate("sim.csv")?;
//!
//! let licenses = RegistryGenerator::new(RegistryConfig::default()).generate(&plans);
//! ```

pub mod generator;
pub mod registry;

// Re-exports
pub use generator::{BandPlan, Carrier, SweepConfig, SweepGenerator};
pub use registry::{RegistryConfig, RegistryGenerator};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::generator::{BandPlan, Carrier, SweepConfig, SweepGenerator};
    pub use crate::registry::{RegistryConfig, RegistryGenerator};
}
