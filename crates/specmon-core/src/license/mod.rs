//! License Correlation
//!
//! Registry records, the frequency-sorted snapshot the engine reads from and
//! the matcher that attaches stations to occupied channels.

pub mod matcher;
pub mod record;
pub mod registry;

pub use matcher::{resolve_tolerance, LicenseMatcher, MatchedSignal};
pub use record::{dms_to_decimal, LicenseRecord, StationInfo, ACTIVE_STATUS};
pub use registry::{Candidate, LicenseRegistry, RegistrySnapshot, RegistryStore, DEFAULT_CANDIDATE_WINDOW_MHZ};
