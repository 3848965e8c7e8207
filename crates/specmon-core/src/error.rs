//! Error types for the occupancy engine

use crate::config::ConfigError;
use crate::store::MeasurementId;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, SpecmonError>;

/// Errors raised by the occupancy engine.
///
/// Every variant is a deterministic function of the input; nothing here is
/// worth retrying.
#[derive(Error, Debug)]
pub enum SpecmonError {
    /// Sweep export is structurally broken or carries unparseable numbers
    #[error("malformed sweep input{}: {}", line_suffix(.line), .reason)]
    MalformedInput { line: Option<usize>, reason: String },

    /// Manual threshold or auto margin outside its operating range
    #[error("invalid {what} {value}: must be within {min}..={max}")]
    InvalidThreshold {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Requested band number is not part of the measurement
    #[error("band {0} not found")]
    BandNotFound(u32),

    /// No measurement stored under this id
    #[error("measurement {0} not found")]
    MeasurementNotFound(MeasurementId),

    /// License registry payload could not be decoded
    #[error("invalid license registry: {0}")]
    Registry(#[from] serde_json::Error),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// I/O failure while loading an input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(" at line {}", l)).unwrap_or_default()
}

impl SpecmonError {
    pub(crate) fn malformed(line: Option<usize>, reason: impl Into<String>) -> Self {
        SpecmonError::MalformedInput {
            line,
            reason: reason.into(),
        }
    }

    /// Check if this error denotes a missing band or measurement
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SpecmonError::BandNotFound(_) | SpecmonError::MeasurementNotFound(_)
        )
    }

    /// Check if the caller must correct its input before trying again
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            SpecmonError::MalformedInput { .. } | SpecmonError::InvalidThreshold { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_message_includes_line() {
        let err = SpecmonError::malformed(Some(7), "bad frequency");
        assert_eq!(err.to_string(), "malformed sweep input at line 7: bad frequency");

        let err = SpecmonError::malformed(None, "missing separator declaration");
        assert_eq!(
            err.to_string(),
            "malformed sweep input: missing separator declaration"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(SpecmonError::BandNotFound(3).is_not_found());
        assert!(SpecmonError::MeasurementNotFound(MeasurementId(1)).is_not_found());
        assert!(!SpecmonError::BandNotFound(3).is_input_error());

        let err = SpecmonError::InvalidThreshold {
            what: "manual threshold",
            value: 80.0,
            min: 30.0,
            max: 70.0,
        };
        assert!(err.is_input_error());
        assert_eq!(
            err.to_string(),
            "invalid manual threshold 80: must be within 30..=70"
        );
    }
}
