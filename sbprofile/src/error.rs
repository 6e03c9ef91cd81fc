//! Error type shared by every profile, combinator and renderer operation.

use shape_math::{MathError, SingularMatrixError, TableError};
use thiserror::Error;

/// Failures raised by profile construction, evaluation and shooting.
///
/// None of these are transient: they describe a capability the profile does
/// not have, a malformed input, or an exhausted bounded resource.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProfileError {
    /// The profile has no implementation of the requested operation
    #[error("{operation} is not supported by {profile}")]
    Unsupported {
        operation: &'static str,
        profile: &'static str,
    },

    /// A shape-parameter cache would grow beyond its bound
    #[error("{cache} cache is full ({capacity} entries)")]
    CacheFull {
        cache: &'static str,
        capacity: usize,
    },

    /// A shape parameter is out of range
    #[error("invalid {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// Photon buffers of different lengths were combined
    #[error("photon buffers differ in length ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },

    /// The operation divides by a total flux of zero
    #[error("{operation} is undefined for a profile with zero flux")]
    ZeroFlux { operation: &'static str },

    /// The transform grid needed for this profile exceeds the configured bound
    #[error("FFT size {requested} exceeds maximum {maximum}")]
    FftTooLarge { requested: usize, maximum: usize },

    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Singular(#[from] SingularMatrixError),

    /// Configuration could not be parsed or is inconsistent
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<TableError> for ProfileError {
    fn from(err: TableError) -> Self {
        ProfileError::Math(MathError::Table(err))
    }
}

impl ProfileError {
    pub(crate) fn invalid(name: &'static str, value: f64, reason: &'static str) -> Self {
        ProfileError::InvalidParameter {
            name,
            value,
            reason,
        }
    }
}

/// Reject non-finite or non-positive shape parameters.
pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64, ProfileError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ProfileError::invalid(name, value, "must be positive and finite"))
    }
}

/// Reject non-finite values.
pub(crate) fn require_finite(name: &'static str, value: f64) -> Result<f64, ProfileError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProfileError::invalid(name, value, "must be finite"))
    }
}
