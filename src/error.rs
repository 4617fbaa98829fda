//! Error types shared by every engine.

use thiserror::Error;

/// Broad classification of an [`ErosionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller passed inputs that violate an engine precondition.
    InvalidArgument,
}

/// Errors that can occur before an engine touches its input field.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErosionError {
    #[error("invalid argument: '{field}' has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        field: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("invalid argument: talus must be strictly positive, got {0}")]
    NonPositiveTalus(f32),
    #[error("invalid argument: iteration count must be strictly positive")]
    NonPositiveIterations,
    #[error("invalid argument: grid of shape {shape:?} is smaller than the {min}x{min} minimum")]
    GridTooSmall { min: usize, shape: (usize, usize) },
    #[error("invalid argument: '{name}' {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl ErosionError {
    /// Returns the error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErosionError::ShapeMismatch { .. }
            | ErosionError::NonPositiveTalus(_)
            | ErosionError::NonPositiveIterations
            | ErosionError::GridTooSmall { .. }
            | ErosionError::InvalidParameter { .. } => ErrorKind::InvalidArgument,
        }
    }

    pub(crate) fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        ErosionError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ErosionError>;

/// Fails with [`ErosionError::NonPositiveIterations`] when `iterations` is zero.
pub(crate) fn ensure_iterations(iterations: u32) -> Result<()> {
    if iterations == 0 {
        return Err(ErosionError::NonPositiveIterations);
    }
    Ok(())
}

/// Fails unless `value` lies in the closed range `[min, max]` (NaN always fails).
pub(crate) fn ensure_in_range(name: &'static str, value: f32, min: f32, max: f32) -> Result<()> {
    if !(value >= min && value <= max) {
        return Err(ErosionError::parameter(
            name,
            format!("must lie in [{min}, {max}], got {value}"),
        ));
    }
    Ok(())
}
