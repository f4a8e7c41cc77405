//! Error types for tour construction and frame interpolation.
//!
//! Errors fall into three families: configuration errors (rejected before a
//! tour exists), geometry errors (a provider handed back a frame that is not
//! a valid projection basis) and degenerate rotations (the rotation between
//! two frames could not be split into orthogonal planes).

use thiserror::Error;

/// Main error type for grand tour operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TourError {
    /// Invalid construction parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A frame failed the orthonormality check `||F^T F - I|| < tolerance`.
    #[error("Frame is not orthonormal: ||F^T F - I|| = {error:e} (tolerance {tolerance:e})")]
    NonOrthonormalFrame { error: f64, tolerance: f64 },

    /// A frame does not have the shape the tour was built with.
    #[error("Frame shape mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    FrameShape {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    /// The rotation could not be decomposed into conjugate-paired planes.
    #[error("Degenerate rotation: {0}")]
    DegenerateRotation(String),

    /// Input validation errors for the linear algebra helpers.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Linear algebra computation failed.
    #[error("Linear algebra error: {0}")]
    LinalgError(String),
}

/// Result type alias for grand tour operations.
pub type Result<T> = std::result::Result<T, TourError>;

impl TourError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a non-orthonormal frame error.
    #[must_use]
    pub const fn non_orthonormal(error: f64, tolerance: f64) -> Self {
        Self::NonOrthonormalFrame { error, tolerance }
    }

    /// Create a frame shape error.
    #[must_use]
    pub const fn frame_shape(expected: (usize, usize), actual: (usize, usize)) -> Self {
        Self::FrameShape {
            expected_rows: expected.0,
            expected_cols: expected.1,
            rows: actual.0,
            cols: actual.1,
        }
    }

    /// Create a degenerate rotation error.
    #[must_use]
    pub fn degenerate_rotation(msg: impl Into<String>) -> Self {
        Self::DegenerateRotation(msg.into())
    }

    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a linear algebra error.
    #[must_use]
    pub fn linalg(msg: impl Into<String>) -> Self {
        Self::LinalgError(msg.into())
    }

    /// Whether this error was raised while validating construction parameters.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfig(_))
    }

    /// Whether a provider returned an invalid frame.
    #[must_use]
    pub const fn is_geometry(&self) -> bool {
        matches!(
            self,
            Self::NonOrthonormalFrame { .. } | Self::FrameShape { .. }
        )
    }

    /// Whether the rotation decomposer hit a real eigenvalue it could not pair.
    #[must_use]
    pub const fn is_degenerate_rotation(&self) -> bool {
        matches!(self, Self::DegenerateRotation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TourError::frame_shape((5, 2), (4, 2));
        let msg = err.to_string();
        assert!(msg.contains("5x2"));
        assert!(msg.contains("4x2"));

        let err = TourError::non_orthonormal(0.5, 1e-6);
        assert!(err.to_string().contains("not orthonormal"));
    }

    #[test]
    fn test_error_classification() {
        assert!(TourError::invalid_config("neither steps nor speed").is_configuration());
        assert!(TourError::non_orthonormal(1.0, 1e-6).is_geometry());
        assert!(TourError::frame_shape((3, 2), (3, 1)).is_geometry());
        assert!(TourError::degenerate_rotation("eigenvalue 1").is_degenerate_rotation());

        let err = TourError::linalg("schur did not converge");
        assert!(!err.is_configuration());
        assert!(!err.is_geometry());
        assert!(!err.is_degenerate_rotation());
    }

    #[test]
    fn test_error_constructors() {
        let _ = TourError::invalid_input("matrix has more columns than rows");
        let _ = TourError::linalg("svd produced no right singular vectors");
    }
}
