//! Configuration for tour engines and transition timing.
//!
//! This module provides [`TourConfig`], which holds the engine-level tunables,
//! and [`Duration`], which decides how many steps each transition between two
//! frames takes.
//!
//! # Example
//!
//! ```
//! use grand_tour::{Duration, TourConfig};
//!
//! // Default configuration: no pause at frames, real Schur fallback
//! let config = TourConfig::default();
//!
//! // Exactly one of the two timing parameters must be given
//! let duration = Duration::from_options(Some(40), None)?;
//! assert_eq!(duration, Duration::Fixed(40));
//! assert!(Duration::from_options(Some(40), Some(0.05)).is_err());
//! # Ok::<(), grand_tour::TourError>(())
//! ```

use crate::error::{Result, TourError};

/// Default tolerance for `||F^T F - I||` when checking provider frames.
pub const DEFAULT_FRAME_TOLERANCE: f64 = 1e-6;

/// Default threshold below which an eigenvalue's imaginary part counts as real.
pub const DEFAULT_DEGENERATE_EPS: f64 = 1e-8;

/// How many steps a transition between two frames takes.
///
/// Transitions are interpolated linearly in step count, so `Fixed` gives every
/// transition the same duration regardless of how far apart the frames are,
/// while `SpeedLimited` scales the step count with the angular length of the
/// path to keep the apparent rotation speed constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Duration {
    /// A constant number of steps per transition.
    Fixed(usize),
    /// Radians of path length covered per step.
    SpeedLimited(f64),
}

impl Duration {
    /// A fixed number of steps per transition.
    ///
    /// # Errors
    ///
    /// Returns an error if `steps` is zero.
    pub fn fixed(steps: usize) -> Result<Self> {
        let duration = Self::Fixed(steps);
        duration.validate()?;
        Ok(duration)
    }

    /// A constant rotation speed in radians per step.
    ///
    /// # Errors
    ///
    /// Returns an error if `speed` is not a positive finite number.
    pub fn speed_limited(speed: f64) -> Result<Self> {
        let duration = Self::SpeedLimited(speed);
        duration.validate()?;
        Ok(duration)
    }

    /// Build a duration from the two mutually exclusive timing options.
    ///
    /// # Errors
    ///
    /// Returns an error if both or neither of `num_steps` and `rot_speed` are
    /// set, or if the one that is set is out of range.
    pub fn from_options(num_steps: Option<usize>, rot_speed: Option<f64>) -> Result<Self> {
        match (num_steps, rot_speed) {
            (Some(steps), None) => Self::fixed(steps),
            (None, Some(speed)) => Self::speed_limited(speed),
            (Some(_), Some(_)) => Err(TourError::invalid_config(
                "exactly one of num_steps or rot_speed must be set, got both",
            )),
            (None, None) => Err(TourError::invalid_config(
                "exactly one of num_steps or rot_speed must be set, got neither",
            )),
        }
    }

    /// Validate the duration parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the step count is zero or the speed is not a
    /// positive finite number.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Fixed(0) => Err(TourError::invalid_config("num_steps must be positive")),
            Self::SpeedLimited(speed) if !(speed.is_finite() && speed > 0.0) => Err(
                TourError::invalid_config("rot_speed must be a positive finite number"),
            ),
            _ => Ok(()),
        }
    }

    /// Resolve to a concrete step count for a path of the given angular length.
    ///
    /// Speed-limited durations round `angular_length / speed` and never
    /// return fewer than one step.
    #[must_use]
    pub fn resolve(&self, angular_length: f64) -> usize {
        match *self {
            Self::Fixed(steps) => steps.max(1),
            Self::SpeedLimited(speed) => {
                let steps = (angular_length / speed).round();
                if steps.is_finite() && steps >= 1.0 {
                    steps as usize
                } else {
                    1
                }
            }
        }
    }
}

/// What to do when a rotation has real eigenvalues and the eigen-based
/// decomposition cannot pair it into planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DegenerateRotation {
    /// Fail with [`TourError::DegenerateRotation`].
    Reject,
    /// Decompose via the real Schur form, pairing `+1` eigenvalues into
    /// zero-angle planes and `-1` eigenvalues into half-turn planes.
    #[default]
    RealSchur,
}

/// Engine-level configuration.
///
/// # Parameters
///
/// - `pause_steps`: Steps to hold at each arrival frame (0 disables pausing).
/// - `frame_tolerance`: Bound on `||F^T F - I||` for provider frames.
/// - `degenerate_eps`: Imaginary-part threshold for detecting real eigenvalues.
/// - `degenerate_rotation`: Policy when a real eigenvalue is detected.
#[derive(Debug, Clone, PartialEq)]
pub struct TourConfig {
    /// Number of ticks to rest at each reached frame.
    pub pause_steps: usize,

    /// Orthonormality tolerance for frames returned by providers.
    pub frame_tolerance: f64,

    /// Eigenvalues with `|Im| <= degenerate_eps` are treated as real.
    pub degenerate_eps: f64,

    /// Handling of rotations with real eigenvalues.
    pub degenerate_rotation: DegenerateRotation,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            pause_steps: 0,
            frame_tolerance: DEFAULT_FRAME_TOLERANCE,
            degenerate_eps: DEFAULT_DEGENERATE_EPS,
            degenerate_rotation: DegenerateRotation::RealSchur,
        }
    }
}

impl TourConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any tolerance is not a positive finite number.
    pub fn validate(&self) -> Result<()> {
        if !(self.frame_tolerance.is_finite() && self.frame_tolerance > 0.0) {
            return Err(TourError::invalid_config(
                "frame_tolerance must be a positive finite number",
            ));
        }
        if !(self.degenerate_eps.is_finite() && self.degenerate_eps >= 0.0) {
            return Err(TourError::invalid_config(
                "degenerate_eps must be a non-negative finite number",
            ));
        }
        Ok(())
    }

    /// Preset for interactive viewing: rest briefly at every frame so the
    /// viewer can take in each projection.
    #[must_use]
    pub fn interactive() -> Self {
        Self {
            pause_steps: 30,
            ..Self::default()
        }
    }

    /// Preset that surfaces every degenerate rotation as an error instead of
    /// falling back to the real Schur form.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            degenerate_rotation: DegenerateRotation::Reject,
            ..Self::default()
        }
    }

    /// Set the number of pause steps at each frame.
    #[must_use]
    pub const fn with_pause_steps(mut self, steps: usize) -> Self {
        self.pause_steps = steps;
        self
    }

    /// Set the frame orthonormality tolerance.
    #[must_use]
    pub const fn with_frame_tolerance(mut self, tolerance: f64) -> Self {
        self.frame_tolerance = tolerance;
        self
    }

    /// Set the degenerate rotation policy.
    #[must_use]
    pub const fn with_degenerate_rotation(mut self, policy: DegenerateRotation) -> Self {
        self.degenerate_rotation = policy;
        self
    }

    /// Set the threshold for detecting real eigenvalues.
    #[must_use]
    pub const fn with_degenerate_eps(mut self, eps: f64) -> Self {
        self.degenerate_eps = eps;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TourConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pause_steps, 0);
        assert_eq!(config.frame_tolerance, 1e-6);
        assert_eq!(config.degenerate_rotation, DegenerateRotation::RealSchur);
    }

    #[test]
    fn test_presets() {
        let interactive = TourConfig::interactive();
        assert!(interactive.validate().is_ok());
        assert!(interactive.pause_steps > 0);

        let strict = TourConfig::strict();
        assert!(strict.validate().is_ok());
        assert_eq!(strict.degenerate_rotation, DegenerateRotation::Reject);
    }

    #[test]
    fn test_validation() {
        let mut config = TourConfig::default();

        config.frame_tolerance = 0.0;
        assert!(config.validate().is_err());

        config.frame_tolerance = f64::NAN;
        assert!(config.validate().is_err());

        config.frame_tolerance = 1e-6;
        config.degenerate_eps = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builder_pattern() {
        let config = TourConfig::strict()
            .with_pause_steps(5)
            .with_frame_tolerance(1e-8)
            .with_degenerate_eps(1e-10);
        assert_eq!(config.pause_steps, 5);
        assert_eq!(config.frame_tolerance, 1e-8);
        assert_eq!(config.degenerate_eps, 1e-10);
        assert_eq!(config.degenerate_rotation, DegenerateRotation::Reject);

        let relaxed = config.with_degenerate_rotation(DegenerateRotation::RealSchur);
        assert_eq!(relaxed.degenerate_rotation, DegenerateRotation::RealSchur);
        assert_eq!(relaxed.pause_steps, 5);
    }

    #[test]
    fn test_duration_exclusive_options() {
        assert_eq!(
            Duration::from_options(Some(12), None).unwrap(),
            Duration::Fixed(12)
        );
        assert_eq!(
            Duration::from_options(None, Some(0.1)).unwrap(),
            Duration::SpeedLimited(0.1)
        );

        let both = Duration::from_options(Some(12), Some(0.1)).unwrap_err();
        assert!(both.is_configuration());
        let neither = Duration::from_options(None, None).unwrap_err();
        assert!(neither.is_configuration());
    }

    #[test]
    fn test_duration_ranges() {
        assert!(Duration::fixed(0).is_err());
        assert!(Duration::speed_limited(0.0).is_err());
        assert!(Duration::speed_limited(-0.5).is_err());
        assert!(Duration::speed_limited(f64::INFINITY).is_err());
        assert!(Duration::Fixed(0).validate().is_err());
    }

    #[test]
    fn test_duration_resolve() {
        assert_eq!(Duration::Fixed(10).resolve(3.0), 10);

        let speed = Duration::SpeedLimited(0.1);
        assert_eq!(speed.resolve(1.0), 10);
        assert_eq!(speed.resolve(1.04), 10);
        assert_eq!(speed.resolve(1.06), 11);

        // Very short paths still take one step
        assert_eq!(speed.resolve(0.0), 1);
        assert_eq!(speed.resolve(0.01), 1);
    }
}
