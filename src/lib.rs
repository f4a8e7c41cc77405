//! Grand Tour Library
//!
//! Animated rotations of high-dimensional data through low-dimensional
//! projections.
//!
//! A tour shows an `n x p` data matrix through a sequence of `d`-dimensional
//! projection frames, rotating smoothly from one frame to the next so the
//! viewer can follow every point across the change of view.
//!
//! # Features
//!
//! - **Rigid interpolation**: Frames move along geodesic-like paths built from
//!   independent planar rotations, so every intermediate frame is orthonormal
//! - **Pluggable targets**: Random, preset, axis-perturbation and custom frame
//!   providers
//! - **Reproducible**: Every random source is an injectable seeded RNG
//! - **Degeneracy aware**: Rotations with real eigenvalues are detected and
//!   either rejected or decomposed through the real Schur form
//!
//! # Quick Start
//!
//! ```
//! use grand_tour::{Duration, FrameProvider, TourConfig, TourEngine};
//! use nalgebra::DMatrix;
//!
//! // 100 points in 6 dimensions
//! let data = DMatrix::from_fn(100, 6, |i, j| ((i + 1) as f64 * (j + 2) as f64).sin());
//!
//! // Grand tour in 2D, 30 steps per transition
//! let provider = FrameProvider::random_seeded(6, 2, Duration::fixed(30)?, 42)?;
//! let mut tour = TourEngine::new(data, provider, TourConfig::interactive())?;
//!
//! // One projection per animation tick
//! let projection = tour.advance()?;
//! assert_eq!(projection.shape(), (100, 2));
//! # Ok::<(), grand_tour::TourError>(())
//! ```
//!
//! # Providers
//!
//! | Provider | Constructor | Frames |
//! |----------|-------------|--------|
//! | Random | [`FrameProvider::random`] | Uniformly random |
//! | Fixed sequence | [`FrameProvider::fixed_sequence`] | Preset, cyclic |
//! | Perturbation | [`FrameProvider::perturbation`] | Subsets of named axes |
//! | Custom | [`FrameProvider::custom`] | User closure |

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::many_single_char_names)]

pub mod config;
pub mod engine;
pub mod error;
pub mod math;
pub mod path;
pub mod provider;

// Re-exports for convenient access
pub use config::{DegenerateRotation, Duration, TourConfig};
pub use engine::{TourEngine, TourState};
pub use error::{Result, TourError};
pub use math::{Frame, PlaneRotations, RotationDecomposer};
pub use path::{FramePath, PathInterpolator};
pub use provider::{
    AxisPerturbation, CustomFrames, FrameGenerator, FrameProposal, FrameProvider, FrameSequence,
    RandomFrames,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
