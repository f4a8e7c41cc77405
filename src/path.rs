//! Rotation paths between two projection frames.
//!
//! A [`FramePath`] from `Fa` to `Fz` is described by a basis `B` of the space
//! both frames live in, a set of plane angles `thetas` and the coordinates
//! `Wa` of `Fa` in that basis:
//!
//! ```text
//! Fa = B Wa
//! Fz = B G(thetas) Wa
//! F(tau) = B G(tau) Wa,  tau moving from 0 to thetas
//! ```
//!
//! Every intermediate `F(tau)` is orthonormal because `B`, `G(tau)` and `Wa`
//! are, so the projection stays a rigid rotation throughout.
//!
//! When `p >= 2d`, `B` spans the `2d` dimensions of `span(Fa, Fz)`. Otherwise
//! the two frames cannot be given disjoint planes, and `B` is a basis of all
//! of `R^p`; for odd `p` its last column is an axis the path leaves fixed.
//!
//! # Example
//!
//! ```
//! use grand_tour::math::random_frame;
//! use grand_tour::PathInterpolator;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let fa = random_frame(6, 2, &mut rng)?;
//! let fz = random_frame(6, 2, &mut rng)?;
//!
//! let path = PathInterpolator::default().interpolate(&fa, &fz, &mut rng)?;
//! assert!((path.target_frame() - &fz).norm() < 1e-6);
//! # Ok::<(), grand_tour::TourError>(())
//! ```

use nalgebra::{DMatrix, DVector};
use rand::Rng;

use crate::config::TourConfig;
use crate::error::{Result, TourError};
use crate::math::linalg::{gaussian_matrix, givens_in, orthonormalize, Frame};
use crate::math::rotation::RotationDecomposer;

/// Parameters of a rotation path between two frames.
#[derive(Debug, Clone)]
pub struct FramePath {
    /// Orthonormal `p x m` basis, `m = min(p, 2d)`.
    basis: DMatrix<f64>,

    /// Total angle turned in each plane over the path.
    thetas: DVector<f64>,

    /// Coordinates of the source frame in `basis` (`m x d`).
    source_coords: DMatrix<f64>,
}

impl FramePath {
    /// Basis `B`.
    #[must_use]
    pub const fn basis(&self) -> &DMatrix<f64> {
        &self.basis
    }

    /// Plane angles of the full path, one per plane of `B`.
    #[must_use]
    pub const fn thetas(&self) -> &DVector<f64> {
        &self.thetas
    }

    /// Source coordinates `Wa`.
    #[must_use]
    pub const fn source_coords(&self) -> &DMatrix<f64> {
        &self.source_coords
    }

    /// Ambient dimension `p`.
    #[must_use]
    pub fn ambient_dim(&self) -> usize {
        self.basis.nrows()
    }

    /// Projection dimension `d`.
    #[must_use]
    pub fn projection_dim(&self) -> usize {
        self.source_coords.ncols()
    }

    /// Euclidean length of the path in angle space, `||thetas||`.
    #[must_use]
    pub fn angular_length(&self) -> f64 {
        self.thetas.norm()
    }

    /// Plane angles at `fraction` of the way along the path.
    #[must_use]
    pub fn angles_at(&self, fraction: f64) -> DVector<f64> {
        &self.thetas * fraction
    }

    /// Coordinates `G(tau) Wa` of the frame at angles `tau`.
    #[must_use]
    pub fn coords_at(&self, tau: &DVector<f64>) -> DMatrix<f64> {
        givens_in(tau, self.basis.ncols()) * &self.source_coords
    }

    /// Frame `B G(tau) Wa`.
    #[must_use]
    pub fn frame_at(&self, tau: &DVector<f64>) -> Frame {
        &self.basis * self.coords_at(tau)
    }

    /// The frame the path starts from.
    #[must_use]
    pub fn source_frame(&self) -> Frame {
        &self.basis * &self.source_coords
    }

    /// The frame the path arrives at.
    #[must_use]
    pub fn target_frame(&self) -> Frame {
        self.frame_at(&self.thetas)
    }
}

/// Builds [`FramePath`]s between pairs of frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathInterpolator {
    decomposer: RotationDecomposer,
}

impl PathInterpolator {
    /// Create an interpolator around a rotation decomposer.
    #[must_use]
    pub const fn new(decomposer: RotationDecomposer) -> Self {
        Self { decomposer }
    }

    /// Create an interpolator from the engine configuration.
    #[must_use]
    pub const fn from_config(config: &TourConfig) -> Self {
        Self::new(RotationDecomposer::from_config(config))
    }

    /// Build a rotation path from `fa` to `fz`.
    ///
    /// The rotation taking `fa` onto `fz` is not unique; the part of it acting
    /// outside the span of the two frames is completed at random from `rng`,
    /// so repeated calls give different, equally valid paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the frames differ in shape or are empty, if the
    /// connecting rotation is degenerate and the decomposer rejects it, or if
    /// `p == d` and the frames have opposite orientations, which no rotation
    /// of `R^p` can reconcile.
    pub fn interpolate<R: Rng>(&self, fa: &Frame, fz: &Frame, rng: &mut R) -> Result<FramePath> {
        if fa.shape() != fz.shape() {
            return Err(TourError::frame_shape(fa.shape(), fz.shape()));
        }
        let (p, d) = fa.shape();
        if d == 0 || d > p {
            return Err(TourError::invalid_input(format!(
                "cannot interpolate {p}x{d} frames"
            )));
        }

        // Orthonormal basis B' with Fa = B' Wa' and Fz = B' Wz', Wa' = [I; 0]
        let (span, source_coords, target_coords) = if p >= 2 * d {
            plane_pair_span(fa, fz)?
        } else {
            full_span(fa, fz, rng)?
        };
        let m = span.ncols();

        // Any rotation whose first d columns are Wz' maps Wa' onto Wz'
        let mut completion = gaussian_matrix(m, m, rng);
        completion.columns_mut(0, d).copy_from(&target_coords);
        let mut rotation = orthonormalize(&completion)?.q;
        if rotation.determinant() < 0.0 {
            if m == d {
                return Err(TourError::degenerate_rotation(format!(
                    "{p}x{d} frames with opposite orientations are not connected by a rotation"
                )));
            }
            rotation.column_mut(m - 1).neg_mut();
        }

        let planes = self.decomposer.decompose(&rotation)?;

        Ok(FramePath {
            basis: span * &planes.basis,
            source_coords: planes.basis.transpose() * source_coords,
            thetas: planes.thetas,
        })
    }
}

type Span = (DMatrix<f64>, DMatrix<f64>, DMatrix<f64>);

/// `2d`-column basis of `[Fa | Fz]` with both frames' coordinates.
fn plane_pair_span(fa: &Frame, fz: &Frame) -> Result<Span> {
    let (p, d) = fa.shape();
    let mut stacked = DMatrix::zeros(p, 2 * d);
    stacked.columns_mut(0, d).copy_from(fa);
    stacked.columns_mut(d, d).copy_from(fz);

    let qr = orthonormalize(&stacked)?;
    let source = qr.r.columns(0, d).into_owned();
    let target = qr.r.columns(d, d).into_owned();
    Ok((qr.q, source, target))
}

/// Basis of all of `R^p` extending `Fa` at random, with both frames'
/// coordinates.
fn full_span<R: Rng>(fa: &Frame, fz: &Frame, rng: &mut R) -> Result<Span> {
    let (p, d) = fa.shape();
    let mut stacked = DMatrix::zeros(p, p);
    stacked.columns_mut(0, d).copy_from(fa);
    stacked
        .columns_mut(d, p - d)
        .copy_from(&gaussian_matrix(p, p - d, rng));

    let qr = orthonormalize(&stacked)?;
    let source = qr.r.columns(0, d).into_owned();
    let target = qr.q.transpose() * fz;
    Ok((qr.q, source, target))
}
