//! Decomposition of rotations into orthogonal planes.
//!
//! Any `m x m` orthogonal matrix with determinant `+1` can be written as
//! `A = V G(thetas) V^T`, where `V` is orthogonal and `G` is the block-diagonal
//! Givens matrix from [`givens_in`]. Each column pair of `V` spans one
//! invariant plane and `thetas[j]` is the angle `A` turns that plane by. When
//! `m` is odd, the last column of `V` is an axis `A` leaves fixed.
//!
//! The primary method pairs complex-conjugate eigenvalues `e^{±iθ}`. It assumes
//! `A` has no real eigenvalue, which holds for generic random rotations but
//! fails for rotations that fix a direction or turn a plane by exactly a half
//! turn. Such inputs are detected and, depending on [`DegenerateRotation`],
//! either rejected or decomposed through the real Schur form instead.

use std::f64::consts::PI;

use log::warn;
use nalgebra::{DMatrix, DVector, Schur};
use num_complex::Complex64;

use crate::config::{DegenerateRotation, TourConfig, DEFAULT_DEGENERATE_EPS};
use crate::error::{Result, TourError};
use crate::math::linalg::{givens_in, orthonormalize};

/// Maximum distance between an eigenvalue and its partner's conjugate.
pub const PAIRING_EPS: f64 = 1e-8;

/// Maximum `||A - V G V^T||` accepted from either decomposition method.
pub const RECONSTRUCTION_EPS: f64 = 1e-7;

/// Tolerance for recognising Schur blocks as rotations or `±1` entries.
const SCHUR_BLOCK_EPS: f64 = 1e-6;

const MAX_SCHUR_ITERATIONS: usize = 10_000;

/// Rotation expressed as independent turns in mutually orthogonal planes.
#[derive(Debug, Clone)]
pub struct PlaneRotations {
    /// Orthogonal `m x m` basis; columns `2j, 2j+1` span plane `j`, and for
    /// odd `m` the last column is the fixed axis.
    pub basis: DMatrix<f64>,

    /// Angle of each plane in radians.
    pub thetas: DVector<f64>,
}

impl PlaneRotations {
    /// Reassemble `V G(thetas) V^T`.
    #[must_use]
    pub fn to_matrix(&self) -> DMatrix<f64> {
        &self.basis * givens_in(&self.thetas, self.basis.ncols()) * self.basis.transpose()
    }

    /// Frobenius distance between the reassembled rotation and `a`.
    #[must_use]
    pub fn residual(&self, a: &DMatrix<f64>) -> f64 {
        (self.to_matrix() - a).norm()
    }
}

/// Splits rotations into planar components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationDecomposer {
    policy: DegenerateRotation,
    eps: f64,
}

impl Default for RotationDecomposer {
    fn default() -> Self {
        Self::new(DegenerateRotation::default(), DEFAULT_DEGENERATE_EPS)
    }
}

impl RotationDecomposer {
    /// Create a decomposer.
    ///
    /// # Arguments
    ///
    /// * `policy` - What to do when a real eigenvalue is detected
    /// * `eps` - Eigenvalues with `|Im| <= eps` count as real
    #[must_use]
    pub const fn new(policy: DegenerateRotation, eps: f64) -> Self {
        Self { policy, eps }
    }

    /// Create a decomposer from the engine configuration.
    #[must_use]
    pub const fn from_config(config: &TourConfig) -> Self {
        Self::new(config.degenerate_rotation, config.degenerate_eps)
    }

    /// Decompose `a` into planar rotations.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::InvalidInput`] if `a` is not square and non-empty,
    /// and [`TourError::DegenerateRotation`] if `a` has a real eigenvalue
    /// beyond the fixed axis of an odd dimension and the policy is `Reject`,
    /// or if `a` is not a proper rotation at all.
    pub fn decompose(&self, a: &DMatrix<f64>) -> Result<PlaneRotations> {
        let (rows, cols) = a.shape();
        if rows != cols {
            return Err(TourError::invalid_input(format!(
                "rotation must be square, got {rows}x{cols}"
            )));
        }
        if rows == 0 {
            return Err(TourError::invalid_input("cannot decompose an empty rotation"));
        }

        let mut eigenvalues = sorted_eigenvalues(a);
        let missing_axis = if rows % 2 == 1 {
            take_fixed_axis(&mut eigenvalues)
        } else {
            None
        };
        let reason = match missing_axis.or_else(|| self.find_degeneracy(&eigenvalues)) {
            None => {
                let rotations = decompose_eigen(a, &eigenvalues)?;
                let residual = rotations.residual(a);
                if residual <= RECONSTRUCTION_EPS {
                    return Ok(rotations);
                }
                format!("eigenvector planes reproduce the rotation only to {residual:e}")
            }
            Some(reason) => reason,
        };

        match self.policy {
            DegenerateRotation::Reject => Err(TourError::degenerate_rotation(reason)),
            DegenerateRotation::RealSchur => {
                warn!("{reason}; falling back to real Schur decomposition");
                self.decompose_schur(a)
            }
        }
    }

    /// Describe why the sorted eigenvalues cannot be paired, if they can't.
    fn find_degeneracy(&self, eigenvalues: &[Complex64]) -> Option<String> {
        if let Some(real) = eigenvalues.iter().find(|l| l.im.abs() <= self.eps) {
            return Some(format!(
                "real eigenvalue {:.6} has no conjugate partner",
                real.re
            ));
        }

        eigenvalues
            .chunks_exact(2)
            .enumerate()
            .find(|(_, pair)| (pair[0] - pair[1].conj()).norm() > PAIRING_EPS)
            .map(|(plane, pair)| {
                format!(
                    "eigenvalues {} and {} sorted into plane {plane} are not conjugate",
                    pair[0], pair[1]
                )
            })
    }

    /// Read the planes off the real Schur form `A = Q T Q^T`.
    ///
    /// `T` is block diagonal for orthogonal `A`: 2x2 blocks are rotations and
    /// 1x1 blocks are `±1`. Equal-sign 1x1 blocks are paired into planes with
    /// angle 0 (for `+1`) or `π` (for `-1`); odd dimensions keep one `+1`
    /// block as the fixed axis.
    fn decompose_schur(&self, a: &DMatrix<f64>) -> Result<PlaneRotations> {
        let m = a.nrows();
        let schur = Schur::try_new(a.clone(), f64::EPSILON, MAX_SCHUR_ITERATIONS)
            .ok_or_else(|| TourError::degenerate_rotation("real Schur form did not converge"))?;
        let (q, t) = schur.unpack();

        let mut planes: Vec<(usize, usize, f64)> = Vec::with_capacity(m / 2);
        let mut fixed = Vec::new();
        let mut reversed = Vec::new();

        let mut i = 0;
        while i < m {
            if i + 1 < m && t[(i + 1, i)].abs() > self.eps {
                let (cos, sin) = (t[(i, i)], t[(i, i + 1)]);
                if (t[(i + 1, i + 1)] - cos).abs() > SCHUR_BLOCK_EPS
                    || (t[(i + 1, i)] + sin).abs() > SCHUR_BLOCK_EPS
                {
                    return Err(TourError::degenerate_rotation(format!(
                        "Schur block at {i} is not a planar rotation"
                    )));
                }
                planes.push((i, i + 1, sin.atan2(cos)));
                i += 2;
            } else {
                let value = t[(i, i)];
                if (value - 1.0).abs() <= SCHUR_BLOCK_EPS {
                    fixed.push(i);
                } else if (value + 1.0).abs() <= SCHUR_BLOCK_EPS {
                    reversed.push(i);
                } else {
                    return Err(TourError::degenerate_rotation(format!(
                        "real eigenvalue {value:.6} is not ±1; input is not orthogonal"
                    )));
                }
                i += 1;
            }
        }

        if fixed.len() % 2 != m % 2 || reversed.len() % 2 != 0 {
            return Err(TourError::degenerate_rotation(format!(
                "{} eigenvalues at +1 and {} at -1 cannot be paired; determinant is not +1",
                fixed.len(),
                reversed.len()
            )));
        }
        let axis = if m % 2 == 1 { fixed.pop() } else { None };
        planes.extend(fixed.chunks_exact(2).map(|pair| (pair[0], pair[1], 0.0)));
        planes.extend(reversed.chunks_exact(2).map(|pair| (pair[0], pair[1], PI)));

        let mut basis = DMatrix::zeros(m, m);
        let mut thetas = DVector::zeros(m / 2);
        for (j, &(first, second, theta)) in planes.iter().enumerate() {
            basis.set_column(2 * j, &q.column(first));
            basis.set_column(2 * j + 1, &q.column(second));
            thetas[j] = theta;
        }
        if let Some(axis) = axis {
            basis.set_column(m - 1, &q.column(axis));
        }

        let rotations = PlaneRotations { basis, thetas };
        let residual = rotations.residual(a);
        if residual > RECONSTRUCTION_EPS {
            return Err(TourError::degenerate_rotation(format!(
                "Schur planes reproduce the rotation only to {residual:e}"
            )));
        }
        Ok(rotations)
    }
}

/// Eigenvalues ordered by (real part, imaginary part).
fn sorted_eigenvalues(a: &DMatrix<f64>) -> Vec<Complex64> {
    let mut values: Vec<Complex64> = a.complex_eigenvalues().iter().copied().collect();
    values.sort_by(|x, y| x.re.total_cmp(&y.re).then_with(|| x.im.total_cmp(&y.im)));
    values
}

/// Remove the eigenvalue closest to `+1`, which an odd-dimensional rotation
/// must have. Returns why the input cannot be a rotation if there is none.
fn take_fixed_axis(eigenvalues: &mut Vec<Complex64>) -> Option<String> {
    let nearest = eigenvalues
        .iter()
        .enumerate()
        .min_by(|x, y| (*x.1 - 1.0).norm().total_cmp(&(*y.1 - 1.0).norm()))
        .map(|(k, _)| k)?;
    let value = eigenvalues.remove(nearest);
    if (value - 1.0).norm() > SCHUR_BLOCK_EPS {
        Some(format!(
            "odd-dimensional input has no eigenvalue at 1 (nearest {value}); it is not a rotation"
        ))
    } else {
        None
    }
}

/// Build planes from the eigenvectors of the first eigenvalue of every pair.
///
/// For `A v = λ v` with `λ = cos θ + i sin θ`, the real and imaginary parts of
/// `v` span an invariant plane on which `A` acts as the Givens block for `θ`.
fn decompose_eigen(a: &DMatrix<f64>, eigenvalues: &[Complex64]) -> Result<PlaneRotations> {
    let m = a.nrows();
    let complex_a = a.map(|x| Complex64::new(x, 0.0));

    let mut columns = DMatrix::zeros(m, m);
    let mut thetas = DVector::zeros(m / 2);

    for (j, pair) in eigenvalues.chunks_exact(2).enumerate() {
        let lambda = pair[0];
        let vector = eigenvector(&complex_a, lambda)?;
        for (row, value) in vector.iter().enumerate() {
            columns[(row, 2 * j)] = value.re;
            columns[(row, 2 * j + 1)] = value.im;
        }
        thetas[j] = lambda.im.atan2(lambda.re);
    }
    if m % 2 == 1 {
        columns.set_column(m - 1, &fixed_axis(a)?);
    }

    // Numerical eigenvectors are only approximately orthogonal
    let basis = orthonormalize(&columns)?.q;
    Ok(PlaneRotations { basis, thetas })
}

/// Unit vector spanning the null space of `a - I`.
fn fixed_axis(a: &DMatrix<f64>) -> Result<DVector<f64>> {
    let m = a.nrows();
    let shifted = a - DMatrix::<f64>::identity(m, m);

    let svd = shifted.svd(false, true);
    let smallest = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|x, y| x.1.total_cmp(y.1))
        .map(|(k, _)| k)
        .ok_or_else(|| TourError::linalg("SVD returned no singular values"))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| TourError::linalg("SVD returned no right singular vectors"))?;

    Ok(v_t.row(smallest).transpose())
}

/// Unit eigenvector of `a` for `lambda`: the null direction of `a - lambda I`.
fn eigenvector(a: &DMatrix<Complex64>, lambda: Complex64) -> Result<DVector<Complex64>> {
    let mut shifted = a.clone();
    for j in 0..shifted.nrows() {
        shifted[(j, j)] -= lambda;
    }

    let svd = shifted.svd(false, true);
    let smallest = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|x, y| x.1.total_cmp(y.1))
        .map(|(k, _)| k)
        .ok_or_else(|| TourError::linalg("SVD returned no singular values"))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| TourError::linalg("SVD returned no right singular vectors"))?;

    Ok(v_t.row(smallest).adjoint())
}
