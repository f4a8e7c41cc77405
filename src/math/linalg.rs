//! Linear algebra utilities for frame construction.
//!
//! This module provides the sign-stabilized QR factorization every other
//! component builds on, plus frame validation, Givens block matrices and
//! Gaussian sampling, all on nalgebra dynamic matrices.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::error::{Result, TourError};

/// Diagonal entries of `R` below this are considered negative and flipped.
pub const SIGN_EPS: f64 = 1e-10;

/// A projection basis: a `p x d` matrix with orthonormal columns.
pub type Frame = DMatrix<f64>;

/// Result of a sign-stabilized QR factorization.
#[derive(Debug, Clone)]
pub struct QrFactors {
    /// Orthonormal columns, same shape as the input.
    pub q: DMatrix<f64>,

    /// Upper triangular with a non-negative diagonal.
    pub r: DMatrix<f64>,
}

impl QrFactors {
    /// Reassemble `Q * R`.
    #[must_use]
    pub fn product(&self) -> DMatrix<f64> {
        &self.q * &self.r
    }
}

/// Thin QR factorization with a deterministic sign convention.
///
/// For every column `j` with `R[j, j] < -SIGN_EPS`, column `j` of `Q` and row
/// `j` of `R` are negated, so `A = Q R` still holds and the diagonal of `R` is
/// non-negative. Without this, nearly identical inputs can come back with
/// flipped basis directions.
///
/// The factorization is Householder based, so `Q` stays orthonormal and
/// `A = Q R` stays exact even when `A` is rank deficient; only the
/// uniqueness of the basis is lost in that case.
///
/// # Errors
///
/// Returns an error if `a` is empty or has more columns than rows.
pub fn orthonormalize(a: &DMatrix<f64>) -> Result<QrFactors> {
    let (rows, cols) = a.shape();
    if cols == 0 || rows == 0 {
        return Err(TourError::invalid_input("cannot orthonormalize an empty matrix"));
    }
    if rows < cols {
        return Err(TourError::invalid_input(format!(
            "cannot orthonormalize {cols} columns in {rows} dimensions"
        )));
    }

    let qr = a.clone().qr();
    let mut q = qr.q();
    let mut r = qr.r();

    for j in 0..cols {
        if r[(j, j)] < -SIGN_EPS {
            q.column_mut(j).neg_mut();
            r.row_mut(j).neg_mut();
        }
    }

    Ok(QrFactors { q, r })
}

/// Frobenius norm of `F^T F - I`.
#[must_use]
pub fn orthonormality_error(frame: &DMatrix<f64>) -> f64 {
    let d = frame.ncols();
    (frame.transpose() * frame - DMatrix::<f64>::identity(d, d)).norm()
}

/// Check that a frame has orthonormal columns.
///
/// # Errors
///
/// Returns [`TourError::NonOrthonormalFrame`] if `||F^T F - I|| >= tolerance`
/// (or is NaN).
pub fn check_frame(frame: &DMatrix<f64>, tolerance: f64) -> Result<()> {
    let error = orthonormality_error(frame);
    if error < tolerance {
        Ok(())
    } else {
        Err(TourError::non_orthonormal(error, tolerance))
    }
}

/// Block-diagonal matrix of planar rotations.
///
/// Block `j` occupies rows and columns `2j, 2j+1` and equals
/// `[[cos t, sin t], [-sin t, cos t]]` for `t = thetas[j]`.
#[must_use]
pub fn givens(thetas: &DVector<f64>) -> DMatrix<f64> {
    givens_in(thetas, 2 * thetas.len())
}

/// [`givens`] embedded in a `dim x dim` identity.
///
/// Rows and columns past the last block are left fixed, which is how odd
/// dimensions keep their unpaired axis.
#[must_use]
pub fn givens_in(thetas: &DVector<f64>, dim: usize) -> DMatrix<f64> {
    let mut g = DMatrix::identity(dim, dim);

    for (j, &theta) in thetas.iter().enumerate() {
        let (sin, cos) = theta.sin_cos();
        let i = 2 * j;
        g[(i, i)] = cos;
        g[(i, i + 1)] = sin;
        g[(i + 1, i)] = -sin;
        g[(i + 1, i + 1)] = cos;
    }

    g
}

/// Matrix of independent standard normal samples.
pub fn gaussian_matrix<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> DMatrix<f64> {
    DMatrix::from_fn(rows, cols, |_, _| rng.sample::<f64, _>(StandardNormal))
}

/// Uniformly random `p x d` frame (orthonormalized Gaussian matrix).
///
/// # Errors
///
/// Returns an error if `d` is zero or exceeds `p`.
pub fn random_frame<R: Rng>(p: usize, d: usize, rng: &mut R) -> Result<Frame> {
    if d == 0 || d > p {
        return Err(TourError::invalid_input(format!(
            "cannot draw a {p}x{d} frame"
        )));
    }
    Ok(orthonormalize(&gaussian_matrix(p, d, rng))?.q)
}
