//! Dense linear-algebra kernels for the coding-rate losses.
//!
//! Batches arrive as `f32` views; Gram matrices are accumulated in `f64` and
//! factorised with `nalgebra`'s Cholesky decomposition. Every matrix handed to
//! [`logdet_spd`] has the form `I + c·AᵀA` with `c ≥ 0`, so a failed
//! factorisation means the inputs were non-finite or the weights negative.

use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinalgError {
    #[error("matrix is not square: {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    #[error("matrix of order {0} is not positive-definite")]
    NotPositiveDefinite(usize),
}

pub type LinalgResult<T> = Result<T, LinalgError>;

/// Gram matrix `zᵀz` of a (B, D) batch, shape (D, D).
pub fn gram(z: &ArrayView2<f32>) -> Array2<f64> {
    let z = z.mapv(f64::from);
    z.t().dot(&z)
}

/// Weighted scatter `hᵀ · diag(w) · h` of a (B, D) batch, shape (D, D).
///
/// `weights` holds one weight per sample (row of `h`).
pub fn weighted_gram(h: &ArrayView2<f32>, weights: &ArrayView1<f32>) -> Array2<f64> {
    let h = h.mapv(f64::from);
    let w = weights.mapv(f64::from).insert_axis(Axis(1));
    let weighted = &h * &w;
    h.t().dot(&weighted)
}

/// Returns `I + scale · m`.
pub fn shifted_identity(m: &Array2<f64>, scale: f64) -> Array2<f64> {
    let mut out = m * scale;
    out.diag_mut().mapv_inplace(|x| x + 1.0);
    out
}

fn to_dmatrix(m: &Array2<f64>) -> LinalgResult<DMatrix<f64>> {
    let (rows, cols) = m.dim();
    if rows != cols {
        return Err(LinalgError::NotSquare { rows, cols });
    }
    Ok(DMatrix::from_fn(rows, cols, |i, j| m[[i, j]]))
}

/// Log-determinant of a symmetric positive-definite matrix.
///
/// Computed as `2 · Σ ln L_ii` from the Cholesky factor, which stays finite
/// where the plain determinant would overflow.
pub fn logdet_spd(m: &Array2<f64>) -> LinalgResult<f64> {
    let order = m.nrows();
    let chol = to_dmatrix(m)?
        .cholesky()
        .ok_or(LinalgError::NotPositiveDefinite(order))?;
    let diag = chol.l_dirty().diagonal();
    Ok(2.0 * diag.iter().map(|d| d.ln()).sum::<f64>())
}

/// Inverse of a symmetric positive-definite matrix.
pub fn inverse_spd(m: &Array2<f64>) -> LinalgResult<Array2<f64>> {
    let order = m.nrows();
    let inv = to_dmatrix(m)?
        .cholesky()
        .ok_or(LinalgError::NotPositiveDefinite(order))?
        .inverse();
    Ok(Array2::from_shape_fn((order, order), |(i, j)| inv[(i, j)]))
}
