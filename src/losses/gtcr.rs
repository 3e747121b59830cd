//! Generalized total coding rate (GTCR) loss.
//!
//! Measures the volume spanned by a latent batch through a log-determinant:
//!
//! ```text
//! lambda = D / (B * epsilon)
//! loss   = -0.5 * logdet(lambda * zᵀz + I_D) / scale_factor
//! ```
//!
//! `lambda * zᵀz + I` is always positive-definite for finite `z`, so its
//! log-determinant is non-negative and the loss is non-positive. Minimising
//! the loss therefore expands the representation.

use super::{check_positive, checked_logdet, finite_scalar, Loss, LossError, LossResult};
use crate::linalg::{self, LinalgError};
use ndarray::{Array2, ArrayView2};
use tracing::trace;

const NAME: &str = "gtcr";

/// Log-determinant coding-rate penalty over a (B, D) batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GtcrLoss {
    epsilon: f32,
}

impl GtcrLoss {
    pub const DEFAULT_EPSILON: f32 = 1e-3;

    /// Creates the loss with distortion `epsilon`.
    ///
    /// # Panics
    /// Panics if `epsilon` is not a finite positive number.
    pub fn new(epsilon: f32) -> Self {
        assert!(
            epsilon.is_finite() && epsilon > 0.0,
            "GTCR epsilon must be a finite positive number, got {}",
            epsilon
        );
        Self { epsilon }
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    fn lambda(&self, batch: usize, dim: usize) -> f64 {
        dim as f64 / (batch as f64 * f64::from(self.epsilon))
    }

    fn coding_matrix(&self, z: &ArrayView2<f32>) -> LossResult<(Array2<f64>, f64)> {
        let (batch, dim) = z.dim();
        if batch == 0 || dim == 0 {
            return Err(LossError::EmptyInput(NAME));
        }
        let lambda = self.lambda(batch, dim);
        Ok((linalg::shifted_identity(&linalg::gram(z), lambda), lambda))
    }

    /// Evaluates the loss for batch `z` of shape (B, D).
    ///
    /// # Arguments
    ///
    /// * `z` - Latent batch, one sample per row
    /// * `scale_factor` - Positive divisor of the log-determinant (the batch size in `SparseLoss`, C in `ClusterLoss`)
    ///
    /// # Returns
    ///
    /// `-0.5 · logdet(I + lambda zᵀz) / scale_factor`, which is never positive.
    pub fn evaluate(&self, z: &ArrayView2<f32>, scale_factor: f32) -> LossResult<f32> {
        check_positive("scale_factor", scale_factor)?;
        let (m, lambda) = self.coding_matrix(z)?;
        let logdet = checked_logdet(NAME, &m)?;
        let value = -0.5 * logdet / f64::from(scale_factor);
        trace!(loss = NAME, batch = z.nrows(), dim = z.ncols(), lambda, logdet, value, "evaluated");
        finite_scalar(NAME, value)
    }

    /// Gradient with respect to `z`: `-(lambda / scale_factor) · z · (lambda zᵀz + I)⁻¹`.
    ///
    /// # Returns
    ///
    /// An array shaped like `z`.
    pub fn grad(&self, z: &ArrayView2<f32>, scale_factor: f32) -> LossResult<Array2<f32>> {
        check_positive("scale_factor", scale_factor)?;
        let (m, lambda) = self.coding_matrix(z)?;
        let inv = linalg::inverse_spd(&m).map_err(|e| match e {
            LinalgError::NotPositiveDefinite(order) => {
                LossError::NotPositiveDefinite { loss: NAME, order }
            }
            LinalgError::NotSquare { rows, cols } => LossError::ShapeMismatch {
                context: NAME,
                expected: vec![rows, rows],
                actual: vec![rows, cols],
            },
        })?;
        let coeff = -lambda / f64::from(scale_factor);
        Ok(z.mapv(f64::from).dot(&inv).mapv(|g| (coeff * g) as f32))
    }
}

impl Default for GtcrLoss {
    fn default() -> Self {
        Self::new(Self::DEFAULT_EPSILON)
    }
}

impl Loss for GtcrLoss {
    /// The batch `z` and the positive `scale_factor` dividing the log-determinant.
    type Input<'a> = (ArrayView2<'a, f32>, f32);
    type Output = f32;

    fn forward(&self, (z, scale_factor): Self::Input<'_>) -> LossResult<f32> {
        self.evaluate(&z, scale_factor)
    }

    fn name(&self) -> &str {
        "GtcrLoss"
    }
}
