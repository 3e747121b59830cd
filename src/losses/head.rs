//! Per-cluster compression loss.
//!
//! For every cluster `c` the features are weighted by the soft assignment
//! column `yhat[:, c]` and the coding rate of the weighted covariance is
//! measured:
//!
//! ```text
//! intensity_c = sum_b yhat[b, c] + 1e-8
//! scale_c     = D / (0.1 * intensity_c)
//! Σ_c         = hᵀ · diag(yhat[:, c]) · h
//! loss        = (1/C) · sum_c intensity_c · logdet(I + scale_c Σ_c) / (2B)
//! ```
//!
//! The `1e-8` floor keeps empty clusters finite; they contribute almost
//! nothing because their term is weighted by their own mass.

use super::{check_same_shape, checked_logdet, finite_scalar, Loss, LossError, LossResult};
use crate::linalg;
use ndarray::{ArrayView2, Axis};
use tracing::trace;

const NAME: &str = "head";
const INTENSITY_FLOOR: f64 = 1e-8;
const DISTORTION: f64 = 0.1;

/// Coding-rate compression of each soft cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadLoss {
    nb_classes: usize,
}

impl HeadLoss {
    /// # Panics
    /// Panics if `nb_classes` is zero.
    pub fn new(nb_classes: usize) -> Self {
        assert!(nb_classes > 0, "HeadLoss needs at least one class");
        Self { nb_classes }
    }

    pub fn nb_classes(&self) -> usize {
        self.nb_classes
    }

    /// Evaluates the loss for features `h` (B, D) and soft assignments `yhat` (B, C).
    ///
    /// # Arguments
    ///
    /// * `h` - Per-sample features
    /// * `yhat` - Soft cluster assignments; column `c` weights the samples of cluster `c`
    pub fn evaluate(&self, h: &ArrayView2<f32>, yhat: &ArrayView2<f32>) -> LossResult<f32> {
        let (batch, dim) = h.dim();
        if batch == 0 || dim == 0 {
            return Err(LossError::EmptyInput(NAME));
        }
        check_same_shape(NAME, &[batch, self.nb_classes], yhat.shape())?;

        let mut total = 0.0_f64;
        for (cluster, assign) in yhat.axis_iter(Axis(1)).enumerate() {
            let intensity = assign.iter().map(|&w| f64::from(w)).sum::<f64>() + INTENSITY_FLOOR;
            let scale = dim as f64 / (intensity * DISTORTION);
            let covariance = linalg::weighted_gram(h, &assign);
            let logdet = checked_logdet(NAME, &linalg::shifted_identity(&covariance, scale))?;
            trace!(loss = NAME, cluster, intensity, logdet, "cluster term");
            total += intensity * logdet / (2.0 * batch as f64);
        }
        finite_scalar(NAME, total / self.nb_classes as f64)
    }
}

impl Loss for HeadLoss {
    /// Features `h` and soft assignments `yhat`.
    type Input<'a> = (ArrayView2<'a, f32>, ArrayView2<'a, f32>);
    type Output = f32;

    fn forward(&self, (h, yhat): Self::Input<'_>) -> LossResult<f32> {
        self.evaluate(&h, &yhat)
    }

    fn name(&self) -> &str {
        "HeadLoss"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    #[test]
    fn test_head_single_sample_single_class() {
        // B = 1, D = 2, C = 1, yhat = 1:
        // intensity = 1 + 1e-8, Σ = h hᵀ with ‖h‖² = 2, one eigenvalue 1 + scale*2.
        let h = array![[1.0_f32, 1.0]];
        let yhat = array![[1.0_f32]];
        let intensity = 1.0 + 1e-8;
        let scale = 2.0 / (intensity * 0.1);
        let expected = intensity * (1.0 + scale * 2.0_f64).ln() / 2.0;
        let loss = HeadLoss::new(1).evaluate(&h.view(), &yhat.view()).unwrap();
        assert_relative_eq!(loss as f64, expected, max_relative = 1e-6);
    }

    #[test]
    fn test_head_half_weights_closed_form() {
        // B = 2, D = 1, C = 1, yhat = 0.5: intensity = 1, scale = 10,
        // Σ = 0.5 + 0.5 = 1, loss = ln(11) / 4
        let h = array![[1.0_f32], [1.0]];
        let yhat = array![[0.5_f32], [0.5]];
        let loss = HeadLoss::new(1).evaluate(&h.view(), &yhat.view()).unwrap();
        assert_relative_eq!(loss as f64, 11.0_f64.ln() / 4.0, max_relative = 1e-6);
    }

    #[test]
    fn test_head_fractional_assignments_match_direct_logdet() {
        let h = array![[1.0_f32, 0.5], [-0.5, 2.0], [0.3, -1.2]];
        let yhat = array![[0.25_f32, 0.75], [0.6, 0.4], [0.1, 0.9]];
        let (batch, dim) = h.dim();

        let mut expected = 0.0_f64;
        for c in 0..2 {
            let weights: Vec<f64> = (0..batch).map(|b| f64::from(yhat[[b, c]])).collect();
            let intensity = weights.iter().sum::<f64>() + 1e-8;
            let scale = dim as f64 / (0.1 * intensity);
            let m = nalgebra::DMatrix::from_fn(dim, dim, |i, j| {
                let scatter: f64 = (0..batch)
                    .map(|b| weights[b] * f64::from(h[[b, i]]) * f64::from(h[[b, j]]))
                    .sum();
                f64::from(u8::from(i == j)) + scale * scatter
            });
            expected += intensity * m.determinant().ln() / (2.0 * batch as f64);
        }
        expected /= 2.0;

        let loss = HeadLoss::new(2).evaluate(&h.view(), &yhat.view()).unwrap();
        assert_relative_eq!(loss as f64, expected, max_relative = 1e-5);
    }

    #[test]
    fn test_head_empty_cluster_contributes_nothing() {
        let h = array![[1.0_f32, 0.0], [0.0, 1.0]];
        let full = array![[1.0_f32], [1.0]];
        let with_empty = array![[1.0_f32, 0.0], [1.0, 0.0]];
        let one = HeadLoss::new(1).evaluate(&h.view(), &full.view()).unwrap();
        let two = HeadLoss::new(2).evaluate(&h.view(), &with_empty.view()).unwrap();
        // the second cluster adds ~0, averaging over C = 2 halves the total
        assert_relative_eq!(two, one / 2.0, max_relative = 1e-5);
    }

    #[test]
    fn test_head_rejects_wrong_class_count() {
        let h = Array2::<f32>::ones((3, 2));
        let yhat = Array2::<f32>::ones((3, 4));
        let err = HeadLoss::new(3).evaluate(&h.view(), &yhat.view()).unwrap_err();
        assert!(matches!(err, LossError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_head_rejects_mismatched_batch() {
        let h = Array2::<f32>::ones((3, 2));
        let yhat = Array2::<f32>::ones((2, 2));
        assert!(HeadLoss::new(2).evaluate(&h.view(), &yhat.view()).is_err());
    }

    #[test]
    fn test_head_is_non_negative_for_probabilities() {
        let h = array![[0.2_f32, -0.4, 1.0], [1.5, 0.3, -0.2], [0.0, 0.7, 0.7]];
        let yhat = array![[0.7_f32, 0.3], [0.1, 0.9], [0.5, 0.5]];
        let loss = HeadLoss::new(2).evaluate(&h.view(), &yhat.view()).unwrap();
        assert!(loss >= 0.0);
    }
}
