//! L1 reconstruction loss.

use super::{check_same_shape, finite_scalar, Loss, LossError, LossResult};
use ndarray::{Array, ArrayView, ArrayViewD, Dimension, Zip};
use tracing::trace;

const NAME: &str = "reconstruction";

/// Mean absolute error between a tensor and its reconstruction.
///
/// Formula: `L1 = mean(|y - yhat|)`.
///
/// Both tensors must have exactly the same shape; no broadcasting is done.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconstructionLoss;

impl ReconstructionLoss {
    pub fn new() -> Self {
        Self
    }

    /// Evaluates the loss on two arrays of any (identical) dimensionality.
    ///
    /// # Arguments
    ///
    /// * `y` - Target tensor
    /// * `yhat` - Reconstruction, same shape as `y`
    ///
    /// # Returns
    ///
    /// The mean absolute difference, or `ShapeMismatch` / `EmptyInput`.
    pub fn evaluate<D: Dimension>(
        &self,
        y: &ArrayView<f32, D>,
        yhat: &ArrayView<f32, D>,
    ) -> LossResult<f32> {
        check_same_shape(NAME, y.shape(), yhat.shape())?;
        if y.is_empty() {
            return Err(LossError::EmptyInput(NAME));
        }

        let abs_sum = Zip::from(y)
            .and(yhat)
            .fold(0.0_f64, |acc, &a, &b| acc + (f64::from(a) - f64::from(b)).abs());
        let value = abs_sum / y.len() as f64;
        trace!(loss = NAME, elements = y.len(), value, "evaluated");
        finite_scalar(NAME, value)
    }

    /// Gradient with respect to the reconstruction `yhat`: `sign(yhat - y) / N`.
    ///
    /// The subgradient 0 is used where both tensors agree.
    ///
    /// # Arguments
    ///
    /// * `y` - Target tensor
    /// * `yhat` - Reconstruction the gradient is taken against
    pub fn grad<D: Dimension>(
        &self,
        y: &ArrayView<f32, D>,
        yhat: &ArrayView<f32, D>,
    ) -> LossResult<Array<f32, D>> {
        check_same_shape(NAME, y.shape(), yhat.shape())?;
        if y.is_empty() {
            return Err(LossError::EmptyInput(NAME));
        }

        let n = y.len() as f32;
        Ok(Zip::from(y).and(yhat).map_collect(|&a, &b| {
            if b > a {
                1.0 / n
            } else if b < a {
                -1.0 / n
            } else {
                0.0
            }
        }))
    }
}

impl Loss for ReconstructionLoss {
    type Input<'a> = (ArrayViewD<'a, f32>, ArrayViewD<'a, f32>);
    type Output = f32;

    fn forward(&self, (y, yhat): Self::Input<'_>) -> LossResult<f32> {
        self.evaluate(&y, &yhat)
    }

    fn name(&self) -> &str {
        "ReconstructionLoss"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    #[test]
    fn test_l1_mean_of_absolute_errors() {
        let y = array![[1.0_f32, 2.0], [3.0, 4.0]];
        let yhat = array![[1.5_f32, 2.0], [2.0, 4.0]];
        // |−0.5| + 0 + |1| + 0 = 1.5, mean over 4 elements
        let loss = ReconstructionLoss::new().evaluate(&y.view(), &yhat.view()).unwrap();
        assert_abs_diff_eq!(loss, 0.375, epsilon = 1e-7);
    }

    #[test]
    fn test_l1_identical_inputs_is_zero() {
        let y = array![[0.3_f32, -1.2, 5.0]];
        let loss = ReconstructionLoss::new().evaluate(&y.view(), &y.view()).unwrap();
        assert_eq!(loss, 0.0);
    }

    #[test]
    fn test_l1_shape_mismatch() {
        let y = Array2::<f32>::zeros((2, 3));
        let yhat = Array2::<f32>::zeros((3, 2));
        let err = ReconstructionLoss::new()
            .evaluate(&y.view(), &yhat.view())
            .unwrap_err();
        assert!(matches!(err, LossError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_l1_empty_input() {
        let y = Array2::<f32>::zeros((0, 3));
        let err = ReconstructionLoss::new().evaluate(&y.view(), &y.view()).unwrap_err();
        assert_eq!(err, LossError::EmptyInput("reconstruction"));
    }

    #[test]
    fn test_l1_forward_on_dynamic_views() {
        let y = array![1.0_f32, -1.0, 2.0].into_dyn();
        let yhat = array![0.0_f32, 0.0, 0.0].into_dyn();
        let loss = ReconstructionLoss::new().forward((y.view(), yhat.view())).unwrap();
        assert_abs_diff_eq!(loss, 4.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_l1_grad_signs() {
        let y = array![0.0_f32, 1.0, 2.0];
        let yhat = array![1.0_f32, 1.0, 0.0];
        let g = ReconstructionLoss::new().grad(&y.view(), &yhat.view()).unwrap();
        assert_eq!(g, array![1.0 / 3.0, 0.0, -1.0 / 3.0]);
    }
}
