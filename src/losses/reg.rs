//! Smooth L0 surrogate for stochastic gates.
//!
//! A gate with relaxation `u` is open with probability `Φ((u + 0.5) / sigma)`,
//! where `Φ` is the standard normal CDF. Averaging that probability over all
//! gates gives a differentiable count of active features:
//!
//! ```text
//! loss = mean( 0.5 - 0.5 * erf( -(u + 0.5) / (sqrt(2) * sigma) ) )
//! ```

use super::{finite_scalar, Loss, LossError, LossResult};
use ndarray::{Array, ArrayView, ArrayViewD, Dimension};
use statrs::function::erf::erf;
use std::f64::consts::{PI, SQRT_2};
use tracing::trace;

const NAME: &str = "reg";

/// Gate-sparsity regulariser. Output lies in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegLoss {
    sigma: f32,
}

impl RegLoss {
    pub const DEFAULT_SIGMA: f32 = 0.5;

    /// # Panics
    /// Panics if `sigma` is not a finite positive number.
    pub fn new(sigma: f32) -> Self {
        assert!(
            sigma.is_finite() && sigma > 0.0,
            "RegLoss sigma must be a finite positive number, got {}",
            sigma
        );
        Self { sigma }
    }

    pub fn sigma(&self) -> f32 {
        self.sigma
    }

    /// Evaluates the loss on a relaxation tensor of any shape.
    ///
    /// # Arguments
    ///
    /// * `u` - Gate relaxation variables; a gate is half open at `u = -0.5`
    ///
    /// # Returns
    ///
    /// The mean probability that a gate is open, in `[0, 1]`.
    pub fn evaluate<D: Dimension>(&self, u: &ArrayView<f32, D>) -> LossResult<f32> {
        if u.is_empty() {
            return Err(LossError::EmptyInput(NAME));
        }
        let denom = SQRT_2 * f64::from(self.sigma);
        let sum: f64 = u
            .iter()
            .map(|&x| 0.5 - 0.5 * erf(-(f64::from(x) + 0.5) / denom))
            .sum();
        let value = sum / u.len() as f64;
        trace!(loss = NAME, elements = u.len(), sigma = self.sigma, value, "evaluated");
        finite_scalar(NAME, value)
    }

    /// Gradient with respect to `u`: the Gaussian density `N(-0.5, sigma²)` at
    /// each entry, divided by the number of entries.
    pub fn grad<D: Dimension>(&self, u: &ArrayView<f32, D>) -> LossResult<Array<f32, D>> {
        if u.is_empty() {
            return Err(LossError::EmptyInput(NAME));
        }
        let sigma = f64::from(self.sigma);
        let norm = sigma * (2.0 * PI).sqrt() * u.len() as f64;
        Ok(u.mapv(|x| {
            let t = (f64::from(x) + 0.5) / sigma;
            ((-0.5 * t * t).exp() / norm) as f32
        }))
    }
}

impl Default for RegLoss {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIGMA)
    }
}

impl Loss for RegLoss {
    type Input<'a> = ArrayViewD<'a, f32>;
    type Output = f32;

    fn forward(&self, u: Self::Input<'_>) -> LossResult<f32> {
        self.evaluate(&u)
    }

    fn name(&self) -> &str {
        "RegLoss"
    }
}
