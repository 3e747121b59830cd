//! Clustering objective of the gated clustering head.
//!
//! ```text
//! cluster = gamma * Head(h, yhat) + GTCR(h, C)
//! gate    = CE(yg, argmax(yhat)) + lmbd * Reg(u_zg)      (fine-tune only)
//! ```
//!
//! Pretrain mode yields only `cluster`; fine-tune mode yields both scalars.
//! [`ClusterLossOutput`] carries the mode so callers cannot confuse the two.

use super::{
    argmax_rows, cross_entropy, GtcrLoss, HeadLoss, Loss, LossError, LossResult, RegLoss,
};
use crate::config::LossConfig;
use ndarray::{ArrayView2, ArrayViewD};
use tracing::debug;

const NAME: &str = "cluster";

/// Inputs of one [`ClusterLoss`] evaluation.
#[derive(Debug, Clone)]
pub struct ClusterInputs<'a> {
    /// Per-sample features, shape (B, D).
    pub h: ArrayView2<'a, f32>,
    /// Soft cluster assignments, shape (B, C).
    pub yhat: ArrayView2<'a, f32>,
    /// Gating-network logits, shape (B, C). Required in fine-tune mode.
    pub yg: Option<ArrayView2<'a, f32>>,
    /// Gate relaxation variables. Required in fine-tune mode.
    pub u_zg: Option<ArrayViewD<'a, f32>>,
    /// Weight of the gate-sparsity term.
    pub lmbd: f32,
    /// Weight of the per-cluster compression term.
    pub gamma: f32,
}

impl<'a> ClusterInputs<'a> {
    pub fn new(h: ArrayView2<'a, f32>, yhat: ArrayView2<'a, f32>, lmbd: f32, gamma: f32) -> Self {
        Self {
            h,
            yhat,
            yg: None,
            u_zg: None,
            lmbd,
            gamma,
        }
    }

    /// Supplies the gating logits and gate relaxation used in fine-tune mode.
    pub fn with_gates(mut self, yg: ArrayView2<'a, f32>, u_zg: ArrayViewD<'a, f32>) -> Self {
        self.yg = Some(yg);
        self.u_zg = Some(u_zg);
        self
    }
}

/// Result of a [`ClusterLoss`] evaluation, tagged by mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClusterLossOutput {
    /// Pretrain mode: the clustering term alone.
    Pretrain(f32),
    /// Fine-tune mode: the clustering term and the gating term.
    FineTune { cluster: f32, gate: f32 },
}

impl ClusterLossOutput {
    /// The clustering term, present in both modes.
    pub fn cluster(&self) -> f32 {
        match *self {
            Self::Pretrain(cluster) | Self::FineTune { cluster, .. } => cluster,
        }
    }

    /// The gating term, only produced in fine-tune mode.
    pub fn gate(&self) -> Option<f32> {
        match *self {
            Self::Pretrain(_) => None,
            Self::FineTune { gate, .. } => Some(gate),
        }
    }

    /// Number of scalars produced: 1 in pretrain mode, 2 in fine-tune mode.
    pub fn arity(&self) -> usize {
        match self {
            Self::Pretrain(_) => 1,
            Self::FineTune { .. } => 2,
        }
    }
}

/// Clustering + gating objective with a pretrain / fine-tune switch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterLoss {
    nb_classes: usize,
    epsilon: f32,
    pretrain: bool,
    reg_sigma: f32,
}

impl ClusterLoss {
    /// # Panics
    /// Panics if `nb_classes` is zero or `epsilon` is not a finite positive number.
    pub fn new(nb_classes: usize, epsilon: f32, pretrain: bool) -> Self {
        assert!(nb_classes > 0, "ClusterLoss needs at least one class");
        assert!(
            epsilon.is_finite() && epsilon > 0.0,
            "ClusterLoss epsilon must be a finite positive number, got {}",
            epsilon
        );
        Self {
            nb_classes,
            epsilon,
            pretrain,
            reg_sigma: RegLoss::DEFAULT_SIGMA,
        }
    }

    /// Builds the loss from a validated [`LossConfig`].
    pub fn from_config(config: &LossConfig) -> Self {
        Self::new(config.nb_classes, config.epsilon, config.pretrain)
            .with_reg_sigma(config.reg_sigma)
    }

    /// # Panics
    /// Panics if `sigma` is not a finite positive number.
    pub fn with_reg_sigma(mut self, sigma: f32) -> Self {
        assert!(
            sigma.is_finite() && sigma > 0.0,
            "RegLoss sigma must be a finite positive number, got {}",
            sigma
        );
        self.reg_sigma = sigma;
        self
    }

    pub fn pretrain(&mut self) {
        self.pretrain = true;
    }

    pub fn fine_tune(&mut self) {
        self.pretrain = false;
    }

    pub fn is_pretrain(&self) -> bool {
        self.pretrain
    }

    pub fn nb_classes(&self) -> usize {
        self.nb_classes
    }
}

impl Loss for ClusterLoss {
    type Input<'a> = ClusterInputs<'a>;
    type Output = ClusterLossOutput;

    fn forward(&self, inputs: Self::Input<'_>) -> LossResult<ClusterLossOutput> {
        let gates = if self.pretrain {
            None
        } else {
            let missing = |argument: &'static str| LossError::MissingArgument { loss: NAME, argument };
            let yg = inputs.yg.as_ref().ok_or_else(|| missing("yg"))?;
            let u_zg = inputs.u_zg.as_ref().ok_or_else(|| missing("u_zg"))?;
            Some((yg, u_zg))
        };

        let head = HeadLoss::new(self.nb_classes).evaluate(&inputs.h, &inputs.yhat)?;
        let gtcr = GtcrLoss::new(self.epsilon).evaluate(&inputs.h, self.nb_classes as f32)?;
        let cluster = inputs.gamma * head + gtcr;

        let output = match gates {
            None => ClusterLossOutput::Pretrain(cluster),
            Some((yg, u_zg)) => {
                let targets = argmax_rows(&inputs.yhat);
                let ce = cross_entropy(yg, &targets)?;
                let reg = RegLoss::new(self.reg_sigma).evaluate(u_zg)?;
                ClusterLossOutput::FineTune {
                    cluster,
                    gate: ce + inputs.lmbd * reg,
                }
            }
        };
        debug!(
            loss = NAME,
            pretrain = self.pretrain,
            batch = inputs.h.nrows(),
            head,
            gtcr,
            cluster,
            gate = ?output.gate(),
            "evaluated"
        );
        Ok(output)
    }

    fn name(&self) -> &str {
        "ClusterLoss"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};

    fn features() -> (ndarray::Array2<f32>, ndarray::Array2<f32>) {
        let h = array![[0.2_f32, -0.1, 0.4], [0.5, 0.3, -0.2], [-0.3, 0.1, 0.1], [0.0, 0.6, 0.2]];
        let yhat = array![[0.9_f32, 0.1], [0.2, 0.8], [0.6, 0.4], [0.3, 0.7]];
        (h, yhat)
    }

    #[test]
    fn test_pretrain_returns_single_term() {
        let (h, yhat) = features();
        let out = ClusterLoss::new(2, 1e-3, true)
            .forward(ClusterInputs::new(h.view(), yhat.view(), 1.0, 0.5))
            .unwrap();
        assert_eq!(out.arity(), 1);
        assert_eq!(out.gate(), None);

        let head = HeadLoss::new(2).evaluate(&h.view(), &yhat.view()).unwrap();
        let gtcr = GtcrLoss::new(1e-3).evaluate(&h.view(), 2.0).unwrap();
        assert_abs_diff_eq!(out.cluster(), 0.5 * head + gtcr, epsilon = 1e-5);
    }

    #[test]
    fn test_fine_tune_returns_cluster_and_gate_terms() {
        let (h, yhat) = features();
        // logits agree with argmax(yhat) = [0, 1, 0, 1]
        let yg = array![[3.0_f32, 0.0], [0.0, 3.0], [3.0, 0.0], [0.0, 3.0]];
        let u_zg = Array1::from_elem(3, -0.5_f32).into_dyn();
        let inputs = ClusterInputs::new(h.view(), yhat.view(), 2.0, 1.0)
            .with_gates(yg.view(), u_zg.view());

        let out = ClusterLoss::new(2, 1e-3, false).forward(inputs).unwrap();
        assert_eq!(out.arity(), 2);

        let ce = (1.0_f64 + (-3.0_f64).exp()).ln() as f32;
        assert_abs_diff_eq!(out.gate().unwrap(), ce + 2.0 * 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_fine_tune_requires_gates() {
        let (h, yhat) = features();
        let err = ClusterLoss::new(2, 1e-3, false)
            .forward(ClusterInputs::new(h.view(), yhat.view(), 1.0, 1.0))
            .unwrap_err();
        assert_eq!(err, LossError::MissingArgument { loss: "cluster", argument: "yg" });
    }

    #[test]
    fn test_cluster_term_does_not_depend_on_mode() {
        let (h, yhat) = features();
        let yg = array![[1.0_f32, 0.0], [0.0, 1.0], [1.0, 0.0], [0.0, 1.0]];
        let u_zg = Array1::<f32>::zeros(2).into_dyn();
        let mut loss = ClusterLoss::new(2, 1e-3, true);
        let pre = loss
            .forward(ClusterInputs::new(h.view(), yhat.view(), 1.0, 1.0))
            .unwrap();
        loss.fine_tune();
        let fine = loss
            .forward(ClusterInputs::new(h.view(), yhat.view(), 1.0, 1.0).with_gates(yg.view(), u_zg.view()))
            .unwrap();
        assert_eq!(pre.cluster(), fine.cluster());
    }
}
