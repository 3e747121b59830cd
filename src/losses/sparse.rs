//! Reconstruction objective of the gated auto-encoder.
//!
//! Combines four L1 reconstruction terms with, outside pretrain mode, the
//! coding-rate and gate-sparsity regularisers:
//!
//! ```text
//! total = L1(X, X_hat)
//!       + local_gates_lmbd * L1(X, X_z_hat)
//!       + local_gates_lmbd * L1(X, X_input_noised_hat)
//!       + L1(X, X_latent_noised_hat)
//!       + GTCR(z, B) + lmbd * Reg(mu)          (fine-tune only)
//! ```
//!
//! In pretrain mode the gate reconstruction is replaced by `X` itself, so its
//! term vanishes, and the regulariser pair is zero.

use super::{GtcrLoss, Loss, LossError, LossResult, ReconstructionLoss, RegLoss};
use crate::config::LossConfig;
use ndarray::{ArrayView2, ArrayViewD};
use tracing::debug;

const NAME: &str = "sparse";

/// Inputs of one [`SparseLoss`] evaluation.
///
/// The four gate fields are only read in fine-tune mode, where all of them
/// are required.
#[derive(Debug, Clone)]
pub struct SparseInputs<'a> {
    /// Clean input `X`, shape (B, D).
    pub x: ArrayView2<'a, f32>,
    /// Straight reconstruction of `X`.
    pub x_hat: ArrayView2<'a, f32>,
    /// Reconstruction from the noised-input path.
    pub x_input_noised_hat: ArrayView2<'a, f32>,
    /// Reconstruction from the noised-latent path.
    pub x_latent_noised_hat: ArrayView2<'a, f32>,
    /// Reconstruction from the gated input.
    pub x_z_hat: Option<ArrayView2<'a, f32>>,
    /// Latent batch fed to the coding-rate term.
    pub z: Option<ArrayView2<'a, f32>>,
    /// Gate relaxation variables fed to the sparsity term.
    pub mu: Option<ArrayViewD<'a, f32>>,
    /// Weight of the sparsity term.
    pub lmbd: Option<f32>,
}

impl<'a> SparseInputs<'a> {
    pub fn new(
        x: ArrayView2<'a, f32>,
        x_hat: ArrayView2<'a, f32>,
        x_input_noised_hat: ArrayView2<'a, f32>,
        x_latent_noised_hat: ArrayView2<'a, f32>,
    ) -> Self {
        Self {
            x,
            x_hat,
            x_input_noised_hat,
            x_latent_noised_hat,
            x_z_hat: None,
            z: None,
            mu: None,
            lmbd: None,
        }
    }

    /// Supplies the gate-path tensors needed in fine-tune mode.
    pub fn with_gates(
        mut self,
        x_z_hat: ArrayView2<'a, f32>,
        z: ArrayView2<'a, f32>,
        mu: ArrayViewD<'a, f32>,
        lmbd: f32,
    ) -> Self {
        self.x_z_hat = Some(x_z_hat);
        self.z = Some(z);
        self.mu = Some(mu);
        self.lmbd = Some(lmbd);
        self
    }
}

/// Weighted terms of a [`SparseLoss`] evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseLossComponents {
    /// `L1(X, X_hat)`.
    pub input_reconstruction: f32,
    /// `local_gates_lmbd * L1(X, X_z_hat)`.
    pub gate_reconstruction: f32,
    /// `local_gates_lmbd * L1(X, X_input_noised_hat)`.
    pub input_denoising: f32,
    /// `L1(X, X_latent_noised_hat)`.
    pub latent_denoising: f32,
    /// `GTCR(z, B) + lmbd * Reg(mu)`, zero in pretrain mode.
    pub gtcr_reg: f32,
    /// Sum of all the above.
    pub total: f32,
}

/// Reconstruction + gate objective with a pretrain / fine-tune switch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseLoss {
    epsilon: f32,
    pretrain: bool,
    local_gates_lmbd: f32,
    reg_sigma: f32,
}

impl SparseLoss {
    pub const DEFAULT_LOCAL_GATES_LMBD: f32 = 100.0;

    /// # Panics
    /// Panics if `epsilon` is not a finite positive number.
    pub fn new(epsilon: f32, pretrain: bool) -> Self {
        assert!(
            epsilon.is_finite() && epsilon > 0.0,
            "SparseLoss epsilon must be a finite positive number, got {}",
            epsilon
        );
        Self {
            epsilon,
            pretrain,
            local_gates_lmbd: Self::DEFAULT_LOCAL_GATES_LMBD,
            reg_sigma: RegLoss::DEFAULT_SIGMA,
        }
    }

    /// Builds the loss from a validated [`LossConfig`].
    pub fn from_config(config: &LossConfig) -> Self {
        Self::new(config.epsilon, config.pretrain)
            .with_local_gates_lmbd(config.local_gates_lmbd)
            .with_reg_sigma(config.reg_sigma)
    }

    /// # Panics
    /// Panics if `weight` is not a finite positive number.
    pub fn with_local_gates_lmbd(mut self, weight: f32) -> Self {
        assert!(
            weight.is_finite() && weight > 0.0,
            "local_gates_lmbd must be a finite positive number, got {}",
            weight
        );
        self.local_gates_lmbd = weight;
        self
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

    /// Switches to pretrain mode.
    pub fn pretrain(&mut self) {
        self.pretrain = true;
    }

    /// Switches to fine-tune mode.
    pub fn fine_tune(&mut self) {
        self.pretrain = false;
    }

    pub fn is_pretrain(&self) -> bool {
        self.pretrain
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn local_gates_lmbd(&self) -> f32 {
        self.local_gates_lmbd
    }

    /// Evaluates every weighted term and their sum.
    ///
    /// # Arguments
    ///
    /// * `inputs` - The batch and its reconstructions; the gate fields must be
    ///   set in fine-tune mode
    ///
    /// # Returns
    ///
    /// The individual terms and `total`, or `MissingArgument` when a
    /// fine-tune input is absent.
    pub fn components(&self, inputs: &SparseInputs<'_>) -> LossResult<SparseLossComponents> {
        let x = &inputs.x;
        let recon = ReconstructionLoss::new();

        let input_reconstruction = recon.evaluate(x, &inputs.x_hat)?;
        let input_denoising = self.local_gates_lmbd * recon.evaluate(x, &inputs.x_input_noised_hat)?;
        let latent_denoising = recon.evaluate(x, &inputs.x_latent_noised_hat)?;

        let (gate_reconstruction, gtcr_reg) = if self.pretrain {
            if inputs.x_z_hat.is_some() {
                debug!(loss = NAME, "pretrain mode replaces the supplied X_z_hat with X");
            }
            (self.local_gates_lmbd * recon.evaluate(x, x)?, 0.0)
        } else {
            let missing = |argument: &'static str| LossError::MissingArgument { loss: NAME, argument };
            let x_z_hat = inputs.x_z_hat.as_ref().ok_or_else(|| missing("x_z_hat"))?;
            let z = inputs.z.as_ref().ok_or_else(|| missing("z"))?;
            let mu = inputs.mu.as_ref().ok_or_else(|| missing("mu"))?;
            let lmbd = inputs.lmbd.ok_or_else(|| missing("lmbd"))?;

            let gate = self.local_gates_lmbd * recon.evaluate(x, x_z_hat)?;
            let gtcr = GtcrLoss::new(self.epsilon).evaluate(z, x.nrows() as f32)?;
            let reg = RegLoss::new(self.reg_sigma).evaluate(mu)?;
            (gate, gtcr + lmbd * reg)
        };

        let total = input_reconstruction
            + gate_reconstruction
            + input_denoising
            + latent_denoising
            + gtcr_reg;
        debug!(
            loss = NAME,
            pretrain = self.pretrain,
            batch = x.nrows(),
            input_reconstruction,
            gate_reconstruction,
            input_denoising,
            latent_denoising,
            gtcr_reg,
            total,
            "evaluated"
        );
        Ok(SparseLossComponents {
            input_reconstruction,
            gate_reconstruction,
            input_denoising,
            latent_denoising,
            gtcr_reg,
            total,
        })
    }
}

impl Default for SparseLoss {
    fn default() -> Self {
        Self::new(GtcrLoss::DEFAULT_EPSILON, true)
    }
}

impl Loss for SparseLoss {
    type Input<'a> = SparseInputs<'a>;
    type Output = f32;

    fn forward(&self, inputs: Self::Input<'_>) -> LossResult<f32> {
        self.components(&inputs).map(|c| c.total)
    }

    fn name(&self) -> &str {
        "SparseLoss"
    }
}
