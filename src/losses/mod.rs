//! Loss functions for deep clustering with gated feature selection.
//!
//! Every loss is a small immutable struct holding its hyper-parameters and
//! implementing [`Loss`]. Leaf losses are composed into the two training
//! objectives, [`SparseLoss`] and [`ClusterLoss`].
//!
//! # Available Loss Functions
//!
//! - **Reconstruction (L1)**: [`ReconstructionLoss`]
//! - **Generalized total coding rate**: [`GtcrLoss`]
//! - **Gate sparsity (erf relaxation of L0)**: [`RegLoss`]
//! - **Per-cluster compression**: [`HeadLoss`]
//! - **Reconstruction + gate objective**: [`SparseLoss`]
//! - **Clustering + gating objective**: [`ClusterLoss`]
//!
//! Inputs are `ndarray` views in `f32`; reductions and log-determinants are
//! carried out in `f64` and the resulting scalar is returned as `f32`.
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use sparseclust::losses::{GtcrLoss, Loss};
//!
//! let z = array![[0.1_f32, 0.2], [0.3, -0.1], [0.0, 0.4]];
//! let loss = GtcrLoss::default().forward((z.view(), 3.0)).unwrap();
//! assert!(loss <= 0.0);
//! ```

pub mod cluster;
pub mod cross_entropy;
pub mod gtcr;
pub mod head;
pub mod reconstruction;
pub mod reg;
pub mod sparse;

pub use cluster::{ClusterInputs, ClusterLoss, ClusterLossOutput};
pub use cross_entropy::{argmax_rows, cross_entropy};
pub use gtcr::GtcrLoss;
pub use head::HeadLoss;
pub use reconstruction::ReconstructionLoss;
pub use reg::RegLoss;
pub use sparse::{SparseInputs, SparseLoss, SparseLossComponents};

use crate::linalg::{self, LinalgError};
use ndarray::Array2;
use thiserror::Error;
use tracing::warn;

/// Errors raised while evaluating a loss.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LossError {
    #[error("{context}: expected shape {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("{0}: input tensor is empty")]
    EmptyInput(&'static str),

    #[error("{loss}: matrix of order {order} is not positive-definite, inputs may have collapsed or contain non-finite values")]
    NotPositiveDefinite { loss: &'static str, order: usize },

    #[error("{loss}: evaluated to a non-finite value ({value})")]
    NonFinite { loss: &'static str, value: f64 },

    #[error("{loss}: `{argument}` is required outside pretrain mode")]
    MissingArgument {
        loss: &'static str,
        argument: &'static str,
    },

    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },
}

pub type LossResult<T> = Result<T, LossError>;

/// Common interface of all losses.
///
/// Each variant declares the inputs it consumes and the value it produces;
/// `forward` is a pure function of `self` and the input.
pub trait Loss: Send + Sync {
    /// Borrowed inputs of one evaluation.
    type Input<'a>;
    /// Value produced by one evaluation.
    type Output;

    /// Evaluates the loss.
    fn forward(&self, input: Self::Input<'_>) -> LossResult<Self::Output>;

    /// Returns the name of the loss.
    fn name(&self) -> &str;
}

pub(crate) fn check_same_shape(
    context: &'static str,
    expected: &[usize],
    actual: &[usize],
) -> LossResult<()> {
    if expected != actual {
        return Err(LossError::ShapeMismatch {
            context,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}

pub(crate) fn check_positive(name: &'static str, value: f32) -> LossResult<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(LossError::InvalidArgument {
            name,
            reason: format!("must be a finite positive number, got {value}"),
        });
    }
    Ok(())
}

/// Narrows an `f64` accumulator to the `f32` result, rejecting NaN and infinities.
pub(crate) fn finite_scalar(loss: &'static str, value: f64) -> LossResult<f32> {
    let narrowed = value as f32;
    if !narrowed.is_finite() {
        warn!(loss, value, "loss is not finite");
        return Err(LossError::NonFinite { loss, value });
    }
    Ok(narrowed)
}

/// Log-determinant of an SPD matrix with the failure attributed to `loss`.
pub(crate) fn checked_logdet(loss: &'static str, m: &Array2<f64>) -> LossResult<f64> {
    match linalg::logdet_spd(m) {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(value) => {
            warn!(loss, value, "log-determinant is not finite");
            Err(LossError::NonFinite { loss, value })
        }
        Err(LinalgError::NotPositiveDefinite(order)) => {
            warn!(loss, order, "Cholesky factorisation failed");
            Err(LossError::NotPositiveDefinite { loss, order })
        }
        Err(LinalgError::NotSquare { rows, cols }) => Err(LossError::ShapeMismatch {
            context: loss,
            expected: vec![rows, rows],
            actual: vec![rows, cols],
        }),
    }
}
