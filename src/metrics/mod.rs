//! Metrics for evaluating cluster assignments.
//!
//! - **Clustering accuracy**: best one-to-one matching between predicted
//!   clusters and true classes, solved with the Hungarian algorithm.
//!
//! # Example
//!
//! ```
//! use sparseclust::metrics::{ClusteringAccuracy, Metric};
//!
//! let mut accuracy = ClusteringAccuracy::new();
//! accuracy.update(&vec![1, 1, 0], &vec![0, 0, 1]);
//! assert_eq!(accuracy.compute(), 1.0);
//! accuracy.reset();
//! ```

pub mod clustering;
pub mod hungarian;

pub use clustering::{clustering_accuracy, contingency_matrix, ClusteringAccuracy};
pub use hungarian::{linear_assignment, max_weight_assignment};

use thiserror::Error;

/// Errors raised by the label-based metrics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("Label slices differ in length: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Cannot score an empty labelling")]
    Empty,

    #[error("Assignment cost at ({row}, {col}) is not finite")]
    NonFinite { row: usize, col: usize },
}

pub type MetricResult<T> = Result<T, MetricError>;

/// Base trait for streaming metrics.
pub trait Metric: Send + Sync {
    /// Prediction type.
    type Prediction;
    /// Target type.
    type Target;
    /// Metric value type.
    type Output;

    /// Folds a new batch into the metric state.
    fn update(&mut self, predictions: &Self::Prediction, targets: &Self::Target);

    /// Current value of the metric.
    fn compute(&self) -> Self::Output;

    /// Clears the accumulated state.
    fn reset(&mut self);

    fn name(&self) -> &str;
}
