//! Clustering accuracy under the best one-to-one label matching.

use super::hungarian::max_weight_assignment;
use super::{Metric, MetricError, MetricResult};
use ndarray::Array2;

/// Counts `[true_label][predicted_label]` over paired label slices.
///
/// The matrix is square with side `max(max(true), max(pred)) + 1`.
pub fn contingency_matrix(labels_true: &[usize], labels_pred: &[usize]) -> MetricResult<Array2<usize>> {
    if labels_true.len() != labels_pred.len() {
        return Err(MetricError::LengthMismatch {
            expected: labels_true.len(),
            actual: labels_pred.len(),
        });
    }
    let side = labels_true
        .iter()
        .chain(labels_pred)
        .max()
        .map_or(0, |&max| max + 1);
    let mut matrix = Array2::<usize>::zeros((side, side));
    for (&t, &p) in labels_true.iter().zip(labels_pred) {
        matrix[[t, p]] += 1;
    }
    Ok(matrix)
}

/// Fraction of samples correctly labelled after matching predicted clusters
/// to true classes with a maximum-weight assignment on the contingency matrix.
///
/// The result lies in `[0, 1]` and is invariant to relabelling the predictions.
pub fn clustering_accuracy(labels_true: &[usize], labels_pred: &[usize]) -> MetricResult<f64> {
    let matrix = contingency_matrix(labels_true, labels_pred)?;
    if labels_true.is_empty() {
        return Err(MetricError::Empty);
    }
    matched_fraction(&matrix)
}

fn matched_fraction(matrix: &Array2<usize>) -> MetricResult<f64> {
    let total: usize = matrix.sum();
    if total == 0 {
        return Ok(0.0);
    }
    let weights = matrix.mapv(|count| count as f64);
    let matched: usize = max_weight_assignment(&weights.view())?
        .into_iter()
        .map(|(t, p)| matrix[[t, p]])
        .sum();
    Ok(matched as f64 / total as f64)
}

/// Streaming clustering accuracy over labelled batches.
///
/// The contingency matrix grows as new labels appear; the assignment is
/// solved once in [`Metric::compute`] over everything seen so far.
#[derive(Debug, Clone, Default)]
pub struct ClusteringAccuracy {
    counts: Array2<usize>,
}

impl ClusteringAccuracy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of samples seen since the last reset.
    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    pub fn contingency(&self) -> &Array2<usize> {
        &self.counts
    }

    /// Adds a batch of paired labels.
    pub fn try_update(&mut self, labels_pred: &[usize], labels_true: &[usize]) -> MetricResult<()> {
        let batch = contingency_matrix(labels_true, labels_pred)?;
        let side = batch.nrows().max(self.counts.nrows());
        if side > self.counts.nrows() {
            let mut grown = Array2::<usize>::zeros((side, side));
            let old = self.counts.nrows();
            grown.slice_mut(ndarray::s![..old, ..old]).assign(&self.counts);
            self.counts = grown;
        }
        let n = batch.nrows();
        let mut block = self.counts.slice_mut(ndarray::s![..n, ..n]);
        block += &batch;
        Ok(())
    }
}

impl Metric for ClusteringAccuracy {
    type Prediction = Vec<usize>;
    type Target = Vec<usize>;
    type Output = f64;

    /// Batches of mismatched length are skipped with a warning.
    fn update(&mut self, predictions: &Vec<usize>, targets: &Vec<usize>) {
        if let Err(err) = self.try_update(predictions, targets) {
            tracing::warn!(metric = "clustering_accuracy", %err, "batch skipped");
        }
    }

    fn compute(&self) -> f64 {
        // counts are finite, so the assignment cannot fail
        matched_fraction(&self.counts).unwrap_or_else(|err| {
            tracing::warn!(metric = "clustering_accuracy", %err, "assignment failed");
            0.0
        })
    }

    fn reset(&mut self) {
        self.counts = Array2::zeros((0, 0));
    }

    fn name(&self) -> &str {
        "ClusteringAccuracy"
    }
}
