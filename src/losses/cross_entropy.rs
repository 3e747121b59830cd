//! Softmax cross-entropy against hard class labels.

use super::{finite_scalar, LossError, LossResult};
use ndarray::{ArrayView2, Axis};

const NAME: &str = "cross_entropy";

/// Index of the largest entry of each row.
///
/// Ties resolve to the first maximum. NaN compares greater than every
/// number, so the first NaN of a row wins.
pub fn argmax_rows(scores: &ArrayView2<f32>) -> Vec<usize> {
    scores
        .axis_iter(Axis(0))
        .map(|row| {
            let mut best = 0;
            for (i, &v) in row.iter().enumerate() {
                let current = row[best];
                if current.is_nan() {
                    break;
                }
                if v.is_nan() || v > current {
                    best = i;
                }
            }
            best
        })
        .collect()
}

/// Mean cross-entropy of `logits` (B, C) against class indices `targets` (B).
///
/// Formula: `CE = mean_b( logsumexp(logits[b]) - logits[b, targets[b]] )`,
/// evaluated with the max-shift for numerical stability.
///
/// # Arguments
///
/// * `logits` - Unnormalised class scores
/// * `targets` - One class index per row of `logits`
pub fn cross_entropy(logits: &ArrayView2<f32>, targets: &[usize]) -> LossResult<f32> {
    let (batch, classes) = logits.dim();
    if batch == 0 || classes == 0 {
        return Err(LossError::EmptyInput(NAME));
    }
    if targets.len() != batch {
        return Err(LossError::ShapeMismatch {
            context: NAME,
            expected: vec![batch],
            actual: vec![targets.len()],
        });
    }

    let mut total = 0.0_f64;
    for (row, &target) in logits.axis_iter(Axis(0)).zip(targets) {
        if target >= classes {
            return Err(LossError::InvalidArgument {
                name: "targets",
                reason: format!("class index {target} out of range for {classes} classes"),
            });
        }
        let max = row.iter().fold(f64::NEG_INFINITY, |m, &x| m.max(f64::from(x)));
        let log_sum_exp = max
            + row
                .iter()
                .map(|&x| (f64::from(x) - max).exp())
                .sum::<f64>()
                .ln();
        total += log_sum_exp - f64::from(row[target]);
    }
    finite_scalar(NAME, total / batch as f64)
}
