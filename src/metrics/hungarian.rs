//! Optimal linear assignment (Hungarian / Kuhn-Munkres, O(n³)).

use super::{MetricError, MetricResult};
use ndarray::{Array2, ArrayView2};

/// Minimum-cost assignment of rows to columns.
///
/// Rectangular matrices are padded to square with zero-cost dummy entries,
/// which never appear in the result.
///
/// # Arguments
///
/// * `cost` - A (rows, cols) cost matrix. Every entry must be finite.
///
/// # Returns
///
/// `min(rows, cols)` pairs `(row, col)` sorted by row, or
/// `MetricError::NonFinite` naming the first infinite or NaN entry.
pub fn linear_assignment(cost: &ArrayView2<f64>) -> MetricResult<Vec<(usize, usize)>> {
    let (rows, cols) = cost.dim();
    if let Some(((row, col), _)) = cost.indexed_iter().find(|(_, c)| !c.is_finite()) {
        return Err(MetricError::NonFinite { row, col });
    }
    if rows == 0 || cols == 0 {
        return Ok(Vec::new());
    }
    let n = rows.max(cols);
    let mut c = Array2::<f64>::zeros((n, n));
    c.slice_mut(ndarray::s![..rows, ..cols]).assign(cost);

    // Potentials and matching are 1-indexed; column 0 is the virtual source.
    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; n + 1];
    let mut owner = vec![0_usize; n + 1];
    let mut way = vec![0_usize; n + 1];

    for row in 1..=n {
        owner[0] = row;
        let mut j0 = 0_usize;
        let mut slack = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = owner[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0_usize;
            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let reduced = c[[i0 - 1, j - 1]] - u[i0] - v[j];
                if reduced < slack[j] {
                    slack[j] = reduced;
                    way[j] = j0;
                }
                if slack[j] < delta {
                    delta = slack[j];
                    j1 = j;
                }
            }
            for j in 0..=n {
                if used[j] {
                    u[owner[j]] += delta;
                    v[j] -= delta;
                } else {
                    slack[j] -= delta;
                }
            }
            j0 = j1;
            if owner[j0] == 0 {
                break;
            }
        }

        while j0 != 0 {
            let prev = way[j0];
            owner[j0] = owner[prev];
            j0 = prev;
        }
    }

    let mut pairs: Vec<(usize, usize)> = (1..=n)
        .filter(|&j| owner[j] != 0)
        .map(|j| (owner[j] - 1, j - 1))
        .filter(|&(r, c)| r < rows && c < cols)
        .collect();
    pairs.sort_unstable_by_key(|&(r, _)| r);
    Ok(pairs)
}

/// Maximum-weight assignment: [`linear_assignment`] on the negated weights.
pub fn max_weight_assignment(weights: &ArrayView2<f64>) -> MetricResult<Vec<(usize, usize)>> {
    linear_assignment(&weights.mapv(|w| -w).view())
}
