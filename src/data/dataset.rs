//! The [`Dataset`] trait and the in-memory clustering dataset.

use super::DataError;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;

/// Indexed data source.
pub trait Dataset: Send + Sync {
    /// Type of a single sample.
    type Item;
    /// Type of a sample's label.
    type Label;

    /// Number of samples.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample and label at `index`, `None` when out of range.
    fn get(&self, index: usize) -> Option<(Self::Item, Self::Label)>;

    fn get_item(&self, index: usize) -> Option<Self::Item> {
        self.get(index).map(|(item, _)| item)
    }

    fn get_label(&self, index: usize) -> Option<Self::Label> {
        self.get(index).map(|(_, label)| label)
    }
}

/// Feature matrix `[N, D]` with one ground-truth cluster label per row.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterDataset {
    features: Array2<f32>,
    labels: Array1<usize>,
}

impl ClusterDataset {
    /// # Panics
    ///
    /// Panics if the number of feature rows and labels differ.
    pub fn new(features: Array2<f32>, labels: Array1<usize>) -> Self {
        assert_eq!(
            features.nrows(),
            labels.len(),
            "Number of samples in features and labels must match"
        );
        Self { features, labels }
    }

    /// Fallible counterpart of [`ClusterDataset::new`].
    pub fn try_new(features: Array2<f32>, labels: Array1<usize>) -> Result<Self, DataError> {
        if features.nrows() != labels.len() {
            return Err(DataError::LengthMismatch {
                features: features.nrows(),
                labels: labels.len(),
            });
        }
        Ok(Self { features, labels })
    }

    pub fn features(&self) -> &Array2<f32> {
        &self.features
    }

    pub fn labels(&self) -> &Array1<usize> {
        &self.labels
    }

    pub fn num_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    /// Number of distinct clusters, taken as `max(label) + 1`.
    pub fn num_clusters(&self) -> usize {
        self.labels.iter().max().map_or(0, |&max| max + 1)
    }

    pub fn into_parts(self) -> (Array2<f32>, Array1<usize>) {
        (self.features, self.labels)
    }

    /// Copies the rows at `indices` into a new dataset.
    pub fn select(&self, indices: &[usize]) -> Result<Self, DataError> {
        let len = self.num_samples();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(DataError::IndexOutOfRange { index, len });
        }
        Ok(Self {
            features: self.features.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
        })
    }

    /// Shuffled row indices split into batches of `batch_size`; the last
    /// batch may be shorter.
    ///
    /// # Panics
    ///
    /// Panics if `batch_size` is zero.
    pub fn batch_indices<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<Vec<usize>> {
        assert!(batch_size > 0, "batch_size must be > 0");
        let mut indices: Vec<usize> = (0..self.num_samples()).collect();
        indices.shuffle(rng);
        indices.chunks(batch_size).map(<[usize]>::to_vec).collect()
    }

    /// Points `(x_a, x_b)` of the 2-D projection on feature columns `a` and `b`.
    pub fn projection(&self, a: usize, b: usize) -> Result<Vec<[f64; 2]>, DataError> {
        let dim = self.num_features();
        for index in [a, b] {
            if index >= dim {
                return Err(DataError::FeatureOutOfRange { index, dim });
            }
        }
        Ok(self
            .features
            .axis_iter(Axis(0))
            .map(|row| [f64::from(row[a]), f64::from(row[b])])
            .collect())
    }
}

impl Dataset for ClusterDataset {
    type Item = Array1<f32>;
    type Label = usize;

    fn len(&self) -> usize {
        self.num_samples()
    }

    fn get(&self, index: usize) -> Option<(Array1<f32>, usize)> {
        let label = *self.labels.get(index)?;
        Some((self.features.row(index).to_owned(), label))
    }
}
