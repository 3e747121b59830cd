//! Synthetic clustering data: isotropic Gaussian blobs padded with
//! low-variance nuisance features.
//!
//! The informative part of every sample is drawn around one of the cluster
//! centers; the nuisance columns carry no cluster information, so a good
//! feature selector should gate them off.

use super::{ClusterDataset, DataError};
use ndarray::{concatenate, s, Array1, Array2, Axis};
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters of the blob generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub samples_per_cluster: usize,
    /// One row per cluster; every row must have the same length.
    pub centers: Vec<Vec<f32>>,
    pub cluster_std: f32,
    pub nuisance_features: usize,
    pub nuisance_std: f32,
    pub shuffle: bool,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            samples_per_cluster: 800,
            centers: vec![
                vec![0.0, 1.0, 1.0],
                vec![0.0, 1.0, 5.0],
                vec![4.0, 0.0, 4.0],
                vec![4.0, 5.0, 4.0],
            ],
            cluster_std: 0.5,
            nuisance_features: 10,
            nuisance_std: 0.1,
            shuffle: true,
            seed: 42,
        }
    }
}

impl SyntheticConfig {
    /// Number of informative features.
    pub fn informative_features(&self) -> usize {
        self.centers.first().map_or(0, Vec::len)
    }

    pub fn total_features(&self) -> usize {
        self.informative_features() + self.nuisance_features
    }

    pub fn total_samples(&self) -> usize {
        self.samples_per_cluster * self.centers.len()
    }

    pub fn validate(&self) -> Result<(), DataError> {
        let invalid = |field, reason: &str| DataError::InvalidParameter {
            field,
            reason: reason.to_string(),
        };
        if self.samples_per_cluster == 0 {
            return Err(invalid("samples_per_cluster", "must be > 0"));
        }
        let dim = self.informative_features();
        if dim == 0 {
            return Err(invalid("centers", "need at least one non-empty center"));
        }
        if self.centers.iter().any(|c| c.len() != dim) {
            return Err(invalid("centers", "all centers must have the same length"));
        }
        if self.centers.iter().flatten().any(|v| !v.is_finite()) {
            return Err(invalid("centers", "coordinates must be finite"));
        }
        if !(self.cluster_std.is_finite() && self.cluster_std >= 0.0) {
            return Err(invalid("cluster_std", "must be a finite number >= 0"));
        }
        if !(self.nuisance_std.is_finite() && self.nuisance_std >= 0.0) {
            return Err(invalid("nuisance_std", "must be a finite number >= 0"));
        }
        Ok(())
    }
}

/// Draws the blobs and the nuisance block from `rng`.
///
/// Labels equal the index of the generating center. When `shuffle` is set
/// the rows (and their labels) are permuted.
pub fn generate<R: Rng + ?Sized>(config: &SyntheticConfig, rng: &mut R) -> Result<ClusterDataset, DataError> {
    config.validate()?;
    let per = config.samples_per_cluster;
    let clusters = config.centers.len();
    let dim = config.informative_features();
    let n = config.total_samples();

    let blob_noise = Normal::new(0.0_f32, config.cluster_std).map_err(|e| DataError::InvalidParameter {
        field: "cluster_std",
        reason: e.to_string(),
    })?;
    let nuisance_noise =
        Normal::new(0.0_f32, config.nuisance_std).map_err(|e| DataError::InvalidParameter {
            field: "nuisance_std",
            reason: e.to_string(),
        })?;

    let mut informative = Array2::<f32>::random_using((n, dim), blob_noise, rng);
    let mut labels = Array1::<usize>::zeros(n);
    for (cluster, center) in config.centers.iter().enumerate() {
        let rows = cluster * per..(cluster + 1) * per;
        let center = Array1::from_vec(center.clone());
        let mut block = informative.slice_mut(s![rows.clone(), ..]);
        block += &center;
        labels.slice_mut(s![rows]).fill(cluster);
    }

    let nuisance = Array2::<f32>::random_using((n, config.nuisance_features), nuisance_noise, rng);
    let mut features = concatenate![Axis(1), informative, nuisance];

    if config.shuffle {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        features = features.select(Axis(0), &order);
        labels = labels.select(Axis(0), &order);
    }

    debug!(samples = n, clusters, features = features.ncols(), "generated synthetic blobs");
    Ok(ClusterDataset::new(features, labels))
}

/// [`generate`] with a [`StdRng`] seeded from `config.seed`.
pub fn generate_seeded(config: &SyntheticConfig) -> Result<ClusterDataset, DataError> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    generate(config, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SyntheticConfig {
        SyntheticConfig {
            samples_per_cluster: 50,
            ..SyntheticConfig::default()
        }
    }

    #[test]
    fn test_shapes_and_label_counts() {
        let dataset = generate_seeded(&small_config()).unwrap();
        assert_eq!(dataset.features().dim(), (200, 13));
        assert_eq!(dataset.num_clusters(), 4);
        for cluster in 0..4 {
            let count = dataset.labels().iter().filter(|&&l| l == cluster).count();
            assert_eq!(count, 50);
        }
    }

    #[test]
    fn test_same_seed_same_data() {
        let a = generate_seeded(&small_config()).unwrap();
        let b = generate_seeded(&small_config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cluster_means_near_centers() {
        let config = SyntheticConfig {
            samples_per_cluster: 400,
            ..SyntheticConfig::default()
        };
        let dataset = generate_seeded(&config).unwrap();
        for (cluster, center) in config.centers.iter().enumerate() {
            let rows: Vec<usize> = dataset
                .labels()
                .iter()
                .enumerate()
                .filter(|&(_, &l)| l == cluster)
                .map(|(i, _)| i)
                .collect();
            let block = dataset.features().select(Axis(0), &rows);
            let mean = block.mean_axis(Axis(0)).unwrap();
            for (j, &c) in center.iter().enumerate() {
                assert!((mean[j] - c).abs() < 0.15, "cluster {cluster} feature {j}: {}", mean[j]);
            }
            for j in 3..13 {
                assert!(mean[j].abs() < 0.05);
            }
        }
    }

    #[test]
    fn test_unshuffled_rows_are_grouped() {
        let config = SyntheticConfig {
            samples_per_cluster: 3,
            shuffle: false,
            ..SyntheticConfig::default()
        };
        let dataset = generate_seeded(&config).unwrap();
        assert_eq!(dataset.labels().to_vec(), vec![0, 0, 0, 1, 1, 1, 2, 2, 2, 3, 3, 3]);
    }

    #[test]
    fn test_ragged_centers_are_rejected() {
        let config = SyntheticConfig {
            centers: vec![vec![0.0, 1.0], vec![1.0]],
            ..SyntheticConfig::default()
        };
        assert!(matches!(
            generate_seeded(&config),
            Err(DataError::InvalidParameter { field: "centers", .. })
        ));
    }
}
