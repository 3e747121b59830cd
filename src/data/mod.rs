//! # Data Module
//!
//! Labelled feature matrices for clustering experiments.
//!
//! ## Key Components
//!
//! - [`Dataset`]: Trait for indexed data sources
//! - [`ClusterDataset`]: In-memory features with ground-truth cluster labels
//! - [`synthetic`]: Isotropic Gaussian blobs with nuisance features
//! - [`masks`]: Random input masks and latent noise for the denoising paths
//!
//! ## Example
//!
//! ```
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use sparseclust::data::synthetic::{generate, SyntheticConfig};
//! use sparseclust::data::Dataset;
//!
//! let config = SyntheticConfig { samples_per_cluster: 10, ..SyntheticConfig::default() };
//! let mut rng = StdRng::seed_from_u64(0);
//! let dataset = generate(&config, &mut rng).unwrap();
//! assert_eq!(dataset.len(), 40);
//! assert_eq!(dataset.num_features(), 13);
//! ```

pub mod dataset;
pub mod masks;
pub mod synthetic;

pub use dataset::{ClusterDataset, Dataset};
pub use masks::{apply_mask, random_mask, MaskKind};
pub use synthetic::{generate, generate_seeded, SyntheticConfig};

use thiserror::Error;

/// Errors produced while building or slicing datasets.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    #[error("Invalid synthetic data parameter `{field}`: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    #[error("Feature and label counts differ: {features} feature rows, {labels} labels")]
    LengthMismatch { features: usize, labels: usize },

    #[error("Sample index {index} out of range for {len} samples")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Feature index {index} out of range for {dim} features")]
    FeatureOutOfRange { index: usize, dim: usize },
}
