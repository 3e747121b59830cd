//! # sparseclust: coding-rate losses for clustering with feature selection
//!
//! **sparseclust** provides the objectives used to train a clustering model
//! that jointly learns *which input features matter*. Feature gates are
//! relaxed through a Gaussian CDF and pushed towards sparsity, while a
//! coding-rate term keeps latent representations expansive and a
//! per-cluster term compresses each soft cluster.
//!
//! ## Usage Example
//!
//! ```
//! use ndarray::array;
//! use sparseclust::losses::{ClusterInputs, ClusterLoss, Loss};
//!
//! let h = array![[0.1_f32, 0.4], [0.9, -0.3], [0.2, 0.2]];
//! let yhat = array![[0.8_f32, 0.2], [0.1, 0.9], [0.6, 0.4]];
//!
//! let loss = ClusterLoss::new(2, 1e-3, true);
//! let out = loss.forward(ClusterInputs::new(h.view(), yhat.view(), 1.0, 1.0)).unwrap();
//! assert_eq!(out.arity(), 1);
//! assert!(out.cluster().is_finite());
//! ```

pub mod config;
pub mod data;
pub mod linalg;
pub mod losses;
pub mod metrics;
pub mod schedule;
pub mod serialization;

pub use config::{ConfigError, ExperimentConfig, LossConfig};
pub use losses::{Loss, LossError, LossResult};

/// Crate version, as recorded in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
