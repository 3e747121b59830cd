//! Dataset serialization.
//!
//! - **SafeTensors**: features and labels of a [`ClusterDataset`](crate::data::ClusterDataset)
//! - **JSON**: experiment configuration, see [`crate::config`]
//!
//! # Example
//!
//! ```rust,ignore
//! use sparseclust::serialization::{save_dataset, load_dataset};
//!
//! save_dataset("blobs.safetensors", &dataset)?;
//! let restored = load_dataset("blobs.safetensors")?;
//! ```

pub mod safetensors_io;

pub use safetensors_io::{list_tensors, load_dataset, save_dataset, tensor_info, SafeTensorsError};
