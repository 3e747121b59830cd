//! Dataset persistence in the SafeTensors format.
//!
//! A dataset file holds two tensors:
//! - `features`: F32, shape `[N, D]`
//! - `labels`: I64, shape `[N]`

use crate::data::ClusterDataset;
use ndarray::{Array1, Array2};
use safetensors::tensor::{SafeTensors, TensorView};
use safetensors::{serialize_to_file, Dtype};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const FEATURES_TENSOR: &str = "features";
pub const LABELS_TENSOR: &str = "labels";

/// Errors raised while reading or writing SafeTensors files.
#[derive(Error, Debug)]
pub enum SafeTensorsError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SafeTensors error: {0}")]
    SafeTensorsError(#[from] safetensors::SafeTensorError),

    #[error("Unsupported dtype for `{name}`: expected {expected}, found {found}")]
    UnsupportedDtype {
        name: String,
        expected: &'static str,
        found: String,
    },

    #[error("Tensor shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Tensor '{0}' not found")]
    TensorNotFound(String),

    #[error("Label {0} is not a valid cluster index")]
    InvalidLabel(i64),
}

type Result<T> = std::result::Result<T, SafeTensorsError>;

/// Writes `dataset` to `path` as the `features` / `labels` tensor pair.
pub fn save_dataset<P: AsRef<Path>>(path: P, dataset: &ClusterDataset) -> Result<()> {
    let features = dataset.features();
    let feature_bytes: Vec<u8> = features.iter().flat_map(|&x| x.to_le_bytes()).collect();
    let label_bytes: Vec<u8> = dataset
        .labels()
        .iter()
        .flat_map(|&l| (l as i64).to_le_bytes())
        .collect();

    let views = vec![
        (
            FEATURES_TENSOR,
            TensorView::new(Dtype::F32, features.shape().to_vec(), &feature_bytes)?,
        ),
        (
            LABELS_TENSOR,
            TensorView::new(Dtype::I64, vec![dataset.num_samples()], &label_bytes)?,
        ),
    ];
    let metadata = HashMap::from([("num_clusters".to_string(), dataset.num_clusters().to_string())]);
    serialize_to_file(views, &Some(metadata), path.as_ref())?;

    debug!(
        path = %path.as_ref().display(),
        samples = dataset.num_samples(),
        features = dataset.num_features(),
        "saved dataset"
    );
    Ok(())
}

/// Reads a dataset written by [`save_dataset`].
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<ClusterDataset> {
    let buffer = fs::read(path.as_ref())?;
    let tensors = SafeTensors::deserialize(&buffer)?;

    let features = find(&tensors, FEATURES_TENSOR)?;
    check_dtype(FEATURES_TENSOR, &features, Dtype::F32, "F32")?;
    let shape = features.shape().to_vec();
    let (rows, cols) = match shape[..] {
        [rows, cols] => (rows, cols),
        _ => {
            return Err(SafeTensorsError::ShapeMismatch {
                expected: vec![0, 0],
                actual: shape.clone(),
            })
        }
    };
    let values: Vec<f32> = features
        .data()
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    let features = Array2::from_shape_vec((rows, cols), values).map_err(|_| {
        SafeTensorsError::ShapeMismatch {
            expected: vec![rows, cols],
            actual: vec![features.data().len() / 4],
        }
    })?;

    let labels = find(&tensors, LABELS_TENSOR)?;
    check_dtype(LABELS_TENSOR, &labels, Dtype::I64, "I64")?;
    if labels.shape() != [rows] {
        return Err(SafeTensorsError::ShapeMismatch {
            expected: vec![rows],
            actual: labels.shape().to_vec(),
        });
    }
    let labels = labels
        .data()
        .chunks_exact(8)
        .map(|chunk| {
            let mut bytes = [0_u8; 8];
            bytes.copy_from_slice(chunk);
            let label = i64::from_le_bytes(bytes);
            usize::try_from(label).map_err(|_| SafeTensorsError::InvalidLabel(label))
        })
        .collect::<Result<Vec<usize>>>()?;

    Ok(ClusterDataset::new(features, Array1::from_vec(labels)))
}

fn find<'data>(tensors: &SafeTensors<'data>, name: &str) -> Result<TensorView<'data>> {
    tensors
        .tensor(name)
        .map_err(|_| SafeTensorsError::TensorNotFound(name.to_string()))
}

fn check_dtype(name: &str, view: &TensorView<'_>, dtype: Dtype, expected: &'static str) -> Result<()> {
    if view.dtype() != dtype {
        return Err(SafeTensorsError::UnsupportedDtype {
            name: name.to_string(),
            expected,
            found: format!("{:?}", view.dtype()),
        });
    }
    Ok(())
}

/// Names of the tensors stored in a SafeTensors file.
pub fn list_tensors<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let buffer = fs::read(path.as_ref())?;
    let tensors = SafeTensors::deserialize(&buffer)?;
    let mut names: Vec<String> = tensors.names().iter().map(|s| s.to_string()).collect();
    names.sort();
    Ok(names)
}

/// Name, shape and dtype of every tensor in a SafeTensors file.
pub fn tensor_info<P: AsRef<Path>>(path: P) -> Result<Vec<(String, Vec<usize>, String)>> {
    let buffer = fs::read(path.as_ref())?;
    let tensors = SafeTensors::deserialize(&buffer)?;
    let mut info: Vec<(String, Vec<usize>, String)> = tensors
        .tensors()
        .into_iter()
        .map(|(name, tensor)| (name, tensor.shape().to_vec(), format!("{:?}", tensor.dtype())))
        .collect();
    info.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sparseclust_{}_{}.safetensors", name, std::process::id()))
    }

    #[test]
    fn test_save_load_dataset() {
        let dataset = ClusterDataset::new(
            array![[1.0, -2.0, 3.5], [0.25, 5.0, -6.0]],
            array![3, 0],
        );
        let path = temp_path("roundtrip");

        save_dataset(&path, &dataset).expect("Failed to save");
        let loaded = load_dataset(&path).expect("Failed to load");
        fs::remove_file(&path).ok();

        assert_eq!(loaded, dataset);
    }

    #[test]
    fn test_tensor_listing() {
        let dataset = ClusterDataset::new(Array2::zeros((4, 2)), array![0, 1, 1, 0]);
        let path = temp_path("listing");
        save_dataset(&path, &dataset).expect("Failed to save");

        let names = list_tensors(&path).expect("Failed to list");
        let info = tensor_info(&path).expect("Failed to read info");
        fs::remove_file(&path).ok();

        assert_eq!(names, vec!["features".to_string(), "labels".to_string()]);
        assert_eq!(info[0], ("features".to_string(), vec![4, 2], "F32".to_string()));
        assert_eq!(info[1], ("labels".to_string(), vec![4], "I64".to_string()));
    }

    #[test]
    fn test_missing_tensor_is_reported() {
        let path = temp_path("missing");
        let data: Vec<u8> = [1.0_f32, 2.0].iter().flat_map(|x| x.to_le_bytes()).collect();
        let view = TensorView::new(Dtype::F32, vec![1, 2], &data).unwrap();
        serialize_to_file(vec![(FEATURES_TENSOR, view)], &None, &path).unwrap();

        let err = load_dataset(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, SafeTensorsError::TensorNotFound(name) if name == "labels"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_dataset("/nonexistent/sparseclust.safetensors").unwrap_err();
        assert!(matches!(err, SafeTensorsError::IoError(_)));
    }
}
