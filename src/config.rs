//! Experiment configuration.
//!
//! [`ExperimentConfig`] gathers every tunable value of the crate: the loss
//! hyper-parameters, the synthetic dataset, the mask generator and the cosine
//! schedule. It is serialisable via [`serde`] so it can be stored as JSON and
//! reloaded; [`ExperimentConfig::validate`] must pass before the values are
//! handed to the loss constructors, which panic on invalid input.

use crate::data::masks::MaskKind;
use crate::data::synthetic::SyntheticConfig;
use crate::data::DataError;
use crate::schedule::CosineSchedule;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced when loading, saving or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Cannot read config file `{path}`: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write config file `{path}`: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse config file `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot serialise config: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl ConfigError {
    pub fn invalid_value<S: Into<String>>(field: &'static str, reason: S) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

impl From<DataError> for ConfigError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::InvalidParameter { field, reason } => ConfigError::InvalidValue { field, reason },
            other => ConfigError::invalid_value("synthetic", other.to_string()),
        }
    }
}

fn ensure_positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ConfigError::invalid_value(
            field,
            format!("must be a finite number > 0.0, got {value}"),
        ));
    }
    Ok(())
}

fn ensure_non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(ConfigError::invalid_value(
            field,
            format!("must be a finite number >= 0.0, got {value}"),
        ));
    }
    Ok(())
}

/// Hyper-parameters of the loss family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LossConfig {
    /// Distortion of the coding-rate terms.
    pub epsilon: f32,
    /// Width of the gate-sparsity regulariser.
    pub reg_sigma: f32,
    /// Weight of the gate-path and input-denoising reconstructions.
    pub local_gates_lmbd: f32,
    /// Number of clusters `C`.
    pub nb_classes: usize,
    /// Weight of the per-cluster compression term.
    pub gamma: f32,
    /// Weight of the gate-sparsity term.
    pub lmbd: f32,
    /// Start in pretrain mode.
    pub pretrain: bool,
}

impl Default for LossConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-3,
            reg_sigma: 0.5,
            local_gates_lmbd: 100.0,
            nb_classes: 4,
            gamma: 1.0,
            lmbd: 1.0,
            pretrain: true,
        }
    }
}

impl LossConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_positive("losses.epsilon", self.epsilon)?;
        ensure_positive("losses.reg_sigma", self.reg_sigma)?;
        ensure_positive("losses.local_gates_lmbd", self.local_gates_lmbd)?;
        if self.nb_classes == 0 {
            return Err(ConfigError::invalid_value("losses.nb_classes", "must be > 0"));
        }
        ensure_non_negative("losses.gamma", self.gamma)?;
        ensure_non_negative("losses.lmbd", self.lmbd)?;
        Ok(())
    }
}

/// Parameters of the random input mask and latent noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    /// Probability of zeroing an input entry.
    pub zero_ratio: f32,
    /// Mean of the latent noise.
    pub noise_mean: f32,
    /// Standard deviation of the latent noise.
    pub noise_std: f32,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            zero_ratio: 0.9,
            noise_mean: 0.0,
            noise_std: 1e-2,
        }
    }
}

impl MaskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.zero_ratio) {
            return Err(ConfigError::invalid_value(
                "mask.zero_ratio",
                format!("must lie in [0, 1], got {}", self.zero_ratio),
            ));
        }
        if !self.noise_mean.is_finite() {
            return Err(ConfigError::invalid_value("mask.noise_mean", "must be finite"));
        }
        ensure_non_negative("mask.noise_std", self.noise_std)
    }

    pub fn input_kind(&self) -> MaskKind {
        MaskKind::Input {
            zero_ratio: self.zero_ratio,
        }
    }

    pub fn noise_kind(&self) -> MaskKind {
        MaskKind::Noise {
            mean: self.noise_mean,
            std: self.noise_std,
        }
    }
}

/// Bounds and length of the cosine schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub total_epochs: usize,
    pub min_val: f64,
    pub max_val: f64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            total_epochs: 100,
            min_val: 0.0,
            max_val: 1.0,
        }
    }
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_epochs == 0 {
            return Err(ConfigError::invalid_value("schedule.total_epochs", "must be > 0"));
        }
        if !(self.min_val.is_finite() && self.max_val.is_finite()) {
            return Err(ConfigError::invalid_value(
                "schedule.min_val",
                "bounds must be finite",
            ));
        }
        Ok(())
    }

    pub fn schedule(&self) -> CosineSchedule {
        CosineSchedule::new(self.total_epochs, self.min_val, self.max_val)
    }
}

/// Complete configuration of one experiment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub losses: LossConfig,
    pub synthetic: SyntheticConfig,
    pub mask: MaskConfig,
    pub schedule: ScheduleConfig,
}

impl ExperimentConfig {
    /// Loads a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        fs::write(path, json).map_err(|source| ConfigError::FileWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.losses.validate()?;
        self.synthetic.validate()?;
        self.mask.validate()?;
        self.schedule.validate()?;

        let clusters = self.synthetic.centers.len();
        if clusters != self.losses.nb_classes {
            return Err(ConfigError::invalid_value(
                "losses.nb_classes",
                format!(
                    "must match the {clusters} synthetic cluster centers, got {}",
                    self.losses.nb_classes
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ExperimentConfig::default().validate().expect("default config must be valid");
    }

    #[test]
    fn config_fields_have_expected_defaults() {
        let cfg = ExperimentConfig::default();
        assert_eq!(cfg.losses.epsilon, 1e-3);
        assert_eq!(cfg.losses.reg_sigma, 0.5);
        assert_eq!(cfg.losses.local_gates_lmbd, 100.0);
        assert!(cfg.losses.pretrain);
        assert_eq!(cfg.mask.zero_ratio, 0.9);
        assert_eq!(cfg.mask.noise_std, 1e-2);
        assert_eq!(cfg.synthetic.samples_per_cluster, 800);
    }

    #[test]
    fn json_round_trip() {
        let mut cfg = ExperimentConfig::default();
        cfg.losses.gamma = 0.25;
        cfg.schedule.total_epochs = 7;
        let path = std::env::temp_dir().join(format!("sparseclust_cfg_{}.json", std::process::id()));
        cfg.to_json(&path).expect("write");
        let loaded = ExperimentConfig::from_json(&path).expect("read");
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: ExperimentConfig =
            serde_json::from_str(r#"{ "losses": { "gamma": 2.0 } }"#).unwrap();
        assert_eq!(cfg.losses.gamma, 2.0);
        assert_eq!(cfg.losses.epsilon, 1e-3);
        assert_eq!(cfg.schedule, ScheduleConfig::default());
    }

    #[test]
    fn zero_epsilon_is_invalid() {
        let mut cfg = ExperimentConfig::default();
        cfg.losses.epsilon = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { field: "losses.epsilon", .. })
        ));
    }

    #[test]
    fn zero_ratio_out_of_range_is_invalid() {
        let mut cfg = ExperimentConfig::default();
        cfg.mask.zero_ratio = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn class_count_must_match_centers() {
        let mut cfg = ExperimentConfig::default();
        cfg.losses.nb_classes = 3;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { field: "losses.nb_classes", .. })
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = ExperimentConfig::from_json(Path::new("/nonexistent/sparseclust.json")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }
}
