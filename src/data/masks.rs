//! Random corruption for the denoising paths.
//!
//! The input path multiplies samples by a 0/1 mask; the latent path adds
//! small Gaussian noise. Both draw from a caller-supplied RNG.

use super::DataError;
use ndarray::{Array, ArrayView, Dimension, ShapeBuilder, Zip};
use ndarray_rand::rand_distr::{Normal, Uniform};
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Kind of random tensor to draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaskKind {
    /// 0/1 mask; each entry is zero with probability `zero_ratio`.
    Input { zero_ratio: f32 },
    /// Gaussian noise with the given mean and standard deviation.
    Noise { mean: f32, std: f32 },
}

impl MaskKind {
    fn validate(&self) -> Result<(), DataError> {
        match *self {
            MaskKind::Input { zero_ratio } if !(0.0..=1.0).contains(&zero_ratio) => {
                Err(DataError::InvalidParameter {
                    field: "zero_ratio",
                    reason: format!("must lie in [0, 1], got {zero_ratio}"),
                })
            }
            MaskKind::Noise { mean, std } if !(mean.is_finite() && std.is_finite() && std >= 0.0) => {
                Err(DataError::InvalidParameter {
                    field: "std",
                    reason: format!("need finite mean and std >= 0, got mean {mean}, std {std}"),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Draws a random tensor of the given shape.
pub fn random_mask<Sh, D, R>(shape: Sh, kind: MaskKind, rng: &mut R) -> Result<Array<f32, D>, DataError>
where
    Sh: ShapeBuilder<Dim = D>,
    D: Dimension,
    R: Rng + ?Sized,
{
    kind.validate()?;
    let mask = match kind {
        MaskKind::Input { zero_ratio } => {
            let uniform = Uniform::new(0.0_f32, 1.0);
            Array::random_using(shape, uniform, rng).mapv(|u| if u < zero_ratio { 0.0 } else { 1.0 })
        }
        MaskKind::Noise { mean, std } => {
            let normal = Normal::new(mean, std).map_err(|e| DataError::InvalidParameter {
                field: "std",
                reason: e.to_string(),
            })?;
            Array::random_using(shape, normal, rng)
        }
    };
    Ok(mask)
}

/// Corrupts `x` with a freshly drawn mask: multiplied for
/// [`MaskKind::Input`], added for [`MaskKind::Noise`].
pub fn apply_mask<D, R>(x: &ArrayView<f32, D>, kind: MaskKind, rng: &mut R) -> Result<Array<f32, D>, DataError>
where
    D: Dimension,
    R: Rng + ?Sized,
{
    let mut out = random_mask(x.raw_dim(), kind, rng)?;
    match kind {
        MaskKind::Input { .. } => Zip::from(&mut out).and(x).for_each(|m, &v| *m *= v),
        MaskKind::Noise { .. } => Zip::from(&mut out).and(x).for_each(|m, &v| *m += v),
    }
    Ok(out)
}
