//! Finite-difference checks of the analytic gradients of the leaf losses.

use ndarray::{array, Array2, ArrayD, IxDyn};
use sparseclust::losses::{GtcrLoss, ReconstructionLoss, RegLoss};

const STEP: f32 = 1e-3;
const TOLERANCE: f32 = 1e-2;
const ABS_FLOOR: f32 = 1e-4;

/// Compares two gradients element-wise and panics if they are not close.
fn assert_grads_are_close(analytic: &ArrayD<f32>, numeric: &ArrayD<f32>) {
    assert_eq!(analytic.shape(), numeric.shape(), "Gradient shapes do not match!");

    for (a, n) in analytic.iter().zip(numeric.iter()) {
        let diff = (a - n).abs();
        if diff < ABS_FLOOR {
            continue;
        }
        let relative_error = diff / a.abs().max(n.abs());
        assert!(
            relative_error <= TOLERANCE,
            "Gradients do not match! Analytic: {:.6}, Numeric: {:.6}, Relative Error: {:.6}",
            a,
            n,
            relative_error
        );
    }
}

/// Central differences of `f` around `x`.
fn numeric_grad(x: &ArrayD<f32>, step: f32, f: impl Fn(&ArrayD<f32>) -> f32) -> ArrayD<f32> {
    let mut grad = ArrayD::zeros(x.raw_dim());
    let mut probe = x.clone();
    for (i, g) in grad.iter_mut().enumerate() {
        let original = x.as_slice().expect("contiguous input")[i];
        probe.as_slice_mut().expect("contiguous probe")[i] = original + step;
        let plus = f(&probe);
        probe.as_slice_mut().expect("contiguous probe")[i] = original - step;
        let minus = f(&probe);
        probe.as_slice_mut().expect("contiguous probe")[i] = original;
        *g = (plus - minus) / (2.0 * step);
    }
    grad
}

#[test]
fn test_grad_reconstruction() {
    let loss = ReconstructionLoss::new();
    let y = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![0.0, 1.0, -2.0, 0.5, 0.25, 3.0]).unwrap();
    // every entry stays at least 0.1 away from y, clear of the kink
    let yhat = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![0.4, 0.7, -1.5, 0.1, 1.0, 2.6]).unwrap();

    let analytic = loss.grad(&y.view(), &yhat.view()).unwrap();
    let numeric = numeric_grad(&yhat, 1e-2, |probe| loss.evaluate(&y.view(), &probe.view()).unwrap());
    assert_grads_are_close(&analytic, &numeric);
}

#[test]
fn test_grad_gtcr() {
    let loss = GtcrLoss::new(0.5);
    let z: Array2<f32> = array![
        [0.3, -0.2, 0.5],
        [0.1, 0.4, -0.3],
        [-0.6, 0.2, 0.1],
        [0.2, -0.5, 0.4]
    ];
    let scale = 4.0;

    let analytic = loss.grad(&z.view(), scale).unwrap().into_dyn();
    let numeric = numeric_grad(&z.clone().into_dyn(), STEP, |probe| {
        let probe = probe.view().into_dimensionality::<ndarray::Ix2>().unwrap();
        loss.evaluate(&probe, scale).unwrap()
    });
    assert_grads_are_close(&analytic, &numeric);
}

#[test]
fn test_grad_gtcr_points_towards_expansion() {
    // Moving z along -grad must not increase the loss.
    let loss = GtcrLoss::new(0.5);
    let z: Array2<f32> = array![[1.0, 0.0], [0.0, 0.5], [0.5, 0.5]];
    let grad = loss.grad(&z.view(), 1.0).unwrap();
    let stepped = &z - &(grad * 0.1);
    let before = loss.evaluate(&z.view(), 1.0).unwrap();
    let after = loss.evaluate(&stepped.view(), 1.0).unwrap();
    assert!(after < before, "before {before}, after {after}");
}

#[test]
fn test_grad_reg() {
    let loss = RegLoss::new(0.5);
    let u = ArrayD::from_shape_vec(IxDyn(&[5]), vec![-1.2, -0.5, 0.0, 0.3, 1.1]).unwrap();

    let analytic = loss.grad(&u.view()).unwrap();
    let numeric = numeric_grad(&u, STEP, |probe| loss.evaluate(&probe.view()).unwrap());
    assert_grads_are_close(&analytic, &numeric);
}

#[test]
fn test_grad_reg_peaks_at_gate_midpoint() {
    let loss = RegLoss::new(0.25);
    let u = array![-1.0_f32, -0.5, 0.0];
    let grad = loss.grad(&u.view()).unwrap();
    assert!(grad[1] > grad[0]);
    assert!(grad[1] > grad[2]);
    assert!((grad[0] - grad[2]).abs() < 1e-6);
}
