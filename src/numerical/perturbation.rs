//! Propagation of initial-state perturbations through monodromy matrices.
//!
//! Given the per-sample jacobians J_k of a nominal trajectory, a small
//! initial perturbation delta evolves to first order as J_k * delta. The
//! helpers here produce the linearized deviations and predictions, the true
//! deviations of a re-simulated perturbed trajectory, and the image of a
//! ring of unit perturbation directions for phase-portrait overlays.

use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;

/// Row-wise difference perturbed - nominal of two trajectory matrices.
pub fn deviation(perturbed: &DMatrix<f64>, nominal: &DMatrix<f64>) -> DMatrix<f64> {
    assert_eq!(perturbed.shape(), nominal.shape(), "trajectory shape mismatch");
    perturbed - nominal
}

/// First-order deviation J_k * delta at every sample, one row per sample.
pub fn linearized_deviation(jacobians: &[DMatrix<f64>], delta: &DVector<f64>) -> DMatrix<f64> {
    assert!(!jacobians.is_empty(), "no jacobians given");
    let n = delta.len();
    let mut result = DMatrix::zeros(jacobians.len(), n);
    for (k, jac) in jacobians.iter().enumerate() {
        let moved = jac * delta;
        for j in 0..n {
            result[(k, j)] = moved[j];
        }
    }
    result
}

/// First-order prediction of the perturbed trajectory:
/// nominal + J_k * delta per sample.
pub fn linearized_prediction(
    nominal: &DMatrix<f64>,
    jacobians: &[DMatrix<f64>],
    delta: &DVector<f64>,
) -> DMatrix<f64> {
    assert_eq!(nominal.nrows(), jacobians.len(), "sample count mismatch");
    nominal + linearized_deviation(jacobians, delta)
}

/// Closed ring of unit perturbation directions: 2 x (n_points + 1) matrix of
/// (cos, sin) columns, the last column repeating the first.
pub fn unit_circle(n_points: usize) -> DMatrix<f64> {
    assert!(n_points >= 3, "a ring needs at least three points");
    DMatrix::from_fn(2, n_points + 1, |row, col| {
        let angle = 2.0 * PI * (col % n_points) as f64 / n_points as f64;
        if row == 0 { angle.cos() } else { angle.sin() }
    })
}

/// Image of the unit ring under scale * J, shifted to a center point of the
/// phase plane. The result is ready for plotting. Two-state systems only.
pub fn ellipse_overlay(
    jac: &DMatrix<f64>,
    circle: &DMatrix<f64>,
    scale: f64,
    center: (f64, f64),
) -> Vec<(f64, f64)> {
    assert_eq!(jac.shape(), (2, 2), "overlay is defined for 2-state systems");
    assert_eq!(circle.nrows(), 2, "ring must have two rows");
    let image = jac * circle;
    (0..image.ncols())
        .map(|col| {
            (
                scale * image[(0, col)] + center.0,
                scale * image[(1, col)] + center.1,
            )
        })
        .collect()
}
