//! Embedded Dormand-Prince 5(4) stepper with adaptive step size control.
//!
//! The stepper advances one accepted step per `step` call, following the
//! status/message protocol used by the solver facades: `status` becomes
//! "finished" when the bound time is reached and "failed" with a message when
//! the state turns non-finite or the step size collapses. The controller
//! accepts a step when the weighted RMS error estimate is below one and
//! rescales the step by 0.9 * err^(-1/5), clamped to [0.2, 5.0].

use log::{debug, error};
use nalgebra::DVector;

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

// Dormand-Prince 5(4) tableau
const C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];
const A: [[f64; 6]; 7] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];
// 5th order solution weights
const B: [f64; 7] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];
// embedded 4th order weights for the error estimate
const B_EMB: [f64; 7] = [
    5179.0 / 57600.0,
    0.0,
    7571.0 / 16695.0,
    393.0 / 640.0,
    -92097.0 / 339200.0,
    187.0 / 2100.0,
    1.0 / 40.0,
];

pub struct DormandPrince45 {
    pub f: Box<dyn Fn(f64, &DVector<f64>) -> DVector<f64>>,
    pub t: f64,
    pub y: DVector<f64>,
    h: f64,
    rtol: f64,
    atol: f64,
    max_step: f64,
    pub n_accepted: usize,
    pub n_rejected: usize,
}

impl DormandPrince45 {
    pub fn new(
        f: Box<dyn Fn(f64, &DVector<f64>) -> DVector<f64>>,
        t0: f64,
        y0: DVector<f64>,
        rtol: f64,
        atol: f64,
        max_step: f64,
        first_step: Option<f64>,
    ) -> Self {
        assert!(rtol > 0.0 && atol > 0.0, "tolerances must be positive");
        assert!(max_step > 0.0, "max_step must be positive");
        let h = first_step.unwrap_or(1e-4).min(max_step);
        DormandPrince45 {
            f,
            t: t0,
            y: y0,
            h,
            rtol,
            atol,
            max_step,
            n_accepted: 0,
            n_rejected: 0,
        }
    }

    /// Total right-hand-side evaluations so far.
    pub fn rhs_evaluations(&self) -> usize {
        7 * (self.n_accepted + self.n_rejected)
    }

    /// One trial step of size h: returns the 5th order solution and the
    /// weighted RMS error estimate of the embedded pair.
    fn attempt_step(&self, h: f64) -> (DVector<f64>, f64) {
        let t = self.t;
        let y = &self.y;
        let f = &self.f;
        let n = y.len();

        let mut k: Vec<DVector<f64>> = Vec::with_capacity(7);
        k.push(f(t, y));
        for i in 1..7 {
            let mut y_stage = y.clone();
            for j in 0..i {
                y_stage += h * A[i][j] * &k[j];
            }
            k.push(f(t + C[i] * h, &y_stage));
        }

        let mut y_new = y.clone();
        let mut y_emb = y.clone();
        for i in 0..7 {
            if B[i] != 0.0 {
                y_new += h * B[i] * &k[i];
            }
            if B_EMB[i] != 0.0 {
                y_emb += h * B_EMB[i] * &k[i];
            }
        }

        let mut err_sq = 0.0;
        for i in 0..n {
            let scale = self.atol + self.rtol * y[i].abs().max(y_new[i].abs());
            let e = (y_new[i] - y_emb[i]) / scale;
            err_sq += e * e;
        }
        let err = (err_sq / n as f64).sqrt();
        (y_new, err)
    }

    /// Advances by one accepted step toward t_bound, never overshooting it.
    /// Internal rejections shrink the step until the error test passes or the
    /// step size collapses.
    pub fn step(&mut self, t_bound: f64, status: &mut String, message: &mut Option<String>) {
        if self.t >= t_bound {
            *status = "finished".to_string();
            return;
        }
        loop {
            let remaining = t_bound - self.t;
            let mut h = self.h.min(self.max_step);
            let landing = h >= remaining;
            if landing {
                h = remaining;
            } else if h < 1e-14 * self.t.abs().max(1.0) {
                *status = "failed".to_string();
                *message = Some(format!("step size underflow at t = {:.6e}", self.t));
                error!("integration failed: {}", message.as_ref().unwrap());
                return;
            }

            let (y_new, err) = self.attempt_step(h);
            if !err.is_finite() || y_new.iter().any(|v| !v.is_finite()) {
                *status = "failed".to_string();
                *message = Some(format!("non-finite state at t = {:.6e}", self.t));
                error!("integration failed: {}", message.as_ref().unwrap());
                return;
            }

            if err <= 1.0 {
                self.t = if landing { t_bound } else { self.t + h };
                self.y = y_new;
                self.n_accepted += 1;
                let factor = if err == 0.0 {
                    MAX_FACTOR
                } else {
                    (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
                };
                self.h = (h * factor).min(self.max_step);
                *status = if self.t >= t_bound {
                    "finished".to_string()
                } else {
                    "running".to_string()
                };
                return;
            }

            self.n_rejected += 1;
            let factor = (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, 1.0);
            self.h = h * factor;
            debug!(
                "step rejected at t = {:.6e}, err = {:.3e}, h -> {:.3e}",
                self.t, err, self.h
            );
        }
    }
}
