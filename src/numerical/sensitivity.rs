//! Forward sensitivity through the variational equations.
//!
//! The state is augmented with the state-transition matrix S = dx(t)/dx(t0):
//! S' = (df/dx) * S, S(t0) = I, and the augmented system [x; vec(S)] is
//! integrated with the same adaptive stepper as the plain trajectory. At any
//! sample time S is the monodromy matrix of the flow map from t0 to that
//! time. Two of the three extraction procedures live here: the single-shot
//! run to the final time and the batch run over a full sample grid. The
//! segment-chained procedure builds on this module.

use crate::numerical::dopri::DormandPrince45;
use crate::symbolic::ode_model::OdeSystem;
use log::info;
use nalgebra::{DMatrix, DVector};

/// Euclidean (Frobenius) norm of the difference of two jacobians, the
/// quantity the cross-check assertions bound.
pub fn jacobian_difference(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
    (a - b).norm()
}

pub struct SensitivitySolver {
    pub system: OdeSystem,
    pub rtol: f64,
    pub atol: f64,
    pub max_step: f64,
    pub first_step: Option<f64>,
}

impl SensitivitySolver {
    pub fn new(system: OdeSystem, rtol: f64, atol: f64) -> Self {
        SensitivitySolver {
            system,
            rtol,
            atol,
            max_step: f64::INFINITY,
            first_step: None,
        }
    }

    /// Right-hand side of the augmented system z = [x; vec(S)] for fixed
    /// parameter values. vec(S) is column-major.
    fn augmented_rhs(&self, p: &DVector<f64>) -> Box<dyn Fn(f64, &DVector<f64>) -> DVector<f64>> {
        let f = self.system.rhs_fun();
        let jacf = self.system.jacobian_fun();
        let p = p.clone_owned();
        let n = self.system.n_states();
        Box::new(move |t, z| {
            let x = DVector::from_column_slice(&z.as_slice()[..n]);
            let s = DMatrix::from_column_slice(n, n, &z.as_slice()[n..]);
            let fx = f(t, &x, &p);
            let ds = jacf(t, &x, &p) * s;
            let mut dz = DVector::zeros(n + n * n);
            dz.rows_mut(0, n).copy_from(&fx);
            dz.rows_mut(n, n * n)
                .copy_from(&DVector::from_column_slice(ds.as_slice()));
            dz
        })
    }

    /// Integrates the augmented system across the time points `ts` in one
    /// continuous adaptive run and records the state and the transition
    /// matrix at every point, the first one included (S(ts[0]) = I).
    pub fn propagate(
        &self,
        x0: &DVector<f64>,
        p: &DVector<f64>,
        ts: &[f64],
    ) -> Result<(Vec<DVector<f64>>, Vec<DMatrix<f64>>), String> {
        assert!(ts.len() >= 2, "need at least the start and end time");
        assert_eq!(
            x0.len(),
            self.system.n_states(),
            "initial state length does not match the system"
        );
        assert_eq!(
            p.len(),
            self.system.n_params(),
            "parameter vector length does not match the system"
        );
        let n = self.system.n_states();
        let eye = DMatrix::<f64>::identity(n, n);
        let mut z0 = DVector::zeros(n + n * n);
        z0.rows_mut(0, n).copy_from(x0);
        z0.rows_mut(n, n * n)
            .copy_from(&DVector::from_column_slice(eye.as_slice()));

        let mut stepper = DormandPrince45::new(
            self.augmented_rhs(p),
            ts[0],
            z0,
            self.rtol,
            self.atol,
            self.max_step,
            self.first_step,
        );

        let mut states = vec![x0.clone_owned()];
        let mut jacobians = vec![eye];
        let mut status = "running".to_string();
        let mut message: Option<String> = None;
        for &t_next in &ts[1..] {
            assert!(t_next > stepper.t, "time points must be strictly increasing");
            status = "running".to_string();
            while status == "running" {
                stepper.step(t_next, &mut status, &mut message);
            }
            if status == "failed" {
                return Err(message.unwrap_or_else(|| "sensitivity run failed".to_string()));
            }
            let z = &stepper.y;
            states.push(DVector::from_column_slice(&z.as_slice()[..n]));
            jacobians.push(DMatrix::from_column_slice(n, n, &z.as_slice()[n..]));
        }
        info!(
            "sensitivity run finished: {} points, {} accepted steps",
            ts.len(),
            stepper.n_accepted
        );
        Ok((states, jacobians))
    }

    /// Single-shot procedure: monodromy matrix of the map x0 -> x(t_bound),
    /// together with the final state itself.
    pub fn final_state_jacobian(
        &self,
        x0: &DVector<f64>,
        p: &DVector<f64>,
        t0: f64,
        t_bound: f64,
    ) -> Result<(DVector<f64>, DMatrix<f64>), String> {
        let (states, jacobians) = self.propagate(x0, p, &[t0, t_bound])?;
        Ok((states[1].clone(), jacobians[1].clone()))
    }

    /// Batch procedure: trajectory and one monodromy matrix per sample time.
    pub fn sampled_state_jacobians(
        &self,
        x0: &DVector<f64>,
        p: &DVector<f64>,
        ts: &DVector<f64>,
    ) -> Result<(DMatrix<f64>, Vec<DMatrix<f64>>), String> {
        let ts_slice: Vec<f64> = ts.iter().copied().collect();
        let (states, jacobians) = self.propagate(x0, p, &ts_slice)?;
        let n = self.system.n_states();
        let trajectory = DMatrix::from_fn(states.len(), n, |i, j| states[i][j]);
        Ok((trajectory, jacobians))
    }
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests_sensitivity {
    use super::*;
    use crate::numerical::simulator::linspace;
    use crate::symbolic::symbolic_engine::Expr;
    use approx::assert_relative_eq;

    fn harmonic() -> OdeSystem {
        OdeSystem::new(
            "t".to_string(),
            vec!["x1".to_string(), "x2".to_string()],
            vec!["w0".to_string()],
            Expr::parse_vector_expression(vec!["x2", "-w0^2*x1"]),
        )
    }

    /// closed-form transition matrix of the harmonic oscillator
    fn harmonic_monodromy(w0: f64, t: f64) -> DMatrix<f64> {
        DMatrix::from_row_slice(
            2,
            2,
            &[
                (w0 * t).cos(),
                (w0 * t).sin() / w0,
                -w0 * (w0 * t).sin(),
                (w0 * t).cos(),
            ],
        )
    }

    #[test]
    fn test_final_jacobian_matches_closed_form() {
        let w0 = 2.0;
        let solver = SensitivitySolver::new(harmonic(), 1e-12, 1e-12);
        let x0 = DVector::from_vec(vec![1.0, 0.5]);
        let p = DVector::from_vec(vec![w0]);
        let (_, jac) = solver.final_state_jacobian(&x0, &p, 0.0, 1.7).unwrap();
        let exact = harmonic_monodromy(w0, 1.7);
        assert!(jacobian_difference(&jac, &exact) < 1e-8);
    }

    #[test]
    fn test_monodromy_independent_of_initial_state_for_linear_system() {
        // for a linear system the transition matrix does not depend on x0
        let solver = SensitivitySolver::new(harmonic(), 1e-10, 1e-10);
        let p = DVector::from_vec(vec![3.0]);
        let (_, jac_a) = solver
            .final_state_jacobian(&DVector::from_vec(vec![1.0, 0.0]), &p, 0.0, 2.0)
            .unwrap();
        let (_, jac_b) = solver
            .final_state_jacobian(&DVector::from_vec(vec![-2.0, 1.0]), &p, 0.0, 2.0)
            .unwrap();
        assert!(jacobian_difference(&jac_a, &jac_b) < 1e-7);
    }

    #[test]
    fn test_sampled_jacobians_match_closed_form_along_grid() {
        let w0 = 1.5;
        let solver = SensitivitySolver::new(harmonic(), 1e-10, 1e-10);
        let x0 = DVector::from_vec(vec![0.3, -0.2]);
        let p = DVector::from_vec(vec![w0]);
        let ts = linspace(0.0, 4.0, 41);
        let (_, jacobians) = solver.sampled_state_jacobians(&x0, &p, &ts).unwrap();
        assert_eq!(jacobians.len(), 41);
        for (k, jac) in jacobians.iter().enumerate() {
            let exact = harmonic_monodromy(w0, ts[k]);
            assert!(jacobian_difference(jac, &exact) < 1e-7);
        }
    }

    #[test]
    fn test_first_jacobian_is_identity() {
        let solver = SensitivitySolver::new(harmonic(), 1e-8, 1e-8);
        let ts = linspace(0.0, 1.0, 5);
        let (_, jacobians) = solver
            .sampled_state_jacobians(
                &DVector::from_vec(vec![1.0, 0.0]),
                &DVector::from_vec(vec![1.0]),
                &ts,
            )
            .unwrap();
        assert_eq!(jacobians[0], DMatrix::identity(2, 2));
    }

    #[test]
    fn test_jacobian_against_finite_differences() {
        // quintic oscillator, short horizon; central differences as reference
        let eqs = Expr::parse_vector_expression(vec![
            "x2",
            "(-(-w0^2*x1 + a3*x1^3 + a5*x1^5) - (2*mu1*x2 + mu3*x2^3) + f)/100",
        ]);
        let system = OdeSystem::new(
            "t".to_string(),
            vec!["x1".to_string(), "x2".to_string()],
            vec![
                "w0".to_string(),
                "a3".to_string(),
                "a5".to_string(),
                "mu1".to_string(),
                "mu3".to_string(),
                "f".to_string(),
            ],
            eqs,
        );
        let w0: f64 = 5.278;
        let p = DVector::from_vec(vec![w0, -1.402 * w0 * w0, 0.271 * w0 * w0, 0.0, 0.0, 0.0]);
        let x0 = DVector::from_vec(vec![-3.1, 0.0]);
        let (t0, tf) = (0.0, 2.0);

        let solver = SensitivitySolver::new(system.clone(), 1e-12, 1e-12);
        let (_, jac) = solver.final_state_jacobian(&x0, &p, t0, tf).unwrap();

        let flow = |x: &DVector<f64>| -> DVector<f64> {
            let (states, _) = solver.propagate(x, &p, &[t0, tf]).unwrap();
            states[1].clone()
        };
        let eps = 1e-6;
        for j in 0..2 {
            let mut plus = x0.clone();
            let mut minus = x0.clone();
            plus[j] += eps;
            minus[j] -= eps;
            let column = (flow(&plus) - flow(&minus)) / (2.0 * eps);
            for i in 0..2 {
                assert_relative_eq!(jac[(i, j)], column[i], epsilon = 1e-4, max_relative = 1e-4);
            }
        }
    }

    #[test]
    fn test_single_shot_matches_batch_final_sample() {
        let solver = SensitivitySolver::new(harmonic(), 1e-12, 1e-12);
        let x0 = DVector::from_vec(vec![1.0, 0.0]);
        let p = DVector::from_vec(vec![5.278]);
        let ts = linspace(0.0, 10.0, 200);
        let (_, single) = solver.final_state_jacobian(&x0, &p, 0.0, 10.0).unwrap();
        let (_, batch) = solver.sampled_state_jacobians(&x0, &p, &ts).unwrap();
        let diff = jacobian_difference(&single, batch.last().unwrap());
        assert!(diff < 1e-4, "procedures disagree: {}", diff);
    }
}
