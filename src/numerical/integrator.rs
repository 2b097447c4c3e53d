//! Single-shot integration facade: configure once with (system, horizon,
//! tolerances), feed an initial state and parameter values, call `solve`.
//! The map x0 -> x(t_bound) that this facade evaluates is the one the
//! sensitivity procedures differentiate.

use crate::Utils::file_save::save_matrix_to_csv;
use crate::Utils::plots::plots;
use crate::numerical::dopri::DormandPrince45;
use crate::symbolic::ode_model::OdeSystem;
use chrono::Local;
use log::info;
use nalgebra::{DMatrix, DVector};
use std::time::Instant;
use tabled::{builder::Builder, settings::Style};

pub struct OdeIntegrator {
    pub system: OdeSystem,
    pub t0: f64,
    pub t_bound: f64,
    pub rtol: f64,
    pub atol: f64,
    pub max_step: f64,
    pub first_step: Option<f64>,
    x0: DVector<f64>,
    p: DVector<f64>,
    pub status: String,
    pub message: Option<String>,
    t_result: DVector<f64>,
    y_result: DMatrix<f64>,
    n_accepted: usize,
    n_rejected: usize,
    solve_time_ms: u128,
}

impl OdeIntegrator {
    pub fn new(
        system: OdeSystem,
        t0: f64,
        t_bound: f64,
        rtol: f64,
        atol: f64,
        max_step: f64,
        first_step: Option<f64>,
    ) -> Self {
        assert!(t_bound > t0, "t_bound must be greater than t0");
        let n = system.n_states();
        let n_params = system.n_params();
        OdeIntegrator {
            system,
            t0,
            t_bound,
            rtol,
            atol,
            max_step,
            first_step,
            x0: DVector::zeros(n),
            p: DVector::zeros(n_params),
            status: "running".to_string(),
            message: None,
            t_result: DVector::zeros(1),
            y_result: DMatrix::zeros(1, 1),
            n_accepted: 0,
            n_rejected: 0,
            solve_time_ms: 0,
        }
    }

    pub fn set_initial_state(&mut self, x0: DVector<f64>) {
        assert_eq!(
            x0.len(),
            self.system.n_states(),
            "initial state length does not match the system"
        );
        self.x0 = x0;
    }

    pub fn set_parameters(&mut self, p: DVector<f64>) {
        assert_eq!(
            p.len(),
            self.system.n_params(),
            "parameter vector length does not match the system"
        );
        self.p = p;
    }

    /// Integrates from t0 to t_bound, storing every accepted step.
    /// Re-running with unchanged inputs reproduces the result exactly.
    pub fn solve(&mut self) -> Result<(), String> {
        let start = Instant::now();
        info!(
            "integration started at {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let rhs = self.system.rhs_fun();
        let p = self.p.clone();
        let f: Box<dyn Fn(f64, &DVector<f64>) -> DVector<f64>> =
            Box::new(move |t, y| rhs(t, y, &p));
        let mut stepper = DormandPrince45::new(
            f,
            self.t0,
            self.x0.clone(),
            self.rtol,
            self.atol,
            self.max_step,
            self.first_step,
        );

        let mut t: Vec<f64> = vec![self.t0];
        let mut y: Vec<DVector<f64>> = vec![self.x0.clone()];
        self.status = "running".to_string();
        self.message = None;
        while self.status == "running" {
            stepper.step(self.t_bound, &mut self.status, &mut self.message);
            if self.status != "failed" {
                t.push(stepper.t);
                y.push(stepper.y.clone());
            }
        }

        let rows = y.len();
        let cols = y[0].len();
        let mut flat_vec: Vec<f64> = Vec::with_capacity(rows * cols);
        for vector in y.iter() {
            flat_vec.extend(vector.iter());
        }
        self.y_result = DMatrix::from_vec(cols, rows, flat_vec).transpose();
        self.t_result = DVector::from_vec(t);
        self.n_accepted = stepper.n_accepted;
        self.n_rejected = stepper.n_rejected;
        self.solve_time_ms = start.elapsed().as_millis();
        info!("integration took {} milliseconds", self.solve_time_ms);

        if self.status == "failed" {
            return Err(self
                .message
                .clone()
                .unwrap_or_else(|| "integration failed".to_string()));
        }
        Ok(())
    }

    /// One-call mode: initial state in, final state out.
    pub fn final_state(&mut self) -> Result<DVector<f64>, String> {
        self.solve()?;
        let last = self.y_result.row(self.y_result.nrows() - 1);
        Ok(last.transpose())
    }

    pub fn get_result(&self) -> (DVector<f64>, DMatrix<f64>) {
        (self.t_result.clone(), self.y_result.clone())
    }

    pub fn plot_result(&self) {
        plots(
            self.system.arg.clone(),
            self.system.values.clone(),
            self.t_result.clone(),
            self.y_result.clone(),
        );
        println!("result plotted");
    }

    pub fn save_result(&self) -> Result<(), Box<dyn std::error::Error>> {
        let file_name = format!(
            "{}+{}.csv",
            self.system.arg,
            self.system.values.join("+")
        );
        save_matrix_to_csv(
            &self.y_result,
            &self.system.values,
            &file_name,
            &self.t_result,
            &self.system.arg,
        )?;
        println!("result saved");
        Ok(())
    }

    /// Pretty table with the run statistics.
    pub fn print_statistics(&self) {
        let mut builder = Builder::default();
        builder.push_record(["metric", "value"]);
        builder.push_record(["status", self.status.as_str()]);
        builder.push_record(["accepted steps", self.n_accepted.to_string().as_str()]);
        builder.push_record(["rejected steps", self.n_rejected.to_string().as_str()]);
        builder.push_record([
            "rhs evaluations",
            (7 * (self.n_accepted + self.n_rejected)).to_string().as_str(),
        ]);
        builder.push_record(["solve time, ms", self.solve_time_ms.to_string().as_str()]);
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        println!("{}", table);
    }
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests_integrator {
    use super::*;
    use crate::symbolic::symbolic_engine::Expr;
    use approx::assert_relative_eq;

    fn decay_system() -> OdeSystem {
        OdeSystem::new(
            "t".to_string(),
            vec!["y".to_string()],
            vec!["k".to_string()],
            Expr::parse_vector_expression(vec!["-k*y"]),
        )
    }

    #[test]
    fn test_final_state_exponential_decay() {
        let mut integrator =
            OdeIntegrator::new(decay_system(), 0.0, 1.0, 1e-12, 1e-12, 1e10, None);
        integrator.set_initial_state(DVector::from_vec(vec![1.0]));
        integrator.set_parameters(DVector::from_vec(vec![1.0]));
        let xf = integrator.final_state().unwrap();
        assert_relative_eq!(xf[0], (-1.0_f64).exp(), epsilon = 1e-10);
    }

    #[test]
    fn test_trajectory_monotone_time() {
        let mut integrator =
            OdeIntegrator::new(decay_system(), 0.0, 2.0, 1e-8, 1e-8, 1e10, None);
        integrator.set_initial_state(DVector::from_vec(vec![1.0]));
        integrator.set_parameters(DVector::from_vec(vec![0.5]));
        integrator.solve().unwrap();
        let (t, y) = integrator.get_result();
        assert_eq!(t.len(), y.nrows());
        for i in 1..t.len() {
            assert!(t[i] > t[i - 1]);
        }
        assert_eq!(t[t.len() - 1], 2.0);
    }

    #[test]
    fn test_solve_is_idempotent() {
        let mut integrator =
            OdeIntegrator::new(decay_system(), 0.0, 1.0, 1e-10, 1e-10, 1e10, None);
        integrator.set_initial_state(DVector::from_vec(vec![1.0]));
        integrator.set_parameters(DVector::from_vec(vec![1.0]));
        let first = integrator.final_state().unwrap();
        let second = integrator.final_state().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_blowup_returns_error() {
        let system = OdeSystem::new(
            "t".to_string(),
            vec!["y".to_string()],
            vec![],
            Expr::parse_vector_expression(vec!["y^2"]),
        );
        let mut integrator = OdeIntegrator::new(system, 0.0, 2.0, 1e-8, 1e-8, 1e10, None);
        integrator.set_initial_state(DVector::from_vec(vec![1.0]));
        integrator.set_parameters(DVector::zeros(0));
        let result = integrator.solve();
        assert!(result.is_err());
        assert_eq!(integrator.status, "failed");
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn test_wrong_state_length_panics() {
        let mut integrator =
            OdeIntegrator::new(decay_system(), 0.0, 1.0, 1e-8, 1e-8, 1e10, None);
        integrator.set_initial_state(DVector::from_vec(vec![1.0, 2.0]));
    }
}
