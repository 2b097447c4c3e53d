//! Multi-point simulation: one continuous adaptive integration that lands
//! exactly on every point of a fixed sample grid and returns the trajectory
//! as an N x n matrix. Also serves phase portraits over families of initial
//! conditions.

use crate::Utils::file_save::save_matrix_to_csv;
use crate::Utils::plots::plots;
use crate::numerical::dopri::DormandPrince45;
use crate::symbolic::ode_model::OdeSystem;
use itertools::Itertools;
use log::info;
use nalgebra::{DMatrix, DVector};
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode};

/// Inclusive uniform grid of n points from start to end; the last point is
/// exactly `end`.
pub fn linspace(start: f64, end: f64, n: usize) -> DVector<f64> {
    assert!(n >= 2, "linspace needs at least two points");
    let step = (end - start) / (n as f64 - 1.0);
    DVector::from_fn(n, |i, _| {
        if i == n - 1 {
            end
        } else {
            start + step * i as f64
        }
    })
}

pub struct Simulator {
    pub system: OdeSystem,
    pub t_samples: DVector<f64>,
    pub rtol: f64,
    pub atol: f64,
    pub max_step: f64,
    pub first_step: Option<f64>,
    x0: DVector<f64>,
    p: DVector<f64>,
    pub loglevel: Option<String>,
    pub status: String,
    pub message: Option<String>,
    y_result: DMatrix<f64>,
}

impl Simulator {
    pub fn new(system: OdeSystem, t_samples: DVector<f64>, rtol: f64, atol: f64) -> Self {
        assert!(
            t_samples.len() >= 2,
            "sample grid needs at least two points"
        );
        for i in 1..t_samples.len() {
            assert!(
                t_samples[i] > t_samples[i - 1],
                "sample grid must be strictly increasing"
            );
        }
        let n = system.n_states();
        let n_params = system.n_params();
        Simulator {
            system,
            t_samples,
            rtol,
            atol,
            max_step: f64::INFINITY,
            first_step: None,
            x0: DVector::zeros(n),
            p: DVector::zeros(n_params),
            loglevel: None,
            status: "running".to_string(),
            message: None,
            y_result: DMatrix::zeros(1, 1),
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

    fn init_logger(&self) {
        if let Some(level) = &self.loglevel {
            let log_option = match level.as_str() {
                "debug" => LevelFilter::Debug,
                "info" => LevelFilter::Info,
                "warn" => LevelFilter::Warn,
                "error" => LevelFilter::Error,
                _ => LevelFilter::Info,
            };
            // repeated initialization is tolerated
            let _ = CombinedLogger::init(vec![TermLogger::new(
                log_option,
                Config::default(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            )]);
        }
    }

    /// Integrates once over the whole grid, recording the state at every
    /// sample time. The run is continuous: the adaptive step is carried
    /// across sample points, only clamped to land on them.
    pub fn evaluate(&mut self) -> Result<(), String> {
        self.init_logger();
        let rhs = self.system.rhs_fun();
        let p = self.p.clone();
        let f: Box<dyn Fn(f64, &DVector<f64>) -> DVector<f64>> =
            Box::new(move |t, y| rhs(t, y, &p));
        let mut stepper = DormandPrince45::new(
            f,
            self.t_samples[0],
            self.x0.clone(),
            self.rtol,
            self.atol,
            self.max_step,
            self.first_step,
        );

        let n = self.system.n_states();
        let n_samples = self.t_samples.len();
        let mut rows: Vec<DVector<f64>> = Vec::with_capacity(n_samples);
        rows.push(self.x0.clone());
        for (_t_prev, t_next) in self.t_samples.iter().copied().tuple_windows() {
            self.status = "running".to_string();
            while self.status == "running" {
                stepper.step(t_next, &mut self.status, &mut self.message);
            }
            if self.status == "failed" {
                return Err(self
                    .message
                    .clone()
                    .unwrap_or_else(|| "simulation failed".to_string()));
            }
            rows.push(stepper.y.clone());
        }
        info!(
            "simulation finished: {} samples, {} accepted steps, {} rejected",
            n_samples, stepper.n_accepted, stepper.n_rejected
        );

        self.y_result = DMatrix::from_fn(n_samples, n, |i, j| rows[i][j]);
        Ok(())
    }

    pub fn get_result(&self) -> (DVector<f64>, DMatrix<f64>) {
        (self.t_samples.clone(), self.y_result.clone())
    }

    /// Runs the simulation for each initial condition of a family and
    /// collects the trajectories, e.g. for a phase portrait.
    pub fn trajectories_for(
        &mut self,
        initial_conditions: &[DVector<f64>],
    ) -> Result<Vec<DMatrix<f64>>, String> {
        let mut result = Vec::with_capacity(initial_conditions.len());
        for x0 in initial_conditions {
            self.set_initial_state(x0.clone());
            self.evaluate()?;
            result.push(self.y_result.clone());
        }
        Ok(result)
    }

    pub fn plot_result(&self) {
        plots(
            self.system.arg.clone(),
            self.system.values.clone(),
            self.t_samples.clone(),
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
            &self.t_samples,
            &self.system.arg,
        )?;
        println!("result saved");
        Ok(())
    }
}
