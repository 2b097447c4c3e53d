#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// adaptive-step embedded Dormand-Prince 5(4) stepper with absolute/relative
/// error control, the single numerical engine behind all facades of this crate
pub mod dopri;
/// single-shot integration facade
/// Example#
/// ```
/// use RustedMonodromy::numerical::integrator::OdeIntegrator;
/// use RustedMonodromy::symbolic::ode_model::OdeSystem;
/// use RustedMonodromy::symbolic::symbolic_engine::Expr;
/// use nalgebra::DVector;
/// // y' = -y, y(0) = 1, exact solution exp(-t)
/// let system = OdeSystem::new(
///     "t".to_string(),
///     vec!["y".to_string()],
///     vec![],
///     Expr::parse_vector_expression(vec!["-y"]),
/// );
/// let mut integrator = OdeIntegrator::new(system, 0.0, 1.0, 1e-10, 1e-10, 1e10, None);
/// integrator.set_initial_state(DVector::from_vec(vec![1.0]));
/// integrator.set_parameters(DVector::zeros(0));
/// let xf = integrator.final_state().unwrap();
/// assert!((xf[0] - (-1.0_f64).exp()).abs() < 1e-8);
/// ```
pub mod integrator;
/// multi-point simulation over a fixed sample grid, phase portraits
pub mod simulator;
/// forward sensitivity: state-transition (monodromy) matrices from the
/// variational equations, by a single-shot and a batch sampled procedure
pub mod sensitivity;
/// segment-chained sensitivity with piecewise-constant controls
pub mod segmented;
/// propagation of initial-state perturbations through monodromy matrices
pub mod perturbation;
/// catalog of oscillator systems used by the demonstration binary and tests
pub mod demo_systems;
