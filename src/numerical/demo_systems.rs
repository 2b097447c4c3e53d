//! Catalog of oscillator systems used by the demonstration binary and the
//! tests. Each entry carries its equations, reference parameter values and a
//! reference initial condition.

use crate::symbolic::ode_model::OdeSystem;
use crate::symbolic::symbolic_engine::Expr;
use nalgebra::DVector;

/// Natural frequency of the reference quintic oscillator, taken from the
/// softening-spring example of Nayfeh & Balachandran, Applied Nonlinear
/// Dynamics (1995), p. 52.
pub const REFERENCE_W0: f64 = 5.278;

#[derive(Clone, Copy, Debug)]
pub enum OscillatorExample {
    /// two-state oscillator with cubic/quintic stiffness, cubic damping and
    /// an external forcing parameter; the right-hand side is scaled by 1/100
    DuffingQuintic,
    /// linear harmonic oscillator, the case with a closed-form monodromy
    Harmonic,
    /// Van der Pol oscillator with its limit cycle
    VanDerPol,
}

impl OscillatorExample {
    pub fn system(&self) -> OdeSystem {
        match self {
            OscillatorExample::DuffingQuintic => OdeSystem::new(
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
                Expr::parse_vector_expression(vec![
                    "x2",
                    "(-(-w0^2*x1 + a3*x1^3 + a5*x1^5) - (2*mu1*x2 + mu3*x2^3) + f)/100",
                ]),
            ),
            OscillatorExample::Harmonic => OdeSystem::new(
                "t".to_string(),
                vec!["x1".to_string(), "x2".to_string()],
                vec!["w0".to_string()],
                Expr::parse_vector_expression(vec!["x2", "-w0^2*x1"]),
            ),
            OscillatorExample::VanDerPol => OdeSystem::new(
                "t".to_string(),
                vec!["x1".to_string(), "x2".to_string()],
                vec!["mu".to_string()],
                Expr::parse_vector_expression(vec!["x2", "mu*(1 - x1^2)*x2 - x1"]),
            ),
        }
    }

    pub fn default_params(&self) -> DVector<f64> {
        match self {
            OscillatorExample::DuffingQuintic => {
                let w0 = REFERENCE_W0;
                DVector::from_vec(vec![
                    w0,
                    -1.402 * w0 * w0,
                    0.271 * w0 * w0,
                    0.0,
                    0.0,
                    0.0,
                ])
            }
            OscillatorExample::Harmonic => DVector::from_vec(vec![1.0]),
            OscillatorExample::VanDerPol => DVector::from_vec(vec![0.1]),
        }
    }

    pub fn initial_condition(&self) -> DVector<f64> {
        match self {
            OscillatorExample::DuffingQuintic => DVector::from_vec(vec![-3.1, 0.0]),
            OscillatorExample::Harmonic => DVector::from_vec(vec![1.0, 0.0]),
            OscillatorExample::VanDerPol => DVector::from_vec(vec![2.0, 0.0]),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests_demo_systems {
    use super::*;

    #[test]
    fn test_catalog_is_consistent() {
        for example in [
            OscillatorExample::DuffingQuintic,
            OscillatorExample::Harmonic,
            OscillatorExample::VanDerPol,
        ] {
            let system = example.system();
            assert_eq!(system.n_states(), 2);
            assert_eq!(system.n_params(), example.default_params().len());
            assert_eq!(system.n_states(), example.initial_condition().len());
        }
    }

    #[test]
    fn test_quintic_rhs_at_reference_point() {
        let example = OscillatorExample::DuffingQuintic;
        let rhs = example.system().rhs_fun();
        let x = example.initial_condition();
        let p = example.default_params();
        let dy = rhs(0.0, &x, &p);
        assert_eq!(dy[0], 0.0);
        // hand-computed restoring force at x1 = -3.1
        let w0 = REFERENCE_W0;
        let (a3, a5) = (-1.402 * w0 * w0, 0.271 * w0 * w0);
        let x1: f64 = -3.1;
        let expected = -(-w0 * w0 * x1 + a3 * x1.powi(3) + a5 * x1.powi(5)) / 100.0;
        assert!((dy[1] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_van_der_pol_damping_sign() {
        let rhs = OscillatorExample::VanDerPol.system().rhs_fun();
        let p = DVector::from_vec(vec![0.5]);
        // inside the unit circle the damping term pumps energy in
        let inside = rhs(0.0, &DVector::from_vec(vec![0.5, 1.0]), &p);
        assert!(inside[1] > -0.5 - 1e-12);
        // far outside it dissipates
        let outside = rhs(0.0, &DVector::from_vec(vec![3.0, 1.0]), &p);
        assert!(outside[1] < -3.0);
    }
}
