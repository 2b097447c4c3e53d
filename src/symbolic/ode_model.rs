//! Symbolic definition of a parametrized ODE system dx/dt = f(t, x, p).
//!
//! `OdeSystem` keeps the right-hand side as symbolic expressions together with
//! the names of the argument, the state variables and the parameters. From
//! that it produces everything the numerical layer consumes: lambdified
//! right-hand-side and jacobian closures and the analytical state jacobian
//! that drives the variational (sensitivity) equations.

use crate::symbolic::symbolic_engine::Expr;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use std::collections::HashMap;

/// Parametrized first-order ODE system in symbolic form.
#[derive(Clone, Debug)]
pub struct OdeSystem {
    /// name of the independent variable (typically time)
    pub arg: String,
    /// names of the state variables, in equation order
    pub values: Vec<String>,
    /// names of the parameters
    pub params: Vec<String>,
    /// right-hand side expressions, one per state variable
    pub eq_system: Vec<Expr>,
}

impl OdeSystem {
    /// Creates a system and validates it: the number of equations must equal
    /// the number of state variables, and every symbol of the right-hand side
    /// must be the argument, a state variable or a parameter.
    ///
    /// # Panics
    /// Panics on mismatched counts or unknown symbols.
    pub fn new(arg: String, values: Vec<String>, params: Vec<String>, eq_system: Vec<Expr>) -> Self {
        assert!(!eq_system.is_empty(), "equation system is empty");
        assert_eq!(
            eq_system.len(),
            values.len(),
            "number of equations {} does not match number of state variables {}",
            eq_system.len(),
            values.len()
        );
        for (i, eq) in eq_system.iter().enumerate() {
            for name in eq.all_arguments_are_variables() {
                let known = name == arg
                    || values.iter().any(|v| *v == name)
                    || params.iter().any(|p| *p == name);
                assert!(
                    known,
                    "equation {} for {} mentions unknown symbol '{}'",
                    i, values[i], name
                );
            }
        }
        OdeSystem {
            arg,
            values,
            params,
            eq_system,
        }
    }

    pub fn n_states(&self) -> usize {
        self.values.len()
    }

    pub fn n_params(&self) -> usize {
        self.params.len()
    }

    /// Analytical jacobian of the right-hand side with respect to the state
    /// variables, computed in parallel. Entry (i, j) is d f_i / d x_j.
    pub fn state_jacobian(&self) -> Vec<Vec<Expr>> {
        let values = self.values.clone();
        self.eq_system
            .par_iter()
            .map(|eq| {
                values
                    .par_iter()
                    .map(|value| eq.diff(value).simplify())
                    .collect()
            })
            .collect()
    }

    /// Lambdified right-hand side: closure (t, x, p) -> dx/dt.
    pub fn rhs_fun(
        &self,
    ) -> Box<dyn Fn(f64, &DVector<f64>, &DVector<f64>) -> DVector<f64> + Send + Sync> {
        let vars: Vec<&str> = self.values.iter().map(|s| s.as_str()).collect();
        let params: Vec<&str> = self.params.iter().map(|s| s.as_str()).collect();
        let funcs: Vec<_> = self
            .eq_system
            .iter()
            .map(|eq| eq.lambdify_IVP_with_params(&self.arg, &vars, &params))
            .collect();
        let n = self.n_states();
        Box::new(move |t, y, p| DVector::from_iterator(n, funcs.iter().map(|f| f(t, y, p))))
    }

    /// Lambdified state jacobian: closure (t, x, p) -> n x n matrix.
    pub fn jacobian_fun(
        &self,
    ) -> Box<dyn Fn(f64, &DVector<f64>, &DVector<f64>) -> DMatrix<f64> + Send + Sync> {
        let vars: Vec<&str> = self.values.iter().map(|s| s.as_str()).collect();
        let params: Vec<&str> = self.params.iter().map(|s| s.as_str()).collect();
        let jac = self.state_jacobian();
        let funcs: Vec<Vec<_>> = jac
            .iter()
            .map(|row| {
                row.iter()
                    .map(|entry| entry.lambdify_IVP_with_params(&self.arg, &vars, &params))
                    .collect()
            })
            .collect();
        let n = self.n_states();
        Box::new(move |t, y, p| DMatrix::from_fn(n, n, |i, j| funcs[i][j](t, y, p)))
    }

    /// Substitutes numeric values for some of the parameters; the substituted
    /// names are removed from the parameter list of the returned system.
    pub fn bind_params(&self, values_of_params: &HashMap<String, f64>) -> OdeSystem {
        let eq_system = self
            .eq_system
            .iter()
            .map(|eq| eq.set_variable_from_map(values_of_params).simplify())
            .collect();
        let params = self
            .params
            .iter()
            .filter(|p| !values_of_params.contains_key(*p))
            .cloned()
            .collect();
        OdeSystem {
            arg: self.arg.clone(),
            values: self.values.clone(),
            params,
            eq_system,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests_ode_model {
    use super::*;
    use approx::assert_relative_eq;

    fn harmonic() -> OdeSystem {
        OdeSystem::new(
            "t".to_string(),
            vec!["x1".to_string(), "x2".to_string()],
            vec!["w0".to_string()],
            Expr::parse_vector_expression(vec!["x2", "-w0^2*x1"]),
        )
    }

    #[test]
    fn test_rhs_fun() {
        let system = harmonic();
        let rhs = system.rhs_fun();
        let y = DVector::from_vec(vec![1.0, 0.5]);
        let p = DVector::from_vec(vec![2.0]);
        let dy = rhs(0.0, &y, &p);
        assert_eq!(dy[0], 0.5);
        assert_eq!(dy[1], -4.0);
    }

    #[test]
    fn test_state_jacobian_entries() {
        let system = harmonic();
        let jac = system.state_jacobian();
        // d(x2)/dx1 = 0, d(x2)/dx2 = 1, d(-w0^2*x1)/dx1 = -w0^2, d(-w0^2*x1)/dx2 = 0
        assert_eq!(jac[0][0], Expr::Const(0.0));
        assert_eq!(jac[0][1], Expr::Const(1.0));
        assert_eq!(jac[1][1], Expr::Const(0.0));
        let entry = jac[1][0].eval_expression(&["w0"], &[3.0]);
        assert_relative_eq!(entry, -9.0, epsilon = 1e-12);
    }

    #[test]
    fn test_jacobian_fun_quintic_oscillator() {
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
        let jacf = system.jacobian_fun();
        let (w0, a3, a5, mu1, mu3) = (5.278, -39.0, 7.5, 0.1, 0.2);
        let y = DVector::from_vec(vec![-3.1, 0.4]);
        let p = DVector::from_vec(vec![w0, a3, a5, mu1, mu3, 0.0]);
        let j = jacf(0.0, &y, &p);
        let x1: f64 = y[0];
        let x2: f64 = y[1];
        let d21 = (w0 * w0 - 3.0 * a3 * x1 * x1 - 5.0 * a5 * x1.powi(4)) / 100.0;
        let d22 = (-2.0 * mu1 - 3.0 * mu3 * x2 * x2) / 100.0;
        assert_relative_eq!(j[(0, 0)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(j[(0, 1)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(j[(1, 0)], d21, epsilon = 1e-9);
        assert_relative_eq!(j[(1, 1)], d22, epsilon = 1e-12);
    }

    #[test]
    fn test_bind_params() {
        let system = harmonic();
        let bound = system.bind_params(&HashMap::from([("w0".to_string(), 2.0)]));
        assert!(bound.params.is_empty());
        let rhs = bound.rhs_fun();
        let y = DVector::from_vec(vec![1.0, 0.0]);
        let p = DVector::zeros(0);
        assert_eq!(rhs(0.0, &y, &p)[1], -4.0);
    }

    #[test]
    #[should_panic(expected = "unknown symbol")]
    fn test_unknown_symbol_panics() {
        OdeSystem::new(
            "t".to_string(),
            vec!["x1".to_string()],
            vec![],
            Expr::parse_vector_expression(vec!["x1 + q"]),
        );
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn test_equation_count_mismatch_panics() {
        OdeSystem::new(
            "t".to_string(),
            vec!["x1".to_string(), "x2".to_string()],
            vec![],
            Expr::parse_vector_expression(vec!["x2"]),
        );
    }
}
