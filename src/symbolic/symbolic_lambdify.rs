//! Lambdification: compile a symbolic expression tree into a boxed Rust
//! closure. Variable positions are resolved once, at compile time of the
//! closure tree, so evaluation does no string lookups.
//!
//! Three forms are provided:
//! - `lambdify` - slice of arguments in a caller-chosen order
//! - `lambdify_IVP` - initial value problem form (t, y)
//! - `lambdify_IVP_with_params` - parametrized IVP form (t, y, p)

use crate::symbolic::symbolic_engine::Expr;
use nalgebra::DVector;

impl Expr {
    /// Compiles the expression into a closure over a slice of argument values.
    /// The slice layout is given by `vars`: argument i of the closure slice
    /// corresponds to variable name `vars[i]`.
    ///
    /// # Panics
    /// Panics at compile time of the closure if the expression mentions a
    /// variable that is not listed in `vars`.
    pub fn lambdify(&self, vars: &[&str]) -> Box<dyn Fn(&[f64]) -> f64 + Send + Sync> {
        match self {
            Expr::Var(name) => {
                let index = vars
                    .iter()
                    .position(|&x| x == name)
                    .unwrap_or_else(|| panic!("variable {} not found among {:?}", name, vars));
                Box::new(move |args| args[index])
            }
            Expr::Const(val) => {
                let val = *val;
                Box::new(move |_| val)
            }
            Expr::Add(lhs, rhs) => {
                let lf = lhs.lambdify(vars);
                let rf = rhs.lambdify(vars);
                Box::new(move |args| lf(args) + rf(args))
            }
            Expr::Sub(lhs, rhs) => {
                let lf = lhs.lambdify(vars);
                let rf = rhs.lambdify(vars);
                Box::new(move |args| lf(args) - rf(args))
            }
            Expr::Mul(lhs, rhs) => {
                let lf = lhs.lambdify(vars);
                let rf = rhs.lambdify(vars);
                Box::new(move |args| lf(args) * rf(args))
            }
            Expr::Div(lhs, rhs) => {
                let lf = lhs.lambdify(vars);
                let rf = rhs.lambdify(vars);
                Box::new(move |args| lf(args) / rf(args))
            }
            Expr::Pow(b, e) => {
                let bf = b.lambdify(vars);
                let ef = e.lambdify(vars);
                Box::new(move |args| bf(args).powf(ef(args)))
            }
            Expr::Exp(e) => {
                let f = e.lambdify(vars);
                Box::new(move |args| f(args).exp())
            }
            Expr::Ln(e) => {
                let f = e.lambdify(vars);
                Box::new(move |args| f(args).ln())
            }
            Expr::sin(e) => {
                let f = e.lambdify(vars);
                Box::new(move |args| f(args).sin())
            }
            Expr::cos(e) => {
                let f = e.lambdify(vars);
                Box::new(move |args| f(args).cos())
            }
        }
    } // end of lambdify

    /// IVP form: closure taking (time, state vector) and returning f64.
    /// The argument order behind the scenes is [arg, vars...].
    pub fn lambdify_IVP(
        &self,
        arg: &str,
        vars: &[&str],
    ) -> Box<dyn Fn(f64, &DVector<f64>) -> f64 + Send + Sync> {
        let mut all: Vec<&str> = vec![arg];
        all.extend_from_slice(vars);
        let f = self.lambdify(&all);
        let n = vars.len();
        Box::new(move |t, y| {
            let mut args = Vec::with_capacity(1 + n);
            args.push(t);
            args.extend(y.iter().copied());
            f(&args)
        })
    }

    /// Parametrized IVP form: closure taking (time, state vector, parameter
    /// vector). The argument order behind the scenes is [arg, vars..., params...].
    pub fn lambdify_IVP_with_params(
        &self,
        arg: &str,
        vars: &[&str],
        params: &[&str],
    ) -> Box<dyn Fn(f64, &DVector<f64>, &DVector<f64>) -> f64 + Send + Sync> {
        let mut all: Vec<&str> = vec![arg];
        all.extend_from_slice(vars);
        all.extend_from_slice(params);
        let f = self.lambdify(&all);
        let n_vars = vars.len();
        let n_params = params.len();
        Box::new(move |t, y, p| {
            let mut args = Vec::with_capacity(1 + n_vars + n_params);
            args.push(t);
            args.extend(y.iter().copied());
            args.extend(p.iter().copied());
            f(&args)
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests_lambdify {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lambdify_single_variable() {
        let x = Expr::Var("x".to_string());
        let func = x.lambdify(&["x"]);
        assert_eq!(func(&[5.0]), 5.0);
    }

    #[test]
    fn test_lambdify_constant() {
        let c = Expr::Const(42.0);
        let func = c.lambdify(&["x"]);
        assert_eq!(func(&[100.0]), 42.0);
    }

    #[test]
    fn test_lambdify_polynomial() {
        let expr = Expr::parse_expression("x^2 + 2*x + 1");
        let func = expr.lambdify(&["x"]);
        assert_eq!(func(&[3.0]), 16.0);
    }

    #[test]
    fn test_lambdify_two_variables() {
        let expr = Expr::parse_expression("exp(x) + ln(y)");
        let func = expr.lambdify(&["x", "y"]);
        assert_relative_eq!(func(&[0.0, 1.0]), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_lambdify_trigonometric() {
        let expr = Expr::parse_expression("sin(x)^2 + cos(x)^2");
        let func = expr.lambdify(&["x"]);
        assert_relative_eq!(func(&[0.37]), 1.0, epsilon = 1e-12);
    }

    #[test]
    #[should_panic(expected = "not found")]
    fn test_lambdify_missing_variable_panics() {
        let expr = Expr::parse_expression("x + y");
        let _ = expr.lambdify(&["x"]);
    }

    #[test]
    fn test_lambdify_ivp() {
        // f(t, y1, y2) = t + y1 + y2
        let expr = Expr::parse_expression("t + y1 + y2");
        let func = expr.lambdify_IVP("t", &["y1", "y2"]);
        let y = DVector::from_vec(vec![2.0, 3.0]);
        assert_eq!(func(1.0, &y), 6.0);
    }

    #[test]
    fn test_lambdify_ivp_with_params() {
        // restoring force with a parameter: -w0^2 * x1
        let expr = Expr::parse_expression("-w0^2*x1");
        let func = expr.lambdify_IVP_with_params("t", &["x1", "x2"], &["w0"]);
        let y = DVector::from_vec(vec![2.0, 0.0]);
        let p = DVector::from_vec(vec![3.0]);
        assert_eq!(func(0.0, &y, &p), -18.0);
    }

    #[test]
    fn test_lambdify_matches_eval_expression() {
        let expr = Expr::parse_expression("(-(-w0^2*x1 + a3*x1^3) + f)/100");
        let vars = ["w0", "a3", "f", "x1"];
        let values = [5.278, -39.0, 0.0, -3.1];
        let func = expr.lambdify(&vars);
        assert_relative_eq!(
            func(&values),
            expr.eval_expression(&vars, &values),
            epsilon = 1e-14
        );
    }
}
