#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// a module turns a String expression into a symbolic expression
///# Example
/// ```
/// use RustedMonodromy::symbolic::symbolic_engine::Expr;
/// let input = "x2";
/// let parsed_expression = Expr::parse_expression(input);
/// println!(" parsed_expression {}", parsed_expression);
/// ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// a module
/// 1) turns a String expression into a symbolic expression
/// 2) turns a symbolic expression into a Rust function
/// 3) turns a symbolic expression into a string expression for printing and control of results
///# Example#
/// ```
/// use RustedMonodromy::symbolic::symbolic_engine::Expr;
/// let input = "-w0^2*x1 + a3*x1^3";
/// let parsed_expression = Expr::parse_expression(input);
/// // differentiate with respect to the state variable
/// let dfdx = parsed_expression.diff("x1");
/// println!("df/dx1 = {}", dfdx);
/// // turn the derivative into a Rust function and evaluate it
/// let f = dfdx.lambdify(&["w0", "a3", "x1"]);
/// let res = f(&[2.0, 0.5, 1.0]);
/// assert!((res - (-4.0 + 1.5)).abs() < 1e-12);
/// ```
/// ________________________________________________________________________________________________________________________________________________
pub mod symbolic_engine;
/// analytical differentiation, algebraic simplification and direct evaluation of symbolic expressions
pub mod symbolic_derivatives;
/// lambdification: compile a symbolic expression into a boxed Rust closure,
/// in slice form, in IVP form (t, y) and in IVP-with-parameters form (t, y, p)
pub mod symbolic_lambdify;
///________________________________________________________________________________________________________________________________________________
/// symbolic definition of a parametrized ODE system: state variables, parameters,
/// right-hand side expressions, analytical state jacobian and lambdified closures
/// Example#
/// ```
/// use RustedMonodromy::symbolic::ode_model::OdeSystem;
/// use RustedMonodromy::symbolic::symbolic_engine::Expr;
/// use nalgebra::DVector;
/// let eqs = Expr::parse_vector_expression(vec!["x2", "-w0^2*x1"]);
/// let system = OdeSystem::new(
///     "t".to_string(),
///     vec!["x1".to_string(), "x2".to_string()],
///     vec!["w0".to_string()],
///     eqs,
/// );
/// let rhs = system.rhs_fun();
/// let dy = rhs(0.0, &DVector::from_vec(vec![1.0, 0.0]), &DVector::from_vec(vec![2.0]));
/// assert_eq!(dy[1], -4.0);
/// ```
pub mod ode_model;
