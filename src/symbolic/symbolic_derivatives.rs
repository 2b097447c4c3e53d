//! Analytical differentiation, algebraic simplification and direct evaluation
//! for symbolic expressions. Together with the parser this module gives the
//! engine everything the sensitivity machinery needs: right-hand sides are
//! differentiated analytically to build variational (jacobian) systems, then
//! simplified and compiled into Rust closures.
//!
//! ## Key Methods
//! - `diff(var: &str)` - analytical partial derivative
//! - `simplify()` - constant folding and algebraic identities
//! - `sym_to_str()` - pretty string form
//! - `eval_expression()` - direct evaluation without closure creation
//! - `parse_expression()` / `parse_vector_expression()` - string to symbolic form

use crate::symbolic::parse_expr::parse_expression_func;
use crate::symbolic::symbolic_engine::Expr;

impl Expr {
    /// Computes the analytical derivative of the expression with respect to a variable.
    ///
    /// Implements the standard rules: linearity, product rule, quotient rule,
    /// chain rule, power rule (with the general form b^e * (e'*ln(b) + e*b'/b)
    /// when the exponent itself depends on the variable).
    pub fn diff(&self, var: &str) -> Expr {
        match self {
            Expr::Var(name) => {
                if name == var {
                    Expr::Const(1.0)
                } else {
                    Expr::Const(0.0)
                }
            }
            Expr::Const(_) => Expr::Const(0.0),
            Expr::Add(lhs, rhs) => Expr::Add(Box::new(lhs.diff(var)), Box::new(rhs.diff(var))),
            Expr::Sub(lhs, rhs) => Expr::Sub(Box::new(lhs.diff(var)), Box::new(rhs.diff(var))),
            Expr::Mul(lhs, rhs) => Expr::Add(
                Box::new(Expr::Mul(Box::new(lhs.diff(var)), rhs.clone())),
                Box::new(Expr::Mul(lhs.clone(), Box::new(rhs.diff(var)))),
            ),
            Expr::Div(lhs, rhs) => Expr::Div(
                Box::new(Expr::Sub(
                    Box::new(Expr::Mul(Box::new(lhs.diff(var)), rhs.clone())),
                    Box::new(Expr::Mul(Box::new(rhs.diff(var)), lhs.clone())),
                )),
                Box::new(Expr::Mul(rhs.clone(), rhs.clone())),
            ),
            Expr::Pow(base, exp) => {
                if !exp.contains_variable(var) {
                    // d(b^e) = e * b^(e-1) * b'
                    Expr::Mul(
                        Box::new(Expr::Mul(
                            exp.clone(),
                            Box::new(Expr::Pow(
                                base.clone(),
                                Box::new(Expr::Sub(exp.clone(), Box::new(Expr::Const(1.0)))),
                            )),
                        )),
                        Box::new(base.diff(var)),
                    )
                } else {
                    // d(b^e) = b^e * (e' * ln(b) + e * b' / b)
                    Expr::Mul(
                        Box::new(Expr::Pow(base.clone(), exp.clone())),
                        Box::new(Expr::Add(
                            Box::new(Expr::Mul(
                                Box::new(exp.diff(var)),
                                Box::new(Expr::Ln(base.clone())),
                            )),
                            Box::new(Expr::Div(
                                Box::new(Expr::Mul(exp.clone(), Box::new(base.diff(var)))),
                                base.clone(),
                            )),
                        )),
                    )
                }
            }
            Expr::Exp(expr) => {
                Expr::Mul(Box::new(Expr::Exp(expr.clone())), Box::new(expr.diff(var)))
            }
            Expr::Ln(expr) => Expr::Div(Box::new(expr.diff(var)), expr.clone()),
            Expr::sin(expr) => {
                Expr::Mul(Box::new(Expr::cos(expr.clone())), Box::new(expr.diff(var)))
            }
            Expr::cos(expr) => Expr::Mul(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(Expr::sin(expr.clone())),
                )),
                Box::new(expr.diff(var)),
            ),
        }
    }

    /// Algebraic simplification: recursive constant folding plus the usual
    /// identities (x + 0 = x, x * 1 = x, 0 * x = 0, x - x = 0, x^1 = x, ...).
    pub fn simplify(&self) -> Expr {
        match self {
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => {
                let lhs = lhs.simplify();
                let rhs = rhs.simplify();
                match (&lhs, &rhs) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a + b),
                    (Expr::Const(c), _) if *c == 0.0 => rhs,
                    (_, Expr::Const(c)) if *c == 0.0 => lhs,
                    _ => Expr::Add(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Sub(lhs, rhs) => {
                let lhs = lhs.simplify();
                let rhs = rhs.simplify();
                match (&lhs, &rhs) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a - b),
                    (_, Expr::Const(c)) if *c == 0.0 => lhs,
                    _ if lhs == rhs => Expr::Const(0.0),
                    _ => Expr::Sub(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Mul(lhs, rhs) => {
                let lhs = lhs.simplify();
                let rhs = rhs.simplify();
                match (&lhs, &rhs) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a * b),
                    (Expr::Const(c), _) | (_, Expr::Const(c)) if *c == 0.0 => Expr::Const(0.0),
                    (Expr::Const(c), _) if *c == 1.0 => rhs,
                    (_, Expr::Const(c)) if *c == 1.0 => lhs,
                    // collect nested constants: (c1 * e) * c2 = (c1*c2) * e
                    (Expr::Mul(inner_lhs, inner_rhs), Expr::Const(c)) => {
                        match (inner_lhs.as_ref(), inner_rhs.as_ref()) {
                            (Expr::Const(c1), _) => {
                                Expr::Mul(Box::new(Expr::Const(c1 * c)), inner_rhs.clone())
                            }
                            (_, Expr::Const(c1)) => {
                                Expr::Mul(Box::new(Expr::Const(c1 * c)), inner_lhs.clone())
                            }
                            _ => Expr::Mul(Box::new(lhs), Box::new(rhs)),
                        }
                    }
                    (Expr::Const(c), Expr::Mul(inner_lhs, inner_rhs)) => {
                        match (inner_lhs.as_ref(), inner_rhs.as_ref()) {
                            (Expr::Const(c1), _) => {
                                Expr::Mul(Box::new(Expr::Const(c * c1)), inner_rhs.clone())
                            }
                            (_, Expr::Const(c1)) => {
                                Expr::Mul(Box::new(Expr::Const(c * c1)), inner_lhs.clone())
                            }
                            _ => Expr::Mul(Box::new(lhs), Box::new(rhs)),
                        }
                    }
                    _ => Expr::Mul(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Div(lhs, rhs) => {
                let lhs = lhs.simplify();
                let rhs = rhs.simplify();
                match (&lhs, &rhs) {
                    (Expr::Const(a), Expr::Const(b)) if *b != 0.0 => Expr::Const(a / b),
                    (Expr::Const(c), _) if *c == 0.0 => Expr::Const(0.0),
                    (_, Expr::Const(c)) if *c == 1.0 => lhs,
                    _ => Expr::Div(Box::new(lhs), Box::new(rhs)),
                }
            }
            Expr::Pow(base, exp) => {
                let base = base.simplify();
                let exp = exp.simplify();
                match (&base, &exp) {
                    (Expr::Const(a), Expr::Const(b)) => Expr::Const(a.powf(*b)),
                    (_, Expr::Const(c)) if *c == 1.0 => base,
                    (_, Expr::Const(c)) if *c == 0.0 => Expr::Const(1.0),
                    _ => Expr::Pow(Box::new(base), Box::new(exp)),
                }
            }
            Expr::Exp(expr) => {
                let expr = expr.simplify();
                match &expr {
                    Expr::Const(c) => Expr::Const(c.exp()),
                    _ => Expr::Exp(Box::new(expr)),
                }
            }
            Expr::Ln(expr) => {
                let expr = expr.simplify();
                match &expr {
                    Expr::Const(c) if *c > 0.0 => Expr::Const(c.ln()),
                    _ => Expr::Ln(Box::new(expr)),
                }
            }
            Expr::sin(expr) => Expr::sin(Box::new(expr.simplify())),
            Expr::cos(expr) => Expr::cos(Box::new(expr.simplify())),
        }
    }

    /// Pretty, fully parenthesized string form of the expression.
    pub fn sym_to_str(&self) -> String {
        match self {
            Expr::Var(name) => name.clone(),
            Expr::Const(val) => val.to_string(),
            Expr::Add(lhs, rhs) => format!("({}) + ({})", lhs.sym_to_str(), rhs.sym_to_str()),
            Expr::Sub(lhs, rhs) => format!("({}) - ({})", lhs.sym_to_str(), rhs.sym_to_str()),
            Expr::Mul(lhs, rhs) => format!("({}) * ({})", lhs.sym_to_str(), rhs.sym_to_str()),
            Expr::Div(lhs, rhs) => format!("({}) / ({})", lhs.sym_to_str(), rhs.sym_to_str()),
            Expr::Pow(base, exp) => format!("({}^{})", base.sym_to_str(), exp.sym_to_str()),
            Expr::Exp(expr) => format!("exp({})", expr.sym_to_str()),
            Expr::Ln(expr) => format!("ln({})", expr.sym_to_str()),
            Expr::sin(expr) => format!("sin({})", expr.sym_to_str()),
            Expr::cos(expr) => format!("cos({})", expr.sym_to_str()),
        }
    }

    /// Direct recursive evaluation without creating a closure. Variable values
    /// are taken from `values` at the position of the name in `vars`.
    ///
    /// # Panics
    /// Panics if the expression mentions a variable missing from `vars`.
    pub fn eval_expression(&self, vars: &[&str], values: &[f64]) -> f64 {
        match self {
            Expr::Var(name) => {
                let index = vars
                    .iter()
                    .position(|v| v == name)
                    .unwrap_or_else(|| panic!("variable {} not found among {:?}", name, vars));
                values[index]
            }
            Expr::Const(val) => *val,
            Expr::Add(lhs, rhs) => {
                lhs.eval_expression(vars, values) + rhs.eval_expression(vars, values)
            }
            Expr::Sub(lhs, rhs) => {
                lhs.eval_expression(vars, values) - rhs.eval_expression(vars, values)
            }
            Expr::Mul(lhs, rhs) => {
                lhs.eval_expression(vars, values) * rhs.eval_expression(vars, values)
            }
            Expr::Div(lhs, rhs) => {
                lhs.eval_expression(vars, values) / rhs.eval_expression(vars, values)
            }
            Expr::Pow(base, exp) => base
                .eval_expression(vars, values)
                .powf(exp.eval_expression(vars, values)),
            Expr::Exp(expr) => expr.eval_expression(vars, values).exp(),
            Expr::Ln(expr) => expr.eval_expression(vars, values).ln(),
            Expr::sin(expr) => expr.eval_expression(vars, values).sin(),
            Expr::cos(expr) => expr.eval_expression(vars, values).cos(),
        }
    }

    /// Parses a string into a symbolic expression.
    ///
    /// # Panics
    /// Panics if the expression cannot be parsed (invalid syntax).
    ///
    /// # Supported Syntax
    /// - Variables: x1, w0, mu1
    /// - Constants: 3.14, -2.5, 1e-6
    /// - Operators: +, -, *, /, ^
    /// - Functions: exp, ln/log, sin, cos
    /// - Parentheses for grouping
    pub fn parse_expression(input: &str) -> Expr {
        match parse_expression_func(input) {
            Ok(expr) => expr,
            Err(err) => panic!("failed to parse '{}': {}", input, err),
        }
    }

    /// Parses several expressions at once, e.g. the right-hand sides of an ODE system.
    ///
    /// # Panics
    /// Panics if any expression cannot be parsed.
    pub fn parse_vector_expression(input: Vec<&str>) -> Vec<Expr> {
        input.iter().map(|s| Expr::parse_expression(s)).collect()
    }
}
