//! TOML scenario configuration for the demonstration binary.
//!
//! A scenario document can override any subset of the canonical settings;
//! missing keys fall back to the reference quintic-oscillator walkthrough.
//!
//! ```toml
//! [params]
//! w0 = 5.278
//! mu1 = 0.05
//!
//! [integration]
//! t0 = 0.0
//! t_bound = 40.0
//! n_samples = 500
//! rtol = 1e-12
//! atol = 1e-12
//!
//! [perturbation]
//! delta = [0.01, 0.0]
//!
//! [segments]
//! coarse_points = 50
//! nf = 10
//! ```

use std::collections::HashMap;
use std::fs;
use toml::Table;
use toml::Value;

use crate::numerical::demo_systems::REFERENCE_W0;

#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioTask {
    /// oscillator parameter values by name
    pub params: HashMap<String, f64>,
    pub x0: Vec<f64>,
    pub t0: f64,
    pub t_bound: f64,
    pub n_samples: usize,
    pub rtol: f64,
    pub atol: f64,
    pub delta: Vec<f64>,
    pub coarse_points: usize,
    pub nf: usize,
    pub loglevel: Option<String>,
}

impl Default for ScenarioTask {
    fn default() -> Self {
        let w0 = REFERENCE_W0;
        ScenarioTask {
            params: HashMap::from([
                ("w0".to_string(), w0),
                ("a3".to_string(), -1.402 * w0 * w0),
                ("a5".to_string(), 0.271 * w0 * w0),
                ("mu1".to_string(), 0.0),
                ("mu3".to_string(), 0.0),
                ("f".to_string(), 0.0),
            ]),
            x0: vec![-3.1, 0.0],
            t0: 0.0,
            t_bound: 40.0,
            n_samples: 500,
            rtol: 1e-12,
            atol: 1e-12,
            delta: vec![0.01, 0.0],
            coarse_points: 50,
            nf: 10,
            loglevel: Some("info".to_string()),
        }
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    value
        .as_float()
        .or_else(|| value.as_integer().map(|i| i as f64))
}

fn float_key(table: Option<&Table>, key: &str, default: f64) -> Result<f64, String> {
    match table.and_then(|t| t.get(key)) {
        None => Ok(default),
        Some(value) => value_as_f64(value).ok_or(format!("key '{}' must be a number", key)),
    }
}

fn usize_key(table: Option<&Table>, key: &str, default: usize) -> Result<usize, String> {
    match table.and_then(|t| t.get(key)) {
        None => Ok(default),
        Some(value) => {
            let int = value
                .as_integer()
                .ok_or(format!("key '{}' must be an integer", key))?;
            if int < 1 {
                return Err(format!("key '{}' must be positive", key));
            }
            Ok(int as usize)
        }
    }
}

fn float_vec_key(table: Option<&Table>, key: &str, default: &[f64]) -> Result<Vec<f64>, String> {
    match table.and_then(|t| t.get(key)) {
        None => Ok(default.to_vec()),
        Some(value) => {
            let array = value
                .as_array()
                .ok_or(format!("key '{}' must be an array of numbers", key))?;
            array
                .iter()
                .map(|v| value_as_f64(v).ok_or(format!("key '{}' must hold numbers", key)))
                .collect()
        }
    }
}

/// Parses a scenario document; keys that are absent keep their canonical
/// values.
pub fn parse_scenario(doc: &str) -> Result<ScenarioTask, String> {
    let root: Table = doc
        .parse()
        .map_err(|e| format!("scenario is not valid TOML: {}", e))?;
    let defaults = ScenarioTask::default();

    let params_table = root.get("params").and_then(|v| v.as_table());
    let mut params = defaults.params.clone();
    if let Some(table) = params_table {
        for (name, value) in table {
            let number =
                value_as_f64(value).ok_or(format!("parameter '{}' must be a number", name))?;
            params.insert(name.clone(), number);
        }
    }

    let integration = root.get("integration").and_then(|v| v.as_table());
    let perturbation = root.get("perturbation").and_then(|v| v.as_table());
    let segments = root.get("segments").and_then(|v| v.as_table());

    let task = ScenarioTask {
        params,
        x0: float_vec_key(integration, "x0", &defaults.x0)?,
        t0: float_key(integration, "t0", defaults.t0)?,
        t_bound: float_key(integration, "t_bound", defaults.t_bound)?,
        n_samples: usize_key(integration, "n_samples", defaults.n_samples)?,
        rtol: float_key(integration, "rtol", defaults.rtol)?,
        atol: float_key(integration, "atol", defaults.atol)?,
        delta: float_vec_key(perturbation, "delta", &defaults.delta)?,
        coarse_points: usize_key(segments, "coarse_points", defaults.coarse_points)?,
        nf: usize_key(segments, "nf", defaults.nf)?,
        loglevel: root
            .get("loglevel")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .or(defaults.loglevel),
    };
    if task.t_bound <= task.t0 {
        return Err("t_bound must be greater than t0".to_string());
    }
    if task.n_samples < 2 {
        return Err("n_samples must be at least 2".to_string());
    }
    Ok(task)
}

/// Loads and parses a scenario file.
pub fn load_scenario(path: &str) -> Result<ScenarioTask, String> {
    let doc = fs::read_to_string(path).map_err(|e| format!("cannot read '{}': {}", path, e))?;
    parse_scenario(&doc)
}

////////////////////////////////////////////////////////////////////////////////////////
//          TESTS
///////////////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests_task_parser {
    use super::*;

    #[test]
    fn test_empty_document_gives_canonical_scenario() {
        let task = parse_scenario("").unwrap();
        assert_eq!(task, ScenarioTask::default());
        assert_eq!(task.n_samples, 500);
        assert_eq!(task.x0, vec![-3.1, 0.0]);
        assert_eq!(task.params["w0"], REFERENCE_W0);
    }

    #[test]
    fn test_partial_override() {
        let doc = r#"
[params]
mu1 = 0.05

[integration]
t_bound = 10.0
n_samples = 100
"#;
        let task = parse_scenario(doc).unwrap();
        assert_eq!(task.params["mu1"], 0.05);
        // untouched parameters keep the reference values
        assert_eq!(task.params["w0"], REFERENCE_W0);
        assert_eq!(task.t_bound, 10.0);
        assert_eq!(task.n_samples, 100);
        assert_eq!(task.rtol, 1e-12);
    }

    #[test]
    fn test_integer_values_are_accepted_as_floats() {
        let doc = "[integration]\nt_bound = 20\n";
        let task = parse_scenario(doc).unwrap();
        assert_eq!(task.t_bound, 20.0);
    }

    #[test]
    fn test_delta_override() {
        let doc = "[perturbation]\ndelta = [0.0, 0.02]\n";
        let task = parse_scenario(doc).unwrap();
        assert_eq!(task.delta, vec![0.0, 0.02]);
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(parse_scenario("[params\nw0 = ").is_err());
    }

    #[test]
    fn test_inverted_horizon_is_rejected() {
        let doc = "[integration]\nt0 = 5.0\nt_bound = 1.0\n";
        assert!(parse_scenario(doc).is_err());
    }

    #[test]
    fn test_load_scenario_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.toml");
        std::fs::write(&path, "[integration]\nn_samples = 50\n").unwrap();
        let task = load_scenario(path.to_str().unwrap()).unwrap();
        assert_eq!(task.n_samples, 50);
    }
}
