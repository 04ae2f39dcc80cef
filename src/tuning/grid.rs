//! Hyperparameter grids

use crate::error::{Result, WineError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ParameterValue {
    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            ParameterValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "{}", v),
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Bool(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::String(v.to_string())
    }
}

/// One combination drawn from a grid
pub type TrialParams = BTreeMap<String, ParameterValue>;

/// Render params as `a=1, b=0.1`
pub fn format_params(params: &TrialParams) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn missing(name: &str, expected: &str, value: Option<&ParameterValue>) -> WineError {
    WineError::InvalidParameter {
        name: name.to_string(),
        value: value.map_or_else(|| "<missing>".to_string(), |v| v.to_string()),
        reason: format!("expected {}", expected),
    }
}

/// Float parameter, or `default` when absent
pub fn float_param(params: &TrialParams, name: &str, default: f64) -> Result<f64> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v.as_float().ok_or_else(|| missing(name, "a number", Some(v))),
    }
}

/// Non-negative integer parameter, or `default` when absent
pub fn usize_param(params: &TrialParams, name: &str, default: usize) -> Result<usize> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v
            .as_int()
            .and_then(|i| usize::try_from(i).ok())
            .ok_or_else(|| missing(name, "a non-negative integer", Some(v))),
    }
}

/// String parameter, or `default` when absent
pub fn string_param<'a>(params: &'a TrialParams, name: &str, default: &'a str) -> Result<&'a str> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v.as_string().ok_or_else(|| missing(name, "a string", Some(v))),
    }
}

/// Boolean parameter, or `default` when absent
pub fn bool_param(params: &TrialParams, name: &str, default: bool) -> Result<bool> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v.as_bool().ok_or_else(|| missing(name, "a boolean", Some(v))),
    }
}

/// A named parameter and the values to try
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridParameter {
    pub name: String,
    pub values: Vec<ParameterValue>,
}

/// Ordered list of parameters whose cartesian product is searched.
///
/// Combinations are enumerated with the last parameter varying fastest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterGrid {
    parameters: Vec<GridParameter>,
}

impl ParameterGrid {
    /// Create a new empty grid
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter; a repeated name replaces the earlier values
    pub fn add<V: Into<ParameterValue>>(mut self, name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        let name = name.into();
        let values: Vec<ParameterValue> = values.into_iter().map(Into::into).collect();
        match self.parameters.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.values = values,
            None => self.parameters.push(GridParameter { name, values }),
        }
        self
    }

    /// Add a float parameter
    pub fn floats(self, name: impl Into<String>, values: &[f64]) -> Self {
        self.add(name, values.iter().copied())
    }

    /// Add an integer parameter
    pub fn ints(self, name: impl Into<String>, values: &[i64]) -> Self {
        self.add(name, values.iter().copied())
    }

    /// Add a categorical parameter
    pub fn strings(self, name: impl Into<String>, values: &[&str]) -> Self {
        self.add(name, values.iter().copied())
    }

    /// Get all parameters
    pub fn parameters(&self) -> &[GridParameter] {
        &self.parameters
    }

    /// Number of combinations
    pub fn len(&self) -> usize {
        self.parameters.iter().map(|p| p.values.len()).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get parameter names in order
    pub fn param_names(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.name.clone()).collect()
    }

    /// Reject parameters without values
    pub fn validate(&self) -> Result<()> {
        if let Some(p) = self.parameters.iter().find(|p| p.values.is_empty()) {
            return Err(WineError::ConfigError(format!("grid parameter '{}' has no values", p.name)));
        }
        Ok(())
    }

    /// Combination at `index` in enumeration order
    pub fn get(&self, index: usize) -> Option<TrialParams> {
        if index >= self.len() {
            return None;
        }
        let mut remainder = index;
        let mut params = TrialParams::new();
        for p in self.parameters.iter().rev() {
            let n = p.values.len();
            params.insert(p.name.clone(), p.values[remainder % n].clone());
            remainder /= n;
        }
        Some(params)
    }

    /// Iterate over every combination
    pub fn iter(&self) -> impl Iterator<Item = TrialParams> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_size_is_product() {
        let grid = ParameterGrid::new()
            .floats("learning_rate", &[0.05, 0.1])
            .ints("max_depth", &[3, 5, 8])
            .strings("criterion", &["gini", "entropy"]);

        assert_eq!(grid.len(), 12);
        assert_eq!(grid.iter().count(), 12);
    }

    #[test]
    fn test_enumeration_order() {
        let grid = ParameterGrid::new().ints("a", &[1, 2]).ints("b", &[10, 20, 30]);
        let combos: Vec<(i64, i64)> = grid
            .iter()
            .map(|p| (p["a"].as_int().unwrap(), p["b"].as_int().unwrap()))
            .collect();
        assert_eq!(combos, vec![(1, 10), (1, 20), (1, 30), (2, 10), (2, 20), (2, 30)]);
    }

    #[test]
    fn test_combinations_are_distinct() {
        let grid = ParameterGrid::new().ints("a", &[1, 2, 3]).add("b", [true, false]);
        let all: Vec<TrialParams> = grid.iter().collect();
        for i in 0..all.len() {
            for j in i + 1..all.len() {
                assert_ne!(all[i], all[j]);
            }
        }
    }

    #[test]
    fn test_empty_grid_has_one_combination() {
        let grid = ParameterGrid::new();
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.get(0), Some(TrialParams::new()));
    }

    #[test]
    fn test_empty_values_rejected() {
        let grid = ParameterGrid::new().floats("alpha", &[]);
        assert!(grid.is_empty());
        assert!(grid.validate().is_err());
    }

    #[test]
    fn test_json_values() {
        let grid: ParameterGrid = serde_json::from_str(
            r#"[{"name": "k", "values": [5, 11]}, {"name": "weights", "values": ["uniform"]}, {"name": "alpha", "values": [0.01]}]"#,
        )
        .unwrap();
        let first = grid.get(0).unwrap();
        assert_eq!(first["k"], ParameterValue::Int(5));
        assert_eq!(first["weights"].as_string(), Some("uniform"));
        assert_eq!(first["alpha"], ParameterValue::Float(0.01));
    }

    #[test]
    fn test_param_accessors() {
        let mut params = TrialParams::new();
        params.insert("depth".to_string(), 5i64.into());
        params.insert("lr".to_string(), 0.1.into());
        assert_eq!(usize_param(&params, "depth", 3).unwrap(), 5);
        assert_eq!(float_param(&params, "lr", 1.0).unwrap(), 0.1);
        assert_eq!(float_param(&params, "missing", 1.0).unwrap(), 1.0);
        assert!(usize_param(&params, "lr", 1).is_err());
        assert_eq!(format_params(&params), "depth=5, lr=0.1");
    }
}
