//! Hyperparameter values and search spaces

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::Serialize;

use super::error::{LearnerError, Result};

/// A single sampled hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Choice(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => {
                if v.abs() < 1e-3 && *v != 0.0 {
                    write!(f, "{:.2e}", v)
                } else {
                    write!(f, "{:.4}", v)
                }
            }
            ParamValue::Choice(v) => write!(f, "{}", v),
        }
    }
}

/// Named hyperparameter configuration, ordered by name for stable output
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    /// Integer parameter, falling back to `default` when absent
    pub fn int_or(&self, name: &str, default: i64) -> Result<i64> {
        match self.0.get(name) {
            None => Ok(default),
            Some(ParamValue::Int(v)) => Ok(*v),
            Some(other) => Err(type_error(name, "integer", other)),
        }
    }

    /// Float parameter, falling back to `default` when absent. Integers are widened.
    pub fn float_or(&self, name: &str, default: f64) -> Result<f64> {
        match self.0.get(name) {
            None => Ok(default),
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(ParamValue::Int(v)) => Ok(*v as f64),
            Some(other) => Err(type_error(name, "float", other)),
        }
    }

    /// Categorical parameter, falling back to `default` when absent
    pub fn choice_or<'a>(&'a self, name: &str, default: &'a str) -> Result<&'a str> {
        match self.0.get(name) {
            None => Ok(default),
            Some(ParamValue::Choice(v)) => Ok(v.as_str()),
            Some(other) => Err(type_error(name, "choice", other)),
        }
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "-");
        }
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

fn type_error(name: &str, expected: &str, actual: &ParamValue) -> LearnerError {
    LearnerError::InvalidParameter {
        name: name.to_string(),
        reason: format!("expected {} value, got {:?}", expected, actual),
    }
}

/// Domain of a tunable hyperparameter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParamDomain {
    /// Inclusive integer range
    Int { low: i64, high: i64 },
    /// Float range, sampled log-uniformly when `log` is set
    Float { low: f64, high: f64, log: bool },
    Categorical { choices: Vec<String> },
}

impl ParamDomain {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ParamValue {
        match self {
            ParamDomain::Int { low, high } => ParamValue::Int(rng.gen_range(*low..=*high)),
            ParamDomain::Float { low, high, log } => {
                if low >= high {
                    return ParamValue::Float(*low);
                }
                if *log {
                    let v = rng.gen_range(low.ln()..high.ln()).exp();
                    ParamValue::Float(v.clamp(*low, *high))
                } else {
                    ParamValue::Float(rng.gen_range(*low..*high))
                }
            }
            ParamDomain::Categorical { choices } => {
                let idx = rng.gen_range(0..choices.len());
                ParamValue::Choice(choices[idx].clone())
            }
        }
    }
}

/// A named parameter with its domain
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub domain: ParamDomain,
}

/// Collection of tunable parameters for one learner
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchSpace {
    pub params: Vec<ParamSpec>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn int(mut self, name: &str, low: i64, high: i64) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            domain: ParamDomain::Int { low, high },
        });
        self
    }

    pub fn float(mut self, name: &str, low: f64, high: f64) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            domain: ParamDomain::Float { low, high, log: false },
        });
        self
    }

    pub fn log_float(mut self, name: &str, low: f64, high: f64) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            domain: ParamDomain::Float { low, high, log: true },
        });
        self
    }

    pub fn categorical(mut self, name: &str, choices: &[&str]) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            domain: ParamDomain::Categorical {
                choices: choices.iter().map(|c| c.to_string()).collect(),
            },
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Draw one configuration uniformly from the space
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ParamSet {
        let mut set = ParamSet::new();
        for spec in &self.params {
            set.insert(&spec.name, spec.domain.sample(rng));
        }
        set
    }
}
