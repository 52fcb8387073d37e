//! Hyperparameter values, sets and grids.

use crate::error::{LearningError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single hyperparameter value. `None` means "unbounded" (e.g. `max_depth`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    None,
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::None => f.write_str("None"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<Option<i64>> for ParamValue {
    fn from(v: Option<i64>) -> Self {
        v.map_or(ParamValue::None, ParamValue::Int)
    }
}

/// One concrete hyperparameter assignment, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamSet(BTreeMap<String, ParamValue>);

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reject names outside `known`.
    pub fn ensure_known(&self, family: &str, known: &[&str]) -> Result<()> {
        match self.0.keys().find(|k| !known.contains(&k.as_str())) {
            Some(unknown) => Err(LearningError::InvalidConfig(format!(
                "{family} has no hyperparameter '{unknown}'"
            ))),
            None => Ok(()),
        }
    }

    /// A non-negative integer parameter.
    pub fn usize_param(&self, name: &str) -> Result<Option<usize>> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Int(v)) if v >= 0 => Ok(Some(v as usize)),
            Some(other) => Err(type_error(name, "a non-negative integer", other)),
        }
    }

    /// A non-negative integer parameter that may be explicitly `None`.
    pub fn optional_usize_param(&self, name: &str) -> Result<Option<Option<usize>>> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::None) => Ok(Some(None)),
            Some(ParamValue::Int(v)) if v >= 0 => Ok(Some(Some(v as usize))),
            Some(other) => Err(type_error(name, "a non-negative integer or None", other)),
        }
    }

    /// A numeric parameter; integers widen to float.
    pub fn f64_param(&self, name: &str) -> Result<Option<f64>> {
        match self.get(name) {
            None => Ok(None),
            Some(ParamValue::Float(v)) => Ok(Some(v)),
            Some(ParamValue::Int(v)) => Ok(Some(v as f64)),
            Some(other) => Err(type_error(name, "a number", other)),
        }
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        f.write_str("}")
    }
}

fn type_error(name: &str, expected: &str, found: ParamValue) -> LearningError {
    LearningError::InvalidConfig(format!(
        "hyperparameter '{name}' must be {expected}, got {found}"
    ))
}

/// Candidate values per hyperparameter.
///
/// Keys are kept in lexical order; [`ParamGrid::combinations`] enumerates the
/// Cartesian product with the last key varying fastest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamGrid(BTreeMap<String, Vec<ParamValue>>);

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with<V: Into<ParamValue>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.0
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of combinations.
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every combination. An empty grid yields one empty set (family defaults).
    pub fn combinations(&self) -> Vec<ParamSet> {
        let mut out = vec![ParamSet::new()];
        for (name, values) in &self.0 {
            let mut next = Vec::with_capacity(out.len() * values.len());
            for base in &out {
                for value in values {
                    let mut set = base.clone();
                    set.insert(name.clone(), *value);
                    next.push(set);
                }
            }
            out = next;
        }
        out
    }
}
