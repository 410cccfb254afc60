//! Named, nested parameter collections with JSON persistence.
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    Nested(Parameters),
}

impl ParameterValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::Str(_) => "string",
            Self::Nested(_) => "parameters",
        }
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParameterValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Parameters> for ParameterValue {
    fn from(value: Parameters) -> Self {
        Self::Nested(value)
    }
}

#[derive(Debug)]
#[non_exhaustive]
pub enum ParameterError {
    DuplicateKey(String),
    MissingKey(String),
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    Json(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for ParameterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateKey(key) => write!(f, "parameter \"{}\" already exists", key),
            Self::MissingKey(key) => write!(f, "no parameter named \"{}\"", key),
            Self::TypeMismatch { key, expected, found } => write!(
                f,
                "parameter \"{}\" has type {}, expected {}",
                key, found, expected
            ),
            Self::Json(err) => write!(f, "invalid parameter JSON: {}", err),
            Self::Io(err) => write!(f, "parameter file I/O failed: {}", err),
        }
    }
}

impl Error for ParameterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ParameterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<std::io::Error> for ParameterError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// A named collection of parameters, kept in insertion order.
///
/// Values may themselves be parameter collections, which are stored under their own name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Parameters {
    name: String,
    entries: Vec<(String, ParameterValue)>,
}

macro_rules! typed_getter {
    ($name:ident, $variant:ident, $ty:ty, $type_name:literal) => {
        pub fn $name(&self, key: &str) -> Result<$ty, ParameterError> {
            match self.value(key)? {
                ParameterValue::$variant(value) => Ok(value.clone()),
                other => Err(ParameterError::TypeMismatch {
                    key: key.to_string(),
                    expected: $type_name,
                    found: other.type_name(),
                }),
            }
        }
    };
}

impl Parameters {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl '_ + Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Adds a new parameter.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter with the same key already exists.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<ParameterValue>) -> Result<(), ParameterError> {
        let key = key.into();
        if self.contains(&key) {
            return Err(ParameterError::DuplicateKey(key));
        }
        self.entries.push((key, value.into()));
        Ok(())
    }

    /// Adds a nested parameter collection under its own name.
    pub fn add_nested(&mut self, parameters: Parameters) -> Result<(), ParameterError> {
        let key = parameters.name.clone();
        self.add(key, parameters)
    }

    /// Replaces the value of an existing parameter, keeping its position, or adds it.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParameterValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParameterValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    fn value(&self, key: &str) -> Result<&ParameterValue, ParameterError> {
        self.get(key)
            .ok_or_else(|| ParameterError::MissingKey(key.to_string()))
    }

    typed_getter!(get_bool, Bool, bool, "bool");
    typed_getter!(get_int, Int, i64, "int");
    typed_getter!(get_real, Real, f64, "real");
    typed_getter!(get_str, Str, String, "string");

    pub fn nested(&self, key: &str) -> Result<&Parameters, ParameterError> {
        match self.value(key)? {
            ParameterValue::Nested(parameters) => Ok(parameters),
            other => Err(ParameterError::TypeMismatch {
                key: key.to_string(),
                expected: "parameters",
                found: other.type_name(),
            }),
        }
    }

    pub fn nested_mut(&mut self, key: &str) -> Result<&mut Parameters, ParameterError> {
        let value = self
            .entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
            .ok_or_else(|| ParameterError::MissingKey(key.to_string()))?;
        match value {
            ParameterValue::Nested(parameters) => Ok(parameters),
            other => Err(ParameterError::TypeMismatch {
                key: key.to_string(),
                expected: "parameters",
                found: other.type_name(),
            }),
        }
    }

    pub fn to_json_string(&self) -> Result<String, ParameterError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ParameterError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), ParameterError> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ParameterError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
