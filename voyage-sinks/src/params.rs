//! Typed sink parameters.
//!
//! The host environment supplies backend-specific parameters as strings;
//! [`ParamValue::coerce`] maps them into the small value space sinks accept
//! (string, integer, boolean) and [`SinkParams`] gives constructors typed,
//! validated access.

use std::collections::BTreeMap;

use crate::error::{Result, SinkError};

/// A coerced parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl ParamValue {
    /// Coerces a raw environment value: all-digits becomes `Int`, literal
    /// `true`/`false` (case-insensitive) becomes `Bool`, anything else
    /// stays a string.
    pub fn coerce(raw: &str) -> ParamValue {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(n) = raw.parse::<i64>() {
                return ParamValue::Int(n);
            }
        }
        if raw.eq_ignore_ascii_case("true") {
            return ParamValue::Bool(true);
        }
        if raw.eq_ignore_ascii_case("false") {
            return ParamValue::Bool(false);
        }
        ParamValue::Str(raw.to_string())
    }
}

/// The parameter record handed to a sink constructor.
#[derive(Debug, Clone, Default)]
pub struct SinkParams {
    values: BTreeMap<String, ParamValue>,
}

impl SinkParams {
    pub fn new() -> SinkParams {
        SinkParams::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// A required string parameter.
    pub fn require_str(&self, key: &str) -> Result<&str> {
        match self.values.get(key) {
            Some(ParamValue::Str(s)) => Ok(s),
            Some(_) => Err(SinkError::Config(format!(
                "parameter `{key}` must be a string"
            ))),
            None => Err(SinkError::Config(format!(
                "missing required parameter `{key}`"
            ))),
        }
    }

    /// An optional integer parameter with a default.
    pub fn int_or(&self, key: &str, default: i64) -> Result<i64> {
        match self.values.get(key) {
            Some(ParamValue::Int(n)) => Ok(*n),
            Some(_) => Err(SinkError::Config(format!(
                "parameter `{key}` must be an integer"
            ))),
            None => Ok(default),
        }
    }

    /// An optional boolean parameter with a default.
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.values.get(key) {
            Some(ParamValue::Bool(b)) => Ok(*b),
            Some(_) => Err(SinkError::Config(format!(
                "parameter `{key}` must be a boolean"
            ))),
            None => Ok(default),
        }
    }
}

impl FromIterator<(String, ParamValue)> for SinkParams {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> SinkParams {
        SinkParams {
            values: iter.into_iter().collect(),
        }
    }
}
