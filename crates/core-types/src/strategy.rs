use serde::{Deserialize, Serialize};
use toml::Value;

use crate::{Error, Result};

/// A strategy id plus its raw parameter table.
///
/// The table is kept untyped here; each strategy deserializes it into its own
/// settings struct, which is where defaults are applied.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub name: String,
    // This will hold the `params = { ... }` table from the TOML
    #[serde(default = "empty_params")]
    pub params: Value,
}

impl StrategyConfig {
    /// A config with no overrides, so every parameter takes its default.
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: empty_params(),
        }
    }

    pub fn new(name: impl Into<String>, params: Value) -> Result<Self> {
        if !params.is_table() {
            return Err(Error::ParamsNotATable(params.to_string()));
        }
        Ok(Self {
            name: name.into(),
            params,
        })
    }

    /// Sets a single parameter, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        if let Value::Table(table) = &mut self.params {
            table.insert(key.into(), value);
        }
    }
}

fn empty_params() -> Value {
    Value::Table(toml::map::Map::new())
}

/// Parses a `key=value` override into a typed TOML value.
///
/// Integers, floats and booleans are recognized; anything else is kept as a string.
pub fn parse_param(raw: &str) -> Option<(String, Value)> {
    let (key, value) = raw.split_once('=')?;
    let value = value.trim();
    let parsed = if let Ok(i) = value.parse::<i64>() {
        Value::Integer(i)
    } else if let Ok(f) = value.parse::<f64>() {
        Value::Float(f)
    } else if let Ok(b) = value.parse::<bool>() {
        Value::Boolean(b)
    } else {
        Value::String(value.to_string())
    };
    Some((key.trim().to_string(), parsed))
}
