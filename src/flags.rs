use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{CoverallsError, Result};

const FALSY: [&str; 5] = ["false", "f", "0", "no", "n"];
const TRUTHY: [&str; 5] = ["true", "t", "1", "yes", "y"];

/// Parses a boolean flag value, accepting the usual yes/no spellings in any case.
///
/// # Errors
///
/// Returns [`CoverallsError::InvalidBool`] for any unrecognized string.
pub fn str_to_bool(value: &str) -> Result<bool> {
    let lowered = value.to_lowercase();
    if FALSY.contains(&lowered.as_str()) {
        Ok(false)
    } else if TRUTHY.contains(&lowered.as_str()) {
        Ok(true)
    } else {
        Err(CoverallsError::InvalidBool(value.to_string()))
    }
}

/// Parses a boolean from a loosely typed settings value.
///
/// Booleans pass through and strings go through [`str_to_bool`]. Anything
/// else (numbers, arrays, objects, null) is rejected as the wrong type.
pub fn value_to_bool(value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => str_to_bool(s),
        other => Err(CoverallsError::InvalidBoolType(other.to_string())),
    }
}

/// `clap` value parser for `--parallel`, `--parallel-finished` and `--debug`.
pub fn parse_bool_flag(value: &str) -> std::result::Result<bool, String> {
    str_to_bool(value).map_err(|e| e.to_string())
}

/// `serde` adapter for optional boolean settings written as bools or strings.
pub fn deserialize_opt_bool<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    value
        .map(|v| value_to_bool(&v))
        .transpose()
        .map_err(serde::de::Error::custom)
}
