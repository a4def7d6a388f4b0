//! JSON <-> path Value conversion utilities

use bigdecimal::BigDecimal;

use super::CliError;
use crate::{Value, output::format_number};

/// Parses JSON text into a path Value.
pub fn parse_document(text: &str) -> Result<Value, CliError> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    json_to_value(json)
}

/// Convert serde_json::Value to a path Value
///
/// Numbers are converted from their source text, so `1.50` keeps its scale.
/// `serde_json` keeps only the last of repeated object keys.
pub fn json_to_value(v: serde_json::Value) -> Result<Value, CliError> {
    Ok(match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => Value::Number(n.as_str().parse::<BigDecimal>()?),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(
            arr.into_iter()
                .map(json_to_value)
                .collect::<Result<_, _>>()?,
        ),
        serde_json::Value::Object(obj) => Value::Object(
            obj.into_iter()
                .map(|(k, v)| json_to_value(v).map(|v| (k, v)))
                .collect::<Result<_, _>>()?,
        ),
    })
}

/// Convert a path Value to serde_json::Value
///
/// Numbers keep every digit. Datetime items become ISO-8601 strings.
/// Repeated object keys collapse to the last binding; use [`crate::output`]
/// to print them faithfully.
pub fn value_to_json(v: Value) -> Result<serde_json::Value, CliError> {
    Ok(match v {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(b),
        Value::Number(n) => serde_json::Value::Number(format_number(&n).parse()?),
        Value::String(s) => serde_json::Value::String(s),
        Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        Value::Array(arr) => serde_json::Value::Array(
            arr.into_iter()
                .map(value_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(members) => serde_json::Value::Object(
            members
                .into_iter()
                .map(|(k, v)| value_to_json(v).map(|v| (k, v)))
                .collect::<Result<_, _>>()?,
        ),
    })
}
