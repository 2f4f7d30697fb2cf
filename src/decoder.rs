//! Message decoder for inbound telemetry frames.
//!
//! A frame is one UTF-8 JSON object. `temperature_celsius` and
//! `humidity_percent` are optional and default to `0.0`; only a frame that is
//! not a well-formed JSON object (or carries a non-numeric reading field) is
//! rejected. Rejection never ends the session, the receive loop logs it and
//! keeps consuming.

use serde_json::{Map, Value};
use thiserror::Error;

/// Key of the temperature field in a frame.
pub const TEMPERATURE_KEY: &str = "temperature_celsius";
/// Key of the humidity field in a frame.
pub const HUMIDITY_KEY: &str = "humidity_percent";

/// One decoded sample.
///
/// Readings are ordered by arrival; `timestamp` is informational.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reading {
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Sensor identifier, when the feed provides one.
    pub sensor_id: Option<String>,
    /// Sensor location, when the feed provides one.
    pub location: Option<String>,
    /// Process stage label, when the feed provides one.
    pub process_stage: Option<String>,
    /// Source timestamp as sent by the feed (not parsed).
    pub timestamp: Option<String>,
}

impl Reading {
    fn from_object(object: &Map<String, Value>) -> Result<Self, DecodeError> {
        Ok(Self {
            temperature: numeric_field(object, TEMPERATURE_KEY)?,
            humidity: numeric_field(object, HUMIDITY_KEY)?,
            sensor_id: text_field(object, "sensor_id"),
            location: text_field(object, "location"),
            process_stage: text_field(object, "process_stage"),
            timestamp: text_field(object, "timestamp"),
        })
    }
}

/// Why a frame did not produce a [`Reading`].
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Not valid JSON (or not UTF-8).
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Valid JSON, but the top-level value is not an object.
    #[error("frame is not a JSON object (found {0})")]
    NotAnObject(&'static str),

    /// A reading field is present but not a number.
    #[error("field '{field}' is not numeric (found {found})")]
    InvalidField {
        /// Offending key.
        field: &'static str,
        /// JSON type that was found instead.
        found: &'static str,
    },
}

/// Decode one text frame into a [`Reading`].
pub fn decode(frame: &str) -> Result<Reading, DecodeError> {
    let value: Value = serde_json::from_str(frame)?;
    decode_value(&value)
}

/// Decode one binary frame carrying UTF-8 JSON.
pub fn decode_bytes(frame: &[u8]) -> Result<Reading, DecodeError> {
    let value: Value = serde_json::from_slice(frame)?;
    decode_value(&value)
}

fn decode_value(value: &Value) -> Result<Reading, DecodeError> {
    match value {
        Value::Object(object) => Reading::from_object(object),
        other => Err(DecodeError::NotAnObject(type_name(other))),
    }
}

fn numeric_field(object: &Map<String, Value>, field: &'static str) -> Result<f64, DecodeError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(0.0),
        Some(value) => value.as_f64().ok_or(DecodeError::InvalidField {
            field,
            found: type_name(value),
        }),
    }
}

fn text_field(object: &Map<String, Value>, field: &str) -> Option<String> {
    object.get(field).and_then(Value::as_str).map(str::to_owned)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
