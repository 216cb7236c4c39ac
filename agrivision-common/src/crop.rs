//! Crop-recommendation response decoding
//!
//! The scoring endpoint has answered in several shapes over its lifetime:
//!
//! | Shape | Example |
//! |-------|---------|
//! | bare list | `["rice"]` |
//! | `Results` object | `{"Results": ["rice"]}` |
//! | `predictions` object | `{"predictions": ["rice"]}` |
//! | JSON-encoded string | `"[\"rice\"]"` |
//!
//! [`CropResponse::detect`] names the shape explicitly; [`CropResponse::label`]
//! reduces any of them to the single recommended label.

use crate::error::{Error, Result};
use crate::types::CropRecommendation;
use serde_json::Value;

const SERVICE: &str = "crop recommendation model";

/// Recognized response shapes
#[derive(Debug, Clone, PartialEq)]
pub enum CropResponse {
    List(Vec<Value>),
    Results(Vec<Value>),
    Predictions(Vec<Value>),
    /// A string holding one of the other shapes
    Encoded(String),
}

impl CropResponse {
    /// Classify a raw JSON body
    pub fn detect(raw: Value) -> Result<Self> {
        match raw {
            Value::Array(items) => Ok(CropResponse::List(items)),
            Value::String(text) => Ok(CropResponse::Encoded(text)),
            Value::Object(mut map) => {
                if let Some(Value::Array(items)) = map.remove("Results") {
                    Ok(CropResponse::Results(items))
                } else if let Some(Value::Array(items)) = map.remove("predictions") {
                    Ok(CropResponse::Predictions(items))
                } else {
                    Err(Error::parse(
                        SERVICE,
                        "object has neither a `Results` nor a `predictions` array",
                    ))
                }
            }
            other => Err(Error::parse(
                SERVICE,
                format!("unsupported response type: {}", json_type(&other)),
            )),
        }
    }

    /// Reduce to the recommended label
    pub fn label(self) -> Result<String> {
        match self {
            CropResponse::List(items)
            | CropResponse::Results(items)
            | CropResponse::Predictions(items) => first_label(items),
            CropResponse::Encoded(text) => {
                let inner: Value = serde_json::from_str(&text)
                    .map_err(|e| Error::parse(SERVICE, format!("invalid encoded body: {}", e)))?;
                match CropResponse::detect(inner)? {
                    // One level of nesting only
                    CropResponse::Encoded(_) => {
                        Err(Error::parse(SERVICE, "doubly encoded response body"))
                    }
                    decoded => decoded.label(),
                }
            }
        }
    }
}

/// Decode a raw scoring response straight into a recommendation
pub fn decode_recommendation(raw: Value) -> Result<CropRecommendation> {
    let label = CropResponse::detect(raw)?.label()?;
    Ok(CropRecommendation::new(label))
}

fn first_label(items: Vec<Value>) -> Result<String> {
    let Some(first) = items.into_iter().next() else {
        return Err(Error::parse(SERVICE, "empty prediction list"));
    };

    let label = match first {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        other => {
            return Err(Error::parse(
                SERVICE,
                format!("prediction is a {}, expected a label", json_type(&other)),
            ))
        }
    };

    let label = label.trim().to_string();
    if label.is_empty() {
        return Err(Error::parse(SERVICE, "blank label"));
    }
    Ok(label)
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
