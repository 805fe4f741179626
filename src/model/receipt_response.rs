use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::SubmitError;

/// Body of a successful submission. Other fields the server sends are ignored.
#[derive(Debug, Deserialize)]
pub struct ReceiptResponse {
    #[serde(default)]
    pub receipt: Option<String>,
}

impl ReceiptResponse {
    /// Only a JSON object is accepted; arrays and scalars are malformed even when
    /// serde could map them onto the struct.
    pub fn parse(body: &str) -> Result<Self, SubmitError> {
        let object: Map<String, Value> = serde_json::from_str(body)
            .map_err(|e| SubmitError::malformed(format!("invalid JSON object ({e})"), body))?;
        serde_json::from_value(Value::Object(object))
            .map_err(|e| SubmitError::malformed(format!("unexpected receipt ({e})"), body))
    }

    /// Returns the receipt, treating an empty one the same as a missing one.
    pub fn into_receipt(self, body: &str) -> Result<String, SubmitError> {
        match self.receipt {
            Some(receipt) if !receipt.is_empty() => Ok(receipt),
            _ => Err(SubmitError::malformed("No receipt", body)),
        }
    }
}
