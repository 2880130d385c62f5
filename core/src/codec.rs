//! Thin JSON codec over `serde_json`, mapping failures onto `ClientError`.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::ClientError;

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ClientError> {
    serde_json::to_string(value).map_err(|e| ClientError::encode(e.to_string()))
}

pub fn from_json<T: DeserializeOwned>(text: &str) -> Result<T, ClientError> {
    serde_json::from_str(text).map_err(|e| ClientError::decode(e.to_string()))
}

pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|e| ClientError::decode(e.to_string()))
}

/// Parse text into a generic JSON tree.
pub fn parse_tree(text: &str) -> Result<Value, ClientError> {
    from_json(text)
}
