use crate::error::{McpError, McpResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Parse JSON value into a typed parameter struct
pub fn parse_params<T: DeserializeOwned>(params: Value) -> McpResult<T> {
    serde_json::from_value(params)
        .map_err(|e| McpError::InvalidParameter(format!("Invalid parameters: {}", e)))
}
