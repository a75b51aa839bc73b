use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// MCP protocol version
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC Request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonRpcRequest {
    // Envelopes without a version tag are tolerated and assumed 2.0
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: Option<Value>,
}

fn default_jsonrpc() -> String {
    "2.0".to_string()
}

impl JsonRpcRequest {
    /// Notifications carry no id and never receive a response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC Response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC Error
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

/// Initialize Result
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// Server Capabilities
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerCapabilities {
    pub tools: HashMap<String, Value>,
}

/// Server Information
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Tool Descriptor exposed through `tools/list`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: ToolInputSchema,
}

/// Tool Input Schema (declarative, used for discovery only)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolInputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: HashMap<String, Property>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl ToolInputSchema {
    pub fn object() -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: HashMap::new(),
            required: Vec::new(),
        }
    }

    pub fn string_prop(mut self, name: &str, description: &str) -> Self {
        self.properties
            .insert(name.to_string(), Property::string(description, None));
        self
    }

    pub fn string_prop_with_default(mut self, name: &str, description: &str, default: &str) -> Self {
        self.properties
            .insert(name.to_string(), Property::string(description, Some(default)));
        self
    }

    pub fn require(mut self, name: &str) -> Self {
        self.required.push(name.to_string());
        self
    }
}

/// Property Definition
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl Property {
    fn string(description: &str, default: Option<&str>) -> Self {
        Self {
            property_type: "string".to_string(),
            description: Some(description.to_string()),
            default: default.map(|d| Value::String(d.to_string())),
        }
    }
}

/// List Tools Result
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListToolsResult {
    pub tools: Vec<ToolDescriptor>,
}

/// Call Tool Request params
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
}

fn empty_arguments() -> Value {
    Value::Object(serde_json::Map::new())
}

/// JSON-RPC error codes used by this server
pub mod error_codes {
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const TOOL_ERROR: i32 = -32000;
}

impl JsonRpcError {
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: error_codes::METHOD_NOT_FOUND,
            message: format!("Method not found: {}", method),
        }
    }

    pub fn tool_error(message: String) -> Self {
        Self {
            code: error_codes::TOOL_ERROR,
            message,
        }
    }
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Option<Value>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn success_response_omits_error_field() {
        let response = JsonRpcResponse::success(Some(json!(1)), json!({"ok": true}));
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(
            encoded,
            json!({"jsonrpc": "2.0", "result": {"ok": true}, "id": 1})
        );
    }

    #[test]
    fn error_response_omits_result_field() {
        let response =
            JsonRpcResponse::error(Some(json!("req-7")), JsonRpcError::method_not_found("foo"));
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(
            encoded,
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method not found: foo"},
                "id": "req-7"
            })
        );
    }

    #[test]
    fn request_id_may_be_number_or_string() {
        let numeric: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"x","id":42}"#).unwrap();
        assert_eq!(numeric.id, Some(json!(42)));
        assert!(!numeric.is_notification());

        let named: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"x","id":"abc"}"#).unwrap();
        assert_eq!(named.id, Some(json!("abc")));

        let notification: JsonRpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"x"}"#).unwrap();
        assert!(notification.is_notification());
    }

    #[test]
    fn missing_version_tag_defaults_to_2_0() {
        let request: JsonRpcRequest =
            serde_json::from_str(r#"{"id":1,"method":"tools/list"}"#).unwrap();
        assert_eq!(request.jsonrpc, "2.0");
    }

    #[test]
    fn input_schema_serializes_with_camel_case_keys() {
        let descriptor = ToolDescriptor {
            name: "abp.docs.search".to_string(),
            description: "Search ABP Framework documentation.".to_string(),
            input_schema: ToolInputSchema::object()
                .string_prop("query", "Search query")
                .string_prop_with_default("version", "Documentation version", "latest")
                .require("query"),
        };

        let encoded = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(encoded["inputSchema"]["type"], "object");
        assert_eq!(encoded["inputSchema"]["required"], json!(["query"]));
        assert_eq!(
            encoded["inputSchema"]["properties"]["version"]["default"],
            "latest"
        );
    }
}
