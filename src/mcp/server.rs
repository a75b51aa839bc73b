use anyhow::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::error::{McpError, McpResult};
use crate::utils::parse_params;

use super::router::McpRouter;
use super::types::*;

/// Protocol dispatcher: owns the stdin/stdout line loop and maps JSON-RPC
/// methods to protocol operations. One request is handled at a time, so
/// responses leave in request order.
pub struct McpServer {
    router: Arc<McpRouter>,
}

impl McpServer {
    pub fn new(router: Arc<McpRouter>) -> Self {
        Self { router }
    }

    pub async fn run(&self) -> Result<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin);

        info!("ABP MCP Server started");

        let mut buffer = String::new();

        loop {
            buffer.clear();

            match reader.read_line(&mut buffer).await {
                Ok(0) => break,
                Ok(_) => {
                    let trimmed = buffer.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    debug!("Received: {}", trimmed);

                    if let Some(response) = self.process_line(trimmed).await {
                        let response_str = serde_json::to_string(&response)?;

                        stdout.write_all(response_str.as_bytes()).await?;
                        stdout.write_all(b"\n").await?;
                        stdout.flush().await?;

                        debug!("Sent: {}", response_str);
                    }
                }
                Err(e) => {
                    error!("Error reading from stdin: {}", e);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Decodes one line and dispatches it. Returns `None` when no response
    /// line must be written: undecodable input (no identifier can be
    /// trusted) and notifications.
    pub(crate) async fn process_line(&self, input: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(input) {
            Ok(request) => request,
            Err(e) => {
                warn!("Failed to parse request, dropping line: {}", e);
                return None;
            }
        };

        self.dispatch(request).await
    }

    async fn dispatch(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let method = request.method;
        let id = request.id;

        let outcome = match method.as_str() {
            "initialize" => self.handle_initialize(),
            "tools/list" => self.handle_list_tools(),
            "tools/call" => self.handle_call_tool(request.params).await,
            _ => {
                if id.is_none() {
                    debug!("Ignoring unknown notification: {}", method);
                    return None;
                }
                warn!("Unknown method: {}", method);
                return Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::method_not_found(&method),
                ));
            }
        };

        match outcome {
            Ok(result) => {
                // Notifications never get a response, even for known methods
                id.as_ref()?;
                Some(JsonRpcResponse::success(id, result))
            }
            Err(e) => {
                error!("Error handling method {}: {}", method, e);
                id.as_ref()?;
                Some(JsonRpcResponse::error(id, JsonRpcError::tool_error(e.to_string())))
            }
        }
    }

    /// Fixed capability descriptor. Params are ignored.
    fn handle_initialize(&self) -> McpResult<Value> {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: HashMap::new(),
            },
            server_info: ServerInfo {
                name: "abp-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_list_tools(&self) -> McpResult<Value> {
        let result = ListToolsResult {
            tools: self.router.list(),
        };

        Ok(serde_json::to_value(result)?)
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> McpResult<Value> {
        let params: CallToolParams = parse_params(
            params.ok_or_else(|| McpError::InvalidParameter("Missing params".to_string()))?,
        )?;

        debug!("Calling tool '{}'", params.name);
        self.router.invoke(&params.name, params.arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct StubSearchTool;

    #[async_trait]
    impl Tool for StubSearchTool {
        fn name(&self) -> &str {
            "abp.docs.search"
        }

        fn description(&self) -> &str {
            "Search ABP Framework documentation."
        }

        fn input_schema(&self) -> ToolInputSchema {
            ToolInputSchema::object()
                .string_prop("query", "Search query")
                .require("query")
        }

        async fn execute(&self, params: Value) -> McpResult<Value> {
            let query = params
                .get("query")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    McpError::InvalidParameter("Missing required argument: query".to_string())
                })?;

            Ok(json!({
                "items": [{
                    "title": format!("Result for {}", query),
                    "url": "https://abp.io/docs/latest/modules",
                    "snippet": "Found in documentation navigation."
                }]
            }))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "abp.failing"
        }

        fn description(&self) -> &str {
            "Always fails."
        }

        fn input_schema(&self) -> ToolInputSchema {
            ToolInputSchema::object()
        }

        async fn execute(&self, _params: Value) -> McpResult<Value> {
            Err(McpError::Internal("upstream unavailable".to_string()))
        }
    }

    fn test_server() -> McpServer {
        let router = McpRouter::new(vec![
            Arc::new(StubSearchTool) as Arc<dyn Tool>,
            Arc::new(FailingTool) as Arc<dyn Tool>,
        ])
        .unwrap();
        McpServer::new(Arc::new(router))
    }

    #[tokio::test]
    async fn initialize_returns_capability_descriptor() {
        let server = test_server();
        let response = server
            .process_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#)
            .await
            .unwrap();

        assert_eq!(response.id, Some(json!(1)));
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "abp-mcp-server");
        assert_eq!(result["capabilities"]["tools"], json!({}));
    }

    #[tokio::test]
    async fn tools_list_contains_docs_search() {
        let server = test_server();
        let response = server
            .process_line(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
            .await
            .unwrap();

        assert_eq!(response.id, Some(json!(1)));
        let tools = response.result.unwrap()["tools"].clone();
        assert_eq!(tools[0]["name"], "abp.docs.search");
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["query"]));
    }

    #[tokio::test]
    async fn tool_call_echoes_request_id() {
        let server = test_server();
        let response = server
            .process_line(
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"abp.docs.search","arguments":{"query":"module"}}}"#,
            )
            .await
            .unwrap();

        assert_eq!(response.id, Some(json!(2)));
        assert!(response.error.is_none());
        let items = response.result.unwrap()["items"].clone();
        assert_eq!(items[0]["title"], "Result for module");
    }

    #[tokio::test]
    async fn string_request_id_is_echoed_verbatim() {
        let server = test_server();
        let response = server
            .process_line(r#"{"jsonrpc":"2.0","id":"req-9","method":"tools/list"}"#)
            .await
            .unwrap();

        assert_eq!(response.id, Some(json!("req-9")));
    }

    #[tokio::test]
    async fn unknown_method_with_id_is_method_not_found() {
        let server = test_server();
        let response = server
            .process_line(r#"{"jsonrpc":"2.0","id":3,"method":"nonexistent"}"#)
            .await
            .unwrap();

        assert_eq!(response.id, Some(json!(3)));
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn notifications_never_get_a_response() {
        let server = test_server();

        let unknown = server
            .process_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(unknown.is_none());

        let known = server
            .process_line(r#"{"jsonrpc":"2.0","method":"tools/list"}"#)
            .await;
        assert!(known.is_none());
    }

    #[tokio::test]
    async fn malformed_line_is_dropped_silently() {
        let server = test_server();
        assert!(server.process_line("{not json").await.is_none());

        // The loop keeps serving afterwards
        let response = server
            .process_line(r#"{"jsonrpc":"2.0","id":4,"method":"tools/list"}"#)
            .await
            .unwrap();
        assert_eq!(response.id, Some(json!(4)));
    }

    #[tokio::test]
    async fn tool_fault_becomes_invocation_error() {
        let server = test_server();
        let response = server
            .process_line(
                r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"abp.failing","arguments":{}}}"#,
            )
            .await
            .unwrap();

        let error = response.error.unwrap();
        assert_eq!(error.code, -32000);
        assert!(error.message.contains("upstream unavailable"));

        // Subsequent requests are still served
        let next = server
            .process_line(
                r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"abp.docs.search","arguments":{"query":"x"}}}"#,
            )
            .await
            .unwrap();
        assert_eq!(next.id, Some(json!(6)));
        assert!(next.error.is_none());
    }

    #[tokio::test]
    async fn missing_required_argument_is_invocation_error() {
        let server = test_server();
        let response = server
            .process_line(
                r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"abp.docs.search","arguments":{}}}"#,
            )
            .await
            .unwrap();

        let error = response.error.unwrap();
        assert_eq!(error.code, -32000);
        assert!(error.message.contains("query"));
    }

    #[tokio::test]
    async fn unknown_tool_is_invocation_error_not_method_error() {
        let server = test_server();
        let response = server
            .process_line(
                r#"{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{"name":"abp.unknown","arguments":{}}}"#,
            )
            .await
            .unwrap();

        let error = response.error.unwrap();
        assert_eq!(error.code, -32000);
        assert!(error.message.contains("abp.unknown"));
    }

    #[tokio::test]
    async fn tool_call_without_params_is_invocation_error() {
        let server = test_server();
        let response = server
            .process_line(r#"{"jsonrpc":"2.0","id":9,"method":"tools/call"}"#)
            .await
            .unwrap();

        let error = response.error.unwrap();
        assert_eq!(error.code, -32000);
        assert!(error.message.contains("params"));
    }
}
