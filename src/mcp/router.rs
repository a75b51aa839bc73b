use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{McpError, McpResult};
use crate::tools::Tool;

use super::types::ToolDescriptor;

/// Maps tool names to tool instances. Built once at startup; tools cannot
/// be registered or removed afterwards.
pub struct McpRouter {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl McpRouter {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> McpResult<Self> {
        let mut router = Self {
            tools: Vec::new(),
            by_name: HashMap::new(),
        };
        for tool in tools {
            router.register(tool)?;
        }
        Ok(router)
    }

    /// Registers a tool. Duplicate names are rejected so a misconfigured
    /// catalog fails at startup instead of shadowing a tool silently.
    fn register(&mut self, tool: Arc<dyn Tool>) -> McpResult<()> {
        let name = tool.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(McpError::Internal(format!(
                "Duplicate tool registration: '{}'",
                name
            )));
        }
        debug!("Registered tool '{}'", name);
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Descriptors for all registered tools, in registration order.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|tool| ToolDescriptor {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    /// Looks up a tool by name and delegates to its execute. An unknown
    /// name is an invocation fault reported to the caller, not a protocol
    /// method-not-found.
    pub async fn invoke(&self, name: &str, arguments: Value) -> McpResult<Value> {
        let tool = self
            .by_name
            .get(name)
            .and_then(|&index| self.tools.get(index))
            .ok_or_else(|| McpError::NotFound(format!("Tool '{}' not found", name)))?;

        tool.execute(arguments).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::types::ToolInputSchema;
    use async_trait::async_trait;
    use serde_json::json;

    struct FakeTool {
        name: &'static str,
    }

    #[async_trait]
    impl Tool for FakeTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "fake"
        }

        fn input_schema(&self) -> ToolInputSchema {
            ToolInputSchema::object()
        }

        async fn execute(&self, params: serde_json::Value) -> McpResult<serde_json::Value> {
            Ok(json!({"echo": params, "tool": self.name}))
        }
    }

    fn fake(name: &'static str) -> Arc<dyn Tool> {
        Arc::new(FakeTool { name })
    }

    #[test]
    fn list_preserves_registration_order() {
        let router = McpRouter::new(vec![fake("b.tool"), fake("a.tool"), fake("c.tool")]).unwrap();
        let names: Vec<String> = router.list().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["b.tool", "a.tool", "c.tool"]);
    }

    #[test]
    fn duplicate_registration_fails_fast() {
        let result = McpRouter::new(vec![fake("same"), fake("same")]);
        match result {
            Err(McpError::Internal(msg)) => assert!(msg.contains("same")),
            other => panic!("expected duplicate rejection, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn invoke_delegates_to_named_tool() {
        let router = McpRouter::new(vec![fake("x"), fake("y")]).unwrap();
        let result = router.invoke("y", json!({"q": 1})).await.unwrap();
        assert_eq!(result["tool"], "y");
        assert_eq!(result["echo"], json!({"q": 1}));
    }

    #[tokio::test]
    async fn invoke_unknown_tool_is_not_found() {
        let router = McpRouter::new(vec![fake("x")]).unwrap();
        match router.invoke("missing", json!({})).await {
            Err(McpError::NotFound(msg)) => assert!(msg.contains("missing")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }
}
