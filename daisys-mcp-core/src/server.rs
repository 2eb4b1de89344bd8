use std::sync::Arc;

use rmcp::{
    model::{
        CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject,
        ListToolsResult, PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo,
        Tool,
    },
    service::{RequestContext, RoleServer, ServiceExt},
    transport::stdio,
    Error as McpError, ServerHandler,
};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::config::DaisysConfig;
use crate::tools::{SharedTool, ToolRegistry};

/// MCP server exposing the Daisys speech tools over stdio.
pub struct DaisysServer {
    registry: ToolRegistry,
}

impl DaisysServer {
    pub fn new(config: DaisysConfig) -> Self {
        Self {
            registry: ToolRegistry::standard(config),
        }
    }

    /// Unknown tools and malformed argument shapes are protocol errors;
    /// failures inside a tool are reported in-band so the caller can read
    /// them.
    async fn dispatch_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, McpError> {
        let Some(tool) = self.registry.get(name) else {
            return Err(McpError::invalid_params(
                format!("unknown tool: {name}"),
                None,
            ));
        };

        let arguments = Value::Object(arguments.unwrap_or_default());
        debug!(tool_name = %name, "Executing tool");

        match tool.execute(arguments).await {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) if e.downcast_ref::<serde_json::Error>().is_some() => {
                Err(McpError::invalid_params(format!("{e:#}"), None))
            }
            Err(e) => {
                error!(tool_name = %name, error = %e, "Tool execution failed");
                Ok(CallToolResult::error(vec![Content::text(format!(
                    "{e:#}"
                ))]))
            }
        }
    }
}

fn to_rmcp_tool(tool: &SharedTool) -> Tool {
    let schema = tool.input_schema();
    let schema = Arc::new(schema.as_object().cloned().unwrap_or_default());
    Tool::new(tool.name(), tool.description(), schema)
}

impl ServerHandler for DaisysServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Text-to-speech server backed by the Daisys API. Use get_voices and \
                 get_models to discover what is available, text_to_speech to synthesize \
                 audio to a file, and create_voice/remove_voice to manage voices."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = self.registry.list().map(to_rmcp_tool).collect();
        Ok(ListToolsResult {
            next_cursor: None,
            tools,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch_tool(request.name.as_ref(), request.arguments)
            .await
    }
}

/// Runs the server on stdin/stdout until the client disconnects.
pub async fn serve_stdio(config: DaisysConfig) -> anyhow::Result<()> {
    let server = DaisysServer::new(config);
    info!("Starting MCP server on stdio");

    let service = server
        .serve(stdio())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start MCP server: {e:?}"))?;

    service
        .waiting()
        .await
        .map_err(|e| anyhow::anyhow!("MCP server task failed: {e:?}"))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn server() -> DaisysServer {
        DaisysServer::new(DaisysConfig::new("a@b.c".into(), "pw".into()))
    }

    #[test]
    fn advertises_tool_capability() {
        let info = server().get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.is_some());
    }

    #[test]
    fn registry_tools_convert_to_protocol_tools() {
        let server = server();
        let tools: Vec<Tool> = server.registry.list().map(to_rmcp_tool).collect();
        assert_eq!(tools.len(), 5);
        for tool in &tools {
            assert!(!tool.name.is_empty());
            assert!(tool.input_schema.contains_key("type"));
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_a_protocol_error() {
        let result = server().dispatch_tool("transcribe", None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn malformed_arguments_are_a_protocol_error() {
        let arguments = json!({"text": 42}).as_object().cloned();
        let result = server().dispatch_tool("text_to_speech", arguments).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn tool_failures_are_reported_in_band() {
        let arguments = json!({"sort_by": "timestamp"}).as_object().cloned();
        let result = server()
            .dispatch_tool("get_voices", arguments)
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
    }
}
