use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use crate::api::DaisysClient;
use crate::config::DaisysConfig;

/// Shared state handed to every tool: the API client (with its cached login)
/// and the process configuration.
pub struct ToolContext {
    pub client: DaisysClient,
    pub config: DaisysConfig,
}

impl ToolContext {
    pub fn new(config: DaisysConfig) -> Self {
        Self {
            client: DaisysClient::new(config.clone()),
            config,
        }
    }
}

#[async_trait::async_trait]
pub trait ToolExecutor: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;

    /// Runs the tool. The returned string is the tool result text; errors
    /// become tool-level error results, never protocol failures.
    async fn execute(&self, arguments: Value) -> Result<String>;
}

pub type SharedTool = Arc<dyn ToolExecutor>;
