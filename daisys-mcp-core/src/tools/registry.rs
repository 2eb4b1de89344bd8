use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::config::DaisysConfig;
use crate::tools::models::GetModels;
use crate::tools::r#trait::{SharedTool, ToolContext};
use crate::tools::speak::TextToSpeech;
use crate::tools::voices::{CreateVoice, GetVoices, RemoveVoice};

pub struct ToolRegistry {
    tools: BTreeMap<String, SharedTool>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<SharedTool>) -> Self {
        let mut registry = Self {
            tools: BTreeMap::new(),
        };
        for tool in tools {
            registry.register_tool(tool);
        }
        registry
    }

    /// The full tool set served over MCP.
    pub fn standard(config: DaisysConfig) -> Self {
        let context = Arc::new(ToolContext::new(config));
        Self::new(vec![
            Arc::new(TextToSpeech::new(context.clone())),
            Arc::new(GetVoices::new(context.clone())),
            Arc::new(GetModels::new(context.clone())),
            Arc::new(CreateVoice::new(context.clone())),
            Arc::new(RemoveVoice::new(context)),
        ])
    }

    pub fn register_tool(&mut self, tool: SharedTool) {
        let name = tool.name().to_string();
        debug!(tool_name = %name, "Registering tool");
        self.tools.insert(name, tool);
    }

    pub fn get(&self, name: &str) -> Option<&SharedTool> {
        self.tools.get(name)
    }

    pub fn list(&self) -> impl Iterator<Item = &SharedTool> {
        self.tools.values()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}
