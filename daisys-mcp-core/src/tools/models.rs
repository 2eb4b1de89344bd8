use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::directory::{filter_models, sort_models, ModelSortField, SortDirection};
use crate::tools::r#trait::{ToolContext, ToolExecutor};

pub struct GetModels {
    context: Arc<ToolContext>,
}

impl GetModels {
    pub fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }
}

#[derive(Deserialize)]
struct GetModelsArgs {
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    sort_by: Option<String>,
    #[serde(default)]
    sort_direction: Option<String>,
}

#[async_trait::async_trait]
impl ToolExecutor for GetModels {
    fn name(&self) -> &'static str {
        "get_models"
    }

    fn description(&self) -> &'static str {
        "Get available text-to-speech models, optionally filtered by language code and \
         sorted by name or displayname."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "language": {
                    "type": "string",
                    "description": "Language code such as en or nl; models are matched on the first character"
                },
                "sort_by": {
                    "type": "string",
                    "enum": ["name", "displayname"],
                    "description": "Sort field (default name)"
                },
                "sort_direction": {
                    "type": "string",
                    "enum": ["asc", "desc"],
                    "description": "Sort direction (default asc)"
                }
            }
        })
    }

    async fn execute(&self, arguments: Value) -> Result<String> {
        let args: GetModelsArgs =
            serde_json::from_value(arguments).context("invalid arguments for get_models")?;

        let sort_by = match args.sort_by.as_deref() {
            None => ModelSortField::default(),
            Some(raw) => raw
                .parse::<ModelSortField>()
                .map_err(|_| anyhow::anyhow!("sort_by must be one of: name, displayname"))?,
        };
        let direction = match args.sort_direction.as_deref() {
            None => SortDirection::default(),
            Some(raw) => raw
                .parse::<SortDirection>()
                .map_err(|_| anyhow::anyhow!("sort_direction must be one of: asc, desc"))?,
        };

        let models = self.context.client.get_models().await?;
        let mut models = filter_models(models, args.language.as_deref());
        sort_models(&mut models, sort_by, direction);

        Ok(serde_json::to_string_pretty(&models)?)
    }
}
