use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::api::types::{Gender, SimpleProsody, VoiceGenerateRequest};
use crate::directory::{filter_voices, sort_voices, SortDirection, VoiceSortField};
use crate::tools::r#trait::{ToolContext, ToolExecutor};

fn parse_gender(raw: &str) -> Result<Gender> {
    raw.parse::<Gender>()
        .map_err(|_| anyhow::anyhow!("gender must be one of: male, female, nonbinary"))
}

pub struct GetVoices {
    context: Arc<ToolContext>,
}

impl GetVoices {
    pub fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }
}

#[derive(Deserialize)]
struct GetVoicesArgs {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    sort_by: Option<String>,
    #[serde(default)]
    sort_direction: Option<String>,
}

#[async_trait::async_trait]
impl ToolExecutor for GetVoices {
    fn name(&self) -> &'static str {
        "get_voices"
    }

    fn description(&self) -> &'static str {
        "Get available voices, optionally filtered by model and gender, and sorted by name \
         or voice_id in ascending or descending order."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "model": {
                    "type": "string",
                    "description": "Only voices built on this model"
                },
                "gender": {
                    "type": "string",
                    "enum": ["male", "female", "nonbinary"],
                    "description": "Only voices with this gender"
                },
                "sort_by": {
                    "type": "string",
                    "enum": ["name", "voice_id"],
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
        let args: GetVoicesArgs =
            serde_json::from_value(arguments).context("invalid arguments for get_voices")?;

        let gender = args.gender.as_deref().map(parse_gender).transpose()?;
        let sort_by = match args.sort_by.as_deref() {
            None => VoiceSortField::default(),
            Some(raw) => raw
                .parse::<VoiceSortField>()
                .map_err(|_| anyhow::anyhow!("sort_by must be one of: name, voice_id"))?,
        };
        let direction = parse_direction(args.sort_direction.as_deref())?;

        let voices = self.context.client.get_voices().await?;
        let mut voices = filter_voices(voices, args.model.as_deref(), gender);
        sort_voices(&mut voices, sort_by, direction);

        Ok(serde_json::to_string_pretty(&voices)?)
    }
}

fn parse_direction(raw: Option<&str>) -> Result<SortDirection> {
    match raw {
        None => Ok(SortDirection::default()),
        Some(raw) => raw
            .parse::<SortDirection>()
            .map_err(|_| anyhow::anyhow!("sort_direction must be one of: asc, desc")),
    }
}

pub struct CreateVoice {
    context: Arc<ToolContext>,
}

impl CreateVoice {
    pub fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }
}

#[derive(Deserialize)]
struct CreateVoiceArgs {
    name: String,
    gender: String,
    model: String,
    #[serde(default)]
    description: Option<String>,
}

/// Validates the arguments and shapes the provider request. `wait` holds
/// the response until generation finishes, so the returned record is for a
/// ready voice.
fn build_request(args: CreateVoiceArgs) -> Result<VoiceGenerateRequest> {
    let gender = parse_gender(&args.gender)?;
    Ok(VoiceGenerateRequest {
        name: args.name,
        gender,
        model: args.model,
        description: args.description,
        prosody: SimpleProsody::default(),
        wait: true,
    })
}

#[async_trait::async_trait]
impl ToolExecutor for CreateVoice {
    fn name(&self) -> &'static str {
        "create_voice"
    }

    fn description(&self) -> &'static str {
        "Create a new voice on a given model and return the created voice record as \
         JSON. The new voice becomes the default for text_to_speech until another \
         voice is created."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Display name for the new voice"
                },
                "gender": {
                    "type": "string",
                    "enum": ["male", "female", "nonbinary"],
                    "description": "Gender of the new voice"
                },
                "model": {
                    "type": "string",
                    "description": "Model to build the voice on, e.g. english-v3.0"
                },
                "description": {
                    "type": "string",
                    "description": "Optional free-text description"
                }
            },
            "required": ["name", "gender", "model"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<String> {
        let args: CreateVoiceArgs =
            serde_json::from_value(arguments).context("invalid arguments for create_voice")?;

        // Validate locally before delegating to the provider.
        let request = build_request(args)?;
        let voice = self.context.client.generate_voice(&request).await?;
        info!(voice_id = %voice.voice_id, "Created voice");

        // Callers read the voice_id back out of this record, so the result
        // text is the bare JSON with no prefix.
        Ok(serde_json::to_string_pretty(&voice)?)
    }
}

pub struct RemoveVoice {
    context: Arc<ToolContext>,
}

impl RemoveVoice {
    pub fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }
}

#[derive(Deserialize)]
struct RemoveVoiceArgs {
    voice_id: String,
}

#[async_trait::async_trait]
impl ToolExecutor for RemoveVoice {
    fn name(&self) -> &'static str {
        "remove_voice"
    }

    fn description(&self) -> &'static str {
        "Delete a voice by its voice_id. Takes generated with the voice remain available."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "voice_id": {
                    "type": "string",
                    "description": "The voice to delete"
                }
            },
            "required": ["voice_id"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<String> {
        let args: RemoveVoiceArgs =
            serde_json::from_value(arguments).context("invalid arguments for remove_voice")?;
        self.context.client.delete_voice(&args.voice_id).await?;
        Ok(format!("Success. Removed voice {}.", args.voice_id))
    }
}
