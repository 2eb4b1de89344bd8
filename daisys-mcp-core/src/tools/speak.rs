use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::types::AudioFormat;
use crate::output::make_output_path;
use crate::speech::stream::SessionOptions;
use crate::speech::{http, normalize_voice_id, stream, SpeechResult};
use crate::tools::r#trait::{ToolContext, ToolExecutor};

pub struct TextToSpeech {
    context: Arc<ToolContext>,
}

impl TextToSpeech {
    pub fn new(context: Arc<ToolContext>) -> Self {
        Self { context }
    }
}

#[derive(Deserialize)]
struct TextToSpeechArgs {
    text: String,
    #[serde(default)]
    voice_id: Option<String>,
    #[serde(default)]
    audio_format: Option<String>,
    #[serde(default)]
    output_dir: Option<String>,
    #[serde(default)]
    streaming: Option<bool>,
}

#[async_trait::async_trait]
impl ToolExecutor for TextToSpeech {
    fn name(&self) -> &'static str {
        "text_to_speech"
    }

    fn description(&self) -> &'static str {
        "Converts text to speech using a selected voice. Streams audio over the websocket \
         API for low latency and falls back to plain HTTP when streaming fails. Optionally \
         specify a voice ID to control the voice used for generation."
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "The text to convert to speech"
                },
                "voice_id": {
                    "type": "string",
                    "description": "Voice to use; defaults to the most recently created voice"
                },
                "audio_format": {
                    "type": "string",
                    "enum": ["wav", "mp3"],
                    "description": "Output encoding; mp3 always uses the non-streaming path"
                },
                "output_dir": {
                    "type": "string",
                    "description": "Directory for the audio file; defaults to the Desktop"
                },
                "streaming": {
                    "type": "boolean",
                    "description": "Stream audio while it generates (default true)"
                }
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<String> {
        let args: TextToSpeechArgs =
            serde_json::from_value(arguments).context("invalid arguments for text_to_speech")?;

        // Reject empty or sentinel text before touching the filesystem or
        // the network.
        crate::speech::normalize_text(&args.text)?;
        let voice_id = normalize_voice_id(args.voice_id.as_deref());
        let format = match args.audio_format.as_deref() {
            None => AudioFormat::Wav,
            Some(raw) => raw
                .parse::<AudioFormat>()
                .map_err(|_| anyhow::anyhow!("audio_format must be one of: wav, mp3"))?,
        };

        let config = &self.context.config;
        let output_dir =
            make_output_path(args.output_dir.as_deref(), config.storage_path.as_deref())?;

        // The websocket only carries raw PCM, so mp3 output goes through the
        // HTTP path regardless of the streaming flag.
        let streaming = args.streaming.unwrap_or(true) && format == AudioFormat::Wav;
        let options = SessionOptions::default();
        let client = &self.context.client;

        let result: SpeechResult = if streaming {
            match stream::synthesize_streaming(
                client,
                config,
                &args.text,
                voice_id.as_deref(),
                &output_dir,
                &options,
            )
            .await
            {
                Ok(result) => result,
                Err(e) if e.triggers_fallback() => {
                    warn!(error = %e, "Streaming synthesis failed; falling back to HTTP");
                    http::synthesize_http(
                        client,
                        config,
                        &args.text,
                        voice_id.as_deref(),
                        format,
                        &output_dir,
                        &options,
                    )
                    .await?
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            debug!("Using the non-streaming synthesis path");
            http::synthesize_http(
                client,
                config,
                &args.text,
                voice_id.as_deref(),
                format,
                &output_dir,
                &options,
            )
            .await?
        };

        Ok(format!(
            "Success. Audio written to {} using voice {}.",
            result.output_path.display(),
            result.voice_id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DaisysConfig;

    fn tool() -> TextToSpeech {
        let config = DaisysConfig::new("a@b.c".into(), "pw".into());
        TextToSpeech::new(Arc::new(ToolContext::new(config)))
    }

    #[tokio::test]
    async fn missing_text_is_an_argument_error() {
        let err = tool()
            .execute(serde_json::json!({"voice_id": "v1"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid arguments"));
    }

    #[tokio::test]
    async fn bad_audio_format_is_rejected_before_any_request() {
        let err = tool()
            .execute(serde_json::json!({"text": "hi", "audio_format": "ogg"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("audio_format"));
    }

    #[tokio::test]
    async fn sentinel_text_is_rejected_before_any_request() {
        let err = tool()
            .execute(serde_json::json!({"text": "null"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("No text provided"));
    }
}
