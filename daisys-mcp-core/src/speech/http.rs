//! Synchronous synthesis over plain HTTP. Submits a take, polls its status
//! until terminal, downloads the finished audio, and optionally plays it.
//! This is the fallback when the streaming path fails.

use std::path::Path;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::api::types::{AudioFormat, SimpleProsody, TakeGenerateRequest, TakeStatus};
use crate::api::DaisysClient;
use crate::audio::{self, PlaybackMode};
use crate::config::DaisysConfig;
use crate::error::SpeakError;
use crate::output::output_file_path;
use crate::speech::stream::SessionOptions;
use crate::speech::{normalize_text, resolve_voice_id, SpeechResult};

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub async fn synthesize_http(
    client: &DaisysClient,
    config: &DaisysConfig,
    text: &str,
    voice_id: Option<&str>,
    format: AudioFormat,
    output_dir: &Path,
    options: &SessionOptions,
) -> Result<SpeechResult, SpeakError> {
    let text = normalize_text(text)?;
    let voice_id = resolve_voice_id(client, voice_id).await?;

    let request = TakeGenerateRequest {
        voice_id: voice_id.clone(),
        text: text.clone(),
        prosody: Some(SimpleProsody::default()),
    };
    let mut take = client.generate_take(&request).await?;
    let take_id = take.take_id.clone();

    let deadline = Instant::now() + options.budget;
    while !take.status.is_terminal() {
        if Instant::now() >= deadline {
            return Err(SpeakError::Generation(format!(
                "take {take_id} still {} after {}s",
                take.status,
                options.budget.as_secs()
            )));
        }
        sleep(STATUS_POLL_INTERVAL).await;
        take = client.get_take(&take_id).await?;
        debug!(take_id = %take_id, status = %take.status, "Polled take");
    }

    if take.status != TakeStatus::Ready {
        return Err(SpeakError::Generation(format!(
            "take {take_id} ended with status {}",
            take.status
        )));
    }

    let bytes = client.get_take_audio(&take_id, format).await?;
    let output_path = output_file_path(output_dir, &text, format);
    std::fs::write(&output_path, &bytes).map_err(|e| SpeakError::NotWriteable {
        path: output_path.display().to_string(),
        reason: e.to_string(),
    })?;

    info!(
        take_id = %take_id,
        voice_id = %voice_id,
        bytes = bytes.len(),
        output = %output_path.display(),
        "Synthesis complete"
    );

    let mode = PlaybackMode::from_config(config);
    if mode != PlaybackMode::Disabled {
        if let Err(e) = audio::play_encoded(bytes, mode).await {
            warn!(error = %e, "Playback skipped");
        }
    }

    Ok(SpeechResult {
        take_id,
        voice_id,
        status: TakeStatus::Ready,
        output_path,
    })
}
