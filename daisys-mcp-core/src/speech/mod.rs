//! Speech synthesis over the Daisys API. The streaming path talks to the
//! websocket and plays audio as it arrives; the HTTP path submits a take and
//! polls until the finished audio can be downloaded.

pub mod http;
pub mod stream;
pub mod wire;

use std::path::PathBuf;

use crate::api::types::TakeStatus;
use crate::api::DaisysClient;
use crate::error::SpeakError;

/// Outcome of a successful synthesis through either path.
#[derive(Debug, Clone)]
pub struct SpeechResult {
    pub take_id: String,
    pub voice_id: String,
    pub status: TakeStatus,
    pub output_path: PathBuf,
}

/// Rejects empty text and the null-like sentinels tool callers sometimes
/// send as literal strings.
pub fn normalize_text(text: &str) -> Result<String, SpeakError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || is_null_sentinel(trimmed) {
        return Err(SpeakError::EmptyText);
    }
    Ok(trimmed.to_string())
}

/// Maps sentinel voice ids ("null", "none", empty) to no selection.
pub fn normalize_voice_id(voice_id: Option<&str>) -> Option<String> {
    let id = voice_id?.trim();
    if id.is_empty() || is_null_sentinel(id) {
        return None;
    }
    Some(id.to_string())
}

fn is_null_sentinel(value: &str) -> bool {
    value.eq_ignore_ascii_case("null") || value.eq_ignore_ascii_case("none")
}

/// Picks the voice for a request: the caller's choice when given, otherwise
/// the most recently created voice (the provider lists voices in creation
/// order). Fails before any synthesis request when no voices exist.
pub(crate) async fn resolve_voice_id(
    client: &DaisysClient,
    voice_id: Option<&str>,
) -> Result<String, SpeakError> {
    if let Some(id) = voice_id {
        return Ok(id.to_string());
    }
    let voices = client.get_voices().await?;
    match voices.last() {
        Some(voice) => Ok(voice.voice_id.clone()),
        None => Err(SpeakError::NoVoices),
    }
}
