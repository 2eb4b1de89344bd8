use thiserror::Error;

/// Errors surfaced by the speech layer. The tool layer branches on
/// [`SpeakError::triggers_fallback`] to decide whether a failed streaming
/// attempt should be retried through the synchronous HTTP path.
#[derive(Error, Debug)]
pub enum SpeakError {
    #[error("Missing Daisys credentials: set DAISYS_EMAIL and DAISYS_PASSWORD")]
    MissingCredentials,

    #[error("No text provided for speech generation")]
    EmptyText,

    #[error("No voices available. Create a voice first with the create_voice tool")]
    NoVoices,

    #[error("Speech generation failed: {0}")]
    Generation(String),

    #[error("Websocket transport error: {0}")]
    Transport(String),

    #[error("Streaming session ended incomplete (status_ready: {status_ready}, chunks_done: {chunks_done})")]
    Incomplete {
        status_ready: bool,
        chunks_done: bool,
    },

    #[error("Daisys API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Directory {path} is not writeable: {reason}")]
    NotWriteable { path: String, reason: String },

    #[error("Audio playback unavailable: {0}")]
    PlaybackUnavailable(String),
}

impl SpeakError {
    /// Whether a failed streaming attempt should fall back to the
    /// synchronous path. Validation failures would fail the same way a
    /// second time, so they surface directly.
    pub fn triggers_fallback(&self) -> bool {
        match self {
            SpeakError::Generation(_)
            | SpeakError::Transport(_)
            | SpeakError::Incomplete { .. }
            | SpeakError::Api { .. }
            | SpeakError::Http(_) => true,
            SpeakError::MissingCredentials
            | SpeakError::EmptyText
            | SpeakError::NoVoices
            | SpeakError::NotWriteable { .. }
            | SpeakError::PlaybackUnavailable(_) => false,
        }
    }
}
