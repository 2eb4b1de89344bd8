//! Wire types for the Daisys speak API (v1).

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Gender {
    Male,
    Female,
    Nonbinary,
}

/// Lifecycle states of a take. `Ready` is the only terminal success state;
/// `Error` and `Timeout` are terminal failures. Anything the server adds
/// later lands in `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TakeStatus {
    Waiting,
    Started,
    Ready,
    Error,
    Timeout,
    #[serde(other)]
    Unknown,
}

impl TakeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TakeStatus::Ready | TakeStatus::Error | TakeStatus::Timeout
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }
}

/// Prosody controls, each in -10..=10. Expression defaults to 5 to match
/// the values used for generation elsewhere in the product.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimpleProsody {
    pub pace: i32,
    pub pitch: i32,
    pub expression: i32,
}

impl Default for SimpleProsody {
    fn default() -> Self {
        Self {
            pace: 0,
            pitch: 0,
            expression: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    pub voice_id: String,
    pub name: String,
    pub gender: Gender,
    pub model: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Take generated as the audition sample for this voice.
    #[serde(default)]
    pub example_take_id: Option<String>,
    #[serde(default)]
    pub done_webhook: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsModel {
    pub name: String,
    pub displayname: String,
    #[serde(default)]
    pub flags: Option<Vec<String>>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub genders: Vec<Gender>,
    /// Style categories, each a list of interchangeable style names.
    #[serde(default)]
    pub styles: Vec<Vec<String>>,
    #[serde(default)]
    pub prosody_types: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Take {
    pub take_id: String,
    pub status: TakeStatus,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub prosody: Option<SimpleProsody>,
}

#[derive(Debug, Serialize)]
pub struct TakeGenerateRequest {
    pub voice_id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prosody: Option<SimpleProsody>,
}

#[derive(Debug, Serialize)]
pub struct VoiceGenerateRequest {
    pub name: String,
    pub gender: Gender,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Prosody applied to the voice's audition take.
    pub prosody: SimpleProsody,
    /// Hold the response until generation finishes instead of returning a
    /// pending voice record.
    pub wait: bool,
}

#[derive(Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
pub struct WebsocketUrlResponse {
    pub websocket_url: String,
}
