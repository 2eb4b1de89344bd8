use std::env;
use std::path::PathBuf;

use crate::error::SpeakError;

pub const DEFAULT_API_URL: &str = "https://api.daisys.ai";

/// Process configuration, read from the environment once at startup and
/// passed by parameter to every component that needs it.
#[derive(Debug, Clone)]
pub struct DaisysConfig {
    pub email: String,
    pub password: String,
    pub api_url: String,
    pub disable_audio_playback: bool,
    pub storage_path: Option<PathBuf>,
}

impl DaisysConfig {
    pub fn new(email: String, password: String) -> Self {
        Self {
            email,
            password,
            api_url: DEFAULT_API_URL.to_string(),
            disable_audio_playback: false,
            storage_path: None,
        }
    }

    /// Reads `DAISYS_EMAIL`, `DAISYS_PASSWORD`, `DAISYS_API_URL`,
    /// `DISABLE_AUDIO_PLAYBACK` and `STORAGE_PATH`. Missing credentials are
    /// fatal; everything else has a default.
    pub fn from_env() -> Result<Self, SpeakError> {
        let email = env::var("DAISYS_EMAIL").ok().filter(|v| !v.is_empty());
        let password = env::var("DAISYS_PASSWORD").ok().filter(|v| !v.is_empty());
        let (email, password) = match (email, password) {
            (Some(email), Some(password)) => (email, password),
            _ => return Err(SpeakError::MissingCredentials),
        };

        let api_url = env::var("DAISYS_API_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let disable_audio_playback = env::var("DISABLE_AUDIO_PLAYBACK")
            .map(|v| truthy(&v))
            .unwrap_or(false);

        let storage_path = env::var("STORAGE_PATH")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            email,
            password,
            api_url,
            disable_audio_playback,
            storage_path,
        })
    }
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_accepts_common_forms() {
        assert!(truthy("1"));
        assert!(truthy("true"));
        assert!(truthy("TRUE"));
        assert!(truthy(" yes "));
        assert!(truthy("on"));
    }

    #[test]
    fn truthy_rejects_everything_else() {
        assert!(!truthy("0"));
        assert!(!truthy("false"));
        assert!(!truthy(""));
        assert!(!truthy("disabled"));
    }

    #[test]
    fn new_uses_default_api_url() {
        let config = DaisysConfig::new("user@example.com".into(), "secret".into());
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(!config.disable_audio_playback);
        assert!(config.storage_path.is_none());
    }
}
