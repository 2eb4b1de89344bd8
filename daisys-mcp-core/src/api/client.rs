//! HTTP client for the Daisys speak API.

use reqwest::{Client, RequestBuilder, Response};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::api::types::{
    AudioFormat, LoginRequest, LoginResponse, Take, TakeGenerateRequest, TtsModel, Voice,
    VoiceGenerateRequest, WebsocketUrlResponse,
};
use crate::config::DaisysConfig;
use crate::error::SpeakError;

pub struct DaisysClient {
    config: DaisysConfig,
    client: Client,
    access_token: OnceCell<String>,
}

impl DaisysClient {
    pub fn new(config: DaisysConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            access_token: OnceCell::new(),
        }
    }

    fn speak_url(&self, path: &str) -> String {
        format!("{}/v1/speak{}", self.config.api_url, path)
    }

    /// Logs in on first use and caches the access token for the lifetime of
    /// the client. The Daisys API accepts the same token for HTTP and
    /// websocket URL requests.
    async fn token(&self) -> Result<&str, SpeakError> {
        let token = self
            .access_token
            .get_or_try_init(|| async {
                info!(email = %self.config.email, "Authenticating with Daisys API");
                let response = self
                    .client
                    .post(format!("{}/auth/login", self.config.api_url))
                    .json(&LoginRequest {
                        email: self.config.email.clone(),
                        password: self.config.password.clone(),
                    })
                    .send()
                    .await?;
                let response = check(response).await?;
                let login: LoginResponse = response.json().await?;
                Ok::<String, SpeakError>(login.access_token)
            })
            .await?;
        Ok(token)
    }

    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, SpeakError> {
        let token = self.token().await?;
        Ok(builder.bearer_auth(token))
    }

    pub async fn get_voices(&self) -> Result<Vec<Voice>, SpeakError> {
        let request = self.client.get(self.speak_url("/voices"));
        let response = check(self.authorized(request).await?.send().await?).await?;
        let voices: Vec<Voice> = response.json().await?;
        debug!(count = voices.len(), "Fetched voices");
        Ok(voices)
    }

    pub async fn get_models(&self) -> Result<Vec<TtsModel>, SpeakError> {
        let request = self.client.get(self.speak_url("/models"));
        let response = check(self.authorized(request).await?.send().await?).await?;
        let models: Vec<TtsModel> = response.json().await?;
        debug!(count = models.len(), "Fetched models");
        Ok(models)
    }

    pub async fn generate_voice(
        &self,
        request_body: &VoiceGenerateRequest,
    ) -> Result<Voice, SpeakError> {
        info!(name = %request_body.name, model = %request_body.model, "Generating voice");
        let request = self
            .client
            .post(self.speak_url("/voices/generate"))
            .json(request_body);
        let response = check(self.authorized(request).await?.send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_voice(&self, voice_id: &str) -> Result<(), SpeakError> {
        info!(voice_id = %voice_id, "Deleting voice");
        let request = self
            .client
            .delete(self.speak_url(&format!("/voices/{voice_id}")));
        check(self.authorized(request).await?.send().await?).await?;
        Ok(())
    }

    pub async fn generate_take(
        &self,
        request_body: &TakeGenerateRequest,
    ) -> Result<Take, SpeakError> {
        debug!(voice_id = %request_body.voice_id, "Submitting take");
        let request = self
            .client
            .post(self.speak_url("/takes/generate"))
            .json(request_body);
        let response = check(self.authorized(request).await?.send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn get_take(&self, take_id: &str) -> Result<Take, SpeakError> {
        let request = self.client.get(self.speak_url(&format!("/takes/{take_id}")));
        let response = check(self.authorized(request).await?.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Downloads the finished audio for a take in the requested encoding.
    pub async fn get_take_audio(
        &self,
        take_id: &str,
        format: AudioFormat,
    ) -> Result<Vec<u8>, SpeakError> {
        let request = self.client.get(self.speak_url(&format!(
            "/takes/{take_id}/{}",
            format.extension()
        )));
        let response = check(self.authorized(request).await?.send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn delete_take(&self, take_id: &str) -> Result<(), SpeakError> {
        debug!(take_id = %take_id, "Deleting take");
        let request = self
            .client
            .delete(self.speak_url(&format!("/takes/{take_id}")));
        check(self.authorized(request).await?.send().await?).await?;
        Ok(())
    }

    /// Fetches a signed, short-lived websocket URL for streaming synthesis.
    /// The returned channel is scoped to the worker serving the given voice.
    pub async fn websocket_url(&self, voice_id: &str) -> Result<String, SpeakError> {
        let request = self
            .client
            .get(self.speak_url("/websocket/url"))
            .query(&[("voice_id", voice_id)]);
        let response = check(self.authorized(request).await?.send().await?).await?;
        let body: WebsocketUrlResponse = response.json().await?;
        Ok(body.websocket_url)
    }
}

async fn check(response: Response) -> Result<Response, SpeakError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(SpeakError::Api {
        status: status.as_u16(),
        message,
    })
}
