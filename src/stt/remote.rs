// Remote transcription API adapter (OpenAI-compatible /audio/transcriptions)

use super::{finish_text, EngineId, STTError, TranscriptionEngine};
use crate::audio::{encode_pcm16_wav, CanonicalAudioFrame, CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE};
use async_trait::async_trait;
use regex::Regex;
use reqwest::multipart;
use reqwest::StatusCode;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
pub const DEFAULT_MODEL: &str = "whisper-1";
pub const TIMEOUT_SECS: u64 = 30;
const RESPONSE_FORMAT: &str = "text";

pub struct RemoteApiEngine {
    api_key: Option<String>,
    url: String,
    model: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl RemoteApiEngine {
    pub fn new(
        api_key: Option<String>,
        url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, STTError> {
        Self::with_timeout(api_key, url, model, TIMEOUT_SECS)
    }

    pub fn with_timeout(
        api_key: Option<String>,
        url: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, STTError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| STTError::Unavailable(format!("failed to create HTTP client: {}", e)))?;

        let api_key = api_key.filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!("Remote API engine initialized without a credential");
        } else {
            tracing::info!("Remote API engine initialized");
        }

        Ok(Self {
            api_key,
            url: url.into(),
            model: model.into(),
            timeout_secs,
            client,
        })
    }

    pub fn key_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Maps a non-success HTTP status to the error taxonomy.
    fn classify_status(status: StatusCode, body: &str) -> STTError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                STTError::AuthError(format!("HTTP {}", status))
            }
            _ => STTError::RemoteError(format!("HTTP {}: {}", status, body.trim())),
        }
    }

    fn classify_send_error(&self, e: &reqwest::Error) -> STTError {
        if e.is_timeout() {
            STTError::TimeoutError(self.timeout_secs)
        } else if e.is_connect() || e.is_request() {
            STTError::ConnectivityError(e.to_string())
        } else {
            STTError::RemoteError(e.to_string())
        }
    }

    fn clean_transcript(text: &str) -> String {
        static TS_RE: OnceLock<Regex> = OnceLock::new();
        let re = TS_RE.get_or_init(|| {
            Regex::new(r"\[\d{2}:\d{2}.*?\]|\(\d{2}:\d{2}\)").expect("valid timestamp regex")
        });
        let stripped = re.replace_all(text, "");
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[async_trait]
impl TranscriptionEngine for RemoteApiEngine {
    async fn transcribe(
        &self,
        frame: &CanonicalAudioFrame,
        language: &str,
    ) -> Result<String, STTError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| STTError::AuthError("remote API key is not configured".to_string()))?;

        tracing::info!(
            "Remote STT: transcribing {:.1}s audio...",
            frame.duration_secs()
        );

        let wav_bytes = encode_pcm16_wav(frame.samples(), CANONICAL_SAMPLE_RATE, CANONICAL_CHANNELS);

        let file_part = multipart::Part::bytes(wav_bytes)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| STTError::RemoteError(e.to_string()))?;

        let form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", RESPONSE_FORMAT)
            .text("language", language.to_string())
            .part("file", file_part);

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.classify_send_error(&e))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &error_text));
        }

        let raw_text = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                STTError::TimeoutError(self.timeout_secs)
            } else {
                STTError::ConnectivityError(e.to_string())
            }
        })?;

        Ok(finish_text(&Self::clean_transcript(&raw_text)))
    }

    fn id(&self) -> EngineId {
        EngineId::RemoteApi
    }

    fn name(&self) -> &str {
        "Remote API"
    }
}
