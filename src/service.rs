// Recognition entry point consumed by the HTTP layer and the CLI

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use crate::audio::{AudioError, AudioNormalizer, FfmpegTranscoder};
use crate::config::{ConfigError, Settings};
use crate::matcher::{MatchOutcome, TextMatcher};
use crate::orchestrator::{engines_from_settings, CompositeFailure, FallbackEdge, FallbackOrchestrator};
use crate::stt::{EngineId, STTError};

/// One recognition call: raw upload bytes, declared mimetype, language hint.
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio: Vec<u8>,
    pub mimetype: String,
    pub language: String,
}

impl TranscriptionRequest {
    pub fn new(audio: Vec<u8>, mimetype: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            audio,
            mimetype: mimetype.into(),
            language: language.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResponse {
    pub text: String,
    pub engine_used: EngineId,
    pub success: bool,
}

/// Recognition plus the pronunciation verdict for the expected word.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    #[serde(flatten)]
    pub recognition: RecognitionResponse,
    #[serde(rename = "match")]
    pub outcome: MatchOutcome,
}

#[derive(Debug, Error)]
pub enum RecognitionError {
    /// Unreadable audio. No engine was tried.
    #[error("audio could not be decoded: {0}")]
    Decode(#[from] AudioError),

    #[error(transparent)]
    Engines(#[from] CompositeFailure),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureDetail {
    pub engine: EngineId,
    pub kind: &'static str,
    pub error: String,
}

/// Structured failure body returned to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailurePayload {
    pub success: bool,
    pub error: String,
    pub details: Vec<FailureDetail>,
}

impl RecognitionError {
    pub fn failure_payload(&self) -> FailurePayload {
        let details = match self {
            RecognitionError::Decode(_) => Vec::new(),
            RecognitionError::Engines(failure) => failure
                .attempts()
                .iter()
                .map(|(engine, err)| FailureDetail {
                    engine: *engine,
                    kind: err.kind(),
                    error: err.to_string(),
                })
                .collect(),
        };
        FailurePayload {
            success: false,
            error: self.to_string(),
            details,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build engines: {0}")]
    Engine(#[from] STTError),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub engine: EngineId,
    /// Compiled into this binary.
    pub registered: bool,
    /// Registered and its credential or model asset is present.
    pub available: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub recognition_system: EngineId,
    pub engines: Vec<EngineStatus>,
    pub remote_key_configured: bool,
    pub streaming_model_path: String,
    pub local_model_path: String,
    pub auto_fallback_enabled: bool,
    pub fallback_to_remote_enabled: bool,
    pub fallback_edges: Vec<FallbackEdge>,
    pub fallback_plan: Vec<EngineId>,
    pub match_mode: String,
}

pub struct SpeechService {
    settings: Settings,
    normalizer: AudioNormalizer,
    orchestrator: FallbackOrchestrator,
    matcher: TextMatcher,
}

impl SpeechService {
    /// Wires the production normalizer (ffmpeg) and every compiled engine.
    pub fn new(settings: Settings) -> Result<Self, ServiceError> {
        let policy = settings.fallback_policy()?;
        let engines = engines_from_settings(&settings)?;
        let orchestrator = FallbackOrchestrator::new(settings.recognition_system, policy, engines);
        let normalizer = AudioNormalizer::new(
            settings.scratch_dir.clone(),
            Arc::new(FfmpegTranscoder::new(settings.ffmpeg_bin.clone())),
        );
        Ok(Self::from_parts(settings, normalizer, orchestrator))
    }

    pub fn from_parts(
        settings: Settings,
        normalizer: AudioNormalizer,
        orchestrator: FallbackOrchestrator,
    ) -> Self {
        let matcher = TextMatcher::new(settings.match_mode);
        Self {
            settings,
            normalizer,
            orchestrator,
            matcher,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn orchestrator(&self) -> &FallbackOrchestrator {
        &self.orchestrator
    }

    pub async fn recognize(
        &self,
        request: TranscriptionRequest,
    ) -> Result<RecognitionResponse, RecognitionError> {
        let started = Instant::now();
        tracing::info!(
            bytes = request.audio.len(),
            mimetype = %request.mimetype,
            language = %request.language,
            "Recognition request"
        );

        let frame = match self
            .normalizer
            .normalize(&request.audio, &request.mimetype)
            .await
        {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Audio normalization failed: {}", e);
                return Err(e.into());
            }
        };

        let transcript = self
            .orchestrator
            .transcribe(&frame, &request.language)
            .await?;

        tracing::info!(
            engine = %transcript.engine,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Recognized: '{}'",
            transcript.text
        );

        Ok(RecognitionResponse {
            text: transcript.text,
            engine_used: transcript.engine,
            success: true,
        })
    }

    pub fn check(&self, recognized: &str, expected: &str) -> MatchOutcome {
        self.matcher.check(recognized, expected)
    }

    pub async fn recognize_and_check(
        &self,
        request: TranscriptionRequest,
        expected: &str,
    ) -> Result<AttemptResult, RecognitionError> {
        let recognition = self.recognize(request).await?;
        let outcome = self.check(&recognition.text, expected);
        Ok(AttemptResult {
            recognition,
            outcome,
        })
    }

    pub fn status(&self) -> StatusReport {
        let settings = &self.settings;
        let engines = EngineId::ALL
            .iter()
            .map(|&engine| {
                let registered = self.orchestrator.is_registered(engine);
                let asset_present = match engine {
                    EngineId::RemoteApi => settings.remote_key_configured(),
                    EngineId::LocalModel => settings.whisper_model_path.exists(),
                    EngineId::StreamingDecoder => settings.vosk_model_path.exists(),
                };
                EngineStatus {
                    engine,
                    registered,
                    available: registered && asset_present,
                }
            })
            .collect();

        StatusReport {
            recognition_system: self.orchestrator.primary(),
            engines,
            remote_key_configured: settings.remote_key_configured(),
            streaming_model_path: settings.vosk_model_path.display().to_string(),
            local_model_path: settings.whisper_model_path.display().to_string(),
            auto_fallback_enabled: self.orchestrator.policy().auto_fallback(),
            fallback_to_remote_enabled: self
                .orchestrator
                .policy()
                .allows(EngineId::LocalModel, EngineId::RemoteApi),
            fallback_edges: self.orchestrator.policy().edges(),
            fallback_plan: self.orchestrator.plan(),
            match_mode: self.matcher.mode().to_string(),
        }
    }
}
