// STT Types and Error Definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The closed set of transcription engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineId {
    #[serde(alias = "openai", alias = "remote")]
    RemoteApi,
    #[serde(alias = "local", alias = "whisper")]
    LocalModel,
    #[serde(alias = "vosk", alias = "streaming")]
    StreamingDecoder,
}

impl EngineId {
    pub const ALL: [EngineId; 3] = [
        EngineId::RemoteApi,
        EngineId::LocalModel,
        EngineId::StreamingDecoder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineId::RemoteApi => "remote-api",
            EngineId::LocalModel => "local-model",
            EngineId::StreamingDecoder => "streaming-decoder",
        }
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineId {
    type Err = String;

    /// Accepts the canonical names plus the deployment aliases
    /// (`openai`, `local`, `vosk`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote-api" | "remote" | "openai" => Ok(EngineId::RemoteApi),
            "local-model" | "local" | "whisper" => Ok(EngineId::LocalModel),
            "streaming-decoder" | "streaming" | "vosk" => Ok(EngineId::StreamingDecoder),
            other => Err(format!("unknown engine '{}'", other)),
        }
    }
}

/// Text recognized by one engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    /// Trimmed, lower-cased; may be empty.
    pub text: String,
    pub engine: EngineId,
}

/// Engine failures, classified so the orchestrator can decide on fallback.
#[derive(Debug, Error)]
pub enum STTError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Connectivity error: {0}")]
    ConnectivityError(String),

    #[error("Request timed out after {0}s")]
    TimeoutError(u64),

    #[error("Model load failed: {0}")]
    ModelLoadError(String),

    #[error("Inference failed: {0}")]
    InferenceError(String),

    #[error("Decode session failed: {0}")]
    DecodeSessionError(String),

    #[error("Remote service error: {0}")]
    RemoteError(String),

    #[error("Engine unavailable: {0}")]
    Unavailable(String),
}

impl STTError {
    /// True for the "engine unavailable" family: the engine could not be
    /// reached or brought up, so another engine may still succeed.
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            STTError::ConnectivityError(_)
                | STTError::TimeoutError(_)
                | STTError::ModelLoadError(_)
                | STTError::Unavailable(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            STTError::AuthError(_) => "auth",
            STTError::ConnectivityError(_) => "connectivity",
            STTError::TimeoutError(_) => "timeout",
            STTError::ModelLoadError(_) => "model-load",
            STTError::InferenceError(_) => "inference",
            STTError::DecodeSessionError(_) => "decode-session",
            STTError::RemoteError(_) => "remote",
            STTError::Unavailable(_) => "unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_parse() {
        assert_eq!("openai".parse::<EngineId>().unwrap(), EngineId::RemoteApi);
        assert_eq!(" Vosk ".parse::<EngineId>().unwrap(), EngineId::StreamingDecoder);
        assert_eq!("local-model".parse::<EngineId>().unwrap(), EngineId::LocalModel);
        assert!("google".parse::<EngineId>().is_err());
    }

    #[test]
    fn serializes_kebab_case() {
        let json = serde_json::to_string(&EngineId::StreamingDecoder).unwrap();
        assert_eq!(json, "\"streaming-decoder\"");
    }

    #[test]
    fn only_unavailability_triggers_fallback() {
        assert!(STTError::ConnectivityError("reset".into()).triggers_fallback());
        assert!(STTError::TimeoutError(30).triggers_fallback());
        assert!(STTError::ModelLoadError("missing".into()).triggers_fallback());
        assert!(STTError::Unavailable("not built".into()).triggers_fallback());
        assert!(!STTError::AuthError("no key".into()).triggers_fallback());
        assert!(!STTError::InferenceError("nan".into()).triggers_fallback());
        assert!(!STTError::DecodeSessionError("bad".into()).triggers_fallback());
        assert!(!STTError::RemoteError("500".into()).triggers_fallback());
    }
}
