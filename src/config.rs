use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::logging::{DEFAULT_DIRECTIVE, LOG_ENV};
use crate::matcher::MatchMode;
use crate::orchestrator::FallbackPolicy;
use crate::stt::remote::{DEFAULT_API_URL, DEFAULT_MODEL};
use crate::stt::streaming::DEFAULT_CHUNK_BYTES;
use crate::stt::EngineId;

pub const DEFAULT_LANGUAGE: &str = "ru";
pub const DEFAULT_VOSK_MODEL_PATH: &str = "./models/vosk-model-ru-0.22";
pub const DEFAULT_WHISPER_MODEL_PATH: &str = "./models/ggml-small.bin";
pub const DEFAULT_SCRATCH_DIR: &str = "./temp";
pub const DEFAULT_FFMPEG_BIN: &str = "ffmpeg";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub recognition_system: EngineId,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub openai_url: String,
    pub openai_model: String,
    /// Global default for auto-enabled fallback edges.
    pub auto_fallback: bool,
    /// Enables local-model -> remote-api.
    pub fallback_to_remote: bool,
    /// Explicit overrides, `from>to=on|off` separated by commas.
    pub fallback_edges: String,
    pub vosk_model_path: PathBuf,
    pub whisper_model_path: PathBuf,
    pub scratch_dir: PathBuf,
    pub ffmpeg_bin: String,
    pub language: String,
    pub match_mode: MatchMode,
    pub chunk_bytes: usize,
    /// `EnvFilter` directive for the log subscriber.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            recognition_system: EngineId::RemoteApi,
            openai_api_key: None,
            openai_url: DEFAULT_API_URL.to_string(),
            openai_model: DEFAULT_MODEL.to_string(),
            auto_fallback: true,
            fallback_to_remote: false,
            fallback_edges: String::new(),
            vosk_model_path: PathBuf::from(DEFAULT_VOSK_MODEL_PATH),
            whisper_model_path: PathBuf::from(DEFAULT_WHISPER_MODEL_PATH),
            scratch_dir: PathBuf::from(DEFAULT_SCRATCH_DIR),
            ffmpeg_bin: DEFAULT_FFMPEG_BIN.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            match_mode: MatchMode::Substring,
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            log_filter: DEFAULT_DIRECTIVE.to_string(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn invalid(key: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: message.into(),
    }
}

impl Settings {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary variable source.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(system) = non_empty(get("SPEECH_RECOGNITION_SYSTEM")) {
            settings.recognition_system = system
                .parse::<EngineId>()
                .map_err(|e: String| invalid("SPEECH_RECOGNITION_SYSTEM", e))?;
        }

        settings.openai_api_key = non_empty(get("OPENAI_API_KEY"));
        if let Some(url) = non_empty(get("OPENAI_TRANSCRIPTION_URL")) {
            settings.openai_url = url;
        }
        if let Some(model) = non_empty(get("OPENAI_TRANSCRIPTION_MODEL")) {
            settings.openai_model = model;
        }

        // Only an explicit "false" turns auto-fallback off.
        settings.auto_fallback = get("AUTO_FALLBACK_TO_LOCAL")
            .map(|v| !v.trim().eq_ignore_ascii_case("false"))
            .unwrap_or(true);
        settings.fallback_to_remote = get("FALLBACK_TO_OPENAI")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if let Some(edges) = non_empty(get("SPEECH_FALLBACK_EDGES")) {
            settings.fallback_edges = edges;
        }

        if let Some(path) = non_empty(get("VOSK_MODEL_PATH")) {
            settings.vosk_model_path = PathBuf::from(path);
        }
        if let Some(path) = non_empty(get("WHISPER_MODEL_PATH")) {
            settings.whisper_model_path = PathBuf::from(path);
        }
        if let Some(dir) = non_empty(get("SPEECH_SCRATCH_DIR")) {
            settings.scratch_dir = PathBuf::from(dir);
        }
        if let Some(bin) = non_empty(get("FFMPEG_BIN")) {
            settings.ffmpeg_bin = bin;
        }
        if let Some(language) = non_empty(get("SPEECH_LANGUAGE")) {
            settings.language = language.to_lowercase();
        }
        if let Some(mode) = non_empty(get("SPEECH_MATCH_MODE")) {
            settings.match_mode = mode
                .parse::<MatchMode>()
                .map_err(|e: String| invalid("SPEECH_MATCH_MODE", e))?;
        }
        if let Some(chunk) = non_empty(get("SPEECH_CHUNK_BYTES")) {
            settings.chunk_bytes = chunk
                .parse::<usize>()
                .map_err(|e| invalid("SPEECH_CHUNK_BYTES", format!("'{}': {}", chunk, e)))?;
        }

        if let Some(filter) = non_empty(get(LOG_ENV)) {
            settings.log_filter = filter;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Reads a JSON settings file; missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_bytes < 2 {
            return Err(invalid("SPEECH_CHUNK_BYTES", "must be at least 2 bytes"));
        }
        if self.language.trim().is_empty() {
            return Err(invalid("SPEECH_LANGUAGE", "must not be empty"));
        }
        FallbackPolicy::parse_edges(&self.fallback_edges)
            .map_err(|e| invalid("SPEECH_FALLBACK_EDGES", e))?;
        Ok(())
    }

    pub fn remote_key_configured(&self) -> bool {
        self.openai_api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    pub fn fallback_policy(&self) -> Result<FallbackPolicy, ConfigError> {
        let mut policy = FallbackPolicy::new(self.auto_fallback);
        if self.fallback_to_remote {
            policy.set_edge(EngineId::LocalModel, EngineId::RemoteApi, true);
        }
        let overrides = FallbackPolicy::parse_edges(&self.fallback_edges)
            .map_err(|e| invalid("SPEECH_FALLBACK_EDGES", e))?;
        for (from, to, allowed) in overrides {
            policy.set_edge(from, to, allowed);
        }
        Ok(policy)
    }
}
