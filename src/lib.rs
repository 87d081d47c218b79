pub mod audio;
pub mod config;
pub mod logging;
pub mod matcher;
pub mod orchestrator;
pub mod service;
pub mod stt;

pub use audio::{AudioError, AudioNormalizer, CanonicalAudioFrame};
pub use config::{ConfigError, Settings};
pub use matcher::{MatchMode, MatchOutcome, TextMatcher};
pub use orchestrator::{CompositeFailure, FallbackOrchestrator, FallbackPolicy};
pub use service::{
    RecognitionError, RecognitionResponse, SpeechService, StatusReport, TranscriptionRequest,
};
pub use stt::{EngineId, STTError, Transcript, TranscriptionEngine};
