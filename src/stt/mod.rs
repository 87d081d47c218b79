// STT Module - interchangeable transcription engines

mod types;
pub mod local;
pub mod model_handle;
pub mod remote;
pub mod streaming;
#[cfg(feature = "local-whisper")]
pub mod whisper;

pub use local::{LocalModelEngine, SpeechModel};
pub use model_handle::{LoadedModelHandle, ModelLoader};
pub use remote::RemoteApiEngine;
pub use streaming::StreamingDecoderEngine;
pub use types::{EngineId, STTError, Transcript};

use crate::audio::CanonicalAudioFrame;
use async_trait::async_trait;

/// Unified transcription engine trait
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Transcribe a canonical clip. Returned text is trimmed and lower-cased.
    async fn transcribe(
        &self,
        frame: &CanonicalAudioFrame,
        language: &str,
    ) -> Result<String, STTError>;

    fn id(&self) -> EngineId;

    /// Human-readable backend name for logs and status output.
    fn name(&self) -> &str;
}

/// Final shaping applied to every engine's output.
pub fn finish_text(raw: &str) -> String {
    raw.trim().to_lowercase()
}
