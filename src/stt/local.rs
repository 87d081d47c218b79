// Embedded-model STT engine (local inference, no network)

use async_trait::async_trait;
use std::sync::Arc;

use super::model_handle::{LoadedModelHandle, ModelLoader};
use super::{finish_text, EngineId, STTError, TranscriptionEngine};
use crate::audio::CanonicalAudioFrame;

/// A loaded speech-to-text model. Inference is CPU-bound and blocking.
pub trait SpeechModel: Send + Sync {
    /// `samples` are mono 16 kHz in `[-1.0, 1.0]`.
    fn transcribe(&self, samples: &[f32], language: &str) -> Result<String, STTError>;
}

pub struct LocalModelEngine {
    loader: Arc<dyn ModelLoader<dyn SpeechModel>>,
    handle: LoadedModelHandle<dyn SpeechModel>,
}

impl LocalModelEngine {
    pub fn new(loader: Arc<dyn ModelLoader<dyn SpeechModel>>) -> Self {
        tracing::info!(model = %loader.describe(), "Local model engine initialized (lazy load)");
        Self {
            loader,
            handle: LoadedModelHandle::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_ready()
    }

    pub fn model_description(&self) -> String {
        self.loader.describe()
    }
}

#[async_trait]
impl TranscriptionEngine for LocalModelEngine {
    async fn transcribe(
        &self,
        frame: &CanonicalAudioFrame,
        language: &str,
    ) -> Result<String, STTError> {
        let model = self.handle.get_or_load(&self.loader).await?;

        if frame.is_empty() {
            return Ok(String::new());
        }

        tracing::info!(
            "Local model: transcribing {:.1}s audio...",
            frame.duration_secs()
        );

        let samples = frame.to_f32();
        let language = language.to_string();
        let raw = tokio::task::spawn_blocking(move || model.transcribe(&samples, &language))
            .await
            .map_err(|e| STTError::InferenceError(format!("inference task failed: {}", e)))??;

        Ok(finish_text(&raw))
    }

    fn id(&self) -> EngineId {
        EngineId::LocalModel
    }

    fn name(&self) -> &str {
        "Local Model"
    }
}
