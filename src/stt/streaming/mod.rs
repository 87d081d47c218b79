// Streaming-decoder STT engine: chunked feeding into an offline recognizer

mod session;
#[cfg(feature = "vosk-stt")]
pub mod vosk;

pub use session::{SessionState, StreamingDecodeSession, INSPECT_EVERY};

use async_trait::async_trait;
use std::sync::Arc;

use super::model_handle::{LoadedModelHandle, ModelLoader};
use super::{finish_text, EngineId, STTError, TranscriptionEngine};
use crate::audio::{CanonicalAudioFrame, CANONICAL_SAMPLE_RATE};

pub const DEFAULT_CHUNK_BYTES: usize = 4000;

/// Final decoder output: the best hypothesis plus any n-best alternatives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalResult {
    pub text: String,
    pub alternatives: Vec<String>,
}

impl FinalResult {
    /// Best hypothesis, or the first alternative when the hypothesis is blank.
    pub fn best_text(&self) -> String {
        let text = self.text.trim();
        if !text.is_empty() {
            return text.to_string();
        }
        self.alternatives
            .first()
            .map(|alt| alt.trim().to_string())
            .unwrap_or_default()
    }
}

/// One per-utterance recognizer. Dropping it frees the native handle.
pub trait Decoder: Send {
    fn accept_waveform(&mut self, samples: &[i16]) -> Result<(), STTError>;

    /// Text of the last completed segment, if any.
    fn result(&mut self) -> String;

    /// Running hypothesis for the segment still in progress.
    fn partial_result(&mut self) -> String;

    fn final_result(&mut self) -> FinalResult;
}

/// Shared, loaded decoder model that hands out per-call recognizers.
pub trait DecoderModel: Send + Sync {
    fn open(&self, sample_rate: f32) -> Result<Box<dyn Decoder>, STTError>;
}

pub struct StreamingDecoderEngine {
    loader: Arc<dyn ModelLoader<dyn DecoderModel>>,
    handle: LoadedModelHandle<dyn DecoderModel>,
    chunk_bytes: usize,
}

impl StreamingDecoderEngine {
    pub fn new(loader: Arc<dyn ModelLoader<dyn DecoderModel>>, chunk_bytes: usize) -> Self {
        tracing::info!(
            model = %loader.describe(),
            chunk_bytes,
            "Streaming decoder engine initialized (lazy load)"
        );
        Self {
            loader,
            handle: LoadedModelHandle::new(),
            chunk_bytes: chunk_bytes.max(2),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_ready()
    }

    pub fn model_description(&self) -> String {
        self.loader.describe()
    }
}

/// Runs one full session over `pcm`. Blocking.
fn decode_utterance(
    model: &dyn DecoderModel,
    pcm: &[u8],
    chunk_bytes: usize,
) -> Result<String, STTError> {
    let decoder = model.open(CANONICAL_SAMPLE_RATE as f32)?;
    let mut session = StreamingDecodeSession::open(decoder);
    session.feed_all(pcm, chunk_bytes)?;
    let text = session.finalize()?;
    session.release();
    Ok(text)
}

#[async_trait]
impl TranscriptionEngine for StreamingDecoderEngine {
    async fn transcribe(
        &self,
        frame: &CanonicalAudioFrame,
        _language: &str,
    ) -> Result<String, STTError> {
        let model = self.handle.get_or_load(&self.loader).await?;

        tracing::info!(
            "Streaming decoder: decoding {:.1}s audio in {}-byte chunks...",
            frame.duration_secs(),
            self.chunk_bytes
        );

        let pcm = frame.to_pcm_bytes();
        let chunk_bytes = self.chunk_bytes;
        let raw = tokio::task::spawn_blocking(move || decode_utterance(&*model, &pcm, chunk_bytes))
            .await
            .map_err(|e| STTError::DecodeSessionError(format!("decode task failed: {}", e)))??;

        if raw.is_empty() {
            tracing::warn!("Streaming decoder produced no text (silence or very short clip)");
        }

        Ok(finish_text(&raw))
    }

    fn id(&self) -> EngineId {
        EngineId::StreamingDecoder
    }

    fn name(&self) -> &str {
        "Streaming Decoder"
    }
}
