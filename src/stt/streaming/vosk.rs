// VOSK offline recognizer behind the streaming-decoder engine (feature `vosk-stt`)

use std::path::PathBuf;
use std::sync::Arc;
use vosk::{CompleteResult, Model, Recognizer};

use super::{Decoder, DecoderModel, FinalResult};
use crate::stt::{ModelLoader, STTError};

pub struct VoskModelLoader {
    model_path: PathBuf,
}

impl VoskModelLoader {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
        }
    }
}

impl ModelLoader<dyn DecoderModel> for VoskModelLoader {
    fn load(&self) -> Result<Arc<dyn DecoderModel>, STTError> {
        if !self.model_path.exists() {
            return Err(STTError::ModelLoadError(format!(
                "VOSK model not found at {}",
                self.model_path.display()
            )));
        }

        let path = self.model_path.to_string_lossy().to_string();
        let model = Model::new(path).ok_or_else(|| {
            STTError::ModelLoadError(format!(
                "VOSK model at '{}' failed to load",
                self.model_path.display()
            ))
        })?;

        tracing::info!("VOSK model loaded from {}", self.model_path.display());

        let model: Arc<dyn DecoderModel> = Arc::new(VoskModel { model });
        Ok(model)
    }

    fn describe(&self) -> String {
        self.model_path.display().to_string()
    }
}

struct VoskModel {
    model: Model,
}

impl DecoderModel for VoskModel {
    fn open(&self, sample_rate: f32) -> Result<Box<dyn Decoder>, STTError> {
        let mut recognizer = Recognizer::new(&self.model, sample_rate).ok_or_else(|| {
            STTError::DecodeSessionError("Failed to create VOSK recognizer".to_string())
        })?;
        recognizer.set_words(true);
        Ok(Box::new(VoskDecoder { recognizer }))
    }
}

struct VoskDecoder {
    recognizer: Recognizer,
}

fn complete_text(result: CompleteResult<'_>) -> FinalResult {
    if let Some(single) = result.single() {
        return FinalResult {
            text: single.text.to_string(),
            alternatives: Vec::new(),
        };
    }
    match result.multiple() {
        Some(multiple) => {
            let alternatives: Vec<String> = multiple
                .alternatives
                .iter()
                .map(|alt| alt.text.to_string())
                .collect();
            FinalResult {
                text: alternatives.first().cloned().unwrap_or_default(),
                alternatives,
            }
        }
        None => FinalResult::default(),
    }
}

impl Decoder for VoskDecoder {
    fn accept_waveform(&mut self, samples: &[i16]) -> Result<(), STTError> {
        self.recognizer
            .accept_waveform(samples)
            .map(|_| ())
            .map_err(|e| STTError::DecodeSessionError(e.to_string()))
    }

    fn result(&mut self) -> String {
        complete_text(self.recognizer.result()).text
    }

    fn partial_result(&mut self) -> String {
        self.recognizer.partial_result().partial.to_string()
    }

    fn final_result(&mut self) -> FinalResult {
        complete_text(self.recognizer.final_result())
    }
}
