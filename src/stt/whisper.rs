// whisper.cpp bindings for the local-model engine (feature `local-whisper`)

use std::path::PathBuf;
use std::sync::Arc;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::local::SpeechModel;
use super::model_handle::ModelLoader;
use super::STTError;

pub struct WhisperModelLoader {
    model_path: PathBuf,
}

impl WhisperModelLoader {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
        }
    }
}

impl ModelLoader<dyn SpeechModel> for WhisperModelLoader {
    fn load(&self) -> Result<Arc<dyn SpeechModel>, STTError> {
        if !self.model_path.exists() {
            return Err(STTError::ModelLoadError(format!(
                "whisper model not found at {}",
                self.model_path.display()
            )));
        }

        let path = self.model_path.to_str().ok_or_else(|| {
            STTError::ModelLoadError(format!(
                "model path is not valid UTF-8: {}",
                self.model_path.display()
            ))
        })?;

        let ctx = WhisperContext::new_with_params(path, WhisperContextParameters::default())
            .map_err(|e| STTError::ModelLoadError(format!("failed to load whisper model: {}", e)))?;

        let model: Arc<dyn SpeechModel> = Arc::new(WhisperSpeechModel { ctx });
        Ok(model)
    }

    fn describe(&self) -> String {
        self.model_path.display().to_string()
    }
}

struct WhisperSpeechModel {
    ctx: WhisperContext,
}

impl SpeechModel for WhisperSpeechModel {
    fn transcribe(&self, samples: &[f32], language: &str) -> Result<String, STTError> {
        // One state per call; the context itself is shared.
        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| STTError::InferenceError(format!("failed to create state: {}", e)))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(language));
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_no_timestamps(true);

        state
            .full(params, samples)
            .map_err(|e| STTError::InferenceError(format!("whisper inference failed: {}", e)))?;

        let n_segments = state
            .full_n_segments()
            .map_err(|e| STTError::InferenceError(e.to_string()))?;

        let mut segments = Vec::new();
        for i in 0..n_segments {
            let text = state
                .full_get_segment_text_lossy(i)
                .map_err(|e| STTError::InferenceError(e.to_string()))?;
            let text = text.trim();
            if !text.is_empty() {
                segments.push(text.to_string());
            }
        }

        Ok(segments.join(" "))
    }
}
