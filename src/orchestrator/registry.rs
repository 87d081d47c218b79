use crate::config::Settings;
use crate::stt::{EngineId, RemoteApiEngine, STTError, TranscriptionEngine};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds every engine this binary can run. Engines whose backend was not
/// compiled in are left out; the orchestrator reports them as unavailable.
pub fn engines_from_settings(
    settings: &Settings,
) -> Result<HashMap<EngineId, Arc<dyn TranscriptionEngine>>, STTError> {
    let mut engines: HashMap<EngineId, Arc<dyn TranscriptionEngine>> = HashMap::new();

    let remote = RemoteApiEngine::new(
        settings.openai_api_key.clone(),
        settings.openai_url.clone(),
        settings.openai_model.clone(),
    )?;
    engines.insert(EngineId::RemoteApi, Arc::new(remote));

    #[cfg(feature = "local-whisper")]
    {
        use crate::stt::whisper::WhisperModelLoader;
        use crate::stt::LocalModelEngine;

        let loader = Arc::new(WhisperModelLoader::new(settings.whisper_model_path.clone()));
        engines.insert(EngineId::LocalModel, Arc::new(LocalModelEngine::new(loader)));
    }
    #[cfg(not(feature = "local-whisper"))]
    tracing::warn!("Local model engine not built (enable the `local-whisper` feature)");

    #[cfg(feature = "vosk-stt")]
    {
        use crate::stt::streaming::vosk::VoskModelLoader;
        use crate::stt::StreamingDecoderEngine;

        let loader = Arc::new(VoskModelLoader::new(settings.vosk_model_path.clone()));
        engines.insert(
            EngineId::StreamingDecoder,
            Arc::new(StreamingDecoderEngine::new(loader, settings.chunk_bytes)),
        );
    }
    #[cfg(not(feature = "vosk-stt"))]
    tracing::warn!("Streaming decoder engine not built (enable the `vosk-stt` feature)");

    tracing::info!(
        "Registered engines: {}",
        EngineId::ALL
            .iter()
            .filter(|id| engines.contains_key(*id))
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(engines)
}
