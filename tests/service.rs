use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use speech_practice::audio::{AudioError, AudioNormalizer, CanonicalAudioFrame, Transcoder};
use speech_practice::orchestrator::{FallbackOrchestrator, FallbackPolicy};
use speech_practice::stt::streaming::{Decoder, DecoderModel, FinalResult, StreamingDecoderEngine};
use speech_practice::stt::{
    EngineId, LocalModelEngine, ModelLoader, STTError, SpeechModel, TranscriptionEngine,
};
use speech_practice::{RecognitionError, Settings, SpeechService, TranscriptionRequest};

struct NoTranscoder;

#[async_trait]
impl Transcoder for NoTranscoder {
    async fn transcode(&self, _input: &Path, _output: &Path) -> Result<(), AudioError> {
        Err(AudioError::Transcoder("not available in tests".to_string()))
    }

    fn name(&self) -> &str {
        "none"
    }
}

struct ScriptedEngine {
    id: EngineId,
    result: Result<&'static str, fn() -> STTError>,
    calls: AtomicUsize,
    last_len: AtomicUsize,
}

impl ScriptedEngine {
    fn ok(id: EngineId, text: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            result: Ok(text),
            calls: AtomicUsize::new(0),
            last_len: AtomicUsize::new(0),
        })
    }

    fn err(id: EngineId, make: fn() -> STTError) -> Arc<Self> {
        Arc::new(Self {
            id,
            result: Err(make),
            calls: AtomicUsize::new(0),
            last_len: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionEngine for ScriptedEngine {
    async fn transcribe(
        &self,
        frame: &CanonicalAudioFrame,
        _language: &str,
    ) -> Result<String, STTError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_len.store(frame.len(), Ordering::SeqCst);
        match &self.result {
            Ok(text) => Ok(text.to_string()),
            Err(make) => Err(make()),
        }
    }

    fn id(&self) -> EngineId {
        self.id
    }

    fn name(&self) -> &str {
        self.id.as_str()
    }
}

fn connection_reset() -> STTError {
    STTError::ConnectivityError("connection reset by peer".to_string())
}

fn wav_fixture(rate: u32, channels: u16, frames: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec).unwrap();
        for i in 0..frames {
            for _ in 0..channels {
                writer.write_sample(((i % 200) as i16 - 100) * 50).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    buf
}

fn service(
    primary: EngineId,
    policy: FallbackPolicy,
    engines: Vec<Arc<dyn TranscriptionEngine>>,
    scratch: &Path,
) -> SpeechService {
    let engines: HashMap<EngineId, Arc<dyn TranscriptionEngine>> =
        engines.into_iter().map(|e| (e.id(), e)).collect();
    let orchestrator = FallbackOrchestrator::new(primary, policy, engines);
    let normalizer = AudioNormalizer::new(scratch, Arc::new(NoTranscoder));
    let settings = Settings {
        recognition_system: primary,
        scratch_dir: scratch.to_path_buf(),
        ..Settings::default()
    };
    SpeechService::from_parts(settings, normalizer, orchestrator)
}

#[tokio::test]
async fn remote_outage_falls_back_to_local_and_checks_word() {
    let scratch = tempfile::tempdir().unwrap();
    let remote = ScriptedEngine::err(EngineId::RemoteApi, connection_reset);
    let local = ScriptedEngine::ok(EngineId::LocalModel, "кот");
    let streaming = ScriptedEngine::ok(EngineId::StreamingDecoder, "кит");
    let service = service(
        EngineId::RemoteApi,
        FallbackPolicy::default(),
        vec![remote.clone(), local.clone(), streaming.clone()],
        scratch.path(),
    );

    let request = TranscriptionRequest::new(wav_fixture(16_000, 1, 8_000), "audio/wav", "ru");
    let attempt = service.recognize_and_check(request, "Кот.").await.unwrap();

    assert!(attempt.recognition.success);
    assert_eq!(attempt.recognition.engine_used, EngineId::LocalModel);
    assert!(attempt.outcome.is_correct);
    assert_eq!(attempt.outcome.expected_word, "кот");
    assert_eq!(remote.calls(), 1);
    assert_eq!(local.calls(), 1);
    assert_eq!(streaming.calls(), 0);
    assert_eq!(local.last_len.load(Ordering::SeqCst), 8_000);

    let json = serde_json::to_value(&attempt).unwrap();
    assert_eq!(json["engineUsed"], "local-model");
    assert_eq!(json["match"]["isCorrect"], true);
}

#[tokio::test]
async fn non_canonical_wav_reaches_engines_as_16k_mono() {
    let scratch = tempfile::tempdir().unwrap();
    let remote = ScriptedEngine::ok(EngineId::RemoteApi, "привет мир");
    let service = service(
        EngineId::RemoteApi,
        FallbackPolicy::default(),
        vec![remote.clone()],
        scratch.path(),
    );

    let request = TranscriptionRequest::new(wav_fixture(44_100, 2, 44_100), "audio/wav", "ru");
    let response = service.recognize(request).await.unwrap();

    assert_eq!(response.text, "привет мир");
    assert_eq!(remote.last_len.load(Ordering::SeqCst), 16_000);
}

#[tokio::test]
async fn unreadable_audio_never_reaches_an_engine() {
    let scratch = tempfile::tempdir().unwrap();
    let remote = ScriptedEngine::ok(EngineId::RemoteApi, "кот");
    let local = ScriptedEngine::ok(EngineId::LocalModel, "кот");
    let service = service(
        EngineId::RemoteApi,
        FallbackPolicy::default(),
        vec![remote.clone(), local.clone()],
        scratch.path(),
    );

    let request = TranscriptionRequest::new(b"RIFF\x10\x00\x00\x00WAVEjunk".to_vec(), "audio/wav", "ru");
    let err = service.recognize(request).await.unwrap_err();

    assert!(matches!(err, RecognitionError::Decode(_)));
    assert!(err.failure_payload().details.is_empty());
    assert_eq!(remote.calls() + local.calls(), 0);
}

#[tokio::test]
async fn exhausted_fallback_returns_composite_payload() {
    let scratch = tempfile::tempdir().unwrap();
    let remote = ScriptedEngine::err(EngineId::RemoteApi, || STTError::TimeoutError(30));
    let local = ScriptedEngine::err(EngineId::LocalModel, || {
        STTError::ModelLoadError("ggml-small.bin missing".to_string())
    });
    let streaming = ScriptedEngine::err(EngineId::StreamingDecoder, || {
        STTError::DecodeSessionError("recognizer rejected audio".to_string())
    });
    let service = service(
        EngineId::RemoteApi,
        FallbackPolicy::default(),
        vec![remote, local, streaming],
        scratch.path(),
    );

    let request = TranscriptionRequest::new(wav_fixture(16_000, 1, 1_600), "audio/wav", "ru");
    let err = service.recognize(request).await.unwrap_err();
    let payload = err.failure_payload();

    assert!(!payload.success);
    let engines: Vec<EngineId> = payload.details.iter().map(|d| d.engine).collect();
    assert_eq!(
        engines,
        vec![EngineId::RemoteApi, EngineId::LocalModel, EngineId::StreamingDecoder]
    );
    assert_eq!(payload.details[2].kind, "decode-session");
}

#[tokio::test]
async fn local_primary_does_not_fall_back_unless_enabled() {
    let scratch = tempfile::tempdir().unwrap();
    let local = ScriptedEngine::err(EngineId::LocalModel, || {
        STTError::ModelLoadError("missing".to_string())
    });
    let remote = ScriptedEngine::ok(EngineId::RemoteApi, "кот");

    let gated = service(
        EngineId::LocalModel,
        FallbackPolicy::default(),
        vec![local.clone(), remote.clone()],
        scratch.path(),
    );
    let request = TranscriptionRequest::new(wav_fixture(16_000, 1, 800), "audio/wav", "ru");
    assert!(gated.recognize(request.clone()).await.is_err());
    assert_eq!(remote.calls(), 0);

    let enabled = service(
        EngineId::LocalModel,
        FallbackPolicy::default().with_edge(EngineId::LocalModel, EngineId::RemoteApi, true),
        vec![local, remote.clone()],
        scratch.path(),
    );
    let response = enabled.recognize(request).await.unwrap();
    assert_eq!(response.engine_used, EngineId::RemoteApi);
    assert_eq!(remote.calls(), 1);
}

// Streaming decoder that only yields text through its partial result, the
// way short utterances often behave.
struct PartialOnlyDecoder {
    samples: usize,
}

impl Decoder for PartialOnlyDecoder {
    fn accept_waveform(&mut self, samples: &[i16]) -> Result<(), STTError> {
        self.samples += samples.len();
        Ok(())
    }

    fn result(&mut self) -> String {
        String::new()
    }

    fn partial_result(&mut self) -> String {
        if self.samples > 0 {
            "Яблоко".to_string()
        } else {
            String::new()
        }
    }

    fn final_result(&mut self) -> FinalResult {
        FinalResult::default()
    }
}

struct PartialOnlyModel;

impl DecoderModel for PartialOnlyModel {
    fn open(&self, _sample_rate: f32) -> Result<Box<dyn Decoder>, STTError> {
        Ok(Box::new(PartialOnlyDecoder { samples: 0 }))
    }
}

struct DecoderLoader;

impl ModelLoader<dyn DecoderModel> for DecoderLoader {
    fn load(&self) -> Result<Arc<dyn DecoderModel>, STTError> {
        let model: Arc<dyn DecoderModel> = Arc::new(PartialOnlyModel);
        Ok(model)
    }

    fn describe(&self) -> String {
        "partial-only".to_string()
    }
}

#[tokio::test]
async fn streaming_engine_salvages_partial_result() {
    let scratch = tempfile::tempdir().unwrap();
    let streaming: Arc<dyn TranscriptionEngine> =
        Arc::new(StreamingDecoderEngine::new(Arc::new(DecoderLoader), 4000));
    let service = service(
        EngineId::StreamingDecoder,
        FallbackPolicy::disabled(),
        vec![streaming],
        scratch.path(),
    );

    let request = TranscriptionRequest::new(wav_fixture(16_000, 1, 5_000), "audio/wav", "ru");
    let attempt = service.recognize_and_check(request, "яблоко").await.unwrap();

    assert_eq!(attempt.recognition.engine_used, EngineId::StreamingDecoder);
    assert_eq!(attempt.recognition.text, "яблоко");
    assert!(attempt.outcome.is_correct);
}

struct SlowModelLoader {
    loads: Arc<AtomicUsize>,
}

struct FixedModel;

impl SpeechModel for FixedModel {
    fn transcribe(&self, _samples: &[f32], _language: &str) -> Result<String, STTError> {
        Ok("Молоко".to_string())
    }
}

impl ModelLoader<dyn SpeechModel> for SlowModelLoader {
    fn load(&self) -> Result<Arc<dyn SpeechModel>, STTError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(100));
        let model: Arc<dyn SpeechModel> = Arc::new(FixedModel);
        Ok(model)
    }

    fn describe(&self) -> String {
        "slow".to_string()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_requests_share_one_model_load() {
    let scratch = tempfile::tempdir().unwrap();
    let loads = Arc::new(AtomicUsize::new(0));
    let local: Arc<dyn TranscriptionEngine> = Arc::new(LocalModelEngine::new(Arc::new(
        SlowModelLoader {
            loads: loads.clone(),
        },
    )));
    let service = Arc::new(service(
        EngineId::LocalModel,
        FallbackPolicy::disabled(),
        vec![local],
        scratch.path(),
    ));

    let wav = wav_fixture(16_000, 1, 1_600);
    let texts = Arc::new(Mutex::new(Vec::new()));
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let texts = texts.clone();
        let request = TranscriptionRequest::new(wav.clone(), "audio/wav", "ru");
        tasks.push(tokio::spawn(async move {
            let response = service.recognize(request).await.unwrap();
            texts.lock().unwrap().push(response.text);
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    let texts = texts.lock().unwrap();
    assert_eq!(texts.len(), 8);
    assert!(texts.iter().all(|t| t == "молоко"));
}

#[test]
fn check_uses_configured_match_mode() {
    let scratch = tempfile::tempdir().unwrap();
    let service = service(
        EngineId::RemoteApi,
        FallbackPolicy::default(),
        Vec::new(),
        scratch.path(),
    );
    assert!(service.check("привет мир", "привет").is_correct);
    assert!(!service.check("", "яблоко").is_correct);
    assert!(!service.check("кот", "кошка").is_correct);
}
