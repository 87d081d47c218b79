use crate::audio::CanonicalAudioFrame;
use crate::stt::{EngineId, STTError, Transcript, TranscriptionEngine};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use self::policy::{candidate_order, FallbackEdge, FallbackPolicy};
pub use self::registry::engines_from_settings;

pub mod policy;
pub mod registry;

/// Every engine attempted for one request, with its error, in attempt order.
#[derive(Debug)]
pub struct CompositeFailure {
    attempts: Vec<(EngineId, STTError)>,
}

impl CompositeFailure {
    pub fn new(attempts: Vec<(EngineId, STTError)>) -> Self {
        Self { attempts }
    }

    pub fn attempts(&self) -> &[(EngineId, STTError)] {
        &self.attempts
    }

    pub fn engines(&self) -> Vec<EngineId> {
        self.attempts.iter().map(|(id, _)| *id).collect()
    }

    pub fn into_attempts(self) -> Vec<(EngineId, STTError)> {
        self.attempts
    }
}

impl fmt::Display for CompositeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all transcription engines failed")?;
        for (i, (engine, err)) in self.attempts.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}: {}", sep, engine, err)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompositeFailure {}

/// Runs the primary engine, then the policy's candidates while failures are
/// of the "engine unavailable" kind.
pub struct FallbackOrchestrator {
    primary: EngineId,
    policy: FallbackPolicy,
    engines: HashMap<EngineId, Arc<dyn TranscriptionEngine>>,
}

impl FallbackOrchestrator {
    pub fn new(
        primary: EngineId,
        policy: FallbackPolicy,
        engines: HashMap<EngineId, Arc<dyn TranscriptionEngine>>,
    ) -> Self {
        let plan: Vec<String> = Self::plan_for(primary, &policy)
            .iter()
            .map(|id| id.to_string())
            .collect();
        tracing::info!(
            primary = %primary,
            plan = %plan.join(" -> "),
            "Fallback orchestrator ready"
        );

        Self {
            primary,
            policy,
            engines,
        }
    }

    pub fn primary(&self) -> EngineId {
        self.primary
    }

    pub fn policy(&self) -> &FallbackPolicy {
        &self.policy
    }

    pub fn is_registered(&self, id: EngineId) -> bool {
        self.engines.contains_key(&id)
    }

    pub fn engine(&self, id: EngineId) -> Option<&Arc<dyn TranscriptionEngine>> {
        self.engines.get(&id)
    }

    fn plan_for(primary: EngineId, policy: &FallbackPolicy) -> Vec<EngineId> {
        let mut plan = vec![primary];
        plan.extend(policy.candidates(primary));
        plan
    }

    /// Primary followed by every candidate the policy allows, in order.
    pub fn plan(&self) -> Vec<EngineId> {
        Self::plan_for(self.primary, &self.policy)
    }

    pub async fn transcribe(
        &self,
        frame: &CanonicalAudioFrame,
        language: &str,
    ) -> Result<Transcript, CompositeFailure> {
        let mut attempts: Vec<(EngineId, STTError)> = Vec::new();

        for engine_id in self.plan() {
            // Only the primary's error decides whether to fall back at all.
            // Once falling back, every permitted candidate gets its turn.
            if let Some((primary, err)) = attempts.first() {
                if !err.triggers_fallback() {
                    tracing::warn!(
                        "{} failed with a non-recoverable {} error, not falling back",
                        primary,
                        err.kind()
                    );
                    break;
                }
                tracing::info!("Falling back from {} to {}", primary, engine_id);
            }

            let Some(engine) = self.engines.get(&engine_id) else {
                tracing::warn!("Engine {} skipped: not available in this build", engine_id);
                attempts.push((
                    engine_id,
                    STTError::Unavailable(format!("{} engine is not configured", engine_id)),
                ));
                continue;
            };

            tracing::info!("Attempting engine: {}", engine.name());

            match engine.transcribe(frame, language).await {
                Ok(text) => {
                    tracing::info!(
                        "Engine {} succeeded: text_len={}, attempts_before={}",
                        engine_id,
                        text.len(),
                        attempts.len()
                    );
                    return Ok(Transcript {
                        text,
                        engine: engine_id,
                    });
                }
                Err(e) => {
                    tracing::warn!(engine = %engine_id, kind = e.kind(), "Engine failed: {}", e);
                    attempts.push((engine_id, e));
                }
            }
        }

        let failure = CompositeFailure::new(attempts);
        tracing::error!("{}", failure);
        Err(failure)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Engine returning a fixed outcome and counting calls.
    pub struct FakeEngine {
        id: EngineId,
        outcome: Box<dyn Fn() -> Result<String, STTError> + Send + Sync>,
        pub calls: AtomicUsize,
    }

    impl FakeEngine {
        pub fn ok(id: EngineId, text: &str) -> Arc<Self> {
            let text = text.to_string();
            Arc::new(Self {
                id,
                outcome: Box::new(move || Ok(text.clone())),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn failing(id: EngineId, make: fn() -> STTError) -> Arc<Self> {
            Arc::new(Self {
                id,
                outcome: Box::new(move || Err(make())),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranscriptionEngine for FakeEngine {
        async fn transcribe(
            &self,
            _frame: &CanonicalAudioFrame,
            _language: &str,
        ) -> Result<String, STTError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }

        fn id(&self) -> EngineId {
            self.id
        }

        fn name(&self) -> &str {
            self.id.as_str()
        }
    }

    pub fn registry(engines: &[Arc<FakeEngine>]) -> HashMap<EngineId, Arc<dyn TranscriptionEngine>> {
        engines
            .iter()
            .map(|e| {
                let engine: Arc<dyn TranscriptionEngine> = e.clone();
                (e.id, engine)
            })
            .collect()
    }
}
