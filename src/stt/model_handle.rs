use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

use super::STTError;

/// Blocking loader for an on-disk model. Runs on the blocking pool.
pub trait ModelLoader<M: ?Sized>: Send + Sync {
    fn load(&self) -> Result<Arc<M>, STTError>;

    /// Short description (usually the model path) for logs and status.
    fn describe(&self) -> String;
}

/// Process-wide, lazily loaded model.
///
/// The first caller starts the load; callers arriving while it is in flight
/// wait on the same initialization instead of starting their own. Once loaded
/// the model is shared read-only. A failed load leaves the handle empty so a
/// later call can try again.
pub struct LoadedModelHandle<M: ?Sized> {
    cell: OnceCell<Arc<M>>,
}

impl<M> LoadedModelHandle<M>
where
    M: ?Sized + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.cell.initialized()
    }

    pub async fn get_or_load(
        &self,
        loader: &Arc<dyn ModelLoader<M>>,
    ) -> Result<Arc<M>, STTError> {
        let model = self
            .cell
            .get_or_try_init(|| async {
                let loader = Arc::clone(loader);
                let description = loader.describe();
                let started = Instant::now();
                tracing::info!(model = %description, "Loading model");

                let loaded: Result<Arc<M>, STTError> =
                    match tokio::task::spawn_blocking(move || loader.load()).await {
                        Ok(result) => result,
                        Err(e) => Err(STTError::ModelLoadError(format!(
                            "loader task failed: {}",
                            e
                        ))),
                    };

                match &loaded {
                    Ok(_) => tracing::info!(
                        model = %description,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Model ready"
                    ),
                    Err(e) => tracing::warn!(
                        model = %description,
                        error = %e,
                        "Model load failed, handle left uninitialized"
                    ),
                }
                loaded
            })
            .await?;

        Ok(Arc::clone(model))
    }
}

impl<M> Default for LoadedModelHandle<M>
where
    M: ?Sized + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
