//! Load-once model state for detector and segmenter implementations.

use std::sync::{Arc, Mutex};

use thiserror::Error;

/// Failure reported by an external model capability.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// The model could not be loaded or initialized.
    #[error("model unavailable: {0}")]
    Unavailable(String),

    /// The model is loaded but failed while running.
    #[error("inference failed: {0}")]
    Inference(String),
}

type Loader<M> = Box<dyn Fn() -> Result<M, ModelError> + Send + Sync>;

/// Lazily loaded model weights, shared by every call on one capability.
///
/// The first successful [`LazyModel::get`] runs the loader; later calls
/// return the cached model. Concurrent first calls wait on the same lock, so
/// the loader never runs twice in parallel. A failed load is not cached and
/// the next call tries again.
pub struct LazyModel<M> {
    loader: Loader<M>,
    slot: Mutex<Option<Arc<M>>>,
}

impl<M> LazyModel<M> {
    /// Wrap a loader. Nothing is loaded until the first `get`.
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<M, ModelError> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            slot: Mutex::new(None),
        }
    }

    /// Return the loaded model, loading it on first use.
    pub fn get(&self) -> Result<Arc<M>, ModelError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| ModelError::Unavailable("model lock poisoned".to_string()))?;

        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }

        log::debug!("loading model");
        let model = Arc::new((self.loader)()?);
        *slot = Some(Arc::clone(&model));
        log::info!("model loaded");
        Ok(model)
    }

    /// Whether a model has been loaded successfully.
    pub fn is_loaded(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

impl<M> std::fmt::Debug for LazyModel<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyModel")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
