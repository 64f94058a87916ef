//! In-process embedding with fastembed.
//!
//! The ONNX model is expensive to load, so it is loaded at most once per
//! [`LocalEmbedder`] and reused for every call. Concurrent first callers
//! wait on the same initialization instead of loading the model twice.
//! A failed load is not cached: the next call tries again.
//!
//! Lifecycle:
//! - [`LocalEmbedder::init`] loads eagerly (e.g. at server startup)
//! - any embedding call loads lazily if `init` was never called
//! - [`LocalEmbedder::shutdown`] releases the model; later calls fail

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use groundwork_core::{EmbeddingBackend, EmbeddingConfig, Error, Result, Vector};

use crate::vector::finish_embeddings;

/// Texts per ONNX inference batch.
const BATCH_SIZE: usize = 32;

/// A model that is loaded once, shared, and released on shutdown.
///
/// `T` is only ever touched on blocking threads through [`ModelSlot::run`].
pub struct ModelSlot<T> {
    cell: OnceCell<Arc<Mutex<Option<T>>>>,
    closed: AtomicBool,
}

impl<T: Send + 'static> Default for ModelSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> ModelSlot<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Whether a model is currently held.
    pub fn is_loaded(&self) -> bool {
        self.cell
            .get()
            .and_then(|slot| slot.lock().ok().map(|guard| guard.is_some()))
            .unwrap_or(false)
    }

    /// Load the model with `load` unless it is already loaded.
    pub async fn get_or_load<F>(&self, load: F) -> Result<Arc<Mutex<Option<T>>>>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Embedding("Embedding model has been shut down".to_string()));
        }
        let slot = self
            .cell
            .get_or_try_init(|| async move {
                let model = tokio::task::spawn_blocking(load)
                    .await
                    .map_err(|e| Error::Embedding(format!("Model load task failed: {}", e)))??;
                Ok::<_, Error>(Arc::new(Mutex::new(Some(model))))
            })
            .await?;
        Ok(Arc::clone(slot))
    }

    /// Run `f` against the loaded model on a blocking thread.
    pub async fn run<F, R, L>(&self, load: L, f: F) -> Result<R>
    where
        L: FnOnce() -> Result<T> + Send + 'static,
        F: FnOnce(&mut T) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let slot = self.get_or_load(load).await?;
        tokio::task::spawn_blocking(move || {
            let mut guard = slot
                .lock()
                .map_err(|_| Error::Embedding("Embedding model lock poisoned".to_string()))?;
            let model = guard
                .as_mut()
                .ok_or_else(|| Error::Embedding("Embedding model has been shut down".to_string()))?;
            f(model)
        })
        .await
        .map_err(|e| Error::Embedding(format!("Embedding task failed: {}", e)))?
    }

    /// Drop the model and refuse further use. Returns whether a model was held.
    pub fn shutdown(&self) -> bool {
        self.closed.store(true, Ordering::Release);
        match self.cell.get() {
            Some(slot) => slot
                .lock()
                .map(|mut guard| guard.take().is_some())
                .unwrap_or(false),
            None => false,
        }
    }
}

/// Map a configured model identifier to a fastembed model.
pub fn resolve_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name.trim().to_lowercase().as_str() {
        "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => {
            Ok(fastembed::EmbeddingModel::AllMiniLML6V2)
        }
        "all-minilm-l12-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        other => Err(Error::Config(format!(
            "Unknown local embedding model: {}",
            other
        ))),
    }
}

/// Embedding backend running a fastembed ONNX model in-process.
pub struct LocalEmbedder {
    config: EmbeddingConfig,
    model: ModelSlot<fastembed::TextEmbedding>,
}

impl LocalEmbedder {
    /// Create an embedder. Nothing is loaded until [`init`](Self::init) or
    /// the first embedding call.
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        resolve_model(&config.model)?;
        Ok(Self {
            config,
            model: ModelSlot::new(),
        })
    }

    fn loader(&self) -> impl FnOnce() -> Result<fastembed::TextEmbedding> + Send + 'static {
        let model_name = self.config.model.clone();
        let cache_dir = self.config.cache_dir.clone();
        move || {
            let start = Instant::now();
            let model = resolve_model(&model_name)?;
            let mut options = fastembed::InitOptions::new(model).with_show_download_progress(false);
            if let Some(dir) = cache_dir {
                options = options.with_cache_dir(dir);
            }
            let embedding = fastembed::TextEmbedding::try_new(options).map_err(|e| {
                Error::Embedding(format!("Failed to initialize local embedding model: {}", e))
            })?;
            info!(
                subsystem = "inference",
                component = "local",
                op = "load",
                model = %model_name,
                duration_ms = start.elapsed().as_millis() as u64,
                "Embedding model loaded"
            );
            Ok(embedding)
        }
    }

    /// Load the model now.
    pub async fn init(&self) -> Result<()> {
        self.model.get_or_load(self.loader()).await.map(|_| ())
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_loaded()
    }

    /// Release the model.
    pub fn shutdown(&self) {
        if self.model.shutdown() {
            info!(
                subsystem = "inference",
                component = "local",
                op = "shutdown",
                "Embedding model released"
            );
        }
    }
}

#[async_trait]
impl EmbeddingBackend for LocalEmbedder {
    #[instrument(skip(self, texts), fields(subsystem = "inference", component = "local", op = "embed_texts", model = %self.config.model, input_count = texts.len()))]
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let start = Instant::now();
        let inputs = texts.to_vec();

        let raw = self
            .model
            .run(self.loader(), move |model| {
                model
                    .embed(inputs, Some(BATCH_SIZE))
                    .map_err(|e| Error::Embedding(format!("Local embedding failed: {}", e)))
            })
            .await?;

        let vectors = finish_embeddings(
            raw,
            texts.len(),
            self.config.dimension,
            self.config.normalize,
        )?;
        debug!(
            result_count = vectors.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Embedding complete"
        );
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_resolve_default_model() {
        assert!(matches!(
            resolve_model("all-minilm-l6-v2"),
            Ok(fastembed::EmbeddingModel::AllMiniLML6V2)
        ));
        assert!(matches!(
            resolve_model("All-MiniLM-L6-v2"),
            Ok(fastembed::EmbeddingModel::AllMiniLML6V2)
        ));
    }

    #[test]
    fn test_unknown_model_rejected_at_construction() {
        let config = EmbeddingConfig {
            model: "no-such-model".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(matches!(LocalEmbedder::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn test_new_does_not_load() {
        let embedder = LocalEmbedder::new(EmbeddingConfig::default()).unwrap();
        assert!(!embedder.is_loaded());
        assert_eq!(embedder.dimension(), 384);
    }

    #[tokio::test]
    async fn test_slot_loads_once_under_concurrency() {
        let slot = Arc::new(ModelSlot::<u32>::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let slot = Arc::clone(&slot);
            let loads = Arc::clone(&loads);
            handles.push(tokio::spawn(async move {
                slot.run(
                    move || {
                        loads.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(20));
                        Ok(41)
                    },
                    |m| Ok(*m + 1),
                )
                .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(slot.is_loaded());
    }

    #[tokio::test]
    async fn test_slot_failed_load_is_retried() {
        let slot = ModelSlot::<u32>::new();
        let first = slot
            .get_or_load(|| Err(Error::Embedding("download failed".to_string())))
            .await;
        assert!(first.is_err());
        assert!(!slot.is_loaded());

        slot.get_or_load(|| Ok(7)).await.unwrap();
        assert!(slot.is_loaded());
    }

    #[tokio::test]
    async fn test_slot_shutdown_releases_and_refuses() {
        let slot = ModelSlot::<u32>::new();
        slot.get_or_load(|| Ok(1)).await.unwrap();
        assert!(slot.shutdown());
        assert!(!slot.is_loaded());
        assert!(!slot.shutdown());

        let err = slot.run(|| Ok(2), |m| Ok(*m)).await.unwrap_err();
        assert!(err.to_string().contains("shut down"));
    }

    #[tokio::test]
    #[ignore = "downloads the ONNX model"]
    async fn test_local_embedding_is_normalized() {
        let embedder = LocalEmbedder::new(EmbeddingConfig::default()).unwrap();
        embedder.init().await.unwrap();
        let v = embedder.embed_query("where is the retry logic?").await.unwrap();
        assert_eq!(v.as_slice().len(), 384);
        let magnitude: f32 = v.as_slice().iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-3);
        embedder.shutdown();
        assert!(embedder.embed_query("again").await.is_err());
    }
}
