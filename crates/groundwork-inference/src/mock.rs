//! Mock inference backend for deterministic testing.
//!
//! Provides a mock implementation of the embedding and generation backends
//! that produces deterministic embeddings and responses, records every call,
//! and can be told to fail.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use groundwork_inference::mock::MockInferenceBackend;
//! use groundwork_core::EmbeddingBackend;
//!
//! #[tokio::test]
//! async fn test_with_mock_backend() {
//!     let backend = MockInferenceBackend::new()
//!         .with_dimension(8)
//!         .with_fixed_response("Test response");
//!
//!     let embedding = backend.embed_query("test text").await.unwrap();
//!     assert_eq!(embedding.as_slice().len(), 8);
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use groundwork_core::{EmbeddingBackend, Error, GenerationBackend, Result, Vector};

/// Mock inference backend for testing.
#[derive(Clone)]
pub struct MockInferenceBackend {
    config: Arc<MockConfig>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    dimension: usize,
    fixed_responses: HashMap<String, String>,
    default_response: String,
    latency_ms: u64,
    fail_embedding: bool,
    fail_generation: bool,
    /// Texts embedded to a caller-chosen vector instead of the hash.
    pinned_embeddings: HashMap<String, Vec<f32>>,
}

#[derive(Debug, Clone)]
pub struct MockCall {
    pub operation: String,
    pub system: String,
    pub input: String,
    pub timestamp: std::time::Instant,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            fixed_responses: HashMap::new(),
            default_response: "Mock response".to_string(),
            latency_ms: 0,
            fail_embedding: false,
            fail_generation: false,
            pinned_embeddings: HashMap::new(),
        }
    }
}

impl MockInferenceBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            call_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Set the embedding dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        Arc::make_mut(&mut self.config).dimension = dimension;
        self
    }

    /// Set a fixed response for generation requests.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
        self
    }

    /// Add a response mapping for a specific user prompt.
    pub fn with_response_mapping(
        mut self,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Arc::make_mut(&mut self.config)
            .fixed_responses
            .insert(input.into(), output.into());
        self
    }

    /// Embed `text` to exactly `vector` (padded or truncated to the dimension).
    pub fn with_embedding(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        Arc::make_mut(&mut self.config)
            .pinned_embeddings
            .insert(text.into(), vector);
        self
    }

    /// Set simulated latency for all operations.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Make every embedding call fail.
    pub fn failing_embeddings(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail_embedding = true;
        self
    }

    /// Make every generation call fail.
    pub fn failing_generation(mut self) -> Self {
        Arc::make_mut(&mut self.config).fail_generation = true;
        self
    }

    fn log(&self) -> MutexGuard<'_, Vec<MockCall>> {
        self.call_log.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all logged calls for assertion.
    pub fn get_calls(&self) -> Vec<MockCall> {
        self.log().clone()
    }

    /// Clear the call log.
    pub fn clear_calls(&self) {
        self.log().clear()
    }

    /// Get number of embed calls.
    pub fn embed_call_count(&self) -> usize {
        self.log().iter().filter(|c| c.operation == "embed").count()
    }

    /// Get number of generation calls.
    pub fn generate_call_count(&self) -> usize {
        self.log()
            .iter()
            .filter(|c| c.operation == "generate")
            .count()
    }

    /// The most recent generation call, if any.
    pub fn last_generation(&self) -> Option<MockCall> {
        self.log()
            .iter()
            .rev()
            .find(|c| c.operation == "generate")
            .cloned()
    }

    fn log_call(&self, operation: &str, system: &str, input: &str) {
        self.log().push(MockCall {
            operation: operation.to_string(),
            system: system.to_string(),
            input: input.to_string(),
            timestamp: std::time::Instant::now(),
        });
    }

    async fn simulate_latency(&self) {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }
    }

    fn embedding_for(&self, text: &str) -> Vec<f32> {
        let dimension = self.config.dimension;
        match self.config.pinned_embeddings.get(text) {
            Some(pinned) => {
                let mut v = pinned.clone();
                v.resize(dimension, 0.0);
                v
            }
            None => MockEmbeddingGenerator::generate(text, dimension),
        }
    }
}

impl Default for MockInferenceBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingBackend for MockInferenceBackend {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        for text in texts {
            self.log_call("embed", "", text);
        }
        self.simulate_latency().await;

        if self.config.fail_embedding {
            return Err(Error::Embedding("Simulated embedding failure".to_string()));
        }

        Ok(texts
            .iter()
            .map(|t| Vector::from(self.embedding_for(t)))
            .collect())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

#[async_trait]
impl GenerationBackend for MockInferenceBackend {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.generate_with_system("", prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.log_call("generate", system, prompt);
        self.simulate_latency().await;

        if self.config.fail_generation {
            return Err(Error::Inference("Simulated generation failure".to_string()));
        }

        if let Some(response) = self.config.fixed_responses.get(prompt) {
            return Ok(response.clone());
        }

        Ok(self.config.default_response.clone())
    }

    fn model_name(&self) -> &str {
        "mock-gen"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.config.fail_generation)
    }
}

/// Mock embedding generator with deterministic output.
pub struct MockEmbeddingGenerator;

impl MockEmbeddingGenerator {
    /// Generate a deterministic embedding from text.
    ///
    /// Uses character-based hashing for reproducibility. The same text
    /// will always produce the same embedding.
    pub fn generate(text: &str, dimension: usize) -> Vec<f32> {
        let mut vec = vec![0.0; dimension];
        if dimension == 0 {
            return vec;
        }

        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % dimension;
            vec[idx] += 0.1;
        }

        crate::vector::normalize_l2(&mut vec);
        vec
    }
}
