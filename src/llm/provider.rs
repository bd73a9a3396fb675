use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{GenerationOptions, LlmError};

/// Ordered, finite sequence of generated fragments. Dropping the receiver
/// aborts the underlying backend request.
pub type FragmentStream = mpsc::Receiver<Result<String, LlmError>>;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Maps `text` to a vector whose length is fixed for the model.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError>;
}

/// Performs the expensive one-off setup of an embedding model.
#[async_trait]
pub trait EmbedderLoader: Send + Sync {
    fn describe(&self) -> String;

    async fn load(&self) -> Result<Arc<dyn Embedder>, LlmError>;
}

#[async_trait]
pub trait Generator: Send + Sync {
    /// return the backend name (e.g. "ollama", "openai")
    fn name(&self) -> &str;

    /// check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// full completion in one response
    async fn generate(&self, prompt: &str, options: &GenerationOptions)
        -> Result<String, LlmError>;

    /// completion delivered fragment by fragment
    async fn stream(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<FragmentStream, LlmError>;
}
