pub mod lazy;
pub mod ollama;
pub mod openai_compat;
pub mod provider;
pub mod stream;
pub mod types;

use std::sync::Arc;

pub use lazy::{LazyEmbedder, WarmupLoader};
pub use ollama::{OllamaEmbedder, OllamaProvider};
pub use openai_compat::OpenAiCompatProvider;
pub use provider::{Embedder, EmbedderLoader, FragmentStream, Generator};
pub use types::{ChatMessage, GenerationOptions, LlmError};

use crate::core::config::{LlmSettings, ProviderKind};

/// Builds the generation backend and the lazily-initialized embedder
/// described by `settings`. Nothing is contacted until first use.
pub fn build_backends(settings: &LlmSettings) -> (Arc<dyn Generator>, Arc<LazyEmbedder>) {
    match settings.provider {
        ProviderKind::Ollama => {
            let generator = OllamaProvider::new(
                &settings.base_url,
                &settings.generation_model,
                settings.request_timeout,
            );
            let embedder = OllamaEmbedder::new(
                &settings.base_url,
                &settings.embedding_model,
                settings.request_timeout,
            );
            let loader = WarmupLoader::new(embedder.label(), Arc::new(embedder));
            (Arc::new(generator), Arc::new(LazyEmbedder::new(loader)))
        }
        ProviderKind::OpenAi => {
            let generator = OpenAiCompatProvider::new(
                &settings.base_url,
                &settings.generation_model,
                settings.api_key.clone(),
                settings.request_timeout,
            );
            let embedder = OpenAiCompatProvider::new(
                &settings.base_url,
                &settings.embedding_model,
                settings.api_key.clone(),
                settings.request_timeout,
            );
            let loader = WarmupLoader::new(embedder.label(), Arc::new(embedder));
            (Arc::new(generator), Arc::new(LazyEmbedder::new(loader)))
        }
    }
}
