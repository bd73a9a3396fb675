//! Process-wide, initialize-once embedding client.
//!
//! The first `embed` call runs the loader; concurrent callers await that
//! same initialization through `OnceCell` instead of starting their own.
//! A failed load leaves the cell empty so the next caller retries.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use super::provider::{Embedder, EmbedderLoader};
use super::types::LlmError;

pub struct LazyEmbedder {
    loader: Box<dyn EmbedderLoader>,
    cell: OnceCell<Arc<dyn Embedder>>,
}

impl LazyEmbedder {
    pub fn new(loader: impl EmbedderLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            cell: OnceCell::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }

    async fn get(&self) -> Result<&Arc<dyn Embedder>, LlmError> {
        self.cell
            .get_or_try_init(|| async {
                let started = Instant::now();
                tracing::info!("Loading embedding model {}", self.loader.describe());
                let embedder = self.loader.load().await?;
                tracing::info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Embedding model {} loaded",
                    self.loader.describe()
                );
                Ok(embedder)
            })
            .await
    }
}

#[async_trait]
impl Embedder for LazyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.get().await?.embed(text).await
    }
}

/// Loader for HTTP-backed models: a warm-up embedding forces the backend to
/// load the model into memory before real traffic arrives.
pub struct WarmupLoader {
    label: String,
    embedder: Arc<dyn Embedder>,
}

impl WarmupLoader {
    pub fn new(label: impl Into<String>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            label: label.into(),
            embedder,
        }
    }
}

#[async_trait]
impl EmbedderLoader for WarmupLoader {
    fn describe(&self) -> String {
        self.label.clone()
    }

    async fn load(&self) -> Result<Arc<dyn Embedder>, LlmError> {
        let sample = self
            .embedder
            .embed("warmup")
            .await
            .map_err(|err| LlmError::Initialization(err.to_string()))?;
        if sample.is_empty() {
            return Err(LlmError::EmptyEmbedding);
        }
        tracing::debug!(dimension = sample.len(), "Embedding model warm-up finished");
        Ok(self.embedder.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct ConstEmbedder;

    #[async_trait]
    impl Embedder for ConstEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
            Ok(vec![1.0, 0.0])
        }
    }

    struct CountingLoader {
        loads: Arc<AtomicUsize>,
        fail_first: bool,
    }

    #[async_trait]
    impl EmbedderLoader for CountingLoader {
        fn describe(&self) -> String {
            "counting".to_string()
        }

        async fn load(&self) -> Result<Arc<dyn Embedder>, LlmError> {
            let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail_first && attempt == 0 {
                return Err(LlmError::Initialization("boom".to_string()));
            }
            Ok(Arc::new(ConstEmbedder))
        }
    }

    #[tokio::test]
    async fn concurrent_first_calls_share_one_initialization() {
        let loads = Arc::new(AtomicUsize::new(0));
        let lazy = Arc::new(LazyEmbedder::new(CountingLoader {
            loads: loads.clone(),
            fail_first: false,
        }));

        let mut handles = Vec::new();
        for i in 0..16 {
            let lazy = lazy.clone();
            handles.push(tokio::spawn(async move {
                lazy.embed(&format!("text {i}")).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), vec![1.0, 0.0]);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(lazy.is_initialized());
    }

    #[tokio::test]
    async fn failed_initialization_is_retried_by_the_next_caller() {
        let loads = Arc::new(AtomicUsize::new(0));
        let lazy = LazyEmbedder::new(CountingLoader {
            loads: loads.clone(),
            fail_first: true,
        });

        assert!(lazy.embed("a").await.is_err());
        assert!(!lazy.is_initialized());
        assert!(lazy.embed("b").await.is_ok());
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn warmup_loader_rejects_empty_embedding() {
        struct EmptyEmbedder;

        #[async_trait]
        impl Embedder for EmptyEmbedder {
            async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
                Ok(Vec::new())
            }
        }

        let loader = WarmupLoader::new("empty", Arc::new(EmptyEmbedder));
        assert!(matches!(loader.load().await, Err(LlmError::EmptyEmbedding)));
    }
}
