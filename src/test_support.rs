//! Deterministic stand-ins for the model backends, shared by unit tests.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::config::{AppPaths, ConfigService, RagSettings};
use crate::llm::{Embedder, FragmentStream, GenerationOptions, Generator, LlmError};
use crate::rag::VectorStore;
use crate::state::AppState;

/// Letter-frequency vector: identical texts embed identically, texts with
/// no letters in common are orthogonal.
#[derive(Default)]
pub struct BagOfCharsEmbedder {
    pub calls: AtomicUsize,
}

impl BagOfCharsEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for BagOfCharsEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut vector = vec![0.0f32; 27];
        for c in text.chars().flat_map(char::to_lowercase) {
            if c.is_ascii_lowercase() {
                vector[(c as u8 - b'a') as usize] += 1.0;
            } else if c.is_alphanumeric() {
                vector[26] += 1.0;
            }
        }
        Ok(vector)
    }
}

/// Replays a fixed list of fragments and records every prompt it sees.
pub struct ScriptedGenerator {
    fragments: Vec<String>,
    fail_with: Option<String>,
    pub generate_calls: AtomicUsize,
    pub stream_calls: AtomicUsize,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            fail_with: None,
            generate_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Streams the scripted fragments, then fails with `message`.
    pub fn failing(fragments: &[&str], message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new(fragments)
        }
    }

    pub fn calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst) + self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(message) = &self.fail_with {
            return Err(LlmError::Decode(message.clone()));
        }
        Ok(self.fragments.concat())
    }

    async fn stream(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<FragmentStream, LlmError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        let (tx, rx) = mpsc::channel(self.fragments.len() + 1);
        for fragment in &self.fragments {
            let _ = tx.try_send(Ok(fragment.clone()));
        }
        if let Some(message) = &self.fail_with {
            let _ = tx.try_send(Err(LlmError::Decode(message.clone())));
        }
        Ok(rx)
    }
}

/// Sends one fragment and then holds the stream open until the receiver is
/// dropped, recording that the abort was observed.
#[derive(Default)]
pub struct HangingGenerator {
    pub aborted: Arc<AtomicBool>,
}

#[async_trait]
impl Generator for HangingGenerator {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn health_check(&self) -> bool {
        false
    }

    async fn generate(
        &self,
        _prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        Err(LlmError::Decode("not supported".to_string()))
    }

    async fn stream(
        &self,
        _prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<FragmentStream, LlmError> {
        let (tx, rx) = mpsc::channel(4);
        let aborted = self.aborted.clone();
        tokio::spawn(async move {
            let _ = tx.send(Ok("partial".to_string())).await;
            tx.closed().await;
            aborted.store(true, Ordering::SeqCst);
        });
        Ok(rx)
    }
}

pub async fn open_store(dir: &Path, embedder: Arc<BagOfCharsEmbedder>) -> Arc<VectorStore> {
    Arc::new(
        VectorStore::open(dir.join(".vectordb").join("vectors.json"), embedder)
            .await
            .unwrap(),
    )
}

/// Application state rooted at `dir` (config, data and store all inside
/// it) with the bag-of-characters embedder and the given generator.
pub async fn test_state(
    dir: &Path,
    generator: ScriptedGenerator,
) -> (Arc<AppState>, Arc<ScriptedGenerator>) {
    let paths = Arc::new(AppPaths::with_data_dir(dir.to_path_buf(), dir.to_path_buf()));
    let config = ConfigService::with_config_path(paths.clone(), dir.join("config.yml"));
    let settings = RagSettings::from_config(&config.load_config().unwrap(), &paths);
    let generator = Arc::new(generator);
    let state = AppState::assemble(
        config,
        settings,
        generator.clone(),
        Arc::new(BagOfCharsEmbedder::default()),
    )
    .await
    .unwrap();
    (state, generator)
}
