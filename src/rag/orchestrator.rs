//! Retrieval-augmented answering: embed the question, pull the closest
//! chunks, wrap them in the instruction prompt and hand it to the generator.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use super::prompt::build_prompt;
use super::store::{StoreError, VectorStore};
use super::types::{QueryResult, Source};
use crate::core::config::{RagSettings, DEFAULT_TOP_K};
use crate::llm::{GenerationOptions, Generator, LlmError};

pub const FALLBACK_ANSWER: &str =
    "I couldn't find any relevant information in the knowledge base.";

#[derive(Debug, Error)]
pub enum RagError {
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] StoreError),
    #[error("generation failed: {0}")]
    Generation(#[from] LlmError),
    #[error("client disconnected before the answer was complete")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<Source>,
}

/// Wire events of a streamed answer, in order: any number of `Chunk`,
/// then exactly one `Done` or `Error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RagEvent {
    Chunk { chunk: String },
    Done { done: bool, sources: Vec<Source> },
    Error { error: String, done: bool },
}

impl RagEvent {
    pub fn chunk(text: impl Into<String>) -> Self {
        RagEvent::Chunk { chunk: text.into() }
    }

    pub fn done(sources: Vec<Source>) -> Self {
        RagEvent::Done {
            done: true,
            sources,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        RagEvent::Error {
            error: message.into(),
            done: true,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RagEvent::Chunk { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    pub top_k: usize,
    pub generation: GenerationOptions,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            generation: GenerationOptions::default(),
        }
    }
}

impl From<&RagSettings> for OrchestratorConfig {
    fn from(settings: &RagSettings) -> Self {
        Self {
            top_k: settings.top_k,
            generation: GenerationOptions::from(&settings.llm),
        }
    }
}

pub struct RagOrchestrator {
    store: Arc<VectorStore>,
    generator: Arc<dyn Generator>,
    config: OrchestratorConfig,
}

fn sources_of(results: &[QueryResult]) -> Vec<Source> {
    results
        .iter()
        .map(|result| Source::from(&result.metadata))
        .collect()
}

impl RagOrchestrator {
    pub fn new(
        store: Arc<VectorStore>,
        generator: Arc<dyn Generator>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            generator,
            config,
        }
    }

    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    async fn retrieve(&self, query: &str) -> Result<Vec<QueryResult>, StoreError> {
        let started = Instant::now();
        let results = self.store.query(query, self.config.top_k).await?;
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Vector search returned {} documents",
            results.len()
        );
        Ok(results)
    }

    pub async fn answer(&self, query: &str) -> Result<RagAnswer, RagError> {
        let started = Instant::now();
        let results = self.retrieve(query).await?;
        if results.is_empty() {
            return Ok(RagAnswer {
                answer: FALLBACK_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let prompt = build_prompt(query, &results);
        let generation_started = Instant::now();
        let answer = self
            .generator
            .generate(&prompt, &self.config.generation)
            .await?;

        tracing::info!(
            generation_ms = generation_started.elapsed().as_millis() as u64,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Answered query with {}",
            self.generator.name()
        );

        Ok(RagAnswer {
            answer,
            sources: sources_of(&results),
        })
    }

    /// Streams the answer into `sink` as it is generated. Retrieval happens
    /// once; its sources feed both the prompt and the terminal event.
    ///
    /// Failures are reported on `sink` as a terminal `Error` event before
    /// being returned. If the receiving side goes away the backend request
    /// is abandoned and `RagError::Cancelled` is returned.
    pub async fn answer_streaming(
        &self,
        query: &str,
        sink: mpsc::Sender<RagEvent>,
    ) -> Result<RagAnswer, RagError> {
        let started = Instant::now();
        let results = match self.retrieve(query).await {
            Ok(results) => results,
            Err(err) => {
                let _ = sink.send(RagEvent::error(err.to_string())).await;
                return Err(err.into());
            }
        };

        if results.is_empty() {
            sink.send(RagEvent::chunk(FALLBACK_ANSWER))
                .await
                .map_err(|_| RagError::Cancelled)?;
            sink.send(RagEvent::done(Vec::new()))
                .await
                .map_err(|_| RagError::Cancelled)?;
            return Ok(RagAnswer {
                answer: FALLBACK_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let sources = sources_of(&results);
        let prompt = build_prompt(query, &results);
        let generation_started = Instant::now();

        let mut fragments = match self
            .generator
            .stream(&prompt, &self.config.generation)
            .await
        {
            Ok(fragments) => fragments,
            Err(err) => {
                let _ = sink.send(RagEvent::error(err.to_string())).await;
                return Err(err.into());
            }
        };

        let mut answer = String::new();
        loop {
            let next = tokio::select! {
                _ = sink.closed() => {
                    tracing::info!("Stream consumer detached; abandoning generation");
                    return Err(RagError::Cancelled);
                }
                next = fragments.recv() => next,
            };

            match next {
                Some(Ok(fragment)) => {
                    answer.push_str(&fragment);
                    sink.send(RagEvent::chunk(fragment))
                        .await
                        .map_err(|_| RagError::Cancelled)?;
                }
                Some(Err(err)) => {
                    tracing::warn!("Generation stream failed: {}", err);
                    let _ = sink.send(RagEvent::error(err.to_string())).await;
                    return Err(err.into());
                }
                None => break,
            }
        }

        sink.send(RagEvent::done(sources.clone()))
            .await
            .map_err(|_| RagError::Cancelled)?;

        tracing::info!(
            generation_ms = generation_started.elapsed().as_millis() as u64,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Streamed {} characters with {}",
            answer.len(),
            self.generator.name()
        );

        Ok(RagAnswer { answer, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn events_serialize_to_wire_shapes() {
        assert_eq!(
            serde_json::to_value(RagEvent::chunk("The")).unwrap(),
            json!({"chunk": "The"})
        );
        assert_eq!(
            serde_json::to_value(RagEvent::done(vec![Source {
                source: "faq.txt".to_string(),
                chunk: 2
            }]))
            .unwrap(),
            json!({"done": true, "sources": [{"source": "faq.txt", "chunk": 2}]})
        );
        assert_eq!(
            serde_json::to_value(RagEvent::error("backend down")).unwrap(),
            json!({"error": "backend down", "done": true})
        );
    }

    #[test]
    fn only_chunks_are_non_terminal() {
        assert!(!RagEvent::chunk("x").is_terminal());
        assert!(RagEvent::done(Vec::new()).is_terminal());
        assert!(RagEvent::error("x").is_terminal());
    }
}
