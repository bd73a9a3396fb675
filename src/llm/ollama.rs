use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{Embedder, FragmentStream, Generator};
use super::stream::{spawn_fragment_stream, LineEvent};
use super::types::{GenerationOptions, LlmError};

/// Ollama's native API: `/api/generate` for text, `/api/embed` for vectors.
#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    model: String,
    client: Client,
    request_timeout: Duration,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            request_timeout,
        }
    }

    fn generate_body(&self, prompt: &str, options: &GenerationOptions, stream: bool) -> Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "stream": stream,
            "options": {
                "temperature": options.temperature,
                "num_predict": options.max_tokens,
            }
        })
    }
}

pub(crate) async fn error_for_status(res: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    Err(LlmError::Status { status, body })
}

/// One NDJSON line of `/api/generate` with `stream: true`.
fn decode_generate_line(line: &str) -> LineEvent {
    let Ok(value) = serde_json::from_str::<Value>(line) else {
        return LineEvent::Error(format!("malformed stream line: {}", line));
    };
    if let Some(err) = value.get("error").and_then(Value::as_str) {
        return LineEvent::Error(err.to_string());
    }
    if let Some(text) = value.get("response").and_then(Value::as_str) {
        if !text.is_empty() {
            return LineEvent::Fragment(text.to_string());
        }
    }
    if value.get("done").and_then(Value::as_bool) == Some(true) {
        return LineEvent::Done;
    }
    LineEvent::Skip
}

#[async_trait]
impl Generator for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let res = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(&self.generate_body(prompt, options, false))
            .send()
            .await?;
        let payload: Value = error_for_status(res).await?.json().await?;

        payload
            .get("response")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::Decode("missing 'response' field".to_string()))
    }

    async fn stream(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<FragmentStream, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let res = self
            .client
            .post(&url)
            .json(&self.generate_body(prompt, options, true))
            .send()
            .await?;
        let res = error_for_status(res).await?;

        Ok(spawn_fragment_stream(res, decode_generate_line))
    }
}

#[derive(Clone)]
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: Client,
}

impl OllamaEmbedder {
    pub fn new(base_url: &str, model: &str, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn label(&self) -> String {
        format!("ollama:{}", self.model)
    }
}

pub(crate) fn first_embedding(vectors: Option<&Value>) -> Result<Vec<f32>, LlmError> {
    let values = vectors
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::Decode("missing embedding array".to_string()))?;
    let embedding: Vec<f32> = values
        .iter()
        .filter_map(|v| v.as_f64().map(|f| f as f32))
        .collect();
    if embedding.is_empty() {
        return Err(LlmError::EmptyEmbedding);
    }
    Ok(embedding)
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let url = format!("{}/api/embed", self.base_url);
        let body = json!({
            "model": self.model,
            "input": text,
        });
        let res = self.client.post(&url).json(&body).send().await?;
        let payload: Value = error_for_status(res).await?.json().await?;

        first_embedding(payload.get("embeddings").and_then(|e| e.get(0)))
    }
}
