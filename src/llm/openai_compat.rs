use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ollama::{error_for_status, first_embedding};
use super::provider::{Embedder, FragmentStream, Generator};
use super::stream::{spawn_fragment_stream, LineEvent};
use super::types::{ChatMessage, GenerationOptions, LlmError};

/// Any server speaking the OpenAI REST dialect (LM Studio, vLLM, llama.cpp server, ...).
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
    request_timeout: Duration,
}

impl OpenAiCompatProvider {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            request_timeout,
        }
    }

    pub fn label(&self) -> String {
        format!("openai:{}", self.model)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    fn chat_body(&self, prompt: &str, options: &GenerationOptions, stream: bool) -> Value {
        json!({
            "model": self.model,
            "messages": [ChatMessage::user(prompt)],
            "stream": stream,
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        })
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// One SSE line of a streamed chat completion.
fn decode_sse_line(line: &str) -> LineEvent {
    let Some(data) = line.strip_prefix("data:") else {
        // event:, id:, and comment lines carry nothing for us
        return LineEvent::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return LineEvent::Done;
    }
    let Ok(json) = serde_json::from_str::<Value>(data) else {
        return LineEvent::Error(format!("malformed stream event: {}", data));
    };
    if let Some(message) = json["error"]["message"].as_str() {
        return LineEvent::Error(message.to_string());
    }
    match json["choices"][0]["delta"]["content"].as_str() {
        Some(content) if !content.is_empty() => LineEvent::Fragment(content.to_string()),
        _ => LineEvent::Skip,
    }
}

#[async_trait]
impl Generator for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/v1/models", self.base_url);
        let res = self
            .authorized(self.client.get(&url))
            .timeout(Duration::from_secs(5))
            .send()
            .await;
        match res {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let res = self
            .authorized(self.client.post(&url))
            .timeout(self.request_timeout)
            .json(&self.chat_body(prompt, options, false))
            .send()
            .await?;
        let completion: ChatCompletion = error_for_status(res).await?.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Decode("completion carried no content".to_string()))
    }

    async fn stream(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<FragmentStream, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let res = self
            .authorized(self.client.post(&url))
            .json(&self.chat_body(prompt, options, true))
            .send()
            .await?;
        let res = error_for_status(res).await?;

        Ok(spawn_fragment_stream(res, decode_sse_line))
    }
}

#[async_trait]
impl Embedder for OpenAiCompatProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": [text],
        });
        let res = self
            .authorized(self.client.post(&url))
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await?;
        let payload: Value = error_for_status(res).await?.json().await?;

        first_embedding(payload["data"].get(0).and_then(|item| item.get("embedding")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_lines_decode_deltas() {
        let line = r#"data: {"choices":[{"delta":{"content":" answer"}}]}"#;
        assert_eq!(decode_sse_line(line), LineEvent::Fragment(" answer".to_string()));

        let role_only = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(decode_sse_line(role_only), LineEvent::Skip);
    }

    #[test]
    fn sse_terminator_and_noise() {
        assert_eq!(decode_sse_line("data: [DONE]"), LineEvent::Done);
        assert_eq!(decode_sse_line("data:[DONE]"), LineEvent::Done);
        assert_eq!(decode_sse_line(": keep-alive"), LineEvent::Skip);
        assert_eq!(decode_sse_line("event: message"), LineEvent::Skip);
    }

    #[test]
    fn sse_error_payload_is_surfaced() {
        let line = r#"data: {"error":{"message":"context length exceeded"}}"#;
        assert_eq!(
            decode_sse_line(line),
            LineEvent::Error("context length exceeded".to_string())
        );
    }

    #[test]
    fn chat_body_wraps_prompt_as_single_user_message() {
        let provider = OpenAiCompatProvider::new(
            "http://localhost:1234/",
            "qwen2.5",
            None,
            Duration::from_secs(1),
        );
        let body = provider.chat_body("hello", &GenerationOptions::default(), false);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["max_tokens"], 300);
        assert_eq!(provider.label(), "openai:qwen2.5");
    }

    #[test]
    fn completion_payload_deserializes() {
        let payload = r#"{"choices":[{"message":{"role":"assistant","content":"42"}}]}"#;
        let completion: ChatCompletion = serde_json::from_str(payload).unwrap();
        assert_eq!(completion.choices[0].message.content.as_deref(), Some("42"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_live_openai_compatible_health() {
        let provider = OpenAiCompatProvider::new(
            "http://localhost:1234",
            "local-model",
            None,
            Duration::from_secs(30),
        );
        assert!(provider.health_check().await);
    }
}
