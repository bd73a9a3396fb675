use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::LlmSettings;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected backend response: {0}")]
    Decode(String),
    #[error("embedding model initialization failed: {0}")]
    Initialization(String),
    #[error("backend returned an empty embedding")]
    EmptyEmbedding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Sampling parameters passed with every generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 300,
        }
    }
}

impl From<&LlmSettings> for GenerationOptions {
    fn from(settings: &LlmSettings) -> Self {
        Self {
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        }
    }
}
