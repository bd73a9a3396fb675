//! Typed view over the merged YAML configuration.
//!
//! Every value has a default, so an empty `config.yml` (or none at all)
//! yields a working local setup: Ollama on its default port, 500/100
//! character chunks and top-5 retrieval.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use super::AppPaths;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;
pub const DEFAULT_MIN_CHUNK_CHARS: usize = 50;
pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    OpenAi,
}

impl ProviderKind {
    fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::Ollama => "http://localhost:11434",
            ProviderKind::OpenAi => "http://localhost:1234",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingSettings {
    pub size: usize,
    pub overlap: usize,
    /// Chunks whose trimmed length is not above this are not indexed on upload.
    pub min_chunk_chars: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            min_chunk_chars: DEFAULT_MIN_CHUNK_CHARS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: ProviderKind,
    pub base_url: String,
    pub generation_model: String,
    pub embedding_model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
}

impl Default for LlmSettings {
    fn default() -> Self {
        let provider = ProviderKind::Ollama;
        Self {
            provider,
            base_url: provider.default_base_url().to_string(),
            generation_model: "llama3.2".to_string(),
            embedding_model: "all-minilm".to_string(),
            api_key: None,
            temperature: 0.3,
            max_tokens: 300,
            request_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RagSettings {
    pub chunking: ChunkingSettings,
    pub top_k: usize,
    pub llm: LlmSettings,
    pub web_fetch_timeout: Duration,
    pub server: ServerSettings,
    pub store_path: PathBuf,
    pub ingest_data_dir: PathBuf,
}

impl RagSettings {
    pub fn from_config(config: &Value, paths: &AppPaths) -> Self {
        let chunking = ChunkingSettings {
            size: section_u64(config, "chunking", "size")
                .map(|v| v as usize)
                .unwrap_or(DEFAULT_CHUNK_SIZE)
                .max(1),
            overlap: section_u64(config, "chunking", "overlap")
                .map(|v| v as usize)
                .unwrap_or(DEFAULT_CHUNK_OVERLAP),
            min_chunk_chars: section_u64(config, "chunking", "min_chunk_chars")
                .map(|v| v as usize)
                .unwrap_or(DEFAULT_MIN_CHUNK_CHARS),
        };

        let top_k = section_u64(config, "retrieval", "top_k")
            .unwrap_or(DEFAULT_TOP_K as u64)
            .clamp(1, 50) as usize;

        let provider = match section_str(config, "llm", "provider") {
            Some("openai") => ProviderKind::OpenAi,
            _ => ProviderKind::Ollama,
        };
        let llm = LlmSettings {
            provider,
            base_url: section_str(config, "llm", "base_url")
                .unwrap_or(provider.default_base_url())
                .trim_end_matches('/')
                .to_string(),
            generation_model: section_str(config, "llm", "generation_model")
                .unwrap_or("llama3.2")
                .to_string(),
            embedding_model: section_str(config, "llm", "embedding_model")
                .unwrap_or("all-minilm")
                .to_string(),
            api_key: section_str(config, "llm", "api_key").map(str::to_string),
            temperature: config
                .get("llm")
                .and_then(|v| v.get("temperature"))
                .and_then(Value::as_f64)
                .unwrap_or(0.3)
                .clamp(0.0, 2.0) as f32,
            max_tokens: section_u64(config, "llm", "max_tokens")
                .unwrap_or(300)
                .clamp(1, u32::MAX as u64) as u32,
            request_timeout: Duration::from_secs(
                section_u64(config, "llm", "request_timeout_secs").unwrap_or(120),
            ),
        };

        let server = ServerSettings {
            host: section_str(config, "server", "host")
                .unwrap_or("127.0.0.1")
                .to_string(),
            port: section_u64(config, "server", "port")
                .and_then(|v| u16::try_from(v).ok())
                .unwrap_or(3000),
            cors_allowed_origins: config
                .get("server")
                .and_then(|v| v.get("cors_allowed_origins"))
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::trim)
                        .filter(|item| !item.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        };

        let store_path = section_str(config, "store", "path")
            .map(|raw| resolve_path(raw, paths))
            .unwrap_or_else(|| paths.store_path.clone());

        let ingest_data_dir = section_str(config, "ingest", "data_dir")
            .map(|raw| resolve_path(raw, paths))
            .unwrap_or_else(|| paths.project_root.join("data"));

        Self {
            chunking,
            top_k,
            llm,
            web_fetch_timeout: Duration::from_secs(
                section_u64(config, "web", "fetch_timeout_secs").unwrap_or(30),
            ),
            server,
            store_path,
            ingest_data_dir,
        }
    }
}

fn section_u64(config: &Value, section: &str, key: &str) -> Option<u64> {
    config
        .get(section)
        .and_then(|v| v.get(key))
        .and_then(Value::as_u64)
}

fn section_str<'a>(config: &'a Value, section: &str, key: &str) -> Option<&'a str> {
    config
        .get(section)
        .and_then(|v| v.get(key))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn resolve_path(raw: &str, paths: &AppPaths) -> PathBuf {
    let candidate = PathBuf::from(raw);
    if candidate.is_absolute() {
        candidate
    } else {
        paths.user_data_dir.join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn paths() -> (tempfile::TempDir, AppPaths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::with_data_dir(dir.path().to_path_buf(), dir.path().to_path_buf());
        (dir, paths)
    }

    #[test]
    fn defaults_match_the_documented_pipeline() {
        let (_dir, paths) = paths();
        let settings = RagSettings::from_config(&json!({}), &paths);

        assert_eq!(settings.chunking, ChunkingSettings::default());
        assert_eq!(settings.top_k, 5);
        assert_eq!(settings.llm.provider, ProviderKind::Ollama);
        assert_eq!(settings.llm.base_url, "http://localhost:11434");
        assert_eq!(settings.llm.generation_model, "llama3.2");
        assert_eq!(settings.llm.max_tokens, 300);
        assert!((settings.llm.temperature - 0.3).abs() < 1e-6);
        assert_eq!(settings.store_path, paths.store_path);
    }

    #[test]
    fn openai_provider_gets_its_own_default_url() {
        let (_dir, paths) = paths();
        let settings = RagSettings::from_config(&json!({"llm": {"provider": "openai"}}), &paths);
        assert_eq!(settings.llm.provider, ProviderKind::OpenAi);
        assert_eq!(settings.llm.base_url, "http://localhost:1234");
    }

    #[test]
    fn relative_store_path_is_resolved_against_data_dir() {
        let (dir, paths) = paths();
        let settings =
            RagSettings::from_config(&json!({"store": {"path": "db/v.json"}}), &paths);
        assert_eq!(settings.store_path, dir.path().join("db/v.json"));
    }

    #[test]
    fn top_k_is_clamped() {
        let (_dir, paths) = paths();
        let settings = RagSettings::from_config(&json!({"retrieval": {"top_k": 500}}), &paths);
        assert_eq!(settings.top_k, 50);
    }
}
