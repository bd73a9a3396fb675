//! `config.yml` plus an optional `secrets.yaml` overlay, validated as one
//! JSON document.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use super::paths::AppPaths;
use super::validation::validate_config;
use super::ConfigError;

const REDACTED: &str = "****";

#[derive(Clone)]
pub struct ConfigService {
    paths: Arc<AppPaths>,
    explicit_path: Option<PathBuf>,
}

impl ConfigService {
    pub fn new(paths: Arc<AppPaths>) -> Self {
        Self {
            paths,
            explicit_path: None,
        }
    }

    /// Uses `path` instead of the discovered `config.yml`.
    pub fn with_config_path(paths: Arc<AppPaths>, path: PathBuf) -> Self {
        Self {
            paths,
            explicit_path: Some(path),
        }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Explicit path, then `RAGDESK_CONFIG_PATH`, then the data dir copy if
    /// it exists, then the project root.
    pub fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.explicit_path {
            return path.clone();
        }
        if let Ok(path) = env::var("RAGDESK_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        let in_data_dir = self.paths.user_data_dir.join("config.yml");
        if in_data_dir.exists() {
            in_data_dir
        } else {
            self.paths.project_root.join("config.yml")
        }
    }

    pub fn load_config(&self) -> Result<Value, ConfigError> {
        let mut config = Value::Object(read_yaml_object(&self.config_path()));
        overlay(&mut config, Value::Object(read_yaml_object(&self.paths.secrets_path)));
        validate_config(&config)?;
        Ok(config)
    }

    /// Copy of `config` with credential values masked, for display.
    pub fn redacted(&self, config: &Value) -> Value {
        let mut copy = config.clone();
        redact(&mut copy);
        copy
    }
}

/// A missing, unreadable or non-mapping file counts as empty.
fn read_yaml_object(path: &Path) -> Map<String, Value> {
    let Ok(contents) = fs::read_to_string(path) else {
        return Map::new();
    };
    match serde_yaml::from_str::<Value>(&contents) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(err) => {
            tracing::warn!("Ignoring unreadable config {}: {}", path.display(), err);
            Map::new()
        }
    }
}

/// Mappings merge key by key; anything else in `top` replaces `base`.
fn overlay(base: &mut Value, top: Value) {
    match (base, top) {
        (Value::Object(base), Value::Object(top)) => {
            for (key, value) in top {
                match base.get_mut(&key) {
                    Some(existing) => overlay(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, top) => *base = top,
    }
}

/// `llm.api_key` and anything named like a secret. `max_tokens` is a limit.
fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.ends_with("api_key")
        || key.contains("secret")
        || key.contains("password")
        || (key.contains("token") && !key.ends_with("tokens"))
}

fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                if is_secret_key(key) && !item.is_null() {
                    *item = Value::String(REDACTED.to_string());
                } else {
                    redact(item);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service_in(dir: &Path) -> ConfigService {
        let paths = Arc::new(AppPaths::with_data_dir(
            dir.to_path_buf(),
            dir.to_path_buf(),
        ));
        ConfigService::with_config_path(paths, dir.join("config.yml"))
    }

    #[test]
    fn overlay_merges_mappings_and_replaces_the_rest() {
        let mut base = json!({"llm": {"provider": "ollama", "max_tokens": 300}, "origins": ["a", "b"]});
        overlay(
            &mut base,
            json!({"llm": {"max_tokens": 50, "api_key": "k"}, "origins": ["c"]}),
        );

        assert_eq!(
            base,
            json!({"llm": {"provider": "ollama", "max_tokens": 50, "api_key": "k"}, "origins": ["c"]})
        );
    }

    #[test]
    fn missing_config_loads_as_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let config = service_in(dir.path()).load_config().unwrap();
        assert_eq!(config, json!({}));
    }

    #[test]
    fn secrets_are_merged_over_public_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yml"),
            "llm:\n  provider: openai\n  base_url: http://localhost:1234\n",
        )
        .unwrap();
        fs::write(dir.path().join("secrets.yaml"), "llm:\n  api_key: sk-test\n").unwrap();

        let config = service_in(dir.path()).load_config().unwrap();

        assert_eq!(config["llm"]["provider"], "openai");
        assert_eq!(config["llm"]["api_key"], "sk-test");
    }

    #[test]
    fn non_mapping_yaml_is_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.yml"), "- just\n- a list\n").unwrap();
        assert_eq!(service_in(dir.path()).load_config().unwrap(), json!({}));
    }

    #[test]
    fn invalid_sections_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yml"),
            "chunking:\n  size: 100\n  overlap: 100\n",
        )
        .unwrap();

        assert!(service_in(dir.path()).load_config().is_err());
    }

    #[test]
    fn only_credentials_are_redacted() {
        let dir = tempfile::tempdir().unwrap();
        let config = json!({
            "llm": {"api_key": "sk-live", "max_tokens": 300, "embedding_model": "all-minilm"},
            "web": {"proxy_password": "pw", "access_token": null}
        });

        assert_eq!(
            service_in(dir.path()).redacted(&config),
            json!({
                "llm": {"api_key": "****", "max_tokens": 300, "embedding_model": "all-minilm"},
                "web": {"proxy_password": "****", "access_token": null}
            })
        );
    }
}
