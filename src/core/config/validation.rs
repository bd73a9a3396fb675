use serde_json::{Map, Value};

use super::ConfigError;

pub fn validate_config(config: &Value) -> Result<(), ConfigError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65_535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(store) = expect_optional_object(root, "store")? {
        validate_optional_string_field(store, "store.path", "path")?;
    }

    if let Some(chunking) = expect_optional_object(root, "chunking")? {
        validate_u64_field(chunking, "chunking.size", "size", 1, 1_000_000)?;
        validate_u64_field(chunking, "chunking.overlap", "overlap", 0, 1_000_000)?;
        validate_u64_field(
            chunking,
            "chunking.min_chunk_chars",
            "min_chunk_chars",
            0,
            1_000_000,
        )?;

        let size = chunking.get("size").and_then(Value::as_u64).unwrap_or(500);
        let overlap = chunking
            .get("overlap")
            .and_then(Value::as_u64)
            .unwrap_or(100);
        if overlap >= size {
            return Err(ConfigError::Invalid(format!(
                "Invalid config at 'chunking.overlap': must be smaller than chunking.size ({} >= {})",
                overlap, size
            )));
        }
    }

    if let Some(retrieval) = expect_optional_object(root, "retrieval")? {
        validate_u64_field(retrieval, "retrieval.top_k", "top_k", 1, 50)?;
    }

    if let Some(llm) = expect_optional_object(root, "llm")? {
        if let Some(provider) = llm.get("provider") {
            match provider.as_str() {
                Some("ollama") | Some("openai") => {}
                Some(other) => {
                    return Err(ConfigError::Invalid(format!(
                        "Invalid config at 'llm.provider': unknown provider '{}' (expected 'ollama' or 'openai')",
                        other
                    )))
                }
                None => return Err(config_type_error("llm.provider", "string")),
            }
        }
        validate_optional_string_field(llm, "llm.base_url", "base_url")?;
        validate_optional_string_field(llm, "llm.generation_model", "generation_model")?;
        validate_optional_string_field(llm, "llm.embedding_model", "embedding_model")?;
        validate_optional_string_field(llm, "llm.api_key", "api_key")?;
        validate_f64_field(llm, "llm.temperature", "temperature", 0.0, 2.0)?;
        validate_u64_field(llm, "llm.max_tokens", "max_tokens", 1, 1_000_000)?;
        validate_u64_field(
            llm,
            "llm.request_timeout_secs",
            "request_timeout_secs",
            1,
            86_400,
        )?;
    }

    if let Some(web) = expect_optional_object(root, "web")? {
        validate_u64_field(web, "web.fetch_timeout_secs", "fetch_timeout_secs", 1, 86_400)?;
    }

    if let Some(ingest) = expect_optional_object(root, "ingest")? {
        validate_optional_string_field(ingest, "ingest.data_dir", "data_dir")?;
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ConfigError::Invalid(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_f64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: f64,
    max: f64,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_f64() else {
        return Err(config_type_error(path, "number"));
    };
    if number < min || number > max {
        return Err(ConfigError::Invalid(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ConfigError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ConfigError {
    ConfigError::Invalid(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
