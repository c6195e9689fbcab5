use std::collections::HashMap;
use std::env::VarError;
use std::path::{Path, PathBuf};

use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_SECRETS_PATH: &str = "./config/secrets.yaml";

/// Load application configuration.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files, then resolves every
/// setting from the most specific source available: process environment,
/// then the YAML secrets file (`FINRAG_SECRETS_PATH`), then the built-in
/// default.
///
/// # Errors
///
/// Returns `ConfigError` if the secrets file exists but cannot be read or
/// parsed, if a required value is missing, or if a value is invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();

    let secrets_path = std::env::var("FINRAG_SECRETS_PATH")
        .map_or_else(|_| PathBuf::from(DEFAULT_SECRETS_PATH), PathBuf::from);
    let secrets = load_secrets_file(&secrets_path)?;

    build_app_config(|key| std::env::var(key).or_else(|_| lookup_secret(&secrets, key)))
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this reads neither `.env` nor the secrets file.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Read a flat `KEY: value` YAML map of secrets.
///
/// A missing file is an empty source, not an error. Scalar values are
/// stringified; nested values are ignored.
fn load_secrets_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => {
            return Err(ConfigError::SecretsFileIo {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    parse_secrets(&content).map_err(|e| ConfigError::SecretsFileParse {
        path: path.to_path_buf(),
        source: e,
    })
}

fn parse_secrets(content: &str) -> Result<HashMap<String, String>, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(HashMap::new());
    }

    let raw: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(content)?;
    Ok(raw
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key, value))
        })
        .collect())
}

fn lookup_secret(secrets: &HashMap<String, String>, key: &str) -> Result<String, VarError> {
    secrets.get(key).cloned().ok_or(VarError::NotPresent)
}

/// Build application configuration using the provided lookup function.
///
/// This is the parsing/validation logic, decoupled from where values come
/// from so it can be tested with a pure `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let env = parse_environment(&or_default("FINRAG_ENV", "development"))?;

    let bind_addr = parse_addr("FINRAG_BIND_ADDR", "0.0.0.0:8000")?;
    let log_level = or_default("FINRAG_LOG_LEVEL", "info");
    let request_timeout_secs = parse_u64("FINRAG_REQUEST_TIMEOUT_SECS", "60")?;

    let qdrant_url = or_default("QDRANT_URL", "http://localhost:6333")
        .trim_end_matches('/')
        .to_string();
    let qdrant_api_key = optional("QDRANT_API_KEY");
    let collection_name = or_default("COLLECTION_NAME", "finrag_docs");
    if collection_name.trim().is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "COLLECTION_NAME".to_string(),
            reason: "collection name must not be empty".to_string(),
        });
    }
    let data_path = PathBuf::from(or_default(
        "DATA_PATH",
        "data/financial_phrasebank_50agree.csv",
    ));

    let tei_url = or_default("TEI_URL", "http://localhost:8080")
        .trim_end_matches('/')
        .to_string();
    let embed_model = or_default("EMBED_MODEL", "sentence-transformers/all-MiniLM-L6-v2");
    let embed_dim = parse_usize("EMBED_DIM", "384")?;
    if embed_dim == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "EMBED_DIM".to_string(),
            reason: "dimension must be greater than zero".to_string(),
        });
    }

    let google_api_key = optional("GOOGLE_API_KEY");
    if env == Environment::Production && google_api_key.is_none() {
        return Err(ConfigError::MissingEnvVar("GOOGLE_API_KEY".to_string()));
    }
    let llm_model = or_default("LLM_MODEL", "gemini-2.5-flash");
    let gemini_base_url = or_default(
        "GEMINI_BASE_URL",
        "https://generativelanguage.googleapis.com",
    )
    .trim_end_matches('/')
    .to_string();

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        request_timeout_secs,
        qdrant_url,
        qdrant_api_key,
        collection_name,
        data_path,
        tei_url,
        embed_model,
        embed_dim,
        google_api_key,
        llm_model,
        gemini_base_url,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FINRAG_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
