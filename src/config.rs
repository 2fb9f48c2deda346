use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Default Messages API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
/// Model used when `SHACL_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
/// Response budget used when `SHACL_MAX_TOKENS` is unset.
pub const DEFAULT_MAX_TOKENS: u32 = 8000;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for conversions.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key sent to the Messages API. Only conversions require it.
    pub anthropic_api_key: Option<String>,
    /// Base URL of the Messages API.
    pub anthropic_base_url: String,
    /// Model identifier.
    pub model: String,
    /// Upper bound on generated tokens per request.
    pub max_tokens: u32,
    /// Optional directory whose files override the built-in prompt templates.
    pub prompts_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anthropic_api_key: None,
            anthropic_base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            prompts_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load `.env` (when present) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|_| None)
    }

    /// Like [`Config::load`], but each variable is taken from `overrides` first when it
    /// yields a value.
    pub fn load_with<F>(overrides: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| overrides(key).or_else(|| env::var(key).ok()))?;
        tracing::debug!(
            base_url = %config.anthropic_base_url,
            model = %config.model,
            max_tokens = config.max_tokens,
            has_api_key = config.anthropic_api_key.is_some(),
            prompts_dir = ?config.prompts_dir,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            anthropic_api_key: optional("ANTHROPIC_API_KEY"),
            anthropic_base_url: optional("ANTHROPIC_BASE_URL")
                .unwrap_or(defaults.anthropic_base_url),
            model: optional("SHACL_MODEL").unwrap_or(defaults.model),
            max_tokens: optional("SHACL_MAX_TOKENS")
                .map(|value| {
                    value
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|tokens| *tokens > 0)
                        .ok_or_else(|| ConfigError::InvalidValue("SHACL_MAX_TOKENS".to_string()))
                })
                .transpose()?
                .unwrap_or(defaults.max_tokens),
            prompts_dir: optional("SHACL_PROMPTS_DIR").map(PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = Config::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config.anthropic_base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(config.anthropic_api_key.is_none());
        assert!(config.prompts_dir.is_none());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("ANTHROPIC_BASE_URL", "http://127.0.0.1:9000"),
            ("SHACL_MODEL", "claude-test"),
            ("SHACL_MAX_TOKENS", "1024"),
            ("SHACL_PROMPTS_DIR", "prompts"),
        ]))
        .expect("config");
        assert_eq!(config.anthropic_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.anthropic_base_url, "http://127.0.0.1:9000");
        assert_eq!(config.model, "claude-test");
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.prompts_dir, Some(PathBuf::from("prompts")));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config =
            Config::from_lookup(lookup(&[("ANTHROPIC_API_KEY", "   ")])).expect("config");
        assert!(config.anthropic_api_key.is_none());
    }

    #[test]
    fn invalid_max_tokens_is_rejected() {
        for value in ["lots", "0", "-5"] {
            let error = Config::from_lookup(lookup(&[("SHACL_MAX_TOKENS", value)]))
                .expect_err("invalid value");
            assert!(matches!(error, ConfigError::InvalidValue(name) if name == "SHACL_MAX_TOKENS"));
        }
    }
}
