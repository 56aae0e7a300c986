use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::{LlmConfig, DEFAULT_API_URL, DEFAULT_MODEL};

/// Application configuration loaded from environment variables.
/// Fails at startup if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    /// Upper bound for one resume's judgment call, retries included.
    pub evaluation_timeout: Duration,
    pub max_concurrent_evaluations: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key)
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let timeout_secs: u64 = parse_var(&lookup, "EVALUATION_TIMEOUT_SECS", 120)?;
        let evaluation_timeout = Duration::from_secs(timeout_secs);

        let llm = LlmConfig {
            api_url: or_default("LLM_API_URL", DEFAULT_API_URL),
            model: or_default("LLM_MODEL", DEFAULT_MODEL),
            max_tokens: parse_var(&lookup, "LLM_MAX_TOKENS", 4096)?,
            temperature: parse_var(&lookup, "LLM_TEMPERATURE", 0.3)?,
            max_retries: parse_var(&lookup, "LLM_MAX_RETRIES", 3)?,
            request_timeout: evaluation_timeout,
            ..LlmConfig::new(require("ANTHROPIC_API_KEY")?)
        };

        Ok(Config {
            llm,
            evaluation_timeout,
            max_concurrent_evaluations: parse_var(&lookup, "MAX_CONCURRENT_EVALUATIONS", 4)?,
            port: parse_var(&lookup, "PORT", 8080)?,
            rust_log: or_default("RUST_LOG", "info"),
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_only_api_key() {
        let config = load(&[("ANTHROPIC_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.llm.api_url, DEFAULT_API_URL);
        assert_eq!(config.llm.max_retries, 3);
        assert!((config.llm.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.evaluation_timeout, Duration::from_secs(120));
        assert_eq!(config.max_concurrent_evaluations, 4);
        assert_eq!(config.port, 8080);
        assert_eq!(config.rust_log, "info");
    }

    #[test]
    fn test_missing_api_key_fails() {
        let err = load(&[]).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = load(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("LLM_MODEL", "claude-haiku-4-5"),
            ("EVALUATION_TIMEOUT_SECS", "30"),
            ("MAX_CONCURRENT_EVALUATIONS", " 8 "),
            ("PORT", "9000"),
        ])
        .unwrap();
        assert_eq!(config.llm.model, "claude-haiku-4-5");
        assert_eq!(config.evaluation_timeout, Duration::from_secs(30));
        assert_eq!(config.llm.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_concurrent_evaluations, 8);
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let err = load(&[("ANTHROPIC_API_KEY", "sk-test"), ("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
