//! Configuration module for the AI Gateway.
//!
//! Loads configuration from YAML files and environment variables.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub safety: SafetyConfig,
    pub providers: ProvidersConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Service authentication.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared bearer token expected from callers. Empty disables the check.
    pub service_token: String,
}

impl AuthConfig {
    pub fn enabled(&self) -> bool {
        !self.service_token.trim().is_empty()
    }
}

/// Safety pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    /// Level used when a request does not name one: strict, moderate or standard.
    pub default_level: String,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            default_level: "strict".to_string(),
        }
    }
}

/// Per-backend settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub openai: ProviderConfig,
    pub anthropic: ProviderConfig,
}

/// Connection settings for one LLM backend.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: String,
    /// Overrides the backend's public endpoint (used for proxies and tests).
    pub base_url: Option<String>,
    /// Timeout for non-streaming calls.
    pub timeout_secs: Option<u64>,
    /// Timeout for a whole streaming call.
    pub stream_timeout_secs: Option<u64>,
    /// Overrides the backend's default model list.
    pub models: Vec<String>,
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (AI_GATEWAY__*)
    /// 2. config/local.yaml (if exists)
    /// 3. config/default.yaml
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("AI_GATEWAY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.safety.default_level, "strict");
        assert!(!config.auth.enabled());
        assert!(config.providers.openai.models.is_empty());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
auth:
  service_token: "secret"
providers:
  anthropic:
    api_key: "sk-ant"
    timeout_secs: 30
"#;
        let config: Config = ConfigLoader::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(config.auth.enabled());
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.safety.default_level, "strict");
        assert_eq!(config.providers.anthropic.api_key, "sk-ant");
        assert_eq!(config.providers.anthropic.timeout_secs, Some(30));
        assert_eq!(config.providers.openai.api_key, "");
    }
}
