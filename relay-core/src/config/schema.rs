//! Configuration schema structures with serde support

use super::error::{ConfigError, ValidationError};
use super::secrets::SecretString;
use crate::providers::ProviderKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Resolved configuration for one client instance.
///
/// Immutable once handed to a client.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Provider identifier (openai, anthropic, groq, lm-studio, azure, deepseek)
    pub provider: String,

    pub model: String,

    /// Overrides the provider's canonical endpoint
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Seconds allowed for establishing a connection
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: f64,

    /// Seconds allowed between received chunks
    #[serde(default = "default_read_timeout")]
    pub read_timeout: f64,

    /// Provider-specific parameters such as `max_tokens` or `top_p`
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl LlmConfig {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            base_url: None,
            api_key: None,
            temperature: default_temperature(),
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            extra: Map::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<SecretString>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeouts(mut self, connect_timeout: f64, read_timeout: f64) -> Self {
        self.connect_timeout = connect_timeout;
        self.read_timeout = read_timeout;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn connect_timeout_duration(&self) -> Duration {
        secs_to_duration(self.connect_timeout)
    }

    pub fn read_timeout_duration(&self) -> Duration {
        secs_to_duration(self.read_timeout)
    }

    pub fn extra_u64(&self, key: &str) -> Option<u64> {
        self.extra.get(key).and_then(Value::as_u64)
    }

    pub fn extra_f64(&self, key: &str) -> Option<f64> {
        self.extra.get(key).and_then(Value::as_f64)
    }

    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Range and format checks; the provider identifier is checked by the
    /// client factory.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.model.is_empty() {
            return Err(ValidationError::required("model"));
        }
        if let Some(base_url) = &self.base_url {
            validate_url("base_url", base_url)?;
        }
        validate_temperature("temperature", self.temperature)?;
        validate_timeout("connect_timeout", self.connect_timeout)?;
        validate_timeout("read_timeout", self.read_timeout)
    }

    /// Credential value, if one is configured and non-empty
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .filter(|key| !key.is_empty())
            .map(SecretString::expose_secret)
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

/// Root of a configuration file
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Named call profiles
    #[serde(default = "default_agents")]
    pub agent: HashMap<String, AgentSettings>,

    /// Connection settings keyed by provider identifier
    #[serde(default = "default_providers")]
    pub llm: HashMap<String, ProviderSettings>,

    #[serde(default)]
    pub log: LogConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            agent: default_agents(),
            llm: default_providers(),
            log: LogConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Resolve the client configuration for a named agent profile
    pub fn llm_for_agent(&self, name: &str) -> Result<LlmConfig, ConfigError> {
        let agent = self.agent.get(name).ok_or_else(|| ConfigError::Missing {
            what: "agent",
            name: name.to_string(),
        })?;

        let mut config = self.llm_for_provider(&agent.provider, &agent.model)?;
        config.temperature = agent.temperature;
        Ok(config)
    }

    /// Resolve the client configuration for a provider and model
    pub fn llm_for_provider(&self, provider: &str, model: &str) -> Result<LlmConfig, ConfigError> {
        let settings = self.llm.get(provider).ok_or_else(|| ConfigError::Missing {
            what: "provider",
            name: provider.to_string(),
        })?;

        Ok(LlmConfig {
            provider: provider.to_string(),
            model: model.to_string(),
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
            temperature: default_temperature(),
            connect_timeout: settings.connect_timeout,
            read_timeout: settings.read_timeout,
            extra: settings.extra.clone(),
        })
    }

    /// Built-in structural checks
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (id, settings) in &self.llm {
            let path = format!("llm.{}", id);
            if id.parse::<ProviderKind>().is_err() {
                return Err(ValidationError::invalid_value(
                    path,
                    "a supported provider",
                    id.clone(),
                ));
            }
            settings.validate(&path)?;
        }

        for (name, agent) in &self.agent {
            let path = format!("agent.{}", name);
            agent.validate(&path)?;
            if !self.llm.contains_key(&agent.provider) {
                return Err(ValidationError::invalid_value(
                    format!("{}.provider", path),
                    "a provider configured under 'llm'",
                    agent.provider.clone(),
                ));
            }
        }

        self.log.validate("log")
    }
}

/// Connection settings for one provider
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderSettings {
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: f64,

    #[serde(default = "default_read_timeout")]
    pub read_timeout: f64,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            extra: Map::new(),
        }
    }
}

impl ProviderSettings {
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if let Some(base_url) = &self.base_url {
            validate_url(&format!("{}.base_url", path), base_url)?;
        }
        validate_timeout(&format!("{}.connect_timeout", path), self.connect_timeout)?;
        validate_timeout(&format!("{}.read_timeout", path), self.read_timeout)
    }
}

/// A named call profile
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSettings {
    #[serde(default = "default_agent_provider")]
    pub provider: String,

    #[serde(default = "default_agent_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: f32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            provider: default_agent_provider(),
            model: default_agent_model(),
            temperature: 0.0,
        }
    }
}

impl AgentSettings {
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.model.is_empty() {
            return Err(ValidationError::required(format!("{}.model", path)));
        }
        validate_temperature(&format!("{}.temperature", path), self.temperature)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// One of trace, debug, info, warn, error (case-insensitive)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path; stderr when unset
    #[serde(default)]
    pub output: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            output: None,
        }
    }
}

impl LogConfig {
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        let level = self.level.to_ascii_lowercase();
        if LEVELS.contains(&level.as_str()) {
            Ok(())
        } else {
            Err(ValidationError::invalid_value(
                format!("{}.level", path),
                LEVELS.join("|"),
                self.level.clone(),
            ))
        }
    }
}

fn validate_temperature(path: &str, temperature: f32) -> Result<(), ValidationError> {
    if (0.0..=2.0).contains(&temperature) {
        Ok(())
    } else {
        Err(ValidationError::out_of_range(
            path,
            "Must be between 0.0 and 2.0",
        ))
    }
}

fn validate_timeout(path: &str, secs: f64) -> Result<(), ValidationError> {
    if secs.is_finite() && secs >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::out_of_range(
            path,
            "Must be a non-negative number of seconds",
        ))
    }
}

fn validate_url(path: &str, value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        Ok(url) => Err(ValidationError::invalid_url(
            path,
            format!("URL scheme must be http or https, got: {}", url.scheme()),
        )),
        Err(e) => Err(ValidationError::invalid_url(path, e.to_string())),
    }
}

// Default value functions for serde
fn default_temperature() -> f32 { 0.7 }
fn default_connect_timeout() -> f64 { 60.0 }
fn default_read_timeout() -> f64 { 20.0 }
fn default_log_level() -> String { "debug".to_string() }
fn default_agent_provider() -> String { "deepseek".to_string() }
fn default_agent_model() -> String { "deepseek-chat".to_string() }

fn default_agents() -> HashMap<String, AgentSettings> {
    HashMap::from([("default".to_string(), AgentSettings::default())])
}

fn default_providers() -> HashMap<String, ProviderSettings> {
    let deepseek = ProviderSettings {
        base_url: Some("https://api.deepseek.com/v1".to_string()),
        extra: Map::from_iter([
            ("max_tokens".to_string(), Value::from(8192)),
            ("top_p".to_string(), Value::from(0.95)),
        ]),
        ..Default::default()
    };

    HashMap::from([
        ("openai".to_string(), ProviderSettings::default()),
        ("anthropic".to_string(), ProviderSettings::default()),
        ("deepseek".to_string(), deepseek),
    ])
}
