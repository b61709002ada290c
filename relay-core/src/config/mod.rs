//! Configuration module
//!
//! Loads a [`RelayConfig`] document from JSON or YAML, interpolating
//! `${VAR}` placeholders from the environment, and resolves the per-client
//! [`LlmConfig`] objects handed to [`LlmClient`](crate::client::LlmClient).

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use error::{ConfigError, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{AgentSettings, LlmConfig, LogConfig, ProviderSettings, RelayConfig};
pub use secrets::SecretString;
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<RelayConfig> {
    let path = path.as_ref();
    let content = read_config_text(path)?;
    let interpolated = env::interpolate_env_vars(&content)?;

    let config: RelayConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: path.to_string_lossy().to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<RelayConfig> {
    let path = path.as_ref();
    let content = read_config_text(path)?;
    parse_json(&content, &path.to_string_lossy())
}

/// Parse a configuration from an in-memory JSON document
pub fn from_json_str(content: &str) -> ConfigResult<RelayConfig> {
    parse_json(content, "<string>")
}

fn parse_json(content: &str, origin: &str) -> ConfigResult<RelayConfig> {
    let interpolated = env::interpolate_env_vars(content)?;

    let config: RelayConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::ParseError {
            path: origin.to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}

/// Read a config file as text. Files containing NUL bytes are UTF-16
/// (as written by some Windows editors) and are decoded as such.
fn read_config_text(path: &Path) -> ConfigResult<String> {
    let raw = fs::read(path).map_err(|e| ConfigError::IoError {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    if raw.contains(&0) {
        return Ok(decode_utf16(&raw));
    }

    String::from_utf8(raw).map_err(|e| ConfigError::ParseError {
        path: path.to_string_lossy().to_string(),
        line: None,
        column: None,
        message: e.to_string(),
    })
}

fn decode_utf16(raw: &[u8]) -> String {
    let big_endian = raw.starts_with(&[0xFE, 0xFF]);
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        })
        .collect();

    let text = String::from_utf16_lossy(&units);
    text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text)
}
