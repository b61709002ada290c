//! Configuration validation utilities

use super::error::ValidationError;
use super::schema::RelayConfig;
use regex::Regex;

/// Validator layering cross-field rules on top of [`RelayConfig::validate`]
pub struct ConfigValidator {
    /// Pattern for sensitive field names
    sensitive_pattern: Regex,
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigValidator {
    pub fn new() -> Self {
        Self {
            sensitive_pattern: Regex::new(
                r"(?i)(api_?key|secret|password|credential|auth_?token|access_?token)",
            )
            .expect("sensitive field pattern is valid"),
        }
    }

    pub fn validate(&self, config: &RelayConfig) -> Result<(), ValidationError> {
        config.validate()?;
        self.validate_extra_params(config)
    }

    /// Secrets belong in `api_key`, not in the free-form `extra` map, and the
    /// sampling parameters the adapters read must have the right type.
    fn validate_extra_params(&self, config: &RelayConfig) -> Result<(), ValidationError> {
        for (id, settings) in &config.llm {
            for (key, value) in &settings.extra {
                let path = format!("llm.{}.extra.{}", id, key);

                if self.is_sensitive_field(key) {
                    return Err(ValidationError::invalid_value(
                        path,
                        "no credentials in extra parameters",
                        key.clone(),
                    )
                    .with_context("use the provider's api_key field"));
                }

                match key.as_str() {
                    "max_tokens" if value.as_u64().filter(|v| *v > 0).is_none() => {
                        return Err(ValidationError::out_of_range(
                            path,
                            "Must be a positive integer",
                        ));
                    }
                    "top_p" => {
                        let in_range = value
                            .as_f64()
                            .map(|v| (0.0..=1.0).contains(&v))
                            .unwrap_or(false);
                        if !in_range {
                            return Err(ValidationError::out_of_range(
                                path,
                                "Must be between 0.0 and 1.0",
                            ));
                        }
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }

    /// Check if a field name appears to contain sensitive information
    pub fn is_sensitive_field(&self, field_name: &str) -> bool {
        self.sensitive_pattern.is_match(field_name)
    }
}
