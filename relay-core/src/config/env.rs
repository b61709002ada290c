//! Environment variable interpolation for configuration files

use super::error::ConfigError;
use regex::Regex;
use std::env;
use std::sync::OnceLock;

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid")
    })
}

/// Replace every `${VAR}` placeholder in `content` with the value of `VAR`.
///
/// Fails on the first placeholder whose variable is not set.
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(content.len());
    let mut last = 0;

    for cap in env_var_pattern().captures_iter(content) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let var_name = &cap[1];
        let value = env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound {
            var: var_name.to_string(),
        })?;

        result.push_str(&content[last..full_match.start()]);
        result.push_str(&value);
        last = full_match.end();
    }

    result.push_str(&content[last..]);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_env_vars() {
        env::set_var("RELAY_TEST_VAR", "test_value");

        let content = "api_key: ${RELAY_TEST_VAR}";
        let result = interpolate_env_vars(content).unwrap();
        assert_eq!(result, "api_key: test_value");

        env::remove_var("RELAY_TEST_VAR");
    }

    #[test]
    fn test_missing_env_var() {
        let content = "api_key: ${RELAY_MISSING_VAR}";
        let result = interpolate_env_vars(content);

        if let Err(ConfigError::EnvVarNotFound { var }) = result {
            assert_eq!(var, "RELAY_MISSING_VAR");
        } else {
            panic!("Expected EnvVarNotFound error");
        }
    }

    #[test]
    fn test_multiple_env_vars() {
        env::set_var("RELAY_VAR1", "value1");
        env::set_var("RELAY_VAR2", "value2");

        let content = "key1: ${RELAY_VAR1}, key2: ${RELAY_VAR2}";
        let result = interpolate_env_vars(content).unwrap();
        assert_eq!(result, "key1: value1, key2: value2");

        env::remove_var("RELAY_VAR1");
        env::remove_var("RELAY_VAR2");
    }
}
