//! Configuration parsing and validation for fanroute.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub routing: RoutingConfig,
    pub providers: Vec<Provider>,
}

/// Fan-out tuning knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// Concurrent attempts issued per provider for one route invocation.
    #[serde(default = "default_retries")]
    pub retries_per_provider: usize,
    /// Per-attempt timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

fn default_retries() -> usize {
    2
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            retries_per_provider: default_retries(),
            attempt_timeout_secs: default_timeout_secs(),
        }
    }
}

/// API key wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
///
/// The inner `SecretString` ensures the key value is never exposed via Debug
/// or Display and is only accessible via `.expose_secret()`, so every read of
/// the raw key stays grep-auditable.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> serde::Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| ApiKey(SecretString::from(s)))
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}

/// A configured remote text-generation provider. Immutable after load.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Unique name for this provider.
    pub name: String,
    /// Bearer credential for the provider's API.
    pub api_key: ApiKey,
    /// Full URL the prompt is POSTed to.
    pub endpoint: String,
    /// Price in currency units per 1000 generated tokens.
    pub cost_per_1k_tokens: f64,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required field '{field}' in provider entry {entry}")]
    MissingField { field: &'static str, entry: String },

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable '{var}' not set for provider '{provider}': {message}")]
    EnvVar {
        var: String,
        provider: String,
        message: String,
    },
}

/// Raw provider entry deserialized directly from TOML.
///
/// Every field is `Option` so an incomplete entry surfaces as a
/// `ConfigError::MissingField` naming the field and the entry, rather than a
/// generic serde error. Values may still contain unexpanded `${VAR}`
/// references at this stage.
#[derive(Deserialize)]
struct RawProvider {
    name: Option<String>,
    api_key: Option<String>,
    endpoint: Option<String>,
    cost_per_1k_tokens: Option<f64>,
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    routing: RoutingConfig,
    #[serde(default)]
    providers: Vec<RawProvider>,
}

/// Expand all `${VAR}` references in a string using a custom lookup function.
///
/// The closure-based design makes this testable without touching global env
/// state. Supports multiple `${VAR}` in one string. Fails on first missing
/// variable, unclosed `${`, or empty variable name.
fn expand_env_vars_with<F>(
    input: &str,
    provider_name: &str,
    lookup: F,
) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let end = after.find('}').ok_or_else(|| ConfigError::EnvVar {
            var: "<unclosed>".to_string(),
            provider: provider_name.to_string(),
            message: format!("Unclosed '${{' in config value: {}", input),
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            return Err(ConfigError::EnvVar {
                var: "".to_string(),
                provider: provider_name.to_string(),
                message: "Empty variable name in '${}' reference".to_string(),
            });
        }

        let value = lookup(var_name).ok_or_else(|| ConfigError::EnvVar {
            var: var_name.to_string(),
            provider: provider_name.to_string(),
            message: format!(
                "Environment variable '{}' is not set (referenced in provider '{}')",
                var_name, provider_name
            ),
        })?;

        result.push_str(&value);
        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

/// Expand all `${VAR}` references using real environment variables.
fn expand_env_vars(input: &str, provider_name: &str) -> Result<String, ConfigError> {
    expand_env_vars_with(input, provider_name, |name| std::env::var(name).ok())
}

/// Label for a raw entry in error messages: its name if present, else its
/// position in the providers array.
fn entry_label(raw: &RawProvider, index: usize) -> String {
    match &raw.name {
        Some(name) => format!("'{}'", name),
        None => format!("#{}", index),
    }
}

impl RawProvider {
    /// Check required fields, expand env references, and build the final
    /// `Provider`. `api_key` and `endpoint` both support `${VAR}` expansion.
    fn resolve(self, index: usize) -> Result<Provider, ConfigError> {
        let entry = entry_label(&self, index);

        let name = self.name.clone().ok_or(ConfigError::MissingField {
            field: "name",
            entry: entry.clone(),
        })?;
        let raw_key = self.api_key.ok_or(ConfigError::MissingField {
            field: "api_key",
            entry: entry.clone(),
        })?;
        let raw_endpoint = self.endpoint.ok_or(ConfigError::MissingField {
            field: "endpoint",
            entry: entry.clone(),
        })?;
        let cost_per_1k_tokens = self.cost_per_1k_tokens.ok_or(ConfigError::MissingField {
            field: "cost_per_1k_tokens",
            entry,
        })?;

        let api_key = ApiKey::from(expand_env_vars(&raw_key, &name)?);
        let endpoint = expand_env_vars(&raw_endpoint, &name)?;

        Ok(Provider {
            name,
            api_key,
            endpoint,
            cost_per_1k_tokens,
        })
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source: e,
        })?;

        Self::parse_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(ConfigError::Parse)?;

        let mut providers = Vec::with_capacity(raw.providers.len());
        for (index, rp) in raw.providers.into_iter().enumerate() {
            providers.push(rp.resolve(index)?);
        }

        let config = Config {
            routing: raw.routing,
            providers,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            tracing::warn!("No providers configured - every route call will fail");
        }

        for provider in &self.providers {
            if provider.endpoint.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Provider '{}' has empty endpoint",
                    provider.name
                )));
            }
            if provider.cost_per_1k_tokens < 0.0 || !provider.cost_per_1k_tokens.is_finite() {
                return Err(ConfigError::Validation(format!(
                    "Provider '{}' has invalid cost_per_1k_tokens {} (must be a non-negative number)",
                    provider.name, provider.cost_per_1k_tokens
                )));
            }
        }

        if self.routing.retries_per_provider == 0 {
            return Err(ConfigError::Validation(
                "routing.retries_per_provider must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = Config::parse_str("").unwrap();
        assert!(config.providers.is_empty());
        assert_eq!(config.routing.retries_per_provider, 2);
        assert_eq!(config.routing.attempt_timeout_secs, 10);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [routing]
            retries_per_provider = 3
            attempt_timeout_secs = 5

            [[providers]]
            name = "alpha"
            api_key = "sk-alpha"
            endpoint = "https://alpha.example.com/generate"
            cost_per_1k_tokens = 0.002

            [[providers]]
            name = "beta"
            api_key = "sk-beta"
            endpoint = "https://beta.example.com/generate"
            cost_per_1k_tokens = 0.01
        "#;

        let config = Config::parse_str(toml).unwrap();
        assert_eq!(config.routing.retries_per_provider, 3);
        assert_eq!(config.routing.attempt_timeout_secs, 5);
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[0].name, "alpha");
        assert_eq!(config.providers[0].cost_per_1k_tokens, 0.002);
        assert_eq!(
            config.providers[1].endpoint,
            "https://beta.example.com/generate"
        );
    }

    #[test]
    fn test_missing_name_fails() {
        let toml = r#"
            [[providers]]
            api_key = "sk-test"
            endpoint = "https://example.com/generate"
            cost_per_1k_tokens = 0.002
        "#;

        let err = Config::parse_str(toml).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("name"), "error should name the field: {}", msg);
        assert!(msg.contains("#0"), "error should locate the entry: {}", msg);
    }

    #[test]
    fn test_missing_api_key_fails() {
        let toml = r#"
            [[providers]]
            name = "no-key"
            endpoint = "https://example.com/generate"
            cost_per_1k_tokens = 0.002
        "#;

        let err = Config::parse_str(toml).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("api_key"), "{}", msg);
        assert!(msg.contains("no-key"), "error should name the entry: {}", msg);
    }

    #[test]
    fn test_missing_endpoint_fails() {
        let toml = r#"
            [[providers]]
            name = "no-endpoint"
            api_key = "sk-test"
            cost_per_1k_tokens = 0.002
        "#;

        let err = Config::parse_str(toml).unwrap_err();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn test_missing_cost_fails() {
        let toml = r#"
            [[providers]]
            name = "no-cost"
            api_key = "sk-test"
            endpoint = "https://example.com/generate"
        "#;

        let err = Config::parse_str(toml).unwrap_err();
        assert!(err.to_string().contains("cost_per_1k_tokens"));
    }

    #[test]
    fn test_second_entry_reported() {
        let toml = r#"
            [[providers]]
            name = "complete"
            api_key = "sk-test"
            endpoint = "https://example.com/generate"
            cost_per_1k_tokens = 0.002

            [[providers]]
            name = "incomplete"
            endpoint = "https://example.com/generate"
            cost_per_1k_tokens = 0.002
        "#;

        let err = Config::parse_str(toml).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("api_key"), "{}", msg);
        assert!(msg.contains("incomplete"), "{}", msg);
    }

    #[test]
    fn test_negative_cost_fails() {
        let toml = r#"
            [[providers]]
            name = "negative"
            api_key = "sk-test"
            endpoint = "https://example.com/generate"
            cost_per_1k_tokens = -0.5
        "#;

        let err = Config::parse_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_zero_retries_fails() {
        let toml = r#"
            [routing]
            retries_per_provider = 0
        "#;

        let err = Config::parse_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_api_key_debug_redaction() {
        let key = ApiKey::from("super-secret-token");
        let debug_output = format!("{:?}", key);
        assert_eq!(debug_output, "[REDACTED]");
        assert!(!debug_output.contains("super-secret"));
    }

    #[test]
    fn test_api_key_display_redaction() {
        let key = ApiKey::from("super-secret-token");
        assert_eq!(format!("{}", key), "[REDACTED]");
    }

    #[test]
    fn test_api_key_serialize_redaction() {
        let key = ApiKey::from("real-secret-value");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"[REDACTED]\"");
        assert!(!json.contains("real-secret"));
    }

    #[test]
    fn test_api_key_expose_secret() {
        let key = ApiKey::from("the-actual-value");
        assert_eq!(key.expose_secret(), "the-actual-value");
    }

    #[test]
    fn test_provider_debug_redaction() {
        let toml = r#"
            [[providers]]
            name = "redacted"
            api_key = "sk-ABCD1234secret"
            endpoint = "https://example.com/generate"
            cost_per_1k_tokens = 0.002
        "#;

        let config = Config::parse_str(toml).unwrap();
        let debug = format!("{:?}", config.providers[0]);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("sk-ABCD1234secret"));
    }

    // ── Expansion tests (using expand_env_vars_with, no global env state) ──

    #[test]
    fn test_expand_single_var() {
        let lookup = |name: &str| match name {
            "MY_KEY" => Some("sk-resolved".to_string()),
            _ => None,
        };
        let result = expand_env_vars_with("${MY_KEY}", "test", lookup).unwrap();
        assert_eq!(result, "sk-resolved");
    }

    #[test]
    fn test_expand_multiple_vars() {
        let lookup = |name: &str| match name {
            "SCHEME" => Some("https".to_string()),
            "HOST" => Some("example.com".to_string()),
            _ => None,
        };
        let result = expand_env_vars_with("${SCHEME}://${HOST}/generate", "test", lookup).unwrap();
        assert_eq!(result, "https://example.com/generate");
    }

    #[test]
    fn test_expand_no_vars_passthrough() {
        let lookup = |_: &str| -> Option<String> { panic!("should not be called") };
        let result = expand_env_vars_with("literal-value", "test", lookup).unwrap();
        assert_eq!(result, "literal-value");
    }

    #[test]
    fn test_expand_missing_var_fails() {
        let lookup = |_: &str| None;
        let result = expand_env_vars_with("${MISSING}", "provider-alpha", lookup);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("MISSING"), "Error should name the variable");
        assert!(
            err.contains("provider-alpha"),
            "Error should name the provider"
        );
    }

    #[test]
    fn test_expand_unclosed_brace_fails() {
        let lookup = |_: &str| -> Option<String> { panic!("should not be called") };
        let result = expand_env_vars_with("${UNCLOSED", "test", lookup);
        let err = result.unwrap_err().to_string().to_lowercase();
        assert!(err.contains("unclosed"));
    }

    #[test]
    fn test_expand_empty_var_name_fails() {
        let lookup = |_: &str| -> Option<String> { panic!("should not be called") };
        let result = expand_env_vars_with("${}", "test", lookup);
        let err = result.unwrap_err().to_string().to_lowercase();
        assert!(err.contains("empty"));
    }

    #[test]
    fn test_expand_dollar_without_brace_passthrough() {
        let lookup = |_: &str| -> Option<String> { panic!("should not be called") };
        let result = expand_env_vars_with("$NOT_A_VAR", "test", lookup).unwrap();
        assert_eq!(result, "$NOT_A_VAR");
    }
}
