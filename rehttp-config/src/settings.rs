//! Client settings and the layered loader that produces them.

use crate::env::{EnvLoader, load_dotenv};
use crate::loader::{ConfigLoader, FileFormat};
use crate::validation::{ConfigValidator, Validate};
use crate::{ConfigError, Result};
use rehttp_transport::{HttpClientConfig, RetrySettings};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Retry and timeout settings for an [`HttpClient`](rehttp_transport::HttpClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Retries allowed after the first attempt
    pub max_additional_attempts: u32,
    /// Backoff base in milliseconds
    pub backoff_base_ms: u64,
    /// Backoff ceiling in milliseconds
    pub backoff_cap_ms: u64,
    /// Whole-request timeout in seconds, retries and waits included
    pub timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Overrides the default `User-Agent`
    pub user_agent: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            max_additional_attempts: 3,
            backoff_base_ms: 1000,
            backoff_cap_ms: 10_000,
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: None,
        }
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl ClientSettings {
    /// Apply overrides keyed by lowercase field name, as produced by
    /// [`EnvLoader`]. Unknown keys are ignored.
    pub fn apply_overrides(&mut self, vars: &HashMap<String, String>) -> Result<()> {
        for (key, value) in vars {
            match key.as_str() {
                "max_additional_attempts" => self.max_additional_attempts = parse(key, value)?,
                "backoff_base_ms" => self.backoff_base_ms = parse(key, value)?,
                "backoff_cap_ms" => self.backoff_cap_ms = parse(key, value)?,
                "timeout_secs" => self.timeout_secs = parse(key, value)?,
                "connect_timeout_secs" => self.connect_timeout_secs = parse(key, value)?,
                "user_agent" => self.user_agent = Some(value.clone()),
                _ => {}
            }
        }
        Ok(())
    }

    /// Retry settings for the transport.
    pub fn retry(&self) -> RetrySettings {
        RetrySettings::exponential(
            self.max_additional_attempts,
            Duration::from_millis(self.backoff_base_ms),
            Duration::from_millis(self.backoff_cap_ms),
        )
    }

    /// Build a client configuration from these settings.
    pub fn to_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .retry(self.retry())
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs));
        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        builder.build()
    }
}

impl Validate for ClientSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::positive(self.backoff_base_ms, "backoff_base_ms")?;
        ConfigValidator::at_least(
            self.backoff_cap_ms,
            self.backoff_base_ms,
            "backoff_cap_ms",
            "backoff_base_ms",
        )?;
        ConfigValidator::positive(self.timeout_secs, "timeout_secs")?;
        if let Some(user_agent) = &self.user_agent {
            ConfigValidator::not_empty(user_agent, "user_agent")?;
        }
        Ok(())
    }
}

/// Source of environment overrides.
#[derive(Debug, Clone)]
enum EnvSource {
    Skip,
    Process,
    Fixed(Vec<(String, String)>),
}

/// Loads [`ClientSettings`] from defaults, then an optional file, then the
/// environment, and validates the result.
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    file: Option<PathBuf>,
    dotenv: Option<Option<String>>,
    env: EnvSource,
    env_loader: EnvLoader,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            dotenv: None,
            env: EnvSource::Process,
            env_loader: EnvLoader::rehttp(),
        }
    }

    /// Read a JSON, TOML or env file after the defaults.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Load a `.env` file into the process environment first.
    pub fn dotenv(mut self, path: Option<String>) -> Self {
        self.dotenv = Some(path);
        self
    }

    /// Skip environment overrides.
    pub fn without_env(mut self) -> Self {
        self.env = EnvSource::Skip;
        self
    }

    /// Read overrides from these variables instead of the process environment.
    pub fn env_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env = EnvSource::Fixed(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn load(self) -> Result<ClientSettings> {
        if let Some(path) = &self.dotenv {
            load_dotenv(path.as_deref())?;
        }

        let mut settings = ClientSettings::default();

        if let Some(path) = &self.file {
            let loader = ConfigLoader::auto(path)?;
            let value = loader.load_file(path)?;
            settings = match loader.format() {
                FileFormat::Env => {
                    let mut settings = settings;
                    settings.apply_overrides(&self.env_loader.load_from(string_pairs(value)))?;
                    settings
                }
                FileFormat::Json | FileFormat::Toml => serde_json::from_value(value)
                    .map_err(|e| ConfigError::DeserializationError(e.to_string()))?,
            };
        }

        let overrides = match self.env {
            EnvSource::Skip => HashMap::new(),
            EnvSource::Process => self.env_loader.load(),
            EnvSource::Fixed(vars) => self.env_loader.load_from(vars),
        };
        settings.apply_overrides(&overrides)?;

        settings.validate()?;
        Ok(settings)
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn string_pairs(value: Value) -> Vec<(String, String)> {
    match value {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(k, v)| match v {
                Value::String(s) => Some((k, s)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ClientSettings::default();
        assert_eq!(settings.max_additional_attempts, 3);
        assert_eq!(settings.backoff_base_ms, 1000);
        assert_eq!(settings.backoff_cap_ms, 10_000);
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(settings.connect_timeout_secs, 10);
        assert!(settings.user_agent.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: ClientSettings =
            serde_json::from_str(r#"{"max_additional_attempts": 1}"#).unwrap();
        assert_eq!(settings.max_additional_attempts, 1);
        assert_eq!(settings.timeout_secs, 30);
    }

    #[test]
    fn test_overrides() {
        let mut settings = ClientSettings::default();
        let vars = HashMap::from([
            ("backoff_base_ms".to_string(), "50".to_string()),
            ("user_agent".to_string(), "probe/2".to_string()),
            ("unrelated".to_string(), "x".to_string()),
        ]);
        settings.apply_overrides(&vars).unwrap();
        assert_eq!(settings.backoff_base_ms, 50);
        assert_eq!(settings.user_agent.as_deref(), Some("probe/2"));
    }

    #[test]
    fn test_bad_override_names_the_key() {
        let mut settings = ClientSettings::default();
        let vars = HashMap::from([("timeout_secs".to_string(), "soon".to_string())]);
        let err = settings.apply_overrides(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "timeout_secs"));
    }

    #[test]
    fn test_validation_rules() {
        let zero_base = ClientSettings {
            backoff_base_ms: 0,
            ..Default::default()
        };
        assert!(zero_base.validate().is_err());

        let cap_below_base = ClientSettings {
            backoff_base_ms: 500,
            backoff_cap_ms: 100,
            ..Default::default()
        };
        assert!(cap_below_base.validate().is_err());

        let zero_timeout = ClientSettings {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(zero_timeout.validate().is_err());

        let no_retries = ClientSettings {
            max_additional_attempts: 0,
            ..Default::default()
        };
        assert!(no_retries.validate().is_ok());
    }

    #[test]
    fn test_client_config_conversion() {
        let settings = ClientSettings {
            max_additional_attempts: 5,
            backoff_base_ms: 200,
            backoff_cap_ms: 800,
            timeout_secs: 7,
            connect_timeout_secs: 2,
            user_agent: Some("probe/3".to_string()),
        };
        let config = settings.to_client_config();

        let retry = config.retry.unwrap();
        assert_eq!(retry.max_additional_attempts, 5);
        assert_eq!(retry.backoff_base, Duration::from_millis(200));
        assert_eq!(retry.backoff_cap, Duration::from_millis(800));
        assert_eq!(config.timeout, Some(Duration::from_secs(7)));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.user_agent, "probe/3");
    }

    #[test]
    fn test_loader_env_overrides_defaults() {
        let settings = SettingsLoader::new()
            .env_vars([("REHTTP_MAX_ADDITIONAL_ATTEMPTS", "9"), ("HOME", "/root")])
            .load()
            .unwrap();
        assert_eq!(settings.max_additional_attempts, 9);
    }

    #[test]
    fn test_loader_rejects_invalid_result() {
        let err = SettingsLoader::new()
            .env_vars([("REHTTP_BACKOFF_CAP_MS", "1")])
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
