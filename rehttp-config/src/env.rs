// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Prefix for every variable the client reads.
pub const ENV_PREFIX: &str = "REHTTP";

/// Environment variable loader
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    /// Loader for `REHTTP_*` variables.
    pub fn rehttp() -> Self {
        Self::new(Some(ENV_PREFIX.to_string()))
    }

    /// Load all matching environment variables, keyed by lowercase name
    /// with the prefix stripped.
    pub fn load(&self) -> HashMap<String, String> {
        self.load_from(env::vars())
    }

    /// Same as [`load`](Self::load) over an explicit set of variables.
    pub fn load_from<I, K, V>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = HashMap::new();

        for (key, value) in vars {
            let key = key.as_ref();
            match &self.prefix {
                Some(prefix) => {
                    // REHTTP_X matches, REHTTPX does not
                    if let Some(rest) = key.strip_prefix(prefix.as_str())
                        && let Some(name) = rest.strip_prefix('_')
                        && !name.is_empty()
                    {
                        config.insert(name.to_lowercase(), value.into());
                    }
                }
                None => {
                    config.insert(key.to_lowercase(), value.into());
                }
            }
        }

        config
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.full_key(key)).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// The variable name `key` is read from.
    pub fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::rehttp()
    }
}

/// Load a `.env` file into the process environment.
///
/// With no path, a missing `.env` in the working directory is not an error.
pub fn load_dotenv(path: Option<&str>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    Ok(())
}
