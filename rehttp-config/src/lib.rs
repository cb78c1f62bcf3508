//! Settings for the rehttp client.
//!
//! [`SettingsLoader`] layers defaults, an optional JSON/TOML/env file and
//! `REHTTP_*` environment variables into a validated [`ClientSettings`],
//! which converts into an [`HttpClientConfig`](rehttp_transport::HttpClientConfig).
//!
//! ```rust,no_run
//! use rehttp_config::SettingsLoader;
//!
//! # fn main() -> rehttp_config::Result<()> {
//! let settings = SettingsLoader::new().file("rehttp.toml").load()?;
//! let config = settings.to_client_config();
//! # let _ = config;
//! # Ok(())
//! # }
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::{ENV_PREFIX, EnvLoader, load_dotenv};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{ClientSettings, SettingsLoader};
pub use validation::{ConfigValidator, Validate};
