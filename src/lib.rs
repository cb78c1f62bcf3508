// rehttp - an HTTP client that retries transient failures
//
// The transport is always available; settings loading and logging setup are
// behind the `config` and `log` features (both on by default).

// Re-export the transport
pub use rehttp_transport::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use rehttp_config;

#[cfg(feature = "log")]
pub use rehttp_log;

// Prelude for common imports
pub mod prelude {
    pub use rehttp_transport::prelude::*;

    #[cfg(feature = "config")]
    pub use rehttp_config::{ClientSettings, SettingsLoader};
}
