//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a serde default so that an empty or
//! missing file yields a working configuration.

pub mod app;
pub mod logging;
pub mod realtime;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::logging::LoggingConfig;
pub use self::realtime::RealtimeConfig;

use crate::error::AppError;

/// Prefix for environment variable overrides (`TICKRELAY__SERVER__PORT`).
pub const ENV_PREFIX: &str = "TICKRELAY";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Connection registry, broadcast, and heartbeat settings.
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files and the environment.
    ///
    /// Sources, lowest precedence first: `{dir}/default.toml`,
    /// `{dir}/{env}.toml`, `TICKRELAY__*` variables, and finally the bare
    /// `PORT` variable set by most hosting platforms.
    pub fn load(dir: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(config::File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let mut app: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        if let Ok(port) = std::env::var("PORT") {
            app.server.port = port
                .parse()
                .map_err(|e| AppError::configuration(format!("Invalid PORT '{port}': {e}")))?;
        }

        app.validate()?;
        Ok(app)
    }

    /// Rejects combinations that would make the relay misbehave at runtime.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.realtime.outbound_buffer_size == 0 {
            return Err(AppError::configuration(
                "realtime.outbound_buffer_size must be at least 1",
            ));
        }
        if self.realtime.ping_interval_seconds == 0 {
            return Err(AppError::configuration(
                "realtime.ping_interval_seconds must be at least 1",
            ));
        }
        if self.realtime.idle_timeout_seconds <= self.realtime.ping_interval_seconds {
            return Err(AppError::configuration(
                "realtime.idle_timeout_seconds must exceed realtime.ping_interval_seconds",
            ));
        }
        Ok(())
    }

    /// Returns the `host:port` bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
