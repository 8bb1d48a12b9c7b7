//! Provides utilities to initialize logging.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Configuration for the logger.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// The whoami string, which is used to identify the service in logs.
    whoami: String,

    /// Default filter directive when `RUST_LOG` is not set.
    default_level: String,

    /// Whether to emit one JSON object per event instead of the compact
    /// human-readable format.
    json: bool,
}

impl LoggerConfig {
    /// Creates a config with the whoami string set to the provided name.
    pub fn with_base_name(whoami: &str) -> Self {
        Self {
            whoami: whoami.to_owned(),
            default_level: "info".to_owned(),
            json: false,
        }
    }

    /// Sets the default level filter used when `RUST_LOG` is absent.
    pub fn set_default_level(&mut self, level: &str) {
        self.default_level = level.to_owned();
    }

    /// Switches the output format to JSON.
    pub fn set_json(&mut self, json: bool) {
        self.json = json;
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::with_base_name("(keychain)")
    }
}

/// Initializes the logging subsystem with the provided config.
///
/// `RUST_LOG` takes precedence over the configured default level.
pub fn init(config: LoggerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    if config.json {
        let layer = tracing_subscriber::fmt::layer().json().with_filter(filter);
        tracing_subscriber::registry().with(layer).init();
    } else {
        let layer = tracing_subscriber::fmt::layer().compact().with_filter(filter);
        tracing_subscriber::registry().with(layer).init();
    }

    info!(whoami = %config.whoami, "logging started");
}
