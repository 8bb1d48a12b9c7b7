//! Service configuration.

use serde::{Deserialize, Serialize};

/// The configuration values that dictate the behavior of the keychain
/// service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// Address the RPC server binds to.
    #[serde(default = "defaults::host")]
    pub host: String,

    /// Port the RPC server binds to.
    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Which keystore backend holds the keychain state.
    #[serde(default)]
    pub store_backend: StoreBackend,

    /// Default log filter when `RUST_LOG` is not set.
    #[serde(default = "defaults::log_level")]
    pub log_level: String,

    /// Emit one JSON object per log event.
    #[serde(default = "defaults::json_logs")]
    pub json_logs: bool,

    /// Connection parameters of the Redis-backed keystores.
    #[serde(default)]
    pub redis: RedisConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            store_backend: StoreBackend::default(),
            log_level: defaults::log_level(),
            json_logs: defaults::json_logs(),
            redis: RedisConfig::default(),
        }
    }
}

/// The keystore backend to run the service against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum StoreBackend {
    /// Process-local map, no persistence.
    Memory,

    /// Redis keyspace.
    #[default]
    Redis,

    /// Redis keyspace with the wallet-daemon projection.
    WalletDaemon,
}

/// Connection parameters for the Redis-backed keystores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RedisConfig {
    /// Redis host.
    #[serde(default = "defaults::redis_host")]
    pub host: String,

    /// Redis port.
    #[serde(default = "defaults::redis_port")]
    pub port: u16,

    /// Redis logical database.
    #[serde(default)]
    pub db: i64,

    /// Password, if the server requires one.
    #[serde(default)]
    pub password: Option<String>,

    /// Connect over TLS. The certificate is NOT verified, matching the
    /// legacy deployment this service replaces.
    #[serde(default)]
    pub ssl: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: defaults::redis_host(),
            port: defaults::redis_port(),
            db: 0,
            password: None,
            ssl: false,
        }
    }
}

impl RedisConfig {
    /// The connection URL for the configured server.
    pub(crate) fn url(&self) -> String {
        let scheme = if self.ssl { "rediss" } else { "redis" };
        let auth = self
            .password
            .as_deref()
            .map(|password| format!(":{password}@"))
            .unwrap_or_default();
        let insecure = if self.ssl { "#insecure" } else { "" };

        format!(
            "{scheme}://{auth}{}:{}/{}{insecure}",
            self.host, self.port, self.db
        )
    }
}

mod defaults {
    pub(super) fn host() -> String {
        "0.0.0.0".to_owned()
    }

    pub(super) fn port() -> u16 {
        50052
    }

    pub(super) fn log_level() -> String {
        "info".to_owned()
    }

    pub(super) fn json_logs() -> bool {
        true
    }

    pub(super) fn redis_host() -> String {
        "127.0.0.1".to_owned()
    }

    pub(super) fn redis_port() -> u16 {
        6379
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_toml() {
        let config = r#"
            host = "127.0.0.1"
            port = 50052
            store_backend = "wallet-daemon"
            log_level = "debug"
            json_logs = false

            [redis]
            host = "redis.internal"
            port = 6380
            db = 2
            password = "hunter2"
            ssl = true
        "#;

        let deserialized: Config = toml::from_str(config).expect("must parse config");
        assert_eq!(deserialized.store_backend, StoreBackend::WalletDaemon);
        assert_eq!(
            deserialized.redis.url(),
            "rediss://:hunter2@redis.internal:6380/2#insecure"
        );

        let serialized = toml::to_string(&deserialized).expect("must serialize config");
        let roundtrip: Config = toml::from_str(&serialized).expect("must reparse config");
        assert_eq!(roundtrip, deserialized);
    }

    #[test]
    fn test_config_defaults() {
        let config: Config = toml::from_str("").expect("empty config must parse");

        assert_eq!(config, Config::default());
        assert_eq!(config.store_backend, StoreBackend::Redis);
        assert_eq!(config.redis.url(), "redis://127.0.0.1:6379/0");
    }
}
