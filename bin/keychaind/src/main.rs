//! The keychain service: a registry of HD account keychains that issues
//! fresh addresses and tracks which derivation paths have been used
//! on-chain.

use std::{fs, path::Path, sync::Arc};

use anyhow::Context;
use clap::Parser;
use config::{Config, StoreBackend};
use keychain_coin_service::{BitcoinCoinService, CoinService};
use keychain_common::logging::{self, LoggerConfig};
use keychain_store::{InMemoryKeystore, Keystore, RedisKeystore, WdKeystore};
use serde::de::DeserializeOwned;
use tokio::runtime;
use tracing::info;

mod args;
mod config;
mod rpc_server;

fn main() -> anyhow::Result<()> {
    let cli = args::Cli::parse();
    let config = parse_toml::<Config>(&cli.config)?;

    let mut logger = LoggerConfig::with_base_name("keychaind");
    logger.set_default_level(&config.log_level);
    logger.set_json(config.json_logs);
    logging::init(logger);

    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: Config) -> anyhow::Result<()> {
    let coin: Arc<dyn CoinService> = Arc::new(BitcoinCoinService::new());

    let store: Arc<dyn Keystore> = match config.store_backend {
        StoreBackend::Memory => {
            info!("using in-memory keystore");
            Arc::new(InMemoryKeystore::new(coin))
        }
        StoreBackend::Redis => {
            info!(host = %config.redis.host, port = config.redis.port, "using redis keystore");
            Arc::new(
                RedisKeystore::connect(&config.redis.url(), coin)
                    .await
                    .context("connect to redis")?,
            )
        }
        StoreBackend::WalletDaemon => {
            info!(host = %config.redis.host, port = config.redis.port, "using wallet-daemon keystore");
            Arc::new(
                WdKeystore::connect(&config.redis.url(), coin)
                    .await
                    .context("connect to redis")?,
            )
        }
    };

    let rpc_addr = format!("{}:{}", config.host, config.port);

    rpc_server::start_rpc(store, &rpc_addr).await
}

/// Reads and parses a TOML file from the given path into the given type `T`.
fn parse_toml<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;

    toml::from_str(&raw).with_context(|| format!("parse config file {}", path.display()))
}
