//! Redis keystore.
//!
//! One key per keychain: the canonical UUID string maps to the JSON-encoded
//! [`KeychainMeta`]. Every mutating operation is load-mutate-store on that
//! single key; concurrent mutations of the same keychain are last-writer-wins.

use std::sync::Arc;

use async_trait::async_trait;
use keychain_coin_service::CoinService;
use keychain_primitives::{Change, DerivationPath, Network, Scheme};
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::debug;
use uuid::Uuid;

use crate::{
    errors::{StoreError, StoreResult},
    meta::{AccountKey, AddressInfo, KeychainInfo, KeychainMeta},
    ops, Keystore,
};

/// Loads and decodes the meta blob of a keychain.
pub(crate) async fn fetch_meta(db: &ConnectionManager, id: Uuid) -> StoreResult<KeychainMeta> {
    let mut conn = db.clone();

    let raw: Option<String> = conn.get(id.to_string()).await?;
    let raw = raw.ok_or(StoreError::KeychainNotFound(id))?;

    Ok(serde_json::from_str(&raw)?)
}

/// Encodes and stores the meta blob of a keychain.
pub(crate) async fn save_meta(db: &ConnectionManager, meta: &KeychainMeta) -> StoreResult<()> {
    let mut conn = db.clone();
    let key = meta.main.id.to_string();
    let payload = serde_json::to_string(meta)?;

    debug!(%key, "storing keychain meta");
    conn.set::<_, _, ()>(key, payload).await?;

    Ok(())
}

/// Keystore over a Redis keyspace.
#[derive(Clone)]
pub struct RedisKeystore {
    db: ConnectionManager,
    coin: Arc<dyn CoinService>,
}

impl RedisKeystore {
    /// Connects to the Redis server at `url` and returns the keystore.
    /// Fails fast if the server is unreachable.
    pub async fn connect(url: &str, coin: Arc<dyn CoinService>) -> StoreResult<Self> {
        let client = ::redis::Client::open(url)?;
        let db = client.get_connection_manager().await?;

        Ok(Self { db, coin })
    }
}

#[async_trait]
impl Keystore for RedisKeystore {
    async fn get(&self, id: Uuid) -> StoreResult<KeychainInfo> {
        Ok(fetch_meta(&self.db, id).await?.main)
    }

    async fn create(
        &self,
        account: AccountKey,
        scheme: Scheme,
        network: Network,
        lookahead_size: u32,
        account_index: u32,
        metadata: String,
    ) -> StoreResult<KeychainInfo> {
        let meta = ops::create_meta(
            self.coin.as_ref(),
            account,
            scheme,
            network,
            lookahead_size,
            account_index,
            metadata,
        )
        .await?;

        save_meta(&self.db, &meta).await?;

        Ok(meta.main)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        // Load first so an unknown id is reported as such.
        fetch_meta(&self.db, id).await?;

        let mut conn = self.db.clone();
        conn.del::<_, ()>(id.to_string()).await?;

        Ok(())
    }

    async fn reset(&self, id: Uuid) -> StoreResult<()> {
        let mut meta = fetch_meta(&self.db, id).await?;

        meta.reset();

        save_meta(&self.db, &meta).await
    }

    async fn get_fresh_addresses(
        &self,
        id: Uuid,
        change: Change,
        size: u32,
    ) -> StoreResult<Vec<AddressInfo>> {
        let mut meta = fetch_meta(&self.db, id).await?;

        let addrs = ops::fresh_addresses(self.coin.as_ref(), &mut meta, change, size).await?;
        save_meta(&self.db, &meta).await?;

        Ok(addrs)
    }

    async fn mark_path_as_used(&self, id: Uuid, path: DerivationPath) -> StoreResult<()> {
        let mut meta = fetch_meta(&self.db, id).await?;

        ops::mark_path_as_used(&mut meta, path);

        save_meta(&self.db, &meta).await
    }

    async fn mark_address_as_used(&self, id: Uuid, address: &str) -> StoreResult<()> {
        let path = self.get_derivation_path(id, address).await?;
        self.mark_path_as_used(id, path).await
    }

    async fn get_all_observable_addresses(
        &self,
        id: Uuid,
        change: Change,
        from_index: u32,
        to_index: u32,
    ) -> StoreResult<Vec<AddressInfo>> {
        let mut meta = fetch_meta(&self.db, id).await?;

        let addrs =
            ops::observable_addresses(self.coin.as_ref(), &mut meta, change, from_index, to_index)
                .await?;
        save_meta(&self.db, &meta).await?;

        Ok(addrs)
    }

    async fn get_derivation_path(&self, id: Uuid, address: &str) -> StoreResult<DerivationPath> {
        let meta = fetch_meta(&self.db, id).await?;

        ops::derivation_path(&meta, address)
    }

    async fn get_addresses_public_keys(
        &self,
        id: Uuid,
        derivations: &[DerivationPath],
    ) -> StoreResult<Vec<String>> {
        let meta = fetch_meta(&self.db, id).await?;

        ops::addresses_public_keys(&meta, derivations)
    }
}
