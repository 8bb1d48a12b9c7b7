//! Wallet-daemon keystore.
//!
//! On top of the JSON meta blob this backend maintains the legacy
//! "user preferences" projection another service consumes: two base64 rows
//! per derived address (address to path and back) and one binary state row
//! per keychain. Meta blob, projection rows and state row are written in a
//! single MULTI/EXEC transaction, so a failed operation leaves nothing
//! half-written.

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use keychain_coin_service::CoinService;
use keychain_primitives::{Change, DerivationPath, Network, Scheme};
use redis::{aio::ConnectionManager, Pipeline};
use tracing::debug;
use uuid::Uuid;

use crate::{
    errors::{StoreError, StoreResult},
    meta::{AccountKey, AddressInfo, KeychainInfo, KeychainMeta},
    ops,
    redis::{fetch_meta, save_meta},
    wd_state::{encode_state, WdKeychainState},
    Keystore,
};

/// Addressing material of a keychain within the wallet-daemon layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct WdKey {
    prefix: String,
    workspace: String,
    wallet_type: &'static str,
    account_index: u32,
}

impl WdKey {
    /// Derives the projection addressing from a keychain's identity.
    ///
    /// The `<prefix>:<workspace>` pair comes from the opaque metadata,
    /// split on the first colon; missing metadata leaves both empty.
    pub(crate) fn from_info(info: &KeychainInfo) -> StoreResult<Self> {
        let (prefix, workspace) = match info.metadata.as_str() {
            "" => (String::new(), String::new()),
            metadata => {
                let Some((prefix, workspace)) = metadata.split_once(':') else {
                    return Err(StoreError::InvalidMetadata(metadata.to_owned()));
                };
                (prefix.to_owned(), workspace.to_owned())
            }
        };

        Ok(Self {
            prefix,
            workspace,
            wallet_type: wallet_type(info.network, info.scheme)?,
            account_index: info.account_index,
        })
    }

    fn namespace(&self) -> String {
        format!("core:user-preferences:{}:{}:", self.prefix, self.workspace)
    }

    fn pool_prefix(&self) -> String {
        format!("poolwallet_{}account_{}", self.wallet_type, self.account_index)
    }

    fn row(&self, key: String, value: String) -> (String, String) {
        (
            format!("{}{}", self.namespace(), BASE64.encode(key)),
            BASE64.encode(value),
        )
    }

    /// The two projection rows of one derived address.
    pub(crate) fn address_rows(&self, addr: &AddressInfo) -> [(String, String); 2] {
        let pool = self.pool_prefix();
        let path = addr.derivation;

        [
            self.row(format!("{pool}address:{}", addr.address), path.to_string()),
            self.row(format!("{pool}path:{path}"), addr.address.clone()),
        ]
    }

    /// The single state row of the keychain. The value is the binary state
    /// blob, which [`encode_state`] already wraps in base64.
    pub(crate) fn state_row(&self, info: &KeychainInfo) -> (String, String) {
        (
            format!("{}{}", self.namespace(), BASE64.encode(format!("{}state", self.pool_prefix()))),
            encode_state(&WdKeychainState::from(info)),
        )
    }
}

/// The wallet type a (network, scheme) pair maps to in the daemon's pool
/// naming.
fn wallet_type(network: Network, scheme: Scheme) -> StoreResult<&'static str> {
    match (network, scheme) {
        (Network::LitecoinMainnet, _) => Ok("litecoin"),
        (Network::BitcoinMainnet, Scheme::Bip44) => Ok("bitcoin"),
        (Network::BitcoinMainnet, Scheme::Bip49) => Ok("bitcoin_segwit"),
        (Network::BitcoinMainnet, Scheme::Bip84) => Ok("bitcoin_native_segwit"),
        (Network::BitcoinTestnet3, Scheme::Bip44) => Ok("bitcoin_testnet"),
        (Network::BitcoinTestnet3, Scheme::Bip49) => Ok("bitcoin_testnet_segwit"),
        (Network::BitcoinTestnet3, Scheme::Bip84) => Ok("bitcoin_testnet_native_segwit"),
        (network, scheme) => Err(StoreError::UnknownWalletType { network, scheme }),
    }
}

/// Keystore that mirrors every write into the wallet-daemon projection.
#[derive(Clone)]
pub struct WdKeystore {
    db: ConnectionManager,
    coin: Arc<dyn CoinService>,
}

impl WdKeystore {
    /// Connects to the Redis server at `url` and returns the keystore.
    /// Fails fast if the server is unreachable.
    pub async fn connect(url: &str, coin: Arc<dyn CoinService>) -> StoreResult<Self> {
        let client = ::redis::Client::open(url)?;
        let db = client.get_connection_manager().await?;

        Ok(Self { db, coin })
    }

    /// Queues the meta blob write into the transaction.
    fn queue_meta(pipe: &mut Pipeline, meta: &KeychainMeta) -> StoreResult<()> {
        pipe.set(meta.main.id.to_string(), serde_json::to_string(meta)?)
            .ignore();

        Ok(())
    }

    /// Queues the projection rows of the given addresses.
    fn queue_addresses(
        pipe: &mut Pipeline,
        key: &WdKey,
        addrs: &[AddressInfo],
    ) {
        for addr in addrs {
            for (row_key, row_value) in key.address_rows(addr) {
                pipe.set(row_key, row_value).ignore();
            }
        }
    }

    /// Queues deletion of the projection rows of the given addresses.
    fn queue_delete_addresses(pipe: &mut Pipeline, key: &WdKey, addrs: &[AddressInfo]) {
        for addr in addrs {
            for (row_key, _) in key.address_rows(addr) {
                pipe.del(row_key).ignore();
            }
        }
    }

    /// Queues the state row of the keychain.
    fn queue_state(pipe: &mut Pipeline, key: &WdKey, info: &KeychainInfo) {
        let (state_key, state_value) = key.state_row(info);
        pipe.set(state_key, state_value).ignore();
    }

    /// Runs the queued transaction.
    async fn commit(&self, pipe: Pipeline) -> StoreResult<()> {
        let mut conn = self.db.clone();
        let () = pipe.query_async(&mut conn).await?;

        Ok(())
    }

    /// Every address currently cached by the keychain, in projection form.
    fn cached_addresses(meta: &KeychainMeta) -> Vec<AddressInfo> {
        meta.addresses
            .iter()
            .map(|(address, path)| AddressInfo {
                address: address.clone(),
                derivation: *path,
                change: path.change_index(),
            })
            .collect()
    }
}

#[async_trait]
impl Keystore for WdKeystore {
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

        // Reject keychains the projection cannot address before anything is
        // stored.
        WdKey::from_info(&meta.main)?;

        save_meta(&self.db, &meta).await?;

        Ok(meta.main)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        let meta = fetch_meta(&self.db, id).await?;
        let key = WdKey::from_info(&meta.main)?;

        debug!(%id, "deleting keychain and projection");

        let mut pipe = redis::pipe();
        pipe.atomic();
        Self::queue_delete_addresses(&mut pipe, &key, &Self::cached_addresses(&meta));
        let (state_key, _) = key.state_row(&meta.main);
        pipe.del(state_key).ignore();
        pipe.del(id.to_string()).ignore();

        self.commit(pipe).await
    }

    async fn reset(&self, id: Uuid) -> StoreResult<()> {
        let mut meta = fetch_meta(&self.db, id).await?;
        let key = WdKey::from_info(&meta.main)?;
        let addrs = Self::cached_addresses(&meta);

        meta.reset();

        let mut pipe = redis::pipe();
        pipe.atomic();
        Self::queue_delete_addresses(&mut pipe, &key, &addrs);
        let (state_key, _) = key.state_row(&meta.main);
        pipe.del(state_key).ignore();
        Self::queue_meta(&mut pipe, &meta)?;

        self.commit(pipe).await
    }

    async fn get_fresh_addresses(
        &self,
        id: Uuid,
        change: Change,
        size: u32,
    ) -> StoreResult<Vec<AddressInfo>> {
        let mut meta = fetch_meta(&self.db, id).await?;
        let key = WdKey::from_info(&meta.main)?;

        let addrs = ops::fresh_addresses(self.coin.as_ref(), &mut meta, change, size).await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        Self::queue_addresses(&mut pipe, &key, &addrs);
        Self::queue_state(&mut pipe, &key, &meta.main);
        Self::queue_meta(&mut pipe, &meta)?;
        self.commit(pipe).await?;

        Ok(addrs)
    }

    async fn mark_path_as_used(&self, id: Uuid, path: DerivationPath) -> StoreResult<()> {
        let mut meta = fetch_meta(&self.db, id).await?;
        let key = WdKey::from_info(&meta.main)?;

        ops::mark_path_as_used(&mut meta, path);

        let mut pipe = redis::pipe();
        pipe.atomic();
        Self::queue_meta(&mut pipe, &meta)?;
        Self::queue_state(&mut pipe, &key, &meta.main);

        self.commit(pipe).await
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
        let key = WdKey::from_info(&meta.main)?;

        let addrs =
            ops::observable_addresses(self.coin.as_ref(), &mut meta, change, from_index, to_index)
                .await?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        Self::queue_meta(&mut pipe, &meta)?;
        Self::queue_state(&mut pipe, &key, &meta.main);
        Self::queue_addresses(&mut pipe, &key, &addrs);
        self.commit(pipe).await?;

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
