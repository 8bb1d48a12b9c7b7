//! In-memory keystore.
//!
//! Keeps every keychain in a process-local map. Nothing is persisted, which
//! makes this backend suitable for tests and single-process deployments
//! without durability requirements.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use keychain_coin_service::CoinService;
use keychain_primitives::{Change, DerivationPath, Network, Scheme};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    errors::{StoreError, StoreResult},
    meta::{AccountKey, AddressInfo, KeychainInfo, KeychainMeta},
    ops, Keystore,
};

/// Keystore over a process-local map.
#[derive(Clone)]
pub struct InMemoryKeystore {
    db: Arc<RwLock<HashMap<Uuid, KeychainMeta>>>,
    coin: Arc<dyn CoinService>,
}

impl InMemoryKeystore {
    /// Creates an empty keystore deriving through the given coin service.
    pub fn new(coin: Arc<dyn CoinService>) -> Self {
        Self {
            db: Arc::new(RwLock::new(HashMap::new())),
            coin,
        }
    }
}

#[async_trait]
impl Keystore for InMemoryKeystore {
    async fn get(&self, id: Uuid) -> StoreResult<KeychainInfo> {
        self.db
            .read()
            .await
            .get(&id)
            .map(|meta| meta.main.clone())
            .ok_or(StoreError::KeychainNotFound(id))
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

        let info = meta.main.clone();
        self.db.write().await.insert(info.id, meta);

        Ok(info)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        self.db
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::KeychainNotFound(id))
    }

    async fn reset(&self, id: Uuid) -> StoreResult<()> {
        let mut db = self.db.write().await;
        let meta = db.get_mut(&id).ok_or(StoreError::KeychainNotFound(id))?;

        meta.reset();

        Ok(())
    }

    async fn get_fresh_addresses(
        &self,
        id: Uuid,
        change: Change,
        size: u32,
    ) -> StoreResult<Vec<AddressInfo>> {
        let mut db = self.db.write().await;
        let mut meta = db
            .get(&id)
            .ok_or(StoreError::KeychainNotFound(id))?
            .clone();

        let addrs = ops::fresh_addresses(self.coin.as_ref(), &mut meta, change, size).await?;
        db.insert(id, meta);

        Ok(addrs)
    }

    async fn mark_path_as_used(&self, id: Uuid, path: DerivationPath) -> StoreResult<()> {
        let mut db = self.db.write().await;
        let meta = db.get_mut(&id).ok_or(StoreError::KeychainNotFound(id))?;

        ops::mark_path_as_used(meta, path);

        Ok(())
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
        let mut db = self.db.write().await;
        let mut meta = db
            .get(&id)
            .ok_or(StoreError::KeychainNotFound(id))?
            .clone();

        let addrs =
            ops::observable_addresses(self.coin.as_ref(), &mut meta, change, from_index, to_index)
                .await?;
        db.insert(id, meta);

        Ok(addrs)
    }

    async fn get_derivation_path(&self, id: Uuid, address: &str) -> StoreResult<DerivationPath> {
        let db = self.db.read().await;
        let meta = db.get(&id).ok_or(StoreError::KeychainNotFound(id))?;

        ops::derivation_path(meta, address)
    }

    async fn get_addresses_public_keys(
        &self,
        id: Uuid,
        derivations: &[DerivationPath],
    ) -> StoreResult<Vec<String>> {
        let db = self.db.read().await;
        let meta = db.get(&id).ok_or(StoreError::KeychainNotFound(id))?;

        ops::addresses_public_keys(meta, derivations)
    }
}

#[cfg(test)]
mod tests {
    use keychain_test_utils::MockCoinService;

    use super::*;

    fn mock_keystore() -> InMemoryKeystore {
        InMemoryKeystore::new(Arc::new(MockCoinService))
    }

    async fn create_bip84(store: &InMemoryKeystore) -> KeychainInfo {
        store
            .create(
                AccountKey::Xpub("xpub1111".to_owned()),
                Scheme::Bip84,
                Network::BitcoinMainnet,
                crate::DEFAULT_LOOKAHEAD_SIZE,
                0,
                String::new(),
            )
            .await
            .expect("create must succeed")
    }

    fn path(change: u32, index: u32) -> DerivationPath {
        DerivationPath::from_slice(&[change, index]).unwrap()
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = mock_keystore();
        let info = create_bip84(&store).await;

        assert_eq!(info.external_descriptor, "wpkh(xpub1111/0/*)");
        assert_eq!(info.internal_descriptor, "wpkh(xpub1111/1/*)");
        assert_eq!(info.extended_public_key, "xpub1111");
        assert_eq!(info.external_xpub, "xpub1111->0");
        assert_eq!(info.internal_xpub, "xpub1111->1");
        assert_eq!(info.lookahead_size, 20);
        assert_eq!(info.max_consecutive_external_index, 0);

        let fetched = store.get(info.id).await.unwrap();
        assert_eq!(fetched, info);

        assert!(matches!(
            store.get(Uuid::nil()).await,
            Err(StoreError::KeychainNotFound(_))
        ));
    }

    #[tokio::test]
    async fn create_is_idempotent_in_identity() {
        let store = mock_keystore();
        let first = create_bip84(&store).await;
        let second = create_bip84(&store).await;

        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn fresh_addresses_enumerate_from_zero() {
        let store = mock_keystore();
        let info = create_bip84(&store).await;

        let empty = store
            .get_fresh_addresses(info.id, Change::External, 0)
            .await
            .unwrap();
        assert!(empty.is_empty());

        let addrs = store
            .get_fresh_addresses(info.id, Change::External, 5)
            .await
            .unwrap();
        let got: Vec<&str> = addrs.iter().map(|a| a.address.as_str()).collect();
        assert_eq!(
            got,
            vec![
                "deadbeef00-BIP84-bitcoin_mainnet",
                "deadbeef01-BIP84-bitcoin_mainnet",
                "deadbeef02-BIP84-bitcoin_mainnet",
                "deadbeef03-BIP84-bitcoin_mainnet",
                "deadbeef04-BIP84-bitcoin_mainnet",
            ]
        );
        assert_eq!(addrs[0].derivation, path(0, 0));

        // Enumeration is pure bookkeeping: repeating the call yields the
        // same batch.
        let again = store
            .get_fresh_addresses(info.id, Change::External, 5)
            .await
            .unwrap();
        assert_eq!(addrs, again);
    }

    #[tokio::test]
    async fn marking_paths_tracks_and_closes_gaps() {
        let store = mock_keystore();
        let info = create_bip84(&store).await;

        // Each step marks one path and checks the next fresh batch on that
        // chain. The internal chain runs through a gap at 3 and 6 to check
        // the two chains stay independent.
        let workflow: &[(DerivationPath, Change, &[&str])] = &[
            (
                path(0, 0),
                Change::External,
                &[
                    "deadbeef01-BIP84-bitcoin_mainnet",
                    "deadbeef02-BIP84-bitcoin_mainnet",
                    "deadbeef03-BIP84-bitcoin_mainnet",
                    "deadbeef04-BIP84-bitcoin_mainnet",
                    "deadbeef05-BIP84-bitcoin_mainnet",
                ],
            ),
            (
                path(0, 2),
                Change::External,
                &[
                    "deadbeef01-BIP84-bitcoin_mainnet",
                    "deadbeef03-BIP84-bitcoin_mainnet",
                    "deadbeef04-BIP84-bitcoin_mainnet",
                    "deadbeef05-BIP84-bitcoin_mainnet",
                    "deadbeef06-BIP84-bitcoin_mainnet",
                ],
            ),
            (
                path(0, 1),
                Change::External,
                &[
                    "deadbeef03-BIP84-bitcoin_mainnet",
                    "deadbeef04-BIP84-bitcoin_mainnet",
                    "deadbeef05-BIP84-bitcoin_mainnet",
                    "deadbeef06-BIP84-bitcoin_mainnet",
                    "deadbeef07-BIP84-bitcoin_mainnet",
                ],
            ),
            (
                path(1, 0),
                Change::Internal,
                &[
                    "deadbeef01-BIP84-bitcoin_mainnet",
                    "deadbeef02-BIP84-bitcoin_mainnet",
                    "deadbeef03-BIP84-bitcoin_mainnet",
                    "deadbeef04-BIP84-bitcoin_mainnet",
                    "deadbeef05-BIP84-bitcoin_mainnet",
                ],
            ),
            (
                path(1, 3),
                Change::Internal,
                &[
                    "deadbeef01-BIP84-bitcoin_mainnet",
                    "deadbeef02-BIP84-bitcoin_mainnet",
                    "deadbeef04-BIP84-bitcoin_mainnet",
                    "deadbeef05-BIP84-bitcoin_mainnet",
                    "deadbeef06-BIP84-bitcoin_mainnet",
                ],
            ),
            (
                path(1, 6),
                Change::Internal,
                &[
                    "deadbeef01-BIP84-bitcoin_mainnet",
                    "deadbeef02-BIP84-bitcoin_mainnet",
                    "deadbeef04-BIP84-bitcoin_mainnet",
                    "deadbeef05-BIP84-bitcoin_mainnet",
                    "deadbeef07-BIP84-bitcoin_mainnet",
                ],
            ),
            (
                path(1, 1),
                Change::Internal,
                &[
                    "deadbeef02-BIP84-bitcoin_mainnet",
                    "deadbeef04-BIP84-bitcoin_mainnet",
                    "deadbeef05-BIP84-bitcoin_mainnet",
                    "deadbeef07-BIP84-bitcoin_mainnet",
                    "deadbeef08-BIP84-bitcoin_mainnet",
                ],
            ),
        ];

        for (mark, change, want) in workflow {
            store.mark_path_as_used(info.id, *mark).await.unwrap();

            let bulk = store
                .get_fresh_addresses(info.id, *change, 5)
                .await
                .unwrap();
            let got: Vec<&str> = bulk.iter().map(|a| a.address.as_str()).collect();
            assert_eq!(&got, want, "after marking {mark}");

            let single = store.get_fresh_address(info.id, *change).await.unwrap();
            assert_eq!(single.address, want[0]);
        }
    }

    #[tokio::test]
    async fn double_marking_is_a_noop() {
        let store = mock_keystore();
        let info = create_bip84(&store).await;

        for _ in 0..3 {
            store.mark_path_as_used(info.id, path(0, 0)).await.unwrap();
        }

        let fetched = store.get(info.id).await.unwrap();
        assert_eq!(fetched.max_consecutive_external_index, 1);
        assert!(fetched.non_consecutive_external_indexes.is_empty());
    }

    #[tokio::test]
    async fn contiguous_prefix_closes_all_gaps() {
        let store = mock_keystore();
        let info = create_bip84(&store).await;

        // Mark 0..=6 out of order; the prefix must end up gapless.
        for index in [3, 0, 5, 1, 6, 2, 4] {
            store.mark_path_as_used(info.id, path(0, index)).await.unwrap();
        }

        let fetched = store.get(info.id).await.unwrap();
        assert_eq!(fetched.max_consecutive_external_index, 7);
        assert!(fetched.non_consecutive_external_indexes.is_empty());
    }

    #[tokio::test]
    async fn observable_addresses_clamp_to_the_window() {
        let store = mock_keystore();
        let info = create_bip84(&store).await;

        // Window is [0, 19] on a fresh keychain: lookahead 20, no usage.
        let addrs = store
            .get_all_observable_addresses(info.id, Change::External, 0, (1 << 31) - 1)
            .await
            .unwrap();
        assert_eq!(addrs.len(), 20);
        assert_eq!(addrs[0].derivation, path(0, 0));
        assert_eq!(addrs[19].derivation, path(0, 19));

        let addrs = store
            .get_all_observable_addresses(info.id, Change::External, 5, 10)
            .await
            .unwrap();
        assert_eq!(addrs.len(), 6);
        assert_eq!(addrs[0].derivation, path(0, 5));

        let addrs = store
            .get_all_observable_addresses(info.id, Change::External, 25, 30)
            .await
            .unwrap();
        assert!(addrs.is_empty());
    }

    #[tokio::test]
    async fn lookups_resolve_addresses_and_public_keys() {
        let store = mock_keystore();
        let info = create_bip84(&store).await;

        store
            .get_fresh_addresses(info.id, Change::Internal, 5)
            .await
            .unwrap();

        let found = store
            .get_derivation_path(info.id, "deadbeef03-BIP84-bitcoin_mainnet")
            .await
            .unwrap();
        assert_eq!(found, path(1, 3));

        assert!(matches!(
            store.get_derivation_path(info.id, "unknown").await,
            Err(StoreError::AddressNotFound(_))
        ));

        let keys = store
            .get_addresses_public_keys(
                info.id,
                &[path(1, 0), path(1, 1), path(1, 2), path(1, 3), path(1, 4)],
            )
            .await
            .unwrap();
        assert_eq!(
            keys,
            vec!["deadbeef00", "deadbeef01", "deadbeef02", "deadbeef03", "deadbeef04"]
        );

        assert!(matches!(
            store
                .get_addresses_public_keys(info.id, &[path(1, 0), path(1, 9)])
                .await,
            Err(StoreError::DerivationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn mark_address_as_used_goes_through_the_cache() {
        let store = mock_keystore();
        let info = create_bip84(&store).await;

        let first = store.get_fresh_address(info.id, Change::Internal).await.unwrap();
        store
            .mark_address_as_used(info.id, &first.address)
            .await
            .unwrap();

        let next = store.get_fresh_address(info.id, Change::Internal).await.unwrap();
        assert_eq!(next.derivation, path(1, 1));

        assert!(matches!(
            store.mark_address_as_used(info.id, "unknown").await,
            Err(StoreError::AddressNotFound(_))
        ));
    }

    #[tokio::test]
    async fn reset_restarts_enumeration() {
        let store = mock_keystore();
        let info = create_bip84(&store).await;

        let first = store.get_fresh_address(info.id, Change::Internal).await.unwrap();
        store
            .mark_address_as_used(info.id, &first.address)
            .await
            .unwrap();

        store.reset(info.id).await.unwrap();

        let again = store.get_fresh_address(info.id, Change::Internal).await.unwrap();
        assert_eq!(again.derivation, path(1, 0));
        assert_eq!(again.address, first.address);
    }

    #[tokio::test]
    async fn delete_forgets_the_keychain() {
        let store = mock_keystore();
        let info = create_bip84(&store).await;

        store.delete(info.id).await.unwrap();

        assert!(matches!(
            store.get(info.id).await,
            Err(StoreError::KeychainNotFound(_))
        ));
        assert!(matches!(
            store.delete(info.id).await,
            Err(StoreError::KeychainNotFound(_))
        ));
    }

    #[tokio::test]
    async fn gap_bound_stays_above_the_prefix() {
        let store = mock_keystore();
        let info = create_bip84(&store).await;

        for index in [4, 9, 0, 2, 1] {
            store.mark_path_as_used(info.id, path(0, index)).await.unwrap();
        }

        let fetched = store.get(info.id).await.unwrap();
        let max = fetched.max_consecutive_external_index;
        let min_gap = fetched
            .non_consecutive_external_indexes
            .iter()
            .min()
            .copied();

        assert_eq!(max, 3);
        assert_eq!(min_gap, Some(4));
        assert!(min_gap.unwrap() > max);
    }
}
