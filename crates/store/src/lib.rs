//! Keychain state machine and storage backends.
//!
//! A keychain registers an account-level extended public key and hands out
//! fresh (never used on-chain) receive and change addresses, while keeping a
//! bounded observable window open for chain scanning. The bookkeeping lives
//! in [`KeychainMeta`]; the [`Keystore`] trait is the storage contract with
//! three implementations: an in-memory map, a Redis keyspace, and a Redis
//! keyspace that additionally projects every write into the legacy
//! wallet-daemon layout.

pub mod errors;
pub mod memory;
pub mod meta;
mod ops;
pub mod redis;
pub mod wd;
pub mod wd_state;

use async_trait::async_trait;
use keychain_primitives::{Change, DerivationPath, Network, Scheme};
use uuid::Uuid;

pub use crate::{
    errors::{StoreError, StoreResult},
    memory::InMemoryKeystore,
    meta::{keychain_id, AccountKey, AddressInfo, FromChainCode, KeychainInfo, KeychainMeta},
    redis::RedisKeystore,
    wd::WdKeystore,
};

/// Lookahead window used when a registration does not specify one.
pub const DEFAULT_LOOKAHEAD_SIZE: u32 = 20;

/// Storage contract shared by all keychain backends.
///
/// Mutating operations are load-mutate-store: observable state is only
/// committed after the in-memory mutation fully succeeded, so a failed
/// operation leaves the stored keychain untouched.
#[async_trait]
pub trait Keystore: Send + Sync {
    /// Returns the stored information for a registered keychain.
    async fn get(&self, id: Uuid) -> StoreResult<KeychainInfo>;

    /// Registers a keychain for the given account key and persists its
    /// initial state.
    ///
    /// The keychain id is derived deterministically from the extended public
    /// key and the scheme, so re-registering the same account overwrites the
    /// stored state.
    async fn create(
        &self,
        account: AccountKey,
        scheme: Scheme,
        network: Network,
        lookahead_size: u32,
        account_index: u32,
        metadata: String,
    ) -> StoreResult<KeychainInfo>;

    /// Removes a keychain and everything derived from it.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;

    /// Clears the usage counters and the derivation caches of a keychain,
    /// keeping its identity.
    async fn reset(&self, id: Uuid) -> StoreResult<()>;

    /// Returns `size` fresh addresses on the given chain, skipping indexes
    /// already known to be used.
    async fn get_fresh_addresses(
        &self,
        id: Uuid,
        change: Change,
        size: u32,
    ) -> StoreResult<Vec<AddressInfo>>;

    /// Returns the next fresh address on the given chain.
    async fn get_fresh_address(&self, id: Uuid, change: Change) -> StoreResult<AddressInfo> {
        let mut addrs = self.get_fresh_addresses(id, change, 1).await?;
        Ok(addrs.remove(0))
    }

    /// Records that the address at `path` has transaction history.
    async fn mark_path_as_used(&self, id: Uuid, path: DerivationPath) -> StoreResult<()>;

    /// Looks up the derivation path of `address` and marks it as used.
    async fn mark_address_as_used(&self, id: Uuid, address: &str) -> StoreResult<()>;

    /// Materializes every address of the given chain in the inclusive range
    /// `from_index ..= min(to_index, max observable index)`.
    async fn get_all_observable_addresses(
        &self,
        id: Uuid,
        change: Change,
        from_index: u32,
        to_index: u32,
    ) -> StoreResult<Vec<AddressInfo>>;

    /// Returns the derivation path a previously derived address belongs to.
    async fn get_derivation_path(&self, id: Uuid, address: &str) -> StoreResult<DerivationPath>;

    /// Returns the cached public keys at the given paths, preserving input
    /// order. A single unknown path aborts the batch.
    async fn get_addresses_public_keys(
        &self,
        id: Uuid,
        derivations: &[DerivationPath],
    ) -> StoreResult<Vec<String>>;
}
