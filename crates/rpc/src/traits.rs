//! Traits for the RPC server.

use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use keychain_primitives::Change;
use uuid::Uuid;

use crate::types::{CreateKeychainRequest, RpcAddressInfo, RpcKeychainInfo};

/// RPCs related to information about the service itself.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "keychain"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "keychain"))]
pub trait KeychainControlApi {
    /// Get the uptime of the service in seconds.
    #[method(name = "uptime")]
    async fn uptime(&self) -> RpcResult<u64>;
}

/// The keychain registry operations.
#[cfg_attr(not(feature = "client"), rpc(server, namespace = "keychain"))]
#[cfg_attr(feature = "client", rpc(server, client, namespace = "keychain"))]
pub trait KeychainApi {
    /// Registers a keychain for an account and returns its public
    /// information.
    #[method(name = "createKeychain")]
    async fn create_keychain(&self, request: CreateKeychainRequest)
        -> RpcResult<RpcKeychainInfo>;

    /// Returns the stored information of a registered keychain.
    #[method(name = "getKeychainInfo")]
    async fn get_keychain_info(&self, keychain_id: Uuid) -> RpcResult<RpcKeychainInfo>;

    /// Removes a keychain and everything derived from it.
    #[method(name = "deleteKeychain")]
    async fn delete_keychain(&self, keychain_id: Uuid) -> RpcResult<()>;

    /// Clears the usage counters and derivation caches of a keychain.
    #[method(name = "resetKeychain")]
    async fn reset_keychain(&self, keychain_id: Uuid) -> RpcResult<()>;

    /// Returns `batch_size` fresh addresses on the given chain.
    #[method(name = "getFreshAddresses")]
    async fn get_fresh_addresses(
        &self,
        keychain_id: Uuid,
        change: Change,
        batch_size: u32,
    ) -> RpcResult<Vec<RpcAddressInfo>>;

    /// Marks every listed address as having transaction history. Aborts on
    /// the first unknown address.
    #[method(name = "markAddressesAsUsed")]
    async fn mark_addresses_as_used(
        &self,
        keychain_id: Uuid,
        addresses: Vec<String>,
    ) -> RpcResult<()>;

    /// Returns every observable address in the inclusive index range.
    ///
    /// An absent `change` means both chains; an absent or zero `to_index`
    /// means the whole observable window.
    #[method(name = "getAllObservableAddresses")]
    async fn get_all_observable_addresses(
        &self,
        keychain_id: Uuid,
        change: Option<Change>,
        from_index: u32,
        to_index: Option<u32>,
    ) -> RpcResult<Vec<RpcAddressInfo>>;

    /// Returns the hex public keys cached at the given `[change, index]`
    /// derivation paths, preserving input order.
    #[method(name = "getAddressesPublicKeys")]
    async fn get_addresses_public_keys(
        &self,
        keychain_id: Uuid,
        derivations: Vec<Vec<u32>>,
    ) -> RpcResult<Vec<String>>;
}
