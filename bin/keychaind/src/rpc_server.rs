//! Bootstraps the RPC server for the keychain service.

use std::{sync::Arc, time::Instant};

use anyhow::Context;
use async_trait::async_trait;
use jsonrpsee::{
    core::RpcResult,
    server::ServerBuilder,
    types::{error::INVALID_PARAMS_CODE, ErrorObjectOwned},
    RpcModule,
};
use keychain_primitives::{Change, DerivationPath};
use keychain_rpc::{
    error_codes,
    traits::{KeychainApiServer, KeychainControlApiServer},
    types::{CreateKeychainRequest, RpcAddressInfo, RpcKeychainInfo},
};
use keychain_store::{
    AccountKey, AddressInfo, FromChainCode, KeychainInfo, Keystore, StoreError,
    DEFAULT_LOOKAHEAD_SIZE,
};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Substituted for an absent or zero `to_index`: the range is then bounded
/// by the observable window alone.
const MAX_TO_INDEX: u32 = (1 << 31) - 1;

/// RPC server for the keychain service. Holds a handle to the keystore.
#[derive(Clone)]
pub(crate) struct KeychainRpc {
    /// Service start time, for the uptime method.
    start_time: Instant,

    /// Keystore handle.
    store: Arc<dyn Keystore>,
}

impl KeychainRpc {
    /// Creates a new instance of [`KeychainRpc`].
    pub(crate) fn new(store: Arc<dyn Keystore>) -> Self {
        Self {
            start_time: Instant::now(),
            store,
        }
    }
}

#[async_trait]
impl KeychainControlApiServer for KeychainRpc {
    async fn uptime(&self) -> RpcResult<u64> {
        Ok(self.start_time.elapsed().as_secs())
    }
}

#[async_trait]
impl KeychainApiServer for KeychainRpc {
    async fn create_keychain(
        &self,
        request: CreateKeychainRequest,
    ) -> RpcResult<RpcKeychainInfo> {
        let account = account_key(&request)?;

        let lookahead_size = match request.lookahead_size {
            None | Some(0) => DEFAULT_LOOKAHEAD_SIZE,
            Some(size) => size,
        };

        let info = self
            .store
            .create(
                account,
                request.scheme,
                request.network,
                lookahead_size,
                request.account_index,
                request.metadata,
            )
            .await
            .map_err(|err| {
                error!(%err, "createKeychain failed");
                to_rpc_error(err)
            })?;

        info!(id = %info.id, scheme = %info.scheme, network = %info.network, "created keychain");

        Ok(info_response(info))
    }

    async fn get_keychain_info(&self, keychain_id: Uuid) -> RpcResult<RpcKeychainInfo> {
        self.store
            .get(keychain_id)
            .await
            .map(info_response)
            .map_err(to_rpc_error)
    }

    async fn delete_keychain(&self, keychain_id: Uuid) -> RpcResult<()> {
        self.store.delete(keychain_id).await.map_err(|err| {
            error!(id = %keychain_id, %err, "deleteKeychain failed");
            to_rpc_error(err)
        })?;

        info!(id = %keychain_id, "deleted keychain");

        Ok(())
    }

    async fn reset_keychain(&self, keychain_id: Uuid) -> RpcResult<()> {
        self.store.reset(keychain_id).await.map_err(|err| {
            error!(id = %keychain_id, %err, "resetKeychain failed");
            to_rpc_error(err)
        })?;

        info!(id = %keychain_id, "reset keychain");

        Ok(())
    }

    async fn get_fresh_addresses(
        &self,
        keychain_id: Uuid,
        change: Change,
        batch_size: u32,
    ) -> RpcResult<Vec<RpcAddressInfo>> {
        let addrs = self
            .store
            .get_fresh_addresses(keychain_id, change, batch_size)
            .await
            .map_err(|err| {
                error!(id = %keychain_id, %change, %err, "getFreshAddresses failed");
                to_rpc_error(err)
            })?;

        Ok(addrs.into_iter().map(address_response).collect())
    }

    async fn mark_addresses_as_used(
        &self,
        keychain_id: Uuid,
        addresses: Vec<String>,
    ) -> RpcResult<()> {
        for address in &addresses {
            self.store
                .mark_address_as_used(keychain_id, address)
                .await
                .map_err(|err| {
                    error!(id = %keychain_id, %address, %err, "markAddressesAsUsed failed");
                    to_rpc_error(err)
                })?;
        }

        info!(id = %keychain_id, num = addresses.len(), "marked addresses as used");

        Ok(())
    }

    async fn get_all_observable_addresses(
        &self,
        keychain_id: Uuid,
        change: Option<Change>,
        from_index: u32,
        to_index: Option<u32>,
    ) -> RpcResult<Vec<RpcAddressInfo>> {
        // A left-out upper bound means "everything observable".
        let to_index = match to_index {
            None | Some(0) => MAX_TO_INDEX,
            Some(index) => index,
        };

        // A left-out change filter means both chains.
        let changes = match change {
            Some(change) => vec![change],
            None => vec![Change::External, Change::Internal],
        };

        let mut addrs = Vec::new();
        for change in changes {
            info!(
                id = %keychain_id,
                %change,
                range = ?(from_index, to_index),
                "getAllObservableAddresses: fetching from keystore"
            );

            let batch = self
                .store
                .get_all_observable_addresses(keychain_id, change, from_index, to_index)
                .await
                .map_err(|err| {
                    error!(id = %keychain_id, %change, %err, "getAllObservableAddresses failed");
                    to_rpc_error(err)
                })?;

            addrs.extend(batch);
        }

        Ok(addrs.into_iter().map(address_response).collect())
    }

    async fn get_addresses_public_keys(
        &self,
        keychain_id: Uuid,
        derivations: Vec<Vec<u32>>,
    ) -> RpcResult<Vec<String>> {
        let paths = derivations
            .iter()
            .map(|path| DerivationPath::from_slice(path))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| invalid_params(err.to_string()))?;

        self.store
            .get_addresses_public_keys(keychain_id, &paths)
            .await
            .map_err(|err| {
                error!(id = %keychain_id, %err, "getAddressesPublicKeys failed");
                to_rpc_error(err)
            })
    }
}

/// Starts the RPC server and blocks until a shutdown signal arrives.
pub(crate) async fn start_rpc(store: Arc<dyn Keystore>, rpc_addr: &str) -> anyhow::Result<()> {
    let rpc = KeychainRpc::new(store);

    let mut module = RpcModule::new(());
    module
        .merge(KeychainApiServer::into_rpc(rpc.clone()))
        .context("merge keychain api")?;
    module
        .merge(KeychainControlApiServer::into_rpc(rpc))
        .context("merge control api")?;

    info!(%rpc_addr, "starting keychain RPC server");
    let server = ServerBuilder::new()
        .build(rpc_addr)
        .await
        .context("build rpc server")?;

    let handle = server.start(module);
    info!(%rpc_addr, "keychain RPC server started");

    tokio::signal::ctrl_c()
        .await
        .context("listen for shutdown signal")?;

    info!("stopping RPC server");
    if handle.stop().is_err() {
        warn!("rpc server already stopped");
    }
    handle.stopped().await;

    Ok(())
}

/// Resolves the account union of a create request.
fn account_key(request: &CreateKeychainRequest) -> Result<AccountKey, ErrorObjectOwned> {
    match (&request.extended_public_key, &request.from_chain_code) {
        (Some(xpub), None) => Ok(AccountKey::Xpub(xpub.clone())),
        (None, Some(from_chain_code)) => {
            let public_key = hex::decode(&from_chain_code.public_key)
                .map_err(|_| invalid_params("from_chain_code.public_key must be hex"))?;
            let chain_code = hex::decode(&from_chain_code.chain_code)
                .map_err(|_| invalid_params("from_chain_code.chain_code must be hex"))?;

            Ok(AccountKey::ChainCode(FromChainCode {
                public_key,
                chain_code,
                account_index: from_chain_code.account_index,
            }))
        }
        _ => Err(invalid_params(
            "exactly one of extended_public_key and from_chain_code must be supplied",
        )),
    }
}

fn info_response(info: KeychainInfo) -> RpcKeychainInfo {
    RpcKeychainInfo {
        keychain_id: info.id,
        external_descriptor: info.external_descriptor,
        internal_descriptor: info.internal_descriptor,
        extended_public_key: info.extended_public_key,
        slip32_extended_public_key: info.slip32_extended_public_key,
        external_xpub: info.external_xpub,
        internal_xpub: info.internal_xpub,
        max_consecutive_external_index: info.max_consecutive_external_index,
        max_consecutive_internal_index: info.max_consecutive_internal_index,
        non_consecutive_external_indexes: info.non_consecutive_external_indexes,
        non_consecutive_internal_indexes: info.non_consecutive_internal_indexes,
        lookahead_size: info.lookahead_size,
        account_index: info.account_index,
        metadata: info.metadata,
        scheme: info.scheme,
        network: info.network,
    }
}

fn address_response(addr: AddressInfo) -> RpcAddressInfo {
    RpcAddressInfo {
        address: addr.address,
        derivation: addr.derivation.to_array(),
        change: addr.change,
    }
}

fn to_rpc_error(err: StoreError) -> ErrorObjectOwned {
    let code = match &err {
        StoreError::KeychainNotFound(_) => error_codes::KEYCHAIN_NOT_FOUND,
        StoreError::AddressNotFound(_) => error_codes::ADDRESS_NOT_FOUND,
        StoreError::DerivationNotFound(_) => error_codes::DERIVATION_NOT_FOUND,
        StoreError::InvalidMetadata(_)
        | StoreError::UnknownWalletType { .. }
        | StoreError::Type(_) => INVALID_PARAMS_CODE,
        StoreError::Coin(_) => error_codes::COIN_SERVICE,
        StoreError::WdState(_) | StoreError::Redis(_) | StoreError::Codec(_) => {
            error_codes::STORAGE
        }
    };

    ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
}

fn invalid_params(message: impl Into<String>) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(INVALID_PARAMS_CODE, message.into(), None::<()>)
}
