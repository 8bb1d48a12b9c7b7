//! Keystore errors.

use keychain_coin_service::CoinError;
use keychain_primitives::{DerivationPath, Network, Scheme, TypeError};
use thiserror::Error;
use uuid::Uuid;

use crate::wd_state::WdStateError;

/// Result type for keystore operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by keystore operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No keychain is registered under the given id.
    #[error("keychain not found: {0}")]
    KeychainNotFound(Uuid),

    /// The address was never derived by this keychain.
    #[error("address not found: {0}")]
    AddressNotFound(String),

    /// No public key has been cached for the given path.
    #[error("derivation not found: {0}")]
    DerivationNotFound(DerivationPath),

    /// The keychain metadata is not of the `<prefix>:<workspace>` form.
    #[error("invalid metadata: {0}")]
    InvalidMetadata(String),

    /// The (network, scheme) pair has no wallet-daemon wallet type.
    #[error("no wallet type for network {network} and scheme {scheme}")]
    UnknownWalletType {
        /// The offending network.
        network: Network,
        /// The offending scheme.
        scheme: Scheme,
    },

    /// A vocabulary conversion failed.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// The coin service reported a failure; propagated unchanged.
    #[error("coin service: {0}")]
    Coin(#[from] CoinError),

    /// The legacy state blob could not be decoded.
    #[error("wallet-daemon state: {0}")]
    WdState(#[from] WdStateError),

    /// The Redis backend reported a failure.
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    /// The persisted keychain state could not be (de)serialized.
    #[error("persisted state: {0}")]
    Codec(#[from] serde_json::Error),
}
