//! The coin-service capability consumed by the keychain core.
//!
//! The keychain never touches key material directly; everything
//! protocol-level goes through the three operations of [`CoinService`]:
//! one-level BIP32 public derivation, account-key assembly from raw
//! (public key, chain code) material, and address encoding. The in-process
//! implementation lives in [`bitcoin::BitcoinCoinService`]; test suites
//! substitute a deterministic mock.

pub mod bitcoin;
pub mod errors;

use async_trait::async_trait;
use keychain_primitives::{Network, Scheme};

pub use crate::{bitcoin::BitcoinCoinService, errors::CoinError};

/// Result type for coin-service operations.
pub type CoinResult<T> = Result<T, CoinError>;

/// How a public key is serialized into an address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressEncoding {
    /// Legacy pay-to-pubkey-hash.
    P2pkh,

    /// Wrapped segwit: P2WPKH nested in P2SH.
    P2shP2wpkh,

    /// Native segwit v0 pay-to-witness-pubkey-hash.
    P2wpkh,
}

impl From<Scheme> for AddressEncoding {
    fn from(scheme: Scheme) -> Self {
        match scheme {
            Scheme::Bip44 => AddressEncoding::P2pkh,
            Scheme::Bip49 => AddressEncoding::P2shP2wpkh,
            Scheme::Bip84 => AddressEncoding::P2wpkh,
        }
    }
}

/// An extended public key alongside its raw components, as returned by
/// derivation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedKey {
    /// Serialized extended public key of the derived node.
    pub extended_key: String,

    /// Compressed SEC1 public key of the derived node.
    pub public_key: Vec<u8>,

    /// BIP32 chain code of the derived node.
    pub chain_code: Vec<u8>,
}

/// Protocol-level operations the keychain consumes.
///
/// Implementations must be deterministic: deriving the same key at the same
/// path, or encoding the same public key, always yields the same result.
/// Failures are propagated to the caller unchanged; the core never retries.
#[async_trait]
pub trait CoinService: Send + Sync {
    /// Derives a child of `extended_key` along `derivation`, one
    /// non-hardened level per element.
    async fn derive_extended_key(
        &self,
        extended_key: &str,
        derivation: &[u32],
    ) -> CoinResult<DerivedKey>;

    /// Assembles the account-level (depth 3) extended public key from raw
    /// key material and the hardened account index.
    async fn get_account_extended_key(
        &self,
        network: Network,
        public_key: &[u8],
        chain_code: &[u8],
        account_index: u32,
    ) -> CoinResult<String>;

    /// Serializes a compressed public key into an address for the given
    /// encoding and network.
    async fn encode_address(
        &self,
        public_key: &[u8],
        encoding: AddressEncoding,
        network: Network,
    ) -> CoinResult<String>;
}
