//! Coin-service errors.

use thiserror::Error;

/// Errors raised by coin-service implementations.
#[derive(Debug, Error)]
pub enum CoinError {
    /// BIP32 parsing or derivation failed.
    #[error("bip32: {0}")]
    Bip32(#[from] bitcoin::bip32::Error),

    /// The provided public key is not a valid compressed SEC1 key.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(bitcoin::secp256k1::Error),

    /// The provided chain code is not exactly 32 bytes.
    #[error("invalid chain code length: {0}")]
    InvalidChainCode(usize),

    /// Witness-program encoding failed.
    #[error("bech32: {0}")]
    Bech32(#[from] bech32::segwit::EncodeError),
}
