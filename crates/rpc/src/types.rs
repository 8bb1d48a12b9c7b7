//! Wire types for the keychain RPC surface.

use keychain_primitives::{Change, Network, Scheme};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw account key material, hex-encoded for the wire. The server assembles
/// the account-level extended key from it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcFromChainCode {
    /// Compressed SEC1 public key of the account node, hex.
    pub public_key: String,

    /// BIP32 chain code of the account node, hex.
    pub chain_code: String,

    /// Hardened account index the node lives under.
    pub account_index: u32,
}

/// Parameters of `keychain_createKeychain`.
///
/// Exactly one of `extended_public_key` and `from_chain_code` must be
/// supplied. A missing or zero `lookahead_size` selects the server default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateKeychainRequest {
    /// Serialized account-level extended public key.
    #[serde(default)]
    pub extended_public_key: Option<String>,

    /// Raw account key material instead of a serialized key.
    #[serde(default)]
    pub from_chain_code: Option<RpcFromChainCode>,

    /// Size of the lookahead zone.
    #[serde(default)]
    pub lookahead_size: Option<u32>,

    /// Derivation scheme of the keychain.
    pub scheme: Scheme,

    /// Network addresses are encoded for.
    pub network: Network,

    /// Account index within its wallet.
    #[serde(default)]
    pub account_index: u32,

    /// Opaque metadata forwarded to the store.
    #[serde(default)]
    pub metadata: String,
}

/// Public keychain information returned to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcKeychainInfo {
    /// Keychain id, canonical UUID form.
    pub keychain_id: Uuid,

    /// Output descriptor of the receive chain.
    pub external_descriptor: String,

    /// Output descriptor of the change chain.
    pub internal_descriptor: String,

    /// Account-level extended public key.
    pub extended_public_key: String,

    /// Account-level extended public key, SLIP-0132 version bytes.
    pub slip32_extended_public_key: String,

    /// Receive-chain extended public key at depth 4.
    pub external_xpub: String,

    /// Change-chain extended public key at depth 4.
    pub internal_xpub: String,

    /// Smallest receive index above the gapless used prefix.
    pub max_consecutive_external_index: u32,

    /// Smallest change index above the gapless used prefix.
    pub max_consecutive_internal_index: u32,

    /// Used receive indexes above the consecutive prefix.
    pub non_consecutive_external_indexes: Vec<u32>,

    /// Used change indexes above the consecutive prefix.
    pub non_consecutive_internal_indexes: Vec<u32>,

    /// Size of the lookahead zone.
    pub lookahead_size: u32,

    /// Account index within its wallet.
    pub account_index: u32,

    /// Opaque caller-supplied metadata.
    pub metadata: String,

    /// Derivation scheme of the keychain.
    pub scheme: Scheme,

    /// Network addresses are encoded for.
    pub network: Network,
}

/// A derived address with its position in the keychain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcAddressInfo {
    /// The encoded address.
    pub address: String,

    /// Two-level derivation path, `[change, index]`.
    pub derivation: [u32; 2],

    /// The chain the address lives on.
    pub change: Change,
}
