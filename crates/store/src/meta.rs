//! Keychain state: public information, usage counters and derivation caches.

use std::collections::HashMap;

use keychain_primitives::{Change, DerivationPath, Network, Scheme};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace under which keychain ids are derived.
const KEYCHAIN_ID_NAMESPACE: Uuid = uuid::uuid!("87f38b13-7215-4fb9-8155-5ee05e1cb61b");

/// Derives the deterministic id of a keychain.
///
/// The id is the UUIDv5 of the account key concatenated with the scheme
/// identifier, so registering the same account twice yields the same id.
pub fn keychain_id(extended_public_key: &str, scheme: Scheme) -> Uuid {
    let mut name = extended_public_key.as_bytes().to_vec();
    name.extend_from_slice(scheme.to_string().as_bytes());

    Uuid::new_v5(&KEYCHAIN_ID_NAMESPACE, &name)
}

/// Raw account key material supplied instead of a serialized extended key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FromChainCode {
    /// Compressed SEC1 public key of the account node.
    pub public_key: Vec<u8>,

    /// BIP32 chain code of the account node, 32 bytes.
    pub chain_code: Vec<u8>,

    /// Hardened account index the node lives under.
    pub account_index: u32,
}

/// The account key supplied at registration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccountKey {
    /// A serialized account-level extended public key.
    Xpub(String),

    /// Raw key material; the coin service assembles the account key.
    ChainCode(FromChainCode),
}

/// A derived address together with its position in the keychain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressInfo {
    /// The encoded address.
    pub address: String,

    /// The depth-4/5 derivation path of the address.
    pub derivation: DerivationPath,

    /// The chain the address lives on.
    pub change: Change,
}

/// Public information about a registered keychain.
///
/// The identity fields are immutable after registration; the usage counters
/// and gap sets are maintained exclusively by the mark-as-used bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeychainInfo {
    /// Deterministic keychain id, see [`keychain_id`].
    pub id: Uuid,

    /// Output descriptor of the receive chain.
    pub external_descriptor: String,

    /// Output descriptor of the change chain.
    pub internal_descriptor: String,

    /// Account-level extended public key, standard HD version bytes.
    pub extended_public_key: String,

    /// Account-level extended public key, SLIP-0132 HD version bytes.
    pub slip32_extended_public_key: String,

    /// Receive-chain extended public key at HD tree depth 4.
    pub external_xpub: String,

    /// Smallest receive index above the gapless used prefix.
    pub max_consecutive_external_index: u32,

    /// Change-chain extended public key at HD tree depth 4.
    pub internal_xpub: String,

    /// Smallest change index above the gapless used prefix.
    pub max_consecutive_internal_index: u32,

    /// Used receive indexes strictly above the consecutive prefix.
    #[serde(default)]
    pub non_consecutive_external_indexes: Vec<u32>,

    /// Used change indexes strictly above the consecutive prefix.
    #[serde(default)]
    pub non_consecutive_internal_indexes: Vec<u32>,

    /// Size of the lookahead zone.
    pub lookahead_size: u32,

    /// Account index within its wallet.
    #[serde(default)]
    pub account_index: u32,

    /// Opaque caller-supplied metadata, `<prefix>:<workspace>` for keychains
    /// projected into the wallet-daemon layout.
    #[serde(default)]
    pub metadata: String,

    /// Derivation scheme of the keychain.
    pub scheme: Scheme,

    /// Network addresses are encoded for.
    pub network: Network,
}

impl KeychainInfo {
    /// The depth-4 extended public key of the given chain.
    pub fn change_xpub(&self, change: Change) -> &str {
        match change {
            Change::External => &self.external_xpub,
            Change::Internal => &self.internal_xpub,
        }
    }

    /// The smallest index of the given chain such that all indexes strictly
    /// below are used without a gap.
    pub fn max_consecutive_index(&self, change: Change) -> u32 {
        match change {
            Change::External => self.max_consecutive_external_index,
            Change::Internal => self.max_consecutive_internal_index,
        }
    }

    /// Commits a new consecutive-prefix boundary for the given chain.
    pub fn set_max_consecutive_index(&mut self, change: Change, index: u32) {
        match change {
            Change::External => self.max_consecutive_external_index = index,
            Change::Internal => self.max_consecutive_internal_index = index,
        }
    }

    /// The used indexes of the given chain that sit above the consecutive
    /// prefix.
    pub fn non_consecutive_indexes(&self, change: Change) -> &[u32] {
        match change {
            Change::External => &self.non_consecutive_external_indexes,
            Change::Internal => &self.non_consecutive_internal_indexes,
        }
    }

    /// Commits the gap set of the given chain, dropping any index the
    /// consecutive prefix has since absorbed.
    pub fn set_non_consecutive_indexes(&mut self, change: Change, indexes: Vec<u32>) {
        let max = self.max_consecutive_index(change);
        let filtered: Vec<u32> = indexes.into_iter().filter(|&index| index >= max).collect();

        match change {
            Change::External => self.non_consecutive_external_indexes = filtered,
            Change::Internal => self.non_consecutive_internal_indexes = filtered,
        }
    }

    /// The upper bound (inclusive) of the observable window of the given
    /// chain.
    pub fn max_observable_index(&self, change: Change) -> u32 {
        let gaps = self.non_consecutive_indexes(change).len() as u32;

        (self.max_consecutive_index(change) + gaps + self.lookahead_size).saturating_sub(1)
    }
}

/// A [`KeychainInfo`] plus the derivation caches: path to public key, and
/// address back to path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeychainMeta {
    /// Public keychain information.
    pub main: KeychainInfo,

    /// Hex public key at HD tree depth 5, per derivation path.
    #[serde(default)]
    pub derivations: HashMap<DerivationPath, String>,

    /// Derivation path per derived address.
    #[serde(default)]
    pub addresses: HashMap<String, DerivationPath>,
}

impl KeychainMeta {
    /// Forgets all usage bookkeeping and cached derivations.
    ///
    /// Identity fields and the non-consecutive sets are left untouched, so a
    /// reset keychain issues addresses from index 0 again.
    pub fn reset(&mut self) {
        self.main.max_consecutive_external_index = 0;
        self.main.max_consecutive_internal_index = 0;
        self.derivations.clear();
        self.addresses.clear();
    }
}
