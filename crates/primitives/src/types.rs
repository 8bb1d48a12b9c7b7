//! Address schemes, networks and the change selector.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::TypeError;

/// The derivation scheme a keychain is based on.
///
/// The scheme decides the address-encoding family: BIP44 issues legacy P2PKH
/// addresses, BIP49 wrapped-segwit P2SH-P2WPKH and BIP84 native-segwit
/// P2WPKH.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    /// Legacy P2PKH keychain.
    #[serde(rename = "BIP44")]
    Bip44,

    /// Wrapped segwit P2SH-P2WPKH keychain.
    #[serde(rename = "BIP49")]
    Bip49,

    /// Native segwit P2WPKH keychain.
    #[serde(rename = "BIP84")]
    Bip84,
}

impl Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scheme::Bip44 => write!(f, "BIP44"),
            Scheme::Bip49 => write!(f, "BIP49"),
            Scheme::Bip84 => write!(f, "BIP84"),
        }
    }
}

impl FromStr for Scheme {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BIP44" => Ok(Scheme::Bip44),
            "BIP49" => Ok(Scheme::Bip49),
            "BIP84" => Ok(Scheme::Bip84),
            other => Err(TypeError::UnrecognizedScheme(other.to_owned())),
        }
    }
}

/// The network a keychain serializes addresses for.
///
/// The identifiers double as the persisted string form, so they must stay
/// stable across releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    /// The main Bitcoin network.
    BitcoinMainnet,

    /// The current Bitcoin test network.
    BitcoinTestnet3,

    /// The Bitcoin regression-test network.
    BitcoinRegtest,

    /// The main Litecoin network.
    LitecoinMainnet,
}

impl Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Network::BitcoinMainnet => "bitcoin_mainnet",
            Network::BitcoinTestnet3 => "bitcoin_testnet3",
            Network::BitcoinRegtest => "bitcoin_regtest",
            Network::LitecoinMainnet => "litecoin_mainnet",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Network {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bitcoin_mainnet" => Ok(Network::BitcoinMainnet),
            "bitcoin_testnet3" => Ok(Network::BitcoinTestnet3),
            "bitcoin_regtest" => Ok(Network::BitcoinRegtest),
            "litecoin_mainnet" => Ok(Network::LitecoinMainnet),
            other => Err(TypeError::UnrecognizedNetwork(other.to_owned())),
        }
    }
}

/// The BIP32 path-level-4 selector: external (receive) or internal (change)
/// chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Change {
    /// The receive chain, child index 0.
    External,

    /// The change chain, child index 1.
    Internal,
}

impl Change {
    /// The BIP32 child index this chain lives under.
    pub const fn index(&self) -> u32 {
        match self {
            Change::External => 0,
            Change::Internal => 1,
        }
    }
}

impl Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::External => write!(f, "external"),
            Change::Internal => write!(f, "internal"),
        }
    }
}

impl From<Change> for u32 {
    fn from(change: Change) -> Self {
        change.index()
    }
}

impl TryFrom<u32> for Change {
    type Error = TypeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Change::External),
            1 => Ok(Change::Internal),
            other => Err(TypeError::UnrecognizedChange(other)),
        }
    }
}
