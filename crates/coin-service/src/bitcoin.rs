//! In-process coin service backed by the `bitcoin` crate.

use std::str::FromStr;

use async_trait::async_trait;
use bech32::{hrp, hrp::Hrp, segwit, Fe32};
use bitcoin::{
    base58,
    bip32::{ChildNumber, Xpub},
    hashes::{hash160, Hash},
    secp256k1::{self, Secp256k1, VerifyOnly},
};
use keychain_primitives::Network;

use crate::{AddressEncoding, CoinError, CoinResult, CoinService, DerivedKey};

/// Depth of an account-level node (`m/purpose'/coin'/account'`).
const ACCOUNT_DEPTH: u8 = 3;

/// Offset of hardened child numbers.
const HARDENED_OFFSET: u32 = 1 << 31;

/// BIP32 version bytes for mainnet extended public keys.
const XPUB_VERSION_MAINNET: [u8; 4] = [0x04, 0x88, 0xB2, 0x1E];

/// BIP32 version bytes for testnet extended public keys.
const XPUB_VERSION_TESTNET: [u8; 4] = [0x04, 0x35, 0x87, 0xCF];

/// Address-serialization parameters of one chain.
struct ChainParams {
    /// Version byte of P2PKH base58check addresses.
    p2pkh_version: u8,

    /// Version byte of P2SH base58check addresses.
    p2sh_version: u8,

    /// Human-readable part of segwit addresses.
    hrp: Hrp,

    /// Version bytes of serialized extended public keys.
    xpub_version: [u8; 4],
}

const fn chain_params(network: Network) -> ChainParams {
    match network {
        Network::BitcoinMainnet => ChainParams {
            p2pkh_version: 0x00,
            p2sh_version: 0x05,
            hrp: hrp::BC,
            xpub_version: XPUB_VERSION_MAINNET,
        },
        Network::BitcoinTestnet3 => ChainParams {
            p2pkh_version: 0x6F,
            p2sh_version: 0xC4,
            hrp: hrp::TB,
            xpub_version: XPUB_VERSION_TESTNET,
        },
        Network::BitcoinRegtest => ChainParams {
            p2pkh_version: 0x6F,
            p2sh_version: 0xC4,
            hrp: hrp::BCRT,
            xpub_version: XPUB_VERSION_TESTNET,
        },
        Network::LitecoinMainnet => ChainParams {
            p2pkh_version: 0x30,
            p2sh_version: 0x32,
            hrp: Hrp::parse_unchecked("ltc"),
            xpub_version: XPUB_VERSION_MAINNET,
        },
    }
}

/// Coin service implementation performing BIP32 public derivation and
/// address encoding in-process.
#[derive(Debug)]
pub struct BitcoinCoinService {
    secp: Secp256k1<VerifyOnly>,
}

impl BitcoinCoinService {
    /// Creates a coin service with its own verification context.
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::verification_only(),
        }
    }
}

impl Default for BitcoinCoinService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoinService for BitcoinCoinService {
    async fn derive_extended_key(
        &self,
        extended_key: &str,
        derivation: &[u32],
    ) -> CoinResult<DerivedKey> {
        let xpub = Xpub::from_str(extended_key)?;

        let path = derivation
            .iter()
            .map(|&index| ChildNumber::from_normal_idx(index))
            .collect::<Result<Vec<_>, _>>()?;

        let child = xpub.derive_pub(&self.secp, &path)?;

        Ok(DerivedKey {
            extended_key: child.to_string(),
            public_key: child.public_key.serialize().to_vec(),
            chain_code: child.chain_code.to_bytes().to_vec(),
        })
    }

    async fn get_account_extended_key(
        &self,
        network: Network,
        public_key: &[u8],
        chain_code: &[u8],
        account_index: u32,
    ) -> CoinResult<String> {
        let public_key =
            secp256k1::PublicKey::from_slice(public_key).map_err(CoinError::InvalidPublicKey)?;

        if chain_code.len() != 32 {
            return Err(CoinError::InvalidChainCode(chain_code.len()));
        }

        let params = chain_params(network);

        // BIP32 layout: version, depth, parent fingerprint, child number,
        // chain code, compressed public key. The parent fingerprint is not
        // part of the inputs, so it is left zeroed.
        let mut data = Vec::with_capacity(78);
        data.extend_from_slice(&params.xpub_version);
        data.push(ACCOUNT_DEPTH);
        data.extend_from_slice(&[0u8; 4]);
        data.extend_from_slice(&(HARDENED_OFFSET | account_index).to_be_bytes());
        data.extend_from_slice(chain_code);
        data.extend_from_slice(&public_key.serialize());

        Ok(base58::encode_check(&data))
    }

    async fn encode_address(
        &self,
        public_key: &[u8],
        encoding: AddressEncoding,
        network: Network,
    ) -> CoinResult<String> {
        let key =
            secp256k1::PublicKey::from_slice(public_key).map_err(CoinError::InvalidPublicKey)?;

        let params = chain_params(network);
        let pubkey_hash = hash160::Hash::hash(&key.serialize()).to_byte_array();

        let address = match encoding {
            AddressEncoding::P2pkh => base58_address(params.p2pkh_version, &pubkey_hash),
            AddressEncoding::P2shP2wpkh => {
                // Redeem script of the nested witness program:
                // OP_0 PUSH20 <pubkey hash>.
                let mut redeem = Vec::with_capacity(22);
                redeem.push(0x00);
                redeem.push(0x14);
                redeem.extend_from_slice(&pubkey_hash);

                let script_hash = hash160::Hash::hash(&redeem).to_byte_array();
                base58_address(params.p2sh_version, &script_hash)
            }
            AddressEncoding::P2wpkh => segwit::encode(params.hrp, Fe32::Q, &pubkey_hash)?,
        };

        Ok(address)
    }
}

fn base58_address(version: u8, hash: &[u8; 20]) -> String {
    let mut data = Vec::with_capacity(21);
    data.push(version);
    data.extend_from_slice(hash);
    base58::encode_check(&data)
}
