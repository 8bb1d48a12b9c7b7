//! Deterministic stand-in for the coin service.

use async_trait::async_trait;
use keychain_coin_service::{AddressEncoding, CoinResult, CoinService, DerivedKey};
use keychain_primitives::Network;

/// Coin service whose outputs are pure functions of their inputs.
///
/// Derivation appends `->N` to the extended key and the index byte to a
/// fixed public-key/chain-code seed; addresses are
/// `<hex public key>-<scheme>-<network>`. This keeps store tests readable:
/// the expected address spells out the path that produced it.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockCoinService;

#[async_trait]
impl CoinService for MockCoinService {
    async fn derive_extended_key(
        &self,
        extended_key: &str,
        derivation: &[u32],
    ) -> CoinResult<DerivedKey> {
        let mut extended_key = extended_key.to_owned();
        let mut public_key = vec![0xDE, 0xAD, 0xBE, 0xEF];
        let mut chain_code = vec![0xCA, 0xFE, 0xBA, 0xBE];

        for &index in derivation {
            extended_key.push_str(&format!("->{index}"));
            public_key.push(index as u8);
            chain_code.push(index as u8);
        }

        Ok(DerivedKey {
            extended_key,
            public_key,
            chain_code,
        })
    }

    async fn get_account_extended_key(
        &self,
        _network: Network,
        public_key: &[u8],
        _chain_code: &[u8],
        account_index: u32,
    ) -> CoinResult<String> {
        Ok(format!("xpub-{}-{account_index}", hex::encode(public_key)))
    }

    async fn encode_address(
        &self,
        public_key: &[u8],
        encoding: AddressEncoding,
        network: Network,
    ) -> CoinResult<String> {
        let scheme = match encoding {
            AddressEncoding::P2pkh => "BIP44",
            AddressEncoding::P2shP2wpkh => "BIP49",
            AddressEncoding::P2wpkh => "BIP84",
        };

        Ok(format!("{}-{scheme}-{network}", hex::encode(public_key)))
    }
}
