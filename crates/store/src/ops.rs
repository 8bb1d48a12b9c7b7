//! Backend-independent keychain operations.
//!
//! Every storage backend loads a [`KeychainMeta`], runs one of these
//! operations against it, and commits the mutated copy. The operations
//! themselves never talk to storage.

use std::collections::HashMap;

use keychain_coin_service::CoinService;
use keychain_primitives::{make_descriptor, Change, DerivationPath, Network, Scheme};
use tracing::debug;

use crate::{
    errors::StoreResult,
    meta::{keychain_id, AccountKey, AddressInfo, KeychainInfo, KeychainMeta},
};

/// Builds the initial state of a keychain.
///
/// Resolves the account key (assembling it from raw chain-code material if
/// needed), builds both chain descriptors and derives the depth-4 extended
/// keys. No addresses are derived yet.
pub(crate) async fn create_meta(
    coin: &dyn CoinService,
    account: AccountKey,
    scheme: Scheme,
    network: Network,
    lookahead_size: u32,
    account_index: u32,
    metadata: String,
) -> StoreResult<KeychainMeta> {
    let extended_public_key = match account {
        AccountKey::Xpub(xpub) => xpub,
        AccountKey::ChainCode(from_chain_code) => {
            coin.get_account_extended_key(
                network,
                &from_chain_code.public_key,
                &from_chain_code.chain_code,
                from_chain_code.account_index,
            )
            .await?
        }
    };

    let external_descriptor = make_descriptor(&extended_public_key, Change::External, scheme);
    let internal_descriptor = make_descriptor(&extended_public_key, Change::Internal, scheme);

    let external_child = coin
        .derive_extended_key(&extended_public_key, &[Change::External.index()])
        .await?;
    let internal_child = coin
        .derive_extended_key(&extended_public_key, &[Change::Internal.index()])
        .await?;

    let id = keychain_id(&extended_public_key, scheme);

    debug!(%id, %scheme, %network, "registering keychain");

    let main = KeychainInfo {
        id,
        external_descriptor,
        internal_descriptor,
        // TODO: re-serialize with the SLIP-0132 version bytes of the scheme.
        slip32_extended_public_key: extended_public_key.clone(),
        extended_public_key,
        external_xpub: external_child.extended_key,
        max_consecutive_external_index: 0,
        internal_xpub: internal_child.extended_key,
        max_consecutive_internal_index: 0,
        non_consecutive_external_indexes: vec![],
        non_consecutive_internal_indexes: vec![],
        lookahead_size,
        account_index,
        metadata,
        scheme,
        network,
    };

    Ok(KeychainMeta {
        main,
        derivations: HashMap::new(),
        addresses: HashMap::new(),
    })
}

/// Derives the address at `path` and records it in both caches.
///
/// This is the only writer of `derivations` and `addresses`: any address
/// handed out or observed goes through here first.
pub(crate) async fn derive_address(
    coin: &dyn CoinService,
    meta: &mut KeychainMeta,
    path: DerivationPath,
) -> StoreResult<String> {
    let xpub = meta.main.change_xpub(path.change_index()).to_owned();

    let child = coin
        .derive_extended_key(&xpub, &[path.address_index()])
        .await?;

    let address = coin
        .encode_address(
            &child.public_key,
            meta.main.scheme.into(),
            meta.main.network,
        )
        .await?;

    debug!(id = %meta.main.id, %address, %path, "derived address");

    meta.addresses.insert(address.clone(), path);
    meta.derivations.insert(path, hex::encode(&child.public_key));

    Ok(address)
}

/// Enumerates `size` fresh addresses on the given chain.
///
/// Enumeration starts at the consecutive-prefix boundary and skips any index
/// recorded as a gap, so issued addresses are never reused.
pub(crate) async fn fresh_addresses(
    coin: &dyn CoinService,
    meta: &mut KeychainMeta,
    change: Change,
    size: u32,
) -> StoreResult<Vec<AddressInfo>> {
    let mut addrs = Vec::with_capacity(size as usize);

    let max_consecutive = meta.main.max_consecutive_index(change);
    let gaps = meta.main.non_consecutive_indexes(change).to_vec();

    let mut offset = 0u32;
    while (addrs.len() as u32) < size {
        let index = max_consecutive + offset;
        offset += 1;

        if gaps.contains(&index) {
            continue;
        }

        let path = DerivationPath::new(change, index)?;
        let address = derive_address(coin, meta, path).await?;

        addrs.push(AddressInfo {
            address,
            derivation: path,
            change,
        });
    }

    Ok(addrs)
}

/// Materializes every address of the chain within the observable window,
/// clamped to `from_index ..= min(to_index, max observable)`.
pub(crate) async fn observable_addresses(
    coin: &dyn CoinService,
    meta: &mut KeychainMeta,
    change: Change,
    from_index: u32,
    to_index: u32,
) -> StoreResult<Vec<AddressInfo>> {
    let max_observable = meta.main.max_observable_index(change);
    let to_index = to_index.min(max_observable);

    debug!(
        id = %meta.main.id,
        %change,
        %max_observable,
        range = ?(from_index, to_index),
        "computing observable range"
    );

    if from_index > to_index {
        return Ok(Vec::new());
    }

    let mut addrs = Vec::with_capacity((to_index - from_index + 1) as usize);

    for index in from_index..=to_index {
        let path = DerivationPath::new(change, index)?;
        let address = derive_address(coin, meta, path).await?;

        addrs.push(AddressInfo {
            address,
            derivation: path,
            change,
        });
    }

    Ok(addrs)
}

/// Records the derivation path as used and updates the gap bookkeeping.
///
/// Three disjoint cases on the address index `a` against the consecutive
/// boundary `max`:
///   - `a < max`: already inside the used prefix, nothing to do.
///   - `a = max`: the prefix grows; it then swallows any gap indexes it has
///     caught up with.
///   - `a > max`: a new gap is recorded, once.
pub(crate) fn mark_path_as_used(meta: &mut KeychainMeta, path: DerivationPath) {
    let change = path.change_index();
    let index = path.address_index();

    let mut max_consecutive = meta.main.max_consecutive_index(change);
    let mut gaps = meta.main.non_consecutive_indexes(change).to_vec();

    debug!(id = %meta.main.id, %path, %max_consecutive, "marking path as used");

    if index < max_consecutive {
        return;
    }

    if index == max_consecutive {
        max_consecutive += 1;

        // The boundary may have reached indexes previously recorded as
        // gaps; absorb them until it sits on an unused index again.
        while gaps.contains(&max_consecutive) {
            max_consecutive += 1;
        }

        // Commit the boundary before the gap set: the setter filters
        // against the updated boundary.
        meta.main.set_max_consecutive_index(change, max_consecutive);
        meta.main.set_non_consecutive_indexes(change, gaps);
    } else if !gaps.contains(&index) {
        gaps.push(index);
        meta.main.set_non_consecutive_indexes(change, gaps);
    }
}

/// Looks up the derivation path of a previously derived address.
pub(crate) fn derivation_path(meta: &KeychainMeta, address: &str) -> StoreResult<DerivationPath> {
    meta.addresses
        .get(address)
        .copied()
        .ok_or_else(|| crate::StoreError::AddressNotFound(address.to_owned()))
}

/// Returns the cached public keys at the given paths, preserving order.
pub(crate) fn addresses_public_keys(
    meta: &KeychainMeta,
    derivations: &[DerivationPath],
) -> StoreResult<Vec<String>> {
    derivations
        .iter()
        .map(|path| {
            meta.derivations
                .get(path)
                .cloned()
                .ok_or(crate::StoreError::DerivationNotFound(*path))
        })
        .collect()
}
