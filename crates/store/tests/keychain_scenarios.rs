//! End-to-end keychain scenarios against real BIP32 derivation.
//!
//! These run the in-memory keystore with the in-process coin service, so
//! every expected address is a real mainnet address of the fixture accounts.

use std::sync::Arc;

use keychain_coin_service::BitcoinCoinService;
use keychain_primitives::{parse_descriptor, Change, DerivationPath, Network, Scheme};
use keychain_store::{
    AccountKey, InMemoryKeystore, KeychainInfo, Keystore, DEFAULT_LOOKAHEAD_SIZE,
};
use keychain_test_utils::{BIP44_MAINNET_XPUB, BIP84_MAINNET_XPUB};

fn keystore() -> InMemoryKeystore {
    InMemoryKeystore::new(Arc::new(BitcoinCoinService::new()))
}

async fn create(store: &InMemoryKeystore, xpub: &str, scheme: Scheme) -> KeychainInfo {
    store
        .create(
            AccountKey::Xpub(xpub.to_owned()),
            scheme,
            Network::BitcoinMainnet,
            DEFAULT_LOOKAHEAD_SIZE,
            0,
            String::new(),
        )
        .await
        .expect("create must succeed")
}

fn path(change: u32, index: u32) -> DerivationPath {
    DerivationPath::from_slice(&[change, index]).unwrap()
}

#[tokio::test]
async fn native_segwit_keychain_issues_real_addresses() {
    let store = keystore();
    let info = create(&store, BIP84_MAINNET_XPUB, Scheme::Bip84).await;

    assert_eq!(
        info.external_descriptor,
        format!("wpkh({BIP84_MAINNET_XPUB}/0/*)")
    );

    // The issued descriptor tokenizes back to the account it was built from.
    let tokens = parse_descriptor(&info.internal_descriptor).unwrap();
    assert_eq!(tokens.scheme, Scheme::Bip84);
    assert_eq!(tokens.extended_public_key, BIP84_MAINNET_XPUB);

    // First fresh receive address.
    let external = store
        .get_fresh_addresses(info.id, Change::External, 1)
        .await
        .unwrap();
    assert_eq!(external[0].address, "bc1qh4kl0a0a3d7su8udc2rn62f8w939prqpl34z86");
    assert_eq!(external[0].derivation, path(0, 0));

    // First fresh change address.
    let internal = store
        .get_fresh_addresses(info.id, Change::Internal, 1)
        .await
        .unwrap();
    assert_eq!(internal[0].address, "bc1qry3crfssh8w6guajms7upclgqsfac4fs4g7nwj");
    assert_eq!(internal[0].derivation, path(1, 0));

    // Spending the change address moves the chain forward.
    store
        .mark_address_as_used(info.id, "bc1qry3crfssh8w6guajms7upclgqsfac4fs4g7nwj")
        .await
        .unwrap();

    let next = store.get_fresh_address(info.id, Change::Internal).await.unwrap();
    assert_eq!(next.derivation, path(1, 1));

    // A reset forgets the usage and issues the same address again.
    store.reset(info.id).await.unwrap();

    let again = store.get_fresh_address(info.id, Change::Internal).await.unwrap();
    assert_eq!(again.address, "bc1qry3crfssh8w6guajms7upclgqsfac4fs4g7nwj");
    assert_eq!(again.derivation, path(1, 0));
}

#[tokio::test]
async fn fresh_addresses_skip_recorded_gaps() {
    let store = keystore();
    let info = create(&store, BIP84_MAINNET_XPUB, Scheme::Bip84).await;

    for p in [path(0, 0), path(0, 1), path(0, 3), path(0, 6)] {
        store.mark_path_as_used(info.id, p).await.unwrap();
    }

    let addrs = store
        .get_fresh_addresses(info.id, Change::External, 5)
        .await
        .unwrap();
    let derivations: Vec<DerivationPath> = addrs.iter().map(|a| a.derivation).collect();

    assert_eq!(
        derivations,
        vec![path(0, 2), path(0, 4), path(0, 5), path(0, 7), path(0, 8)]
    );
}

#[tokio::test]
async fn legacy_keychain_observable_range() {
    let store = keystore();
    let info = create(&store, BIP44_MAINNET_XPUB, Scheme::Bip44).await;

    let addrs = store
        .get_all_observable_addresses(info.id, Change::External, 0, 10)
        .await
        .unwrap();

    let got: Vec<&str> = addrs.iter().map(|a| a.address.as_str()).collect();
    assert_eq!(
        got,
        vec![
            "151krzHgfkNoH3XHBzEVi6tSn4db7pVjmR",
            "18tMkbibtxJPQoTPUv8s3mSXqYzEsrbeRb",
            "1GJr9FHZ1pbR4hjhX24M4L1BDUd2QogYYA",
            "1KZB7aFfuZE2skJQPHH56VhSxUpUBjouwQ",
            "1FyjDvDFcXLMmhMWD6u8bFovLgkhZabhTQ",
            "1NGp18iPyWfSZz4AWnwT6HptDdVJfTjxnF",
            "1L36ug5kWFLbMysfkAexh9LeicyMAteuEg",
            "169V9snkmcdzpEDhRyLMnEuhLKyWdjzhfd",
            "14K3JxsLwhpLiECaoJMsZYyk9peYP1Gtty",
            "1GEix38AknUMWH8DYSn43HqodoB7RjyBAJ",
            "1918hHSQNsNMRkDCUMy7DUmJ8GJzwfRkUV",
        ]
    );
    assert_eq!(addrs[0].derivation, path(0, 0));
    assert_eq!(addrs[10].derivation, path(0, 10));

    // The observed addresses are resolvable back to their paths.
    let found = store
        .get_derivation_path(info.id, "1918hHSQNsNMRkDCUMy7DUmJ8GJzwfRkUV")
        .await
        .unwrap();
    assert_eq!(found, path(0, 10));
}

#[tokio::test]
async fn distinct_schemes_get_distinct_identities() {
    let store = keystore();

    let bip84 = create(&store, BIP84_MAINNET_XPUB, Scheme::Bip84).await;
    let bip44 = create(&store, BIP44_MAINNET_XPUB, Scheme::Bip44).await;
    assert_ne!(bip84.id, bip44.id);

    // Registration is deterministic: the same account maps to the same id.
    let again = create(&store, BIP84_MAINNET_XPUB, Scheme::Bip84).await;
    assert_eq!(again.id, bip84.id);
}

#[tokio::test]
async fn observable_window_tracks_usage() {
    let store = keystore();
    let info = create(&store, BIP84_MAINNET_XPUB, Scheme::Bip84).await;

    // Fresh keychain: window is exactly the lookahead zone.
    let addrs = store
        .get_all_observable_addresses(info.id, Change::External, 0, (1 << 31) - 1)
        .await
        .unwrap();
    assert_eq!(addrs.len(), DEFAULT_LOOKAHEAD_SIZE as usize);

    // One used index and one gap push the window out by two.
    store.mark_path_as_used(info.id, path(0, 0)).await.unwrap();
    store.mark_path_as_used(info.id, path(0, 5)).await.unwrap();

    let addrs = store
        .get_all_observable_addresses(info.id, Change::External, 0, (1 << 31) - 1)
        .await
        .unwrap();
    assert_eq!(addrs.len(), DEFAULT_LOOKAHEAD_SIZE as usize + 2);
}
