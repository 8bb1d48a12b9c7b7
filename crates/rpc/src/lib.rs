//! JSON-RPC surface of the keychain service.
//!
//! High-level API traits plus the wire types they exchange. The server
//! implementation lives in the service binary; enabling the `client` feature
//! additionally generates a typed client from the same traits.

pub mod traits;
pub mod types;

/// Application error codes returned by the keychain RPC methods.
pub mod error_codes {
    /// The keychain id is unknown to the store.
    pub const KEYCHAIN_NOT_FOUND: i32 = -32001;

    /// The address has never been derived by this keychain.
    pub const ADDRESS_NOT_FOUND: i32 = -32002;

    /// No public key is cached for the requested derivation path.
    pub const DERIVATION_NOT_FOUND: i32 = -32003;

    /// The coin service failed while deriving or encoding.
    pub const COIN_SERVICE: i32 = -32010;

    /// The storage backend failed.
    pub const STORAGE: i32 = -32011;
}
