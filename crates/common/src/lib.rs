//! Plumbing shared by the keychain service binaries.

pub mod logging;
