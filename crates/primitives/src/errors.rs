//! Errors for the keychain vocabulary.

use thiserror::Error;

/// Errors raised when converting untyped inputs (wire values, persisted
/// strings) into the vocabulary types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// The scheme identifier is not one of BIP44/BIP49/BIP84.
    #[error("unrecognized scheme: {0}")]
    UnrecognizedScheme(String),

    /// The network identifier is not a supported chain.
    #[error("unrecognized network: {0}")]
    UnrecognizedNetwork(String),

    /// The change selector is neither external (0) nor internal (1).
    #[error("unrecognized change: {0}")]
    UnrecognizedChange(u32),

    /// The derivation path is malformed: wrong number of levels, hardened
    /// components, or an unparseable textual form.
    #[error("invalid derivation path: {0}")]
    InvalidDerivationPath(String),
}

/// Errors from output-descriptor construction and tokenization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// The descriptor does not contain an extended-key token.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// The descriptor prefix does not map to a known scheme.
    #[error("unrecognized scheme in descriptor: {0}")]
    UnrecognizedScheme(String),
}
