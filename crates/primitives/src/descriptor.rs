//! Output-descriptor construction and tokenization.
//!
//! References:
//!   <https://github.com/bitcoin/bitcoin/blob/master/doc/descriptors.md>

use std::sync::LazyLock;

use regex::Regex;

use crate::{errors::DescriptorError, types::Change, types::Scheme};

/// Matches the extended-key token at the start of a descriptor body,
/// tolerating an optional `[fingerprint/path]` key-origin annotation before
/// it. Trailing `/<n>/*` derivation steps are simply left unmatched.
static KEY_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\[[^\]]*\])?(?P<key>[0-9A-Za-z]*)").expect("key-token regex must compile")
});

/// The pieces of a parsed output descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DescriptorTokens {
    /// The scheme implied by the script template.
    pub scheme: Scheme,

    /// The account-level extended public key.
    pub extended_public_key: String,
}

/// Builds the output-descriptor string for one chain of a keychain.
pub fn make_descriptor(extended_public_key: &str, change: Change, scheme: Scheme) -> String {
    let change = change.index();

    match scheme {
        Scheme::Bip44 => format!("pkh({extended_public_key}/{change}/*)"),
        Scheme::Bip49 => format!("sh(wpkh({extended_public_key}/{change}/*))"),
        Scheme::Bip84 => format!("wpkh({extended_public_key}/{change}/*)"),
    }
}

/// Splits a descriptor into its scheme and extended-key token.
///
/// Only the three script templates produced by [`make_descriptor`] are
/// recognized; anything else is an unrecognized scheme.
pub fn parse_descriptor(descriptor: &str) -> Result<DescriptorTokens, DescriptorError> {
    // `sh(wpkh(` must be probed before its `wpkh(` suffix.
    let (scheme, body) = if let Some(body) = descriptor.strip_prefix("sh(wpkh(") {
        (Scheme::Bip49, body)
    } else if let Some(body) = descriptor.strip_prefix("wpkh(") {
        (Scheme::Bip84, body)
    } else if let Some(body) = descriptor.strip_prefix("pkh(") {
        (Scheme::Bip44, body)
    } else {
        return Err(DescriptorError::UnrecognizedScheme(descriptor.to_owned()));
    };

    let key = KEY_TOKEN_RE
        .captures(body)
        .and_then(|caps| caps.name("key"))
        .map(|m| m.as_str())
        .unwrap_or_default();

    if key.is_empty() {
        return Err(DescriptorError::InvalidDescriptor(descriptor.to_owned()));
    }

    Ok(DescriptorTokens {
        scheme,
        extended_public_key: key.to_owned(),
    })
}
