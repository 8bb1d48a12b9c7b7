//! Depth-4/5 derivation paths.

use std::{fmt::Display, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{errors::TypeError, types::Change};

/// First hardened BIP32 child index. Keychain paths are public-derivation
/// only, so both levels must stay below it.
const HARDENED_OFFSET: u32 = 1 << 31;

/// The last two levels of a BIP32 derivation path: the change chain and the
/// address index.
///
/// Paths serialize as `<change>/<index>` (e.g. `1/42`), which is also the
/// form used as map keys in the persisted keychain state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DerivationPath([u32; 2]);

impl DerivationPath {
    /// Builds a path on the given chain.
    pub fn new(change: Change, address_index: u32) -> Result<Self, TypeError> {
        Self::from_slice(&[change.index(), address_index])
    }

    /// Builds a path from the raw two-level form.
    ///
    /// Rejects slices that are not exactly two levels deep and hardened
    /// components.
    pub fn from_slice(path: &[u32]) -> Result<Self, TypeError> {
        let &[change, index] = path else {
            return Err(TypeError::InvalidDerivationPath(format!("{path:?}")));
        };

        if change >= HARDENED_OFFSET || index >= HARDENED_OFFSET {
            return Err(TypeError::InvalidDerivationPath(format!("{path:?}")));
        }

        Ok(Self([change, index]))
    }

    /// The chain this path lives on: external iff the first level is 0.
    pub const fn change_index(&self) -> Change {
        match self.0[0] {
            0 => Change::External,
            _ => Change::Internal,
        }
    }

    /// The address index, i.e. the depth-5 child number.
    pub const fn address_index(&self) -> u32 {
        self.0[1]
    }

    /// The raw two-level form used on the wire.
    pub const fn to_array(self) -> [u32; 2] {
        self.0
    }
}

impl Display for DerivationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0[0], self.0[1])
    }
}

impl FromStr for DerivationPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidDerivationPath(s.to_owned());

        let (change, index) = s.split_once('/').ok_or_else(invalid)?;
        let change: u32 = change.parse().map_err(|_| invalid())?;
        let index: u32 = index.parse().map_err(|_| invalid())?;

        Self::from_slice(&[change, index])
    }
}

impl Serialize for DerivationPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DerivationPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn rejects_wrong_depth() {
        assert!(DerivationPath::from_slice(&[0]).is_err());
        assert!(DerivationPath::from_slice(&[0, 1, 2]).is_err());
        assert!(DerivationPath::from_slice(&[]).is_err());
    }

    #[test]
    fn rejects_hardened_components() {
        assert!(DerivationPath::from_slice(&[0, 1 << 31]).is_err());
        assert!(DerivationPath::from_slice(&[1 << 31, 0]).is_err());
        assert!(DerivationPath::from_slice(&[1, (1 << 31) - 1]).is_ok());
    }

    #[test]
    fn change_index_is_external_iff_zero() {
        let external = DerivationPath::from_slice(&[0, 5]).unwrap();
        let internal = DerivationPath::from_slice(&[1, 5]).unwrap();

        assert_eq!(external.change_index(), Change::External);
        assert_eq!(internal.change_index(), Change::Internal);
        assert_eq!(internal.address_index(), 5);
    }

    #[test]
    fn textual_round_trip() {
        let path = DerivationPath::new(Change::Internal, 42).unwrap();
        assert_eq!(path.to_string(), "1/42");
        assert_eq!("1/42".parse::<DerivationPath>().unwrap(), path);

        assert!("1".parse::<DerivationPath>().is_err());
        assert!("a/2".parse::<DerivationPath>().is_err());
        assert!("1/2/3".parse::<DerivationPath>().is_err());
    }

    #[test]
    fn serializes_as_map_key() {
        let mut map = HashMap::new();
        map.insert(DerivationPath::new(Change::External, 3).unwrap(), "pk".to_owned());

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"0/3":"pk"}"#);

        let back: HashMap<DerivationPath, String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
