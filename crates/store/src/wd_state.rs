//! Binary codec of the legacy wallet-daemon keychain state.
//!
//! The wallet daemon persists gap-tracking state as a little-endian blob,
//! wrapped in base64. Layout:
//!
//! ```text
//! u32              version (0)
//! u32              max consecutive change index
//! u32              max consecutive receive index
//! u64              number of non-consecutive change indexes
//! u32 * n          non-consecutive change indexes
//! u64              number of non-consecutive receive indexes
//! u32 * n          non-consecutive receive indexes
//! u8               empty flag (written cleared)
//! ```

use std::collections::BTreeSet;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use keychain_primitives::Change;
use thiserror::Error;

use crate::meta::KeychainInfo;

/// Version written into every encoded blob.
const STATE_VERSION: u32 = 0;

/// Errors from decoding a wallet-daemon state blob.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WdStateError {
    /// The blob is not valid base64.
    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The blob ended in the middle of a field.
    #[error("state blob truncated at byte {0}")]
    Truncated(usize),
}

/// Gap-tracking state in the wallet daemon's vocabulary: "receive" is the
/// external chain, "change" the internal one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WdKeychainState {
    /// Max consecutive index of the internal chain.
    pub max_consecutive_change_index: u32,

    /// Max consecutive index of the external chain.
    pub max_consecutive_receive_index: u32,

    /// Gap indexes of the internal chain.
    pub non_consecutive_change_indexes: BTreeSet<u32>,

    /// Gap indexes of the external chain.
    pub non_consecutive_receive_indexes: BTreeSet<u32>,

    /// Whether the daemon considers the state empty. Always written cleared;
    /// any byte is accepted when parsing.
    pub empty: bool,
}

impl From<&KeychainInfo> for WdKeychainState {
    fn from(info: &KeychainInfo) -> Self {
        Self {
            max_consecutive_change_index: info.max_consecutive_index(Change::Internal),
            max_consecutive_receive_index: info.max_consecutive_index(Change::External),
            non_consecutive_change_indexes: info
                .non_consecutive_indexes(Change::Internal)
                .iter()
                .copied()
                .collect(),
            non_consecutive_receive_indexes: info
                .non_consecutive_indexes(Change::External)
                .iter()
                .copied()
                .collect(),
            empty: false,
        }
    }
}

/// Encodes the state into its base64-wrapped binary form.
pub fn encode_state(state: &WdKeychainState) -> String {
    let gaps = state.non_consecutive_change_indexes.len()
        + state.non_consecutive_receive_indexes.len();
    let mut buf = Vec::with_capacity(29 + 4 * gaps);

    buf.extend_from_slice(&STATE_VERSION.to_le_bytes());
    buf.extend_from_slice(&state.max_consecutive_change_index.to_le_bytes());
    buf.extend_from_slice(&state.max_consecutive_receive_index.to_le_bytes());
    write_set(&mut buf, &state.non_consecutive_change_indexes);
    write_set(&mut buf, &state.non_consecutive_receive_indexes);
    buf.push(0);

    BASE64.encode(buf)
}

/// Decodes a base64-wrapped binary state blob.
pub fn parse_state(encoded: &str) -> Result<WdKeychainState, WdStateError> {
    let bytes = BASE64.decode(encoded)?;
    let mut reader = Reader::new(&bytes);

    let _version = reader.read_u32()?;
    let max_consecutive_change_index = reader.read_u32()?;
    let max_consecutive_receive_index = reader.read_u32()?;
    let non_consecutive_change_indexes = read_set(&mut reader)?;
    let non_consecutive_receive_indexes = read_set(&mut reader)?;
    let empty = reader.read_u8()? != 0;

    Ok(WdKeychainState {
        max_consecutive_change_index,
        max_consecutive_receive_index,
        non_consecutive_change_indexes,
        non_consecutive_receive_indexes,
        empty,
    })
}

fn write_set(buf: &mut Vec<u8>, set: &BTreeSet<u32>) {
    buf.extend_from_slice(&(set.len() as u64).to_le_bytes());

    for index in set {
        buf.extend_from_slice(&index.to_le_bytes());
    }
}

fn read_set(reader: &mut Reader<'_>) -> Result<BTreeSet<u32>, WdStateError> {
    let size = reader.read_u64()?;

    let mut set = BTreeSet::new();
    for _ in 0..size {
        set.insert(reader.read_u32()?);
    }

    Ok(set)
}

/// Little-endian cursor over the decoded blob.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], WdStateError> {
        let end = self.pos.checked_add(N).filter(|&end| end <= self.bytes.len());
        let Some(end) = end else {
            return Err(WdStateError::Truncated(self.pos));
        };

        let chunk: [u8; N] = self.bytes[self.pos..end]
            .try_into()
            .expect("slice length is N");
        self.pos = end;

        Ok(chunk)
    }

    fn read_u8(&mut self) -> Result<u8, WdStateError> {
        Ok(self.take::<1>()?[0])
    }

    fn read_u32(&mut self) -> Result<u32, WdStateError> {
        Ok(u32::from_le_bytes(self.take::<4>()?))
    }

    fn read_u64(&mut self) -> Result<u64, WdStateError> {
        Ok(u64::from_le_bytes(self.take::<8>()?))
    }
}
