//! Typed vocabulary for the keychain service.
//!
//! This crate contains the types shared by every other crate in the
//! workspace: address schemes, networks, the external/internal change
//! selector, depth-4/5 derivation paths and output-descriptor handling.
//! It lies at the bottom of the crate hierarchy and does not depend on any
//! other workspace crate.

pub mod descriptor;
pub mod errors;
pub mod path;
pub mod types;

pub use descriptor::{make_descriptor, parse_descriptor, DescriptorTokens};
pub use errors::{DescriptorError, TypeError};
pub use path::DerivationPath;
pub use types::{Change, Network, Scheme};
