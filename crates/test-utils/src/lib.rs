//! Test utilities shared across the workspace.
//!
//! Provides a fully deterministic [`MockCoinService`] so keystore logic can
//! be exercised without real key material, plus the account keys used by the
//! end-to-end scenarios.

pub mod fixtures;
pub mod mock;

pub use fixtures::*;
pub use mock::MockCoinService;
