//! Testing Utilities Module
//!
//! In-memory stand-ins for the chain and relay seams so the bridge, router
//! and tracker can be exercised without RPC nodes or the Scan API.
//!
//! ## Submodules
//!
//! - `mock_signer` - scripted [`ChainSigner`](crate::signer::ChainSigner) and
//!   [`MultiChainSigner`](crate::signer::MultiChainSigner)
//! - `mock_relay` - scripted [`RelayIndex`](crate::relay::RelayIndex)

pub mod mock_relay;
pub mod mock_signer;

pub use mock_relay::*;
pub use mock_signer::*;
