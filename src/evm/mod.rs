//! EVM adapter
//!
//! alloy-backed implementations of the signer capability:
//!
//! - `signer` - [`EvmChainSigner`] (one chain) and [`EvmMultiChainSigner`]
//!   (every chain of a [`MultiEvmConfig`](crate::multi_evm::MultiEvmConfig))

pub mod signer;

pub use signer::{EvmChainSigner, EvmMultiChainSigner, DEFAULT_RECEIPT_TIMEOUT};
