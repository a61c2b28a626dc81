//! USDT0-Router: Cross-Chain USDT0 Routing for EVM Wallets
//!
//! Moves USDT0 between the chains that carry a USDT0 OFT deployment and
//! follows the resulting LayerZero message until it is delivered:
//!
//! - **Chain Registry** - endpoint IDs, OFT addresses, CAIP-2 networks, delivery estimates
//! - **Bridge** - quote and execute OFT transfers from one source chain
//! - **Smart Router** - discover balances, evaluate every source chain, pick a route by strategy
//! - **Payment Router** - fund a payment on another chain by bridging to the payer
//! - **Relay Tracking** - LayerZero Scan client and delivery polling with cancellation
//! - **EVM Module** - alloy-backed signers for the chain capability
//! - **Testing Module** - mock signers and relay index
//!
//! ## Feature Flags
//!
//! - `evm` - alloy-backed signer implementations (default)
//! - `testing` - mock signers and relay index for downstream tests
//! - `full` - Enable all features

// Core modules (always available)
pub mod balances;
pub mod bridge;
pub mod bridge_cache;
pub mod chains;
pub mod config;
pub mod contracts;
pub mod error;
pub mod multi_evm;
pub mod payment;
pub mod redact;
pub mod relay;
pub mod router;
pub mod signer;
pub mod types;

#[cfg(feature = "evm")]
pub mod evm;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used items at the crate root
pub use bridge::Usdt0Bridge;
pub use chains::{
    address_to_bytes32, bridgeable_chains, bytes32_to_address, endpoint_id, estimated_bridge_time,
    oft_address, supports_bridging, BridgeableChain,
};
pub use config::RouterConfig;
pub use error::{BridgeError, BridgeResult, RelayError, RelayResult};
pub use payment::{CrossChainPaymentParams, CrossChainPaymentResult, CrossChainPaymentRouter};
pub use relay::{
    DeliveryTracker, RelayIndex, RelayMessage, RelayStatus, ScanClient, WaitOptions,
};
pub use router::{select_best_route, SmartBridgeRouter};
pub use signer::{ChainSigner, ContractCall, ContractValue, MultiChainSigner};
pub use types::{
    AutoBridgeParams, BalanceSummary, BridgeExecutionResult, BridgeRoute, ChainBalance,
    QuoteParams, RouteStrategy, SendParams, SmartBridgeResult, TransferQuote,
};

#[cfg(feature = "evm")]
pub use evm::{EvmChainSigner, EvmMultiChainSigner};
