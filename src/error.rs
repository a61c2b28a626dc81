//! Bridge and relay error types
//!
//! Validation errors are raised before any I/O. Chain and contract failures
//! are wrapped with the chain and step that produced them. Relay errors keep
//! "not indexed yet" distinct from transport failures so the delivery
//! tracker never has to inspect error strings.

use alloy::primitives::{TxHash, U256};
use std::time::Duration;
use thiserror::Error;

/// Boxed source error carried by wrapped chain failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    // ========================================================================
    // Validation
    // ========================================================================
    #[error("amount must be greater than 0")]
    InvalidAmount,

    #[error("source and destination chains must be different")]
    SameChain,

    #[error("chain {chain:?} does not support USDT0 bridging. Supported chains: {supported}")]
    UnsupportedChain { chain: String, supported: String },

    #[error("source chain mismatch: bridge initialized for {expected:?} but got {got:?}")]
    SourceChainMismatch { expected: String, got: String },

    #[error("invalid {field} address {value:?}: {reason}")]
    InvalidAddress {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("cannot route payment from {from:?} to {to:?}. Supported chains: {supported}")]
    CannotRoute {
        from: String,
        to: String,
        supported: String,
    },

    #[error("chain {0:?} is not configured for this wallet")]
    ChainNotConfigured(String),

    // ========================================================================
    // Execution
    // ========================================================================
    #[error("failed to {step} on {chain}: {source}")]
    ChainCall {
        chain: String,
        step: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("unexpected {what} response format: {detail}")]
    Decode { what: &'static str, detail: String },

    #[error("bridge transaction reverted on {chain}: {tx_hash}")]
    TransactionReverted { chain: String, tx_hash: TxHash },

    #[error(
        "failed to extract message GUID from transaction {tx_hash}: \
         the OFTSent event was not found in the transaction receipt"
    )]
    MissingSentEvent { tx_hash: TxHash },

    #[error("no available route for amount {amount} to chain {to_chain}")]
    NoRoute { amount: U256, to_chain: String },

    // ========================================================================
    // Tracking
    // ========================================================================
    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl BridgeError {
    /// Wrap a signer/RPC failure with the chain and step it happened in
    pub fn chain_call(chain: &str, step: &'static str, err: eyre::Report) -> Self {
        Self::ChainCall {
            chain: chain.to_string(),
            step,
            source: err.into(),
        }
    }

    pub(crate) fn unsupported(chain: &str) -> Self {
        Self::UnsupportedChain {
            chain: chain.to_string(),
            supported: crate::chains::bridgeable_chains().join(", "),
        }
    }

    /// True for errors raised before any I/O was attempted
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount
                | Self::SameChain
                | Self::UnsupportedChain { .. }
                | Self::SourceChainMismatch { .. }
                | Self::InvalidAddress { .. }
                | Self::CannotRoute { .. }
                | Self::ChainNotConfigured(_)
        )
    }
}

pub type RelayResult<T> = std::result::Result<T, RelayError>;

#[derive(Error, Debug)]
pub enum RelayError {
    /// The relay has not indexed this message yet (HTTP 404)
    #[error("message not found: {0}")]
    NotFound(String),

    #[error("relay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LayerZero Scan API error: {status} {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode relay response: {0}")]
    Decode(String),

    #[error("bridge message failed: {guid}")]
    MessageFailed { guid: String },

    #[error("bridge message blocked by DVN: {guid}")]
    MessageBlocked { guid: String },

    #[error("timeout after {timeout:?} waiting for message delivery: {guid}")]
    Timeout { guid: String, timeout: Duration },

    #[error("waiting for message delivery cancelled: {guid}")]
    Cancelled { guid: String },
}

impl RelayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True when the relay itself reported a terminal failure
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, Self::MessageFailed { .. } | Self::MessageBlocked { .. })
    }
}
