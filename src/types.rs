//! Shared data model for balance discovery, routing and execution

use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Balances
// ============================================================================

/// Balance information for a single chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBalance {
    /// Lowercase chain name
    pub chain: String,
    /// USDT0 token balance (6 decimals)
    pub token_balance: U256,
    /// Native token balance (wei)
    pub native_balance: U256,
    /// Token balance > 0 and native balance covers the gas threshold
    pub can_bridge: bool,
}

impl ChainBalance {
    /// Classify a chain's balances against the minimum native threshold
    pub fn new(chain: impl Into<String>, token: U256, native: U256, min_native: U256) -> Self {
        Self {
            chain: chain.into(),
            can_bridge: !token.is_zero() && native >= min_native,
            token_balance: token,
            native_balance: native,
        }
    }

    /// A chain whose balance query failed
    pub fn unavailable(chain: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            token_balance: U256::ZERO,
            native_balance: U256::ZERO,
            can_bridge: false,
        }
    }
}

/// Aggregated balance information across all chains
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub balances: Vec<ChainBalance>,
    /// Total USDT0 across every queried chain
    pub total_token_balance: U256,
    /// Chains that satisfy the bridge eligibility rule
    pub bridgeable_chains: Vec<String>,
}

impl BalanceSummary {
    /// Build a summary, sorting balances by chain name
    pub fn from_balances(mut balances: Vec<ChainBalance>) -> Self {
        balances.sort_by(|a, b| a.chain.cmp(&b.chain));

        let total_token_balance = balances
            .iter()
            .fold(U256::ZERO, |acc, b| acc.saturating_add(b.token_balance));
        let bridgeable_chains = balances
            .iter()
            .filter(|b| b.can_bridge)
            .map(|b| b.chain.clone())
            .collect();

        Self {
            balances,
            total_token_balance,
            bridgeable_chains,
        }
    }

    pub fn get(&self, chain: &str) -> Option<&ChainBalance> {
        self.balances
            .iter()
            .find(|b| b.chain.eq_ignore_ascii_case(chain))
    }
}

// ============================================================================
// Quotes and routes
// ============================================================================

/// Parameters for quoting a bridge transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteParams {
    pub from_chain: String,
    pub to_chain: String,
    /// Amount in token units (6 decimals for USDT0)
    pub amount: U256,
    /// 0x-prefixed recipient address on the destination chain
    pub recipient: String,
}

/// Fee quote for a bridge transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferQuote {
    /// Native fee required by the OFT (wei)
    pub native_fee: U256,
    pub amount_to_send: U256,
    /// Guaranteed minimum after slippage
    pub min_amount_to_receive: U256,
    pub estimated_time_secs: u64,
    pub from_chain: String,
    pub to_chain: String,
}

/// Parameters for executing a bridge transfer
#[derive(Debug, Clone, PartialEq)]
pub struct SendParams {
    pub quote: QuoteParams,
    /// Slippage tolerance in percent (0.5 = 0.5%); non-positive uses the default
    pub slippage: f64,
    /// Optional gas limit for `lzReceive` on the destination chain
    pub dst_gas_limit: Option<u128>,
    /// Excess fee refund address, defaults to the sender
    pub refund_address: Option<Address>,
}

impl SendParams {
    pub fn new(quote: QuoteParams) -> Self {
        Self {
            quote,
            slippage: crate::chains::DEFAULT_SLIPPAGE,
            dst_gas_limit: None,
            refund_address: None,
        }
    }
}

/// A candidate bridge route from one source chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRoute {
    pub from_chain: String,
    pub to_chain: String,
    /// Quoted native fee; `None` until a quote succeeded
    pub native_fee: Option<U256>,
    pub estimated_time_secs: u64,
    pub available: bool,
    /// Set iff `available` is false
    pub unavailable_reason: Option<String>,
    /// Maximum amount that can be bridged on this route
    pub available_amount: U256,
}

impl BridgeRoute {
    pub(crate) fn pending(from_chain: &str, to_chain: &str, available_amount: U256) -> Self {
        Self {
            from_chain: from_chain.to_string(),
            to_chain: to_chain.to_string(),
            native_fee: None,
            estimated_time_secs: crate::chains::estimated_bridge_time(from_chain, to_chain),
            available: false,
            unavailable_reason: None,
            available_amount,
        }
    }

    pub(crate) fn unavailable(mut self, reason: impl Into<String>) -> Self {
        self.available = false;
        self.unavailable_reason = Some(reason.into());
        self
    }

    pub(crate) fn quoted(mut self, native_fee: U256) -> Self {
        self.native_fee = Some(native_fee);
        self.available = true;
        self.unavailable_reason = None;
        self
    }
}

/// Route selection strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStrategy {
    /// Lowest native fee
    #[default]
    Cheapest,
    /// Shortest estimated delivery time
    Fastest,
    /// Preferred source chain, falling back to cheapest
    Preferred,
}

impl RouteStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cheapest => "cheapest",
            Self::Fastest => "fastest",
            Self::Preferred => "preferred",
        }
    }
}

impl fmt::Display for RouteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteStrategy {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cheapest" => Ok(Self::Cheapest),
            "fastest" => Ok(Self::Fastest),
            "preferred" => Ok(Self::Preferred),
            other => Err(eyre::eyre!(
                "unknown route strategy {:?} (expected cheapest, fastest or preferred)",
                other
            )),
        }
    }
}

// ============================================================================
// Execution results
// ============================================================================

/// Result of a confirmed bridge transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeExecutionResult {
    /// Transaction hash on the source chain
    pub tx_hash: TxHash,
    /// LayerZero message GUID
    pub message_guid: String,
    pub amount_sent: U256,
    pub amount_to_receive: U256,
    pub from_chain: String,
    pub to_chain: String,
    pub estimated_time_secs: u64,
}

/// Parameters for automatic route selection and bridging
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoBridgeParams {
    pub to_chain: String,
    pub amount: U256,
    /// Defaults to the wallet's own address
    pub recipient: Option<String>,
    /// Used by [`RouteStrategy::Preferred`]
    pub preferred_source_chain: Option<String>,
    /// Non-positive or unset uses the configured default
    pub slippage: Option<f64>,
    /// Unset uses the configured default strategy
    pub strategy: Option<RouteStrategy>,
}

/// Result of an automatic bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartBridgeResult {
    #[serde(flatten)]
    pub result: BridgeExecutionResult,
    pub selected_route: BridgeRoute,
    pub strategy: RouteStrategy,
}
