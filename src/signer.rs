//! Chain signer capability
//!
//! The bridge engine never talks to an RPC node directly. It depends on a
//! [`ChainSigner`] per source chain (contract reads, contract writes, receipt
//! waits) and on a [`MultiChainSigner`] that knows which chains the wallet is
//! configured for and hands out per-chain signers.
//!
//! Contract calls are a closed set ([`ContractCall`]) so adapters can encode
//! them with the `sol!` bindings, and read results come back as a tagged
//! [`ContractValue`] that the engine decodes with an explicit fallback chain.

use crate::contracts::{IERC20, IOFT, MessagingFee, SendParam};
use crate::error::{BridgeError, BridgeResult};
use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Contract calls
// ============================================================================

/// A contract method invocation the bridge needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    /// `IOFT.quoteSend(sendParam, payInLzToken)`
    QuoteSend {
        send_param: SendParam,
        pay_in_lz_token: bool,
    },
    /// `IOFT.send(sendParam, fee, refundAddress)`
    Send {
        send_param: SendParam,
        fee: MessagingFee,
        refund_address: Address,
    },
    /// `IERC20.allowance(owner, spender)`
    Allowance { owner: Address, spender: Address },
    /// `IERC20.approve(spender, amount)`
    Approve { spender: Address, amount: U256 },
    /// `IERC20.balanceOf(account)`
    BalanceOf { account: Address },
}

impl ContractCall {
    /// Solidity method name
    pub fn method(&self) -> &'static str {
        match self {
            Self::QuoteSend { .. } => "quoteSend",
            Self::Send { .. } => "send",
            Self::Allowance { .. } => "allowance",
            Self::Approve { .. } => "approve",
            Self::BalanceOf { .. } => "balanceOf",
        }
    }

    /// True for calls that mutate chain state
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Send { .. } | Self::Approve { .. })
    }

    /// ABI-encoded calldata (selector + arguments)
    pub fn calldata(&self) -> Bytes {
        let encoded = match self {
            Self::QuoteSend {
                send_param,
                pay_in_lz_token,
            } => IOFT::quoteSendCall {
                sendParam: send_param.clone(),
                payInLzToken: *pay_in_lz_token,
            }
            .abi_encode(),
            Self::Send {
                send_param,
                fee,
                refund_address,
            } => IOFT::sendCall {
                sendParam: send_param.clone(),
                fee: fee.clone(),
                refundAddress: *refund_address,
            }
            .abi_encode(),
            Self::Allowance { owner, spender } => IERC20::allowanceCall {
                owner: *owner,
                spender: *spender,
            }
            .abi_encode(),
            Self::Approve { spender, amount } => IERC20::approveCall {
                spender: *spender,
                amount: *amount,
            }
            .abi_encode(),
            Self::BalanceOf { account } => IERC20::balanceOfCall { account: *account }.abi_encode(),
        };
        Bytes::from(encoded)
    }

    /// Decode raw `eth_call` return data into a [`ContractValue`]
    pub fn decode_output(&self, data: &[u8]) -> Result<ContractValue> {
        let value = match self {
            Self::QuoteSend { .. } => {
                let ret = IOFT::quoteSendCall::abi_decode_returns(data, true)
                    .map_err(|e| eyre!("Failed to decode quoteSend output: {}", e))?;
                ContractValue::Fee(ret._0)
            }
            Self::Send { .. } => {
                let ret = IOFT::sendCall::abi_decode_returns(data, true)
                    .map_err(|e| eyre!("Failed to decode send output: {}", e))?;
                ContractValue::Tuple(vec![
                    ContractValue::Bytes(Bytes::copy_from_slice(ret._0.guid.as_slice())),
                    ContractValue::Fee(ret._0.fee),
                    ContractValue::Uint(ret._1.amountSentLD),
                    ContractValue::Uint(ret._1.amountReceivedLD),
                ])
            }
            Self::Allowance { .. } => {
                let ret = IERC20::allowanceCall::abi_decode_returns(data, true)
                    .map_err(|e| eyre!("Failed to decode allowance output: {}", e))?;
                ContractValue::Uint(ret._0)
            }
            Self::Approve { .. } => {
                let ret = IERC20::approveCall::abi_decode_returns(data, true)
                    .map_err(|e| eyre!("Failed to decode approve output: {}", e))?;
                ContractValue::Bool(ret._0)
            }
            Self::BalanceOf { .. } => {
                let ret = IERC20::balanceOfCall::abi_decode_returns(data, true)
                    .map_err(|e| eyre!("Failed to decode balanceOf output: {}", e))?;
                ContractValue::Uint(ret._0)
            }
        };
        Ok(value)
    }
}

// ============================================================================
// Read results
// ============================================================================

/// Loosely-typed contract read result
///
/// Adapters return whatever shape their RPC stack produces; the engine
/// decodes it with [`MessagingFee::try_from`] or [`ContractValue::into_uint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractValue {
    Uint(U256),
    Bool(bool),
    Bytes(Bytes),
    /// Already-typed messaging fee
    Fee(MessagingFee),
    /// Positional outputs
    Tuple(Vec<ContractValue>),
    /// Named outputs
    Map(BTreeMap<String, ContractValue>),
}

impl ContractValue {
    /// Decode a single uint output (bare or as a one-element tuple)
    pub fn into_uint(self, what: &'static str) -> BridgeResult<U256> {
        match self {
            Self::Uint(v) => Ok(v),
            Self::Tuple(mut items) if items.len() == 1 => items.remove(0).into_uint(what),
            other => Err(BridgeError::Decode {
                what,
                detail: format!("expected uint, got {}", other.kind()),
            }),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Uint(_) => "uint",
            Self::Bool(_) => "bool",
            Self::Bytes(_) => "bytes",
            Self::Fee(_) => "fee",
            Self::Tuple(_) => "tuple",
            Self::Map(_) => "map",
        }
    }
}

impl From<MessagingFee> for ContractValue {
    fn from(fee: MessagingFee) -> Self {
        Self::Fee(fee)
    }
}

impl From<U256> for ContractValue {
    fn from(v: U256) -> Self {
        Self::Uint(v)
    }
}

/// Fee decoding: typed struct, then `[nativeFee, lzTokenFee]` tuple, then a
/// map keyed by field name. A missing `lzTokenFee` decodes as zero.
impl TryFrom<ContractValue> for MessagingFee {
    type Error = BridgeError;

    fn try_from(value: ContractValue) -> BridgeResult<Self> {
        const WHAT: &str = "fee";

        match value {
            ContractValue::Fee(fee) => Ok(fee),
            ContractValue::Tuple(mut items) => match items.len() {
                1 => MessagingFee::try_from(items.remove(0)),
                n if n >= 2 => {
                    let mut iter = items.into_iter();
                    let native = iter.next().map(|v| v.into_uint(WHAT)).transpose()?;
                    let lz = iter.next().map(|v| v.into_uint(WHAT)).transpose()?;
                    Ok(MessagingFee {
                        nativeFee: native.unwrap_or_default(),
                        lzTokenFee: lz.unwrap_or_default(),
                    })
                }
                n => Err(BridgeError::Decode {
                    what: WHAT,
                    detail: format!("tuple of {} elements", n),
                }),
            },
            ContractValue::Map(mut fields) => {
                let native = fields
                    .remove("nativeFee")
                    .ok_or_else(|| BridgeError::Decode {
                        what: WHAT,
                        detail: "map without nativeFee".to_string(),
                    })?
                    .into_uint(WHAT)?;
                let lz = match fields.remove("lzTokenFee") {
                    Some(v) => v.into_uint(WHAT)?,
                    None => U256::ZERO,
                };
                Ok(MessagingFee {
                    nativeFee: native,
                    lzTokenFee: lz,
                })
            }
            other => Err(BridgeError::Decode {
                what: WHAT,
                detail: other.kind().to_string(),
            }),
        }
    }
}

// ============================================================================
// Receipts
// ============================================================================

/// An event log emitted by a mined transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionLog {
    /// Emitting contract
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// A mined transaction receipt reduced to what the bridge inspects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeReceipt {
    /// true = success, false = reverted
    pub status: bool,
    pub tx_hash: TxHash,
    pub logs: Vec<TransactionLog>,
}

// ============================================================================
// Signer traits
// ============================================================================

/// Per-chain signing and contract access
#[async_trait]
pub trait ChainSigner: Send + Sync {
    /// The signer's address
    fn address(&self) -> Address;

    /// Execute a read-only call
    async fn read_contract(&self, contract: Address, call: &ContractCall) -> Result<ContractValue>;

    /// Submit a state-changing call with `value` attached, returning the tx hash
    async fn write_contract(
        &self,
        contract: Address,
        call: &ContractCall,
        value: U256,
    ) -> Result<TxHash>;

    /// Wait for a transaction to be mined
    async fn wait_for_transaction_receipt(&self, tx_hash: TxHash) -> Result<BridgeReceipt>;
}

/// A wallet that spans several chains
#[async_trait]
pub trait MultiChainSigner: Send + Sync {
    /// The wallet address (same on every EVM chain)
    fn address(&self) -> Address;

    /// Lowercase names of the chains this wallet has RPC access to
    fn configured_chains(&self) -> Vec<String>;

    fn is_chain_configured(&self, chain: &str) -> bool;

    /// Signer bound to a single chain
    fn bridge_signer(&self, chain: &str) -> Result<Arc<dyn ChainSigner>>;

    /// Native gas token balance (wei)
    async fn native_balance(&self, chain: &str) -> Result<U256>;

    /// USDT0 balance (token units)
    async fn token_balance(&self, chain: &str) -> Result<U256>;
}
