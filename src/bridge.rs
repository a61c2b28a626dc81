//! USDT0 OFT bridge client
//!
//! [`Usdt0Bridge`] is bound to one source chain. It quotes transfers through
//! the OFT's `quoteSend`, and executes them by topping up the OFT allowance
//! when needed, calling `send` and recovering the LayerZero message GUID from
//! the `OFTSent` event in the receipt.

use crate::chains::{self, DEFAULT_SLIPPAGE, OFT_SENT_EVENT_TOPIC};
use crate::contracts::{build_extra_options, MessagingFee, SendParam};
use crate::error::{BridgeError, BridgeResult};
use crate::signer::{BridgeReceipt, ChainSigner, ContractCall};
use crate::types::{BridgeExecutionResult, QuoteParams, SendParams, TransferQuote};
use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use std::sync::Arc;
use tracing::{debug, info};

/// Basis point denominator
const BPS_DENOMINATOR: u64 = 10_000;

/// Bridge client for one source chain
pub struct Usdt0Bridge {
    signer: Arc<dyn ChainSigner>,
    chain: &'static str,
    oft: Address,
}

impl std::fmt::Debug for Usdt0Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Usdt0Bridge")
            .field("chain", &self.chain)
            .field("oft", &self.oft)
            .field("signer", &self.signer.address())
            .finish()
    }
}

impl Usdt0Bridge {
    /// Create a bridge client for `chain`
    pub fn new(signer: Arc<dyn ChainSigner>, chain: &str) -> BridgeResult<Self> {
        let entry = chains::lookup(chain).ok_or_else(|| BridgeError::unsupported(chain))?;
        let oft = chains::oft_address(entry.name).ok_or_else(|| BridgeError::unsupported(chain))?;

        Ok(Self {
            signer,
            chain: entry.name,
            oft,
        })
    }

    /// Lowercase source chain name
    pub fn chain(&self) -> &'static str {
        self.chain
    }

    /// OFT contract on the source chain
    pub fn oft_address(&self) -> Address {
        self.oft
    }

    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }

    /// Quote a transfer using the default slippage
    pub async fn quote(&self, params: &QuoteParams) -> BridgeResult<TransferQuote> {
        self.quote_with(params, DEFAULT_SLIPPAGE, None).await
    }

    /// Quote a transfer with explicit slippage and destination gas limit
    pub async fn quote_with(
        &self,
        params: &QuoteParams,
        slippage: f64,
        dst_gas_limit: Option<u128>,
    ) -> BridgeResult<TransferQuote> {
        self.validate(params)?;

        let send_param = build_send_param(
            &params.to_chain,
            params.amount,
            &params.recipient,
            slippage,
            dst_gas_limit,
        )?;
        let fee = self.quote_fee(&send_param).await?;

        debug!(
            from = self.chain,
            to = %params.to_chain,
            amount = %params.amount,
            native_fee = %fee.nativeFee,
            "Bridge quote"
        );

        Ok(TransferQuote {
            native_fee: fee.nativeFee,
            amount_to_send: params.amount,
            min_amount_to_receive: send_param.minAmountLD,
            estimated_time_secs: chains::estimated_bridge_time(self.chain, &params.to_chain),
            from_chain: self.chain.to_string(),
            to_chain: params.to_chain.to_lowercase(),
        })
    }

    /// Execute a bridge transfer and wait for it to be mined.
    ///
    /// The fee is re-quoted, the OFT allowance is raised if it does not cover
    /// `amount` (waiting for the approval to be mined), then `send` is
    /// submitted with `value = nativeFee`. Nothing here is retried: a failed
    /// submission is reported, never re-sent.
    pub async fn send(&self, params: &SendParams) -> BridgeResult<BridgeExecutionResult> {
        let quote = &params.quote;
        self.validate(quote)?;

        let slippage = effective_slippage(params.slippage);
        let send_param = build_send_param(
            &quote.to_chain,
            quote.amount,
            &quote.recipient,
            slippage,
            params.dst_gas_limit,
        )?;
        let refund_address = params
            .refund_address
            .unwrap_or_else(|| self.signer.address());

        let fee = self.quote_fee(&send_param).await?;

        self.ensure_allowance(quote.amount).await?;

        let call = ContractCall::Send {
            send_param: send_param.clone(),
            fee: fee.clone(),
            refund_address,
        };
        let tx_hash = self
            .signer
            .write_contract(self.oft, &call, fee.nativeFee)
            .await
            .map_err(|e| BridgeError::chain_call(self.chain, "execute bridge", e))?;

        info!(
            chain = self.chain,
            to = %quote.to_chain,
            tx_hash = %tx_hash,
            amount = %quote.amount,
            native_fee = %fee.nativeFee,
            "Bridge transaction submitted"
        );

        let receipt = self.wait_mined(tx_hash, "wait for bridge transaction").await?;
        let guid = extract_message_guid(&receipt)?;

        info!(
            chain = self.chain,
            tx_hash = %tx_hash,
            guid = %guid,
            "Bridge transaction confirmed"
        );

        Ok(BridgeExecutionResult {
            tx_hash,
            message_guid: guid.to_string(),
            amount_sent: quote.amount,
            amount_to_receive: send_param.minAmountLD,
            from_chain: self.chain.to_string(),
            to_chain: quote.to_chain.to_lowercase(),
            estimated_time_secs: chains::estimated_bridge_time(self.chain, &quote.to_chain),
        })
    }

    /// Every bridgeable chain except this one
    pub fn supported_destinations(&self) -> Vec<&'static str> {
        chains::bridgeable_chains()
            .into_iter()
            .filter(|c| *c != self.chain)
            .collect()
    }

    pub fn supports_destination(&self, to_chain: &str) -> bool {
        !to_chain.eq_ignore_ascii_case(self.chain) && chains::supports_bridging(to_chain)
    }

    fn validate(&self, params: &QuoteParams) -> BridgeResult<()> {
        if !params.from_chain.eq_ignore_ascii_case(self.chain) {
            return Err(BridgeError::SourceChainMismatch {
                expected: self.chain.to_string(),
                got: params.from_chain.clone(),
            });
        }
        if !chains::supports_bridging(&params.to_chain) {
            return Err(BridgeError::unsupported(&params.to_chain));
        }
        if params.from_chain.eq_ignore_ascii_case(&params.to_chain) {
            return Err(BridgeError::SameChain);
        }
        if params.amount.is_zero() {
            return Err(BridgeError::InvalidAmount);
        }
        Ok(())
    }

    async fn quote_fee(&self, send_param: &SendParam) -> BridgeResult<MessagingFee> {
        let call = ContractCall::QuoteSend {
            send_param: send_param.clone(),
            pay_in_lz_token: false,
        };
        let value = self
            .signer
            .read_contract(self.oft, &call)
            .await
            .map_err(|e| BridgeError::chain_call(self.chain, "get quote", e))?;

        MessagingFee::try_from(value)
    }

    /// Raise the OFT's allowance to `amount` if it is lower
    async fn ensure_allowance(&self, amount: U256) -> BridgeResult<()> {
        let owner = self.signer.address();
        let current = self
            .signer
            .read_contract(
                self.oft,
                &ContractCall::Allowance {
                    owner,
                    spender: self.oft,
                },
            )
            .await
            .map_err(|e| BridgeError::chain_call(self.chain, "check allowance", e))?
            .into_uint("allowance")?;

        if current >= amount {
            debug!(chain = self.chain, allowance = %current, "Allowance sufficient");
            return Ok(());
        }

        let approve = ContractCall::Approve {
            spender: self.oft,
            amount,
        };
        let tx_hash = self
            .signer
            .write_contract(self.oft, &approve, U256::ZERO)
            .await
            .map_err(|e| BridgeError::chain_call(self.chain, "approve", e))?;

        info!(
            chain = self.chain,
            tx_hash = %tx_hash,
            allowance = %current,
            amount = %amount,
            "Approval submitted"
        );

        self.wait_mined(tx_hash, "wait for approval").await?;
        Ok(())
    }

    async fn wait_mined(&self, tx_hash: TxHash, step: &'static str) -> BridgeResult<BridgeReceipt> {
        let receipt = self
            .signer
            .wait_for_transaction_receipt(tx_hash)
            .await
            .map_err(|e| BridgeError::chain_call(self.chain, step, e))?;

        if !receipt.status {
            return Err(BridgeError::TransactionReverted {
                chain: self.chain.to_string(),
                tx_hash,
            });
        }
        Ok(receipt)
    }
}

/// Slippage in percent, falling back to the default for non-positive or NaN input
pub fn effective_slippage(slippage: f64) -> f64 {
    if slippage.is_finite() && slippage > 0.0 {
        slippage
    } else {
        DEFAULT_SLIPPAGE
    }
}

/// `amount - amount * round(slippage * 100) / 10000`, with the basis points
/// capped at 100% so the result never exceeds `amount`.
pub fn min_amount_after_slippage(amount: U256, slippage: f64) -> U256 {
    let bps = (effective_slippage(slippage) * 100.0).round() as u64;
    let bps = bps.min(BPS_DENOMINATOR);
    amount - amount * U256::from(bps) / U256::from(BPS_DENOMINATOR)
}

/// Build the OFT `SendParam` for a transfer to `to_chain`
pub fn build_send_param(
    to_chain: &str,
    amount: U256,
    recipient: &str,
    slippage: f64,
    dst_gas_limit: Option<u128>,
) -> BridgeResult<SendParam> {
    let dst_eid = chains::endpoint_id(to_chain).ok_or_else(|| BridgeError::unsupported(to_chain))?;
    let to = chains::address_to_bytes32(recipient).map_err(|e| BridgeError::InvalidAddress {
        field: "recipient",
        value: recipient.to_string(),
        reason: e.to_string(),
    })?;

    Ok(SendParam {
        dstEid: dst_eid,
        to,
        amountLD: amount,
        minAmountLD: min_amount_after_slippage(amount, slippage),
        extraOptions: build_extra_options(dst_gas_limit),
        composeMsg: Bytes::new(),
        oftCmd: Bytes::new(),
    })
}

/// Recover the LayerZero GUID (first indexed topic of `OFTSent`)
pub fn extract_message_guid(receipt: &BridgeReceipt) -> BridgeResult<B256> {
    receipt
        .logs
        .iter()
        .find(|log| log.topics.len() >= 2 && log.topics[0] == OFT_SENT_EVENT_TOPIC)
        .map(|log| log.topics[1])
        .ok_or(BridgeError::MissingSentEvent {
            tx_hash: receipt.tx_hash,
        })
}
