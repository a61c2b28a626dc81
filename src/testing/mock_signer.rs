//! Mock signers
//!
//! [`MockChainSigner`] answers `quoteSend`, `allowance` and `balanceOf` from
//! fixed values, records every call it sees and fabricates receipts carrying
//! an `OFTSent` log for `send` transactions. [`MockMultiChainSigner`] maps
//! chain names to mock signers and balances.

use crate::chains::OFT_SENT_EVENT_TOPIC;
use crate::contracts::MessagingFee;
use crate::signer::{
    BridgeReceipt, ChainSigner, ContractCall, ContractValue, MultiChainSigner, TransactionLog,
};
use alloy::primitives::{b256, Address, Bytes, TxHash, B256, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// GUID reported by mock `send` receipts unless overridden
pub const MOCK_MESSAGE_GUID: B256 =
    b256!("7a1f0c9d5e3b2a4f6c8d0e1f2a3b4c5d6e7f8091a2b3c4d5e6f708192a3b4c5d");

/// A call observed by [`MockChainSigner`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerEvent {
    Read {
        contract: Address,
        call: ContractCall,
    },
    Write {
        contract: Address,
        call: ContractCall,
        value: U256,
        tx_hash: TxHash,
    },
    Wait {
        tx_hash: TxHash,
    },
}

impl SignerEvent {
    /// Compact label such as `read:allowance`, `write:send` or `wait`
    pub fn label(&self) -> String {
        match self {
            Self::Read { call, .. } => format!("read:{}", call.method()),
            Self::Write { call, .. } => format!("write:{}", call.method()),
            Self::Wait { .. } => "wait".to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct SignerState {
    allowance: U256,
    nonce: u64,
    sends: HashSet<TxHash>,
    events: Vec<SignerEvent>,
}

/// Scripted single-chain signer
#[derive(Debug)]
pub struct MockChainSigner {
    address: Address,
    fee: U256,
    token_balance: U256,
    quote_error: Option<String>,
    receipt_status: bool,
    emit_sent_event: bool,
    guid: B256,
    state: Mutex<SignerState>,
}

impl MockChainSigner {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            fee: U256::ZERO,
            token_balance: U256::ZERO,
            quote_error: None,
            receipt_status: true,
            emit_sent_event: true,
            guid: MOCK_MESSAGE_GUID,
            state: Mutex::new(SignerState::default()),
        }
    }

    /// Native fee returned by `quoteSend`
    pub fn with_fee(mut self, fee: U256) -> Self {
        self.fee = fee;
        self
    }

    /// Current OFT allowance
    pub fn with_allowance(mut self, allowance: U256) -> Self {
        self.state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .allowance = allowance;
        self
    }

    /// Balance returned by `balanceOf`
    pub fn with_token_balance(mut self, balance: U256) -> Self {
        self.token_balance = balance;
        self
    }

    /// Make every `quoteSend` fail with `message`
    pub fn with_quote_error(mut self, message: &str) -> Self {
        self.quote_error = Some(message.to_string());
        self
    }

    /// Status of every receipt (false = reverted)
    pub fn with_receipt_status(mut self, status: bool) -> Self {
        self.receipt_status = status;
        self
    }

    pub fn with_message_guid(mut self, guid: B256) -> Self {
        self.guid = guid;
        self
    }

    /// Omit the `OFTSent` log from `send` receipts
    pub fn without_sent_event(mut self) -> Self {
        self.emit_sent_event = false;
        self
    }

    pub fn message_guid(&self) -> B256 {
        self.guid
    }

    pub fn allowance(&self) -> U256 {
        self.lock().allowance
    }

    /// Every call seen so far, in order
    pub fn events(&self) -> Vec<SignerEvent> {
        self.lock().events.clone()
    }

    /// `amountLD` of every `quoteSend` seen so far
    pub fn quoted_amounts(&self) -> Vec<U256> {
        self.lock()
            .events
            .iter()
            .filter_map(|e| match e {
                SignerEvent::Read {
                    call: ContractCall::QuoteSend { send_param, .. },
                    ..
                } => Some(send_param.amountLD),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, SignerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ChainSigner for MockChainSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn read_contract(&self, contract: Address, call: &ContractCall) -> Result<ContractValue> {
        let mut state = self.lock();
        state.events.push(SignerEvent::Read {
            contract,
            call: call.clone(),
        });

        match call {
            ContractCall::QuoteSend { .. } => match &self.quote_error {
                Some(message) => Err(eyre!("{}", message)),
                None => Ok(ContractValue::Fee(MessagingFee {
                    nativeFee: self.fee,
                    lzTokenFee: U256::ZERO,
                })),
            },
            ContractCall::Allowance { .. } => Ok(ContractValue::Uint(state.allowance)),
            ContractCall::BalanceOf { .. } => Ok(ContractValue::Uint(self.token_balance)),
            other => Err(eyre!("{} is not a read call", other.method())),
        }
    }

    async fn write_contract(
        &self,
        contract: Address,
        call: &ContractCall,
        value: U256,
    ) -> Result<TxHash> {
        if !call.is_write() {
            return Err(eyre!("{} is not a write call", call.method()));
        }

        let mut state = self.lock();
        state.nonce += 1;
        let tx_hash = B256::left_padding_from(&state.nonce.to_be_bytes());

        match call {
            ContractCall::Approve { amount, .. } => state.allowance = *amount,
            ContractCall::Send { .. } => {
                state.sends.insert(tx_hash);
            }
            _ => {}
        }

        state.events.push(SignerEvent::Write {
            contract,
            call: call.clone(),
            value,
            tx_hash,
        });
        Ok(tx_hash)
    }

    async fn wait_for_transaction_receipt(&self, tx_hash: TxHash) -> Result<BridgeReceipt> {
        let mut state = self.lock();
        state.events.push(SignerEvent::Wait { tx_hash });

        let mut logs = Vec::new();
        if self.emit_sent_event && state.sends.contains(&tx_hash) {
            logs.push(TransactionLog {
                address: Address::ZERO,
                topics: vec![OFT_SENT_EVENT_TOPIC, self.guid, self.address.into_word()],
                data: Bytes::new(),
            });
        }

        Ok(BridgeReceipt {
            status: self.receipt_status,
            tx_hash,
            logs,
        })
    }
}

// ============================================================================
// Multi-chain
// ============================================================================

#[derive(Debug)]
struct MockChain {
    token: U256,
    native: U256,
    failing: bool,
    signer: Arc<MockChainSigner>,
}

/// Multi-chain wallet backed by [`MockChainSigner`]s
#[derive(Debug)]
pub struct MockMultiChainSigner {
    address: Address,
    chains: BTreeMap<String, MockChain>,
    balance_delay: Option<Duration>,
    signer_requests: AtomicUsize,
    completed_balance_queries: AtomicUsize,
}

impl MockMultiChainSigner {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            chains: BTreeMap::new(),
            balance_delay: None,
            signer_requests: AtomicUsize::new(0),
            completed_balance_queries: AtomicUsize::new(0),
        }
    }

    /// Configure a chain whose signer quotes `fee` and has unlimited allowance
    pub fn with_chain(self, name: &str, token: U256, native: U256, fee: U256) -> Self {
        let signer = MockChainSigner::new(self.address)
            .with_fee(fee)
            .with_allowance(U256::MAX);
        self.with_chain_signer(name, token, native, signer)
    }

    /// Configure a chain with a custom signer
    pub fn with_chain_signer(
        mut self,
        name: &str,
        token: U256,
        native: U256,
        signer: MockChainSigner,
    ) -> Self {
        let signer = signer.with_token_balance(token);
        self.chains.insert(
            name.to_lowercase(),
            MockChain {
                token,
                native,
                failing: false,
                signer: Arc::new(signer),
            },
        );
        self
    }

    /// Configure a chain whose balance queries fail
    pub fn with_failing_chain(mut self, name: &str) -> Self {
        self.chains.insert(
            name.to_lowercase(),
            MockChain {
                token: U256::ZERO,
                native: U256::ZERO,
                failing: true,
                signer: Arc::new(MockChainSigner::new(self.address)),
            },
        );
        self
    }

    /// Delay every balance query
    pub fn with_balance_delay(mut self, delay: Duration) -> Self {
        self.balance_delay = Some(delay);
        self
    }

    pub fn chain_signer(&self, name: &str) -> Option<Arc<MockChainSigner>> {
        self.chains
            .get(&name.to_lowercase())
            .map(|c| Arc::clone(&c.signer))
    }

    /// Number of `bridge_signer` calls
    pub fn signer_requests(&self) -> usize {
        self.signer_requests.load(Ordering::SeqCst)
    }

    /// Balance queries that ran to completion
    pub fn completed_balance_queries(&self) -> usize {
        self.completed_balance_queries.load(Ordering::SeqCst)
    }

    async fn balance(&self, chain: &str, pick: fn(&MockChain) -> U256) -> Result<U256> {
        if let Some(delay) = self.balance_delay {
            tokio::time::sleep(delay).await;
        }

        let entry = self
            .chains
            .get(&chain.to_lowercase())
            .ok_or_else(|| eyre!("chain {} not configured", chain))?;
        if entry.failing {
            return Err(eyre!("RPC error on {}: connection refused", chain));
        }

        self.completed_balance_queries.fetch_add(1, Ordering::SeqCst);
        Ok(pick(entry))
    }
}

#[async_trait]
impl MultiChainSigner for MockMultiChainSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn configured_chains(&self) -> Vec<String> {
        self.chains.keys().cloned().collect()
    }

    fn is_chain_configured(&self, chain: &str) -> bool {
        self.chains.contains_key(&chain.to_lowercase())
    }

    fn bridge_signer(&self, chain: &str) -> Result<Arc<dyn ChainSigner>> {
        self.signer_requests.fetch_add(1, Ordering::SeqCst);
        let signer = self
            .chain_signer(chain)
            .ok_or_else(|| eyre!("chain {} not configured", chain))?;
        Ok(signer)
    }

    async fn native_balance(&self, chain: &str) -> Result<U256> {
        self.balance(chain, |c| c.native).await
    }

    async fn token_balance(&self, chain: &str) -> Result<U256> {
        self.balance(chain, |c| c.token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::SendParam;

    fn send_call() -> ContractCall {
        ContractCall::Send {
            send_param: SendParam::default(),
            fee: MessagingFee::default(),
            refund_address: Address::ZERO,
        }
    }

    #[tokio::test]
    async fn test_send_receipt_carries_guid() {
        let signer = MockChainSigner::new(Address::ZERO);
        let tx = signer
            .write_contract(Address::ZERO, &send_call(), U256::ZERO)
            .await
            .unwrap();
        let receipt = signer.wait_for_transaction_receipt(tx).await.unwrap();

        assert!(receipt.status);
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(receipt.logs[0].topics[1], MOCK_MESSAGE_GUID);
    }

    #[tokio::test]
    async fn test_approve_updates_allowance() {
        let signer = MockChainSigner::new(Address::ZERO);
        let approve = ContractCall::Approve {
            spender: Address::ZERO,
            amount: U256::from(5u64),
        };
        let tx = signer
            .write_contract(Address::ZERO, &approve, U256::ZERO)
            .await
            .unwrap();

        assert_eq!(signer.allowance(), U256::from(5u64));
        let receipt = signer.wait_for_transaction_receipt(tx).await.unwrap();
        assert!(receipt.logs.is_empty());
    }

    #[tokio::test]
    async fn test_read_rejects_write_calls() {
        let signer = MockChainSigner::new(Address::ZERO);
        assert!(signer.read_contract(Address::ZERO, &send_call()).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_chain_has_no_signer() {
        let multi = MockMultiChainSigner::new(Address::ZERO);
        assert!(multi.bridge_signer("ink").is_err());
        assert_eq!(multi.signer_requests(), 1);
        assert!(multi.token_balance("ink").await.is_err());
    }
}
