//! EVM Transaction Signing
//!
//! Wraps alloy's `PrivateKeySigner` and HTTP providers. Reads go through
//! `eth_call` and are decoded with the call's own ABI; writes are filled
//! (nonce, gas, chain ID) by the recommended fillers and signed with the
//! wallet. Receipts are polled until mined or until the timeout passes.

use crate::chains;
use crate::multi_evm::MultiEvmConfig;
use crate::signer::{
    BridgeReceipt, ChainSigner, ContractCall, ContractValue, MultiChainSigner, TransactionLog,
};
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use url::Url;

/// How long to wait for a transaction to be mined
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Signer for one EVM chain
#[derive(Clone)]
pub struct EvmChainSigner {
    chain: String,
    rpc_url: Url,
    signer: PrivateKeySigner,
    receipt_timeout: Duration,
}

impl std::fmt::Debug for EvmChainSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmChainSigner")
            .field("chain", &self.chain)
            .field("rpc_url", &self.rpc_url.as_str())
            .field("address", &self.signer.address())
            .finish()
    }
}

impl EvmChainSigner {
    pub fn new(chain: &str, rpc_url: &str, signer: PrivateKeySigner) -> Result<Self> {
        let rpc_url =
            Url::parse(rpc_url).map_err(|e| eyre!("Invalid RPC URL for {}: {}", chain, e))?;
        Ok(Self {
            chain: chain.to_lowercase(),
            rpc_url,
            signer,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        })
    }

    /// Create from a 0x-prefixed hex private key
    pub fn from_private_key(chain: &str, rpc_url: &str, private_key: &str) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| eyre!("Invalid private key: {}", e))?;
        Self::new(chain, rpc_url, signer)
    }

    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Native balance of `account`
    pub async fn balance_of(&self, account: Address) -> Result<U256> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        provider
            .get_balance(account)
            .await
            .wrap_err_with(|| format!("Failed to get native balance on {}", self.chain))
    }
}

#[async_trait]
impl ChainSigner for EvmChainSigner {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn read_contract(&self, contract: Address, call: &ContractCall) -> Result<ContractValue> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let tx = TransactionRequest::default()
            .with_from(self.signer.address())
            .with_to(contract)
            .with_input(call.calldata());

        let output = provider
            .call(&tx)
            .await
            .wrap_err_with(|| format!("eth_call {} on {}", call.method(), self.chain))?;

        call.decode_output(&output)
    }

    async fn write_contract(
        &self,
        contract: Address,
        call: &ContractCall,
        value: U256,
    ) -> Result<TxHash> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(self.rpc_url.clone());

        let tx = TransactionRequest::default()
            .with_to(contract)
            .with_input(call.calldata())
            .with_value(value);

        let pending = provider
            .send_transaction(tx)
            .await
            .wrap_err_with(|| format!("Failed to send {} on {}", call.method(), self.chain))?;
        let tx_hash = *pending.tx_hash();

        info!(chain = %self.chain, method = call.method(), tx_hash = %tx_hash, "Transaction sent");
        Ok(tx_hash)
    }

    async fn wait_for_transaction_receipt(&self, tx_hash: TxHash) -> Result<BridgeReceipt> {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        let deadline = Instant::now() + self.receipt_timeout;

        loop {
            if let Some(receipt) = provider.get_transaction_receipt(tx_hash).await? {
                let logs = receipt
                    .inner
                    .logs()
                    .iter()
                    .map(|log| TransactionLog {
                        address: log.address(),
                        topics: log.topics().to_vec(),
                        data: log.data().data.clone(),
                    })
                    .collect();

                debug!(
                    chain = %self.chain,
                    tx_hash = %tx_hash,
                    status = receipt.status(),
                    "Receipt received"
                );
                return Ok(BridgeReceipt {
                    status: receipt.status(),
                    tx_hash,
                    logs,
                });
            }

            if Instant::now() >= deadline {
                return Err(eyre!(
                    "Transaction {} not confirmed on {} after {:?}",
                    tx_hash,
                    self.chain,
                    self.receipt_timeout
                ));
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

/// One wallet over every enabled chain of a [`MultiEvmConfig`]
#[derive(Debug, Clone)]
pub struct EvmMultiChainSigner {
    address: Address,
    chains: BTreeMap<String, Arc<EvmChainSigner>>,
}

impl EvmMultiChainSigner {
    pub fn new(config: &MultiEvmConfig) -> Result<Self> {
        let signer: PrivateKeySigner = config
            .private_key()
            .parse()
            .map_err(|e| eyre!("Invalid private key: {}", e))?;
        let address = signer.address();

        let mut chains = BTreeMap::new();
        for chain in config.enabled_chains() {
            let chain_signer = EvmChainSigner::new(&chain.name, &chain.rpc_url, signer.clone())?;
            chains.insert(chain.name.clone(), Arc::new(chain_signer));
        }

        info!(
            address = %address,
            chains = ?chains.keys().collect::<Vec<_>>(),
            "Multi-chain signer initialized"
        );

        Ok(Self { address, chains })
    }

    fn chain(&self, chain: &str) -> Result<&Arc<EvmChainSigner>> {
        self.chains
            .get(&chain.to_lowercase())
            .ok_or_else(|| eyre!("Chain {} is not configured", chain))
    }
}

#[async_trait]
impl MultiChainSigner for EvmMultiChainSigner {
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
        let signer = Arc::clone(self.chain(chain)?);
        Ok(signer)
    }

    async fn native_balance(&self, chain: &str) -> Result<U256> {
        self.chain(chain)?.balance_of(self.address).await
    }

    async fn token_balance(&self, chain: &str) -> Result<U256> {
        let oft = chains::oft_address(chain)
            .ok_or_else(|| eyre!("{} has no USDT0 deployment", chain))?;
        let value = self
            .chain(chain)?
            .read_contract(
                oft,
                &ContractCall::BalanceOf {
                    account: self.address,
                },
            )
            .await?;
        Ok(value.into_uint("balanceOf")?)
    }
}
