//! Per-chain bridge client cache
//!
//! Bridge clients are created lazily the first time a chain is used and then
//! shared. Lookups take the read lock; creation takes the write lock and
//! re-checks the map so two concurrent callers never build the same client.

use crate::bridge::Usdt0Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::signer::MultiChainSigner;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Lazily-populated map of chain name -> [`Usdt0Bridge`]
pub struct BridgeCache {
    signer: Arc<dyn MultiChainSigner>,
    bridges: RwLock<HashMap<String, Arc<Usdt0Bridge>>>,
}

impl BridgeCache {
    pub fn new(signer: Arc<dyn MultiChainSigner>) -> Self {
        Self {
            signer,
            bridges: RwLock::new(HashMap::new()),
        }
    }

    /// Cached client for `chain`, creating it on first use
    pub async fn get_or_create(&self, chain: &str) -> BridgeResult<Arc<Usdt0Bridge>> {
        let chain = chain.to_lowercase();

        if let Some(bridge) = self.bridges.read().await.get(&chain) {
            return Ok(Arc::clone(bridge));
        }

        let mut bridges = self.bridges.write().await;
        if let Some(bridge) = bridges.get(&chain) {
            return Ok(Arc::clone(bridge));
        }

        if !self.signer.is_chain_configured(&chain) {
            return Err(BridgeError::ChainNotConfigured(chain));
        }
        let signer = self
            .signer
            .bridge_signer(&chain)
            .map_err(|e| BridgeError::chain_call(&chain, "get signer", e))?;
        let bridge = Arc::new(Usdt0Bridge::new(signer, &chain)?);

        debug!(chain = %chain, oft = %bridge.oft_address(), "Created bridge client");
        bridges.insert(chain, Arc::clone(&bridge));
        Ok(bridge)
    }

    /// Number of cached clients
    pub async fn len(&self) -> usize {
        self.bridges.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bridges.read().await.is_empty()
    }

    /// Drop every cached client
    pub async fn clear(&self) {
        self.bridges.write().await.clear();
    }
}
