//! Cross-chain balance discovery
//!
//! Queries USDT0 and native balances for every wallet chain that has a USDT0
//! deployment, one task per chain. A chain whose RPC fails is reported with
//! zero balances and is never eligible; the rest of the summary is unaffected.

use crate::chains;
use crate::signer::MultiChainSigner;
use crate::types::{BalanceSummary, ChainBalance};
use alloy::primitives::U256;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Concurrent balance fan-out over a [`MultiChainSigner`]
#[derive(Clone)]
pub struct BalanceAggregator {
    signer: Arc<dyn MultiChainSigner>,
    min_native_balance: U256,
}

impl BalanceAggregator {
    pub fn new(signer: Arc<dyn MultiChainSigner>, min_native_balance: U256) -> Self {
        Self {
            signer,
            min_native_balance,
        }
    }

    pub fn min_native_balance(&self) -> U256 {
        self.min_native_balance
    }

    /// Balances on every configured bridgeable chain.
    ///
    /// Dropping the returned future aborts the outstanding per-chain queries.
    pub async fn get_balances(&self) -> BalanceSummary {
        let chains: Vec<String> = self
            .signer
            .configured_chains()
            .into_iter()
            .map(|c| c.to_lowercase())
            .filter(|c| chains::supports_bridging(c))
            .collect();

        if chains.is_empty() {
            debug!("No bridgeable chains configured");
            return BalanceSummary::default();
        }

        let mut tasks = JoinSet::new();
        for chain in chains {
            let signer = Arc::clone(&self.signer);
            let min_native = self.min_native_balance;

            tasks.spawn(async move {
                let token = match signer.token_balance(&chain).await {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(chain = %chain, error = %e, "Failed to fetch USDT0 balance");
                        return ChainBalance::unavailable(chain);
                    }
                };
                let native = match signer.native_balance(&chain).await {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(chain = %chain, error = %e, "Failed to fetch native balance");
                        return ChainBalance::unavailable(chain);
                    }
                };

                debug!(chain = %chain, token = %token, native = %native, "Fetched balances");
                ChainBalance::new(chain, token, native, min_native)
            });
        }

        let mut balances = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(balance) => balances.push(balance),
                Err(e) => warn!(error = %e, "Balance task failed"),
            }
        }

        BalanceSummary::from_balances(balances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockMultiChainSigner;
    use alloy::primitives::Address;
    use std::time::Duration;

    fn usdt(n: u64) -> U256 {
        U256::from(n * 1_000_000)
    }

    fn eth_milli(n: u64) -> U256 {
        U256::from(n) * U256::from(1_000_000_000_000_000u64)
    }

    fn aggregator(signer: MockMultiChainSigner) -> BalanceAggregator {
        BalanceAggregator::new(Arc::new(signer), eth_milli(1))
    }

    #[tokio::test]
    async fn test_no_bridgeable_chains_returns_empty_summary() {
        let signer = MockMultiChainSigner::new(Address::ZERO)
            .with_chain("polygon", usdt(10), eth_milli(10), U256::ZERO)
            .with_chain("bsc", usdt(10), eth_milli(10), U256::ZERO);

        let summary = aggregator(signer).get_balances().await;
        assert!(summary.balances.is_empty());
        assert_eq!(summary.total_token_balance, U256::ZERO);
        assert!(summary.bridgeable_chains.is_empty());
    }

    #[tokio::test]
    async fn test_three_chains() {
        let signer = MockMultiChainSigner::new(Address::ZERO)
            .with_chain("ethereum", usdt(100), eth_milli(10), U256::ZERO)
            .with_chain("arbitrum", usdt(50), eth_milli(5), U256::ZERO)
            .with_chain("ink", usdt(25), U256::ZERO, U256::ZERO);

        let summary = aggregator(signer).get_balances().await;
        assert_eq!(summary.balances.len(), 3);
        assert_eq!(summary.total_token_balance, usdt(175));
        assert_eq!(summary.bridgeable_chains, vec!["arbitrum", "ethereum"]);
        assert!(!summary.get("ink").unwrap().can_bridge);
    }

    #[tokio::test]
    async fn test_failing_chain_is_reported_ineligible() {
        let signer = MockMultiChainSigner::new(Address::ZERO)
            .with_chain("ethereum", usdt(100), eth_milli(10), U256::ZERO)
            .with_failing_chain("berachain");

        let summary = aggregator(signer).get_balances().await;
        assert_eq!(summary.balances.len(), 2);

        let bera = summary.get("berachain").unwrap();
        assert_eq!(bera.token_balance, U256::ZERO);
        assert_eq!(bera.native_balance, U256::ZERO);
        assert!(!bera.can_bridge);
        assert_eq!(summary.bridgeable_chains, vec!["ethereum"]);
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let signer = MockMultiChainSigner::new(Address::ZERO)
            .with_chain("unichain", usdt(1), eth_milli(1), U256::ZERO);

        let summary = aggregator(signer).get_balances().await;
        assert_eq!(summary.bridgeable_chains, vec!["unichain"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_future_aborts_fan_out() {
        let signer = MockMultiChainSigner::new(Address::ZERO)
            .with_chain("ethereum", usdt(1), eth_milli(1), U256::ZERO)
            .with_balance_delay(Duration::from_secs(60));
        let signer = Arc::new(signer);
        let agg = BalanceAggregator::new(signer.clone(), eth_milli(1));

        let res = tokio::time::timeout(Duration::from_secs(1), agg.get_balances()).await;
        assert!(res.is_err());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(signer.completed_balance_queries(), 0);
    }
}
