//! Smart bridge router
//!
//! Finds the best source chain for moving USDT0 to a destination chain:
//! balances are discovered across the wallet's chains, one route is evaluated
//! per candidate source (eligibility, balance, quote, fee coverage), a winner
//! is picked by strategy and the transfer is executed from it.

use crate::balances::BalanceAggregator;
use crate::bridge::effective_slippage;
use crate::bridge_cache::BridgeCache;
use crate::chains;
use crate::config::RouterConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::relay::{DeliveryTracker, RelayIndex, RelayMessage, ScanClient, WaitOptions};
use crate::signer::MultiChainSigner;
use crate::types::{
    AutoBridgeParams, BalanceSummary, BridgeExecutionResult, BridgeRoute, QuoteParams,
    RouteStrategy, SendParams, SmartBridgeResult,
};
use alloy::primitives::U256;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Pick the best available route.
///
/// Unavailable routes are ignored. `Cheapest` takes the lowest native fee,
/// `Fastest` the lowest estimated time (first wins on ties). `Preferred`
/// returns the preferred source chain when it is available and otherwise
/// falls back to `Cheapest`.
pub fn select_best_route(
    routes: &[BridgeRoute],
    strategy: RouteStrategy,
    preferred_chain: Option<&str>,
) -> Option<BridgeRoute> {
    let available: Vec<&BridgeRoute> = routes.iter().filter(|r| r.available).collect();
    if available.is_empty() {
        return None;
    }

    let cheapest = || {
        available
            .iter()
            .copied()
            .reduce(|best, r| match (r.native_fee, best.native_fee) {
                (Some(fee), Some(best_fee)) if fee < best_fee => r,
                _ => best,
            })
    };

    let selected = match strategy {
        RouteStrategy::Cheapest => cheapest(),
        RouteStrategy::Fastest => available
            .iter()
            .copied()
            .reduce(|best, r| {
                if r.estimated_time_secs < best.estimated_time_secs {
                    r
                } else {
                    best
                }
            }),
        RouteStrategy::Preferred => preferred_chain
            .filter(|p| !p.is_empty())
            .and_then(|p| {
                available
                    .iter()
                    .copied()
                    .find(|r| r.from_chain.eq_ignore_ascii_case(p))
            })
            .or_else(cheapest),
    };

    selected.cloned()
}

/// Multi-chain router with automatic source selection
pub struct SmartBridgeRouter {
    signer: Arc<dyn MultiChainSigner>,
    config: RouterConfig,
    balances: BalanceAggregator,
    bridges: BridgeCache,
    tracker: DeliveryTracker,
}

impl SmartBridgeRouter {
    /// Router tracking deliveries through LayerZero Scan at `config.scan_base_url`
    pub fn new(signer: Arc<dyn MultiChainSigner>, config: RouterConfig) -> eyre::Result<Self> {
        let scan = ScanClient::from_config(&config)?;
        Ok(Self::with_relay_index(signer, config, Arc::new(scan)))
    }

    /// Router with a custom relay index
    pub fn with_relay_index(
        signer: Arc<dyn MultiChainSigner>,
        config: RouterConfig,
        index: Arc<dyn RelayIndex>,
    ) -> Self {
        let tracker = DeliveryTracker::new(index)
            .with_defaults(config.poll_interval, config.delivery_timeout);

        Self {
            balances: BalanceAggregator::new(Arc::clone(&signer), config.min_native_balance),
            bridges: BridgeCache::new(Arc::clone(&signer)),
            signer,
            config,
            tracker,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// USDT0 and native balances across all configured bridgeable chains
    pub async fn get_balances(&self) -> BalanceSummary {
        self.balances.get_balances().await
    }

    /// Evaluate every candidate source chain for a transfer to `to_chain`.
    ///
    /// Unavailable routes are returned too, each with its reason. Without an
    /// `amount` (or with zero) each route is quoted for the chain's full
    /// balance.
    pub async fn get_routes(
        &self,
        to_chain: &str,
        amount: Option<U256>,
    ) -> BridgeResult<Vec<BridgeRoute>> {
        let to_chain = chains::lookup(to_chain)
            .ok_or_else(|| BridgeError::unsupported(to_chain))?
            .name;
        let amount = amount.filter(|a| !a.is_zero());

        let summary = self.get_balances().await;
        let recipient = self.signer.address().to_string();

        let mut routes = Vec::with_capacity(summary.balances.len());
        let mut tasks = JoinSet::new();

        for balance in summary.balances.iter().filter(|b| b.chain != to_chain) {
            let route = BridgeRoute::pending(&balance.chain, to_chain, balance.token_balance);

            if !balance.can_bridge {
                let reason = if balance.token_balance.is_zero() {
                    "insufficient USDT0 balance"
                } else {
                    "insufficient native token for gas"
                };
                routes.push(route.unavailable(reason));
                continue;
            }

            if let Some(amount) = amount {
                if balance.token_balance < amount {
                    routes.push(route.unavailable(format!(
                        "insufficient balance: have {}, need {}",
                        balance.token_balance, amount
                    )));
                    continue;
                }
            }

            let bridge = match self.bridges.get_or_create(&balance.chain).await {
                Ok(bridge) => bridge,
                Err(e) => {
                    routes.push(route.unavailable(format!("failed to create bridge: {}", e)));
                    continue;
                }
            };

            let params = QuoteParams {
                from_chain: balance.chain.clone(),
                to_chain: to_chain.to_string(),
                amount: amount.unwrap_or(balance.token_balance),
                recipient: recipient.clone(),
            };
            let native_balance = balance.native_balance;

            tasks.spawn(async move {
                match bridge.quote(&params).await {
                    Err(e) => {
                        warn!(chain = %params.from_chain, error = %e, "Route quote failed");
                        route.unavailable(format!("failed to get quote: {}", e))
                    }
                    Ok(quote) if native_balance < quote.native_fee => {
                        route.unavailable("insufficient native token for bridge fee")
                    }
                    Ok(quote) => route.quoted(quote.native_fee),
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(route) => routes.push(route),
                Err(e) => warn!(error = %e, "Route task failed"),
            }
        }

        routes.sort_by(|a, b| a.from_chain.cmp(&b.from_chain));

        debug!(
            to = to_chain,
            total = routes.len(),
            available = routes.iter().filter(|r| r.available).count(),
            "Evaluated bridge routes"
        );

        Ok(routes)
    }

    /// See [`select_best_route`]
    pub fn select_best_route(
        &self,
        routes: &[BridgeRoute],
        strategy: RouteStrategy,
        preferred_chain: Option<&str>,
    ) -> Option<BridgeRoute> {
        select_best_route(routes, strategy, preferred_chain)
    }

    /// Pick the best route for `params` and execute it
    pub async fn auto_bridge(&self, params: AutoBridgeParams) -> BridgeResult<SmartBridgeResult> {
        if params.amount.is_zero() {
            return Err(BridgeError::InvalidAmount);
        }

        let routes = self.get_routes(&params.to_chain, Some(params.amount)).await?;
        let strategy = params.strategy.unwrap_or(self.config.default_strategy);

        let route = select_best_route(
            &routes,
            strategy,
            params.preferred_source_chain.as_deref(),
        )
        .ok_or_else(|| BridgeError::NoRoute {
            amount: params.amount,
            to_chain: params.to_chain.clone(),
        })?;

        info!(
            from = %route.from_chain,
            to = %route.to_chain,
            strategy = %strategy,
            native_fee = ?route.native_fee,
            "Selected bridge route"
        );

        let recipient = params
            .recipient
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| self.signer.address().to_string());
        let slippage = params
            .slippage
            .filter(|s| *s > 0.0)
            .unwrap_or(self.config.default_slippage);

        let mut send = SendParams::new(QuoteParams {
            from_chain: route.from_chain.clone(),
            to_chain: route.to_chain.clone(),
            amount: params.amount,
            recipient,
        });
        send.slippage = effective_slippage(slippage);

        let result = self.bridge(&send).await?;

        Ok(SmartBridgeResult {
            result,
            selected_route: route,
            strategy,
        })
    }

    /// Execute a transfer from an explicitly chosen source chain
    pub async fn bridge(&self, params: &SendParams) -> BridgeResult<BridgeExecutionResult> {
        let bridge = self.bridges.get_or_create(&params.quote.from_chain).await?;
        bridge.send(params).await
    }

    /// Current relay status of a message
    pub async fn track_message(&self, guid: &str) -> BridgeResult<RelayMessage> {
        Ok(self.tracker.get_message(guid).await?)
    }

    /// Wait for a message to reach a terminal status
    pub async fn wait_for_delivery(
        &self,
        guid: &str,
        opts: WaitOptions,
    ) -> BridgeResult<RelayMessage> {
        Ok(self.tracker.wait_for_delivery(guid, opts).await?)
    }

    /// Recent relay messages sent by `address`; a zero limit uses the default
    pub async fn messages_by_wallet(
        &self,
        address: &str,
        limit: usize,
    ) -> BridgeResult<Vec<RelayMessage>> {
        Ok(self.tracker.messages_by_wallet(address, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RelayStatus;
    use crate::testing::{MockChainSigner, MockMultiChainSigner, MockRelayIndex, Scripted};
    use alloy::primitives::{address, Address};
    use std::time::Duration;

    const WALLET: Address = address!("1234567890123456789012345678901234567890");

    fn route(chain: &str, fee: u64, time: u64) -> BridgeRoute {
        BridgeRoute {
            from_chain: chain.to_string(),
            to_chain: "arbitrum".to_string(),
            native_fee: Some(U256::from(fee)),
            estimated_time_secs: time,
            available: true,
            unavailable_reason: None,
            available_amount: U256::from(100_000_000u64),
        }
    }

    fn down(chain: &str) -> BridgeRoute {
        BridgeRoute {
            available: false,
            native_fee: None,
            unavailable_reason: Some("insufficient USDT0 balance".to_string()),
            ..route(chain, 0, 300)
        }
    }

    fn usdt(n: u64) -> U256 {
        U256::from(n * 1_000_000)
    }

    fn eth_milli(n: u64) -> U256 {
        U256::from(n) * U256::from(1_000_000_000_000_000u64)
    }

    fn router(signer: MockMultiChainSigner) -> SmartBridgeRouter {
        router_with_index(signer, MockRelayIndex::new(vec![]))
    }

    fn router_with_index(signer: MockMultiChainSigner, index: MockRelayIndex) -> SmartBridgeRouter {
        SmartBridgeRouter::with_relay_index(Arc::new(signer), RouterConfig::default(), Arc::new(index))
    }

    #[test]
    fn test_select_cheapest() {
        let routes = vec![
            route("ink", 500_000, 300),
            route("berachain", 800_000, 300),
            route("ethereum", 1_000_000, 180),
        ];
        let best = select_best_route(&routes, RouteStrategy::Cheapest, None).unwrap();
        assert_eq!(best.from_chain, "ink");
    }

    #[test]
    fn test_select_fastest() {
        let routes = vec![
            route("ethereum", 1_000_000, 180),
            route("ink", 500_000, 300),
            route("berachain", 800_000, 300),
        ];
        let best = select_best_route(&routes, RouteStrategy::Fastest, None).unwrap();
        assert_eq!(best.from_chain, "ethereum");
    }

    #[test]
    fn test_select_preferred() {
        let routes = vec![
            route("ink", 500_000, 300),
            route("berachain", 800_000, 300),
            route("ethereum", 1_000_000, 180),
        ];
        let best =
            select_best_route(&routes, RouteStrategy::Preferred, Some("Berachain")).unwrap();
        assert_eq!(best.from_chain, "berachain");
    }

    #[test]
    fn test_select_preferred_falls_back_to_cheapest() {
        let routes = vec![
            route("ink", 500_000, 300),
            route("berachain", 800_000, 300),
            down("unichain"),
        ];
        for preferred in [Some("unichain"), Some("polygon"), Some(""), None] {
            let best = select_best_route(&routes, RouteStrategy::Preferred, preferred).unwrap();
            assert_eq!(best.from_chain, "ink");
        }
    }

    #[test]
    fn test_select_ignores_unavailable() {
        assert!(select_best_route(&[], RouteStrategy::Cheapest, None).is_none());
        assert!(
            select_best_route(&[down("ink"), down("ethereum")], RouteStrategy::Fastest, None)
                .is_none()
        );

        let mixed = vec![down("ink"), route("berachain", 800_000, 300), down("ethereum")];
        for strategy in [
            RouteStrategy::Cheapest,
            RouteStrategy::Fastest,
            RouteStrategy::Preferred,
        ] {
            let best = select_best_route(&mixed, strategy, Some("ink")).unwrap();
            assert!(best.available);
            assert_eq!(best.from_chain, "berachain");
        }
    }

    #[test]
    fn test_select_ties_keep_first() {
        let routes = vec![route("ink", 5, 300), route("berachain", 5, 300)];
        assert_eq!(
            select_best_route(&routes, RouteStrategy::Cheapest, None).unwrap().from_chain,
            "ink"
        );
        assert_eq!(
            select_best_route(&routes, RouteStrategy::Fastest, None).unwrap().from_chain,
            "ink"
        );
    }

    #[tokio::test]
    async fn test_get_routes_classifies_every_source() {
        let signer = MockMultiChainSigner::new(WALLET)
            .with_chain("arbitrum", usdt(100), eth_milli(10), U256::from(1_000u64))
            .with_chain("ethereum", usdt(100), eth_milli(10), U256::from(5_000u64))
            .with_chain("ink", U256::ZERO, eth_milli(10), U256::from(1_000u64))
            .with_chain("berachain", usdt(100), U256::ZERO, U256::from(1_000u64))
            .with_chain("unichain", usdt(5), eth_milli(10), U256::from(1_000u64))
            .with_chain("polygon", usdt(100), eth_milli(10), U256::from(1_000u64));

        let routes = router(signer)
            .get_routes("arbitrum", Some(usdt(10)))
            .await
            .unwrap();

        let chains: Vec<_> = routes.iter().map(|r| r.from_chain.as_str()).collect();
        assert_eq!(chains, vec!["berachain", "ethereum", "ink", "unichain"]);

        let by_chain = |c: &str| routes.iter().find(|r| r.from_chain == c).unwrap();

        let eth = by_chain("ethereum");
        assert!(eth.available);
        assert_eq!(eth.native_fee, Some(U256::from(5_000u64)));
        assert_eq!(eth.estimated_time_secs, 180);
        assert!(eth.unavailable_reason.is_none());

        assert_eq!(
            by_chain("ink").unavailable_reason.as_deref(),
            Some("insufficient USDT0 balance")
        );
        assert_eq!(
            by_chain("berachain").unavailable_reason.as_deref(),
            Some("insufficient native token for gas")
        );
        assert!(by_chain("unichain")
            .unavailable_reason
            .as_deref()
            .unwrap()
            .starts_with("insufficient balance: have 5000000, need 10000000"));

        for r in &routes {
            assert_eq!(r.available, r.unavailable_reason.is_none());
            assert_eq!(r.available, r.native_fee.is_some());
        }
    }

    #[tokio::test]
    async fn test_get_routes_fee_above_native_balance() {
        let signer = MockMultiChainSigner::new(WALLET).with_chain(
            "ink",
            usdt(100),
            eth_milli(2),
            eth_milli(3),
        );

        let routes = router(signer).get_routes("ethereum", None).await.unwrap();
        assert_eq!(routes.len(), 1);
        assert!(!routes[0].available);
        assert_eq!(
            routes[0].unavailable_reason.as_deref(),
            Some("insufficient native token for bridge fee")
        );
    }

    #[tokio::test]
    async fn test_get_routes_quote_failure_is_absorbed() {
        let signer = MockMultiChainSigner::new(WALLET)
            .with_chain_signer(
                "ink",
                usdt(100),
                eth_milli(10),
                MockChainSigner::new(WALLET).with_quote_error("rpc unavailable"),
            )
            .with_chain("berachain", usdt(100), eth_milli(10), U256::from(9u64));

        let routes = router(signer).get_routes("ethereum", Some(usdt(1))).await.unwrap();
        let ink = routes.iter().find(|r| r.from_chain == "ink").unwrap();
        assert!(!ink.available);
        let reason = ink.unavailable_reason.as_deref().unwrap();
        assert!(reason.starts_with("failed to get quote"));
        assert!(reason.contains("rpc unavailable"));
        assert!(routes.iter().any(|r| r.from_chain == "berachain" && r.available));
    }

    #[tokio::test]
    async fn test_get_routes_without_amount_quotes_full_balance() {
        let chain_signer = MockChainSigner::new(WALLET).with_fee(U256::from(1u64));
        let signer = MockMultiChainSigner::new(WALLET).with_chain_signer(
            "ink",
            usdt(42),
            eth_milli(10),
            chain_signer,
        );
        let probe = signer.chain_signer("ink").unwrap();

        router(signer).get_routes("ethereum", None).await.unwrap();

        let quoted = probe.quoted_amounts();
        assert_eq!(quoted, vec![usdt(42)]);
    }

    #[tokio::test]
    async fn test_get_routes_rejects_unsupported_destination() {
        let err = router(MockMultiChainSigner::new(WALLET))
            .get_routes("polygon", None)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_get_routes_with_no_bridgeable_chains() {
        let signer = MockMultiChainSigner::new(WALLET).with_chain(
            "polygon",
            usdt(1),
            eth_milli(1),
            U256::ZERO,
        );
        assert!(router(signer).get_routes("ink", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_auto_bridge_selects_cheapest_and_executes() {
        let signer = MockMultiChainSigner::new(WALLET)
            .with_chain("ink", usdt(100), eth_milli(10), U256::from(500_000u64))
            .with_chain("berachain", usdt(100), eth_milli(10), U256::from(800_000u64))
            .with_chain("ethereum", usdt(100), eth_milli(10), U256::from(1_000_000u64));
        let ink = signer.chain_signer("ink").unwrap();

        let result = router(signer)
            .auto_bridge(AutoBridgeParams {
                to_chain: "arbitrum".into(),
                amount: usdt(10),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(result.strategy, RouteStrategy::Cheapest);
        assert_eq!(result.selected_route.from_chain, "ink");
        assert_eq!(result.result.from_chain, "ink");
        assert_eq!(result.result.to_chain, "arbitrum");
        assert_eq!(result.result.amount_sent, usdt(10));
        assert_eq!(result.result.message_guid, ink.message_guid().to_string());
        assert!(ink.events().iter().any(|e| e.label() == "write:send"));
    }

    #[tokio::test]
    async fn test_auto_bridge_preferred_and_fastest() {
        let build = || {
            MockMultiChainSigner::new(WALLET)
                .with_chain("ink", usdt(100), eth_milli(10), U256::from(500_000u64))
                .with_chain("berachain", usdt(100), eth_milli(10), U256::from(800_000u64))
                .with_chain("ethereum", usdt(100), eth_milli(10), U256::from(1_000_000u64))
        };

        let preferred = router(build())
            .auto_bridge(AutoBridgeParams {
                to_chain: "arbitrum".into(),
                amount: usdt(1),
                strategy: Some(RouteStrategy::Preferred),
                preferred_source_chain: Some("berachain".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(preferred.selected_route.from_chain, "berachain");

        let fastest = router(build())
            .auto_bridge(AutoBridgeParams {
                to_chain: "arbitrum".into(),
                amount: usdt(1),
                strategy: Some(RouteStrategy::Fastest),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(fastest.selected_route.from_chain, "ethereum");
    }

    #[tokio::test]
    async fn test_auto_bridge_without_route_is_an_error() {
        let signer = MockMultiChainSigner::new(WALLET)
            .with_chain("ink", usdt(1), eth_milli(10), U256::from(1u64));

        let err = router(signer)
            .auto_bridge(AutoBridgeParams {
                to_chain: "arbitrum".into(),
                amount: usdt(50),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::NoRoute { .. }));
        assert_eq!(
            err.to_string(),
            "no available route for amount 50000000 to chain arbitrum"
        );
    }

    #[tokio::test]
    async fn test_auto_bridge_rejects_zero_amount() {
        let err = router(MockMultiChainSigner::new(WALLET))
            .auto_bridge(AutoBridgeParams {
                to_chain: "arbitrum".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidAmount));
    }

    #[tokio::test]
    async fn test_auto_bridge_defaults_recipient_and_slippage() {
        let signer = MockMultiChainSigner::new(WALLET)
            .with_chain("ink", usdt(100), eth_milli(10), U256::from(1u64));

        let result = router(signer)
            .auto_bridge(AutoBridgeParams {
                to_chain: "ethereum".into(),
                amount: usdt(10),
                recipient: Some(String::new()),
                slippage: Some(-1.0),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(result.result.amount_to_receive, U256::from(9_950_000u64));
    }

    #[tokio::test]
    async fn test_bridge_requires_configured_chain() {
        let err = router(MockMultiChainSigner::new(WALLET))
            .bridge(&SendParams::new(QuoteParams {
                from_chain: "ink".into(),
                to_chain: "ethereum".into(),
                amount: usdt(1),
                recipient: WALLET.to_string(),
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::ChainNotConfigured(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracking_delegates_to_relay() {
        let index = MockRelayIndex::new(vec![
            Scripted::Status(RelayStatus::Inflight),
            Scripted::Status(RelayStatus::Delivered),
        ]);
        let index = index.with_wallet_messages(vec![MockRelayIndex::message(
            "0xabc",
            RelayStatus::Delivered,
        )]);
        let router = router_with_index(MockMultiChainSigner::new(WALLET), index);

        let first = router.track_message("0xabc").await.unwrap();
        assert_eq!(first.status, RelayStatus::Inflight);

        let delivered = router
            .wait_for_delivery("0xabc", WaitOptions::new().poll_interval(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(delivered.is_delivered());

        // script exhausted: the index keeps answering Delivered
        let again = router
            .wait_for_delivery("0xabc", WaitOptions::new().timeout(Duration::from_secs(1)))
            .await;
        assert!(again.is_ok());

        let history = router.messages_by_wallet(&WALLET.to_string(), 0).await.unwrap();
        assert_eq!(history.len(), 1);
    }
}
