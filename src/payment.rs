//! Cross-chain payment routing
//!
//! A payer holding USDT0 on one chain is asked to pay on another. The
//! [`CrossChainPaymentRouter`] bridges the funds to the payer's own address
//! on the destination chain and hands back what is needed to follow the
//! delivery; the payment itself is made once the funds land.

use crate::bridge::{effective_slippage, Usdt0Bridge};
use crate::chains;
use crate::error::{BridgeError, BridgeResult};
use crate::relay::{DeliveryTracker, RelayIndex, RelayMessage, ScanClient, WaitOptions};
use crate::signer::ChainSigner;
use crate::types::{QuoteParams, SendParams, TransferQuote};
use alloy::primitives::{TxHash, U256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// A payment that has to be funded from another chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossChainPaymentParams {
    /// Payer address; also the bridge recipient
    pub payer: String,
    /// Final payment recipient on the destination chain
    pub pay_to: String,
    /// USDT0 amount (6 decimals)
    pub amount: U256,
    pub source_chain: String,
    pub destination_chain: String,
    /// Slippage in percent; 0 uses the default
    #[serde(default)]
    pub slippage: f64,
}

/// Outcome of [`CrossChainPaymentRouter::route_payment`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossChainPaymentResult {
    pub bridge_tx_hash: TxHash,
    /// LayerZero message GUID
    pub message_guid: String,
    pub amount_bridged: U256,
    /// Minimum amount credited on the destination chain
    pub estimated_receive_amount: U256,
    pub source_chain: String,
    pub destination_chain: String,
    /// Estimated delivery time in seconds
    pub estimated_delivery_secs: u64,
}

/// Payment router bound to one source chain
#[derive(Debug)]
pub struct CrossChainPaymentRouter {
    bridge: Usdt0Bridge,
    tracker: DeliveryTracker,
}

impl CrossChainPaymentRouter {
    /// Router for `source_chain` tracking deliveries through LayerZero Scan
    pub fn new(signer: Arc<dyn ChainSigner>, source_chain: &str) -> eyre::Result<Self> {
        let scan = ScanClient::new()?;
        Ok(Self::with_relay_index(signer, source_chain, Arc::new(scan))?)
    }

    pub fn with_relay_index(
        signer: Arc<dyn ChainSigner>,
        source_chain: &str,
        index: Arc<dyn RelayIndex>,
    ) -> BridgeResult<Self> {
        Ok(Self {
            bridge: Usdt0Bridge::new(signer, source_chain)?,
            tracker: DeliveryTracker::new(index),
        })
    }

    /// Lowercase source chain
    pub fn source_chain(&self) -> &'static str {
        self.bridge.chain()
    }

    /// Bridge `amount` to the payer's address on the destination chain
    pub async fn route_payment(
        &self,
        params: &CrossChainPaymentParams,
    ) -> BridgeResult<CrossChainPaymentResult> {
        self.validate(params)?;

        let mut send = SendParams::new(self.quote_params(params));
        send.slippage = effective_slippage(params.slippage);

        let result = self.bridge.send(&send).await?;

        info!(
            from = %result.from_chain,
            to = %result.to_chain,
            payer = %params.payer,
            pay_to = %params.pay_to,
            guid = %result.message_guid,
            "Payment funds bridged"
        );

        Ok(CrossChainPaymentResult {
            bridge_tx_hash: result.tx_hash,
            message_guid: result.message_guid,
            amount_bridged: result.amount_sent,
            estimated_receive_amount: result.amount_to_receive,
            source_chain: result.from_chain,
            destination_chain: result.to_chain,
            estimated_delivery_secs: result.estimated_time_secs,
        })
    }

    /// Quote the bridge leg of a payment
    pub async fn estimate_fees(
        &self,
        params: &CrossChainPaymentParams,
    ) -> BridgeResult<TransferQuote> {
        self.bridge
            .quote_with(
                &self.quote_params(params),
                effective_slippage(params.slippage),
                None,
            )
            .await
    }

    pub async fn track_message(&self, guid: &str) -> BridgeResult<RelayMessage> {
        Ok(self.tracker.get_message(guid).await?)
    }

    /// Wait until the bridged funds are delivered
    pub async fn wait_for_delivery(
        &self,
        guid: &str,
        opts: WaitOptions,
    ) -> BridgeResult<RelayMessage> {
        Ok(self.tracker.wait_for_delivery(guid, opts).await?)
    }

    /// Both chains bridgeable and distinct
    pub fn can_route(&self, source_chain: &str, destination_chain: &str) -> bool {
        !source_chain.eq_ignore_ascii_case(destination_chain)
            && chains::supports_bridging(source_chain)
            && chains::supports_bridging(destination_chain)
    }

    pub fn supported_destinations(&self) -> Vec<&'static str> {
        self.bridge.supported_destinations()
    }

    fn quote_params(&self, params: &CrossChainPaymentParams) -> QuoteParams {
        QuoteParams {
            from_chain: params.source_chain.clone(),
            to_chain: params.destination_chain.clone(),
            amount: params.amount,
            recipient: params.payer.clone(),
        }
    }

    fn validate(&self, params: &CrossChainPaymentParams) -> BridgeResult<()> {
        if !params.source_chain.eq_ignore_ascii_case(self.source_chain()) {
            return Err(BridgeError::SourceChainMismatch {
                expected: self.source_chain().to_string(),
                got: params.source_chain.clone(),
            });
        }
        if !self.can_route(&params.source_chain, &params.destination_chain) {
            return Err(BridgeError::CannotRoute {
                from: params.source_chain.clone(),
                to: params.destination_chain.clone(),
                supported: chains::bridgeable_chains().join(", "),
            });
        }
        if params.amount.is_zero() {
            return Err(BridgeError::InvalidAmount);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RelayStatus;
    use crate::signer::ContractCall;
    use crate::testing::{MockChainSigner, MockRelayIndex, Scripted, SignerEvent};
    use alloy::primitives::{address, Address};
    use std::time::Duration;

    const PAYER: &str = "0x1234567890123456789012345678901234567890";
    const WALLET: Address = address!("1234567890123456789012345678901234567890");

    fn params(amount: u64) -> CrossChainPaymentParams {
        CrossChainPaymentParams {
            payer: PAYER.to_string(),
            pay_to: "0x9999999999999999999999999999999999999999".to_string(),
            amount: U256::from(amount),
            source_chain: "ethereum".to_string(),
            destination_chain: "ink".to_string(),
            slippage: 0.0,
        }
    }

    fn router(
        signer: MockChainSigner,
        index: MockRelayIndex,
    ) -> (CrossChainPaymentRouter, Arc<MockChainSigner>) {
        let signer = Arc::new(signer);
        let router =
            CrossChainPaymentRouter::with_relay_index(signer.clone(), "Ethereum", Arc::new(index))
                .unwrap();
        (router, signer)
    }

    #[tokio::test]
    async fn test_route_payment_bridges_to_payer() {
        let (router, signer) = router(
            MockChainSigner::new(WALLET)
                .with_fee(U256::from(42u64))
                .with_allowance(U256::MAX),
            MockRelayIndex::default(),
        );

        let result = router.route_payment(&params(1_000_000)).await.unwrap();
        assert_eq!(result.amount_bridged, U256::from(1_000_000u64));
        assert_eq!(result.estimated_receive_amount, U256::from(995_000u64));
        assert_eq!(result.source_chain, "ethereum");
        assert_eq!(result.destination_chain, "ink");
        assert_eq!(result.estimated_delivery_secs, 180);
        assert_eq!(result.message_guid, signer.message_guid().to_string());

        let recipient = signer
            .events()
            .into_iter()
            .find_map(|e| match e {
                SignerEvent::Write {
                    call: ContractCall::Send { send_param, .. },
                    ..
                } => Some(send_param.to),
                _ => None,
            })
            .unwrap();
        assert_eq!(crate::chains::bytes32_to_address(&recipient), WALLET);
    }

    #[tokio::test]
    async fn test_validation() {
        let (router, signer) = router(MockChainSigner::new(WALLET), MockRelayIndex::default());

        let mut p = params(1);
        p.source_chain = "arbitrum".into();
        assert!(matches!(
            router.route_payment(&p).await,
            Err(BridgeError::SourceChainMismatch { .. })
        ));

        let mut p = params(1);
        p.destination_chain = "ethereum".into();
        let err = router.route_payment(&p).await.unwrap_err();
        assert!(matches!(err, BridgeError::CannotRoute { .. }));
        assert!(err.to_string().contains("Supported chains: arbitrum, berachain"));

        assert!(matches!(
            router.route_payment(&params(0)).await,
            Err(BridgeError::InvalidAmount)
        ));
        assert!(signer.events().is_empty());
    }

    #[tokio::test]
    async fn test_estimate_fees() {
        let (router, _) = router(
            MockChainSigner::new(WALLET).with_fee(U256::from(9u64)),
            MockRelayIndex::default(),
        );

        let mut p = params(2_000_000);
        p.slippage = 1.0;
        let quote = router.estimate_fees(&p).await.unwrap();
        assert_eq!(quote.native_fee, U256::from(9u64));
        assert_eq!(quote.min_amount_to_receive, U256::from(1_980_000u64));
    }

    #[test]
    fn test_can_route_and_destinations() {
        let (router, _) = router(MockChainSigner::new(WALLET), MockRelayIndex::default());
        assert_eq!(router.source_chain(), "ethereum");
        assert!(router.can_route("Ethereum", "ink"));
        assert!(!router.can_route("ethereum", "ETHEREUM"));
        assert!(!router.can_route("ethereum", "polygon"));
        assert_eq!(
            router.supported_destinations(),
            vec!["arbitrum", "berachain", "ink", "unichain"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracking() {
        let index = MockRelayIndex::new(vec![
            Scripted::NotFound,
            Scripted::Status(RelayStatus::Inflight),
            Scripted::Status(RelayStatus::Delivered),
        ]);
        let (router, _) = router(MockChainSigner::new(WALLET), index);

        let err = router.track_message("0x01").await.unwrap_err();
        assert!(matches!(err, BridgeError::Relay(ref e) if e.is_not_found()));

        let message = router
            .wait_for_delivery("0x01", WaitOptions::new().poll_interval(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(message.is_delivered());
        assert!(message.dst_tx_hash.is_some());
    }
}
