//! LayerZero message tracking
//!
//! - `message` - Scan API message model and status enum
//! - `client` - HTTP client for LayerZero Scan
//! - `tracker` - delivery state machine and polling loop

pub mod client;
pub mod message;
pub mod tracker;

pub use client::{ScanClient, DEFAULT_REQUEST_TIMEOUT, DEFAULT_WALLET_MESSAGE_LIMIT};
pub use message::{RelayMessage, RelayStatus};
pub use tracker::{DeliveryTracker, Outcome, StatusCallback, StatusObserver, Step, WaitOptions};

use crate::error::RelayResult;
use async_trait::async_trait;

/// Read access to an index of relayed messages
#[async_trait]
pub trait RelayIndex: Send + Sync {
    /// Look up one message; [`crate::RelayError::NotFound`] if not indexed yet
    async fn get_message(&self, guid: &str) -> RelayResult<RelayMessage>;

    /// Most recent messages sent from `address`
    async fn get_messages_by_wallet(
        &self,
        address: &str,
        limit: usize,
    ) -> RelayResult<Vec<RelayMessage>>;
}
