//! Mock relay index
//!
//! Answers `get_message` from a script, one entry per call. Once the script
//! runs out the last entry keeps being returned; an empty script always
//! answers "not found".

use crate::chains;
use crate::error::{RelayError, RelayResult};
use crate::relay::{RelayIndex, RelayMessage, RelayStatus};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One scripted answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    /// A message with this status
    Status(RelayStatus),
    /// Not indexed yet
    NotFound,
    /// Non-2xx response from the index
    HttpStatus(u16),
}

/// Scripted [`RelayIndex`]
#[derive(Debug, Default)]
pub struct MockRelayIndex {
    script: Vec<Scripted>,
    wallet_messages: Vec<RelayMessage>,
    calls: AtomicUsize,
}

impl MockRelayIndex {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// Give the same answer forever
    pub fn repeating(answer: Scripted) -> Self {
        Self::new(vec![answer])
    }

    /// Messages returned by `get_messages_by_wallet`
    pub fn with_wallet_messages(mut self, messages: Vec<RelayMessage>) -> Self {
        self.wallet_messages = messages;
        self
    }

    /// Number of `get_message` calls
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// An arbitrum -> ethereum message in `status`
    pub fn message(guid: &str, status: RelayStatus) -> RelayMessage {
        let delivered = status == RelayStatus::Delivered;
        RelayMessage {
            guid: guid.to_string(),
            src_eid: chains::endpoint_id("arbitrum").unwrap_or_default(),
            dst_eid: chains::endpoint_id("ethereum").unwrap_or_default(),
            src_ua_address: chains::lookup("arbitrum")
                .map(|c| c.oft_address.to_string())
                .unwrap_or_default(),
            dst_ua_address: chains::lookup("ethereum")
                .map(|c| c.oft_address.to_string())
                .unwrap_or_default(),
            src_tx_hash: format!("0x{:064x}", 1),
            dst_tx_hash: delivered.then(|| format!("0x{:064x}", 2)),
            status,
            src_block_number: 1_000,
            dst_block_number: delivered.then_some(2_000),
            created: "2025-01-01T00:00:00.000Z".to_string(),
            updated: "2025-01-01T00:05:00.000Z".to_string(),
        }
    }
}

#[async_trait]
impl RelayIndex for MockRelayIndex {
    async fn get_message(&self, guid: &str) -> RelayResult<RelayMessage> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = match self.script.len() {
            0 => None,
            n => self.script.get(call.min(n - 1)),
        };

        match answer {
            None | Some(Scripted::NotFound) => Err(RelayError::NotFound(guid.to_string())),
            Some(Scripted::HttpStatus(status)) => Err(RelayError::Status {
                status: *status,
                body: "mock relay error".to_string(),
            }),
            Some(Scripted::Status(status)) => Ok(Self::message(guid, status.clone())),
        }
    }

    async fn get_messages_by_wallet(
        &self,
        _address: &str,
        limit: usize,
    ) -> RelayResult<Vec<RelayMessage>> {
        let mut messages = self.wallet_messages.clone();
        if limit > 0 {
            messages.truncate(limit);
        }
        Ok(messages)
    }
}
