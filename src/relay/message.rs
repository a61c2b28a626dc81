//! LayerZero Scan message model
//!
//! The Scan API has shipped several field spellings over time, so responses
//! are mapped from raw JSON with fallbacks instead of a strict derive.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Message status as reported by LayerZero Scan
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RelayStatus {
    /// Sent, in transit between chains
    Inflight,
    /// Awaiting DVN confirmations
    Confirming,
    Delivered,
    Failed,
    /// Blocked by a DVN
    Blocked,
    /// A status this client does not know; treated as non-terminal
    Unknown(String),
}

impl RelayStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFLIGHT" => Self::Inflight,
            "CONFIRMING" => Self::Confirming,
            "DELIVERED" => Self::Delivered,
            "FAILED" => Self::Failed,
            "BLOCKED" => Self::Blocked,
            _ => Self::Unknown(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Inflight => "INFLIGHT",
            Self::Confirming => "CONFIRMING",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
            Self::Blocked => "BLOCKED",
            Self::Unknown(s) => s,
        }
    }

    /// Delivered, Failed and Blocked never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Failed | Self::Blocked)
    }
}

impl fmt::Display for RelayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for RelayStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<RelayStatus> for String {
    fn from(status: RelayStatus) -> Self {
        status.as_str().to_string()
    }
}

/// A cross-chain message tracked by LayerZero Scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayMessage {
    pub guid: String,
    /// Source LayerZero endpoint ID
    pub src_eid: u32,
    /// Destination LayerZero endpoint ID
    pub dst_eid: u32,
    /// Source OApp address
    pub src_ua_address: String,
    /// Destination OApp address
    pub dst_ua_address: String,
    pub src_tx_hash: String,
    /// Present once delivered
    pub dst_tx_hash: Option<String>,
    pub status: RelayStatus,
    pub src_block_number: u64,
    pub dst_block_number: Option<u64>,
    pub created: String,
    pub updated: String,
}

impl RelayMessage {
    /// Map a Scan API message object.
    ///
    /// Accepts `guid`|`messageGuid`, `srcEid`|`srcChainId`, `dstEid`|`dstChainId`,
    /// `srcUaAddress`|`srcAddress`, `dstUaAddress`|`dstAddress`,
    /// `created`|`createdAt` and `updated`|`updatedAt`. A missing status is
    /// reported as [`RelayStatus::Inflight`]; `status` may be a string or an
    /// object carrying `name`.
    pub fn from_json(obj: &Map<String, Value>) -> Self {
        let status = match obj.get("status") {
            Some(Value::String(s)) => RelayStatus::parse(s),
            Some(Value::Object(inner)) => inner
                .get("name")
                .and_then(Value::as_str)
                .map(RelayStatus::parse)
                .unwrap_or(RelayStatus::Inflight),
            _ => RelayStatus::Inflight,
        };

        Self {
            guid: str_field(obj, &["guid", "messageGuid"]).unwrap_or_default(),
            src_eid: u64_field(obj, &["srcEid", "srcChainId"]).unwrap_or(0) as u32,
            dst_eid: u64_field(obj, &["dstEid", "dstChainId"]).unwrap_or(0) as u32,
            src_ua_address: str_field(obj, &["srcUaAddress", "srcAddress"]).unwrap_or_default(),
            dst_ua_address: str_field(obj, &["dstUaAddress", "dstAddress"]).unwrap_or_default(),
            src_tx_hash: str_field(obj, &["srcTxHash"]).unwrap_or_default(),
            dst_tx_hash: str_field(obj, &["dstTxHash"]).filter(|s| !s.is_empty()),
            status,
            src_block_number: u64_field(obj, &["srcBlockNumber"]).unwrap_or(0),
            dst_block_number: u64_field(obj, &["dstBlockNumber"]),
            created: str_field(obj, &["created", "createdAt"]).unwrap_or_default(),
            updated: str_field(obj, &["updated", "updatedAt"]).unwrap_or_default(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.status == RelayStatus::Delivered
    }
}

/// First key present as a string
fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::to_string)
}

/// First key present as a non-negative integer (JSON number or decimal string)
fn u64_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|k| match obj.get(*k)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}
