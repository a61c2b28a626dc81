//! LayerZero Scan HTTP client

use super::{RelayIndex, RelayMessage};
use crate::chains::LAYERZERO_SCAN_BASE_URL;
use crate::config::RouterConfig;
use crate::error::{RelayError, RelayResult};
use async_trait::async_trait;
use eyre::{Result, WrapErr};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Default number of messages returned by a wallet query
pub const DEFAULT_WALLET_MESSAGE_LIMIT: usize = 20;

/// HTTP request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Read-only client for the LayerZero Scan API
#[derive(Debug, Clone)]
pub struct ScanClient {
    base_url: String,
    client: Client,
}

impl ScanClient {
    /// Client for the public Scan API
    pub fn new() -> Result<Self> {
        Self::with_base_url(LAYERZERO_SCAN_BASE_URL, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Client for a custom Scan deployment (or a test server)
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .wrap_err("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &RouterConfig) -> Result<Self> {
        Self::with_base_url(&config.scan_base_url, config.request_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /messages/guid/{guid}`
    pub async fn get_message(&self, guid: &str) -> RelayResult<RelayMessage> {
        let url = format!("{}/messages/guid/{}", self.base_url, guid);
        debug!(url = %url, "Fetching LayerZero message");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(RelayError::NotFound(guid.to_string()));
        }
        let data = json_body(response).await?;

        // Some deployments wrap the message in a `data` array
        let obj = match &data {
            Value::Object(obj) if obj.contains_key("guid") || obj.contains_key("messageGuid") => obj,
            Value::Object(obj) => match obj.get("data").and_then(Value::as_array) {
                Some(items) => match items.first() {
                    Some(Value::Object(first)) => first,
                    _ => return Err(RelayError::NotFound(guid.to_string())),
                },
                None => obj,
            },
            other => {
                return Err(RelayError::Decode(format!(
                    "expected a JSON object, got {}",
                    json_kind(other)
                )))
            }
        };

        Ok(RelayMessage::from_json(obj))
    }

    /// `GET /messages/wallet/{address}?limit={limit}`; a zero limit uses the default
    pub async fn get_messages_by_wallet(
        &self,
        address: &str,
        limit: usize,
    ) -> RelayResult<Vec<RelayMessage>> {
        let limit = if limit == 0 {
            DEFAULT_WALLET_MESSAGE_LIMIT
        } else {
            limit
        };
        let url = format!("{}/messages/wallet/{}", self.base_url, address);
        debug!(url = %url, limit, "Fetching wallet messages");

        let response = self
            .client
            .get(&url)
            .query(&[("limit", limit)])
            .header("Accept", "application/json")
            .send()
            .await?;

        let data = json_body(response).await?;

        let items = data
            .get("messages")
            .and_then(Value::as_array)
            .or_else(|| data.get("data").and_then(Value::as_array));

        Ok(items
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(RelayMessage::from_json)
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl RelayIndex for ScanClient {
    async fn get_message(&self, guid: &str) -> RelayResult<RelayMessage> {
        ScanClient::get_message(self, guid).await
    }

    async fn get_messages_by_wallet(
        &self,
        address: &str,
        limit: usize,
    ) -> RelayResult<Vec<RelayMessage>> {
        ScanClient::get_messages_by_wallet(self, address, limit).await
    }
}

/// Decode a 2xx JSON body; any other status is a transport error
async fn json_body(response: Response) -> RelayResult<Value> {
    let status = response.status();
    if !status.is_success() {
        return Err(RelayError::Status {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| RelayError::Decode(e.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
