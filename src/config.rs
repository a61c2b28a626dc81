//! Router configuration

use crate::chains::{
    DEFAULT_DELIVERY_TIMEOUT, DEFAULT_MIN_NATIVE_BALANCE_WEI, DEFAULT_POLL_INTERVAL,
    DEFAULT_SLIPPAGE, LAYERZERO_SCAN_BASE_URL,
};
use crate::multi_evm::validate_rpc_url;
use crate::relay::DEFAULT_REQUEST_TIMEOUT;
use crate::types::RouteStrategy;
use alloy::primitives::U256;
use eyre::{eyre, Result, WrapErr};
use std::env;
use std::time::Duration;

/// Smart router configuration; every value can be overridden per call
#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    /// Minimum native balance (wei) for a chain to count as bridge-eligible
    pub min_native_balance: U256,
    pub default_strategy: RouteStrategy,
    /// Slippage tolerance in percent
    pub default_slippage: f64,
    /// Relay polling interval
    pub poll_interval: Duration,
    /// Time to wait for delivery before giving up
    pub delivery_timeout: Duration,
    /// LayerZero Scan API base URL
    pub scan_base_url: String,
    /// Per-request HTTP timeout for the Scan API
    pub request_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            min_native_balance: U256::from(DEFAULT_MIN_NATIVE_BALANCE_WEI),
            default_strategy: RouteStrategy::Cheapest,
            default_slippage: DEFAULT_SLIPPAGE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
            scan_base_url: LAYERZERO_SCAN_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl RouterConfig {
    /// Load configuration from the environment, falling back to defaults
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded .env from {:?}", path);
        }

        let defaults = Self::default();

        let min_native_balance = match env::var("BRIDGE_MIN_NATIVE_BALANCE_WEI") {
            Ok(v) => U256::from_str_radix(v.trim(), 10)
                .map_err(|e| eyre!("Invalid BRIDGE_MIN_NATIVE_BALANCE_WEI: {}", e))?,
            Err(_) => defaults.min_native_balance,
        };

        let default_strategy = match env::var("BRIDGE_DEFAULT_STRATEGY") {
            Ok(v) => v.parse().wrap_err("Invalid BRIDGE_DEFAULT_STRATEGY")?,
            Err(_) => defaults.default_strategy,
        };

        let default_slippage = match env::var("BRIDGE_DEFAULT_SLIPPAGE") {
            Ok(v) => v
                .trim()
                .parse()
                .map_err(|_| eyre!("Invalid BRIDGE_DEFAULT_SLIPPAGE: {}", v))?,
            Err(_) => defaults.default_slippage,
        };

        let poll_interval = env::var("BRIDGE_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);

        let delivery_timeout = env::var("BRIDGE_DELIVERY_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.delivery_timeout);

        let scan_base_url = env::var("LZ_SCAN_BASE_URL").unwrap_or(defaults.scan_base_url);

        let config = Self {
            min_native_balance,
            default_strategy,
            default_slippage,
            poll_interval,
            delivery_timeout,
            scan_base_url,
            request_timeout: defaults.request_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_rpc_url(&self.scan_base_url, "LZ_SCAN_BASE_URL")?;

        if !(self.default_slippage > 0.0 && self.default_slippage < 100.0) {
            return Err(eyre!(
                "Default slippage must be between 0 and 100 percent, got {}",
                self.default_slippage
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(eyre!("Poll interval must be greater than 0"));
        }
        if self.delivery_timeout < self.poll_interval {
            return Err(eyre!(
                "Delivery timeout ({:?}) is shorter than the poll interval ({:?})",
                self.delivery_timeout,
                self.poll_interval
            ));
        }
        Ok(())
    }
}
