//! Multi-chain wallet configuration
//!
//! Describes which EVM chains the bridging wallet can reach and with which
//! RPC endpoints. One private key signs on every chain.
//!
//! # Environment Variable Schema
//!
//! ```text
//! EVM_CHAINS_COUNT=2                # Number of chains to configure
//! EVM_CHAIN_1_NAME=arbitrum         # Chain name (matches the bridge registry)
//! EVM_CHAIN_1_RPC_URL=https://arb1.arbitrum.io/rpc
//! EVM_CHAIN_1_CHAIN_ID=42161        # optional for registry chains
//! EVM_CHAIN_1_ENABLED=true          # optional, default true
//! EVM_PRIVATE_KEY=0x...             # shared signing key
//! ```

use crate::chains;
use crate::redact::Redacted;
use eyre::{eyre, Result};
use std::collections::HashSet;
use std::fmt;

// ============================================================================
// URL Validation
// ============================================================================

/// Validates that a URL uses http/https and has a host component
pub fn validate_rpc_url(url_str: &str, name: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url_str).map_err(|e| eyre!("{} must be a valid URL: {}", name, e))?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(eyre!(
            "{} must use http:// or https:// scheme, got {}",
            name,
            scheme
        ));
    }

    if parsed.host_str().is_none() {
        return Err(eyre!("{} must have a host component", name));
    }

    if scheme == "http" {
        tracing::warn!("{} uses unencrypted http:// (use https:// in production)", name);
    }

    Ok(())
}

// ============================================================================
// Chain Configuration
// ============================================================================

/// RPC access to one EVM chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmChainConfig {
    /// Lowercase chain name (e.g. "arbitrum")
    pub name: String,
    /// Native EVM chain ID
    pub chain_id: u64,
    pub rpc_url: String,
    pub enabled: bool,
}

impl EvmChainConfig {
    /// Config for a registry chain, taking the chain ID from the registry
    pub fn for_bridgeable(name: &str, rpc_url: &str) -> Result<Self> {
        let entry = chains::lookup(name)
            .ok_or_else(|| eyre!("{} is not a USDT0 bridgeable chain", name))?;
        Ok(Self {
            name: entry.name.to_string(),
            chain_id: entry.evm_chain_id,
            rpc_url: rpc_url.to_string(),
            enabled: true,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(eyre!("Chain name is empty"));
        }
        if self.rpc_url.is_empty() {
            return Err(eyre!("RPC URL is empty for chain {}", self.name));
        }
        validate_rpc_url(&self.rpc_url, &format!("{}_RPC_URL", self.name))?;

        if let Some(entry) = chains::lookup(&self.name) {
            if entry.evm_chain_id != self.chain_id {
                return Err(eyre!(
                    "Chain ID mismatch for {}: configured {}, expected {}",
                    self.name,
                    self.chain_id,
                    entry.evm_chain_id
                ));
            }
        }

        Ok(())
    }

    pub fn is_bridgeable(&self) -> bool {
        chains::supports_bridging(&self.name)
    }
}

// ============================================================================
// Wallet Configuration
// ============================================================================

/// Chains reachable by the bridging wallet plus its signing key
#[derive(Clone)]
pub struct MultiEvmConfig {
    chains: Vec<EvmChainConfig>,
    private_key: Redacted<String>,
}

impl fmt::Debug for MultiEvmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiEvmConfig")
            .field("chains", &self.chains)
            .field("private_key", &self.private_key)
            .finish()
    }
}

impl MultiEvmConfig {
    pub fn new(chains: Vec<EvmChainConfig>, private_key: String) -> Result<Self> {
        let chains = chains
            .into_iter()
            .map(|mut c| {
                c.name = c.name.trim().to_lowercase();
                c
            })
            .collect();

        let config = Self {
            chains,
            private_key: Redacted(private_key),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn get_chain_by_name(&self, name: &str) -> Option<&EvmChainConfig> {
        self.chains.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn get_chain(&self, chain_id: u64) -> Option<&EvmChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }

    pub fn enabled_chains(&self) -> impl Iterator<Item = &EvmChainConfig> {
        self.chains.iter().filter(|c| c.enabled)
    }

    pub fn all_chains(&self) -> &[EvmChainConfig] {
        &self.chains
    }

    /// Names of enabled chains
    pub fn enabled_names(&self) -> Vec<String> {
        self.enabled_chains().map(|c| c.name.clone()).collect()
    }

    /// Names of enabled chains with a USDT0 deployment
    pub fn bridgeable_names(&self) -> Vec<String> {
        self.enabled_chains()
            .filter(|c| c.is_bridgeable())
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn private_key(&self) -> &str {
        self.private_key.expose()
    }

    fn validate(&self) -> Result<()> {
        if self.chains.is_empty() {
            return Err(eyre!("At least one EVM chain must be configured"));
        }

        let mut seen_names = HashSet::new();
        let mut seen_ids = HashSet::new();
        for chain in &self.chains {
            chain.validate()?;

            if !seen_names.insert(chain.name.as_str()) {
                return Err(eyre!("Duplicate chain name: {}", chain.name));
            }
            if !seen_ids.insert(chain.chain_id) {
                return Err(eyre!(
                    "Duplicate native chain ID: {} (chain: {})",
                    chain.chain_id,
                    chain.name
                ));
            }
        }

        let key = self.private_key.expose();
        if key.len() != 66
            || !key.starts_with("0x")
            || !key[2..].chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(eyre!(
                "Invalid private key format (expected 0x-prefixed 66-char hex)"
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Environment Variable Loading
// ============================================================================

/// Load the wallet chain configuration from environment variables.
///
/// Returns `None` if `EVM_CHAINS_COUNT` is not set or is 0.
///
/// Per chain `N`:
/// - `EVM_CHAIN_{N}_NAME` (required)
/// - `EVM_CHAIN_{N}_RPC_URL` (required)
/// - `EVM_CHAIN_{N}_CHAIN_ID` (required unless the name is a registry chain)
/// - `EVM_CHAIN_{N}_ENABLED` (default true)
///
/// Shared: `EVM_PRIVATE_KEY`
pub fn load_from_env() -> Result<Option<MultiEvmConfig>> {
    let count: usize = match std::env::var("EVM_CHAINS_COUNT").ok() {
        Some(s) => s
            .trim()
            .parse()
            .map_err(|_| eyre!("Invalid EVM_CHAINS_COUNT: {}", s))?,
        None => return Ok(None),
    };

    if count == 0 {
        return Ok(None);
    }

    let mut chains = Vec::with_capacity(count);

    for i in 1..=count {
        let prefix = format!("EVM_CHAIN_{}", i);

        let name = std::env::var(format!("{}_NAME", prefix))
            .map_err(|_| eyre!("Missing {}_NAME", prefix))?
            .trim()
            .to_lowercase();

        let rpc_url = std::env::var(format!("{}_RPC_URL", prefix))
            .map_err(|_| eyre!("Missing {}_RPC_URL", prefix))?;

        let chain_id: u64 = match std::env::var(format!("{}_CHAIN_ID", prefix)) {
            Ok(s) => s
                .trim()
                .parse()
                .map_err(|_| eyre!("Invalid {}_CHAIN_ID: must be a u64", prefix))?,
            Err(_) => chains::lookup(&name)
                .map(|c| c.evm_chain_id)
                .ok_or_else(|| eyre!("Missing {}_CHAIN_ID for non-registry chain {}", prefix, name))?,
        };

        let enabled: bool = std::env::var(format!("{}_ENABLED", prefix))
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(true);

        chains.push(EvmChainConfig {
            name,
            chain_id,
            rpc_url,
            enabled,
        });
    }

    let private_key = std::env::var("EVM_PRIVATE_KEY")
        .map_err(|_| eyre!("Missing EVM_PRIVATE_KEY for multi-chain wallet"))?;

    Ok(Some(MultiEvmConfig::new(chains, private_key)?))
}
