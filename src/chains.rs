//! Bridgeable chain registry
//!
//! Static lookup tables for the chains that carry a USDT0 OFT deployment:
//! LayerZero v2 endpoint IDs, OFT contract addresses, CAIP-2 network
//! identifiers and estimated delivery times.
//!
//! Chain names are matched case-insensitively and always returned lowercase.

use alloy::primitives::{b256, Address, FixedBytes, B256};
use eyre::{eyre, Result};
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// LayerZero Scan API base URL
pub const LAYERZERO_SCAN_BASE_URL: &str = "https://scan.layerzero-api.com/v1";

/// Default slippage tolerance in percent (0.5%)
pub const DEFAULT_SLIPPAGE: f64 = 0.5;

/// Default estimated bridge completion time in seconds (~5 minutes)
pub const ESTIMATED_BRIDGE_TIME: u64 = 300;

/// Default time to wait for delivery (10 minutes)
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(600);

/// Default relay polling interval (10 seconds)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default minimum native balance for bridge eligibility (0.001 ETH)
pub const DEFAULT_MIN_NATIVE_BALANCE_WEI: u128 = 1_000_000_000_000_000;

/// keccak256("OFTSent(bytes32,uint32,address,uint256,uint256)")
pub const OFT_SENT_EVENT_TOPIC: B256 =
    b256!("85496b760a4b7f8d66384b9df21b381f5d1b1e79f229a47aaf4c232edc2fe59a");

// ============================================================================
// Registry
// ============================================================================

/// A chain with a USDT0 OFT deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeableChain {
    /// Lowercase chain name
    pub name: &'static str,
    /// LayerZero v2 endpoint ID
    pub endpoint_id: u32,
    /// USDT0 OFT contract address
    pub oft_address: &'static str,
    /// CAIP-2 network identifier
    pub network: &'static str,
    /// Native EVM chain ID
    pub evm_chain_id: u64,
}

const CHAINS: &[BridgeableChain] = &[
    BridgeableChain {
        name: "ethereum",
        endpoint_id: 30101,
        oft_address: "0x6C96dE32CEa08842dcc4058c14d3aaAD7Fa41dee",
        network: "eip155:1",
        evm_chain_id: 1,
    },
    BridgeableChain {
        name: "arbitrum",
        endpoint_id: 30110,
        oft_address: "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9",
        network: "eip155:42161",
        evm_chain_id: 42161,
    },
    BridgeableChain {
        name: "ink",
        endpoint_id: 30291,
        oft_address: "0x0200C29006150606B650577BBE7B6248F58470c1",
        network: "eip155:57073",
        evm_chain_id: 57073,
    },
    BridgeableChain {
        name: "berachain",
        endpoint_id: 30362,
        oft_address: "0x779Ded0c9e1022225f8E0630b35a9b54bE713736",
        network: "eip155:80094",
        evm_chain_id: 80094,
    },
    BridgeableChain {
        name: "unichain",
        endpoint_id: 30320,
        oft_address: "0x588ce4F028D8e7B53B687865d6A67b3A54C75518",
        network: "eip155:130",
        evm_chain_id: 130,
    },
];

/// Look up a bridgeable chain by name (case-insensitive)
pub fn lookup(chain: &str) -> Option<&'static BridgeableChain> {
    CHAINS.iter().find(|c| c.name.eq_ignore_ascii_case(chain))
}

/// Get the LayerZero endpoint ID for a chain name
pub fn endpoint_id(chain: &str) -> Option<u32> {
    lookup(chain).map(|c| c.endpoint_id)
}

/// Get the LayerZero endpoint ID from a CAIP-2 network identifier
pub fn endpoint_id_from_network(network: &str) -> Option<u32> {
    chain_for_network(network).and_then(endpoint_id)
}

/// Get the USDT0 OFT contract address for a chain
pub fn oft_address(chain: &str) -> Option<Address> {
    lookup(chain).and_then(|c| Address::from_str(c.oft_address).ok())
}

/// Check if a chain supports USDT0 bridging
pub fn supports_bridging(chain: &str) -> bool {
    lookup(chain).is_some()
}

/// All chains that support USDT0 bridging, sorted by name
pub fn bridgeable_chains() -> Vec<&'static str> {
    let mut chains: Vec<&'static str> = CHAINS.iter().map(|c| c.name).collect();
    chains.sort_unstable();
    chains
}

/// Map a chain name to its CAIP-2 network identifier
pub fn network_for_chain(chain: &str) -> Option<&'static str> {
    lookup(chain).map(|c| c.network)
}

/// Map a CAIP-2 network identifier to its chain name
pub fn chain_for_network(network: &str) -> Option<&'static str> {
    CHAINS.iter().find(|c| c.network == network).map(|c| c.name)
}

/// Estimated delivery time in seconds between two chains.
///
/// Messages leaving Ethereum confirm quickly on L2s, while messages into
/// Ethereum wait for L2 finality. Unknown chains fall back to
/// [`ESTIMATED_BRIDGE_TIME`].
pub fn estimated_bridge_time(from_chain: &str, to_chain: &str) -> u64 {
    let (Some(from), Some(to)) = (lookup(from_chain), lookup(to_chain)) else {
        return ESTIMATED_BRIDGE_TIME;
    };

    match (from.name, to.name) {
        ("ethereum", "ethereum") => ESTIMATED_BRIDGE_TIME,
        ("ethereum", _) => 180,
        (_, "ethereum") => 900,
        _ => ESTIMATED_BRIDGE_TIME,
    }
}

// ============================================================================
// Address helpers
// ============================================================================

/// Convert a 0x-prefixed EVM address into a left-padded bytes32
pub fn address_to_bytes32(address: &str) -> Result<FixedBytes<32>> {
    let hex_part = address.strip_prefix("0x").unwrap_or(address);
    let decoded = hex::decode(hex_part).map_err(|e| eyre!("invalid address: {}", e))?;

    if decoded.len() != 20 {
        return Err(eyre!(
            "invalid address length: expected 20 bytes, got {}",
            decoded.len()
        ));
    }

    let mut out = [0u8; 32];
    out[12..].copy_from_slice(&decoded);
    Ok(FixedBytes(out))
}

/// Extract the EVM address held in the low 20 bytes of a bytes32
pub fn bytes32_to_address(bytes: &FixedBytes<32>) -> Address {
    Address::from_slice(&bytes[12..])
}
