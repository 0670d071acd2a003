//! Directory of well-known facilitators.
//!
//! The table is compiled in and read-only; hosts pick an entry by id and
//! resolve it into a [`FacilitatorConfig`].

use serde::Serialize;

use crate::error::{X402Error, X402Result};
use crate::facilitator::FacilitatorConfig;

/// CAIP-2 ids used in the registry.
pub mod networks {
    pub const BASE_MAINNET: &str = "eip155:8453";
    pub const BASE_SEPOLIA: &str = "eip155:84532";
    pub const POLYGON_MAINNET: &str = "eip155:137";
    pub const AVALANCHE_MAINNET: &str = "eip155:43114";
    pub const SOLANA_MAINNET: &str = "solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp";
    pub const SOLANA_DEVNET: &str = "solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1";
}

/// A facilitator known at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownFacilitator {
    pub id: &'static str,
    pub name: &'static str,
    pub url: &'static str,
    pub supported_networks: &'static [&'static str],
    pub supported_versions: &'static [u32],
    /// Facilitator pays gas on the buyer's behalf.
    pub gas_sponsored: bool,
    pub requires_api_key: bool,
    pub testnet_only: bool,
}

impl KnownFacilitator {
    pub fn supports_network(&self, network: &str) -> bool {
        self.supported_networks.contains(&network)
    }

    pub fn supports_version(&self, version: u32) -> bool {
        self.supported_versions.contains(&version)
    }
}

static KNOWN_FACILITATORS: &[KnownFacilitator] = &[
    KnownFacilitator {
        id: "x402-org",
        name: "x402.org reference facilitator",
        url: "https://x402.org/facilitator",
        supported_networks: &[networks::BASE_SEPOLIA, networks::SOLANA_DEVNET],
        supported_versions: &[1, 2],
        gas_sponsored: true,
        requires_api_key: false,
        testnet_only: true,
    },
    KnownFacilitator {
        id: "coinbase-cdp",
        name: "Coinbase Developer Platform",
        url: "https://api.cdp.coinbase.com/platform/v2/x402",
        supported_networks: &[
            networks::BASE_MAINNET,
            networks::BASE_SEPOLIA,
            networks::SOLANA_MAINNET,
            networks::SOLANA_DEVNET,
        ],
        supported_versions: &[1, 2],
        gas_sponsored: true,
        requires_api_key: true,
        testnet_only: false,
    },
    KnownFacilitator {
        id: "payai",
        name: "PayAI",
        url: "https://facilitator.payai.network",
        supported_networks: &[
            networks::BASE_MAINNET,
            networks::BASE_SEPOLIA,
            networks::POLYGON_MAINNET,
            networks::AVALANCHE_MAINNET,
            networks::SOLANA_MAINNET,
            networks::SOLANA_DEVNET,
        ],
        supported_versions: &[1, 2],
        gas_sponsored: true,
        requires_api_key: false,
        testnet_only: false,
    },
    KnownFacilitator {
        id: "blocky402-testnet",
        name: "Blocky402 (testnet)",
        url: "https://api.testnet.blocky402.com/v1",
        supported_networks: &[networks::BASE_SEPOLIA],
        supported_versions: &[1],
        gas_sponsored: true,
        requires_api_key: false,
        testnet_only: true,
    },
];

/// Every registered facilitator.
pub fn list_known_facilitators() -> &'static [KnownFacilitator] {
    KNOWN_FACILITATORS
}

/// Look up a facilitator by id.
pub fn known_facilitator(id: &str) -> Option<&'static KnownFacilitator> {
    KNOWN_FACILITATORS.iter().find(|f| f.id == id)
}

/// Host-supplied adjustments applied on top of a registry entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacilitatorOverrides {
    pub url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub api_key: Option<String>,
}

/// Turn a registry entry into a client configuration.
///
/// Fails for unknown ids (listing the valid ones) and for entries that need
/// an API key when none is supplied.
pub fn resolve_known_facilitator(
    id: &str,
    overrides: FacilitatorOverrides,
) -> X402Result<FacilitatorConfig> {
    let entry = known_facilitator(id).ok_or_else(|| X402Error::UnknownFacilitator {
        id: id.to_string(),
        known: KNOWN_FACILITATORS.iter().map(|f| f.id.to_string()).collect(),
    })?;

    let api_key = overrides.api_key.filter(|k| !k.trim().is_empty());
    if entry.requires_api_key && api_key.is_none() {
        return Err(X402Error::InvalidConfig(format!(
            "facilitator '{id}' requires an API key"
        )));
    }

    let mut config = FacilitatorConfig::new(overrides.url.unwrap_or_else(|| entry.url.to_string()));
    if let Some(secs) = overrides.timeout_secs {
        config.timeout_secs = secs;
    }
    config.api_key = api_key;
    Ok(config)
}
