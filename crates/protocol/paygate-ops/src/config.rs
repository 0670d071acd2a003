//! Gateway configuration.
//!
//! Loaded from TOML. Secret-bearing fields (facilitator URL and API key,
//! payee and seller wallet) may reference environment variables as
//! `${VAR}`; unset variables are left as written.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use paygate_econ::{validate_tier, PricingConfig};
use paygate_session::SessionConfig;
use paygate_types::{AgentIdentity, PricingTier};
use paygate_valid::ValidatorConfig;
use paygate_x402::{resolve_known_facilitator, FacilitatorConfig, FacilitatorOverrides, PaywallConfig};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, GatewayResult};

/// Expand `${VAR_NAME}` references from the environment.
fn expand_env_vars(input: &str) -> String {
    let Ok(re) = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}") else {
        return input.to_string();
    };
    re.replace_all(input, |caps: &Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}

/// The selling agent this gateway speaks for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SellerConfig {
    pub id: String,
    pub name: String,
    pub wallet_address: String,
    /// Advertised in marketplace listings.
    pub region: Option<String>,
    pub tags: Vec<String>,
}

impl SellerConfig {
    pub fn identity(&self) -> AgentIdentity {
        AgentIdentity::new(&self.id, &self.name, &self.wallet_address).with_tags(self.tags.clone())
    }
}

/// A method the gateway serves and publishes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MethodConfig {
    pub name: String,
    pub description: String,
    /// Commitments advertised on the listing.
    pub commitments: Vec<String>,
}

impl MethodConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Response attestation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttestationConfig {
    pub enabled: bool,
    pub capacity: usize,
    pub attester_id: Option<String>,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        let defaults = ValidatorConfig::default();
        Self {
            enabled: true,
            capacity: defaults.capacity,
            attester_id: defaults.attester_id,
        }
    }
}

impl AttestationConfig {
    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            capacity: self.capacity,
            attester_id: self.attester_id.clone(),
        }
    }
}

/// x402 settings: which facilitator to use and what to charge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct X402Settings {
    /// Registry id (e.g. "x402-org"); takes precedence over `facilitator.url`
    /// unless that is also set, in which case the URL overrides the entry's.
    pub facilitator_id: Option<String>,
    pub facilitator: FacilitatorConfig,
    pub paywall: PaywallConfig,
}

impl X402Settings {
    /// Concrete facilitator connection settings.
    pub fn facilitator_config(&self) -> GatewayResult<FacilitatorConfig> {
        let Some(id) = &self.facilitator_id else {
            return Ok(self.facilitator.clone());
        };
        let url = Some(self.facilitator.url.clone()).filter(|u| !u.trim().is_empty());
        let mut config = resolve_known_facilitator(
            id,
            FacilitatorOverrides {
                url,
                timeout_secs: Some(self.facilitator.timeout_secs),
                api_key: self.facilitator.api_key.clone(),
            },
        )?;
        config.headers = self.facilitator.headers.clone();
        Ok(config)
    }
}

/// Everything a [`Gateway`](crate::Gateway) needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GatewayConfig {
    pub seller: SellerConfig,
    pub tiers: Vec<PricingTier>,
    /// Method name -> tier id, overriding the session's tier for that method.
    pub method_tiers: HashMap<String, String>,
    pub methods: Vec<MethodConfig>,
    pub pricing: PricingConfig,
    pub session: SessionConfig,
    pub attestation: AttestationConfig,
    pub x402: X402Settings,
}

impl GatewayConfig {
    /// Load and validate a config file. A missing file yields defaults.
    pub fn load(path: &Path) -> GatewayResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    /// Parse, expand environment references, and validate.
    pub fn from_toml(contents: &str) -> GatewayResult<Self> {
        let mut config: Self = toml::from_str(contents)
            .map_err(|e| GatewayError::config(format!("invalid TOML: {e}")))?;
        config.expand_env();
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> GatewayResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| GatewayError::config(format!("failed to serialize config: {e}")))
    }

    fn expand_env(&mut self) {
        self.seller.wallet_address = expand_env_vars(&self.seller.wallet_address);
        self.x402.facilitator.url = expand_env_vars(&self.x402.facilitator.url);
        self.x402.facilitator.api_key = self.x402.facilitator.api_key.as_deref().map(expand_env_vars);
        self.x402.paywall.pay_to = expand_env_vars(&self.x402.paywall.pay_to);
    }

    /// Reject configs the gateway cannot serve with.
    pub fn validate(&self) -> GatewayResult<()> {
        let mut seen = HashSet::new();
        for tier in &self.tiers {
            validate_tier(tier)?;
            if !seen.insert(tier.id.as_str()) {
                return Err(GatewayError::config(format!("duplicate tier id '{}'", tier.id)));
            }
        }
        for (method, tier_id) in &self.method_tiers {
            if !seen.contains(tier_id.as_str()) {
                return Err(GatewayError::config(format!(
                    "method '{method}' references unknown tier '{tier_id}'"
                )));
            }
        }
        if self.methods.iter().any(|m| m.name.trim().is_empty()) {
            return Err(GatewayError::config("method name must not be empty"));
        }
        if self.attestation.enabled && self.attestation.capacity == 0 {
            return Err(GatewayError::config("attestation capacity must be positive"));
        }
        if self.pricing.congestion_threshold_ms <= 0.0 || self.pricing.congestion_max_multiplier < 1.0 {
            return Err(GatewayError::config(
                "congestion threshold must be positive and max multiplier at least 1",
            ));
        }
        if !(0.0..1.0).contains(&self.pricing.bundle_discount) {
            return Err(GatewayError::config("bundle discount must be in [0, 1)"));
        }
        self.x402.paywall.validate()?;
        if self.x402.paywall.enabled {
            self.x402.facilitator_config()?;
        }
        Ok(())
    }
}
