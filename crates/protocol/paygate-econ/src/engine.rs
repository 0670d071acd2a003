//! The pricing engine.
//!
//! Resolves a tier (with optional per-method overrides) to a concrete
//! per-call price, applying congestion surcharges and bundle discounts.
//! All state sits behind interior locks so one engine can be shared by every
//! session of a gateway.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

use paygate_types::{Amount, PricingTier, ToolBundle, FREE_PRICE};
use tracing::debug;

use crate::config::PricingConfig;
use crate::congestion::{congestion_multiplier, LatencyEma};
use crate::error::{EconError, EconResult};
use crate::tier::validate_tier;

/// Per-call price resolution with surge pricing.
#[derive(Debug, Default)]
pub struct PricingEngine {
    config: PricingConfig,
    tiers: RwLock<Vec<PricingTier>>,
    method_overrides: RwLock<HashMap<String, PricingTier>>,
    bundles: RwLock<HashMap<String, ToolBundle>>,
    latency: Mutex<LatencyEma>,
}

impl PricingEngine {
    /// Create an engine with no tiers.
    pub fn new(config: PricingConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Create an engine preloaded with validated tiers.
    pub fn with_tiers(config: PricingConfig, tiers: Vec<PricingTier>) -> EconResult<Self> {
        let engine = Self::new(config);
        for tier in tiers {
            engine.register_tier(tier)?;
        }
        Ok(engine)
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    // =========================================================================
    // Tiers
    // =========================================================================

    /// Add or replace a default tier.
    pub fn register_tier(&self, tier: PricingTier) -> EconResult<()> {
        validate_tier(&tier)?;
        let mut tiers = self.tiers.write().unwrap_or_else(PoisonError::into_inner);
        match tiers.iter_mut().find(|t| t.id == tier.id) {
            Some(existing) => *existing = tier,
            None => tiers.push(tier),
        }
        Ok(())
    }

    /// Price `method` on a specific tier regardless of the requested tier id.
    pub fn set_method_override(&self, method: impl Into<String>, tier: PricingTier) -> EconResult<()> {
        validate_tier(&tier)?;
        self.method_overrides
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(method.into(), tier);
        Ok(())
    }

    pub fn remove_method_override(&self, method: &str) -> Option<PricingTier> {
        self.method_overrides
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(method)
    }

    /// Default tiers in registration order.
    pub fn tiers(&self) -> Vec<PricingTier> {
        self.tiers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Resolve a tier.
    ///
    /// A method override wins over the default table. Returns `None` when
    /// nothing matches; the caller decides whether that is an error.
    pub fn get_tier(&self, tier_id: &str, method: Option<&str>) -> Option<PricingTier> {
        if let Some(method) = method {
            let overrides = self
                .method_overrides
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(tier) = overrides.get(method) {
                return Some(tier.clone());
            }
        }
        self.tiers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|t| t.id == tier_id)
            .cloned()
    }

    // =========================================================================
    // Congestion
    // =========================================================================

    /// Feed an observed call latency into the moving average.
    pub fn report_latency(&self, latency_ms: f64) {
        let mut ema = self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        ema.record(latency_ms, self.config.ema_window);
    }

    pub fn average_latency_ms(&self) -> f64 {
        self.latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .average_ms()
    }

    /// Current surge multiplier (1.0 when uncongested).
    pub fn congestion_multiplier(&self) -> f64 {
        congestion_multiplier(
            self.average_latency_ms(),
            self.config.congestion_threshold_ms,
            self.config.congestion_max_multiplier,
        )
    }

    // =========================================================================
    // Prices
    // =========================================================================

    /// Price of one call on `tier` under current congestion, rounded up.
    pub fn compute_call_price(&self, tier: &PricingTier) -> Amount {
        if tier.is_free() {
            return FREE_PRICE;
        }
        let multiplier = self.congestion_multiplier();
        if multiplier <= 1.0 {
            return tier.price_per_call;
        }
        let price = (tier.price_per_call as f64 * multiplier).ceil() as Amount;
        debug!(tier = %tier.id, base = tier.price_per_call, price, multiplier, "Surge price applied");
        price.max(tier.price_per_call)
    }

    /// Cost of `calls` calls at the current price, or `None` if the tier is
    /// unknown.
    pub fn estimate_session_cost(
        &self,
        tier_id: &str,
        calls: u64,
        method: Option<&str>,
    ) -> Option<Amount> {
        let tier = self.get_tier(tier_id, method)?;
        self.compute_call_price(&tier).checked_mul(calls)
    }

    // =========================================================================
    // Bundles
    // =========================================================================

    /// Add or replace a bundle.
    pub fn register_bundle(&self, bundle: ToolBundle) -> EconResult<()> {
        for tier in &bundle.tiers {
            validate_tier(tier)?;
        }
        self.bundles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bundle.id.clone(), bundle);
        Ok(())
    }

    pub fn bundle(&self, bundle_id: &str) -> Option<ToolBundle> {
        self.bundles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(bundle_id)
            .cloned()
    }

    pub fn bundles(&self) -> Vec<ToolBundle> {
        let mut all: Vec<ToolBundle> = self
            .bundles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Discounted cost of `calls` calls through a bundle.
    ///
    /// The tier is looked up in the bundle's own tiers first, then in the
    /// engine's defaults. The discount is applied to the undiscounted
    /// session cost and the result rounded up.
    pub fn compute_bundle_session_cost(
        &self,
        bundle_id: &str,
        tier_id: &str,
        calls: u64,
    ) -> EconResult<Amount> {
        let bundle = self
            .bundle(bundle_id)
            .ok_or_else(|| EconError::BundleNotFound(bundle_id.to_string()))?;
        let tier = bundle
            .tier(tier_id)
            .cloned()
            .or_else(|| self.get_tier(tier_id, None))
            .ok_or_else(|| EconError::TierNotFound(tier_id.to_string()))?;

        let per_call = self.compute_call_price(&tier);
        let base = per_call
            .checked_mul(calls)
            .ok_or(EconError::Overflow { per_call, calls })?;
        let discount = self.config.bundle_discount.clamp(0.0, 1.0);
        Ok((base as f64 * (1.0 - discount)).ceil() as Amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paygate_types::AgentIdentity;

    fn engine() -> PricingEngine {
        PricingEngine::with_tiers(
            PricingConfig::default(),
            vec![
                PricingTier::new("free", "Free", 0),
                PricingTier::new("basic", "Basic", 1_000),
                PricingTier::new("pro", "Pro", 333),
            ],
        )
        .unwrap()
    }

    fn bundle() -> ToolBundle {
        ToolBundle {
            id: "defi".into(),
            name: "DeFi pack".into(),
            description: String::new(),
            methods: vec!["getBalance".into(), "getTokenAccounts".into()],
            seller: AgentIdentity::new("s", "Seller", "0xs"),
            tiers: vec![PricingTier::new("bundle-basic", "Bundle", 200)],
            created_at: 0,
        }
    }

    #[test]
    fn test_get_tier_and_override() {
        let engine = engine();
        assert_eq!(engine.get_tier("basic", None).unwrap().price_per_call, 1_000);
        assert!(engine.get_tier("gold", None).is_none());

        engine
            .set_method_override("getBlock", PricingTier::new("heavy", "Heavy", 5_000))
            .unwrap();
        assert_eq!(
            engine.get_tier("basic", Some("getBlock")).unwrap().id,
            "heavy"
        );
        assert_eq!(engine.get_tier("basic", Some("getSlot")).unwrap().id, "basic");

        engine.remove_method_override("getBlock");
        assert_eq!(engine.get_tier("basic", Some("getBlock")).unwrap().id, "basic");
    }

    #[test]
    fn test_register_tier_replaces() {
        let engine = engine();
        engine
            .register_tier(PricingTier::new("basic", "Basic v2", 1_500))
            .unwrap();
        assert_eq!(engine.tiers().len(), 3);
        assert_eq!(engine.get_tier("basic", None).unwrap().price_per_call, 1_500);
    }

    #[test]
    fn test_base_price_without_congestion() {
        let engine = engine();
        let tier = engine.get_tier("basic", None).unwrap();
        assert_eq!(engine.compute_call_price(&tier), 1_000);
        engine.report_latency(100.0);
        assert_eq!(engine.compute_call_price(&tier), 1_000);
    }

    #[test]
    fn test_surge_rounds_up() {
        let engine = engine();
        // avg 750 over threshold 500 => 1.5x; 333 * 1.5 = 499.5 => 500
        engine.report_latency(750.0);
        let tier = engine.get_tier("pro", None).unwrap();
        assert_eq!(engine.compute_call_price(&tier), 500);
    }

    #[test]
    fn test_estimate_session_cost() {
        let engine = engine();
        assert_eq!(engine.estimate_session_cost("basic", 5, None), Some(5_000));
        assert_eq!(engine.estimate_session_cost("nope", 5, None), None);
    }

    #[test]
    fn test_bundle_cost() {
        let engine = engine();
        engine.register_bundle(bundle()).unwrap();

        // 200 * 3 = 600, 15% off = 510
        assert_eq!(
            engine.compute_bundle_session_cost("defi", "bundle-basic", 3).unwrap(),
            510
        );
        // falls back to engine tiers: 333 * 1 * 0.85 = 283.05 => 284
        assert_eq!(engine.compute_bundle_session_cost("defi", "pro", 1).unwrap(), 284);

        assert_eq!(
            engine.compute_bundle_session_cost("missing", "basic", 1),
            Err(EconError::BundleNotFound("missing".into()))
        );
        assert_eq!(
            engine.compute_bundle_session_cost("defi", "gold", 1),
            Err(EconError::TierNotFound("gold".into()))
        );
    }

    #[test]
    fn test_bundles_listing() {
        let engine = engine();
        assert!(engine.bundles().is_empty());
        engine.register_bundle(bundle()).unwrap();
        assert_eq!(engine.bundles().len(), 1);
        assert!(engine.bundle("defi").unwrap().covers("getBalance"));
    }
}
