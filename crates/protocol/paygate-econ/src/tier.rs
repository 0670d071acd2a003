//! Tier validation.

use paygate_types::{PricingTier, UNLIMITED_CALLS};

use crate::error::{EconError, EconResult};

/// Validate that a tier is well-formed.
///
/// # Returns
/// * `Ok(())` if the tier can be served
/// * `Err(EconError::InvalidTier)` naming the first problem found
///
/// # Example
/// ```
/// use paygate_econ::validate_tier;
/// use paygate_types::PricingTier;
///
/// assert!(validate_tier(&PricingTier::new("basic", "Basic", 100)).is_ok());
/// assert!(validate_tier(&PricingTier::new("", "Nameless", 100)).is_err());
/// ```
pub fn validate_tier(tier: &PricingTier) -> EconResult<()> {
    let invalid = |reason: &str| EconError::InvalidTier {
        tier_id: tier.id.clone(),
        reason: reason.to_string(),
    };

    if tier.id.trim().is_empty() {
        return Err(invalid("id must not be empty"));
    }
    if tier.rate_limit == 0 {
        return Err(invalid("rate limit must be positive"));
    }
    if tier.max_calls_per_session < UNLIMITED_CALLS {
        return Err(invalid("max calls per session must be -1 or non-negative"));
    }
    if tier.token.trim().is_empty() {
        return Err(invalid("token must not be empty"));
    }
    Ok(())
}
