//! The in-memory tool marketplace.

use std::collections::{BTreeMap, HashMap};

use paygate_types::{SharedClock, SystemClock, ToolBundle};
use tracing::{debug, info};

use crate::error::{MarketError, MarketResult};
use crate::listing::ToolListing;
use crate::query::SearchQuery;
use crate::reputation::ReputationRecord;

/// `(method, seller_id)`.
type ListingKey = (String, String);

/// Registry of tool listings, bundles and seller reputation.
///
/// Listings keep their insertion position across overwrites, which is the
/// default search order.
pub struct ToolMarketplace {
    /// Insertion sequence -> listing.
    listings: BTreeMap<u64, ToolListing>,
    index: HashMap<ListingKey, u64>,
    next_seq: u64,
    bundles: HashMap<String, ToolBundle>,
    reputation: HashMap<String, ReputationRecord>,
    clock: SharedClock,
}

impl ToolMarketplace {
    pub fn new() -> Self {
        Self {
            listings: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
            bundles: HashMap::new(),
            reputation: HashMap::new(),
            clock: SystemClock::shared(),
        }
    }

    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    // =========================================================================
    // Listings
    // =========================================================================

    /// Insert or overwrite a listing.
    ///
    /// An overwrite keeps the original `listed_at` and position. A seller
    /// with reputation history gets its current score.
    pub fn list_tool(&mut self, mut listing: ToolListing) -> MarketResult<()> {
        validate_listing(&listing)?;
        let now = self.clock.now_ms();
        let key = (listing.method.clone(), listing.seller.id.clone());

        if let Some(record) = self.reputation.get(&listing.seller.id) {
            listing.reputation_score = record.score();
            listing.avg_latency_ms = record.avg_latency_ms();
            listing.total_served = record.total_calls;
        }
        listing.updated_at = now;

        match self.index.get(&key) {
            Some(seq) => {
                if let Some(existing) = self.listings.get_mut(seq) {
                    listing.listed_at = existing.listed_at;
                    *existing = listing;
                }
                debug!(method = %key.0, seller = %key.1, "Listing overwritten");
            }
            None => {
                listing.listed_at = now;
                let seq = self.next_seq;
                self.next_seq += 1;
                self.listings.insert(seq, listing);
                self.index.insert(key.clone(), seq);
                info!(method = %key.0, seller = %key.1, "Tool listed");
            }
        }
        Ok(())
    }

    /// List several tools; nothing is inserted if any listing is invalid.
    pub fn list_tools(&mut self, listings: Vec<ToolListing>) -> MarketResult<usize> {
        for listing in &listings {
            validate_listing(listing)?;
        }
        let count = listings.len();
        for listing in listings {
            self.list_tool(listing)?;
        }
        Ok(count)
    }

    /// Remove one listing. Returns whether anything was removed.
    pub fn delist_tool(&mut self, method: &str, seller_id: &str) -> bool {
        let key = (method.to_string(), seller_id.to_string());
        match self.index.remove(&key) {
            Some(seq) => {
                self.listings.remove(&seq);
                info!(method, seller = seller_id, "Tool delisted");
                true
            }
            None => false,
        }
    }

    /// Remove every listing of a seller. Returns the removed count.
    pub fn delist_all(&mut self, seller_id: &str) -> usize {
        let before = self.listings.len();
        self.listings.retain(|_, l| l.seller.id != seller_id);
        self.index.retain(|(_, seller), _| seller != seller_id);
        let removed = before - self.listings.len();
        if removed > 0 {
            info!(seller = seller_id, removed, "Seller delisted");
        }
        removed
    }

    pub fn get_listing(&self, method: &str, seller_id: &str) -> Option<&ToolListing> {
        let seq = self
            .index
            .get(&(method.to_string(), seller_id.to_string()))?;
        self.listings.get(seq)
    }

    /// Listings of one seller, in insertion order.
    pub fn listings_by_seller(&self, seller_id: &str) -> Vec<ToolListing> {
        self.listings
            .values()
            .filter(|l| l.seller.id == seller_id)
            .cloned()
            .collect()
    }

    /// Set a listing's uptime, clamped to `[0, 100]`.
    pub fn update_uptime(&mut self, method: &str, seller_id: &str, percent: f64) -> MarketResult<()> {
        let now = self.clock.now_ms();
        let listing = self
            .index
            .get(&(method.to_string(), seller_id.to_string()))
            .and_then(|seq| self.listings.get_mut(seq))
            .ok_or_else(|| MarketError::ListingNotFound {
                method: method.to_string(),
                seller_id: seller_id.to_string(),
            })?;
        listing.uptime_percent = percent.clamp(0.0, 100.0);
        listing.updated_at = now;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Filter, sort, then page.
    pub fn search(&self, query: &SearchQuery) -> Vec<ToolListing> {
        let mut hits: Vec<ToolListing> = self
            .listings
            .values()
            .filter(|l| query.matches(l))
            .cloned()
            .collect();
        query.sort(&mut hits);

        let page = hits.into_iter().skip(query.offset);
        match query.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        }
    }

    // =========================================================================
    // Reputation
    // =========================================================================

    /// Record one attestation outcome and rescore the seller's listings.
    ///
    /// Returns the seller's new score.
    pub fn report_attestation(&mut self, seller_id: &str, success: bool, latency_ms: u64) -> u32 {
        let record = self.reputation.entry(seller_id.to_string()).or_default();
        record.record(success, latency_ms);

        let score = record.score();
        let avg_latency = record.avg_latency_ms();
        let served = record.total_calls;
        let now = self.clock.now_ms();

        for listing in self.listings.values_mut().filter(|l| l.seller.id == seller_id) {
            listing.reputation_score = score;
            listing.avg_latency_ms = avg_latency;
            listing.total_served = served;
            listing.updated_at = now;
        }
        debug!(seller = seller_id, success, latency_ms, score, "Reputation updated");
        score
    }

    pub fn reputation(&self, seller_id: &str) -> Option<&ReputationRecord> {
        self.reputation.get(seller_id)
    }

    // =========================================================================
    // Bundles
    // =========================================================================

    /// Insert or overwrite a bundle by id.
    pub fn register_bundle(&mut self, bundle: ToolBundle) -> MarketResult<()> {
        if bundle.id.trim().is_empty() {
            return Err(MarketError::InvalidListing("bundle id is empty".into()));
        }
        if bundle.methods.is_empty() {
            return Err(MarketError::InvalidListing(format!(
                "bundle '{}' has no methods",
                bundle.id
            )));
        }
        debug!(bundle = %bundle.id, methods = bundle.methods.len(), "Bundle registered");
        self.bundles.insert(bundle.id.clone(), bundle);
        Ok(())
    }

    pub fn get_bundle(&self, bundle_id: &str) -> Option<&ToolBundle> {
        self.bundles.get(bundle_id)
    }

    /// Bundles of one seller, sorted by id.
    pub fn bundles_by_seller(&self, seller_id: &str) -> Vec<ToolBundle> {
        let mut bundles: Vec<_> = self
            .bundles
            .values()
            .filter(|b| b.seller.id == seller_id)
            .cloned()
            .collect();
        bundles.sort_by(|a, b| a.id.cmp(&b.id));
        bundles
    }

    pub fn remove_bundle(&mut self, bundle_id: &str) -> MarketResult<ToolBundle> {
        self.bundles
            .remove(bundle_id)
            .ok_or_else(|| MarketError::BundleNotFound(bundle_id.to_string()))
    }
}

impl Default for ToolMarketplace {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolMarketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolMarketplace")
            .field("listings", &self.listings.len())
            .field("bundles", &self.bundles.len())
            .field("sellers_rated", &self.reputation.len())
            .finish()
    }
}

fn validate_listing(listing: &ToolListing) -> MarketResult<()> {
    if listing.method.trim().is_empty() {
        return Err(MarketError::InvalidListing("method is empty".into()));
    }
    if listing.seller.id.trim().is_empty() {
        return Err(MarketError::InvalidListing(format!(
            "listing for {} has no seller id",
            listing.method
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use paygate_test_utils::ManualClock;
    use paygate_types::AgentIdentity;

    fn seller(id: &str) -> AgentIdentity {
        AgentIdentity::new(id, id, format!("wallet-{id}"))
    }

    #[test]
    fn test_overwrite_keeps_position_and_listed_at() {
        let clock = ManualClock::new(1_000);
        let mut market = ToolMarketplace::new().with_clock(clock.shared());
        market.list_tool(ToolListing::new("a", seller("s1"))).unwrap();
        market.list_tool(ToolListing::new("b", seller("s1"))).unwrap();

        clock.advance(500);
        market
            .list_tool(ToolListing::new("a", seller("s1")).with_description("v2"))
            .unwrap();

        assert_eq!(market.len(), 2);
        let a = market.get_listing("a", "s1").unwrap();
        assert_eq!(a.description, "v2");
        assert_eq!(a.listed_at, 1_000);
        assert_eq!(a.updated_at, 1_500);

        let all = market.search(&SearchQuery::new());
        assert_eq!(all[0].method, "a");
    }

    #[test]
    fn test_delist() {
        let mut market = ToolMarketplace::new();
        market
            .list_tools(vec![
                ToolListing::new("a", seller("s1")),
                ToolListing::new("b", seller("s1")),
                ToolListing::new("a", seller("s2")),
            ])
            .unwrap();

        assert!(market.delist_tool("a", "s2"));
        assert!(!market.delist_tool("a", "s2"));
        assert_eq!(market.delist_all("s1"), 2);
        assert_eq!(market.delist_all("s1"), 0);
        assert!(market.is_empty());
    }

    #[test]
    fn test_list_tools_all_or_nothing() {
        let mut market = ToolMarketplace::new();
        let err = market
            .list_tools(vec![
                ToolListing::new("a", seller("s1")),
                ToolListing::new("", seller("s1")),
            ])
            .unwrap_err();
        assert_eq!(err.code(), paygate_types::ErrorCode::InvalidConfig);
        assert!(market.is_empty());
    }

    #[test]
    fn test_report_attestation_rescores_listings() {
        let mut market = ToolMarketplace::new();
        market.list_tool(ToolListing::new("a", seller("s1"))).unwrap();
        market.list_tool(ToolListing::new("b", seller("s1"))).unwrap();
        market.list_tool(ToolListing::new("a", seller("s2"))).unwrap();

        let score = market.report_attestation("s1", true, 0);
        assert_eq!(score, 1000);
        for l in market.listings_by_seller("s1") {
            assert_eq!(l.reputation_score, 1000);
            assert_eq!(l.total_served, 1);
        }
        assert_eq!(market.get_listing("a", "s2").unwrap().reputation_score, 500);

        // later listings inherit the current score
        market.list_tool(ToolListing::new("c", seller("s1"))).unwrap();
        assert_eq!(market.get_listing("c", "s1").unwrap().reputation_score, 1000);
    }

    #[test]
    fn test_update_uptime() {
        let mut market = ToolMarketplace::new();
        market.list_tool(ToolListing::new("a", seller("s1"))).unwrap();
        market.update_uptime("a", "s1", 150.0).unwrap();
        assert_eq!(market.get_listing("a", "s1").unwrap().uptime_percent, 100.0);
        assert!(matches!(
            market.update_uptime("x", "s1", 1.0),
            Err(MarketError::ListingNotFound { .. })
        ));
    }
}
