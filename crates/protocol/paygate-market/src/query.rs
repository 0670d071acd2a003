//! Search queries over tool listings.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::listing::ToolListing;

/// How the query's method is compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodMatch {
    #[default]
    Exact,
    /// Case-insensitive substring.
    Contains,
}

/// Field a search is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    ReputationScore,
    AvgLatencyMs,
    UptimePercent,
    TotalServed,
    ListedAt,
    Method,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortField {
    fn compare(self, a: &ToolListing, b: &ToolListing) -> Ordering {
        match self {
            Self::ReputationScore => a.reputation_score.cmp(&b.reputation_score),
            Self::AvgLatencyMs => a.avg_latency_ms.total_cmp(&b.avg_latency_ms),
            Self::UptimePercent => a.uptime_percent.total_cmp(&b.uptime_percent),
            Self::TotalServed => a.total_served.cmp(&b.total_served),
            Self::ListedAt => a.listed_at.cmp(&b.listed_at),
            Self::Method => a.method.cmp(&b.method),
        }
    }
}

/// Filter, sort and page parameters for [`ToolMarketplace::search`].
///
/// All filters are optional and combine with AND. Without a sort field,
/// results keep insertion order.
///
/// [`ToolMarketplace::search`]: crate::ToolMarketplace::search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchQuery {
    pub method: Option<String>,
    pub method_match: MethodMatch,
    /// Seller id.
    pub seller: Option<String>,
    pub min_reputation: Option<u32>,
    pub region: Option<String>,
    pub require_attestation: bool,
    pub sort_by: Option<SortField>,
    pub order: SortOrder,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl SearchQuery {
    /// Empty query (matches every listing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Match `method` exactly.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self.method_match = MethodMatch::Exact;
        self
    }

    /// Match methods containing `fragment`.
    pub fn method_contains(mut self, fragment: impl Into<String>) -> Self {
        self.method = Some(fragment.into());
        self.method_match = MethodMatch::Contains;
        self
    }

    pub fn seller(mut self, seller_id: impl Into<String>) -> Self {
        self.seller = Some(seller_id.into());
        self
    }

    pub fn min_reputation(mut self, score: u32) -> Self {
        self.min_reputation = Some(score);
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn require_attestation(mut self) -> Self {
        self.require_attestation = true;
        self
    }

    pub fn sort_by(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = Some(field);
        self.order = order;
        self
    }

    /// Limit the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` results (for pagination).
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// True when `listing` passes every filter.
    pub fn matches(&self, listing: &ToolListing) -> bool {
        if let Some(method) = &self.method {
            let hit = match self.method_match {
                MethodMatch::Exact => &listing.method == method,
                MethodMatch::Contains => listing
                    .method
                    .to_lowercase()
                    .contains(&method.to_lowercase()),
            };
            if !hit {
                return false;
            }
        }
        if self.seller.as_ref().is_some_and(|s| s != listing.seller_id()) {
            return false;
        }
        if self
            .min_reputation
            .is_some_and(|min| listing.reputation_score < min)
        {
            return false;
        }
        if let Some(region) = &self.region {
            let same = listing
                .region
                .as_ref()
                .is_some_and(|r| r.eq_ignore_ascii_case(region));
            if !same {
                return false;
            }
        }
        !self.require_attestation || listing.attestation_available
    }

    /// Sort in place per `sort_by` and `order`. Stable, so ties keep
    /// insertion order.
    pub(crate) fn sort(&self, listings: &mut [ToolListing]) {
        let Some(field) = self.sort_by else {
            return;
        };
        listings.sort_by(|a, b| {
            let ord = field.compare(a, b);
            match self.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
    }
}
