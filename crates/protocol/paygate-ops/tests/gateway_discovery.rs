//! Listing publication and search.

use std::sync::Arc;

use paygate_market::{SearchQuery, SortField, SortOrder};
use paygate_ops::{Gateway, MethodConfig};
use paygate_test_utils::{gateway_config, MockFacilitator, MockTransport, SELLER_ID};
use serde_json::json;

fn gateway(transport: &MockTransport) -> Gateway {
    let mut config = gateway_config(&["getSlot", "getBalance", "getProgramAccounts"]);
    config.methods[2] = MethodConfig {
        description: "Scan program accounts".to_string(),
        commitments: vec!["confirmed".to_string()],
        ..MethodConfig::new("getProgramAccounts")
    };
    config.method_tiers.insert("getProgramAccounts".to_string(), "pro".to_string());
    Gateway::new(config, Arc::new(transport.clone()), Arc::new(MockFacilitator::new())).unwrap()
}

#[tokio::test]
async fn test_publish_lists_every_method() {
    let gateway = gateway(&MockTransport::new());
    assert_eq!(gateway.publish_listings().await.unwrap(), 3);
    // Republishing overwrites in place
    assert_eq!(gateway.publish_listings().await.unwrap(), 3);

    let market = gateway.marketplace().await;
    assert_eq!(market.len(), 3);

    let scan = market.get_listing("getProgramAccounts", SELLER_ID).unwrap();
    assert_eq!(scan.tiers.len(), 1);
    assert_eq!(scan.tiers[0].id, "pro");
    assert_eq!(scan.min_price(), Some(5_000));
    assert_eq!(scan.commitments, vec!["confirmed".to_string()]);
    assert_eq!(scan.region.as_deref(), Some("us-east"));
    assert!(scan.attestation_available);

    let slot = market.get_listing("getSlot", SELLER_ID).unwrap();
    assert_eq!(slot.tiers.len(), 2);
    assert_eq!(slot.min_price(), Some(1_000));
}

#[tokio::test]
async fn test_search_by_name_and_region() {
    let gateway = gateway(&MockTransport::new());
    gateway.publish_listings().await.unwrap();

    let found = gateway
        .search_tools(
            &SearchQuery::new()
                .method_contains("get")
                .region("us-east")
                .sort_by(SortField::Method, SortOrder::Asc),
        )
        .await;
    let methods: Vec<_> = found.iter().map(|l| l.method.as_str()).collect();
    assert_eq!(methods, vec!["getBalance", "getProgramAccounts", "getSlot"]);

    let none = gateway
        .search_tools(&SearchQuery::new().region("eu-west"))
        .await;
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_calls_before_publish_leave_market_empty() {
    let transport = MockTransport::new();
    let gateway = gateway(&transport);
    gateway
        .handle_x402("getBalance", json!([]), &http::HeaderMap::new())
        .await
        .unwrap();
    assert!(gateway.marketplace().await.is_empty());

    // Listings start at full uptime regardless of earlier calls
    transport.set_failing("getBalance", true);
    let _ = gateway
        .handle_x402("getBalance", json!([]), &http::HeaderMap::new())
        .await;
    gateway.publish_listings().await.unwrap();
    let market = gateway.marketplace().await;
    let listing = market.get_listing("getBalance", SELLER_ID).unwrap();
    assert!((listing.uptime_percent - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_uptime_tracks_transport_failures() {
    let transport = MockTransport::new();
    let gateway = gateway(&transport);
    gateway.publish_listings().await.unwrap();

    transport.set_failing("getBalance", true);
    let _ = gateway
        .handle_x402("getBalance", json!([]), &http::HeaderMap::new())
        .await;
    transport.set_failing("getBalance", false);
    gateway
        .handle_x402("getBalance", json!([]), &http::HeaderMap::new())
        .await
        .unwrap();

    let market = gateway.marketplace().await;
    let listing = market.get_listing("getBalance", SELLER_ID).unwrap();
    assert!((listing.uptime_percent - 50.0).abs() < f64::EPSILON);
    let untouched = market.get_listing("getSlot", SELLER_ID).unwrap();
    assert!((untouched.uptime_percent - 100.0).abs() < f64::EPSILON);
}
