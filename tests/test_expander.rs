mod common;

use common::*;
use partprice::domain::ports::listing_counter::ListingCounter;
use std::sync::Arc;

#[tokio::test]
async fn test_same_code_from_two_providers_appears_once() {
    let mut c = components();
    c.providers = vec![
        FakeProvider::codes("alpha", &["AB1234"]),
        FakeProvider::codes("beta", &["ab-1234", "ZX98765"]),
    ];
    let pp = setup(c);

    let expansion = pp.equivalents("7700500155").await.unwrap();
    let codes: Vec<&str> = expansion.equivalents.iter().map(|e| e.equivalent_code.as_str()).collect();
    assert_eq!(codes, vec!["AB1234", "ZX98765"]);
    assert_eq!(expansion.equivalents[0].source_provider, "alpha");
    assert!(expansion.provider_errors.is_empty());
    assert!(!expansion.ranked);
}

#[tokio::test]
async fn test_original_and_noise_never_returned() {
    let mut c = components();
    c.providers = vec![FakeProvider::codes(
        "alpha",
        &["77-00-500-155", "HTML5", "BOSCH", "00000000", "0986041850"],
    )];
    let pp = setup(c);

    let expansion = pp.equivalents("7700 500 155").await.unwrap();
    let codes: Vec<&str> = expansion.equivalents.iter().map(|e| e.equivalent_code.as_str()).collect();
    assert_eq!(codes, vec!["0986041850"]);
}

#[tokio::test]
async fn test_failed_provider_is_reported() {
    let mut c = components();
    c.providers = vec![FakeProvider::codes("alpha", &["0986041850"]), FakeProvider::failing("beta")];
    let pp = setup(c);

    let expansion = pp.equivalents("7700500155").await.unwrap();
    assert_eq!(expansion.equivalents.len(), 1);
    assert_eq!(expansion.provider_errors["beta"], "provider unavailable: beta is down");
}

#[tokio::test]
async fn test_ranking_keeps_most_listed() {
    let mut config = test_config();
    config.equivalents.rank_top_n = Some(2);
    let mut c = components();
    c.providers = vec![FakeProvider::codes("alpha", &["AB1234", "CD5678", "EF9012"])];
    c.listing_counter = Some(FakeCounter::new(&[("AB1234", 3), ("CD5678", 0), ("EF9012", 40)]) as Arc<dyn ListingCounter>);
    let pp = setup_with(config, c);

    let expansion = pp.equivalents("7700500155").await.unwrap();
    let codes: Vec<&str> = expansion.equivalents.iter().map(|e| e.equivalent_code.as_str()).collect();
    assert_eq!(codes, vec!["EF9012", "AB1234"]);
    assert!(expansion.ranked);
}

#[tokio::test]
async fn test_unconfigured_counter_keeps_discovery_order() {
    let mut config = test_config();
    config.equivalents.rank_top_n = Some(2);
    let mut c = components();
    c.providers = vec![FakeProvider::codes("alpha", &["AB1234", "CD5678", "EF9012"])];
    c.listing_counter = Some(Arc::new(FakeCounter {
        counts: Default::default(),
        configured: false,
    }) as Arc<dyn ListingCounter>);
    let pp = setup_with(config, c);

    let expansion = pp.equivalents("7700500155").await.unwrap();
    let codes: Vec<&str> = expansion.equivalents.iter().map(|e| e.equivalent_code.as_str()).collect();
    assert_eq!(codes, vec!["AB1234", "CD5678"]);
    assert!(!expansion.ranked);
}

#[tokio::test]
async fn test_rejects_blank_reference() {
    let pp = setup(components());
    assert!(pp.equivalents(" - ").await.is_err());
}
