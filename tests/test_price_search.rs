mod common;

use common::*;
use partprice::application::price_search::PriceSearchRequest;
use partprice::domain::entities::inventory::StockStatus;
use partprice::domain::error::{DomainError, SourceError};
use partprice::domain::values::platform::{PlatformSelector, SourceSpeed};

#[tokio::test]
async fn test_aggregates_and_drops_outlier() {
    let c = components();
    register(&c.registry, FakeSource::with_prices("alpha", &[100.0, 102.0, 98.0]), SourceSpeed::Fast);
    register(&c.registry, FakeSource::with_prices("beta", &[101.0, 99.0, 5000.0]), SourceSpeed::Fast);
    let pp = setup(c);

    let response = pp.search(&PriceSearchRequest::new("7700500155")).await.unwrap();
    let prices: Vec<f64> = response.prices.iter().map(|s| s.price).collect();
    assert_eq!(prices, vec![98.0, 99.0, 100.0, 101.0, 102.0, 5000.0]);
    assert_eq!(response.summary.sample_count, 6);
    assert_eq!(response.summary.outliers_removed_count, 1);
    assert!((response.summary.mean - 100.0).abs() < 1e-9);
    assert_eq!(response.summary.original_range.max, 5000.0);

    let ids: Vec<&str> = response.platforms.iter().map(|p| p.platform.as_str()).collect();
    assert_eq!(ids, vec!["alpha", "beta"]);
    assert!(!response.cached);
}

#[tokio::test]
async fn test_failing_source_is_isolated() {
    let c = components();
    register(&c.registry, FakeSource::with_prices("alpha", &[120.0, 130.0]), SourceSpeed::Fast);
    register(
        &c.registry,
        FakeSource::failing("beta", SourceError::RateLimited("captcha".into())),
        SourceSpeed::Fast,
    );
    let pp = setup(c);

    let response = pp.search(&PriceSearchRequest::new("8200091351")).await.unwrap();
    assert_eq!(response.prices.len(), 2);
    let beta = response.platforms.iter().find(|p| p.platform == "beta").unwrap();
    assert!(beta.samples.is_empty());
    assert_eq!(beta.error.as_deref(), Some("rate limited: captcha"));
}

#[tokio::test]
async fn test_every_source_failing_is_aggregation_empty() {
    let c = components();
    register(
        &c.registry,
        FakeSource::failing("alpha", SourceError::ProviderUnavailable("timeout".into())),
        SourceSpeed::Fast,
    );
    register(&c.registry, FakeSource::without_session("beta", &[50.0]), SourceSpeed::Fast);
    let pp = setup(c);

    let err = pp.search(&PriceSearchRequest::new("8200091351")).await.unwrap_err();
    match err {
        DomainError::AggregationEmpty { reference, failures } => {
            assert_eq!(reference, "8200091351");
            assert_eq!(failures.len(), 2);
            assert!(failures.iter().any(|f| f.starts_with("beta: auth failure")));
        }
        other => panic!("expected AggregationEmpty, got {other:?}"),
    }
}

#[tokio::test]
async fn test_second_search_hits_cache() {
    let c = components();
    let source = FakeSource::with_prices("alpha", &[60.0, 70.0]);
    register(&c.registry, source.clone(), SourceSpeed::Fast);
    let pp = setup(c);

    let first = pp.search(&PriceSearchRequest::new("1K0 615 301 M")).await.unwrap();
    let second = pp.search(&PriceSearchRequest::new("1k0-615-301-m")).await.unwrap();
    assert!(!first.cached);
    assert!(second.cached);
    assert_eq!(source.call_count(), 1);
    assert_eq!(first.summary, second.summary);

    // A different sample limit is a different query.
    let request = PriceSearchRequest {
        sample_limit: 10,
        ..PriceSearchRequest::new("1K0615301M")
    };
    assert!(!pp.search(&request).await.unwrap().cached);
    assert_eq!(source.call_count(), 2);
}

#[tokio::test]
async fn test_empty_market_is_not_cached() {
    let c = components();
    let source = FakeSource::with_prices("alpha", &[]);
    register(&c.registry, source.clone(), SourceSpeed::Fast);
    let pp = setup(c);

    for _ in 0..2 {
        assert!(pp.search(&PriceSearchRequest::new("9999AA")).await.is_err());
    }
    assert_eq!(source.call_count(), 2);
}

#[tokio::test]
async fn test_rejects_malformed_input() {
    let c = components();
    register(&c.registry, FakeSource::with_prices("alpha", &[60.0]), SourceSpeed::Fast);
    let pp = setup(c);

    let blank = pp.search(&PriceSearchRequest::new("   ")).await;
    assert!(matches!(blank, Err(DomainError::Validation(_))));

    let zero = PriceSearchRequest {
        sample_limit: 0,
        ..PriceSearchRequest::new("7700500155")
    };
    assert!(matches!(pp.search(&zero).await, Err(DomainError::Validation(_))));

    let too_many = PriceSearchRequest {
        sample_limit: 1001,
        ..PriceSearchRequest::new("7700500155")
    };
    assert!(matches!(pp.search(&too_many).await, Err(DomainError::Validation(_))));

    let unknown = PriceSearchRequest {
        platform: PlatformSelector::Only("nowhere".into()),
        ..PriceSearchRequest::new("7700500155")
    };
    assert!(matches!(pp.search(&unknown).await, Err(DomainError::Validation(_))));
}

#[tokio::test]
async fn test_slow_sources_are_opt_in() {
    let c = components();
    let fast = FakeSource::with_prices("fast", &[40.0]);
    let slow = FakeSource::with_prices("slow", &[45.0]);
    register(&c.registry, fast.clone(), SourceSpeed::Fast);
    register(&c.registry, slow.clone(), SourceSpeed::Slow);
    let pp = setup(c);

    let response = pp.search(&PriceSearchRequest::new("0986041850")).await.unwrap();
    assert_eq!(response.platforms.len(), 1);
    assert_eq!(slow.call_count(), 0);

    let with_slow = PriceSearchRequest {
        include_slow: true,
        ..PriceSearchRequest::new("0986041850")
    };
    assert_eq!(pp.search(&with_slow).await.unwrap().platforms.len(), 2);

    // Naming a slow platform works without the flag.
    let only_slow = PriceSearchRequest {
        platform: PlatformSelector::Only("slow".into()),
        ..PriceSearchRequest::new("0986041850")
    };
    let response = pp.search(&only_slow).await.unwrap();
    assert_eq!(response.platforms[0].platform, "slow");
    assert_eq!(fast.call_count(), 2);
}

#[tokio::test]
async fn test_suggestion_from_majority_category() {
    let c = components();
    register(
        &c.registry,
        FakeSource::with_category("alpha", &[131.0], "Faro delantero izquierdo"),
        SourceSpeed::Fast,
    );
    register(&c.registry, FakeSource::with_prices("beta", &[]), SourceSpeed::Fast);
    let pp = setup(c);

    let response = pp.search(&PriceSearchRequest::new("260609505R")).await.unwrap();
    assert_eq!(response.category.as_deref(), Some("FARO DELANTERO IZQUIERDO"));
    let suggestion = response.suggestion.unwrap();
    assert_eq!(suggestion.family, "FAROS");
    assert_eq!(suggestion.suggested_price, 120.0);
}

#[tokio::test]
async fn test_no_category_means_no_suggestion() {
    let c = components();
    register(&c.registry, FakeSource::with_prices("alpha", &[131.0]), SourceSpeed::Fast);
    let pp = setup(c);

    let response = pp.search(&PriceSearchRequest::new("260609505R")).await.unwrap();
    assert_eq!(response.category, None);
    assert_eq!(response.suggestion, None);
}

#[tokio::test]
async fn test_inventory_summary_for_tenant() {
    let c = components();
    register(&c.registry, FakeSource::with_prices("alpha", &[75.0]), SourceSpeed::Fast);
    let pp = setup(c);
    let tenant = pp.add_tenant("Desguaces Norte", false).await.unwrap();
    let other = pp.add_tenant("Recambios Sur", false).await.unwrap();
    pp.add_inventory_item(&stock_item(tenant, "P-1", Some("7700500155"), StockStatus::InStock))
        .await
        .unwrap();
    pp.add_inventory_item(&stock_item(tenant, "7700500155", None, StockStatus::Sold))
        .await
        .unwrap();
    pp.add_inventory_item(&stock_item(other, "7700500155", None, StockStatus::InStock))
        .await
        .unwrap();

    let request = PriceSearchRequest {
        tenant_id: Some(tenant),
        ..PriceSearchRequest::new("7700 500 155")
    };
    let inventory = pp.search(&request).await.unwrap().inventory.unwrap();
    assert_eq!(inventory.in_stock, 1);
    assert_eq!(inventory.sold, 1);
    assert!(inventory.items.iter().all(|i| i.tenant_id == tenant));

    let anonymous = pp.search(&PriceSearchRequest::new("7700500155")).await.unwrap();
    assert!(anonymous.inventory.is_none());
}

#[tokio::test]
async fn test_equivalents_attached_on_request() {
    let mut c = components();
    register(&c.registry, FakeSource::with_prices("alpha", &[75.0]), SourceSpeed::Fast);
    c.providers = vec![
        FakeProvider::codes("alpha", &["0986041850"]),
        FakeProvider::failing("beta"),
    ];
    let pp = setup(c);

    let plain = pp.search(&PriceSearchRequest::new("7700500155")).await.unwrap();
    assert!(plain.equivalents.is_none());

    let request = PriceSearchRequest {
        with_equivalents: true,
        ..PriceSearchRequest::new("7700500155")
    };
    let response = pp.search(&request).await.unwrap();
    let codes: Vec<String> = response
        .equivalents
        .unwrap()
        .into_iter()
        .map(|e| e.equivalent_code)
        .collect();
    assert_eq!(codes, vec!["0986041850"]);
    assert!(response.warnings.iter().any(|w| w.starts_with("equivalents/beta")));
}
