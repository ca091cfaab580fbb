//! Shared test helpers: in-memory facade plus scripted fakes for every
//! external collaborator.
#![allow(dead_code)]

use async_trait::async_trait;
use partprice::application::registry::SourceRegistry;
use partprice::domain::entities::catalog_item::CatalogItem;
use partprice::domain::entities::equivalent::{EquivalentCandidate, LookupMode};
use partprice::domain::entities::inventory::{NewInventoryItem, StockStatus};
use partprice::domain::entities::price_sample::SourceListing;
use partprice::domain::error::SourceError;
use partprice::domain::ports::competitor_catalog::CompetitorCatalog;
use partprice::domain::ports::equivalence_provider::EquivalenceProvider;
use partprice::domain::ports::listing_counter::ListingCounter;
use partprice::domain::ports::price_source::{PriceBounds, PriceSource};
use partprice::domain::values::platform::SourceSpeed;
use partprice::infrastructure::config::AppConfig;
use partprice::{Components, PartPrice};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.database.path = ":memory:".into();
    config.fanout.unit_timeout_secs = 5;
    config
}

pub fn setup(components: Components) -> PartPrice {
    setup_with(test_config(), components)
}

pub fn setup_with(config: AppConfig, components: Components) -> PartPrice {
    PartPrice::with_components(&config, components).unwrap()
}

pub fn components() -> Components {
    Components {
        registry: SourceRegistry::new(),
        providers: Vec::new(),
        competitors: Vec::new(),
        listing_counter: None,
    }
}

pub fn register(registry: &SourceRegistry, source: Arc<FakeSource>, speed: SourceSpeed) {
    let id = source.id.clone();
    registry.register(&id, speed, move || Arc::clone(&source) as Arc<dyn PriceSource>);
}

/// Price source answering from a script.
pub struct FakeSource {
    pub id: String,
    pub prices: Vec<f64>,
    pub category: Option<String>,
    pub failure: Option<SourceError>,
    pub session_ok: bool,
    pub available: bool,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn with_prices(id: &str, prices: &[f64]) -> Arc<Self> {
        Arc::new(Self::base(id, prices))
    }

    pub fn with_category(id: &str, prices: &[f64], category: &str) -> Arc<Self> {
        Arc::new(Self {
            category: Some(category.to_string()),
            ..Self::base(id, prices)
        })
    }

    pub fn failing(id: &str, failure: SourceError) -> Arc<Self> {
        Arc::new(Self {
            failure: Some(failure),
            available: false,
            ..Self::base(id, &[])
        })
    }

    pub fn without_session(id: &str, prices: &[f64]) -> Arc<Self> {
        Arc::new(Self {
            session_ok: false,
            ..Self::base(id, prices)
        })
    }

    fn base(id: &str, prices: &[f64]) -> Self {
        Self {
            id: id.to_string(),
            prices: prices.to_vec(),
            category: None,
            failure: None,
            session_ok: true,
            available: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for FakeSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn bounds(&self) -> PriceBounds {
        PriceBounds::new(1.0, 100_000.0)
    }

    async fn setup_session(&self, _reference: &str) -> bool {
        self.session_ok
    }

    async fn fetch_listing(&self, _reference: &str, limit: usize) -> Result<SourceListing, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }
        Ok(SourceListing {
            prices: self.bounds().sanitize(self.prices.iter().copied(), limit),
            images: Vec::new(),
            category: self.category.clone(),
        })
    }

    async fn is_available(&self) -> bool {
        self.available
    }
}

/// Equivalence provider returning the same codes for any reference.
pub struct FakeProvider {
    pub name: String,
    pub codes: Result<Vec<String>, SourceError>,
}

impl FakeProvider {
    pub fn codes(name: &str, codes: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            codes: Ok(codes.iter().map(|c| c.to_string()).collect()),
        })
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            codes: Err(SourceError::ProviderUnavailable(format!("{name} is down"))),
        })
    }
}

#[async_trait]
impl EquivalenceProvider for FakeProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn candidates(
        &self,
        _reference: &str,
        mode: LookupMode,
    ) -> Result<Vec<EquivalentCandidate>, SourceError> {
        let codes = self.codes.clone()?;
        Ok(codes
            .into_iter()
            .map(|code| match mode {
                LookupMode::CodesOnly => EquivalentCandidate::code(code),
                LookupMode::FullItem => EquivalentCandidate {
                    brand: Some("BOSCH".into()),
                    price_text: Some("99,00 €".into()),
                    ..EquivalentCandidate::code(code)
                },
            })
            .collect())
    }
}

/// Competitor catalog with fuzzy matching: every query returns the whole list.
pub struct FakeCompetitor {
    pub name: String,
    pub items: Vec<CatalogItem>,
    pub queries: AtomicUsize,
}

impl FakeCompetitor {
    pub fn new(name: &str, oem_codes: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            items: oem_codes
                .iter()
                .enumerate()
                .map(|(i, oem)| CatalogItem {
                    source: name.to_string(),
                    title: format!("Alternador {i}"),
                    oem_code: Some(oem.to_string()),
                    price: Some(90.0 + i as f64),
                    url: Some(format!("https://{name}.example/item/{i}")),
                    ..Default::default()
                })
                .collect(),
            queries: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CompetitorCatalog for FakeCompetitor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search_items(&self, _reference: &str) -> Result<Vec<CatalogItem>, SourceError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.clone())
    }
}

pub struct FakeCounter {
    pub counts: HashMap<String, u64>,
    pub configured: bool,
}

impl FakeCounter {
    pub fn new(counts: &[(&str, u64)]) -> Arc<Self> {
        Arc::new(Self {
            counts: counts.iter().map(|(c, n)| (c.to_string(), *n)).collect(),
            configured: true,
        })
    }
}

#[async_trait]
impl ListingCounter for FakeCounter {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn listing_count(&self, code: &str) -> Result<u64, SourceError> {
        Ok(self.counts.get(code).copied().unwrap_or(0))
    }
}

pub fn stock_item(tenant_id: i64, reference: &str, oem: Option<&str>, status: StockStatus) -> NewInventoryItem {
    NewInventoryItem {
        tenant_id,
        reference: reference.to_string(),
        oem_code: oem.map(String::from),
        alt_oem_code: None,
        iam_code: None,
        title: "Alternador 14V".into(),
        price: Some(120.0),
        status,
        location: None,
    }
}
