pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

use crate::application::expand::{Expansion, ExpanderSettings, ReferenceExpander};
use crate::application::fanout::{FanOut, FanOutConfig};
use crate::application::full_search::{FullSearchSettings, FullSearchUseCase, SearchResult};
use crate::application::platforms::{PlatformStatus, PlatformsUseCase};
use crate::application::price_search::{
    PriceSearchRequest, PriceSearchResponse, PriceSearchSettings, PriceSearchUseCase,
};
use crate::application::registry::{PlatformInfo, SourceRegistry};
use crate::application::stats::{PriceStats, StatsUseCase};
use crate::application::suggest::SuggestPriceUseCase;
use crate::domain::entities::inventory::NewInventoryItem;
use crate::domain::error::DomainError;
use crate::domain::ports::competitor_catalog::CompetitorCatalog;
use crate::domain::ports::equivalence_provider::EquivalenceProvider;
use crate::domain::ports::inventory_repository::InventoryRepository;
use crate::domain::ports::listing_counter::ListingCounter;
use crate::domain::ports::tenant_directory::TenantDirectory;
use crate::domain::values::price_ladder::{PriceSuggestion, PricingConfig};
use crate::domain::values::reference::PartReference;
use crate::infrastructure::cache::price_cache::TtlPriceCache;
use crate::infrastructure::cache::session_cache::SessionCache;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::equivalence;
use crate::infrastructure::http;
use crate::infrastructure::sources::ebay::EbayCredentials;
use crate::infrastructure::sources::SourceSet;
use crate::infrastructure::sqlite;
use crate::infrastructure::sqlite::inventory_repo::SqliteInventoryRepo;
use crate::infrastructure::sqlite::pricing_repo::SqlitePricingStore;
use crate::infrastructure::sqlite::tenant_repo::SqliteTenantRepo;
use std::sync::Arc;
use std::time::Duration;

/// External collaborators of the facade. `PartPrice::new` builds the real
/// adapters; tests hand in fakes.
pub struct Components {
    pub registry: SourceRegistry,
    pub providers: Vec<Arc<dyn EquivalenceProvider>>,
    pub competitors: Vec<Arc<dyn CompetitorCatalog>>,
    pub listing_counter: Option<Arc<dyn ListingCounter>>,
}

pub struct PartPrice {
    registry: Arc<SourceRegistry>,
    inventory: Arc<dyn InventoryRepository>,
    tenants: Arc<dyn TenantDirectory>,
    expander: Arc<ReferenceExpander>,
    price_search_uc: PriceSearchUseCase,
    full_search_uc: FullSearchUseCase,
    suggest_uc: Arc<SuggestPriceUseCase>,
    stats_uc: StatsUseCase,
    platforms_uc: PlatformsUseCase,
}

impl PartPrice {
    pub fn new(config: AppConfig) -> Result<Self, DomainError> {
        config.validate()?;
        let client = http::build_client(Duration::from_secs(config.fanout.http_timeout_secs))?;
        let session_ttl = Duration::from_secs(config.session.ttl_secs);
        let sessions = Arc::new(match &config.session.cache_file {
            Some(path) => SessionCache::with_file(session_ttl, path),
            None => SessionCache::new(session_ttl),
        });
        let credentials = config.ebay.credentials().map(|(id, secret)| EbayCredentials {
            client_id: id.to_string(),
            client_secret: secret.to_string(),
        });

        let sources = SourceSet::new(client.clone(), sessions, credentials, config.ebay.marketplace.clone());
        let components = Components {
            registry: sources.registry(),
            providers: equivalence::default_providers(
                client,
                config.equivalents.local_catalog.as_deref(),
                provider_budget(config.fanout.unit_timeout_secs),
            )?,
            competitors: sources.competitor_panel(),
            listing_counter: Some(sources.listing_counter()),
        };
        Self::with_components(&config, components)
    }

    pub fn with_components(config: &AppConfig, components: Components) -> Result<Self, DomainError> {
        config.validate()?;
        let conn = sqlite::open(&config.database.path)?;
        let inventory: Arc<dyn InventoryRepository> = Arc::new(SqliteInventoryRepo::new(conn.clone()));
        let tenants: Arc<dyn TenantDirectory> = Arc::new(SqliteTenantRepo::new(conn.clone()));
        let pricing = Arc::new(SqlitePricingStore::new(conn)?);

        let fanout = FanOut::new(FanOutConfig {
            max_concurrency: config.fanout.max_concurrency,
            unit_timeout: Duration::from_secs(config.fanout.unit_timeout_secs),
        });
        let registry = Arc::new(components.registry);
        let cache = Arc::new(TtlPriceCache::new(
            Duration::from_secs(config.price_cache.ttl_secs),
            config.price_cache.max_entries,
        ));
        let expander = Arc::new(ReferenceExpander::new(
            components.providers,
            components.listing_counter,
            fanout,
            ExpanderSettings {
                min_code_len: config.equivalents.min_code_len,
                max_code_len: config.equivalents.max_code_len,
                rank_top_n: config.equivalents.rank_top_n,
                extra_denylist: config.equivalents.extra_denylist.clone(),
            },
        ));
        let suggest_uc = Arc::new(SuggestPriceUseCase::new(pricing, config.suggestion));

        let price_search_uc = PriceSearchUseCase::new(
            Arc::clone(&registry),
            fanout,
            cache,
            Arc::clone(&suggest_uc),
            Arc::clone(&inventory),
            Arc::clone(&expander),
            PriceSearchSettings {
                outlier_policy: config.outliers,
                ..Default::default()
            },
        );
        let full_search_uc = FullSearchUseCase::new(
            Arc::clone(&expander),
            Arc::clone(&inventory),
            Arc::clone(&tenants),
            components.competitors,
            fanout,
            FullSearchSettings {
                own_stock_limit: config.search.own_stock_limit,
                sibling_limit_per_tenant: config.search.sibling_limit_per_tenant,
                competitor_min_len: config.search.competitor_min_len,
                competitor_max_references: config.search.competitor_max_references,
                competitor_max_matches: config.search.competitor_max_matches,
                excluded_tenant_ids: config.tenants.excluded_ids.iter().copied().collect(),
            },
        );

        Ok(Self {
            platforms_uc: PlatformsUseCase::new(Arc::clone(&registry), fanout),
            stats_uc: StatsUseCase::new(config.outliers),
            registry,
            inventory,
            tenants,
            expander,
            price_search_uc,
            full_search_uc,
            suggest_uc,
        })
    }

    /// Live registry; sources registered here are picked up by the next search.
    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.registry
    }

    pub async fn search(&self, request: &PriceSearchRequest) -> Result<PriceSearchResponse, DomainError> {
        self.price_search_uc.execute(request).await
    }

    pub async fn full_search(&self, reference: &str, tenant_id: i64) -> Result<SearchResult, DomainError> {
        self.full_search_uc.execute(reference, tenant_id).await
    }

    pub async fn equivalents(&self, reference: &str) -> Result<Expansion, DomainError> {
        let reference = PartReference::parse(reference)?;
        Ok(self.expander.expand(reference.as_str()).await)
    }

    pub fn suggest(
        &self,
        tenant_id: Option<i64>,
        label: &str,
        market_price: f64,
    ) -> Result<Option<PriceSuggestion>, DomainError> {
        if !market_price.is_finite() || market_price <= 0.0 {
            return Err(DomainError::Validation(format!("market price must be positive, got {market_price}")));
        }
        self.suggest_uc.suggest(tenant_id, label, market_price)
    }

    pub fn stats(&self, prices: &[f64]) -> Result<PriceStats, DomainError> {
        self.stats_uc.summarize(prices)
    }

    pub fn platforms(&self) -> Vec<PlatformInfo> {
        self.registry.platforms()
    }

    pub async fn probe_platforms(&self) -> Vec<PlatformStatus> {
        self.platforms_uc.probe().await
    }

    pub fn upload_pricing(&self, tenant_id: Option<i64>, config: &PricingConfig) -> Result<(), DomainError> {
        self.suggest_uc.upload(tenant_id, config)
    }

    pub fn pricing(&self, tenant_id: Option<i64>) -> Result<Arc<PricingConfig>, DomainError> {
        self.suggest_uc.current(tenant_id)
    }

    pub async fn add_inventory_item(&self, item: &NewInventoryItem) -> Result<i64, DomainError> {
        self.inventory.add_item(item).await
    }

    pub async fn add_tenant(&self, name: &str, sibling_excluded: bool) -> Result<i64, DomainError> {
        self.tenants.add_tenant(name, sibling_excluded).await
    }
}

/// Time a provider may spend on one call: 90% of the fan-out unit timeout, so
/// it returns partial results before the unit is cut off.
fn provider_budget(unit_timeout_secs: u64) -> Duration {
    Duration::from_millis(unit_timeout_secs.saturating_mul(900))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_budget_fits_unit_timeout() {
        let config = AppConfig::default();
        let unit = Duration::from_secs(config.fanout.unit_timeout_secs);
        let budget = provider_budget(config.fanout.unit_timeout_secs);
        assert!(budget < unit);
        assert_eq!(provider_budget(20), Duration::from_secs(18));
    }
}
