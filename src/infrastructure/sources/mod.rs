//! Price source adapters and their registration.

pub mod bparts;
pub mod ebay;
pub mod ecooparts;
pub mod extract;
pub mod opisto;
pub mod ovoko;

use crate::application::registry::SourceRegistry;
use crate::domain::ports::competitor_catalog::CompetitorCatalog;
use crate::domain::ports::listing_counter::ListingCounter;
use crate::domain::ports::price_source::PriceSource;
use crate::domain::values::platform::SourceSpeed;
use crate::infrastructure::cache::session_cache::SessionCache;
use std::sync::Arc;

/// Adapters built once per process and shared by every request.
pub struct SourceSet {
    pub ecooparts: Arc<ecooparts::EcoopartsSource>,
    pub ovoko: Arc<ovoko::OvokoSource>,
    pub opisto: Arc<opisto::OpistoSource>,
    pub bparts: Arc<bparts::BpartsSource>,
    pub ebay: Arc<ebay::EbaySource>,
}

impl SourceSet {
    pub fn new(
        client: reqwest::Client,
        sessions: Arc<SessionCache>,
        ebay_credentials: Option<ebay::EbayCredentials>,
        ebay_marketplace: Option<String>,
    ) -> Self {
        Self {
            ecooparts: Arc::new(ecooparts::EcoopartsSource::new(client.clone())),
            ovoko: Arc::new(ovoko::OvokoSource::new(client.clone())),
            opisto: Arc::new(opisto::OpistoSource::new(client.clone(), Arc::clone(&sessions))),
            bparts: Arc::new(bparts::BpartsSource::new(client.clone())),
            ebay: Arc::new(ebay::EbaySource::new(client, sessions, ebay_credentials, ebay_marketplace)),
        }
    }

    /// Registry with every adapter: four fast sources and eBay as slow.
    pub fn registry(&self) -> SourceRegistry {
        let registry = SourceRegistry::new();
        register(&registry, ecooparts::ID, SourceSpeed::Fast, Arc::clone(&self.ecooparts));
        register(&registry, ovoko::ID, SourceSpeed::Fast, Arc::clone(&self.ovoko));
        register(&registry, opisto::ID, SourceSpeed::Fast, Arc::clone(&self.opisto));
        register(&registry, bparts::ID, SourceSpeed::Fast, Arc::clone(&self.bparts));
        register(&registry, ebay::ID, SourceSpeed::Slow, Arc::clone(&self.ebay));
        registry
    }

    /// Competitor catalogs searched by the full search.
    pub fn competitor_panel(&self) -> Vec<Arc<dyn CompetitorCatalog>> {
        vec![
            Arc::clone(&self.ecooparts) as Arc<dyn CompetitorCatalog>,
            Arc::clone(&self.ovoko) as Arc<dyn CompetitorCatalog>,
            Arc::clone(&self.bparts) as Arc<dyn CompetitorCatalog>,
        ]
    }

    pub fn listing_counter(&self) -> Arc<dyn ListingCounter> {
        Arc::clone(&self.ebay) as Arc<dyn ListingCounter>
    }
}

fn register<S>(registry: &SourceRegistry, id: &str, speed: SourceSpeed, source: Arc<S>)
where
    S: PriceSource + 'static,
{
    registry.register(id, speed, move || Arc::clone(&source) as Arc<dyn PriceSource>);
}
