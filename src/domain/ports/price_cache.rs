use crate::domain::entities::price_sample::PlatformResult;

/// Market data gathered for one reference, reusable for a while.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub platforms: Vec<PlatformResult>,
}

/// Recently-seen price cache keyed by normalized reference (plus query shape).
pub trait RecentPriceCache: Send + Sync {
    fn get(&self, key: &str) -> Option<MarketSnapshot>;
    fn put(&self, key: &str, snapshot: MarketSnapshot);
}
