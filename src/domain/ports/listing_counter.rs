use crate::domain::error::SourceError;
use async_trait::async_trait;

/// Marketplace listing counts, used to rank equivalent codes by how much
/// they actually trade.
#[async_trait]
pub trait ListingCounter: Send + Sync {
    /// `false` when credentials are missing; callers then skip ranking.
    fn is_configured(&self) -> bool;

    async fn listing_count(&self, code: &str) -> Result<u64, SourceError>;
}
