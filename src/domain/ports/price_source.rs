//! Price source port.
//!
//! Every external price platform implements [`PriceSource`]. The registry maps a
//! platform id to a constructor, and the price search drives the trait methods
//! in a fixed order: `setup_session`, then `fetch_listing`.

use crate::domain::entities::price_sample::SourceListing;
use crate::domain::error::SourceError;
use async_trait::async_trait;
use serde::Serialize;

/// Plausible price window for one platform. Anything outside is a parser
/// artifact (shipping fee, deposit, phone number fragment) and is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceBounds {
    pub min: f64,
    pub max: f64,
}

impl PriceBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn accepts(&self, price: f64) -> bool {
        price.is_finite() && price > 0.0 && price >= self.min && price <= self.max
    }

    /// Keep the first `limit` accepted prices, in source order, then sort ascending.
    pub fn sanitize<I>(&self, raw: I, limit: usize) -> Vec<f64>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut prices: Vec<f64> = raw
            .into_iter()
            .filter(|p| self.accepts(*p))
            .take(limit)
            .collect();
        prices.sort_by(|a, b| a.total_cmp(b));
        prices
    }
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Stable platform id used by the registry and in results.
    fn id(&self) -> &str;

    fn bounds(&self) -> PriceBounds;

    /// Prepare whatever the platform needs before searching (handshake,
    /// token). Must not fail loudly: `false` means "skip me this time".
    async fn setup_session(&self, _reference: &str) -> bool {
        true
    }

    /// Search the platform and return sanitized prices plus side data.
    async fn fetch_listing(&self, reference: &str, limit: usize)
        -> Result<SourceListing, SourceError>;

    /// Ascending sanitized prices only.
    async fn fetch_prices(&self, reference: &str, limit: usize) -> Result<Vec<f64>, SourceError> {
        Ok(self.fetch_listing(reference, limit).await?.prices)
    }

    /// Cheap reachability probe.
    async fn is_available(&self) -> bool;
}
