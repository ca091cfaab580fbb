//! Single-reference market price search.
//!
//! Resolves the requested platforms from the registry, fans out one unit per
//! source, reconciles the surviving prices into a [`PriceSummary`] and, when
//! the market yields a category, snaps a suggested sale price onto the family
//! ladder. Market data is cached per reference and query shape; the
//! suggestion and inventory summary are always computed fresh.

use crate::application::expand::ReferenceExpander;
use crate::application::fanout::FanOut;
use crate::application::registry::SourceRegistry;
use crate::application::suggest::SuggestPriceUseCase;
use crate::domain::entities::equivalent::EquivalentReference;
use crate::domain::entities::inventory::{InventoryItem, StockStatus};
use crate::domain::entities::price_sample::{most_common_category, PlatformResult, PriceSample};
use crate::domain::error::{DomainError, SourceError};
use crate::domain::ports::inventory_repository::InventoryRepository;
use crate::domain::ports::price_cache::{MarketSnapshot, RecentPriceCache};
use crate::domain::values::platform::PlatformSelector;
use crate::domain::values::price_ladder::PriceSuggestion;
use crate::domain::values::price_summary::{OutlierPolicy, PriceSummary};
use crate::domain::values::reference::PartReference;
use serde::Serialize;
use std::sync::Arc;

pub const MAX_SAMPLE_LIMIT: usize = 1000;

#[derive(Debug, Clone)]
pub struct PriceSearchRequest {
    pub reference: String,
    pub platform: PlatformSelector,
    pub sample_limit: usize,
    pub include_slow: bool,
    /// Caller tenant; enables the inventory summary and tenant ladders.
    pub tenant_id: Option<i64>,
    pub with_equivalents: bool,
}

impl PriceSearchRequest {
    pub fn new(reference: &str) -> Self {
        Self {
            reference: reference.to_string(),
            platform: PlatformSelector::All,
            sample_limit: 50,
            include_slow: false,
            tenant_id: None,
            with_equivalents: false,
        }
    }
}

/// Own-stock hits for the searched reference.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InventoryMatchSummary {
    pub in_stock: usize,
    pub sold: usize,
    pub items: Vec<InventoryItem>,
}

impl InventoryMatchSummary {
    fn from_items(items: Vec<InventoryItem>, preview: usize) -> Self {
        let in_stock = items.iter().filter(|i| i.status == StockStatus::InStock).count();
        Self {
            in_stock,
            sold: items.len() - in_stock,
            items: items.into_iter().take(preview).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PriceSearchResponse {
    pub reference: String,
    pub normalized_reference: String,
    /// Every accepted sample, ascending by price.
    pub prices: Vec<PriceSample>,
    pub summary: PriceSummary,
    /// Per-platform breakdown, sorted by platform id.
    pub platforms: Vec<PlatformResult>,
    pub category: Option<String>,
    pub suggestion: Option<PriceSuggestion>,
    pub inventory: Option<InventoryMatchSummary>,
    pub equivalents: Option<Vec<EquivalentReference>>,
    pub cached: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PriceSearchSettings {
    pub outlier_policy: OutlierPolicy,
    pub inventory_limit: usize,
    pub inventory_preview: usize,
}

impl Default for PriceSearchSettings {
    fn default() -> Self {
        Self {
            outlier_policy: OutlierPolicy::default(),
            inventory_limit: 50,
            inventory_preview: 10,
        }
    }
}

pub struct PriceSearchUseCase {
    registry: Arc<SourceRegistry>,
    fanout: FanOut,
    cache: Arc<dyn RecentPriceCache>,
    suggest: Arc<SuggestPriceUseCase>,
    inventory: Arc<dyn InventoryRepository>,
    expander: Arc<ReferenceExpander>,
    settings: PriceSearchSettings,
}

impl PriceSearchUseCase {
    pub fn new(
        registry: Arc<SourceRegistry>,
        fanout: FanOut,
        cache: Arc<dyn RecentPriceCache>,
        suggest: Arc<SuggestPriceUseCase>,
        inventory: Arc<dyn InventoryRepository>,
        expander: Arc<ReferenceExpander>,
        settings: PriceSearchSettings,
    ) -> Self {
        Self {
            registry,
            fanout,
            cache,
            suggest,
            inventory,
            expander,
            settings,
        }
    }

    pub async fn execute(&self, request: &PriceSearchRequest) -> Result<PriceSearchResponse, DomainError> {
        let reference = PartReference::parse(&request.reference)?;
        if request.sample_limit == 0 || request.sample_limit > MAX_SAMPLE_LIMIT {
            return Err(DomainError::Validation(format!(
                "sample_limit must be between 1 and {MAX_SAMPLE_LIMIT}, got {}",
                request.sample_limit
            )));
        }
        let normalized = reference.normalized();
        let key = format!(
            "{normalized}|{}|{}|{}",
            request.platform, request.include_slow, request.sample_limit
        );

        let (snapshot, cached) = match self.cache.get(&key) {
            Some(snapshot) => {
                tracing::info!(reference = %reference, key = %key, "price cache hit");
                (snapshot, true)
            }
            None => {
                let snapshot = self.query_market(&reference, request).await?;
                (snapshot, false)
            }
        };

        let platforms = snapshot.platforms;
        let mut prices: Vec<PriceSample> = platforms.iter().flat_map(|p| p.samples.iter().cloned()).collect();
        if prices.is_empty() {
            let failures = platforms
                .iter()
                .filter_map(|p| p.error.as_ref().map(|e| format!("{}: {e}", p.platform)))
                .collect();
            return Err(DomainError::AggregationEmpty {
                reference: reference.to_string(),
                failures,
            });
        }
        if !cached {
            self.cache.put(
                &key,
                MarketSnapshot {
                    platforms: platforms.clone(),
                },
            );
        }
        prices.sort_by(|a, b| a.price.total_cmp(&b.price));

        let raw: Vec<f64> = prices.iter().map(|s| s.price).collect();
        let summary = PriceSummary::from_prices(&raw, &self.settings.outlier_policy)
            .ok_or_else(|| DomainError::Parse(format!("no finite price for {reference}")))?;

        let mut warnings = Vec::new();
        let category = majority_category(&platforms);
        let suggestion = match &category {
            Some(label) => match self.suggest.suggest(request.tenant_id, label, summary.mean) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(error = %e, "pricing config unavailable");
                    warnings.push(format!("suggestion: {e}"));
                    None
                }
            },
            None => None,
        };

        let inventory = match request.tenant_id {
            Some(tenant_id) => match self.inventory_summary(tenant_id, &reference).await {
                Ok(summary) => Some(summary),
                Err(e) => {
                    tracing::warn!(tenant_id, error = %e, "inventory lookup failed");
                    warnings.push(format!("inventory: {e}"));
                    None
                }
            },
            None => None,
        };

        let equivalents = if request.with_equivalents {
            let expansion = self.expander.expand(reference.as_str()).await;
            for (provider, err) in &expansion.provider_errors {
                warnings.push(format!("equivalents/{provider}: {err}"));
            }
            Some(expansion.equivalents)
        } else {
            None
        };

        tracing::info!(
            reference = %reference,
            samples = summary.sample_count,
            outliers = summary.outliers_removed_count,
            mean = summary.mean,
            cached,
            "price search finished"
        );

        Ok(PriceSearchResponse {
            reference: reference.to_string(),
            normalized_reference: normalized,
            prices,
            summary,
            platforms,
            category,
            suggestion,
            inventory,
            equivalents,
            cached,
            warnings,
        })
    }

    async fn query_market(
        &self,
        reference: &PartReference,
        request: &PriceSearchRequest,
    ) -> Result<MarketSnapshot, DomainError> {
        let sources = self.registry.resolve(&request.platform, request.include_slow)?;
        let limit = request.sample_limit;
        let query = reference.as_str();

        let units = self
            .fanout
            .run(sources, |source| async move {
                if !source.setup_session(query).await {
                    return Err(SourceError::AuthFailure("session setup failed".into()));
                }
                let mut listing = source.fetch_listing(query, limit).await?;
                listing.prices = source.bounds().sanitize(listing.prices, limit);
                Ok(listing)
            })
            .await;

        let mut platforms: Vec<PlatformResult> = units
            .into_iter()
            .map(|unit| {
                let id = unit.key.id().to_string();
                let elapsed_ms = unit.elapsed_ms();
                match unit.outcome {
                    Ok(listing) => {
                        tracing::debug!(platform = %id, reference = query, prices = listing.prices.len(), elapsed_ms, "source answered");
                        PlatformResult::from_listing(&id, listing, elapsed_ms)
                    }
                    Err(e) => {
                        tracing::warn!(platform = %id, reference = query, kind = e.kind(), error = %e, elapsed_ms, "source failed");
                        PlatformResult::failed(&id, e.to_string(), elapsed_ms)
                    }
                }
            })
            .collect();
        platforms.sort_by(|a, b| a.platform.cmp(&b.platform));
        Ok(MarketSnapshot { platforms })
    }

    async fn inventory_summary(
        &self,
        tenant_id: i64,
        reference: &PartReference,
    ) -> Result<InventoryMatchSummary, DomainError> {
        let mut references = vec![reference.as_str().to_string()];
        let normalized = reference.normalized();
        if !normalized.eq_ignore_ascii_case(reference.as_str()) {
            references.push(normalized);
        }
        let items = self
            .inventory
            .find_matches(tenant_id, &references, self.settings.inventory_limit)
            .await?;
        Ok(InventoryMatchSummary::from_items(items, self.settings.inventory_preview))
    }
}

/// Most frequent category label among platforms that reported one. Ties go
/// to the label seen first in platform order.
pub fn majority_category(platforms: &[PlatformResult]) -> Option<String> {
    most_common_category(platforms.iter().filter_map(|p| p.category.as_deref()))
}
