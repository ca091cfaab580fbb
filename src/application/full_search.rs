//! Two-phase full search.
//!
//! Phase one expands the reference into its equivalent codes. Phase two runs
//! four independent branches over the resulting reference set: own stock,
//! sibling tenants' stock, cross-referenced new parts and competitor catalogs.
//! A failing branch only adds entries to `per_phase_errors`.

use crate::application::expand::ReferenceExpander;
use crate::application::fanout::{contain, FanOut};
use crate::domain::entities::catalog_item::{CatalogItem, CompetitorMatch};
use crate::domain::entities::equivalent::EquivalentReference;
use crate::domain::entities::inventory::{InventoryItem, SiblingMatch};
use crate::domain::error::{DomainError, SourceError};
use crate::domain::ports::competitor_catalog::CompetitorCatalog;
use crate::domain::ports::inventory_repository::InventoryRepository;
use crate::domain::ports::tenant_directory::TenantDirectory;
use crate::domain::values::reference::{normalize_code, PartReference};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchPhase {
    Init,
    Expanding,
    FanningOut,
    Aggregated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchBranch {
    Expansion,
    OwnStock,
    SiblingStock,
    CrossReference,
    Competitors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOutcome {
    Matches,
    /// Every branch came back empty. `per_phase_errors` tells whether that is
    /// an empty market or a broken one.
    NotFound,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub equivalents: usize,
    pub own_stock: usize,
    pub sibling_stock: usize,
    pub sibling_tenants: usize,
    pub cross_ref_items: usize,
    pub competitor_matches: usize,
    pub failed_branches: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub search_id: String,
    pub original_reference: String,
    pub reference_set: Vec<String>,
    pub equivalents: Vec<EquivalentReference>,
    pub own_stock_matches: Vec<InventoryItem>,
    pub sibling_tenant_matches: Vec<SiblingMatch>,
    pub cross_ref_items: Vec<EquivalentReference>,
    pub competitor_matches: Vec<CompetitorMatch>,
    pub per_phase_errors: BTreeMap<SearchBranch, Vec<String>>,
    pub summary_counts: SummaryCounts,
    pub phases: Vec<SearchPhase>,
    pub outcome: SearchOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct FullSearchSettings {
    pub own_stock_limit: usize,
    pub sibling_limit_per_tenant: usize,
    pub competitor_min_len: usize,
    pub competitor_max_references: usize,
    pub competitor_max_matches: usize,
    /// Tenants never searched as siblings, on top of the directory's own list.
    pub excluded_tenant_ids: HashSet<i64>,
}

impl Default for FullSearchSettings {
    fn default() -> Self {
        Self {
            own_stock_limit: 50,
            sibling_limit_per_tenant: 100,
            competitor_min_len: 6,
            competitor_max_references: 30,
            competitor_max_matches: 150,
            excluded_tenant_ids: HashSet::new(),
        }
    }
}

/// Items plus the errors of the units that produced them.
type BranchOutput<T> = (Vec<T>, Vec<String>);

pub struct FullSearchUseCase {
    expander: Arc<ReferenceExpander>,
    inventory: Arc<dyn InventoryRepository>,
    tenants: Arc<dyn TenantDirectory>,
    competitors: Vec<Arc<dyn CompetitorCatalog>>,
    fanout: FanOut,
    settings: FullSearchSettings,
}

impl FullSearchUseCase {
    pub fn new(
        expander: Arc<ReferenceExpander>,
        inventory: Arc<dyn InventoryRepository>,
        tenants: Arc<dyn TenantDirectory>,
        competitors: Vec<Arc<dyn CompetitorCatalog>>,
        fanout: FanOut,
        settings: FullSearchSettings,
    ) -> Self {
        Self {
            expander,
            inventory,
            tenants,
            competitors,
            fanout,
            settings,
        }
    }

    pub async fn execute(&self, reference: &str, tenant_id: i64) -> Result<SearchResult, DomainError> {
        let reference = PartReference::parse(reference)?;
        let started_at = Utc::now();
        let search_id = uuid::Uuid::new_v4().to_string();
        let mut phases = vec![SearchPhase::Init];
        let mut per_phase_errors: BTreeMap<SearchBranch, Vec<String>> = BTreeMap::new();

        phases.push(SearchPhase::Expanding);
        tracing::info!(search_id = %search_id, reference = %reference, tenant_id, "full search expanding");
        let expansion = self.expander.expand(reference.as_str()).await;
        if !expansion.provider_errors.is_empty() {
            per_phase_errors.insert(
                SearchBranch::Expansion,
                expansion
                    .provider_errors
                    .iter()
                    .map(|(provider, err)| format!("{provider}: {err}"))
                    .collect(),
            );
        }
        if expansion.all_providers_failed(self.expander.provider_count()) {
            tracing::warn!(search_id = %search_id, reference = %reference, "every equivalence provider failed, searching the original reference only");
        }
        let equivalents = expansion.equivalents;
        let reference_set = build_reference_set(reference.as_str(), &equivalents);

        phases.push(SearchPhase::FanningOut);
        tracing::info!(search_id = %search_id, references = reference_set.len(), "full search fanning out");
        let (own, siblings, cross_ref, competitors) = tokio::join!(
            contain(async { Ok::<_, SourceError>(self.own_stock(tenant_id, &reference_set).await) }),
            contain(async { Ok::<_, SourceError>(self.sibling_stock(tenant_id, &reference_set).await) }),
            contain(async { Ok::<_, SourceError>(self.cross_reference(reference.as_str(), &reference_set).await) }),
            contain(async { Ok::<_, SourceError>(self.competitor_matches(&reference_set).await) }),
        );

        let own_stock_matches = settle(SearchBranch::OwnStock, own, &mut per_phase_errors);
        let sibling_tenant_matches = settle(SearchBranch::SiblingStock, siblings, &mut per_phase_errors);
        let cross_ref_items = settle(SearchBranch::CrossReference, cross_ref, &mut per_phase_errors);
        let competitor_matches = settle(SearchBranch::Competitors, competitors, &mut per_phase_errors);

        let sibling_tenants: HashSet<i64> = sibling_tenant_matches.iter().map(|m| m.tenant_id).collect();
        let summary_counts = SummaryCounts {
            equivalents: equivalents.len(),
            own_stock: own_stock_matches.len(),
            sibling_stock: sibling_tenant_matches.len(),
            sibling_tenants: sibling_tenants.len(),
            cross_ref_items: cross_ref_items.len(),
            competitor_matches: competitor_matches.len(),
            failed_branches: per_phase_errors.len(),
        };
        let outcome = if own_stock_matches.is_empty()
            && sibling_tenant_matches.is_empty()
            && cross_ref_items.is_empty()
            && competitor_matches.is_empty()
        {
            SearchOutcome::NotFound
        } else {
            SearchOutcome::Matches
        };

        phases.push(SearchPhase::Aggregated);
        tracing::info!(
            search_id = %search_id,
            reference = %reference,
            own = summary_counts.own_stock,
            siblings = summary_counts.sibling_stock,
            cross_ref = summary_counts.cross_ref_items,
            competitors = summary_counts.competitor_matches,
            errors = summary_counts.failed_branches,
            ?outcome,
            "full search aggregated"
        );

        Ok(SearchResult {
            search_id,
            original_reference: reference.to_string(),
            reference_set,
            equivalents,
            own_stock_matches,
            sibling_tenant_matches,
            cross_ref_items,
            competitor_matches,
            per_phase_errors,
            summary_counts,
            phases,
            outcome,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn own_stock(&self, tenant_id: i64, references: &[String]) -> BranchOutput<InventoryItem> {
        let limit = self.settings.own_stock_limit;
        let units = self
            .fanout
            .run(references.to_vec(), |reference| async move {
                self.inventory
                    .find_matches(tenant_id, std::slice::from_ref(&reference), limit)
                    .await
                    .map_err(|e| SourceError::ProviderUnavailable(e.to_string()))
            })
            .await;

        let mut errors = Vec::new();
        let mut batches = Vec::new();
        for unit in units {
            match unit.outcome {
                Ok(items) => batches.push((unit.key, items)),
                Err(e) => errors.push(format!("{}: {e}", unit.key)),
            }
        }
        batches.sort_by(|a, b| a.0.cmp(&b.0));

        let mut seen = HashSet::new();
        let items = batches
            .into_iter()
            .flat_map(|(_, items)| items)
            .filter(|item| seen.insert(item.id))
            .take(limit)
            .collect();
        (items, errors)
    }

    async fn sibling_stock(&self, tenant_id: i64, references: &[String]) -> BranchOutput<SiblingMatch> {
        // Exclusions are resolved before any sibling query runs. Without them
        // the branch does nothing.
        let mut excluded = match self.tenants.excluded_tenant_ids().await {
            Ok(ids) => ids,
            Err(e) => return (Vec::new(), vec![format!("tenant exclusion lookup failed: {e}")]),
        };
        excluded.extend(self.settings.excluded_tenant_ids.iter().copied());
        excluded.insert(tenant_id);

        let tenants = match self.tenants.active_tenants().await {
            Ok(tenants) => tenants,
            Err(e) => return (Vec::new(), vec![format!("tenant directory failed: {e}")]),
        };
        let siblings: Vec<_> = tenants.into_iter().filter(|t| !excluded.contains(&t.id)).collect();
        tracing::debug!(siblings = siblings.len(), excluded = excluded.len(), "sibling tenants resolved");

        let limit = self.settings.sibling_limit_per_tenant;
        let mut units = self
            .fanout
            .run(siblings, |tenant| async move {
                self.inventory
                    .find_matches(tenant.id, references, limit)
                    .await
                    .map_err(|e| SourceError::ProviderUnavailable(e.to_string()))
            })
            .await;
        units.sort_by_key(|u| u.key.id);

        let mut seen = HashSet::new();
        let mut matches = Vec::new();
        let mut errors = Vec::new();
        for unit in units {
            match unit.outcome {
                Ok(items) => {
                    for item in items.into_iter().take(limit) {
                        if excluded.contains(&item.tenant_id) || !seen.insert(item.id) {
                            continue;
                        }
                        matches.push(SiblingMatch {
                            tenant_id: unit.key.id,
                            tenant_name: unit.key.name.clone(),
                            item,
                        });
                    }
                }
                Err(e) => errors.push(format!("tenant {}: {e}", unit.key.id)),
            }
        }
        (matches, errors)
    }

    async fn cross_reference(&self, original: &str, references: &[String]) -> BranchOutput<EquivalentReference> {
        let (items, errors) = self.expander.cross_reference_items(original, references).await;
        let errors = errors.into_iter().map(|(key, err)| format!("{key}: {err}")).collect();
        (items, errors)
    }

    async fn competitor_matches(&self, references: &[String]) -> BranchOutput<CompetitorMatch> {
        let queried = competitor_queries(
            references,
            self.settings.competitor_min_len,
            self.settings.competitor_max_references,
        );
        if queried.is_empty() || self.competitors.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let tasks: Vec<(Arc<dyn CompetitorCatalog>, String)> = self
            .competitors
            .iter()
            .flat_map(|c| queried.iter().map(move |r| (Arc::clone(c), r.clone())))
            .collect();
        let mut units = self
            .fanout
            .run(tasks, |(catalog, reference)| async move { catalog.search_items(&reference).await })
            .await;
        units.sort_by(|a, b| a.key.0.name().cmp(b.key.0.name()).then(a.key.1.cmp(&b.key.1)));

        let mut errors = Vec::new();
        let mut batches = Vec::new();
        for unit in units {
            let (catalog, reference) = unit.key;
            match unit.outcome {
                Ok(items) => batches.push((catalog.name().to_string(), items)),
                Err(e) => errors.push(format!("{}/{reference}: {e}", catalog.name())),
            }
        }
        (
            filter_competitor_items(batches, &queried, self.settings.competitor_max_matches),
            errors,
        )
    }
}

/// The original reference followed by every equivalent code, deduplicated by
/// normalized code.
pub fn build_reference_set(original: &str, equivalents: &[EquivalentReference]) -> Vec<String> {
    let mut seen = HashSet::new();
    std::iter::once(original.trim().to_string())
        .chain(equivalents.iter().map(|e| e.equivalent_code.clone()))
        .filter(|r| seen.insert(normalize_code(r)))
        .collect()
}

/// References long enough to query competitors with, distinct ignoring case,
/// at most `max` of them.
pub fn competitor_queries(references: &[String], min_len: usize, max: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    references
        .iter()
        .map(|r| r.trim())
        .filter(|r| r.chars().count() >= min_len)
        .filter(|r| seen.insert(r.to_uppercase()))
        .take(max)
        .map(String::from)
        .collect()
}

/// Keep only items whose own OEM field equals a queried value, ignoring case.
/// Competitor sites fuzzy-match, so anything else is noise.
pub fn filter_competitor_items(
    batches: Vec<(String, Vec<CatalogItem>)>,
    queried: &[String],
    cap: usize,
) -> Vec<CompetitorMatch> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for (competitor, items) in batches {
        for item in items {
            let Some(oem) = item.oem_code.as_deref().map(str::trim) else {
                continue;
            };
            let Some(queried_reference) = queried.iter().find(|q| q.eq_ignore_ascii_case(oem)) else {
                continue;
            };
            let identity = (
                competitor.clone(),
                oem.to_uppercase(),
                item.url.clone().unwrap_or_else(|| item.title.clone()),
            );
            if !seen.insert(identity) {
                continue;
            }
            out.push(CompetitorMatch {
                competitor: competitor.clone(),
                queried_reference: queried_reference.clone(),
                item,
            });
            if out.len() >= cap {
                return out;
            }
        }
    }
    out
}

fn settle<T>(
    branch: SearchBranch,
    outcome: Result<BranchOutput<T>, SourceError>,
    errors: &mut BTreeMap<SearchBranch, Vec<String>>,
) -> Vec<T> {
    match outcome {
        Ok((items, unit_errors)) => {
            if !unit_errors.is_empty() {
                tracing::warn!(?branch, failures = unit_errors.len(), "full search branch had failures");
                errors.entry(branch).or_default().extend(unit_errors);
            }
            items
        }
        Err(e) => {
            tracing::error!(?branch, error = %e, "full search branch crashed");
            errors.entry(branch).or_default().push(e.to_string());
            Vec::new()
        }
    }
}
