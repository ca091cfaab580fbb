//! Reference equivalence expansion.
//!
//! Queries every cross-reference provider concurrently, normalizes and filters
//! the candidate codes they extract, and merges them into one deduplicated list
//! that never contains the original reference. An optional ranking pass keeps
//! the candidates that actually trade on a marketplace.

use crate::application::fanout::FanOut;
use crate::domain::entities::equivalent::{EquivalentCandidate, EquivalentReference, LookupMode};
use crate::domain::error::SourceError;
use crate::domain::ports::equivalence_provider::EquivalenceProvider;
use crate::domain::ports::listing_counter::ListingCounter;
use crate::domain::values::reference::normalize_code;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Tokens that look like part codes but come from page chrome (analytics ids,
/// media formats, standards). Compared after normalization.
const DEFAULT_DENYLIST: &[&str] = &[
    "ISO9001", "ISO14001", "HTML5", "ES2015", "ES2017", "UTF8", "1920X1080", "1280X720",
    "H264", "MPEG4", "GTM5", "UA000000", "WIDTH100", "HEIGHT100", "00000", "000000",
    "0000000", "12345", "123456", "1234567", "12345678", "123456789", "1234567890",
    "RECAPTCHA3", "JQUERY3", "BOOTSTRAP5",
];

#[derive(Debug, Clone)]
pub struct ExpanderSettings {
    pub min_code_len: usize,
    pub max_code_len: usize,
    /// Keep only the top-N candidates by marketplace listing count.
    pub rank_top_n: Option<usize>,
    pub extra_denylist: Vec<String>,
}

impl Default for ExpanderSettings {
    fn default() -> Self {
        Self {
            min_code_len: 5,
            max_code_len: 20,
            rank_top_n: None,
            extra_denylist: Vec::new(),
        }
    }
}

/// Output of one expansion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Expansion {
    pub original_reference: String,
    pub equivalents: Vec<EquivalentReference>,
    /// provider name → error, for providers that failed.
    pub provider_errors: BTreeMap<String, String>,
    pub ranked: bool,
}

impl Expansion {
    pub fn all_providers_failed(&self, provider_count: usize) -> bool {
        provider_count > 0 && self.provider_errors.len() == provider_count
    }
}

pub struct ReferenceExpander {
    providers: Vec<Arc<dyn EquivalenceProvider>>,
    ranker: Option<Arc<dyn ListingCounter>>,
    fanout: FanOut,
    settings: ExpanderSettings,
    denylist: HashSet<String>,
}

impl ReferenceExpander {
    pub fn new(
        providers: Vec<Arc<dyn EquivalenceProvider>>,
        ranker: Option<Arc<dyn ListingCounter>>,
        fanout: FanOut,
        settings: ExpanderSettings,
    ) -> Self {
        let denylist = DEFAULT_DENYLIST
            .iter()
            .map(|t| t.to_string())
            .chain(settings.extra_denylist.iter().map(|t| normalize_code(t)))
            .collect();
        Self {
            providers,
            ranker,
            fanout,
            settings,
            denylist,
        }
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Whether a normalized candidate can be a real part code.
    pub fn is_plausible_code(&self, normalized: &str) -> bool {
        let len = normalized.chars().count();
        len >= self.settings.min_code_len
            && len <= self.settings.max_code_len
            && normalized.chars().any(|c| c.is_ascii_digit())
            && !normalized.chars().all(|c| c == '0')
            && !self.denylist.contains(normalized)
    }

    /// Equivalent codes for `reference` (codes-only mode), ranked when a
    /// top-N is configured.
    pub async fn expand(&self, reference: &str) -> Expansion {
        let mut expansion = self.collect(reference, LookupMode::CodesOnly).await;
        if let Some(top_n) = self.settings.rank_top_n {
            let (ranked, did_rank) = self.rank(std::mem::take(&mut expansion.equivalents), top_n).await;
            expansion.equivalents = ranked;
            expansion.ranked = did_rank;
        }
        tracing::info!(
            reference,
            equivalents = expansion.equivalents.len(),
            failed_providers = expansion.provider_errors.len(),
            ranked = expansion.ranked,
            "reference expansion finished"
        );
        expansion
    }

    /// Full-item lookups for every reference of a set, merged and deduplicated
    /// by equivalent code. Codes that normalize to `original` are dropped even
    /// when a provider returns them for one of its equivalents. Errors are
    /// keyed `reference/provider`.
    pub async fn cross_reference_items(
        &self,
        original: &str,
        references: &[String],
    ) -> (Vec<EquivalentReference>, BTreeMap<String, String>) {
        let mut units = self
            .fanout
            .run(references.to_vec(), |reference| async move {
                Ok::<_, SourceError>(self.collect(&reference, LookupMode::FullItem).await)
            })
            .await;
        units.sort_by(|a, b| a.key.cmp(&b.key));

        let mut seen = HashSet::from([normalize_code(original)]);
        let mut items = Vec::new();
        let mut errors = BTreeMap::new();
        for unit in units {
            match unit.outcome {
                Ok(expansion) => {
                    for (provider, err) in expansion.provider_errors {
                        errors.insert(format!("{}/{provider}", unit.key), err);
                    }
                    for item in expansion.equivalents {
                        if seen.insert(item.equivalent_code.clone()) {
                            items.push(item);
                        }
                    }
                }
                Err(e) => {
                    errors.insert(unit.key, e.to_string());
                }
            }
        }
        (items, errors)
    }

    async fn collect(&self, reference: &str, mode: LookupMode) -> Expansion {
        let mut units = self
            .fanout
            .run(self.providers.clone(), |provider| async move {
                provider.candidates(reference, mode).await
            })
            .await;
        units.sort_by(|a, b| a.key.name().cmp(b.key.name()));

        let mut batches = Vec::with_capacity(units.len());
        let mut provider_errors = BTreeMap::new();
        for unit in units {
            let name = unit.key.name().to_string();
            let elapsed_ms = unit.elapsed_ms();
            match unit.outcome {
                Ok(candidates) => {
                    tracing::debug!(provider = %name, reference, candidates = candidates.len(), elapsed_ms, "provider answered");
                    batches.push((name, candidates));
                }
                Err(e) => {
                    tracing::warn!(provider = %name, reference, error = %e, "equivalence provider failed");
                    provider_errors.insert(name, e.to_string());
                }
            }
        }

        Expansion {
            original_reference: reference.to_string(),
            equivalents: self.merge(reference, batches),
            provider_errors,
            ranked: false,
        }
    }

    /// Normalize, filter and deduplicate provider batches, in batch order.
    pub fn merge(
        &self,
        reference: &str,
        batches: Vec<(String, Vec<EquivalentCandidate>)>,
    ) -> Vec<EquivalentReference> {
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(normalize_code(reference));

        let mut out = Vec::new();
        for (provider, candidates) in batches {
            for candidate in candidates {
                let code = normalize_code(&candidate.code);
                if !self.is_plausible_code(&code) || !seen.insert(code.clone()) {
                    continue;
                }
                out.push(EquivalentReference {
                    original_reference: reference.to_string(),
                    equivalent_code: code,
                    source_provider: provider.clone(),
                    brand: candidate.brand,
                    description: candidate.description,
                    price_text: candidate.price_text,
                    image_url: candidate.image_url,
                });
            }
        }
        out
    }

    /// Keep the `top_n` candidates with the most marketplace listings. Falls
    /// back to the first `top_n` in discovery order when no ranker is
    /// configured or every count is zero. Returns whether ranking applied.
    async fn rank(
        &self,
        candidates: Vec<EquivalentReference>,
        top_n: usize,
    ) -> (Vec<EquivalentReference>, bool) {
        let unranked = |mut c: Vec<EquivalentReference>| {
            c.truncate(top_n);
            (c, false)
        };
        let ranker = match &self.ranker {
            Some(r) if r.is_configured() => Arc::clone(r),
            _ => return unranked(candidates),
        };
        if candidates.is_empty() {
            return (candidates, false);
        }

        let indices: Vec<usize> = (0..candidates.len()).collect();
        let units = self
            .fanout
            .run(indices, |i| {
                let ranker = Arc::clone(&ranker);
                let code = candidates[i].equivalent_code.clone();
                async move { ranker.listing_count(&code).await }
            })
            .await;

        let mut counts = vec![0u64; candidates.len()];
        for unit in units {
            match unit.outcome {
                Ok(n) => counts[unit.key] = n,
                Err(e) => tracing::debug!(code = %candidates[unit.key].equivalent_code, error = %e, "listing count failed"),
            }
        }
        if counts.iter().all(|&n| n == 0) {
            return unranked(candidates);
        }

        let mut order: Vec<usize> = (0..candidates.len()).filter(|&i| counts[i] > 0).collect();
        order.sort_by(|&a, &b| counts[b].cmp(&counts[a]).then(a.cmp(&b)));
        order.truncate(top_n);

        let mut slots: Vec<Option<EquivalentReference>> = candidates.into_iter().map(Some).collect();
        let ranked = order.into_iter().filter_map(|i| slots[i].take()).collect();
        (ranked, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expander() -> ReferenceExpander {
        ReferenceExpander::new(Vec::new(), None, FanOut::default(), ExpanderSettings::default())
    }

    #[test]
    fn test_plausible_code_rules() {
        let e = expander();
        assert!(e.is_plausible_code("0986424815"));
        assert!(e.is_plausible_code("AB123"));
        assert!(!e.is_plausible_code("AB12"), "too short");
        assert!(!e.is_plausible_code(&"1".repeat(21)), "too long");
        assert!(!e.is_plausible_code("BOSCHONLY"), "no digit");
        assert!(!e.is_plausible_code("HTML5"), "denylisted");
        assert!(!e.is_plausible_code("000000"));
    }

    #[test]
    fn test_merge_dedupes_across_providers() {
        let e = expander();
        let merged = e.merge(
            "7700 500 155",
            vec![
                ("alpha".into(), vec![EquivalentCandidate::code("AB1234"), EquivalentCandidate::code("7700500155")]),
                ("beta".into(), vec![EquivalentCandidate::code("ab-1234"), EquivalentCandidate::code("CD 99881")]),
            ],
        );
        let codes: Vec<&str> = merged.iter().map(|m| m.equivalent_code.as_str()).collect();
        assert_eq!(codes, vec!["AB1234", "CD99881"]);
        assert_eq!(merged[0].source_provider, "alpha");
        assert!(merged.iter().all(|m| m.original_reference == "7700 500 155"));
    }

    #[test]
    fn test_extra_denylist_is_normalized() {
        let e = ReferenceExpander::new(
            Vec::new(),
            None,
            FanOut::default(),
            ExpanderSettings {
                extra_denylist: vec!["cookie-2024".into()],
                ..Default::default()
            },
        );
        assert!(!e.is_plausible_code("COOKIE2024"));
    }
}
