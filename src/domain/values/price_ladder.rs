//! Family price ladders and the suggested-price snap.
//!
//! A ladder is a strictly ascending list of condition-graded prices for one part
//! family (e.g. `FAROS: 50, 80, 120, 180`). A market price is compared tax-exclusive
//! against the ladder and snapped to a tier; it is never interpolated because the
//! tiers are grades, not points on a continuum.

use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};

const BUILTIN_PRICING: &str = include_str!("../../../data/pricing.toml");

/// Tunable constants of the suggestion heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuggestionPolicy {
    /// VAT included in observed market prices.
    pub tax_rate: f64,
    /// Position inside a bracket from which the upper tier is suggested.
    pub split_point: f64,
}

impl Default for SuggestionPolicy {
    fn default() -> Self {
        Self {
            tax_rate: 0.21,
            split_point: 0.65,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct LadderRecord {
    family: String,
    tiers: Vec<f64>,
}

/// Ascending price tiers for one family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LadderRecord")]
pub struct FamilyPriceLadder {
    family: String,
    tiers: Vec<f64>,
}

impl TryFrom<LadderRecord> for FamilyPriceLadder {
    type Error = DomainError;

    fn try_from(r: LadderRecord) -> Result<Self, Self::Error> {
        FamilyPriceLadder::new(&r.family, r.tiers)
    }
}

impl FamilyPriceLadder {
    pub fn new(family: &str, tiers: Vec<f64>) -> Result<Self, DomainError> {
        let family = normalize_label(family);
        if family.is_empty() {
            return Err(DomainError::Validation("ladder family name is empty".into()));
        }
        if tiers.is_empty() {
            return Err(DomainError::Validation(format!("ladder {family} has no tiers")));
        }
        if tiers.iter().any(|t| !t.is_finite() || *t <= 0.0) {
            return Err(DomainError::Validation(format!(
                "ladder {family} has a non-positive tier"
            )));
        }
        if tiers.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DomainError::Validation(format!(
                "ladder {family} tiers must be strictly ascending"
            )));
        }
        Ok(Self { family, tiers })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn tiers(&self) -> &[f64] {
        &self.tiers
    }

    /// Snap a tax-exclusive value onto the ladder.
    pub fn snap(&self, value: f64, split_point: f64) -> f64 {
        let first = self.tiers[0];
        let last = self.tiers[self.tiers.len() - 1];
        if value <= first {
            return first;
        }
        if value >= last {
            return last;
        }
        for w in self.tiers.windows(2) {
            let (low, high) = (w[0], w[1]);
            if value >= low && value < high {
                let cut = low + split_point * (high - low);
                return if value < cut { low } else { high };
            }
        }
        last
    }
}

/// One label → family row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyMapping {
    pub label: String,
    pub family: String,
}

/// Part label → family table, resolved in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<FamilyMapping>", into = "Vec<FamilyMapping>")]
pub struct PieceFamilyMap {
    entries: Vec<FamilyMapping>,
}

impl From<Vec<FamilyMapping>> for PieceFamilyMap {
    fn from(rows: Vec<FamilyMapping>) -> Self {
        let mut map = PieceFamilyMap::default();
        for row in rows {
            map.insert(&row.label, &row.family);
        }
        map
    }
}

impl From<PieceFamilyMap> for Vec<FamilyMapping> {
    fn from(map: PieceFamilyMap) -> Self {
        map.entries
    }
}

impl PieceFamilyMap {
    /// Append a mapping. Blank labels are ignored; a repeated label keeps its
    /// first position and takes the new family.
    pub fn insert(&mut self, label: &str, family: &str) {
        let label = normalize_label(label);
        let family = normalize_label(family);
        if label.is_empty() || family.is_empty() {
            return;
        }
        match self.entries.iter_mut().find(|e| e.label == label) {
            Some(existing) => existing.family = family,
            None => self.entries.push(FamilyMapping { label, family }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FamilyMapping] {
        &self.entries
    }

    /// Exact label match first, then the first row (in table order) whose label
    /// is contained in the query. A query shorter than every row resolves to
    /// nothing.
    pub fn resolve(&self, label: &str) -> Option<&str> {
        let needle = normalize_label(label);
        if needle.is_empty() {
            return None;
        }
        if let Some(hit) = self.entries.iter().find(|e| e.label == needle) {
            return Some(&hit.family);
        }
        self.entries
            .iter()
            .find(|e| needle.contains(e.label.as_str()))
            .map(|e| e.family.as_str())
    }
}

/// Complete pricing configuration of one scope (global or tenant).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default)]
    pub ladders: Vec<FamilyPriceLadder>,
    #[serde(default)]
    pub families: PieceFamilyMap,
}

impl PricingConfig {
    pub fn from_toml(text: &str) -> Result<Self, DomainError> {
        let config: PricingConfig =
            toml::from_str(text).map_err(|e| DomainError::Parse(format!("pricing file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Default ladders shipped with the binary.
    pub fn builtin() -> Result<Self, DomainError> {
        Self::from_toml(BUILTIN_PRICING)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let mut seen = std::collections::HashSet::new();
        for ladder in &self.ladders {
            if !seen.insert(ladder.family()) {
                return Err(DomainError::Validation(format!(
                    "duplicate ladder for family {}",
                    ladder.family()
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.ladders.is_empty() && self.families.is_empty()
    }

    pub fn ladder(&self, family: &str) -> Option<&FamilyPriceLadder> {
        let family = normalize_label(family);
        self.ladders.iter().find(|l| l.family() == family)
    }
}

/// Suggested sale price for a part.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSuggestion {
    pub family: String,
    pub suggested_price: f64,
    pub ladder: Vec<f64>,
    /// Tax-inclusive market price the suggestion was derived from.
    pub market_price: f64,
    pub tax_exclusive_price: f64,
}

/// Resolve `label` to a family and snap `market_price` onto its ladder.
/// `None` when the label maps to no family, the family has no ladder, or the
/// price is not a positive number.
pub fn suggest_price(
    config: &PricingConfig,
    label: &str,
    market_price: f64,
    policy: &SuggestionPolicy,
) -> Option<PriceSuggestion> {
    if !market_price.is_finite() || market_price <= 0.0 {
        return None;
    }
    let family = config.families.resolve(label)?;
    let ladder = config.ladder(family)?;
    let tax_exclusive = market_price / (1.0 + policy.tax_rate);

    Some(PriceSuggestion {
        family: ladder.family().to_string(),
        suggested_price: ladder.snap(tax_exclusive, policy.split_point),
        ladder: ladder.tiers().to_vec(),
        market_price,
        tax_exclusive_price: tax_exclusive,
    })
}

fn normalize_label(s: &str) -> String {
    s.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PricingConfig {
        let mut families = PieceFamilyMap::default();
        families.insert("faro delantero", "faros");
        families.insert("faro", "faros");
        families.insert("alternador", "electrico");
        PricingConfig {
            ladders: vec![
                FamilyPriceLadder::new("FAROS", vec![50.0, 80.0, 120.0, 180.0]).unwrap(),
                FamilyPriceLadder::new("ELECTRICO", vec![40.0, 70.0, 110.0]).unwrap(),
            ],
            families,
        }
    }

    #[test]
    fn test_bracket_snap_to_upper_tier() {
        let s = suggest_price(&config(), "faro delantero", 131.0, &SuggestionPolicy::default())
            .unwrap();
        assert_eq!(s.family, "FAROS");
        assert!((s.tax_exclusive_price - 108.264).abs() < 1e-3);
        assert_eq!(s.suggested_price, 120.0);
        assert_eq!(s.ladder, vec![50.0, 80.0, 120.0, 180.0]);
        assert_eq!(s.market_price, 131.0);
    }

    #[test]
    fn test_below_cut_snaps_to_lower_tier() {
        // 121 / 1.21 = 100, below the 106 cut of [80, 120]
        let s = suggest_price(&config(), "FARO", 121.0, &SuggestionPolicy::default()).unwrap();
        assert_eq!(s.suggested_price, 80.0);
    }

    #[test]
    fn test_clamps_at_ladder_ends() {
        let policy = SuggestionPolicy::default();
        assert_eq!(suggest_price(&config(), "FARO", 10.0, &policy).unwrap().suggested_price, 50.0);
        assert_eq!(
            suggest_price(&config(), "FARO", 5000.0, &policy).unwrap().suggested_price,
            180.0
        );
        // exactly the max tier after tax
        assert_eq!(
            suggest_price(&config(), "FARO", 180.0 * 1.21, &policy).unwrap().suggested_price,
            180.0
        );
    }

    #[test]
    fn test_unknown_label_has_no_suggestion() {
        let policy = SuggestionPolicy::default();
        assert!(suggest_price(&config(), "PARAGOLPES", 100.0, &policy).is_none());
        assert!(suggest_price(&config(), "   ", 100.0, &policy).is_none());
        assert!(suggest_price(&config(), "FARO", 0.0, &policy).is_none());
    }

    #[test]
    fn test_exact_match_beats_containment() {
        let mut families = PieceFamilyMap::default();
        families.insert("FARO", "GENERIC");
        families.insert("FARO ANTINIEBLA", "ANTINIEBLAS");
        assert_eq!(families.resolve("faro antiniebla"), Some("ANTINIEBLAS"));
        // containment falls back to table order
        assert_eq!(families.resolve("FARO ANTINIEBLA IZQUIERDO"), Some("GENERIC"));
    }

    #[test]
    fn test_generic_label_does_not_match_longer_rows() {
        let mut families = PieceFamilyMap::default();
        families.insert("FARO ANTINIEBLA", "ANTINIEBLAS");
        families.insert("PUERTA DELANTERA", "PUERTAS");
        assert_eq!(families.resolve("Faro"), None);
        assert_eq!(families.resolve("de"), None);
        assert_eq!(families.resolve("PUERTA DELANTERA IZQUIERDA"), Some("PUERTAS"));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let cfg = config();
        let first = cfg.families.resolve("  Alternador 12V ").map(str::to_string);
        for _ in 0..5 {
            assert_eq!(cfg.families.resolve("  Alternador 12V ").map(str::to_string), first);
        }
        assert_eq!(first.as_deref(), Some("ELECTRICO"));
    }

    #[test]
    fn test_suggestion_is_monotonic() {
        let cfg = config();
        let policy = SuggestionPolicy::default();
        let mut last = 0.0;
        let mut price = 1.0;
        while price < 400.0 {
            let s = suggest_price(&cfg, "FARO", price, &policy).unwrap().suggested_price;
            assert!(s >= last, "price {price} suggested {s} after {last}");
            last = s;
            price += 0.5;
        }
    }

    #[test]
    fn test_ladder_validation() {
        assert!(FamilyPriceLadder::new("X", vec![]).is_err());
        assert!(FamilyPriceLadder::new("X", vec![10.0, 10.0]).is_err());
        assert!(FamilyPriceLadder::new("X", vec![30.0, 20.0]).is_err());
        assert!(FamilyPriceLadder::new("X", vec![-1.0, 20.0]).is_err());
        assert!(FamilyPriceLadder::new(" ", vec![1.0]).is_err());
    }

    #[test]
    fn test_toml_round_trip_rejects_bad_ladder() {
        let ok = PricingConfig::from_toml(
            r#"
            [[ladders]]
            family = "faros"
            tiers = [50, 80]

            [[families]]
            label = "faro"
            family = "faros"
            "#,
        )
        .unwrap();
        assert_eq!(ok.ladder("FAROS").unwrap().tiers(), &[50.0, 80.0]);

        let bad = PricingConfig::from_toml(
            r#"
            [[ladders]]
            family = "faros"
            tiers = [80, 50]
            "#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_builtin_pricing_parses() {
        let cfg = PricingConfig::builtin().unwrap();
        assert!(!cfg.ladders.is_empty());
        assert!(!cfg.families.is_empty());
        for mapping in cfg.families.entries() {
            assert!(cfg.ladder(&mapping.family).is_some(), "{} has no ladder", mapping.family);
        }
    }
}
