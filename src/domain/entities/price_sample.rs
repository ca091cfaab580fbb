use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One observed price, in EUR with VAT, tagged with the platform it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub platform: String,
    pub price: f64,
}

/// What a single source returns for one reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceListing {
    /// Sanitized prices, ascending.
    pub prices: Vec<f64>,
    pub images: Vec<String>,
    /// Part category label as the platform names it (e.g. "FARO DELANTERO IZQUIERDO").
    pub category: Option<String>,
}

/// Per-platform outcome of a price search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformResult {
    pub platform: String,
    pub samples: Vec<PriceSample>,
    pub images: Vec<String>,
    pub category: Option<String>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl PlatformResult {
    pub fn from_listing(platform: &str, listing: SourceListing, elapsed_ms: u64) -> Self {
        Self {
            platform: platform.to_string(),
            samples: listing
                .prices
                .into_iter()
                .map(|price| PriceSample {
                    platform: platform.to_string(),
                    price,
                })
                .collect(),
            images: listing.images,
            category: listing.category,
            error: None,
            elapsed_ms,
        }
    }

    pub fn failed(platform: &str, error: String, elapsed_ms: u64) -> Self {
        Self {
            platform: platform.to_string(),
            samples: Vec::new(),
            images: Vec::new(),
            category: None,
            error: Some(error),
            elapsed_ms,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Most frequent label, uppercased. Ties go to the label seen first.
pub fn most_common_category<'a, I>(labels: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (order, label) in labels
        .into_iter()
        .map(|l| l.trim().to_uppercase())
        .filter(|l| !l.is_empty())
        .enumerate()
    {
        counts.entry(label).or_insert((0, order)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|(_, (ca, oa)), (_, (cb, ob))| ca.cmp(cb).then(ob.cmp(oa)))
        .map(|(label, _)| label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_common_category() {
        assert_eq!(
            most_common_category(["Faro", "alternador", " Alternador "]).as_deref(),
            Some("ALTERNADOR")
        );
        assert_eq!(most_common_category(["B", "A"]).as_deref(), Some("B"));
        assert_eq!(most_common_category(Vec::<&str>::new()), None);
    }
}
