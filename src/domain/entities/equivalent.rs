use serde::{Deserialize, Serialize};

/// How much a cross-reference provider should return per candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupMode {
    /// Codes only; detail pages may be visited to harvest more codes.
    CodesOnly,
    /// Each candidate as a sellable item: brand, price text, image.
    FullItem,
}

/// Raw candidate as extracted by a provider, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquivalentCandidate {
    pub code: String,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub price_text: Option<String>,
    pub image_url: Option<String>,
}

impl EquivalentCandidate {
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }
}

/// A code from another manufacturer that fits in place of `original_reference`.
/// `equivalent_code` is always normalized (uppercase, no separators).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquivalentReference {
    pub original_reference: String,
    pub equivalent_code: String,
    pub source_provider: String,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub price_text: Option<String>,
    pub image_url: Option<String>,
}
