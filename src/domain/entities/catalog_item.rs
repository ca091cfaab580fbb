use serde::{Deserialize, Serialize};

/// One listing on an external marketplace or competitor catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub source: String,
    pub title: String,
    /// OEM code as printed by the site itself.
    pub oem_code: Option<String>,
    pub price: Option<f64>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
}

/// A competitor listing whose OEM field equals one of the queried references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorMatch {
    pub competitor: String,
    pub queried_reference: String,
    pub item: CatalogItem,
}
