use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    Sold,
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StockStatus::InStock => write!(f, "in_stock"),
            StockStatus::Sold => write!(f, "sold"),
        }
    }
}

impl FromStr for StockStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_stock" | "stock" => Ok(StockStatus::InStock),
            "sold" => Ok(StockStatus::Sold),
            _ => Err(format!("Unknown stock status: {s}")),
        }
    }
}

/// A part held (or once held) by a tenant. Matched on any of the four
/// identifying fields: `reference`, `oem_code`, `alt_oem_code`, `iam_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: i64,
    pub tenant_id: i64,
    pub reference: String,
    pub oem_code: Option<String>,
    pub alt_oem_code: Option<String>,
    pub iam_code: Option<String>,
    pub title: String,
    pub price: Option<f64>,
    pub status: StockStatus,
    pub location: Option<String>,
}

/// Fields needed to register an inventory item.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInventoryItem {
    pub tenant_id: i64,
    pub reference: String,
    pub oem_code: Option<String>,
    pub alt_oem_code: Option<String>,
    pub iam_code: Option<String>,
    pub title: String,
    pub price: Option<f64>,
    pub status: StockStatus,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
}

/// An inventory hit in another tenant's stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiblingMatch {
    pub tenant_id: i64,
    pub tenant_name: String,
    pub item: InventoryItem,
}
