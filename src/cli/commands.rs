use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "partprice", about = "Used auto part price aggregation and cross-reference search")]
pub struct Cli {
    /// TOML config file (defaults to $PARTPRICE_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Market prices for a part reference
    Search {
        reference: String,
        /// Platform id, or "all"
        #[arg(long, default_value = "all")]
        platform: String,
        /// Max samples kept per platform (1-1000)
        #[arg(long, default_value = "50")]
        limit: usize,
        /// Also query slow platforms when searching all
        #[arg(long)]
        include_slow: bool,
        /// Tenant id, for the inventory summary and tenant ladders
        #[arg(long)]
        tenant: Option<i64>,
        /// Attach equivalent references
        #[arg(long)]
        equivalents: bool,
    },
    /// Equivalents, own stock, sibling stock and competitor listings for a reference
    FullSearch {
        reference: String,
        #[arg(long)]
        tenant: i64,
    },
    /// Equivalent references from every cross-reference provider
    Equivalents { reference: String },
    /// Suggested sale price for a part label at a market price (VAT included)
    Suggest {
        label: String,
        market_price: f64,
        #[arg(long)]
        tenant: Option<i64>,
    },
    /// Summary statistics and outliers of a price list
    Stats {
        #[arg(required = true, num_args = 1..)]
        prices: Vec<f64>,
    },
    /// Registered platforms
    Platforms {
        /// Check availability of each platform
        #[arg(long)]
        probe: bool,
    },
    /// Replace the ladder/family config of the global scope or a tenant
    PricingUpload {
        /// TOML file with [[ladders]] and [[families]] tables
        file: PathBuf,
        #[arg(long)]
        tenant: Option<i64>,
    },
    /// Register a tenant
    TenantAdd {
        name: String,
        /// Never search this tenant's stock as a sibling
        #[arg(long)]
        exclude: bool,
    },
    /// Add an inventory item
    InventoryAdd {
        /// JSON with tenant_id, reference, title and optional oem_code, alt_oem_code, iam_code, price, status, location
        json: String,
    },
}
