//! Application configuration.
//!
//! Every section is optional in the TOML file; missing values fall back to the
//! defaults below. A handful of environment variables override the file so a
//! deployment can inject paths and credentials without editing it.

use crate::domain::error::DomainError;
use crate::domain::values::price_ladder::SuggestionPolicy;
use crate::domain::values::price_summary::OutlierPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "PARTPRICE_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub fanout: FanOutSection,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub price_cache: PriceCacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub tenants: TenantsConfig,
    #[serde(default)]
    pub equivalents: EquivalentsConfig,
    #[serde(default)]
    pub outliers: OutlierPolicy,
    #[serde(default)]
    pub suggestion: SuggestionPolicy,
    #[serde(default)]
    pub ebay: EbayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "./partprice.db".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct FanOutSection {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_unit_timeout_secs")]
    pub unit_timeout_secs: u64,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl Default for FanOutSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            unit_timeout_secs: default_unit_timeout_secs(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

fn default_max_concurrency() -> usize {
    10
}
fn default_unit_timeout_secs() -> u64 {
    20
}
fn default_http_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
    /// Where rotating session tokens survive process restarts.
    #[serde(default)]
    pub cache_file: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
            cache_file: None,
        }
    }
}

fn default_session_ttl_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceCacheConfig {
    #[serde(default = "default_price_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_price_capacity")]
    pub max_entries: usize,
}

impl Default for PriceCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_price_ttl_secs(),
            max_entries: default_price_capacity(),
        }
    }
}

fn default_price_ttl_secs() -> u64 {
    1800
}
fn default_price_capacity() -> usize {
    2000
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_own_limit")]
    pub own_stock_limit: usize,
    #[serde(default = "default_sibling_limit")]
    pub sibling_limit_per_tenant: usize,
    #[serde(default = "default_competitor_min_len")]
    pub competitor_min_len: usize,
    #[serde(default = "default_competitor_max_refs")]
    pub competitor_max_references: usize,
    #[serde(default = "default_competitor_max_matches")]
    pub competitor_max_matches: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            own_stock_limit: default_own_limit(),
            sibling_limit_per_tenant: default_sibling_limit(),
            competitor_min_len: default_competitor_min_len(),
            competitor_max_references: default_competitor_max_refs(),
            competitor_max_matches: default_competitor_max_matches(),
        }
    }
}

fn default_own_limit() -> usize {
    50
}
fn default_sibling_limit() -> usize {
    100
}
fn default_competitor_min_len() -> usize {
    6
}
fn default_competitor_max_refs() -> usize {
    30
}
fn default_competitor_max_matches() -> usize {
    150
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantsConfig {
    /// Never searched as siblings, whatever the tenant directory says.
    #[serde(default)]
    pub excluded_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EquivalentsConfig {
    #[serde(default)]
    pub rank_top_n: Option<usize>,
    #[serde(default)]
    pub extra_denylist: Vec<String>,
    /// Cross-reference CSV replacing the bundled one.
    #[serde(default)]
    pub local_catalog: Option<PathBuf>,
    #[serde(default = "default_min_code_len")]
    pub min_code_len: usize,
    #[serde(default = "default_max_code_len")]
    pub max_code_len: usize,
}

impl Default for EquivalentsConfig {
    fn default() -> Self {
        Self {
            rank_top_n: None,
            extra_denylist: Vec::new(),
            local_catalog: None,
            min_code_len: default_min_code_len(),
            max_code_len: default_max_code_len(),
        }
    }
}

fn default_min_code_len() -> usize {
    5
}
fn default_max_code_len() -> usize {
    20
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EbayConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub marketplace: Option<String>,
}

impl EbayConfig {
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Some((id, secret)),
            _ => None,
        }
    }
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<Self, DomainError> {
        let config: AppConfig =
            toml::from_str(text).map_err(|e| DomainError::Config(format!("config file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self, DomainError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DomainError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    /// Load from `path` (or `PARTPRICE_CONFIG`), defaults when neither is set,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, DomainError> {
        let env_path = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(env_path) {
            Some(p) => Self::load_file(&p)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup("PARTPRICE_DB") {
            self.database.path = db;
        }
        if let Some(id) = lookup("PARTPRICE_EBAY_CLIENT_ID") {
            self.ebay.client_id = Some(id);
        }
        if let Some(secret) = lookup("PARTPRICE_EBAY_CLIENT_SECRET") {
            self.ebay.client_secret = Some(secret);
        }
        if let Some(file) = lookup("PARTPRICE_SESSION_FILE") {
            self.session.cache_file = Some(PathBuf::from(file));
        }
        if let Some(csv) = lookup("PARTPRICE_LOCAL_CATALOG") {
            self.equivalents.local_catalog = Some(PathBuf::from(csv));
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.fanout.max_concurrency == 0 {
            return Err(DomainError::Config("fanout.max_concurrency must be > 0".into()));
        }
        if self.fanout.unit_timeout_secs == 0 {
            return Err(DomainError::Config("fanout.unit_timeout_secs must be > 0".into()));
        }
        if self.price_cache.max_entries == 0 {
            return Err(DomainError::Config("price_cache.max_entries must be > 0".into()));
        }
        if self.equivalents.min_code_len > self.equivalents.max_code_len {
            return Err(DomainError::Config(
                "equivalents.min_code_len must not exceed max_code_len".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.suggestion.split_point) {
            return Err(DomainError::Config("suggestion.split_point must be in [0, 1)".into()));
        }
        if self.suggestion.tax_rate < 0.0 {
            return Err(DomainError::Config("suggestion.tax_rate must be >= 0".into()));
        }
        if self.outliers.lower_k < 0.0 || self.outliers.upper_k < 0.0 {
            return Err(DomainError::Config("outlier multipliers must be >= 0".into()));
        }
        Ok(())
    }
}
