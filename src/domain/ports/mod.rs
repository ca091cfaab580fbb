pub mod competitor_catalog;
pub mod equivalence_provider;
pub mod inventory_repository;
pub mod listing_counter;
pub mod price_cache;
pub mod price_source;
pub mod pricing_config;
pub mod tenant_directory;
