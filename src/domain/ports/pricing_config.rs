use crate::domain::error::DomainError;
use crate::domain::values::price_ladder::PricingConfig;
use std::sync::Arc;

/// Ladder / family configuration store.
///
/// `load(Some(tenant))` returns the tenant override when the tenant uploaded
/// one, else the global config. Cached copies stay valid until `upload`.
pub trait PricingConfigStore: Send + Sync {
    fn load(&self, tenant_id: Option<i64>) -> Result<Arc<PricingConfig>, DomainError>;
    fn upload(&self, tenant_id: Option<i64>, config: &PricingConfig) -> Result<(), DomainError>;
}
