use crate::domain::entities::inventory::Tenant;
use crate::domain::error::DomainError;
use async_trait::async_trait;
use std::collections::HashSet;

#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn active_tenants(&self) -> Result<Vec<Tenant>, DomainError>;

    /// Tenants that must never be searched as siblings.
    async fn excluded_tenant_ids(&self) -> Result<HashSet<i64>, DomainError>;

    async fn add_tenant(&self, name: &str, sibling_excluded: bool) -> Result<i64, DomainError>;
}
