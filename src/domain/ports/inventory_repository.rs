use crate::domain::entities::inventory::{InventoryItem, NewInventoryItem};
use crate::domain::error::DomainError;
use async_trait::async_trait;

#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Items of `tenant_id` whose reference, OEM, alternate OEM or IAM code
    /// equals (case-insensitively) any of `references`. At most `limit` rows.
    async fn find_matches(
        &self,
        tenant_id: i64,
        references: &[String],
        limit: usize,
    ) -> Result<Vec<InventoryItem>, DomainError>;

    async fn add_item(&self, item: &NewInventoryItem) -> Result<i64, DomainError>;
}
