use crate::domain::entities::catalog_item::CatalogItem;
use crate::domain::error::SourceError;
use async_trait::async_trait;

/// A competitor's public catalog, searched by reference.
///
/// Sites apply their own fuzzy matching, so results may contain items for
/// neighbouring references; callers post-filter on `CatalogItem::oem_code`.
#[async_trait]
pub trait CompetitorCatalog: Send + Sync {
    fn name(&self) -> &str;

    async fn search_items(&self, reference: &str) -> Result<Vec<CatalogItem>, SourceError>;
}
