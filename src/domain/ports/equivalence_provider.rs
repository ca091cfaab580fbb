use crate::domain::entities::equivalent::{EquivalentCandidate, LookupMode};
use crate::domain::error::SourceError;
use async_trait::async_trait;

/// A catalog that knows which other manufacturers' codes fit in place of a
/// given part code. Providers return raw candidates; normalization, noise
/// filtering and deduplication happen in the expander.
#[async_trait]
pub trait EquivalenceProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn candidates(
        &self,
        reference: &str,
        mode: LookupMode,
    ) -> Result<Vec<EquivalentCandidate>, SourceError>;
}
