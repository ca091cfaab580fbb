pub mod autodoc;
pub mod local_catalog;
pub mod spareto;

use crate::domain::error::DomainError;
use crate::domain::ports::equivalence_provider::EquivalenceProvider;
use local_catalog::LocalCatalog;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Online catalogs first, then the offline dataset (from `local_catalog` when
/// given, else the bundled one). `budget` bounds one provider call and should
/// sit below the fan-out unit timeout.
pub fn default_providers(
    client: reqwest::Client,
    local_catalog: Option<&Path>,
    budget: Duration,
) -> Result<Vec<Arc<dyn EquivalenceProvider>>, DomainError> {
    let local = match local_catalog {
        Some(path) => LocalCatalog::from_path(path)?,
        None => LocalCatalog::bundled()?,
    };
    Ok(vec![
        Arc::new(autodoc::AutodocProvider::new(client.clone(), budget)),
        Arc::new(spareto::SparetoProvider::new(client)),
        Arc::new(local),
    ])
}
