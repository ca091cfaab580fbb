use crate::application::fanout::FanOut;
use crate::application::registry::SourceRegistry;
use crate::domain::error::SourceError;
use crate::domain::values::platform::{PlatformSelector, SourceSpeed};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformStatus {
    pub id: String,
    pub speed: SourceSpeed,
    pub available: bool,
    pub elapsed_ms: u64,
    pub error: Option<String>,
}

pub struct PlatformsUseCase {
    registry: Arc<SourceRegistry>,
    fanout: FanOut,
}

impl PlatformsUseCase {
    pub fn new(registry: Arc<SourceRegistry>, fanout: FanOut) -> Self {
        Self { registry, fanout }
    }

    /// Probe every registered source, fast and slow, in parallel.
    pub async fn probe(&self) -> Vec<PlatformStatus> {
        let platforms = self.registry.platforms();
        let registry = Arc::clone(&self.registry);
        let mut statuses: Vec<PlatformStatus> = self
            .fanout
            .run(platforms, |info| {
                let registry = Arc::clone(&registry);
                async move {
                    let sources = registry
                        .resolve(&PlatformSelector::Only(info.id.clone()), true)
                        .map_err(|e| SourceError::ProviderUnavailable(e.to_string()))?;
                    let mut available = false;
                    for source in sources {
                        available |= source.is_available().await;
                    }
                    Ok::<_, SourceError>(available)
                }
            })
            .await
            .into_iter()
            .map(|unit| {
                let elapsed_ms = unit.elapsed_ms();
                let (available, error) = match unit.outcome {
                    Ok(available) => (available, None),
                    Err(e) => (false, Some(e.to_string())),
                };
                tracing::debug!(platform = %unit.key.id, available, elapsed_ms, "availability probe");
                PlatformStatus {
                    id: unit.key.id,
                    speed: unit.key.speed,
                    available,
                    elapsed_ms,
                    error,
                }
            })
            .collect();
        statuses.sort_by(|a, b| a.id.cmp(&b.id));
        statuses
    }
}
