//! Price source registry.
//!
//! Maps a platform id to a constructor, split into a fast bucket (queried by
//! every "all platforms" search) and a slow bucket (opt-in). New sources are
//! added with [`SourceRegistry::register`] at any time; dispatch never names a
//! concrete source.

use crate::domain::error::DomainError;
use crate::domain::ports::price_source::PriceSource;
use crate::domain::values::platform::{PlatformSelector, SourceSpeed};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

pub type SourceFactory = Arc<dyn Fn() -> Arc<dyn PriceSource> + Send + Sync>;

#[derive(Clone)]
struct Registration {
    speed: SourceSpeed,
    factory: SourceFactory,
}

/// Registered platform, as listed to callers.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PlatformInfo {
    pub id: String,
    pub speed: SourceSpeed,
}

#[derive(Default)]
pub struct SourceRegistry {
    entries: RwLock<BTreeMap<String, Registration>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the constructor for `id`.
    pub fn register<F>(&self, id: &str, speed: SourceSpeed, factory: F)
    where
        F: Fn() -> Arc<dyn PriceSource> + Send + Sync + 'static,
    {
        let id = id.trim().to_lowercase();
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if entries
            .insert(
                id.clone(),
                Registration {
                    speed,
                    factory: Arc::new(factory),
                },
            )
            .is_some()
        {
            tracing::debug!(platform = %id, "replaced price source registration");
        }
    }

    pub fn unregister(&self, id: &str) -> bool {
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.remove(&id.trim().to_lowercase()).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.snapshot().contains_key(&id.trim().to_lowercase())
    }

    /// Registered platforms, sorted by id.
    pub fn platforms(&self) -> Vec<PlatformInfo> {
        self.snapshot()
            .into_iter()
            .map(|(id, reg)| PlatformInfo {
                id,
                speed: reg.speed,
            })
            .collect()
    }

    pub fn ids(&self, speed: SourceSpeed) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter(|(_, reg)| reg.speed == speed)
            .map(|(id, _)| id)
            .collect()
    }

    /// Instantiate the sources a search should query.
    ///
    /// `All` yields every fast source, plus the slow ones when `include_slow`.
    /// Naming a platform explicitly always works, slow or not.
    pub fn resolve(
        &self,
        selector: &PlatformSelector,
        include_slow: bool,
    ) -> Result<Vec<Arc<dyn PriceSource>>, DomainError> {
        let entries = self.snapshot();
        match selector {
            PlatformSelector::All => Ok(entries
                .values()
                .filter(|reg| include_slow || reg.speed == SourceSpeed::Fast)
                .map(|reg| (reg.factory)())
                .collect()),
            PlatformSelector::Only(id) => entries
                .get(id)
                .map(|reg| vec![(reg.factory)()])
                .ok_or_else(|| {
                    let known: Vec<&str> = entries.keys().map(String::as_str).collect();
                    DomainError::Validation(format!(
                        "unknown platform '{id}' (known: {})",
                        known.join(", ")
                    ))
                }),
        }
    }

    fn snapshot(&self) -> BTreeMap<String, Registration> {
        match self.entries.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
