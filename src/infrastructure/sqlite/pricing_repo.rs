//! Ladder and family tables per scope. Resolved configs are cached in memory
//! until the next upload touching their scope.

use super::migrations::GLOBAL_SCOPE;
use super::{lock, SharedConnection};
use crate::domain::error::DomainError;
use crate::domain::ports::pricing_config::PricingConfigStore;
use crate::domain::values::price_ladder::{FamilyPriceLadder, PieceFamilyMap, PricingConfig};
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub struct SqlitePricingStore {
    conn: SharedConnection,
    cache: RwLock<HashMap<i64, Arc<PricingConfig>>>,
}

impl SqlitePricingStore {
    /// Seeds the global scope with the bundled ladders when it is empty.
    pub fn new(conn: SharedConnection) -> Result<Self, DomainError> {
        let store = Self {
            conn,
            cache: RwLock::new(HashMap::new()),
        };
        if store.read_scope(GLOBAL_SCOPE)?.is_none() {
            let builtin = PricingConfig::builtin()?;
            store.write_scope(GLOBAL_SCOPE, &builtin)?;
            tracing::info!(ladders = builtin.ladders.len(), families = builtin.families.len(), "seeded default pricing");
        }
        Ok(store)
    }

    fn read_scope(&self, scope: i64) -> Result<Option<PricingConfig>, DomainError> {
        let conn = lock(&self.conn)?;
        let ladders = read_ladders(&conn, scope)?;
        let families = read_families(&conn, scope)?;
        if ladders.is_empty() && families.is_empty() {
            return Ok(None);
        }
        Ok(Some(PricingConfig { ladders, families }))
    }

    fn write_scope(&self, scope: i64, config: &PricingConfig) -> Result<(), DomainError> {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM family_ladders WHERE scope = ?1", params![scope])?;
        tx.execute("DELETE FROM piece_families WHERE scope = ?1", params![scope])?;
        for (position, ladder) in config.ladders.iter().enumerate() {
            let tiers = serde_json::to_string(ladder.tiers())
                .map_err(|e| DomainError::Parse(format!("ladder tiers: {e}")))?;
            tx.execute(
                "INSERT INTO family_ladders (scope, position, family, tiers) VALUES (?1, ?2, ?3, ?4)",
                params![scope, position as i64, ladder.family(), tiers],
            )?;
        }
        for (position, row) in config.families.entries().iter().enumerate() {
            tx.execute(
                "INSERT INTO piece_families (scope, position, label, family) VALUES (?1, ?2, ?3, ?4)",
                params![scope, position as i64, row.label, row.family],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn invalidate(&self, scope: i64) {
        if let Ok(mut cache) = self.cache.write() {
            // Tenants without their own rows cache the global config under their id.
            if scope == GLOBAL_SCOPE {
                cache.clear();
            } else {
                cache.remove(&scope);
            }
        }
    }
}

fn read_ladders(conn: &Connection, scope: i64) -> Result<Vec<FamilyPriceLadder>, DomainError> {
    let mut stmt = conn.prepare("SELECT family, tiers FROM family_ladders WHERE scope = ?1 ORDER BY position")?;
    let rows = stmt
        .query_map(params![scope], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(family, tiers)| {
            let tiers: Vec<f64> = serde_json::from_str(&tiers)
                .map_err(|e| DomainError::Parse(format!("stored tiers for {family}: {e}")))?;
            FamilyPriceLadder::new(&family, tiers)
        })
        .collect()
}

fn read_families(conn: &Connection, scope: i64) -> Result<PieceFamilyMap, DomainError> {
    let mut stmt = conn.prepare("SELECT label, family FROM piece_families WHERE scope = ?1 ORDER BY position")?;
    let rows = stmt
        .query_map(params![scope], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    let mut map = PieceFamilyMap::default();
    for (label, family) in rows {
        map.insert(&label, &family);
    }
    Ok(map)
}

impl PricingConfigStore for SqlitePricingStore {
    fn load(&self, tenant_id: Option<i64>) -> Result<Arc<PricingConfig>, DomainError> {
        let scope = tenant_id.unwrap_or(GLOBAL_SCOPE);
        if let Some(hit) = self.cache.read().ok().and_then(|c| c.get(&scope).cloned()) {
            return Ok(hit);
        }

        let config = match self.read_scope(scope)? {
            Some(config) => config,
            None if scope != GLOBAL_SCOPE => self.read_scope(GLOBAL_SCOPE)?.unwrap_or_default(),
            None => PricingConfig::default(),
        };
        let config = Arc::new(config);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(scope, config.clone());
        }
        Ok(config)
    }

    fn upload(&self, tenant_id: Option<i64>, config: &PricingConfig) -> Result<(), DomainError> {
        config.validate()?;
        let scope = tenant_id.unwrap_or(GLOBAL_SCOPE);
        self.write_scope(scope, config)?;
        self.invalidate(scope);
        tracing::info!(scope, ladders = config.ladders.len(), families = config.families.len(), "pricing config uploaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqlitePricingStore {
        SqlitePricingStore::new(super::super::open(":memory:").unwrap()).unwrap()
    }

    fn config(family: &str, tiers: Vec<f64>, label: &str) -> PricingConfig {
        let mut families = PieceFamilyMap::default();
        families.insert(label, family);
        PricingConfig {
            ladders: vec![FamilyPriceLadder::new(family, tiers).unwrap()],
            families,
        }
    }

    #[test]
    fn test_seeds_builtin_global() {
        let store = store();
        let global = store.load(None).unwrap();
        assert_eq!(*global, PricingConfig::builtin().unwrap());
        // A tenant without its own rows sees the global config.
        assert_eq!(*store.load(Some(7)).unwrap(), *global);
    }

    #[test]
    fn test_tenant_upload_overrides_and_invalidates() {
        let store = store();
        let before = store.load(Some(7)).unwrap();
        store
            .upload(Some(7), &config("FAROS", vec![60.0, 90.0], "faro"))
            .unwrap();
        let after = store.load(Some(7)).unwrap();
        assert_ne!(*before, *after);
        assert_eq!(after.ladder("faros").unwrap().tiers(), &[60.0, 90.0]);
        // Other tenants still fall back to global.
        assert_eq!(*store.load(Some(8)).unwrap(), *store.load(None).unwrap());
    }

    #[test]
    fn test_global_upload_reaches_cached_tenants() {
        let store = store();
        store.load(Some(3)).unwrap();
        store
            .upload(None, &config("MOTOR", vec![300.0, 600.0], "motor"))
            .unwrap();
        let tenant = store.load(Some(3)).unwrap();
        assert_eq!(tenant.ladders.len(), 1);
        assert_eq!(tenant.families.resolve("MOTOR DIESEL"), Some("MOTOR"));
    }
}
