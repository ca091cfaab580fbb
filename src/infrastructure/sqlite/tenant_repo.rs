use super::{lock, SharedConnection};
use crate::domain::entities::inventory::Tenant;
use crate::domain::error::DomainError;
use crate::domain::ports::tenant_directory::TenantDirectory;
use async_trait::async_trait;
use rusqlite::params;
use std::collections::HashSet;

pub struct SqliteTenantRepo {
    conn: SharedConnection,
}

impl SqliteTenantRepo {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// Deactivated tenants drop out of sibling search but keep their stock rows.
    pub fn set_active(&self, id: i64, active: bool) -> Result<(), DomainError> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute("UPDATE tenants SET active = ?1 WHERE id = ?2", params![active, id])?;
        if rows == 0 {
            return Err(DomainError::Validation(format!("unknown tenant {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl TenantDirectory for SqliteTenantRepo {
    async fn active_tenants(&self) -> Result<Vec<Tenant>, DomainError> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare("SELECT id, name FROM tenants WHERE active = 1 ORDER BY id")?;
        let tenants = stmt
            .query_map([], |row| {
                Ok(Tenant {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tenants)
    }

    async fn excluded_tenant_ids(&self) -> Result<HashSet<i64>, DomainError> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare("SELECT id FROM tenants WHERE sibling_excluded = 1")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    async fn add_tenant(&self, name: &str, sibling_excluded: bool) -> Result<i64, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("tenant name is empty".into()));
        }
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO tenants (name, active, sibling_excluded, created_at) VALUES (?1, 1, ?2, ?3)",
            params![name, sibling_excluded, chrono::Utc::now().to_rfc3339()],
        )
        .map_err(|e| DomainError::Database(format!("Failed to add tenant: {e}")))?;
        Ok(conn.last_insert_rowid())
    }
}
