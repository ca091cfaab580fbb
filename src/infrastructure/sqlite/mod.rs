pub mod inventory_repo;
pub mod migrations;
pub mod pricing_repo;
pub mod tenant_repo;

use crate::domain::error::DomainError;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub type SharedConnection = Arc<Mutex<Connection>>;

/// Open the database at `path` (`:memory:` for a throwaway one) and migrate it.
pub fn open(path: &str) -> Result<SharedConnection, DomainError> {
    let conn = Connection::open(path).map_err(|e| DomainError::Database(format!("DB error: {e}")))?;
    if path != ":memory:" {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| DomainError::Database(format!("WAL error: {e}")))?;
    }
    migrations::run_migrations(&conn)?;
    tracing::debug!(path, "database ready");
    Ok(Arc::new(Mutex::new(conn)))
}

pub(crate) fn lock(conn: &SharedConnection) -> Result<std::sync::MutexGuard<'_, Connection>, DomainError> {
    conn.lock().map_err(|e| DomainError::Database(e.to_string()))
}
