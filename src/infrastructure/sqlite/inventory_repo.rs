use super::{lock, SharedConnection};
use crate::domain::entities::inventory::{InventoryItem, NewInventoryItem, StockStatus};
use crate::domain::error::DomainError;
use crate::domain::ports::inventory_repository::InventoryRepository;
use async_trait::async_trait;
use rusqlite::params;
use rusqlite::types::Value;

const COLUMNS: &str =
    "id, tenant_id, reference, oem_code, alt_oem_code, iam_code, title, price, status, location";

pub struct SqliteInventoryRepo {
    conn: SharedConnection,
}

impl SqliteInventoryRepo {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn row_to_item(row: &rusqlite::Row) -> Result<InventoryItem, rusqlite::Error> {
        let status: String = row.get(8)?;
        Ok(InventoryItem {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            reference: row.get(2)?,
            oem_code: row.get(3)?,
            alt_oem_code: row.get(4)?,
            iam_code: row.get(5)?,
            title: row.get(6)?,
            price: row.get(7)?,
            status: status.parse().unwrap_or_else(|_| {
                tracing::warn!(status = %status, "unknown stock status, reading as in_stock");
                StockStatus::InStock
            }),
            location: row.get(9)?,
        })
    }
}

#[async_trait]
impl InventoryRepository for SqliteInventoryRepo {
    async fn find_matches(
        &self,
        tenant_id: i64,
        references: &[String],
        limit: usize,
    ) -> Result<Vec<InventoryItem>, DomainError> {
        let mut codes: Vec<String> = Vec::new();
        for code in references.iter().map(|r| r.trim().to_uppercase()) {
            if !code.is_empty() && !codes.contains(&code) {
                codes.push(code);
            }
        }
        if codes.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        // ?1 is the tenant, ?2..=?n+1 the codes (reused by every column), then the limit.
        let placeholders: Vec<String> = (0..codes.len()).map(|i| format!("?{}", i + 2)).collect();
        let set = placeholders.join(", ");
        let sql = format!(
            "SELECT {COLUMNS} FROM inventory_items
             WHERE tenant_id = ?1
               AND (UPPER(reference) IN ({set}) OR UPPER(oem_code) IN ({set})
                    OR UPPER(alt_oem_code) IN ({set}) OR UPPER(iam_code) IN ({set}))
             ORDER BY CASE status WHEN 'in_stock' THEN 0 ELSE 1 END, id
             LIMIT ?{}",
            codes.len() + 2
        );

        let mut values = Vec::with_capacity(codes.len() + 2);
        values.push(Value::Integer(tenant_id));
        values.extend(codes.into_iter().map(Value::Text));
        values.push(Value::Integer(limit as i64));

        let conn = lock(&self.conn)?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DomainError::Database(e.to_string()))?;
        let items = stmt
            .query_map(rusqlite::params_from_iter(values), Self::row_to_item)
            .map_err(|e| DomainError::Database(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    async fn add_item(&self, item: &NewInventoryItem) -> Result<i64, DomainError> {
        if item.reference.trim().is_empty() {
            return Err(DomainError::Validation("inventory reference is empty".into()));
        }
        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO inventory_items (tenant_id, reference, oem_code, alt_oem_code, iam_code, title, price, status, location, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                item.tenant_id,
                item.reference.trim(),
                item.oem_code,
                item.alt_oem_code,
                item.iam_code,
                item.title,
                item.price,
                item.status.to_string(),
                item.location,
                chrono::Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| DomainError::Database(format!("Failed to add inventory item: {e}")))?;
        Ok(conn.last_insert_rowid())
    }
}
