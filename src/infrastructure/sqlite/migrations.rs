use rusqlite::Connection;

/// Pricing rows with this scope are the global configuration; any other
/// scope is a tenant id.
pub const GLOBAL_SCOPE: i64 = 0;

pub fn run_migrations(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tenants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            sibling_excluded INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS inventory_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id INTEGER NOT NULL,
            reference TEXT NOT NULL,
            oem_code TEXT,
            alt_oem_code TEXT,
            iam_code TEXT,
            title TEXT NOT NULL,
            price REAL,
            status TEXT NOT NULL DEFAULT 'in_stock',
            location TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS family_ladders (
            scope INTEGER NOT NULL,
            position INTEGER NOT NULL,
            family TEXT NOT NULL,
            tiers TEXT NOT NULL,
            PRIMARY KEY (scope, family)
        );

        CREATE TABLE IF NOT EXISTS piece_families (
            scope INTEGER NOT NULL,
            position INTEGER NOT NULL,
            label TEXT NOT NULL,
            family TEXT NOT NULL,
            PRIMARY KEY (scope, label)
        );

        CREATE INDEX IF NOT EXISTS idx_inventory_tenant ON inventory_items(tenant_id);
        CREATE INDEX IF NOT EXISTS idx_inventory_reference ON inventory_items(UPPER(reference));
        CREATE INDEX IF NOT EXISTS idx_inventory_oem ON inventory_items(UPPER(oem_code));
        CREATE INDEX IF NOT EXISTS idx_tenants_active ON tenants(active);
        "
    ).map_err(|e| format!("Migration failed: {e}"))
}
