//! SQLite schema for the transaction store.
//!
//! The loader creates this schema before bulk insert; the service only
//! ever opens the resulting file read-only. Aggregate tables are owned by
//! the precompute pass and are not part of the base DDL.

use crate::error::Result;

/// Initialize the base schema: the `transactions` table, the `metadata`
/// key/value table, and every index the query kernels rely on.
pub fn init_schema(conn: &rusqlite::Connection) -> Result<()> {
    let ddl = r#"
    -- Canonical row of the dataset. All attributes are text-valued in the
    -- source; sentinel '-' means "absent" and is interpreted by the query
    -- layer, never here.
    CREATE TABLE IF NOT EXISTS transactions (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      salesperson_name TEXT,
      salesperson_reg_num TEXT,
      transaction_date TEXT,
      property_type TEXT,
      transaction_type TEXT,
      represented TEXT,
      town TEXT,
      district TEXT,
      general_location TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_tx_date ON transactions(transaction_date);
    CREATE INDEX IF NOT EXISTS idx_tx_property_type ON transactions(property_type);
    CREATE INDEX IF NOT EXISTS idx_tx_transaction_type ON transactions(transaction_type);
    CREATE INDEX IF NOT EXISTS idx_tx_reg_num ON transactions(salesperson_reg_num);
    CREATE INDEX IF NOT EXISTS idx_tx_town ON transactions(town);
    CREATE INDEX IF NOT EXISTS idx_tx_district ON transactions(district);
    CREATE INDEX IF NOT EXISTS idx_tx_represented ON transactions(represented);

    -- Covering index for the agent roll-up kernels
    CREATE INDEX IF NOT EXISTS idx_tx_agent_rollup
      ON transactions(salesperson_reg_num, property_type, transaction_type, represented, town);

    -- Covering index for the time-series kernels
    CREATE INDEX IF NOT EXISTS idx_tx_series
      ON transactions(transaction_date, property_type, transaction_type);

    -- Load-time facts returned verbatim in responses
    CREATE TABLE IF NOT EXISTS metadata (
      key TEXT PRIMARY KEY,
      value TEXT NOT NULL
    );
    "#;

    conn.execute_batch(ddl)?;
    Ok(())
}

/// Read one metadata value, if recorded.
pub fn metadata_value(conn: &rusqlite::Connection, key: &str) -> Result<Option<String>> {
    use rusqlite::OptionalExtension;
    let value = conn
        .query_row("SELECT value FROM metadata WHERE key = ?", [key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(value)
}
