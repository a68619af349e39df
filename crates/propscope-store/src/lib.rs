//! Propscope Store
//!
//! Read-only access to the transaction store. The SQLite file is produced
//! offline by the loader and precompute pass; this crate opens it strictly
//! read-only, holds a small pool of long-lived connections, and exposes
//! the load-time metadata the responses echo back.

use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use serde::Serialize;

use propscope_core::error::{AnalyticsError, Result};

mod pool;

pub use pool::ReadPool;

/// Open one read-only connection with the store's resource settings.
///
/// Fails fast if the file is missing: read-only open never creates.
pub fn open_read_only(path: &Path) -> Result<Connection> {
    if !path.exists() {
        return Err(AnalyticsError::Internal(format!(
            "Store file not found: {}",
            path.display()
        )));
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    // ~10 MB page cache, ~30 MB mmap window, everything else tuned for a
    // reader that never writes.
    conn.execute_batch(
        r#"
        PRAGMA cache_size = -10240;
        PRAGMA mmap_size = 31457280;
        PRAGMA query_only = ON;
        PRAGMA temp_store = MEMORY;
        "#,
    )?;

    // Planner statistics are written by the precompute pass; a read-only
    // handle can only ask SQLite to re-read what is already there.
    let _ = conn.execute_batch("PRAGMA optimize;");

    Ok(conn)
}

/// Verify the store is queryable. Preparation errors here are fatal at
/// startup rather than surfacing per-request.
pub fn probe(conn: &Connection) -> Result<i64> {
    let rows: i64 = conn
        .prepare_cached("SELECT COUNT(*) FROM transactions")?
        .query_row([], |row| row.get(0))?;
    Ok(rows)
}

/// Load-time facts recorded by the loader, echoed verbatim in responses.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMetadata {
    pub row_count: Option<String>,
    pub column_count: Option<String>,
    pub source_timestamp: Option<String>,
    pub last_updated: Option<String>,
}

impl StoreMetadata {
    pub fn read(conn: &Connection) -> Result<Self> {
        use propscope_core::schema::metadata_value;
        Ok(Self {
            row_count: metadata_value(conn, "row_count")?,
            column_count: metadata_value(conn, "column_count")?,
            source_timestamp: metadata_value(conn, "source_timestamp")?,
            last_updated: metadata_value(conn, "last_updated")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propscope_core::schema::init_schema;

    fn seeded_store(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("store.db");
        let conn = Connection::open(&path).unwrap();
        init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO transactions (salesperson_name, salesperson_reg_num, transaction_date,
                                       property_type, transaction_type, represented, town,
                                       district, general_location)
             VALUES ('Jane Tan', 'R000001', 'JAN-2024', 'HDB', 'RESALE', 'BUYER',
                     'Punggol', '19', 'NORTH EAST')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO metadata (key, value) VALUES ('row_count', '1')",
            [],
        )
        .unwrap();
        path
    }

    #[test]
    fn test_open_missing_file_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_read_only(&dir.path().join("absent.db")).unwrap_err();
        assert!(matches!(err, AnalyticsError::Internal(_)));
    }

    #[test]
    fn test_open_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_store(&dir);

        let conn = open_read_only(&path).unwrap();
        assert_eq!(probe(&conn).unwrap(), 1);

        let err = conn.execute("DELETE FROM transactions", []);
        assert!(err.is_err(), "writes must be rejected");
    }

    #[test]
    fn test_metadata_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = seeded_store(&dir);

        let conn = open_read_only(&path).unwrap();
        let meta = StoreMetadata::read(&conn).unwrap();
        assert_eq!(meta.row_count.as_deref(), Some("1"));
        assert_eq!(meta.source_timestamp, None);
    }
}
