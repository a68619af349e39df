//! Build-time materialization of the aggregate tables.
//!
//! Runs after the loader has populated `transactions`, always from
//! scratch: drop, rebuild, index, `ANALYZE`, commit. Any error rolls the
//! whole pass back, so a deployed store either has the complete aggregate
//! set or none of it.

use std::collections::BTreeMap;

use rusqlite::Connection;

use propscope_core::error::Result;
use propscope_core::period::month_key;

use crate::{percentage2, projected};

const AGGREGATE_DDL: &str = r#"
DROP TABLE IF EXISTS top_agents;
DROP TABLE IF EXISTS monthly_stats;
DROP TABLE IF EXISTS property_type_stats;
DROP TABLE IF EXISTS transaction_type_stats;
DROP TABLE IF EXISTS town_stats;

CREATE TABLE top_agents (
  reg_num TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  total_transactions INTEGER NOT NULL,
  last_transaction TEXT
);
CREATE INDEX idx_top_agents_total ON top_agents(total_transactions DESC);

CREATE TABLE monthly_stats (
  period TEXT NOT NULL,
  property_type TEXT NOT NULL,
  transaction_type TEXT NOT NULL,
  count INTEGER NOT NULL
);
CREATE INDEX idx_monthly_stats_period ON monthly_stats(period);

CREATE TABLE property_type_stats (
  property_type TEXT PRIMARY KEY,
  count INTEGER NOT NULL,
  percentage REAL NOT NULL
);

CREATE TABLE transaction_type_stats (
  transaction_type TEXT PRIMARY KEY,
  count INTEGER NOT NULL,
  percentage REAL NOT NULL
);

CREATE TABLE town_stats (
  town TEXT PRIMARY KEY,
  count INTEGER NOT NULL,
  percentage REAL NOT NULL
);
"#;

/// Row counts of the rebuilt aggregate tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrecomputeSummary {
    pub agents: usize,
    pub monthly_rows: usize,
    pub property_types: usize,
    pub transaction_types: usize,
    pub towns: usize,
}

/// Rebuild every aggregate table inside one transaction and refresh the
/// planner statistics. Re-runnable at any time.
pub fn rebuild_aggregates(conn: &mut Connection) -> Result<PrecomputeSummary> {
    let tx = conn.transaction()?;
    tx.execute_batch(AGGREGATE_DDL)?;

    let summary = PrecomputeSummary {
        agents: build_top_agents(&tx)?,
        monthly_rows: build_monthly_stats(&tx)?,
        property_types: build_share_table(&tx, "property_type_stats", "property_type", false)?,
        transaction_types: build_share_table(
            &tx,
            "transaction_type_stats",
            "transaction_type",
            false,
        )?,
        towns: build_share_table(&tx, "town_stats", "town", true)?,
    };

    tx.execute_batch("ANALYZE;")?;
    tx.commit()?;

    tracing::info!(
        agents = summary.agents,
        monthly_rows = summary.monthly_rows,
        towns = summary.towns,
        "Rebuilt aggregate tables"
    );
    Ok(summary)
}

struct AgentAccumulator {
    name: Option<String>,
    total: i64,
    // (normalized key, raw date)
    last: Option<(String, String)>,
}

fn build_top_agents(tx: &Connection) -> Result<usize> {
    // Grouping by (agent, raw date) keeps the scan streaming while still
    // letting Rust pick the chronological maximum.
    let sql = "SELECT salesperson_reg_num, MAX(salesperson_name), transaction_date, COUNT(*)
               FROM transactions
               WHERE salesperson_reg_num IS NOT NULL AND salesperson_reg_num NOT IN ('-', '')
               GROUP BY salesperson_reg_num, transaction_date";

    let mut agents: BTreeMap<String, AgentAccumulator> = BTreeMap::new();
    {
        let mut stmt = tx.prepare(sql)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let reg: String = row.get(0)?;
            let name: Option<String> = row.get(1)?;
            let date: Option<String> = row.get(2)?;
            let count: i64 = row.get(3)?;

            let entry = agents.entry(reg).or_insert(AgentAccumulator {
                name: None,
                total: 0,
                last: None,
            });
            entry.total += count;
            if let Some(n) = name.filter(|n| !n.is_empty()) {
                if entry.name.as_ref().map(|cur| *cur < n).unwrap_or(true) {
                    entry.name = Some(n);
                }
            }
            if let Some(raw) = date {
                if let Some(key) = month_key(&raw) {
                    if entry.last.as_ref().map(|(k, _)| *k < key).unwrap_or(true) {
                        entry.last = Some((key, raw));
                    }
                }
            }
        }
    }

    let count = agents.len();
    let mut insert = tx.prepare(
        "INSERT INTO top_agents (reg_num, name, total_transactions, last_transaction)
         VALUES (?, ?, ?, ?)",
    )?;
    for (reg, acc) in agents {
        insert.execute(rusqlite::params![
            reg,
            acc.name.as_deref().unwrap_or("Unknown"),
            acc.total,
            acc.last.map(|(_, raw)| raw),
        ])?;
    }
    Ok(count)
}

fn build_monthly_stats(tx: &Connection) -> Result<usize> {
    let pt = projected("property_type");
    let tt = projected("transaction_type");
    let sql = format!(
        "SELECT transaction_date, {pt}, {tt}, COUNT(*)
         FROM transactions
         WHERE transaction_date IS NOT NULL AND transaction_date NOT IN ('-', '')
         GROUP BY 1, 2, 3"
    );

    let mut buckets: BTreeMap<(String, String, String), i64> = BTreeMap::new();
    {
        let mut stmt = tx.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            let property: String = row.get(1)?;
            let deal: String = row.get(2)?;
            let count: i64 = row.get(3)?;
            if let Some(period) = month_key(&raw) {
                *buckets.entry((period, property, deal)).or_insert(0) += count;
            }
        }
    }

    let count = buckets.len();
    let mut insert = tx.prepare(
        "INSERT INTO monthly_stats (period, property_type, transaction_type, count)
         VALUES (?, ?, ?, ?)",
    )?;
    for ((period, property, deal), n) in buckets {
        insert.execute(rusqlite::params![period, property, deal, n])?;
    }
    Ok(count)
}

fn build_share_table(
    tx: &Connection,
    table: &str,
    column: &str,
    exclude_town_sentinel: bool,
) -> Result<usize> {
    let where_clause = if exclude_town_sentinel {
        " WHERE town != '-'"
    } else {
        ""
    };

    // Percentage denominator: all rows, except town shares which are over
    // the non-sentinel row count.
    let denominator: i64 = tx
        .prepare(&format!("SELECT COUNT(*) FROM transactions{where_clause}"))?
        .query_row([], |row| row.get(0))?;

    let expr = projected(column);
    let sql = format!(
        "SELECT {expr} AS value, COUNT(*) AS cnt
         FROM transactions{where_clause}
         GROUP BY value"
    );

    let values: Vec<(String, i64)> = tx
        .prepare(&sql)?
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let count = values.len();
    let mut insert = tx.prepare(&format!(
        "INSERT INTO {table} ({column}, count, percentage) VALUES (?, ?, ?)"
    ))?;
    for (value, n) in values {
        insert.execute(rusqlite::params![value, n, percentage2(n, denominator)])?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::{insert, memory_store, three_row_corpus, TxRow};

    #[test]
    fn test_rebuild_materializes_all_tables() {
        let mut conn = memory_store();
        three_row_corpus(&conn);

        let summary = rebuild_aggregates(&mut conn).unwrap();
        assert_eq!(summary.agents, 2);
        assert_eq!(summary.property_types, 2);
        assert_eq!(summary.transaction_types, 2);
        assert_eq!(summary.towns, 2);
        assert_eq!(summary.monthly_rows, 3);

        for table in [
            "top_agents",
            "monthly_stats",
            "property_type_stats",
            "transaction_type_stats",
            "town_stats",
        ] {
            assert!(crate::table_exists(&conn, table), "{table} missing");
        }
    }

    #[test]
    fn test_rebuild_is_rerunnable() {
        let mut conn = memory_store();
        three_row_corpus(&conn);

        let first = rebuild_aggregates(&mut conn).unwrap();
        let second = rebuild_aggregates(&mut conn).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_top_agents_totals_and_last_transaction() {
        let mut conn = memory_store();
        three_row_corpus(&conn);
        rebuild_aggregates(&mut conn).unwrap();

        let (name, total, last): (String, i64, Option<String>) = conn
            .query_row(
                "SELECT name, total_transactions, last_transaction
                 FROM top_agents WHERE reg_num = 'A'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(name, "Alice Tan");
        assert_eq!(total, 2);
        assert_eq!(last.as_deref(), Some("FEB-2024"));
    }

    #[test]
    fn test_monthly_stats_normalized_periods() {
        let mut conn = memory_store();
        three_row_corpus(&conn);
        rebuild_aggregates(&mut conn).unwrap();

        let periods: Vec<String> = conn
            .prepare("SELECT DISTINCT period FROM monthly_stats ORDER BY period")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(periods, vec!["2024-01", "2024-02"]);
    }

    #[test]
    fn test_share_percentages_two_decimals() {
        let mut conn = memory_store();
        three_row_corpus(&conn);
        rebuild_aggregates(&mut conn).unwrap();

        let pct: f64 = conn
            .query_row(
                "SELECT percentage FROM property_type_stats WHERE property_type = 'HDB'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(pct, 66.67);
    }

    #[test]
    fn test_town_stats_excludes_sentinel_and_denominator() {
        let mut conn = memory_store();
        // 1 sentinel town row + 3 real town rows
        insert(
            &conn,
            &TxRow {
                town: Some("-"),
                ..Default::default()
            },
        );
        for town in ["Punggol", "Punggol", "Bedok"] {
            insert(
                &conn,
                &TxRow {
                    town: Some(town),
                    ..Default::default()
                },
            );
        }
        rebuild_aggregates(&mut conn).unwrap();

        let rows: Vec<(String, i64, f64)> = conn
            .prepare("SELECT town, count, percentage FROM town_stats ORDER BY count DESC")
            .unwrap()
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ("Punggol".to_string(), 2, 66.67));
        assert_eq!(rows[1], ("Bedok".to_string(), 1, 33.33));
    }

    #[test]
    fn test_empty_store_rebuild_succeeds() {
        let mut conn = memory_store();
        let summary = rebuild_aggregates(&mut conn).unwrap();
        assert_eq!(summary, PrecomputeSummary::default());
    }
}
