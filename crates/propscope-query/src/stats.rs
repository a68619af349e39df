//! Single-field value distributions (`/stats`).
//!
//! Three fields have precomputed aggregate tables; the kernel prefers
//! those and otherwise groups against `transactions` directly. Town
//! distributions exclude the `-` sentinel on both paths so the two stay
//! deep-equal.

use rusqlite::Connection;
use serde::Serialize;

use propscope_core::error::Result;
use propscope_core::fields::StatField;

use crate::{projected, table_exists};

pub const DEFAULT_STATS_LIMIT: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldStats {
    pub field: String,
    pub total: i64,
    pub unique_values: i64,
    pub stats: Vec<ValueCount>,
}

/// The precomputed table serving a field, if one exists.
fn fast_table(field: StatField) -> Option<(&'static str, &'static str)> {
    match field {
        StatField::PropertyType => Some(("property_type_stats", "property_type")),
        StatField::TransactionType => Some(("transaction_type_stats", "transaction_type")),
        StatField::Town => Some(("town_stats", "town")),
        _ => None,
    }
}

/// Value/count distribution for one field, most frequent first, ties by
/// value ascending. `total` and `uniqueValues` describe the full
/// distribution regardless of `limit`.
pub fn field_stats(conn: &Connection, field: StatField, limit: usize) -> Result<FieldStats> {
    let where_clause = if field.excludes_sentinel() {
        " WHERE town != '-'"
    } else {
        ""
    };
    let limit_param = limit as i64;

    let stats = match fast_table(field) {
        Some((table, value_column)) if table_exists(conn, table) => {
            tracing::debug!(field = field.column(), table, "stats fast path");
            let sql = format!(
                "SELECT {value_column}, count FROM {table}
                 ORDER BY count DESC, {value_column} ASC
                 LIMIT ?"
            );
            conn.prepare_cached(&sql)?
                .query_map([limit_param], |row| {
                    Ok(ValueCount {
                        value: row.get(0)?,
                        count: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
        _ => {
            let expr = projected(field.column());
            let sql = format!(
                "SELECT {expr} AS value, COUNT(*) AS cnt
                 FROM transactions{where_clause}
                 GROUP BY value
                 ORDER BY cnt DESC, value ASC
                 LIMIT ?"
            );
            conn.prepare_cached(&sql)?
                .query_map([limit_param], |row| {
                    Ok(ValueCount {
                        value: row.get(0)?,
                        count: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    // Totals always come from the base table: cheap counts, and identical
    // on either path.
    let total: i64 = conn
        .prepare_cached(&format!(
            "SELECT COUNT(*) FROM transactions{where_clause}"
        ))?
        .query_row([], |row| row.get(0))?;

    let expr = projected(field.column());
    let unique_values: i64 = conn
        .prepare_cached(&format!(
            "SELECT COUNT(DISTINCT {expr}) FROM transactions{where_clause}"
        ))?
        .query_row([], |row| row.get(0))?;

    Ok(FieldStats {
        field: field.column().to_string(),
        total,
        unique_values,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precompute::rebuild_aggregates;
    use crate::testdata::{insert, memory_store, three_row_corpus, TxRow};

    #[test]
    fn test_spec_scenario_property_type() {
        let conn = memory_store();
        three_row_corpus(&conn);

        let result = field_stats(&conn, StatField::PropertyType, DEFAULT_STATS_LIMIT).unwrap();
        assert_eq!(result.field, "property_type");
        assert_eq!(result.total, 3);
        assert_eq!(result.unique_values, 2);
        assert_eq!(result.stats.len(), 2);
        assert_eq!(result.stats[0].value, "HDB");
        assert_eq!(result.stats[0].count, 2);
        assert_eq!(result.stats[1].value, "CONDO");
        assert_eq!(result.stats[1].count, 1);
    }

    #[test]
    fn test_ties_break_by_value_ascending() {
        let conn = memory_store();
        for town in ["Bedok", "Ang Mo Kio"] {
            insert(
                &conn,
                &TxRow {
                    town: Some(town),
                    ..Default::default()
                },
            );
        }

        let result = field_stats(&conn, StatField::Town, 10).unwrap();
        assert_eq!(result.stats[0].value, "Ang Mo Kio");
        assert_eq!(result.stats[1].value, "Bedok");
    }

    #[test]
    fn test_null_and_empty_project_to_unknown() {
        let conn = memory_store();
        insert(&conn, &TxRow::default());
        insert(
            &conn,
            &TxRow {
                district: Some(""),
                ..Default::default()
            },
        );

        let result = field_stats(&conn, StatField::District, 10).unwrap();
        assert_eq!(result.stats.len(), 1);
        assert_eq!(result.stats[0].value, "Unknown");
        assert_eq!(result.stats[0].count, 2);
    }

    #[test]
    fn test_town_sentinel_excluded() {
        let conn = memory_store();
        three_row_corpus(&conn);
        insert(
            &conn,
            &TxRow {
                town: Some("-"),
                ..Default::default()
            },
        );

        let result = field_stats(&conn, StatField::Town, 10).unwrap();
        assert_eq!(result.total, 3);
        assert!(result.stats.iter().all(|s| s.value != "-"));
    }

    #[test]
    fn test_fast_path_matches_slow_path() {
        let mut conn = memory_store();
        three_row_corpus(&conn);
        insert(
            &conn,
            &TxRow {
                town: Some("-"),
                property_type: Some("HDB"),
                ..Default::default()
            },
        );

        let slow = field_stats(&conn, StatField::Town, 10).unwrap();
        let slow_pt = field_stats(&conn, StatField::PropertyType, 10).unwrap();

        rebuild_aggregates(&mut conn).unwrap();

        let fast = field_stats(&conn, StatField::Town, 10).unwrap();
        let fast_pt = field_stats(&conn, StatField::PropertyType, 10).unwrap();

        assert_eq!(serde_json::to_value(&slow).unwrap().get("stats"),
                   serde_json::to_value(&fast).unwrap().get("stats"));
        assert_eq!(serde_json::to_value(&slow_pt).unwrap().get("stats"),
                   serde_json::to_value(&fast_pt).unwrap().get("stats"));
    }

    #[test]
    fn test_limit_clips_stats_but_not_totals() {
        let conn = memory_store();
        three_row_corpus(&conn);

        let result = field_stats(&conn, StatField::PropertyType, 1).unwrap();
        assert_eq!(result.stats.len(), 1);
        assert_eq!(result.unique_values, 2);
        assert_eq!(result.total, 3);
    }
}
