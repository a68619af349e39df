//! Propscope Query
//!
//! The aggregation kernels behind every analytics endpoint, the fast/slow
//! path selection over the precomputed aggregate tables, and the
//! build-time precompute pass that materializes them.
//!
//! Kernels are free functions over a borrowed connection: the caller owns
//! pooling, blocking offload, and timeouts. Filter values only ever reach
//! SQL as bound parameters.

use serde::Serialize;

pub mod agents;
pub mod analytics;
pub mod insights;
pub mod precompute;
pub mod rows;
pub mod stats;
pub mod testdata;
pub mod timeseries;

/// The projection applied to categorical output values: NULL and empty
/// project to the literal `Unknown`; everything else passes through.
pub(crate) fn projected(column: &str) -> String {
    format!("COALESCE(NULLIF({column}, ''), 'Unknown')")
}

/// A value with its share of some total, one-decimal percentage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueShare {
    pub value: String,
    pub count: i64,
    pub percentage: f64,
}

/// Raw first/last dates of a result set, in original `MMM-YYYY` form.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DateRange {
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

/// Integer share of a total as a percentage rounded to one decimal.
/// Zero denominators yield `0.0`.
pub(crate) fn percentage1(count: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(count as f64 / total as f64 * 100.0)
}

/// Same, rounded to two decimals (precomputed-table convention).
pub(crate) fn percentage2(count: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 100.0 * 100.0).round() / 100.0
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Whether a table exists in the opened store. Kernels use this to fall
/// back to the slow path when the aggregates have not been materialized.
pub(crate) fn table_exists(conn: &rusqlite::Connection, name: &str) -> bool {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?",
        [name],
        |_| Ok(()),
    )
    .is_ok()
}
