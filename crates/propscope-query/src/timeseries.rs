//! Time-series bucketing (`/timeseries`).
//!
//! Raw `MMM-YYYY` dates are grouped in SQL (a few hundred distinct
//! values) and normalized to canonical period keys in Rust, so the store
//! never needs a date type. Sentinel and malformed dates drop out of the
//! series entirely.

use std::collections::BTreeMap;

use rusqlite::{Connection, ToSql};
use serde::Serialize;

use propscope_core::error::Result;
use propscope_core::fields::FilterField;
use propscope_core::filter::FilterSet;
use propscope_core::period::Period;

use crate::{projected, table_exists};

/// Trailing periods kept in the chart view.
pub const CHART_PERIODS: usize = 24;
/// Grouped series fan out per period, so the chart keeps a longer tail.
pub const CHART_PERIODS_GROUPED: usize = 36;

const DATE_PRESENT: &str = "transaction_date IS NOT NULL AND transaction_date NOT IN ('-', '')";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub period: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub period: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    pub series: Vec<SeriesPoint>,
    pub chart_data: Vec<SeriesPoint>,
    pub total: i64,
}

/// Bucket the filtered rows into ascending canonical periods, optionally
/// split by one categorical column.
pub fn time_series(
    conn: &Connection,
    period: Period,
    group_by: Option<FilterField>,
    filters: &FilterSet,
) -> Result<TimeSeries> {
    let series = match group_by {
        None if filters.is_empty() && table_exists(conn, "monthly_stats") => {
            fast_plain_series(conn, period)?
        }
        None => plain_series(conn, period, filters)?,
        Some(group) => grouped_series(conn, period, group, filters)?,
    };

    let total = series.iter().map(|p| p.count).sum();
    let window = if group_by.is_some() {
        CHART_PERIODS_GROUPED
    } else {
        CHART_PERIODS
    };
    let chart_data = trailing_window(&series, window);

    Ok(TimeSeries {
        period: period.as_str(),
        group_by: group_by.map(|g| g.column().to_string()),
        series,
        chart_data,
        total,
    })
}

/// Per-period totals for the plain series; the insights kernel reuses
/// this for its monthly-average and yearly-growth figures.
pub(crate) fn period_counts(
    conn: &Connection,
    period: Period,
    filters: &FilterSet,
) -> Result<BTreeMap<String, i64>> {
    let predicate = filters.predicate(&[DATE_PRESENT]);
    let params: Vec<&dyn ToSql> = predicate.params.iter().map(|p| p as &dyn ToSql).collect();

    let sql = format!(
        "SELECT transaction_date, COUNT(*)
         FROM transactions{}
         GROUP BY transaction_date",
        predicate.clause
    );

    let mut buckets: BTreeMap<String, i64> = BTreeMap::new();
    let mut stmt = conn.prepare_cached(&sql)?;
    let mut rows = stmt.query(params.as_slice())?;
    while let Some(row) = rows.next()? {
        let raw: String = row.get(0)?;
        let count: i64 = row.get(1)?;
        if let Some(key) = period.bucket(&raw) {
            *buckets.entry(key).or_insert(0) += count;
        }
    }
    Ok(buckets)
}

fn plain_series(conn: &Connection, period: Period, filters: &FilterSet) -> Result<Vec<SeriesPoint>> {
    Ok(period_counts(conn, period, filters)?
        .into_iter()
        .map(|(period, count)| SeriesPoint {
            period,
            group: None,
            count,
        })
        .collect())
}

fn fast_plain_series(conn: &Connection, period: Period) -> Result<Vec<SeriesPoint>> {
    tracing::debug!(period = period.as_str(), "timeseries fast path");
    let sql = match period {
        Period::Month => {
            "SELECT period, SUM(count) FROM monthly_stats
             GROUP BY period ORDER BY period ASC"
        }
        Period::Year => {
            "SELECT substr(period, 1, 4) AS y, SUM(count) FROM monthly_stats
             GROUP BY y ORDER BY y ASC"
        }
    };
    let series = conn
        .prepare_cached(sql)?
        .query_map([], |row| {
            Ok(SeriesPoint {
                period: row.get(0)?,
                group: None,
                count: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(series)
}

fn grouped_series(
    conn: &Connection,
    period: Period,
    group: FilterField,
    filters: &FilterSet,
) -> Result<Vec<SeriesPoint>> {
    let predicate = filters.predicate(&[DATE_PRESENT]);
    let params: Vec<&dyn ToSql> = predicate.params.iter().map(|p| p as &dyn ToSql).collect();

    let expr = projected(group.column());
    let sql = format!(
        "SELECT transaction_date, {expr} AS grp, COUNT(*)
         FROM transactions{}
         GROUP BY transaction_date, grp",
        predicate.clause
    );

    let mut buckets: BTreeMap<(String, String), i64> = BTreeMap::new();
    let mut stmt = conn.prepare_cached(&sql)?;
    let mut rows = stmt.query(params.as_slice())?;
    while let Some(row) = rows.next()? {
        let raw: String = row.get(0)?;
        let grp: String = row.get(1)?;
        let count: i64 = row.get(2)?;
        if let Some(key) = period.bucket(&raw) {
            *buckets.entry((key, grp)).or_insert(0) += count;
        }
    }

    Ok(buckets
        .into_iter()
        .map(|((period, group), count)| SeriesPoint {
            period,
            group: Some(group),
            count,
        })
        .collect())
}

/// Clip a period-ascending series to its trailing `window` distinct
/// periods. Grouped series keep every group row inside the window.
fn trailing_window(series: &[SeriesPoint], window: usize) -> Vec<SeriesPoint> {
    let mut periods: Vec<&str> = series.iter().map(|p| p.period.as_str()).collect();
    periods.dedup();
    if periods.len() <= window {
        return series.to_vec();
    }
    let cutoff = periods[periods.len() - window];
    series
        .iter()
        .filter(|p| p.period.as_str() >= cutoff)
        .cloned()
        .collect()
}
