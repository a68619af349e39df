//! The market-insights composite (`/insights`).

use rusqlite::{Connection, ToSql};
use serde::Serialize;

use propscope_core::error::Result;
use propscope_core::filter::FilterSet;
use propscope_core::period::Period;

use crate::timeseries::period_counts;
use crate::{percentage1, projected, round1, DateRange, ValueShare};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsSummary {
    pub total_transactions: i64,
    pub date_range: DateRange,
    pub monthly_average: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsTrends {
    pub yearly_growth: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsDistributions {
    pub property_types: Vec<ValueShare>,
    pub transaction_types: Vec<ValueShare>,
    pub representation: Vec<ValueShare>,
}

#[derive(Debug, Serialize)]
pub struct MarketInsights {
    pub summary: InsightsSummary,
    pub trends: InsightsTrends,
    pub distributions: InsightsDistributions,
}

/// One response composed of overall totals, the observed date range, the
/// three categorical distributions, and trend figures derived from the
/// plain time series.
pub fn market_insights(conn: &Connection, filters: &FilterSet) -> Result<MarketInsights> {
    let predicate = filters.predicate(&[]);
    let params: Vec<&dyn ToSql> = predicate.params.iter().map(|p| p as &dyn ToSql).collect();

    let total: i64 = conn
        .prepare_cached(&format!(
            "SELECT COUNT(*) FROM transactions{}",
            predicate.clause
        ))?
        .query_row(params.as_slice(), |row| row.get(0))?;

    // First and last raw dates, in source order (the raw column compares
    // lexicographically; the value is echoed back in MMM-YYYY form).
    let dated = filters.predicate(&["transaction_date IS NOT NULL AND transaction_date NOT IN ('-', '')"]);
    let dated_params: Vec<&dyn ToSql> = dated.params.iter().map(|p| p as &dyn ToSql).collect();
    let date_range = conn
        .prepare_cached(&format!(
            "SELECT MIN(transaction_date), MAX(transaction_date) FROM transactions{}",
            dated.clause
        ))?
        .query_row(dated_params.as_slice(), |row| {
            Ok(DateRange {
                earliest: row.get(0)?,
                latest: row.get(1)?,
            })
        })?;

    let distributions = InsightsDistributions {
        property_types: distribution(conn, "property_type", filters, total)?,
        transaction_types: distribution(conn, "transaction_type", filters, total)?,
        representation: distribution(conn, "represented", filters, total)?,
    };

    let monthly = period_counts(conn, Period::Month, filters)?;
    let monthly_average = if monthly.is_empty() {
        0
    } else {
        let sum: i64 = monthly.values().sum();
        (sum as f64 / monthly.len() as f64).round() as i64
    };

    let yearly = period_counts(conn, Period::Year, filters)?;
    let yearly_growth = yearly_growth(&yearly);

    Ok(MarketInsights {
        summary: InsightsSummary {
            total_transactions: total,
            date_range,
            monthly_average,
        },
        trends: InsightsTrends { yearly_growth },
        distributions,
    })
}

fn distribution(
    conn: &Connection,
    column: &str,
    filters: &FilterSet,
    total: i64,
) -> Result<Vec<ValueShare>> {
    let predicate = filters.predicate(&[]);
    let params: Vec<&dyn ToSql> = predicate.params.iter().map(|p| p as &dyn ToSql).collect();

    let expr = projected(column);
    let sql = format!(
        "SELECT {expr} AS value, COUNT(*) AS cnt
         FROM transactions{}
         GROUP BY value
         ORDER BY cnt DESC, value ASC",
        predicate.clause
    );

    let shares = conn
        .prepare_cached(&sql)?
        .query_map(params.as_slice(), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .map(|(value, count)| ValueShare {
            value,
            count,
            percentage: percentage1(count, total),
        })
        .collect();
    Ok(shares)
}

/// `(last − prev) / prev × 100` over the final two years, one decimal,
/// with a trailing `%`. Fewer than two years, or a zero previous year,
/// reports `0%`.
fn yearly_growth(yearly: &std::collections::BTreeMap<String, i64>) -> String {
    let counts: Vec<i64> = yearly.values().copied().collect();
    if counts.len() < 2 {
        return "0%".to_string();
    }
    let prev = counts[counts.len() - 2];
    let last = counts[counts.len() - 1];
    if prev == 0 {
        return "0%".to_string();
    }
    let growth = round1((last - prev) as f64 / prev as f64 * 100.0);
    format!("{growth:.1}%")
}
