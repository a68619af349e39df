//! Agent roll-ups (`/agents/top`) and per-agent profiles.
//!
//! The roll-up is a two-stage pattern: rank the agents once, then resolve
//! the per-agent "top value" columns with one batched window query per
//! dimension. Per-agent query loops are never issued.

use std::collections::{BTreeMap, HashMap};

use rusqlite::{Connection, ToSql};
use serde::Serialize;

use propscope_core::error::{AnalyticsError, Result};
use propscope_core::filter::{FilterSet, SqlPredicate};
use propscope_core::period::{month_key, Period};

use crate::timeseries::SeriesPoint;
use crate::{percentage1, projected, table_exists, DateRange, ValueShare};

pub const DEFAULT_AGENT_LIMIT: usize = 50;
pub const MAX_AGENT_LIMIT: usize = 250;

const REG_PRESENT: &str =
    "salesperson_reg_num IS NOT NULL AND salesperson_reg_num NOT IN ('-', '')";
const DATE_PRESENT: &str = "transaction_date IS NOT NULL AND transaction_date NOT IN ('-', '')";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopAgent {
    pub reg_num: String,
    pub name: String,
    pub total_transactions: i64,
    pub last_transaction: Option<String>,
    pub top_property_type: Option<(String, i64)>,
    pub top_transaction_type: Option<(String, i64)>,
    pub top_represented: Option<(String, i64)>,
    pub top_town: Option<(String, i64)>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketShare {
    pub top_agent_market_share: f64,
    pub top10_market_share: f64,
}

#[derive(Debug, Serialize)]
pub struct TopAgentsReport {
    pub total: i64,
    pub showing: usize,
    pub agents: Vec<TopAgent>,
    pub statistics: MarketShare,
}

/// Ranked agents with their top value per dimension.
///
/// Stage 1 ranks by transaction count (precomputed `top_agents` table when
/// no filters and no search; grouped query otherwise). Stage 2 runs
/// exactly four batched window queries, one per dimension, and joins them
/// in memory on the registration number. Ties rank by count descending,
/// value ascending; agents tie by registration number ascending.
pub fn top_agents(
    conn: &Connection,
    limit: usize,
    filters: &FilterSet,
    search: Option<&str>,
) -> Result<TopAgentsReport> {
    if limit < 1 || limit > MAX_AGENT_LIMIT {
        return Err(AnalyticsError::invalid(format!(
            "limit must be between 1 and {MAX_AGENT_LIMIT}"
        )));
    }
    let search = search.map(str::trim).filter(|s| !s.is_empty());

    let fast = filters.is_empty() && search.is_none() && table_exists(conn, "top_agents");
    let (mut agents, total) = if fast {
        ranked_agents_fast(conn, limit)?
    } else {
        ranked_agents_slow(conn, limit, filters, search)?
    };

    let regs: Vec<String> = agents.iter().map(|a| a.reg_num.clone()).collect();
    if !regs.is_empty() {
        let mut property = top_value_per_agent(conn, "property_type", &regs, filters, false)?;
        let mut deal = top_value_per_agent(conn, "transaction_type", &regs, filters, false)?;
        let mut side = top_value_per_agent(conn, "represented", &regs, filters, false)?;
        let mut town = top_value_per_agent(conn, "town", &regs, filters, true)?;

        for agent in &mut agents {
            agent.top_property_type = property.remove(&agent.reg_num);
            agent.top_transaction_type = deal.remove(&agent.reg_num);
            agent.top_represented = side.remove(&agent.reg_num);
            agent.top_town = town.remove(&agent.reg_num);
        }
    }

    let pool: i64 = agents.iter().map(|a| a.total_transactions).sum();
    let statistics = MarketShare {
        top_agent_market_share: percentage1(
            agents.first().map(|a| a.total_transactions).unwrap_or(0),
            pool,
        ),
        top10_market_share: percentage1(
            agents.iter().take(10).map(|a| a.total_transactions).sum(),
            pool,
        ),
    };

    Ok(TopAgentsReport {
        total,
        showing: agents.len(),
        agents,
        statistics,
    })
}

fn ranked_agents_fast(conn: &Connection, limit: usize) -> Result<(Vec<TopAgent>, i64)> {
    tracing::debug!(limit, "top-agents fast path");
    let agents = conn
        .prepare_cached(
            "SELECT reg_num, name, total_transactions, last_transaction
             FROM top_agents
             ORDER BY total_transactions DESC, reg_num ASC
             LIMIT ?",
        )?
        .query_map([limit as i64], |row| {
            Ok(TopAgent {
                reg_num: row.get(0)?,
                name: row.get(1)?,
                total_transactions: row.get(2)?,
                last_transaction: row.get(3)?,
                top_property_type: None,
                top_transaction_type: None,
                top_represented: None,
                top_town: None,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let total: i64 = conn
        .prepare_cached("SELECT COUNT(*) FROM top_agents")?
        .query_row([], |row| row.get(0))?;

    Ok((agents, total))
}

fn ranked_agents_slow(
    conn: &Connection,
    limit: usize,
    filters: &FilterSet,
    search: Option<&str>,
) -> Result<(Vec<TopAgent>, i64)> {
    let mut predicate = SqlPredicate::default();
    predicate.and(REG_PRESENT, []);
    filters.apply(&mut predicate);
    if let Some(needle) = search {
        predicate.and(
            "(instr(lower(salesperson_name), lower(?)) > 0
              OR instr(lower(salesperson_reg_num), lower(?)) > 0)",
            [needle.to_string(), needle.to_string()],
        );
    }

    let name_expr = projected("MAX(salesperson_name)");
    let sql = format!(
        "SELECT salesperson_reg_num, {name_expr} AS name, COUNT(*) AS cnt
         FROM transactions{}
         GROUP BY salesperson_reg_num
         ORDER BY cnt DESC, salesperson_reg_num ASC
         LIMIT ?",
        predicate.clause
    );
    let limit_param = limit as i64;
    let mut params: Vec<&dyn ToSql> = predicate.params.iter().map(|p| p as &dyn ToSql).collect();
    params.push(&limit_param);

    let mut agents = conn
        .prepare_cached(&sql)?
        .query_map(params.as_slice(), |row| {
            Ok(TopAgent {
                reg_num: row.get(0)?,
                name: row.get(1)?,
                total_transactions: row.get(2)?,
                last_transaction: None,
                top_property_type: None,
                top_transaction_type: None,
                top_represented: None,
                top_town: None,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let count_params: Vec<&dyn ToSql> =
        predicate.params.iter().map(|p| p as &dyn ToSql).collect();
    let total: i64 = conn
        .prepare_cached(&format!(
            "SELECT COUNT(DISTINCT salesperson_reg_num) FROM transactions{}",
            predicate.clause
        ))?
        .query_row(count_params.as_slice(), |row| row.get(0))?;

    // One batched pass for the chronologically-last date of each ranked
    // agent (the fast path reads this off the aggregate table).
    let regs: Vec<String> = agents.iter().map(|a| a.reg_num.clone()).collect();
    if !regs.is_empty() {
        let last_dates = last_transaction_per_agent(conn, &regs, filters)?;
        for agent in &mut agents {
            agent.last_transaction = last_dates.get(&agent.reg_num).cloned();
        }
    }

    Ok((agents, total))
}

fn last_transaction_per_agent(
    conn: &Connection,
    regs: &[String],
    filters: &FilterSet,
) -> Result<HashMap<String, String>> {
    let marks = vec!["?"; regs.len()].join(", ");
    let mut predicate = SqlPredicate::default();
    predicate.and(
        &format!("salesperson_reg_num IN ({marks})"),
        regs.iter().cloned(),
    );
    filters.apply(&mut predicate);
    predicate.and(DATE_PRESENT, []);

    let sql = format!(
        "SELECT salesperson_reg_num, transaction_date
         FROM transactions{}
         GROUP BY salesperson_reg_num, transaction_date",
        predicate.clause
    );
    let params: Vec<&dyn ToSql> = predicate.params.iter().map(|p| p as &dyn ToSql).collect();

    let mut latest: HashMap<String, (String, String)> = HashMap::new();
    let mut stmt = conn.prepare_cached(&sql)?;
    let mut rows = stmt.query(params.as_slice())?;
    while let Some(row) = rows.next()? {
        let reg: String = row.get(0)?;
        let raw: String = row.get(1)?;
        if let Some(key) = month_key(&raw) {
            match latest.get(&reg) {
                Some((best, _)) if *best >= key => {}
                _ => {
                    latest.insert(reg, (key, raw));
                }
            }
        }
    }

    Ok(latest
        .into_iter()
        .map(|(reg, (_, raw))| (reg, raw))
        .collect())
}

/// The highest-count value of one column per agent, resolved in a single
/// pass with a partitioned ranking window.
fn top_value_per_agent(
    conn: &Connection,
    column: &str,
    regs: &[String],
    filters: &FilterSet,
    exclude_town_sentinel: bool,
) -> Result<HashMap<String, (String, i64)>> {
    let marks = vec!["?"; regs.len()].join(", ");
    let mut predicate = SqlPredicate::default();
    predicate.and(
        &format!("salesperson_reg_num IN ({marks})"),
        regs.iter().cloned(),
    );
    filters.apply(&mut predicate);
    if exclude_town_sentinel {
        predicate.and("town != '-'", []);
    }

    let expr = projected(column);
    let sql = format!(
        "SELECT reg, value, cnt FROM (
             SELECT salesperson_reg_num AS reg, {expr} AS value, COUNT(*) AS cnt,
                    ROW_NUMBER() OVER (
                        PARTITION BY salesperson_reg_num
                        ORDER BY COUNT(*) DESC, {expr} ASC
                    ) AS pos
             FROM transactions{}
             GROUP BY reg, value
         )
         WHERE pos = 1",
        predicate.clause
    );
    let params: Vec<&dyn ToSql> = predicate.params.iter().map(|p| p as &dyn ToSql).collect();

    let mut top = HashMap::with_capacity(regs.len());
    let mut stmt = conn.prepare_cached(&sql)?;
    let mut rows = stmt.query(params.as_slice())?;
    while let Some(row) = rows.next()? {
        let reg: String = row.get(0)?;
        let value: String = row.get(1)?;
        let count: i64 = row.get(2)?;
        top.insert(reg, (value, count));
    }
    Ok(top)
}

// =============================================================================
// Per-agent profile
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub reg_num: String,
    pub name: String,
    pub total_transactions: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub agent: AgentSummary,
    pub date_range: DateRange,
    pub property_types: Vec<ValueShare>,
    pub transaction_types: Vec<ValueShare>,
    pub representation: Vec<ValueShare>,
    pub top_towns: Vec<ValueShare>,
    pub monthly_activity: Vec<SeriesPoint>,
}

/// Everything the agent detail page needs, each distribution carrying its
/// share of the agent's own total.
pub fn agent_profile(conn: &Connection, reg_num: &str) -> Result<AgentProfile> {
    let name_expr = projected("MAX(salesperson_name)");
    let (name, total): (String, i64) = conn
        .prepare_cached(&format!(
            "SELECT {name_expr}, COUNT(*) FROM transactions WHERE salesperson_reg_num = ?"
        ))?
        .query_row([reg_num], |row| Ok((row.get(0)?, row.get(1)?)))?;

    if total == 0 {
        return Err(AnalyticsError::AgentNotFound(reg_num.to_string()));
    }

    // One grouped pass over the agent's dates covers both the monthly
    // series and the chronological range.
    let mut buckets: BTreeMap<String, i64> = BTreeMap::new();
    let mut earliest: Option<(String, String)> = None;
    let mut latest: Option<(String, String)> = None;
    {
        let sql = format!(
            "SELECT transaction_date, COUNT(*) FROM transactions
             WHERE salesperson_reg_num = ? AND {DATE_PRESENT}
             GROUP BY transaction_date"
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let mut rows = stmt.query([reg_num])?;
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            if let Some(key) = Period::Month.bucket(&raw) {
                *buckets.entry(key.clone()).or_insert(0) += count;
                if earliest.as_ref().map(|(k, _)| *k > key).unwrap_or(true) {
                    earliest = Some((key.clone(), raw.clone()));
                }
                if latest.as_ref().map(|(k, _)| *k < key).unwrap_or(true) {
                    latest = Some((key, raw));
                }
            }
        }
    }

    Ok(AgentProfile {
        agent: AgentSummary {
            reg_num: reg_num.to_string(),
            name,
            total_transactions: total,
        },
        date_range: DateRange {
            earliest: earliest.map(|(_, raw)| raw),
            latest: latest.map(|(_, raw)| raw),
        },
        property_types: agent_distribution(conn, "property_type", reg_num, total, false, None)?,
        transaction_types: agent_distribution(conn, "transaction_type", reg_num, total, false, None)?,
        representation: agent_distribution(conn, "represented", reg_num, total, false, None)?,
        top_towns: agent_distribution(conn, "town", reg_num, total, true, Some(10))?,
        monthly_activity: buckets
            .into_iter()
            .map(|(period, count)| SeriesPoint {
                period,
                group: None,
                count,
            })
            .collect(),
    })
}

fn agent_distribution(
    conn: &Connection,
    column: &str,
    reg_num: &str,
    total: i64,
    exclude_town_sentinel: bool,
    limit: Option<usize>,
) -> Result<Vec<ValueShare>> {
    let expr = projected(column);
    let sentinel = if exclude_town_sentinel {
        " AND town != '-'"
    } else {
        ""
    };
    let limit_clause = limit.map(|n| format!(" LIMIT {n}")).unwrap_or_default();
    let sql = format!(
        "SELECT {expr} AS value, COUNT(*) AS cnt
         FROM transactions
         WHERE salesperson_reg_num = ?{sentinel}
         GROUP BY value
         ORDER BY cnt DESC, value ASC{limit_clause}"
    );

    let shares = conn
        .prepare_cached(&sql)?
        .query_map([reg_num], |row| {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precompute::rebuild_aggregates;
    use crate::testdata::{insert, memory_store, three_row_corpus, TxRow};

    #[test]
    fn test_spec_scenario_ranking() {
        let conn = memory_store();
        three_row_corpus(&conn);

        let report = top_agents(&conn, 10, &FilterSet::none(), None).unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.showing, 2);

        let first = &report.agents[0];
        assert_eq!(first.reg_num, "A");
        assert_eq!(first.total_transactions, 2);
        assert_eq!(
            first.top_property_type,
            Some(("HDB".to_string(), 2))
        );
        assert_eq!(report.agents[1].reg_num, "B");
    }

    #[test]
    fn test_ties_rank_by_reg_num_ascending() {
        let conn = memory_store();
        for reg in ["Z9", "A1", "M5"] {
            insert(
                &conn,
                &TxRow {
                    reg_num: Some(reg),
                    date: Some("JAN-2024"),
                    ..Default::default()
                },
            );
        }

        let report = top_agents(&conn, 10, &FilterSet::none(), None).unwrap();
        let regs: Vec<&str> = report.agents.iter().map(|a| a.reg_num.as_str()).collect();
        assert_eq!(regs, vec!["A1", "M5", "Z9"]);

        // Stable across repeated requests.
        let again = top_agents(&conn, 10, &FilterSet::none(), None).unwrap();
        let regs_again: Vec<&str> = again.agents.iter().map(|a| a.reg_num.as_str()).collect();
        assert_eq!(regs, regs_again);
    }

    #[test]
    fn test_last_transaction_is_chronological_not_lexicographic() {
        let conn = memory_store();
        // "FEB-2024" > "DEC-2024" lexicographically; chronology says DEC.
        for date in ["FEB-2024", "DEC-2024"] {
            insert(
                &conn,
                &TxRow {
                    reg_num: Some("R1"),
                    date: Some(date),
                    ..Default::default()
                },
            );
        }

        let report = top_agents(&conn, 10, &FilterSet::none(), None).unwrap();
        assert_eq!(
            report.agents[0].last_transaction.as_deref(),
            Some("DEC-2024")
        );
    }

    #[test]
    fn test_search_matches_name_and_reg_case_insensitive() {
        let conn = memory_store();
        three_row_corpus(&conn);

        let by_name = top_agents(&conn, 10, &FilterSet::none(), Some("alice")).unwrap();
        assert_eq!(by_name.showing, 1);
        assert_eq!(by_name.agents[0].reg_num, "A");

        let by_reg = top_agents(&conn, 10, &FilterSet::none(), Some("b")).unwrap();
        assert!(by_reg.agents.iter().any(|a| a.reg_num == "B"));
    }

    #[test]
    fn test_sentinel_reg_nums_excluded() {
        let conn = memory_store();
        three_row_corpus(&conn);
        insert(
            &conn,
            &TxRow {
                reg_num: Some("-"),
                ..Default::default()
            },
        );
        insert(&conn, &TxRow::default());

        let report = top_agents(&conn, 10, &FilterSet::none(), None).unwrap();
        assert_eq!(report.total, 2);
    }

    #[test]
    fn test_top_town_excludes_sentinel() {
        let conn = memory_store();
        for _ in 0..3 {
            insert(
                &conn,
                &TxRow {
                    reg_num: Some("R1"),
                    town: Some("-"),
                    ..Default::default()
                },
            );
        }
        insert(
            &conn,
            &TxRow {
                reg_num: Some("R1"),
                town: Some("Yishun"),
                ..Default::default()
            },
        );

        let report = top_agents(&conn, 10, &FilterSet::none(), None).unwrap();
        assert_eq!(
            report.agents[0].top_town,
            Some(("Yishun".to_string(), 1))
        );
    }

    #[test]
    fn test_market_share_statistics() {
        let conn = memory_store();
        three_row_corpus(&conn);

        let report = top_agents(&conn, 10, &FilterSet::none(), None).unwrap();
        // Agent A holds 2 of the 3 transactions in the ranked pool.
        assert_eq!(report.statistics.top_agent_market_share, 66.7);
        assert_eq!(report.statistics.top10_market_share, 100.0);
    }

    #[test]
    fn test_empty_result_yields_zero_shares() {
        let conn = memory_store();
        let report = top_agents(&conn, 10, &FilterSet::none(), Some("nobody")).unwrap();
        assert_eq!(report.showing, 0);
        assert_eq!(report.statistics.top_agent_market_share, 0.0);
        assert_eq!(report.statistics.top10_market_share, 0.0);
    }

    #[test]
    fn test_fast_path_matches_slow_path() {
        let mut conn = memory_store();
        three_row_corpus(&conn);

        let slow = top_agents(&conn, 10, &FilterSet::none(), None).unwrap();
        rebuild_aggregates(&mut conn).unwrap();
        let fast = top_agents(&conn, 10, &FilterSet::none(), None).unwrap();

        assert_eq!(
            serde_json::to_value(&slow).unwrap(),
            serde_json::to_value(&fast).unwrap()
        );
    }

    #[test]
    fn test_limit_out_of_range() {
        let conn = memory_store();
        assert!(top_agents(&conn, 0, &FilterSet::none(), None).is_err());
        assert!(top_agents(&conn, MAX_AGENT_LIMIT + 1, &FilterSet::none(), None).is_err());
    }

    #[test]
    fn test_profile() {
        let conn = memory_store();
        three_row_corpus(&conn);

        let profile = agent_profile(&conn, "A").unwrap();
        assert_eq!(profile.agent.name, "Alice Tan");
        assert_eq!(profile.agent.total_transactions, 2);
        assert_eq!(profile.date_range.earliest.as_deref(), Some("JAN-2024"));
        assert_eq!(profile.date_range.latest.as_deref(), Some("FEB-2024"));
        assert_eq!(profile.property_types[0].value, "HDB");
        assert_eq!(profile.property_types[0].percentage, 100.0);
        assert_eq!(profile.representation.len(), 2);
        assert_eq!(profile.representation[0].percentage, 50.0);
        assert_eq!(profile.monthly_activity.len(), 2);
        assert_eq!(profile.monthly_activity[0].period, "2024-01");
    }

    #[test]
    fn test_profile_unknown_agent() {
        let conn = memory_store();
        three_row_corpus(&conn);

        let err = agent_profile(&conn, "ZZZ").unwrap_err();
        assert!(matches!(err, AnalyticsError::AgentNotFound(_)));
    }

    #[test]
    fn test_profile_top_towns_capped_and_sentinel_free() {
        let conn = memory_store();
        for i in 0..12 {
            insert(
                &conn,
                &TxRow {
                    reg_num: Some("R1"),
                    town: Some(&format!("Town{i:02}")),
                    ..Default::default()
                },
            );
        }
        insert(
            &conn,
            &TxRow {
                reg_num: Some("R1"),
                town: Some("-"),
                ..Default::default()
            },
        );

        let profile = agent_profile(&conn, "R1").unwrap();
        assert_eq!(profile.top_towns.len(), 10);
        assert!(profile.top_towns.iter().all(|t| t.value != "-"));
    }
}
