//! One- and two-dimension cross-tabs (`/analytics`).

use rusqlite::{Connection, ToSql};
use serde::Serialize;
use serde_json::{json, Value};

use propscope_core::error::Result;
use propscope_core::fields::FilterField;
use propscope_core::filter::FilterSet;

use crate::projected;

/// Chart-ready `{name, value}` pair.
#[derive(Debug, Clone, Serialize)]
pub struct ChartPoint {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossTab {
    pub dimensions: Vec<String>,
    /// Rows keyed by the dimension column names, plus `count`.
    pub data: Vec<Value>,
    pub chart_data: Vec<ChartPoint>,
    pub total: i64,
}

/// Group the filtered rows by one or two dimensions.
///
/// Output is ordered by count descending; ties break lexicographically by
/// the dimension values. NULL and empty dimension values project to
/// `Unknown`.
pub fn cross_tab(
    conn: &Connection,
    dim1: FilterField,
    dim2: Option<FilterField>,
    filters: &FilterSet,
) -> Result<CrossTab> {
    let predicate = filters.predicate(&[]);
    let params: Vec<&dyn ToSql> = predicate.params.iter().map(|p| p as &dyn ToSql).collect();

    let total: i64 = conn
        .prepare_cached(&format!(
            "SELECT COUNT(*) FROM transactions{}",
            predicate.clause
        ))?
        .query_row(params.as_slice(), |row| row.get(0))?;

    let expr1 = projected(dim1.column());

    let (data, chart_data) = match dim2 {
        None => {
            let sql = format!(
                "SELECT {expr1} AS v1, COUNT(*) AS cnt
                 FROM transactions{}
                 GROUP BY v1
                 ORDER BY cnt DESC, v1 ASC",
                predicate.clause
            );
            let rows = conn
                .prepare_cached(&sql)?
                .query_map(params.as_slice(), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let data = rows
                .iter()
                .map(|(value, count)| {
                    let mut object = serde_json::Map::new();
                    object.insert(dim1.column().to_string(), json!(value));
                    object.insert("count".to_string(), json!(count));
                    Value::Object(object)
                })
                .collect();
            let chart = rows
                .into_iter()
                .map(|(value, count)| ChartPoint {
                    name: value,
                    value: count,
                })
                .collect();
            (data, chart)
        }
        Some(dim2) => {
            let expr2 = projected(dim2.column());
            let sql = format!(
                "SELECT {expr1} AS v1, {expr2} AS v2, COUNT(*) AS cnt
                 FROM transactions{}
                 GROUP BY v1, v2
                 ORDER BY cnt DESC, v1 ASC, v2 ASC",
                predicate.clause
            );
            let rows = conn
                .prepare_cached(&sql)?
                .query_map(params.as_slice(), |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let data = rows
                .iter()
                .map(|(v1, v2, count)| {
                    let mut object = serde_json::Map::new();
                    object.insert(dim1.column().to_string(), json!(v1));
                    object.insert(dim2.column().to_string(), json!(v2));
                    object.insert("count".to_string(), json!(count));
                    Value::Object(object)
                })
                .collect();
            let chart = rows
                .into_iter()
                .map(|(v1, v2, count)| ChartPoint {
                    name: format!("{v1} / {v2}"),
                    value: count,
                })
                .collect();
            (data, chart)
        }
    };

    let mut dimensions = vec![dim1.column().to_string()];
    if let Some(d) = dim2 {
        dimensions.push(d.column().to_string());
    }

    Ok(CrossTab {
        dimensions,
        data,
        chart_data,
        total,
    })
}
