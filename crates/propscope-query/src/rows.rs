//! Paginated access to raw transaction rows.

use rusqlite::{Connection, ToSql};
use serde::Serialize;

use propscope_core::error::{AnalyticsError, Result};
use propscope_core::filter::FilterSet;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

/// One raw row, column names as stored.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub salesperson_name: Option<String>,
    pub salesperson_reg_num: Option<String>,
    pub transaction_date: Option<String>,
    pub property_type: Option<String>,
    pub transaction_type: Option<String>,
    pub represented: Option<String>,
    pub town: Option<String>,
    pub district: Option<String>,
    pub general_location: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct RowPage {
    pub data: Vec<TransactionRow>,
    pub pagination: Pagination,
}

/// Fetch rows `[(page-1)*limit, page*limit)` under the given filters.
///
/// `total` is the post-filter count, obtained by a separate COUNT against
/// the same predicate; the page query itself never materializes more than
/// `limit` rows.
pub fn fetch_rows(
    conn: &Connection,
    filters: &FilterSet,
    page: usize,
    limit: usize,
) -> Result<RowPage> {
    if page < 1 {
        return Err(AnalyticsError::invalid("page must be >= 1"));
    }
    if limit < 1 || limit > MAX_PAGE_SIZE {
        return Err(AnalyticsError::invalid(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    let predicate = filters.predicate(&[]);

    let total: i64 = {
        let sql = format!("SELECT COUNT(*) FROM transactions{}", predicate.clause);
        let params: Vec<&dyn ToSql> = predicate.params.iter().map(|p| p as &dyn ToSql).collect();
        conn.prepare_cached(&sql)?
            .query_row(params.as_slice(), |row| row.get(0))?
    };

    let offset = ((page - 1) * limit) as i64;
    let page_limit = limit as i64;
    let sql = format!(
        "SELECT id, salesperson_name, salesperson_reg_num, transaction_date,
                property_type, transaction_type, represented, town, district,
                general_location
         FROM transactions{}
         ORDER BY id
         LIMIT ? OFFSET ?",
        predicate.clause
    );
    let mut params: Vec<&dyn ToSql> = predicate.params.iter().map(|p| p as &dyn ToSql).collect();
    params.push(&page_limit);
    params.push(&offset);

    let data = conn
        .prepare_cached(&sql)?
        .query_map(params.as_slice(), |row| {
            Ok(TransactionRow {
                id: row.get(0)?,
                salesperson_name: row.get(1)?,
                salesperson_reg_num: row.get(2)?,
                transaction_date: row.get(3)?,
                property_type: row.get(4)?,
                transaction_type: row.get(5)?,
                represented: row.get(6)?,
                town: row.get(7)?,
                district: row.get(8)?,
                general_location: row.get(9)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let total_pages = (total + limit as i64 - 1) / limit as i64;

    Ok(RowPage {
        data,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::{insert, memory_store, three_row_corpus, TxRow};

    #[test]
    fn test_pagination_metadata() {
        let conn = memory_store();
        three_row_corpus(&conn);

        let page = fetch_rows(&conn, &FilterSet::none(), 1, 2).unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.pagination.page, 1);
        assert_eq!(page.pagination.limit, 2);
        assert_eq!(page.pagination.total, 3);
        assert_eq!(page.pagination.total_pages, 2);
    }

    #[test]
    fn test_pages_concatenate_without_gaps_or_duplicates() {
        let conn = memory_store();
        for i in 0..7 {
            insert(
                &conn,
                &TxRow {
                    reg_num: Some(&format!("R{i}")),
                    ..Default::default()
                },
            );
        }

        let mut seen = Vec::new();
        for page in 1..=4 {
            let result = fetch_rows(&conn, &FilterSet::none(), page, 2).unwrap();
            seen.extend(result.data.iter().map(|r| r.id));
        }
        assert_eq!(seen.len(), 7);
        let mut deduped = seen.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), 7);
    }

    #[test]
    fn test_filtered_total() {
        let conn = memory_store();
        three_row_corpus(&conn);

        let filters = FilterSet::parse(Some(r#"{"property_type":"HDB"}"#)).unwrap();
        let page = fetch_rows(&conn, &filters, 1, 50).unwrap();
        assert_eq!(page.pagination.total, 2);
        assert!(page.data.iter().all(|r| r.property_type.as_deref() == Some("HDB")));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let conn = memory_store();
        assert!(fetch_rows(&conn, &FilterSet::none(), 0, 50).is_err());
        assert!(fetch_rows(&conn, &FilterSet::none(), 1, 0).is_err());
        assert!(fetch_rows(&conn, &FilterSet::none(), 1, MAX_PAGE_SIZE + 1).is_err());
    }

    #[test]
    fn test_past_the_end_page_is_empty_success() {
        let conn = memory_store();
        three_row_corpus(&conn);

        let page = fetch_rows(&conn, &FilterSet::none(), 9, 50).unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.pagination.total, 3);
    }
}
