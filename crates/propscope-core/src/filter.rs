//! The filter grammar and WHERE-clause builder.
//!
//! Filters arrive as one opaque query parameter holding a JSON object:
//! keys are filterable column names, values are a scalar string or an
//! array of strings. Keys conjoin with AND; array values disjoin with IN.
//! Values only ever reach SQL as bound parameters.

use serde_json::Value;

use crate::error::{AnalyticsError, Result};
use crate::fields::FilterField;

/// A single parsed filter term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `column = value`
    Scalar(FilterField, String),
    /// `column IN (values...)`
    Set(FilterField, Vec<String>),
}

impl Filter {
    pub fn field(&self) -> FilterField {
        match self {
            Filter::Scalar(f, _) => *f,
            Filter::Set(f, _) => *f,
        }
    }
}

/// The conjunction of all filter terms on a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    terms: Vec<Filter>,
}

impl FilterSet {
    /// The empty filter: matches every row.
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse the wire-format JSON object. `None` means "no filter", which
    /// is distinct from a malformed filter string (an error).
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let raw = match raw {
            None => return Ok(Self::none()),
            Some(r) if r.trim().is_empty() => return Ok(Self::none()),
            Some(r) => r,
        };

        let object: serde_json::Map<String, Value> = serde_json::from_str(raw)
            .map_err(|e| AnalyticsError::invalid(format!("Malformed filters JSON: {e}")))?;

        let mut terms = Vec::with_capacity(object.len());
        for (key, value) in object {
            let field = FilterField::parse(&key)?;
            match value {
                Value::String(s) => terms.push(Filter::Scalar(field, s)),
                Value::Array(items) => {
                    if items.is_empty() {
                        return Err(AnalyticsError::invalid(format!(
                            "Filter for '{key}' must not be an empty list"
                        )));
                    }
                    let values = items
                        .into_iter()
                        .map(|item| match item {
                            Value::String(s) => Ok(s),
                            other => Err(AnalyticsError::invalid(format!(
                                "Filter values for '{key}' must be strings, got {other}"
                            ))),
                        })
                        .collect::<Result<Vec<_>>>()?;
                    terms.push(Filter::Set(field, values));
                }
                other => {
                    return Err(AnalyticsError::invalid(format!(
                        "Filter for '{key}' must be a string or list of strings, got {other}"
                    )))
                }
            }
        }

        Ok(Self { terms })
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[Filter] {
        &self.terms
    }

    /// Assemble the predicate for this filter set.
    ///
    /// `extra` holds additional conjunct clauses (no parameters) the caller
    /// needs, e.g. sentinel exclusions.
    pub fn predicate(&self, extra: &[&str]) -> SqlPredicate {
        let mut predicate = SqlPredicate::default();
        self.apply(&mut predicate);
        for clause in extra {
            predicate.and(clause, []);
        }
        predicate
    }

    /// Conjoin this filter set onto an existing predicate.
    pub fn apply(&self, predicate: &mut SqlPredicate) {
        for term in &self.terms {
            match term {
                Filter::Scalar(field, value) => {
                    predicate.and(&format!("{} = ?", field.column()), [value.clone()]);
                }
                Filter::Set(field, values) => {
                    let marks = vec!["?"; values.len()].join(", ");
                    predicate.and(
                        &format!("{} IN ({})", field.column(), marks),
                        values.iter().cloned(),
                    );
                }
            }
        }
    }
}

/// A rendered WHERE clause with its bound parameters, in placeholder order.
///
/// The clause starts with `" WHERE "` (or is empty) so callers can append
/// it directly after a FROM clause. Parameters must be bound in clause
/// order, before any parameters the caller appends afterwards.
#[derive(Debug, Clone, Default)]
pub struct SqlPredicate {
    pub clause: String,
    pub params: Vec<String>,
}

impl SqlPredicate {
    /// Conjoin one clause, with its bound parameters in placeholder order.
    pub fn and(&mut self, clause: &str, params: impl IntoIterator<Item = String>) {
        if self.clause.is_empty() {
            self.clause = format!(" WHERE {clause}");
        } else {
            self.clause.push_str(" AND ");
            self.clause.push_str(clause);
        }
        self.params.extend(params);
    }

    /// Parameter references suitable for `rusqlite` positional binding.
    pub fn param_refs(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_and_blank_mean_no_filter() {
        assert!(FilterSet::parse(None).unwrap().is_empty());
        assert!(FilterSet::parse(Some("")).unwrap().is_empty());
        assert!(FilterSet::parse(Some("   ")).unwrap().is_empty());
    }

    #[test]
    fn test_scalar_and_set_terms() {
        let filters =
            FilterSet::parse(Some(r#"{"property_type":["HDB","LANDED"],"town":"Punggol"}"#))
                .unwrap();
        assert_eq!(filters.terms().len(), 2);

        let predicate = filters.predicate(&[]);
        assert_eq!(
            predicate.clause,
            " WHERE property_type IN (?, ?) AND town = ?"
        );
        assert_eq!(predicate.params, vec!["HDB", "LANDED", "Punggol"]);
    }

    #[test]
    fn test_empty_filter_renders_no_where() {
        let predicate = FilterSet::none().predicate(&[]);
        assert_eq!(predicate.clause, "");
        assert!(predicate.params.is_empty());
    }

    #[test]
    fn test_extra_clauses_without_filters() {
        let predicate = FilterSet::none().predicate(&["transaction_date != '-'"]);
        assert_eq!(predicate.clause, " WHERE transaction_date != '-'");
    }

    #[test]
    fn test_extra_clauses_conjoin_after_filters() {
        let filters = FilterSet::parse(Some(r#"{"district":"19"}"#)).unwrap();
        let predicate = filters.predicate(&["town != '-'"]);
        assert_eq!(predicate.clause, " WHERE district = ? AND town != '-'");
        assert_eq!(predicate.params, vec!["19"]);
    }

    #[test]
    fn test_and_composes_with_params() {
        let mut predicate = SqlPredicate::default();
        predicate.and("salesperson_reg_num IN (?, ?)", ["A".into(), "B".into()]);
        FilterSet::parse(Some(r#"{"town":"Punggol"}"#))
            .unwrap()
            .apply(&mut predicate);

        assert_eq!(
            predicate.clause,
            " WHERE salesperson_reg_num IN (?, ?) AND town = ?"
        );
        assert_eq!(predicate.params, vec!["A", "B", "Punggol"]);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = FilterSet::parse(Some(r#"{"salesperson_name":"x"}"#)).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidArgument(_)));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = FilterSet::parse(Some("{not json")).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidArgument(_)));
    }

    #[test]
    fn test_non_string_values_rejected() {
        assert!(FilterSet::parse(Some(r#"{"town":3}"#)).is_err());
        assert!(FilterSet::parse(Some(r#"{"town":["a",1]}"#)).is_err());
        assert!(FilterSet::parse(Some(r#"{"town":{"x":"y"}}"#)).is_err());
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(FilterSet::parse(Some(r#"{"town":[]}"#)).is_err());
    }
}
