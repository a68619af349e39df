//! Enumerated allow-lists of queryable columns.
//!
//! Column names are never spliced from client input: every field a request
//! can name must resolve through one of these enums first, and the enum
//! supplies the SQL identifier.

use crate::error::{AnalyticsError, Result};

/// Columns a client may filter or group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    PropertyType,
    TransactionType,
    Represented,
    Town,
    District,
}

impl FilterField {
    /// All filterable fields, in stable declaration order.
    pub const ALL: [FilterField; 5] = [
        FilterField::PropertyType,
        FilterField::TransactionType,
        FilterField::Represented,
        FilterField::Town,
        FilterField::District,
    ];

    /// The SQL column this field maps to.
    pub fn column(&self) -> &'static str {
        match self {
            FilterField::PropertyType => "property_type",
            FilterField::TransactionType => "transaction_type",
            FilterField::Represented => "represented",
            FilterField::Town => "town",
            FilterField::District => "district",
        }
    }

    /// Resolve a wire-format key to a field.
    pub fn parse(key: &str) -> Result<Self> {
        FilterField::ALL
            .iter()
            .copied()
            .find(|f| f.column() == key)
            .ok_or_else(|| AnalyticsError::invalid(format!("Unknown filter field: {key}")))
    }
}

impl std::fmt::Display for FilterField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// Columns a client may request a value distribution for.
///
/// A superset of [`FilterField`]: location and date columns are valid
/// distribution targets even though not all of them are filterable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatField {
    PropertyType,
    TransactionType,
    Represented,
    Town,
    District,
    GeneralLocation,
    TransactionDate,
}

impl StatField {
    pub const ALL: [StatField; 7] = [
        StatField::PropertyType,
        StatField::TransactionType,
        StatField::Represented,
        StatField::Town,
        StatField::District,
        StatField::GeneralLocation,
        StatField::TransactionDate,
    ];

    pub fn column(&self) -> &'static str {
        match self {
            StatField::PropertyType => "property_type",
            StatField::TransactionType => "transaction_type",
            StatField::Represented => "represented",
            StatField::Town => "town",
            StatField::District => "district",
            StatField::GeneralLocation => "general_location",
            StatField::TransactionDate => "transaction_date",
        }
    }

    pub fn parse(key: &str) -> Result<Self> {
        StatField::ALL
            .iter()
            .copied()
            .find(|f| f.column() == key)
            .ok_or_else(|| AnalyticsError::invalid(format!("Unknown field: {key}")))
    }

    /// Whether the sentinel `-` row group is excluded from this field's
    /// distribution. Only towns carry that convention.
    pub fn excludes_sentinel(&self) -> bool {
        matches!(self, StatField::Town)
    }
}
