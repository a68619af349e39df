//! Propscope Core
//!
//! Core types, the filter grammar, period normalization, and the SQLite
//! schema shared by the Propscope analytics service.

pub mod catalog;
pub mod error;
pub mod fields;
pub mod filter;
pub mod period;
pub mod schema;

pub use error::{AnalyticsError, Result};
pub use fields::{FilterField, StatField};
pub use filter::{Filter, FilterSet, SqlPredicate};
pub use period::Period;
