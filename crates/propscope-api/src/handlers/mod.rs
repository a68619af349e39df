//! Endpoint handlers.

pub mod agents;
pub mod analytics;
pub mod cache_admin;
pub mod data;
pub mod datasets;
pub mod health;
pub mod insights;
pub mod stats;
pub mod timeseries;

use propscope_core::error::{AnalyticsError, Result};

/// Parse an optional numeric query parameter, falling back to a default.
/// Anything non-numeric is an invalid argument, not a silent default.
pub(crate) fn parse_count(raw: Option<&str>, default: usize, name: &str) -> Result<usize> {
    match raw {
        None => Ok(default),
        Some("") => Ok(default),
        Some(s) => s
            .parse()
            .map_err(|_| AnalyticsError::invalid(format!("{name} must be a positive integer"))),
    }
}
