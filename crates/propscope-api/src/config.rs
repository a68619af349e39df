//! Server configuration from environment variables.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PROPSCOPE_DATA_DIR` | required | Root data directory |
//! | `PROPSCOPE_PORT` | 8080 | Listen port |
//! | `PROPSCOPE_CORS_ORIGINS` | unset | Comma-separated origin allow-list; unset means permissive |
//! | `PROPSCOPE_READ_POOL_SIZE` | 4 | Pooled read connections |
//! | `PROPSCOPE_QUERY_BUDGET_SECS` | 30 | Per-request wall-clock budget |

use std::path::PathBuf;
use std::time::Duration;

use propscope_core::error::{AnalyticsError, Result};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_READ_POOL_SIZE: usize = 4;
pub const DEFAULT_QUERY_BUDGET_SECS: u64 = 30;

/// Name of the store file under `<data-dir>/processed/`.
pub const STORE_FILE: &str = "cea-transactions.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub port: u16,
    /// `None` means permissive CORS.
    pub cors_origins: Option<Vec<String>>,
    pub read_pool_size: usize,
    pub query_budget: Duration,
}

impl Config {
    /// Read configuration from the environment. Only the data directory
    /// is required; everything else falls back to defaults.
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("PROPSCOPE_DATA_DIR")
            .map(PathBuf::from)
            .map_err(|_| AnalyticsError::Internal("PROPSCOPE_DATA_DIR is not set".to_string()))?;

        let cors_origins = std::env::var("PROPSCOPE_CORS_ORIGINS").ok().map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        Ok(Self {
            data_dir,
            port: env_parse("PROPSCOPE_PORT", DEFAULT_PORT),
            cors_origins,
            read_pool_size: env_parse("PROPSCOPE_READ_POOL_SIZE", DEFAULT_READ_POOL_SIZE),
            query_budget: Duration::from_secs(env_parse(
                "PROPSCOPE_QUERY_BUDGET_SECS",
                DEFAULT_QUERY_BUDGET_SECS,
            )),
        })
    }

    /// Directory holding the store file and the dataset catalog.
    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }

    pub fn store_path(&self) -> PathBuf {
        self.processed_dir().join(STORE_FILE)
    }
}

/// Parse an environment variable with a default fallback.
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let config = Config {
            data_dir: PathBuf::from("/srv/propscope/data"),
            port: DEFAULT_PORT,
            cors_origins: None,
            read_pool_size: DEFAULT_READ_POOL_SIZE,
            query_budget: Duration::from_secs(DEFAULT_QUERY_BUDGET_SECS),
        };
        assert_eq!(
            config.store_path(),
            PathBuf::from("/srv/propscope/data/processed/cea-transactions.db")
        );
    }

    #[test]
    fn test_env_parse_fallback() {
        assert_eq!(env_parse("PROPSCOPE_TEST_UNSET_VAR", 7usize), 7);
    }
}
