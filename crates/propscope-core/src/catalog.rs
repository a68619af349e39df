//! The dataset catalog published next to the store file.
//!
//! `datasets.json` lists the datasets a deployment serves; an optional
//! `<dataset-id>.json` snapshot carries the richer metadata document
//! (schema, visualization recommendations) for the detail endpoint.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AnalyticsError, Result};

/// Contents of `datasets.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetCatalog {
    pub version: String,
    pub last_updated: String,
    pub datasets: Vec<DatasetEntry>,
    #[serde(skip)]
    dir: PathBuf,
}

/// One catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// The optional per-dataset metadata snapshot (`<id>.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSnapshot {
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub schema: Option<Value>,
    #[serde(default)]
    pub visualization_recommendations: Option<Value>,
}

impl DatasetCatalog {
    /// Load `datasets.json` from the processed-data directory.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join("datasets.json");
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            AnalyticsError::Internal(format!("Cannot read {}: {e}", path.display()))
        })?;
        let mut catalog: DatasetCatalog = serde_json::from_str(&raw)?;
        catalog.dir = dir.to_path_buf();
        Ok(catalog)
    }

    /// Look up a dataset by id; unknown ids are a not-found error.
    pub fn entry(&self, id: &str) -> Result<&DatasetEntry> {
        self.datasets
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| AnalyticsError::DatasetNotFound(id.to_string()))
    }

    /// Load the optional `<id>.json` snapshot for a known dataset.
    pub fn snapshot(&self, id: &str) -> Result<DatasetSnapshot> {
        self.entry(id)?;
        let path = self.dir.join(format!("{id}.json"));
        match std::fs::read_to_string(&path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DatasetSnapshot::default()),
            Err(e) => Err(AnalyticsError::Internal(format!(
                "Cannot read {}: {e}",
                path.display()
            ))),
        }
    }
}
