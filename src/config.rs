use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for an [`IndexManager`](crate::IndexManager)
///
/// Points at the delimited data source, the status file that tracks how far
/// ingestion has progressed, and the field delimiter used by the source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Path to the append-only delimited data file
    pub data_path: PathBuf,
    /// Path to the status file holding the last processed byte offset
    pub status_path: PathBuf,
    /// Single-byte field delimiter within a data line
    pub delimiter: u8,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data.csv"),
            status_path: PathBuf::from("index_status.txt"),
            delimiter: b'|',
        }
    }
}

impl IndexConfig {
    /// Create a configuration for the given data file, keeping the default
    /// status file and delimiter.
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            ..Default::default()
        }
    }

    /// Set the status file path
    pub fn with_status_path(mut self, status_path: impl Into<PathBuf>) -> Self {
        self.status_path = status_path.into();
        self
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
}
