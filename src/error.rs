use std::path::PathBuf;

use thiserror::Error;

/// Main error type for tagdex operations
#[derive(Error, Debug)]
pub enum TagdexError {
    #[error("dictionary id space exhausted")]
    DictionaryFull,

    #[error("data file not found: {0}")]
    MissingDataFile(PathBuf),

    #[error("fatal stream error during ingestion: {0}")]
    Stream(#[source] std::io::Error),

    #[error("checkpoint read failed: {0}")]
    CheckpointRead(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for tagdex operations
pub type Result<T> = std::result::Result<T, TagdexError>;
