//! tagdex: a tag-based document index
//!
//! Documents carry sets of textual tags; the index answers boolean
//! set-algebra queries ("which documents carry this combination of tags")
//! and per-document lookups ("which tags does this document carry").
//! Tag-to-document membership is kept as one roaring bitmap per tag, so
//! queries are bitmap folds. Ingestion is incremental over an append-only
//! delimited text file, and the whole index can be checkpointed to disk
//! and reopened.

pub mod config;
pub mod error;
pub mod index;
pub mod ingest;
pub mod persist;
pub mod types;

pub use config::IndexConfig;
pub use error::{Result, TagdexError};
pub use index::{Dictionary, ForwardIndex, IndexManager, IngestSummary, InvertedIndex};
pub use ingest::{ParseOutcome, RecordParser};
pub use types::{DocId, FileOffset, QueryOperation, TagId, INVALID_DOC_ID, INVALID_TAG_ID};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
