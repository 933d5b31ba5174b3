//! Core identifier types shared across the index

use serde::{Deserialize, Serialize};

/// Internal document identifier.
///
/// Kept at 32 bits so ids can be stored directly in roaring bitmaps,
/// which are optimized for the u32 value space.
pub type DocId = u32;

/// Internal tag identifier, assigned densely from 0.
pub type TagId = u32;

/// Sentinel for "no such document". Never assigned by the dictionary.
pub const INVALID_DOC_ID: DocId = u32::MAX;

/// Sentinel for "no such tag". Never assigned by the dictionary.
pub const INVALID_TAG_ID: TagId = u32::MAX;

/// Byte position into the text data source. 64 bits to support large files.
pub type FileOffset = u64;

/// Set operation applied across the bitmaps of a tag list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryOperation {
    /// Intersection: documents carrying every listed tag
    And,
    /// Union: documents carrying at least one listed tag
    Or,
    /// Symmetric difference: documents carrying an odd number of the listed tags
    Xor,
    /// Difference: documents carrying the first tag but none of the rest
    AndNot,
}

impl QueryOperation {
    /// Parse an operator token, case-insensitively. Returns `None` for
    /// anything that is not one of `AND`, `OR`, `XOR`, `ANDNOT`.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "AND" => Some(QueryOperation::And),
            "OR" => Some(QueryOperation::Or),
            "XOR" => Some(QueryOperation::Xor),
            "ANDNOT" => Some(QueryOperation::AndNot),
            _ => None,
        }
    }
}
