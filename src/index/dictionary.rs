//! Bidirectional string↔id dictionary for documents and tags
//!
//! Ids are assigned densely from 0 in first-sight order, which keeps the
//! downstream slot arrays dense and makes ingestion deterministic: the same
//! input from the same starting state always yields the same ids.

use std::collections::HashMap;
use std::io::{Read, Write};

use crate::error::{Result, TagdexError};
use crate::persist;
use crate::types::{DocId, TagId, INVALID_DOC_ID, INVALID_TAG_ID};

/// Bidirectional mapping between external strings and internal numeric ids.
///
/// Each side pairs an append-only id→string array with a string→id hash
/// map; the two are kept as exact inverses. Once assigned, an id never
/// changes and is never reused.
#[derive(Debug, Default)]
pub struct Dictionary {
    doc_strings: Vec<String>,
    tag_strings: Vec<String>,
    doc_ids: HashMap<String, DocId>,
    tag_ids: HashMap<String, TagId>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a document string to its id, assigning the next id on first
    /// sight. An empty string maps to [`INVALID_DOC_ID`] without growing
    /// the dictionary. Accepts both borrowed and owned strings; an owned
    /// string is moved in rather than reallocated.
    pub fn intern_doc<S>(&mut self, doc: S) -> Result<DocId>
    where
        S: Into<String> + AsRef<str>,
    {
        if doc.as_ref().is_empty() {
            return Ok(INVALID_DOC_ID);
        }
        if let Some(&id) = self.doc_ids.get(doc.as_ref()) {
            return Ok(id);
        }

        let id = self.doc_strings.len() as DocId;
        if id == INVALID_DOC_ID {
            return Err(TagdexError::DictionaryFull);
        }
        let owned = doc.into();
        self.doc_ids.insert(owned.clone(), id);
        self.doc_strings.push(owned);
        Ok(id)
    }

    /// Resolve a tag string to its id, assigning on first sight.
    /// Mirrors [`Dictionary::intern_doc`].
    pub fn intern_tag<S>(&mut self, tag: S) -> Result<TagId>
    where
        S: Into<String> + AsRef<str>,
    {
        if tag.as_ref().is_empty() {
            return Ok(INVALID_TAG_ID);
        }
        if let Some(&id) = self.tag_ids.get(tag.as_ref()) {
            return Ok(id);
        }

        let id = self.tag_strings.len() as TagId;
        if id == INVALID_TAG_ID {
            return Err(TagdexError::DictionaryFull);
        }
        let owned = tag.into();
        self.tag_ids.insert(owned.clone(), id);
        self.tag_strings.push(owned);
        Ok(id)
    }

    /// Pure-read lookup of a document string. Never assigns an id, so it is
    /// safe on the query path under a shared lock.
    pub fn lookup_doc(&self, doc: &str) -> Option<DocId> {
        self.doc_ids.get(doc).copied()
    }

    /// Pure-read lookup of a tag string.
    pub fn lookup_tag(&self, tag: &str) -> Option<TagId> {
        self.tag_ids.get(tag).copied()
    }

    /// The document string for an id, or `None` if the id was never assigned.
    pub fn doc_string(&self, id: DocId) -> Option<&str> {
        self.doc_strings.get(id as usize).map(String::as_str)
    }

    /// The tag string for an id, or `None` if the id was never assigned.
    pub fn tag_string(&self, id: TagId) -> Option<&str> {
        self.tag_strings.get(id as usize).map(String::as_str)
    }

    /// Number of unique documents mapped so far.
    pub fn doc_count(&self) -> usize {
        self.doc_strings.len()
    }

    /// Number of unique tags mapped so far.
    pub fn tag_count(&self) -> usize {
        self.tag_strings.len()
    }

    pub fn clear(&mut self) {
        self.doc_strings.clear();
        self.tag_strings.clear();
        self.doc_ids.clear();
        self.tag_ids.clear();
    }

    /// Serialize both id→string arrays. The hash maps are derived state and
    /// are rebuilt on load.
    ///
    /// Format: u64 doc count, then each string length-prefixed (u64 length,
    /// raw bytes); the tag side follows identically.
    pub fn save<W: Write>(&self, w: &mut W) -> Result<()> {
        persist::write_u64(w, self.doc_strings.len() as u64)?;
        for doc in &self.doc_strings {
            persist::write_bytes(w, doc.as_bytes())?;
        }
        persist::write_u64(w, self.tag_strings.len() as u64)?;
        for tag in &self.tag_strings {
            persist::write_bytes(w, tag.as_bytes())?;
        }
        Ok(())
    }

    /// Replace the dictionary contents with a previously saved state.
    /// Existing data is cleared first; an empty stream loads as empty.
    pub fn load<R: Read>(&mut self, r: &mut R) -> Result<()> {
        self.clear();

        let doc_count = match persist::read_u64_or_eof(r)? {
            Some(count) => count,
            None => return Ok(()),
        };
        self.doc_strings.reserve(doc_count as usize);
        for _ in 0..doc_count {
            self.doc_strings.push(read_string(r)?);
        }

        let tag_count = persist::read_u64(r)?;
        self.tag_strings.reserve(tag_count as usize);
        for _ in 0..tag_count {
            self.tag_strings.push(read_string(r)?);
        }

        for (id, doc) in self.doc_strings.iter().enumerate() {
            self.doc_ids.insert(doc.clone(), id as DocId);
        }
        for (id, tag) in self.tag_strings.iter().enumerate() {
            self.tag_ids.insert(tag.clone(), id as TagId);
        }
        Ok(())
    }
}

fn read_string<R: Read>(r: &mut R) -> Result<String> {
    let bytes = persist::read_bytes(r)?;
    String::from_utf8(bytes)
        .map_err(|e| TagdexError::CheckpointRead(format!("invalid UTF-8 in dictionary: {e}")))
}
