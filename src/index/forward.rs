//! Forward index: DocId → tag ids asserted by the document's record

use std::io::{Read, Write};

use crate::error::Result;
use crate::persist;
use crate::types::{DocId, TagId, INVALID_DOC_ID, INVALID_TAG_ID};

/// Dense array of per-document tag lists, indexed by [`DocId`].
///
/// The slot array only ever grows; a slot for id `d` exists once any write
/// with `d` or a larger id has happened, and may be empty. `put` replaces a
/// slot wholesale while `add` appends to it, and `add` permits duplicate
/// tag ids; deduplication is the ingestion path's job.
#[derive(Debug, Default)]
pub struct ForwardIndex {
    slots: Vec<Vec<TagId>>,
}

impl ForwardIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the tag list of a document. Grows the slot array as needed;
    /// a sentinel doc id is a no-op.
    pub fn put(&mut self, doc_id: DocId, tags: Vec<TagId>) {
        if doc_id == INVALID_DOC_ID {
            return;
        }
        self.ensure_slot(doc_id);
        self.slots[doc_id as usize] = tags;
    }

    /// Append a single tag to a document's list, creating the slot if
    /// needed. Either sentinel id is a no-op. Does not check for duplicates.
    pub fn add(&mut self, doc_id: DocId, tag_id: TagId) {
        if doc_id == INVALID_DOC_ID || tag_id == INVALID_TAG_ID {
            return;
        }
        self.ensure_slot(doc_id);
        self.slots[doc_id as usize].push(tag_id);
    }

    /// The tag list of a document. Out-of-range and sentinel ids read as
    /// empty.
    pub fn get(&self, doc_id: DocId) -> &[TagId] {
        if doc_id == INVALID_DOC_ID {
            return &[];
        }
        self.slots
            .get(doc_id as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Length of the slot array (highest written doc id + 1).
    pub fn doc_count(&self) -> usize {
        self.slots.len()
    }

    fn ensure_slot(&mut self, doc_id: DocId) {
        if doc_id as usize >= self.slots.len() {
            self.slots.resize_with(doc_id as usize + 1, Vec::new);
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Format: u64 slot count, then per slot a u64 tag count followed by
    /// that many u32 tag ids.
    pub fn save<W: Write>(&self, w: &mut W) -> Result<()> {
        persist::write_u64(w, self.slots.len() as u64)?;
        for tags in &self.slots {
            persist::write_u64(w, tags.len() as u64)?;
            for &tag in tags {
                persist::write_u32(w, tag)?;
            }
        }
        Ok(())
    }

    /// Replace contents with a previously saved state. Clears first; an
    /// empty stream loads as empty.
    pub fn load<R: Read>(&mut self, r: &mut R) -> Result<()> {
        self.clear();

        let slot_count = match persist::read_u64_or_eof(r)? {
            Some(count) => count,
            None => return Ok(()),
        };
        self.slots.reserve(slot_count as usize);
        for _ in 0..slot_count {
            let tag_count = persist::read_u64(r)?;
            let mut tags = Vec::with_capacity(tag_count as usize);
            for _ in 0..tag_count {
                tags.push(persist::read_u32(r)?);
            }
            self.slots.push(tags);
        }
        Ok(())
    }
}
