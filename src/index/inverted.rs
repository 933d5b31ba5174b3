//! Inverted index: TagId → roaring bitmap of DocIds
//!
//! The hot subsystem. Each slot is a compressed sorted set of document
//! ids; set-algebra queries fold directly over the slot bitmaps.

use std::io::{Read, Write};

use roaring::RoaringBitmap;

use crate::error::Result;
use crate::persist;
use crate::types::{DocId, QueryOperation, TagId, INVALID_DOC_ID, INVALID_TAG_ID};

/// Per-tag document bitmaps with boolean set operations.
///
/// Slots are indexed directly by [`TagId`]; the dictionary's dense id
/// assignment keeps the array compact. A slot may exist and be empty:
/// `tag_count` reports the array length, not the number of non-empty slots.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    slots: Vec<RoaringBitmap>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a document carries a tag. Either sentinel id is a no-op;
    /// repeated calls with the same pair are idempotent.
    pub fn add(&mut self, doc_id: DocId, tag_id: TagId) {
        if doc_id == INVALID_DOC_ID || tag_id == INVALID_TAG_ID {
            return;
        }
        if tag_id as usize >= self.slots.len() {
            self.slots
                .resize_with(tag_id as usize + 1, RoaringBitmap::new);
        }
        self.slots[tag_id as usize].insert(doc_id);
    }

    /// The bitmap for a tag. `None` iff the id is the sentinel or beyond
    /// the slot array; the returned bitmap may be empty.
    pub fn get(&self, tag_id: TagId) -> Option<&RoaringBitmap> {
        if tag_id == INVALID_TAG_ID {
            return None;
        }
        self.slots.get(tag_id as usize)
    }

    /// Number of documents carrying a tag; 0 for unknown tags.
    pub fn cardinality(&self, tag_id: TagId) -> u64 {
        self.get(tag_id).map_or(0, RoaringBitmap::len)
    }

    /// Length of the slot array (highest added tag id + 1).
    pub fn tag_count(&self) -> usize {
        self.slots.len()
    }

    /// Run-compress every non-empty slot. Idempotent; call after an
    /// ingestion pass. Returns `true` when every slot was processed.
    pub fn optimize(&mut self) -> bool {
        for bitmap in &mut self.slots {
            if !bitmap.is_empty() {
                bitmap.optimize();
            }
        }
        true
    }

    /// Release spare capacity held by the slots and the slot array.
    pub fn shrink_to_fit(&mut self) {
        for bitmap in &mut self.slots {
            bitmap.shrink_to_fit();
        }
        self.slots.shrink_to_fit();
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Fold the bitmaps of `tag_ids` under the given operation.
    ///
    /// Unknown tags (sentinel or beyond the slot array) behave as the empty
    /// set, with one deliberate exception: an unknown FIRST operand makes
    /// the whole result empty under every operation, OR and XOR included.
    ///
    /// - `And`: running intersection, empty as soon as any operand is
    ///   unknown or the intersection drains.
    /// - `Or` / `Xor`: running union / symmetric difference, unknown
    ///   operands skipped.
    /// - `AndNot`: first operand minus the union of the remaining known
    ///   operands. A pairwise left fold would produce the same result; the
    ///   union form keeps the minuend and subtrahend distinct.
    pub fn perform_operation(&self, tag_ids: &[TagId], op: QueryOperation) -> RoaringBitmap {
        let Some(&first) = tag_ids.first() else {
            return RoaringBitmap::new();
        };
        let Some(first_bitmap) = self.get(first) else {
            return RoaringBitmap::new();
        };
        let mut result = first_bitmap.clone();

        match op {
            QueryOperation::And => {
                for &tag_id in &tag_ids[1..] {
                    let Some(bitmap) = self.get(tag_id) else {
                        return RoaringBitmap::new();
                    };
                    result &= bitmap;
                    if result.is_empty() {
                        break;
                    }
                }
            }
            QueryOperation::Or => {
                for &tag_id in &tag_ids[1..] {
                    if let Some(bitmap) = self.get(tag_id) {
                        result |= bitmap;
                    }
                }
            }
            QueryOperation::Xor => {
                for &tag_id in &tag_ids[1..] {
                    if let Some(bitmap) = self.get(tag_id) {
                        result ^= bitmap;
                    }
                }
            }
            QueryOperation::AndNot => {
                if tag_ids.len() > 1 {
                    let mut subtrahend = RoaringBitmap::new();
                    for &tag_id in &tag_ids[1..] {
                        if let Some(bitmap) = self.get(tag_id) {
                            subtrahend |= bitmap;
                        }
                    }
                    result -= subtrahend;
                }
            }
        }

        result
    }

    /// Format: u64 slot count, then per slot a u32 byte length followed by
    /// the bitmap's portable serialization. Empty slots are written with
    /// length 0.
    pub fn save<W: Write>(&self, w: &mut W) -> Result<()> {
        persist::write_u64(w, self.slots.len() as u64)?;
        for bitmap in &self.slots {
            if bitmap.is_empty() {
                persist::write_u32(w, 0)?;
                continue;
            }
            let mut bytes = Vec::with_capacity(bitmap.serialized_size());
            bitmap.serialize_into(&mut bytes)?;
            persist::write_u32(w, bytes.len() as u32)?;
            w.write_all(&bytes)?;
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
            let len = persist::read_u32(r)? as usize;
            if len == 0 {
                self.slots.push(RoaringBitmap::new());
                continue;
            }
            let mut bytes = vec![0u8; len];
            r.read_exact(&mut bytes)?;
            self.slots.push(RoaringBitmap::deserialize_from(&bytes[..])?);
        }
        Ok(())
    }
}
