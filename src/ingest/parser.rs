//! Delimited record parser for the append-only data source
//!
//! A record is one logical line: the document string, then tag fields,
//! separated by a single-byte delimiter. Parsing can resume from a byte
//! offset so that ingestion only ever touches the unseen suffix of the
//! file.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::warn;

use crate::error::{Result, TagdexError};
use crate::types::FileOffset;

/// The ASCII whitespace stripped from around every field: space, tab,
/// newline, carriage return, vertical tab, form feed.
const FIELD_WHITESPACE: &[char] = &[' ', '\t', '\n', '\r', '\x0B', '\x0C'];

fn trim_field(s: &str) -> &str {
    s.trim_matches(FIELD_WHITESPACE)
}

/// Counters describing one parsing pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Byte position just past the last consumed line
    pub offset: FileOffset,
    /// Records handed to the callback
    pub records: u64,
    /// Non-empty lines skipped because the document field was empty
    pub malformed: u64,
}

/// Splits a byte stream into `(document, tags)` records.
#[derive(Clone, Copy, Debug)]
pub struct RecordParser {
    delimiter: u8,
}

impl RecordParser {
    /// A parser splitting fields on `delimiter`, which must be a single
    /// ASCII byte.
    pub fn new(delimiter: u8) -> Self {
        debug_assert!(delimiter.is_ascii(), "delimiter must be ASCII");
        Self { delimiter }
    }

    /// Parse `source` from `start_offset` to end of stream, invoking
    /// `on_record` with an owned document string and tag list for every
    /// well-formed line. Whitespace-only lines are skipped silently; lines
    /// whose document field trims to empty are counted as malformed and
    /// skipped with a warning.
    ///
    /// If `start_offset` points into the middle of a line (possible after a
    /// torn status-file write), the remainder of that line is discarded and
    /// parsing starts at the next one. Only unrecoverable stream errors
    /// (failed seek, failed read) abort the pass.
    pub fn parse_stream<R, F>(
        &self,
        source: R,
        start_offset: FileOffset,
        mut on_record: F,
    ) -> Result<ParseOutcome>
    where
        R: Read + Seek,
        F: FnMut(String, Vec<String>),
    {
        let mut reader = BufReader::new(source);
        let mut outcome = ParseOutcome {
            offset: start_offset,
            ..Default::default()
        };
        let mut line = Vec::new();

        if start_offset > 0 {
            // Peek at the byte before the resume point: anything but a
            // newline means the offset is mid-line and the torn tail must
            // be dropped up to the next line boundary.
            reader
                .seek(SeekFrom::Start(start_offset - 1))
                .map_err(TagdexError::Stream)?;
            let mut prev = [0u8; 1];
            reader.read_exact(&mut prev).map_err(TagdexError::Stream)?;
            if prev[0] != b'\n' {
                let skipped = reader
                    .read_until(b'\n', &mut line)
                    .map_err(TagdexError::Stream)?;
                if skipped > 0 {
                    warn!(
                        start_offset,
                        skipped, "resume offset was mid-line, discarding up to next newline"
                    );
                }
                outcome.offset += skipped as FileOffset;
            }
        }

        loop {
            line.clear();
            let consumed = reader
                .read_until(b'\n', &mut line)
                .map_err(TagdexError::Stream)?;
            if consumed == 0 {
                break;
            }
            outcome.offset += consumed as FileOffset;

            let text = String::from_utf8_lossy(&line);
            let trimmed = trim_field(&text);
            if trimmed.is_empty() {
                continue;
            }

            match self.parse_line(trimmed) {
                Some((doc, tags)) => {
                    outcome.records += 1;
                    on_record(doc, tags);
                }
                None => {
                    outcome.malformed += 1;
                    warn!(line = trimmed, "skipping malformed line: empty document field");
                }
            }
        }

        Ok(outcome)
    }

    /// Convenience wrapper: parse a whole file from offset 0.
    pub fn parse_file<F>(&self, path: &Path, on_record: F) -> Result<ParseOutcome>
    where
        F: FnMut(String, Vec<String>),
    {
        let file = File::open(path)?;
        self.parse_stream(file, 0, on_record)
    }

    /// Split one non-empty line into a trimmed document field and the
    /// non-empty trimmed tag fields. `None` when the document field trims
    /// to empty.
    fn parse_line(&self, line: &str) -> Option<(String, Vec<String>)> {
        let mut fields = line.split(self.delimiter as char);

        let doc = trim_field(fields.next().unwrap_or(""));
        if doc.is_empty() {
            return None;
        }

        let tags = fields
            .map(trim_field)
            .filter(|tag| !tag.is_empty())
            .map(str::to_owned)
            .collect();

        Some((doc.to_owned(), tags))
    }
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new(b'|')
    }
}
