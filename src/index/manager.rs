//! Index manager: the public façade over dictionary, forward and inverted
//! indices
//!
//! The manager is the durability boundary (status file + checkpoint
//! directory) and the concurrency boundary: one readers-writer lock guards
//! all component state, so the components themselves stay lock-free.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::IndexConfig;
use crate::error::{Result, TagdexError};
use crate::index::{Dictionary, ForwardIndex, InvertedIndex};
use crate::ingest::RecordParser;
use crate::persist::{self, FORWARD_FILE, INVERTED_FILE, MAPPING_FILE};
use crate::types::{FileOffset, QueryOperation, TagId, INVALID_DOC_ID, INVALID_TAG_ID};

/// What one `load_incremental` pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestSummary {
    /// Records applied to the indices
    pub records: u64,
    /// Non-empty lines skipped as malformed
    pub malformed: u64,
    /// Data-file offset the index now reflects
    pub offset: FileOffset,
}

/// All mutable index state, guarded as one unit.
#[derive(Debug, Default)]
struct IndexState {
    dictionary: Dictionary,
    forward: ForwardIndex,
    inverted: InvertedIndex,
    last_processed_offset: FileOffset,
}

impl IndexState {
    fn clear_components(&mut self) {
        self.dictionary.clear();
        self.forward.clear();
        self.inverted.clear();
    }

    /// Apply one parsed record: resolve ids, then update both indices.
    /// The forward index stores each tag once; the inverted index receives
    /// every occurrence and deduplicates by construction.
    fn apply_record(&mut self, doc: String, tags: Vec<String>) {
        let doc_id = match self.dictionary.intern_doc(doc) {
            Ok(id) if id != INVALID_DOC_ID => id,
            Ok(_) => {
                warn!("skipping record with empty document id");
                return;
            }
            Err(e) => {
                warn!(error = %e, "skipping record");
                return;
            }
        };

        let mut all_tags: Vec<TagId> = Vec::with_capacity(tags.len());
        let mut unique_tags: Vec<TagId> = Vec::with_capacity(tags.len());
        for tag in tags {
            match self.dictionary.intern_tag(tag) {
                Ok(id) if id != INVALID_TAG_ID => {
                    if !unique_tags.contains(&id) {
                        unique_tags.push(id);
                    }
                    all_tags.push(id);
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, doc_id, "skipping tag"),
            }
        }

        self.forward.put(doc_id, unique_tags);
        for tag_id in all_tags {
            self.inverted.add(doc_id, tag_id);
        }
    }
}

/// Owns the index components and coordinates ingestion, queries and
/// checkpointing.
///
/// Readers (`query`, `tags_for`, the counters) take the shared side of the
/// lock; `load_incremental`, `save` and `load` take the exclusive side.
pub struct IndexManager {
    config: IndexConfig,
    parser: RecordParser,
    state: RwLock<IndexState>,
}

impl IndexManager {
    /// Create a manager for the given configuration. The last processed
    /// offset is restored from the status file (absent or malformed means
    /// the whole data file is unseen).
    pub fn new(config: IndexConfig) -> Self {
        let last_processed_offset = persist::read_status_file(&config.status_path);
        info!(
            data_file = %config.data_path.display(),
            offset = last_processed_offset,
            "index manager initialized"
        );
        let parser = RecordParser::new(config.delimiter);
        Self {
            config,
            parser,
            state: RwLock::new(IndexState {
                last_processed_offset,
                ..Default::default()
            }),
        }
    }

    /// Ingest the suffix of the data file that the indices do not yet
    /// reflect.
    ///
    /// Succeeds immediately when there is nothing new. After a successful
    /// pass the offset is advanced and rewritten to the status file; a
    /// failed status write is loud but non-fatal, since reprocessing the
    /// same records on the next run is harmless. With `optimize_after` the
    /// inverted index is run-compressed and trimmed once the pass is done.
    pub fn load_incremental(&self, optimize_after: bool) -> Result<IngestSummary> {
        let mut state = self.state.write();

        let metadata = fs::metadata(&self.config.data_path)
            .map_err(|_| TagdexError::MissingDataFile(self.config.data_path.clone()))?;
        if !metadata.is_file() {
            return Err(TagdexError::MissingDataFile(self.config.data_path.clone()));
        }
        let file_size = metadata.len();

        if file_size <= state.last_processed_offset {
            debug!(
                offset = state.last_processed_offset,
                "no new data, index is up to date"
            );
            return Ok(IngestSummary {
                offset: state.last_processed_offset,
                ..Default::default()
            });
        }

        info!(
            from = state.last_processed_offset,
            file_size, "ingesting new data"
        );

        let file = File::open(&self.config.data_path)?;
        let start_offset = state.last_processed_offset;
        let state = &mut *state;
        let outcome = self
            .parser
            .parse_stream(file, start_offset, |doc, tags| state.apply_record(doc, tags))?;

        state.last_processed_offset = outcome.offset;

        if optimize_after {
            state.inverted.optimize();
            state.inverted.shrink_to_fit();
        }

        if let Err(e) = persist::write_status_file(&self.config.status_path, outcome.offset) {
            warn!(
                path = %self.config.status_path.display(),
                offset = outcome.offset,
                error = %e,
                "failed to persist ingestion offset, next run will reprocess this data"
            );
        }

        info!(
            records = outcome.records,
            malformed = outcome.malformed,
            offset = outcome.offset,
            "ingestion pass complete"
        );
        Ok(IngestSummary {
            records: outcome.records,
            malformed: outcome.malformed,
            offset: outcome.offset,
        })
    }

    /// Documents matching a set-algebra query over tag strings, in
    /// ascending internal-id order (first-sight order of the documents).
    ///
    /// Unknown tags follow the operator contracts: any unknown tag empties
    /// an `And`; an unknown first tag empties every operation; unknown
    /// later tags are dropped for `Or`/`Xor`/`AndNot`.
    pub fn query<S: AsRef<str>>(&self, tags: &[S], op: QueryOperation) -> Vec<String> {
        let state = self.state.read();

        if tags.is_empty() {
            return Vec::new();
        }

        let mut query_ids: Vec<TagId> = Vec::with_capacity(tags.len());
        for (position, tag) in tags.iter().enumerate() {
            match state.dictionary.lookup_tag(tag.as_ref()) {
                Some(id) => query_ids.push(id),
                None if op == QueryOperation::And || position == 0 => return Vec::new(),
                None => {}
            }
        }

        let result = state.inverted.perform_operation(&query_ids, op);

        let mut docs = Vec::with_capacity(result.len() as usize);
        for doc_id in result.iter() {
            match state.dictionary.doc_string(doc_id) {
                Some(doc) => docs.push(doc.to_owned()),
                None => debug!(doc_id, "result doc id has no dictionary entry, dropping"),
            }
        }
        docs
    }

    /// The tag strings recorded for a document; empty when the document is
    /// unknown.
    pub fn tags_for(&self, doc: &str) -> Vec<String> {
        let state = self.state.read();

        let Some(doc_id) = state.dictionary.lookup_doc(doc) else {
            return Vec::new();
        };
        if doc_id as usize >= state.forward.doc_count() {
            return Vec::new();
        }

        let tag_ids = state.forward.get(doc_id);
        let mut tags = Vec::with_capacity(tag_ids.len());
        for &tag_id in tag_ids {
            match state.dictionary.tag_string(tag_id) {
                Some(tag) => tags.push(tag.to_owned()),
                None => warn!(doc_id, tag_id, "forward index holds a tag id with no dictionary entry"),
            }
        }
        tags
    }

    /// Number of unique documents seen so far.
    pub fn doc_count(&self) -> usize {
        self.state.read().dictionary.doc_count()
    }

    /// Number of unique tags seen so far.
    pub fn tag_count(&self) -> usize {
        self.state.read().dictionary.tag_count()
    }

    /// Data-file byte offset the indices currently reflect.
    pub fn last_processed_offset(&self) -> FileOffset {
        self.state.read().last_processed_offset
    }

    /// Write the full index state as three binary files in `directory`
    /// (created if absent).
    pub fn save(&self, directory: &Path) -> Result<()> {
        let state = self.state.write();

        fs::create_dir_all(directory)?;
        save_component(&directory.join(MAPPING_FILE), |w| state.dictionary.save(w))?;
        save_component(&directory.join(FORWARD_FILE), |w| state.forward.save(w))?;
        save_component(&directory.join(INVERTED_FILE), |w| state.inverted.save(w))?;

        info!(directory = %directory.display(), "checkpoint saved");
        Ok(())
    }

    /// Restore the full index state from a checkpoint directory.
    ///
    /// All-or-nothing: when any file is missing or corrupt the manager is
    /// left empty and the error is returned. The ingestion offset is not
    /// part of the checkpoint; it lives in the status file.
    pub fn load(&self, directory: &Path) -> Result<()> {
        let mut state = self.state.write();

        let result = Self::load_components(&mut state, directory);
        if let Err(e) = result {
            state.clear_components();
            warn!(
                directory = %directory.display(),
                error = %e,
                "checkpoint restore failed, index cleared"
            );
            return Err(e);
        }

        info!(
            directory = %directory.display(),
            docs = state.dictionary.doc_count(),
            tags = state.dictionary.tag_count(),
            "checkpoint restored"
        );
        Ok(())
    }

    fn load_components(state: &mut IndexState, directory: &Path) -> Result<()> {
        load_component(&directory.join(MAPPING_FILE), |r| state.dictionary.load(r))?;
        load_component(&directory.join(FORWARD_FILE), |r| state.forward.load(r))?;
        load_component(&directory.join(INVERTED_FILE), |r| state.inverted.load(r))?;
        Ok(())
    }
}

fn save_component<F>(path: &Path, save: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    save(&mut writer)?;
    writer.flush()?;
    Ok(())
}

fn load_component<F>(path: &Path, load: F) -> Result<()>
where
    F: FnOnce(&mut BufReader<File>) -> Result<()>,
{
    let file = File::open(path)
        .map_err(|e| TagdexError::CheckpointRead(format!("{}: {e}", path.display())))?;
    load(&mut BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use tempfile::TempDir;

    struct TestEnv {
        _tmp: TempDir,
        config: IndexConfig,
    }

    fn create_env(data: &str) -> TestEnv {
        let tmp = TempDir::new().unwrap();
        let data_path = tmp.path().join("data.csv");
        fs::write(&data_path, data).unwrap();
        let config =
            IndexConfig::new(data_path).with_status_path(tmp.path().join("status.txt"));
        TestEnv { _tmp: tmp, config }
    }

    fn append(env: &TestEnv, data: &str) {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&env.config.data_path)
            .unwrap();
        file.write_all(data.as_bytes()).unwrap();
    }

    #[test]
    fn test_ingest_and_count() {
        let env = create_env("d1|a|b\nd2|b|c\n");
        let manager = IndexManager::new(env.config.clone());

        let summary = manager.load_incremental(true).unwrap();

        assert_eq!(summary.records, 2);
        assert_eq!(summary.malformed, 0);
        assert_eq!(manager.doc_count(), 2);
        assert_eq!(manager.tag_count(), 3);
        assert_eq!(manager.last_processed_offset(), 14);
    }

    #[test]
    fn test_missing_data_file() {
        let tmp = TempDir::new().unwrap();
        let config = IndexConfig::new(tmp.path().join("absent.csv"))
            .with_status_path(tmp.path().join("status.txt"));
        let manager = IndexManager::new(config);

        let result = manager.load_incremental(true);

        assert!(matches!(result, Err(TagdexError::MissingDataFile(_))));
        assert_eq!(manager.doc_count(), 0);
        assert_eq!(manager.last_processed_offset(), 0);
    }

    #[test]
    fn test_second_pass_is_noop() {
        let env = create_env("d1|a\n");
        let manager = IndexManager::new(env.config.clone());

        manager.load_incremental(true).unwrap();
        let second = manager.load_incremental(true).unwrap();

        assert_eq!(second.records, 0);
        assert_eq!(manager.doc_count(), 1);
    }

    #[test]
    fn test_incremental_append() {
        let env = create_env("d1|a\n");
        let manager = IndexManager::new(env.config.clone());
        manager.load_incremental(true).unwrap();

        append(&env, "d2|a|b\n");
        let summary = manager.load_incremental(true).unwrap();

        assert_eq!(summary.records, 1);
        assert_eq!(manager.doc_count(), 2);
        assert_eq!(manager.query(&["a"], QueryOperation::Or), vec!["d1", "d2"]);
        assert_eq!(manager.query(&["b"], QueryOperation::Or), vec!["d2"]);
    }

    #[test]
    fn test_status_file_written_and_reused() {
        let env = create_env("d1|a\nd2|b\n");
        let manager = IndexManager::new(env.config.clone());
        manager.load_incremental(true).unwrap();
        let offset = manager.last_processed_offset();

        assert_eq!(persist::read_status_file(&env.config.status_path), offset);

        // A fresh manager resumes from the recorded offset and sees nothing new
        let fresh = IndexManager::new(env.config.clone());
        assert_eq!(fresh.last_processed_offset(), offset);
        let summary = fresh.load_incremental(true).unwrap();
        assert_eq!(summary.records, 0);
    }

    #[test]
    fn test_query_translation() {
        let env = create_env("d1|a|b\nd2|b\n");
        let manager = IndexManager::new(env.config.clone());
        manager.load_incremental(true).unwrap();

        assert_eq!(manager.query(&["a", "b"], QueryOperation::And), vec!["d1"]);
        assert_eq!(
            manager.query(&["a", "b"], QueryOperation::Or),
            vec!["d1", "d2"]
        );
        assert!(manager.query::<&str>(&[], QueryOperation::Or).is_empty());
    }

    #[test]
    fn test_query_unknown_tag_rules() {
        let env = create_env("d1|x\nd2|y\n");
        let manager = IndexManager::new(env.config.clone());
        manager.load_incremental(true).unwrap();

        // Unknown anywhere empties an AND
        assert!(manager.query(&["x", "zz"], QueryOperation::And).is_empty());
        // Unknown first empties everything
        for op in [
            QueryOperation::And,
            QueryOperation::Or,
            QueryOperation::Xor,
            QueryOperation::AndNot,
        ] {
            assert!(manager.query(&["zz", "x"], op).is_empty());
        }
        // Unknown later tags are dropped for OR/XOR/ANDNOT
        assert_eq!(manager.query(&["x", "zz"], QueryOperation::Or), vec!["d1"]);
        assert_eq!(manager.query(&["x", "zz"], QueryOperation::Xor), vec!["d1"]);
        assert_eq!(
            manager.query(&["x", "zz"], QueryOperation::AndNot),
            vec!["d1"]
        );
        // A query must not intern the unknown tag
        assert_eq!(manager.tag_count(), 2);
    }

    #[test]
    fn test_tags_for() {
        let env = create_env("d1|a|b\n");
        let manager = IndexManager::new(env.config.clone());
        manager.load_incremental(true).unwrap();

        let mut tags = manager.tags_for("d1");
        tags.sort();
        assert_eq!(tags, vec!["a", "b"]);
        assert!(manager.tags_for("d2").is_empty());
        assert!(manager.tags_for("").is_empty());
    }

    #[test]
    fn test_duplicate_tags_in_record() {
        let env = create_env("d1|a|a|b\n");
        let manager = IndexManager::new(env.config.clone());
        manager.load_incremental(true).unwrap();

        let mut tags = manager.tags_for("d1");
        tags.sort();
        assert_eq!(tags, vec!["a", "b"]);
        assert_eq!(manager.query(&["a"], QueryOperation::Or), vec!["d1"]);
    }

    #[test]
    fn test_malformed_lines_do_not_stop_ingestion() {
        let env = create_env("|broken\nd1|a\n   \nd2|b\n");
        let manager = IndexManager::new(env.config.clone());

        let summary = manager.load_incremental(true).unwrap();

        assert_eq!(summary.records, 2);
        assert_eq!(summary.malformed, 1);
        assert_eq!(manager.doc_count(), 2);
        // The pass still advances past the malformed content
        assert_eq!(
            manager.last_processed_offset(),
            fs::metadata(&env.config.data_path).unwrap().len()
        );
    }

    #[test]
    fn test_save_and_load() {
        let env = create_env("d1|a|b\nd2|b\n");
        let manager = IndexManager::new(env.config.clone());
        manager.load_incremental(true).unwrap();

        let dir = env._tmp.path().join("checkpoint");
        manager.save(&dir).unwrap();

        let restored = IndexManager::new(env.config.clone());
        restored.load(&dir).unwrap();

        assert_eq!(restored.doc_count(), 2);
        assert_eq!(restored.tag_count(), 3);
        assert_eq!(
            restored.query(&["b"], QueryOperation::Or),
            vec!["d1", "d2"]
        );
        let mut tags = restored.tags_for("d1");
        tags.sort();
        assert_eq!(tags, vec!["a", "b"]);
    }

    #[test]
    fn test_load_failure_clears_manager() {
        let env = create_env("d1|a\n");
        let manager = IndexManager::new(env.config.clone());
        manager.load_incremental(true).unwrap();

        let result = manager.load(&env._tmp.path().join("no_such_dir"));

        assert!(result.is_err());
        assert_eq!(manager.doc_count(), 0);
        assert_eq!(manager.tag_count(), 0);
        assert!(manager.query(&["a"], QueryOperation::Or).is_empty());
    }
}
