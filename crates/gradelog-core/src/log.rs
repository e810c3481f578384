//! The grading event log.
//!
//! `EventLog` is an ordered collection of `EventRecord`s with append, sort
//! and per-question lookup, plus snapshot delegation and whole-log
//! persistence. Entries are never deleted. Lookup uses a cached question
//! index rebuilt lazily and invalidated on append, so repeated lookups stay
//! cheap without reordering the entries as a side effect.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use gradelog_contracts::env::Environment;
use gradelog_contracts::error::{GradeLogError, GradeLogResult};
use gradelog_contracts::event::{EventKind, EventRecord, RecordedFailure};
use gradelog_shelf::{ShelfLocation, ShelfStore, SnapshotBundle, SnapshotStore};

/// The event log for one grading session.
///
/// Created fresh per session or loaded from a persisted file. Grows by
/// appending records; persisted explicitly by the caller at points of
/// interest. Snapshot bundles are persisted as independent files next to
/// the shelf fragments and are never deleted by this type.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventLog {
    /// All records, in the order established by appends and `sort` calls.
    entries: Vec<EventRecord>,

    /// Current sort direction of `entries`. Appends restore ascending order
    /// first so the tail of the log stays chronologically meaningful.
    ascending: bool,

    /// Questions for which a snapshot bundle has been persisted. Always a
    /// subset of the question names on `Check` entries.
    captured_questions: BTreeSet<String>,

    /// Where snapshot fragments and bundles live. Runtime configuration,
    /// not part of the persisted blob.
    #[serde(skip)]
    location: ShelfLocation,

    /// Question name → position of its most recent record. Rebuilt lazily
    /// by `get_question_entry`, dropped whenever `entries` changes.
    #[serde(skip)]
    question_index: Option<HashMap<String, usize>>,
}

impl EventLog {
    /// A fresh, empty log snapshotting to `location`.
    pub fn new(location: ShelfLocation) -> Self {
        Self {
            entries: Vec::new(),
            ascending: true,
            captured_questions: BTreeSet::new(),
            location,
            question_index: None,
        }
    }

    /// A log over pre-built records, assumed to be in ascending order.
    ///
    /// For replaying history and for building test fixtures with explicit
    /// timestamps.
    pub fn from_entries(entries: Vec<EventRecord>, location: ShelfLocation) -> Self {
        Self {
            entries,
            ascending: true,
            captured_questions: BTreeSet::new(),
            location,
            question_index: None,
        }
    }

    /// All records in their current order.
    pub fn entries(&self) -> &[EventRecord] {
        &self.entries
    }

    /// Current sort direction.
    pub fn is_ascending(&self) -> bool {
        self.ascending
    }

    /// Questions with a persisted snapshot bundle.
    pub fn captured_questions(&self) -> &BTreeSet<String> {
        &self.captured_questions
    }

    /// Append a record stamped with the current time.
    ///
    /// If the log is currently sorted descending it is re-sorted ascending
    /// first, so appending at the tail keeps `entries` chronological for
    /// any caller iterating mid-session.
    pub fn add_entry(
        &mut self,
        kind: EventKind,
        question: Option<&str>,
        success: bool,
        error: Option<RecordedFailure>,
        results: Vec<serde_json::Value>,
    ) {
        if !self.ascending {
            self.sort(true);
        }
        let record = EventRecord::new(
            kind,
            question.map(str::to_string),
            success,
            error,
            results,
        );
        debug!(kind = %record.kind, question = ?record.question, "log entry added");
        self.entries.push(record);
        self.question_index = None;
    }

    /// Re-sort all entries by timestamp. Stable: equal timestamps keep
    /// their current relative order.
    pub fn sort(&mut self, ascending: bool) {
        EventRecord::sort_records(&mut self.entries, ascending);
        self.ascending = ascending;
        self.question_index = None;
    }

    /// The sorted distinct question names across all `Check` records.
    ///
    /// Pure read; no ordering side effects.
    pub fn get_questions(&self) -> Vec<String> {
        let questions: BTreeSet<&str> = self
            .entries
            .iter()
            .filter(|e| e.kind == EventKind::Check)
            .filter_map(|e| e.question.as_deref())
            .collect();
        questions.into_iter().map(str::to_string).collect()
    }

    /// The most recent record whose `question` matches.
    ///
    /// Most-recent means greatest timestamp; among equal timestamps the
    /// record earliest in the current entry order wins, matching a stable
    /// descending scan. Fails with `QuestionNotFound` when no record
    /// carries the question.
    pub fn get_question_entry(&mut self, question: &str) -> GradeLogResult<&EventRecord> {
        if self.question_index.is_none() {
            self.question_index = Some(Self::build_index(&self.entries));
        }
        let index = self
            .question_index
            .as_ref()
            .and_then(|idx| idx.get(question).copied());
        match index {
            Some(position) => Ok(&self.entries[position]),
            None => Err(GradeLogError::QuestionNotFound {
                question: question.to_string(),
            }),
        }
    }

    /// The most recent grading result for a question.
    ///
    /// Delegates to `get_question_entry`, then extracts the primary result
    /// payload; fails with `NotACheckRecord` when the located record's kind
    /// is not `Check`.
    pub fn get_results(&mut self, question: &str) -> GradeLogResult<&serde_json::Value> {
        self.get_question_entry(question)?.get_results()
    }

    /// Capture an environment for a question and persist it as a bundle.
    ///
    /// The question must already appear on a `Check` entry — this preserves
    /// the invariant that `captured_questions` is a subset of checked
    /// questions. Returns the names of keys that could not be captured so
    /// the caller can warn without failing the whole operation.
    pub fn capture_snapshot(
        &mut self,
        question: &str,
        env: &Environment,
    ) -> GradeLogResult<Vec<String>> {
        let checked = self
            .entries
            .iter()
            .any(|e| e.kind == EventKind::Check && e.question.as_deref() == Some(question));
        if !checked {
            return Err(GradeLogError::QuestionNotFound {
                question: question.to_string(),
            });
        }

        let store = SnapshotStore::new(self.location.clone());
        let (files, unshelved) = store.capture(env)?;
        let bundle = SnapshotBundle::new(question, files, unshelved.clone());

        let path = self.location.bundle_path(question);
        let bytes = serde_json::to_vec(&bundle).map_err(|e| GradeLogError::SnapshotCapture {
            reason: format!("could not encode bundle for question '{}': {}", question, e),
        })?;
        fs::write(&path, bytes).map_err(|e| GradeLogError::SnapshotCapture {
            reason: format!("could not write bundle '{}': {}", path.display(), e),
        })?;

        self.captured_questions.insert(question.to_string());
        info!(
            question = %question,
            bundle = %path.display(),
            unshelved = unshelved.len(),
            "snapshot captured"
        );
        Ok(unshelved)
    }

    /// Load the bundle previously persisted for a question.
    ///
    /// Fails with `SnapshotNotFound` when no bundle file exists, and with
    /// `SnapshotRestore` when the bundle is unreadable, undecodable, or
    /// fails digest verification.
    pub fn load_bundle(&self, question: &str) -> GradeLogResult<SnapshotBundle> {
        let path = self.location.bundle_path(question);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(GradeLogError::SnapshotNotFound {
                    question: question.to_string(),
                })
            }
            Err(e) => {
                return Err(GradeLogError::SnapshotRestore {
                    reason: format!("could not read bundle '{}': {}", path.display(), e),
                })
            }
        };
        let bundle: SnapshotBundle =
            serde_json::from_slice(&bytes).map_err(|e| GradeLogError::SnapshotRestore {
                reason: format!("bundle '{}' is corrupt: {}", path.display(), e),
            })?;
        if !bundle.verify() {
            return Err(GradeLogError::SnapshotRestore {
                reason: format!("bundle '{}' failed digest verification", path.display()),
            });
        }
        Ok(bundle)
    }

    /// Restore the snapshot captured for a question and return a live
    /// handle to read values back out of.
    ///
    /// Rewrites the bundle's fragment files to the shelf location as one
    /// logical unit; any failure aborts the restore in full.
    pub fn restore_snapshot(&self, question: &str) -> GradeLogResult<ShelfStore> {
        let bundle = self.load_bundle(question)?;
        let store = SnapshotStore::new(self.location.clone());
        store.restore(&bundle.files)
    }

    /// Serialize the whole log as one blob and replace `path` with it.
    ///
    /// Full overwrite with all-or-nothing semantics: the blob is written to
    /// a temporary file in the target's directory and renamed over `path`,
    /// so the prior file is untouched if anything fails.
    pub fn persist(&self, path: &Path) -> GradeLogResult<()> {
        let path_str = path.display().to_string();
        let bytes = serde_json::to_vec(self).map_err(|e| GradeLogError::Persist {
            path: path_str.clone(),
            reason: format!("could not encode log: {}", e),
        })?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| GradeLogError::Persist {
            path: path_str.clone(),
            reason: format!("could not create temporary file: {}", e),
        })?;
        tmp.write_all(&bytes).map_err(|e| GradeLogError::Persist {
            path: path_str.clone(),
            reason: format!("could not write temporary file: {}", e),
        })?;
        tmp.persist(path).map_err(|e| GradeLogError::Persist {
            path: path_str.clone(),
            reason: format!("could not replace log file: {}", e),
        })?;

        info!(path = %path_str, entries = self.entries.len(), "log persisted");
        Ok(())
    }

    /// Load a persisted log, or return a fresh empty log when `path` does
    /// not exist — an absent log is an empty log, by contract.
    pub fn load(path: &Path, location: ShelfLocation) -> GradeLogResult<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no persisted log, starting empty");
                return Ok(Self::new(location));
            }
            Err(e) => {
                return Err(GradeLogError::PersistedLogCorrupt {
                    path: path.display().to_string(),
                    reason: format!("unreadable: {}", e),
                })
            }
        };
        let mut log: Self =
            serde_json::from_slice(&bytes).map_err(|e| GradeLogError::PersistedLogCorrupt {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        log.location = location;
        log.question_index = None;
        info!(path = %path.display(), entries = log.entries.len(), "log loaded");
        Ok(log)
    }

    /// Map each question to the position of its most recent record.
    ///
    /// Strictly-greater comparison: among equal timestamps the earliest
    /// position keeps the slot.
    fn build_index(entries: &[EventRecord]) -> HashMap<String, usize> {
        let mut index: HashMap<String, usize> = HashMap::new();
        for (position, record) in entries.iter().enumerate() {
            let Some(question) = record.question.as_deref() else {
                continue;
            };
            match index.get(question) {
                Some(&best) if entries[best].timestamp >= record.timestamp => {}
                _ => {
                    index.insert(question.to_string(), position);
                }
            }
        }
        index
    }
}
