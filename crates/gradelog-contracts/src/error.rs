//! Error types for the gradelog crates.
//!
//! All fallible operations across the workspace return `GradeLogResult<T>`.
//! Variants carry enough context to tell the caller which question, path, or
//! store operation failed.

use thiserror::Error;

use crate::event::{EventKind, RecordedFailure};

/// The unified error type for the gradelog crates.
#[derive(Debug, Error)]
pub enum GradeLogError {
    /// A string outside the closed event-kind enumeration was supplied at a
    /// parse boundary. Inside the workspace, `EventKind` makes invalid kinds
    /// unrepresentable.
    #[error("'{kind}' is not a recognized event kind")]
    InvalidEventKind { kind: String },

    /// No entry for the named question exists in the log.
    #[error("question '{question}' not found in the log")]
    QuestionNotFound { question: String },

    /// Results were requested from a record whose kind is not `Check`.
    ///
    /// This is a caller contract violation, never silently coerced.
    #[error("the most recent record for question '{question}' is a '{kind}' record and carries no results")]
    NotACheckRecord { question: String, kind: EventKind },

    /// A `Check` record was found but holds zero result payloads.
    #[error("the most recent check record for question '{question}' has no result payload")]
    MissingResults { question: String },

    /// No snapshot bundle has been persisted for the named question.
    #[error("no snapshot captured for question '{question}'")]
    SnapshotNotFound { question: String },

    /// The snapshot store itself failed during capture.
    ///
    /// Per-key serialization failures are NOT this error — they are returned
    /// as data in the unshelved list.
    #[error("snapshot capture failed: {reason}")]
    SnapshotCapture { reason: String },

    /// A fragment set could not be rewritten or reopened in full.
    ///
    /// Always fatal to the restore call; no partially populated store is
    /// ever returned.
    #[error("snapshot restore failed: {reason}")]
    SnapshotRestore { reason: String },

    /// The log blob could not be written to its target path.
    #[error("could not persist log to '{path}': {reason}")]
    Persist { path: String, reason: String },

    /// A persisted log file exists but could not be read or decoded.
    ///
    /// An absent file is not this error — absent means a fresh empty log.
    #[error("persisted log at '{path}' is corrupt: {reason}")]
    PersistedLogCorrupt { path: String, reason: String },

    /// A failure captured inside an `EventRecord`, surfaced on request via
    /// `EventRecord::raise_if_error`.
    #[error("recorded failure: {0}")]
    Recorded(#[from] RecordedFailure),
}

/// Convenience alias used throughout the gradelog crates.
pub type GradeLogResult<T> = Result<T, GradeLogError>;
