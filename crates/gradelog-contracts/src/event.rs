//! Event records and their kinds.
//!
//! `EventRecord` is one immutable occurrence in a grading session. The log
//! owns ordering; a record itself never changes after construction. Failures
//! observed while grading ride along as `RecordedFailure` data, not control
//! flow, until a caller asks for them via `raise_if_error`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{GradeLogError, GradeLogResult};

/// The closed set of grading-relevant occurrences.
///
/// Extensible only by adding variants here, so every `match` in the
/// workspace is checked for exhaustiveness when a kind is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A caller authenticated against the grading service.
    Auth,
    /// Start of a check-all pass over every question.
    BeginCheckAll,
    /// Start of a notebook/script export.
    BeginExport,
    /// One question was checked; the only question-scoped kind.
    Check,
    /// End of a check-all pass.
    EndCheckAll,
    /// End of an export.
    EndExport,
    /// The grading session was initialized.
    Init,
    /// A submission was sent off.
    Submit,
    /// A PDF was generated from the notebook.
    ToPdf,
}

impl EventKind {
    /// The snake_case name used on the wire and by the demo CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::BeginCheckAll => "begin_check_all",
            Self::BeginExport => "begin_export",
            Self::Check => "check",
            Self::EndCheckAll => "end_check_all",
            Self::EndExport => "end_export",
            Self::Init => "init",
            Self::Submit => "submit",
            Self::ToPdf => "to_pdf",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = GradeLogError;

    /// Parse the snake_case kind name. This is the single boundary where an
    /// invalid kind can be observed; it fails with `InvalidEventKind`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auth" => Ok(Self::Auth),
            "begin_check_all" => Ok(Self::BeginCheckAll),
            "begin_export" => Ok(Self::BeginExport),
            "check" => Ok(Self::Check),
            "end_check_all" => Ok(Self::EndCheckAll),
            "end_export" => Ok(Self::EndExport),
            "init" => Ok(Self::Init),
            "submit" => Ok(Self::Submit),
            "to_pdf" => Ok(Self::ToPdf),
            other => Err(GradeLogError::InvalidEventKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// A failure captured while grading, stored inside an `EventRecord`.
///
/// Serializable so it survives log persistence, and an `Error` so a caller
/// replaying the log can propagate it with `?` after `raise_if_error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
pub struct RecordedFailure {
    /// Human-readable description of what went wrong.
    pub message: String,
}

impl RecordedFailure {
    /// Capture a failure message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One immutable entry in the grading log.
///
/// Tracks the event kind, when it happened, whether the operation succeeded,
/// any captured failure, and — for `Check` records — the opaque grading
/// result payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// What happened.
    pub kind: EventKind,

    /// Wall-clock time (UTC) the record was constructed. Not guaranteed
    /// strictly increasing across records created within the same tick.
    pub timestamp: DateTime<Utc>,

    /// The question this record is scoped to; set for `Check` records.
    pub question: Option<String>,

    /// Whether the logged operation succeeded.
    pub success: bool,

    /// A failure captured during the operation, if any. Data, not control
    /// flow — see `raise_if_error`.
    pub error: Option<RecordedFailure>,

    /// Opaque grading result payloads. Zero or more may be attached, but
    /// `get_results` returns only the first (the primary result).
    pub results: Vec<serde_json::Value>,
}

impl EventRecord {
    /// Construct a record stamped with the current UTC time.
    pub fn new(
        kind: EventKind,
        question: Option<String>,
        success: bool,
        error: Option<RecordedFailure>,
        results: Vec<serde_json::Value>,
    ) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
            question,
            success,
            error,
            results,
        }
    }

    /// Replace the construction timestamp with an explicit instant.
    ///
    /// For replaying history and for building out-of-order fixtures.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The primary grading result stored at this record.
    ///
    /// Valid only for `Check` records; fails with `NotACheckRecord`
    /// otherwise. When multiple payloads are present only the first is
    /// returned — a most-recent/primary-result convention, not aggregation.
    pub fn get_results(&self) -> GradeLogResult<&serde_json::Value> {
        if self.kind != EventKind::Check {
            return Err(GradeLogError::NotACheckRecord {
                question: self.question.clone().unwrap_or_default(),
                kind: self.kind,
            });
        }
        self.results
            .first()
            .ok_or_else(|| GradeLogError::MissingResults {
                question: self.question.clone().unwrap_or_default(),
            })
    }

    /// Propagate the failure captured at this record, if any.
    ///
    /// No-op when `error` is unset. Callers replaying a log use this for
    /// fail-fast semantics.
    pub fn raise_if_error(&self) -> GradeLogResult<()> {
        match &self.error {
            Some(failure) => Err(GradeLogError::Recorded(failure.clone())),
            None => Ok(()),
        }
    }

    /// Sort records by timestamp, in place.
    ///
    /// Stable: records with equal timestamps keep their current relative
    /// order, whichever direction is requested. Standalone so it can be used
    /// against any slice of records, not just a log's own entries.
    pub fn sort_records(records: &mut [EventRecord], ascending: bool) {
        if ascending {
            records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        } else {
            records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        }
    }
}
