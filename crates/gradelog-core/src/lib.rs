//! # gradelog-core
//!
//! The grading event log: an ordered collection of grading-relevant events
//! with per-question lookup, opaque-state snapshot delegation, and
//! whole-log persistence.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gradelog_core::EventLog;
//! use gradelog_shelf::ShelfLocation;
//!
//! let mut log = EventLog::new(ShelfLocation::legacy("."));
//! log.add_entry(EventKind::Init, None, true, None, vec![]);
//! log.add_entry(EventKind::Check, Some("q1"), true, None, vec![score]);
//! let unshelved = log.capture_snapshot("q1", &env)?;
//! log.persist(Path::new(".gradelog"))?;
//! ```
//!
//! Single-threaded and synchronous by design: every operation runs to
//! completion on the caller's thread. On-disk artifacts are identified by
//! the log's `ShelfLocation`; two sessions sharing one location race, so
//! either keep one writer per location or namespace locations per session
//! with `ShelfLocation::for_session`.

pub mod log;

pub use crate::log::EventLog;

// ── Tests ─────────────────────────────────────────────────────────────────────
