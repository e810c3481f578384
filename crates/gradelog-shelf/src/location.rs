//! Where a shelf lives on disk.
//!
//! A single process-wide fixed filename for the snapshot store would make
//! two sessions in the same directory race on the same fragments.
//! `ShelfLocation` makes the identity explicit instead: a directory plus a
//! name prefix, threaded through every capture/restore call. The legacy
//! fixed prefix remains the default for compatibility; session-scoped
//! prefixes make concurrent sessions safe.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use gradelog_contracts::session::SessionId;

/// The fixed name prefix used when no session namespacing is requested.
pub const LEGACY_PREFIX: &str = ".GRADELOG_ENV";

/// Identifies one snapshot store on disk: a directory and a name prefix.
///
/// Fragment files are named `<prefix><suffix>` where every suffix starts
/// with a dot (e.g. `.dir`, `.dat`). Bundle files are named
/// `<prefix>_<hex(question)>.bundle` — the underscore keeps them outside
/// the fragment namespace so a capture's stale-file sweep never touches
/// persisted bundles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfLocation {
    dir: PathBuf,
    prefix: String,
}

impl ShelfLocation {
    /// A location with the legacy fixed prefix.
    ///
    /// Single-writer-per-directory is the caller's responsibility here; use
    /// `for_session` to namespace instead.
    pub fn legacy(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: LEGACY_PREFIX.to_string(),
        }
    }

    /// A location namespaced by session ID, so two sessions sharing a
    /// working directory cannot clobber each other's fragments.
    pub fn for_session(dir: impl Into<PathBuf>, session: &SessionId) -> Self {
        Self {
            dir: dir.into(),
            prefix: format!("{}_{}", LEGACY_PREFIX, session.0.simple()),
        }
    }

    /// The directory fragments and bundles are written into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The name prefix shared by this store's files.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full path of the fragment with the given suffix.
    ///
    /// The suffix carries its leading dot.
    pub fn fragment_path(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.prefix, suffix))
    }

    /// Full path of the persisted bundle for a question.
    ///
    /// The question name is hex-encoded: injective for any two distinct
    /// questions and safe for filesystems regardless of what characters the
    /// question contains.
    pub fn bundle_path(&self, question: &str) -> PathBuf {
        self.dir
            .join(format!("{}_{}.bundle", self.prefix, hex::encode(question)))
    }

    /// Every fragment file currently on disk at this location, as
    /// `(suffix, path)` pairs sorted by suffix.
    ///
    /// A missing directory yields an empty list.
    pub fn fragments(&self) -> std::io::Result<Vec<(String, PathBuf)>> {
        let mut found = Vec::new();
        match std::fs::read_dir(&self.dir) {
            Ok(entries) => {
                for entry in entries {
                    let entry = entry?;
                    let name = entry.file_name();
                    let Some(name) = name.to_str() else { continue };
                    if let Some(suffix) = name.strip_prefix(&self.prefix) {
                        if suffix.starts_with('.') {
                            found.push((suffix.to_string(), entry.path()));
                        }
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        found.sort();
        Ok(found)
    }
}

impl Default for ShelfLocation {
    fn default() -> Self {
        Self::legacy(".")
    }
}
