//! Best-effort capture and all-or-nothing restore of an environment.
//!
//! Capture is best-effort per key: a value that cannot be expressed or
//! encoded is reported in the unshelved list and the rest of the
//! environment is still captured. The store itself failing (directory not
//! writable, fragment write error) is fatal.
//!
//! Restore is the opposite: all fragments are rewritten and reopened as a
//! single logical unit, and any failure aborts the whole operation before
//! a handle is returned.

use std::collections::BTreeMap;
use std::fs;

use tracing::{debug, info};

use gradelog_contracts::env::Environment;
use gradelog_contracts::error::{GradeLogError, GradeLogResult};

use crate::location::ShelfLocation;
use crate::store::{ShelfStore, ShelfWriter};

/// Serializes environments to fragment files at one location and restores
/// them from captured fragment sets.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    location: ShelfLocation,
}

impl SnapshotStore {
    /// A snapshot store rooted at the given location.
    pub fn new(location: ShelfLocation) -> Self {
        Self { location }
    }

    /// The location this store reads and writes.
    pub fn location(&self) -> &ShelfLocation {
        &self.location
    }

    /// Capture an environment to fragment files and read them back.
    ///
    /// Stale fragments from any prior capture at this location are deleted
    /// first so fragments from different sessions can never mix. Returns
    /// the fragment set as `suffix → raw bytes` plus the names of keys that
    /// could not be captured. A single bad value never aborts the capture.
    pub fn capture(
        &self,
        env: &Environment,
    ) -> GradeLogResult<(BTreeMap<String, Vec<u8>>, Vec<String>)> {
        fs::create_dir_all(self.location.dir()).map_err(|e| GradeLogError::SnapshotCapture {
            reason: format!(
                "could not create snapshot directory '{}': {}",
                self.location.dir().display(),
                e
            ),
        })?;
        self.clear_fragments(|reason| GradeLogError::SnapshotCapture { reason })?;

        let mut writer = ShelfWriter::create(self.location.clone());
        let mut unshelved = Vec::new();
        for (key, value) in env {
            if !value.is_expressible() {
                debug!(key = %key, "value has no serializable form, unshelving");
                unshelved.push(key.clone());
                continue;
            }
            if let Err(e) = writer.put(key, value) {
                debug!(key = %key, error = %e, "value failed to encode, unshelving");
                unshelved.push(key.clone());
            }
        }
        writer.flush()?;

        let mut files = BTreeMap::new();
        let fragments = self
            .location
            .fragments()
            .map_err(|e| GradeLogError::SnapshotCapture {
                reason: format!("could not list fragment files: {}", e),
            })?;
        for (suffix, path) in fragments {
            let bytes = fs::read(&path).map_err(|e| GradeLogError::SnapshotCapture {
                reason: format!("could not read back fragment '{}': {}", path.display(), e),
            })?;
            files.insert(suffix, bytes);
        }

        info!(
            prefix = %self.location.prefix(),
            shelved = env.len() - unshelved.len(),
            unshelved = unshelved.len(),
            "environment captured"
        );
        Ok((files, unshelved))
    }

    /// Rewrite a captured fragment set and reopen the shelf.
    ///
    /// Two phases: materialize every `prefix + suffix` file, then open the
    /// store. If any fragment write fails the whole restore fails with
    /// `SnapshotRestore` and no handle is returned.
    pub fn restore(&self, files: &BTreeMap<String, Vec<u8>>) -> GradeLogResult<ShelfStore> {
        fs::create_dir_all(self.location.dir()).map_err(|e| GradeLogError::SnapshotRestore {
            reason: format!(
                "could not create snapshot directory '{}': {}",
                self.location.dir().display(),
                e
            ),
        })?;
        self.clear_fragments(|reason| GradeLogError::SnapshotRestore { reason })?;

        for (suffix, bytes) in files {
            let path = self.location.fragment_path(suffix);
            fs::write(&path, bytes).map_err(|e| GradeLogError::SnapshotRestore {
                reason: format!("could not write fragment '{}': {}", path.display(), e),
            })?;
        }

        let store = ShelfStore::open(&self.location)?;
        info!(
            prefix = %self.location.prefix(),
            keys = store.len(),
            "environment restored"
        );
        Ok(store)
    }

    /// Delete every fragment currently at this location.
    fn clear_fragments(
        &self,
        wrap: impl Fn(String) -> GradeLogError,
    ) -> GradeLogResult<()> {
        let fragments = self
            .location
            .fragments()
            .map_err(|e| wrap(format!("could not list stale fragments: {}", e)))?;
        for (_, path) in fragments {
            fs::remove_file(&path).map_err(|e| {
                wrap(format!(
                    "could not remove stale fragment '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}
