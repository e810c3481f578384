//! The on-disk fragment format and its reader/writer.
//!
//! A shelf is two fragment files sharing the location prefix, in the manner
//! of dbm-backed stores:
//!
//!   - `<prefix>.dir` — JSON index mapping key → `[offset, len]` into the
//!     data file
//!   - `<prefix>.dat` — concatenated JSON-encoded `EnvValue` payloads
//!
//! `ShelfWriter` accumulates entries in memory and materializes both files
//! on `flush()`. `ShelfStore` reopens a flushed shelf and serves lookups.
//! Opening validates the whole index against the data file first: a shelf
//! that cannot be validated in full is rejected, never partially served.

use std::collections::BTreeMap;
use std::fs;

use gradelog_contracts::env::EnvValue;
use gradelog_contracts::error::{GradeLogError, GradeLogResult};

use crate::location::ShelfLocation;

/// Suffix of the index fragment.
pub const INDEX_SUFFIX: &str = ".dir";

/// Suffix of the data fragment.
pub const DATA_SUFFIX: &str = ".dat";

/// Index entry: byte offset and length of one value in the data fragment.
type Span = (u64, u64);

/// Accumulates key→value entries and writes the two fragment files.
pub struct ShelfWriter {
    location: ShelfLocation,
    index: BTreeMap<String, Span>,
    data: Vec<u8>,
}

impl ShelfWriter {
    /// Start an empty shelf at the given location. Nothing touches disk
    /// until `flush()`.
    pub fn create(location: ShelfLocation) -> Self {
        Self {
            location,
            index: BTreeMap::new(),
            data: Vec::new(),
        }
    }

    /// Encode one value and stage it under `key`.
    ///
    /// Fails only when the value itself cannot be encoded (e.g. a
    /// non-finite float, which JSON cannot represent). The writer is left
    /// unchanged on failure, so the caller can skip the key and continue —
    /// this is what makes per-key best-effort capture possible.
    pub fn put(&mut self, key: &str, value: &EnvValue) -> GradeLogResult<()> {
        let encoded = serde_json::to_vec(value).map_err(|e| GradeLogError::SnapshotCapture {
            reason: format!("value for key '{}' is not encodable: {}", key, e),
        })?;
        let offset = self.data.len() as u64;
        let len = encoded.len() as u64;
        self.data.extend_from_slice(&encoded);
        self.index.insert(key.to_string(), (offset, len));
        Ok(())
    }

    /// Write the data fragment, then the index fragment.
    ///
    /// The index is written last so a crash mid-flush leaves no index that
    /// points past the data actually on disk.
    pub fn flush(self) -> GradeLogResult<()> {
        let data_path = self.location.fragment_path(DATA_SUFFIX);
        fs::write(&data_path, &self.data).map_err(|e| GradeLogError::SnapshotCapture {
            reason: format!("could not write '{}': {}", data_path.display(), e),
        })?;

        let index_bytes =
            serde_json::to_vec(&self.index).map_err(|e| GradeLogError::SnapshotCapture {
                reason: format!("could not encode shelf index: {}", e),
            })?;
        let index_path = self.location.fragment_path(INDEX_SUFFIX);
        fs::write(&index_path, index_bytes).map_err(|e| GradeLogError::SnapshotCapture {
            reason: format!("could not write '{}': {}", index_path.display(), e),
        })?;

        Ok(())
    }
}

/// A reopened shelf: the live handle callers read restored values from.
#[derive(Debug)]
pub struct ShelfStore {
    location: ShelfLocation,
    index: BTreeMap<String, Span>,
    data: Vec<u8>,
}

impl ShelfStore {
    /// Open the shelf at `location` and validate it in full.
    ///
    /// Both fragments must exist, the index must decode, and every span
    /// must fall inside the data fragment. Any violation fails with
    /// `SnapshotRestore`; a partially valid shelf is never returned.
    pub fn open(location: &ShelfLocation) -> GradeLogResult<Self> {
        let index_path = location.fragment_path(INDEX_SUFFIX);
        let index_bytes = fs::read(&index_path).map_err(|e| GradeLogError::SnapshotRestore {
            reason: format!("missing or unreadable index fragment '{}': {}", index_path.display(), e),
        })?;
        let index: BTreeMap<String, Span> =
            serde_json::from_slice(&index_bytes).map_err(|e| GradeLogError::SnapshotRestore {
                reason: format!("index fragment '{}' is corrupt: {}", index_path.display(), e),
            })?;

        let data_path = location.fragment_path(DATA_SUFFIX);
        let data = fs::read(&data_path).map_err(|e| GradeLogError::SnapshotRestore {
            reason: format!("missing or unreadable data fragment '{}': {}", data_path.display(), e),
        })?;

        for (key, (offset, len)) in &index {
            match offset.checked_add(*len) {
                Some(end) if end <= data.len() as u64 => {}
                _ => {
                    return Err(GradeLogError::SnapshotRestore {
                        reason: format!(
                            "index entry for key '{}' points outside the data fragment",
                            key
                        ),
                    })
                }
            }
        }

        Ok(Self {
            location: location.clone(),
            index,
            data,
        })
    }

    /// Look up one key. `Ok(None)` when the key was never shelved.
    pub fn get(&self, key: &str) -> GradeLogResult<Option<EnvValue>> {
        let Some((offset, len)) = self.index.get(key) else {
            return Ok(None);
        };
        let start = *offset as usize;
        let end = start + *len as usize;
        let value =
            serde_json::from_slice(&self.data[start..end]).map_err(|e| {
                GradeLogError::SnapshotRestore {
                    reason: format!("shelved value for key '{}' is corrupt: {}", key, e),
                }
            })?;
        Ok(Some(value))
    }

    /// All shelved key names, in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Number of shelved keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the shelf holds no keys.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The location this shelf was opened from.
    pub fn location(&self) -> &ShelfLocation {
        &self.location
    }
}

#[cfg(test)]
mod tests {
    use gradelog_contracts::env::EnvValue;

    use super::*;

    fn temp_location() -> (tempfile::TempDir, ShelfLocation) {
        let dir = tempfile::tempdir().unwrap();
        let location = ShelfLocation::legacy(dir.path());
        (dir, location)
    }

    #[test]
    fn write_flush_open_get() {
        let (_dir, location) = temp_location();

        let mut writer = ShelfWriter::create(location.clone());
        writer.put("count", &EnvValue::Int(7)).unwrap();
        writer.put("name", &EnvValue::from("ada")).unwrap();
        writer.flush().unwrap();

        let store = ShelfStore::open(&location).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("count").unwrap(), Some(EnvValue::Int(7)));
        assert_eq!(store.get("name").unwrap(), Some(EnvValue::from("ada")));
        assert_eq!(store.get("absent").unwrap(), None);
    }

    #[test]
    fn put_rejects_non_finite_float() {
        let (_dir, location) = temp_location();
        let mut writer = ShelfWriter::create(location);
        assert!(writer.put("bad", &EnvValue::Float(f64::NAN)).is_err());
        // The writer is still usable after a rejected put.
        assert!(writer.put("good", &EnvValue::Float(1.5)).is_ok());
    }

    #[test]
    fn open_rejects_truncated_data_fragment() {
        let (_dir, location) = temp_location();

        let mut writer = ShelfWriter::create(location.clone());
        writer.put("key", &EnvValue::from("a reasonably long value")).unwrap();
        writer.flush().unwrap();

        // Truncate the data fragment so the index points past its end.
        std::fs::write(location.fragment_path(DATA_SUFFIX), b"{}").unwrap();

        match ShelfStore::open(&location).unwrap_err() {
            GradeLogError::SnapshotRestore { reason } => {
                assert!(reason.contains("outside the data fragment"))
            }
            other => panic!("expected SnapshotRestore, got {:?}", other),
        }
    }

    #[test]
    fn open_rejects_missing_index_fragment() {
        let (_dir, location) = temp_location();
        std::fs::write(location.fragment_path(DATA_SUFFIX), b"").unwrap();

        assert!(matches!(
            ShelfStore::open(&location),
            Err(GradeLogError::SnapshotRestore { .. })
        ));
    }
}
