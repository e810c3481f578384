//! # gradelog-shelf
//!
//! Best-effort environment snapshot store for the gradelog workspace.
//!
//! ## Overview
//!
//! A grading session's runtime state — the "environment" — is a name→value
//! mapping. `SnapshotStore` serializes it to fragment files sharing a
//! `ShelfLocation` prefix, tolerating per-key failures (the unshelved
//! list), and restores a captured fragment set into a live `ShelfStore`
//! handle. `SnapshotBundle` is the self-contained, digest-protected form in
//! which one question's capture is persisted.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gradelog_shelf::{ShelfLocation, SnapshotStore};
//!
//! let store = SnapshotStore::new(ShelfLocation::legacy("."));
//! let (files, unshelved) = store.capture(&env)?;
//! // ... later ...
//! let shelf = store.restore(&files)?;
//! let value = shelf.get("total_points")?;
//! ```

pub mod bundle;
pub mod location;
pub mod snapshot;
pub mod store;

pub use bundle::{digest_fragments, SnapshotBundle};
pub use location::{ShelfLocation, LEGACY_PREFIX};
pub use snapshot::SnapshotStore;
pub use store::{ShelfStore, ShelfWriter, DATA_SUFFIX, INDEX_SUFFIX};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use gradelog_contracts::env::{EnvValue, Environment};
    use gradelog_contracts::error::GradeLogError;
    use gradelog_contracts::session::SessionId;

    use super::{ShelfLocation, SnapshotBundle, SnapshotStore};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn env_of(pairs: &[(&str, EnvValue)]) -> Environment {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    // ── Capture / restore ─────────────────────────────────────────────────────

    /// Capturing a small environment and restoring it reads every value back.
    #[test]
    fn capture_restore_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(ShelfLocation::legacy(dir.path()));

        let env = env_of(&[
            ("a", EnvValue::Int(1)),
            ("b", EnvValue::from("x")),
            ("grades", EnvValue::Json(json!({ "q1": 0.5 }))),
        ]);

        let (files, unshelved) = store.capture(&env).unwrap();
        assert!(unshelved.is_empty());
        assert!(!files.is_empty(), "capture must produce fragment files");

        let shelf = store.restore(&files).unwrap();
        assert_eq!(shelf.get("a").unwrap(), Some(EnvValue::Int(1)));
        assert_eq!(shelf.get("b").unwrap(), Some(EnvValue::from("x")));
        assert_eq!(
            shelf.get("grades").unwrap(),
            Some(EnvValue::Json(json!({ "q1": 0.5 })))
        );
    }

    /// One inexpressible value is unshelved; the other keys still restore.
    #[test]
    fn opaque_value_is_unshelved_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(ShelfLocation::legacy(dir.path()));

        let env = env_of(&[
            ("conn", EnvValue::Opaque {
                type_name: "sqlite3.Connection".to_string(),
            }),
            ("x", EnvValue::Int(3)),
            ("y", EnvValue::from("kept")),
        ]);

        let (files, unshelved) = store.capture(&env).unwrap();
        assert_eq!(unshelved, vec!["conn".to_string()]);

        let shelf = store.restore(&files).unwrap();
        assert_eq!(shelf.get("conn").unwrap(), None);
        assert_eq!(shelf.get("x").unwrap(), Some(EnvValue::Int(3)));
        assert_eq!(shelf.get("y").unwrap(), Some(EnvValue::from("kept")));
    }

    /// A non-finite float fails JSON encoding mid-capture and is unshelved.
    #[test]
    fn non_finite_float_is_unshelved() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(ShelfLocation::legacy(dir.path()));

        let env = env_of(&[
            ("nan", EnvValue::Float(f64::NAN)),
            ("pi", EnvValue::Float(3.14)),
        ]);

        let (files, unshelved) = store.capture(&env).unwrap();
        assert_eq!(unshelved, vec!["nan".to_string()]);

        let shelf = store.restore(&files).unwrap();
        assert_eq!(shelf.get("pi").unwrap(), Some(EnvValue::Float(3.14)));
    }

    /// A second capture at the same location sweeps the first capture's
    /// fragments: nothing from capture one is readable afterwards.
    #[test]
    fn recapture_leaves_no_stale_fragments() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(ShelfLocation::legacy(dir.path()));

        let first = env_of(&[("old_key", EnvValue::from("old"))]);
        store.capture(&first).unwrap();

        let second = env_of(&[("new_key", EnvValue::from("new"))]);
        let (files, _) = store.capture(&second).unwrap();

        let shelf = store.restore(&files).unwrap();
        assert_eq!(shelf.get("old_key").unwrap(), None);
        assert_eq!(shelf.get("new_key").unwrap(), Some(EnvValue::from("new")));
    }

    /// An empty fragment set cannot be opened as a store.
    #[test]
    fn restore_of_empty_fragment_set_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(ShelfLocation::legacy(dir.path()));

        let result = store.restore(&BTreeMap::new());
        assert!(matches!(
            result,
            Err(GradeLogError::SnapshotRestore { .. })
        ));
    }

    /// Two session-scoped locations in one directory do not interfere.
    #[test]
    fn session_locations_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store_a = SnapshotStore::new(ShelfLocation::for_session(dir.path(), &SessionId::new()));
        let store_b = SnapshotStore::new(ShelfLocation::for_session(dir.path(), &SessionId::new()));

        let (files_a, _) = store_a.capture(&env_of(&[("k", EnvValue::Int(1))])).unwrap();
        let (files_b, _) = store_b.capture(&env_of(&[("k", EnvValue::Int(2))])).unwrap();

        // Restoring A after B captured must still read A's value.
        let shelf_a = store_a.restore(&files_a).unwrap();
        let shelf_b = store_b.restore(&files_b).unwrap();
        assert_eq!(shelf_a.get("k").unwrap(), Some(EnvValue::Int(1)));
        assert_eq!(shelf_b.get("k").unwrap(), Some(EnvValue::Int(2)));
    }

    // ── Bundles ───────────────────────────────────────────────────────────────

    /// A bundle built from a real capture verifies and restores.
    #[test]
    fn bundle_seals_a_capture() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(ShelfLocation::legacy(dir.path()));

        let env = env_of(&[("total", EnvValue::Float(9.5))]);
        let (files, unshelved) = store.capture(&env).unwrap();

        let bundle = SnapshotBundle::new("q1", files, unshelved);
        assert!(bundle.verify());

        let shelf = store.restore(&bundle.files).unwrap();
        assert_eq!(shelf.get("total").unwrap(), Some(EnvValue::Float(9.5)));
    }

    /// Distinct question names produce distinct bundle paths even when the
    /// names only differ by characters hostile to filesystems.
    #[test]
    fn bundle_paths_are_collision_free() {
        let location = ShelfLocation::legacy(".");
        let a = location.bundle_path("q1/part a");
        let b = location.bundle_path("q1_part-a");
        assert_ne!(a, b);
        // Hex encoding keeps path separators and spaces out of the name.
        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(super::LEGACY_PREFIX));
        assert!(name.ends_with(".bundle"));
        assert!(!name.contains(' '));
    }
}
