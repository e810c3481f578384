//! The persisted form of one question's captured environment.
//!
//! A bundle is self-contained: the raw bytes of every fragment file, the
//! names of keys that could not be captured, and a SHA-256 digest over the
//! fragment set. The digest lets restore detect a corrupted or tampered
//! bundle before any fragment reaches disk.
//!
//! Digest input layout (bytes, in order):
//!   1. question as UTF-8 bytes
//!   2. for every fragment in suffix order:
//!      a. suffix as UTF-8 bytes
//!      b. fragment length as 8-byte little-endian
//!      c. fragment bytes

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest of a fragment set, as lowercase hex.
///
/// The length of each fragment is fed in explicitly so two adjacent
/// fragments cannot be re-split into the same byte stream.
pub fn digest_fragments(question: &str, files: &BTreeMap<String, Vec<u8>>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(question.as_bytes());
    for (suffix, bytes) in files {
        hasher.update(suffix.as_bytes());
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    hex::encode(hasher.finalize())
}

/// One question's captured environment, persisted as a single blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotBundle {
    /// The question this capture belongs to.
    pub question: String,

    /// Fragment suffix → raw file bytes, rewritten verbatim on restore.
    pub files: BTreeMap<String, Vec<u8>>,

    /// Keys from the source environment that could not be captured.
    /// Preserved for diagnostics, never silently dropped.
    pub unshelved: Vec<String>,

    /// Wall-clock time (UTC) the capture was taken.
    pub captured_at: DateTime<Utc>,

    /// SHA-256 (lowercase hex) over the question and fragment set.
    pub digest: String,
}

impl SnapshotBundle {
    /// Seal a capture into a bundle, computing its digest.
    pub fn new(
        question: impl Into<String>,
        files: BTreeMap<String, Vec<u8>>,
        unshelved: Vec<String>,
    ) -> Self {
        let question = question.into();
        let digest = digest_fragments(&question, &files);
        Self {
            question,
            files,
            unshelved,
            captured_at: Utc::now(),
            digest,
        }
    }

    /// Recompute the digest and compare it to the stored one.
    pub fn verify(&self) -> bool {
        digest_fragments(&self.question, &self.files) == self.digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_files() -> BTreeMap<String, Vec<u8>> {
        let mut files = BTreeMap::new();
        files.insert(".dat".to_string(), b"payload-bytes".to_vec());
        files.insert(".dir".to_string(), b"{\"k\":[0,13]}".to_vec());
        files
    }

    #[test]
    fn fresh_bundle_verifies() {
        let bundle = SnapshotBundle::new("q1", sample_files(), vec![]);
        assert!(bundle.verify());
    }

    #[test]
    fn mutated_fragment_breaks_verification() {
        let mut bundle = SnapshotBundle::new("q1", sample_files(), vec![]);
        bundle
            .files
            .insert(".dat".to_string(), b"TAMPERED".to_vec());
        assert!(!bundle.verify(), "digest must detect a mutated fragment");
    }

    #[test]
    fn digest_depends_on_question() {
        let a = digest_fragments("q1", &sample_files());
        let b = digest_fragments("q2", &sample_files());
        assert_ne!(a, b);
    }

    #[test]
    fn bundle_round_trips_through_serde() {
        let original = SnapshotBundle::new(
            "q7",
            sample_files(),
            vec!["unpicklable_handle".to_string()],
        );
        let encoded = serde_json::to_vec(&original).unwrap();
        let decoded: SnapshotBundle = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(original, decoded);
        assert!(decoded.verify());
    }
}
