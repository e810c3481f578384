//! Session identity.

use serde::{Deserialize, Serialize};

/// Unique identifier for one grading session.
///
/// Used to namespace snapshot-store files so two sessions sharing a working
/// directory cannot race on the same fragments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    /// Create a new, unique session ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}
