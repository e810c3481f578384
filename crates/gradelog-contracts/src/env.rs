//! Environment values: the capability-bounded snapshot contract.
//!
//! The runtime state a caller wants preserved is a name→value mapping.
//! Rather than accepting arbitrary values and discovering mid-capture which
//! ones cannot be serialized, the contract is narrowed up front to a tagged
//! union of expressible forms. A value with no serializable form is
//! represented by `Opaque`, which capture rejects before touching the store
//! and reports in the unshelved list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The name→value mapping a caller asks the snapshot store to preserve.
///
/// `BTreeMap` so capture order is deterministic.
pub type Environment = BTreeMap<String, EnvValue>;

/// One value in an environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum EnvValue {
    /// An explicit null.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating-point number. Non-finite floats have no JSON encoding and
    /// end up unshelved at capture time.
    Float(f64),
    /// A UTF-8 string.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Arbitrary structured data.
    Json(serde_json::Value),
    /// Placeholder for a runtime value that has no serializable form.
    ///
    /// Capture never stores this variant; the key is reported as unshelved
    /// instead, preserving the name for diagnostics.
    Opaque {
        /// The runtime type name of the value that could not be expressed.
        type_name: String,
    },
}

impl EnvValue {
    /// Whether this value can be written to the snapshot store at all.
    pub fn is_expressible(&self) -> bool {
        !matches!(self, Self::Opaque { .. })
    }
}

impl From<bool> for EnvValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for EnvValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for EnvValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for EnvValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for EnvValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<serde_json::Value> for EnvValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}
