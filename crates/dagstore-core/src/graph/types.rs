//! Vertex, edge and traversal types.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Payload field that, when present, supplies the vertex key.
pub const KEY_FIELD: &str = "_key";

/// Store-assigned edge identifier.
pub type EdgeId = u64;

/// Unique, immutable identifier of a vertex.
///
/// Keys are non-empty strings. They hash and compare like the underlying
/// string, so maps keyed by `VertexKey` can be queried with `&str`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VertexKey(String);

impl VertexKey {
    /// Creates a key, rejecting empty or whitespace-only input.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidKey` if the key is blank.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(Error::InvalidKey(
                "Vertex key cannot be empty or whitespace-only".to_string(),
            ));
        }
        Ok(Self(key))
    }

    /// Generates a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VertexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for VertexKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for VertexKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for VertexKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for VertexKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for VertexKey {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<VertexKey> for String {
    fn from(key: VertexKey) -> Self {
        key.0
    }
}

/// A vertex: its key and an opaque JSON payload.
///
/// # Example
///
/// ```rust
/// use dagstore_core::graph::Vertex;
/// use serde_json::json;
///
/// let vertex = Vertex::from_payload(json!({"_key": "build", "cmd": "make"})).unwrap();
/// assert_eq!(vertex.key().as_str(), "build");
/// assert_eq!(vertex.payload()["cmd"], "make");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    key: VertexKey,
    payload: Value,
}

impl Vertex {
    /// Creates a vertex with an explicit key.
    #[must_use]
    pub fn new(key: VertexKey, payload: Value) -> Self {
        Self { key, payload }
    }

    /// Creates a vertex whose key comes from the payload's `_key` field,
    /// or a generated key when the payload has none.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidKey` if `_key` is present but is not a
    /// non-empty string.
    pub fn from_payload(payload: Value) -> Result<Self> {
        let key = match payload.get(KEY_FIELD) {
            None | Some(Value::Null) => VertexKey::generate(),
            Some(Value::String(key)) => VertexKey::new(key.as_str())?,
            Some(other) => {
                return Err(Error::InvalidKey(format!(
                    "`{KEY_FIELD}` must be a string, got {other}"
                )))
            }
        };
        Ok(Self { key, payload })
    }

    /// Returns the vertex key.
    #[must_use]
    pub fn key(&self) -> &VertexKey {
        &self.key
    }

    /// Returns the payload.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Consumes the vertex, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> Value {
        self.payload
    }
}

/// A directed edge, identified by its `(from, to)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    from: VertexKey,
    to: VertexKey,
}

impl Edge {
    /// Creates the edge `from -> to`.
    #[must_use]
    pub fn new(from: VertexKey, to: VertexKey) -> Self {
        Self { from, to }
    }

    /// Source vertex.
    #[must_use]
    pub fn from(&self) -> &VertexKey {
        &self.from
    }

    /// Target vertex.
    #[must_use]
    pub fn to(&self) -> &VertexKey {
        &self.to
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Frontier discipline of a walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalOrder {
    /// Queue frontier, globally deduplicated.
    #[default]
    Bfs,
    /// Stack frontier, no deduplication.
    Dfs,
}

impl TraversalOrder {
    /// Whether a walk in this order visits each vertex at most once.
    #[must_use]
    pub fn deduplicates(self) -> bool {
        matches!(self, Self::Bfs)
    }
}

/// Edge direction followed by a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Follow edges from source to target (descendants).
    Outbound,
    /// Follow edges from target to source (ancestors).
    Inbound,
}

impl Direction {
    /// The opposite direction.
    #[must_use]
    pub fn reverse(self) -> Self {
        match self {
            Self::Outbound => Self::Inbound,
            Self::Inbound => Self::Outbound,
        }
    }
}
