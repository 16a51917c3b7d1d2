//! Error types for DAG operations.
//!
//! Validation failures (`VertexNotFound`, `DuplicateEdge`, `SelfLoop`,
//! `CycleDetected`, ...) are ordinary results that callers are expected to
//! handle as control flow. Storage failures are passed through unchanged as
//! [`Error::Store`].

use thiserror::Error;

use crate::config::ConfigError;
use crate::graph::VertexKey;
use crate::store::StoreError;

/// Errors returned by the DAG engine.
#[derive(Error, Debug)]
pub enum Error {
    /// The referenced vertex does not exist.
    #[error("Vertex not found: {0}")]
    VertexNotFound(VertexKey),

    /// The referenced edge does not exist.
    #[error("Edge not found: {from} -> {to}")]
    EdgeNotFound {
        /// Source vertex.
        from: VertexKey,
        /// Target vertex.
        to: VertexKey,
    },

    /// A vertex with this key already exists.
    #[error("Vertex already exists: {0}")]
    VertexExists(VertexKey),

    /// The supplied vertex key is not acceptable.
    #[error("Invalid vertex key: {0}")]
    InvalidKey(String),

    /// The edge is already present.
    #[error("Duplicate edge: {from} -> {to}")]
    DuplicateEdge {
        /// Source vertex.
        from: VertexKey,
        /// Target vertex.
        to: VertexKey,
    },

    /// An edge from a vertex to itself was requested.
    #[error("Self loop on vertex {0}")]
    SelfLoop(VertexKey),

    /// The edge would close a directed cycle.
    #[error("Edge {from} -> {to} would create a cycle")]
    CycleDetected {
        /// Source vertex.
        from: VertexKey,
        /// Target vertex.
        to: VertexKey,
    },

    /// A traversal went deeper than the configured ceiling.
    #[error("Traversal exceeded the maximum depth of {0} hops")]
    DepthExceeded(usize),

    /// The vertex cannot be deleted while edges still reference it.
    #[error("Vertex {0} still has incident edges")]
    VertexHasEdges(VertexKey),

    /// The backing store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A streaming producer thread could not be started.
    #[error("Failed to spawn stream producer: {0}")]
    Spawn(#[source] std::io::Error),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Returns true for a missing vertex or edge.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::VertexNotFound(_) | Self::EdgeNotFound { .. })
    }

    /// Returns true for mutations refused to keep the graph a valid DAG.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateEdge { .. } | Self::SelfLoop(_) | Self::CycleDetected { .. }
        )
    }
}

/// Result type alias for DAG operations.
pub type Result<T> = std::result::Result<T, Error>;
