//! Storage collaborator interface and the two shipped implementations.
//!
//! The DAG engine never touches storage directly: every lookup goes through
//! [`VertexStore`] and [`EdgeStore`]. A store is implemented once and
//! injected into [`crate::Dag`], which keeps cycle and duplicate checking
//! independent of the storage technology.
//!
//! - [`MemoryStore`]: in-memory store with bidirectional adjacency indexes.
//! - [`LogStore`]: durable store backed by an append-only, checksummed log.

mod log;
mod memory;

#[cfg(test)]
pub(crate) mod failing;

use std::sync::Arc;

use thiserror::Error;

use crate::graph::{Direction, EdgeId, Vertex, VertexKey};

pub use log::{LogStore, LogStoreOptions};
pub use memory::{MemoryGraph, MemoryStore};

/// Errors reported by a storage backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("record not found")]
    NotFound,

    /// A record with the same identity already exists.
    #[error("record already exists")]
    AlreadyExists,

    /// Underlying I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted data failed validation.
    #[error("Corrupted data: {0}")]
    Corrupted(String),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend cannot serve requests right now.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for storage operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Incrementally consumed sequence of vertex keys.
///
/// Each item carries its own result so a backend can report a failure on one
/// record without ending the enumeration.
pub type KeyCursor = Box<dyn Iterator<Item = StoreResult<VertexKey>> + Send>;

/// CRUD over vertex records.
pub trait VertexStore: Send + Sync {
    /// Persists a new vertex. Fails with [`StoreError::AlreadyExists`] if the key is taken.
    fn create_vertex(&self, vertex: Vertex) -> StoreResult<()>;

    /// Reads a vertex. Fails with [`StoreError::NotFound`] if absent.
    fn read_vertex(&self, key: &VertexKey) -> StoreResult<Vertex>;

    /// Removes a vertex together with any incident edges.
    fn delete_vertex(&self, key: &VertexKey) -> StoreResult<()>;

    /// Number of stored vertices.
    fn count_vertices(&self) -> StoreResult<u64>;

    /// Enumerates every vertex key.
    fn vertex_keys(&self) -> StoreResult<KeyCursor>;

    /// Returns true if a vertex with this key exists.
    fn contains_vertex(&self, key: &VertexKey) -> StoreResult<bool> {
        match self.read_vertex(key) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// CRUD and adjacency queries over directed edges.
pub trait EdgeStore: Send + Sync {
    /// Persists the edge `from -> to`. Fails with [`StoreError::AlreadyExists`]
    /// on a duplicate pair and [`StoreError::NotFound`] if an endpoint is missing.
    fn create_edge(&self, from: &VertexKey, to: &VertexKey) -> StoreResult<EdgeId>;

    /// Looks up the identifier of the edge `from -> to`.
    fn find_edge(&self, from: &VertexKey, to: &VertexKey) -> StoreResult<Option<EdgeId>>;

    /// Removes the edge `from -> to`. Fails with [`StoreError::NotFound`] if absent.
    fn delete_edge(&self, from: &VertexKey, to: &VertexKey) -> StoreResult<()>;

    /// Number of stored edges.
    fn count_edges(&self) -> StoreResult<u64>;

    /// Targets of the edges leaving `vertex`, in insertion order.
    fn outbound_neighbors(&self, vertex: &VertexKey) -> StoreResult<Vec<VertexKey>>;

    /// Sources of the edges entering `vertex`, in insertion order.
    fn inbound_neighbors(&self, vertex: &VertexKey) -> StoreResult<Vec<VertexKey>>;

    /// Vertices without outbound edges.
    fn zero_out_degree(&self) -> StoreResult<KeyCursor>;

    /// Vertices without inbound edges.
    fn zero_in_degree(&self) -> StoreResult<KeyCursor>;

    /// One-hop neighbours in the given direction.
    fn neighbors(&self, vertex: &VertexKey, direction: Direction) -> StoreResult<Vec<VertexKey>> {
        match direction {
            Direction::Outbound => self.outbound_neighbors(vertex),
            Direction::Inbound => self.inbound_neighbors(vertex),
        }
    }
}

/// A complete backing store: vertices and edges.
pub trait GraphStore: VertexStore + EdgeStore {}

impl<T: VertexStore + EdgeStore + ?Sized> GraphStore for T {}

macro_rules! forward_store {
    ($($ptr:ty),*) => {$(
        impl<T: VertexStore + ?Sized> VertexStore for $ptr {
            fn create_vertex(&self, vertex: Vertex) -> StoreResult<()> {
                (**self).create_vertex(vertex)
            }
            fn read_vertex(&self, key: &VertexKey) -> StoreResult<Vertex> {
                (**self).read_vertex(key)
            }
            fn delete_vertex(&self, key: &VertexKey) -> StoreResult<()> {
                (**self).delete_vertex(key)
            }
            fn count_vertices(&self) -> StoreResult<u64> {
                (**self).count_vertices()
            }
            fn vertex_keys(&self) -> StoreResult<KeyCursor> {
                (**self).vertex_keys()
            }
            fn contains_vertex(&self, key: &VertexKey) -> StoreResult<bool> {
                (**self).contains_vertex(key)
            }
        }

        impl<T: EdgeStore + ?Sized> EdgeStore for $ptr {
            fn create_edge(&self, from: &VertexKey, to: &VertexKey) -> StoreResult<EdgeId> {
                (**self).create_edge(from, to)
            }
            fn find_edge(&self, from: &VertexKey, to: &VertexKey) -> StoreResult<Option<EdgeId>> {
                (**self).find_edge(from, to)
            }
            fn delete_edge(&self, from: &VertexKey, to: &VertexKey) -> StoreResult<()> {
                (**self).delete_edge(from, to)
            }
            fn count_edges(&self) -> StoreResult<u64> {
                (**self).count_edges()
            }
            fn outbound_neighbors(&self, vertex: &VertexKey) -> StoreResult<Vec<VertexKey>> {
                (**self).outbound_neighbors(vertex)
            }
            fn inbound_neighbors(&self, vertex: &VertexKey) -> StoreResult<Vec<VertexKey>> {
                (**self).inbound_neighbors(vertex)
            }
            fn zero_out_degree(&self) -> StoreResult<KeyCursor> {
                (**self).zero_out_degree()
            }
            fn zero_in_degree(&self) -> StoreResult<KeyCursor> {
                (**self).zero_in_degree()
            }
        }
    )*};
}

forward_store!(&T, Arc<T>);
