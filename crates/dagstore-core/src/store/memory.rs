//! In-memory graph storage with bidirectional adjacency indexes.
//!
//! [`MemoryGraph`] is the plain single-owner index; [`MemoryStore`] wraps it
//! in a lock and implements the store traits. [`super::LogStore`] reuses the
//! same index and adds a write-ahead log in front of it.

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::graph::{EdgeId, Vertex, VertexKey};

use super::{EdgeStore, KeyCursor, StoreError, StoreResult, VertexStore};

type Adjacency = IndexMap<VertexKey, EdgeId, FxBuildHasher>;

/// Vertices and edges indexed for O(1) pair lookup and O(degree) expansion.
///
/// Vertices and neighbour lists keep insertion order, so enumerations are
/// deterministic for a given history of mutations.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    /// All vertices in insertion order.
    vertices: IndexMap<VertexKey, Vertex, FxBuildHasher>,
    /// Outgoing edges: source -> (target -> edge id).
    outgoing: FxHashMap<VertexKey, Adjacency>,
    /// Incoming edges: target -> (source -> edge id).
    incoming: FxHashMap<VertexKey, Adjacency>,
    edge_count: usize,
    next_edge_id: EdgeId,
}

impl MemoryGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Vertex CRUD ────────────────────────────────────────────────────

    /// Adds a vertex.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the key is taken.
    pub fn insert_vertex(&mut self, vertex: Vertex) -> StoreResult<()> {
        if self.vertices.contains_key(vertex.key()) {
            return Err(StoreError::AlreadyExists);
        }
        self.vertices.insert(vertex.key().clone(), vertex);
        Ok(())
    }

    /// Gets a vertex by key.
    #[must_use]
    pub fn vertex(&self, key: &str) -> Option<&Vertex> {
        self.vertices.get(key)
    }

    /// Returns true if the vertex exists.
    #[must_use]
    pub fn has_vertex(&self, key: &str) -> bool {
        self.vertices.contains_key(key)
    }

    /// Removes a vertex and all its incident edges (cascade delete).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the vertex does not exist.
    pub fn remove_vertex(&mut self, key: &str) -> StoreResult<Vertex> {
        let vertex = self
            .vertices
            .shift_remove(key)
            .ok_or(StoreError::NotFound)?;
        let self_loop = usize::from(self.edge(key, key).is_some());
        self.edge_count -= self.out_degree(key) + self.in_degree(key) - self_loop;

        let outgoing = self.outgoing.remove(key).unwrap_or_default();
        for target in outgoing.keys() {
            if let Some(sources) = self.incoming.get_mut(target) {
                sources.shift_remove(key);
            }
        }
        let incoming = self.incoming.remove(key).unwrap_or_default();
        for source in incoming.keys() {
            if let Some(targets) = self.outgoing.get_mut(source) {
                targets.shift_remove(key);
            }
        }
        Ok(vertex)
    }

    /// Returns the number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns all vertex keys in insertion order.
    #[must_use]
    pub fn vertex_keys(&self) -> Vec<VertexKey> {
        self.vertices.keys().cloned().collect()
    }

    // ── Edge CRUD ──────────────────────────────────────────────────────

    /// Adds the edge `from -> to` and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if an endpoint is missing and
    /// `StoreError::AlreadyExists` if the pair is already present.
    pub fn insert_edge(&mut self, from: &VertexKey, to: &VertexKey) -> StoreResult<EdgeId> {
        self.check_insert_edge(from.as_str(), to.as_str())?;
        let id = self.next_edge_id;
        self.next_edge_id += 1;
        self.outgoing
            .entry(from.clone())
            .or_default()
            .insert(to.clone(), id);
        self.incoming
            .entry(to.clone())
            .or_default()
            .insert(from.clone(), id);
        self.edge_count += 1;
        Ok(id)
    }

    /// Validates an edge insertion without applying it.
    pub(crate) fn check_insert_edge(&self, from: &str, to: &str) -> StoreResult<()> {
        if !self.has_vertex(from) || !self.has_vertex(to) {
            return Err(StoreError::NotFound);
        }
        if self.edge(from, to).is_some() {
            return Err(StoreError::AlreadyExists);
        }
        Ok(())
    }

    /// Gets the identifier of the edge `from -> to`.
    #[must_use]
    pub fn edge(&self, from: &str, to: &str) -> Option<EdgeId> {
        self.outgoing.get(from)?.get(to).copied()
    }

    /// Removes the edge `from -> to`, cleaning up both indexes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the edge does not exist.
    pub fn remove_edge(&mut self, from: &str, to: &str) -> StoreResult<EdgeId> {
        let id = self
            .outgoing
            .get_mut(from)
            .and_then(|targets| targets.shift_remove(to))
            .ok_or(StoreError::NotFound)?;
        if let Some(sources) = self.incoming.get_mut(to) {
            sources.shift_remove(from);
        }
        self.edge_count -= 1;
        Ok(id)
    }

    /// Returns the total number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Targets of the edges leaving `key`.
    #[must_use]
    pub fn outbound(&self, key: &str) -> Vec<VertexKey> {
        self.outgoing
            .get(key)
            .map(|targets| targets.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Sources of the edges entering `key`.
    #[must_use]
    pub fn inbound(&self, key: &str) -> Vec<VertexKey> {
        self.incoming
            .get(key)
            .map(|sources| sources.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the out-degree of a vertex.
    #[must_use]
    pub fn out_degree(&self, key: &str) -> usize {
        self.outgoing.get(key).map_or(0, IndexMap::len)
    }

    /// Returns the in-degree of a vertex.
    #[must_use]
    pub fn in_degree(&self, key: &str) -> usize {
        self.incoming.get(key).map_or(0, IndexMap::len)
    }

    /// Vertices with out-degree 0, in insertion order.
    #[must_use]
    pub fn sinks(&self) -> Vec<VertexKey> {
        self.vertices
            .keys()
            .filter(|key| self.out_degree(key.as_str()) == 0)
            .cloned()
            .collect()
    }

    /// Vertices with in-degree 0, in insertion order.
    #[must_use]
    pub fn sources(&self) -> Vec<VertexKey> {
        self.vertices
            .keys()
            .filter(|key| self.in_degree(key.as_str()) == 0)
            .cloned()
            .collect()
    }
}

/// Thread-safe in-memory store.
///
/// Each call takes the lock once, so every adjacency lookup observes a
/// consistent snapshot.
///
/// # Example
///
/// ```rust
/// use dagstore_core::store::{EdgeStore, MemoryStore, VertexStore};
/// use dagstore_core::graph::{Vertex, VertexKey};
/// use serde_json::Value;
///
/// let store = MemoryStore::new();
/// let a = VertexKey::new("a").unwrap();
/// let b = VertexKey::new("b").unwrap();
/// store.create_vertex(Vertex::new(a.clone(), Value::Null)).unwrap();
/// store.create_vertex(Vertex::new(b.clone(), Value::Null)).unwrap();
/// store.create_edge(&a, &b).unwrap();
/// assert_eq!(store.outbound_neighbors(&a).unwrap(), vec![b]);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    graph: RwLock<MemoryGraph>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing graph.
    #[must_use]
    pub fn from_graph(graph: MemoryGraph) -> Self {
        Self {
            graph: RwLock::new(graph),
        }
    }
}

pub(super) fn key_cursor(keys: Vec<VertexKey>) -> KeyCursor {
    Box::new(keys.into_iter().map(Ok))
}

impl VertexStore for MemoryStore {
    fn create_vertex(&self, vertex: Vertex) -> StoreResult<()> {
        self.graph.write().insert_vertex(vertex)
    }

    fn read_vertex(&self, key: &VertexKey) -> StoreResult<Vertex> {
        self.graph
            .read()
            .vertex(key.as_str())
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn delete_vertex(&self, key: &VertexKey) -> StoreResult<()> {
        self.graph.write().remove_vertex(key.as_str()).map(|_| ())
    }

    fn count_vertices(&self) -> StoreResult<u64> {
        Ok(self.graph.read().vertex_count() as u64)
    }

    fn vertex_keys(&self) -> StoreResult<KeyCursor> {
        Ok(key_cursor(self.graph.read().vertex_keys()))
    }

    fn contains_vertex(&self, key: &VertexKey) -> StoreResult<bool> {
        Ok(self.graph.read().has_vertex(key.as_str()))
    }
}

impl EdgeStore for MemoryStore {
    fn create_edge(&self, from: &VertexKey, to: &VertexKey) -> StoreResult<EdgeId> {
        self.graph.write().insert_edge(from, to)
    }

    fn find_edge(&self, from: &VertexKey, to: &VertexKey) -> StoreResult<Option<EdgeId>> {
        Ok(self.graph.read().edge(from.as_str(), to.as_str()))
    }

    fn delete_edge(&self, from: &VertexKey, to: &VertexKey) -> StoreResult<()> {
        self.graph
            .write()
            .remove_edge(from.as_str(), to.as_str())
            .map(|_| ())
    }

    fn count_edges(&self) -> StoreResult<u64> {
        Ok(self.graph.read().edge_count() as u64)
    }

    fn outbound_neighbors(&self, vertex: &VertexKey) -> StoreResult<Vec<VertexKey>> {
        Ok(self.graph.read().outbound(vertex.as_str()))
    }

    fn inbound_neighbors(&self, vertex: &VertexKey) -> StoreResult<Vec<VertexKey>> {
        Ok(self.graph.read().inbound(vertex.as_str()))
    }

    fn zero_out_degree(&self) -> StoreResult<KeyCursor> {
        Ok(key_cursor(self.graph.read().sinks()))
    }

    fn zero_in_degree(&self) -> StoreResult<KeyCursor> {
        Ok(key_cursor(self.graph.read().sources()))
    }
}
