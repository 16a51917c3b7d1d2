//! The public DAG facade.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::graph::traversal::TraversalEngine;
use crate::graph::walker::{ItemCursor, VertexStream};
use crate::graph::{
    Direction, EdgeId, InvariantGuard, TraversalConfig, TraversalOrder, Vertex, VertexKey,
};
use crate::store::{GraphStore, KeyCursor, StoreError};

/// A directed acyclic graph over an injected store.
///
/// Every edge insertion goes through the [`InvariantGuard`], so the stored
/// graph never contains a cycle, a self loop or a duplicate edge. Reads go
/// straight to the traversal engine.
///
/// `Dag` is cheap to clone. Clones share the store and the write lock, so
/// they can be handed to other threads.
///
/// # Example
///
/// ```rust
/// use dagstore_core::store::MemoryStore;
/// use dagstore_core::{Dag, Error};
/// use serde_json::json;
///
/// let dag = Dag::new(MemoryStore::new());
/// let a = dag.add_vertex(json!({"_key": "a"})).unwrap();
/// let b = dag.add_vertex(json!({"_key": "b"})).unwrap();
/// dag.add_edge(&a, &b).unwrap();
///
/// assert!(matches!(dag.add_edge(&b, &a), Err(Error::CycleDetected { .. })));
/// assert_eq!(dag.shortest_path(&a, &b).unwrap(), Some(vec![a, b]));
/// ```
///
/// The store is not reachable from outside, so no edge can bypass the guard:
///
/// ```compile_fail
/// use dagstore_core::store::{EdgeStore, MemoryStore};
/// use dagstore_core::{Dag, VertexKey};
///
/// let dag = Dag::new(MemoryStore::new());
/// let a = VertexKey::new("a").unwrap();
/// dag.store().create_edge(&a, &a).unwrap();
/// ```
pub struct Dag<S> {
    store: Arc<S>,
    guard: Arc<InvariantGuard>,
    engine: TraversalEngine,
}

impl<S> Clone for Dag<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            guard: Arc::clone(&self.guard),
            engine: self.engine,
        }
    }
}

impl<S: GraphStore> Dag<S> {
    /// Creates a DAG over `store` with the default traversal ceiling.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self::with_config(store, &TraversalConfig::default())
    }

    /// Creates a DAG over `store` with explicit traversal limits.
    #[must_use]
    pub fn with_config(store: S, config: &TraversalConfig) -> Self {
        Self {
            store: Arc::new(store),
            guard: Arc::new(InvariantGuard::new()),
            engine: TraversalEngine::new(config),
        }
    }

    /// The backing store. Writes made through it would skip the guard, so
    /// it stays inside the crate.
    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    /// The traversal ceiling in effect.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.engine.max_depth()
    }

    // ── Vertices ───────────────────────────────────────────────────────

    /// Adds a vertex and returns its key.
    ///
    /// The key is taken from the payload's `_key` field if present,
    /// otherwise a fresh one is generated.
    ///
    /// # Errors
    ///
    /// `InvalidKey` for a malformed `_key`, `VertexExists` if the key is taken.
    pub fn add_vertex(&self, payload: Value) -> Result<VertexKey> {
        self.insert_vertex(Vertex::from_payload(payload)?)
    }

    /// Adds a vertex under an explicit key.
    ///
    /// # Errors
    ///
    /// `VertexExists` if the key is taken.
    pub fn add_vertex_with_key(&self, key: VertexKey, payload: Value) -> Result<VertexKey> {
        self.insert_vertex(Vertex::new(key, payload))
    }

    fn insert_vertex(&self, vertex: Vertex) -> Result<VertexKey> {
        let key = vertex.key().clone();
        self.store.create_vertex(vertex).map_err(|err| match err {
            StoreError::AlreadyExists => Error::VertexExists(key.clone()),
            other => Error::Store(other),
        })?;
        debug!(vertex = %key, "Added vertex");
        Ok(key)
    }

    /// Reads a vertex.
    ///
    /// # Errors
    ///
    /// `VertexNotFound` if absent.
    pub fn get_vertex(&self, key: &VertexKey) -> Result<Vertex> {
        self.store.read_vertex(key).map_err(|err| match err {
            StoreError::NotFound => Error::VertexNotFound(key.clone()),
            other => Error::Store(other),
        })
    }

    /// Number of vertices.
    ///
    /// # Errors
    ///
    /// Returns a store failure.
    pub fn order(&self) -> Result<u64> {
        Ok(self.store.count_vertices()?)
    }

    /// All vertex keys.
    ///
    /// # Errors
    ///
    /// Returns the first store failure.
    pub fn vertices(&self) -> Result<Vec<VertexKey>> {
        collect(self.store.vertex_keys()?)
    }

    /// Deletes a vertex that has no incident edges.
    ///
    /// # Errors
    ///
    /// `VertexNotFound` if absent, `VertexHasEdges` while any edge touches it.
    pub fn delete_vertex(&self, key: &VertexKey) -> Result<()> {
        self.guard.exclusive(|| {
            TraversalEngine::require_vertex(&*self.store, key)?;
            let has_edges = !self.store.outbound_neighbors(key)?.is_empty()
                || !self.store.inbound_neighbors(key)?.is_empty();
            if has_edges {
                return Err(Error::VertexHasEdges(key.clone()));
            }
            self.store.delete_vertex(key).map_err(|err| match err {
                StoreError::NotFound => Error::VertexNotFound(key.clone()),
                other => Error::Store(other),
            })?;
            debug!(vertex = %key, "Deleted vertex");
            Ok(())
        })
    }

    // ── Edges ──────────────────────────────────────────────────────────

    /// Adds the edge `from -> to` if it keeps the graph acyclic.
    ///
    /// # Errors
    ///
    /// `VertexNotFound`, `DuplicateEdge`, `SelfLoop`, `CycleDetected`,
    /// `DepthExceeded`, or a store failure.
    pub fn add_edge(&self, from: &VertexKey, to: &VertexKey) -> Result<EdgeId> {
        self.guard.try_add_edge(&*self.store, &self.engine, from, to)
    }

    /// Returns true if the edge `from -> to` exists.
    ///
    /// # Errors
    ///
    /// `VertexNotFound` if either endpoint is missing.
    pub fn is_edge(&self, from: &VertexKey, to: &VertexKey) -> Result<bool> {
        TraversalEngine::require_vertex(&*self.store, from)?;
        TraversalEngine::require_vertex(&*self.store, to)?;
        Ok(self.store.find_edge(from, to)?.is_some())
    }

    /// Deletes the edge `from -> to`. Both vertices stay.
    ///
    /// # Errors
    ///
    /// `EdgeNotFound` if there is no such edge.
    pub fn delete_edge(&self, from: &VertexKey, to: &VertexKey) -> Result<()> {
        let not_found = || Error::EdgeNotFound {
            from: from.clone(),
            to: to.clone(),
        };
        self.guard.exclusive(|| {
            if self.store.find_edge(from, to)?.is_none() {
                return Err(not_found());
            }
            self.store.delete_edge(from, to).map_err(|err| match err {
                StoreError::NotFound => not_found(),
                other => Error::Store(other),
            })?;
            debug!(%from, %to, "Deleted edge");
            Ok(())
        })
    }

    /// Number of edges.
    ///
    /// # Errors
    ///
    /// Returns a store failure.
    pub fn size(&self) -> Result<u64> {
        Ok(self.store.count_edges()?)
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// Minimum-hop path from `src` to `dst`, or `None` if unreachable.
    ///
    /// # Errors
    ///
    /// `VertexNotFound`, `DepthExceeded`, or a store failure.
    pub fn shortest_path(
        &self,
        src: &VertexKey,
        dst: &VertexKey,
    ) -> Result<Option<Vec<VertexKey>>> {
        self.engine.shortest_path(&*self.store, src, dst)
    }

    /// Vertices without outbound edges.
    ///
    /// # Errors
    ///
    /// Returns the first store failure.
    pub fn leaves(&self) -> Result<Vec<VertexKey>> {
        self.engine.leaves(&*self.store)
    }

    /// Vertices without inbound edges.
    ///
    /// # Errors
    ///
    /// Returns the first store failure.
    pub fn roots(&self) -> Result<Vec<VertexKey>> {
        self.engine.roots(&*self.store)
    }

    /// Direct predecessors of `key`.
    ///
    /// # Errors
    ///
    /// `VertexNotFound` if absent.
    pub fn parents(&self, key: &VertexKey) -> Result<Vec<VertexKey>> {
        self.neighbors(key, Direction::Inbound)
    }

    /// Direct successors of `key`.
    ///
    /// # Errors
    ///
    /// `VertexNotFound` if absent.
    pub fn children(&self, key: &VertexKey) -> Result<Vec<VertexKey>> {
        self.neighbors(key, Direction::Outbound)
    }

    fn neighbors(&self, key: &VertexKey, direction: Direction) -> Result<Vec<VertexKey>> {
        TraversalEngine::require_vertex(&*self.store, key)?;
        Ok(self.store.neighbors(key, direction)?)
    }

    /// Every vertex from which `key` is reachable.
    ///
    /// # Errors
    ///
    /// `VertexNotFound`, `DepthExceeded`, or a store failure.
    pub fn ancestors(&self, key: &VertexKey) -> Result<HashSet<VertexKey>> {
        self.ordered(key, Direction::Inbound)
            .map(|keys| keys.into_iter().collect())
    }

    /// Every vertex reachable from `key`.
    ///
    /// # Errors
    ///
    /// `VertexNotFound`, `DepthExceeded`, or a store failure.
    pub fn descendants(&self, key: &VertexKey) -> Result<HashSet<VertexKey>> {
        self.ordered(key, Direction::Outbound)
            .map(|keys| keys.into_iter().collect())
    }

    /// Ancestors in breadth-first discovery order, nearest first.
    ///
    /// # Errors
    ///
    /// `VertexNotFound`, `DepthExceeded`, or a store failure.
    pub fn ordered_ancestors(&self, key: &VertexKey) -> Result<Vec<VertexKey>> {
        self.ordered(key, Direction::Inbound)
    }

    /// Descendants in breadth-first discovery order, nearest first.
    ///
    /// # Errors
    ///
    /// `VertexNotFound`, `DepthExceeded`, or a store failure.
    pub fn ordered_descendants(&self, key: &VertexKey) -> Result<Vec<VertexKey>> {
        self.ordered(key, Direction::Outbound)
    }

    fn ordered(&self, key: &VertexKey, direction: Direction) -> Result<Vec<VertexKey>> {
        TraversalEngine::require_vertex(&*self.store, key)?;
        self.engine
            .walk(&*self.store, key.clone(), direction, TraversalOrder::Bfs)
            .collect()
    }

    /// Calls `visit` for each ancestor of `key`.
    ///
    /// BFS visits every ancestor once; DFS visits an ancestor once per path
    /// leading to it. The first error, from the store or from `visit`,
    /// stops the walk and is returned.
    ///
    /// # Errors
    ///
    /// `VertexNotFound`, `DepthExceeded`, a store failure, or the visitor's error.
    pub fn walk_ancestors<E, F>(
        &self,
        key: &VertexKey,
        order: TraversalOrder,
        visit: F,
    ) -> std::result::Result<(), E>
    where
        E: From<Error>,
        F: FnMut(&VertexKey) -> std::result::Result<(), E>,
    {
        TraversalEngine::require_vertex(&*self.store, key)?;
        self.engine
            .visit(&*self.store, key, Direction::Inbound, order, visit)
    }

    /// Calls `visit` for each descendant of `key`. See [`Dag::walk_ancestors`].
    ///
    /// # Errors
    ///
    /// `VertexNotFound`, `DepthExceeded`, a store failure, or the visitor's error.
    pub fn walk_descendants<E, F>(
        &self,
        key: &VertexKey,
        order: TraversalOrder,
        visit: F,
    ) -> std::result::Result<(), E>
    where
        E: From<Error>,
        F: FnMut(&VertexKey) -> std::result::Result<(), E>,
    {
        TraversalEngine::require_vertex(&*self.store, key)?;
        self.engine
            .visit(&*self.store, key, Direction::Outbound, order, visit)
    }
}

impl<S: GraphStore + 'static> Dag<S> {
    /// Streams the roots.
    ///
    /// Keys are produced on a background thread one at a time as the
    /// consumer takes them. A store failure on one item is reported on
    /// [`VertexStream::errors`] and production continues.
    ///
    /// # Errors
    ///
    /// `Spawn` if the producer thread cannot be started. A failure to open
    /// the query is reported on the stream's error channel.
    pub fn stream_roots(&self) -> Result<VertexStream> {
        let store = Arc::clone(&self.store);
        VertexStream::spawn("roots", move || Ok(store_cursor(store.zero_in_degree()?)))
    }

    /// Streams the leaves. See [`Dag::stream_roots`].
    ///
    /// # Errors
    ///
    /// `Spawn` if the producer thread cannot be started.
    pub fn stream_leaves(&self) -> Result<VertexStream> {
        let store = Arc::clone(&self.store);
        VertexStream::spawn("leaves", move || {
            Ok(store_cursor(store.zero_out_degree()?))
        })
    }

    /// Streams the ancestors of `key` in breadth-first order.
    ///
    /// # Errors
    ///
    /// `VertexNotFound` if `key` is absent, `Spawn` if the producer thread
    /// cannot be started.
    pub fn stream_ancestors(&self, key: &VertexKey) -> Result<VertexStream> {
        self.stream_walk("ancestors", key, Direction::Inbound)
    }

    /// Streams the descendants of `key` in breadth-first order.
    ///
    /// # Errors
    ///
    /// `VertexNotFound` if `key` is absent, `Spawn` if the producer thread
    /// cannot be started.
    pub fn stream_descendants(&self, key: &VertexKey) -> Result<VertexStream> {
        self.stream_walk("descendants", key, Direction::Outbound)
    }

    fn stream_walk(
        &self,
        name: &str,
        key: &VertexKey,
        direction: Direction,
    ) -> Result<VertexStream> {
        TraversalEngine::require_vertex(&*self.store, key)?;
        let walk = self.engine.walk(
            Arc::clone(&self.store),
            key.clone(),
            direction,
            TraversalOrder::Bfs,
        );
        VertexStream::spawn(name, move || Ok(Box::new(walk) as ItemCursor))
    }
}

fn store_cursor(cursor: KeyCursor) -> ItemCursor {
    Box::new(cursor.map(|item| item.map_err(Error::from)))
}

fn collect(cursor: KeyCursor) -> Result<Vec<VertexKey>> {
    cursor.map(|item| item.map_err(Error::from)).collect()
}

/// Lists every vertex followed by its children, one vertex per line:
///
/// ```text
/// a -> [b, c]
/// b -> [c]
/// c -> []
/// ```
///
/// A store failure is rendered inline rather than aborting the listing.
impl<S: GraphStore> fmt::Display for Dag<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = match self.vertices() {
            Ok(keys) => keys,
            Err(err) => return write!(f, "<{err}>"),
        };
        for key in keys {
            match self.store.outbound_neighbors(&key) {
                Ok(children) => {
                    let children: Vec<&str> = children.iter().map(VertexKey::as_str).collect();
                    writeln!(f, "{key} -> [{}]", children.join(", "))?;
                }
                Err(err) => writeln!(f, "{key} -> <{err}>")?,
            }
        }
        Ok(())
    }
}

impl<S> fmt::Debug for Dag<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dag")
            .field("max_depth", &self.engine.max_depth())
            .finish_non_exhaustive()
    }
}
