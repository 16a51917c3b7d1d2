//! Store with configurable failure injection for error-propagation tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::graph::{EdgeId, Vertex, VertexKey};

use super::{EdgeStore, KeyCursor, MemoryStore, StoreError, StoreResult, VertexStore};

/// Delegates to a [`MemoryStore`] but can inject I/O failures.
///
/// Set `neighbors_fail_at` to a call number to fail that adjacency lookup and
/// every later one (0 = never).
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    /// Fail adjacency lookups from this call number on (0 = never).
    pub neighbors_fail_at: AtomicU64,
    /// Fail opening zero-degree and key cursors.
    pub fail_cursor_open: AtomicBool,
    /// Fail `create_edge` after all validation passed.
    pub fail_create_edge: AtomicBool,
    /// Removed right before `create_edge` runs, as a writer bypassing the
    /// guard would.
    pub vanish_on_create_edge: Mutex<Option<VertexKey>>,
    /// Cursor items for these keys are replaced by an error.
    poisoned: Mutex<FxHashSet<VertexKey>>,
    neighbor_calls: AtomicU64,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poison(&self, key: &VertexKey) {
        self.poisoned.lock().insert(key.clone());
    }

    fn injected(what: &str) -> StoreError {
        StoreError::Io(std::io::Error::other(format!("Injected {what} failure")))
    }

    fn should_fail_neighbors(&self) -> bool {
        let count = self.neighbor_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let target = self.neighbors_fail_at.load(Ordering::SeqCst);
        target != 0 && count >= target
    }

    fn wrap(&self, cursor: StoreResult<KeyCursor>) -> StoreResult<KeyCursor> {
        if self.fail_cursor_open.load(Ordering::SeqCst) {
            return Err(Self::injected("cursor open"));
        }
        let poisoned = self.poisoned.lock().clone();
        Ok(Box::new(cursor?.map(move |item| match item {
            Ok(key) if poisoned.contains(&key) => Err(Self::injected("cursor item")),
            other => other,
        })))
    }
}

impl VertexStore for FailingStore {
    fn create_vertex(&self, vertex: Vertex) -> StoreResult<()> {
        self.inner.create_vertex(vertex)
    }

    fn read_vertex(&self, key: &VertexKey) -> StoreResult<Vertex> {
        self.inner.read_vertex(key)
    }

    fn delete_vertex(&self, key: &VertexKey) -> StoreResult<()> {
        self.inner.delete_vertex(key)
    }

    fn count_vertices(&self) -> StoreResult<u64> {
        self.inner.count_vertices()
    }

    fn vertex_keys(&self) -> StoreResult<KeyCursor> {
        self.wrap(self.inner.vertex_keys())
    }
}

impl EdgeStore for FailingStore {
    fn create_edge(&self, from: &VertexKey, to: &VertexKey) -> StoreResult<EdgeId> {
        if self.fail_create_edge.load(Ordering::SeqCst) {
            return Err(Self::injected("create_edge"));
        }
        if let Some(key) = self.vanish_on_create_edge.lock().take() {
            self.inner.delete_vertex(&key)?;
        }
        self.inner.create_edge(from, to)
    }

    fn find_edge(&self, from: &VertexKey, to: &VertexKey) -> StoreResult<Option<EdgeId>> {
        self.inner.find_edge(from, to)
    }

    fn delete_edge(&self, from: &VertexKey, to: &VertexKey) -> StoreResult<()> {
        self.inner.delete_edge(from, to)
    }

    fn count_edges(&self) -> StoreResult<u64> {
        self.inner.count_edges()
    }

    fn outbound_neighbors(&self, vertex: &VertexKey) -> StoreResult<Vec<VertexKey>> {
        if self.should_fail_neighbors() {
            return Err(Self::injected("outbound_neighbors"));
        }
        self.inner.outbound_neighbors(vertex)
    }

    fn inbound_neighbors(&self, vertex: &VertexKey) -> StoreResult<Vec<VertexKey>> {
        if self.should_fail_neighbors() {
            return Err(Self::injected("inbound_neighbors"));
        }
        self.inner.inbound_neighbors(vertex)
    }

    fn zero_out_degree(&self) -> StoreResult<KeyCursor> {
        self.wrap(self.inner.zero_out_degree())
    }

    fn zero_in_degree(&self) -> StoreResult<KeyCursor> {
        self.wrap(self.inner.zero_in_degree())
    }
}
