//! Admission control for edge insertions.

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::store::{EdgeStore, StoreError, VertexStore};

use super::traversal::TraversalEngine;
use super::types::{EdgeId, VertexKey};

/// Gate that keeps the graph acyclic and duplicate-free.
///
/// All structural mutations run under one write mutex, so the checks and the
/// write they protect form a single atomic step: two concurrent insertions
/// can never jointly close a cycle. Readers never take this lock.
#[derive(Debug, Default)]
pub struct InvariantGuard {
    write_lock: Mutex<()>,
}

impl InvariantGuard {
    /// Creates a guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `from -> to` if it keeps the graph a valid DAG.
    ///
    /// # Errors
    ///
    /// - `VertexNotFound` if either endpoint is missing
    /// - `DuplicateEdge` if the edge already exists
    /// - `SelfLoop` if `from == to`
    /// - `CycleDetected` if `from` is reachable from `to`
    /// - `DepthExceeded` if reachability could not be decided within the ceiling
    /// - `Store` for any backend failure
    pub fn try_add_edge<S>(
        &self,
        store: &S,
        engine: &TraversalEngine,
        from: &VertexKey,
        to: &VertexKey,
    ) -> Result<EdgeId>
    where
        S: VertexStore + EdgeStore + ?Sized,
    {
        let _lock = self.write_lock.lock();

        TraversalEngine::require_vertex(store, from)?;
        TraversalEngine::require_vertex(store, to)?;

        let rejection = if store.find_edge(from, to)?.is_some() {
            Some(Error::DuplicateEdge {
                from: from.clone(),
                to: to.clone(),
            })
        } else if from == to {
            Some(Error::SelfLoop(from.clone()))
        } else if engine.reaches(store, to, from)? {
            Some(Error::CycleDetected {
                from: from.clone(),
                to: to.clone(),
            })
        } else {
            None
        };
        if let Some(err) = rejection {
            debug!(%from, %to, error = %err, "Rejected edge");
            return Err(err);
        }

        let id = store.create_edge(from, to).map_err(|err| match err {
            StoreError::AlreadyExists => Error::DuplicateEdge {
                from: from.clone(),
                to: to.clone(),
            },
            StoreError::NotFound => missing_endpoint(store, from, to),
            other => Error::Store(other),
        })?;
        trace!(%from, %to, edge_id = id, "Admitted edge");
        Ok(id)
    }

    /// Runs a mutation that cannot create a cycle (edge or vertex deletion)
    /// while holding the write lock.
    ///
    /// # Errors
    ///
    /// Returns whatever `mutation` returns.
    pub fn exclusive<T>(&self, mutation: impl FnOnce() -> Result<T>) -> Result<T> {
        let _lock = self.write_lock.lock();
        mutation()
    }
}

/// Names the endpoint the store could not find. Falls back to `from` when
/// the lookup itself fails.
fn missing_endpoint<S>(store: &S, from: &VertexKey, to: &VertexKey) -> Error
where
    S: VertexStore + ?Sized,
{
    match store.contains_vertex(from) {
        Ok(true) => Error::VertexNotFound(to.clone()),
        _ => Error::VertexNotFound(from.clone()),
    }
}
