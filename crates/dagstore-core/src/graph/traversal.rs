//! Read-only graph queries: walks, shortest path and root/leaf enumeration.
//!
//! Every query is expressed in terms of the adjacency lookups of an
//! [`EdgeStore`], so the same engine runs over any backing store. All walks
//! share one routine, [`Walk`], parameterised by direction and by
//! [`TraversalOrder`] (queue + global dedup for BFS, stack without dedup
//! for DFS).

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};
use crate::store::{EdgeStore, KeyCursor, VertexStore};

use super::types::{Direction, TraversalOrder, VertexKey};

/// Default ceiling on the number of hops a traversal may take.
pub const DEFAULT_MAX_DEPTH: usize = 10_000;

/// Configuration for graph traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Maximum number of hops from the start vertex. Going deeper is an
    /// error, never a silent truncation.
    pub max_depth: usize,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl TraversalConfig {
    /// Creates a config with the given depth ceiling.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

/// Lazy walk over the vertices reachable from a start vertex.
///
/// The start vertex itself is never yielded. In BFS order each reachable
/// vertex is yielded once, at its shortest-hop discovery. In DFS order
/// (preorder, neighbours in store order) a vertex reachable over several
/// paths is yielded once per path.
///
/// A store failure while expanding a vertex is yielded as an `Err` item and
/// the walk continues with the rest of the frontier. Exceeding the depth
/// ceiling yields `Error::DepthExceeded` and ends the walk.
pub struct Walk<S> {
    store: S,
    direction: Direction,
    order: TraversalOrder,
    max_depth: usize,
    frontier: VecDeque<(VertexKey, usize)>,
    /// Vertices already discovered (BFS only).
    seen: Option<FxHashSet<VertexKey>>,
    /// Last yielded vertex, expanded on the following call.
    pending: Option<(VertexKey, usize)>,
    done: bool,
}

impl<S: EdgeStore> Walk<S> {
    /// Starts a walk at `start`.
    pub fn new(
        store: S,
        start: VertexKey,
        direction: Direction,
        order: TraversalOrder,
        max_depth: usize,
    ) -> Self {
        let seen = order.deduplicates().then(|| {
            let mut seen = FxHashSet::default();
            seen.insert(start.clone());
            seen
        });
        Self {
            store,
            direction,
            order,
            max_depth,
            frontier: VecDeque::new(),
            seen,
            pending: Some((start, 0)),
            done: false,
        }
    }

    fn expand(&mut self, vertex: &VertexKey, depth: usize) -> Result<()> {
        let neighbors = self.store.neighbors(vertex, self.direction)?;
        let fresh: Vec<VertexKey> = match self.seen.as_mut() {
            Some(seen) => neighbors
                .into_iter()
                .filter(|key| seen.insert(key.clone()))
                .collect(),
            None => neighbors,
        };
        if fresh.is_empty() {
            return Ok(());
        }
        if depth >= self.max_depth {
            return Err(Error::DepthExceeded(self.max_depth));
        }

        trace!(vertex = %vertex, depth, discovered = fresh.len(), "Expanded vertex");
        match self.order {
            TraversalOrder::Bfs => self
                .frontier
                .extend(fresh.into_iter().map(|key| (key, depth + 1))),
            // Reversed so the first neighbour ends up on top of the stack.
            TraversalOrder::Dfs => self
                .frontier
                .extend(fresh.into_iter().rev().map(|key| (key, depth + 1))),
        }
        Ok(())
    }
}

impl<S: EdgeStore> Iterator for Walk<S> {
    type Item = Result<VertexKey>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some((vertex, depth)) = self.pending.take() {
            if let Err(err) = self.expand(&vertex, depth) {
                if matches!(err, Error::DepthExceeded(_)) {
                    self.done = true;
                }
                return Some(Err(err));
            }
        }

        let next = match self.order {
            TraversalOrder::Bfs => self.frontier.pop_front(),
            TraversalOrder::Dfs => self.frontier.pop_back(),
        };
        let Some((vertex, depth)) = next else {
            self.done = true;
            return None;
        };
        self.pending = Some((vertex.clone(), depth));
        Some(Ok(vertex))
    }
}

/// Query engine over a backing store.
#[derive(Debug, Clone, Copy)]
pub struct TraversalEngine {
    max_depth: usize,
}

impl Default for TraversalEngine {
    fn default() -> Self {
        Self::new(&TraversalConfig::default())
    }
}

impl TraversalEngine {
    /// Creates an engine with the configured depth ceiling.
    #[must_use]
    pub fn new(config: &TraversalConfig) -> Self {
        Self {
            max_depth: config.max_depth,
        }
    }

    /// The depth ceiling applied to every traversal.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Fails with `VertexNotFound` unless `key` exists.
    pub(crate) fn require_vertex<S: VertexStore + ?Sized>(store: &S, key: &VertexKey) -> Result<()> {
        if store.contains_vertex(key)? {
            Ok(())
        } else {
            Err(Error::VertexNotFound(key.clone()))
        }
    }

    /// Starts a lazy walk. The caller is responsible for checking that
    /// `start` exists.
    pub fn walk<S: EdgeStore>(
        &self,
        store: S,
        start: VertexKey,
        direction: Direction,
        order: TraversalOrder,
    ) -> Walk<S> {
        Walk::new(store, start, direction, order, self.max_depth)
    }

    /// Runs a walk to completion, calling `visit` once per step.
    ///
    /// The first error, from the store or from `visit`, aborts the walk.
    ///
    /// # Errors
    ///
    /// Returns the store failure, `DepthExceeded`, or the visitor's error.
    pub fn visit<S, E, F>(
        &self,
        store: &S,
        start: &VertexKey,
        direction: Direction,
        order: TraversalOrder,
        mut visit: F,
    ) -> std::result::Result<(), E>
    where
        S: EdgeStore + ?Sized,
        E: From<Error>,
        F: FnMut(&VertexKey) -> std::result::Result<(), E>,
    {
        for step in self.walk(store, start.clone(), direction, order) {
            let key = step.map_err(E::from)?;
            visit(&key)?;
        }
        Ok(())
    }

    /// Returns true if `target` is reachable from `from` over outbound edges.
    ///
    /// # Errors
    ///
    /// Returns the first store failure or `DepthExceeded`.
    pub fn reaches<S: EdgeStore + ?Sized>(
        &self,
        store: &S,
        from: &VertexKey,
        target: &VertexKey,
    ) -> Result<bool> {
        if from == target {
            return Ok(true);
        }
        for step in self.walk(store, from.clone(), Direction::Outbound, TraversalOrder::Bfs) {
            if step? == *target {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Minimum-hop path from `src` to `dst`, both included.
    ///
    /// Returns `Ok(None)` if `dst` is unreachable. Among several shortest
    /// paths the one discovered first wins, which is deterministic for a
    /// fixed neighbour enumeration order.
    ///
    /// # Errors
    ///
    /// Returns `VertexNotFound` for a missing endpoint, a store failure or
    /// `DepthExceeded`.
    pub fn shortest_path<S: VertexStore + EdgeStore + ?Sized>(
        &self,
        store: &S,
        src: &VertexKey,
        dst: &VertexKey,
    ) -> Result<Option<Vec<VertexKey>>> {
        Self::require_vertex(store, src)?;
        Self::require_vertex(store, dst)?;
        if src == dst {
            return Ok(Some(vec![src.clone()]));
        }

        let mut predecessor: FxHashMap<VertexKey, VertexKey> = FxHashMap::default();
        let mut queue = VecDeque::from([(src.clone(), 0usize)]);

        while let Some((current, depth)) = queue.pop_front() {
            for next in store.outbound_neighbors(&current)? {
                if next == *src || predecessor.contains_key(&next) {
                    continue;
                }
                if depth >= self.max_depth {
                    return Err(Error::DepthExceeded(self.max_depth));
                }
                predecessor.insert(next.clone(), current.clone());
                if next == *dst {
                    return Ok(Some(reconstruct(&predecessor, src, dst)));
                }
                queue.push_back((next, depth + 1));
            }
        }
        Ok(None)
    }

    /// Vertices with no outbound edges.
    ///
    /// # Errors
    ///
    /// Returns the first store failure.
    pub fn leaves<S: EdgeStore + ?Sized>(&self, store: &S) -> Result<Vec<VertexKey>> {
        collect_cursor(store.zero_out_degree()?)
    }

    /// Vertices with no inbound edges.
    ///
    /// # Errors
    ///
    /// Returns the first store failure.
    pub fn roots<S: EdgeStore + ?Sized>(&self, store: &S) -> Result<Vec<VertexKey>> {
        collect_cursor(store.zero_in_degree()?)
    }
}

fn reconstruct(
    predecessor: &FxHashMap<VertexKey, VertexKey>,
    src: &VertexKey,
    dst: &VertexKey,
) -> Vec<VertexKey> {
    let mut path = vec![dst.clone()];
    let mut current = dst;
    while current != src {
        match predecessor.get(current) {
            Some(prev) => {
                path.push(prev.clone());
                current = prev;
            }
            None => break,
        }
    }
    path.reverse();
    path
}

fn collect_cursor(cursor: KeyCursor) -> Result<Vec<VertexKey>> {
    cursor
        .map(|item| item.map_err(Error::from))
        .collect()
}
