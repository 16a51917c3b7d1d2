//! DAG domain types, the traversal engine, the invariant guard and the
//! streaming walker.
//!
//! Everything here works against the store traits in [`crate::store`] and
//! never assumes a particular backend.
//!
//! # Example
//!
//! ```rust
//! use dagstore_core::graph::traversal::{TraversalConfig, TraversalEngine};
//! use dagstore_core::graph::{Direction, TraversalOrder, Vertex, VertexKey};
//! use dagstore_core::store::{EdgeStore, MemoryStore, VertexStore};
//! use serde_json::Value;
//!
//! let store = MemoryStore::new();
//! for name in ["a", "b", "c"] {
//!     store.create_vertex(Vertex::new(VertexKey::new(name).unwrap(), Value::Null)).unwrap();
//! }
//! let (a, b, c) = (
//!     VertexKey::new("a").unwrap(),
//!     VertexKey::new("b").unwrap(),
//!     VertexKey::new("c").unwrap(),
//! );
//! store.create_edge(&a, &b).unwrap();
//! store.create_edge(&b, &c).unwrap();
//!
//! let engine = TraversalEngine::new(&TraversalConfig::default());
//! let below_a: Vec<VertexKey> = engine
//!     .walk(&store, a, Direction::Outbound, TraversalOrder::Bfs)
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(below_a, vec![b, c]);
//! ```

mod guard;
pub mod traversal;
mod types;
pub mod walker;

#[cfg(test)]
mod guard_tests;

pub use guard::InvariantGuard;
pub use traversal::{TraversalConfig, TraversalEngine, Walk};
pub use types::{Direction, Edge, EdgeId, TraversalOrder, Vertex, VertexKey, KEY_FIELD};
pub use walker::{CancelHandle, VertexStream};
