//! # dagstore core
//!
//! A directed acyclic graph whose vertices and edges live in a pluggable
//! store, with mutations that can never break acyclicity.
//!
//! ## Features
//!
//! - **Cycle-safe edges**: every insertion is checked for duplicates, self
//!   loops and cycles under one write lock
//! - **Traversals**: shortest path, ancestors/descendants in BFS (deduplicated)
//!   or DFS (per-path) order, roots and leaves
//! - **Streaming**: cancellable, back-pressured enumerations on a producer thread
//! - **Storage**: in-memory store, or a durable store backed by a checksummed
//!   write-ahead log
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dagstore_core::store::LogStore;
//! use dagstore_core::{Dag, TraversalOrder};
//! use serde_json::json;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dag = Dag::new(LogStore::open("./dagstore-data")?);
//!
//!     let fetch = dag.add_vertex(json!({"_key": "fetch"}))?;
//!     let build = dag.add_vertex(json!({"_key": "build"}))?;
//!     let test = dag.add_vertex(json!({"_key": "test"}))?;
//!     dag.add_edge(&fetch, &build)?;
//!     dag.add_edge(&build, &test)?;
//!
//!     // Closing the loop is refused
//!     assert!(dag.add_edge(&test, &fetch).is_err());
//!
//!     dag.walk_ancestors(&test, TraversalOrder::Bfs, |key| {
//!         println!("{key} must run before test");
//!         Ok::<(), dagstore_core::Error>(())
//!     })?;
//!
//!     for root in dag.stream_roots()? {
//!         println!("root: {root}");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
// Clippy lints configured in workspace Cargo.toml [workspace.lints.clippy]
#![cfg_attr(
    test,
    allow(
        clippy::doc_markdown,
        clippy::uninlined_format_args,
        clippy::single_match_else,
        clippy::manual_assert
    )
)]

pub mod config;
#[cfg(test)]
mod config_tests;
mod dag;
pub mod error;
pub mod graph;
pub mod store;

pub use config::{ConfigError, DagConfig, LoggingConfig, StorageConfig};
pub use dag::Dag;
pub use error::{Error, Result};
pub use graph::{
    Direction, Edge, EdgeId, TraversalConfig, TraversalOrder, Vertex, VertexKey, VertexStream,
};
pub use store::{EdgeStore, GraphStore, LogStore, MemoryStore, StoreError, VertexStore};
