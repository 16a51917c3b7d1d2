//! Tests for InvariantGuard edge admission.

use std::sync::atomic::Ordering;

use serde_json::Value;

use super::guard::InvariantGuard;
use super::traversal::{TraversalConfig, TraversalEngine};
use super::types::{EdgeId, Vertex, VertexKey};
use crate::error::{Error, Result};
use crate::store::failing::FailingStore;
use crate::store::{EdgeStore, GraphStore, MemoryStore};

fn key(s: &str) -> VertexKey {
    VertexKey::new(s).unwrap()
}

fn populate<S: GraphStore>(store: &S, vertices: &[&str]) {
    for name in vertices {
        store
            .create_vertex(Vertex::new(key(name), Value::Null))
            .unwrap();
    }
}

fn add<S: GraphStore>(guard: &InvariantGuard, store: &S, from: &str, to: &str) -> Result<EdgeId> {
    guard.try_add_edge(store, &TraversalEngine::default(), &key(from), &key(to))
}

#[test]
fn test_admits_valid_edges() {
    let store = MemoryStore::new();
    populate(&store, &["a", "b", "c"]);
    let guard = InvariantGuard::new();

    add(&guard, &store, "a", "b").unwrap();
    add(&guard, &store, "b", "c").unwrap();
    add(&guard, &store, "a", "c").unwrap();
    assert_eq!(store.count_edges().unwrap(), 3);
}

#[test]
fn test_rejects_self_loop() {
    let store = MemoryStore::new();
    populate(&store, &["x"]);
    let guard = InvariantGuard::new();

    let result = add(&guard, &store, "x", "x");
    assert!(matches!(result, Err(Error::SelfLoop(k)) if k == key("x")));
    assert_eq!(store.count_edges().unwrap(), 0);
}

#[test]
fn test_rejects_duplicate_edge() {
    let store = MemoryStore::new();
    populate(&store, &["a", "b"]);
    let guard = InvariantGuard::new();

    add(&guard, &store, "a", "b").unwrap();
    let result = add(&guard, &store, "a", "b");
    assert!(matches!(result, Err(Error::DuplicateEdge { .. })));
    assert_eq!(store.count_edges().unwrap(), 1);
}

#[test]
fn test_rejects_cycle() {
    let store = MemoryStore::new();
    populate(&store, &["a", "b", "c"]);
    let guard = InvariantGuard::new();

    add(&guard, &store, "a", "b").unwrap();
    add(&guard, &store, "b", "c").unwrap();
    let result = add(&guard, &store, "c", "a");
    assert!(matches!(
        result,
        Err(Error::CycleDetected { ref from, ref to }) if *from == key("c") && *to == key("a")
    ));
    // Reverse of an existing edge is a two-vertex cycle
    assert!(matches!(
        add(&guard, &store, "b", "a"),
        Err(Error::CycleDetected { .. })
    ));
    assert!(store.find_edge(&key("c"), &key("a")).unwrap().is_none());
}

#[test]
fn test_rejects_missing_vertex() {
    let store = MemoryStore::new();
    populate(&store, &["a"]);
    let guard = InvariantGuard::new();

    let result = add(&guard, &store, "a", "ghost");
    assert!(matches!(result, Err(Error::VertexNotFound(k)) if k == key("ghost")));
    let result = add(&guard, &store, "ghost", "a");
    assert!(matches!(result, Err(Error::VertexNotFound(k)) if k == key("ghost")));
}

#[test]
fn test_fails_closed_at_depth_ceiling() {
    let store = MemoryStore::new();
    populate(&store, &["a", "b", "c", "d"]);
    let guard = InvariantGuard::new();
    let shallow = TraversalEngine::new(&TraversalConfig::new(1));

    add(&guard, &store, "a", "b").unwrap();
    add(&guard, &store, "b", "c").unwrap();
    add(&guard, &store, "c", "d").unwrap();
    // d is two hops below b, one more than the ceiling allows
    let result = guard.try_add_edge(&store, &shallow, &key("d"), &key("b"));
    assert!(matches!(result, Err(Error::DepthExceeded(1))));
    assert!(store.find_edge(&key("d"), &key("b")).unwrap().is_none());
}

#[test]
fn test_propagates_store_failure_on_insert() {
    let store = FailingStore::new();
    populate(&store, &["a", "b"]);
    store.fail_create_edge.store(true, Ordering::SeqCst);
    let guard = InvariantGuard::new();

    let result = add(&guard, &store, "a", "b");
    assert!(matches!(result, Err(Error::Store(_))));
}

#[test]
fn test_propagates_store_failure_during_cycle_check() {
    let store = FailingStore::new();
    populate(&store, &["a", "b", "c"]);
    let guard = InvariantGuard::new();
    add(&guard, &store, "a", "b").unwrap();
    store.neighbors_fail_at.store(1, Ordering::SeqCst);

    let result = add(&guard, &store, "b", "c");
    assert!(matches!(result, Err(Error::Store(_))));
    store.neighbors_fail_at.store(0, Ordering::SeqCst);
    assert!(store.find_edge(&key("b"), &key("c")).unwrap().is_none());
}

#[test]
fn test_exclusive_runs_mutation() {
    let guard = InvariantGuard::new();
    let value = guard.exclusive(|| Ok(7)).unwrap();
    assert_eq!(value, 7);
    let err = guard
        .exclusive::<()>(|| Err(Error::InvalidKey("nope".into())))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidKey(_)));
}

#[test]
fn test_store_missing_target_names_target() {
    let store = FailingStore::new();
    populate(&store, &["a", "b"]);
    *store.vanish_on_create_edge.lock() = Some(key("b"));

    let err = InvariantGuard::new()
        .try_add_edge(&store, &TraversalEngine::default(), &key("a"), &key("b"))
        .unwrap_err();
    assert!(matches!(err, Error::VertexNotFound(ref k) if *k == key("b")));
}

#[test]
fn test_store_missing_source_names_source() {
    let store = FailingStore::new();
    populate(&store, &["a", "b"]);
    *store.vanish_on_create_edge.lock() = Some(key("a"));

    let err = InvariantGuard::new()
        .try_add_edge(&store, &TraversalEngine::default(), &key("a"), &key("b"))
        .unwrap_err();
    assert!(matches!(err, Error::VertexNotFound(ref k) if *k == key("a")));
}
