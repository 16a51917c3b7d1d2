//! Concurrent writers sharing one Dag must never jointly create a cycle.

use std::collections::HashMap;
use std::sync::{Arc, Barrier};
use std::thread;

use serde_json::json;

use dagstore_core::{Dag, Error, GraphStore, MemoryStore, VertexKey};

const VERTICES: usize = 24;
const THREADS: usize = 8;
const ATTEMPTS_PER_THREAD: usize = 400;

fn key(i: usize) -> VertexKey {
    VertexKey::new(format!("n{i}")).unwrap()
}

/// Deterministic per-thread pseudo-random pairs (64-bit LCG).
fn pairs(seed: u64) -> impl Iterator<Item = (usize, usize)> {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    std::iter::repeat_with(move || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        let a = (state >> 33) as usize % VERTICES;
        let b = (state >> 17) as usize % VERTICES;
        (a, b)
    })
}

fn assert_acyclic<S: GraphStore>(dag: &Dag<S>) {
    let keys = dag.vertices().unwrap();
    let mut in_degree: HashMap<VertexKey, usize> = keys
        .iter()
        .map(|k| (k.clone(), dag.parents(k).unwrap().len()))
        .collect();
    let mut ready: Vec<VertexKey> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(k, _)| k.clone())
        .collect();
    let mut removed = 0;
    while let Some(vertex) = ready.pop() {
        removed += 1;
        for child in dag.children(&vertex).unwrap() {
            let degree = in_degree.get_mut(&child).unwrap();
            *degree -= 1;
            if *degree == 0 {
                ready.push(child);
            }
        }
    }
    assert_eq!(removed, keys.len(), "graph contains a cycle");
}

#[test]
fn test_concurrent_inserters_never_create_cycle() {
    let dag = Dag::new(MemoryStore::new());
    for i in 0..VERTICES {
        dag.add_vertex(json!({ "_key": format!("n{i}") })).unwrap();
    }

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let dag = dag.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut admitted = 0u64;
                for (from, to) in pairs(t as u64 + 1).take(ATTEMPTS_PER_THREAD) {
                    match dag.add_edge(&key(from), &key(to)) {
                        Ok(_) => admitted += 1,
                        Err(
                            Error::SelfLoop(_)
                            | Error::DuplicateEdge { .. }
                            | Error::CycleDetected { .. },
                        ) => {}
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
                admitted
            })
        })
        .collect();

    let admitted: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert!(admitted > 0);
    assert_eq!(dag.size().unwrap(), admitted);
    assert_acyclic(&dag);
}

#[test]
fn test_opposite_edges_race() {
    // Each round two threads race a -> b against b -> a; exactly one may win.
    for round in 0..50 {
        let dag = Dag::new(MemoryStore::new());
        let a = dag.add_vertex(json!({ "_key": format!("a{round}") })).unwrap();
        let b = dag.add_vertex(json!({ "_key": format!("b{round}") })).unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let results: Vec<bool> = [(a.clone(), b.clone()), (b.clone(), a.clone())]
            .into_iter()
            .map(|(from, to)| {
                let dag = dag.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    dag.add_edge(&from, &to).is_ok()
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();

        assert_eq!(results.iter().filter(|&&ok| ok).count(), 1);
        assert_eq!(dag.size().unwrap(), 1);
    }
}

#[test]
fn test_readers_run_alongside_writers() {
    let dag = Dag::new(MemoryStore::new());
    for i in 0..VERTICES {
        dag.add_vertex(json!({ "_key": format!("n{i}") })).unwrap();
    }

    let writer = {
        let dag = dag.clone();
        thread::spawn(move || {
            // Chain n0 -> n1 -> ... -> n23
            for i in 1..VERTICES {
                dag.add_edge(&key(i - 1), &key(i)).unwrap();
            }
        })
    };
    let reader = {
        let dag = dag.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                let descendants = dag.descendants(&key(0)).unwrap();
                assert!(descendants.len() < VERTICES);
                let roots = dag.roots().unwrap();
                assert!(roots.contains(&key(0)));
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(dag.descendants(&key(0)).unwrap().len(), VERTICES - 1);
    assert_eq!(dag.leaves().unwrap(), vec![key(VERTICES - 1)]);
}
