//! Wait-for graph construction and cycle detection.
//!
//! A deadlock is a strongly connected component of size > 1 in the
//! graph whose edge `a -> b` means transaction `a` waits on `b`.
//! Tarjan's algorithm runs with an explicit call stack, so detection
//! is a pure function of the graph with no recursion-depth concerns.

use crate::manager::LockManager;
use repsim_core::types::TransactionId;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};

/// Directed wait-for graph over transaction ids.
///
/// Vertices are every transaction appearing in any wait record, as a
/// waiter or as a blocker; self-edges are dropped at construction.
/// Adjacency is kept in sorted maps so traversal order, and therefore
/// cycle reporting order, is deterministic.
#[derive(Debug)]
pub struct WaitForGraph {
    adj: BTreeMap<TransactionId, BTreeSet<TransactionId>>,
}

impl WaitForGraph {
    /// Build the graph from the lock manager's current wait records.
    pub fn from_lock_manager(locks: &LockManager) -> Self {
        let mut adj: BTreeMap<TransactionId, BTreeSet<TransactionId>> = BTreeMap::new();
        for (waiter, blockers) in locks.wait_edges() {
            let edges = adj.entry(waiter).or_default();
            edges.extend(blockers.iter().copied().filter(|b| *b != waiter));
        }
        let blockers: Vec<TransactionId> = adj.values().flatten().copied().collect();
        for vertex in blockers {
            adj.entry(vertex).or_default();
        }
        WaitForGraph { adj }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.adj.len()
    }

    /// Whether the graph has no vertices.
    pub fn is_empty(&self) -> bool {
        self.adj.is_empty()
    }

    /// Whether the graph has edge `from -> to`.
    pub fn has_edge(&self, from: TransactionId, to: TransactionId) -> bool {
        self.adj.get(&from).is_some_and(|edges| edges.contains(&to))
    }

    /// Every deadlock cycle currently present: each strongly connected
    /// component of size > 1, members sorted ascending, components in
    /// deterministic discovery order.
    pub fn cycles(&self) -> Vec<Vec<TransactionId>> {
        Tarjan::new(self).run()
    }
}

/// Tarjan's SCC algorithm over dense vertex indices, driven by an
/// explicit stack of `(vertex, next-edge cursor)` frames.
struct Tarjan {
    verts: Vec<TransactionId>,
    neighbors: Vec<Vec<usize>>,
    disc: Vec<Option<usize>>,
    low: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next_disc: usize,
    cycles: Vec<Vec<TransactionId>>,
}

impl Tarjan {
    fn new(graph: &WaitForGraph) -> Self {
        let verts: Vec<TransactionId> = graph.adj.keys().copied().collect();
        let index: FxHashMap<TransactionId, usize> =
            verts.iter().enumerate().map(|(i, v)| (*v, i)).collect();
        let neighbors: Vec<Vec<usize>> = verts
            .iter()
            .map(|v| graph.adj[v].iter().map(|w| index[w]).collect())
            .collect();
        let n = verts.len();
        Tarjan {
            verts,
            neighbors,
            disc: vec![None; n],
            low: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            next_disc: 0,
            cycles: Vec::new(),
        }
    }

    fn run(mut self) -> Vec<Vec<TransactionId>> {
        for root in 0..self.verts.len() {
            if self.disc[root].is_none() {
                self.visit(root);
            }
        }
        self.cycles
    }

    fn open(&mut self, v: usize) {
        self.disc[v] = Some(self.next_disc);
        self.low[v] = self.next_disc;
        self.next_disc += 1;
        self.stack.push(v);
        self.on_stack[v] = true;
    }

    fn visit(&mut self, root: usize) {
        self.open(root);
        let mut call: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(&(v, cursor)) = call.last() {
            if let Some(&w) = self.neighbors[v].get(cursor) {
                if let Some(frame) = call.last_mut() {
                    frame.1 += 1;
                }
                match self.disc[w] {
                    None => {
                        self.open(w);
                        call.push((w, 0));
                    }
                    Some(d) if self.on_stack[w] => {
                        self.low[v] = self.low[v].min(d);
                    }
                    Some(_) => {}
                }
            } else {
                call.pop();
                if Some(self.low[v]) == self.disc[v] {
                    let mut component = Vec::new();
                    while let Some(w) = self.stack.pop() {
                        self.on_stack[w] = false;
                        component.push(self.verts[w]);
                        if w == v {
                            break;
                        }
                    }
                    if component.len() > 1 {
                        component.sort_unstable();
                        self.cycles.push(component);
                    }
                }
                if let Some(&(parent, _)) = call.last() {
                    self.low[parent] = self.low[parent].min(self.low[v]);
                }
            }
        }
    }
}
