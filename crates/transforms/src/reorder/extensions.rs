//! Lazy enumeration of the orderings a partitioned sequence allows.
//!
//! A partition's orderings are the linear extensions of its dependency graph, produced by a
//! backtracking cursor that only keeps the current prefix. A whole sequence's orderings are the
//! cross product of its partitions' orderings, advanced like an odometer with the last partition
//! turning fastest.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// One level of the backtracking search: the nodes placeable after the current prefix.
#[derive(Debug, Clone)]
struct Frame {
    available: Vec<NodeIndex>,
    next: usize,
    placed: Option<NodeIndex>,
}

/// Backtracking cursor over the linear extensions of a DAG.
///
/// The graph is passed to every call rather than borrowed, so an owner can keep graphs and
/// cursors side by side.
#[derive(Debug, Clone)]
pub(crate) struct LinearExtensions {
    indegree: Vec<usize>,
    order: Vec<NodeIndex>,
    frames: Vec<Frame>,
    rng: Option<StdRng>,
    started: bool,
    done: bool,
}

impl LinearExtensions {
    pub(crate) fn new(graph: &DiGraph<usize, ()>, rng: Option<StdRng>) -> Self {
        let indegree = graph
            .node_indices()
            .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();
        Self {
            indegree,
            order: Vec::with_capacity(graph.node_count()),
            frames: Vec::new(),
            rng,
            started: false,
            done: false,
        }
    }

    fn frame(&mut self, graph: &DiGraph<usize, ()>) -> Frame {
        let mut available: Vec<NodeIndex> = graph
            .node_indices()
            .filter(|n| self.indegree[n.index()] == 0 && !self.order.contains(n))
            .collect();
        if let Some(rng) = self.rng.as_mut() {
            available.shuffle(rng);
        }
        Frame {
            available,
            next: 0,
            placed: None,
        }
    }

    fn place(&mut self, graph: &DiGraph<usize, ()>, node: NodeIndex) {
        self.order.push(node);
        for succ in graph.neighbors(node) {
            self.indegree[succ.index()] -= 1;
        }
    }

    fn unplace(&mut self, graph: &DiGraph<usize, ()>, node: NodeIndex) {
        self.order.pop();
        for succ in graph.neighbors(node) {
            self.indegree[succ.index()] += 1;
        }
    }

    /// Next extension as statement positions, or `None` once exhausted.
    pub(crate) fn advance(&mut self, graph: &DiGraph<usize, ()>) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            if graph.node_count() == 0 {
                self.done = true;
                return Some(Vec::new());
            }
            let first = self.frame(graph);
            self.frames.push(first);
        }
        loop {
            let Some(top) = self.frames.len().checked_sub(1) else {
                self.done = true;
                return None;
            };
            if let Some(previous) = self.frames[top].placed.take() {
                self.unplace(graph, previous);
            }
            let frame = &mut self.frames[top];
            let Some(&node) = frame.available.get(frame.next) else {
                self.frames.pop();
                continue;
            };
            frame.next += 1;
            frame.placed = Some(node);
            self.place(graph, node);

            if self.order.len() == graph.node_count() {
                return Some(self.order.iter().map(|n| graph[*n]).collect());
            }
            let deeper = self.frame(graph);
            self.frames.push(deeper);
        }
    }
}

/// Cross product of every partition's linear extensions.
#[derive(Debug, Clone)]
pub struct Permutations {
    graphs: Vec<DiGraph<usize, ()>>,
    cursors: Vec<LinearExtensions>,
    current: Vec<Vec<usize>>,
    rng: Option<StdRng>,
    started: bool,
    done: bool,
}

impl Permutations {
    pub(crate) fn new(graphs: Vec<DiGraph<usize, ()>>, rng: Option<StdRng>) -> Self {
        Self {
            graphs,
            cursors: Vec::new(),
            current: Vec::new(),
            rng,
            started: false,
            done: false,
        }
    }

    fn cursor(&mut self, part: usize) -> LinearExtensions {
        let rng = self
            .rng
            .as_mut()
            .map(|rng| StdRng::seed_from_u64(rng.random()));
        LinearExtensions::new(&self.graphs[part], rng)
    }

    /// Restarts every partition from `from` on and takes its first extension.
    fn reset_from(&mut self, from: usize) -> Option<()> {
        for part in from..self.graphs.len() {
            let mut cursor = self.cursor(part);
            let first = cursor.advance(&self.graphs[part])?;
            if part < self.cursors.len() {
                self.cursors[part] = cursor;
                self.current[part] = first;
            } else {
                self.cursors.push(cursor);
                self.current.push(first);
            }
        }
        Some(())
    }

    fn joined(&self) -> Vec<usize> {
        self.current.iter().flatten().copied().collect()
    }
}

impl Iterator for Permutations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            if self.reset_from(0).is_none() {
                self.done = true;
                return None;
            }
            return Some(self.joined());
        }
        let mut part = self.graphs.len();
        while part > 0 {
            part -= 1;
            if let Some(next) = self.cursors[part].advance(&self.graphs[part]) {
                self.current[part] = next;
                if self.reset_from(part + 1).is_none() {
                    break;
                }
                return Some(self.joined());
            }
        }
        self.done = true;
        None
    }
}
