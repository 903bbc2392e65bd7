//! Directed graph over opaque node values.
//!
//! Pure data structure used by the resolver for ordering constraints; it
//! knows nothing about plugins. Nodes are interned in insertion order and
//! that order is the deterministic tie-break for [`Digraph::top_sort`],
//! so identical edge sets always produce identical orderings.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;

/// Residual node set left over when a topological sort hits a cycle.
///
/// Contains every node that could not be ordered: the cycle members plus
/// any nodes downstream of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle<T> {
    /// Non-orderable nodes, in insertion order.
    pub remaining: Vec<T>,
}

impl<T: fmt::Display> fmt::Display for Cycle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cycle among nodes: ")?;
        for (i, node) in self.remaining.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}

impl<T: fmt::Debug + fmt::Display> std::error::Error for Cycle<T> {}

/// Directed graph with deterministic topological ordering.
///
/// Edges are simple: inserting the same edge twice is a no-op, so degree
/// counts never accumulate multi-edges. All operations are synchronous
/// and single-pass; the graph is not safe for concurrent mutation.
#[derive(Debug, Clone, Default)]
pub struct Digraph<T> {
    nodes: Vec<T>,
    index: HashMap<T, usize>,
    succ: Vec<HashSet<usize>>,
}

impl<T: Clone + Eq + Hash> Digraph<T> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            succ: Vec::new(),
        }
    }

    /// Add a node without any edges. Returns true if the node is new.
    pub fn add_node(&mut self, node: T) -> bool {
        if self.index.contains_key(&node) {
            return false;
        }
        self.intern(node);
        true
    }

    /// Insert the edge `from -> to`, creating either endpoint if new.
    ///
    /// Duplicate edges are idempotent.
    pub fn add(&mut self, from: T, to: T) {
        let from_ix = self.intern(from);
        let to_ix = self.intern(to);
        self.succ[from_ix].insert(to_ix);
    }

    /// Check whether a node is known to the graph.
    pub fn contains(&self, node: &T) -> bool {
        self.index.contains_key(node)
    }

    /// Number of known nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.nodes.iter()
    }

    /// Incoming edge count for every known node.
    pub fn in_degree(&self) -> HashMap<T, usize> {
        let counts = self.in_degree_counts();
        self.nodes
            .iter()
            .enumerate()
            .map(|(ix, node)| (node.clone(), counts[ix]))
            .collect()
    }

    /// Outgoing edge count for every known node.
    pub fn out_degree(&self) -> HashMap<T, usize> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(ix, node)| (node.clone(), self.succ[ix].len()))
            .collect()
    }

    /// Topological order of all nodes, or the residual set on a cycle.
    ///
    /// Iterative removal of zero-in-degree nodes; among simultaneously
    /// eligible nodes the earliest-inserted wins, so the result is
    /// reproducible across runs for identical input.
    pub fn top_sort(&self) -> Result<Vec<T>, Cycle<T>> {
        let mut in_degree = self.in_degree_counts();

        // Min-heap on insertion index keeps ties deterministic.
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(ix, _)| Reverse(ix))
            .collect();

        let mut sorted = Vec::with_capacity(self.nodes.len());
        let mut placed = vec![false; self.nodes.len()];

        while let Some(Reverse(ix)) = ready.pop() {
            placed[ix] = true;
            sorted.push(self.nodes[ix].clone());
            for &next in &self.succ[ix] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if sorted.len() != self.nodes.len() {
            let remaining = self
                .nodes
                .iter()
                .enumerate()
                .filter(|(ix, _)| !placed[*ix])
                .map(|(_, node)| node.clone())
                .collect();
            return Err(Cycle { remaining });
        }

        Ok(sorted)
    }

    /// True iff the edge set is acyclic.
    pub fn is_dag(&self) -> bool {
        self.top_sort().is_ok()
    }

    /// Minimum edge-hop count from `source` to every reachable node.
    ///
    /// The source maps to 0; unreachable nodes are absent from the result.
    /// An unknown source yields an empty map.
    pub fn bfs_distance(&self, source: &T) -> HashMap<T, usize> {
        let mut distances = HashMap::new();
        let Some(&start) = self.index.get(source) else {
            return distances;
        };

        let mut seen = vec![false; self.nodes.len()];
        let mut queue = VecDeque::new();
        seen[start] = true;
        distances.insert(self.nodes[start].clone(), 0);
        queue.push_back((start, 0usize));

        while let Some((ix, dist)) = queue.pop_front() {
            for &next in &self.succ[ix] {
                if !seen[next] {
                    seen[next] = true;
                    distances.insert(self.nodes[next].clone(), dist + 1);
                    queue.push_back((next, dist + 1));
                }
            }
        }

        distances
    }

    // Helper methods

    fn intern(&mut self, node: T) -> usize {
        if let Some(&ix) = self.index.get(&node) {
            return ix;
        }
        let ix = self.nodes.len();
        self.index.insert(node.clone(), ix);
        self.nodes.push(node);
        self.succ.push(HashSet::new());
        ix
    }

    fn in_degree_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.nodes.len()];
        for targets in &self.succ {
            for &t in targets {
                counts[t] += 1;
            }
        }
        counts
    }
}
