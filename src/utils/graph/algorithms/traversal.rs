//! Graph traversal algorithms.
//!
//! Depth-first traversal plus the postorder variants the rest of the
//! engine leans on: reverse postorder is a topological order on acyclic
//! views, which is what reachability painting and linearization need.

use crate::utils::graph::{NodeId, Successors};

/// Depth-first search iterator over graph nodes.
///
/// Iterative (non-recursive) pre-order traversal from a start node. Each
/// reachable node is visited exactly once; unreachable nodes are never
/// yielded. Successors are pushed in reverse so they pop in their original
/// order, keeping the traversal deterministic.
pub struct DfsIterator<'g, G: Successors> {
    graph: &'g G,
    stack: Vec<NodeId>,
    visited: Vec<bool>,
}

impl<'g, G: Successors> DfsIterator<'g, G> {
    fn new(graph: &'g G, start: NodeId) -> Self {
        let node_count = graph.node_count();
        if start.index() >= node_count {
            return DfsIterator {
                graph,
                stack: Vec::new(),
                visited: Vec::new(),
            };
        }

        let mut visited = vec![false; node_count];
        visited[start.index()] = true;

        DfsIterator {
            graph,
            stack: vec![start],
            visited,
        }
    }
}

impl<G: Successors> Iterator for DfsIterator<'_, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;

        let successors: Vec<NodeId> = self.graph.successors(node).collect();
        for &succ in successors.iter().rev() {
            if !self.visited[succ.index()] {
                self.visited[succ.index()] = true;
                self.stack.push(succ);
            }
        }

        Some(node)
    }
}

/// Returns a depth-first search iterator starting from the given node.
///
/// # Arguments
///
/// * `graph` - The graph to traverse
/// * `start` - The starting node; an out-of-range start yields nothing
///
/// # Complexity
///
/// O(V + E) time, O(V) space.
pub fn dfs<G: Successors>(graph: &G, start: NodeId) -> DfsIterator<'_, G> {
    DfsIterator::new(graph, start)
}

/// Computes the postorder traversal of nodes reachable from the start.
///
/// A node appears after all of its descendants. Implemented iteratively
/// with an explicit two-phase stack, so arbitrarily deep graphs cannot
/// exhaust the machine stack.
///
/// # Arguments
///
/// * `graph` - The graph to traverse
/// * `start` - The starting node; an out-of-range start yields an empty order
///
/// # Returns
///
/// A vector of node ids in postorder.
#[must_use]
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    let mut order = Vec::with_capacity(node_count);
    let mut stack: Vec<(NodeId, bool)> = vec![(start, false)];
    visited[start.index()] = true;

    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(node);
            continue;
        }

        stack.push((node, true));
        let successors: Vec<NodeId> = graph.successors(node).collect();
        for &succ in successors.iter().rev() {
            if !visited[succ.index()] {
                visited[succ.index()] = true;
                stack.push((succ, false));
            }
        }
    }

    order
}

/// Computes the reverse postorder of nodes reachable from the start.
///
/// On an acyclic graph this is a topological order: every node appears
/// before all of its successors. This is the processing order used by
/// the branch pass's reachability painting.
///
/// # Arguments
///
/// * `graph` - The graph to traverse
/// * `start` - The starting node
///
/// # Returns
///
/// A vector of node ids in reverse postorder.
#[must_use]
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut order = postorder(graph, start);
    order.reverse();
    order
}
