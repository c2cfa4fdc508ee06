//! Cycle detection.
//!
//! The branch pass only runs on acyclic views; this check is how the
//! driver decides whether the loop pass has finished its job or the view
//! is stuck on an irreducible remainder.

use crate::utils::graph::{NodeId, Successors};

/// Per-node state for the iterative three-color DFS.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    /// Not yet reached
    White,
    /// On the current DFS path
    Grey,
    /// Fully explored
    Black,
}

/// Checks whether any cycle is reachable from the given start node.
///
/// Uses an iterative three-color depth-first search: a cycle exists
/// exactly when an edge points back at a node that is still on the
/// current DFS path.
///
/// # Arguments
///
/// * `graph` - The graph to analyze
/// * `start` - The node reachability is measured from; out-of-range
///   starts report no cycle
///
/// # Returns
///
/// `true` if a cycle is reachable from `start`, `false` otherwise.
///
/// # Complexity
///
/// O(V + E) time, O(V) space.
#[must_use]
pub fn has_cycle<G: Successors>(graph: &G, start: NodeId) -> bool {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return false;
    }

    let mut marks = vec![Mark::White; node_count];
    // (node, next successor offset) frames; offset lets re-entry resume
    // where the frame left off without recursion
    let mut stack: Vec<(NodeId, usize)> = vec![(start, 0)];
    marks[start.index()] = Mark::Grey;

    while let Some((node, offset)) = stack.pop() {
        let succ = graph.successors(node).nth(offset);
        match succ {
            Some(next) => {
                stack.push((node, offset + 1));
                match marks[next.index()] {
                    Mark::Grey => return true,
                    Mark::White => {
                        marks[next.index()] = Mark::Grey;
                        stack.push((next, 0));
                    }
                    Mark::Black => {}
                }
            }
            None => {
                marks[node.index()] = Mark::Black;
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::DirectedGraph;

    #[test]
    fn test_acyclic_chain() {
        let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        let c = graph.add_node(());
        graph.add_edge(a, b, ()).unwrap();
        graph.add_edge(b, c, ()).unwrap();

        assert!(!has_cycle(&graph, a));
    }

    #[test]
    fn test_simple_cycle() {
        let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        graph.add_edge(a, b, ()).unwrap();
        graph.add_edge(b, a, ()).unwrap();

        assert!(has_cycle(&graph, a));
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
        let a = graph.add_node(());
        graph.add_edge(a, a, ()).unwrap();

        assert!(has_cycle(&graph, a));
    }

    #[test]
    fn test_diamond_reconvergence_is_not_cycle() {
        let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        let c = graph.add_node(());
        let d = graph.add_node(());
        graph.add_edge(a, b, ()).unwrap();
        graph.add_edge(a, c, ()).unwrap();
        graph.add_edge(b, d, ()).unwrap();
        graph.add_edge(c, d, ()).unwrap();

        assert!(!has_cycle(&graph, a));
    }

    #[test]
    fn test_unreachable_cycle_not_reported() {
        let mut graph: DirectedGraph<(), ()> = DirectedGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        let c = graph.add_node(());
        graph.add_edge(b, c, ()).unwrap();
        graph.add_edge(c, b, ()).unwrap();

        assert!(!has_cycle(&graph, a));
        assert!(has_cycle(&graph, b));
    }

    #[test]
    fn test_out_of_range_start() {
        let graph: DirectedGraph<(), ()> = DirectedGraph::new();
        assert!(!has_cycle(&graph, NodeId::new(1)));
    }
}
