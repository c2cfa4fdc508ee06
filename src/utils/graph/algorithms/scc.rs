//! Strongly Connected Components (SCC) using Tarjan's algorithm.
//!
//! An SCC is a maximal set of vertices with a path from every vertex to
//! every other vertex in the set. Non-trivial SCCs are exactly what the
//! loop pass folds into Loop regions, natural and irreducible alike.
//!
//! The implementation keeps Tarjan's single-pass index/lowlink scheme but
//! drives it with an explicit frame stack instead of recursion: the deep
//! cycles this crate exists to fold are the worst case for call-stack
//! depth.

use crate::utils::graph::{NodeId, Successors};

/// Computes the strongly connected components of a directed graph.
///
/// # Arguments
///
/// * `graph` - The directed graph to analyze
///
/// # Returns
///
/// A vector of SCCs, each a vector of `NodeId`s. SCCs are emitted in
/// **reverse topological order**: if an edge runs from SCC A to SCC B,
/// then B appears before A. Within an SCC, nodes appear in the order they
/// leave Tarjan's stack.
///
/// # Complexity
///
/// - Time: O(V + E)
/// - Space: O(V)
///
/// # Algorithm
///
/// 1. Depth-first search assigns each node a discovery index
/// 2. Lowlink values track the smallest index reachable through the DFS
///    subtree plus one back edge
/// 3. A node whose lowlink equals its own index roots an SCC; the stack
///    is popped down to it
///
/// The DFS is iterative: each frame carries the node and the offset of
/// the next successor to look at, and a child finishing folds its lowlink
/// into the frame below it.
pub fn strongly_connected_components<G>(graph: &G) -> Vec<Vec<NodeId>>
where
    G: Successors,
{
    let node_count = graph.node_count();
    if node_count == 0 {
        return Vec::new();
    }

    let mut state = TarjanState::new(node_count);

    for i in 0..node_count {
        if state.index[i].is_none() {
            state.run_from(graph, NodeId::new(i));
        }
    }

    state.sccs
}

/// Internal state for Tarjan's algorithm.
struct TarjanState {
    /// Discovery index for each node (None if not yet visited)
    index: Vec<Option<usize>>,
    /// Lowlink value for each node
    lowlink: Vec<usize>,
    /// Whether a node is currently on the SCC stack
    on_stack: Vec<bool>,
    /// The SCC candidate stack
    stack: Vec<NodeId>,
    /// Current discovery counter
    current_index: usize,
    /// Collected SCCs
    sccs: Vec<Vec<NodeId>>,
}

impl TarjanState {
    fn new(n: usize) -> Self {
        Self {
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            current_index: 0,
            sccs: Vec::new(),
        }
    }

    /// Marks a node discovered and puts it on the SCC stack.
    fn discover(&mut self, v: NodeId) {
        let idx = v.index();
        self.index[idx] = Some(self.current_index);
        self.lowlink[idx] = self.current_index;
        self.current_index += 1;
        self.stack.push(v);
        self.on_stack[idx] = true;
    }

    /// Iterative DFS from `root`, collecting SCCs as nodes finish.
    fn run_from<G: Successors>(&mut self, graph: &G, root: NodeId) {
        // (node, offset of next successor to examine)
        let mut frames: Vec<(NodeId, usize)> = Vec::new();

        self.discover(root);
        frames.push((root, 0));

        while let Some((v, offset)) = frames.pop() {
            let v_idx = v.index();

            if let Some(w) = graph.successors(v).nth(offset) {
                // Re-enter this frame at the next successor afterwards
                frames.push((v, offset + 1));

                let w_idx = w.index();
                match self.index[w_idx] {
                    None => {
                        self.discover(w);
                        frames.push((w, 0));
                    }
                    Some(w_index) if self.on_stack[w_idx] => {
                        // Back edge into the current SCC candidate
                        self.lowlink[v_idx] = self.lowlink[v_idx].min(w_index);
                    }
                    Some(_) => {}
                }
                continue;
            }

            // All successors examined: v finishes. Fold its lowlink into
            // its DFS parent, which is the frame directly below.
            if let Some(&(parent, _)) = frames.last() {
                let p_idx = parent.index();
                self.lowlink[p_idx] = self.lowlink[p_idx].min(self.lowlink[v_idx]);
            }

            // If v roots an SCC, pop the candidate stack down to it
            if Some(self.lowlink[v_idx]) == self.index[v_idx] {
                let mut scc = Vec::new();
                loop {
                    let w = self.stack.pop().expect("SCC stack must contain the root");
                    self.on_stack[w.index()] = false;
                    scc.push(w);
                    if w == v {
                        break;
                    }
                }
                self.sccs.push(scc);
            }
        }
    }
}
