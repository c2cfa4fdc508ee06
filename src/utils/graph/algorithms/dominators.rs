//! Dominator tree computation using the Lengauer-Tarjan algorithm.
//!
//! A node `d` **dominates** a node `n` if every path from the entry to `n`
//! passes through `d`. The **immediate dominator** of `n` is the unique
//! closest strict dominator, and connecting every node to it forms the
//! dominator tree.
//!
//! The branch pass uses this machinery in reverse: running it over a
//! reversed view rooted at a virtual sink yields *postdominators*, and the
//! immediate postdominator of a branch head is the merge-point candidate.
//!
//! The implementation follows Lengauer-Tarjan with path compression,
//! O(V α(V)) where α is the inverse Ackermann function. Both the DFS
//! numbering and the compression are iterative.

use crate::utils::graph::{NodeId, Predecessors, Successors};

/// Sentinel id used for "no node" slots while the algorithm runs.
const UNSET: NodeId = NodeId(usize::MAX);

/// Result of dominator tree computation.
///
/// Each node reachable from the entry (except the entry itself) has
/// exactly one immediate dominator. Unreachable nodes have none.
///
/// # Examples
///
/// ```rust,ignore
/// use regionize::utils::graph::{DirectedGraph, algorithms::compute_dominators};
///
/// // entry -> a -> b
/// let mut graph: DirectedGraph<&str, ()> = DirectedGraph::new();
/// let entry = graph.add_node("entry");
/// let a = graph.add_node("a");
/// let b = graph.add_node("b");
/// graph.add_edge(entry, a, ())?;
/// graph.add_edge(a, b, ())?;
///
/// let tree = compute_dominators(&graph, entry);
/// assert!(tree.dominates(entry, b));
/// assert_eq!(tree.immediate_dominator(b), Some(a));
/// # Ok::<(), regionize::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// The entry (root) node of the dominator tree
    entry: NodeId,
    /// Immediate dominator for each node; `UNSET` for unreachable nodes,
    /// the entry maps to itself
    idom: Vec<NodeId>,
    /// Number of nodes in the graph
    node_count: usize,
}

impl DominatorTree {
    /// Returns the entry (root) node of the dominator tree.
    #[inline]
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the number of nodes the tree was computed over.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Returns the immediate dominator of a node.
    ///
    /// Returns `None` for the entry node and for nodes unreachable from
    /// the entry.
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        if node == self.entry || node.index() >= self.node_count {
            return None;
        }
        let idom = self.idom[node.index()];
        if idom == UNSET {
            None
        } else {
            Some(idom)
        }
    }

    /// Checks if node `a` dominates node `b`.
    ///
    /// A node dominates itself; the entry dominates every reachable node.
    ///
    /// # Complexity
    ///
    /// O(depth of `b` in the dominator tree).
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }

        let mut current = b;
        while let Some(idom) = self.immediate_dominator(current) {
            if idom == a {
                return true;
            }
            current = idom;
        }

        false
    }

    /// Checks if node `a` strictly dominates node `b` (dominates and `a ≠ b`).
    #[inline]
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }
}

/// Computes the dominator tree for a graph rooted at `entry`.
///
/// # Arguments
///
/// * `graph` - The graph to analyze; predecessor access is required by
///   the semidominator computation
/// * `entry` - The root every dominance path starts from
///
/// # Returns
///
/// A [`DominatorTree`] answering immediate-dominator and dominance
/// queries. Nodes unreachable from `entry` report no dominator.
///
/// # Algorithm
///
/// 1. DFS numbering from the entry
/// 2. Semidominators via the semidominator theorem, processed in reverse
///    DFS order with link-eval path compression
/// 3. Implicit immediate dominators from the buckets
/// 4. A forward pass making the implicit dominators explicit
pub fn compute_dominators<G>(graph: &G, entry: NodeId) -> DominatorTree
where
    G: Successors + Predecessors,
{
    let node_count = graph.node_count();

    if node_count == 0 || entry.index() >= node_count {
        return DominatorTree {
            entry,
            idom: Vec::new(),
            node_count: 0,
        };
    }

    let mut lt = LengauerTarjan::new(node_count, entry);
    lt.compute(graph);

    DominatorTree {
        entry,
        idom: lt.idom,
        node_count,
    }
}

/// Internal state for the Lengauer-Tarjan algorithm.
struct LengauerTarjan {
    /// Entry node
    entry: NodeId,
    /// DFS number for each node (0 = not visited, numbering is 1-based)
    dfnum: Vec<usize>,
    /// Node with each DFS number (inverse of `dfnum`)
    vertex: Vec<NodeId>,
    /// Parent in the DFS tree
    parent: Vec<NodeId>,
    /// Semidominator per node
    semi: Vec<NodeId>,
    /// Immediate dominator (the final result)
    idom: Vec<NodeId>,
    /// Ancestor in the link-eval forest
    ancestor: Vec<NodeId>,
    /// Best node on the path to the forest root (path compression)
    best: Vec<NodeId>,
    /// Nodes whose semidominator is this node
    bucket: Vec<Vec<NodeId>>,
    /// Number of nodes visited by the DFS
    dfs_counter: usize,
}

impl LengauerTarjan {
    fn new(n: usize, entry: NodeId) -> Self {
        Self {
            entry,
            dfnum: vec![0; n],
            vertex: vec![UNSET; n],
            parent: vec![UNSET; n],
            semi: (0..n).map(NodeId::new).collect(),
            idom: vec![UNSET; n],
            ancestor: vec![UNSET; n],
            best: (0..n).map(NodeId::new).collect(),
            bucket: vec![Vec::new(); n],
            dfs_counter: 0,
        }
    }

    fn compute<G: Successors + Predecessors>(&mut self, graph: &G) {
        // Phase 1: DFS numbering
        self.dfs(graph, self.entry);

        // Process nodes in reverse DFS order, excluding the entry
        for i in (1..self.dfs_counter).rev() {
            let w = self.vertex[i];
            let parent_w = self.parent[w.index()];

            // Phase 2: semidominators. For every predecessor v of w,
            // eval(v) yields the candidate with the smallest numbered
            // semidominator on the forest path.
            let preds: Vec<NodeId> = graph.predecessors(w).collect();
            for v in preds {
                if self.dfnum[v.index()] == 0 {
                    // v is unreachable from the entry
                    continue;
                }
                let u = self.eval(v);
                if self.dfnum[self.semi[u.index()].index()]
                    < self.dfnum[self.semi[w.index()].index()]
                {
                    self.semi[w.index()] = self.semi[u.index()];
                }
            }

            let semi_w = self.semi[w.index()];
            self.bucket[semi_w.index()].push(w);
            self.link(parent_w, w);

            // Phase 3: implicit immediate dominators for the bucket of
            // w's parent
            let bucket = std::mem::take(&mut self.bucket[parent_w.index()]);
            for v in bucket {
                let u = self.eval(v);
                self.idom[v.index()] = if self.semi[u.index()] == self.semi[v.index()] {
                    parent_w
                } else {
                    u
                };
            }
        }

        // Phase 4: make the implicit immediate dominators explicit
        for i in 1..self.dfs_counter {
            let w = self.vertex[i];
            if self.idom[w.index()] != self.semi[w.index()] {
                self.idom[w.index()] = self.idom[self.idom[w.index()].index()];
            }
        }

        self.idom[self.entry.index()] = self.entry;
    }

    /// Iterative DFS assigning numbers and recording tree parents.
    fn dfs<G: Successors>(&mut self, graph: &G, start: NodeId) {
        let mut stack = vec![start];

        while let Some(node) = stack.pop() {
            let idx = node.index();
            if self.dfnum[idx] != 0 {
                continue;
            }

            self.dfs_counter += 1;
            self.dfnum[idx] = self.dfs_counter;
            self.vertex[self.dfs_counter - 1] = node;

            let successors: Vec<NodeId> = graph.successors(node).collect();
            for &succ in successors.iter().rev() {
                if self.dfnum[succ.index()] == 0 {
                    self.parent[succ.index()] = node;
                    stack.push(succ);
                }
            }
        }
    }

    /// Links v as a child of w in the link-eval forest.
    fn link(&mut self, w: NodeId, v: NodeId) {
        self.ancestor[v.index()] = w;
    }

    /// Returns the node with the minimum-numbered semidominator on the
    /// forest path from v to its root, compressing the path on the way.
    fn eval(&mut self, v: NodeId) -> NodeId {
        if self.ancestor[v.index()] == UNSET {
            return v;
        }
        self.compress(v);
        self.best[v.index()]
    }

    /// Iterative path compression: walk the ancestor chain to the root,
    /// then fold best/ancestor values back down in reverse.
    fn compress(&mut self, v: NodeId) {
        let mut path = vec![v];
        let mut current = v;
        while self.ancestor[self.ancestor[current.index()].index()] != UNSET {
            current = self.ancestor[current.index()];
            path.push(current);
        }

        for &node in path.iter().rev() {
            let ancestor = self.ancestor[node.index()];
            let best_ancestor = self.best[ancestor.index()];
            let best_node = self.best[node.index()];

            if self.dfnum[self.semi[best_ancestor.index()].index()]
                < self.dfnum[self.semi[best_node.index()].index()]
            {
                self.best[node.index()] = best_ancestor;
            }
            self.ancestor[node.index()] = self.ancestor[ancestor.index()];
        }
    }
}
