//! Node identifier for directed graphs.

use std::fmt;

/// A strongly-typed identifier for nodes within a directed graph.
///
/// `NodeId` wraps a `usize` index assigned sequentially from 0 as nodes are
/// added. The newtype prevents node indices from being mixed up with other
/// integer values such as edge indices or block counts.
///
/// Node IDs index directly into per-node side tables, which is how every
/// analysis in [`algorithms`](crate::utils::graph::algorithms) stores its
/// state.
///
/// # Examples
///
/// ```rust,ignore
/// use regionize::utils::graph::{DirectedGraph, NodeId};
///
/// let mut graph: DirectedGraph<&str, ()> = DirectedGraph::new();
/// let a: NodeId = graph.add_node("a");
/// let b: NodeId = graph.add_node("b");
/// assert_ne!(a, b);
/// assert_eq!(a.index(), 0);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a new `NodeId` from a raw index value.
    ///
    /// Primarily intended for internal use and testing; normal usage
    /// obtains ids from
    /// [`DirectedGraph::add_node`](crate::utils::graph::DirectedGraph::add_node).
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw 0-based index of this node identifier.
    ///
    /// The index can be used directly to address per-node side tables.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}
