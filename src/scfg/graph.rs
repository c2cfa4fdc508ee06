//! SCFG construction and queries.
//!
//! [`Scfg`] is the input boundary of the engine: a label-indexed block
//! graph with one entry and a set of declared exits. It is assembled
//! through [`ScfgBuilder`], which performs the full admission check:
//! everything structural is rejected here, before restructuring starts,
//! so the passes can assume a well-formed graph.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use crate::{
    scfg::{Block, EdgeKind, Label},
    utils::{
        escape_dot,
        graph::{algorithms, DirectedGraph, NodeId},
    },
    Result,
};

/// A structured control-flow graph: the immutable input of the engine.
///
/// Blocks are identified by [`Label`]; edges are ordered per block and
/// tagged with an [`EdgeKind`]. One block is the entry, and a set of
/// blocks are declared exits. Once built, an `Scfg` never changes; the
/// restructuring passes consume it by reference and express all rewriting
/// in their own working structures.
///
/// # Construction
///
/// ```rust
/// use regionize::{Scfg, EdgeKind};
///
/// // Diamond: entry branches to a and b, both merge at c which exits
/// let mut builder = Scfg::builder();
/// builder.block("entry").block("a").block("b").block("c");
/// builder.case("entry", "a", 0);
/// builder.case("entry", "b", 1);
/// builder.unconditional("a", "c");
/// builder.unconditional("b", "c");
/// builder.entry("entry");
/// builder.exit("c");
/// let scfg = builder.build()?;
///
/// assert_eq!(scfg.block_count(), 4);
/// assert!(scfg.is_exit(&"c".into()));
/// # Ok::<(), regionize::Error>(())
/// ```
///
/// # Validation
///
/// [`ScfgBuilder::build`] rejects, with
/// [`Error::MalformedGraph`](crate::Error::MalformedGraph):
///
/// - a missing or undeclared entry label
/// - duplicate block labels
/// - edges or exit declarations referencing unknown labels
/// - a block with no outgoing edges that is not a declared exit
/// - blocks unreachable from the entry
/// - a block with several outgoing edges that are not all tagged with
///   pairwise-distinct [`EdgeKind::Case`] values
#[derive(Debug, Clone)]
pub struct Scfg {
    /// The underlying directed graph structure.
    graph: DirectedGraph<Block, EdgeKind>,
    /// Label to node index.
    index: HashMap<Label, NodeId>,
    /// The entry node.
    entry: NodeId,
    /// Declared exit nodes, sorted by label.
    exits: Vec<NodeId>,
}

impl Scfg {
    /// Returns a new, empty [`ScfgBuilder`].
    #[must_use]
    pub fn builder() -> ScfgBuilder {
        ScfgBuilder::new()
    }

    /// Returns the entry label.
    #[must_use]
    pub fn entry(&self) -> &Label {
        self.label_of(self.entry)
    }

    /// Returns the entry node id.
    #[must_use]
    pub(crate) fn entry_id(&self) -> NodeId {
        self.entry
    }

    /// Returns the declared exit labels, sorted.
    pub fn exit_labels(&self) -> impl Iterator<Item = &Label> + '_ {
        self.exits.iter().map(|&id| self.label_of(id))
    }

    /// Returns `true` if the given label is a declared exit.
    #[must_use]
    pub fn is_exit(&self, label: &Label) -> bool {
        self.index
            .get(label)
            .is_some_and(|id| self.exits.contains(id))
    }

    /// Returns `true` if the given node id is a declared exit.
    #[must_use]
    pub(crate) fn is_exit_id(&self, id: NodeId) -> bool {
        self.exits.contains(&id)
    }

    /// Returns the number of blocks in the graph.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns `true` if a block with this label exists.
    #[must_use]
    pub fn contains(&self, label: &Label) -> bool {
        self.index.contains_key(label)
    }

    /// Returns the label of a node id.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a valid node of this graph; ids obtained
    /// from this `Scfg` are always valid.
    #[must_use]
    pub(crate) fn label_of(&self, id: NodeId) -> &Label {
        self.graph
            .node(id)
            .expect("node ids handed out by this graph are valid")
            .label()
    }

    /// Returns an iterator over all block labels in insertion order.
    pub fn labels(&self) -> impl Iterator<Item = &Label> + '_ {
        self.graph.nodes().map(|(_, block)| block.label())
    }

    /// Returns the ordered successors of a block with their edge kinds.
    ///
    /// The order is the order in which the edges were declared on the
    /// builder. An unknown label yields an empty sequence.
    pub fn successors<'a>(
        &'a self,
        label: &Label,
    ) -> impl Iterator<Item = (&'a Label, EdgeKind)> + 'a {
        self.index
            .get(label)
            .into_iter()
            .flat_map(move |&id| self.successor_edges(id))
            .map(move |(target, kind)| (self.label_of(target), kind))
    }

    /// Returns the predecessors of a block. Used for merge-point
    /// detection; an unknown label yields an empty sequence.
    pub fn predecessors<'a>(&'a self, label: &Label) -> impl Iterator<Item = &'a Label> + 'a {
        self.index
            .get(label)
            .into_iter()
            .flat_map(move |&id| self.graph.predecessors(id))
            .map(move |pred| self.label_of(pred))
    }

    /// Ordered successor edges by node id.
    pub(crate) fn successor_edges(
        &self,
        id: NodeId,
    ) -> impl Iterator<Item = (NodeId, EdgeKind)> + '_ {
        self.graph
            .outgoing_edges(id)
            .map(|(_, target, &kind)| (target, kind))
    }

    /// Returns block labels in reverse postorder from the entry.
    #[must_use]
    pub fn reverse_postorder(&self) -> Vec<&Label> {
        algorithms::reverse_postorder(&self.graph, self.entry)
            .into_iter()
            .map(|id| self.label_of(id))
            .collect()
    }

    /// Returns a reference to the underlying graph.
    ///
    /// Gives advanced callers access to the generic algorithm surface.
    #[must_use]
    pub fn graph(&self) -> &DirectedGraph<Block, EdgeKind> {
        &self.graph
    }

    /// Generates a DOT representation of this SCFG.
    ///
    /// Entry blocks are highlighted green, declared exits red; edges are
    /// labelled with their discriminants. The output renders with any
    /// Graphviz tool.
    ///
    /// # Arguments
    ///
    /// * `title` - Optional graph title
    #[must_use]
    pub fn to_dot(&self, title: Option<&str>) -> String {
        let mut dot = String::new();

        dot.push_str("digraph scfg {\n");
        if let Some(name) = title {
            let _ = writeln!(dot, "    label=\"{}\";", escape_dot(name));
        }
        dot.push_str("    labelloc=t;\n");
        dot.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n\n");

        for (id, block) in self.graph.nodes() {
            let mut label = escape_dot(block.label().as_str());
            if id == self.entry {
                label.push_str(" (entry)");
            }
            if self.exits.contains(&id) {
                label.push_str(" (exit)");
            }

            let style = if id == self.entry {
                ", style=filled, fillcolor=lightgreen"
            } else if self.exits.contains(&id) {
                ", style=filled, fillcolor=lightcoral"
            } else {
                ""
            };

            let _ = writeln!(dot, "    n{} [label=\"{label}\"{style}];", id.index());
        }

        dot.push('\n');

        for (id, _) in self.graph.nodes() {
            for (target, kind) in self.successor_edges(id) {
                let edge_label = match kind {
                    EdgeKind::Unconditional => String::new(),
                    EdgeKind::Case(value) => value.to_string(),
                };
                let _ = writeln!(
                    dot,
                    "    n{} -> n{} [label=\"{edge_label}\"];",
                    id.index(),
                    target.index()
                );
            }
        }

        dot.push_str("}\n");
        dot
    }
}

/// Incremental builder for an [`Scfg`].
///
/// Blocks and edges may be declared in any order; all checking happens in
/// [`build`](Self::build). Methods return `&mut Self` so declarations can
/// be chained.
#[derive(Debug, Default)]
pub struct ScfgBuilder {
    /// Declared blocks in insertion order.
    blocks: Vec<Label>,
    /// Declared edges in insertion order.
    edges: Vec<(Label, Label, EdgeKind)>,
    /// The entry label, if declared.
    entry: Option<Label>,
    /// Declared exit labels.
    exits: Vec<Label>,
}

impl ScfgBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a block.
    pub fn block(&mut self, label: impl Into<Label>) -> &mut Self {
        self.blocks.push(label.into());
        self
    }

    /// Declares an edge with an explicit kind.
    pub fn edge(
        &mut self,
        from: impl Into<Label>,
        to: impl Into<Label>,
        kind: EdgeKind,
    ) -> &mut Self {
        self.edges.push((from.into(), to.into(), kind));
        self
    }

    /// Declares an unconditional edge.
    pub fn unconditional(&mut self, from: impl Into<Label>, to: impl Into<Label>) -> &mut Self {
        self.edge(from, to, EdgeKind::Unconditional)
    }

    /// Declares a discriminant-tagged edge.
    pub fn case(
        &mut self,
        from: impl Into<Label>,
        to: impl Into<Label>,
        value: i64,
    ) -> &mut Self {
        self.edge(from, to, EdgeKind::Case(value))
    }

    /// Declares the entry block.
    pub fn entry(&mut self, label: impl Into<Label>) -> &mut Self {
        self.entry = Some(label.into());
        self
    }

    /// Declares an exit block.
    pub fn exit(&mut self, label: impl Into<Label>) -> &mut Self {
        self.exits.push(label.into());
        self
    }

    /// Validates the declarations and builds the [`Scfg`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedGraph`](crate::Error::MalformedGraph) for
    /// any of the violations listed on [`Scfg`].
    pub fn build(self) -> Result<Scfg> {
        let Some(entry_label) = self.entry else {
            return Err(malformed_graph!("no entry label was declared"));
        };

        let mut graph: DirectedGraph<Block, EdgeKind> =
            DirectedGraph::with_capacity(self.blocks.len(), self.edges.len());
        let mut index: HashMap<Label, NodeId> = HashMap::with_capacity(self.blocks.len());

        for label in self.blocks {
            if index.contains_key(&label) {
                return Err(malformed_graph!("duplicate block label {}", label));
            }
            let id = graph.add_node(Block::new(label.clone()));
            index.insert(label, id);
        }

        let Some(&entry) = index.get(&entry_label) else {
            return Err(malformed_graph!(
                "entry label {} is not a declared block",
                entry_label
            ));
        };

        let mut exits: Vec<NodeId> = Vec::with_capacity(self.exits.len());
        for label in &self.exits {
            let Some(&id) = index.get(label) else {
                return Err(malformed_graph!(
                    "exit label {} is not a declared block",
                    label
                ));
            };
            if !exits.contains(&id) {
                exits.push(id);
            }
        }
        exits.sort_by(|&a, &b| {
            graph
                .node(a)
                .map(Block::label)
                .cmp(&graph.node(b).map(Block::label))
        });

        for (from, to, kind) in self.edges {
            let Some(&from_id) = index.get(&from) else {
                return Err(malformed_graph!("edge source {} is not a declared block", from));
            };
            let Some(&to_id) = index.get(&to) else {
                return Err(malformed_graph!("edge target {} is not a declared block", to));
            };
            graph.add_edge(from_id, to_id, kind)?;
        }

        // Branching blocks must discriminate every edge
        for id in graph.node_ids() {
            if graph.out_degree(id) < 2 {
                continue;
            }
            let label = graph.node(id).map(Block::label);
            let mut seen: HashSet<i64> = HashSet::new();
            for (_, _, kind) in graph.outgoing_edges(id) {
                match kind.case_value() {
                    None => {
                        return Err(malformed_graph!(
                            "block {} branches but carries an unconditional edge",
                            label.expect("validated node")
                        ));
                    }
                    Some(value) => {
                        if !seen.insert(value) {
                            return Err(malformed_graph!(
                                "block {} carries duplicate discriminant {value}",
                                label.expect("validated node")
                            ));
                        }
                    }
                }
            }
        }

        // A block without successors must be a declared exit
        for id in graph.node_ids() {
            if graph.out_degree(id) == 0 && !exits.contains(&id) {
                return Err(malformed_graph!(
                    "block {} has no outgoing edges but is not a declared exit",
                    graph.node(id).expect("validated node").label()
                ));
            }
        }

        // Every block must be reachable from the entry
        let reachable: HashSet<NodeId> = algorithms::dfs(&graph, entry).collect();
        if reachable.len() != graph.node_count() {
            let unreachable: Vec<&Label> = graph
                .nodes()
                .filter(|(id, _)| !reachable.contains(id))
                .map(|(_, block)| block.label())
                .collect();
            return Err(malformed_graph!(
                "blocks not reachable from entry: {:?}",
                unreachable
            ));
        }

        Ok(Scfg {
            graph,
            index,
            entry,
            exits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn diamond() -> Scfg {
        let mut builder = Scfg::builder();
        builder.block("entry").block("a").block("b").block("c");
        builder.case("entry", "a", 0);
        builder.case("entry", "b", 1);
        builder.unconditional("a", "c");
        builder.unconditional("b", "c");
        builder.entry("entry");
        builder.exit("c");
        builder.build().unwrap()
    }

    #[test]
    fn test_build_diamond() {
        let scfg = diamond();
        assert_eq!(scfg.block_count(), 4);
        assert_eq!(scfg.entry(), &Label::from("entry"));
        assert!(scfg.is_exit(&"c".into()));
        assert!(!scfg.is_exit(&"a".into()));

        let succs: Vec<(String, EdgeKind)> = scfg
            .successors(&"entry".into())
            .map(|(l, k)| (l.to_string(), k))
            .collect();
        assert_eq!(
            succs,
            vec![
                ("a".to_string(), EdgeKind::Case(0)),
                ("b".to_string(), EdgeKind::Case(1)),
            ]
        );

        let preds: Vec<String> = scfg
            .predecessors(&"c".into())
            .map(ToString::to_string)
            .collect();
        assert_eq!(preds, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_missing_entry_rejected() {
        let mut builder = Scfg::builder();
        builder.block("a");
        builder.exit("a");
        assert!(matches!(
            builder.build(),
            Err(Error::MalformedGraph { .. })
        ));
    }

    #[test]
    fn test_unknown_entry_rejected() {
        let mut builder = Scfg::builder();
        builder.block("a").entry("nope").exit("a");
        assert!(matches!(
            builder.build(),
            Err(Error::MalformedGraph { .. })
        ));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let mut builder = Scfg::builder();
        builder.block("a").block("a").entry("a").exit("a");
        assert!(matches!(
            builder.build(),
            Err(Error::MalformedGraph { .. })
        ));
    }

    #[test]
    fn test_unknown_edge_target_rejected() {
        let mut builder = Scfg::builder();
        builder.block("a").entry("a").exit("a");
        builder.unconditional("a", "ghost");
        assert!(matches!(
            builder.build(),
            Err(Error::MalformedGraph { .. })
        ));
    }

    #[test]
    fn test_terminal_non_exit_rejected() {
        let mut builder = Scfg::builder();
        builder.block("a").block("b");
        builder.unconditional("a", "b");
        builder.entry("a");
        // b has no outgoing edges and is not declared an exit
        assert!(matches!(
            builder.build(),
            Err(Error::MalformedGraph { .. })
        ));
    }

    #[test]
    fn test_unreachable_block_rejected() {
        let mut builder = Scfg::builder();
        builder.block("a").block("orphan");
        builder.entry("a");
        builder.exit("a");
        builder.exit("orphan");
        assert!(matches!(
            builder.build(),
            Err(Error::MalformedGraph { .. })
        ));
    }

    #[test]
    fn test_branch_with_unconditional_edge_rejected() {
        let mut builder = Scfg::builder();
        builder.block("a").block("b").block("c");
        builder.case("a", "b", 0);
        builder.unconditional("a", "c");
        builder.entry("a").exit("b").exit("c");
        assert!(matches!(
            builder.build(),
            Err(Error::MalformedGraph { .. })
        ));
    }

    #[test]
    fn test_duplicate_discriminant_rejected() {
        let mut builder = Scfg::builder();
        builder.block("a").block("b").block("c");
        builder.case("a", "b", 0);
        builder.case("a", "c", 0);
        builder.entry("a").exit("b").exit("c");
        assert!(matches!(
            builder.build(),
            Err(Error::MalformedGraph { .. })
        ));
    }

    #[test]
    fn test_exit_with_successors_is_accepted() {
        // Declared exits may still have outgoing edges; only cycles
        // through them are rejected, later, by the driver.
        let mut builder = Scfg::builder();
        builder.block("a").block("b").block("c");
        builder.unconditional("a", "b");
        builder.unconditional("b", "c");
        builder.entry("a").exit("b").exit("c");
        assert!(builder.build().is_ok());
    }

    #[test]
    fn test_reverse_postorder_starts_at_entry() {
        let scfg = diamond();
        let order = scfg.reverse_postorder();
        assert_eq!(order[0], &Label::from("entry"));
        assert_eq!(order.len(), 4);
        assert_eq!(order[3], &Label::from("c"));
    }

    #[test]
    fn test_to_dot_contains_blocks_and_discriminants() {
        let scfg = diamond();
        let dot = scfg.to_dot(Some("diamond"));
        assert!(dot.contains("digraph scfg"));
        assert!(dot.contains("entry (entry)"));
        assert!(dot.contains("c (exit)"));
        assert!(dot.contains("label=\"0\""));
        assert!(dot.contains("label=\"1\""));
    }

    #[test]
    fn test_single_block_graph() {
        let mut builder = Scfg::builder();
        builder.block("only").entry("only").exit("only");
        let scfg = builder.build().unwrap();
        assert_eq!(scfg.block_count(), 1);
        assert!(scfg.successors(&"only".into()).next().is_none());
    }
}
