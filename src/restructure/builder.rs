//! The restructuring driver.
//!
//! [`RegionBuilder`] owns everything a run accumulates (the block table,
//! the control-variable allocator and table rows, region id assignment)
//! and drives rounds of the loop pass followed by the branch pass over a
//! shrinking [`View`] until a single region remains.
//!
//! A `View` is the current working graph: work items that each carry the
//! region built for them so far, connected by discriminant-tagged edges.
//! Initially every input block is its own item; every fold replaces a set
//! of items with one item carrying a composite region. Slots are never
//! reindexed (folded items leave `None` holes), so edge targets stay
//! stable across the whole run and algorithm node ids equal slot indices.

use log::{debug, warn};

use crate::{
    region::{BlockId, BlockInfo, BlockKind, Region, RegionId, RegionTree},
    restructure::control::{
        ControlVariable, ControlVariableAllocator, VariableInfo, VariableRole, VariableTable,
    },
    scfg::{EdgeKind, Label, Scfg},
    utils::graph::{algorithms, DirectedGraph, NodeId},
    Error, Result,
};

/// Rounds the driver tolerates without the view shrinking before it
/// reports [`Error::NonConvergence`].
const NON_CONVERGENCE_ROUNDS: usize = 4;

/// An edge of the working view.
#[derive(Debug, Clone)]
pub(crate) struct WorkEdge {
    /// Slot index of the target item.
    pub target: usize,
    /// Discriminant carried over from the original edge.
    pub kind: EdgeKind,
}

/// A node of the working view: the region built so far plus its edges.
#[derive(Debug)]
pub(crate) struct WorkItem {
    /// The block control enters this item at; identifies the item for
    /// ordering and diagnostics.
    pub entry: BlockId,
    /// The region accumulated for this item.
    pub region: Region,
    /// Ordered outgoing edges.
    pub succs: Vec<WorkEdge>,
}

/// The shrinking working graph of a restructuring level.
#[derive(Debug, Default)]
pub(crate) struct View {
    slots: Vec<Option<WorkItem>>,
    /// Slot index of the entry item.
    pub entry: usize,
}

impl View {
    pub(crate) fn new(entry: usize) -> Self {
        View {
            slots: Vec::new(),
            entry,
        }
    }

    /// Number of slots ever allocated (including holes).
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Live slot indices in ascending order.
    pub(crate) fn live_ids(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|_| i))
            .collect()
    }

    pub(crate) fn live_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub(crate) fn contains(&self, id: usize) -> bool {
        self.slots.get(id).is_some_and(Option::is_some)
    }

    /// Returns the item in a live slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot is dead; callers only hold ids obtained from
    /// [`live_ids`](Self::live_ids) or [`add`](Self::add).
    pub(crate) fn item(&self, id: usize) -> &WorkItem {
        self.slots[id].as_ref().expect("live work item")
    }

    /// Mutable access to the item in a live slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot is dead.
    pub(crate) fn item_mut(&mut self, id: usize) -> &mut WorkItem {
        self.slots[id].as_mut().expect("live work item")
    }

    /// Adds a new item, returning its slot index.
    pub(crate) fn add(&mut self, item: WorkItem) -> usize {
        self.slots.push(Some(item));
        self.slots.len() - 1
    }

    /// Removes and returns the item in a live slot.
    ///
    /// # Panics
    ///
    /// Panics if the slot is dead.
    pub(crate) fn take(&mut self, id: usize) -> WorkItem {
        self.slots[id].take().expect("live work item")
    }

    /// Builds a throwaway algorithm graph with one node per slot (dead
    /// slots become isolated nodes), so `NodeId` indices equal slot
    /// indices.
    pub(crate) fn mini_graph(&self) -> Result<DirectedGraph<(), ()>> {
        let mut graph: DirectedGraph<(), ()> = DirectedGraph::with_capacity(self.slots.len(), 0);
        for _ in 0..self.slots.len() {
            graph.add_node(());
        }
        for id in self.live_ids() {
            for edge in &self.item(id).succs {
                graph.add_edge(NodeId::new(id), NodeId::new(edge.target), ())?;
            }
        }
        Ok(graph)
    }

    /// Incoming edges per slot as `(source slot, edge position)` pairs,
    /// in ascending source order.
    pub(crate) fn incoming(&self) -> Vec<Vec<(usize, usize)>> {
        let mut incoming: Vec<Vec<(usize, usize)>> = vec![Vec::new(); self.slots.len()];
        for id in self.live_ids() {
            for (pos, edge) in self.item(id).succs.iter().enumerate() {
                incoming[edge.target].push((id, pos));
            }
        }
        incoming
    }

    /// Number of live edges pointing at `target`.
    pub(crate) fn in_degree(&self, target: usize) -> usize {
        self.live_ids()
            .into_iter()
            .flat_map(|id| self.item(id).succs.iter())
            .filter(|edge| edge.target == target)
            .count()
    }
}

/// A control-variable table row under construction.
#[derive(Debug)]
pub(crate) struct PendingVariable {
    variable: ControlVariable,
    role: VariableRole,
    region: Option<RegionId>,
    writes: Vec<(Label, i64)>,
    reads: Vec<Label>,
}

/// Drives a complete restructuring run over one SCFG.
pub(crate) struct RegionBuilder<'s> {
    scfg: &'s Scfg,
    /// Block table: sources first, synthetics appended.
    blocks: Vec<BlockInfo>,
    /// Control-variable identifier allocator.
    pub(crate) vars: ControlVariableAllocator,
    /// Variable table rows under construction.
    rows: Vec<PendingVariable>,
    /// Next composite region id.
    next_region: u32,
    /// Synthetic label counter.
    synth_counter: u32,
}

impl<'s> RegionBuilder<'s> {
    pub(crate) fn new(scfg: &'s Scfg) -> Self {
        let blocks = scfg
            .labels()
            .map(|label| BlockInfo::new(label.clone(), BlockKind::Source))
            .collect();
        RegionBuilder {
            scfg,
            blocks,
            vars: ControlVariableAllocator::new(),
            rows: Vec::new(),
            next_region: 0,
            synth_counter: 0,
        }
    }

    /// Seeds the top-level view: one item per input block.
    pub(crate) fn initial_view(&self) -> View {
        let entry = self.scfg.entry_id().index();
        let mut view = View::new(entry);
        for i in 0..self.scfg.block_count() {
            let succs = self
                .scfg
                .successor_edges(NodeId::new(i))
                .map(|(target, kind)| WorkEdge {
                    target: target.index(),
                    kind,
                })
                .collect();
            view.add(WorkItem {
                entry: BlockId(i),
                region: Region::Block(BlockId(i)),
                succs,
            });
        }
        view
    }

    /// Returns the label of a block in the table.
    pub(crate) fn label(&self, id: BlockId) -> &Label {
        self.blocks[id.index()].label()
    }

    /// True if the block is one of the input graph's declared exits.
    pub(crate) fn is_declared_exit(&self, id: BlockId) -> bool {
        id.index() < self.scfg.block_count() && self.scfg.is_exit_id(NodeId::new(id.index()))
    }

    /// Creates a synthetic block with a fresh, collision-free label.
    pub(crate) fn add_synthetic(&mut self, prefix: &str, kind: BlockKind) -> BlockId {
        let label = loop {
            let candidate = Label::from(format!("%{}{}", prefix, self.synth_counter));
            self.synth_counter += 1;
            if !self.scfg.contains(&candidate) {
                break candidate;
            }
        };
        self.blocks.push(BlockInfo::new(label, kind));
        BlockId(self.blocks.len() - 1)
    }

    /// Hands out the next composite region id.
    pub(crate) fn next_region_id(&mut self) -> RegionId {
        let id = RegionId(self.next_region);
        self.next_region += 1;
        id
    }

    /// Opens a new variable table row; returns its index.
    pub(crate) fn new_row(&mut self, variable: ControlVariable, role: VariableRole) -> usize {
        self.rows.push(PendingVariable {
            variable,
            role,
            region: None,
            writes: Vec::new(),
            reads: Vec::new(),
        });
        self.rows.len() - 1
    }

    pub(crate) fn record_write(&mut self, row: usize, site: BlockId, value: i64) {
        let label = self.blocks[site.index()].label().clone();
        self.rows[row].writes.push((label, value));
    }

    pub(crate) fn record_read(&mut self, row: usize, site: BlockId) {
        let label = self.blocks[site.index()].label().clone();
        self.rows[row].reads.push(label);
    }

    pub(crate) fn assign_row_region(&mut self, row: usize, region: RegionId) {
        self.rows[row].region = Some(region);
    }

    /// Labels of every block inside the given view items, for
    /// diagnostics.
    pub(crate) fn item_labels(&self, view: &View, ids: &[usize]) -> Vec<Label> {
        let mut labels: Vec<Label> = ids
            .iter()
            .filter(|&&id| view.contains(id))
            .flat_map(|&id| view.item(id).region.blocks())
            .map(|block| self.label(block).clone())
            .collect();
        labels.sort();
        labels
    }

    /// Builds an [`Error::InternalInvariant`] with sorted block labels.
    pub(crate) fn invariant(&self, message: &str, view: &View, ids: &[usize]) -> Error {
        Error::InternalInvariant {
            message: message.to_string(),
            blocks: self.item_labels(view, ids),
        }
    }

    /// Moves the given slots out of `view` into a fresh, reindexed view.
    ///
    /// Edges among the extracted items are kept (targets remapped);
    /// edges to `merge` are dropped: that is the implicit fall-through
    /// of a branch arm into the merge point. Any other outgoing edge
    /// means the caller failed to cut the subgraph loose first.
    pub(crate) fn extract_subview(
        &self,
        view: &mut View,
        ids: &[usize],
        entry: usize,
        merge: Option<usize>,
    ) -> Result<View> {
        let mut sorted: Vec<usize> = ids.to_vec();
        sorted.sort_unstable();

        let mut remap = vec![usize::MAX; view.slot_count()];
        for (new_id, &old_id) in sorted.iter().enumerate() {
            remap[old_id] = new_id;
        }
        if !sorted.contains(&entry) {
            return Err(self.invariant("subview entry is not among its members", view, ids));
        }

        let mut sub = View::new(remap[entry]);
        for &old_id in &sorted {
            let mut item = view.take(old_id);
            let mut succs = Vec::with_capacity(item.succs.len());
            for edge in item.succs.drain(..) {
                if remap[edge.target] != usize::MAX {
                    succs.push(WorkEdge {
                        target: remap[edge.target],
                        kind: edge.kind,
                    });
                } else if merge != Some(edge.target) {
                    return Err(Error::InternalInvariant {
                        message: "subview member keeps an edge out of the subview".to_string(),
                        blocks: vec![self.label(item.entry).clone()],
                    });
                }
            }
            item.succs = succs;
            sub.add(item);
        }
        Ok(sub)
    }

    /// Restructures one view into a single region.
    ///
    /// Rounds of the loop pass run until the view is acyclic, then the
    /// branch pass consumes it. A view that stays cyclic (an SCC through
    /// a declared exit cannot be folded) exhausts its rounds and
    /// fails with [`Error::NonConvergence`].
    pub(crate) fn build(&mut self, mut view: View) -> Result<Region> {
        let mut stalled = 0;
        loop {
            let folded = self.restructure_loops(&mut view)?;

            let mini = view.mini_graph()?;
            if !algorithms::has_cycle(&mini, NodeId::new(view.entry)) {
                return self.structure_view(view);
            }

            if folded == 0 {
                stalled += 1;
            } else {
                stalled = 0;
            }
            if stalled >= NON_CONVERGENCE_ROUNDS {
                let blocked = self.cyclic_remainder(&view)?;
                warn!(
                    "restructuring stalled after {NON_CONVERGENCE_ROUNDS} rounds on {} blocks",
                    blocked.len()
                );
                return Err(Error::NonConvergence {
                    rounds: NON_CONVERGENCE_ROUNDS,
                    blocks: blocked,
                });
            }
        }
    }

    /// Labels of every block still caught in a non-trivial SCC.
    fn cyclic_remainder(&self, view: &View) -> Result<Vec<Label>> {
        let mini = view.mini_graph()?;
        let sccs = algorithms::strongly_connected_components(&mini);

        let mut labels: Vec<Label> = Vec::new();
        for scc in sccs {
            let ids: Vec<usize> = scc
                .iter()
                .map(|node| node.index())
                .filter(|&id| view.contains(id))
                .collect();
            let non_trivial = ids.len() > 1
                || ids
                    .first()
                    .is_some_and(|&id| view.item(id).succs.iter().any(|e| e.target == id));
            if non_trivial {
                labels.extend(
                    ids.iter()
                        .flat_map(|&id| view.item(id).region.blocks())
                        .map(|block| self.label(block).clone()),
                );
            }
        }
        labels.sort();
        Ok(labels)
    }

    /// Finalizes the run into the returned tree.
    pub(crate) fn finish(self, root: Region) -> Result<RegionTree> {
        let mut entries = Vec::with_capacity(self.rows.len());
        for row in self.rows {
            let Some(region) = row.region else {
                return Err(Error::InternalInvariant {
                    message: format!(
                        "control variable {} was allocated but never tied to a region",
                        row.variable
                    ),
                    blocks: Vec::new(),
                });
            };
            entries.push(VariableInfo {
                variable: row.variable,
                region,
                role: row.role,
                writes: row.writes,
                reads: row.reads,
            });
        }
        debug!(
            "restructured into {} blocks ({} synthetic), {} control variables",
            self.blocks.len(),
            self.blocks.iter().filter(|b| !b.is_source()).count(),
            entries.len()
        );
        Ok(RegionTree::new(
            self.blocks,
            root,
            VariableTable::new(entries),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(entry: usize, succs: Vec<(usize, EdgeKind)>) -> WorkItem {
        WorkItem {
            entry: BlockId(entry),
            region: Region::Block(BlockId(entry)),
            succs: succs
                .into_iter()
                .map(|(target, kind)| WorkEdge { target, kind })
                .collect(),
        }
    }

    #[test]
    fn test_view_add_take_contains() {
        let mut view = View::new(0);
        let a = view.add(item(0, vec![]));
        assert!(view.contains(a));
        assert_eq!(view.live_count(), 1);

        let taken = view.take(a);
        assert_eq!(taken.entry, BlockId(0));
        assert!(!view.contains(a));
        assert_eq!(view.live_count(), 0);
        assert_eq!(view.slot_count(), 1);
    }

    #[test]
    fn test_view_incoming_and_in_degree() {
        let mut view = View::new(0);
        let a = view.add(item(0, vec![]));
        let b = view.add(item(1, vec![]));
        view.item_mut(a).succs.push(WorkEdge {
            target: b,
            kind: EdgeKind::Unconditional,
        });

        let incoming = view.incoming();
        assert_eq!(incoming[b], vec![(a, 0)]);
        assert_eq!(view.in_degree(b), 1);
        assert_eq!(view.in_degree(a), 0);
    }

    #[test]
    fn test_mini_graph_preserves_slot_indices() {
        let mut view = View::new(0);
        let a = view.add(item(0, vec![]));
        let b = view.add(item(1, vec![]));
        view.item_mut(a).succs.push(WorkEdge {
            target: b,
            kind: EdgeKind::Unconditional,
        });
        view.take(a); // hole at slot 0

        let mini = view.mini_graph().unwrap();
        assert_eq!(mini.node_count(), 2);
        assert_eq!(mini.edge_count(), 0); // a's edge left with it
    }
}
