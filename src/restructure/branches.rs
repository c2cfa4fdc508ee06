//! The branch restructuring pass.
//!
//! Runs once the view is acyclic. The view is linearized from its entry;
//! at a head with two or more distinct successors the merge point is
//! located and the head folds into a Branch region:
//!
//! - **Arm painting.** Every node reachable from the head is painted with
//!   the arm (successor edge) that reaches it; a node reached from two
//!   different arms is join territory.
//! - **Merge detection.** The merge candidate is the head's immediate
//!   postdominator, computed by running the dominator algorithm over the
//!   reversed view rooted at a virtual sink. A single join entry equal to
//!   that candidate, with no arm ending early, is a natural merge.
//! - **Divergence.** No join territory at all means every arm runs to a
//!   terminal, and the Branch simply has no tail. Loop interiors always
//!   look like this (latch vs. exit stub), and so do multi-return
//!   functions.
//! - **Merge synthesis.** Join territory entered at several points, or a
//!   join plus early-terminating arms, allocates a merge variable:
//!   every arm edge into a join entry or a terminal is rewritten through
//!   an assignment block feeding one synthetic dispatch, which then *is*
//!   the unique natural merge on re-analysis.
//!
//! Arms are ordered by discriminant value; all other ties break on the
//! lowest label.

use std::collections::HashMap;

use log::debug;

use crate::{
    region::{BlockKind, BranchArm, BranchRegion, Region},
    restructure::builder::{RegionBuilder, View, WorkEdge, WorkItem},
    restructure::control::VariableRole,
    utils::graph::{algorithms, DirectedGraph, NodeId},
    Result,
};

/// Arm membership of a view node during branch analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Paint {
    /// Not reachable from the head.
    None,
    /// The head itself.
    Head,
    /// Reached through exactly one arm (by sorted-arm index).
    One(usize),
    /// Reached through two or more arms: join territory.
    Many,
}

/// Merges the paint contributions of two incoming paths.
fn combine(a: Paint, b: Paint) -> Paint {
    match (a, b) {
        (Paint::None, x) | (x, Paint::None) => x,
        (Paint::One(i), Paint::One(j)) if i == j => Paint::One(i),
        _ => Paint::Many,
    }
}

/// Number of distinct targets among an item's outgoing edges.
fn distinct_targets(item: &WorkItem) -> usize {
    let mut targets: Vec<usize> = item.succs.iter().map(|edge| edge.target).collect();
    targets.sort_unstable();
    targets.dedup();
    targets.len()
}

impl RegionBuilder<'_> {
    /// Consumes an acyclic view entirely, producing its region.
    pub(crate) fn structure_view(&mut self, mut view: View) -> Result<Region> {
        let entry = view.entry;
        let region = self.structure_from(&mut view, entry)?;
        if view.live_count() != 0 {
            let leftovers = view.live_ids();
            return Err(self.invariant(
                "blocks left unconsumed after branch restructuring",
                &view,
                &leftovers,
            ));
        }
        Ok(region)
    }

    /// Linearizes the view from `entry`: single-successor items are
    /// absorbed into a sequence, the first real branch head folds the
    /// rest.
    pub(crate) fn structure_from(&mut self, view: &mut View, entry: usize) -> Result<Region> {
        let mut seq: Vec<Region> = Vec::new();
        let mut cur = entry;
        loop {
            if view.item(cur).succs.is_empty() {
                seq.push(view.take(cur).region);
                break;
            }

            if distinct_targets(view.item(cur)) == 1 {
                let next = view.item(cur).succs[0].target;
                seq.push(view.take(cur).region);
                if view.in_degree(next) != 0 {
                    return Err(self.invariant(
                        "linear successor has predecessors outside the chain",
                        view,
                        &[next],
                    ));
                }
                cur = next;
                continue;
            }

            seq.push(self.structure_branch(view, cur)?);
            break;
        }

        Ok(if seq.len() == 1 {
            seq.remove(0)
        } else {
            Region::Linear(seq)
        })
    }

    /// Folds the branch headed at `cur` and everything reachable from it.
    fn structure_branch(&mut self, view: &mut View, head: usize) -> Result<Region> {
        let mut pending_merge_row: Option<usize> = None;

        // One analysis round, plus one more after merge synthesis.
        for round in 0..2 {
            let mut arms: Vec<(i64, usize)> = Vec::new();
            for edge in &view.item(head).succs {
                let Some(value) = edge.kind.case_value() else {
                    return Err(self.invariant(
                        "branch head carries an unconditional edge",
                        view,
                        &[head],
                    ));
                };
                arms.push((value, edge.target));
            }
            arms.sort_by_key(|&(value, _)| value);

            let paint = self.paint_arms(view, head, &arms)?;

            let incoming = view.incoming();
            let mut joins: Vec<usize> = Vec::new();
            let mut terminals: Vec<usize> = Vec::new();
            for n in view.live_ids() {
                match paint[n] {
                    Paint::Many => {
                        let entered = incoming[n]
                            .iter()
                            .any(|&(uid, _)| uid == head || matches!(paint[uid], Paint::One(_)));
                        if entered {
                            joins.push(n);
                        }
                    }
                    Paint::One(_) => {
                        if view.item(n).succs.is_empty() {
                            terminals.push(n);
                        }
                    }
                    Paint::None | Paint::Head => {}
                }
            }
            joins.sort_by(|&a, &b| {
                self.label(view.item(a).entry)
                    .cmp(self.label(view.item(b).entry))
            });
            terminals.sort_by(|&a, &b| {
                self.label(view.item(a).entry)
                    .cmp(self.label(view.item(b).entry))
            });

            if joins.len() == 1 && terminals.is_empty() {
                // Natural merge; the postdominator computation must agree.
                let merge = self.immediate_postdominator(view, head)?;
                if merge != Some(joins[0]) {
                    return Err(self.invariant(
                        "join frontier disagrees with the immediate postdominator",
                        view,
                        &[head],
                    ));
                }
                return self.emit_branch(view, head, &arms, &paint, merge, pending_merge_row);
            }

            if joins.is_empty() {
                // Fully divergent: every arm runs to a terminal.
                return self.emit_branch(view, head, &arms, &paint, None, pending_merge_row);
            }

            if round == 1 {
                break;
            }
            pending_merge_row = Some(self.synthesize_merge(view, head, &paint, &joins, &terminals)?);
        }

        Err(self.invariant("branch merge synthesis did not converge", view, &[head]))
    }

    /// Paints every node reachable from `head` with the arm that reaches
    /// it, in reverse postorder (a topological order on the acyclic
    /// view).
    fn paint_arms(&self, view: &View, head: usize, arms: &[(i64, usize)]) -> Result<Vec<Paint>> {
        let mini = view.mini_graph()?;
        let order = algorithms::reverse_postorder(&mini, NodeId::new(head));
        let incoming = view.incoming();

        let arm_of_value: HashMap<i64, usize> = arms
            .iter()
            .enumerate()
            .map(|(idx, &(value, _))| (value, idx))
            .collect();

        let mut paint = vec![Paint::None; view.slot_count()];
        paint[head] = Paint::Head;

        for node in order {
            let n = node.index();
            if n == head || !view.contains(n) {
                continue;
            }
            let mut merged = Paint::None;
            for &(uid, pos) in &incoming[n] {
                let contribution = if uid == head {
                    let kind = view.item(head).succs[pos].kind;
                    match kind.case_value().and_then(|value| arm_of_value.get(&value)) {
                        Some(&idx) => Paint::One(idx),
                        None => {
                            return Err(self.invariant(
                                "branch head edge without a matching arm",
                                view,
                                &[head],
                            ))
                        }
                    }
                } else {
                    paint[uid]
                };
                merged = combine(merged, contribution);
            }
            paint[n] = merged;
        }
        Ok(paint)
    }

    /// Immediate postdominator of `head` over the view: the dominator
    /// tree of the reversed view rooted at a virtual sink fed by every
    /// terminal. `None` when only the sink postdominates the head.
    fn immediate_postdominator(&self, view: &View, head: usize) -> Result<Option<usize>> {
        let sink = view.slot_count();
        let mut reversed: DirectedGraph<(), ()> = DirectedGraph::with_capacity(sink + 1, 0);
        for _ in 0..=sink {
            reversed.add_node(());
        }
        for uid in view.live_ids() {
            for edge in &view.item(uid).succs {
                reversed.add_edge(NodeId::new(edge.target), NodeId::new(uid), ())?;
            }
            if view.item(uid).succs.is_empty() {
                reversed.add_edge(NodeId::new(sink), NodeId::new(uid), ())?;
            }
        }

        let tree = algorithms::compute_dominators(&reversed, NodeId::new(sink));
        Ok(tree
            .immediate_dominator(NodeId::new(head))
            .and_then(|m| (m.index() != sink).then(|| m.index())))
    }

    /// Rewrites every arm edge into a join entry or a terminal through a
    /// merge-variable assignment feeding one synthetic dispatch block.
    /// Returns the variable's table row for the eventual Branch region.
    fn synthesize_merge(
        &mut self,
        view: &mut View,
        head: usize,
        paint: &[Paint],
        joins: &[usize],
        terminals: &[usize],
    ) -> Result<usize> {
        let mut targets: Vec<usize> = joins.iter().chain(terminals.iter()).copied().collect();
        targets.sort_by(|&a, &b| {
            self.label(view.item(a).entry)
                .cmp(self.label(view.item(b).entry))
        });
        debug!("synthesizing branch merge over {} targets", targets.len());

        let variable = self.vars.fresh();
        let row = self.new_row(variable, VariableRole::MergeDispatch);

        // Snapshot before the dispatch exists, so its own edges are
        // never rewritten.
        let incoming = view.incoming();

        let d_block = self.add_synthetic("merge", BlockKind::Dispatch { variable });
        let d_succs = targets
            .iter()
            .enumerate()
            .map(|(j, &t)| WorkEdge {
                target: t,
                kind: crate::scfg::EdgeKind::Case(j as i64),
            })
            .collect();
        let d_id = view.add(WorkItem {
            entry: d_block,
            region: Region::Block(d_block),
            succs: d_succs,
        });
        self.record_read(row, d_block);

        for (j, &target) in targets.iter().enumerate() {
            let value = j as i64;
            for &(uid, pos) in &incoming[target] {
                let from_arm = uid == head || matches!(paint[uid], Paint::One(_));
                if !from_arm {
                    continue;
                }
                let a_block = self.add_synthetic("set", BlockKind::Assign { variable, value });
                self.record_write(row, a_block, value);
                let a_id = view.add(WorkItem {
                    entry: a_block,
                    region: Region::Block(a_block),
                    succs: vec![WorkEdge {
                        target: d_id,
                        kind: crate::scfg::EdgeKind::Unconditional,
                    }],
                });
                view.item_mut(uid).succs[pos].target = a_id;
            }
        }
        Ok(row)
    }

    /// Builds the Branch region: extracts and structures each arm, then
    /// structures the tail from the merge point.
    fn emit_branch(
        &mut self,
        view: &mut View,
        head: usize,
        arms: &[(i64, usize)],
        paint: &[Paint],
        merge: Option<usize>,
        pending_merge_row: Option<usize>,
    ) -> Result<Region> {
        let mut arm_sets: Vec<Vec<usize>> = vec![Vec::new(); arms.len()];
        for n in view.live_ids() {
            if let Paint::One(idx) = paint[n] {
                arm_sets[idx].push(n);
            }
        }

        // An arm node that still chooses between staying in the arm and
        // falling to the merge keeps its choice observable through a
        // jump stub; a node whose only continuation is the merge just
        // falls out of the arm.
        if let Some(m) = merge {
            for arm_set in &mut arm_sets {
                let nodes = arm_set.clone();
                for x in nodes {
                    if distinct_targets(view.item(x)) < 2 {
                        continue;
                    }
                    let positions: Vec<usize> = view
                        .item(x)
                        .succs
                        .iter()
                        .enumerate()
                        .filter(|(_, edge)| edge.target == m)
                        .map(|(pos, _)| pos)
                        .collect();
                    for pos in positions {
                        let s_block = self.add_synthetic("jump", BlockKind::Jump);
                        let s_id = view.add(WorkItem {
                            entry: s_block,
                            region: Region::Block(s_block),
                            succs: Vec::new(),
                        });
                        view.item_mut(x).succs[pos].target = s_id;
                        arm_set.push(s_id);
                    }
                }
            }
        }

        let head_item = view.take(head);

        let mut built_arms: Vec<BranchArm> = Vec::with_capacity(arms.len());
        for (idx, &(value, target)) in arms.iter().enumerate() {
            let body = if merge == Some(target) {
                // The head transfers straight to the merge under this
                // discriminant
                Region::Linear(Vec::new())
            } else {
                let sub = self.extract_subview(view, &arm_sets[idx], target, merge)?;
                self.vars.enter();
                let region = self.structure_view(sub);
                self.vars.exit();
                region?
            };
            built_arms.push(BranchArm { value, body });
        }

        let tail = match merge {
            Some(m) => Some(Box::new(self.structure_from(view, m)?)),
            None => None,
        };

        let id = self.next_region_id();
        if let Some(row) = pending_merge_row {
            self.assign_row_region(row, id);
        }
        Ok(Region::Branch(BranchRegion {
            id,
            head: Box::new(head_item.region),
            arms: built_arms,
            tail,
        }))
    }
}
