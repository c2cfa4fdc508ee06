//! The loop restructuring pass.
//!
//! Every non-trivial strongly connected component of the working view,
//! natural loops, irreducible tangles and single-block self-loops alike,
//! is folded into one Loop region:
//!
//! 1. **Header selection.** The targets of edges entering the SCC are the
//!    header candidates, ordered by label. A unique candidate stays the
//!    header. Several candidates (irreducible entry) get a synthetic
//!    dispatch header reading a fresh entry variable, and every edge into
//!    any of the real headers (external entries and internal jumps both)
//!    is rewritten through an assignment block setting that variable.
//!    This is what makes the header unique for arbitrary control flow.
//! 2. **Exit unification.** Edges leaving the SCC are interposed with exit
//!    stubs. Two or more distinct exit targets allocate an exit variable
//!    and route all stubs to one synthetic dispatch placed after the
//!    loop; a single target gets bare jump stubs.
//! 3. **Back edges.** Every edge re-entering the header from inside is
//!    interposed with a latch whose outgoing edge is cut: latches are the
//!    terminals of the loop body whose completion means "iterate again".
//!    Several latch sites allocate a continue variable recording which
//!    site re-entered.
//! 4. **Interior.** The SCC members plus interior synthetics form a fresh
//!    view, entered at the header, which is restructured recursively
//!    (nested SCCs included) into the loop body.
//!
//! An SCC containing a declared exit block is a modeling bug in the input
//! and is left unfolded; the driver reports it as non-convergence.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::{
    region::{BlockKind, LoopExit, LoopRegion, Region},
    restructure::builder::{RegionBuilder, View, WorkEdge, WorkItem},
    restructure::control::VariableRole,
    scfg::{EdgeKind, Label},
    utils::graph::algorithms,
    Error, Result,
};

impl RegionBuilder<'_> {
    /// Folds every reducible non-trivial SCC of the view into a Loop
    /// work item. Returns how many SCCs were folded.
    pub(crate) fn restructure_loops(&mut self, view: &mut View) -> Result<usize> {
        let mini = view.mini_graph()?;
        let sccs = algorithms::strongly_connected_components(&mini);

        // Non-trivial SCCs, ordered by their smallest entry label so the
        // fold order never depends on traversal accidents.
        let mut folds: Vec<(Label, Vec<usize>)> = Vec::new();
        for scc in sccs {
            let ids: Vec<usize> = scc
                .iter()
                .map(|node| node.index())
                .filter(|&id| view.contains(id))
                .collect();
            let self_loop = ids.len() == 1
                && view
                    .item(ids[0])
                    .succs
                    .iter()
                    .any(|edge| edge.target == ids[0]);
            if ids.len() < 2 && !self_loop {
                continue;
            }
            let Some(min_label) = ids
                .iter()
                .map(|&id| self.label(view.item(id).entry))
                .min()
                .cloned()
            else {
                continue;
            };
            folds.push((min_label, ids));
        }
        folds.sort_by(|a, b| a.0.cmp(&b.0));

        let mut folded = 0;
        for (_, members) in folds {
            let has_declared_exit = members.iter().any(|&id| {
                view.item(id)
                    .region
                    .blocks()
                    .any(|block| self.is_declared_exit(block))
            });
            if has_declared_exit {
                debug!("leaving SCC with a declared exit unfolded");
                continue;
            }

            debug!("folding SCC of {} nodes", members.len());
            self.fold_scc(view, &members)?;
            folded += 1;
        }
        Ok(folded)
    }

    /// Folds one SCC into a single Loop work item.
    fn fold_scc(&mut self, view: &mut View, members: &[usize]) -> Result<()> {
        let member_set: HashSet<usize> = members.iter().copied().collect();

        // Header candidates: targets of edges entering the SCC, plus the
        // view entry if the level starts inside the loop.
        let mut headers: Vec<usize> = Vec::new();
        for uid in view.live_ids() {
            if member_set.contains(&uid) {
                continue;
            }
            for edge in &view.item(uid).succs {
                if member_set.contains(&edge.target) && !headers.contains(&edge.target) {
                    headers.push(edge.target);
                }
            }
        }
        if member_set.contains(&view.entry) && !headers.contains(&view.entry) {
            headers.push(view.entry);
        }
        headers.sort_by(|&a, &b| {
            self.label(view.item(a).entry)
                .cmp(self.label(view.item(b).entry))
        });
        if headers.is_empty() {
            return Err(self.invariant("SCC has no entry and is not the view entry", view, members));
        }

        let mut repeats = Vec::new();
        let mut interior: Vec<usize> = members.to_vec();
        let mut entry_variable = None;
        let mut entry_row = None;

        let interior_entry = if headers.len() > 1 {
            self.dispatch_headers(
                view,
                &member_set,
                &headers,
                &mut interior,
                &mut repeats,
                &mut entry_variable,
                &mut entry_row,
            )?
        } else {
            headers[0]
        };

        // Exits: interpose stubs on every edge leaving the interior.
        let interior_set: HashSet<usize> = interior.iter().copied().collect();
        let mut exiting: Vec<(usize, usize, usize)> = Vec::new();
        for &uid in &interior {
            for (pos, edge) in view.item(uid).succs.iter().enumerate() {
                if !interior_set.contains(&edge.target) {
                    exiting.push((uid, pos, edge.target));
                }
            }
        }
        exiting.sort_by(|a, b| {
            self.label(view.item(a.0).entry)
                .cmp(self.label(view.item(b.0).entry))
                .then(a.1.cmp(&b.1))
        });

        let mut exit_targets: Vec<usize> = Vec::new();
        for &(_, _, target) in &exiting {
            if !exit_targets.contains(&target) {
                exit_targets.push(target);
            }
        }
        exit_targets.sort_by(|&a, &b| {
            self.label(view.item(a).entry)
                .cmp(self.label(view.item(b).entry))
        });

        let mut exit_variable = None;
        let mut exit_row = None;
        let mut loop_out = None;

        if exit_targets.len() >= 2 {
            let variable = self.vars.fresh();
            let row = self.new_row(variable, VariableRole::ExitDispatch);
            exit_variable = Some(variable);
            exit_row = Some(row);

            let target_value: HashMap<usize, i64> = exit_targets
                .iter()
                .enumerate()
                .map(|(j, &t)| (t, j as i64))
                .collect();

            let e_block = self.add_synthetic("exit", BlockKind::Dispatch { variable });
            let e_succs = exit_targets
                .iter()
                .enumerate()
                .map(|(j, &t)| WorkEdge {
                    target: t,
                    kind: EdgeKind::Case(j as i64),
                })
                .collect();
            let e_id = view.add(WorkItem {
                entry: e_block,
                region: Region::Block(e_block),
                succs: e_succs,
            });
            self.record_read(row, e_block);

            for &(uid, pos, target) in &exiting {
                let value = target_value[&target];
                let s_block = self.add_synthetic("set", BlockKind::Assign { variable, value });
                self.record_write(row, s_block, value);
                let s_id = view.add(WorkItem {
                    entry: s_block,
                    region: Region::Block(s_block),
                    succs: Vec::new(),
                });
                view.item_mut(uid).succs[pos].target = s_id;
                interior.push(s_id);
            }
            loop_out = Some(e_id);
        } else if exit_targets.len() == 1 {
            for &(uid, pos, _) in &exiting {
                let s_block = self.add_synthetic("jump", BlockKind::Jump);
                let s_id = view.add(WorkItem {
                    entry: s_block,
                    region: Region::Block(s_block),
                    succs: Vec::new(),
                });
                view.item_mut(uid).succs[pos].target = s_id;
                interior.push(s_id);
            }
            loop_out = Some(exit_targets[0]);
        }

        let exits: Vec<LoopExit> = exit_targets
            .iter()
            .enumerate()
            .map(|(j, &t)| LoopExit {
                value: if exit_targets.len() >= 2 {
                    Some(j as i64)
                } else {
                    None
                },
                target: self.label(view.item(t).entry).clone(),
            })
            .collect();

        // Back edges and the interior build share the loop's own
        // variable scope.
        self.vars.enter();
        let mut continue_variable = None;
        let mut continue_row = None;

        if headers.len() == 1 {
            let header = interior_entry;
            let mut sites: Vec<(usize, usize)> = Vec::new();
            for &uid in &interior {
                for (pos, edge) in view.item(uid).succs.iter().enumerate() {
                    if edge.target == header {
                        sites.push((uid, pos));
                    }
                }
            }
            sites.sort_by(|a, b| {
                self.label(view.item(a.0).entry)
                    .cmp(self.label(view.item(b.0).entry))
                    .then(a.1.cmp(&b.1))
            });

            if sites.is_empty() {
                self.vars.exit();
                return Err(self.invariant("SCC header has no back edge", view, members));
            }

            if sites.len() > 1 {
                let variable = self.vars.fresh();
                let row = self.new_row(variable, VariableRole::Repeat);
                continue_variable = Some(variable);
                continue_row = Some(row);
                for (k, &(uid, pos)) in sites.iter().enumerate() {
                    let value = k as i64;
                    let l_block = self.add_synthetic("set", BlockKind::Assign { variable, value });
                    self.record_write(row, l_block, value);
                    let l_id = view.add(WorkItem {
                        entry: l_block,
                        region: Region::Block(l_block),
                        succs: Vec::new(),
                    });
                    view.item_mut(uid).succs[pos].target = l_id;
                    repeats.push(l_block);
                    interior.push(l_id);
                }
            } else {
                let (uid, pos) = sites[0];
                let l_block = self.add_synthetic("latch", BlockKind::Jump);
                let l_id = view.add(WorkItem {
                    entry: l_block,
                    region: Region::Block(l_block),
                    succs: Vec::new(),
                });
                view.item_mut(uid).succs[pos].target = l_id;
                repeats.push(l_block);
                interior.push(l_id);
            }
        }

        // Recursively restructure the interior into the body.
        let header_block = view.item(interior_entry).entry;
        let sub = self.extract_subview(view, &interior, interior_entry, None)?;
        let body = self.build(sub);
        self.vars.exit();
        let body = body?;

        let region_id = self.next_region_id();
        if let Some(row) = entry_row {
            self.assign_row_region(row, region_id);
        }
        if let Some(row) = exit_row {
            self.assign_row_region(row, region_id);
        }
        if let Some(row) = continue_row {
            self.assign_row_region(row, region_id);
        }

        let succs = match loop_out {
            Some(target) => vec![WorkEdge {
                target,
                kind: EdgeKind::Unconditional,
            }],
            None => Vec::new(),
        };
        let looped = LoopRegion {
            id: region_id,
            header: header_block,
            body: Box::new(body),
            repeats,
            exits,
            entry_variable,
            continue_variable,
            exit_variable,
        };
        let loop_id = view.add(WorkItem {
            entry: header_block,
            region: Region::Loop(looped),
            succs,
        });

        // Every surviving edge into the folded subgraph must have been
        // aimed at its single entry; re-aim those at the loop item.
        let mut dangling = false;
        for uid in view.live_ids() {
            if uid == loop_id {
                continue;
            }
            let mut retargets: Vec<usize> = Vec::new();
            for (pos, edge) in view.item(uid).succs.iter().enumerate() {
                if edge.target == interior_entry {
                    retargets.push(pos);
                } else if !view.contains(edge.target) {
                    dangling = true;
                }
            }
            for pos in retargets {
                view.item_mut(uid).succs[pos].target = loop_id;
            }
        }
        if dangling {
            return Err(Error::InternalInvariant {
                message: "edge into folded loop interior bypasses its header".to_string(),
                blocks: vec![self.label(header_block).clone()],
            });
        }

        if view.entry == interior_entry {
            view.entry = loop_id;
        }
        Ok(())
    }

    /// Irreducible-entry handling: synthesizes the dispatch header and
    /// reroutes every edge into any real header through an entry-variable
    /// assignment. Returns the dispatch item, which becomes the interior
    /// entry.
    #[allow(clippy::too_many_arguments)]
    fn dispatch_headers(
        &mut self,
        view: &mut View,
        member_set: &HashSet<usize>,
        headers: &[usize],
        interior: &mut Vec<usize>,
        repeats: &mut Vec<crate::region::BlockId>,
        entry_variable: &mut Option<crate::restructure::ControlVariable>,
        entry_row: &mut Option<usize>,
    ) -> Result<usize> {
        debug!("irreducible loop with {} headers", headers.len());

        let variable = self.vars.fresh();
        let row = self.new_row(variable, VariableRole::EntryDispatch);
        *entry_variable = Some(variable);
        *entry_row = Some(row);

        let d_block = self.add_synthetic("head", BlockKind::Dispatch { variable });
        let d_succs = headers
            .iter()
            .enumerate()
            .map(|(i, &h)| WorkEdge {
                target: h,
                kind: EdgeKind::Case(i as i64),
            })
            .collect();
        let d_id = view.add(WorkItem {
            entry: d_block,
            region: Region::Block(d_block),
            succs: d_succs,
        });
        self.record_read(row, d_block);
        interior.push(d_id);

        let live = view.live_ids();
        for uid in live {
            if uid == d_id {
                continue;
            }
            let positions: Vec<(usize, usize)> = view
                .item(uid)
                .succs
                .iter()
                .enumerate()
                .filter_map(|(pos, edge)| {
                    headers
                        .iter()
                        .position(|&h| h == edge.target)
                        .map(|header_index| (pos, header_index))
                })
                .collect();
            for (pos, header_index) in positions {
                let value = header_index as i64;
                let a_block = self.add_synthetic("set", BlockKind::Assign { variable, value });
                self.record_write(row, a_block, value);
                let internal = member_set.contains(&uid);
                let succs = if internal {
                    // Back edge: jumping at a header means starting the
                    // next iteration through the dispatch
                    Vec::new()
                } else {
                    vec![WorkEdge {
                        target: d_id,
                        kind: EdgeKind::Unconditional,
                    }]
                };
                let a_id = view.add(WorkItem {
                    entry: a_block,
                    region: Region::Block(a_block),
                    succs,
                });
                view.item_mut(uid).succs[pos].target = a_id;
                if internal {
                    repeats.push(a_block);
                    interior.push(a_id);
                }
            }
        }

        // A level that starts inside the loop needs the entry value set
        // on the way in.
        if member_set.contains(&view.entry) {
            let Some(header_index) = headers.iter().position(|&h| h == view.entry) else {
                let members: Vec<usize> = member_set.iter().copied().collect();
                return Err(self.invariant(
                    "view entry inside an SCC is not one of its headers",
                    view,
                    &members,
                ));
            };
            let value = header_index as i64;
            let a_block = self.add_synthetic("set", BlockKind::Assign { variable, value });
            self.record_write(row, a_block, value);
            let a_id = view.add(WorkItem {
                entry: a_block,
                region: Region::Block(a_block),
                succs: vec![WorkEdge {
                    target: d_id,
                    kind: EdgeKind::Unconditional,
                }],
            });
            view.entry = a_id;
        }

        Ok(d_id)
    }
}
