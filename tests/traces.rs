//! Execution-trace equivalence: interpreting the region tree with the
//! same branch decisions as the original graph must visit the same
//! source blocks in the same order. Synthetic assignment, dispatch and
//! jump blocks are bookkeeping and never appear in traces.

use std::collections::{HashMap, VecDeque};

use regionize::prelude::*;

/// Executes the SCFG from its entry, consuming one scripted decision at
/// every multi-way source branch.
fn run_scfg(scfg: &Scfg, decisions: &[i64]) -> Vec<String> {
    let mut queue: VecDeque<i64> = decisions.iter().copied().collect();
    let mut trace = Vec::new();
    let mut cur = scfg.entry().clone();
    loop {
        trace.push(cur.to_string());
        let succs: Vec<(Label, EdgeKind)> = scfg
            .successors(&cur)
            .map(|(label, kind)| (label.clone(), kind))
            .collect();
        match succs.len() {
            0 => break,
            1 => cur = succs[0].0.clone(),
            _ => {
                let decision = queue.pop_front().expect("script ran out of decisions");
                cur = succs
                    .iter()
                    .find(|(_, kind)| kind.case_value() == Some(decision))
                    .unwrap_or_else(|| panic!("no edge for decision {decision} at {cur}"))
                    .0
                    .clone();
            }
        }
    }
    assert!(queue.is_empty(), "unused decisions left in script");
    trace
}

/// Interprets the region tree with the same decision script, tracking
/// control variables written by synthetic assignment blocks.
struct TreeRunner<'t> {
    tree: &'t RegionTree,
    vars: HashMap<ControlVariable, i64>,
    decisions: VecDeque<i64>,
    trace: Vec<String>,
    last: Option<BlockId>,
}

impl<'t> TreeRunner<'t> {
    fn run(tree: &'t RegionTree, decisions: &[i64]) -> Vec<String> {
        let mut runner = TreeRunner {
            tree,
            vars: HashMap::new(),
            decisions: decisions.iter().copied().collect(),
            trace: Vec::new(),
            last: None,
        };
        runner.exec(tree.root());
        assert!(
            runner.decisions.is_empty(),
            "unused decisions left in script"
        );
        runner.trace
    }

    fn exec(&mut self, region: &Region) {
        match region {
            Region::Block(id) => {
                let info = self.tree.block(*id).expect("valid block id");
                match info.kind() {
                    BlockKind::Source => self.trace.push(info.label().to_string()),
                    BlockKind::Assign { variable, value } => {
                        self.vars.insert(*variable, *value);
                    }
                    BlockKind::Dispatch { .. } | BlockKind::Jump => {}
                }
                self.last = Some(*id);
            }
            Region::Linear(children) => {
                for child in children {
                    self.exec(child);
                }
            }
            Region::Branch(branch) => {
                self.exec(&branch.head);
                let head = self.last.expect("branch head executed");
                let info = self.tree.block(head).expect("valid block id");
                let value = match info.kind() {
                    BlockKind::Dispatch { variable } => {
                        *self.vars.get(variable).expect("dispatch variable written")
                    }
                    BlockKind::Source => {
                        self.decisions.pop_front().expect("script ran out")
                    }
                    other => panic!("branch headed by non-deciding block {other:?}"),
                };
                let arm = branch
                    .arm(value)
                    .unwrap_or_else(|| panic!("no arm for value {value}"));
                self.exec(arm);
                if let Some(tail) = &branch.tail {
                    self.exec(tail);
                }
            }
            Region::Loop(looped) => {
                let mut iterations = 0;
                loop {
                    self.exec(&looped.body);
                    let last = self.last.expect("loop body executed");
                    if !looped.repeats.contains(&last) {
                        break;
                    }
                    iterations += 1;
                    assert!(iterations < 10_000, "runaway loop in interpretation");
                }
            }
        }
    }
}

fn assert_equivalent(scfg: &Scfg, decisions: &[i64]) {
    let expected = run_scfg(scfg, decisions);
    let tree = restructure(scfg).unwrap();
    let actual = TreeRunner::run(&tree, decisions);
    assert_eq!(
        actual, expected,
        "trace mismatch for decisions {decisions:?}\n{}",
        tree.dump()
    );
}

fn diamond() -> Scfg {
    let mut builder = Scfg::builder();
    builder.block("entry").block("a").block("b").block("c");
    builder.case("entry", "a", 0);
    builder.case("entry", "b", 1);
    builder.unconditional("a", "c");
    builder.unconditional("b", "c");
    builder.entry("entry").exit("c");
    builder.build().unwrap()
}

fn natural_loop() -> Scfg {
    let mut builder = Scfg::builder();
    builder.block("entry").block("head").block("body").block("exit");
    builder.unconditional("entry", "head");
    builder.case("head", "exit", 0);
    builder.case("head", "body", 1);
    builder.unconditional("body", "head");
    builder.entry("entry").exit("exit");
    builder.build().unwrap()
}

fn irreducible_loop() -> Scfg {
    let mut builder = Scfg::builder();
    builder.block("entry").block("h1").block("h2").block("x");
    builder.case("entry", "h1", 0);
    builder.case("entry", "h2", 1);
    builder.case("h1", "x", 0);
    builder.case("h1", "h2", 1);
    builder.case("h2", "x", 0);
    builder.case("h2", "h1", 1);
    builder.entry("entry").exit("x");
    builder.build().unwrap()
}

fn loop_two_exits() -> Scfg {
    let mut builder = Scfg::builder();
    builder
        .block("entry")
        .block("head")
        .block("body")
        .block("x1")
        .block("x2");
    builder.unconditional("entry", "head");
    builder.case("head", "x1", 0);
    builder.case("head", "body", 1);
    builder.case("body", "x2", 0);
    builder.case("body", "head", 1);
    builder.entry("entry").exit("x1").exit("x2");
    builder.build().unwrap()
}

fn nested_diamond_in_loop() -> Scfg {
    let mut builder = Scfg::builder();
    builder
        .block("entry")
        .block("h")
        .block("a")
        .block("b")
        .block("c")
        .block("m")
        .block("x");
    builder.unconditional("entry", "h");
    builder.case("h", "x", 0);
    builder.case("h", "a", 1);
    builder.case("a", "b", 0);
    builder.case("a", "c", 1);
    builder.unconditional("b", "m");
    builder.unconditional("c", "m");
    builder.unconditional("m", "h");
    builder.entry("entry").exit("x");
    builder.build().unwrap()
}

#[test]
fn diamond_traces() {
    let scfg = diamond();
    assert_equivalent(&scfg, &[0]);
    assert_equivalent(&scfg, &[1]);
}

#[test]
fn natural_loop_traces() {
    let scfg = natural_loop();
    // Zero, one and three iterations
    assert_equivalent(&scfg, &[0]);
    assert_equivalent(&scfg, &[1, 0]);
    assert_equivalent(&scfg, &[1, 1, 1, 0]);
}

#[test]
fn irreducible_loop_traces() {
    let scfg = irreducible_loop();
    // Enter at h1, leave immediately
    assert_equivalent(&scfg, &[0, 0]);
    // Enter at h2, bounce to h1 twice, then leave
    assert_equivalent(&scfg, &[1, 1, 1, 1, 0]);
    // Enter at h1, bounce h1 -> h2 -> h1, leave from h1
    assert_equivalent(&scfg, &[0, 1, 1, 0]);
}

#[test]
fn loop_two_exits_traces() {
    let scfg = loop_two_exits();
    // Leave from the header on the first test
    assert_equivalent(&scfg, &[0]);
    // One full iteration, then leave from the body
    assert_equivalent(&scfg, &[1, 0]);
    // Two iterations, leave from the header
    assert_equivalent(&scfg, &[1, 1, 1, 1, 0]);
}

#[test]
fn nested_diamond_in_loop_traces() {
    let scfg = nested_diamond_in_loop();
    // Two iterations taking different diamond sides, then exit
    assert_equivalent(&scfg, &[1, 0, 1, 1, 0]);
    // Straight exit
    assert_equivalent(&scfg, &[0]);
}

#[test]
fn multiple_back_edges_traces() {
    let mut builder = Scfg::builder();
    builder
        .block("entry")
        .block("head")
        .block("a")
        .block("b")
        .block("exit");
    builder.unconditional("entry", "head");
    builder.case("head", "exit", 0);
    builder.case("head", "a", 1);
    builder.case("head", "b", 2);
    builder.unconditional("a", "head");
    builder.unconditional("b", "head");
    builder.entry("entry").exit("exit");
    let scfg = builder.build().unwrap();

    assert_equivalent(&scfg, &[1, 2, 1, 0]);
    assert_equivalent(&scfg, &[2, 0]);
    assert_equivalent(&scfg, &[0]);
}

#[test]
fn divergent_returns_traces() {
    let mut builder = Scfg::builder();
    builder.block("entry").block("a").block("b").block("r1").block("r2");
    builder.case("entry", "a", 0);
    builder.case("entry", "b", 1);
    builder.unconditional("a", "r1");
    builder.unconditional("b", "r2");
    builder.entry("entry").exit("r1").exit("r2");
    let scfg = builder.build().unwrap();

    assert_equivalent(&scfg, &[0]);
    assert_equivalent(&scfg, &[1]);
}

#[test]
fn mixed_merge_synthesis_traces() {
    let mut builder = Scfg::builder();
    builder
        .block("entry")
        .block("a")
        .block("b")
        .block("c")
        .block("j")
        .block("r1")
        .block("r2");
    builder.case("entry", "a", 0);
    builder.case("entry", "b", 1);
    builder.case("entry", "c", 2);
    builder.unconditional("a", "r1");
    builder.unconditional("b", "j");
    builder.unconditional("c", "j");
    builder.unconditional("j", "r2");
    builder.entry("entry").exit("r1").exit("r2");
    let scfg = builder.build().unwrap();

    assert_equivalent(&scfg, &[0]);
    assert_equivalent(&scfg, &[1]);
    assert_equivalent(&scfg, &[2]);
}

#[test]
fn branch_inside_arm_with_shared_merge_traces() {
    // The inner branch at `a` rejoins only at the outer merge `m`: its
    // choice must survive restructuring even though the arm is extracted
    // around the merge.
    let mut builder = Scfg::builder();
    builder
        .block("entry")
        .block("a")
        .block("p")
        .block("q")
        .block("d")
        .block("m");
    builder.case("entry", "a", 0);
    builder.case("entry", "d", 1);
    builder.case("a", "p", 0);
    builder.case("a", "q", 1);
    builder.unconditional("p", "m");
    builder.unconditional("q", "m");
    builder.unconditional("d", "m");
    builder.entry("entry").exit("m");
    let scfg = builder.build().unwrap();

    assert_equivalent(&scfg, &[0, 0]);
    assert_equivalent(&scfg, &[0, 1]);
    assert_equivalent(&scfg, &[1]);
}

#[test]
fn arm_node_choosing_between_arm_and_merge_traces() {
    // `x` decides between staying in its arm (y) and falling straight to
    // the merge; the choice is kept behind a synthetic jump stub.
    let mut builder = Scfg::builder();
    builder
        .block("entry")
        .block("x")
        .block("y")
        .block("d")
        .block("m");
    builder.case("entry", "x", 0);
    builder.case("entry", "d", 1);
    builder.case("x", "y", 0);
    builder.case("x", "m", 1);
    builder.unconditional("y", "m");
    builder.unconditional("d", "m");
    builder.entry("entry").exit("m");
    let scfg = builder.build().unwrap();

    assert_equivalent(&scfg, &[0, 0]);
    assert_equivalent(&scfg, &[0, 1]);
    assert_equivalent(&scfg, &[1]);
}

#[test]
fn nested_loops_traces() {
    // outer: oh -> inner loop | exit; inner: ih -> body | back-to-outer
    let mut builder = Scfg::builder();
    builder
        .block("entry")
        .block("oh")
        .block("ih")
        .block("ib")
        .block("exit");
    builder.unconditional("entry", "oh");
    builder.case("oh", "exit", 0);
    builder.case("oh", "ih", 1);
    builder.case("ih", "oh", 0);
    builder.case("ih", "ib", 1);
    builder.unconditional("ib", "ih");
    builder.entry("entry").exit("exit");
    let scfg = builder.build().unwrap();

    // Inner iterates twice, outer twice
    assert_equivalent(&scfg, &[1, 1, 1, 0, 1, 0, 0]);
    assert_equivalent(&scfg, &[1, 0, 0]);
    assert_equivalent(&scfg, &[0]);
}

#[test]
fn self_loop_traces() {
    let mut builder = Scfg::builder();
    builder.block("entry").block("s").block("exit");
    builder.unconditional("entry", "s");
    builder.case("s", "exit", 0);
    builder.case("s", "s", 1);
    builder.entry("entry").exit("exit");
    let scfg = builder.build().unwrap();

    assert_equivalent(&scfg, &[0]);
    assert_equivalent(&scfg, &[1, 1, 0]);
}
