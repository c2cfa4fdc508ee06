//! Visitor-style traversal over region trees.
//!
//! Exhaustive pattern matching over [`Region`] is the primary consumption
//! model; the visitor is for passes that only care about a couple of node
//! kinds and want the recursion handled for them.

use crate::region::{BlockId, BranchRegion, LoopRegion, Region};

/// Callbacks invoked by [`walk`].
///
/// All methods default to doing nothing, so implementors override only
/// what they need. Composite regions get an `enter_*` before their
/// children and a `leave_*` after.
pub trait RegionVisitor {
    /// Called for every leaf block.
    fn visit_block(&mut self, _block: BlockId) {}

    /// Called before the children of a linear sequence.
    fn enter_linear(&mut self, _children: &[Region]) {}

    /// Called after the children of a linear sequence.
    fn leave_linear(&mut self, _children: &[Region]) {}

    /// Called before head, arms and tail of a branch.
    fn enter_branch(&mut self, _branch: &BranchRegion) {}

    /// Called after head, arms and tail of a branch.
    fn leave_branch(&mut self, _branch: &BranchRegion) {}

    /// Called before the body of a loop.
    fn enter_loop(&mut self, _region: &LoopRegion) {}

    /// Called after the body of a loop.
    fn leave_loop(&mut self, _region: &LoopRegion) {}
}

/// Walks a region tree depth-first in execution order, invoking the
/// visitor's callbacks.
///
/// Branch children are visited head first, then arms in discriminant
/// order, then the tail.
pub fn walk<V: RegionVisitor>(region: &Region, visitor: &mut V) {
    match region {
        Region::Block(id) => visitor.visit_block(*id),
        Region::Linear(children) => {
            visitor.enter_linear(children);
            for child in children {
                walk(child, visitor);
            }
            visitor.leave_linear(children);
        }
        Region::Branch(branch) => {
            visitor.enter_branch(branch);
            walk(&branch.head, visitor);
            for arm in &branch.arms {
                walk(&arm.body, visitor);
            }
            if let Some(tail) = &branch.tail {
                walk(tail, visitor);
            }
            visitor.leave_branch(branch);
        }
        Region::Loop(looped) => {
            visitor.enter_loop(looped);
            walk(&looped.body, visitor);
            visitor.leave_loop(looped);
        }
    }
}
