//! The restructuring engine.
//!
//! [`restructure`] is the single entry point: one immutable [`Scfg`] in,
//! one [`RegionTree`] out, in a single synchronous call with no
//! observable intermediate state. The transformation is pure and
//! deterministic (the same input graph, including edge ordering, always
//! produces a structurally identical tree, control-variable identifiers
//! included) and all-or-nothing: any failure leaves no partial output.
//!
//! # Pipeline
//!
//! The driver runs the loop pass until the working view is acyclic, then
//! the branch pass folds the rest. Both passes recurse into the subgraphs
//! they carve out (loop interiors, branch arms), so regions nest
//! correctly by construction. Synthetic control variables come from a
//! scope-stack allocator and are reported in the tree's
//! [`VariableTable`].
//!
//! # Concurrency
//!
//! There is nothing to share: restructuring several SCFGs concurrently
//! just means calling [`restructure`] from several threads, each with
//! its own graph.

pub(crate) mod builder;
mod branches;
mod control;
mod loops;

pub use control::{ControlVariable, VariableInfo, VariableRole, VariableTable};

use log::debug;

use crate::{region::RegionTree, scfg::Scfg, Result};

/// Restructures an SCFG into a region tree.
///
/// Every block of the input appears in the tree exactly once; synthetic
/// dispatch, assignment and jump blocks are added where natural structure
/// is insufficient (irreducible entries, multiple exit targets, divergent
/// merges).
///
/// # Arguments
///
/// * `scfg` - The validated input graph
///
/// # Returns
///
/// The complete [`RegionTree`].
///
/// # Errors
///
/// - [`Error::NonConvergence`](crate::Error::NonConvergence) if the graph
///   cannot be reduced; the canonical cause is a cycle through a
///   declared exit block
/// - [`Error::InternalInvariant`](crate::Error::InternalInvariant) if a
///   pass breaks one of its own guarantees; this is a bug in the engine,
///   not in the input
///
/// # Examples
///
/// ```rust
/// use regionize::{restructure, Region, Scfg};
///
/// // entry -> a | b -> join (a diamond)
/// let mut builder = Scfg::builder();
/// builder.block("entry").block("a").block("b").block("join");
/// builder.case("entry", "a", 0);
/// builder.case("entry", "b", 1);
/// builder.unconditional("a", "join");
/// builder.unconditional("b", "join");
/// builder.entry("entry").exit("join");
///
/// let tree = restructure(&builder.build()?)?;
/// assert!(matches!(tree.root(), Region::Branch(_)));
/// # Ok::<(), regionize::Error>(())
/// ```
pub fn restructure(scfg: &Scfg) -> Result<RegionTree> {
    debug!("restructuring SCFG with {} blocks", scfg.block_count());
    let mut builder = builder::RegionBuilder::new(scfg);
    let view = builder.initial_view();
    let root = builder.build(view)?;
    builder.finish(root)
}
