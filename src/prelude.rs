//! # regionize Prelude
//!
//! A convenient prelude for the most commonly used types of the library.
//! Import it to build an SCFG, restructure it and walk the resulting
//! tree without spelling out module paths.
//!
//! # Example
//!
//! ```rust
//! use regionize::prelude::*;
//!
//! let mut builder = Scfg::builder();
//! builder.block("a").block("b");
//! builder.unconditional("a", "b");
//! builder.entry("a").exit("b");
//!
//! let tree = restructure(&builder.build()?)?;
//! assert!(matches!(tree.root(), Region::Linear(_)));
//! # Ok::<(), regionize::Error>(())
//! ```

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all regionize operations
pub use crate::Error;

/// The result type used throughout regionize
pub use crate::Result;

// ================================================================================================
// Input Boundary
// ================================================================================================

/// The validated input graph and its builder
pub use crate::scfg::{Block, EdgeKind, Label, Scfg, ScfgBuilder};

// ================================================================================================
// The Engine
// ================================================================================================

/// The restructuring entry point
pub use crate::restructure::restructure;

/// Control-variable identifiers and the allocation table
pub use crate::restructure::{ControlVariable, VariableInfo, VariableRole, VariableTable};

// ================================================================================================
// Output Boundary
// ================================================================================================

/// The region tree and its node types
pub use crate::region::{
    BlockId, BlockInfo, BlockKind, BranchArm, BranchRegion, LoopExit, LoopRegion, Region,
    RegionId, RegionTree,
};

/// Visitor-style traversal
pub use crate::region::{walk, RegionVisitor};
