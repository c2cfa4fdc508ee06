//! The Block Graph Model: SCFG construction and queries.
//!
//! An SCFG is the serializable shape the engine accepts from any
//! front-end: a set of labelled blocks, ordered discriminant-tagged edges,
//! one entry label and a set of exit labels. How the graph was derived
//! (bytecode decoding, AST lowering, anything else) is irrelevant here.
//!
//! # Key Components
//!
//! - [`Label`] - Opaque block identity
//! - [`Block`] - A block of the input graph
//! - [`EdgeKind`] - Unconditional transfer or a `Case` discriminant
//! - [`Scfg`] / [`ScfgBuilder`] - The validated, immutable graph and its
//!   incremental builder
//!
//! # Lifecycle
//!
//! An `Scfg` is built once and then only read. Restructuring never
//! mutates it: blocks are re-parented into regions by constructing new
//! tree nodes that reference block identity, so the input stays available
//! for diagnostics and for re-running the engine (which must produce a
//! structurally identical tree; determinism is part of the contract).

mod block;
mod edge;
mod graph;

pub use block::{Block, Label};
pub use edge::EdgeKind;
pub use graph::{Scfg, ScfgBuilder};
