// Copyright 2025 The regionize developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

//! # regionize
//!
//! [![Crates.io](https://img.shields.io/crates/v/regionize.svg)](https://crates.io/crates/regionize)
//! [![Documentation](https://docs.rs/regionize/badge.svg)](https://docs.rs/regionize)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/regionize/regionize/blob/main/LICENSE)
//!
//! A control-flow restructuring engine: `regionize` folds an arbitrary,
//! possibly irreducible, possibly multi-exit control-flow graph into a
//! strictly nested tree of single-entry/single-exit regions, the backbone
//! shape that value/state dependence graph construction and other
//! structured compiler stages want to consume.
//!
//! ## Features
//!
//! - **Arbitrary input graphs** - Natural loops, irreducible tangles,
//!   multi-way dispatches, divergent exits; anything a front-end extracts
//! - **Synthetic control variables** - Integer-valued variables and
//!   block-local assignments are introduced exactly where natural
//!   structure is insufficient, and reported in an allocation table
//! - **Deterministic** - The same input (including edge ordering) always
//!   produces a structurally identical tree, variable identifiers
//!   included
//! - **All-or-nothing** - A run either returns a complete tree or an
//!   error; no partial output is ever observable
//! - **Pure and synchronous** - No shared state; restructure graphs from
//!   as many threads as you like, one graph per call
//!
//! ## Quick Start
//!
//! ```rust
//! use regionize::{restructure, Region, Scfg};
//!
//! // while-style loop: entry -> head; head -> body | exit; body -> head
//! let mut builder = Scfg::builder();
//! builder.block("entry").block("head").block("body").block("exit");
//! builder.unconditional("entry", "head");
//! builder.case("head", "exit", 0);
//! builder.case("head", "body", 1);
//! builder.unconditional("body", "head");
//! builder.entry("entry").exit("exit");
//!
//! let tree = restructure(&builder.build()?)?;
//!
//! // Every input block is a leaf of the tree, exactly once
//! assert_eq!(tree.source_labels().count(), 4);
//! println!("{}", tree.dump());
//! # Ok::<(), regionize::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `regionize` is organized into a few key modules:
//!
//! - [`scfg`] - The input boundary: labelled blocks, discriminant-tagged
//!   edges, one entry, declared exits, full admission validation
//! - [`restructure`] - The engine: a loop pass folding strongly connected
//!   components, a branch pass folding conditionals around their merge
//!   points, and the control-variable allocator
//! - [`region`] - The output: the [`Region`] tree, its block table and
//!   the visitor
//! - [`utils`] - The generic directed-graph arena and algorithms
//!   (Tarjan SCC, Lengauer-Tarjan dominators, traversals) everything
//!   above runs on
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! All operations return [`Result`]. Bad input is rejected up front as
//! [`Error::MalformedGraph`]; a graph that cannot be reduced (the
//! canonical case: a cycle through a declared exit) fails as
//! [`Error::NonConvergence`] with the offending blocks attached.
//!
//! ```rust
//! use regionize::{Error, Scfg};
//!
//! let mut builder = Scfg::builder();
//! builder.block("a").entry("a");
//! // "a" has no outgoing edges but was never declared an exit
//! match builder.build() {
//!     Err(Error::MalformedGraph { message, .. }) => println!("rejected: {message}"),
//!     other => panic!("expected rejection, got {other:?}"),
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` - `Serialize`/`Deserialize` on the input-boundary types
//!   ([`Label`], [`EdgeKind`]) and the small output enums, for shipping
//!   SCFGs across process boundaries

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types.
pub mod prelude;

pub mod region;
pub mod restructure;
pub mod scfg;
pub mod utils;

/// The result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

pub use error::Error;
pub use region::{Region, RegionTree};
pub use restructure::restructure;
pub use scfg::{EdgeKind, Label, Scfg, ScfgBuilder};
