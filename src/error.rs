use thiserror::Error;

use crate::scfg::Label;

macro_rules! malformed_graph {
    // Single string version
    ($msg:expr) => {
        crate::Error::MalformedGraph {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::MalformedGraph {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type covering all failures this library can return.
///
/// The taxonomy is deliberately small. Bad input is rejected up front and
/// never recovered; algorithmic defects discovered mid-transformation are
/// fatal and carry the offending block set for diagnosis. A transformation
/// is all-or-nothing: either a complete region tree is returned or one of
/// these errors is, with no partial output observable.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::MalformedGraph`] - The SCFG handed to the builder violates a
///   structural requirement (missing entry, unknown label, terminal
///   non-exit block, unreachable block, conflicting discriminants)
///
/// ## Transformation Errors
/// - [`Error::InternalInvariant`] - A pass failed to reduce the graph the
///   way the algorithm guarantees; retrying cannot help
/// - [`Error::NonConvergence`] - The driver ran out of rounds without the
///   block count decreasing, which signals a modeling bug in the input
///   (e.g. a cycle through a declared exit)
///
/// ## Infrastructure Errors
/// - [`Error::Graph`] - Low-level arena misuse (an edge referencing a node
///   that does not exist)
///
/// # Examples
///
/// ```rust
/// use regionize::{Error, ScfgBuilder};
///
/// let result = ScfgBuilder::new().build();
/// match result {
///     Err(Error::MalformedGraph { message, .. }) => {
///         eprintln!("rejected: {}", message);
///     }
///     Err(e) => eprintln!("other error: {}", e),
///     Ok(_) => unreachable!("an empty builder has no entry"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input graph is not a valid SCFG.
    ///
    /// Raised while admitting a graph, before any restructuring starts.
    /// The error includes the source location where the violation was
    /// detected for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the structural violation
    /// * `file` - Source file in which the violation was detected
    /// * `line` - Source line in which the violation was detected
    #[error("Malformed graph - {file}:{line}: {message}")]
    MalformedGraph {
        /// The message to be printed for the malformed input
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A restructuring pass violated one of its own guarantees.
    ///
    /// This indicates a defect in the transformation itself, not in the
    /// input: a pass that must strictly shrink the graph did not, or a
    /// computed partition did not cover the view. The offending blocks are
    /// attached so the failing subgraph can be reproduced.
    #[error("Internal invariant violated: {message} (blocks: {blocks:?})")]
    InternalInvariant {
        /// What the pass expected and did not find
        message: String,
        /// Labels of the blocks involved in the violation
        blocks: Vec<Label>,
    },

    /// The driver exhausted its round budget without the graph shrinking.
    ///
    /// The usual cause is a cycle through a declared exit block, which no
    /// loop fold can legally consume. Never retried: the same input will
    /// stall the same way.
    #[error("Restructuring did not converge after {rounds} rounds (blocked on: {blocks:?})")]
    NonConvergence {
        /// Number of rounds that ran without progress
        rounds: usize,
        /// Labels of the blocks in the irreducible remainder
        blocks: Vec<Label>,
    },

    /// Low-level graph arena error.
    ///
    /// Raised when an edge is added between node identifiers that are not
    /// part of the arena. Reaching this from the public API is a bug.
    #[error("{0}")]
    Graph(String),
}
