//! Block identity for the SCFG.

use std::fmt;

/// The label identifying a block in an SCFG.
///
/// Labels are whatever the front-end produced them as: bytecode offsets,
/// AST node names, numbered strings. The engine treats them as opaque
/// identity and only relies on equality, hashing and ordering (orderings
/// are the deterministic tie-break for header and exit selection).
///
/// Labels produced by the engine itself for synthetic blocks start with
/// `%`, but that is a convention, not a requirement on input labels.
///
/// # Examples
///
/// ```rust
/// use regionize::Label;
///
/// let a = Label::from("0");
/// let b = Label::from("1");
/// assert!(a < b);
/// assert_eq!(a.as_str(), "0");
/// ```
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Label(String);

impl Label {
    /// Creates a label from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Label(name.into())
    }

    /// Returns the label text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Label(name.to_string())
    }
}

impl From<String> for Label {
    fn from(name: String) -> Self {
        Label(name)
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({:?})", self.0)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A block of the input graph.
///
/// Blocks are opaque units of sequential code the engine never looks
/// inside, so the only attribute carried is the label. Everything
/// else about a block (its edges, exit status, region membership) lives
/// in the [`Scfg`](crate::Scfg) and, after restructuring, in the region
/// tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    label: Label,
}

impl Block {
    /// Creates a block with the given label.
    pub(crate) fn new(label: Label) -> Self {
        Block { label }
    }

    /// Returns the label of this block.
    #[must_use]
    pub fn label(&self) -> &Label {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_equality_and_order() {
        assert_eq!(Label::from("a"), Label::new("a"));
        assert!(Label::from("a") < Label::from("b"));
        assert!(Label::from("10") < Label::from("9")); // lexicographic
    }

    #[test]
    fn test_label_display() {
        assert_eq!(Label::from("head").to_string(), "head");
        assert_eq!(format!("{:?}", Label::from("head")), "Label(\"head\")");
    }

    #[test]
    fn test_block_label() {
        let block = Block::new(Label::from("entry"));
        assert_eq!(block.label(), &Label::from("entry"));
    }
}
