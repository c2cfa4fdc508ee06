//! The finished region tree.

use std::fmt::Write;

use crate::{
    region::{BlockId, BlockInfo, Region},
    restructure::VariableTable,
    scfg::Label,
};

/// The complete result of a restructuring run.
///
/// Owns the block table (input blocks plus the synthetic blocks the
/// engine introduced), the root [`Region`] covering all of them, and the
/// control-variable allocation table. Read-only: the tree is the final
/// artifact and is never patched after construction.
///
/// # Examples
///
/// ```rust
/// use regionize::{restructure, Scfg};
///
/// let mut builder = Scfg::builder();
/// builder.block("a").block("b");
/// builder.unconditional("a", "b");
/// builder.entry("a").exit("b");
/// let scfg = builder.build()?;
///
/// let tree = restructure(&scfg)?;
/// let labels: Vec<String> = tree.source_labels().map(ToString::to_string).collect();
/// assert_eq!(labels, vec!["a", "b"]);
/// # Ok::<(), regionize::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionTree {
    /// All blocks: sources first, synthetics appended.
    blocks: Vec<BlockInfo>,
    /// The single region covering the entry and all exits.
    root: Region,
    /// Every control-variable allocation, keyed by region.
    variables: VariableTable,
}

impl RegionTree {
    pub(crate) fn new(blocks: Vec<BlockInfo>, root: Region, variables: VariableTable) -> Self {
        RegionTree {
            blocks,
            root,
            variables,
        }
    }

    /// Returns the root region.
    #[must_use]
    pub fn root(&self) -> &Region {
        &self.root
    }

    /// Returns the block table entry for an id.
    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&BlockInfo> {
        self.blocks.get(id.index())
    }

    /// Returns the label of a block.
    #[must_use]
    pub fn label(&self, id: BlockId) -> Option<&Label> {
        self.block(id).map(BlockInfo::label)
    }

    /// Returns the total number of blocks, synthetic ones included.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns an iterator over the whole block table.
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &BlockInfo)> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, info)| (BlockId(i), info))
    }

    /// Returns the ids of the input-graph blocks in the tree, in
    /// execution order.
    ///
    /// Every input block appears exactly once; synthetic blocks are
    /// skipped. This is the coverage surface: collected labels equal the
    /// input label set.
    pub fn source_blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.root
            .blocks()
            .filter(|&id| self.blocks[id.index()].is_source())
    }

    /// Returns the labels of the input-graph blocks, in execution order.
    pub fn source_labels(&self) -> impl Iterator<Item = &Label> + '_ {
        self.source_blocks().map(|id| self.blocks[id.index()].label())
    }

    /// Returns the control-variable allocation table.
    #[must_use]
    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// Renders the tree as indented text, one node per line.
    ///
    /// Intended for logs and test diagnostics, not for machine
    /// consumption.
    #[must_use]
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_region(&self.root, 0, &mut out);
        out
    }

    fn dump_region(&self, region: &Region, depth: usize, out: &mut String) {
        let pad = "  ".repeat(depth);
        match region {
            Region::Block(id) => {
                let info = &self.blocks[id.index()];
                let kind: &'static str = (*info.kind()).into();
                let _ = writeln!(out, "{pad}block {} [{kind}]", info.label());
            }
            Region::Linear(children) => {
                let _ = writeln!(out, "{pad}linear");
                for child in children {
                    self.dump_region(child, depth + 1, out);
                }
            }
            Region::Branch(branch) => {
                let _ = writeln!(out, "{pad}branch {}", branch.id);
                self.dump_region(&branch.head, depth + 1, out);
                for arm in &branch.arms {
                    let _ = writeln!(out, "{pad}  arm {}", arm.value);
                    self.dump_region(&arm.body, depth + 2, out);
                }
                if let Some(tail) = &branch.tail {
                    let _ = writeln!(out, "{pad}  tail");
                    self.dump_region(tail, depth + 2, out);
                }
            }
            Region::Loop(looped) => {
                let _ = writeln!(
                    out,
                    "{pad}loop {} header={}",
                    looped.id,
                    self.blocks[looped.header.index()].label()
                );
                self.dump_region(&looped.body, depth + 1, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::BlockKind;
    use crate::restructure::VariableTable;

    fn leaf_tree() -> RegionTree {
        RegionTree::new(
            vec![BlockInfo::new("only".into(), BlockKind::Source)],
            Region::Block(BlockId(0)),
            VariableTable::default(),
        )
    }

    #[test]
    fn test_tree_block_lookup() {
        let tree = leaf_tree();
        assert_eq!(tree.block_count(), 1);
        assert_eq!(tree.label(BlockId(0)), Some(&"only".into()));
        assert_eq!(tree.block(BlockId(9)), None);
    }

    #[test]
    fn test_source_blocks_skip_synthetics() {
        let tree = RegionTree::new(
            vec![
                BlockInfo::new("a".into(), BlockKind::Source),
                BlockInfo::new("%j0".into(), BlockKind::Jump),
            ],
            Region::Linear(vec![Region::Block(BlockId(0)), Region::Block(BlockId(1))]),
            VariableTable::default(),
        );

        let sources: Vec<BlockId> = tree.source_blocks().collect();
        assert_eq!(sources, vec![BlockId(0)]);
    }

    #[test]
    fn test_dump_mentions_blocks() {
        let tree = leaf_tree();
        let dump = tree.dump();
        assert!(dump.contains("block only [Source]"));
    }
}
