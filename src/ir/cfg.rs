//! The control-flow graph (Â§3.10). Built once by the front-end and exposed
//! read-only; blocks reference each other only through [`BlockId`] indices
//! into the [`Cfg`]'s arena, never through owning references, per the
//! "cyclic AR graph references" redesign note.

use im::{
    OrdSet,
    Vector,
};

use crate::ir::instruction::Instruction;

/// An index into a [`Cfg`]'s block arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

/// `(block, instruction index within it)`, a stable handle to one
/// instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstId(pub BlockId, pub usize);

/// The kind of edge leaving an `Invoke`-style instruction (Â§3.10: "invoke
/// instructions carry two kinds of edges").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// The call returned normally.
    Normal,
    /// The call's exception edge.
    Exception,
}

/// A single basic block: an ordered instruction list plus its outgoing
/// edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    instructions: Vector<Instruction>,
    successors: Vector<(BlockId, EdgeKind)>,
}

impl Block {
    /// A block with no instructions or successors yet.
    pub fn new() -> Self {
        Self {
            instructions: Vector::new(),
            successors: Vector::new(),
        }
    }

    /// Append an instruction, returning the updated block.
    pub fn with_instruction(mut self, inst: Instruction) -> Self {
        self.instructions.push_back(inst);
        self
    }

    /// Add a successor edge, returning the updated block.
    pub fn with_successor(mut self, target: BlockId, kind: EdgeKind) -> Self {
        self.successors.push_back((target, kind));
        self
    }

    /// The instructions in execution order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    /// The number of instructions in this block.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// `true` if this block has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instruction at `idx`, if in range.
    pub fn instruction(&self, idx: usize) -> Option<&Instruction> {
        self.instructions.get(idx)
    }

    /// Successor edges leaving this block.
    pub fn successors(&self) -> impl Iterator<Item = (BlockId, EdgeKind)> + '_ {
        self.successors.iter().copied()
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::new()
    }
}

/// A function's control-flow graph: an arena of [`Block`]s addressed by
/// [`BlockId`], with designated entry/exit/unreachable/exception-resume
/// blocks (Â§3.10).
#[derive(Debug, Clone, PartialEq)]
pub struct Cfg {
    blocks: Vector<Block>,
    entry: BlockId,
    exit: Option<BlockId>,
    unreachable: Option<BlockId>,
    exception_resume: Option<BlockId>,
}

impl Cfg {
    /// Start building a CFG whose entry block is the first one added.
    pub fn builder() -> CfgBuilder {
        CfgBuilder::new()
    }

    /// The designated entry block.
    pub fn entry(&self) -> BlockId {
        self.entry
    }

    /// The designated single-exit block, if any.
    pub fn exit(&self) -> Option<BlockId> {
        self.exit
    }

    /// The dedicated "unreachable" block, if any.
    pub fn unreachable_block(&self) -> Option<BlockId> {
        self.unreachable
    }

    /// The dedicated "exception-resume" block, if any.
    pub fn exception_resume_block(&self) -> Option<BlockId> {
        self.exception_resume
    }

    /// Look up a block by id.
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    /// All block ids, in arena order (not necessarily a traversal order).
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> {
        (0..self.blocks.len() as u32).map(BlockId)
    }

    /// The predecessors of `id`, computed on demand (the arena stores only
    /// forward edges; `fixpoint::wto` and the driver need the reverse
    /// relation too).
    pub fn predecessors(&self, id: BlockId) -> OrdSet<BlockId> {
        let mut preds = OrdSet::new();
        for (from, block) in self.blocks.iter().enumerate() {
            if block.successors().any(|(to, _)| to == id) {
                preds.insert(BlockId(from as u32));
            }
        }
        preds
    }

    /// Number of blocks in the arena.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
}

/// Incrementally assembles a [`Cfg`]. Blocks are added in order; the first
/// one added becomes the entry block unless `entry` is called explicitly
/// afterwards.
#[derive(Debug, Default)]
pub struct CfgBuilder {
    blocks: Vector<Block>,
    entry: Option<BlockId>,
    exit: Option<BlockId>,
    unreachable: Option<BlockId>,
    exception_resume: Option<BlockId>,
}

impl CfgBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block, returning its freshly assigned id.
    pub fn push_block(&mut self, block: Block) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push_back(block);
        if self.entry.is_none() {
            self.entry = Some(id);
        }
        id
    }

    /// Override which block is the entry.
    pub fn set_entry(&mut self, id: BlockId) -> &mut Self {
        self.entry = Some(id);
        self
    }

    /// Designate the single-exit block.
    pub fn set_exit(&mut self, id: BlockId) -> &mut Self {
        self.exit = Some(id);
        self
    }

    /// Designate the "unreachable" block.
    pub fn set_unreachable(&mut self, id: BlockId) -> &mut Self {
        self.unreachable = Some(id);
        self
    }

    /// Designate the "exception-resume" block.
    pub fn set_exception_resume(&mut self, id: BlockId) -> &mut Self {
        self.exception_resume = Some(id);
        self
    }

    /// Finish building. Panics if no block was ever pushed (a CFG must have
    /// an entry); this is an engine/front-end contract violation, not a
    /// recoverable analysis outcome.
    pub fn build(self) -> Cfg {
        let entry = self.entry.expect("a CFG must have at least one block");
        Cfg {
            blocks: self.blocks,
            entry,
            exit: self.exit,
            unreachable: self.unreachable,
            exception_resume: self.exception_resume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_block_cfg_has_itself_as_entry() {
        let mut b = Cfg::builder();
        let blk = b.push_block(Block::new());
        let cfg = b.build();
        assert_eq!(cfg.entry(), blk);
        assert_eq!(cfg.block_count(), 1);
    }

    #[test]
    fn predecessors_reflect_successor_edges() {
        let mut b = Cfg::builder();
        let bb1 = BlockId(1);
        b.push_block(Block::new().with_successor(bb1, EdgeKind::Normal));
        b.push_block(Block::new());
        let cfg = b.build();
        let preds = cfg.predecessors(bb1);
        assert!(preds.contains(&BlockId(0)));
    }
}
