//! Weak topological order (Â§4.10 point 1): Bourdoncle's algorithm for
//! nesting a CFG's strongly connected components so the driver can iterate
//! each loop to a local fixpoint before leaving it.

use alloc::{
    collections::BTreeMap,
    vec::Vec,
};

use crate::ir::cfg::{
    BlockId,
    Cfg,
};

/// One element of a [`Wto`]: a single block, or a loop headed by a block
/// with its own nested order for the loop body.
#[derive(Debug, Clone, PartialEq)]
pub enum WtoComponent {
    /// An acyclic block, visited once per enclosing iteration.
    Vertex(BlockId),
    /// A (possibly nested) strongly connected component. `head` is visited
    /// first on every iteration; widening is applied there once the driver
    /// stops treating new iterations as a plain join.
    Component {
        /// The component's head, a widening point.
        head: BlockId,
        /// The order to iterate the rest of the component in.
        body: Wto,
    },
}

impl WtoComponent {
    /// The block this element begins with.
    pub fn head(&self) -> BlockId {
        match self {
            Self::Vertex(b) => *b,
            Self::Component { head, .. } => *head,
        }
    }
}

/// A weak topological order: the top-level sequence of components to visit,
/// reachable from a CFG's entry block.
pub type Wto = Vec<WtoComponent>;

const INFINITY: u32 = u32::MAX;

struct Builder<'a> {
    cfg: &'a Cfg,
    dfn: BTreeMap<BlockId, u32>,
    stack: Vec<BlockId>,
    num: u32,
}

impl<'a> Builder<'a> {
    fn new(cfg: &'a Cfg) -> Self {
        Self {
            cfg,
            dfn: BTreeMap::new(),
            stack: Vec::new(),
            num: 0,
        }
    }

    fn dfn_of(&self, b: BlockId) -> u32 {
        self.dfn.get(&b).copied().unwrap_or(0)
    }

    /// Bourdoncle's `visit`: a depth-first walk that discovers strongly
    /// connected components by their lowest reachable `dfn`, returning that
    /// low-link so the caller can tell whether `v` heads one.
    fn visit(&mut self, v: BlockId, partition: &mut Wto) -> u32 {
        self.stack.push(v);
        self.num += 1;
        self.dfn.insert(v, self.num);
        let mut head = self.num;
        let mut loop_flag = false;
        let successors: Vec<BlockId> = self.cfg.block(v).successors().map(|(to, _)| to).collect();
        for succ in successors {
            let succ_dfn = self.dfn_of(succ);
            let min = if succ_dfn == 0 {
                self.visit(succ, partition)
            } else {
                succ_dfn
            };
            if min < head {
                head = min;
                loop_flag = true;
            }
        }
        if head == self.dfn_of(v) {
            self.dfn.insert(v, INFINITY);
            let mut element = self.stack.pop().expect("v must still be on the stack");
            if loop_flag {
                while element != v {
                    self.dfn.insert(element, 0);
                    element = self.stack.pop().expect("component members must be on the stack");
                }
                self.component(v, partition);
            } else {
                partition.push(WtoComponent::Vertex(v));
            }
        }
        head
    }

    /// Builds the nested order for the loop headed by `v`: every
    /// not-yet-visited successor reachable from `v` without leaving the
    /// component.
    fn component(&mut self, v: BlockId, partition: &mut Wto) {
        let mut body = Vec::new();
        let successors: Vec<BlockId> = self.cfg.block(v).successors().map(|(to, _)| to).collect();
        for succ in successors {
            if self.dfn_of(succ) == 0 {
                self.visit(succ, &mut body);
            }
        }
        partition.push(WtoComponent::Component { head: v, body });
    }
}

/// Compute the weak topological order of `cfg`, rooted at its entry block.
/// Blocks unreachable from the entry never appear; the driver leaves their
/// invariant at bottom.
pub fn compute(cfg: &Cfg) -> Wto {
    let mut builder = Builder::new(cfg);
    let mut top = Vec::new();
    builder.visit(cfg.entry(), &mut top);
    top
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::cfg::{
        Block,
        EdgeKind,
    };

    #[test]
    fn straight_line_cfg_is_all_vertices() {
        let mut b = Cfg::builder();
        let b0 = b.push_block(Block::new().with_successor(BlockId(1), EdgeKind::Normal));
        let b1 = b.push_block(Block::new());
        let cfg = b.build();
        let wto = compute(&cfg);
        assert_eq!(wto, vec![WtoComponent::Vertex(b0), WtoComponent::Vertex(b1)]);
    }

    #[test]
    fn back_edge_forms_a_component_headed_by_the_loop_header() {
        let mut b = Cfg::builder();
        // 0 -> 1 -> 2 (back to 1), 1 -> 3 (exit)
        b.push_block(
            Block::new().with_successor(BlockId(1), EdgeKind::Normal),
        );
        b.push_block(
            Block::new()
                .with_successor(BlockId(2), EdgeKind::Normal)
                .with_successor(BlockId(3), EdgeKind::Normal),
        );
        b.push_block(Block::new().with_successor(BlockId(1), EdgeKind::Normal));
        b.push_block(Block::new());
        let cfg = b.build();
        let wto = compute(&cfg);
        assert_eq!(wto.len(), 3);
        assert_eq!(wto[0], WtoComponent::Vertex(BlockId(0)));
        match &wto[1] {
            WtoComponent::Component { head, body } => {
                assert_eq!(*head, BlockId(1));
                assert_eq!(body, &vec![WtoComponent::Vertex(BlockId(2))]);
            }
            other => panic!("expected a loop component, got {other:?}"),
        }
        assert_eq!(wto[2], WtoComponent::Vertex(BlockId(3)));
    }

    #[test]
    fn unreachable_block_is_absent_from_the_order() {
        let mut b = Cfg::builder();
        b.push_block(Block::new());
        b.push_block(Block::new());
        let cfg = b.build();
        let wto = compute(&cfg);
        assert_eq!(wto, vec![WtoComponent::Vertex(BlockId(0))]);
    }
}
