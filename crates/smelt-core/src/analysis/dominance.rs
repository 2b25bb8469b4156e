//! Dominance analysis: dominator tree and dominance frontiers, using
//! Cooper, Harvey and Kennedy's "A Simple, Fast Dominance Algorithm".

use std::collections::BTreeSet;

use crate::entity::EntityRef;
use crate::ir::BlockId;

use super::cfg::ControlFlowGraph;

fn idx(block: BlockId) -> usize {
    block.index() as usize
}

/// Dominator tree for a function.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// Immediate dominator per block. The entry points at itself;
    /// unreachable blocks hold `None`.
    idom: Vec<Option<BlockId>>,
    /// 1-based reverse post-order numbers; 0 marks unreachable blocks.
    rpo_number: Vec<u32>,
    /// Dominator-tree children per block, ordered by block index.
    children: Vec<Vec<BlockId>>,
    entry: BlockId,
}

impl DominatorTree {
    /// Compute the dominator tree from a CFG.
    pub fn compute(cfg: &ControlFlowGraph) -> Self {
        let num_blocks = cfg.num_blocks();
        let entry = cfg.entry();
        let rpo = cfg.reverse_post_order();

        let mut rpo_number = vec![0u32; num_blocks];
        for (i, &block) in rpo.iter().enumerate() {
            rpo_number[idx(block)] = (i + 1) as u32;
        }

        let mut idom: Vec<Option<BlockId>> = vec![None; num_blocks];
        idom[idx(entry)] = Some(entry);

        // Fixpoint over reverse post-order; converges quickly even for
        // irreducible graphs.
        let mut changed = true;
        while changed {
            changed = false;
            for &block in rpo.iter().skip(1) {
                let mut new_idom: Option<BlockId> = None;
                for &pred in cfg.predecessors(block) {
                    if idom[idx(pred)].is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => Self::intersect(pred, current, &idom, &rpo_number),
                    });
                }
                if new_idom.is_some() && idom[idx(block)] != new_idom {
                    idom[idx(block)] = new_idom;
                    changed = true;
                }
            }
        }

        let mut children: Vec<Vec<BlockId>> = vec![Vec::new(); num_blocks];
        for &block in &rpo {
            if block == entry {
                continue;
            }
            if let Some(parent) = idom[idx(block)] {
                children[idx(parent)].push(block);
            }
        }
        for list in &mut children {
            list.sort();
        }

        Self {
            idom,
            rpo_number,
            children,
            entry,
        }
    }

    /// Walk two blocks up the (partial) dominator tree to their common
    /// ancestor. Both must be reachable with idoms assigned.
    fn intersect(
        a: BlockId,
        b: BlockId,
        idom: &[Option<BlockId>],
        rpo_number: &[u32],
    ) -> BlockId {
        let mut finger1 = a;
        let mut finger2 = b;
        while finger1 != finger2 {
            while rpo_number[idx(finger1)] > rpo_number[idx(finger2)] {
                finger1 = idom[idx(finger1)].unwrap_or(finger2);
            }
            while rpo_number[idx(finger2)] > rpo_number[idx(finger1)] {
                finger2 = idom[idx(finger2)].unwrap_or(finger1);
            }
        }
        finger1
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.rpo_number[idx(block)] > 0
    }

    /// Immediate dominator of a block. `None` for the entry and for
    /// unreachable blocks.
    pub fn immediate_dominator(&self, block: BlockId) -> Option<BlockId> {
        if block == self.entry {
            return None;
        }
        self.idom[idx(block)]
    }

    /// Dominator-tree children of a block.
    pub fn children(&self, block: BlockId) -> &[BlockId] {
        &self.children[idx(block)]
    }

    /// Check whether `a` dominates `b`. A block dominates itself;
    /// unreachable blocks dominate nothing else and are dominated by
    /// nothing else.
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if a == b {
            return true;
        }
        if !self.is_reachable(a) || !self.is_reachable(b) {
            return false;
        }

        // Walk up from b; dominators always have smaller RPO numbers.
        let target = self.rpo_number[idx(a)];
        let mut current = b;
        while self.rpo_number[idx(current)] > target {
            match self.idom[idx(current)] {
                Some(parent) if parent != current => current = parent,
                _ => return false,
            }
        }
        current == a
    }
}

/// Dominance frontiers, plus the iterated frontier used to plan merge
/// points: the set of blocks where distinct definitions first converge.
#[derive(Debug, Clone)]
pub struct DominanceFrontier {
    frontiers: Vec<Vec<BlockId>>,
}

impl DominanceFrontier {
    /// Compute per-block dominance frontiers.
    ///
    /// For each join block (two or more predecessors), each predecessor
    /// and its dominators up to (excluding) the join's immediate
    /// dominator have the join in their frontier.
    pub fn compute(cfg: &ControlFlowGraph, domtree: &DominatorTree) -> Self {
        let mut frontiers: Vec<Vec<BlockId>> = vec![Vec::new(); cfg.num_blocks()];

        for block in cfg.reverse_post_order() {
            let preds = cfg.predecessors(block);
            if preds.len() < 2 {
                continue;
            }
            let Some(block_idom) = domtree.immediate_dominator(block) else {
                continue;
            };
            for &pred in preds {
                if !domtree.is_reachable(pred) {
                    continue;
                }
                let mut runner = pred;
                while runner != block_idom {
                    if !frontiers[idx(runner)].contains(&block) {
                        frontiers[idx(runner)].push(block);
                    }
                    match domtree.immediate_dominator(runner) {
                        Some(parent) => runner = parent,
                        None => break,
                    }
                }
            }
        }

        Self { frontiers }
    }

    pub fn frontier(&self, block: BlockId) -> &[BlockId] {
        &self.frontiers[idx(block)]
    }

    /// The iterated dominance frontier of a set of defining blocks: the
    /// transitive closure of "frontier of frontier", so that merges which
    /// themselves create new merge requirements are covered. Returned in
    /// block-index order.
    pub fn iterated_frontier(&self, defs: impl IntoIterator<Item = BlockId>) -> Vec<BlockId> {
        let mut result: BTreeSet<BlockId> = BTreeSet::new();
        let mut work: Vec<BlockId> = defs.into_iter().collect();

        while let Some(block) = work.pop() {
            for &join in self.frontier(block) {
                if result.insert(join) {
                    work.push(join);
                }
            }
        }

        result.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::FunctionBuilder;
    use crate::ir::ty::FunctionSig;
    use crate::ir::{Function, Type};

    fn analyze(func: &Function) -> (ControlFlowGraph, DominatorTree, DominanceFrontier) {
        let cfg = ControlFlowGraph::compute(func);
        let domtree = DominatorTree::compute(&cfg);
        let df = DominanceFrontier::compute(&cfg, &domtree);
        (cfg, domtree, df)
    }

    fn bool_sig() -> FunctionSig {
        FunctionSig {
            params: vec![Type::Bool],
            return_ty: None,
        }
    }

    #[test]
    fn linear_chain_dominance() {
        let mut fb = FunctionBuilder::new("f", FunctionSig::default());
        let b1 = fb.create_block();
        let b2 = fb.create_block();
        fb.br(b1);
        fb.switch_to_block(b1);
        fb.br(b2);
        fb.switch_to_block(b2);
        fb.ret(None);

        let func = fb.build();
        let (_, domtree, df) = analyze(&func);

        assert!(domtree.dominates(func.entry, b1));
        assert!(domtree.dominates(func.entry, b2));
        assert!(domtree.dominates(b1, b2));
        assert!(!domtree.dominates(b2, b1));

        assert_eq!(domtree.immediate_dominator(func.entry), None);
        assert_eq!(domtree.immediate_dominator(b1), Some(func.entry));
        assert_eq!(domtree.immediate_dominator(b2), Some(b1));
        assert_eq!(domtree.children(b1), &[b2]);

        // No joins anywhere: every frontier is empty.
        for block in func.blocks.keys() {
            assert!(df.frontier(block).is_empty());
        }
    }

    #[test]
    fn diamond_dominance_and_frontier() {
        let mut fb = FunctionBuilder::new("f", bool_sig());
        let cond = fb.param(0);
        let left = fb.create_block();
        let right = fb.create_block();
        let join = fb.create_block();

        fb.br_if(cond, left, right);
        fb.switch_to_block(left);
        fb.br(join);
        fb.switch_to_block(right);
        fb.br(join);
        fb.switch_to_block(join);
        fb.ret(None);

        let func = fb.build();
        let (_, domtree, df) = analyze(&func);

        // Neither arm dominates the join; the entry does.
        assert!(!domtree.dominates(left, join));
        assert!(!domtree.dominates(right, join));
        assert!(domtree.dominates(func.entry, join));
        assert_eq!(domtree.immediate_dominator(join), Some(func.entry));

        assert_eq!(df.frontier(left), &[join]);
        assert_eq!(df.frontier(right), &[join]);
        assert!(df.frontier(func.entry).is_empty());

        assert_eq!(df.iterated_frontier([left]), vec![join]);
        assert_eq!(df.iterated_frontier([left, right]), vec![join]);
    }

    #[test]
    fn loop_header_in_own_frontier() {
        // entry -> header; header -> body | exit; body -> header
        let mut fb = FunctionBuilder::new("f", bool_sig());
        let cond = fb.param(0);
        let header = fb.create_block();
        let body = fb.create_block();
        let exit = fb.create_block();

        fb.br(header);
        fb.switch_to_block(header);
        fb.br_if(cond, body, exit);
        fb.switch_to_block(body);
        fb.br(header);
        fb.switch_to_block(exit);
        fb.ret(None);

        let func = fb.build();
        let (_, domtree, df) = analyze(&func);

        assert!(domtree.dominates(header, body));
        assert!(domtree.dominates(header, exit));
        assert!(!domtree.dominates(body, exit));

        assert_eq!(df.frontier(body), &[header]);
        assert_eq!(df.frontier(header), &[header]);

        // Defs in entry and body converge at the loop header, and the
        // header's own frontier adds nothing new.
        assert_eq!(df.iterated_frontier([func.entry, body]), vec![header]);
    }

    #[test]
    fn nested_diamond_iterates_frontier() {
        // entry -> a | b; a -> a1 | a2; a1/a2 -> inner_join;
        // inner_join -> outer_join; b -> outer_join
        let mut fb = FunctionBuilder::new("f", bool_sig());
        let cond = fb.param(0);
        let a = fb.create_block();
        let b = fb.create_block();
        let a1 = fb.create_block();
        let a2 = fb.create_block();
        let inner_join = fb.create_block();
        let outer_join = fb.create_block();

        fb.br_if(cond, a, b);
        fb.switch_to_block(a);
        fb.br_if(cond, a1, a2);
        fb.switch_to_block(a1);
        fb.br(inner_join);
        fb.switch_to_block(a2);
        fb.br(inner_join);
        fb.switch_to_block(inner_join);
        fb.br(outer_join);
        fb.switch_to_block(b);
        fb.br(outer_join);
        fb.switch_to_block(outer_join);
        fb.ret(None);

        let func = fb.build();
        let (_, _, df) = analyze(&func);

        // A def in a1 needs a merge at the inner join, and that merge is
        // itself a def that needs a merge at the outer join.
        assert_eq!(df.iterated_frontier([a1]), vec![inner_join, outer_join]);
    }

    #[test]
    fn unreachable_blocks_ignored() {
        let mut fb = FunctionBuilder::new("f", FunctionSig::default());
        let dead = fb.create_block();
        fb.ret(None);
        fb.switch_to_block(dead);
        fb.ret(None);

        let func = fb.build();
        let (_, domtree, df) = analyze(&func);

        assert!(!domtree.is_reachable(dead));
        assert_eq!(domtree.immediate_dominator(dead), None);
        assert!(!domtree.dominates(func.entry, dead));
        assert!(!domtree.dominates(dead, func.entry));
        assert!(domtree.dominates(dead, dead));
        assert!(df.iterated_frontier([dead]).is_empty());
    }
}
