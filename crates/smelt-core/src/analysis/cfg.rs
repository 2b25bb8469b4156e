use crate::entity::EntityRef;
use crate::ir::{BlockId, Function, Op};

fn idx(block: BlockId) -> usize {
    block.index() as usize
}

/// Control-flow graph for a function: predecessor and successor sets per
/// block, deduplicated (a conditional branch with both targets equal
/// contributes a single edge).
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    preds: Vec<Vec<BlockId>>,
    succs: Vec<Vec<BlockId>>,
    entry: BlockId,
}

impl ControlFlowGraph {
    /// Build the CFG by examining each block's branch instructions.
    pub fn compute(func: &Function) -> Self {
        let num_blocks = func.blocks.len();
        let mut preds: Vec<Vec<BlockId>> = vec![Vec::new(); num_blocks];
        let mut succs: Vec<Vec<BlockId>> = vec![Vec::new(); num_blocks];

        let mut add_edge = |preds: &mut Vec<Vec<BlockId>>,
                            succs: &mut Vec<Vec<BlockId>>,
                            from: BlockId,
                            to: BlockId| {
            if !succs[idx(from)].contains(&to) {
                succs[idx(from)].push(to);
                preds[idx(to)].push(from);
            }
        };

        for (block_id, block) in func.blocks.iter() {
            for &inst_id in &block.insts {
                match func.insts[inst_id].op {
                    Op::Br { target } => {
                        add_edge(&mut preds, &mut succs, block_id, target);
                    }
                    Op::BrIf {
                        then_target,
                        else_target,
                        ..
                    } => {
                        add_edge(&mut preds, &mut succs, block_id, then_target);
                        add_edge(&mut preds, &mut succs, block_id, else_target);
                    }
                    _ => {}
                }
            }
        }

        Self {
            preds,
            succs,
            entry: func.entry,
        }
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn num_blocks(&self) -> usize {
        self.preds.len()
    }

    pub fn predecessors(&self, block: BlockId) -> &[BlockId] {
        &self.preds[idx(block)]
    }

    pub fn successors(&self, block: BlockId) -> &[BlockId] {
        &self.succs[idx(block)]
    }

    /// All blocks reachable from the entry, in reverse post-order.
    ///
    /// Computed with an explicit DFS stack carrying enter/exit markers,
    /// so pathological graphs cannot overflow the call stack.
    pub fn reverse_post_order(&self) -> Vec<BlockId> {
        let mut post_order = Vec::new();
        let mut visited = vec![false; self.num_blocks()];
        // (block, exiting): pushed once to enter, once to emit post-order.
        let mut stack = vec![(self.entry, false)];

        while let Some((block, exiting)) = stack.pop() {
            if exiting {
                post_order.push(block);
                continue;
            }
            if visited[idx(block)] {
                continue;
            }
            visited[idx(block)] = true;
            stack.push((block, true));
            for &succ in self.successors(block).iter().rev() {
                if !visited[idx(succ)] {
                    stack.push((succ, false));
                }
            }
        }

        post_order.reverse();
        post_order
    }
}
