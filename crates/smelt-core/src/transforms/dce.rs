use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::CoreError;
use crate::ir::{BlockId, Constant, Function, InstId, Module, Op, ValueId};
use crate::pipeline::{Transform, TransformResult};

use super::util::{branch_targets, value_operands};

/// Dead code elimination transform — removes unused instructions and
/// unreachable blocks.
///
/// Four phases per function:
/// 1. Simplify constant branches (`BrIf` with a known condition → `Br`)
/// 2. Mark reachable blocks via CFG walk from entry
/// 3. Prune phi incoming pairs whose predecessor edge no longer exists
/// 4. Mark live instructions backward from side-effectful roots, then
///    drop everything else and clear unreachable blocks
///
/// Runs after mem2reg to sweep up the value chains promotion leaves
/// behind.
pub struct DeadCodeElimination;

/// Build a map from ValueId → Constant for all `Op::Const` instructions.
fn build_const_map(func: &Function) -> HashMap<ValueId, Constant> {
    let mut map = HashMap::new();
    for (_, inst) in func.insts.iter() {
        if let (Op::Const(c), Some(result)) = (&inst.op, inst.result) {
            map.insert(result, c.clone());
        }
    }
    map
}

/// Returns true if the given constant is truthy for branch purposes.
fn is_truthy(c: &Constant) -> bool {
    match c {
        Constant::Bool(b) => *b,
        Constant::Int(n) => *n != 0,
        Constant::Float(f) => *f != 0.0,
    }
}

/// Phase 1: Simplify branches with constant conditions to unconditional
/// branches.
fn simplify_constant_branches(func: &mut Function) {
    let consts = build_const_map(func);

    for inst_id in func.insts.keys().collect::<Vec<_>>() {
        let inst = &func.insts[inst_id];
        let new_op = match &inst.op {
            Op::BrIf {
                cond,
                then_target,
                else_target,
            } => consts.get(cond).map(|c| {
                let target = if is_truthy(c) {
                    *then_target
                } else {
                    *else_target
                };
                Op::Br { target }
            }),
            _ => None,
        };

        if let Some(op) = new_op {
            func.insts[inst_id].op = op;
        }
    }
}

/// Phase 2: Find all blocks reachable from the entry block via CFG walk.
fn find_reachable_blocks(func: &Function) -> HashSet<BlockId> {
    let mut reachable = HashSet::new();
    let mut worklist = VecDeque::new();
    worklist.push_back(func.entry);
    reachable.insert(func.entry);

    while let Some(block_id) = worklist.pop_front() {
        let block = &func.blocks[block_id];
        for &inst_id in &block.insts {
            for target in branch_targets(&func.insts[inst_id].op) {
                if reachable.insert(target) {
                    worklist.push_back(target);
                }
            }
        }
    }

    reachable
}

/// Phase 3: Drop phi incoming pairs whose predecessor edge is gone,
/// either because the predecessor became unreachable or because branch
/// simplification removed the edge.
fn prune_phi_inputs(func: &mut Function, reachable: &HashSet<BlockId>) -> bool {
    let mut edges: HashSet<(BlockId, BlockId)> = HashSet::new();
    for &block_id in reachable {
        for &inst_id in &func.blocks[block_id].insts {
            for target in branch_targets(&func.insts[inst_id].op) {
                edges.insert((block_id, target));
            }
        }
    }

    let mut changed = false;
    for block_id in func.blocks.keys().collect::<Vec<_>>() {
        if !reachable.contains(&block_id) {
            continue;
        }
        for inst_id in func.blocks[block_id].insts.clone() {
            if let Op::Phi { incoming } = &mut func.insts[inst_id].op {
                let before = incoming.len();
                incoming.retain(|&(pred, _)| edges.contains(&(pred, block_id)));
                changed |= incoming.len() != before;
            }
        }
    }
    changed
}

/// Returns true if the instruction has side effects and must be kept.
fn has_side_effects(op: &Op) -> bool {
    matches!(
        op,
        // Control flow
        Op::Br { .. }
            | Op::BrIf { .. }
            | Op::Return(_)
            // Mutation
            | Op::Store { .. }
            // Calls (may have arbitrary side effects)
            | Op::Call { .. }
    )
}

/// Run all phases on one function. Returns true if any changes were made.
fn eliminate_dead_code(func: &mut Function) -> bool {
    simplify_constant_branches(func);

    let reachable = find_reachable_blocks(func);
    let mut changed = prune_phi_inputs(func, &reachable);

    // Producer map: ValueId → InstId, reachable blocks only.
    let mut producer: HashMap<ValueId, InstId> = HashMap::new();
    for block_id in func.blocks.keys() {
        if !reachable.contains(&block_id) {
            continue;
        }
        for &inst_id in &func.blocks[block_id].insts {
            if let Some(result) = func.insts[inst_id].result {
                producer.insert(result, inst_id);
            }
        }
    }

    // Mark live instructions via backward worklist, seeded with
    // side-effectful instructions in reachable blocks.
    let mut live = HashSet::new();
    let mut worklist: VecDeque<InstId> = VecDeque::new();

    for &block_id in &reachable {
        for &inst_id in &func.blocks[block_id].insts {
            if has_side_effects(&func.insts[inst_id].op) && live.insert(inst_id) {
                worklist.push_back(inst_id);
            }
        }
    }

    while let Some(inst_id) = worklist.pop_front() {
        for operand in value_operands(&func.insts[inst_id].op) {
            if let Some(&prod_id) = producer.get(&operand) {
                if live.insert(prod_id) {
                    worklist.push_back(prod_id);
                }
            }
        }
    }

    // Rewrite: filter instructions in reachable blocks, clear unreachable
    // blocks entirely.
    for block_id in func.blocks.keys().collect::<Vec<_>>() {
        if reachable.contains(&block_id) {
            let before = func.blocks[block_id].insts.len();
            func.blocks[block_id]
                .insts
                .retain(|inst_id| live.contains(inst_id));
            if func.blocks[block_id].insts.len() != before {
                changed = true;
            }
        } else {
            if !func.blocks[block_id].insts.is_empty() {
                changed = true;
            }
            func.blocks[block_id].insts.clear();
        }
    }

    if changed {
        func.compact_insts();
    }
    changed
}

impl Transform for DeadCodeElimination {
    fn name(&self) -> &str {
        "dead-code-elimination"
    }

    fn apply(&self, mut module: Module) -> Result<TransformResult, CoreError> {
        let mut changed = false;
        for func_id in module.functions.keys().collect::<Vec<_>>() {
            changed |= eliminate_dead_code(&mut module.functions[func_id]);
        }
        Ok(TransformResult { module, changed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityRef;
    use crate::ir::builder::{FunctionBuilder, ModuleBuilder};
    use crate::ir::ty::FunctionSig;
    use crate::ir::{FuncId, Inst, Type};

    fn apply_dce(func: Function) -> Function {
        let mut mb = ModuleBuilder::new("test");
        mb.add_function(func);
        let result = DeadCodeElimination.apply(mb.build()).unwrap();
        result.module.functions[FuncId::new(0)].clone()
    }

    fn block_inst_count(func: &Function, block: BlockId) -> usize {
        func.blocks[block].insts.len()
    }

    /// Insert a phi at the front of a block. The builder has no phi
    /// emitter — phis are normally created by promotion.
    fn insert_phi(
        func: &mut Function,
        block: BlockId,
        ty: Type,
        incoming: Vec<(BlockId, ValueId)>,
    ) -> ValueId {
        let result = func.value_types.push(ty);
        let inst = func.insts.push(Inst {
            op: Op::Phi { incoming },
            result: Some(result),
        });
        func.blocks[block].insts.insert(0, inst);
        result
    }

    /// Dead arithmetic is removed: unused add result gets eliminated.
    #[test]
    fn dead_arithmetic_removed() {
        let mut fb = FunctionBuilder::new("test", FunctionSig::default());
        let a = fb.const_int(1);
        let b = fb.const_int(2);
        let _sum = fb.add(a, b); // unused
        fb.ret(None);

        let func = apply_dce(fb.build());
        // Only the return should remain — consts and add are dead.
        let entry = func.entry;
        assert_eq!(block_inst_count(&func, entry), 1);
        assert!(matches!(
            func.insts[func.blocks[entry].insts[0]].op,
            Op::Return(None)
        ));
    }

    /// Used arithmetic is kept: result feeds a return.
    #[test]
    fn used_arithmetic_kept() {
        let sig = FunctionSig {
            params: vec![],
            return_ty: Some(Type::Int(64)),
        };
        let mut fb = FunctionBuilder::new("test", sig);
        let a = fb.const_int(1);
        let b = fb.const_int(2);
        let sum = fb.add(a, b);
        fb.ret(Some(sum));

        let func = apply_dce(fb.build());
        // const 1, const 2, add, return — all live.
        assert_eq!(block_inst_count(&func, func.entry), 4);
    }

    /// Side effects are kept: Call with unused result is preserved.
    #[test]
    fn side_effects_kept() {
        let mut fb = FunctionBuilder::new("test", FunctionSig::default());
        let _call_result = fb.call("side_effect", &[], Type::Void);
        fb.ret(None);

        let func = apply_dce(fb.build());
        assert_eq!(block_inst_count(&func, func.entry), 2);
    }

    /// Chained dead code: `a = const 1; b = add(a, a)` where `b` unused —
    /// both removed.
    #[test]
    fn chained_dead_code() {
        let mut fb = FunctionBuilder::new("test", FunctionSig::default());
        let a = fb.const_int(1);
        let _b = fb.add(a, a); // unused chain
        fb.ret(None);

        let func = apply_dce(fb.build());
        assert_eq!(block_inst_count(&func, func.entry), 1);
    }

    /// Constant branch simplified: `BrIf(const true, A, B)` → `Br(A)`,
    /// B's dead code removed.
    #[test]
    fn constant_branch_simplified() {
        let sig = FunctionSig {
            params: vec![],
            return_ty: Some(Type::Int(64)),
        };
        let mut fb = FunctionBuilder::new("test", sig);

        let then_block = fb.create_block();
        let else_block = fb.create_block();

        let cond = fb.const_bool(true);
        fb.br_if(cond, then_block, else_block);

        fb.switch_to_block(then_block);
        let one = fb.const_int(1);
        fb.ret(Some(one));

        // else_block returns 2 — should be unreachable
        fb.switch_to_block(else_block);
        let two = fb.const_int(2);
        fb.ret(Some(two));

        let func = apply_dce(fb.build());

        // The BrIf was simplified to Br, which no longer references the
        // condition, so const(true) is dead too.
        let entry_ops: Vec<&Op> = func.blocks[func.entry]
            .insts
            .iter()
            .map(|id| &func.insts[*id].op)
            .collect();
        assert!(entry_ops
            .iter()
            .any(|op| matches!(op, Op::Br { target } if *target == then_block)));

        assert!(block_inst_count(&func, then_block) >= 2);
        assert_eq!(block_inst_count(&func, else_block), 0);
    }

    /// Unreachable block is cleared: a block with no predecessors has its
    /// instructions removed.
    #[test]
    fn unreachable_block_cleared() {
        let mut fb = FunctionBuilder::new("test", FunctionSig::default());
        let dead_block = fb.create_block();

        // Entry returns immediately — dead_block is never targeted.
        fb.ret(None);

        fb.switch_to_block(dead_block);
        let a = fb.const_int(42);
        fb.ret(Some(a));

        let func = apply_dce(fb.build());
        assert_eq!(block_inst_count(&func, dead_block), 0);
    }

    /// A phi whose result is unused is dead, and its incoming producers
    /// die with it.
    #[test]
    fn unused_phi_removed() {
        let sig = FunctionSig {
            params: vec![Type::Bool],
            return_ty: None,
        };
        let mut fb = FunctionBuilder::new("test", sig);
        let cond = fb.param(0);

        let left = fb.create_block();
        let right = fb.create_block();
        let join = fb.create_block();
        fb.br_if(cond, left, right);

        fb.switch_to_block(left);
        let one = fb.const_int(1);
        fb.br(join);

        fb.switch_to_block(right);
        let two = fb.const_int(2);
        fb.br(join);

        fb.switch_to_block(join);
        fb.ret(None);

        let mut func = fb.build();
        insert_phi(
            &mut func,
            join,
            Type::Int(64),
            vec![(left, one), (right, two)],
        );

        let func = apply_dce(func);
        assert_eq!(block_inst_count(&func, join), 1); // return only
        assert_eq!(block_inst_count(&func, left), 1); // branch only
        assert_eq!(block_inst_count(&func, right), 1);
    }

    /// When branch simplification makes one arm unreachable, the join's
    /// phi loses the incoming pair from that arm.
    #[test]
    fn phi_input_from_dead_arm_pruned() {
        let sig = FunctionSig {
            params: vec![],
            return_ty: Some(Type::Int(64)),
        };
        let mut fb = FunctionBuilder::new("test", sig);

        let left = fb.create_block();
        let right = fb.create_block();
        let join = fb.create_block();

        let cond = fb.const_bool(true);
        fb.br_if(cond, left, right);

        fb.switch_to_block(left);
        let one = fb.const_int(1);
        fb.br(join);

        fb.switch_to_block(right);
        let two = fb.const_int(2);
        fb.br(join);

        fb.switch_to_block(join);
        fb.ret(None);

        let mut func = fb.build();
        let phi = insert_phi(
            &mut func,
            join,
            Type::Int(64),
            vec![(left, one), (right, two)],
        );
        // Make the phi live by returning it.
        for &inst_id in &func.blocks[join].insts.clone() {
            if matches!(func.insts[inst_id].op, Op::Return(_)) {
                func.insts[inst_id].op = Op::Return(Some(phi));
            }
        }

        let func = apply_dce(func);

        assert_eq!(block_inst_count(&func, right), 0);
        let incoming = func.blocks[join]
            .insts
            .iter()
            .find_map(|&id| match &func.insts[id].op {
                Op::Phi { incoming } => Some(incoming.clone()),
                _ => None,
            })
            .expect("phi survives");
        assert_eq!(incoming, vec![(left, one)]);
    }

    /// A live phi keeps the producers of its incoming values alive.
    #[test]
    fn phi_keeps_incoming_producers_live() {
        let sig = FunctionSig {
            params: vec![Type::Bool],
            return_ty: Some(Type::Int(64)),
        };
        let mut fb = FunctionBuilder::new("test", sig);
        let cond = fb.param(0);

        let left = fb.create_block();
        let right = fb.create_block();
        let join = fb.create_block();
        fb.br_if(cond, left, right);

        fb.switch_to_block(left);
        let one = fb.const_int(1);
        fb.br(join);

        fb.switch_to_block(right);
        let two = fb.const_int(2);
        fb.br(join);

        fb.switch_to_block(join);
        fb.ret(None);

        let mut func = fb.build();
        let phi = insert_phi(
            &mut func,
            join,
            Type::Int(64),
            vec![(left, one), (right, two)],
        );
        for &inst_id in &func.blocks[join].insts.clone() {
            if matches!(func.insts[inst_id].op, Op::Return(_)) {
                func.insts[inst_id].op = Op::Return(Some(phi));
            }
        }

        let func = apply_dce(func);
        assert_eq!(block_inst_count(&func, left), 2); // const + branch
        assert_eq!(block_inst_count(&func, right), 2);
        assert_eq!(block_inst_count(&func, join), 2); // phi + return
    }
}
