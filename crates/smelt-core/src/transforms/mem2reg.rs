use std::collections::{HashMap, HashSet};

use crate::analysis::{ControlFlowGraph, DominanceFrontier, DominatorTree};
use crate::define_entity;
use crate::entity::{PrimaryMap, SecondaryMap};
use crate::error::CoreError;
use crate::ir::{BlockId, Function, Inst, InstId, Module, Op, Type, ValueId};
use crate::pipeline::{Transform, TransformResult};

use super::util::{substitute_values_in_op, value_operands};

/// Mem2Reg transform — promotes stack slots to SSA values.
///
/// Classic scalar promotion: every slot whose references are all plain
/// loads, or stores taking the slot as address (never as data), is
/// rewritten into direct value flow. Phi instructions are placed on the
/// iterated dominance frontier of the slot's defining blocks, then a
/// single depth-first walk of the dominator tree resolves each load to
/// its nearest dominating definition and wires each phi's incoming pairs.
/// Superseded loads, stores and the slots themselves are deleted.
///
/// Promotion is all-or-nothing per slot: one illegal reference (the
/// address escaping into a call, a store of the address as data, …)
/// leaves every instruction touching that slot unmodified. Rejection is a
/// normal outcome, not an error.
///
/// The control-flow graph is never altered — only instruction content
/// changes. Dominator information is computed fresh per function. This
/// pass should run before DCE so the now-dead chains get cleaned up.
pub struct Mem2Reg;

define_entity!(VarId);

/// Per-promotable-slot record, alive for one `promote_function` call.
struct VarInfo {
    /// The slot declaration itself.
    slot: InstId,
    /// The slot's address value.
    addr: ValueId,
    /// The slot's allocated type; phis are created with it.
    ty: Type,
    /// Blocks containing at least one store to this slot.
    def_blocks: HashSet<BlockId>,
    /// Renaming stack: the current reaching definition per dominance
    /// region. Empty outside the rename traversal.
    stack: Vec<ValueId>,
    /// Lazily created undef, for merge operands with no dominating
    /// definition. Placed at the head of the entry block.
    undef: Option<ValueId>,
}

/// Outcome of the legality scan for one slot.
enum SlotClass {
    Promotable {
        loads: Vec<InstId>,
        stores: Vec<(InstId, BlockId)>,
    },
    Rejected,
}

/// Classify every reference to a slot address.
///
/// A load of the address is legal. A store is legal only when the slot is
/// its address operand and not its data operand. Anything else means the
/// address escapes and the slot stays in memory.
fn classify_slot(func: &Function, addr: ValueId) -> SlotClass {
    let mut loads = Vec::new();
    let mut stores = Vec::new();

    for (block_id, block) in func.blocks.iter() {
        for &inst_id in &block.insts {
            let inst = &func.insts[inst_id];
            if !value_operands(&inst.op).contains(&addr) {
                continue;
            }
            match &inst.op {
                Op::Load(a) if *a == addr => loads.push(inst_id),
                Op::Store { addr: a, value } if *a == addr && *value != addr => {
                    stores.push((inst_id, block_id));
                }
                _ => return SlotClass::Rejected,
            }
        }
    }

    SlotClass::Promotable { loads, stores }
}

/// Scan the entry block for slot declarations and build variable records
/// plus the def/use linkage. Rejected slots leave no linkage behind.
fn analyze_slots(func: &Function) -> (PrimaryMap<VarId, VarInfo>, SecondaryMap<InstId, VarId>) {
    let mut vars: PrimaryMap<VarId, VarInfo> = PrimaryMap::new();
    let mut linkage: SecondaryMap<InstId, VarId> = SecondaryMap::new();

    for &inst_id in &func.blocks[func.entry].insts {
        let inst = &func.insts[inst_id];
        let Op::Slot(ty) = &inst.op else { continue };
        let Some(addr) = inst.result else { continue };

        match classify_slot(func, addr) {
            SlotClass::Rejected => {}
            SlotClass::Promotable { loads, stores } => {
                let var_id = vars.push(VarInfo {
                    slot: inst_id,
                    addr,
                    ty: ty.clone(),
                    def_blocks: stores.iter().map(|&(_, block)| block).collect(),
                    stack: Vec::new(),
                    undef: None,
                });
                for load in loads {
                    linkage.insert(load, var_id);
                }
                for (store, _) in stores {
                    linkage.insert(store, var_id);
                }
            }
        }
    }

    (vars, linkage)
}

/// Place one empty phi per variable at the front of each block in the
/// iterated dominance frontier of the variable's defining blocks, and
/// register it in the linkage as a definition of that variable.
fn place_phis(
    func: &mut Function,
    df: &DominanceFrontier,
    vars: &PrimaryMap<VarId, VarInfo>,
    linkage: &mut SecondaryMap<InstId, VarId>,
) {
    for (var_id, var) in vars.iter() {
        let mut def_blocks: Vec<BlockId> = var.def_blocks.iter().copied().collect();
        def_blocks.sort();

        for block in df.iterated_frontier(def_blocks) {
            let result = func.value_types.push(var.ty.clone());
            let phi = func.insts.push(Inst {
                op: Op::Phi {
                    incoming: Vec::new(),
                },
                result: Some(result),
            });
            func.blocks[block].insts.insert(0, phi);
            linkage.insert(phi, var_id);

            // The phi inherits the slot's debug name, when it has one.
            if let Some(name) = func.value_names.get(&var.addr).cloned() {
                func.value_names.entry(result).or_insert(name);
            }
        }
    }
}

/// Get (or create) the variable's undef placeholder, used when a phi
/// operand has no dominating definition along some predecessor path.
fn undef_value(
    func: &mut Function,
    vars: &mut PrimaryMap<VarId, VarInfo>,
    var_id: VarId,
) -> ValueId {
    if let Some(existing) = vars[var_id].undef {
        return existing;
    }
    let result = func.value_types.push(vars[var_id].ty.clone());
    let inst = func.insts.push(Inst {
        op: Op::Undef,
        result: Some(result),
    });
    let entry = func.entry;
    func.blocks[entry].insts.insert(0, inst);
    vars[var_id].undef = Some(result);
    result
}

/// Depth-first traversal markers for the dominator tree walk.
enum Visit {
    Enter(BlockId),
    Leave(BlockId),
}

/// The renaming pass: one pre/post-order walk of the dominator tree.
///
/// Returns the load-result substitution map and the list of superseded
/// loads and stores. Substitutions are applied by the caller in one final
/// rewrite; the stacks only ever hold original value ids.
fn rename(
    func: &mut Function,
    cfg: &ControlFlowGraph,
    domtree: &DominatorTree,
    vars: &mut PrimaryMap<VarId, VarInfo>,
    linkage: &SecondaryMap<InstId, VarId>,
) -> (HashMap<ValueId, ValueId>, Vec<InstId>) {
    let mut subst: HashMap<ValueId, ValueId> = HashMap::new();
    let mut trash: Vec<InstId> = Vec::new();
    let mut work = vec![Visit::Enter(domtree.entry())];

    while let Some(visit) = work.pop() {
        match visit {
            Visit::Enter(block) => {
                work.push(Visit::Leave(block));

                // Local rewrite, in program order. Phis sit at the front
                // of the block, so they are seen before ordinary
                // instructions.
                let insts = func.blocks[block].insts.clone();
                for inst_id in insts {
                    let Some(&var_id) = linkage.get(inst_id) else {
                        continue;
                    };
                    let inst = &func.insts[inst_id];
                    match &inst.op {
                        Op::Store { value, .. } => {
                            vars[var_id].stack.push(*value);
                            trash.push(inst_id);
                        }
                        Op::Load(_) => {
                            if let Some(result) = inst.result {
                                if let Some(&top) = vars[var_id].stack.last() {
                                    subst.insert(result, top);
                                }
                            }
                            // Queued for deletion even when no dominating
                            // definition exists; see DESIGN.md.
                            trash.push(inst_id);
                        }
                        Op::Phi { .. } => {
                            // A phi is itself the current definition
                            // inside its own dominance region.
                            if let Some(result) = inst.result {
                                vars[var_id].stack.push(result);
                            }
                        }
                        _ => {}
                    }
                }

                // Successor wiring: each linked phi in a direct successor
                // gains one incoming pair from this block, reading the
                // post-local-rewrite stack top.
                for &succ in cfg.successors(block) {
                    let phis: Vec<InstId> = func.blocks[succ]
                        .insts
                        .iter()
                        .copied()
                        .take_while(|&id| matches!(func.insts[id].op, Op::Phi { .. }))
                        .collect();
                    for phi in phis {
                        let Some(&var_id) = linkage.get(phi) else {
                            continue;
                        };
                        let top = vars[var_id].stack.last().copied();
                        let value = match top {
                            Some(value) => value,
                            None => undef_value(func, vars, var_id),
                        };
                        if let Op::Phi { incoming } = &mut func.insts[phi].op {
                            incoming.push((block, value));
                        }
                    }
                }

                for &child in domtree.children(block).iter().rev() {
                    work.push(Visit::Enter(child));
                }
            }
            Visit::Leave(block) => {
                // Unwind: pop exactly what this block's stores and phis
                // pushed, restoring each stack to its pre-block state.
                for &inst_id in &func.blocks[block].insts {
                    let Some(&var_id) = linkage.get(inst_id) else {
                        continue;
                    };
                    if matches!(func.insts[inst_id].op, Op::Store { .. } | Op::Phi { .. }) {
                        vars[var_id].stack.pop();
                    }
                }
            }
        }
    }

    debug_assert!(
        vars.values().all(|var| var.stack.is_empty()),
        "renaming stacks must be balanced after traversal"
    );

    (subst, trash)
}

/// Promote every legal slot in one function. Returns true if any slot was
/// promoted.
fn promote_function(func: &mut Function) -> bool {
    let (mut vars, mut linkage) = analyze_slots(func);
    if vars.is_empty() {
        return false;
    }

    let cfg = ControlFlowGraph::compute(func);
    let domtree = DominatorTree::compute(&cfg);
    let df = DominanceFrontier::compute(&cfg, &domtree);

    place_phis(func, &df, &vars, &mut linkage);
    let (mut subst, trash) = rename(func, &cfg, &domtree, &mut vars, &linkage);

    // Resolve transitive aliases: v3 → v2 → v1 becomes v3 → v1. Chains
    // arise when a store's data operand is itself a replaced load result.
    loop {
        let mut changed = false;
        let snapshot: Vec<_> = subst.iter().map(|(k, v)| (*k, *v)).collect();
        for (key, target) in snapshot {
            if let Some(&next) = subst.get(&target) {
                if next != subst[&key] {
                    subst.insert(key, next);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    let dead: HashSet<InstId> = trash.iter().copied().collect();

    // Rewrite all surviving instructions (phi incomings included) to use
    // the substitution map.
    for inst_id in func.insts.keys().collect::<Vec<_>>() {
        if dead.contains(&inst_id) {
            continue;
        }
        substitute_values_in_op(&mut func.insts[inst_id].op, &subst);
    }

    // Cleanup: drop superseded loads and stores, then the slot
    // declarations themselves. Every consumer was rewired above, so no
    // live uses remain.
    let slots: HashSet<InstId> = vars.values().map(|var| var.slot).collect();
    for block_id in func.blocks.keys().collect::<Vec<_>>() {
        func.blocks[block_id]
            .insts
            .retain(|id| !dead.contains(id) && !slots.contains(id));
    }
    for var in vars.values() {
        func.value_names.remove(&var.addr);
    }

    func.compact_insts();
    true
}

impl Transform for Mem2Reg {
    fn name(&self) -> &str {
        "mem2reg"
    }

    fn apply(&self, mut module: Module) -> Result<TransformResult, CoreError> {
        let mut changed = false;
        for func_id in module.functions.keys().collect::<Vec<_>>() {
            changed |= promote_function(&mut module.functions[func_id]);
        }
        Ok(TransformResult { module, changed })
    }
}
