use std::collections::HashMap;

use crate::ir::{BlockId, Op, ValueId};

/// Extract branch targets from a control-flow instruction.
pub fn branch_targets(op: &Op) -> Vec<BlockId> {
    match op {
        Op::Br { target } => vec![*target],
        Op::BrIf {
            then_target,
            else_target,
            ..
        } => vec![*then_target, *else_target],
        _ => vec![],
    }
}

/// Extract all ValueId operands from an Op.
///
/// Phi incomings count as operands: the merge consumes each per-predecessor
/// value.
pub fn value_operands(op: &Op) -> Vec<ValueId> {
    match op {
        Op::Const(_) | Op::Undef | Op::Slot(_) | Op::Br { .. } => vec![],
        Op::Add(a, b) | Op::Sub(a, b) | Op::Mul(a, b) | Op::Div(a, b) => vec![*a, *b],
        Op::Neg(a) | Op::Not(a) | Op::Load(a) => vec![*a],
        Op::Cmp(_, a, b) => vec![*a, *b],
        Op::BrIf { cond, .. } => vec![*cond],
        Op::Return(v) => v.iter().copied().collect(),
        Op::Store { addr, value } => vec![*addr, *value],
        Op::Call { args, .. } => args.clone(),
        Op::Phi { incoming } => incoming.iter().map(|(_, v)| *v).collect(),
    }
}

/// Replace ValueIds in an Op using a substitution map.
pub fn substitute_values_in_op(op: &mut Op, subst: &HashMap<ValueId, ValueId>) {
    let sub = |v: &mut ValueId| {
        if let Some(&new) = subst.get(v) {
            *v = new;
        }
    };

    match op {
        Op::Const(_) | Op::Undef | Op::Slot(_) | Op::Br { .. } => {}
        Op::Add(a, b) | Op::Sub(a, b) | Op::Mul(a, b) | Op::Div(a, b) => {
            sub(a);
            sub(b);
        }
        Op::Neg(a) | Op::Not(a) | Op::Load(a) => sub(a),
        Op::Cmp(_, a, b) => {
            sub(a);
            sub(b);
        }
        Op::BrIf { cond, .. } => sub(cond),
        Op::Return(v) => {
            if let Some(v) = v {
                sub(v);
            }
        }
        Op::Store { addr, value } => {
            sub(addr);
            sub(value);
        }
        Op::Call { args, .. } => {
            for a in args {
                sub(a);
            }
        }
        Op::Phi { incoming } => {
            for (_, v) in incoming {
                sub(v);
            }
        }
    }
}
