use serde::{Deserialize, Serialize};

use crate::define_entity;

use super::block::BlockId;
use super::ty::Type;
use super::value::{Constant, ValueId};

define_entity!(InstId);

/// An IR instruction: an operation with an optional result value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inst {
    pub op: Op,
    /// The value produced by this instruction, if any.
    pub result: Option<ValueId>,
}

/// Comparison kind for relational operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpKind {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// IR operations.
///
/// Control flow uses explicit phi instructions rather than block
/// arguments: a `Phi` at the head of a block selects a value based on
/// which predecessor control arrived from, and branches carry no
/// arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Op {
    // -- Constants --
    /// Load a compile-time constant.
    Const(Constant),
    /// A value with no defined contents. Produced when promotion finds a
    /// merge operand with no dominating definition on some path.
    Undef,

    // -- Arithmetic --
    Add(ValueId, ValueId),
    Sub(ValueId, ValueId),
    Mul(ValueId, ValueId),
    Div(ValueId, ValueId),
    Neg(ValueId),

    // -- Comparison & logic --
    Cmp(CmpKind, ValueId, ValueId),
    Not(ValueId),

    // -- Control flow --
    /// Unconditional branch.
    Br { target: BlockId },
    /// Conditional branch.
    BrIf {
        cond: ValueId,
        then_target: BlockId,
        else_target: BlockId,
    },
    /// Return from function.
    Return(Option<ValueId>),

    // -- Memory --
    /// Declare a stack slot holding a value of the given type.
    /// The result is the slot's address.
    Slot(Type),
    /// Read the current value of a slot.
    Load(ValueId),
    /// Write a value to a slot. `addr` is the slot's address; a slot
    /// address appearing as `value` means the address escapes.
    Store { addr: ValueId, value: ValueId },

    // -- Calls --
    /// Direct call; opaque side effects.
    Call { func: String, args: Vec<ValueId> },

    // -- SSA --
    /// Merge instruction: one `(predecessor, value)` incoming pair per
    /// distinct predecessor of the containing block.
    Phi { incoming: Vec<(BlockId, ValueId)> },
}
