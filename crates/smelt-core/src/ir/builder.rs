use std::collections::HashMap;

use crate::entity::PrimaryMap;

use super::block::{Block, BlockId};
use super::func::{FuncId, Function};
use super::inst::{CmpKind, Inst, Op};
use super::module::Module;
use super::ty::{FunctionSig, Type};
use super::value::{Constant, ValueId};

/// Builder for constructing a single [`Function`].
///
/// Manages value allocation, block creation, and instruction emission.
/// Tracks a "current block" cursor — instructions are appended to it.
pub struct FunctionBuilder {
    func: Function,
    current_block: BlockId,
}

impl FunctionBuilder {
    /// Create a new function builder.
    ///
    /// Creates the entry block and allocates `ValueId`s for each parameter.
    pub fn new(name: impl Into<String>, sig: FunctionSig) -> Self {
        let mut blocks = PrimaryMap::new();
        let mut value_types = PrimaryMap::new();

        let mut params = Vec::with_capacity(sig.params.len());
        for ty in &sig.params {
            params.push(value_types.push(ty.clone()));
        }
        let entry = blocks.push(Block::default());

        let func = Function {
            name: name.into(),
            sig,
            params,
            blocks,
            insts: PrimaryMap::new(),
            value_types,
            entry,
            value_names: HashMap::new(),
        };

        Self {
            func,
            current_block: entry,
        }
    }

    /// Create a new empty block. Returns its `BlockId`.
    pub fn create_block(&mut self) -> BlockId {
        self.func.blocks.push(Block::default())
    }

    /// Switch the current block cursor to the given block.
    pub fn switch_to_block(&mut self, block: BlockId) {
        self.current_block = block;
    }

    /// Get the current block.
    pub fn current_block(&self) -> BlockId {
        self.current_block
    }

    /// Get the entry block.
    pub fn entry_block(&self) -> BlockId {
        self.func.entry
    }

    /// Get the `ValueId` for a function parameter by index.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn param(&self, index: usize) -> ValueId {
        self.func.params[index]
    }

    /// Attach a debug name to a value (from source-level variable names).
    pub fn name_value(&mut self, v: ValueId, name: impl Into<String>) {
        self.func.value_names.insert(v, name.into());
    }

    /// Look up the type of a value.
    pub fn value_type(&self, value: ValueId) -> Type {
        self.func.value_types[value].clone()
    }

    /// Consume the builder and return the constructed `Function`.
    pub fn build(self) -> Function {
        self.func
    }

    // -- internal helpers --

    /// Push an instruction with a result value into the current block.
    fn emit(&mut self, op: Op, ty: Type) -> ValueId {
        let value = self.func.value_types.push(ty);
        let inst_id = self.func.insts.push(Inst {
            op,
            result: Some(value),
        });
        self.func.blocks[self.current_block].insts.push(inst_id);
        value
    }

    /// Push a void instruction (no result value) into the current block.
    fn emit_void(&mut self, op: Op) {
        let inst_id = self.func.insts.push(Inst { op, result: None });
        self.func.blocks[self.current_block].insts.push(inst_id);
    }

    // ========================================================================
    // Constants
    // ========================================================================

    pub fn const_bool(&mut self, value: bool) -> ValueId {
        let c = Constant::Bool(value);
        let ty = c.ty();
        self.emit(Op::Const(c), ty)
    }

    pub fn const_int(&mut self, value: i64) -> ValueId {
        let c = Constant::Int(value);
        let ty = c.ty();
        self.emit(Op::Const(c), ty)
    }

    pub fn const_float(&mut self, value: f64) -> ValueId {
        let c = Constant::Float(value);
        let ty = c.ty();
        self.emit(Op::Const(c), ty)
    }

    pub fn undef(&mut self, ty: Type) -> ValueId {
        self.emit(Op::Undef, ty)
    }

    // ========================================================================
    // Arithmetic, comparison, logic
    // ========================================================================

    pub fn add(&mut self, a: ValueId, b: ValueId) -> ValueId {
        let ty = self.value_type(a);
        self.emit(Op::Add(a, b), ty)
    }

    pub fn sub(&mut self, a: ValueId, b: ValueId) -> ValueId {
        let ty = self.value_type(a);
        self.emit(Op::Sub(a, b), ty)
    }

    pub fn mul(&mut self, a: ValueId, b: ValueId) -> ValueId {
        let ty = self.value_type(a);
        self.emit(Op::Mul(a, b), ty)
    }

    pub fn div(&mut self, a: ValueId, b: ValueId) -> ValueId {
        let ty = self.value_type(a);
        self.emit(Op::Div(a, b), ty)
    }

    pub fn neg(&mut self, a: ValueId) -> ValueId {
        let ty = self.value_type(a);
        self.emit(Op::Neg(a), ty)
    }

    pub fn cmp(&mut self, kind: CmpKind, a: ValueId, b: ValueId) -> ValueId {
        self.emit(Op::Cmp(kind, a, b), Type::Bool)
    }

    pub fn not(&mut self, a: ValueId) -> ValueId {
        self.emit(Op::Not(a), Type::Bool)
    }

    // ========================================================================
    // Control flow
    // ========================================================================

    pub fn br(&mut self, target: BlockId) {
        self.emit_void(Op::Br { target });
    }

    pub fn br_if(&mut self, cond: ValueId, then_target: BlockId, else_target: BlockId) {
        self.emit_void(Op::BrIf {
            cond,
            then_target,
            else_target,
        });
    }

    pub fn ret(&mut self, value: Option<ValueId>) {
        self.emit_void(Op::Return(value));
    }

    // ========================================================================
    // Memory
    // ========================================================================

    /// Declare a stack slot; the result is the slot's address.
    pub fn slot(&mut self, ty: Type) -> ValueId {
        let addr_ty = Type::Ptr(Box::new(ty.clone()));
        self.emit(Op::Slot(ty), addr_ty)
    }

    pub fn load(&mut self, addr: ValueId, ty: Type) -> ValueId {
        self.emit(Op::Load(addr), ty)
    }

    pub fn store(&mut self, addr: ValueId, value: ValueId) {
        self.emit_void(Op::Store { addr, value });
    }

    // ========================================================================
    // Calls
    // ========================================================================

    pub fn call(&mut self, func: impl Into<String>, args: &[ValueId], ret_ty: Type) -> ValueId {
        self.emit(
            Op::Call {
                func: func.into(),
                args: args.to_vec(),
            },
            ret_ty,
        )
    }
}

/// Builder for constructing a [`Module`].
pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            module: Module::new(name.into()),
        }
    }

    pub fn add_function(&mut self, func: Function) -> FuncId {
        self.module.functions.push(func)
    }

    pub fn build(self) -> Module {
        self.module
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_simple_add_function() {
        // Build: fn add(a: i64, b: i64) -> i64 { return a + b }
        let sig = FunctionSig {
            params: vec![Type::Int(64), Type::Int(64)],
            return_ty: Some(Type::Int(64)),
        };
        let mut fb = FunctionBuilder::new("add", sig);

        let a = fb.param(0);
        let b = fb.param(1);
        let sum = fb.add(a, b);
        fb.ret(Some(sum));

        let func = fb.build();

        assert_eq!(func.name, "add");
        assert_eq!(func.params.len(), 2);

        // Entry block should have 2 instructions (add + return).
        let entry = &func.blocks[func.entry];
        assert_eq!(entry.insts.len(), 2);

        let add_inst = &func.insts[entry.insts[0]];
        assert!(add_inst.result.is_some());
        assert!(matches!(add_inst.op, Op::Add(_, _)));

        let ret_inst = &func.insts[entry.insts[1]];
        assert!(ret_inst.result.is_none());
        assert!(matches!(ret_inst.op, Op::Return(Some(_))));

        // Value types: 2 params + 1 add result = 3.
        assert_eq!(func.value_types.len(), 3);
    }

    #[test]
    fn slot_addresses_are_typed_as_pointers() {
        let mut fb = FunctionBuilder::new("locals", FunctionSig::default());
        let x = fb.slot(Type::Int(64));
        let one = fb.const_int(1);
        fb.store(x, one);
        let loaded = fb.load(x, Type::Int(64));
        fb.ret(Some(loaded));

        let func = fb.build();
        assert_eq!(
            func.value_types[x],
            Type::Ptr(Box::new(Type::Int(64)))
        );
        assert_eq!(func.blocks[func.entry].insts.len(), 4);
    }

    #[test]
    fn build_branching_function() {
        // entry: br_if cond, then, else; each branch returns a constant.
        let sig = FunctionSig {
            params: vec![Type::Bool],
            return_ty: Some(Type::Int(64)),
        };
        let mut fb = FunctionBuilder::new("choose", sig);

        let cond = fb.param(0);
        let then_block = fb.create_block();
        let else_block = fb.create_block();
        fb.br_if(cond, then_block, else_block);

        fb.switch_to_block(then_block);
        let one = fb.const_int(1);
        fb.ret(Some(one));

        fb.switch_to_block(else_block);
        let two = fb.const_int(2);
        fb.ret(Some(two));

        let func = fb.build();
        assert_eq!(func.blocks.len(), 3);
        assert_eq!(func.blocks[then_block].insts.len(), 2);
        assert_eq!(func.blocks[else_block].insts.len(), 2);
    }

    #[test]
    fn build_module() {
        let mut fb = FunctionBuilder::new("main", FunctionSig::default());
        fb.ret(None);
        let func = fb.build();

        let mut mb = ModuleBuilder::new("test_module");
        let fid = mb.add_function(func);
        let module = mb.build();

        assert_eq!(module.name, "test_module");
        assert_eq!(module.functions.len(), 1);
        assert_eq!(module.functions[fid].name, "main");
    }
}
