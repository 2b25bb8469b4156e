use std::fmt;

use crate::entity::EntityRef;

use super::func::Function;
use super::inst::{CmpKind, Op};
use super::module::Module;
use super::ty::Type;
use super::value::Constant;
use super::ValueId;

fn fmt_type(ty: &Type, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match ty {
        Type::Void => write!(f, "void"),
        Type::Bool => write!(f, "bool"),
        Type::Int(bits) => write!(f, "i{bits}"),
        Type::Float(bits) => write!(f, "f{bits}"),
        Type::Ptr(inner) => {
            write!(f, "*")?;
            fmt_type(inner, f)
        }
    }
}

fn fmt_value(v: ValueId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "v{}", v.index())
}

fn fmt_constant(c: &Constant, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match c {
        Constant::Bool(b) => write!(f, "{b}"),
        Constant::Int(n) => write!(f, "{n}"),
        Constant::Float(v) => {
            if v.fract() == 0.0 && v.is_finite() {
                write!(f, "{v:.1}")
            } else {
                write!(f, "{v}")
            }
        }
    }
}

fn fmt_cmp_kind(kind: CmpKind, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match kind {
        CmpKind::Eq => write!(f, "eq"),
        CmpKind::Ne => write!(f, "ne"),
        CmpKind::Lt => write!(f, "lt"),
        CmpKind::Le => write!(f, "le"),
        CmpKind::Gt => write!(f, "gt"),
        CmpKind::Ge => write!(f, "ge"),
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}(", self.name)?;
        for (i, &param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            fmt_value(param, f)?;
            write!(f, ": ")?;
            fmt_type(&self.value_types[param], f)?;
        }
        write!(f, ")")?;
        if let Some(ret) = &self.sig.return_ty {
            write!(f, " -> ")?;
            fmt_type(ret, f)?;
        }
        writeln!(f, " {{")?;

        for (block_id, block) in self.blocks.iter() {
            writeln!(f, "  block{}:", block_id.index())?;

            for &inst_id in &block.insts {
                let inst = &self.insts[inst_id];
                write!(f, "    ")?;

                if let Some(result) = inst.result {
                    fmt_value(result, f)?;
                    write!(f, ": ")?;
                    fmt_type(&self.value_types[result], f)?;
                    write!(f, " = ")?;
                }

                match &inst.op {
                    Op::Const(c) => {
                        write!(f, "const ")?;
                        fmt_constant(c, f)?;
                    }
                    Op::Undef => write!(f, "undef")?,
                    Op::Add(a, b) => {
                        write!(f, "add ")?;
                        fmt_value(*a, f)?;
                        write!(f, ", ")?;
                        fmt_value(*b, f)?;
                    }
                    Op::Sub(a, b) => {
                        write!(f, "sub ")?;
                        fmt_value(*a, f)?;
                        write!(f, ", ")?;
                        fmt_value(*b, f)?;
                    }
                    Op::Mul(a, b) => {
                        write!(f, "mul ")?;
                        fmt_value(*a, f)?;
                        write!(f, ", ")?;
                        fmt_value(*b, f)?;
                    }
                    Op::Div(a, b) => {
                        write!(f, "div ")?;
                        fmt_value(*a, f)?;
                        write!(f, ", ")?;
                        fmt_value(*b, f)?;
                    }
                    Op::Neg(a) => {
                        write!(f, "neg ")?;
                        fmt_value(*a, f)?;
                    }
                    Op::Cmp(kind, a, b) => {
                        write!(f, "cmp.")?;
                        fmt_cmp_kind(*kind, f)?;
                        write!(f, " ")?;
                        fmt_value(*a, f)?;
                        write!(f, ", ")?;
                        fmt_value(*b, f)?;
                    }
                    Op::Not(a) => {
                        write!(f, "not ")?;
                        fmt_value(*a, f)?;
                    }
                    Op::Br { target } => {
                        write!(f, "br block{}", target.index())?;
                    }
                    Op::BrIf {
                        cond,
                        then_target,
                        else_target,
                    } => {
                        write!(f, "br_if ")?;
                        fmt_value(*cond, f)?;
                        write!(
                            f,
                            ", block{}, block{}",
                            then_target.index(),
                            else_target.index()
                        )?;
                    }
                    Op::Return(v) => {
                        write!(f, "return")?;
                        if let Some(v) = v {
                            write!(f, " ")?;
                            fmt_value(*v, f)?;
                        }
                    }
                    Op::Slot(ty) => {
                        write!(f, "slot ")?;
                        fmt_type(ty, f)?;
                    }
                    Op::Load(addr) => {
                        write!(f, "load ")?;
                        fmt_value(*addr, f)?;
                    }
                    Op::Store { addr, value } => {
                        write!(f, "store ")?;
                        fmt_value(*addr, f)?;
                        write!(f, ", ")?;
                        fmt_value(*value, f)?;
                    }
                    Op::Call { func, args } => {
                        write!(f, "call {func}(")?;
                        for (i, a) in args.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            fmt_value(*a, f)?;
                        }
                        write!(f, ")")?;
                    }
                    Op::Phi { incoming } => {
                        write!(f, "phi ")?;
                        for (i, (block, value)) in incoming.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "[block{}: ", block.index())?;
                            fmt_value(*value, f)?;
                            write!(f, "]")?;
                        }
                    }
                }

                // Debug name suffix, when the result has one.
                if let Some(result) = inst.result {
                    if let Some(name) = self.value_names.get(&result) {
                        write!(f, "  ; {name}")?;
                    }
                }
                writeln!(f)?;
            }
        }

        writeln!(f, "}}")
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {} {{", self.name)?;
        for (i, func) in self.functions.values().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{func}")?;
        }
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::super::builder::FunctionBuilder;
    use super::super::ty::FunctionSig;
    use super::*;

    #[test]
    fn prints_slot_and_load() {
        let sig = FunctionSig {
            params: vec![],
            return_ty: Some(Type::Int(64)),
        };
        let mut fb = FunctionBuilder::new("f", sig);
        let x = fb.slot(Type::Int(64));
        fb.name_value(x, "x");
        let one = fb.const_int(1);
        fb.store(x, one);
        let loaded = fb.load(x, Type::Int(64));
        fb.ret(Some(loaded));

        let text = fb.build().to_string();
        assert!(text.contains("slot i64"));
        assert!(text.contains("; x"));
        assert!(text.contains("load v0"));
        assert!(text.contains("return v2"));
    }
}
