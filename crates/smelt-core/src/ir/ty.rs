use serde::{Deserialize, Serialize};

/// A value type in the IR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    /// Void / unit.
    Void,
    /// Boolean.
    Bool,
    /// Signed integer with bit width.
    Int(u8),
    /// Floating point with bit width (32 or 64).
    Float(u8),
    /// Address of a stack slot holding the inner type.
    Ptr(Box<Type>),
}

/// Function signature.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FunctionSig {
    pub params: Vec<Type>,
    pub return_ty: Option<Type>,
}
