pub mod block;
pub mod builder;
pub mod func;
pub mod inst;
pub mod module;
pub mod printer;
pub mod ty;
pub mod value;

pub use block::{Block, BlockId};
pub use func::{FuncId, Function};
pub use inst::{CmpKind, Inst, InstId, Op};
pub use module::Module;
pub use ty::Type;
pub use value::{Constant, ValueId};
