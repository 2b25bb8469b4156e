//! Control-flow analyses consumed by the transforms.

pub mod cfg;
pub mod dominance;

pub use cfg::ControlFlowGraph;
pub use dominance::{DominanceFrontier, DominatorTree};
