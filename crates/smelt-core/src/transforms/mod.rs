pub mod dce;
pub mod mem2reg;
pub mod util;

pub use dce::DeadCodeElimination;
pub use mem2reg::Mem2Reg;

use crate::pipeline::{PassConfig, TransformPipeline};

/// Build a transform pipeline based on the given pass configuration.
///
/// Promotion runs before DCE so the load/store chains it orphans get
/// swept in the same round.
pub fn default_pipeline(config: &PassConfig) -> TransformPipeline {
    let mut pipeline = TransformPipeline::new();
    if config.mem2reg {
        pipeline.add(Box::new(Mem2Reg));
    }
    if config.dead_code_elimination {
        pipeline.add(Box::new(DeadCodeElimination));
    }
    pipeline.set_fixpoint(config.fixpoint);
    pipeline
}
